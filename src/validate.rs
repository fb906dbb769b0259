use log::trace;
use serde::Serialize;

use crate::{
    error::{Malformed, SelectionError},
    parse::check_index_list,
    selection::{DimSelection, FieldSelection, Selection},
    shape::ShapeDescriptor,
    CoordVec, Ndim,
};

/// A selection whose every dimension has been resolved against a
/// [ShapeDescriptor]: point indices are non-negative and in range,
/// ranges lie within `[0, extent]` with `start <= stop`,
/// index lists are in range and masks have the right length.
///
/// Only [validate] constructs one, so it can be serialized but not deserialized;
/// send the [Selection] and [FieldSelection] instead and validate on receipt.
#[derive(Serialize, Clone, Debug, PartialEq, Eq, Hash)]
pub struct ValidatedSelection {
    selection: Selection,
    field: FieldSelection,
    extents: CoordVec<u64>,
}

impl Ndim for ValidatedSelection {
    fn ndim(&self) -> usize {
        self.extents.len()
    }
}

impl ValidatedSelection {
    pub fn selection(&self) -> &Selection {
        &self.selection
    }

    pub fn field(&self) -> &FieldSelection {
        &self.field
    }

    /// The extents the selection was validated against.
    pub fn extents(&self) -> &[u64] {
        &self.extents
    }

    /// Selected indices along `axis`, ascending; `None` if there is no such axis.
    pub fn dim_indices(&self, axis: usize) -> Option<Vec<u64>> {
        let dim = self.selection.dims().get(axis)?;
        Some(dim.indices(self.extents[axis]))
    }

    /// Number of selected indices along each axis, point indices included.
    pub fn counts(&self) -> CoordVec<u64> {
        self.selection
            .dims()
            .iter()
            .zip(self.extents.iter())
            .map(|(d, e)| d.count(*e))
            .collect()
    }

    pub fn num_elements(&self) -> u64 {
        self.counts().iter().product()
    }

    /// Whether every element of the dataset is selected.
    pub fn is_whole(&self) -> bool {
        self.selection
            .dims()
            .iter()
            .zip(self.extents.iter())
            .all(|(d, e)| !d.is_point() && d.count(*e) == *e)
    }

    pub fn revalidate(&self, shape: &ShapeDescriptor) -> Result<Self, SelectionError> {
        validate(&self.selection, &self.field, shape)
    }
}

/// Check `selection` and `field` against `shape`.
///
/// Dimensions are checked in order and the first failure is returned;
/// the field is checked after all dimensions.
pub fn validate(
    selection: &Selection,
    field: &FieldSelection,
    shape: &ShapeDescriptor,
) -> Result<ValidatedSelection, SelectionError> {
    let rank = shape.rank();
    let resolved = match selection {
        Selection::EntireScalar => {
            if rank != 0 {
                return Err(Malformed::RankMismatch { given: 0, rank }.into());
            }
            Selection::EntireScalar
        }
        Selection::Dims(dims) => {
            if rank == 0 {
                return Err(Malformed::ScalarDataset.into());
            }
            if dims.len() != rank {
                return Err(Malformed::RankMismatch {
                    given: dims.len(),
                    rank,
                }
                .into());
            }
            let mut out = CoordVec::with_capacity(rank);
            for (axis, (dim, d)) in dims.iter().zip(shape.dims().iter()).enumerate() {
                out.push(validate_dim(dim, axis, d.extent)?);
            }
            Selection::Dims(out)
        }
    };
    validate_field(field, shape)?;

    Ok(ValidatedSelection {
        selection: resolved,
        field: field.clone(),
        extents: shape.extents(),
    })
}

fn validate_dim(dim: &DimSelection, axis: usize, extent: u64) -> Result<DimSelection, SelectionError> {
    // descriptor extents never exceed i64::MAX
    let signed_extent = extent as i64;
    match dim {
        DimSelection::Full => Ok(DimSelection::Full),
        DimSelection::PointIndex { index } => {
            if *index < -signed_extent || *index >= signed_extent {
                return Err(SelectionError::out_of_range(
                    axis,
                    Some(i128::from(*index)),
                    extent,
                ));
            }
            let index = if *index < 0 {
                index + signed_extent
            } else {
                *index
            };
            Ok(DimSelection::PointIndex { index })
        }
        DimSelection::Range { start, stop, step } => {
            if *step == 0 {
                return Err(Malformed::NonPositiveStep(0).into());
            }
            if i64::try_from(*step).is_err() {
                return Err(Malformed::StepTooLarge(*step).into());
            }
            let new_start = (*start).clamp(0, signed_extent);
            let new_stop = (*stop).clamp(new_start, signed_extent);
            if new_start != *start || new_stop != *stop {
                trace!(
                    "Clamped range {}..{} on axis {} to {}..{}",
                    start,
                    stop,
                    axis,
                    new_start,
                    new_stop
                );
            }
            Ok(DimSelection::Range {
                start: new_start,
                stop: new_stop,
                step: *step,
            })
        }
        DimSelection::IndexList { indices } => {
            check_index_list(indices)?;
            if indices.is_empty() && extent == 0 {
                return Err(SelectionError::out_of_range(axis, None, extent));
            }
            if let Some(bad) = indices.iter().find(|i| **i >= extent) {
                return Err(SelectionError::out_of_range(
                    axis,
                    Some(i128::from(*bad)),
                    extent,
                ));
            }
            Ok(dim.clone())
        }
        DimSelection::MaskSelection { mask } => {
            if mask.len() as u64 != extent {
                return Err(SelectionError::MaskLengthMismatch {
                    axis,
                    expected: extent,
                    got: mask.len(),
                });
            }
            Ok(dim.clone())
        }
    }
}

fn validate_field(field: &FieldSelection, shape: &ShapeDescriptor) -> Result<(), SelectionError> {
    let Some(name) = field.name() else {
        return Ok(());
    };
    let element = shape.element();
    if let Some(kind) = element.non_compound() {
        return Err(SelectionError::FieldNotApplicable {
            field: name.to_owned(),
            kind,
        });
    }
    if element.field(name).is_none() {
        return Err(SelectionError::UnknownField {
            field: name.to_owned(),
            available: element.field_names(),
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        data_type::{DataType, FloatSize},
        error::{ErrorKind, OutOfRange},
        shape::{ElementKind, Field},
    };

    fn f32() -> ElementKind {
        DataType::Float(FloatSize::b32).into()
    }

    fn one_d(extent: u64) -> ShapeDescriptor {
        ShapeDescriptor::new(&[extent], f32()).unwrap()
    }

    fn v(dim: DimSelection, shape: &ShapeDescriptor) -> Result<ValidatedSelection, SelectionError> {
        validate(&Selection::Dims([dim].into_iter().collect()), &FieldSelection::All, shape)
    }

    #[test]
    fn point_indices() {
        let shape = one_d(13);
        let sel = v(DimSelection::PointIndex { index: -4 }, &shape).unwrap();
        assert_eq!(sel.selection().dims(), &[DimSelection::PointIndex { index: 9 }]);
        assert_eq!(
            v(DimSelection::PointIndex { index: 100 }, &shape),
            Err(OutOfRange {
                axis: 0,
                index: Some(100),
                extent: 13
            }
            .into())
        );
        assert_eq!(
            v(DimSelection::PointIndex { index: -14 }, &shape)
                .unwrap_err()
                .kind(),
            ErrorKind::IndexOutOfRange
        );
        assert_eq!(
            v(DimSelection::PointIndex { index: 0 }, &one_d(0))
                .unwrap_err()
                .kind(),
            ErrorKind::IndexOutOfRange
        );
    }

    #[test]
    fn ranges_clamp() {
        let shape = one_d(13);
        let sel = v(
            DimSelection::Range {
                start: 100,
                stop: 400,
                step: 3,
            },
            &shape,
        )
        .unwrap();
        assert_eq!(
            sel.selection().dims(),
            &[DimSelection::Range {
                start: 13,
                stop: 13,
                step: 3
            }]
        );
        assert_eq!(sel.num_elements(), 0);

        let sel = v(
            DimSelection::Range {
                start: 6,
                stop: 2,
                step: 1,
            },
            &shape,
        )
        .unwrap();
        assert_eq!(sel.counts().as_slice(), &[0]);

        let sel = v(
            DimSelection::Range {
                start: -3,
                stop: 4,
                step: 1,
            },
            &shape,
        )
        .unwrap();
        assert_eq!(sel.dim_indices(0), Some(vec![0, 1, 2, 3]));

        let huge = DimSelection::Range {
            start: 0,
            stop: 13,
            step: u64::MAX,
        };
        assert_eq!(
            v(huge, &shape),
            Err(Malformed::StepTooLarge(u64::MAX).into())
        );
        let sel = v(
            DimSelection::Range {
                start: 0,
                stop: 13,
                step: i64::MAX as u64,
            },
            &shape,
        )
        .unwrap();
        assert_eq!(sel.num_elements(), 1);
        assert_eq!(sel.dim_indices(0), Some(vec![0]));
    }

    #[test]
    fn index_lists() {
        let shape = one_d(13);
        assert_eq!(
            v(
                DimSelection::IndexList {
                    indices: vec![1, 2, 100]
                },
                &shape
            ),
            Err(SelectionError::out_of_range(0, Some(100), 13))
        );
        assert_eq!(
            v(DimSelection::IndexList { indices: vec![2, 1] }, &shape)
                .unwrap_err()
                .kind(),
            ErrorKind::MalformedArgument
        );
        assert_eq!(
            v(
                DimSelection::IndexList {
                    indices: vec![u64::MAX]
                },
                &shape
            ),
            Err(SelectionError::out_of_range(0, Some(i128::from(u64::MAX)), 13))
        );
        assert!(v(DimSelection::IndexList { indices: vec![] }, &shape).is_ok());
        assert_eq!(
            v(DimSelection::IndexList { indices: vec![] }, &one_d(0)),
            Err(SelectionError::out_of_range(0, None, 0))
        );
    }

    #[test]
    fn zero_extent() {
        let shape = one_d(0);
        let sel = v(DimSelection::Full, &shape).unwrap();
        assert_eq!(sel.num_elements(), 0);
        assert!(v(DimSelection::MaskSelection { mask: vec![] }, &shape).is_ok());
        assert_eq!(
            v(DimSelection::MaskSelection { mask: vec![true] }, &shape)
                .unwrap_err()
                .kind(),
            ErrorKind::MaskLengthMismatch
        );
    }

    #[test]
    fn rank_must_match() {
        let shape = ShapeDescriptor::new(&[4, 6], f32()).unwrap();
        assert_eq!(
            v(DimSelection::Full, &shape),
            Err(Malformed::RankMismatch { given: 1, rank: 2 }.into())
        );
        assert_eq!(
            validate(&Selection::EntireScalar, &FieldSelection::All, &shape),
            Err(Malformed::RankMismatch { given: 0, rank: 2 }.into())
        );
    }

    #[test]
    fn fields() {
        let compound = ElementKind::Compound {
            fields: vec![Field::new("a", f32())],
        };
        let shape = ShapeDescriptor::new(&[3], compound).unwrap();
        let sel = Selection::full(1);
        assert!(validate(&sel, &FieldSelection::Field("a".into()), &shape).is_ok());
        assert_eq!(
            validate(&sel, &FieldSelection::Field("b".into()), &shape),
            Err(SelectionError::UnknownField {
                field: "b".into(),
                available: vec!["a".into()]
            })
        );
        assert_eq!(
            validate(&sel, &FieldSelection::Field("a".into()), &one_d(3))
                .unwrap_err()
                .kind(),
            ErrorKind::FieldNotApplicable
        );
    }

    #[test]
    fn serialized_form_is_checked_again() {
        let shape = one_d(13);
        let sel = v(DimSelection::IndexList { indices: vec![1, 3] }, &shape).unwrap();
        let s = serde_json::to_string(&sel).expect("Couldn't serialize selection");
        assert!(s.contains("index_list"));

        let unsorted = r#"{"dims":[{"kind":"index_list","indices":[3,1]}]}"#;
        let received: Selection = serde_json::from_str(unsorted).expect("Couldn't deserialize");
        assert_eq!(
            validate(&received, &FieldSelection::All, &shape)
                .unwrap_err()
                .kind(),
            ErrorKind::MalformedArgument
        );
    }

    #[test]
    fn revalidation_is_idempotent() {
        let shape = ShapeDescriptor::new(&[13, 5], f32()).unwrap();
        let sel = Selection::Dims(
            [
                DimSelection::Range {
                    start: -8,
                    stop: 400,
                    step: 3,
                },
                DimSelection::PointIndex { index: -1 },
            ]
            .into_iter()
            .collect(),
        );
        let first = validate(&sel, &FieldSelection::All, &shape).unwrap();
        let second = first.revalidate(&shape).unwrap();
        assert_eq!(first, second);
        assert!(!first.is_whole());
        assert!(validate(&Selection::full(2), &FieldSelection::All, &shape)
            .unwrap()
            .is_whole());
    }
}
