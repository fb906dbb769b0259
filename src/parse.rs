//! Mapping of a raw [IndexArg] onto a canonical [Selection].
//!
//! Parsing only rejects arguments whose form makes them impossible
//! (wrong number of indices, negative steps, unsorted index lists, masks
//! of the wrong length, fields on a non-compound type).
//! Bounds are left to [crate::validate].
use itertools::Itertools;
use log::debug;

use crate::{
    argument::{IndexArg, SliceArg},
    config::SelectionOptions,
    error::{Malformed, SelectionError},
    selection::{DimSelection, FieldSelection, Selection},
    shape::ShapeDescriptor,
    CoordVec,
};

/// Parse `arg` for a dataset described by `shape`.
///
/// `shape` provides the rank and element kind; extents are only consulted
/// to resolve omitted or negative slice bounds and to check mask lengths.
pub fn parse(
    arg: &IndexArg,
    shape: &ShapeDescriptor,
    options: &SelectionOptions,
) -> Result<(Selection, FieldSelection), SelectionError> {
    let (entries, field, is_tuple) = split_field(arg)?;

    let field = match field {
        Some(name) => {
            if let Some(kind) = shape.element().non_compound() {
                return Err(SelectionError::FieldNotApplicable {
                    field: name.to_owned(),
                    kind,
                });
            }
            FieldSelection::Field(name.to_owned())
        }
        None => FieldSelection::All,
    };

    let selection = if shape.is_scalar() {
        parse_scalar(&entries)?
    } else {
        parse_dims(&entries, is_tuple, shape, options)?
    };
    debug!("Parsed `{}` as {:?} {:?}", arg, selection, field);
    Ok((selection, field))
}

/// Separate the per-dimension entries from any field name.
fn split_field(arg: &IndexArg) -> Result<(Vec<&IndexArg>, Option<&str>, bool), Malformed> {
    match arg {
        IndexArg::EmptyTuple => Ok((Vec::default(), None, true)),
        IndexArg::Field(name) => Ok((Vec::default(), Some(name.as_str()), false)),
        IndexArg::Tuple(items) => {
            let mut entries = Vec::with_capacity(items.len());
            let mut field = None;
            for item in items.iter() {
                match item {
                    IndexArg::Field(name) => {
                        if field.replace(name.as_str()).is_some() {
                            return Err(Malformed::MultipleFields);
                        }
                    }
                    IndexArg::Tuple(_) | IndexArg::EmptyTuple => {
                        return Err(Malformed::NestedTuple)
                    }
                    other => entries.push(other),
                }
            }
            Ok((entries, field, true))
        }
        other => Ok((vec![other], None, false)),
    }
}

fn parse_scalar(entries: &[&IndexArg]) -> Result<Selection, Malformed> {
    if entries.iter().all(|e| matches!(e, IndexArg::Ellipsis)) {
        if entries.len() > 1 {
            return Err(Malformed::MultipleEllipses);
        }
        Ok(Selection::EntireScalar)
    } else {
        Err(Malformed::ScalarDataset)
    }
}

fn parse_dims(
    entries: &[&IndexArg],
    is_tuple: bool,
    shape: &ShapeDescriptor,
    options: &SelectionOptions,
) -> Result<Selection, SelectionError> {
    let rank = shape.rank();
    let n_ellipsis = entries
        .iter()
        .filter(|e| matches!(e, IndexArg::Ellipsis))
        .count();
    if n_ellipsis > 1 {
        return Err(Malformed::MultipleEllipses.into());
    }
    let given = entries.len() - n_ellipsis;
    if given > rank {
        return Err(Malformed::TooManyIndices { given, rank }.into());
    }
    if is_tuple && n_ellipsis == 0 && given > 0 && given < rank {
        return Err(Malformed::TooFewIndices { given, rank }.into());
    }

    // an ellipsis (or a bare argument) stands for as many full dimensions as are missing
    let mut expanded: Vec<Option<&IndexArg>> = Vec::with_capacity(rank);
    for entry in entries.iter() {
        if let IndexArg::Ellipsis = entry {
            expanded.extend((0..rank - given).map(|_| None));
        } else {
            expanded.push(Some(*entry));
        }
    }
    expanded.resize(rank, None);

    let mut dims: CoordVec<DimSelection> = CoordVec::with_capacity(rank);
    for (axis, (entry, dim)) in expanded.iter().zip(shape.dims().iter()).enumerate() {
        let sel = match entry {
            None => DimSelection::Full,
            Some(e) => parse_dim(e, axis, dim.extent, options)?,
        };
        dims.push(sel);
    }
    Ok(Selection::Dims(dims))
}

fn parse_dim(
    entry: &IndexArg,
    axis: usize,
    extent: u64,
    options: &SelectionOptions,
) -> Result<DimSelection, SelectionError> {
    match entry {
        IndexArg::Int(i) => Ok(DimSelection::PointIndex { index: *i }),
        IndexArg::Slice(sl) => Ok(parse_slice(sl, extent)?),
        IndexArg::IndexList(values) => Ok(parse_index_list(values, options)?),
        IndexArg::Mask(mask) => {
            if mask.len() as u64 != extent {
                return Err(SelectionError::MaskLengthMismatch {
                    axis,
                    expected: extent,
                    got: mask.len(),
                });
            }
            Ok(DimSelection::MaskSelection { mask: mask.clone() })
        }
        IndexArg::None => Err(Malformed::NewAxis.into()),
        IndexArg::Unsupported(t) => Err(Malformed::UnsupportedType(t.clone()).into()),
        // removed by split_field/parse_dims
        IndexArg::Ellipsis => Err(Malformed::MultipleEllipses.into()),
        IndexArg::Field(_) => Err(Malformed::MultipleFields.into()),
        IndexArg::Tuple(_) | IndexArg::EmptyTuple => Err(Malformed::NestedTuple.into()),
    }
}

fn resolve_bound(bound: Option<i64>, default: i64, extent: i64) -> i64 {
    match bound {
        None => default,
        Some(b) if b < 0 => b + extent,
        Some(b) => b,
    }
}

fn parse_slice(sl: &SliceArg, extent: u64) -> Result<DimSelection, Malformed> {
    let step = sl.step.unwrap_or(1);
    if step <= 0 {
        return Err(Malformed::NonPositiveStep(step));
    }
    // descriptor extents never exceed i64::MAX
    let extent = extent as i64;
    Ok(DimSelection::Range {
        start: resolve_bound(sl.start, 0, extent),
        stop: resolve_bound(sl.stop, extent, extent),
        step: step as u64,
    })
}

/// Index lists must already be sorted and unique; they are never reordered here.
pub(crate) fn check_index_list(values: &[u64]) -> Result<(), Malformed> {
    for (a, b) in values.iter().tuple_windows() {
        if a == b {
            return Err(Malformed::RepeatedIndex(*a));
        }
        if b < a {
            return Err(Malformed::NonMonotonicIndexList(*b, *a));
        }
    }
    Ok(())
}

fn parse_index_list(values: &[i64], options: &SelectionOptions) -> Result<DimSelection, Malformed> {
    if values.is_empty() && !options.allow_empty_index_list() {
        return Err(Malformed::EmptyIndexList);
    }
    let indices = values
        .iter()
        .map(|v| u64::try_from(*v).map_err(|_| Malformed::NegativeListIndex(*v)))
        .collect::<Result<Vec<_>, _>>()?;
    check_index_list(&indices)?;
    Ok(DimSelection::IndexList { indices })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        data_type::{DataType, FloatSize, IntSize},
        error::ErrorKind,
        shape::{ElementKind, Field},
    };

    fn f32() -> ElementKind {
        DataType::Float(FloatSize::b32).into()
    }

    fn compound() -> ElementKind {
        ElementKind::Compound {
            fields: vec![
                Field::new("a", f32()),
                Field::new("b", DataType::Int(IntSize::b32).into()),
            ],
        }
    }

    fn p(arg: IndexArg, shape: &ShapeDescriptor) -> Result<(Selection, FieldSelection), SelectionError> {
        parse(&arg, shape, &SelectionOptions::default())
    }

    fn dims(arg: IndexArg, shape: &ShapeDescriptor) -> Vec<DimSelection> {
        p(arg, shape).unwrap().0.dims().to_vec()
    }

    fn kind(arg: IndexArg, shape: &ShapeDescriptor) -> ErrorKind {
        p(arg, shape).unwrap_err().kind()
    }

    #[test]
    fn ellipsis_equals_empty_tuple() {
        for extents in [vec![], vec![0], vec![13], vec![4, 6, 8]] {
            let shape = ShapeDescriptor::new(&extents, f32()).unwrap();
            assert_eq!(p(IndexArg::Ellipsis, &shape), p(IndexArg::EmptyTuple, &shape));
        }
    }

    #[test]
    fn slice_normalisation() {
        let shape = ShapeDescriptor::new(&[13], f32()).unwrap();
        assert_eq!(
            dims((..).into(), &shape),
            vec![DimSelection::Range {
                start: 0,
                stop: 13,
                step: 1
            }]
        );
        assert_eq!(
            dims(SliceArg::new(Some(-8), Some(-2), Some(3)).into(), &shape),
            vec![DimSelection::Range {
                start: 5,
                stop: 11,
                step: 3
            }]
        );
        // out of range bounds are left for the validator
        assert_eq!(
            dims(SliceArg::new(Some(100), Some(400), Some(3)).into(), &shape),
            vec![DimSelection::Range {
                start: 100,
                stop: 400,
                step: 3
            }]
        );
    }

    #[test]
    fn bad_steps() {
        let shape = ShapeDescriptor::new(&[13], f32()).unwrap();
        for step in [-1, 0] {
            assert_eq!(
                p(SliceArg::default().with_step(step).into(), &shape),
                Err(Malformed::NonPositiveStep(step).into())
            );
        }
    }

    #[test]
    fn index_lists() {
        let shape = ShapeDescriptor::new(&[13], f32()).unwrap();
        assert_eq!(
            p(IndexArg::IndexList(vec![1, 3, 2]), &shape),
            Err(Malformed::NonMonotonicIndexList(2, 3).into())
        );
        assert_eq!(
            p(IndexArg::IndexList(vec![1, 1, 2]), &shape),
            Err(Malformed::RepeatedIndex(1).into())
        );
        assert_eq!(
            p(IndexArg::IndexList(vec![-1, 2]), &shape),
            Err(Malformed::NegativeListIndex(-1).into())
        );
        // bounds are not checked here
        assert_eq!(
            dims(IndexArg::IndexList(vec![100]), &shape),
            vec![DimSelection::IndexList { indices: vec![100] }]
        );
    }

    #[test]
    fn empty_index_list_option() {
        let shape = ShapeDescriptor::new(&[13], f32()).unwrap();
        assert!(p(IndexArg::IndexList(vec![]), &shape).is_ok());
        let strict = SelectionOptions::default().with_allow_empty_index_list(false);
        assert_eq!(
            parse(&IndexArg::IndexList(vec![]), &shape, &strict),
            Err(Malformed::EmptyIndexList.into())
        );
    }

    #[test]
    fn masks() {
        let shape = ShapeDescriptor::new(&[3], f32()).unwrap();
        assert_eq!(
            dims(vec![true, false, true].into(), &shape),
            vec![DimSelection::MaskSelection {
                mask: vec![true, false, true]
            }]
        );
        assert_eq!(kind(vec![true, false].into(), &shape), ErrorKind::MaskLengthMismatch);
    }

    #[test]
    fn rank_handling() {
        let shape = ShapeDescriptor::new(&[4, 6, 8], f32()).unwrap();
        // bare argument applies to the first axis
        assert_eq!(
            dims(IndexArg::Int(1), &shape),
            vec![
                DimSelection::PointIndex { index: 1 },
                DimSelection::Full,
                DimSelection::Full
            ]
        );
        assert_eq!(
            kind(vec![IndexArg::Int(1), IndexArg::Int(2)].into(), &shape),
            ErrorKind::MalformedArgument
        );
        assert_eq!(
            p(vec![IndexArg::Int(1); 4].into(), &shape),
            Err(Malformed::TooManyIndices { given: 4, rank: 3 }.into())
        );
        assert_eq!(
            dims(
                vec![IndexArg::Ellipsis, IndexArg::Int(2)].into(),
                &shape
            ),
            vec![
                DimSelection::Full,
                DimSelection::Full,
                DimSelection::PointIndex { index: 2 }
            ]
        );
        assert_eq!(
            p(vec![IndexArg::Ellipsis, IndexArg::Ellipsis].into(), &shape),
            Err(Malformed::MultipleEllipses.into())
        );
    }

    #[test]
    fn scalar_dataset() {
        let shape = ShapeDescriptor::scalar(f32()).unwrap();
        assert_eq!(p(IndexArg::Ellipsis, &shape).unwrap().0, Selection::EntireScalar);
        for arg in [
            IndexArg::Int(0),
            (0..4).into(),
            IndexArg::IndexList(vec![1, 2, 5]),
            IndexArg::IndexList(vec![]),
            vec![true].into(),
        ] {
            assert_eq!(p(arg, &shape), Err(Malformed::ScalarDataset.into()));
        }
    }

    #[test]
    fn field_names() {
        let plain = ShapeDescriptor::new(&[13], f32()).unwrap();
        for name in ["field", "a", ""] {
            assert_eq!(kind(name.into(), &plain), ErrorKind::FieldNotApplicable);
        }

        let scalar = ShapeDescriptor::scalar(compound()).unwrap();
        assert_eq!(
            p("a".into(), &scalar),
            Ok((Selection::EntireScalar, FieldSelection::Field("a".into())))
        );

        let shape = ShapeDescriptor::new(&[5], compound()).unwrap();
        let (sel, field) = p(IndexArg::Tuple(vec![(1..3).into(), "b".into()]), &shape).unwrap();
        assert_eq!(field, FieldSelection::Field("b".into()));
        assert_eq!(sel.dims().len(), 1);
        assert_eq!(
            p(IndexArg::Tuple(vec!["a".into(), "b".into()]), &shape),
            Err(Malformed::MultipleFields.into())
        );
        // unknown names are the validator's concern
        assert!(p("zzz".into(), &shape).is_ok());
    }

    #[test]
    fn rejected_types() {
        let shape = ShapeDescriptor::new(&[13], f32()).unwrap();
        assert_eq!(p(IndexArg::None, &shape), Err(Malformed::NewAxis.into()));
        assert_eq!(
            p(IndexArg::Unsupported("mapping".into()), &shape),
            Err(Malformed::UnsupportedType("mapping".into()).into())
        );
        assert_eq!(
            p(vec![IndexArg::Tuple(vec![IndexArg::Int(0)])].into(), &shape),
            Err(Malformed::NestedTuple.into())
        );
    }
}
