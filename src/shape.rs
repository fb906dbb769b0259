use std::collections::HashSet;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::{
    data_type::{DataType, NBytes},
    error::NonCompound,
    util::DimensionMismatch,
    CoordVec, Ndim,
};

/// One axis of a dataset.
///
/// `extent` is the current size and is what every bounds check uses;
/// `resizable` only records that the dataset may grow along this axis.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Dimension {
    pub extent: u64,
    #[serde(default)]
    pub resizable: bool,
}

impl Dimension {
    pub fn fixed(extent: u64) -> Self {
        Self {
            extent,
            resizable: false,
        }
    }

    pub fn resizable(extent: u64) -> Self {
        Self {
            extent,
            resizable: true,
        }
    }
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct Field {
    pub name: String,
    pub kind: ElementKind,
}

impl Field {
    pub fn new<S: Into<String>>(name: S, kind: ElementKind) -> Self {
        Self {
            name: name.into(),
            kind,
        }
    }
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
#[serde(tag = "class", rename_all = "snake_case")]
pub enum ElementKind {
    Scalar {
        data_type: DataType,
    },
    Compound {
        fields: Vec<Field>,
    },
    FixedArray {
        base: Box<ElementKind>,
        sub_shape: CoordVec<u64>,
    },
}

impl From<DataType> for ElementKind {
    fn from(data_type: DataType) -> Self {
        Self::Scalar { data_type }
    }
}

impl NBytes for ElementKind {
    fn nbytes(&self) -> usize {
        match self {
            Self::Scalar { data_type } => data_type.nbytes(),
            Self::Compound { fields } => fields.iter().map(|f| f.kind.nbytes()).sum(),
            Self::FixedArray { base, sub_shape } => {
                sub_shape.iter().product::<u64>() as usize * base.nbytes()
            }
        }
    }
}

impl ElementKind {
    pub fn fixed_array<S: Into<CoordVec<u64>>>(base: ElementKind, sub_shape: S) -> Self {
        Self::FixedArray {
            base: Box::new(base),
            sub_shape: sub_shape.into(),
        }
    }

    pub fn is_compound(&self) -> bool {
        matches!(self, Self::Compound { .. })
    }

    pub fn field(&self, name: &str) -> Option<&Field> {
        match self {
            Self::Compound { fields } => fields.iter().find(|f| f.name == name),
            _ => None,
        }
    }

    pub fn field_names(&self) -> Vec<String> {
        match self {
            Self::Compound { fields } => fields.iter().map(|f| f.name.clone()).collect(),
            _ => Vec::default(),
        }
    }

    /// Describes why this kind has no fields, or `None` if it is compound.
    pub(crate) fn non_compound(&self) -> Option<NonCompound> {
        match self {
            Self::Scalar { data_type } => Some(NonCompound::Scalar(*data_type)),
            Self::Compound { .. } => None,
            Self::FixedArray { .. } => Some(NonCompound::FixedArray),
        }
    }

    /// Strip (possibly nested) fixed-size array types, returning the
    /// innermost element and the sub-shape they contribute to a read.
    pub fn promoted(&self) -> (CoordVec<u64>, &ElementKind) {
        let mut sub = CoordVec::new();
        let mut current = self;
        while let Self::FixedArray { base, sub_shape } = current {
            sub.extend(sub_shape.iter().copied());
            current = base;
        }
        (sub, current)
    }

    fn check_fields(&self) -> Result<(), DescriptorError> {
        match self {
            Self::Scalar { .. } => Ok(()),
            Self::Compound { fields } => {
                if fields.is_empty() {
                    return Err(DescriptorError::EmptyCompound);
                }
                let mut seen = HashSet::with_capacity(fields.len());
                for f in fields.iter() {
                    if !seen.insert(f.name.as_str()) {
                        return Err(DescriptorError::DuplicateField(f.name.clone()));
                    }
                    f.kind.check_fields()?;
                }
                Ok(())
            }
            Self::FixedArray { base, .. } => base.check_fields(),
        }
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DescriptorError {
    #[error("Compound type declares field `{0}` more than once")]
    DuplicateField(String),
    #[error("Compound type has no fields")]
    EmptyCompound,
    #[error("Extent {extent} of axis {axis} exceeds the largest signed 64-bit index")]
    ExtentTooLarge { axis: usize, extent: u64 },
    #[error("Resizability flags do not match dimensions")]
    DimensionMismatch(#[from] DimensionMismatch),
}

#[derive(Deserialize)]
struct RawShapeDescriptor {
    dims: CoordVec<Dimension>,
    element: ElementKind,
}

/// Snapshot of a dataset's shape and element type, taken once per selection.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
#[serde(try_from = "RawShapeDescriptor")]
pub struct ShapeDescriptor {
    dims: CoordVec<Dimension>,
    element: ElementKind,
}

impl TryFrom<RawShapeDescriptor> for ShapeDescriptor {
    type Error = DescriptorError;

    fn try_from(raw: RawShapeDescriptor) -> Result<Self, Self::Error> {
        Self::from_dims(raw.dims, raw.element)
    }
}

impl Ndim for ShapeDescriptor {
    fn ndim(&self) -> usize {
        self.dims.len()
    }
}

impl ShapeDescriptor {
    pub fn from_dims<D: Into<CoordVec<Dimension>>>(
        dims: D,
        element: ElementKind,
    ) -> Result<Self, DescriptorError> {
        element.check_fields()?;
        let dims: CoordVec<Dimension> = dims.into();
        for (axis, d) in dims.iter().enumerate() {
            if i64::try_from(d.extent).is_err() {
                return Err(DescriptorError::ExtentTooLarge {
                    axis,
                    extent: d.extent,
                });
            }
        }
        Ok(Self { dims, element })
    }

    /// Non-resizable dataset with the given extents.
    pub fn new(extents: &[u64], element: ElementKind) -> Result<Self, DescriptorError> {
        Self::from_dims(
            extents
                .iter()
                .map(|e| Dimension::fixed(*e))
                .collect::<CoordVec<_>>(),
            element,
        )
    }

    /// Fails if the flags do not match the extents in length.
    pub fn with_resizable(
        extents: &[u64],
        resizable: &[bool],
        element: ElementKind,
    ) -> Result<Self, DescriptorError> {
        DimensionMismatch::check_coords(resizable.len(), extents.len())?;
        Self::from_dims(
            extents
                .iter()
                .zip(resizable.iter())
                .map(|(e, r)| Dimension {
                    extent: *e,
                    resizable: *r,
                })
                .collect::<CoordVec<_>>(),
            element,
        )
    }

    pub fn scalar(element: ElementKind) -> Result<Self, DescriptorError> {
        Self::from_dims(CoordVec::new(), element)
    }

    pub fn rank(&self) -> usize {
        self.ndim()
    }

    pub fn is_scalar(&self) -> bool {
        self.dims.is_empty()
    }

    pub fn dims(&self) -> &[Dimension] {
        &self.dims
    }

    pub fn extent(&self, axis: usize) -> Option<u64> {
        self.dims.get(axis).map(|d| d.extent)
    }

    pub fn extents(&self) -> CoordVec<u64> {
        self.dims.iter().map(|d| d.extent).collect()
    }

    pub fn is_resizable(&self, axis: usize) -> bool {
        self.dims.get(axis).map_or(false, |d| d.resizable)
    }

    pub fn element(&self) -> &ElementKind {
        &self.element
    }

    /// Number of logical elements; 1 for a scalar dataset.
    pub fn num_elements(&self) -> u64 {
        self.dims.iter().map(|d| d.extent).product()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data_type::{FloatSize, IntSize};

    fn abc() -> ElementKind {
        ElementKind::Compound {
            fields: vec![
                Field::new("a", DataType::Float(FloatSize::b32).into()),
                Field::new("b", DataType::Int(IntSize::b32).into()),
                Field::new("c", DataType::FixedString(10).into()),
            ],
        }
    }

    #[test]
    fn compound_fields() {
        let kind = abc();
        assert!(kind.is_compound());
        assert_eq!(kind.field_names(), vec!["a", "b", "c"]);
        assert_eq!(kind.nbytes(), 18);
        assert!(kind.field("b").is_some());
        assert!(kind.field("d").is_none());
    }

    #[test]
    fn duplicate_field_rejected() {
        let kind = ElementKind::Compound {
            fields: vec![
                Field::new("a", DataType::Bool.into()),
                Field::new("a", DataType::Bool.into()),
            ],
        };
        assert_eq!(
            ShapeDescriptor::scalar(kind),
            Err(DescriptorError::DuplicateField("a".into()))
        );
    }

    #[test]
    fn resizable_flags_must_match() {
        let f32: ElementKind = DataType::Float(FloatSize::b32).into();
        let shape = ShapeDescriptor::with_resizable(&[0, 3], &[true, false], f32.clone()).unwrap();
        assert!(shape.is_resizable(0));
        assert!(!shape.is_resizable(1));
        assert_eq!(shape.num_elements(), 0);
        assert!(ShapeDescriptor::with_resizable(&[0, 3], &[true], f32).is_err());
    }

    #[test]
    fn extents_fit_signed_indices() {
        let f32: ElementKind = DataType::Float(FloatSize::b32).into();
        assert!(ShapeDescriptor::new(&[i64::MAX as u64], f32.clone()).is_ok());
        assert_eq!(
            ShapeDescriptor::new(&[3, u64::MAX], f32),
            Err(DescriptorError::ExtentTooLarge {
                axis: 1,
                extent: u64::MAX
            })
        );
        let s = r#"{"dims": [{"extent": 18446744073709551615}], "element": {"class": "scalar", "data_type": "bool"}}"#;
        assert!(serde_json::from_str::<ShapeDescriptor>(s).is_err());
    }

    #[test]
    fn promote_fixed_array() {
        let f32: ElementKind = DataType::Float(FloatSize::b32).into();
        let inner = ElementKind::fixed_array(f32.clone(), [2u64].as_slice());
        let outer = ElementKind::fixed_array(inner, [3u64].as_slice());
        let (sub, base) = outer.promoted();
        assert_eq!(sub.as_slice(), &[3, 2]);
        assert_eq!(base, &f32);
        assert_eq!(outer.nbytes(), 24);
    }

    #[test]
    fn deserialize_descriptor() {
        let s = r#"
            {
                "dims": [{"extent": 0, "resizable": true}, {"extent": 3}],
                "element": {"class": "scalar", "data_type": "float32"}
            }
        "#;
        let shape: ShapeDescriptor = serde_json::from_str(s).expect("Could not deserialize");
        assert_eq!(shape.rank(), 2);
        assert_eq!(shape.extents().as_slice(), &[0, 3]);
        assert!(shape.is_resizable(0));

        let bad = r#"
            {
                "dims": [],
                "element": {"class": "compound", "fields": []}
            }
        "#;
        assert!(serde_json::from_str::<ShapeDescriptor>(bad).is_err());
    }
}
