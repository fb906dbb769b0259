use serde::{Deserialize, Serialize};

use crate::{CoordVec, Ndim};

/// Canonical selection along one dimension.
///
/// Produced by the parser; the validator resolves it against an extent
/// (negative point indices remapped, ranges clamped) and returns the same
/// type, so validated selections can be validated again.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq, Hash)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum DimSelection {
    Full,
    Range { start: i64, stop: i64, step: u64 },
    /// Strictly increasing.
    IndexList { indices: Vec<u64> },
    /// Removes the dimension from the result.
    PointIndex { index: i64 },
    MaskSelection { mask: Vec<bool> },
}

impl DimSelection {
    pub fn is_point(&self) -> bool {
        matches!(self, Self::PointIndex { .. })
    }

    /// Number of selected indices, given a resolved selection and its extent.
    pub fn count(&self, extent: u64) -> u64 {
        match self {
            Self::Full => extent,
            Self::Range { start, stop, step } => {
                if stop > start {
                    ((*stop - *start) as u64 - 1) / step + 1
                } else {
                    0
                }
            }
            Self::IndexList { indices } => indices.len() as u64,
            Self::PointIndex { .. } => 1,
            Self::MaskSelection { mask } => mask.iter().filter(|b| **b).count() as u64,
        }
    }

    /// Selected indices in ascending order, given a resolved selection and its extent.
    pub fn indices(&self, extent: u64) -> Vec<u64> {
        match self {
            Self::Full => (0..extent).collect(),
            Self::Range { start, stop, step } => (*start..*stop)
                .step_by(*step as usize)
                .map(|i| i as u64)
                .collect(),
            Self::IndexList { indices } => indices.clone(),
            Self::PointIndex { index } => vec![*index as u64],
            Self::MaskSelection { mask } => mask
                .iter()
                .enumerate()
                .filter_map(|(i, b)| b.then_some(i as u64))
                .collect(),
        }
    }
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum Selection {
    /// The single element of a rank-0 dataset.
    EntireScalar,
    Dims(CoordVec<DimSelection>),
}

impl Ndim for Selection {
    fn ndim(&self) -> usize {
        match self {
            Self::EntireScalar => 0,
            Self::Dims(d) => d.len(),
        }
    }
}

impl Selection {
    pub fn full(rank: usize) -> Self {
        if rank == 0 {
            Self::EntireScalar
        } else {
            Self::Dims((0..rank).map(|_| DimSelection::Full).collect())
        }
    }

    pub fn dims(&self) -> &[DimSelection] {
        match self {
            Self::EntireScalar => &[],
            Self::Dims(d) => d.as_slice(),
        }
    }

    /// True for a rank-0 selection, or one made only of point indices.
    pub fn is_single_element(&self) -> bool {
        self.dims().iter().all(DimSelection::is_point)
    }
}

/// Narrowing of a compound element type to one of its fields.
#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum FieldSelection {
    #[default]
    All,
    Field(String),
}

impl FieldSelection {
    pub fn name(&self) -> Option<&str> {
        match self {
            Self::All => None,
            Self::Field(f) => Some(f.as_str()),
        }
    }
}
