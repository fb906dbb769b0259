use std::fmt::Display;

use thiserror::Error;

use crate::data_type::DataType;

/// Structural reasons an indexing argument cannot be mapped to a selection.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Malformed {
    #[error("scalar datasets only accept `...` or `()`")]
    ScalarDataset,
    #[error("got {given} indices for a dataset of rank {rank}")]
    TooManyIndices { given: usize, rank: usize },
    #[error("got {given} indices for a dataset of rank {rank} and no ellipsis")]
    TooFewIndices { given: usize, rank: usize },
    #[error("at most one ellipsis may be given")]
    MultipleEllipses,
    #[error("at most one field name may be given")]
    MultipleFields,
    #[error("tuples cannot be nested inside an index tuple")]
    NestedTuple,
    #[error("`None` cannot be used as an index (new axes are not supported)")]
    NewAxis,
    #[error("unsupported argument type: {0}")]
    UnsupportedType(String),
    #[error("slice step must be positive, got {0}")]
    NonPositiveStep(i64),
    #[error("slice step {0} is too large")]
    StepTooLarge(u64),
    #[error("index list values must be non-negative, got {0}")]
    NegativeListIndex(i64),
    #[error("index list values must be strictly increasing, got {0} after {1}")]
    NonMonotonicIndexList(u64, u64),
    #[error("index list values must not repeat, got {0} twice")]
    RepeatedIndex(u64),
    #[error("empty index lists are not accepted")]
    EmptyIndexList,
    #[error("selection has {given} dimensions but the dataset has rank {rank}")]
    RankMismatch { given: usize, rank: usize },
}

/// A point or list index which falls outside its dimension.
///
/// `index` is `None` when an empty list is aimed at a zero-extent dimension,
/// where there is nothing to index at all. It is wide enough to hold both
/// negative point indices and any list entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutOfRange {
    pub axis: usize,
    pub index: Option<i128>,
    pub extent: u64,
}

impl Display for OutOfRange {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.index {
            Some(i) => write!(
                f,
                "index {} is out of range for axis {} with extent {}",
                i, self.axis, self.extent
            ),
            None => write!(f, "axis {} has zero extent; nothing to index", self.axis),
        }
    }
}

impl std::error::Error for OutOfRange {}

/// Element kinds which cannot be narrowed by field name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NonCompound {
    Scalar(DataType),
    FixedArray,
}

impl Display for NonCompound {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Scalar(dt) => write!(f, "scalar type {}", dt),
            Self::FixedArray => f.write_str("fixed-size array type"),
        }
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SelectionError {
    #[error("malformed indexing argument: {0}")]
    MalformedArgument(#[from] Malformed),
    #[error("field `{field}` requested but the dataset has {kind} (no fields)")]
    FieldNotApplicable { field: String, kind: NonCompound },
    #[error("field `{field}` does not exist; available fields are {available:?}")]
    UnknownField {
        field: String,
        available: Vec<String>,
    },
    #[error(transparent)]
    IndexOutOfRange(#[from] OutOfRange),
    #[error("boolean mask for axis {axis} has length {got}, expected {expected}")]
    MaskLengthMismatch {
        axis: usize,
        expected: u64,
        got: usize,
    },
}

/// Fieldless view of [SelectionError], for callers only interested in the category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    MalformedArgument,
    FieldNotApplicable,
    UnknownField,
    IndexOutOfRange,
    MaskLengthMismatch,
}

impl SelectionError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::MalformedArgument(_) => ErrorKind::MalformedArgument,
            Self::FieldNotApplicable { .. } => ErrorKind::FieldNotApplicable,
            Self::UnknownField { .. } => ErrorKind::UnknownField,
            Self::IndexOutOfRange(_) => ErrorKind::IndexOutOfRange,
            Self::MaskLengthMismatch { .. } => ErrorKind::MaskLengthMismatch,
        }
    }

    pub(crate) fn out_of_range(axis: usize, index: Option<i128>, extent: u64) -> Self {
        OutOfRange {
            axis,
            index,
            extent,
        }
        .into()
    }
}
