use ndarray::{ArrayD, ArrayViewD, Axis, IxDyn, SliceInfo, SliceInfoElem};
use thiserror::Error;

use crate::{selection::DimSelection, util::DimensionMismatch, validate::ValidatedSelection, CoordVec};

#[derive(Error, Debug)]
pub enum ExtractError {
    #[error("Array has the wrong dimensionality")]
    DimensionMismatch(#[from] DimensionMismatch),
    #[error("Array shape {actual:?} does not match validated extents {expected:?}")]
    ShapeMismatch {
        expected: CoordVec<u64>,
        actual: CoordVec<u64>,
    },
}

fn to_usize(coord: &[u64]) -> Vec<usize> {
    coord.iter().map(|n| *n as usize).collect()
}

impl ValidatedSelection {
    /// `ndarray` slicing equivalent to this selection, if every dimension
    /// is full, a range or a point index.
    pub fn slice_info(&self) -> Option<SliceInfo<Vec<SliceInfoElem>, IxDyn, IxDyn>> {
        let mut elems = Vec::with_capacity(self.selection().dims().len());
        for dim in self.selection().dims().iter() {
            let el = match dim {
                DimSelection::Full => SliceInfoElem::Slice {
                    start: 0,
                    end: None,
                    step: 1,
                },
                DimSelection::Range { start, stop, step } => SliceInfoElem::Slice {
                    start: isize::try_from(*start).ok()?,
                    end: Some(isize::try_from(*stop).ok()?),
                    step: isize::try_from(*step).ok()?,
                },
                DimSelection::PointIndex { index } => {
                    SliceInfoElem::Index(isize::try_from(*index).ok()?)
                }
                DimSelection::IndexList { .. } | DimSelection::MaskSelection { .. } => {
                    return None
                }
            };
            elems.push(el);
        }
        SliceInfo::try_from(elems).ok()
    }

    /// Apply this selection to an in-memory copy of the whole dataset.
    ///
    /// The output has the dataset part of the result shape, i.e. point
    /// indices remove their axis. Fixed-size array elements are not expanded.
    pub fn extract<T: Clone>(&self, array: ArrayViewD<T>) -> Result<ArrayD<T>, ExtractError> {
        DimensionMismatch::check_coords(array.ndim(), self.extents().len())?;
        let actual: CoordVec<u64> = array.shape().iter().map(|s| *s as u64).collect();
        if actual.as_slice() != self.extents() {
            return Err(ExtractError::ShapeMismatch {
                expected: self.extents().iter().copied().collect(),
                actual,
            });
        }

        let mut out = array.to_owned();
        let mut points = Vec::default();
        for (axis, dim) in self.selection().dims().iter().enumerate() {
            if let DimSelection::Full = dim {
                continue;
            }
            let indices = to_usize(&dim.indices(self.extents()[axis]));
            out = out.select(Axis(axis), &indices);
            if dim.is_point() {
                points.push(axis);
            }
        }
        // highest first, so earlier axis numbers stay valid
        for axis in points.into_iter().rev() {
            out = out.index_axis_move(Axis(axis), 0);
        }
        Ok(out)
    }
}
