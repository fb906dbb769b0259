//! Translation of numpy-style index arguments into validated dataset
//! selections and the shape of the data they select.
//!
//! The pipeline is [parse::parse], then [validate::validate], then
//! [result::result_shape]; [select] runs all three.
use log::debug;
use smallvec::SmallVec;

pub mod argument;
pub mod config;
pub mod data_type;
pub mod error;
pub mod extract;
pub mod parse;
pub mod result;
pub mod selection;
pub mod shape;
mod util;
pub mod validate;

pub use argument::{ArgumentSyntaxError, IndexArg, SliceArg};
pub use config::{Config, ConfigError, SelectionOptions};
pub use error::{ErrorKind, SelectionError};
pub use extract::ExtractError;
pub use result::{Boxing, ItemKind, ResultDescriptor};
pub use selection::{DimSelection, FieldSelection, Selection};
pub use shape::{DescriptorError, Dimension, ElementKind, Field, ShapeDescriptor};
pub use util::DimensionMismatch;
pub use validate::ValidatedSelection;

const COORD_SMALLVEC_SIZE: usize = 6;

pub type CoordVec<T> = SmallVec<[T; COORD_SMALLVEC_SIZE]>;

pub trait Ndim {
    fn ndim(&self) -> usize;

    fn same_ndim<T: Ndim>(&self, other: &T) -> Result<usize, DimensionMismatch> {
        let n = self.ndim();
        DimensionMismatch::check_coords(other.ndim(), n)?;
        Ok(n)
    }
}

/// Parse, validate and describe `arg` against `shape`.
pub fn select(
    arg: &IndexArg,
    shape: &ShapeDescriptor,
    options: &SelectionOptions,
) -> Result<(ValidatedSelection, ResultDescriptor), SelectionError> {
    let (selection, field) = parse::parse(arg, shape, options)?;
    let validated = validate::validate(&selection, &field, shape)?;
    let result = result::result_shape(&validated, shape)?;
    debug!(
        "Selection `{}` yields shape {:?} of {:?}",
        arg, result.shape, result.item_kind
    );
    Ok((validated, result))
}

#[cfg(test)]
mod tests {
    use super::*;
    use data_type::{DataType, FloatSize};

    #[test]
    fn select_pipeline() {
        let shape = ShapeDescriptor::new(&[4, 6, 8], DataType::Float(FloatSize::b32).into()).unwrap();
        let arg: IndexArg = "1, 2:4, 3:6".parse().unwrap();
        let (valid, res) = select(&arg, &shape, &SelectionOptions::default()).unwrap();
        assert_eq!(valid.num_elements(), res.num_elements());
        assert_eq!(valid.same_ndim(&shape), Ok(3));
        assert!(res.same_ndim(&shape).is_err());
    }
}
