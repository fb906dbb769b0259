use serde::{Deserialize, Serialize};

use crate::{
    argument::IndexArg,
    error::SelectionError,
    selection::{DimSelection, FieldSelection},
    shape::{ElementKind, ShapeDescriptor},
    validate::ValidatedSelection,
    CoordVec, Ndim,
};

#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum ItemKind {
    /// A single value of a plain type.
    ScalarItem,
    /// A single record of a compound type.
    CompoundRecord,
    NdArray,
}

/// How the presentation layer should box a single-element result.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Boxing {
    /// The item itself, e.g. a float or a record.
    Bare,
    /// A container; zero-dimensional if the shape is empty.
    Wrapped,
}

/// Shape and element type a selection produces.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct ResultDescriptor {
    pub shape: CoordVec<u64>,
    /// Element type after field narrowing, with fixed-size array types
    /// promoted into `shape`.
    pub element: ElementKind,
    pub item_kind: ItemKind,
}

impl Ndim for ResultDescriptor {
    fn ndim(&self) -> usize {
        self.shape.len()
    }
}

impl ResultDescriptor {
    pub fn num_elements(&self) -> u64 {
        self.shape.iter().product()
    }

    pub fn is_empty(&self) -> bool {
        self.num_elements() == 0
    }

    /// Arrays are always wrapped. A single item is bare unless the argument
    /// contained an ellipsis, which asks for a (zero-dimensional) container.
    pub fn boxing(&self, arg: &IndexArg) -> Boxing {
        match self.item_kind {
            ItemKind::NdArray => Boxing::Wrapped,
            _ if arg.has_ellipsis() => Boxing::Wrapped,
            _ => Boxing::Bare,
        }
    }
}

/// Compute what reading `selection` from a dataset described by `shape` yields.
///
/// Point-indexed dimensions are dropped; every other dimension contributes
/// its selected count. Fails only if `shape` is not the one the selection
/// was validated against (its field has gone missing).
pub fn result_shape(
    selection: &ValidatedSelection,
    shape: &ShapeDescriptor,
) -> Result<ResultDescriptor, SelectionError> {
    let mut out: CoordVec<u64> = selection
        .selection()
        .dims()
        .iter()
        .zip(selection.extents().iter())
        .filter(|(d, _)| !matches!(d, DimSelection::PointIndex { .. }))
        .map(|(d, e)| d.count(*e))
        .collect();

    let narrowed = match selection.field() {
        FieldSelection::All => shape.element(),
        FieldSelection::Field(name) => {
            &shape
                .element()
                .field(name)
                .ok_or_else(|| SelectionError::UnknownField {
                    field: name.clone(),
                    available: shape.element().field_names(),
                })?
                .kind
        }
    };
    let (sub_shape, element) = narrowed.promoted();
    out.extend(sub_shape);

    let item_kind = if !out.is_empty() {
        ItemKind::NdArray
    } else if element.is_compound() {
        ItemKind::CompoundRecord
    } else {
        ItemKind::ScalarItem
    };

    Ok(ResultDescriptor {
        shape: out,
        element: element.clone(),
        item_kind,
    })
}
