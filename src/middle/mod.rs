//! Middle module - Type Mapping, Argument Normalization, Overrides, Ham Validation

pub mod types;
pub mod ham_types;
pub mod normalize;
pub mod overrides;
pub mod validate;
