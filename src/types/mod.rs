//! Types and constant values

pub mod type_system;

pub use type_system::{types_equal, ConstantValue, Type};
