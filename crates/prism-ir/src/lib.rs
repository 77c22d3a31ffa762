//! The shader intermediate representation consumed by the prism linker.
//!
//! This crate is intentionally small: it models exactly the part of a shader
//! the inter-stage linker needs to see: interface variables with their
//! location/interpolation metadata, a type descriptor able to answer slot
//! counting queries, and a linear instruction stream restricted to the
//! load/store/interpolate operations that address interface variables.
//! Frontends that produce this IR and backends that consume the linker's
//! driver locations live elsewhere.

#![forbid(unsafe_code)]

pub mod instr;
pub mod limits;
pub mod shader;
pub mod types;
mod validate;
pub mod variable;

/// Helpers for building synthetic shaders in tests.
///
/// Only available when compiling this crate's own tests, or when the
/// `test-utils` feature is enabled. Not part of the stable API.
#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;

pub use crate::instr::{AluOp, Block, Function, Immediate, Instr, InterpOp, ValueId};
pub use crate::shader::{Shader, ShaderInfo, Stage};
pub use crate::types::{Scalar, ScalarKind, Type};
pub use crate::validate::ValidateError;
pub use crate::variable::{ComponentMask, Interpolation, VarId, Variable, VariableMode};
