//! Structural IR checks.
//!
//! The linker trusts its input; this validator exists so tests and frontends
//! can catch malformed interfaces early instead of tripping linker
//! assertions later.

use thiserror::Error;

use crate::shader::Shader;
use crate::variable::VariableMode;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ValidateError {
    #[error("variable `{name}` has location_frac {frac}, must be 0..=3")]
    LocationFracOutOfRange { name: String, frac: u8 },
    #[error("variable `{name}` spans past component 3 (frac {frac} + {components} components)")]
    ComponentOverflow { name: String, frac: u8, components: u8 },
    #[error("64-bit variable `{name}` has location_frac {frac}, must be 0 or 2")]
    DoubleFracMisaligned { name: String, frac: u8 },
    #[error("compact variable `{name}` must be an array of scalars")]
    NonScalarCompact { name: String },
    #[error("per-vertex variable `{name}` must have an array type")]
    PerVertexNotArray { name: String },
    #[error("temp variable `{name}` still carries location {location}")]
    TempWithLocation { name: String, location: u32 },
}

impl Shader {
    /// Checks the structural invariants the linker assumes.
    pub fn validate(&self) -> Result<(), ValidateError> {
        for var in &self.vars {
            let name = || var.name.clone();

            if var.mode == VariableMode::Temp {
                if let Some(location) = var.location {
                    return Err(ValidateError::TempWithLocation { name: name(), location });
                }
                continue;
            }

            if var.location_frac > 3 {
                return Err(ValidateError::LocationFracOutOfRange {
                    name: name(),
                    frac: var.location_frac,
                });
            }

            if (var.is_per_vertex(self.stage) || var.per_view) && !var.ty.is_array() {
                return Err(ValidateError::PerVertexNotArray { name: name() });
            }

            if var.compact {
                let ty = var.interface_type(self.stage);
                let elem_ok = ty
                    .array_element()
                    .is_some_and(|e| e.is_scalar());
                if !elem_ok {
                    return Err(ValidateError::NonScalarCompact { name: name() });
                }
                continue;
            }

            let ty = var.interface_type(self.stage);
            if ty.is_vector_or_scalar() {
                if ty.is_64bit() {
                    if var.location_frac != 0 && var.location_frac != 2 {
                        return Err(ValidateError::DoubleFracMisaligned {
                            name: name(),
                            frac: var.location_frac,
                        });
                    }
                } else if var.location_frac + ty.vector_size() > 4 {
                    return Err(ValidateError::ComponentOverflow {
                        name: name(),
                        frac: var.location_frac,
                        components: ty.vector_size(),
                    });
                }
            }
        }
        Ok(())
    }
}
