//! Shader interface variables and their linker-visible metadata.

use bitflags::bitflags;

use crate::limits::SLOT_VAR0;
use crate::shader::Stage;
use crate::types::Type;

/// Index of a variable within its owning shader.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct VarId(pub u32);

/// Storage class of a variable, as far as the linker cares.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum VariableMode {
    /// Stage input (read from the previous stage or from vertex attributes).
    Input,
    /// Stage output (written for the next stage or the framebuffer).
    Output,
    /// System-generated value (read-only builtin).
    SystemValue,
    /// Plain shader-local storage. Dead interface variables are demoted to
    /// this mode and left for dead-code elimination.
    Temp,
}

/// Interpolation qualifier. The declaration order is the grouping order the
/// compactor sorts by.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub enum Interpolation {
    #[default]
    None,
    Smooth,
    Flat,
    NoPerspective,
}

bitflags! {
    /// Mask over the four 32-bit components of one varying slot.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct ComponentMask: u8 {
        const X = 1 << 0;
        const Y = 1 << 1;
        const Z = 1 << 2;
        const W = 1 << 3;
    }
}

impl ComponentMask {
    /// Mask of `count` consecutive components starting at `start`. Bits past
    /// component 3 are discarded.
    pub fn span(start: u8, count: u8) -> Self {
        let bits = ((1u32 << count) - 1) << start;
        Self::from_bits_truncate(bits as u8)
    }

    pub fn single(component: u8) -> Self {
        Self::from_bits_truncate(1 << component)
    }
}

/// One shader interface variable.
///
/// Created by a frontend, consumed and mutated in place by the linker
/// (`mode`, `location`, `location_frac`, `always_active_io` and
/// `driver_location` all change under linking).
#[derive(Debug, Clone, PartialEq)]
pub struct Variable {
    pub name: String,
    pub mode: VariableMode,
    pub ty: Type,
    /// Semantic slot. `None` means an unassigned builtin; such a variable
    /// contributes nothing to usage masks.
    pub location: Option<u32>,
    /// Sub-slot component offset, 0–3.
    pub location_frac: u8,
    /// Explicit output index (dual-source blending), 0 or 1.
    pub index: u8,
    /// Per-patch rather than per-vertex.
    pub patch: bool,
    /// Replicated per view; the type carries an outer array wrapper.
    pub per_view: bool,
    /// Array-of-scalars packed at component granularity (clip/cull
    /// distances). Bypasses the varying compactor.
    pub compact: bool,
    /// Must not be repacked or demoted (transform-feedback captured, or
    /// otherwise externally visible).
    pub always_active_io: bool,
    /// Captured by explicit transform feedback.
    pub explicit_xfb_buffer: bool,
    pub interpolation: Interpolation,
    pub sample: bool,
    pub centroid: bool,
    /// Final dense index assigned by the location assigner.
    pub driver_location: u32,
}

impl Variable {
    pub fn new(name: impl Into<String>, mode: VariableMode, ty: Type) -> Self {
        Variable {
            name: name.into(),
            mode,
            ty,
            location: None,
            location_frac: 0,
            index: 0,
            patch: false,
            per_view: false,
            compact: false,
            always_active_io: false,
            explicit_xfb_buffer: false,
            interpolation: Interpolation::None,
            sample: false,
            centroid: false,
            driver_location: 0,
        }
    }

    /// Whether the variable's type wraps a per-vertex array: inputs of the
    /// tessellation and geometry stages, and tessellation-control outputs.
    /// Patch variables are never per-vertex.
    pub fn is_per_vertex(&self, stage: Stage) -> bool {
        if self.patch {
            return false;
        }
        match self.mode {
            VariableMode::Input => matches!(
                stage,
                Stage::TessControl | Stage::TessEval | Stage::Geometry
            ),
            VariableMode::Output => stage == Stage::TessControl,
            _ => false,
        }
    }

    /// The type of one interface element: strips the per-vertex / per-view
    /// array wrapper when present.
    pub fn interface_type(&self, stage: Stage) -> &Type {
        if self.is_per_vertex(stage) || self.per_view {
            self.ty
                .array_element()
                .expect("per-vertex interface variable must have an array type")
        } else {
            &self.ty
        }
    }

    /// VAR0-relative index of a generic varying, `None` for builtins and
    /// unassigned locations.
    pub fn generic_location(&self) -> Option<u32> {
        self.location.and_then(|loc| loc.checked_sub(SLOT_VAR0))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Scalar;

    #[test]
    fn component_mask_spans() {
        assert_eq!(ComponentMask::span(0, 4), ComponentMask::all());
        assert_eq!(
            ComponentMask::span(2, 2),
            ComponentMask::Z | ComponentMask::W
        );
        assert_eq!(ComponentMask::span(0, 0), ComponentMask::empty());
    }

    #[test]
    fn per_vertex_classification() {
        let mut var = Variable::new(
            "v",
            VariableMode::Input,
            Type::array(Type::vec(Scalar::F32, 4), 32),
        );
        assert!(var.is_per_vertex(Stage::TessControl));
        assert!(var.is_per_vertex(Stage::Geometry));
        assert!(!var.is_per_vertex(Stage::Vertex));
        assert_eq!(
            var.interface_type(Stage::Geometry),
            &Type::vec(Scalar::F32, 4)
        );

        var.patch = true;
        assert!(!var.is_per_vertex(Stage::TessControl));

        var.patch = false;
        var.mode = VariableMode::Output;
        assert!(var.is_per_vertex(Stage::TessControl));
        assert!(!var.is_per_vertex(Stage::TessEval));
    }
}
