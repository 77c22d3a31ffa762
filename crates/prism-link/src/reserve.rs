//! Reservation of components that cannot be repacked.
//!
//! Arrays, matrices, structs, non-32-bit and dual-slot varyings keep their
//! existing locations; this pass records exactly which (slot, component)
//! pairs they pin down so the compactor packs around them.

use prism_ir::limits::MAX_VARYINGS_INCL_PATCH;
use prism_ir::{ComponentMask, Interpolation, Shader, Type, Variable, VariableMode};

/// Interpolation sampling location, in the priority order the compactor
/// groups by.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default)]
pub enum InterpLoc {
    Sample,
    Centroid,
    #[default]
    Center,
}

/// Occupancy record for one varying slot: which components are claimed and
/// with what interpolation attributes.
#[derive(Debug, Clone, Copy, Default)]
pub struct AssignedComps {
    pub comps: ComponentMask,
    pub interp_type: Interpolation,
    pub interp_loc: InterpLoc,
    pub is_32bit: bool,
}

/// Shared per-slot occupancy table over the generic varying and patch
/// ranges, VAR0-relative.
pub type AssignedCompsTable = [AssignedComps; MAX_VARYINGS_INCL_PATCH as usize];

/// Effective interpolation type for packing compatibility: integers are
/// always flat, otherwise the variable's own qualifier, otherwise smooth
/// when the driver defaults to it.
pub(crate) fn interp_type(var: &Variable, ty: &Type, default_to_smooth: bool) -> Interpolation {
    if ty.is_integer() {
        Interpolation::Flat
    } else if var.interpolation != Interpolation::None {
        var.interpolation
    } else if default_to_smooth {
        Interpolation::Smooth
    } else {
        Interpolation::None
    }
}

pub(crate) fn interp_loc(var: &Variable) -> InterpLoc {
    if var.sample {
        InterpLoc::Sample
    } else if var.centroid {
        InterpLoc::Centroid
    } else {
        InterpLoc::Center
    }
}

/// Only plain 32-bit scalars are packable; vectors are expected to have been
/// split to scalars before linking, and everything else passes through
/// unpacked by policy.
pub(crate) fn is_packing_supported(ty: &Type) -> bool {
    ty.is_scalar() && ty.is_32bit()
}

/// Reserves every (slot, component) spanned by the unpackable variables of
/// `mode`, recording their interpolation attributes and bit width.
pub fn reserve_unmoveable_components(
    shader: &Shader,
    mode: VariableMode,
    table: &mut AssignedCompsTable,
    default_to_smooth: bool,
) {
    for (_, var) in shader.vars_with_mode(mode) {
        let Some(offset) = var.generic_location() else {
            continue;
        };
        if offset >= MAX_VARYINGS_INCL_PATCH {
            continue;
        }

        let ty = var.interface_type(shader.stage);
        if is_packing_supported(ty) {
            continue;
        }

        let stripped = ty.without_array();
        let elements = if stripped.is_vector_or_scalar() {
            stripped.vector_size()
        } else {
            4
        };
        let dual_slot = stripped.is_dual_slot();
        let slots = ty.attribute_slot_count();
        let dmul: u8 = if stripped.is_64bit() { 2 } else { 1 };

        let mut comps_slot2 = 0;
        for i in 0..slots {
            let entry = &mut table[(offset + i) as usize];

            if dual_slot {
                if i & 1 == 1 {
                    entry.comps |= ComponentMask::span(0, comps_slot2);
                } else {
                    // Enhanced-layouts packing rules for doubles: the first
                    // slot takes the components from location_frac up, the
                    // second the remainder from component 0.
                    let num_comps = 4 - var.location_frac;
                    comps_slot2 = elements * dmul - num_comps;
                    assert!(
                        var.location_frac == 0 || var.location_frac == 2,
                        "dual-slot varying `{}` must start at component 0 or 2",
                        var.name
                    );
                    assert!(
                        comps_slot2 <= 4,
                        "dual-slot varying `{}` overflows its second slot",
                        var.name
                    );
                    entry.comps |= ComponentMask::span(var.location_frac, num_comps);
                }
            } else {
                entry.comps |= ComponentMask::span(var.location_frac, elements * dmul);
            }

            entry.interp_type = interp_type(var, ty, default_to_smooth);
            entry.interp_loc = interp_loc(var);
            entry.is_32bit = stripped.is_32bit();
        }
    }
}
