//! Cross-shader liveness: which (slot, component) pairs of the inter-stage
//! interface are actually populated or consumed.

use prism_ir::limits::SLOT_PATCH0;
use prism_ir::{Instr, Shader, Stage, Variable, VariableMode};

/// Per-component-offset slot usage. `slots[c]` has bit `s` set when some
/// variable whose component offset covers `c` occupies absolute slot `s`;
/// `patch_slots` is the same in the PATCH0-relative patch space.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct UsageMasks {
    pub slots: [u64; 4],
    pub patch_slots: [u64; 4],
}

/// Bits this variable occupies in a slot-indexed bitfield: one bit per slot
/// of its interface type, shifted to its base location (patch variables are
/// indexed relative to the first patch slot). Unassigned locations occupy
/// nothing.
pub(crate) fn variable_io_mask(var: &Variable, stage: Stage) -> u64 {
    let Some(location) = var.location else {
        return 0;
    };
    debug_assert!(matches!(
        var.mode,
        VariableMode::Input | VariableMode::Output | VariableMode::SystemValue
    ));

    let base = if var.patch {
        // Patch builtins (tess factors) sit below the generic patch range
        // and have no patch-relative slot.
        match location.checked_sub(SLOT_PATCH0) {
            Some(base) => base,
            None => return 0,
        }
    } else {
        location
    };
    if base >= 64 {
        return 0;
    }

    let slots = var.interface_type(stage).attribute_slot_count();
    let mask = if slots >= 64 {
        u64::MAX
    } else {
        (1u64 << slots) - 1
    };
    mask << base
}

fn accumulate(masks: &mut UsageMasks, var: &Variable, io_mask: u64) {
    let comps = var.ty.component_count_for_packing();
    for i in 0..comps {
        let offset = usize::from(var.location_frac + i);
        if offset > 3 {
            break;
        }
        if var.patch {
            masks.patch_slots[offset] |= io_mask;
        } else {
            masks.slots[offset] |= io_mask;
        }
    }
}

/// Usage masks from the declarations of every variable of `mode`.
pub fn collect_io_usage(shader: &Shader, mode: VariableMode) -> UsageMasks {
    let mut masks = UsageMasks::default();
    for (_, var) in shader.vars_with_mode(mode) {
        accumulate(&mut masks, var, variable_io_mask(var, shader.stage));
    }
    masks
}

/// ORs in every output slot the shader reads back itself. Tessellation
/// control invocations can read outputs written by other invocations, so
/// such outputs stay live even when the next stage ignores them.
pub fn add_tess_ctrl_output_reads(shader: &Shader, masks: &mut UsageMasks) {
    for block in &shader.entry.blocks {
        for instr in &block.instrs {
            let Instr::Load { var, .. } = instr else {
                continue;
            };
            let var = shader.var(*var);
            if var.mode != VariableMode::Output {
                continue;
            }
            accumulate(masks, var, variable_io_mask(var, shader.stage));
        }
    }
}

/// Recomputes the shader's usage metadata from its declarations and
/// intra-stage output reads.
pub fn gather_io_info(shader: &mut Shader) {
    let stage = shader.stage;
    let mut info = prism_ir::ShaderInfo::default();

    for (_, var) in shader.vars_with_mode(VariableMode::Input) {
        let mask = variable_io_mask(var, stage);
        if var.patch {
            info.patch_inputs_read |= mask as u32;
        } else {
            info.inputs_read |= mask;
        }
    }
    for (_, var) in shader.vars_with_mode(VariableMode::Output) {
        let mask = variable_io_mask(var, stage);
        if var.patch {
            info.patch_outputs_written |= mask as u32;
        } else {
            info.outputs_written |= mask;
        }
    }
    for block in &shader.entry.blocks {
        for instr in &block.instrs {
            let Instr::Load { var, .. } = instr else {
                continue;
            };
            let var = shader.var(*var);
            if var.mode != VariableMode::Output {
                continue;
            }
            let mask = variable_io_mask(var, stage);
            if var.patch {
                info.patch_outputs_read |= mask as u32;
            } else {
                info.outputs_read |= mask;
            }
        }
    }

    shader.info = info;
}

#[cfg(test)]
mod tests {
    use super::*;
    use prism_ir::limits::SLOT_VAR0;
    use prism_ir::test_utils::ShaderBuilder;
    use prism_ir::{Scalar, Type};

    #[test]
    fn io_mask_covers_slot_range() {
        let mut b = ShaderBuilder::new(Stage::Vertex);
        let v = b.output("v", Type::array(Type::vec(Scalar::F32, 4), 3), SLOT_VAR0 + 2, 0);
        let shader = b.finish();

        let mask = variable_io_mask(shader.var(v), shader.stage);
        assert_eq!(mask, 0b111 << (SLOT_VAR0 + 2));
    }

    #[test]
    fn unassigned_location_contributes_nothing() {
        let mut b = ShaderBuilder::new(Stage::Vertex);
        let v = b.output("builtin", Type::vec(Scalar::F32, 4), 0, 0);
        b.var_mut(v).location = None;
        let shader = b.finish();

        assert_eq!(variable_io_mask(shader.var(v), shader.stage), 0);
    }

    #[test]
    fn patch_masks_are_patch_relative() {
        let mut b = ShaderBuilder::new(Stage::TessControl);
        let v = b.output("p", Type::Scalar(Scalar::F32), SLOT_PATCH0 + 5, 1);
        b.var_mut(v).patch = true;
        let shader = b.finish();

        let masks = collect_io_usage(&shader, VariableMode::Output);
        assert_eq!(masks.patch_slots[1], 1 << 5);
        assert_eq!(masks.patch_slots[0], 0);
        assert_eq!(masks.slots, [0; 4]);
    }

    #[test]
    fn per_vertex_wrapper_is_stripped() {
        let mut b = ShaderBuilder::new(Stage::Geometry);
        // Per-vertex geometry input: outer array is the vertex dimension.
        b.input("gin", Type::array(Type::vec(Scalar::F32, 4), 3), SLOT_VAR0, 0);
        let shader = b.finish();

        let masks = collect_io_usage(&shader, VariableMode::Input);
        assert_eq!(masks.slots[0], 1 << SLOT_VAR0);
    }

    #[test]
    fn tess_ctrl_output_reads_accumulate() {
        let mut b = ShaderBuilder::new(Stage::TessControl);
        let out = b.output(
            "o",
            Type::array(Type::Scalar(Scalar::F32), 4),
            SLOT_VAR0 + 1,
            0,
        );
        b.load(out);
        let shader = b.finish();

        let mut masks = UsageMasks::default();
        add_tess_ctrl_output_reads(&shader, &mut masks);
        // A tess-control per-vertex output strips its array wrapper.
        assert_eq!(masks.slots[0], 1 << (SLOT_VAR0 + 1));
    }
}
