//! Constant and duplicate output forwarding.
//!
//! When the producer's last block provably stores a constant (or a value it
//! already stored to another output) to a scalar varying, the consumer's
//! reads of the matching input can bypass the interface. Strictly additive:
//! the interface entries themselves are left for dead-code elimination.

use hashbrown::HashMap;
use tracing::debug;

use prism_ir::limits::{MAX_VARYING, SLOT_VAR0};
use prism_ir::{Immediate, Instr, Shader, Stage, ValueId, VarId, Variable, VariableMode};

use crate::reserve::interp_loc;

fn varying_matches(out_var: &Variable, in_var: &Variable) -> bool {
    in_var.location == out_var.location && in_var.location_frac == out_var.location_frac
}

fn matching_input_var(consumer: &Shader, out_var: &Variable) -> Option<VarId> {
    consumer
        .vars_with_mode(VariableMode::Input)
        .find(|(_, var)| varying_matches(out_var, var))
        .map(|(id, _)| id)
}

/// Only scalar user varyings are forwarded; compound and dual-slot types
/// would need component-wise tracking.
fn can_replace_varying(out_var: &Variable) -> bool {
    if out_var.ty.is_array()
        || out_var.ty.is_dual_slot()
        || out_var.ty.is_matrix()
        || out_var.ty.is_struct()
    {
        return false;
    }
    if !out_var.ty.is_scalar() {
        return false;
    }
    match out_var.location {
        Some(location) => location >= SLOT_VAR0 && location - SLOT_VAR0 < MAX_VARYING,
        None => false,
    }
}

/// Rewrites every consumer load of the input matching `out_var` into the
/// constant itself.
fn replace_constant_input(consumer: &mut Shader, out_var: &Variable, value: Immediate) -> bool {
    let Shader { entry, vars, .. } = consumer;

    let mut progress = false;
    for block in &mut entry.blocks {
        for instr in &mut block.instrs {
            let Instr::Load { dst, var } = *instr else {
                continue;
            };
            let in_var = &vars[var.0 as usize];
            if in_var.mode != VariableMode::Input || !varying_matches(out_var, in_var) {
                continue;
            }
            *instr = Instr::Const { dst, value };
            progress = true;
        }
    }
    progress
}

/// Repoints every consumer load of the input matching `dup_out_var` at the
/// canonical input `input_var`, provided the interpolation qualifiers agree.
fn replace_duplicate_input(
    consumer: &mut Shader,
    input_var: VarId,
    dup_out_var: &Variable,
) -> bool {
    let canonical = consumer.var(input_var).clone();
    let Shader { entry, vars, .. } = consumer;

    let mut progress = false;
    for block in &mut entry.blocks {
        for instr in &mut block.instrs {
            let Instr::Load { dst, var } = *instr else {
                continue;
            };
            let in_var = &vars[var.0 as usize];
            if in_var.mode != VariableMode::Input
                || !varying_matches(dup_out_var, in_var)
                || in_var.interpolation != canonical.interpolation
                || interp_loc(in_var) != interp_loc(&canonical)
            {
                continue;
            }
            *instr = Instr::Load { dst, var: input_var };
            progress = true;
        }
    }
    progress
}

/// Forwards provably-constant and duplicate producer outputs into the
/// consumer. Applies only to a rasterization consumer fed by a vertex or
/// tessellation-evaluation stage. Returns whether any load was rewritten.
pub fn link_opt_varyings(producer: &Shader, consumer: &mut Shader) -> bool {
    if consumer.stage != Stage::Fragment
        || !matches!(producer.stage, Stage::Vertex | Stage::TessEval)
    {
        return false;
    }

    let Some(last_block) = producer.entry.last_block() else {
        return false;
    };

    let mut progress = false;
    // Value identity -> the consumer input fed by the first store of that
    // value, for duplicate detection.
    let mut varying_values: HashMap<ValueId, VarId> = HashMap::new();

    // A store in the last block is the final word on its output.
    for instr in last_block.instrs.iter().rev() {
        let Instr::Store { var, value } = *instr else {
            continue;
        };
        let out_var = producer.var(var);
        if out_var.mode != VariableMode::Output || !can_replace_varying(out_var) {
            continue;
        }

        if let Some(imm) = producer.entry.const_value(value) {
            debug!(name = %out_var.name, "forwarding constant output to consumer");
            progress |= replace_constant_input(consumer, out_var, imm);
        } else if let Some(&input_var) = varying_values.get(&value) {
            debug!(name = %out_var.name, "forwarding duplicate output to consumer");
            progress |= replace_duplicate_input(consumer, input_var, out_var);
        } else if let Some(in_var) = matching_input_var(consumer, out_var) {
            varying_values.insert(value, in_var);
        }
    }

    progress
}
