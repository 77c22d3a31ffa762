//! Transform-feedback linkage marking.
//!
//! A captured producer output must keep its layout; the matching consumer
//! input has to be pinned too, or link-time optimizations would repack one
//! side of the interface.

use prism_ir::limits::{MAX_VARYING, SLOT_VAR0};
use prism_ir::{Shader, VarId, VariableMode};

/// Marks the consumer input at each generic location whose producer output
/// is transform-feedback captured (`always_active_io`) as untouchable too.
pub fn link_xfb_varyings(producer: &Shader, consumer: &mut Shader) {
    let mut input_vars: [Option<VarId>; MAX_VARYING as usize] = [None; MAX_VARYING as usize];

    for (id, var) in consumer.vars_with_mode(VariableMode::Input) {
        if let Some(offset) = var.generic_location() {
            if offset < MAX_VARYING {
                input_vars[offset as usize] = Some(id);
            }
        }
    }

    for (_, var) in producer.vars_with_mode(VariableMode::Output) {
        if !var.always_active_io {
            continue;
        }
        let Some(offset) = var.generic_location() else {
            continue;
        };
        if offset >= MAX_VARYING {
            continue;
        }
        if let Some(id) = input_vars[offset as usize] {
            consumer.var_mut(id).always_active_io = true;
        }
    }
}
