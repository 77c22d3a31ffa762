//! Dead-varying elimination: demote interface variables the other side of a
//! stage boundary never touches.

use tracing::debug;

use prism_ir::limits::SLOT_VAR0;
use prism_ir::{Shader, Stage, VariableMode};

use crate::liveness::{add_tess_ctrl_output_reads, collect_io_usage, variable_io_mask, UsageMasks};

/// Demotes every variable of `mode` whose slot bits never appear in the
/// matching `used` mask to plain temporary storage. Builtins with assigned
/// locations, `always_active_io` variables and explicit transform-feedback
/// captures are left alone. Returns whether anything changed.
pub fn remove_unused_io_vars(shader: &mut Shader, mode: VariableMode, used: &UsageMasks) -> bool {
    assert!(
        matches!(mode, VariableMode::Input | VariableMode::Output),
        "can only eliminate shader inputs or outputs"
    );

    let stage = shader.stage;
    let mut progress = false;
    for id in shader.var_ids_with_mode(mode) {
        let var = shader.var(id);
        let used = if var.patch { &used.patch_slots } else { &used.slots };

        if let Some(location) = var.location {
            if location < SLOT_VAR0 {
                continue;
            }
        }
        if var.always_active_io || var.explicit_xfb_buffer {
            continue;
        }

        let other_stage = used[usize::from(var.location_frac)];
        if other_stage & variable_io_mask(var, stage) == 0 {
            debug!(name = %var.name, "demoting unused shader io variable");
            let var = shader.var_mut(id);
            var.location = None;
            var.mode = VariableMode::Temp;
            progress = true;
        }
    }
    progress
}

/// Eliminates producer outputs the consumer never reads and consumer inputs
/// the producer never writes. Tessellation-control producers keep outputs
/// that other invocations of the same stage read back.
pub fn remove_unused_varyings(producer: &mut Shader, consumer: &mut Shader) -> bool {
    assert_ne!(
        producer.stage,
        Stage::Fragment,
        "a fragment shader cannot produce varyings"
    );
    assert_ne!(
        consumer.stage,
        Stage::Vertex,
        "a vertex shader cannot consume varyings"
    );

    let written = collect_io_usage(producer, VariableMode::Output);
    let mut read = collect_io_usage(consumer, VariableMode::Input);
    if producer.stage == Stage::TessControl {
        add_tess_ctrl_output_reads(producer, &mut read);
    }

    let mut progress = remove_unused_io_vars(producer, VariableMode::Output, &read);
    progress |= remove_unused_io_vars(consumer, VariableMode::Input, &written);
    progress
}
