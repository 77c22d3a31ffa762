//! Final driver-location numbering.
//!
//! Two independent schemes: a dense per-shader numbering for freshly
//! compiled interfaces, and a normalized scheme for separable pipelines
//! where both sides must derive identical numbers without seeing each other.

use prism_ir::limits::{
    FRAG_RESULT_DATA0, MAX_TOTAL_SLOTS, SLOT_BOUNDING_BOX1, SLOT_PATCH0, SLOT_TESS_LEVEL_OUTER,
    SLOT_VAR0, VERT_ATTRIB_GENERIC0,
};
use prism_ir::{Shader, Stage, VariableMode};

/// Assigns dense zero-based `driver_location`s to all variables of `mode`,
/// in ascending location order. Compact array-of-scalar variables pack at
/// component granularity; other variables sharing a slot through component
/// packing reuse the slot's driver location. Returns the number of driver
/// slots used.
pub fn assign_io_var_locations(shader: &mut Shader, mode: VariableMode) -> u32 {
    let stage = shader.stage;

    let mut ids = shader.var_ids_with_mode(mode);
    ids.sort_by_key(|&id| {
        shader
            .var(id)
            .location
            .expect("interface variable must have a location before assignment")
    });

    let mut location: u32 = 0;
    let mut assigned_locations = [0u32; MAX_TOTAL_SLOTS];
    let mut processed_locs = [0u64; 2];
    let mut last_partial = false;

    for id in ids {
        let var = shader.var(id);
        let var_location = var.location.expect("sorted variables have locations");
        let frac = u32::from(var.location_frac);
        let index = usize::from(var.index);
        let compact = var.compact;
        let ty = var.interface_type(stage);

        let base = match (mode, stage) {
            (VariableMode::Input, Stage::Vertex) => VERT_ATTRIB_GENERIC0,
            (VariableMode::Output, Stage::Fragment) => FRAG_RESULT_DATA0,
            _ => SLOT_VAR0,
        };

        let var_size;
        if compact {
            // A compact variable starting at component 0 must not land in a
            // slot partially claimed by the previous compact variable.
            if last_partial && frac == 0 {
                location += 1;
            }

            let len = ty
                .array_element()
                .filter(|e| e.is_scalar())
                .and(ty.array_len())
                .expect("compact variables are arrays of scalars");
            let start = 4 * location + frac;
            let end = start + len;
            var_size = end / 4 - location;
            last_partial = end % 4 != 0;
        } else {
            // Compact variables bypass the varying compactor, so no regular
            // variable can share their final slot; skip a partial one.
            if last_partial {
                location += 1;
                last_partial = false;
            }
            var_size = ty.attribute_slot_count();
        }

        // Builtins never pack components, so only user locations need the
        // shared-slot bookkeeping.
        let mut processed = false;
        if var_location >= base {
            let glsl_location = var_location - base;
            for i in 0..var_size {
                let bit = 1u64 << (glsl_location + i);
                if processed_locs[index] & bit != 0 {
                    processed = true;
                } else {
                    processed_locs[index] |= bit;
                }
            }
        }

        if processed {
            let driver_location = assigned_locations[var_location as usize];
            shader.var_mut(id).driver_location = driver_location;

            // A packed variable can outrun the variables already processed
            // at its base location; extend the allocation to cover its tail.
            let last_slot_location = driver_location + var_size;
            if last_slot_location > location {
                let num_unallocated_slots = last_slot_location - location;
                let first_unallocated_slot = var_size - num_unallocated_slots;
                for i in first_unallocated_slot..var_size {
                    assigned_locations[(var_location + i) as usize] = location;
                    location += 1;
                }
            }
            continue;
        }

        for i in 0..var_size {
            assigned_locations[(var_location + i) as usize] = location + i;
        }
        shader.var_mut(id).driver_location = location;
        location += var_size;
    }

    if last_partial {
        location += 1;
    }
    location
}

/// Counts of interface variables linked by
/// [`assign_linked_io_var_locations`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LinkedIoVarInfo {
    pub num_linked_io_vars: u32,
    pub num_linked_patch_io_vars: u32,
}

/// Normalized linear index of a semantic location: generic slots map
/// directly; patch builtins occupy indices 0–3 and generic patch varyings
/// follow from 4.
fn linked_variable_location(location: u32, patch: bool) -> u32 {
    if !patch {
        return location;
    }
    if location >= SLOT_PATCH0 {
        location - SLOT_PATCH0 + 4
    } else if (SLOT_TESS_LEVEL_OUTER..=SLOT_BOUNDING_BOX1).contains(&location) {
        location - SLOT_TESS_LEVEL_OUTER
    } else {
        unreachable!("unsupported patch builtin location {location}")
    }
}

fn linked_variable_io_mask(var: &prism_ir::Variable, stage: Stage) -> u64 {
    let ty = var.interface_type(stage);
    let slots = if var.compact {
        let component_count = u32::from(var.location_frac)
            + ty.array_len().expect("compact variables are arrays");
        component_count.div_ceil(4)
    } else {
        ty.attribute_slot_count()
    };
    (1u64 << slots) - 1
}

/// Driver-location assignment for separable pipelines: producer outputs and
/// consumer inputs derive identical numbers from semantic locations alone.
/// Every variable gets `4 × (occupied normalized indices below its own)`.
pub fn assign_linked_io_var_locations(
    producer: &mut Shader,
    consumer: &mut Shader,
) -> LinkedIoVarInfo {
    let mut io_mask = 0u64;
    let mut patch_io_mask = 0u64;

    let producer_stage = producer.stage;
    let consumer_stage = consumer.stage;

    for (_, var) in producer.vars_with_mode(VariableMode::Output) {
        let mask = linked_variable_io_mask(var, producer_stage);
        let loc = linked_variable_location(
            var.location.expect("linked variables have locations"),
            var.patch,
        );
        if var.patch {
            patch_io_mask |= mask << loc;
        } else {
            io_mask |= mask << loc;
        }
    }
    for (_, var) in consumer.vars_with_mode(VariableMode::Input) {
        let mask = linked_variable_io_mask(var, consumer_stage);
        let loc = linked_variable_location(
            var.location.expect("linked variables have locations"),
            var.patch,
        );
        if var.patch {
            patch_io_mask |= mask << loc;
        } else {
            io_mask |= mask << loc;
        }
    }

    for (shader, mode) in [
        (&mut *producer, VariableMode::Output),
        (&mut *consumer, VariableMode::Input),
    ] {
        for id in shader.var_ids_with_mode(mode) {
            let var = shader.var(id);
            let loc = linked_variable_location(
                var.location.expect("linked variables have locations"),
                var.patch,
            );
            let below = (1u64 << loc) - 1;
            let mask = if var.patch { patch_io_mask } else { io_mask };
            shader.var_mut(id).driver_location = (mask & below).count_ones() * 4;
        }
    }

    LinkedIoVarInfo {
        num_linked_io_vars: io_mask.count_ones(),
        num_linked_patch_io_vars: patch_io_mask.count_ones(),
    }
}
