//! Component-level compaction of packable varyings.
//!
//! Every 32-bit scalar varying the consumer (or, for tessellation control,
//! the producer itself) actually reads is gathered, sorted so mutually
//! compatible components are adjacent, and greedily packed into the first
//! free component of the first compatible slot. The resulting remap is
//! applied to both shaders so their interfaces stay consistent.

use tracing::debug;

use prism_ir::limits::{MAX_VARYING, MAX_VARYINGS_INCL_PATCH, SLOT_PATCH0, SLOT_VAR0};
use prism_ir::{ComponentMask, Instr, Interpolation, Shader, Stage, VariableMode};

use crate::reserve::{
    interp_loc, interp_type, is_packing_supported, reserve_unmoveable_components, AssignedComps,
    AssignedCompsTable, InterpLoc,
};

/// One packable scalar component gathered for compaction. Sort order is the
/// packing order: patches last, intra-stage-only reads after cross-stage
/// ones, then by interpolation compatibility group, then original location.
#[derive(Debug, Clone, Copy)]
struct VaryingComponent {
    location: u32,
    location_frac: u8,
    interp_type: Interpolation,
    interp_loc: InterpLoc,
    is_32bit: bool,
    is_patch: bool,
    is_intra_stage_only: bool,
}

impl VaryingComponent {
    fn sort_key(&self) -> (bool, bool, Interpolation, InterpLoc, u32) {
        (
            self.is_patch,
            self.is_intra_stage_only,
            self.interp_type,
            self.interp_loc,
            self.location,
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct NewLocation {
    location: u32,
    component: u8,
}

/// Remap from original (VAR0-relative location, component) to the new
/// assignment, applied identically to producer outputs and consumer inputs.
type RemapTable = [[Option<NewLocation>; 4]; MAX_VARYINGS_INCL_PATCH as usize];

/// Gathers the packable components consumed across the stage boundary (or
/// read back within a tessellation-control producer). Returns `None` when
/// the two interfaces don't line up (e.g. a read aliasing a declaration the
/// producer registered differently), in which case packing is abandoned
/// wholesale rather than applied partially.
fn gather_varying_components(
    producer: &Shader,
    consumer: &Shader,
    default_to_smooth: bool,
) -> Option<Vec<VaryingComponent>> {
    let mut registration = [[None::<usize>; 4]; MAX_VARYINGS_INCL_PATCH as usize];
    let mut infos: Vec<Option<VaryingComponent>> = Vec::new();

    // Register every producer output that may be packed.
    for (_, var) in producer.vars_with_mode(VariableMode::Output) {
        let Some(offset) = var.generic_location() else {
            continue;
        };
        if offset >= MAX_VARYINGS_INCL_PATCH {
            continue;
        }
        // Transform-feedback captured varyings keep their layout.
        if var.always_active_io {
            continue;
        }
        if !is_packing_supported(var.interface_type(producer.stage)) {
            continue;
        }
        registration[offset as usize][usize::from(var.location_frac)] = Some(infos.len());
        infos.push(None);
    }

    // Populate from the consumer's reads.
    for block in &consumer.entry.blocks {
        for instr in &block.instrs {
            let Some(var_id) = instr.loaded_var() else {
                continue;
            };
            let var = consumer.var(var_id);
            if var.mode != VariableMode::Input {
                continue;
            }
            let Some(offset) = var.generic_location() else {
                continue;
            };
            if offset >= MAX_VARYINGS_INCL_PATCH {
                continue;
            }
            let Some(idx) = registration[offset as usize][usize::from(var.location_frac)] else {
                continue;
            };
            if infos[idx].is_none() {
                let ty = var.interface_type(consumer.stage);
                infos[idx] = Some(VaryingComponent {
                    location: var.location.expect("generic varying has a location"),
                    location_frac: var.location_frac,
                    interp_type: interp_type(var, ty, default_to_smooth),
                    interp_loc: interp_loc(var),
                    is_32bit: ty.is_32bit(),
                    is_patch: var.patch,
                    is_intra_stage_only: false,
                });
            }
        }
    }

    // Populate from tessellation-control self-reads: outputs read by other
    // invocations but never consumed by the evaluation stage.
    if producer.stage == Stage::TessControl {
        for block in &producer.entry.blocks {
            for instr in &block.instrs {
                let Instr::Load { var, .. } = instr else {
                    continue;
                };
                let var = producer.var(*var);
                if var.mode != VariableMode::Output {
                    continue;
                }
                let Some(offset) = var.generic_location() else {
                    continue;
                };
                if offset >= MAX_VARYINGS_INCL_PATCH {
                    continue;
                }
                let Some(idx) = registration[offset as usize][usize::from(var.location_frac)]
                else {
                    debug!("shader interfaces mismatched, abandoning varying packing");
                    return None;
                };
                if infos[idx].is_none() {
                    let ty = var.interface_type(producer.stage);
                    infos[idx] = Some(VaryingComponent {
                        location: var.location.expect("generic varying has a location"),
                        location_frac: var.location_frac,
                        interp_type: interp_type(var, ty, default_to_smooth),
                        interp_loc: interp_loc(var),
                        is_32bit: ty.is_32bit(),
                        is_patch: var.patch,
                        is_intra_stage_only: true,
                    });
                }
            }
        }
    }

    // A registered output no read ever touched means the interfaces didn't
    // match (e.g. scalars on one side, struct members on the other).
    let components: Option<Vec<VaryingComponent>> = infos.into_iter().collect();
    if components.is_none() {
        debug!("shader interfaces mismatched, abandoning varying packing");
    }
    components
}

/// Greedy first-fit placement of one component: scan forward from `cursor`,
/// skipping slots with incompatible reservations, and claim the first free
/// component. On success the remap entry and the occupancy table are
/// updated; on failure the cursor is left at `max_location`.
fn assign_remap_locations(
    remap: &mut RemapTable,
    assigned: &mut AssignedCompsTable,
    info: &VaryingComponent,
    cursor: &mut u32,
    comp: &mut u8,
    max_location: u32,
) {
    let mut tmp_cursor = *cursor;
    let mut tmp_comp = *comp;

    while tmp_cursor < max_location {
        let entry = &mut assigned[tmp_cursor as usize];

        if !entry.comps.is_empty() {
            // Only varyings with matching interpolation type and location
            // may share a slot, and only 32-bit components pack at all.
            if entry.interp_type != info.interp_type || entry.interp_loc != info.interp_loc {
                tmp_comp = 0;
                tmp_cursor += 1;
                continue;
            }
            if !entry.is_32bit {
                tmp_comp = 0;
                tmp_cursor += 1;
                continue;
            }

            while tmp_comp < 4 && entry.comps.contains(ComponentMask::single(tmp_comp)) {
                tmp_comp += 1;
            }
        }

        if tmp_comp == 4 {
            tmp_comp = 0;
            tmp_cursor += 1;
            continue;
        }

        let location = (info.location - SLOT_VAR0) as usize;

        entry.comps |= ComponentMask::single(tmp_comp);
        entry.interp_type = info.interp_type;
        entry.interp_loc = info.interp_loc;
        entry.is_32bit = info.is_32bit;

        remap[location][usize::from(info.location_frac)] = Some(NewLocation {
            location: tmp_cursor + SLOT_VAR0,
            component: tmp_comp,
        });
        tmp_comp += 1;
        break;
    }

    *cursor = tmp_cursor;
    *comp = tmp_comp;
}

fn bitfield_range(start: u32, count: u32) -> u64 {
    let mask = if count >= 64 {
        u64::MAX
    } else {
        (1u64 << count) - 1
    };
    if start >= 64 {
        0
    } else {
        mask << start
    }
}

/// Rewrites each generic variable's (location, component) from the remap
/// table and recomputes the shader's usage masks under the new numbering.
/// Builtin bits are carried over untouched; `always_active_io` variables
/// copy their original mask ranges so partially-marked arrays survive.
fn remap_slots_and_components(shader: &mut Shader, mode: VariableMode, remap: &RemapTable) {
    let stage = shader.stage;

    let (used, outs_read, p_used, p_outs_read) = match mode {
        VariableMode::Input => (shader.info.inputs_read, 0u64, shader.info.patch_inputs_read, 0u32),
        VariableMode::Output => (
            shader.info.outputs_written,
            shader.info.outputs_read,
            shader.info.patch_outputs_written,
            shader.info.patch_outputs_read,
        ),
        _ => unreachable!("remap applies to shader inputs or outputs"),
    };

    let mut slots_used = [0u64; 2];
    let mut out_slots_read = [0u64; 2];
    // Builtins are never remapped; carry their bits over.
    slots_used[0] = used & bitfield_range(0, SLOT_VAR0);

    for id in shader.var_ids_with_mode(mode) {
        let var = shader.var(id);
        let Some(offset) = var.generic_location() else {
            continue;
        };
        if offset >= MAX_VARYINGS_INCL_PATCH {
            continue;
        }

        let location = var.location.expect("generic varying has a location");
        let num_slots = var.interface_type(stage).attribute_slot_count();
        let patch = var.patch;
        let always_active = var.always_active_io;
        let loc_offset = if patch { SLOT_PATCH0 } else { 0 };
        let used_mask = if patch { u64::from(p_used) } else { used };
        let outs_used = if patch { u64::from(p_outs_read) } else { outs_read };
        let slots = bitfield_range(location - loc_offset, num_slots);

        let used_across_stages = slots & used_mask != 0;
        let outputs_read = slots & outs_used != 0;

        let new_loc = remap[offset as usize][usize::from(var.location_frac)];
        if let Some(new_loc) = new_loc {
            let var = shader.var_mut(id);
            var.location = Some(new_loc.location);
            var.location_frac = new_loc.component;
        }

        let idx = usize::from(patch);
        if always_active {
            // Compacted masks would lose partially-marked array slots, so
            // copy the original bits verbatim.
            if used_across_stages {
                slots_used[idx] |= used_mask & slots;
            }
            if outputs_read {
                out_slots_read[idx] |= outs_used & slots;
            }
        } else {
            let new_base = new_loc.map(|l| l.location).unwrap_or(location) - loc_offset;
            for i in 0..num_slots {
                if used_across_stages {
                    slots_used[idx] |= bitfield_range(new_base + i, 1);
                }
                if outputs_read {
                    out_slots_read[idx] |= bitfield_range(new_base + i, 1);
                }
            }
        }
    }

    match mode {
        VariableMode::Input => {
            shader.info.inputs_read = slots_used[0];
            shader.info.patch_inputs_read = slots_used[1] as u32;
        }
        VariableMode::Output => {
            shader.info.outputs_written = slots_used[0];
            shader.info.outputs_read = out_slots_read[0];
            shader.info.patch_outputs_written = slots_used[1] as u32;
            shader.info.patch_outputs_read = out_slots_read[1] as u32;
        }
        _ => unreachable!(),
    }
}

fn compact_components(
    producer: &mut Shader,
    consumer: &mut Shader,
    assigned: &mut AssignedCompsTable,
    default_to_smooth: bool,
) {
    let mut remap: RemapTable = [[None; 4]; MAX_VARYINGS_INCL_PATCH as usize];

    let mut components =
        gather_varying_components(producer, consumer, default_to_smooth).unwrap_or_default();
    components.sort_by_key(VaryingComponent::sort_key);

    let mut cursor = 0u32;
    let mut comp = 0u8;

    for info in &components {
        assert!(info.is_patch || cursor < MAX_VARYING);

        if info.is_patch {
            // Patches sort to the end; on the first one, jump the cursor to
            // the patch slot range.
            if cursor < MAX_VARYING {
                cursor = MAX_VARYING;
                comp = 0;
            }
            assign_remap_locations(
                &mut remap,
                assigned,
                info,
                &mut cursor,
                &mut comp,
                MAX_VARYINGS_INCL_PATCH,
            );
        } else {
            assign_remap_locations(&mut remap, assigned, info, &mut cursor, &mut comp, MAX_VARYING);

            // Placement can fail when incompatible reservations made us skip
            // past slots that still had room for this component. Retry once
            // from the start.
            if cursor == MAX_VARYING {
                cursor = 0;
                comp = 0;
                assign_remap_locations(
                    &mut remap,
                    assigned,
                    info,
                    &mut cursor,
                    &mut comp,
                    MAX_VARYING,
                );
            }
        }
    }

    remap_slots_and_components(consumer, VariableMode::Input, &remap);
    remap_slots_and_components(producer, VariableMode::Output, &remap);
}

/// Compacts the packable varyings of a producer/consumer pair. Expects dead
/// varyings to have been eliminated and both shaders' usage masks to be
/// current; the union of the two sides' masks is the set of live slots.
pub fn compact_varyings(producer: &mut Shader, consumer: &mut Shader, default_to_smooth: bool) {
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

    let mut assigned: AssignedCompsTable =
        [AssignedComps::default(); MAX_VARYINGS_INCL_PATCH as usize];

    reserve_unmoveable_components(producer, VariableMode::Output, &mut assigned, default_to_smooth);
    reserve_unmoveable_components(consumer, VariableMode::Input, &mut assigned, default_to_smooth);

    compact_components(producer, consumer, &mut assigned, default_to_smooth);
}
