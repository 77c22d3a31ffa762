//! Inter-stage varying linking for prism shader IR.
//!
//! Given the producer and consumer shaders of one pipeline stage boundary
//! (vertex → fragment, tessellation control → evaluation, ...), this crate:
//!
//! - eliminates varyings one side never touches, driven by cross-shader
//!   liveness (including tessellation-control self-reads);
//! - compacts the surviving 32-bit scalar varyings into the fixed slot
//!   space, packing around everything that cannot move;
//! - assigns final driver locations, either per shader or in the normalized
//!   scheme separable pipelines need;
//! - optionally forwards provably-constant and duplicate outputs straight
//!   into the consumer.
//!
//! Shaders are mutated in place; producer and consumer stay mutually
//! consistent because every remap is applied to both through the same table.

#![forbid(unsafe_code)]

mod assign;
mod compact;
mod eliminate;
mod forward;
mod liveness;
mod reserve;
mod xfb;

pub use crate::assign::{assign_io_var_locations, assign_linked_io_var_locations, LinkedIoVarInfo};
pub use crate::compact::compact_varyings;
pub use crate::eliminate::{remove_unused_io_vars, remove_unused_varyings};
pub use crate::forward::link_opt_varyings;
pub use crate::liveness::{
    add_tess_ctrl_output_reads, collect_io_usage, gather_io_info, UsageMasks,
};
pub use crate::reserve::{
    reserve_unmoveable_components, AssignedComps, AssignedCompsTable, InterpLoc,
};
pub use crate::xfb::link_xfb_varyings;

use prism_ir::Shader;

/// Knobs for [`link_varyings`].
#[derive(Debug, Clone, Copy)]
pub struct LinkOptions {
    /// Treat unqualified varyings as smooth when grouping for packing
    /// (drivers that default to smooth interpolation set this).
    pub default_to_smooth_interp: bool,
    /// Run constant/duplicate output forwarding after compaction.
    pub opt_varyings: bool,
}

impl Default for LinkOptions {
    fn default() -> Self {
        LinkOptions {
            default_to_smooth_interp: true,
            opt_varyings: true,
        }
    }
}

/// Runs the full link sequence on one stage pair: transform-feedback
/// pinning, dead-varying elimination, usage-mask refresh, compaction, and
/// (optionally) output forwarding. Driver-location assignment is left to
/// the caller, which knows whether the pipeline is monolithic
/// ([`assign_io_var_locations`]) or separable
/// ([`assign_linked_io_var_locations`]).
pub fn link_varyings(producer: &mut Shader, consumer: &mut Shader, options: &LinkOptions) -> bool {
    link_xfb_varyings(producer, consumer);

    let mut progress = remove_unused_varyings(producer, consumer);

    gather_io_info(producer);
    gather_io_info(consumer);
    compact_varyings(producer, consumer, options.default_to_smooth_interp);

    if options.opt_varyings {
        progress |= link_opt_varyings(producer, consumer);
    }
    progress
}
