//! Compile-time bounds of the inter-stage interface.
//!
//! The varying register file is a fixed enumerated space: a builtin prefix,
//! a generic per-vertex range, and a parallel per-patch range. All linker
//! scratch tables are sized by these constants; nothing in the subsystem
//! grows dynamically.

/// Clip-space position builtin slot.
pub const SLOT_POS: u32 = 0;
pub const SLOT_POINT_SIZE: u32 = 1;
pub const SLOT_CLIP_DIST0: u32 = 2;
pub const SLOT_CLIP_DIST1: u32 = 3;
pub const SLOT_CULL_DIST0: u32 = 4;
pub const SLOT_CULL_DIST1: u32 = 5;
pub const SLOT_PRIMITIVE_ID: u32 = 6;
pub const SLOT_LAYER: u32 = 7;
pub const SLOT_VIEWPORT: u32 = 8;
pub const SLOT_FACE: u32 = 9;
/// Outer tessellation factors; the first of the four patch builtin slots
/// (`SLOT_TESS_LEVEL_OUTER..=SLOT_BOUNDING_BOX1` must stay consecutive, the
/// linked location scheme maps them to normalized indices 0–3).
pub const SLOT_TESS_LEVEL_OUTER: u32 = 10;
pub const SLOT_TESS_LEVEL_INNER: u32 = 11;
pub const SLOT_BOUNDING_BOX0: u32 = 12;
pub const SLOT_BOUNDING_BOX1: u32 = 13;

/// First generic (user-defined) varying slot.
pub const SLOT_VAR0: u32 = 16;

/// Number of generic per-vertex varying slots.
pub const MAX_VARYING: u32 = 32;

/// First generic per-patch varying slot.
pub const SLOT_PATCH0: u32 = SLOT_VAR0 + MAX_VARYING;

/// Number of generic per-patch varying slots.
pub const MAX_PATCH_VARYING: u32 = 32;

/// Size of the VAR0-relative index space covering both the per-vertex and
/// per-patch generic ranges; the compactor's cursor space.
pub const MAX_VARYINGS_INCL_PATCH: u32 = MAX_VARYING + MAX_PATCH_VARYING;

/// Total addressable slots (builtins + generic + patch); sizes the location
/// assigner's per-slot bookkeeping.
pub const MAX_TOTAL_SLOTS: usize = (SLOT_PATCH0 + MAX_PATCH_VARYING) as usize;

/// First generic vertex-attribute location (vertex-shader inputs use the
/// attribute location space, not the varying slot space).
pub const VERT_ATTRIB_GENERIC0: u32 = 16;

/// First color-attachment data location (fragment-shader outputs use the
/// fragment-result location space).
pub const FRAG_RESULT_DATA0: u32 = 2;
