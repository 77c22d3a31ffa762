//! End-to-end linking of a vertex → fragment pair: elimination, compaction,
//! forwarding and driver-location assignment working against each other.

use pretty_assertions::assert_eq;

use prism_ir::limits::{SLOT_POS, SLOT_VAR0};
use prism_ir::test_utils::ShaderBuilder;
use prism_ir::{Immediate, Instr, Interpolation, Scalar, Shader, Stage, Type, VariableMode};
use prism_link::{
    assign_io_var_locations, collect_io_usage, link_varyings, LinkOptions,
};

struct Pipeline {
    producer: Shader,
    consumer: Shader,
    out_ids: Vec<prism_ir::VarId>,
    in_ids: Vec<prism_ir::VarId>,
}

/// A vertex shader writing position, four scalar varyings and one
/// xfb-captured varying; a fragment shader reading only varyings 0 and 2.
fn build_pipeline() -> Pipeline {
    let mut p = ShaderBuilder::new(Stage::Vertex);
    let pos = p.output("pos", Type::vec(Scalar::F32, 4), SLOT_POS, 0);
    let mut out_ids = Vec::new();
    for i in 0..4u32 {
        let out = p.output(&format!("v{i}"), Type::Scalar(Scalar::F32), SLOT_VAR0 + i, 0);
        p.var_mut(out).interpolation = Interpolation::Smooth;
        out_ids.push(out);
    }
    let captured = p.output("xfb", Type::Scalar(Scalar::F32), SLOT_VAR0 + 8, 0);
    p.var_mut(captured).always_active_io = true;
    out_ids.push(captured);

    let one = p.imm(Immediate::f32(1.0));
    p.store(pos, one);
    for &out in &out_ids {
        let v = p.imm(Immediate::f32(0.5));
        p.store(out, v);
    }

    let mut c = ShaderBuilder::new(Stage::Fragment);
    let mut in_ids = Vec::new();
    for i in [0u32, 2] {
        let inp = c.input(&format!("v{i}"), Type::Scalar(Scalar::F32), SLOT_VAR0 + i, 0);
        c.var_mut(inp).interpolation = Interpolation::Smooth;
        c.load(inp);
        in_ids.push(inp);
    }
    let xfb_in = c.input("xfb", Type::Scalar(Scalar::F32), SLOT_VAR0 + 8, 0);
    c.load(xfb_in);
    in_ids.push(xfb_in);

    Pipeline {
        producer: p.finish(),
        consumer: c.finish(),
        out_ids,
        in_ids,
    }
}

#[test]
fn full_link_pass_over_a_vertex_fragment_pair() {
    let mut pipe = build_pipeline();
    let options = LinkOptions {
        default_to_smooth_interp: true,
        opt_varyings: false,
    };

    assert!(link_varyings(&mut pipe.producer, &mut pipe.consumer, &options));

    // v1 and v3 die; v0 and v2 survive.
    assert_eq!(pipe.producer.var(pipe.out_ids[1]).mode, VariableMode::Temp);
    assert_eq!(pipe.producer.var(pipe.out_ids[3]).mode, VariableMode::Temp);
    assert_eq!(
        pipe.producer.var(pipe.out_ids[0]).mode,
        VariableMode::Output
    );

    // The survivors share slot VAR0, components 0 and 1, identically on
    // both sides of the boundary.
    for (out, inp) in [
        (pipe.out_ids[0], pipe.in_ids[0]),
        (pipe.out_ids[2], pipe.in_ids[1]),
    ] {
        assert_eq!(
            pipe.producer.var(out).location,
            pipe.consumer.var(inp).location
        );
        assert_eq!(
            pipe.producer.var(out).location_frac,
            pipe.consumer.var(inp).location_frac
        );
    }
    let mut fracs: Vec<u8> = pipe.in_ids[..2]
        .iter()
        .map(|&id| pipe.consumer.var(id).location_frac)
        .collect();
    fracs.sort_unstable();
    assert_eq!(fracs, vec![0, 1]);
    assert_eq!(pipe.consumer.var(pipe.in_ids[0]).location, Some(SLOT_VAR0));

    // The xfb capture was pinned on the consumer side and kept its slot.
    let xfb_in = *pipe.in_ids.last().unwrap();
    assert!(pipe.consumer.var(xfb_in).always_active_io);
    assert_eq!(pipe.consumer.var(xfb_in).location, Some(SLOT_VAR0 + 8));
    assert_eq!(pipe.consumer.var(xfb_in).location_frac, 0);

    // Usage masks agree with the surviving declarations.
    assert_eq!(
        pipe.consumer.info.inputs_read,
        (1 << SLOT_VAR0) | (1 << (SLOT_VAR0 + 8))
    );
    assert_eq!(
        pipe.producer.info.outputs_written & (1 << SLOT_VAR0),
        1 << SLOT_VAR0
    );

    // Dense driver locations for the fragment inputs: one packed varying
    // slot plus the pinned xfb slot.
    let size = assign_io_var_locations(&mut pipe.consumer, VariableMode::Input);
    assert_eq!(size, 2);
    assert_eq!(pipe.consumer.var(pipe.in_ids[0]).driver_location, 0);
    assert_eq!(pipe.consumer.var(pipe.in_ids[1]).driver_location, 0);
    assert_eq!(pipe.consumer.var(xfb_in).driver_location, 1);
}

#[test]
fn linking_preserves_the_usage_union() {
    // Nothing the consumer reads may vanish from the producer's write set.
    let mut pipe = build_pipeline();
    let read_before = collect_io_usage(&pipe.consumer, VariableMode::Input);
    let written_before = collect_io_usage(&pipe.producer, VariableMode::Output);

    link_varyings(
        &mut pipe.producer,
        &mut pipe.consumer,
        &LinkOptions::default(),
    );

    // Every slot that was both written and read is still both written and
    // read (possibly at a new location, but on both sides equally).
    assert_eq!(
        pipe.producer.info.outputs_written & pipe.consumer.info.inputs_read,
        pipe.consumer.info.inputs_read & !(1 << SLOT_POS)
    );
    let live_before = read_before.slots[0] & written_before.slots[0];
    assert_eq!(
        (pipe.consumer.info.inputs_read.count_ones() as u64),
        // VAR0+VAR2 packed into one slot, plus the untouched xfb slot.
        live_before.count_ones() as u64 - 1
    );
}

#[test]
fn constant_outputs_reach_the_fragment_shader() {
    let mut p = ShaderBuilder::new(Stage::Vertex);
    let out = p.output("v", Type::Scalar(Scalar::F32), SLOT_VAR0 + 5, 0);
    p.var_mut(out).interpolation = Interpolation::Smooth;
    let k = p.imm(Immediate::f32(4.25));
    p.store(out, k);
    let mut producer = p.finish();

    let mut c = ShaderBuilder::new(Stage::Fragment);
    let inp = c.input("v", Type::Scalar(Scalar::F32), SLOT_VAR0 + 5, 0);
    c.var_mut(inp).interpolation = Interpolation::Smooth;
    c.load(inp);
    let mut consumer = c.finish();

    assert!(link_varyings(
        &mut producer,
        &mut consumer,
        &LinkOptions::default()
    ));

    let forwarded = consumer.entry.blocks[0]
        .instrs
        .iter()
        .any(|i| matches!(i, Instr::Const { value, .. } if *value == Immediate::f32(4.25)));
    assert!(forwarded);
}
