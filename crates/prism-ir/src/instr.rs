//! The linear instruction stream the linker walks.
//!
//! Only operations addressing interface variables matter here: loads,
//! interpolated loads, stores, plus the constants and opaque ALU results
//! that feed them. Values carry SSA-style identities; two stores of the same
//! `ValueId` store provably the same value.

use crate::variable::VarId;

/// Stable identity of a computed value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ValueId(pub u32);

/// A scalar compile-time constant (raw bit pattern plus width).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Immediate {
    pub bits: u8,
    pub raw: u64,
}

impl Immediate {
    pub fn f32(value: f32) -> Self {
        Immediate { bits: 32, raw: u64::from(value.to_bits()) }
    }

    pub fn f64(value: f64) -> Self {
        Immediate { bits: 64, raw: value.to_bits() }
    }

    pub fn u32(value: u32) -> Self {
        Immediate { bits: 32, raw: u64::from(value) }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AluOp {
    Mov,
    Add,
    Sub,
    Mul,
    Mad,
    Dp3,
    Dp4,
    Min,
    Max,
    Frc,
}

/// Where an interpolated fragment-input read samples.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum InterpOp {
    AtCentroid,
    AtSample,
    AtOffset,
    AtVertex,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Instr {
    /// Materialize a compile-time constant.
    Const { dst: ValueId, value: Immediate },
    /// Opaque computation; the linker only cares about the value identity.
    Alu {
        dst: ValueId,
        op: AluOp,
        args: Vec<ValueId>,
    },
    /// Read an interface variable.
    Load { dst: ValueId, var: VarId },
    /// Interpolated read of a fragment input. `operand` carries the sample
    /// index / offset value where the mode takes one.
    InterpLoad {
        dst: ValueId,
        var: VarId,
        op: InterpOp,
        operand: Option<ValueId>,
    },
    /// Write an interface variable.
    Store { var: VarId, value: ValueId },
}

impl Instr {
    /// The value this instruction defines, if any.
    pub fn dst(&self) -> Option<ValueId> {
        match self {
            Instr::Const { dst, .. }
            | Instr::Alu { dst, .. }
            | Instr::Load { dst, .. }
            | Instr::InterpLoad { dst, .. } => Some(*dst),
            Instr::Store { .. } => None,
        }
    }

    /// The variable read by a plain or interpolated load.
    pub fn loaded_var(&self) -> Option<VarId> {
        match self {
            Instr::Load { var, .. } | Instr::InterpLoad { var, .. } => Some(*var),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Block {
    pub instrs: Vec<Instr>,
}

/// A single-entry function body: a list of basic blocks in layout order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Function {
    pub blocks: Vec<Block>,
}

impl Function {
    pub fn last_block(&self) -> Option<&Block> {
        self.blocks.last()
    }

    /// The instruction defining `value`, if it is defined in this function.
    pub fn value_def(&self, value: ValueId) -> Option<&Instr> {
        self.blocks
            .iter()
            .flat_map(|b| b.instrs.iter())
            .find(|i| i.dst() == Some(value))
    }

    /// The immediate behind `value` when it is defined by a `Const`.
    pub fn const_value(&self, value: ValueId) -> Option<Immediate> {
        match self.value_def(value) {
            Some(Instr::Const { value, .. }) => Some(*value),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn const_lookup() {
        let mut f = Function::default();
        f.blocks.push(Block::default());
        f.blocks[0].instrs.push(Instr::Const {
            dst: ValueId(0),
            value: Immediate::f32(1.5),
        });
        f.blocks[0].instrs.push(Instr::Alu {
            dst: ValueId(1),
            op: AluOp::Mov,
            args: vec![ValueId(0)],
        });

        assert_eq!(f.const_value(ValueId(0)), Some(Immediate::f32(1.5)));
        assert_eq!(f.const_value(ValueId(1)), None);
        assert_eq!(f.const_value(ValueId(7)), None);
    }
}
