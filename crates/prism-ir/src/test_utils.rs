//! Builders for constructing synthetic shaders in tests.

use crate::instr::{AluOp, Block, Immediate, Instr, InterpOp, ValueId};
use crate::shader::{Shader, Stage};
use crate::types::Type;
use crate::variable::{VarId, Variable, VariableMode};

/// Fluent construction of a [`Shader`] for tests: declare variables, then
/// emit instructions into the current block.
pub struct ShaderBuilder {
    shader: Shader,
    next_value: u32,
}

impl ShaderBuilder {
    pub fn new(stage: Stage) -> Self {
        let mut shader = Shader::new(stage);
        shader.entry.blocks.push(Block::default());
        ShaderBuilder { shader, next_value: 0 }
    }

    pub fn add_var(&mut self, var: Variable) -> VarId {
        self.shader.add_var(var)
    }

    /// Declares an output at `(location, frac)`.
    pub fn output(&mut self, name: &str, ty: Type, location: u32, frac: u8) -> VarId {
        let mut var = Variable::new(name, VariableMode::Output, ty);
        var.location = Some(location);
        var.location_frac = frac;
        self.shader.add_var(var)
    }

    /// Declares an input at `(location, frac)`.
    pub fn input(&mut self, name: &str, ty: Type, location: u32, frac: u8) -> VarId {
        let mut var = Variable::new(name, VariableMode::Input, ty);
        var.location = Some(location);
        var.location_frac = frac;
        self.shader.add_var(var)
    }

    pub fn var_mut(&mut self, id: VarId) -> &mut Variable {
        self.shader.var_mut(id)
    }

    fn fresh_value(&mut self) -> ValueId {
        let id = ValueId(self.next_value);
        self.next_value += 1;
        id
    }

    fn push(&mut self, instr: Instr) {
        self.shader
            .entry
            .blocks
            .last_mut()
            .expect("builder always has a block")
            .instrs
            .push(instr);
    }

    /// Starts a new basic block; subsequent instructions land there.
    pub fn start_block(&mut self) {
        self.shader.entry.blocks.push(Block::default());
    }

    pub fn imm(&mut self, value: Immediate) -> ValueId {
        let dst = self.fresh_value();
        self.push(Instr::Const { dst, value });
        dst
    }

    pub fn alu(&mut self, op: AluOp, args: Vec<ValueId>) -> ValueId {
        let dst = self.fresh_value();
        self.push(Instr::Alu { dst, op, args });
        dst
    }

    pub fn load(&mut self, var: VarId) -> ValueId {
        let dst = self.fresh_value();
        self.push(Instr::Load { dst, var });
        dst
    }

    pub fn interp_load(&mut self, var: VarId, op: InterpOp) -> ValueId {
        let dst = self.fresh_value();
        self.push(Instr::InterpLoad { dst, var, op, operand: None });
        dst
    }

    pub fn store(&mut self, var: VarId, value: ValueId) {
        self.push(Instr::Store { var, value });
    }

    pub fn finish(self) -> Shader {
        self.shader
    }
}
