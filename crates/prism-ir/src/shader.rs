//! The per-stage shader container and its linker-maintained metadata.

use crate::instr::Function;
use crate::variable::{VarId, Variable, VariableMode};

/// Pipeline stage a shader belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Stage {
    Vertex,
    TessControl,
    TessEval,
    Geometry,
    Fragment,
}

/// Shader-level usage bitmasks, maintained by the linker.
///
/// The `u64` masks are indexed by absolute varying slot; the `u32` patch
/// masks are indexed relative to the first generic patch slot.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ShaderInfo {
    pub inputs_read: u64,
    pub outputs_written: u64,
    /// Output slots read back within the same stage (tessellation control).
    pub outputs_read: u64,
    pub patch_inputs_read: u32,
    pub patch_outputs_written: u32,
    pub patch_outputs_read: u32,
}

/// One shader: its stage, variable table, single entry function, and usage
/// metadata. Exclusively owned and mutated in place for the duration of a
/// linking call.
#[derive(Debug, Clone, PartialEq)]
pub struct Shader {
    pub stage: Stage,
    pub vars: Vec<Variable>,
    pub entry: Function,
    pub info: ShaderInfo,
}

impl Shader {
    pub fn new(stage: Stage) -> Self {
        Shader {
            stage,
            vars: Vec::new(),
            entry: Function::default(),
            info: ShaderInfo::default(),
        }
    }

    pub fn add_var(&mut self, var: Variable) -> VarId {
        let id = VarId(self.vars.len() as u32);
        self.vars.push(var);
        id
    }

    pub fn var(&self, id: VarId) -> &Variable {
        &self.vars[id.0 as usize]
    }

    pub fn var_mut(&mut self, id: VarId) -> &mut Variable {
        &mut self.vars[id.0 as usize]
    }

    pub fn vars_with_mode(
        &self,
        mode: VariableMode,
    ) -> impl Iterator<Item = (VarId, &Variable)> + '_ {
        self.vars
            .iter()
            .enumerate()
            .filter(move |(_, v)| v.mode == mode)
            .map(|(i, v)| (VarId(i as u32), v))
    }

    /// Ids of all variables of `mode`, for loops that mutate while walking.
    pub fn var_ids_with_mode(&self, mode: VariableMode) -> Vec<VarId> {
        self.vars_with_mode(mode).map(|(id, _)| id).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Scalar, Type};

    #[test]
    fn mode_filtered_iteration() {
        let mut shader = Shader::new(Stage::Vertex);
        let a = shader.add_var(Variable::new(
            "a",
            VariableMode::Output,
            Type::Scalar(Scalar::F32),
        ));
        shader.add_var(Variable::new(
            "t",
            VariableMode::Temp,
            Type::Scalar(Scalar::F32),
        ));
        let b = shader.add_var(Variable::new(
            "b",
            VariableMode::Output,
            Type::Scalar(Scalar::F32),
        ));

        assert_eq!(shader.var_ids_with_mode(VariableMode::Output), vec![a, b]);
        assert!(shader.var_ids_with_mode(VariableMode::Input).is_empty());
    }
}
