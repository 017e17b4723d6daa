//! The VM's instruction set.

use num_enum::{IntoPrimitive, TryFromPrimitive};

#[derive(Debug, Clone, Copy, PartialEq, Eq, IntoPrimitive, TryFromPrimitive)]
#[repr(u8)]
pub enum Opcode {
    Load,
    Store,
    Squish2,
    Add,
    Sub,
    Mul,
    Div,
    Mod,
    Neg,
    Sqrt,
    Eq,
    Gt,
    Lt,
    And,
    Or,
    Not,
    Jump,
    JumpIf,
    Call,
    Call0,
    Ret,
    Ret0,
    CallF,
    CallF0,
    Native,
    Append,
    Pile,
    StoreF,
    PlaceholderStore,
    MtxLoad,
    MtxStore,
    Nop,
    Stop,
}

impl Opcode {
    /// Compile-time net effect on the operand stack, used to keep the
    /// compiler's virtual stack offset aligned across jumps. `Native` and
    /// `Pile` are corrected by the compiler per instruction.
    pub fn stack_delta(self) -> i32 {
        match self {
            Opcode::Load => 1,
            Opcode::Store => -1,
            Opcode::Squish2 => -1,
            Opcode::Add
            | Opcode::Sub
            | Opcode::Mul
            | Opcode::Div
            | Opcode::Mod
            | Opcode::Eq
            | Opcode::Gt
            | Opcode::Lt
            | Opcode::And
            | Opcode::Or => -1,
            Opcode::Neg | Opcode::Sqrt | Opcode::Not => 0,
            Opcode::Jump => 0,
            Opcode::JumpIf => -1,
            Opcode::Call => -2,
            Opcode::Call0 => 0,
            Opcode::Ret | Opcode::Ret0 => 0,
            Opcode::CallF => -1,
            Opcode::CallF0 => 0,
            Opcode::Native => 0,
            Opcode::Append => -1,
            Opcode::Pile => 0,
            Opcode::StoreF => -2,
            Opcode::PlaceholderStore => -1,
            Opcode::MtxLoad | Opcode::MtxStore => 0,
            Opcode::Nop | Opcode::Stop => 0,
        }
    }

    /// Serialized spelling.
    pub fn name(self) -> &'static str {
        match self {
            Opcode::Load => "LOAD",
            Opcode::Store => "STORE",
            Opcode::Squish2 => "SQUISH2",
            Opcode::Add => "ADD",
            Opcode::Sub => "SUB",
            Opcode::Mul => "MUL",
            Opcode::Div => "DIV",
            Opcode::Mod => "MOD",
            Opcode::Neg => "NEG",
            Opcode::Sqrt => "SQRT",
            Opcode::Eq => "EQ",
            Opcode::Gt => "GT",
            Opcode::Lt => "LT",
            Opcode::And => "AND",
            Opcode::Or => "OR",
            Opcode::Not => "NOT",
            Opcode::Jump => "JUMP",
            Opcode::JumpIf => "JUMP_IF",
            Opcode::Call => "CALL",
            Opcode::Call0 => "CALL_0",
            Opcode::Ret => "RET",
            Opcode::Ret0 => "RET_0",
            Opcode::CallF => "CALL_F",
            Opcode::CallF0 => "CALL_F_0",
            Opcode::Native => "NATIVE",
            Opcode::Append => "APPEND",
            Opcode::Pile => "PILE",
            Opcode::StoreF => "STORE_F",
            Opcode::PlaceholderStore => "PLACEHOLDER_STORE",
            Opcode::MtxLoad => "MTX_LOAD",
            Opcode::MtxStore => "MTX_STORE",
            Opcode::Nop => "NOP",
            Opcode::Stop => "STOP",
        }
    }

    pub fn from_name(name: &str) -> Option<Opcode> {
        let all = [
            Opcode::Load,
            Opcode::Store,
            Opcode::Squish2,
            Opcode::Add,
            Opcode::Sub,
            Opcode::Mul,
            Opcode::Div,
            Opcode::Mod,
            Opcode::Neg,
            Opcode::Sqrt,
            Opcode::Eq,
            Opcode::Gt,
            Opcode::Lt,
            Opcode::And,
            Opcode::Or,
            Opcode::Not,
            Opcode::Jump,
            Opcode::JumpIf,
            Opcode::Call,
            Opcode::Call0,
            Opcode::Ret,
            Opcode::Ret0,
            Opcode::CallF,
            Opcode::CallF0,
            Opcode::Native,
            Opcode::Append,
            Opcode::Pile,
            Opcode::StoreF,
            Opcode::PlaceholderStore,
            Opcode::MtxLoad,
            Opcode::MtxStore,
            Opcode::Nop,
            Opcode::Stop,
        ];
        all.into_iter().find(|op| op.name() == name)
    }
}

impl std::fmt::Display for Opcode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}
