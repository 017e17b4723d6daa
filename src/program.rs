//! Compiled bytecode and the per-program function table.

use itertools::Itertools;
use std::fmt;

use num_enum::{IntoPrimitive, TryFromPrimitive};

use crate::config::MAX_NUM_ARGUMENTS;
use crate::cursor::Cursor;
use crate::error::{Error, Result};
use crate::opcodes::Opcode;
use crate::var::Var;

#[derive(Debug, Clone, Copy, PartialEq, Eq, IntoPrimitive, TryFromPrimitive)]
#[repr(i32)]
pub enum MemorySegment {
    Argument = 0,
    Local,
    Global,
    Constant,
    Void,
}

impl MemorySegment {
    pub fn name(self) -> &'static str {
        match self {
            MemorySegment::Argument => "ARG",
            MemorySegment::Local => "LOCAL",
            MemorySegment::Global => "GLOBAL",
            MemorySegment::Constant => "CONST",
            MemorySegment::Void => "VOID",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Bytecode {
    pub op: Opcode,
    pub arg0: Var,
    pub arg1: Var,
}

impl Bytecode {
    pub fn serialize(&self, cursor: &mut Cursor) -> Result<()> {
        cursor.write_str(self.op.name())?;
        cursor.write_str(" ")?;
        self.arg0.serialize(cursor)?;
        cursor.write_str(" ")?;
        self.arg1.serialize(cursor)
    }

    pub fn deserialize(cursor: &mut Cursor) -> Result<Bytecode> {
        let name = cursor.eat_word();
        let op = Opcode::from_name(&name).ok_or(Error::Deserialization("opcode"))?;
        let arg0 = Var::deserialize(cursor)?;
        let arg1 = Var::deserialize(cursor)?;
        Ok(Bytecode { op, arg0, arg1 })
    }
}

impl fmt::Display for Bytecode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.op {
            Opcode::Load | Opcode::Store | Opcode::StoreF => {
                let seg = self
                    .arg0
                    .as_i32()
                    .ok()
                    .and_then(|i| MemorySegment::try_from(i).ok())
                    .map(|s| s.name())
                    .unwrap_or("?");
                write!(f, "{}\t{}\t{}", self.op, seg, self.arg1)
            }
            Opcode::Jump | Opcode::JumpIf => match self.arg0 {
                Var::Int(i) if i > 0 => write!(f, "{}\t+{}", self.op, i),
                _ => write!(f, "{}\t{}", self.op, self.arg0),
            },
            Opcode::Native => write!(f, "{}\t{}\t{}", self.op, self.arg0, self.arg1),
            Opcode::Pile => write!(f, "{}\t{}", self.op, self.arg0),
            _ => write!(f, "{}", self.op),
        }
    }
}

/// Everything the VM needs to call one top-level function.
#[derive(Debug, Clone)]
pub struct FnInfo {
    pub index: i32,
    pub fn_name: i32,
    pub arg_address: i32,
    pub body_address: i32,
    pub num_args: i32,
    /// Label symbol of each formal argument, in declaration order.
    pub argument_offsets: [Option<i32>; MAX_NUM_ARGUMENTS],
}

impl FnInfo {
    pub fn new(index: i32, fn_name: i32) -> Self {
        FnInfo {
            index,
            fn_name,
            arg_address: 0,
            body_address: 0,
            num_args: 0,
            argument_offsets: [None; MAX_NUM_ARGUMENTS],
        }
    }

    /// Maps a label symbol to its value slot in argument memory.
    pub fn argument_mapping(&self, label: i32) -> Option<i32> {
        for (i, offset) in self.argument_offsets.iter().enumerate() {
            match offset {
                None => return None,
                Some(iname) if *iname == label => return Some(i as i32 * 2 + 1),
                Some(_) => {}
            }
        }
        None
    }
}

#[derive(Debug)]
pub struct Program {
    pub code: Vec<Bytecode>,
    pub code_max_size: usize,
    /// Dense table of top-level functions.
    pub fn_info: Vec<FnInfo>,
}

impl Program {
    pub fn with_capacity(code_max_size: usize) -> Self {
        Program {
            code: Vec::with_capacity(code_max_size),
            code_max_size,
            fn_info: Vec::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.code.len()
    }

    pub fn is_empty(&self) -> bool {
        self.code.is_empty()
    }

    /// The final opcode of a compiled program is always `STOP`.
    pub fn stop_location(&self) -> usize {
        self.code.len().saturating_sub(1)
    }

    pub fn fn_info_index(&self, fn_name: i32) -> Option<usize> {
        self.fn_info.iter().position(|fi| fi.fn_name == fn_name)
    }

    /// The `fn_info` table is not serialized; only trait programs round
    /// trip through this path and they never carry top-level functions.
    pub fn serialize(&self, cursor: &mut Cursor) -> Result<()> {
        cursor.write_fmt(format_args!("{} {} ", self.code_max_size, self.code.len()))?;
        for (i, bc) in self.code.iter().enumerate() {
            bc.serialize(cursor)?;
            if i + 1 < self.code.len() {
                cursor.write_str(" ")?;
            }
        }
        Ok(())
    }

    pub fn deserialize(cursor: &mut Cursor) -> Result<Program> {
        let code_max_size = cursor.eat_i32()? as usize;
        let code_size = cursor.eat_i32()? as usize;

        let mut program = Program::with_capacity(code_max_size);
        for _ in 0..code_size {
            program.code.push(Bytecode::deserialize(cursor)?);
        }
        Ok(program)
    }
}

impl fmt::Display for Program {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let listing = self
            .code
            .iter()
            .enumerate()
            .format_with("\n", |(i, bc), g| g(&format_args!("{}\t{}", i, bc)));
        write!(f, "{}", listing)
    }
}
