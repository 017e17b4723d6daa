//! The stack machine.
//!
//! Single-threaded and non-suspending: `run` executes the shared preamble
//! and then the user program straight through to `STOP` or a fatal error.
//!
//! Stack layout, bottom to top: the global segment, then frames. Each
//! frame is `[saved fp, saved ip, num_args, locals…, operand stack…]` with
//! the `num_args * 2` argument slots sitting directly below the frame
//! base. A function invocation CALLs into the argument prologue (which
//! fills the argument slots with defaults and returns with `RET_0`,
//! leaving the frame active), overwrites any explicitly passed arguments,
//! then CALL_0s into the body; `RET` tears the frame down and hands the
//! return value to the caller.

use log::{debug, error};
use std::any::Any;

use crate::config::{HEAP_MIN_SIZE, HEAP_SIZE, MEMORY_GLOBAL_SIZE, MEMORY_LOCAL_SIZE, STACK_SIZE};
use crate::engine::Engine;
use crate::error::{Error, Result};
use crate::heap::{Heap, HeapId};
use crate::matrix::MatrixStack;
use crate::opcodes::Opcode;
use crate::program::{MemorySegment, Program};
use crate::prng::PrngState;
use crate::var::Var;

pub struct Vm {
    pub stack: Vec<Var>,
    pub sp: usize,
    pub fp: usize,
    pub ip: usize,

    /// Base of the global segment.
    pub global: usize,
    /// Base of the current frame's locals.
    pub local: usize,

    pub heap: Heap,
    pub matrix_stack: MatrixStack,
    pub prng_state: PrngState,

    /// Carried from the genotype builder to the `gen/*` natives so a
    /// vector-valued generator can pick the component for the trait being
    /// built.
    pub building_with_trait_within_vector: bool,
    pub trait_within_vector_index: i32,

    pub opcodes_executed: u64,

    /// Opaque host storage reachable from native functions; the core never
    /// looks inside.
    pub render_data: Option<Box<dyn Any>>,
}

impl Default for Vm {
    fn default() -> Self {
        Self::new()
    }
}

impl Vm {
    pub fn new() -> Self {
        let mut vm = Vm {
            stack: vec![Var::Int(0); STACK_SIZE],
            sp: 0,
            fp: 0,
            ip: 0,
            global: 0,
            local: 0,
            heap: Heap::new(HEAP_SIZE, HEAP_MIN_SIZE),
            matrix_stack: MatrixStack::new(),
            prng_state: PrngState::new(0),
            building_with_trait_within_vector: false,
            trait_within_vector_index: 0,
            opcodes_executed: 0,
            render_data: None,
        };
        vm.reset();
        vm
    }

    /// Restores the VM to its pristine launch state. The heap free list is
    /// rebuilt over the whole slab.
    pub fn reset(&mut self) {
        for slot in self.stack.iter_mut() {
            *slot = Var::Int(0);
        }

        self.global = 0;
        self.ip = 0;

        // a base frame so top-level code has locals of its own
        self.fp = self.global + MEMORY_GLOBAL_SIZE;
        self.stack[self.fp] = Var::Int(self.fp as i32);
        self.stack[self.fp + 1] = Var::Int(0);
        self.stack[self.fp + 2] = Var::Int(0);

        self.local = self.fp + 3;
        self.sp = self.local + MEMORY_LOCAL_SIZE;

        self.heap.reset();
        self.matrix_stack.reset();

        self.building_with_trait_within_vector = false;
        self.trait_within_vector_index = 0;
        self.opcodes_executed = 0;
    }

    pub fn stack_peek(&self) -> Result<Var> {
        if self.sp == 0 {
            return Err(Error::StackUnderflow);
        }
        Ok(self.stack[self.sp - 1])
    }

    fn push(&mut self, var: Var) -> Result<()> {
        if self.sp >= self.stack.len() {
            error!("vm: stack overflow");
            return Err(Error::StackOverflow);
        }
        self.stack[self.sp] = var;
        self.sp += 1;
        Ok(())
    }

    fn pop(&mut self) -> Result<Var> {
        if self.sp == 0 {
            error!("vm: stack underflow");
            return Err(Error::StackUnderflow);
        }
        self.sp -= 1;
        Ok(self.stack[self.sp])
    }

    fn pop_f32(&mut self) -> Result<f32> {
        self.pop()?.as_f32()
    }

    fn pop_i32(&mut self) -> Result<i32> {
        self.pop()?.as_i32()
    }

    fn frame_num_args(&self) -> Result<usize> {
        self.stack[self.fp + 2].as_i32().map(|n| n as usize)
    }

    fn argument_address(&self, slot: usize) -> Result<usize> {
        let num_args = self.frame_num_args()?;
        Ok(self.fp - num_args * 2 + slot)
    }

    /// Reads the `(label, value)` pairs a `NATIVE` opcode has on the
    /// operand stack, bottom-up.
    pub fn native_arg_pairs(&self, num_args: i32) -> Result<Vec<(i32, Var)>> {
        let total = num_args as usize * 2;
        if self.sp < total {
            return Err(Error::StackUnderflow);
        }
        let base = self.sp - total;
        let mut pairs = Vec::with_capacity(num_args as usize);
        for k in 0..num_args as usize {
            let label = self.stack[base + k * 2].as_i32()?;
            let value = self.stack[base + k * 2 + 1];
            pairs.push((label, value));
        }
        Ok(pairs)
    }

    /// Collects every vector handle visible from live stack slots and
    /// sweeps the rest of the heap back onto the free list.
    fn gc(&mut self) {
        let roots: Vec<Option<HeapId>> = self.stack[..self.sp]
            .iter()
            .filter_map(|v| match v {
                Var::Vector(head) => Some(*head),
                _ => None,
            })
            .collect();
        self.heap.mark_sweep(roots.into_iter());
        debug!("vm: gc, {} cells available", self.heap.avail());
    }

    fn store_slot(&mut self, addr: usize, value: Var, reclaim: bool) {
        if reclaim {
            if let Var::Vector(old_head) = self.stack[addr] {
                // an append leaves the head cell in place, so only a
                // genuinely different chain is returned to the free list
                let same_chain = matches!(value, Var::Vector(new_head) if new_head == old_head);
                if !same_chain {
                    self.heap.free_chain(old_head);
                }
            }
        }
        self.stack[addr] = value;
    }

    fn segment(arg0: &Var) -> Result<MemorySegment> {
        let i = arg0.as_i32()?;
        MemorySegment::try_from(i).map_err(|_| {
            error!("vm: unknown memory segment {}", i);
            Error::UnknownMemorySegment(i)
        })
    }

    fn op_load(&mut self, arg0: &Var, arg1: &Var) -> Result<()> {
        match Self::segment(arg0)? {
            MemorySegment::Constant => self.push(*arg1),
            MemorySegment::Local => {
                let addr = self.local + arg1.as_i32()? as usize;
                self.push(self.stack[addr])
            }
            MemorySegment::Global => {
                let addr = self.global + arg1.as_i32()? as usize;
                self.push(self.stack[addr])
            }
            MemorySegment::Argument => {
                let addr = self.argument_address(arg1.as_i32()? as usize)?;
                self.push(self.stack[addr])
            }
            // loading from the void constructs a fresh empty vector
            MemorySegment::Void => self.push(Var::Vector(None)),
        }
    }

    fn op_store(&mut self, arg0: &Var, arg1: &Var) -> Result<()> {
        let value = self.pop()?;
        match Self::segment(arg0)? {
            MemorySegment::Local => {
                let addr = self.local + arg1.as_i32()? as usize;
                self.store_slot(addr, value, true);
                Ok(())
            }
            MemorySegment::Global => {
                let addr = self.global + arg1.as_i32()? as usize;
                self.store_slot(addr, value, true);
                Ok(())
            }
            MemorySegment::Argument => {
                // argument slots are scratch between CALL and CALL_0, so
                // whatever they held is not reclaimed here
                let addr = self.argument_address(arg1.as_i32()? as usize)?;
                self.store_slot(addr, value, false);
                Ok(())
            }
            MemorySegment::Void => Ok(()),
            MemorySegment::Constant => Err(Error::UnknownMemorySegment(
                MemorySegment::Constant as i32,
            )),
        }
    }

    fn push_frame(&mut self, arg_addr: usize, num_args: usize) -> Result<()> {
        // reserve the argument slots; the callee's prologue fills them
        let needed = self.sp + num_args * 2 + 3 + MEMORY_LOCAL_SIZE;
        if needed > self.stack.len() {
            error!("vm: stack overflow pushing a frame");
            return Err(Error::StackOverflow);
        }
        self.sp += num_args * 2;

        let new_fp = self.sp;
        self.stack[self.sp] = Var::Int(self.fp as i32);
        self.sp += 1;
        self.stack[self.sp] = Var::Int(self.ip as i32);
        self.sp += 1;
        self.stack[self.sp] = Var::Int(num_args as i32);
        self.sp += 1;

        self.fp = new_fp;
        self.local = self.sp;

        // stale values in the local region must not look like live vectors
        for _ in 0..MEMORY_LOCAL_SIZE {
            self.stack[self.sp] = Var::Int(0);
            self.sp += 1;
        }

        self.ip = arg_addr;
        Ok(())
    }

    fn op_call(&mut self) -> Result<()> {
        let num_args = self.pop_i32()? as usize;
        let arg_addr = self.pop_i32()? as usize;
        self.push_frame(arg_addr, num_args)
    }

    fn op_ret(&mut self) -> Result<()> {
        let ret_val = self.pop()?;

        let caller_fp = self.stack[self.fp].as_i32()? as usize;
        let caller_ip = self.stack[self.fp + 1].as_i32()? as usize;
        let num_args = self.frame_num_args()?;

        // drop the frame and its argument slots
        self.sp = self.fp - num_args * 2;
        self.fp = caller_fp;
        self.local = caller_fp + 3;
        self.ip = caller_ip;

        self.push(ret_val)
    }

    fn op_ret_0(&mut self) -> Result<()> {
        // only the instruction pointer returns to the caller: the frame
        // stays active so the caller can overwrite argument slots before
        // CALL_0 runs the body
        self.ip = self.stack[self.fp + 1].as_i32()? as usize;
        Ok(())
    }

    fn fn_info_from_stack<'a>(&mut self, program: &'a Program) -> Result<&'a crate::program::FnInfo> {
        let index = self.pop_i32()?;
        program.fn_info.get(index as usize).ok_or_else(|| {
            error!("vm: no fn_info at index {}", index);
            Error::UnableToFindFnInfo
        })
    }

    fn op_append(&mut self) -> Result<()> {
        if self.heap.wants_gc() {
            self.gc();
        }

        let item = self.pop()?;
        let head = match self.stack_peek()? {
            Var::Vector(head) => head,
            _ => return Err(Error::InvalidStackValue("a vector to append to")),
        };
        let new_head = self.heap.append(head, item)?;
        self.stack[self.sp - 1] = Var::Vector(Some(new_head));
        Ok(())
    }

    fn op_pile(&mut self, arg0: &Var) -> Result<()> {
        let expected = arg0.as_i32()?;
        match self.pop()? {
            Var::V2(a, b) => {
                if expected != 2 {
                    return Err(Error::PileLengthMismatch {
                        expected,
                        actual: 2,
                    });
                }
                self.push(Var::Float(a))?;
                self.push(Var::Float(b))
            }
            Var::Vector(head) => {
                let actual = self.heap.chain_length(head);
                if actual != expected {
                    error!("vm: pile expected {} elements, got {}", expected, actual);
                    return Err(Error::PileLengthMismatch { expected, actual });
                }
                let elements: Vec<Var> = self.heap.chain_iter(head).copied().collect();
                for element in elements {
                    self.push(element)?;
                }
                Ok(())
            }
            _ => Err(Error::InvalidStackValue("a vector to unpack")),
        }
    }

    fn op_native(&mut self, engine: &Engine, arg0: &Var, arg1: &Var) -> Result<()> {
        let iname = arg0.as_i32()?;
        let num_args = arg1.as_i32()?;

        let native = engine.native(iname).ok_or_else(|| {
            error!("vm: native {} not registered", iname);
            Error::NativeNotRegistered(iname)
        })?;

        let result = native(self, num_args)?;

        self.sp -= num_args as usize * 2;
        self.push(result)
    }

    fn binary_float<F>(&mut self, f: F) -> Result<()>
    where
        F: FnOnce(f32, f32) -> Result<f32>,
    {
        let b = self.pop_f32()?;
        let a = self.pop_f32()?;
        self.push(Var::Float(f(a, b)?))
    }

    fn compare<F>(&mut self, f: F) -> Result<()>
    where
        F: FnOnce(f32, f32) -> bool,
    {
        let b = self.pop_f32()?;
        let a = self.pop_f32()?;
        self.push(Var::Bool(f(a, b)))
    }

    fn op_eq(&mut self) -> Result<()> {
        let b = self.pop()?;
        let a = self.pop()?;
        let eq = match (&a, &b) {
            (Var::Int(_), _) | (Var::Float(_), _)
                if matches!(b, Var::Int(_) | Var::Float(_)) =>
            {
                a.as_f32()? == b.as_f32()?
            }
            (Var::Name(x), Var::Name(y)) => x == y,
            (Var::Bool(x), Var::Bool(y)) => x == y,
            (Var::V2(x0, y0), Var::V2(x1, y1)) => x0 == x1 && y0 == y1,
            (Var::Colour(x), Var::Colour(y)) => x == y,
            _ => false,
        };
        self.push(Var::Bool(eq))
    }

    /// Executes `program` from its first instruction to `STOP`.
    pub fn interpret(&mut self, engine: &Engine, program: &Program) -> Result<()> {
        self.ip = 0;

        loop {
            if self.ip >= program.code.len() {
                error!("vm: instruction pointer {} outside program", self.ip);
                return Err(Error::GeneralError("instruction pointer outside program"));
            }

            let at = self.ip;
            let bc = program.code[at].clone();
            self.ip += 1;
            self.opcodes_executed += 1;

            match bc.op {
                Opcode::Load => self.op_load(&bc.arg0, &bc.arg1)?,
                Opcode::Store => self.op_store(&bc.arg0, &bc.arg1)?,

                Opcode::Squish2 => {
                    let b = self.pop_f32()?;
                    let a = self.pop_f32()?;
                    self.push(Var::V2(a, b))?;
                }

                Opcode::Add => self.binary_float(|a, b| Ok(a + b))?,
                Opcode::Sub => self.binary_float(|a, b| Ok(a - b))?,
                Opcode::Mul => self.binary_float(|a, b| Ok(a * b))?,
                Opcode::Div => self.binary_float(|a, b| {
                    if b == 0.0 {
                        error!("vm: divide by zero");
                        Err(Error::DivideByZero)
                    } else {
                        Ok(a / b)
                    }
                })?,
                Opcode::Mod => self.binary_float(|a, b| {
                    if b == 0.0 {
                        error!("vm: mod by zero");
                        Err(Error::DivideByZero)
                    } else {
                        Ok(a % b)
                    }
                })?,
                Opcode::Neg => {
                    let a = self.pop_f32()?;
                    self.push(Var::Float(-a))?;
                }
                Opcode::Sqrt => {
                    let a = self.pop_f32()?;
                    self.push(Var::Float(a.sqrt()))?;
                }

                Opcode::Eq => self.op_eq()?,
                Opcode::Gt => self.compare(|a, b| a > b)?,
                Opcode::Lt => self.compare(|a, b| a < b)?,

                Opcode::And => {
                    let b = self.pop()?.is_truthy()?;
                    let a = self.pop()?.is_truthy()?;
                    self.push(Var::Bool(a && b))?;
                }
                Opcode::Or => {
                    let b = self.pop()?.is_truthy()?;
                    let a = self.pop()?.is_truthy()?;
                    self.push(Var::Bool(a || b))?;
                }
                Opcode::Not => {
                    let a = self.pop()?.is_truthy()?;
                    self.push(Var::Bool(!a))?;
                }

                Opcode::Jump => {
                    self.ip = (at as i32 + bc.arg0.as_i32()?) as usize;
                }
                Opcode::JumpIf => {
                    if !self.pop()?.is_truthy()? {
                        self.ip = (at as i32 + bc.arg0.as_i32()?) as usize;
                    }
                }

                Opcode::Call => self.op_call()?,
                Opcode::Call0 => {
                    let body_addr = self.pop_i32()? as usize;
                    // re-point the frame's return address past this
                    // instruction; the RET at the end of the body lands
                    // here rather than back at the argument stores
                    self.stack[self.fp + 1] = Var::Int(self.ip as i32);
                    self.ip = body_addr;
                }
                Opcode::Ret => self.op_ret()?,
                Opcode::Ret0 => self.op_ret_0()?,

                Opcode::CallF => {
                    let fi = self.fn_info_from_stack(program)?;
                    let (arg_addr, num_args) = (fi.arg_address as usize, fi.num_args as usize);
                    self.push_frame(arg_addr, num_args)?;
                }
                Opcode::CallF0 => {
                    let fi = self.fn_info_from_stack(program)?;
                    self.stack[self.fp + 1] = Var::Int(self.ip as i32);
                    self.ip = fi.body_address as usize;
                }
                Opcode::StoreF => {
                    let fi = self.fn_info_from_stack(program)?;
                    let label = bc.arg1.as_i32()?;
                    let slot = fi.argument_mapping(label);
                    let value = self.pop()?;
                    if let Some(slot) = slot {
                        let addr = self.argument_address(slot as usize)?;
                        self.store_slot(addr, value, false);
                    }
                }

                Opcode::Native => self.op_native(engine, &bc.arg0, &bc.arg1)?,
                Opcode::Append => self.op_append()?,
                Opcode::Pile => self.op_pile(&bc.arg0)?,

                Opcode::PlaceholderStore => {
                    error!("vm: placeholder store survived compilation");
                    return Err(Error::GeneralError("placeholder store reached the vm"));
                }

                Opcode::MtxLoad => self.matrix_stack.push(),
                Opcode::MtxStore => {
                    self.matrix_stack.pop()?;
                }

                Opcode::Nop => {}
                Opcode::Stop => return Ok(()),
            }
        }
    }

    /// Runs the engine's preamble (binding the shared globals) and then the
    /// given program.
    pub fn run(&mut self, engine: &Engine, program: &Program) -> Result<()> {
        self.interpret(engine, engine.preamble())?;
        self.interpret(engine, program)
    }
}
