//! AST → bytecode.
//!
//! Compilation runs a set of pre-passes (registering the preamble globals,
//! top-level functions and top-level defines), emits the entry jump, the
//! function bodies, the global defines and the remaining top-level forms,
//! and finishes with a fix-up pass that patches call sites with the
//! addresses discovered while emitting the function bodies. Each
//! expression compiler returns the node to continue from, which is what
//! lets `define` consume an arbitrary number of lhs/rhs pairs.

use log::{error, warn};

use crate::config::{
    is_keyword, is_native, is_word, MAX_NUM_ARGUMENTS, MAX_PREAMBLE_PROGRAM_SIZE,
    MAX_TOP_LEVEL_FUNCTIONS, MEMORY_GLOBAL_SIZE, MEMORY_LOCAL_SIZE,
};
use crate::error::{Error, Result};
use crate::genetic::{GeneCursor, Genotype};
use crate::keywords::{is_colour_constructor, Keyword};
use crate::node::{Ast, Node, NodeArena, NodeId, NodeKind};
use crate::opcodes::Opcode;
use crate::program::{Bytecode, FnInfo, MemorySegment, Program};
use crate::var::{Colour, Var};
use crate::word_lut::WordLut;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum LocalSlot {
    Free,
    /// Compiler-managed slot with no word attached (fence internals).
    Internal,
    Word(i32),
}

pub struct Compilation<'a> {
    program: &'a mut Program,
    word_lut: &'a WordLut,

    /// Net stack movement of the code emitted so far; kept aligned across
    /// jumps so loops can pop body leftovers.
    opcode_offset: i32,

    global_mappings: [Option<i32>; MEMORY_GLOBAL_SIZE],
    local_mappings: [LocalSlot; MEMORY_LOCAL_SIZE],
    current_fn_info: Option<usize>,

    use_genes: bool,
}

impl<'a> Compilation<'a> {
    pub fn new(program: &'a mut Program, word_lut: &'a WordLut) -> Self {
        Compilation {
            program,
            word_lut,
            opcode_offset: 0,
            global_mappings: [None; MEMORY_GLOBAL_SIZE],
            local_mappings: [LocalSlot::Free; MEMORY_LOCAL_SIZE],
            current_fn_info: None,
            use_genes: false,
        }
    }

    // ---------------------------------------------------------------
    // emission
    // ---------------------------------------------------------------

    fn emit(&mut self, op: Opcode, arg0: Var, arg1: Var) -> Result<usize> {
        if self.program.code.len() >= self.program.code_max_size {
            error!("program has reached max size {}", self.program.code_max_size);
            return Err(Error::ProgramReachedMaxSize);
        }
        self.program.code.push(Bytecode { op, arg0, arg1 });
        self.opcode_offset += op.stack_delta();
        Ok(self.program.code.len() - 1)
    }

    fn emit_i32(&mut self, op: Opcode, arg0: i32, arg1: i32) -> Result<usize> {
        self.emit(op, Var::Int(arg0), Var::Int(arg1))
    }

    fn emit_seg_i32(&mut self, op: Opcode, seg: MemorySegment, arg1: i32) -> Result<usize> {
        self.emit(op, Var::Int(seg.into()), Var::Int(arg1))
    }

    fn emit_seg_f32(&mut self, op: Opcode, seg: MemorySegment, arg1: f32) -> Result<usize> {
        self.emit(op, Var::Int(seg.into()), Var::Float(arg1))
    }

    fn emit_seg_name(&mut self, op: Opcode, seg: MemorySegment, iname: i32) -> Result<usize> {
        self.emit(op, Var::Int(seg.into()), Var::Name(iname))
    }

    fn emit_seg_var(&mut self, op: Opcode, seg: MemorySegment, arg1: Var) -> Result<usize> {
        self.emit(op, Var::Int(seg.into()), arg1)
    }

    fn patch_jump(&mut self, at: usize, offset: i32) {
        self.program.code[at].arg0 = Var::Int(offset);
    }

    // ---------------------------------------------------------------
    // symbol → slot mappings
    // ---------------------------------------------------------------

    fn add_local_mapping(&mut self, iname: i32) -> Result<i32> {
        for (i, slot) in self.local_mappings.iter_mut().enumerate() {
            if *slot == LocalSlot::Free {
                *slot = LocalSlot::Word(iname);
                return Ok(i as i32);
            }
        }
        error!("add_local_mapping failed: all {} local slots in use", MEMORY_LOCAL_SIZE);
        Err(Error::AllocationFailure("local mappings"))
    }

    fn add_internal_local_mapping(&mut self) -> Result<i32> {
        for (i, slot) in self.local_mappings.iter_mut().enumerate() {
            if *slot == LocalSlot::Free {
                *slot = LocalSlot::Internal;
                return Ok(i as i32);
            }
        }
        error!("add_internal_local_mapping failed: all {} local slots in use", MEMORY_LOCAL_SIZE);
        Err(Error::AllocationFailure("local mappings"))
    }

    fn get_local_mapping(&self, iname: i32) -> Option<i32> {
        self.local_mappings
            .iter()
            .position(|slot| *slot == LocalSlot::Word(iname))
            .map(|i| i as i32)
    }

    fn add_global_mapping(&mut self, iname: i32) -> Result<i32> {
        for (i, slot) in self.global_mappings.iter_mut().enumerate() {
            if slot.is_none() {
                *slot = Some(iname);
                return Ok(i as i32);
            }
        }
        error!("add_global_mapping failed: all {} global slots in use", MEMORY_GLOBAL_SIZE);
        Err(Error::AllocationFailure("global mappings"))
    }

    fn get_global_mapping(&self, iname: i32) -> Option<i32> {
        self.global_mappings
            .iter()
            .position(|slot| *slot == Some(iname))
            .map(|i| i as i32)
    }

    // ---------------------------------------------------------------
    // node value access, gene-aware
    // ---------------------------------------------------------------

    fn alterable(&self, node: &Node) -> bool {
        node.alterable && self.use_genes
    }

    fn gene_of<'n>(&self, node: &'n Node) -> Result<&'n Var> {
        node.gene.as_ref().ok_or_else(|| {
            error!("alterable node has no gene");
            Error::NullGene
        })
    }

    fn gene_i32(&self, node: &Node) -> Result<i32> {
        match self.gene_of(node)? {
            Var::Int(i) => Ok(*i),
            Var::Float(f) => Ok(*f as i32),
            // an altered name substitutes the gene's symbol id
            Var::Name(n) => Ok(*n),
            other => {
                error!("integer node cannot take a {} gene", other.type_name());
                Err(Error::IncompatibleGene)
            }
        }
    }

    fn gene_f32(&self, node: &Node) -> Result<f32> {
        match self.gene_of(node)? {
            Var::Float(f) => Ok(*f),
            Var::Int(i) => Ok(*i as f32),
            other => {
                error!("float node cannot take a {} gene", other.type_name());
                Err(Error::IncompatibleGene)
            }
        }
    }

    fn node_i32(&self, node: &Node) -> Result<i32> {
        if self.alterable(node) {
            return self.gene_i32(node);
        }
        match node.kind {
            NodeKind::Int(i) => Ok(i),
            NodeKind::Float(f) => Ok(f as i32),
            NodeKind::Name(i) | NodeKind::Label(i) | NodeKind::String(i) => Ok(i),
            _ => Err(Error::ExpectedNameNode),
        }
    }

    fn node_f32(&self, node: &Node) -> Result<f32> {
        if self.alterable(node) {
            return self.gene_f32(node);
        }
        match node.kind {
            NodeKind::Float(f) => Ok(f),
            NodeKind::Int(i) => Ok(i as f32),
            _ => Err(Error::ExpectedNameNode),
        }
    }

    // ---------------------------------------------------------------
    // stores
    // ---------------------------------------------------------------

    fn store_locally(&mut self, iname: i32) -> Result<i32> {
        let address = match self.get_local_mapping(iname) {
            Some(address) => address,
            None => self.add_local_mapping(iname)?,
        };
        self.emit_seg_i32(Opcode::Store, MemorySegment::Local, address)?;
        Ok(address)
    }

    fn store_globally(&mut self, iname: i32) -> Result<i32> {
        let address = match self.get_global_mapping(iname) {
            Some(address) => address,
            None => self.add_global_mapping(iname)?,
        };
        self.emit_seg_i32(Opcode::Store, MemorySegment::Global, address)?;
        Ok(address)
    }

    fn store_from_stack_to_memory(
        &mut self,
        arena: &NodeArena,
        node_id: NodeId,
        segment: MemorySegment,
    ) -> Result<i32> {
        let iname = match arena.get(node_id).kind {
            NodeKind::Name(i) => i,
            _ => {
                error!("store target is not a name node");
                return Err(Error::ExpectedNameNode);
            }
        };
        match segment {
            MemorySegment::Local => self.store_locally(iname),
            MemorySegment::Global => self.store_globally(iname),
            other => {
                error!("store_from_stack_to_memory: unusable segment {:?}", other);
                Err(Error::UnknownMemorySegment(other.into()))
            }
        }
    }

    // ---------------------------------------------------------------
    // expression compilation
    // ---------------------------------------------------------------

    /// Compiles one expression and returns the node to continue from.
    fn compile(&mut self, arena: &NodeArena, node_id: NodeId) -> Result<Option<NodeId>> {
        let node = arena.get(node_id);

        match node.kind {
            NodeKind::List => {
                if self.alterable(node) && is_colour_constructor_list(arena, node_id) {
                    // the gene already holds the evaluated colour
                    let colour = match self.gene_of(node)? {
                        Var::Colour(c) => *c,
                        other => {
                            error!("colour constructor cannot take a {} gene", other.type_name());
                            return Err(Error::IncompatibleGene);
                        }
                    };
                    self.emit_seg_var(Opcode::Load, MemorySegment::Constant, Var::Colour(colour))?;
                    return Ok(arena.safe_next(node_id));
                }

                if self.alterable(node) {
                    error!("given an alterable list that wasn't a colour constructor");
                }

                if let Some(head) = arena.safe_first_child(node_id) {
                    if let NodeKind::Name(head_iname) = arena.get(head).kind {
                        if let Some(fn_idx) = self.program.fn_info_index(head_iname) {
                            self.compile_fn_invocation(arena, head, fn_idx)?;
                            return Ok(arena.safe_next(node_id));
                        }
                    }
                    self.compile(arena, head)?;
                }
                Ok(arena.safe_next(node_id))
            }

            NodeKind::Float(_) => {
                let f = self.node_f32(node)?;
                self.emit_seg_f32(Opcode::Load, MemorySegment::Constant, f)?;
                Ok(arena.safe_next(node_id))
            }

            NodeKind::Int(_) => {
                let i = self.node_i32(node)?;
                self.emit_seg_i32(Opcode::Load, MemorySegment::Constant, i)?;
                Ok(arena.safe_next(node_id))
            }

            NodeKind::Vector => {
                if arena.count_children(node_id) == 2 {
                    self.compile_2d(arena, node_id)?;
                } else {
                    self.compile_vector(arena, node_id)?;
                }
                Ok(arena.safe_next(node_id))
            }

            NodeKind::Name(_) => {
                let iname = self.node_i32(node)?;
                if is_word(iname) {
                    self.compile_user_defined_name(arena, node_id, iname)
                } else if is_keyword(iname) {
                    self.compile_keyword(arena, node_id, iname)
                } else if is_native(iname) {
                    self.compile_native_invocation(arena, node_id, iname)
                } else {
                    error!("name id {} outside every symbol range", iname);
                    Err(Error::UnknownMappingForName(format!("#{}", iname)))
                }
            }

            // whitespace, comments, labels and strings emit nothing here
            _ => Ok(arena.safe_next(node_id)),
        }
    }

    fn compile_keyword(
        &mut self,
        arena: &NodeArena,
        node_id: NodeId,
        iname: i32,
    ) -> Result<Option<NodeId>> {
        let keyword = match Keyword::try_from(iname) {
            Ok(kw) => kw,
            Err(_) => return self.compile_user_defined_name(arena, node_id, iname),
        };

        match keyword {
            Keyword::Define => return self.compile_define(arena, node_id, MemorySegment::Local),
            Keyword::If => self.compile_if(arena, node_id)?,
            Keyword::Loop => self.compile_loop(arena, node_id)?,
            Keyword::Fence => self.compile_fence(arena, node_id)?,
            Keyword::OnMatrixStack => self.compile_on_matrix_stack(arena, node_id)?,
            Keyword::Fn => self.compile_fn(arena, node_id)?,
            Keyword::Plus => self.compile_math(arena, node_id, Opcode::Add)?,
            Keyword::Minus => self.compile_math(arena, node_id, Opcode::Sub)?,
            Keyword::Mult => self.compile_math(arena, node_id, Opcode::Mul)?,
            Keyword::Divide => self.compile_math(arena, node_id, Opcode::Div)?,
            Keyword::Mod => self.compile_math(arena, node_id, Opcode::Mod)?,
            Keyword::Equal => self.compile_math(arena, node_id, Opcode::Eq)?,
            Keyword::Lt => self.compile_math(arena, node_id, Opcode::Lt)?,
            Keyword::Gt => self.compile_math(arena, node_id, Opcode::Gt)?,
            Keyword::And => self.compile_math(arena, node_id, Opcode::And)?,
            Keyword::Or => self.compile_math(arena, node_id, Opcode::Or)?,
            Keyword::Not => {
                self.compile_next_one(arena, node_id)?;
                self.emit_i32(Opcode::Not, 0, 0)?;
            }
            Keyword::Sqrt => {
                self.compile_next_one(arena, node_id)?;
                self.emit_i32(Opcode::Sqrt, 0, 0)?;
            }
            Keyword::AddressOf => self.compile_address_of(arena, node_id)?,
            Keyword::FnCall => self.compile_fn_call(arena, node_id)?,
            Keyword::VectorAppend => self.compile_vector_append(arena, node_id)?,
            Keyword::Quote => self.compile_quote(arena, node_id)?,
            // scripts can shadow parameter keywords (r, g, b, linear, …)
            // with their own bindings
            _ => return self.compile_user_defined_name(arena, node_id, iname),
        }
        Ok(arena.safe_next(node_id))
    }

    fn compile_user_defined_name(
        &mut self,
        arena: &NodeArena,
        node_id: NodeId,
        iname: i32,
    ) -> Result<Option<NodeId>> {
        if let Some(local) = self.get_local_mapping(iname) {
            self.emit_seg_i32(Opcode::Load, MemorySegment::Local, local)?;
            return Ok(arena.safe_next(node_id));
        }

        if let Some(fi_idx) = self.current_fn_info {
            if let Some(mapping) = self.program.fn_info[fi_idx].argument_mapping(iname) {
                self.emit_seg_i32(Opcode::Load, MemorySegment::Argument, mapping)?;
                return Ok(arena.safe_next(node_id));
            }
        }

        if let Some(global) = self.get_global_mapping(iname) {
            self.emit_seg_i32(Opcode::Load, MemorySegment::Global, global)?;
            return Ok(arena.safe_next(node_id));
        }

        // an unbound keyword (linear, ease names, …) passes through as a
        // constant name value
        if is_keyword(iname) {
            self.emit_seg_name(Opcode::Load, MemorySegment::Constant, iname)?;
            return Ok(arena.safe_next(node_id));
        }

        let name = self
            .word_lut
            .reverse_lookup(iname)
            .unwrap_or("?")
            .to_string();
        error!("unknown mapping for: {}", name);
        Err(Error::UnknownMappingForName(name))
    }

    // (define a 1 b 2 …) — consumes lhs/value pairs until the chain ends
    fn compile_define(
        &mut self,
        arena: &NodeArena,
        define_id: NodeId,
        segment: MemorySegment,
    ) -> Result<Option<NodeId>> {
        let mut lhs = arena.safe_next(define_id);

        while let Some(lhs_id) = lhs {
            let value_id = arena.safe_next(lhs_id).ok_or_else(|| {
                error!("define: missing value for lhs");
                Error::GeneralError("define requires lhs/value pairs")
            })?;
            self.compile(arena, value_id)?;

            match arena.get(lhs_id).kind {
                NodeKind::Name(_) => {
                    self.store_from_stack_to_memory(arena, lhs_id, segment)?;
                }
                NodeKind::Vector => {
                    if arena.all_children_are_names(lhs_id) {
                        let num_children = arena.count_children(lhs_id);

                        // PILE stacks the rhs elements in order, so the lhs
                        // names are stored in reverse
                        self.emit_i32(Opcode::Pile, num_children, 0)?;
                        self.opcode_offset += num_children - 1;

                        let mut children = Vec::new();
                        let mut child = arena.safe_first_child(lhs_id);
                        while let Some(c) = child {
                            children.push(c);
                            child = arena.safe_next(c);
                        }
                        for c in children.iter().rev() {
                            self.store_from_stack_to_memory(arena, *c, segment)?;
                        }
                    } else {
                        error!("define: nested destructuring is not supported");
                        return Err(Error::UnsupportedDestructure);
                    }
                }
                NodeKind::List => {
                    error!("define: nested destructuring is not supported");
                    return Err(Error::UnsupportedDestructure);
                }
                _ => {
                    error!("define: lhs should be a name or a vector of names");
                    return Err(Error::ExpectedNameOrList);
                }
            }

            lhs = arena.safe_next(value_id);
        }

        Ok(None)
    }

    // (if cond then else?)
    fn compile_if(&mut self, arena: &NodeArena, if_id: NodeId) -> Result<()> {
        let cond_id = arena.safe_next(if_id).ok_or(Error::GeneralError("if requires a condition"))?;
        let then_id = arena
            .safe_next(cond_id)
            .ok_or(Error::GeneralError("if requires a then form"))?;
        let else_id = arena.safe_next(then_id);

        self.compile(arena, cond_id)?;

        let jump_then = self.emit_i32(Opcode::JumpIf, 0, 0)?;
        let offset_after_cond = self.opcode_offset;

        self.compile(arena, then_id)?;
        let offset_after_then = self.opcode_offset;

        if let Some(else_id) = else_id {
            // only one branch executes at runtime, so the virtual offset
            // rewinds before compiling the alternative
            self.opcode_offset = offset_after_cond;

            let jump_else = self.emit_i32(Opcode::Jump, 0, 0)?;
            let here = self.program.code.len() as i32;
            self.patch_jump(jump_then, here - jump_then as i32);

            self.compile(arena, else_id)?;
            let offset_after_else = self.opcode_offset;

            if offset_after_then != offset_after_else {
                error!(
                    "if branches leave different stack offsets ({} vs {})",
                    offset_after_then, offset_after_else
                );
                return Err(Error::IfBranchOffsetMismatch);
            }

            let here = self.program.code.len() as i32;
            self.patch_jump(jump_else, here - jump_else as i32);
        } else {
            let here = self.program.code.len() as i32;
            self.patch_jump(jump_then, here - jump_then as i32);
        }

        Ok(())
    }

    /// Compiles every form after `from_id` in the sibling chain.
    fn compile_rest(&mut self, arena: &NodeArena, from_id: NodeId) -> Result<()> {
        let mut cur = arena.safe_next(from_id);
        while let Some(id) = cur {
            cur = self.compile(arena, id)?;
        }
        Ok(())
    }

    fn compile_next_one(&mut self, arena: &NodeArena, from_id: NodeId) -> Result<()> {
        let next = arena
            .safe_next(from_id)
            .ok_or(Error::GeneralError("missing operand"))?;
        self.compile(arena, next)?;
        Ok(())
    }

    // (+ 1 2 3 …) — left fold over the operands
    fn compile_math(&mut self, arena: &NodeArena, op_id: NodeId, opcode: Opcode) -> Result<()> {
        let first = arena
            .safe_next(op_id)
            .ok_or(Error::GeneralError("operator requires operands"))?;
        let mut cur = self.compile(arena, first)?;
        while let Some(id) = cur {
            cur = self.compile(arena, id)?;
            self.emit_i32(opcode, 0, 0)?;
        }
        Ok(())
    }

    // (address-of fn-name) — the function's index, known at compile time
    fn compile_address_of(&mut self, arena: &NodeArena, ast_id: NodeId) -> Result<()> {
        let name_id = arena.safe_next(ast_id).ok_or(Error::AddressOfName)?;
        let iname = match arena.get(name_id).kind {
            NodeKind::Name(i) => i,
            _ => {
                error!("address-of given a non-name argument");
                return Err(Error::AddressOfName);
            }
        };
        let index = self.program.fn_info_index(iname).ok_or_else(|| {
            error!("address-of could not find function");
            Error::UnableToFindFnInfo
        })?;
        self.emit_seg_i32(Opcode::Load, MemorySegment::Constant, index as i32)?;
        Ok(())
    }

    // (fn-call (fn-index-expr label: value …)) — invocation through a value
    fn compile_fn_call(&mut self, arena: &NodeArena, ast_id: NodeId) -> Result<()> {
        let invocation_id = arena
            .safe_next(ast_id)
            .ok_or(Error::FnCallGivenNonList)?;
        if arena.get(invocation_id).kind != NodeKind::List {
            error!("fn-call given a non-list to invoke");
            return Err(Error::FnCallGivenNonList);
        }

        let index_expr = arena
            .safe_first_child(invocation_id)
            .ok_or(Error::FnCallGivenNonList)?;

        // CALL_F reads the fn-info index from the stack and runs the
        // default-argument prologue
        self.compile(arena, index_expr)?;
        self.emit_i32(Opcode::CallF, 0, 0)?;

        let mut args = arena.safe_next(index_expr);
        while let Some(label_id) = args {
            let value_id = arena
                .safe_next(label_id)
                .ok_or(Error::GeneralError("fn-call requires label/value pairs"))?;

            self.compile(arena, value_id)?;
            self.compile(arena, index_expr)?;

            let label_i = self.node_i32(arena.get(label_id))?;
            self.emit_seg_i32(Opcode::StoreF, MemorySegment::Argument, label_i)?;

            args = arena.safe_next(value_id);
        }

        self.compile(arena, index_expr)?;
        self.emit_i32(Opcode::CallF0, 0, 0)?;
        Ok(())
    }

    // (vector/append v value) — appends and rebinds the variable
    fn compile_vector_append(&mut self, arena: &NodeArena, ast_id: NodeId) -> Result<()> {
        let vector_id = arena
            .safe_next(ast_id)
            .ok_or(Error::GeneralError("vector/append requires a vector"))?;
        self.compile(arena, vector_id)?;

        let value_id = arena
            .safe_next(vector_id)
            .ok_or(Error::GeneralError("vector/append requires a value"))?;
        self.compile(arena, value_id)?;

        self.emit_i32(Opcode::Append, 0, 0)?;

        if let NodeKind::Name(_) = arena.get(vector_id).kind {
            let iname = self.node_i32(arena.get(vector_id))?;

            if let Some(address) = self.get_local_mapping(iname) {
                self.emit_seg_i32(Opcode::Store, MemorySegment::Local, address)?;
                return Ok(());
            }
            if let Some(address) = self.get_global_mapping(iname) {
                self.emit_seg_i32(Opcode::Store, MemorySegment::Global, address)?;
                return Ok(());
            }

            let name = self
                .word_lut
                .reverse_lookup(iname)
                .unwrap_or("?")
                .to_string();
            error!("vector/append: no local or global binding for {}", name);
            return Err(Error::UnknownMappingForName(name));
        }
        Ok(())
    }

    // '(1 2 3) — names inside a quoted list stay names instead of being
    // resolved through their bindings
    fn compile_vector_in_quote(&mut self, arena: &NodeArena, list_id: NodeId) -> Result<()> {
        self.emit_seg_i32(Opcode::Load, MemorySegment::Void, 0)?;

        let mut cur = arena.safe_first_child(list_id);
        while let Some(id) = cur {
            if let NodeKind::Name(iname) = arena.get(id).kind {
                self.emit_seg_name(Opcode::Load, MemorySegment::Constant, iname)?;
                cur = arena.safe_next(id);
            } else {
                cur = self.compile(arena, id)?;
            }
            self.emit_i32(Opcode::Append, 0, 0)?;
        }
        Ok(())
    }

    fn compile_quote(&mut self, arena: &NodeArena, ast_id: NodeId) -> Result<()> {
        let quoted_id = arena
            .safe_next(ast_id)
            .ok_or(Error::GeneralError("quote requires a form"))?;
        match arena.get(quoted_id).kind {
            NodeKind::List => self.compile_vector_in_quote(arena, quoted_id),
            NodeKind::Name(iname) => {
                self.emit_seg_name(Opcode::Load, MemorySegment::Constant, iname)?;
                Ok(())
            }
            _ => {
                self.compile(arena, quoted_id)?;
                Ok(())
            }
        }
    }

    fn loop_parameter(
        &self,
        arena: &NodeArena,
        params_id: NodeId,
        keyword: Keyword,
    ) -> Option<NodeId> {
        let name_id = arena.safe_first_child(params_id)?;
        let mut cur = arena.safe_next(name_id);
        while let Some(label_id) = cur {
            let value_id = arena.safe_next(label_id)?;
            let label_iname = match arena.get(label_id).kind {
                NodeKind::Label(i) | NodeKind::Name(i) => i,
                _ => return None,
            };
            if label_iname == i32::from(keyword) {
                return Some(value_id);
            }
            cur = arena.safe_next(value_id);
        }
        None
    }

    // (loop (x from: a to: b inc: i) body…)
    fn compile_loop(&mut self, arena: &NodeArena, ast_id: NodeId) -> Result<()> {
        let params_id = arena
            .safe_next(ast_id)
            .ok_or(Error::GeneralError("loop requires a parameter list"))?;
        if arena.get(params_id).kind != NodeKind::List {
            error!("expected a list that defines loop parameters");
            return Err(Error::ExpectedVectorOrList);
        }

        let name_id = arena
            .safe_first_child(params_id)
            .ok_or(Error::GeneralError("loop requires a looping variable"))?;

        let from_node = self.loop_parameter(arena, params_id, Keyword::From);
        let to_node = self.loop_parameter(arena, params_id, Keyword::To);
        let upto_node = self.loop_parameter(arena, params_id, Keyword::Upto);
        let increment_node = self.loop_parameter(arena, params_id, Keyword::Inc);

        let use_to = to_node.is_some();
        if !use_to && upto_node.is_none() {
            error!("loop requires either a 'to' or 'upto' parameter");
            return Err(Error::LoopMissingExitCondition);
        }

        // looping variable := from (default 0)
        match from_node {
            Some(id) => {
                self.compile(arena, id)?;
            }
            None => {
                self.emit_seg_f32(Opcode::Load, MemorySegment::Constant, 0.0)?;
            }
        }
        let looper_address = self.store_from_stack_to_memory(arena, name_id, MemorySegment::Local)?;

        let addr_loop_start = self.program.code.len();
        self.emit_seg_i32(Opcode::Load, MemorySegment::Local, looper_address)?;

        if use_to {
            // exit when looper >= to
            self.compile(arena, to_node.ok_or(Error::LoopMissingExitCondition)?)?;
            self.emit_i32(Opcode::Lt, 0, 0)?;
        } else {
            // exit when looper > upto
            self.compile(arena, upto_node.ok_or(Error::LoopMissingExitCondition)?)?;
            self.emit_i32(Opcode::Gt, 0, 0)?;
            self.emit_i32(Opcode::Not, 0, 0)?;
        }

        let addr_exit_check = self.emit_i32(Opcode::JumpIf, 0, 0)?;

        let pre_body_offset = self.opcode_offset;
        self.compile_rest(arena, params_id)?;

        // pop whatever the body forms left behind
        let opcode_delta = self.opcode_offset - pre_body_offset;
        for _ in 0..opcode_delta {
            self.emit_seg_i32(Opcode::Store, MemorySegment::Void, 0)?;
        }

        self.emit_seg_i32(Opcode::Load, MemorySegment::Local, looper_address)?;
        match increment_node {
            Some(id) => {
                self.compile(arena, id)?;
            }
            None => {
                self.emit_seg_f32(Opcode::Load, MemorySegment::Constant, 1.0)?;
            }
        }
        self.emit_i32(Opcode::Add, 0, 0)?;
        self.emit_seg_i32(Opcode::Store, MemorySegment::Local, looper_address)?;

        let back = self.program.code.len() as i32 - addr_loop_start as i32;
        self.emit_i32(Opcode::Jump, -back, 0)?;

        let exit_offset = self.program.code.len() as i32 - addr_exit_check as i32;
        self.patch_jump(addr_exit_check, exit_offset);
        Ok(())
    }

    // (fence (x from: a to: b num: n) body…) — n evenly spaced values
    // from a to b inclusive
    fn compile_fence(&mut self, arena: &NodeArena, ast_id: NodeId) -> Result<()> {
        let params_id = arena
            .safe_next(ast_id)
            .ok_or(Error::GeneralError("fence requires a parameter list"))?;
        if arena.get(params_id).kind != NodeKind::List {
            error!("expected a list that defines fence parameters");
            return Err(Error::ExpectedVectorOrList);
        }

        let name_id = arena
            .safe_first_child(params_id)
            .ok_or(Error::GeneralError("fence requires a looping variable"))?;

        let from_node = self.loop_parameter(arena, params_id, Keyword::From);
        let to_node = self.loop_parameter(arena, params_id, Keyword::To);
        let num_node = self.loop_parameter(arena, params_id, Keyword::Num);

        // quantity
        let quantity_address = self.add_internal_local_mapping()?;
        match num_node {
            Some(id) => {
                self.compile(arena, id)?;
            }
            None => {
                self.emit_seg_f32(Opcode::Load, MemorySegment::Constant, 2.0)?;
            }
        }
        self.emit_seg_i32(Opcode::Store, MemorySegment::Local, quantity_address)?;

        // counter over 0..quantity
        let counter_address = self.add_internal_local_mapping()?;
        self.emit_seg_f32(Opcode::Load, MemorySegment::Constant, 0.0)?;
        self.emit_seg_i32(Opcode::Store, MemorySegment::Local, counter_address)?;

        // delta = (to - from) / (quantity - 1)
        match to_node {
            Some(id) => {
                self.compile(arena, id)?;
            }
            None => {
                self.emit_seg_f32(Opcode::Load, MemorySegment::Constant, 1.0)?;
            }
        }
        match from_node {
            Some(id) => {
                self.compile(arena, id)?;
            }
            None => {
                self.emit_seg_f32(Opcode::Load, MemorySegment::Constant, 0.0)?;
            }
        }
        self.emit_i32(Opcode::Sub, 0, 0)?;

        match num_node {
            Some(id) => {
                self.compile(arena, id)?;
            }
            None => {
                self.emit_seg_f32(Opcode::Load, MemorySegment::Constant, 2.0)?;
            }
        }
        self.emit_seg_f32(Opcode::Load, MemorySegment::Constant, 1.0)?;
        self.emit_i32(Opcode::Sub, 0, 0)?;
        self.emit_i32(Opcode::Div, 0, 0)?;

        let delta_address = self.add_internal_local_mapping()?;
        self.emit_seg_i32(Opcode::Store, MemorySegment::Local, delta_address)?;

        match from_node {
            Some(id) => {
                self.compile(arena, id)?;
            }
            None => {
                self.emit_seg_f32(Opcode::Load, MemorySegment::Constant, 0.0)?;
            }
        }
        let from_address = self.add_internal_local_mapping()?;
        self.emit_seg_i32(Opcode::Store, MemorySegment::Local, from_address)?;

        self.emit_seg_i32(Opcode::Load, MemorySegment::Local, from_address)?;
        let looper_address = self.store_from_stack_to_memory(arena, name_id, MemorySegment::Local)?;

        let addr_loop_start = self.program.code.len();

        self.emit_seg_i32(Opcode::Load, MemorySegment::Local, counter_address)?;
        self.emit_seg_i32(Opcode::Load, MemorySegment::Local, quantity_address)?;
        self.emit_i32(Opcode::Lt, 0, 0)?;

        let addr_exit_check = self.emit_i32(Opcode::JumpIf, 0, 0)?;

        // looper = from + counter * delta
        self.emit_seg_i32(Opcode::Load, MemorySegment::Local, from_address)?;
        self.emit_seg_i32(Opcode::Load, MemorySegment::Local, counter_address)?;
        self.emit_seg_i32(Opcode::Load, MemorySegment::Local, delta_address)?;
        self.emit_i32(Opcode::Mul, 0, 0)?;
        self.emit_i32(Opcode::Add, 0, 0)?;
        self.emit_seg_i32(Opcode::Store, MemorySegment::Local, looper_address)?;

        let pre_body_offset = self.opcode_offset;
        self.compile_rest(arena, params_id)?;

        let opcode_delta = self.opcode_offset - pre_body_offset;
        for _ in 0..opcode_delta {
            self.emit_seg_i32(Opcode::Store, MemorySegment::Void, 0)?;
        }

        self.emit_seg_i32(Opcode::Load, MemorySegment::Local, counter_address)?;
        self.emit_seg_f32(Opcode::Load, MemorySegment::Constant, 1.0)?;
        self.emit_i32(Opcode::Add, 0, 0)?;
        self.emit_seg_i32(Opcode::Store, MemorySegment::Local, counter_address)?;

        let back = self.program.code.len() as i32 - addr_loop_start as i32;
        self.emit_i32(Opcode::Jump, -back, 0)?;

        let exit_offset = self.program.code.len() as i32 - addr_exit_check as i32;
        self.patch_jump(addr_exit_check, exit_offset);
        Ok(())
    }

    fn compile_on_matrix_stack(&mut self, arena: &NodeArena, ast_id: NodeId) -> Result<()> {
        self.emit_i32(Opcode::MtxLoad, 0, 0)?;
        self.compile_rest(arena, ast_id)?;
        self.emit_i32(Opcode::MtxStore, 0, 0)?;
        Ok(())
    }

    // ---------------------------------------------------------------
    // vectors
    // ---------------------------------------------------------------

    fn compile_2d_from_gene(&mut self, node: &Node) -> Result<()> {
        let (a, b) = match self.gene_of(node)? {
            Var::V2(a, b) => (*a, *b),
            other => {
                error!("2d vector cannot take a {} gene", other.type_name());
                return Err(Error::IncompatibleGene);
            }
        };
        self.emit_seg_f32(Opcode::Load, MemorySegment::Constant, a)?;
        self.emit_seg_f32(Opcode::Load, MemorySegment::Constant, b)?;
        self.emit_i32(Opcode::Squish2, 0, 0)?;
        Ok(())
    }

    fn compile_alterable_element(&mut self, arena: &NodeArena, node_id: NodeId) -> Result<()> {
        let node = arena.get(node_id);
        match node.kind {
            NodeKind::Float(_) => {
                let f = self.gene_f32(node)?;
                self.emit_seg_f32(Opcode::Load, MemorySegment::Constant, f)?;
            }
            NodeKind::Int(_) => {
                let i = self.gene_i32(node)?;
                self.emit_seg_i32(Opcode::Load, MemorySegment::Constant, i)?;
            }
            NodeKind::Vector => {
                if arena.count_children(node_id) == 2 {
                    self.compile_2d_from_gene(node)?;
                } else {
                    self.compile_vector(arena, node_id)?;
                }
            }
            ref kind => {
                warn!("alterable vector element of type {} is not substitutable", kind.type_name());
            }
        }
        Ok(())
    }

    // [a b] packs into an inline 2d value rather than a heap vector
    fn compile_2d(&mut self, arena: &NodeArena, vector_id: NodeId) -> Result<()> {
        let use_gene = self.alterable(arena.get(vector_id));

        let mut cur = arena.safe_first_child(vector_id);
        while let Some(id) = cur {
            if use_gene {
                self.compile_alterable_element(arena, id)?;
                cur = arena.safe_next(id);
            } else {
                cur = self.compile(arena, id)?;
            }
        }
        self.emit_i32(Opcode::Squish2, 0, 0)?;
        Ok(())
    }

    fn compile_vector(&mut self, arena: &NodeArena, vector_id: NodeId) -> Result<()> {
        // pushing from the void constructs a new empty vector
        self.emit_seg_i32(Opcode::Load, MemorySegment::Void, 0)?;

        // an alterable vector pulls each element from its own gene
        let use_gene = self.alterable(arena.get(vector_id));

        let mut cur = arena.safe_first_child(vector_id);
        while let Some(id) = cur {
            if use_gene {
                self.compile_alterable_element(arena, id)?;
                cur = arena.safe_next(id);
            } else {
                cur = self.compile(arena, id)?;
            }
            self.emit_i32(Opcode::Append, 0, 0)?;
        }
        Ok(())
    }

    // ---------------------------------------------------------------
    // functions
    // ---------------------------------------------------------------

    /// The prologue at `arg_address` loads every argument's label and
    /// default value; the body at `body_address` is a separate entry
    /// point. Invocations CALL the prologue, overwrite any explicit
    /// arguments, then CALL_0 the body.
    fn compile_fn(&mut self, arena: &NodeArena, ast_id: NodeId) -> Result<()> {
        self.local_mappings = [LocalSlot::Free; MEMORY_LOCAL_SIZE];

        let signature_id = arena
            .safe_next(ast_id)
            .ok_or(Error::GeneralError("fn requires a signature list"))?;
        let name_id = arena
            .safe_first_child(signature_id)
            .ok_or(Error::GeneralError("fn requires a name"))?;

        let fn_name = match arena.get(name_id).kind {
            NodeKind::Name(i) => i,
            _ => return Err(Error::ExpectedNameNode),
        };
        let fi_idx = self.program.fn_info_index(fn_name).ok_or_else(|| {
            error!("unable to find fn_info for function {}", fn_name);
            Error::UnableToFindFnInfo
        })?;
        self.current_fn_info = Some(fi_idx);

        // the arguments
        self.program.fn_info[fi_idx].arg_address = self.program.code.len() as i32;

        let mut num_args: i32 = 0;
        let mut counter: i32 = 0;
        let mut args = arena.safe_next(name_id);
        while let Some(label_id) = args {
            let value_id = arena
                .safe_next(label_id)
                .ok_or(Error::GeneralError("fn signature requires label/value pairs"))?;

            if num_args as usize >= MAX_NUM_ARGUMENTS {
                error!("fn has more than {} arguments", MAX_NUM_ARGUMENTS);
                return Err(Error::AllocationFailure("argument offsets"));
            }

            let label_i = self.node_i32(arena.get(label_id))?;
            self.program.fn_info[fi_idx].argument_offsets[num_args as usize] = Some(label_i);

            self.emit_seg_i32(Opcode::Load, MemorySegment::Constant, label_i)?;
            self.emit_seg_i32(Opcode::Store, MemorySegment::Argument, counter)?;
            counter += 1;

            self.compile(arena, value_id)?;
            self.emit_seg_i32(Opcode::Store, MemorySegment::Argument, counter)?;
            counter += 1;

            num_args += 1;
            args = arena.safe_next(value_id);
        }
        self.program.fn_info[fi_idx].num_args = num_args;

        self.emit_i32(Opcode::Ret0, 0, 0)?;

        // the body
        self.program.fn_info[fi_idx].body_address = self.program.code.len() as i32;
        self.compile_rest(arena, signature_id)?;
        self.emit_i32(Opcode::Ret, 0, 0)?;

        self.current_fn_info = None;
        Ok(())
    }

    /// CALL/CALL_0 read their target addresses from the stack, so the
    /// invocation loads placeholder constants that the fix-up pass patches
    /// once every function's addresses are known. This is what lets a
    /// function call another that is declared later in the script.
    fn compile_fn_invocation(
        &mut self,
        arena: &NodeArena,
        name_id: NodeId,
        fn_idx: usize,
    ) -> Result<()> {
        let fn_idx_i32 = fn_idx as i32;

        self.emit_seg_i32(Opcode::Load, MemorySegment::Constant, 666)?;
        self.emit_seg_i32(Opcode::Load, MemorySegment::Constant, 667)?;
        self.emit_i32(Opcode::Call, fn_idx_i32, fn_idx_i32)?;

        let mut args = arena.safe_next(name_id);
        while let Some(label_id) = args {
            let value_id = arena
                .safe_next(label_id)
                .ok_or(Error::GeneralError("fn invocation requires label/value pairs"))?;

            let label_i = self.node_i32(arena.get(label_id))?;
            self.compile(arena, value_id)?;
            self.emit_i32(Opcode::PlaceholderStore, fn_idx_i32, label_i)?;

            args = arena.safe_next(value_id);
        }

        self.emit_seg_i32(Opcode::Load, MemorySegment::Constant, 668)?;
        self.emit_i32(Opcode::Call0, fn_idx_i32, fn_idx_i32)?;
        Ok(())
    }

    fn compile_native_invocation(
        &mut self,
        arena: &NodeArena,
        name_id: NodeId,
        iname: i32,
    ) -> Result<Option<NodeId>> {
        let mut num_args: i32 = 0;
        let mut args = arena.safe_next(name_id);
        while let Some(label_id) = args {
            let value_id = arena
                .safe_next(label_id)
                .ok_or(Error::GeneralError("native invocation requires label/value pairs"))?;

            let label_i = self.node_i32(arena.get(label_id))?;
            self.emit_seg_i32(Opcode::Load, MemorySegment::Constant, label_i)?;
            self.compile(arena, value_id)?;

            num_args += 1;
            args = arena.safe_next(value_id);
        }

        self.emit_i32(Opcode::Native, iname, num_args)?;

        // the native pops every label/value pair and pushes one result
        self.opcode_offset -= num_args * 2 - 1;

        Ok(arena.safe_next(name_id))
    }

    // ---------------------------------------------------------------
    // registration pre-passes
    // ---------------------------------------------------------------

    /// Reserves the fixed global slots every program shares with the
    /// preamble. Slot order must match `compile_preamble_bindings`.
    fn register_top_level_preamble(&mut self) -> Result<()> {
        for kw in [
            Keyword::GenInitial,
            Keyword::CanvasWidth,
            Keyword::CanvasHeight,
            Keyword::MathTau,
            Keyword::White,
            Keyword::Black,
            Keyword::Red,
            Keyword::Green,
            Keyword::Blue,
            Keyword::Yellow,
            Keyword::Magenta,
            Keyword::Cyan,
            Keyword::ColProceduralFnPresets,
            Keyword::EasePresets,
        ] {
            self.add_global_mapping(kw.into())?;
        }
        Ok(())
    }

    fn register_top_level_fns(&mut self, arena: &NodeArena, root: Option<NodeId>) -> Result<()> {
        self.program.fn_info.clear();

        let mut cur = arena.safe_first(root);
        while let Some(id) = cur {
            cur = arena.safe_next(id);

            if arena.get(id).kind != NodeKind::List {
                continue;
            }
            let Some(head) = arena.safe_first_child(id) else {
                continue;
            };
            if arena.get(head).kind != NodeKind::Name(Keyword::Fn.into()) {
                continue;
            }

            // (fn (name args…) body…)
            let Some(signature_id) = arena.safe_next(head) else {
                continue;
            };
            if arena.get(signature_id).kind != NodeKind::List {
                continue;
            }
            let Some(name_id) = arena.safe_first_child(signature_id) else {
                continue;
            };
            let NodeKind::Name(fn_name) = arena.get(name_id).kind else {
                continue;
            };

            if self.program.fn_info.len() >= MAX_TOP_LEVEL_FUNCTIONS {
                error!("script has more than {} top-level functions", MAX_TOP_LEVEL_FUNCTIONS);
                return Err(Error::MaxTopLevelFunctions);
            }
            let index = self.program.fn_info.len() as i32;
            self.program.fn_info.push(FnInfo::new(index, fn_name));
        }
        Ok(())
    }

    fn register_names_in_define(&mut self, arena: &NodeArena, lhs_id: NodeId) -> Result<()> {
        match arena.get(lhs_id).kind {
            NodeKind::Name(iname) => {
                if self.get_global_mapping(iname).is_none() {
                    self.add_global_mapping(iname)?;
                }
                Ok(())
            }
            NodeKind::List | NodeKind::Vector => {
                let mut child = arena.safe_first_child(lhs_id);
                while let Some(c) = child {
                    self.register_names_in_define(arena, c)?;
                    child = arena.safe_next(c);
                }
                Ok(())
            }
            _ => Ok(()),
        }
    }

    fn register_top_level_defines(&mut self, arena: &NodeArena, root: Option<NodeId>) -> Result<()> {
        let mut cur = arena.safe_first(root);
        while let Some(id) = cur {
            cur = arena.safe_next(id);

            if !is_list_beginning_with(arena, id, Keyword::Define) {
                continue;
            }
            let Some(define_id) = arena.safe_first_child(id) else {
                continue;
            };

            let mut lhs = arena.safe_next(define_id);
            while let Some(lhs_id) = lhs {
                self.register_names_in_define(arena, lhs_id)?;
                // skip over the value to the next lhs
                lhs = arena.safe_next(lhs_id).and_then(|v| arena.safe_next(v));
            }
        }
        Ok(())
    }

    // ---------------------------------------------------------------
    // pipeline stages
    // ---------------------------------------------------------------

    fn compile_common_prologue(&mut self, arena: &NodeArena, root: Option<NodeId>) -> Result<()> {
        self.global_mappings = [None; MEMORY_GLOBAL_SIZE];
        self.local_mappings = [LocalSlot::Free; MEMORY_LOCAL_SIZE];
        self.current_fn_info = None;

        self.register_top_level_preamble()?;
        self.register_top_level_fns(arena, root)?;
        self.register_top_level_defines(arena, root)?;
        Ok(())
    }

    fn compile_common_top_level_fns(&mut self, arena: &NodeArena, root: Option<NodeId>) -> Result<()> {
        // entry point jumps over the function bodies
        let start = self.emit_i32(Opcode::Jump, 0, 0)?;

        let mut cur = arena.safe_first(root);
        while let Some(id) = cur {
            if is_list_beginning_with(arena, id, Keyword::Fn) {
                cur = self.compile(arena, id)?;
            } else {
                cur = arena.safe_next(id);
            }
        }

        let past_fns = self.program.code.len() as i32 - start as i32;
        self.patch_jump(start, past_fns);
        Ok(())
    }

    fn compile_common_top_level_defines(
        &mut self,
        arena: &NodeArena,
        root: Option<NodeId>,
    ) -> Result<()> {
        let mut cur = arena.safe_first(root);
        while let Some(id) = cur {
            cur = arena.safe_next(id);
            if is_list_beginning_with(arena, id, Keyword::Define) {
                let Some(define_id) = arena.safe_first_child(id) else {
                    continue;
                };
                self.compile_define(arena, define_id, MemorySegment::Global)?;
            }
        }
        Ok(())
    }

    fn compile_common_top_level_forms(
        &mut self,
        arena: &NodeArena,
        root: Option<NodeId>,
    ) -> Result<()> {
        let mut cur = arena.safe_first(root);
        while let Some(id) = cur {
            if !is_list_beginning_with(arena, id, Keyword::Fn)
                && !is_list_beginning_with(arena, id, Keyword::Define)
            {
                cur = self.compile(arena, id)?;
            } else {
                cur = arena.safe_next(id);
            }
        }
        Ok(())
    }

    fn compile_common_epilogue(&mut self) -> Result<()> {
        self.emit_i32(Opcode::Stop, 0, 0)?;
        self.correct_function_addresses()
    }

    /// Patches the placeholder constants before every CALL/CALL_0 with the
    /// callee's addresses, and rewrites every PLACEHOLDER_STORE into the
    /// concrete argument store.
    fn correct_function_addresses(&mut self) -> Result<()> {
        let const_seg = Var::Int(MemorySegment::Constant.into());

        for i in 0..self.program.code.len() {
            let op = self.program.code[i].op;

            if op == Opcode::Call {
                let fn_idx = self.program.code[i].arg0.as_i32()? as usize;
                let fi = self
                    .program
                    .fn_info
                    .get(fn_idx)
                    .ok_or(Error::UnableToFindFnInfo)?;
                let (arg_address, num_args) = (fi.arg_address, fi.num_args);

                if i < 2 {
                    return Err(Error::UnableToCorrectFnAddr);
                }
                for (offset, value) in [(2, arg_address), (1, num_args)] {
                    let bc = &mut self.program.code[i - offset];
                    if bc.op != Opcode::Load || bc.arg0 != const_seg {
                        error!("expected a LOAD CONST {} opcodes before a CALL", offset);
                        return Err(Error::UnableToCorrectFnAddr);
                    }
                    bc.arg1 = Var::Int(value);
                }
            }

            if op == Opcode::Call0 {
                let fn_idx = self.program.code[i].arg0.as_i32()? as usize;
                let fi = self
                    .program
                    .fn_info
                    .get(fn_idx)
                    .ok_or(Error::UnableToFindFnInfo)?;
                let body_address = fi.body_address;

                if i < 1 {
                    return Err(Error::UnableToCorrectFnAddr);
                }
                let bc = &mut self.program.code[i - 1];
                if bc.op != Opcode::Load || bc.arg0 != const_seg {
                    error!("expected a LOAD CONST opcode before a CALL_0");
                    return Err(Error::UnableToCorrectFnAddr);
                }
                bc.arg1 = Var::Int(body_address);
            }

            if op == Opcode::PlaceholderStore {
                let fn_idx = self.program.code[i].arg0.as_i32()? as usize;
                let label = self.program.code[i].arg1.as_i32()?;
                let fi = self
                    .program
                    .fn_info
                    .get(fn_idx)
                    .ok_or(Error::UnableToFindFnInfo)?;

                let bc = &mut self.program.code[i];
                bc.op = Opcode::Store;
                match fi.argument_mapping(label) {
                    Some(slot) => {
                        bc.arg0 = Var::Int(MemorySegment::Argument.into());
                        bc.arg1 = Var::Int(slot);
                    }
                    None => {
                        // the callee never declared this argument; the
                        // pushed value is simply discarded
                        bc.arg0 = Var::Int(MemorySegment::Void.into());
                        bc.arg1 = Var::Int(0);
                    }
                }
            }
        }
        Ok(())
    }

    fn compile_common(&mut self, arena: &NodeArena, root: Option<NodeId>) -> Result<()> {
        self.compile_common_prologue(arena, root)?;
        self.compile_common_top_level_fns(arena, root)?;
        self.compile_common_top_level_defines(arena, root)?;
        self.compile_common_top_level_forms(arena, root)?;
        self.compile_common_epilogue()
    }

    // ---------------------------------------------------------------
    // preamble bindings
    // ---------------------------------------------------------------

    fn compile_global_bind_i32(&mut self, iname: i32, value: i32) -> Result<()> {
        self.emit_seg_i32(Opcode::Load, MemorySegment::Constant, value)?;
        self.store_globally(iname)?;
        Ok(())
    }

    fn compile_global_bind_f32(&mut self, iname: i32, value: f32) -> Result<()> {
        self.emit_seg_f32(Opcode::Load, MemorySegment::Constant, value)?;
        self.store_globally(iname)?;
        Ok(())
    }

    fn compile_global_bind_col(&mut self, iname: i32, r: f32, g: f32, b: f32, a: f32) -> Result<()> {
        self.emit_seg_var(
            Opcode::Load,
            MemorySegment::Constant,
            Var::Colour(Colour::rgb(r, g, b, a)),
        )?;
        self.store_globally(iname)?;
        Ok(())
    }

    fn append_name(&mut self, iname: i32) -> Result<()> {
        self.emit_seg_name(Opcode::Load, MemorySegment::Constant, iname)?;
        self.emit_i32(Opcode::Append, 0, 0)?;
        Ok(())
    }

    fn compile_global_bind_name_vector(&mut self, iname: i32, names: &[Keyword]) -> Result<()> {
        self.emit_seg_i32(Opcode::Load, MemorySegment::Void, 0)?;
        for name in names {
            self.append_name((*name).into())?;
        }
        self.store_globally(iname)?;
        Ok(())
    }

    /// Binds the globals available to every script. Each binding has a
    /// matching slot reservation in `register_top_level_preamble`.
    fn compile_preamble_bindings(&mut self) -> Result<()> {
        self.compile_global_bind_i32(Keyword::GenInitial.into(), 0)?;

        self.compile_global_bind_f32(Keyword::CanvasWidth.into(), 1000.0)?;
        self.compile_global_bind_f32(Keyword::CanvasHeight.into(), 1000.0)?;

        self.compile_global_bind_f32(Keyword::MathTau.into(), std::f32::consts::TAU)?;

        self.compile_global_bind_col(Keyword::White.into(), 1.0, 1.0, 1.0, 1.0)?;
        self.compile_global_bind_col(Keyword::Black.into(), 0.0, 0.0, 0.0, 1.0)?;
        self.compile_global_bind_col(Keyword::Red.into(), 1.0, 0.0, 0.0, 1.0)?;
        self.compile_global_bind_col(Keyword::Green.into(), 0.0, 1.0, 0.0, 1.0)?;
        self.compile_global_bind_col(Keyword::Blue.into(), 0.0, 0.0, 1.0, 1.0)?;
        self.compile_global_bind_col(Keyword::Yellow.into(), 1.0, 1.0, 0.0, 1.0)?;
        self.compile_global_bind_col(Keyword::Magenta.into(), 1.0, 0.0, 1.0, 1.0)?;
        self.compile_global_bind_col(Keyword::Cyan.into(), 0.0, 1.0, 1.0, 1.0)?;

        self.compile_global_bind_name_vector(
            Keyword::ColProceduralFnPresets.into(),
            &[
                Keyword::Chrome,
                Keyword::HotlineMiami,
                Keyword::KnightRider,
                Keyword::Mars,
                Keyword::Rainbow,
                Keyword::Robocop,
                Keyword::Transformers,
            ],
        )?;

        self.compile_global_bind_name_vector(
            Keyword::EasePresets.into(),
            &[
                Keyword::Linear,
                Keyword::Quick,
                Keyword::SlowIn,
                Keyword::SlowInOut,
            ],
        )?;

        Ok(())
    }

    fn compile_global_bind_node(
        &mut self,
        iname: i32,
        arena: &NodeArena,
        node_id: NodeId,
    ) -> Result<()> {
        self.compile(arena, node_id)?;
        self.store_globally(iname)?;
        Ok(())
    }
}

fn is_list_beginning_with(arena: &NodeArena, id: NodeId, keyword: Keyword) -> bool {
    if arena.get(id).kind != NodeKind::List {
        return false;
    }
    match arena.safe_first_child(id) {
        Some(head) => arena.get(head).kind == NodeKind::Name(keyword.into()),
        None => false,
    }
}

fn is_colour_constructor_list(arena: &NodeArena, id: NodeId) -> bool {
    if arena.get(id).kind != NodeKind::List {
        return false;
    }
    match arena.safe_first_child(id) {
        Some(head) => match arena.get(head).kind {
            NodeKind::Name(iname) => is_colour_constructor(iname),
            _ => false,
        },
        None => false,
    }
}

// ---------------------------------------------------------------
// entry points
// ---------------------------------------------------------------

/// Compiles a parsed script into `program`.
pub fn compile_program(program: &mut Program, word_lut: &WordLut, ast: &Ast) -> Result<()> {
    let mut compilation = Compilation::new(program, word_lut);
    compilation.compile_common(&ast.arena, ast.root)
}

/// Compiles a script with each alterable node replaced by its gene value.
pub fn compile_program_with_genotype(
    program: &mut Program,
    word_lut: &WordLut,
    ast: &mut Ast,
    genotype: &Genotype,
) -> Result<()> {
    genotype_assign_to_ast(genotype, ast)?;

    let mut compilation = Compilation::new(program, word_lut);
    compilation.use_genes = true;
    compilation.compile_common(&ast.arena, ast.root)
}

/// Compiles a trait's generator expression chain; `gen_initial_node` is
/// the altered value itself, bound to the `gen/initial` global so that
/// forms like `(gen/stray from: gen/initial by: 2)` can read it.
pub fn compile_program_for_trait(
    program: &mut Program,
    word_lut: &WordLut,
    arena: &NodeArena,
    chain_root: Option<NodeId>,
    gen_initial_node: NodeId,
) -> Result<()> {
    let mut compilation = Compilation::new(program, word_lut);

    compilation.compile_common_prologue(arena, chain_root)?;
    compilation.compile_common_top_level_fns(arena, chain_root)?;
    compilation.compile_global_bind_node(Keyword::GenInitial.into(), arena, gen_initial_node)?;
    compilation.compile_common_top_level_defines(arena, chain_root)?;
    compilation.compile_common_top_level_forms(arena, chain_root)?;
    compilation.compile_common_epilogue()
}

/// Compiles just `node` (ignoring its siblings) so a single literal can be
/// evaluated in isolation; used for trait initial values.
pub fn compile_single_node_program(
    program: &mut Program,
    word_lut: &WordLut,
    arena: &NodeArena,
    node_id: NodeId,
) -> Result<()> {
    let mut compilation = Compilation::new(program, word_lut);
    compilation.register_top_level_preamble()?;
    compilation.compile(arena, node_id)?;
    compilation.emit_i32(Opcode::Stop, 0, 0)?;
    Ok(())
}

/// The preamble program shared by every run; compiled once at engine
/// startup.
pub fn compile_preamble(word_lut: &WordLut) -> Result<Program> {
    let mut program = Program::with_capacity(MAX_PREAMBLE_PROGRAM_SIZE);
    let mut compilation = Compilation::new(&mut program, word_lut);

    compilation.register_top_level_preamble()?;
    compilation.compile_preamble_bindings()?;
    compilation.emit_i32(Opcode::Stop, 0, 0)?;

    Ok(program)
}

// ---------------------------------------------------------------
// genotype assignment
// ---------------------------------------------------------------

fn assign_genes_to_node(ast: &mut Ast, cursor: &mut GeneCursor<'_>, node_id: NodeId) -> Result<()> {
    let node = ast.arena.get(node_id);

    if node.alterable {
        if node.kind == NodeKind::Vector {
            // every element of an alterable vector takes its own gene
            let mut child = ast.arena.safe_first_child(node_id);
            while let Some(c) = child {
                let var = cursor.pull()?.var.clone();
                ast.arena.get_mut(c).gene = Some(var);
                child = ast.arena.safe_next(c);
            }
        } else {
            let var = cursor.pull()?.var.clone();
            ast.arena.get_mut(node_id).gene = Some(var);
        }
    } else {
        ast.arena.get_mut(node_id).gene = None;

        if matches!(ast.arena.get(node_id).kind, NodeKind::List | NodeKind::Vector) {
            if let Some(first_child) = ast.arena.safe_first_child(node_id) {
                assign_genes_to_node(ast, cursor, first_child)?;
            }
        }
    }

    if let Some(next) = ast.arena.get(node_id).next {
        assign_genes_to_node(ast, cursor, next)?;
    }
    Ok(())
}

/// Walks the AST in source order handing one gene to every alterable node
/// (or to each element of an alterable vector). The genotype must be
/// consumed exactly.
pub fn genotype_assign_to_ast(genotype: &Genotype, ast: &mut Ast) -> Result<()> {
    let mut cursor = GeneCursor::new(&genotype.genes);

    if let Some(root) = ast.root {
        assign_genes_to_node(ast, &mut cursor, root)?;
    }

    if !cursor.all_consumed() {
        error!("genes remaining after assigning genotype to ast");
        return Err(Error::GenesRemainingAfterAssigning);
    }
    Ok(())
}
