//! The long-lived startup state: interned keywords and natives, the
//! native-function registry and the shared preamble program.
//!
//! One engine serves any number of sequential parse/compile/run cycles;
//! only the word lut's per-script range changes between scripts. Hosts
//! running scripts concurrently need an engine per thread.

use rustc_hash::FxHashMap;

use crate::compiler;
use crate::config::MAX_PROGRAM_SIZE;
use crate::error::{Error, Result};
use crate::genetic::{self, Genotype, TraitList};
use crate::keywords::{Keyword, Native};
use crate::native::{native_fn, NativeFn};
use crate::node::Ast;
use crate::parser;
use crate::program::Program;
use crate::unparser;
use crate::word_lut::WordLut;

const UNPARSE_BUFFER_SIZE: usize = 64 * 1024;

pub struct Engine {
    word_lut: WordLut,
    natives: FxHashMap<i32, NativeFn>,
    preamble: Program,
}

impl Engine {
    /// Builds the process-wide state: registers every native and keyword
    /// (their interned ids must land on the enum discriminants) and
    /// compiles the preamble once.
    pub fn new() -> Result<Engine> {
        let mut word_lut = WordLut::new();
        let mut natives = FxHashMap::default();

        for native in Native::ALL {
            let iname = word_lut.add_native(native.name())?;
            if iname != i32::from(*native) {
                return Err(Error::GeneralError("native registration out of order"));
            }
            natives.insert(iname, native_fn(*native));
        }

        for keyword in Keyword::ALL {
            let iname = word_lut.add_keyword(keyword.name())?;
            if iname != i32::from(*keyword) {
                return Err(Error::GeneralError("keyword registration out of order"));
            }
        }

        let preamble = compiler::compile_preamble(&word_lut)?;

        Ok(Engine {
            word_lut,
            natives,
            preamble,
        })
    }

    pub fn word_lut(&self) -> &WordLut {
        &self.word_lut
    }

    pub fn preamble(&self) -> &Program {
        &self.preamble
    }

    pub fn native(&self, iname: i32) -> Option<NativeFn> {
        self.natives.get(&iname).copied()
    }

    /// Registers a host native (drawing functions and friends) under the
    /// next free native id.
    pub fn register_native(&mut self, name: &str, f: NativeFn) -> Result<i32> {
        let iname = self.word_lut.add_native(name)?;
        self.natives.insert(iname, f);
        Ok(iname)
    }

    /// Parses a script, resetting the per-script word range first.
    pub fn parse(&mut self, source: &str) -> Result<Ast> {
        parser::parse(&mut self.word_lut, source)
    }

    pub fn compile_program(&self, ast: &Ast) -> Result<Program> {
        let mut program = Program::with_capacity(MAX_PROGRAM_SIZE);
        compiler::compile_program(&mut program, &self.word_lut, ast)?;
        Ok(program)
    }

    pub fn compile_program_with_genotype(
        &self,
        ast: &mut Ast,
        genotype: &Genotype,
    ) -> Result<Program> {
        let mut program = Program::with_capacity(MAX_PROGRAM_SIZE);
        compiler::compile_program_with_genotype(&mut program, &self.word_lut, ast, genotype)?;
        Ok(program)
    }

    /// Discovers the script's alterable nodes and compiles one trait per
    /// gene.
    pub fn compile_trait_list(&self, ast: &Ast, seed_value: i32) -> Result<TraitList> {
        genetic::trait_list_compile(self, ast, seed_value)
    }

    pub fn build_genotype(&self, trait_list: &TraitList, seed: i32) -> Result<Genotype> {
        genetic::genotype_build_from_trait_list(self, trait_list, seed)
    }

    pub fn unparse(&self, ast: &Ast, genotype: &Genotype) -> Result<String> {
        let mut cursor = crate::cursor::Cursor::with_capacity(UNPARSE_BUFFER_SIZE);
        unparser::unparse(&mut cursor, &self.word_lut, ast, genotype)?;
        Ok(cursor.as_str().to_string())
    }

    pub fn unparse_simplified(&self, ast: &Ast, genotype: &Genotype) -> Result<String> {
        let mut cursor = crate::cursor::Cursor::with_capacity(UNPARSE_BUFFER_SIZE);
        unparser::unparse_simplified(&mut cursor, &self.word_lut, ast, genotype)?;
        Ok(cursor.as_str().to_string())
    }
}
