//! A small lisp-like language for generative art.
//!
//! Scripts describe drawings as expressions. Subexpressions wrapped in
//! `{…}` are *alterable*: each defines a trait whose generator can be
//! sampled under a seeded PRNG to produce a *genotype*, and compiling the
//! script with a genotype substitutes those sampled values back in. The
//! same machinery drives crossover and mutation between genotypes, so a
//! piece can be evolved rather than edited.
//!
//! The pipeline is: parser → bytecode compiler → stack VM, with the
//! genetic engine and an unparser on the side. Drawing itself is a host
//! concern: hosts register native functions which the VM calls with
//! labelled arguments.
//!
//! ## Quick usage
//!
//! ```rust
//! use sen::{Engine, Var, Vm};
//!
//! let mut engine = Engine::new().unwrap();
//!
//! // run a script
//! let ast = engine.parse("(+ 3 4)").unwrap();
//! let program = engine.compile_program(&ast).unwrap();
//!
//! let mut vm = Vm::new();
//! vm.run(&engine, &program).unwrap();
//! assert_eq!(vm.stack_peek().unwrap(), Var::Float(7.0));
//!
//! // run a variation of a script
//! let mut ast = engine.parse("(+ 6 {3 (gen/int min: 1 max: 100)})").unwrap();
//! let traits = engine.compile_trait_list(&ast, 3421).unwrap();
//! let genotype = engine.build_genotype(&traits, 3421).unwrap();
//! let program = engine.compile_program_with_genotype(&mut ast, &genotype).unwrap();
//!
//! let mut vm = Vm::new();
//! vm.run(&engine, &program).unwrap();
//! println!("{:?}", vm.stack_peek().unwrap());
//! ```

pub mod compiler;
pub mod config;
pub mod cursor;
pub mod engine;
pub mod error;
pub mod genetic;
pub mod heap;
pub mod keywords;
pub mod matrix;
pub mod native;
pub mod node;
pub mod opcodes;
pub mod parser;
pub mod prng;
pub mod program;
pub mod unparser;
pub mod var;
pub mod vm;
pub mod word_lut;

pub use crate::engine::Engine;
pub use crate::error::{Error, Result};
pub use crate::genetic::{Gene, Genotype, GenotypeList, Trait, TraitList};
pub use crate::node::{Ast, NodeId, NodeKind};
pub use crate::program::{Bytecode, MemorySegment, Program};
pub use crate::var::{Colour, ColourFormat, Var};
pub use crate::vm::Vm;
