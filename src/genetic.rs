//! Traits, genes and genotypes: the variation engine.
//!
//! Compiling a script's traits walks the AST for alterable nodes; each one
//! yields a trait holding the node's evaluated initial value and a
//! standalone program for its generator expression. Running every trait
//! program under a seeded PRNG produces a genotype, whose genes are then
//! substituted back into the script by the compiler.

use itertools::Itertools;
use log::error;

use crate::compiler::{compile_program_for_trait, compile_single_node_program};
use crate::config::MAX_TRAIT_PROGRAM_SIZE;
use crate::cursor::Cursor;
use crate::engine::Engine;
use crate::error::{Error, Result};
use crate::node::{Ast, NodeArena, NodeId, NodeKind};
use crate::program::Program;
use crate::prng::PrngState;
use crate::var::Var;
use crate::vm::Vm;

/// One runtime value bound to one alterable node.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Gene {
    pub var: Var,
}

/// The genes for one script, in the order its alterable nodes appear.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Genotype {
    pub genes: Vec<Gene>,
}

#[derive(Debug, Default)]
pub struct GenotypeList {
    pub genotypes: Vec<Genotype>,
}

/// The generator attached to one alterable node. An alterable vector
/// produces one trait per element, with `within_vector`/`index` telling
/// the `gen/*` natives which component to produce.
#[derive(Debug)]
pub struct Trait {
    pub id: i32,
    pub within_vector: bool,
    pub index: i32,
    pub initial_value: Var,
    pub program: Program,
}

#[derive(Debug, Default)]
pub struct TraitList {
    pub traits: Vec<Trait>,
    pub seed_value: i32,
}

/// Explicit cursor over a genotype's genes, shared by the gene-assignment
/// pass and the unparser so both consume the stream the same way.
pub struct GeneCursor<'a> {
    genes: &'a [Gene],
    index: usize,
}

impl<'a> GeneCursor<'a> {
    pub fn new(genes: &'a [Gene]) -> Self {
        GeneCursor { genes, index: 0 }
    }

    pub fn pull(&mut self) -> Result<&'a Gene> {
        let gene = self.genes.get(self.index).ok_or_else(|| {
            error!("gene cursor exhausted at index {}", self.index);
            Error::NullGene
        })?;
        self.index += 1;
        Ok(gene)
    }

    pub fn all_consumed(&self) -> bool {
        self.index == self.genes.len()
    }
}

/// Genes hold self-contained values; a trait program whose result is a
/// heap vector has nothing stable to copy out of the VM.
fn owned_gene_var(var: Var) -> Result<Var> {
    match var {
        Var::Vector(_) => {
            error!("a trait program produced a heap vector");
            Err(Error::IncompatibleGene)
        }
        other => Ok(other),
    }
}

// ---------------------------------------------------------------
// trait compilation
// ---------------------------------------------------------------

/// Evaluates a single altered node in isolation (the literal, not its
/// generator) to obtain the trait's initial value.
fn evaluate_node(engine: &Engine, arena: &NodeArena, node_id: NodeId) -> Result<Var> {
    let mut program = Program::with_capacity(MAX_TRAIT_PROGRAM_SIZE);
    compile_single_node_program(&mut program, engine.word_lut(), arena, node_id)?;

    let mut vm = Vm::new();
    vm.run(engine, &program)?;

    owned_gene_var(vm.stack_peek()?)
}

fn build_trait(
    engine: &Engine,
    arena: &NodeArena,
    node_id: NodeId,
    parameter_ast: Option<NodeId>,
    id: i32,
    within_vector: bool,
    index: i32,
) -> Result<Trait> {
    let initial_value = evaluate_node(engine, arena, node_id)?;

    let mut program = Program::with_capacity(MAX_TRAIT_PROGRAM_SIZE);
    compile_program_for_trait(&mut program, engine.word_lut(), arena, parameter_ast, node_id)?;

    Ok(Trait {
        id,
        within_vector,
        index,
        initial_value,
        program,
    })
}

fn traverse(
    engine: &Engine,
    arena: &NodeArena,
    node_id: NodeId,
    traits: &mut Vec<Trait>,
) -> Result<()> {
    let node = arena.get(node_id);

    if node.alterable {
        if node.kind == NodeKind::Vector {
            // one trait per element, all sharing the vector's generator
            let parameter_ast = node.parameter_ast;
            let mut child = arena.safe_first_child(node_id);
            let mut index = 0;
            while let Some(c) = child {
                let id = traits.len() as i32;
                traits.push(build_trait(engine, arena, c, parameter_ast, id, true, index)?);
                index += 1;
                child = arena.safe_next(c);
            }
        } else {
            let id = traits.len() as i32;
            traits.push(build_trait(
                engine,
                arena,
                node_id,
                node.parameter_ast,
                id,
                false,
                0,
            )?);
        }
    }

    if matches!(node.kind, NodeKind::List | NodeKind::Vector) {
        let mut child = arena.safe_first(node.first_child);
        while let Some(c) = child {
            traverse(engine, arena, c, traits)?;
            child = arena.safe_next(c);
        }
    }
    Ok(())
}

/// Discovers every alterable node and compiles its trait.
pub fn trait_list_compile(engine: &Engine, ast: &Ast, seed_value: i32) -> Result<TraitList> {
    let mut traits = Vec::new();

    let mut cur = ast.arena.safe_first(ast.root);
    while let Some(id) = cur {
        traverse(engine, &ast.arena, id, &mut traits)?;
        cur = ast.arena.safe_next(id);
    }

    Ok(TraitList { traits, seed_value })
}

impl TraitList {
    pub fn len(&self) -> usize {
        self.traits.len()
    }

    pub fn is_empty(&self) -> bool {
        self.traits.is_empty()
    }

    pub fn serialize(&self, cursor: &mut Cursor) -> Result<()> {
        cursor.write_fmt(format_args!("{} {} ", self.seed_value, self.traits.len()))?;
        for (i, t) in self.traits.iter().enumerate() {
            t.serialize(cursor)?;
            if i + 1 < self.traits.len() {
                cursor.write_str(" ")?;
            }
        }
        Ok(())
    }

    pub fn deserialize(cursor: &mut Cursor) -> Result<TraitList> {
        let seed_value = cursor.eat_i32()?;
        let count = cursor.eat_i32()?;

        let mut traits = Vec::with_capacity(count as usize);
        for _ in 0..count {
            traits.push(Trait::deserialize(cursor)?);
        }
        Ok(TraitList { traits, seed_value })
    }
}

impl Trait {
    pub fn serialize(&self, cursor: &mut Cursor) -> Result<()> {
        cursor.write_fmt(format_args!(
            "{} {} {} ",
            self.id, self.within_vector as i32, self.index
        ))?;
        self.initial_value.serialize(cursor)?;
        cursor.write_str(" ")?;
        self.program.serialize(cursor)
    }

    pub fn deserialize(cursor: &mut Cursor) -> Result<Trait> {
        let id = cursor.eat_i32()?;
        let within_vector = cursor.eat_i32()? != 0;
        let index = cursor.eat_i32()?;
        let initial_value = Var::deserialize(cursor)?;
        let program = Program::deserialize(cursor)?;
        Ok(Trait {
            id,
            within_vector,
            index,
            initial_value,
            program,
        })
    }
}

// ---------------------------------------------------------------
// genotype building
// ---------------------------------------------------------------

fn gene_build_from_trait(engine: &Engine, vm: &mut Vm, t: &Trait) -> Result<Gene> {
    vm.reset();

    vm.building_with_trait_within_vector = t.within_vector;
    vm.trait_within_vector_index = t.index;

    vm.run(engine, &t.program)?;

    vm.building_with_trait_within_vector = false;
    vm.trait_within_vector_index = 0;

    Ok(Gene {
        var: owned_gene_var(vm.stack_peek()?)?,
    })
}

/// The canonical genotype: every gene is the trait's unaltered initial
/// value.
pub fn genotype_build_from_initial_values(trait_list: &TraitList) -> Genotype {
    Genotype {
        genes: trait_list
            .traits
            .iter()
            .map(|t| Gene {
                var: t.initial_value,
            })
            .collect(),
    }
}

/// Runs every trait program under a PRNG seeded once for the whole
/// genotype.
pub fn genotype_build_from_trait_list(
    engine: &Engine,
    trait_list: &TraitList,
    seed: i32,
) -> Result<Genotype> {
    let mut vm = Vm::new();
    vm.prng_state.set_state(seed as u64);

    let mut genes = Vec::with_capacity(trait_list.traits.len());
    for t in &trait_list.traits {
        genes.push(gene_build_from_trait(engine, &mut vm, t)?);
    }
    Ok(Genotype { genes })
}

impl Genotype {
    pub fn len(&self) -> usize {
        self.genes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.genes.is_empty()
    }

    /// First `crossover_index` genes from `a`, the rest from `b`.
    pub fn crossover(a: &Genotype, b: &Genotype, crossover_index: usize) -> Genotype {
        Genotype {
            genes: a
                .genes
                .iter()
                .take(crossover_index)
                .chain(b.genes.iter().skip(crossover_index))
                .copied()
                .collect(),
        }
    }

    pub fn serialize(&self, cursor: &mut Cursor) -> Result<()> {
        cursor.write_fmt(format_args!("{} ", self.genes.len()))?;
        for (i, gene) in self.genes.iter().enumerate() {
            gene.var.serialize(cursor)?;
            if i + 1 < self.genes.len() {
                cursor.write_str(" ")?;
            }
        }
        Ok(())
    }

    pub fn deserialize(cursor: &mut Cursor) -> Result<Genotype> {
        let count = cursor.eat_i32()?;
        let mut genes = Vec::with_capacity(count as usize);
        for _ in 0..count {
            genes.push(Gene {
                var: Var::deserialize(cursor)?,
            });
        }
        Ok(Genotype { genes })
    }
}

/// Re-runs a gene's trait program with the carried PRNG state, which keeps
/// advancing across both the mutation coin flips and the regeneration.
fn gene_generate_new_var(
    engine: &Engine,
    gene: &mut Gene,
    t: &Trait,
    prng: &mut PrngState,
) -> Result<()> {
    let mut vm = Vm::new();
    vm.prng_state = *prng;

    vm.building_with_trait_within_vector = t.within_vector;
    vm.trait_within_vector_index = t.index;

    vm.run(engine, &t.program)?;

    gene.var = owned_gene_var(vm.stack_peek()?)?;
    *prng = vm.prng_state;
    Ok(())
}

/// Point mutation: each gene is regenerated with probability
/// `mutation_rate`.
pub fn genotype_possibly_mutate(
    engine: &Engine,
    genotype: &mut Genotype,
    mutation_rate: f32,
    prng: &mut PrngState,
    trait_list: &TraitList,
) -> Result<()> {
    for (gene, t) in genotype.genes.iter_mut().zip_eq(trait_list.traits.iter()) {
        let roll = prng.next_f32();
        if roll < mutation_rate {
            gene_generate_new_var(engine, gene, t, prng)?;
        }
    }
    Ok(())
}

// ---------------------------------------------------------------
// generations
// ---------------------------------------------------------------

impl GenotypeList {
    pub fn len(&self) -> usize {
        self.genotypes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.genotypes.is_empty()
    }

    pub fn serialize(&self, cursor: &mut Cursor) -> Result<()> {
        cursor.write_fmt(format_args!("{} ", self.genotypes.len()))?;
        for (i, genotype) in self.genotypes.iter().enumerate() {
            genotype.serialize(cursor)?;
            if i + 1 < self.genotypes.len() {
                cursor.write_str(" ")?;
            }
        }
        Ok(())
    }

    pub fn deserialize(cursor: &mut Cursor) -> Result<GenotypeList> {
        let count = cursor.eat_i32()?;
        let mut genotypes = Vec::with_capacity(count as usize);
        for _ in 0..count {
            genotypes.push(Genotype::deserialize(cursor)?);
        }
        Ok(GenotypeList { genotypes })
    }
}

/// The first genotype carries the script's initial values; the rest are
/// built from sub-seeds drawn from the population seed.
pub fn genotype_list_create_initial_generation(
    engine: &Engine,
    trait_list: &TraitList,
    population_size: usize,
    seed: i32,
) -> Result<GenotypeList> {
    let mut list = GenotypeList::default();
    if population_size == 0 {
        error!("initial generation requested with a population size of 0");
        return Ok(list);
    }

    list.genotypes
        .push(genotype_build_from_initial_values(trait_list));

    let mut prng = PrngState::new(seed as u64);
    for _ in 1..population_size {
        let genotype_seed = prng.i32_range(1, 1 << 16);
        list.genotypes
            .push(genotype_build_from_trait_list(engine, trait_list, genotype_seed)?);
    }
    Ok(list)
}

/// Keeps the parents and fills the rest of the population with mutated
/// crossovers of two distinct parents.
pub fn genotype_list_next_generation(
    engine: &Engine,
    parents: &GenotypeList,
    num_parents: usize,
    population_size: usize,
    mutation_rate: f32,
    seed: i32,
    trait_list: &TraitList,
) -> Result<GenotypeList> {
    let mut list = GenotypeList::default();
    if num_parents == 0 || parents.genotypes.is_empty() {
        error!("next generation requested without parents");
        return Err(Error::GeneralError("next generation requires parents"));
    }

    for parent in &parents.genotypes {
        list.genotypes.push(parent.clone());
    }

    let mut prng = PrngState::new(seed as u64);
    let retry_count = 10;

    while list.genotypes.len() < population_size {
        let a_index = prng.i32_range(0, num_parents as i32 - 1) as usize;
        let mut b_index = a_index;
        for _ in 0..retry_count {
            b_index = prng.i32_range(0, num_parents as i32 - 1) as usize;
            if b_index != a_index {
                break;
            }
        }
        if b_index == a_index {
            b_index = (a_index + 1) % num_parents;
        }

        let a = &parents.genotypes[a_index];
        let b = &parents.genotypes[b_index];

        let genotype_length = a.genes.len();
        let crossover_index = prng.i32_range(0, genotype_length as i32 - 1) as usize;

        let mut genotype = Genotype::crossover(a, b, crossover_index);
        genotype_possibly_mutate(engine, &mut genotype, mutation_rate, &mut prng, trait_list)?;

        list.genotypes.push(genotype);
    }

    Ok(list)
}
