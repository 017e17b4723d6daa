mod support;

use sen::error::Error;
use sen::genetic::{
    genotype_build_from_initial_values, genotype_list_create_initial_generation,
    genotype_list_next_generation, genotype_possibly_mutate, Genotype,
};
use sen::prng::PrngState;
use sen::{Var, Vm};
use support::*;

const GEN_INT_SCRIPT: &str = "(+ 6 {3 (gen/int min: 1 max: 100)})";

#[test]
fn trait_list_discovers_alterable_nodes() {
    let mut e = engine();
    let ast = e.parse(GEN_INT_SCRIPT).unwrap();
    let traits = e.compile_trait_list(&ast, 3421).unwrap();

    assert_eq!(traits.len(), 1);
    assert_eq!(traits.seed_value, 3421);
    assert_eq!(traits.traits[0].initial_value, Var::Int(3));
    assert!(!traits.traits[0].within_vector);
}

#[test]
fn alterable_vector_yields_one_trait_per_element() {
    let mut e = engine();
    let ast = e
        .parse("{[50 60] (gen/stray-2d from: [50 60] by: [5 5])}")
        .unwrap();
    let traits = e.compile_trait_list(&ast, 99).unwrap();

    assert_eq!(traits.len(), 2);
    assert!(traits.traits[0].within_vector);
    assert_eq!(traits.traits[0].index, 0);
    assert!(traits.traits[1].within_vector);
    assert_eq!(traits.traits[1].index, 1);
    assert_eq!(traits.traits[0].initial_value, Var::Int(50));
    assert_eq!(traits.traits[1].initial_value, Var::Int(60));
}

#[test]
fn initial_values_genotype_is_canonical() {
    let mut e = engine();
    let ast = e.parse(GEN_INT_SCRIPT).unwrap();
    let traits = e.compile_trait_list(&ast, 0).unwrap();

    let genotype = genotype_build_from_initial_values(&traits);
    assert_eq!(genotype.genes.len(), 1);
    assert_eq!(genotype.genes[0].var, Var::Int(3));
}

#[test]
fn seeded_genotype_is_deterministic() {
    let mut e = engine();
    let ast = e.parse(GEN_INT_SCRIPT).unwrap();
    let traits = e.compile_trait_list(&ast, 3421).unwrap();

    let a = e.build_genotype(&traits, 3421).unwrap();
    let b = e.build_genotype(&traits, 3421).unwrap();
    assert_eq!(a, b);

    let c = e.build_genotype(&traits, 5000).unwrap();
    assert_ne!(a, c);
}

#[test]
fn gen_int_stays_in_range() {
    let mut e = engine();
    let ast = e.parse(GEN_INT_SCRIPT).unwrap();
    let traits = e.compile_trait_list(&ast, 0).unwrap();

    for seed in [1, 17, 3421, 9999] {
        let genotype = e.build_genotype(&traits, seed).unwrap();
        let value = as_f32(genotype.genes[0].var);
        assert!((1.0..=100.0).contains(&value), "seed {}: {}", seed, value);
        assert_eq!(value, value.floor());
    }
}

#[test]
fn compiling_with_genotype_substitutes_genes() {
    let mut e = engine();
    let (_, top, genotype) = run_with_seed(&mut e, GEN_INT_SCRIPT, 3421);
    let gene = as_f32(genotype.genes[0].var);
    assert_float(top, 6.0 + gene);
}

#[test]
fn empty_genotype_compiles_like_plain_compilation() {
    let mut e = engine();
    let source = "(define v []) (loop (x from: 0 to: 3) (vector/append v x)) v";

    let ast = e.parse(source).unwrap();
    let plain = e.compile_program(&ast).unwrap();

    let mut ast = e.parse(source).unwrap();
    let with_genotype = e
        .compile_program_with_genotype(&mut ast, &Genotype::default())
        .unwrap();

    assert_eq!(plain.code, with_genotype.code);
}

#[test]
fn leftover_genes_are_an_error() {
    let mut e = engine();
    let mut ast = e.parse("(+ 1 2)").unwrap();
    let genotype = Genotype {
        genes: vec![sen::Gene { var: Var::Int(9) }],
    };
    assert_eq!(
        e.compile_program_with_genotype(&mut ast, &genotype).unwrap_err(),
        Error::GenesRemainingAfterAssigning
    );
}

#[test]
fn within_vector_genes_substitute_componentwise() {
    let mut e = engine();
    let source = "{[50 60] (gen/stray-2d from: [50 60] by: [5 5])}";
    let (_, top, genotype) = run_with_seed(&mut e, source, 42);

    assert_eq!(genotype.genes.len(), 2);
    let x = as_f32(genotype.genes[0].var);
    let y = as_f32(genotype.genes[1].var);
    assert!((45.0..=55.0).contains(&x), "x: {}", x);
    assert!((55.0..=65.0).contains(&y), "y: {}", y);

    assert_eq!(top, Var::V2(x, y));
}

#[test]
fn gen_select_picks_from_the_pool() {
    let mut e = engine();
    let source = "{10 (gen/select from: '(10 20 30))}";
    let (_, top, genotype) = run_with_seed(&mut e, source, 7);

    let value = as_f32(genotype.genes[0].var);
    assert!([10.0, 20.0, 30.0].contains(&value), "value: {}", value);
    assert_eq!(as_f32(top), value);
}

#[test]
fn gen_stray_uses_the_initial_value() {
    let mut e = engine();
    let source = "{100 (gen/stray from: gen/initial by: 4)}";
    let (_, _, genotype) = run_with_seed(&mut e, source, 11);

    let value = as_f32(genotype.genes[0].var);
    assert!((96.0..=104.0).contains(&value), "value: {}", value);
}

#[test]
fn alterable_colour_constructor_takes_a_colour_gene() {
    let mut e = engine();
    let source = "{(col/rgb r: 0.1 g: 0.2 b: 0.3 alpha: 1) (gen/col alpha: 1)}";
    let (_, top, genotype) = run_with_seed(&mut e, source, 5);

    match genotype.genes[0].var {
        Var::Colour(c) => assert_relative_eq!(c.e[3], 1.0),
        other => panic!("expected a colour gene, got {:?}", other),
    }
    assert_eq!(top, genotype.genes[0].var);
}

#[test]
fn crossover_is_symmetric_at_the_endpoints() {
    let a = Genotype {
        genes: (0..5).map(|i| sen::Gene { var: Var::Int(i) }).collect(),
    };
    let b = Genotype {
        genes: (10..15).map(|i| sen::Gene { var: Var::Int(i) }).collect(),
    };

    assert_eq!(Genotype::crossover(&a, &b, 0), b);
    assert_eq!(Genotype::crossover(&a, &b, 5), a);

    let mixed = Genotype::crossover(&a, &b, 2);
    assert_eq!(mixed.genes[1].var, Var::Int(1));
    assert_eq!(mixed.genes[2].var, Var::Int(12));
}

#[test]
fn mutation_rate_zero_changes_nothing() {
    let mut e = engine();
    let ast = e.parse(GEN_INT_SCRIPT).unwrap();
    let traits = e.compile_trait_list(&ast, 0).unwrap();

    let mut genotype = e.build_genotype(&traits, 3421).unwrap();
    let before = genotype.clone();

    let mut prng = PrngState::new(17);
    genotype_possibly_mutate(&e, &mut genotype, 0.0, &mut prng, &traits).unwrap();
    assert_eq!(genotype, before);
}

#[test]
fn mutation_rate_one_is_deterministic() {
    let mut e = engine();
    let ast = e.parse(GEN_INT_SCRIPT).unwrap();
    let traits = e.compile_trait_list(&ast, 0).unwrap();

    let mut a = e.build_genotype(&traits, 3421).unwrap();
    let mut b = a.clone();

    let mut prng_a = PrngState::new(17);
    genotype_possibly_mutate(&e, &mut a, 1.0, &mut prng_a, &traits).unwrap();
    let mut prng_b = PrngState::new(17);
    genotype_possibly_mutate(&e, &mut b, 1.0, &mut prng_b, &traits).unwrap();

    assert_eq!(a, b);
    let value = as_f32(a.genes[0].var);
    assert!((1.0..=100.0).contains(&value));
}

#[test]
fn initial_generation_leads_with_the_canonical_genotype() {
    let mut e = engine();
    let ast = e.parse(GEN_INT_SCRIPT).unwrap();
    let traits = e.compile_trait_list(&ast, 0).unwrap();

    let population = genotype_list_create_initial_generation(&e, &traits, 5, 4242).unwrap();
    assert_eq!(population.len(), 5);
    assert_eq!(population.genotypes[0].genes[0].var, Var::Int(3));

    // seeded members must be reproducible
    let again = genotype_list_create_initial_generation(&e, &traits, 5, 4242).unwrap();
    for (x, y) in population.genotypes.iter().zip(again.genotypes.iter()) {
        assert_eq!(x, y);
    }
}

#[test]
fn next_generation_keeps_the_parents() {
    let mut e = engine();
    let ast = e.parse(GEN_INT_SCRIPT).unwrap();
    let traits = e.compile_trait_list(&ast, 0).unwrap();

    let parents = genotype_list_create_initial_generation(&e, &traits, 2, 99).unwrap();
    let next =
        genotype_list_next_generation(&e, &parents, 2, 6, 0.1, 123, &traits).unwrap();

    assert_eq!(next.len(), 6);
    assert_eq!(next.genotypes[0], parents.genotypes[0]);
    assert_eq!(next.genotypes[1], parents.genotypes[1]);

    for genotype in &next.genotypes {
        assert_eq!(genotype.genes.len(), 1);
    }
}

#[test]
fn trait_programs_rerun_after_deserialization() {
    let mut e = engine();
    let ast = e.parse(GEN_INT_SCRIPT).unwrap();
    let traits = e.compile_trait_list(&ast, 3421).unwrap();

    let mut cursor = sen::cursor::Cursor::with_capacity(16 * 1024);
    traits.serialize(&mut cursor).unwrap();
    cursor.reset();
    let restored = sen::TraitList::deserialize(&mut cursor).unwrap();

    let from_original = e.build_genotype(&traits, 3421).unwrap();
    let from_restored = e.build_genotype(&restored, 3421).unwrap();
    assert_eq!(from_original, from_restored);
}

#[test]
fn genes_never_hold_heap_vectors() {
    let mut e = engine();
    // the generator produces a general vector, which has no stable form
    // outside the vm that built it
    let mut ast = e.parse("{3 [1 2 3]}").unwrap();
    let traits = e.compile_trait_list(&ast, 0).unwrap();
    assert_eq!(
        e.build_genotype(&traits, 1).unwrap_err(),
        Error::IncompatibleGene
    );

    // the initial-values genotype still works
    let genotype = genotype_build_from_initial_values(&traits);
    let program = e.compile_program_with_genotype(&mut ast, &genotype).unwrap();
    let mut vm = Vm::new();
    vm.run(&e, &program).unwrap();
    assert_eq!(vm.stack_peek().unwrap(), Var::Int(3));
}
