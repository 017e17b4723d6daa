#![allow(dead_code)]

pub use approx::assert_relative_eq;
pub use sen::{Engine, Genotype, Program, TraitList, Var, Vm};

/// Fresh engine per test; the startup state is never shared.
pub fn engine() -> Engine {
    let _ = env_logger::builder().is_test(true).try_init();
    Engine::new().expect("engine startup")
}

pub fn compile(engine: &mut Engine, source: &str) -> Program {
    let ast = engine.parse(source).expect("parse");
    engine.compile_program(&ast).expect("compile")
}

/// Parses, compiles and runs a script, returning the VM and the value
/// left on top of the stack.
pub fn run(engine: &mut Engine, source: &str) -> (Vm, Var) {
    let program = compile(engine, source);
    let mut vm = Vm::new();
    vm.run(engine, &program).expect("run");
    let top = vm.stack_peek().expect("stack top");
    (vm, top)
}

pub fn run_top(engine: &mut Engine, source: &str) -> Var {
    run(engine, source).1
}

/// Builds a seeded genotype for the script, compiles with it and runs.
pub fn run_with_seed(engine: &mut Engine, source: &str, seed: i32) -> (Vm, Var, Genotype) {
    let mut ast = engine.parse(source).expect("parse");
    let trait_list = engine.compile_trait_list(&ast, seed).expect("trait list");
    let genotype = engine.build_genotype(&trait_list, seed).expect("genotype");
    let program = engine
        .compile_program_with_genotype(&mut ast, &genotype)
        .expect("compile with genotype");

    let mut vm = Vm::new();
    vm.run(engine, &program).expect("run");
    let top = vm.stack_peek().expect("stack top");
    (vm, top, genotype)
}

/// Numeric assertion; int results coerce the way the VM's arithmetic does.
pub fn assert_float(var: Var, expected: f32) {
    match var.as_f32() {
        Ok(f) => assert_relative_eq!(f, expected, epsilon = 0.001),
        Err(_) => panic!("expected a numeric value near {}, got {:?}", expected, var),
    }
}

pub fn as_f32(var: Var) -> f32 {
    var.as_f32().expect("numeric var")
}

/// Reads a vector value out of the VM's heap as floats.
pub fn vector_f32s(vm: &Vm, var: &Var) -> Vec<f32> {
    match var {
        Var::Vector(head) => vm
            .heap
            .chain_iter(*head)
            .map(|v| v.as_f32().expect("numeric element"))
            .collect(),
        Var::V2(a, b) => vec![*a, *b],
        other => panic!("expected a vector, got {:?}", other),
    }
}

/// Reads a vector of interned names out of the VM's heap.
pub fn vector_names(vm: &Vm, var: &Var) -> Vec<i32> {
    match var {
        Var::Vector(head) => vm
            .heap
            .chain_iter(*head)
            .map(|v| match v {
                Var::Name(iname) => *iname,
                other => panic!("expected a name element, got {:?}", other),
            })
            .collect(),
        other => panic!("expected a vector, got {:?}", other),
    }
}
