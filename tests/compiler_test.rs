mod support;

use sen::error::Error;
use sen::opcodes::Opcode;
use sen::program::MemorySegment;
use sen::Var;
use support::*;

fn ops(program: &sen::Program) -> Vec<Opcode> {
    program.code.iter().map(|bc| bc.op).collect()
}

#[test]
fn simple_addition_bytecode_shape() {
    let mut e = engine();
    let program = compile(&mut e, "(+ 3 4)");

    assert_eq!(
        ops(&program),
        vec![
            Opcode::Jump,
            Opcode::Load,
            Opcode::Load,
            Opcode::Add,
            Opcode::Stop,
        ]
    );
    assert_eq!(program.code[1].arg1, Var::Int(3));
    assert_eq!(program.code[2].arg1, Var::Int(4));
}

#[test]
fn entry_jump_skips_function_bodies() {
    let mut e = engine();
    let program = compile(&mut e, "(fn (f) 1) (+ 2 3)");

    assert_eq!(program.code[0].op, Opcode::Jump);
    let skip = program.code[0].arg0.as_i32().unwrap() as usize;

    // the jump target is the first instruction after the fn's RET
    assert_eq!(program.code[skip - 1].op, Opcode::Ret);
    assert_eq!(program.code[skip].op, Opcode::Load);
}

#[test]
fn fn_info_records_addresses_and_arity() {
    let mut e = engine();
    let program = compile(&mut e, "(fn (adder a: 9 b: 8) (+ a b))");

    assert_eq!(program.fn_info.len(), 1);
    let fi = &program.fn_info[0];
    assert_eq!(fi.index, 0);
    assert_eq!(fi.num_args, 2);
    assert!(fi.arg_address < fi.body_address);
    assert_eq!(program.code[fi.body_address as usize - 1].op, Opcode::Ret0);
}

#[test]
fn every_call_site_is_patched() {
    let mut e = engine();
    let program = compile(
        &mut e,
        "(fn (adder a: 9 b: 8) (+ a b)) (adder a: 5) (adder b: 2)",
    );

    let const_seg = Var::Int(MemorySegment::Constant.into());
    for (i, bc) in program.code.iter().enumerate() {
        match bc.op {
            Opcode::Call => {
                assert_eq!(program.code[i - 2].op, Opcode::Load);
                assert_eq!(program.code[i - 2].arg0, const_seg);
                assert_eq!(
                    program.code[i - 2].arg1,
                    Var::Int(program.fn_info[0].arg_address)
                );
                assert_eq!(program.code[i - 1].arg1, Var::Int(program.fn_info[0].num_args));
            }
            Opcode::Call0 => {
                assert_eq!(
                    program.code[i - 1].arg1,
                    Var::Int(program.fn_info[0].body_address)
                );
            }
            Opcode::PlaceholderStore => {
                panic!("placeholder store survived the fix-up pass");
            }
            _ => {}
        }
    }
}

#[test]
fn unused_call_argument_becomes_a_void_store() {
    let mut e = engine();
    let program = compile(&mut e, "(fn (f a: 1) a) (f q: 9)");

    let void_seg = Var::Int(MemorySegment::Void.into());
    let has_void_store = program
        .code
        .iter()
        .any(|bc| bc.op == Opcode::Store && bc.arg0 == void_seg);
    assert!(has_void_store);
}

#[test]
fn too_many_functions_is_rejected() {
    let mut e = engine();
    let source: String = (0..33).map(|i| format!("(fn (f{}) 1) ", i)).collect();
    let ast = e.parse(&source).unwrap();
    assert_eq!(
        e.compile_program(&ast).unwrap_err(),
        Error::MaxTopLevelFunctions
    );
}

#[test]
fn if_branch_offset_mismatch_is_rejected() {
    let mut e = engine();
    let ast = e.parse("(if (> 1 0) (define a 1) 2)").unwrap();
    assert_eq!(
        e.compile_program(&ast).unwrap_err(),
        Error::IfBranchOffsetMismatch
    );
}

#[test]
fn two_element_vector_squishes() {
    let mut e = engine();
    let program = compile(&mut e, "[4 5]");
    assert!(ops(&program).contains(&Opcode::Squish2));
    assert!(!ops(&program).contains(&Opcode::Append));
}

#[test]
fn general_vector_appends() {
    let mut e = engine();
    let program = compile(&mut e, "[4 5 6]");
    assert_eq!(
        ops(&program)
            .iter()
            .filter(|op| **op == Opcode::Append)
            .count(),
        3
    );
}

#[test]
fn loop_compiles_to_a_backwards_jump() {
    let mut e = engine();
    let program = compile(&mut e, "(loop (x from: 0 to: 3) x)");

    let backwards = program
        .code
        .iter()
        .filter(|bc| bc.op == Opcode::Jump)
        .any(|bc| bc.arg0.as_i32().unwrap() < 0);
    assert!(backwards);
}

#[test]
fn loop_body_leftovers_are_popped() {
    let mut e = engine();
    // the body leaves one value per iteration which the loop discards
    let program = compile(&mut e, "(loop (x from: 0 to: 3) (+ x 1))");

    let void_seg = Var::Int(MemorySegment::Void.into());
    let pops = program
        .code
        .iter()
        .filter(|bc| bc.op == Opcode::Store && bc.arg0 == void_seg)
        .count();
    assert_eq!(pops, 1);
}

#[test]
fn on_matrix_stack_brackets_the_body() {
    let mut e = engine();
    let program = compile(&mut e, "(on-matrix-stack 1 2)");

    let ops = ops(&program);
    let load = ops.iter().position(|op| *op == Opcode::MtxLoad).unwrap();
    let store = ops.iter().position(|op| *op == Opcode::MtxStore).unwrap();
    assert!(load < store);
}

#[test]
fn native_invocation_counts_its_arguments() {
    let mut e = engine();
    let program = compile(&mut e, "(col/rgb r: 1 g: 0 b: 0 alpha: 1)");

    let native = program
        .code
        .iter()
        .find(|bc| bc.op == Opcode::Native)
        .expect("native opcode");
    assert_eq!(native.arg1, Var::Int(4));
}

#[test]
fn top_level_defines_store_globally() {
    let mut e = engine();
    let program = compile(&mut e, "(define x 5)");

    let global_seg = Var::Int(MemorySegment::Global.into());
    let stores_globally = program
        .code
        .iter()
        .any(|bc| bc.op == Opcode::Store && bc.arg0 == global_seg);
    assert!(stores_globally);
}

#[test]
fn program_listing_is_printable() {
    let mut e = engine();
    let program = compile(&mut e, "(+ 1 2)");
    let listing = format!("{}", program);
    assert!(listing.contains("ADD"));
    assert!(listing.contains("LOAD"));
}
