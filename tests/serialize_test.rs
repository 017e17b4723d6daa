mod support;

use sen::cursor::Cursor;
use sen::error::Error;
use sen::genetic::genotype_list_create_initial_generation;
use sen::opcodes::Opcode;
use sen::program::Bytecode;
use sen::{Colour, ColourFormat, Genotype, GenotypeList, Program, TraitList, Var};
use support::*;

fn round_trip_var(var: Var) {
    let mut cursor = Cursor::with_capacity(256);
    var.serialize(&mut cursor).unwrap();
    cursor.reset();
    assert_eq!(Var::deserialize(&mut cursor).unwrap(), var);
}

#[test]
fn var_round_trips() {
    round_trip_var(Var::Int(42));
    round_trip_var(Var::Int(-7));
    round_trip_var(Var::Float(3.25));
    round_trip_var(Var::Bool(true));
    round_trip_var(Var::Bool(false));
    round_trip_var(Var::Long(0xdead_beef_cafe));
    round_trip_var(Var::Name(321));
    round_trip_var(Var::V2(1.5, -2.5));
    round_trip_var(Var::Colour(Colour::new(ColourFormat::Hsl, 0.25, 0.5, 0.75, 1.0)));
    round_trip_var(Var::Colour(Colour::new(ColourFormat::Xyz, 0.25, 0.5, 0.75, 1.0)));
}

#[test]
fn var_text_forms() {
    let mut cursor = Cursor::with_capacity(256);
    Var::Int(42).serialize(&mut cursor).unwrap();
    assert_eq!(cursor.as_str(), "INT 42");

    let mut cursor = Cursor::with_capacity(256);
    Var::Float(1.0).serialize(&mut cursor).unwrap();
    assert_eq!(cursor.as_str(), "FLOAT 1.0000");

    let mut cursor = Cursor::with_capacity(256);
    Var::V2(1.0, 2.0).serialize(&mut cursor).unwrap();
    assert_eq!(cursor.as_str(), "2D 1.0000 2.0000");
}

#[test]
fn vectors_do_not_serialize() {
    let mut cursor = Cursor::with_capacity(256);
    assert_eq!(
        Var::Vector(None).serialize(&mut cursor).unwrap_err(),
        Error::VectorSerialization
    );
}

#[test]
fn bytecode_round_trips() {
    let bytecode = Bytecode {
        op: Opcode::JumpIf,
        arg0: Var::Int(-4),
        arg1: Var::Int(0),
    };

    let mut cursor = Cursor::with_capacity(256);
    bytecode.serialize(&mut cursor).unwrap();
    cursor.reset();
    assert_eq!(Bytecode::deserialize(&mut cursor).unwrap(), bytecode);
}

#[test]
fn jump_and_jump_if_spell_differently() {
    // JUMP is a prefix of JUMP_IF; deserialization must not confuse them
    for op in [Opcode::Jump, Opcode::JumpIf, Opcode::Store, Opcode::StoreF] {
        let bytecode = Bytecode {
            op,
            arg0: Var::Int(1),
            arg1: Var::Int(2),
        };
        let mut cursor = Cursor::with_capacity(256);
        bytecode.serialize(&mut cursor).unwrap();
        cursor.reset();
        assert_eq!(Bytecode::deserialize(&mut cursor).unwrap().op, op);
    }
}

#[test]
fn program_round_trips() {
    let mut e = engine();
    let program = compile(&mut e, "(+ 3 (* 4 5))");

    let mut cursor = Cursor::with_capacity(16 * 1024);
    program.serialize(&mut cursor).unwrap();
    cursor.reset();

    let restored = Program::deserialize(&mut cursor).unwrap();
    assert_eq!(restored.code, program.code);
    assert_eq!(restored.code_max_size, program.code_max_size);
}

#[test]
fn genotype_round_trips() {
    let genotype = Genotype {
        genes: vec![
            sen::Gene { var: Var::Int(3) },
            sen::Gene {
                var: Var::Float(1.5),
            },
            sen::Gene {
                var: Var::V2(0.25, 0.75),
            },
        ],
    };

    let mut cursor = Cursor::with_capacity(1024);
    genotype.serialize(&mut cursor).unwrap();
    cursor.reset();
    assert_eq!(Genotype::deserialize(&mut cursor).unwrap(), genotype);
}

#[test]
fn genotype_list_round_trips() {
    let mut e = engine();
    let ast = e.parse("(+ 6 {3 (gen/int min: 1 max: 100)})").unwrap();
    let traits = e.compile_trait_list(&ast, 0).unwrap();
    let population = genotype_list_create_initial_generation(&e, &traits, 4, 11).unwrap();

    let mut cursor = Cursor::with_capacity(16 * 1024);
    population.serialize(&mut cursor).unwrap();
    cursor.reset();

    let restored = GenotypeList::deserialize(&mut cursor).unwrap();
    assert_eq!(restored.genotypes, population.genotypes);
}

#[test]
fn trait_list_round_trips() {
    let mut e = engine();
    let ast = e
        .parse("{[50 60] (gen/stray-2d from: [50 60] by: [5 5])}")
        .unwrap();
    let traits = e.compile_trait_list(&ast, 987).unwrap();

    let mut cursor = Cursor::with_capacity(64 * 1024);
    traits.serialize(&mut cursor).unwrap();
    cursor.reset();

    let restored = TraitList::deserialize(&mut cursor).unwrap();
    assert_eq!(restored.seed_value, 987);
    assert_eq!(restored.len(), traits.len());
    for (a, b) in restored.traits.iter().zip(traits.traits.iter()) {
        assert_eq!(a.id, b.id);
        assert_eq!(a.within_vector, b.within_vector);
        assert_eq!(a.index, b.index);
        assert_eq!(a.initial_value, b.initial_value);
        assert_eq!(a.program.code, b.program.code);
    }
}

#[test]
fn cursor_overflow_is_an_error() {
    let mut cursor = Cursor::with_capacity(4);
    assert_eq!(
        cursor.write_str("this does not fit").unwrap_err(),
        Error::CursorOverflow
    );
}

#[test]
fn cursor_reads_tokens() {
    let mut cursor = Cursor::with_capacity(64);
    cursor.write_str("12 -3 4.5 18446744073709551615").unwrap();
    cursor.reset();

    assert_eq!(cursor.eat_i32().unwrap(), 12);
    assert_eq!(cursor.eat_i32().unwrap(), -3);
    assert_eq!(cursor.eat_f32().unwrap(), 4.5);
    assert_eq!(cursor.eat_u64().unwrap(), u64::MAX);
}
