mod support;

use sen::config::{KEYWORD_START, MAX_WORDS, NATIVE_START, WORD_START};
use sen::error::Error;
use sen::word_lut::WordLut;
use sen::{Var, Vm};
use support::*;

#[test]
fn keywords_and_natives_land_in_their_ranges() {
    let e = engine();
    let lut = e.word_lut();

    assert_eq!(lut.lookup("define"), Some(KEYWORD_START));
    assert_eq!(lut.lookup("gen/int"), Some(NATIVE_START));

    let plus = lut.lookup("+").unwrap();
    assert!(plus >= KEYWORD_START && plus < NATIVE_START);
}

#[test]
fn words_start_at_zero() {
    let mut lut = WordLut::new();
    assert_eq!(lut.add_word("first").unwrap(), WORD_START);
    assert_eq!(lut.add_word("second").unwrap(), WORD_START + 1);
}

#[test]
fn lookup_prefers_natives_then_keywords_then_words() {
    let mut lut = WordLut::new();
    lut.add_native("shared").unwrap();
    lut.add_keyword("shared").unwrap();
    lut.add_word("shared").unwrap();
    assert_eq!(lut.lookup("shared"), Some(NATIVE_START));
}

#[test]
fn reverse_lookup_inverts_lookup() {
    let mut e = engine();
    e.parse("my-variable").unwrap();

    let lut = e.word_lut();
    let iname = lut.lookup("my-variable").unwrap();
    assert_eq!(lut.reverse_lookup(iname), Some("my-variable"));
    assert_eq!(lut.reverse_lookup(KEYWORD_START), Some("define"));
}

#[test]
fn word_capacity_is_bounded() {
    let mut lut = WordLut::new();
    for i in 0..MAX_WORDS {
        lut.add_word(&format!("w{}", i)).unwrap();
    }
    assert_eq!(lut.add_word("one-too-many").unwrap_err(), Error::WordLutFull);
}

#[test]
fn host_natives_are_callable() {
    let mut e = engine();
    e.register_native("test/five", |_vm, _num_args| Ok(Var::Float(5.0)))
        .unwrap();

    let ast = e.parse("(+ 1 (test/five))").unwrap();
    let program = e.compile_program(&ast).unwrap();

    let mut vm = Vm::new();
    vm.run(&e, &program).unwrap();
    assert_eq!(vm.stack_peek().unwrap(), Var::Float(6.0));
}

#[test]
fn host_natives_read_labelled_arguments() {
    let mut e = engine();
    e.register_native("test/first-arg", |vm, num_args| {
        let pairs = vm.native_arg_pairs(num_args)?;
        Ok(pairs.first().map(|(_, var)| *var).unwrap_or(Var::Int(0)))
    })
    .unwrap();

    let ast = e.parse("(test/first-arg value: 41)").unwrap();
    let program = e.compile_program(&ast).unwrap();

    let mut vm = Vm::new();
    vm.run(&e, &program).unwrap();
    assert_eq!(vm.stack_peek().unwrap(), Var::Int(41));
}
