mod support;

use sen::error::Error;
use sen::node::NodeKind;
use support::*;

#[test]
fn numbers() {
    let mut engine = engine();
    let ast = engine.parse("42 -17 3.14 -0.5 .5").unwrap();

    let mut kinds = Vec::new();
    let mut cur = ast.root;
    while let Some(id) = cur {
        let node = ast.arena.get(id);
        if node.kind.is_semantic() {
            kinds.push(node.kind);
        }
        cur = node.next;
    }

    assert_eq!(
        kinds,
        vec![
            NodeKind::Int(42),
            NodeKind::Int(-17),
            NodeKind::Float(3.14),
            NodeKind::Float(-0.5),
            NodeKind::Float(0.5),
        ]
    );
}

#[test]
fn float_lexeme_is_preserved() {
    let mut engine = engine();
    let ast = engine.parse("1.50").unwrap();
    let id = ast.arena.safe_first(ast.root).unwrap();
    assert_eq!(ast.arena.get(id).src, "1.50");
}

#[test]
fn list_and_vector_shapes() {
    let mut engine = engine();
    let ast = engine.parse("(+ 1 [2 3])").unwrap();

    let list = ast.arena.safe_first(ast.root).unwrap();
    assert_eq!(ast.arena.get(list).kind, NodeKind::List);

    let plus = ast.arena.safe_first_child(list).unwrap();
    assert!(matches!(ast.arena.get(plus).kind, NodeKind::Name(_)));

    let one = ast.arena.safe_next(plus).unwrap();
    assert_eq!(ast.arena.get(one).kind, NodeKind::Int(1));

    let vector = ast.arena.safe_next(one).unwrap();
    assert_eq!(ast.arena.get(vector).kind, NodeKind::Vector);
    assert_eq!(ast.arena.count_children(vector), 2);
}

#[test]
fn commas_are_whitespace() {
    let mut engine = engine();
    let ast = engine.parse("[1, 2, 3]").unwrap();
    let vector = ast.arena.safe_first(ast.root).unwrap();
    assert_eq!(ast.arena.count_children(vector), 3);
}

#[test]
fn labels_and_strings() {
    let mut engine = engine();
    let ast = engine.parse("(rectangle width: 30 name: \"thing\")").unwrap();

    let list = ast.arena.safe_first(ast.root).unwrap();
    let head = ast.arena.safe_first_child(list).unwrap();
    let label = ast.arena.safe_next(head).unwrap();
    assert!(matches!(ast.arena.get(label).kind, NodeKind::Label(_)));

    let value = ast.arena.safe_next(label).unwrap();
    assert_eq!(ast.arena.get(value).kind, NodeKind::Int(30));

    let name_label = ast.arena.safe_next(value).unwrap();
    let string = ast.arena.safe_next(name_label).unwrap();
    assert!(matches!(ast.arena.get(string).kind, NodeKind::String(_)));
    assert_eq!(ast.arena.get(string).src, "thing");
}

#[test]
fn comments_run_to_end_of_line() {
    let mut engine = engine();
    let ast = engine.parse("; a comment\n42").unwrap();

    let comment = ast.root.unwrap();
    assert_eq!(ast.arena.get(comment).kind, NodeKind::Comment);
    assert_eq!(ast.arena.get(comment).src, "; a comment");

    let value = ast.arena.safe_first(ast.root).unwrap();
    assert_eq!(ast.arena.get(value).kind, NodeKind::Int(42));
}

#[test]
fn quote_abbreviation_expands() {
    let mut engine = engine();
    let ast = engine.parse("'(1 2)").unwrap();

    let list = ast.arena.safe_first(ast.root).unwrap();
    assert_eq!(ast.arena.get(list).kind, NodeKind::List);

    let quote = ast.arena.safe_first_child(list).unwrap();
    assert_eq!(ast.arena.get(quote).src, "quote");

    let quoted = ast.arena.safe_next(quote).unwrap();
    assert_eq!(ast.arena.get(quoted).kind, NodeKind::List);
}

#[test]
fn alterable_node_captures_generator() {
    let mut engine = engine();
    let ast = engine.parse("{3 (gen/int min: 1 max: 10)}").unwrap();

    let altered = ast.arena.safe_first(ast.root).unwrap();
    let node = ast.arena.get(altered);
    assert_eq!(node.kind, NodeKind::Int(3));
    assert!(node.alterable);
    assert!(node.parameter_ast.is_some());
}

#[test]
fn alterable_prefix_whitespace_is_kept() {
    let mut engine = engine();
    let ast = engine.parse("{ 3 (gen/int min: 1 max: 10)}").unwrap();

    let altered = ast.arena.safe_first(ast.root).unwrap();
    let node = ast.arena.get(altered);
    assert!(node.alterable);

    let prefix = node.parameter_prefix.expect("prefix whitespace");
    assert_eq!(ast.arena.get(prefix).kind, NodeKind::Whitespace);
}

#[test]
fn alterable_string_is_rejected() {
    let mut engine = engine();
    let err = engine.parse("{\"hello\" (gen/int)}").unwrap_err();
    assert_eq!(err, Error::ParseNonMutableNode);
}

#[test]
fn mismatched_closers_are_rejected() {
    let mut engine = engine();
    assert_eq!(
        engine.parse("(+ 1 2))").unwrap_err(),
        Error::ParseMismatchedClose(')')
    );
    assert_eq!(engine.parse("]").unwrap_err(), Error::ParseMismatchedClose(']'));
}

#[test]
fn unterminated_string_is_rejected() {
    let mut engine = engine();
    assert_eq!(engine.parse("\"abc").unwrap_err(), Error::ParseEndOfInput);
}

#[test]
fn unterminated_list_is_rejected() {
    let mut engine = engine();
    assert_eq!(engine.parse("(+ 1 2").unwrap_err(), Error::ParseEndOfInput);
}

#[test]
fn words_reset_between_scripts() {
    let mut engine = engine();
    engine.parse("(define one-word 1 another-word 2)").unwrap();
    assert_eq!(engine.word_lut().word_count(), 2);

    engine.parse("(define other 2)").unwrap();
    assert_eq!(engine.word_lut().word_count(), 1);
}
