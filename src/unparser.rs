//! AST + genotype → source text.
//!
//! Non-alterable nodes reproduce their original lexemes (whitespace and
//! comments included); alterable nodes print the current gene value in
//! place of the original literal, keeping the `{…generator…}` wrapper.
//! The simplified form drops the wrappers and prints just the substituted
//! values.

use log::error;

use crate::cursor::Cursor;
use crate::error::{Error, Result};
use crate::genetic::{GeneCursor, Genotype};
use crate::keywords::Keyword;
use crate::node::{Ast, NodeArena, NodeId, NodeKind};
use crate::var::{Colour, ColourFormat, Var};
use crate::word_lut::WordLut;

fn count_decimals(node_src: &str) -> usize {
    match node_src.find('.') {
        Some(dot) => node_src.len() - dot - 1,
        None => 0,
    }
}

/// Floats print with the decimal count of the lexeme they replace.
fn format_float_using_node(cursor: &mut Cursor, arena: &NodeArena, node_id: NodeId, f: f32) -> Result<()> {
    let decimals = match arena.get(node_id).kind {
        NodeKind::Float(_) => count_decimals(&arena.get(node_id).src),
        _ => 0,
    };
    cursor.write_fmt(format_args!("{:.*}", decimals, f))
}

fn reverse_lookup<'a>(word_lut: &'a WordLut, iname: i32) -> Result<&'a str> {
    word_lut.reverse_lookup(iname).ok_or_else(|| {
        error!("unparse: no word for symbol {}", iname);
        Error::UnknownMappingForName(format!("#{}", iname))
    })
}

fn format_node_value(
    cursor: &mut Cursor,
    word_lut: &WordLut,
    arena: &NodeArena,
    node_id: NodeId,
) -> Result<()> {
    let node = arena.get(node_id);
    match node.kind {
        NodeKind::Int(i) => cursor.write_fmt(format_args!("{}", i)),
        NodeKind::Float(f) => format_float_using_node(cursor, arena, node_id, f),
        NodeKind::Name(iname) => cursor.write_str(reverse_lookup(word_lut, iname)?),
        NodeKind::Label(iname) => {
            cursor.write_str(reverse_lookup(word_lut, iname)?)?;
            cursor.write_str(":")
        }
        NodeKind::String(iname) => {
            cursor.write_str("\"")?;
            cursor.write_str(reverse_lookup(word_lut, iname)?)?;
            cursor.write_str("\"")
        }
        NodeKind::Whitespace | NodeKind::Comment => cursor.write_str(&node.src),
        NodeKind::List | NodeKind::Vector => {
            error!("unparse: composite node has no direct value form");
            Err(Error::GeneralError("composite node has no direct value form"))
        }
    }
}

fn format_colour(cursor: &mut Cursor, colour: &Colour) -> Result<()> {
    let labels = match colour.format {
        ColourFormat::Rgb => ["r", "g", "b"],
        ColourFormat::Hsl | ColourFormat::Hsluv => ["h", "s", "l"],
        ColourFormat::Lab => ["l", "a", "b"],
        ColourFormat::Hsv => ["h", "s", "v"],
        ColourFormat::Xyz => ["x", "y", "z"],
    };
    cursor.write_fmt(format_args!(
        "({} {}: {:.2} {}: {:.2} {}: {:.2} alpha: {:.2})",
        colour.format.constructor_name(),
        labels[0],
        colour.e[0],
        labels[1],
        colour.e[1],
        labels[2],
        colour.e[2],
        colour.e[3]
    ))
}

/// Prints the next gene's value styled after the node it replaces.
fn format_var_value(
    cursor: &mut Cursor,
    word_lut: &WordLut,
    arena: &NodeArena,
    node_id: NodeId,
    genes: &mut GeneCursor<'_>,
) -> Result<()> {
    let gene = genes.pull()?;
    match &gene.var {
        Var::Int(i) => cursor.write_fmt(format_args!("{}", i)),
        Var::Float(f) => format_float_using_node(cursor, arena, node_id, *f),
        Var::Name(iname) => cursor.write_str(reverse_lookup(word_lut, *iname)?),
        Var::Colour(colour) => format_colour(cursor, colour),
        Var::V2(a, b) => {
            // the node is a two-element vector; reproduce its interior
            // whitespace and comments around the substituted components
            cursor.write_str("[")?;

            let mut cur = arena.get(node_id).first_child;
            for component in [*a, *b] {
                loop {
                    match cur {
                        None => {
                            error!("unparse: 2d gene over a malformed vector node");
                            return Err(Error::GeneralError("2d gene over a malformed vector"));
                        }
                        Some(id) if arena.get(id).kind.is_semantic() => {
                            format_float_using_node(cursor, arena, id, component)?;
                            cur = arena.get(id).next;
                            break;
                        }
                        Some(id) => {
                            format_node_value(cursor, word_lut, arena, id)?;
                            cur = arena.get(id).next;
                        }
                    }
                }
            }
            while let Some(id) = cur {
                format_node_value(cursor, word_lut, arena, id)?;
                cur = arena.get(id).next;
            }

            cursor.write_str("]")
        }
        other => {
            error!("unparse: gene of type {} has no source form", other.type_name());
            Err(Error::GeneralError("gene has no source form"))
        }
    }
}

fn unparse_alterable_vector(
    cursor: &mut Cursor,
    word_lut: &WordLut,
    arena: &NodeArena,
    vector_id: NodeId,
    genes: &mut GeneCursor<'_>,
) -> Result<()> {
    cursor.write_str("[")?;

    let mut cur = arena.get(vector_id).first_child;
    while let Some(id) = cur {
        if arena.get(id).kind.is_semantic() {
            format_var_value(cursor, word_lut, arena, id, genes)?;
        } else {
            format_node_value(cursor, word_lut, arena, id)?;
        }
        cur = arena.get(id).next;
    }

    cursor.write_str("]")
}

fn unparse_node(
    cursor: &mut Cursor,
    word_lut: &WordLut,
    arena: &NodeArena,
    node_id: NodeId,
    genes: &mut GeneCursor<'_>,
    simplified: bool,
) -> Result<()> {
    let node = arena.get(node_id);

    if node.alterable {
        if !simplified {
            cursor.write_str("{")?;
            let mut prefix = node.parameter_prefix;
            while let Some(id) = prefix {
                format_node_value(cursor, word_lut, arena, id)?;
                prefix = arena.get(id).next;
            }
        }

        if node.kind == NodeKind::Vector {
            unparse_alterable_vector(cursor, word_lut, arena, node_id, genes)?;
        } else {
            format_var_value(cursor, word_lut, arena, node_id, genes)?;
        }

        if !simplified {
            let mut param = node.parameter_ast;
            while let Some(id) = param {
                unparse_node(cursor, word_lut, arena, id, genes, simplified)?;
                param = arena.get(id).next;
            }
            cursor.write_str("}")?;
        }
        return Ok(());
    }

    match node.kind {
        NodeKind::List => {
            let first = arena.safe_first(node.first_child);
            let is_quote = matches!(
                first.map(|id| arena.get(id).kind),
                Some(NodeKind::Name(iname)) if iname == i32::from(Keyword::Quote)
            );

            if let (true, Some(quote_id)) = (is_quote, first) {
                // re-abbreviate (quote x) to 'x
                cursor.write_str("'")?;
                let mut cur = arena.get(quote_id).next.and_then(|ws| arena.safe_first(Some(ws)));
                while let Some(id) = cur {
                    unparse_node(cursor, word_lut, arena, id, genes, simplified)?;
                    cur = arena.get(id).next;
                }
            } else {
                cursor.write_str("(")?;
                let mut cur = first;
                while let Some(id) = cur {
                    unparse_node(cursor, word_lut, arena, id, genes, simplified)?;
                    cur = arena.get(id).next;
                }
                cursor.write_str(")")?;
            }
            Ok(())
        }
        NodeKind::Vector => {
            cursor.write_str("[")?;
            let mut cur = arena.safe_first(node.first_child);
            while let Some(id) = cur {
                unparse_node(cursor, word_lut, arena, id, genes, simplified)?;
                cur = arena.get(id).next;
            }
            cursor.write_str("]")
        }
        _ => format_node_value(cursor, word_lut, arena, node_id),
    }
}

fn unparse_common(
    cursor: &mut Cursor,
    word_lut: &WordLut,
    ast: &Ast,
    genotype: &Genotype,
    simplified: bool,
) -> Result<()> {
    let mut genes = GeneCursor::new(&genotype.genes);

    let mut cur = ast.root;
    while let Some(id) = cur {
        unparse_node(cursor, word_lut, &ast.arena, id, &mut genes, simplified)?;
        cur = ast.arena.get(id).next;
    }

    if !genes.all_consumed() {
        error!("unparse: genes remaining after traversing every alterable node");
        return Err(Error::GenesRemainingAfterAssigning);
    }
    Ok(())
}

/// Reproduces the source with each alterable value replaced by its gene,
/// generator wrappers intact.
pub fn unparse(
    cursor: &mut Cursor,
    word_lut: &WordLut,
    ast: &Ast,
    genotype: &Genotype,
) -> Result<()> {
    unparse_common(cursor, word_lut, ast, genotype, false)
}

/// Like `unparse` but prints only the substituted values, discarding the
/// `{…}` wrappers; a minimal post-application source.
pub fn unparse_simplified(
    cursor: &mut Cursor,
    word_lut: &WordLut,
    ast: &Ast,
    genotype: &Genotype,
) -> Result<()> {
    unparse_common(cursor, word_lut, ast, genotype, true)
}
