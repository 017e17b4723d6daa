//! Hand-written recursive-descent parser over a byte cursor.
//!
//! Commas count as whitespace. A `'x` form is rewritten to
//! `(quote x)` during the parse. `{…}` marks the first meaningful item it
//! contains as alterable and hangs the rest of the bracket's contents off
//! that node as its generator expression.

use log::error;

use crate::error::{Error, Result};
use crate::node::{Ast, NodeArena, NodeId, NodeKind};
use crate::word_lut::WordLut;

fn is_whitespace(c: u8) -> bool {
    matches!(c, b' ' | b'\t' | b'\n' | b'\r' | b',')
}

fn is_digit(c: u8) -> bool {
    c.is_ascii_digit()
}

fn is_alpha(c: u8) -> bool {
    c.is_ascii_alphabetic()
}

fn is_symbol(c: u8) -> bool {
    matches!(
        c,
        b'+' | b'-'
            | b'*'
            | b'/'
            | b'='
            | b'!'
            | b'@'
            | b'#'
            | b'$'
            | b'%'
            | b'^'
            | b'&'
            | b'<'
            | b'>'
            | b'?'
    )
}

fn is_name_char(c: u8) -> bool {
    is_alpha(c) || is_digit(c) || is_symbol(c)
}

struct Parser<'a> {
    src: &'a [u8],
    pos: usize,
    arena: NodeArena,
    word_lut: &'a mut WordLut,
}

/// Parses a script into an AST, interning user identifiers into the word
/// lut's per-script range (which is reset first).
pub fn parse(word_lut: &mut WordLut, source: &str) -> Result<Ast> {
    word_lut.reset_words();

    let mut parser = Parser {
        src: source.as_bytes(),
        pos: 0,
        arena: NodeArena::new(),
        word_lut,
    };

    let mut root = None;
    while parser.peek().is_some() {
        let node = parser.eat_item()?;
        let mut head = root;
        parser.arena.append_sibling(&mut head, node);
        root = head;
    }

    Ok(Ast {
        arena: parser.arena,
        root,
    })
}

impl<'a> Parser<'a> {
    fn peek(&self) -> Option<u8> {
        self.src.get(self.pos).copied()
    }

    fn peek_at(&self, offset: usize) -> Option<u8> {
        self.src.get(self.pos + offset).copied()
    }

    fn bump(&mut self) {
        self.pos += 1;
    }

    fn slice(&self, start: usize, end: usize) -> &str {
        // the grammar only breaks on ASCII delimiters, so these are always
        // char boundaries
        std::str::from_utf8(&self.src[start..end]).unwrap_or("")
    }

    fn eat_item(&mut self) -> Result<NodeId> {
        let c = self.peek().ok_or(Error::ParseEndOfInput)?;

        if is_whitespace(c) {
            return Ok(self.eat_whitespace());
        }

        match c {
            b'\'' => self.eat_quoted_form(),
            b'(' => self.eat_list(),
            b')' => {
                error!("mismatched closing parens");
                Err(Error::ParseMismatchedClose(')'))
            }
            b'[' => self.eat_vector(),
            b']' => {
                error!("mismatched closing square bracket");
                Err(Error::ParseMismatchedClose(']'))
            }
            b'{' => self.eat_alterable(),
            b'}' => {
                error!("mismatched closing curly bracket");
                Err(Error::ParseMismatchedClose('}'))
            }
            b'"' => self.eat_string(),
            b';' => Ok(self.eat_comment()),
            _ => {
                if is_alpha(c) || is_symbol(c) {
                    // a minus directly followed by a digit starts a number
                    let negative_number =
                        c == b'-' && self.peek_at(1).map(is_digit).unwrap_or(false);
                    if !negative_number {
                        let mut len = 0;
                        while self.peek_at(len).map(is_name_char).unwrap_or(false) {
                            len += 1;
                        }
                        if self.peek_at(len) == Some(b':') {
                            return self.eat_label(len);
                        }
                        return self.eat_name(len);
                    }
                }
                if is_digit(c) || c == b'-' || c == b'.' {
                    return self.eat_number();
                }
                error!("unexpected character '{}'", c as char);
                Err(Error::ParseEndOfInput)
            }
        }
    }

    fn eat_list(&mut self) -> Result<NodeId> {
        let node = self.arena.alloc(NodeKind::List, "");
        self.bump(); // (

        loop {
            match self.peek() {
                None => {
                    error!("unterminated list");
                    return Err(Error::ParseEndOfInput);
                }
                Some(b')') => {
                    self.bump();
                    return Ok(node);
                }
                Some(_) => {
                    let child = self.eat_item()?;
                    self.arena.append_child(node, child);
                }
            }
        }
    }

    fn eat_vector(&mut self) -> Result<NodeId> {
        let node = self.arena.alloc(NodeKind::Vector, "");
        self.bump(); // [

        loop {
            match self.peek() {
                None => {
                    error!("unterminated vector");
                    return Err(Error::ParseEndOfInput);
                }
                Some(b']') => {
                    self.bump();
                    return Ok(node);
                }
                Some(_) => {
                    let child = self.eat_item()?;
                    self.arena.append_child(node, child);
                }
            }
        }
    }

    fn eat_alterable(&mut self) -> Result<NodeId> {
        self.bump(); // {

        // whitespace/comments before the altered value are kept as the
        // parameter prefix
        let mut prefix: Option<NodeId> = None;
        let node = loop {
            if self.peek().is_none() {
                error!("unterminated alterable");
                return Err(Error::ParseEndOfInput);
            }
            let c = self.eat_item()?;
            if self.arena.get(c).kind.is_semantic() {
                break c;
            }
            self.arena.append_sibling(&mut prefix, c);
        };

        match self.arena.get(node).kind {
            NodeKind::Int(_)
            | NodeKind::Float(_)
            | NodeKind::Name(_)
            | NodeKind::List
            | NodeKind::Vector => {}
            ref kind => {
                error!("non-mutable node within curly brackets: {}", kind.type_name());
                return Err(Error::ParseNonMutableNode);
            }
        }

        {
            let n = self.arena.get_mut(node);
            n.alterable = true;
            n.parameter_prefix = prefix;
        }

        loop {
            match self.peek() {
                None => {
                    error!("unterminated alterable");
                    return Err(Error::ParseEndOfInput);
                }
                Some(b'}') => {
                    self.bump();
                    return Ok(node);
                }
                Some(_) => {
                    let child = self.eat_item()?;
                    let mut ast = self.arena.get(node).parameter_ast;
                    self.arena.append_sibling(&mut ast, child);
                    self.arena.get_mut(node).parameter_ast = ast;
                }
            }
        }
    }

    // 'x parses as (quote x)
    fn eat_quoted_form(&mut self) -> Result<NodeId> {
        self.bump(); // '

        let node = self.arena.alloc(NodeKind::List, "");

        let iname = self.word_lut.lookup_or_add("quote")?;
        let quote = self.arena.alloc(NodeKind::Name(iname), "quote");
        self.arena.append_child(node, quote);

        let ws = self.arena.alloc(NodeKind::Whitespace, " ");
        self.arena.append_child(node, ws);

        let quoted = self.eat_item()?;
        self.arena.append_child(node, quoted);

        Ok(node)
    }

    // a period anywhere in the lexeme forces float parsing, otherwise the
    // lexeme is an integer; no exponent forms
    fn eat_number(&mut self) -> Result<NodeId> {
        let start = self.pos;

        if self.peek() == Some(b'-') {
            self.bump();
        }
        let mut seen_period = false;
        while let Some(c) = self.peek() {
            if is_digit(c) {
                self.bump();
            } else if c == b'.' && !seen_period {
                seen_period = true;
                self.bump();
            } else {
                break;
            }
        }

        let lexeme = self.slice(start, self.pos).to_string();
        if seen_period {
            let f: f32 = lexeme.parse().map_err(|_| {
                error!("unable to parse float from '{}'", lexeme);
                Error::ParseEndOfInput
            })?;
            Ok(self.arena.alloc(NodeKind::Float(f), &lexeme))
        } else {
            let i: i32 = lexeme.parse().map_err(|_| {
                error!("unable to parse integer from '{}'", lexeme);
                Error::ParseEndOfInput
            })?;
            Ok(self.arena.alloc(NodeKind::Int(i), &lexeme))
        }
    }

    fn eat_name(&mut self, len: usize) -> Result<NodeId> {
        let lexeme = self.slice(self.pos, self.pos + len).to_string();
        self.pos += len;
        let iname = self.word_lut.lookup_or_add(&lexeme)?;
        Ok(self.arena.alloc(NodeKind::Name(iname), &lexeme))
    }

    fn eat_label(&mut self, len: usize) -> Result<NodeId> {
        let lexeme = self.slice(self.pos, self.pos + len).to_string();
        self.pos += len;
        self.bump(); // :
        let iname = self.word_lut.lookup_or_add(&lexeme)?;
        Ok(self.arena.alloc(NodeKind::Label(iname), &lexeme))
    }

    fn eat_string(&mut self) -> Result<NodeId> {
        self.bump(); // opening quote

        let start = self.pos;
        loop {
            match self.peek() {
                None => {
                    error!("unterminated string");
                    return Err(Error::ParseEndOfInput);
                }
                Some(b'"') => break,
                Some(_) => self.bump(),
            }
        }

        let contents = self.slice(start, self.pos).to_string();
        self.bump(); // closing quote

        let iname = self.word_lut.lookup_or_add(&contents)?;
        Ok(self.arena.alloc(NodeKind::String(iname), &contents))
    }

    // runs to the end of the line; the newline itself is left for the
    // following whitespace node
    fn eat_comment(&mut self) -> NodeId {
        let start = self.pos;
        while let Some(c) = self.peek() {
            if c == b'\n' {
                break;
            }
            self.bump();
        }
        let lexeme = self.slice(start, self.pos).to_string();
        self.arena.alloc(NodeKind::Comment, &lexeme)
    }

    fn eat_whitespace(&mut self) -> NodeId {
        let start = self.pos;
        while self.peek().map(is_whitespace).unwrap_or(false) {
            self.bump();
        }
        let lexeme = self.slice(start, self.pos).to_string();
        self.arena.alloc(NodeKind::Whitespace, &lexeme)
    }
}
