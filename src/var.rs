//! The tagged runtime value.
//!
//! Stack slots own their `Var` by value. `Vector` is a handle to a chain of
//! cells in the owning VM's heap; every other variant is self-contained.

use std::fmt;

use num_enum::{IntoPrimitive, TryFromPrimitive};

use crate::cursor::Cursor;
use crate::error::{Error, Result};
use crate::heap::HeapId;

#[derive(Debug, Clone, Copy, PartialEq, Eq, IntoPrimitive, TryFromPrimitive)]
#[repr(i32)]
pub enum ColourFormat {
    Rgb = 0,
    Hsl,
    Hsluv,
    Lab,
    Hsv,
    Xyz,
}

impl ColourFormat {
    pub fn constructor_name(self) -> &'static str {
        match self {
            ColourFormat::Rgb => "col/rgb",
            ColourFormat::Hsl => "col/hsl",
            ColourFormat::Hsluv => "col/hsluv",
            ColourFormat::Lab => "col/lab",
            ColourFormat::Hsv => "col/hsv",
            ColourFormat::Xyz => "col/xyz",
        }
    }
}

/// Four channels plus a format tag; conversions between formats live with
/// the host's colour library.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Colour {
    pub format: ColourFormat,
    pub e: [f32; 4],
}

impl Colour {
    pub fn new(format: ColourFormat, e0: f32, e1: f32, e2: f32, e3: f32) -> Self {
        Colour {
            format,
            e: [e0, e1, e2, e3],
        }
    }

    pub fn rgb(r: f32, g: f32, b: f32, alpha: f32) -> Self {
        Colour::new(ColourFormat::Rgb, r, g, b, alpha)
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Var {
    Int(i32),
    Float(f32),
    Bool(bool),
    /// Raw u64, used to carry PRNG state words through script values.
    Long(u64),
    /// Interned symbol id.
    Name(i32),
    /// Head of a heap cell chain; `None` is the empty vector.
    Vector(Option<HeapId>),
    Colour(Colour),
    /// Inline 2-element float pair, avoiding a heap vector for the common
    /// `[x y]` case.
    V2(f32, f32),
}

impl Default for Var {
    fn default() -> Self {
        Var::Int(0)
    }
}

impl Var {
    pub fn type_name(&self) -> &'static str {
        match self {
            Var::Int(_) => "INT",
            Var::Float(_) => "FLOAT",
            Var::Bool(_) => "BOOLEAN",
            Var::Long(_) => "LONG",
            Var::Name(_) => "NAME",
            Var::Vector(_) => "VECTOR",
            Var::Colour(_) => "COLOUR",
            Var::V2(_, _) => "2D",
        }
    }

    /// Numeric reading used by the arithmetic opcodes; ints coerce to
    /// float.
    pub fn as_f32(&self) -> Result<f32> {
        match self {
            Var::Int(i) => Ok(*i as f32),
            Var::Float(f) => Ok(*f),
            _ => Err(Error::InvalidStackValue("a numeric value")),
        }
    }

    pub fn as_i32(&self) -> Result<i32> {
        match self {
            Var::Int(i) => Ok(*i),
            Var::Float(f) => Ok(*f as i32),
            _ => Err(Error::InvalidStackValue("an integer value")),
        }
    }

    pub fn is_truthy(&self) -> Result<bool> {
        match self {
            Var::Bool(b) => Ok(*b),
            Var::Int(i) => Ok(*i != 0),
            _ => Err(Error::InvalidStackValue("a boolean value")),
        }
    }

    pub fn serialize(&self, cursor: &mut Cursor) -> Result<()> {
        match self {
            Var::Int(i) => cursor.write_fmt(format_args!("INT {}", i)),
            Var::Float(f) => cursor.write_fmt(format_args!("FLOAT {:.4}", f)),
            Var::Bool(b) => cursor.write_fmt(format_args!("BOOLEAN {}", *b as i32)),
            Var::Long(l) => cursor.write_fmt(format_args!("LONG {}", l)),
            Var::Name(n) => cursor.write_fmt(format_args!("NAME {}", n)),
            Var::Vector(_) => {
                log::error!("var serialize: vectors have no text form");
                Err(Error::VectorSerialization)
            }
            Var::Colour(c) => cursor.write_fmt(format_args!(
                "COLOUR {} {:.4} {:.4} {:.4} {:.4}",
                i32::from(c.format),
                c.e[0],
                c.e[1],
                c.e[2],
                c.e[3]
            )),
            Var::V2(a, b) => cursor.write_fmt(format_args!("2D {:.4} {:.4}", a, b)),
        }
    }

    pub fn deserialize(cursor: &mut Cursor) -> Result<Var> {
        cursor.eat_space();
        if cursor.eat_text("INT") {
            Ok(Var::Int(cursor.eat_i32()?))
        } else if cursor.eat_text("FLOAT") {
            Ok(Var::Float(cursor.eat_f32()?))
        } else if cursor.eat_text("BOOLEAN") {
            Ok(Var::Bool(cursor.eat_i32()? != 0))
        } else if cursor.eat_text("LONG") {
            Ok(Var::Long(cursor.eat_u64()?))
        } else if cursor.eat_text("NAME") {
            Ok(Var::Name(cursor.eat_i32()?))
        } else if cursor.eat_text("COLOUR") {
            let format = ColourFormat::try_from(cursor.eat_i32()?)
                .map_err(|_| Error::Deserialization("colour format"))?;
            Ok(Var::Colour(Colour::new(
                format,
                cursor.eat_f32()?,
                cursor.eat_f32()?,
                cursor.eat_f32()?,
                cursor.eat_f32()?,
            )))
        } else if cursor.eat_text("2D") {
            Ok(Var::V2(cursor.eat_f32()?, cursor.eat_f32()?))
        } else if cursor.eat_text("VECTOR") {
            Err(Error::VectorSerialization)
        } else {
            Err(Error::Deserialization("unknown var tag"))
        }
    }
}

impl fmt::Display for Var {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Var::Int(i) => write!(f, "{}", i),
            Var::Float(v) => write!(f, "{:.2}", v),
            Var::Bool(b) => write!(f, "{}", b),
            Var::Long(l) => write!(f, "{}", l),
            Var::Name(n) => write!(f, "name:{}", n),
            Var::Vector(_) => write!(f, "[..]"),
            Var::Colour(c) => write!(
                f,
                "colour:{} ({:.2}, {:.2}, {:.2}, {:.2})",
                i32::from(c.format),
                c.e[0],
                c.e[1],
                c.e[2],
                c.e[3]
            ),
            Var::V2(a, b) => write!(f, "[{:.2} {:.2}]", a, b),
        }
    }
}
