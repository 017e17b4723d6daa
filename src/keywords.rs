//! Keywords and native names with fixed interned ids.
//!
//! Keywords occupy `[KEYWORD_START, KEYWORD_START + MAX_KEYWORDS)` and
//! natives `[NATIVE_START, NATIVE_START + MAX_NATIVES)`. The discriminants
//! below are the actual symbol ids, so registration order in the engine has
//! to follow enum order. Symbol ids travel through nodes, bytecode and the
//! VM as plain `i32`s and come back via `TryFromPrimitive`.

use num_enum::{IntoPrimitive, TryFromPrimitive};

#[derive(Debug, Clone, Copy, PartialEq, Eq, IntoPrimitive, TryFromPrimitive)]
#[repr(i32)]
pub enum Keyword {
    // special forms
    Define = 128,
    Fn,
    If,
    Loop,
    Fence,
    OnMatrixStack,
    FnCall,
    AddressOf,
    Quote,
    VectorAppend,

    // operators
    Plus,
    Minus,
    Mult,
    Divide,
    Mod,
    Equal,
    Lt,
    Gt,
    And,
    Or,
    Not,
    Sqrt,

    // common parameter labels
    From,
    To,
    Upto,
    Inc,
    By,
    Num,
    Min,
    Max,
    Value,
    Seed,
    Steps,
    Angle,
    Copies,
    Alpha,
    R,
    G,
    B,
    H,
    S,
    L,
    V,
    X,
    Y,
    Z,
    A,
    T,
    N,
    Vector,
    Colour,
    Position,
    Width,
    Height,
    Radius,
    Mapping,
    Clamping,

    // easing presets
    Linear,
    Quick,
    SlowIn,
    SlowInOut,

    // named colours bound by the preamble
    White,
    Black,
    Red,
    Green,
    Blue,
    Yellow,
    Magenta,
    Cyan,

    // procedural colour-fn preset names
    Chrome,
    HotlineMiami,
    KnightRider,
    Mars,
    Rainbow,
    Robocop,
    Transformers,

    // preamble globals
    GenInitial,
    CanvasWidth,
    CanvasHeight,
    MathTau,
    ColProceduralFnPresets,
    EasePresets,
}

impl Keyword {
    pub const ALL: &'static [Keyword] = &[
        Keyword::Define,
        Keyword::Fn,
        Keyword::If,
        Keyword::Loop,
        Keyword::Fence,
        Keyword::OnMatrixStack,
        Keyword::FnCall,
        Keyword::AddressOf,
        Keyword::Quote,
        Keyword::VectorAppend,
        Keyword::Plus,
        Keyword::Minus,
        Keyword::Mult,
        Keyword::Divide,
        Keyword::Mod,
        Keyword::Equal,
        Keyword::Lt,
        Keyword::Gt,
        Keyword::And,
        Keyword::Or,
        Keyword::Not,
        Keyword::Sqrt,
        Keyword::From,
        Keyword::To,
        Keyword::Upto,
        Keyword::Inc,
        Keyword::By,
        Keyword::Num,
        Keyword::Min,
        Keyword::Max,
        Keyword::Value,
        Keyword::Seed,
        Keyword::Steps,
        Keyword::Angle,
        Keyword::Copies,
        Keyword::Alpha,
        Keyword::R,
        Keyword::G,
        Keyword::B,
        Keyword::H,
        Keyword::S,
        Keyword::L,
        Keyword::V,
        Keyword::X,
        Keyword::Y,
        Keyword::Z,
        Keyword::A,
        Keyword::T,
        Keyword::N,
        Keyword::Vector,
        Keyword::Colour,
        Keyword::Position,
        Keyword::Width,
        Keyword::Height,
        Keyword::Radius,
        Keyword::Mapping,
        Keyword::Clamping,
        Keyword::Linear,
        Keyword::Quick,
        Keyword::SlowIn,
        Keyword::SlowInOut,
        Keyword::White,
        Keyword::Black,
        Keyword::Red,
        Keyword::Green,
        Keyword::Blue,
        Keyword::Yellow,
        Keyword::Magenta,
        Keyword::Cyan,
        Keyword::Chrome,
        Keyword::HotlineMiami,
        Keyword::KnightRider,
        Keyword::Mars,
        Keyword::Rainbow,
        Keyword::Robocop,
        Keyword::Transformers,
        Keyword::GenInitial,
        Keyword::CanvasWidth,
        Keyword::CanvasHeight,
        Keyword::MathTau,
        Keyword::ColProceduralFnPresets,
        Keyword::EasePresets,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Keyword::Define => "define",
            Keyword::Fn => "fn",
            Keyword::If => "if",
            Keyword::Loop => "loop",
            Keyword::Fence => "fence",
            Keyword::OnMatrixStack => "on-matrix-stack",
            Keyword::FnCall => "fn-call",
            Keyword::AddressOf => "address-of",
            Keyword::Quote => "quote",
            Keyword::VectorAppend => "vector/append",
            Keyword::Plus => "+",
            Keyword::Minus => "-",
            Keyword::Mult => "*",
            Keyword::Divide => "/",
            Keyword::Mod => "mod",
            Keyword::Equal => "=",
            Keyword::Lt => "<",
            Keyword::Gt => ">",
            Keyword::And => "and",
            Keyword::Or => "or",
            Keyword::Not => "not",
            Keyword::Sqrt => "sqrt",
            Keyword::From => "from",
            Keyword::To => "to",
            Keyword::Upto => "upto",
            Keyword::Inc => "inc",
            Keyword::By => "by",
            Keyword::Num => "num",
            Keyword::Min => "min",
            Keyword::Max => "max",
            Keyword::Value => "value",
            Keyword::Seed => "seed",
            Keyword::Steps => "steps",
            Keyword::Angle => "angle",
            Keyword::Copies => "copies",
            Keyword::Alpha => "alpha",
            Keyword::R => "r",
            Keyword::G => "g",
            Keyword::B => "b",
            Keyword::H => "h",
            Keyword::S => "s",
            Keyword::L => "l",
            Keyword::V => "v",
            Keyword::X => "x",
            Keyword::Y => "y",
            Keyword::Z => "z",
            Keyword::A => "a",
            Keyword::T => "t",
            Keyword::N => "n",
            Keyword::Vector => "vector",
            Keyword::Colour => "colour",
            Keyword::Position => "position",
            Keyword::Width => "width",
            Keyword::Height => "height",
            Keyword::Radius => "radius",
            Keyword::Mapping => "mapping",
            Keyword::Clamping => "clamping",
            Keyword::Linear => "linear",
            Keyword::Quick => "quick",
            Keyword::SlowIn => "slow-in",
            Keyword::SlowInOut => "slow-in-out",
            Keyword::White => "white",
            Keyword::Black => "black",
            Keyword::Red => "red",
            Keyword::Green => "green",
            Keyword::Blue => "blue",
            Keyword::Yellow => "yellow",
            Keyword::Magenta => "magenta",
            Keyword::Cyan => "cyan",
            Keyword::Chrome => "chrome",
            Keyword::HotlineMiami => "hotline-miami",
            Keyword::KnightRider => "knight-rider",
            Keyword::Mars => "mars",
            Keyword::Rainbow => "rainbow",
            Keyword::Robocop => "robocop",
            Keyword::Transformers => "transformers",
            Keyword::GenInitial => "gen/initial",
            Keyword::CanvasWidth => "canvas/width",
            Keyword::CanvasHeight => "canvas/height",
            Keyword::MathTau => "math/TAU",
            Keyword::ColProceduralFnPresets => "col/procedural-fn-presets",
            Keyword::EasePresets => "ease/presets",
        }
    }
}

/// Natives shipped with the core. Drawing natives are registered by the
/// host and receive ids after these.
#[derive(Debug, Clone, Copy, PartialEq, Eq, IntoPrimitive, TryFromPrimitive)]
#[repr(i32)]
pub enum Native {
    GenInt = 320,
    GenScalar,
    Gen2d,
    GenSelect,
    GenCol,
    GenStray,
    GenStrayInt,
    GenStray2d,
    GenStray3d,
    GenStray4d,

    // colour constructors, registered contiguously so alterable
    // colour-constructor lists can be detected by id range
    ColRgb,
    ColHsl,
    ColHsluv,
    ColHsv,
    ColLab,
    ColXyz,
}

impl Native {
    pub const ALL: &'static [Native] = &[
        Native::GenInt,
        Native::GenScalar,
        Native::Gen2d,
        Native::GenSelect,
        Native::GenCol,
        Native::GenStray,
        Native::GenStrayInt,
        Native::GenStray2d,
        Native::GenStray3d,
        Native::GenStray4d,
        Native::ColRgb,
        Native::ColHsl,
        Native::ColHsluv,
        Native::ColHsv,
        Native::ColLab,
        Native::ColXyz,
    ];

    pub const COLOUR_CONSTRUCTOR_START: Native = Native::ColRgb;
    pub const COLOUR_CONSTRUCTOR_END: Native = Native::ColXyz;

    pub fn name(self) -> &'static str {
        match self {
            Native::GenInt => "gen/int",
            Native::GenScalar => "gen/scalar",
            Native::Gen2d => "gen/2d",
            Native::GenSelect => "gen/select",
            Native::GenCol => "gen/col",
            Native::GenStray => "gen/stray",
            Native::GenStrayInt => "gen/stray-int",
            Native::GenStray2d => "gen/stray-2d",
            Native::GenStray3d => "gen/stray-3d",
            Native::GenStray4d => "gen/stray-4d",
            Native::ColRgb => "col/rgb",
            Native::ColHsl => "col/hsl",
            Native::ColHsluv => "col/hsluv",
            Native::ColHsv => "col/hsv",
            Native::ColLab => "col/lab",
            Native::ColXyz => "col/xyz",
        }
    }
}

pub fn is_colour_constructor(iname: i32) -> bool {
    let start: i32 = Native::COLOUR_CONSTRUCTOR_START.into();
    let end: i32 = Native::COLOUR_CONSTRUCTOR_END.into();
    iname >= start && iname <= end
}
