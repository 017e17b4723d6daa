use std::fmt;

/// Every failure the pipeline can produce. Errors bubble up to the
/// outermost entry point; no partial `Program` or `Genotype` survives one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Error {
    // parser
    ParseEndOfInput,
    ParseMismatchedClose(char),
    ParseNonMutableNode,
    ParseExpectedName,

    WordLutFull,

    // compiler
    ProgramReachedMaxSize,
    AllocationFailure(&'static str),
    ExpectedNameNode,
    ExpectedVectorOrList,
    ExpectedNameOrList,
    UnknownMemorySegment(i32),
    UnableToFindFnInfo,
    UnableToCorrectFnAddr,
    MaxTopLevelFunctions,
    FnCallGivenNonList,
    AddressOfName,
    IfBranchOffsetMismatch,
    UnsupportedDestructure,
    UnknownMappingForName(String),
    LoopMissingExitCondition,

    // genotype
    GenesRemainingAfterAssigning,
    NullGene,
    IncompatibleGene,

    // runtime
    HeapExhausted,
    StackOverflow,
    StackUnderflow,
    DivideByZero,
    InvalidStackValue(&'static str),
    NativeNotRegistered(i32),
    PileLengthMismatch { expected: i32, actual: i32 },
    MatrixStackUnderflow,

    // serialization
    CursorOverflow,
    VectorSerialization,
    Deserialization(&'static str),

    GeneralError(&'static str),
}

pub type Result<T> = std::result::Result<T, Error>;

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::ParseEndOfInput => write!(f, "unexpected end of input"),
            Error::ParseMismatchedClose(c) => write!(f, "mismatched closing '{}'", c),
            Error::ParseNonMutableNode => write!(f, "non-mutable node within curly brackets"),
            Error::ParseExpectedName => write!(f, "expected a name"),
            Error::WordLutFull => write!(f, "word lookup table is full"),
            Error::ProgramReachedMaxSize => write!(f, "program has reached max size"),
            Error::AllocationFailure(what) => write!(f, "allocation failure: {}", what),
            Error::ExpectedNameNode => write!(f, "expected a name node"),
            Error::ExpectedVectorOrList => write!(f, "expected a vector or list node"),
            Error::ExpectedNameOrList => write!(f, "expected a name or list node"),
            Error::UnknownMemorySegment(s) => write!(f, "unknown memory segment: {}", s),
            Error::UnableToFindFnInfo => write!(f, "unable to find function info"),
            Error::UnableToCorrectFnAddr => {
                write!(f, "expected LOAD CONST opcodes before a CALL/CALL_0")
            }
            Error::MaxTopLevelFunctions => write!(f, "too many top-level functions"),
            Error::FnCallGivenNonList => write!(f, "fn-call requires a list to invoke"),
            Error::AddressOfName => write!(f, "address-of requires a function name"),
            Error::IfBranchOffsetMismatch => {
                write!(f, "if branches leave different stack offsets")
            }
            Error::UnsupportedDestructure => {
                write!(f, "destructuring define only supports flat vectors of names")
            }
            Error::UnknownMappingForName(name) => write!(f, "unknown mapping for: {}", name),
            Error::LoopMissingExitCondition => {
                write!(f, "loop requires either a 'to' or 'upto' parameter")
            }
            Error::GenesRemainingAfterAssigning => {
                write!(f, "genes remaining after assigning genotype to ast")
            }
            Error::NullGene => write!(f, "gene stream exhausted"),
            Error::IncompatibleGene => write!(f, "gene type incompatible with altered node"),
            Error::HeapExhausted => write!(f, "out of heap memory"),
            Error::StackOverflow => write!(f, "stack overflow"),
            Error::StackUnderflow => write!(f, "stack underflow"),
            Error::DivideByZero => write!(f, "divide by zero"),
            Error::InvalidStackValue(what) => write!(f, "invalid stack value: expected {}", what),
            Error::NativeNotRegistered(iname) => {
                write!(f, "no native function registered for symbol {}", iname)
            }
            Error::PileLengthMismatch { expected, actual } => {
                write!(f, "pile expected {} elements, vector has {}", expected, actual)
            }
            Error::MatrixStackUnderflow => write!(f, "matrix stack underflow"),
            Error::CursorOverflow => write!(f, "serialization cursor buffer is full"),
            Error::VectorSerialization => write!(f, "vectors cannot be serialized"),
            Error::Deserialization(what) => write!(f, "deserialization failed: {}", what),
            Error::GeneralError(msg) => write!(f, "{}", msg),
        }
    }
}

impl std::error::Error for Error {}
