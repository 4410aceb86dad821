use std::fmt;
use thiserror::Error;

/// A location in template source: byte offset plus 1-based line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Pos {
    pub offset: usize,
    pub line: usize,
}

impl Pos {
    pub fn new(offset: usize, line: usize) -> Self {
        Self { offset, line }
    }
}

impl fmt::Display for Pos {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "line {} (byte {})", self.line, self.offset)
    }
}

#[derive(Error, Debug)]
pub enum Error {
    #[error("Tokenize Error: unterminated '{delim}' at {pos}")]
    Tokenize { delim: String, pos: Pos },
    #[error("Unknown Tag: '{name}' at {pos}")]
    UnknownTag { name: String, pos: Pos },
    #[error("Unmatched Tag: '{name}' at {pos}")]
    UnmatchedTag { name: String, pos: Pos },
    #[error("Unclosed Block: '{name}' opened at {pos}")]
    UnclosedBlock { name: String, pos: Pos },
    #[error("Expression Syntax Error: {message} in '{fragment}' at {pos}")]
    ExpressionSyntax {
        fragment: String,
        message: String,
        pos: Pos,
    },
    #[error("Unknown Filter: '{0}'")]
    UnknownFilter(String),
    #[error("Argument Count Error: filter '{filter}' expects {expected} argument(s), got {got}")]
    ArgumentCount {
        filter: String,
        expected: String,
        got: usize,
    },
    #[error("Argument Type Error: filter '{filter}' parameter {index} cannot accept {value}")]
    ArgumentType {
        filter: String,
        index: usize,
        value: String,
    },
    #[error("Invalid Signature for '{filter}': {message}")]
    Signature { filter: String, message: String },
    #[error("Render Error in '{node}' at {pos}: {source}")]
    Render {
        node: String,
        pos: Pos,
        source: Box<Error>,
    },
    #[error("Serialization Error: {0}")]
    Serialization(String),
    #[error("{0}")]
    Custom(String),
}

pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    /// Builds the error a host filter, tag or block returns for its own failures.
    pub fn custom<T: fmt::Display>(msg: T) -> Self {
        Error::Custom(msg.to_string())
    }

    /// Strips `Render` wrappers down to the failure that started the unwinding.
    pub fn root_cause(&self) -> &Error {
        let mut current = self;
        while let Error::Render { source, .. } = current {
            current = source;
        }
        current
    }

    pub(crate) fn wrap(self, node: &str, pos: Pos) -> Self {
        Error::Render {
            node: node.to_string(),
            pos,
            source: Box::new(self),
        }
    }
}

impl serde::ser::Error for Error {
    fn custom<T: fmt::Display>(msg: T) -> Self {
        Error::Serialization(msg.to_string())
    }
}
