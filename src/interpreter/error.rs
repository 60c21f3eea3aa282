use std::path::PathBuf;

use thiserror::Error;

use crate::parser::Span;

/// What went wrong while evaluating, without the position.
///
/// Value-level operations return this and the evaluator wraps it into a
/// [`SemanticError`] carrying the span of the offending expression.
#[derive(Debug, Error)]
pub enum ErrorKind {
    #[error("type mismatch in {op}: expected {expected}, found {found}")]
    TypeMismatch {
        op: String,
        expected: String,
        found: String,
    },
    #[error("unknown symbol '{0}'")]
    UnknownSymbol(String),
    #[error("symbol '{0}' is already declared")]
    DuplicateSymbol(String),
    #[error("arity mismatch: expected tuples of {expected} elements, found {found}")]
    ArityMismatch { expected: usize, found: usize },
    #[error("'{name}' takes {expected} arguments, {found} given")]
    DefineArity {
        name: String,
        expected: usize,
        found: usize,
    },
    #[error("division by zero")]
    DivisionByZero,
    #[error("{0} over an empty domain")]
    EmptyDomain(&'static str),
    #[error("'{symbol}' has no entry for {index}")]
    UnknownIndex { symbol: String, index: String },
    #[error("undefined arithmetic on infinity: {0}")]
    InfinityArithmetic(String),
    #[error("product of two variable terms is not linear")]
    Nonlinear,
    #[error("define '{0}' refers to itself")]
    RecursiveDefine(String),
    #[error("expected an integer, found {0}")]
    NotInteger(String),
    #[error("{0}")]
    Invalid(String),
    #[error("vif: {0}")]
    Vif(String),
    #[error("vabs: {0}")]
    Vabs(String),
    #[error("read: {0}")]
    Read(String),
    #[error("cannot read '{}': {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("an objective is already set")]
    DuplicateObjective,
}

impl ErrorKind {
    pub(crate) fn mismatch(op: &str, expected: &str, found: &str) -> Self {
        Self::TypeMismatch {
            op: op.to_string(),
            expected: expected.to_string(),
            found: found.to_string(),
        }
    }

    pub(crate) fn at(self, span: &Span) -> SemanticError {
        SemanticError {
            span: span.clone(),
            kind: self,
        }
    }
}

#[derive(Debug, Error)]
#[error("{kind} at {span}")]
pub struct SemanticError {
    pub span: Span,
    #[source]
    pub kind: ErrorKind,
}

pub type EvalResult<T> = Result<T, SemanticError>;
