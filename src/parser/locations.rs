use super::ast::*;
use super::tokenizer::Token;

#[derive(Clone, Default, Debug, PartialEq, Eq)]
pub struct Location {
    pub line: usize,
    pub column: usize,
}

impl std::fmt::Display for Location {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "line {}, column {}", self.line, self.column)
    }
}

pub trait Locatable {
    fn span(&self) -> Span;
}

#[derive(Clone, Default, Debug, PartialEq, Eq)]
pub enum Span {
    #[default]
    Indetermined,
    Determined(_Span),
}

#[derive(Clone, Default, Debug, PartialEq, Eq)]
pub struct _Span {
    pub start: Location,
    pub end: Location,
}

impl Span {
    pub(crate) fn new(start_line: usize, start_col: usize, end_line: usize, end_col: usize) -> Self {
        Self::Determined(_Span {
            start: Location {
                line: start_line,
                column: start_col,
            },
            end: Location {
                line: end_line,
                column: end_col,
            },
        })
    }

    pub fn start(&self) -> Option<&Location> {
        match self {
            Self::Determined(s) => Some(&s.start),
            Self::Indetermined => None,
        }
    }

    /// Span covering everything from the start of `self` to the end of `other`.
    pub(crate) fn till<R: Locatable>(&self, other: &R) -> Self {
        match (self, other.span()) {
            (Self::Indetermined, Self::Indetermined) => Self::Indetermined,
            (Self::Indetermined, Self::Determined(t)) => Self::Determined(t),
            (Self::Determined(s), Self::Indetermined) => Self::Determined(s.clone()),
            (Self::Determined(s), Self::Determined(t)) => Self::Determined(_Span {
                start: s.start.clone(),
                end: t.end,
            }),
        }
    }
}

impl std::fmt::Display for Span {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Indetermined => write!(f, "unknown position"),
            Self::Determined(s) => write!(f, "{}", s.start),
        }
    }
}

impl<R> Locatable for Vec<R>
where
    R: Locatable,
{
    fn span(&self) -> Span {
        match (self.first(), self.last()) {
            (Some(first), Some(last)) => first.span().till(last),
            _ => Span::Indetermined,
        }
    }
}

impl<R> Locatable for Box<R>
where
    R: Locatable,
{
    fn span(&self) -> Span {
        (**self).span()
    }
}

impl Locatable for Span {
    fn span(&self) -> Span {
        self.clone()
    }
}

impl Locatable for Token {
    fn span(&self) -> Span {
        self.span.clone()
    }
}

impl Locatable for Name {
    fn span(&self) -> Span {
        self.span.clone()
    }
}

impl Locatable for Expr {
    fn span(&self) -> Span {
        self.span.clone()
    }
}

impl Locatable for IndexSet {
    fn span(&self) -> Span {
        self.span.clone()
    }
}

impl Locatable for Statement {
    fn span(&self) -> Span {
        match self {
            Self::Set(decl) => decl.span.clone(),
            Self::Param(decl) => decl.span.clone(),
            Self::Var(decl) => decl.span.clone(),
            Self::Objective(decl) => decl.span.clone(),
            Self::Subto(decl) => decl.span.clone(),
            Self::Sos(decl) => decl.span.clone(),
            Self::Define(decl) => decl.span.clone(),
            Self::Print(_, span) | Self::Check(_, span) | Self::Forall(_, _, span) => span.clone(),
        }
    }
}
