use derivative::Derivative;
use num_rational::BigRational;

use super::locations::Span;
use super::tokenizer::{Token, TokenType as TT};

#[derive(Debug, Clone, PartialEq, Default)]
pub struct Program {
    pub statements: Vec<Statement>,
}

#[derive(Clone, Derivative)]
#[derivative(PartialEq)]
pub struct Name {
    pub name: String,
    #[derivative(PartialEq = "ignore")]
    pub span: Span,
}

impl std::fmt::Debug for Name {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Name(\"{}\")", self.name)
    }
}

impl From<Token> for Name {
    fn from(value: Token) -> Self {
        debug_assert!(matches!(value.typ, TT::NAME | TT::KEYWORD));
        Self {
            name: value.lexeme,
            span: value.span,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Statement {
    Set(SetDecl),
    Param(ParamDecl),
    Var(VarDecl),
    Objective(ObjectiveDecl),
    Subto(SubtoDecl),
    Sos(SosDecl),
    Define(DefineDecl),
    Print(Vec<Expr>, Span),
    Check(Expr, Span),
    /// `do forall <i> in I do ...`, the nested statement runs once per tuple.
    Forall(IndexSet, Box<Statement>, Span),
}

#[derive(Clone, Derivative)]
#[derivative(Debug, PartialEq)]
pub struct SetDecl {
    pub name: Name,
    pub index: Option<IndexSet>,
    pub body: SetBody,
    #[derivative(Debug = "ignore", PartialEq = "ignore")]
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq)]
pub enum SetBody {
    Expr(Expr),
    /// `<1> {1,2}, <2> {3}`
    Entries(Vec<(Expr, Expr)>),
    Subsets {
        set: Expr,
        size: Expr,
        max_size: Option<Expr>,
    },
    Powerset(Expr),
}

#[derive(Clone, Derivative)]
#[derivative(Debug, PartialEq)]
pub struct ParamDecl {
    pub name: Name,
    pub index: Option<IndexSet>,
    pub body: ParamBody,
    pub default: Option<Expr>,
    #[derivative(Debug = "ignore", PartialEq = "ignore")]
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ParamBody {
    Expr(Expr),
    Entries(Vec<(Expr, Expr)>),
    /// `| c1, c2 | |r1| v11, v12 | |r2| v21, v22 |`
    Matrix {
        columns: Vec<Expr>,
        rows: Vec<(Vec<Expr>, Vec<Expr>)>,
    },
    Read(ReadSpec),
    /// Only a `default` was given.
    Empty,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VarType {
    Real,
    Integer,
    Binary,
    ImplicitInteger,
    ImplicitBinary,
}

#[derive(Clone, Derivative)]
#[derivative(Debug, PartialEq)]
pub struct VarDecl {
    pub name: Name,
    pub index: Option<IndexSet>,
    pub typ: VarType,
    pub lower: Option<Expr>,
    pub upper: Option<Expr>,
    pub priority: Option<Expr>,
    pub startval: Option<Expr>,
    #[derivative(Debug = "ignore", PartialEq = "ignore")]
    pub span: Span,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Sense {
    Minimize,
    Maximize,
}

#[derive(Clone, Derivative)]
#[derivative(Debug, PartialEq)]
pub struct ObjectiveDecl {
    pub sense: Sense,
    pub name: Name,
    pub term: Expr,
    #[derivative(Debug = "ignore", PartialEq = "ignore")]
    pub span: Span,
}

#[derive(Clone, Derivative)]
#[derivative(Debug, PartialEq)]
pub struct SubtoDecl {
    pub name: Name,
    pub body: Constraint,
    #[derivative(Debug = "ignore", PartialEq = "ignore")]
    pub span: Span,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConRel {
    Le,
    Ge,
    Eq,
}

/// Attribute bits trailing a constraint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ConFlags(pub u8);

impl ConFlags {
    pub const SCALE: u8 = 1;
    pub const SEPARATE: u8 = 2;
    pub const CHECKONLY: u8 = 4;
    pub const INDICATOR: u8 = 8;

    pub fn has(&self, flag: u8) -> bool {
        self.0 & flag != 0
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Constraint {
    Plain {
        lhs: Expr,
        rel: ConRel,
        rhs: Expr,
        flags: ConFlags,
    },
    /// `low REL term REL high`, both relations point the same way.
    Range {
        low: Expr,
        lower_rel: ConRel,
        term: Expr,
        upper_rel: ConRel,
        high: Expr,
        flags: ConFlags,
    },
    Vif {
        condition: Expr,
        then: VifBranch,
        otherwise: Option<VifBranch>,
        flags: ConFlags,
    },
    And(Vec<Constraint>),
    Forall(IndexSet, Box<Constraint>),
    If {
        condition: Expr,
        then: Box<Constraint>,
        otherwise: Option<Box<Constraint>>,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub struct VifBranch {
    pub lhs: Expr,
    pub rel: ConRel,
    pub rhs: Expr,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SosType {
    One,
    Two,
}

#[derive(Clone, Derivative)]
#[derivative(Debug, PartialEq)]
pub struct SosDecl {
    pub name: Name,
    pub typ: SosType,
    pub priority: Option<Expr>,
    pub body: SosBody,
    #[derivative(Debug = "ignore", PartialEq = "ignore")]
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq)]
pub enum SosBody {
    /// `x[1]:1, x[2]:2`
    Weighted(Vec<(Expr, Expr)>),
    /// A term whose coefficients are the weights.
    Term(Expr),
    Forall(IndexSet, Box<SosBody>),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DefineKind {
    Numb,
    Strg,
    Bool,
    Set,
}

#[derive(Clone, Derivative)]
#[derivative(Debug, PartialEq)]
pub struct DefineDecl {
    pub kind: DefineKind,
    pub name: Name,
    pub params: Vec<Name>,
    pub body: Expr,
    #[derivative(Debug = "ignore", PartialEq = "ignore")]
    pub span: Span,
}

/// `<i, j> in I cross J with i < j`
///
/// A bare name in the pattern binds the matching tuple component, any other
/// expression filters tuples by equality.
#[derive(Clone, Derivative)]
#[derivative(Debug, PartialEq)]
pub struct IndexSet {
    pub pattern: Option<Vec<Expr>>,
    pub set: Box<Expr>,
    pub condition: Option<Box<Expr>>,
    #[derivative(Debug = "ignore", PartialEq = "ignore")]
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ReadSpec {
    pub file: Box<Expr>,
    pub template: Box<Expr>,
    pub options: Vec<ReadOption>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ReadOption {
    Skip(Expr),
    Use(Expr),
    Comment(Expr),
    Match(Expr),
}

#[derive(Clone, Derivative)]
#[derivative(PartialEq)]
pub struct Expr {
    pub kind: ExprKind,
    #[derivative(PartialEq = "ignore")]
    pub span: Span,
}

impl Expr {
    pub(crate) fn new(kind: ExprKind, span: Span) -> Self {
        Self { kind, span }
    }

    /// The name if this is a plain identifier.
    pub fn as_name(&self) -> Option<&str> {
        match &self.kind {
            ExprKind::Name(name) => Some(name),
            _ => None,
        }
    }
}

impl std::fmt::Debug for Expr {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.kind.fmt(f)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinOp {
    Add,
    Sub,
    Mul,
    Div,
    Mod,
    IntDiv,
    Pow,
    Union,
    Inter,
    Without,
    SymDiff,
    Cross,
    And,
    Or,
    Xor,
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
    In,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnOp {
    Neg,
    Not,
    Factorial,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Aggregate {
    Sum,
    Prod,
    Min,
    Max,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RangeKind {
    /// `a .. b` and `a to b`
    Inclusive,
    /// `a until b`
    Exclusive,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Builtin {
    Card,
    Abs,
    Sgn,
    Round,
    Floor,
    Ceil,
    Log,
    Ln,
    Exp,
    Sqrt,
    Sin,
    Cos,
    Tan,
    Asin,
    Acos,
    Atan,
    Length,
    Substr,
    Random,
    Ord,
    Min,
    Max,
    /// Absolute value of a linear term.
    Vabs,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ExprKind {
    Number(BigRational),
    Infinity,
    Str(String),
    Name(String),
    Subscript(String, Vec<Expr>),
    /// Invocation of a `def*` macro.
    Call(String, Vec<Expr>),
    Builtin(Builtin, Vec<Expr>),
    Tuple(Vec<Expr>),
    SetLiteral(Vec<Expr>),
    Range {
        from: Box<Expr>,
        to: Box<Expr>,
        step: Option<Box<Expr>>,
        kind: RangeKind,
    },
    SetBuilder(IndexSet, Option<Box<Expr>>),
    Proj(Box<Expr>, Box<Expr>),
    IndexSetOf(Name),
    Binary(BinOp, Box<Expr>, Box<Expr>),
    Unary(UnOp, Box<Expr>),
    Aggregate(Aggregate, IndexSet, Box<Expr>),
    Exists(IndexSet),
    ArgExtremum {
        maximize: bool,
        count: Option<Box<Expr>>,
        index: IndexSet,
        body: Box<Expr>,
    },
    /// `union <i> in I: S[i]` and `inter <i> in I: S[i]`
    IndexedSetOp(BinOp, IndexSet, Box<Expr>),
    If(Box<Expr>, Box<Expr>, Box<Expr>),
    Read(ReadSpec),
}
