use std::cmp::Ordering;
use std::fmt;

use num_rational::BigRational;
use num_traits::{One, Signed, Zero};

use super::error::ErrorKind;
use super::numeric::{self, format_rational};
use super::sets::Set;
use super::term::Term;
use crate::parser::BinOp;

/// An exact rational extended by the two infinities.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Number {
    MinusInfinity,
    Finite(BigRational),
    PlusInfinity,
}

/// Variable and constraint bounds use the same representation.
pub type Bound = Number;

impl Number {
    pub fn zero() -> Self {
        Self::Finite(BigRational::zero())
    }

    pub fn one() -> Self {
        Self::Finite(BigRational::one())
    }

    pub fn from_i64(value: i64) -> Self {
        Self::Finite(numeric::integer(value))
    }

    pub fn is_finite(&self) -> bool {
        matches!(self, Self::Finite(_))
    }

    pub fn finite(&self, op: &str) -> Result<&BigRational, ErrorKind> {
        match self {
            Self::Finite(value) => Ok(value),
            _ => Err(ErrorKind::InfinityArithmetic(op.to_string())),
        }
    }

    fn infinity(positive: bool) -> Self {
        if positive {
            Self::PlusInfinity
        } else {
            Self::MinusInfinity
        }
    }

    fn signum(&self) -> i8 {
        match self {
            Self::MinusInfinity => -1,
            Self::PlusInfinity => 1,
            Self::Finite(v) if v.is_zero() => 0,
            Self::Finite(v) if v.is_negative() => -1,
            Self::Finite(_) => 1,
        }
    }

    pub fn neg(&self) -> Number {
        match self {
            Self::MinusInfinity => Self::PlusInfinity,
            Self::PlusInfinity => Self::MinusInfinity,
            Self::Finite(v) => Self::Finite(-v),
        }
    }

    pub fn add(&self, rhs: &Number) -> Result<Number, ErrorKind> {
        match (self, rhs) {
            (Self::Finite(a), Self::Finite(b)) => Ok(Self::Finite(a + b)),
            (Self::PlusInfinity, Self::MinusInfinity) | (Self::MinusInfinity, Self::PlusInfinity) => {
                Err(ErrorKind::InfinityArithmetic("infinity - infinity".to_string()))
            }
            (Self::Finite(_), inf) | (inf, _) => Ok(inf.clone()),
        }
    }

    pub fn sub(&self, rhs: &Number) -> Result<Number, ErrorKind> {
        self.add(&rhs.neg())
    }

    pub fn mul(&self, rhs: &Number) -> Result<Number, ErrorKind> {
        match (self, rhs) {
            (Self::Finite(a), Self::Finite(b)) => Ok(Self::Finite(a * b)),
            _ => match self.signum() * rhs.signum() {
                0 => Err(ErrorKind::InfinityArithmetic("infinity * 0".to_string())),
                s => Ok(Self::infinity(s > 0)),
            },
        }
    }

    pub fn div(&self, rhs: &Number) -> Result<Number, ErrorKind> {
        match (self, rhs) {
            (_, Self::Finite(b)) if b.is_zero() => Err(ErrorKind::DivisionByZero),
            (Self::Finite(a), Self::Finite(b)) => Ok(Self::Finite(a / b)),
            (Self::Finite(_), _) => Ok(Self::zero()),
            (_, Self::Finite(_)) => Ok(Self::infinity(self.signum() * rhs.signum() > 0)),
            _ => Err(ErrorKind::InfinityArithmetic("infinity / infinity".to_string())),
        }
    }

    pub fn modulo(&self, rhs: &Number) -> Result<Number, ErrorKind> {
        numeric::modulo(self.finite("mod")?, rhs.finite("mod")?).map(Self::Finite)
    }

    pub fn int_div(&self, rhs: &Number) -> Result<Number, ErrorKind> {
        numeric::int_div(self.finite("div")?, rhs.finite("div")?).map(Self::Finite)
    }

    pub fn pow(&self, rhs: &Number) -> Result<Number, ErrorKind> {
        numeric::pow(self.finite("^")?, rhs.finite("^")?).map(Self::Finite)
    }

    pub fn abs(&self) -> Number {
        match self {
            Self::Finite(v) => Self::Finite(v.abs()),
            _ => Self::PlusInfinity,
        }
    }
}

impl fmt::Display for Number {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MinusInfinity => write!(f, "-infinity"),
            Self::PlusInfinity => write!(f, "infinity"),
            Self::Finite(v) => write!(f, "{}", format_rational(v)),
        }
    }
}

/// One component of a tuple.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Elem {
    Numb(BigRational),
    Str(String),
}

impl Elem {
    pub fn to_value(&self) -> Value {
        match self {
            Self::Numb(v) => Value::Number(Number::Finite(v.clone())),
            Self::Str(s) => Value::Str(s.clone()),
        }
    }

    pub(crate) fn type_name(&self) -> &'static str {
        match self {
            Self::Numb(_) => "number",
            Self::Str(_) => "string",
        }
    }

    /// The element the way it shows up inside generated names.
    pub fn bare(&self) -> String {
        match self {
            Self::Numb(v) => format_rational(v),
            Self::Str(s) => s.clone(),
        }
    }
}

impl fmt::Display for Elem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Numb(v) => write!(f, "{}", format_rational(v)),
            Self::Str(s) => write!(f, "\"{s}\""),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Tuple(pub Vec<Elem>);

impl Tuple {
    pub fn empty() -> Self {
        Self(vec![])
    }

    pub fn arity(&self) -> usize {
        self.0.len()
    }

    pub fn elems(&self) -> &[Elem] {
        &self.0
    }

    pub fn concat(&self, other: &Tuple) -> Tuple {
        Tuple(self.0.iter().chain(other.0.iter()).cloned().collect())
    }

    /// `1,"a"` rendered as `1,a`, used for `c[1,a]`.
    pub fn name_suffix(&self) -> String {
        self.0.iter().map(Elem::bare).collect::<Vec<_>>().join(",")
    }

    /// Element types must agree position by position.
    pub fn same_types(&self, other: &Tuple) -> bool {
        self.0.len() == other.0.len()
            && self
                .0
                .iter()
                .zip(other.0.iter())
                .all(|(a, b)| a.type_name() == b.type_name())
    }
}

impl From<Vec<Elem>> for Tuple {
    fn from(elems: Vec<Elem>) -> Self {
        Self(elems)
    }
}

impl fmt::Display for Tuple {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let items: Vec<String> = self.0.iter().map(|e| e.to_string()).collect();
        write!(f, "<{}>", items.join(","))
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Number(Number),
    Str(String),
    Bool(bool),
    Tuple(Tuple),
    Set(Set),
    Term(Term),
}

impl Value {
    pub fn numb(value: BigRational) -> Self {
        Self::Number(Number::Finite(value))
    }

    pub fn type_name(&self) -> &'static str {
        match self {
            Self::Number(_) => "number",
            Self::Str(_) => "string",
            Self::Bool(_) => "boolean",
            Self::Tuple(_) => "tuple",
            Self::Set(_) => "set",
            Self::Term(_) => "term",
        }
    }

    /// Terms without variables collapse back into plain numbers.
    pub fn from_term(term: Term) -> Self {
        if term.is_constant() {
            Self::numb(term.constant_part().clone())
        } else {
            Self::Term(term)
        }
    }

    pub fn as_number(&self, op: &str) -> Result<&Number, ErrorKind> {
        match self {
            Self::Number(n) => Ok(n),
            other => Err(ErrorKind::mismatch(op, "number", other.type_name())),
        }
    }

    pub fn as_rational(&self, op: &str) -> Result<&BigRational, ErrorKind> {
        self.as_number(op)?.finite(op)
    }

    pub fn as_str(&self, op: &str) -> Result<&str, ErrorKind> {
        match self {
            Self::Str(s) => Ok(s),
            other => Err(ErrorKind::mismatch(op, "string", other.type_name())),
        }
    }

    pub fn as_bool(&self, op: &str) -> Result<bool, ErrorKind> {
        match self {
            Self::Bool(b) => Ok(*b),
            other => Err(ErrorKind::mismatch(op, "boolean", other.type_name())),
        }
    }

    pub fn as_set(&self, op: &str) -> Result<&Set, ErrorKind> {
        match self {
            Self::Set(s) => Ok(s),
            other => Err(ErrorKind::mismatch(op, "set", other.type_name())),
        }
    }

    pub fn into_set(self, op: &str) -> Result<Set, ErrorKind> {
        match self {
            Self::Set(s) => Ok(s),
            other => Err(ErrorKind::mismatch(op, "set", other.type_name())),
        }
    }

    /// Numbers and terms both take part in linear expressions.
    pub fn into_term(self, op: &str) -> Result<Term, ErrorKind> {
        match self {
            Self::Term(t) => Ok(t),
            Self::Number(n) => Ok(Term::constant(n.finite(op)?.clone())),
            other => Err(ErrorKind::mismatch(op, "term", other.type_name())),
        }
    }

    pub fn into_elem(self, op: &str) -> Result<Elem, ErrorKind> {
        match self {
            Self::Number(n) => Ok(Elem::Numb(n.finite(op)?.clone())),
            Self::Str(s) => Ok(Elem::Str(s)),
            other => Err(ErrorKind::mismatch(op, "number or string", other.type_name())),
        }
    }

    /// A tuple value as is, a single element as a one-tuple.
    pub fn into_tuple(self, op: &str) -> Result<Tuple, ErrorKind> {
        match self {
            Self::Tuple(t) => Ok(t),
            other => Ok(Tuple(vec![other.into_elem(op)?])),
        }
    }

    pub fn add(self, rhs: Value) -> Result<Value, ErrorKind> {
        match (self, rhs) {
            (Self::Number(a), Self::Number(b)) => Ok(Self::Number(a.add(&b)?)),
            (Self::Str(a), Self::Str(b)) => Ok(Self::Str(a + &b)),
            (Self::Set(a), Self::Set(b)) => Ok(Self::Set(a.union(&b)?)),
            (a @ (Self::Term(_) | Self::Number(_)), b @ (Self::Term(_) | Self::Number(_))) => {
                Ok(Self::from_term(a.into_term("+")?.add(&b.into_term("+")?)))
            }
            (a, b) => Err(mismatch("+", &a, &b)),
        }
    }

    pub fn sub(self, rhs: Value) -> Result<Value, ErrorKind> {
        match (self, rhs) {
            (Self::Number(a), Self::Number(b)) => Ok(Self::Number(a.sub(&b)?)),
            (Self::Set(a), Self::Set(b)) => Ok(Self::Set(a.without(&b)?)),
            (a @ (Self::Term(_) | Self::Number(_)), b @ (Self::Term(_) | Self::Number(_))) => {
                Ok(Self::from_term(a.into_term("-")?.sub(&b.into_term("-")?)))
            }
            (a, b) => Err(mismatch("-", &a, &b)),
        }
    }

    pub fn mul(self, rhs: Value) -> Result<Value, ErrorKind> {
        match (self, rhs) {
            (Self::Number(a), Self::Number(b)) => Ok(Self::Number(a.mul(&b)?)),
            (Self::Set(a), Self::Set(b)) => Ok(Self::Set(a.cross(&b))),
            (a @ (Self::Term(_) | Self::Number(_)), b @ (Self::Term(_) | Self::Number(_))) => {
                Ok(Self::from_term(a.into_term("*")?.mul(&b.into_term("*")?)?))
            }
            (a, b) => Err(mismatch("*", &a, &b)),
        }
    }

    pub fn div(self, rhs: Value) -> Result<Value, ErrorKind> {
        match (self, rhs) {
            (Self::Number(a), Self::Number(b)) => Ok(Self::Number(a.div(&b)?)),
            (Self::Term(a), Self::Number(b)) => Ok(Self::from_term(a.div(b.finite("/")?)?)),
            (Self::Term(_), Self::Term(_)) | (Self::Number(_), Self::Term(_)) => Err(ErrorKind::Nonlinear),
            (a, b) => Err(mismatch("/", &a, &b)),
        }
    }

    pub fn neg(self) -> Result<Value, ErrorKind> {
        match self {
            Self::Number(n) => Ok(Self::Number(n.neg())),
            Self::Term(t) => Ok(Self::Term(t.scale(&-BigRational::one()))),
            other => Err(ErrorKind::mismatch("unary -", "number", other.type_name())),
        }
    }

    /// Evaluates `==`, `!=`, `<`, `<=`, `>`, `>=` between two values.
    ///
    /// Sets order by inclusion, strings lexicographically.
    pub fn compare(&self, op: BinOp, rhs: &Value) -> Result<bool, ErrorKind> {
        let symbol = compare_symbol(op);
        match (self, rhs) {
            (Self::Set(a), Self::Set(b)) => Ok(match op {
                BinOp::Eq => a == b,
                BinOp::Ne => a != b,
                BinOp::Le => a.is_subset(b),
                BinOp::Lt => a.is_subset(b) && a.len() < b.len(),
                BinOp::Ge => b.is_subset(a),
                BinOp::Gt => b.is_subset(a) && b.len() < a.len(),
                _ => return Err(mismatch(symbol, self, rhs)),
            }),
            (Self::Number(a), Self::Number(b)) => Ok(ordering_holds(op, a.cmp(b))),
            (Self::Str(a), Self::Str(b)) => Ok(ordering_holds(op, a.cmp(b))),
            (Self::Bool(a), Self::Bool(b)) if matches!(op, BinOp::Eq | BinOp::Ne) => {
                Ok(ordering_holds(op, a.cmp(b)))
            }
            (Self::Tuple(a), Self::Tuple(b)) if matches!(op, BinOp::Eq | BinOp::Ne) => {
                Ok(ordering_holds(op, a.cmp(b)))
            }
            (Self::Term(_), _) | (_, Self::Term(_)) => Err(ErrorKind::Invalid(format!(
                "cannot compare a term with {symbol} outside of a constraint"
            ))),
            _ => Err(mismatch(symbol, self, rhs)),
        }
    }
}

fn compare_symbol(op: BinOp) -> &'static str {
    match op {
        BinOp::Eq => "==",
        BinOp::Ne => "!=",
        BinOp::Lt => "<",
        BinOp::Le => "<=",
        BinOp::Gt => ">",
        BinOp::Ge => ">=",
        _ => "comparison",
    }
}

fn ordering_holds(op: BinOp, ordering: Ordering) -> bool {
    match op {
        BinOp::Eq => ordering == Ordering::Equal,
        BinOp::Ne => ordering != Ordering::Equal,
        BinOp::Lt => ordering == Ordering::Less,
        BinOp::Le => ordering != Ordering::Greater,
        BinOp::Gt => ordering == Ordering::Greater,
        BinOp::Ge => ordering != Ordering::Less,
        _ => false,
    }
}

fn mismatch(op: &str, lhs: &Value, rhs: &Value) -> ErrorKind {
    ErrorKind::mismatch(op, lhs.type_name(), rhs.type_name())
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Number(n) => write!(f, "{n}"),
            Self::Str(s) => write!(f, "{s}"),
            Self::Bool(b) => write!(f, "{}", if *b { "true" } else { "false" }),
            Self::Tuple(t) => write!(f, "{t}"),
            Self::Set(s) => write!(f, "{s}"),
            Self::Term(t) => write!(f, "{t}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::interpreter::numeric::integer;

    fn num(v: i64) -> Value {
        Value::numb(integer(v))
    }

    #[test]
    fn test_infinity_arithmetic() {
        let inf = Number::PlusInfinity;
        assert_eq!(inf.add(&Number::from_i64(3)).unwrap(), Number::PlusInfinity);
        assert!(matches!(
            inf.add(&Number::MinusInfinity),
            Err(ErrorKind::InfinityArithmetic(_))
        ));
        assert!(inf.mul(&Number::zero()).is_err());
        assert_eq!(inf.mul(&Number::from_i64(-2)).unwrap(), Number::MinusInfinity);
        assert_eq!(Number::from_i64(5).div(&inf).unwrap(), Number::zero());
        assert!(inf.modulo(&Number::from_i64(2)).is_err());
        assert!(Number::MinusInfinity < Number::from_i64(-1000));
        assert!(Number::from_i64(1000) < Number::PlusInfinity);
    }

    #[test]
    fn test_value_arithmetic() {
        assert_eq!(num(2).add(num(3)).unwrap(), num(5));
        assert_eq!(
            Value::Str("ab".into()).add(Value::Str("c".into())).unwrap(),
            Value::Str("abc".into())
        );
        assert!(matches!(
            num(1).add(Value::Str("a".into())),
            Err(ErrorKind::TypeMismatch { .. })
        ));
        assert!(matches!(num(1).div(num(0)), Err(ErrorKind::DivisionByZero)));
    }

    #[test]
    fn test_comparisons() {
        assert!(num(1).compare(BinOp::Lt, &num(2)).unwrap());
        assert!(num(2).compare(BinOp::Ge, &num(2)).unwrap());
        assert!(Value::Str("a".into())
            .compare(BinOp::Lt, &Value::Str("b".into()))
            .unwrap());
        assert!(num(1).compare(BinOp::Eq, &Value::Str("1".into())).is_err());
    }

    #[test]
    fn test_tuple_display() {
        let t = Tuple(vec![Elem::Numb(integer(1)), Elem::Str("a".into())]);
        assert_eq!(t.to_string(), "<1,\"a\">");
        assert_eq!(t.name_suffix(), "1,a");
    }
}
