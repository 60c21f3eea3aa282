use num_rational::BigRational;
use num_traits::{One, Zero};
use rand::Rng;

use super::numeric::{self, count, float_fn, from_f64, to_f64};
use super::{ErrorKind, EvalResult, Evaluator, Flow, Located, Scope, Set, Symbol, Term, Tuple, Value};
use super::{Elem, Number};
use crate::parser::{Aggregate, BinOp, Builtin, DefineKind, Expr, ExprKind, IndexSet, RangeKind, Span, UnOp};

impl Evaluator {
    pub(super) fn eval(&mut self, expr: &Expr, scope: &Scope<'_>) -> EvalResult<Value> {
        let span = &expr.span;
        match &expr.kind {
            ExprKind::Number(value) => Ok(Value::numb(value.clone())),
            ExprKind::Infinity => Ok(Value::Number(Number::PlusInfinity)),
            ExprKind::Str(s) => Ok(Value::Str(s.clone())),
            ExprKind::Name(name) => match scope.lookup(name) {
                Some(value) => Ok(value.clone()),
                None => self.symbol(name).and_then(|s| s.lookup(name, &Tuple::empty())).at(span),
            },
            ExprKind::Subscript(name, args) => {
                let mut index = vec![];
                for arg in args {
                    index.extend(self.eval(arg, scope)?.into_tuple("subscript").at(&arg.span)?.0);
                }
                self.symbol(name)
                    .and_then(|s| s.lookup(name, &Tuple(index)))
                    .at(span)
            }
            ExprKind::Call(name, args) => self.call(name, args, scope, span),
            ExprKind::Builtin(function, args) => self.builtin(*function, args, scope, span),
            ExprKind::Tuple(items) => {
                let elems = items
                    .iter()
                    .map(|item| self.eval_elem(item, scope))
                    .collect::<EvalResult<Vec<_>>>()?;
                Ok(Value::Tuple(Tuple(elems)))
            }
            ExprKind::SetLiteral(items) => {
                let mut set = Set::empty();
                for item in items {
                    let tuple = self.eval(item, scope)?.into_tuple("set").at(&item.span)?;
                    set.insert(tuple).at(&item.span)?;
                }
                Ok(Value::Set(set))
            }
            ExprKind::Range { from, to, step, kind } => {
                let from = self.eval_rational(from, scope, "range")?;
                let to = self.eval_rational(to, scope, "range")?;
                let step = match step {
                    Some(step) => self.eval_rational(step, scope, "range")?,
                    None => BigRational::one(),
                };
                Set::range(&from, &to, &step, *kind == RangeKind::Inclusive)
                    .map(Value::Set)
                    .at(span)
            }
            ExprKind::SetBuilder(index, body) => {
                let mut set = Set::empty();
                self.for_each(index, scope, |ev, frame, tuple| {
                    let member = match body {
                        Some(body) => ev.eval(body, frame)?.into_tuple("set").at(&body.span)?,
                        None => tuple.clone(),
                    };
                    set.insert(member).at(&index.span)?;
                    Ok(Flow::Continue)
                })?;
                Ok(Value::Set(set))
            }
            ExprKind::Proj(set, positions) => {
                let set = self.eval_set(set, scope)?;
                let positions = self
                    .eval(positions, scope)?
                    .into_tuple("proj")
                    .and_then(|t| {
                        t.elems()
                            .iter()
                            .map(|e| match e {
                                Elem::Numb(v) => numeric::as_usize(v),
                                Elem::Str(_) => Err(ErrorKind::mismatch("proj", "number", "string")),
                            })
                            .collect::<Result<Vec<_>, _>>()
                    })
                    .at(&positions.span)?;
                set.proj(&positions).map(Value::Set).at(span)
            }
            ExprKind::IndexSetOf(name) => self
                .symbol(&name.name)
                .and_then(|s| s.index_set(&name.name))
                .map(Value::Set)
                .at(&name.span),
            ExprKind::Binary(op, lhs, rhs) => self.binary(*op, lhs, rhs, scope, span),
            ExprKind::Unary(op, arg) => {
                let value = self.eval(arg, scope)?;
                let result = match op {
                    UnOp::Neg => value.neg(),
                    UnOp::Not => value.as_bool("not").map(|b| Value::Bool(!b)),
                    UnOp::Factorial => value.as_rational("!").and_then(numeric::factorial).map(Value::numb),
                };
                result.at(span)
            }
            ExprKind::Aggregate(kind, index, body) => self.aggregate(*kind, index, body, scope, span),
            ExprKind::Exists(index) => {
                let mut found = false;
                self.for_each(index, scope, |_, _, _| {
                    found = true;
                    Ok(Flow::Stop)
                })?;
                Ok(Value::Bool(found))
            }
            ExprKind::ArgExtremum {
                maximize,
                count,
                index,
                body,
            } => {
                let op = if *maximize { "argmax" } else { "argmin" };
                let k = match count {
                    Some(count) => self.eval_count(count, scope, op)?,
                    None => 1,
                };
                let mut scored: Vec<(Number, Tuple)> = vec![];
                self.for_each(index, scope, |ev, frame, tuple| {
                    let score = ev.eval(body, frame)?.as_number(op).at(&body.span)?.clone();
                    scored.push((score, tuple.clone()));
                    Ok(Flow::Continue)
                })?;
                // stable, so ties keep iteration order
                if *maximize {
                    scored.sort_by(|a, b| b.0.cmp(&a.0));
                } else {
                    scored.sort_by(|a, b| a.0.cmp(&b.0));
                }
                Set::from_tuples(scored.into_iter().take(k).map(|(_, t)| t))
                    .map(Value::Set)
                    .at(span)
            }
            ExprKind::IndexedSetOp(op, index, body) => {
                let mut result: Option<Set> = None;
                self.for_each(index, scope, |ev, frame, _| {
                    let set = ev.eval_set(body, frame)?;
                    result = Some(match result.take() {
                        None => set,
                        Some(acc) if *op == BinOp::Inter => acc.inter(&set).at(&body.span)?,
                        Some(acc) => acc.union(&set).at(&body.span)?,
                    });
                    Ok(Flow::Continue)
                })?;
                Ok(Value::Set(result.unwrap_or_default()))
            }
            ExprKind::If(condition, then, otherwise) => {
                if self.eval_bool(condition, scope, "if")? {
                    self.eval(then, scope)
                } else {
                    self.eval(otherwise, scope)
                }
            }
            ExprKind::Read(spec) => {
                let rows = self.read_rows(spec, scope, false)?;
                Set::from_tuples(rows.into_iter().map(|(key, _)| key))
                    .map(Value::Set)
                    .at(span)
            }
        }
    }

    fn symbol(&self, name: &str) -> Result<&Symbol, ErrorKind> {
        self.symbols
            .get(name)
            .ok_or_else(|| ErrorKind::UnknownSymbol(name.to_string()))
    }

    fn binary(&mut self, op: BinOp, lhs: &Expr, rhs: &Expr, scope: &Scope<'_>, span: &Span) -> EvalResult<Value> {
        if let BinOp::And | BinOp::Or = op {
            let name = if op == BinOp::And { "and" } else { "or" };
            let left = self.eval_bool(lhs, scope, name)?;
            // `a and b` is decided by a false `a`, `a or b` by a true one
            if left == (op == BinOp::Or) {
                return Ok(Value::Bool(left));
            }
            return self.eval_bool(rhs, scope, name).map(Value::Bool);
        }
        let a = self.eval(lhs, scope)?;
        let b = self.eval(rhs, scope)?;
        let result = match op {
            BinOp::Add => a.add(b),
            BinOp::Sub => a.sub(b),
            BinOp::Mul => a.mul(b),
            BinOp::Div => a.div(b),
            BinOp::Mod => numbers(&a, &b, "mod").and_then(|(x, y)| x.modulo(y)).map(Value::Number),
            BinOp::IntDiv => numbers(&a, &b, "div").and_then(|(x, y)| x.int_div(y)).map(Value::Number),
            BinOp::Pow => match (&a, &b) {
                (Value::Term(_), Value::Number(n)) if *n == Number::one() => Ok(a.clone()),
                (Value::Term(_), _) => Err(ErrorKind::Nonlinear),
                _ => numbers(&a, &b, "^").and_then(|(x, y)| x.pow(y)).map(Value::Number),
            },
            BinOp::Union | BinOp::Inter | BinOp::Without | BinOp::SymDiff | BinOp::Cross => {
                sets(a, b, op).map(Value::Set)
            }
            BinOp::Xor => a
                .as_bool("xor")
                .and_then(|x| Ok(x != b.as_bool("xor")?))
                .map(Value::Bool),
            BinOp::Eq | BinOp::Ne | BinOp::Lt | BinOp::Le | BinOp::Gt | BinOp::Ge => {
                a.compare(op, &b).map(Value::Bool)
            }
            BinOp::In => b
                .as_set("in")
                .and_then(|set| Ok(set.contains(&a.into_tuple("in")?)))
                .map(Value::Bool),
            BinOp::And | BinOp::Or => unreachable!(),
        };
        result.at(span)
    }

    fn aggregate(
        &mut self,
        kind: Aggregate,
        index: &IndexSet,
        body: &Expr,
        scope: &Scope<'_>,
        span: &Span,
    ) -> EvalResult<Value> {
        let mut result = match kind {
            Aggregate::Sum => Some(Value::numb(BigRational::zero())),
            Aggregate::Prod => Some(Value::numb(BigRational::one())),
            Aggregate::Min | Aggregate::Max => None,
        };
        let op = match kind {
            Aggregate::Sum => "sum",
            Aggregate::Prod => "prod",
            Aggregate::Min => "min",
            Aggregate::Max => "max",
        };
        self.for_each(index, scope, |ev, frame, _| {
            let value = ev.eval(body, frame)?;
            let at = &body.span;
            result = Some(match (kind, result.take()) {
                (Aggregate::Sum, Some(acc)) => acc.add(value).at(at)?,
                (Aggregate::Prod, Some(acc)) => acc.mul(value).at(at)?,
                (_, None) => {
                    value.as_number(op).at(at)?;
                    value
                }
                (_, Some(acc)) => {
                    let less = value.as_number(op).at(at)? < acc.as_number(op).at(at)?;
                    if less == (kind == Aggregate::Min) {
                        value
                    } else {
                        acc
                    }
                }
            });
            Ok(Flow::Continue)
        })?;
        result.ok_or(ErrorKind::EmptyDomain(op)).at(span)
    }

    /// Expands a define with its arguments bound on top of the caller's
    /// scope.
    fn call(&mut self, name: &str, args: &[Expr], scope: &Scope<'_>, span: &Span) -> EvalResult<Value> {
        let define = match self.symbol(name).at(span)? {
            Symbol::Define(define) => define.clone(),
            other => return Err(ErrorKind::mismatch(name, "define", other.kind_name()).at(span)),
        };
        if define.params.len() != args.len() {
            return Err(ErrorKind::DefineArity {
                name: name.to_string(),
                expected: define.params.len(),
                found: args.len(),
            }
            .at(span));
        }
        if self.defines.iter().any(|active| active == name) {
            return Err(ErrorKind::RecursiveDefine(name.to_string()).at(span));
        }
        let mut frame = scope.child();
        for (param, arg) in define.params.iter().zip(args) {
            let value = self.eval(arg, scope)?;
            frame.bind(param, value);
        }
        self.defines.push(name.to_string());
        let result = self.eval(&define.body, &frame);
        self.defines.pop();
        let value = result?;
        let (fits, expected) = match define.kind {
            DefineKind::Numb => (matches!(value, Value::Number(_) | Value::Term(_)), "number"),
            DefineKind::Strg => (matches!(value, Value::Str(_)), "string"),
            DefineKind::Bool => (matches!(value, Value::Bool(_)), "boolean"),
            DefineKind::Set => (matches!(value, Value::Set(_)), "set"),
        };
        if !fits {
            return Err(ErrorKind::mismatch(name, expected, value.type_name()).at(span));
        }
        Ok(value)
    }

    fn builtin(&mut self, function: Builtin, args: &[Expr], scope: &Scope<'_>, span: &Span) -> EvalResult<Value> {
        let values = args
            .iter()
            .map(|arg| self.eval(arg, scope))
            .collect::<EvalResult<Vec<_>>>()?;
        let name = format!("{function:?}").to_lowercase();
        let arity = match function {
            Builtin::Substr | Builtin::Ord => 3,
            Builtin::Random => 2,
            Builtin::Min | Builtin::Max => values.len().max(1),
            _ => 1,
        };
        if values.len() != arity {
            return Err(ErrorKind::DefineArity {
                name,
                expected: arity,
                found: values.len(),
            }
            .at(span));
        }
        let op = name.as_str();
        let result = match (function, values.as_slice()) {
            (Builtin::Card, [set]) => set.as_set(op).map(|s| Value::numb(count(s.len()))),
            (Builtin::Abs, [v]) => v.as_number(op).map(|n| Value::Number(n.abs())),
            (Builtin::Sgn, [v]) => v.as_rational(op).map(|n| Value::numb(numeric::sgn(n))),
            (Builtin::Floor, [v]) => v.as_rational(op).map(|n| Value::numb(n.floor())),
            (Builtin::Ceil, [v]) => v.as_rational(op).map(|n| Value::numb(n.ceil())),
            // half away from zero
            (Builtin::Round, [v]) => v.as_rational(op).map(|n| Value::numb(n.round())),
            (Builtin::Log, [v]) => float(v, op, f64::log10),
            (Builtin::Ln, [v]) => float(v, op, f64::ln),
            (Builtin::Exp, [v]) => float(v, op, f64::exp),
            (Builtin::Sqrt, [v]) => float(v, op, f64::sqrt),
            (Builtin::Sin, [v]) => float(v, op, f64::sin),
            (Builtin::Cos, [v]) => float(v, op, f64::cos),
            (Builtin::Tan, [v]) => float(v, op, f64::tan),
            (Builtin::Asin, [v]) => float(v, op, f64::asin),
            (Builtin::Acos, [v]) => float(v, op, f64::acos),
            (Builtin::Atan, [v]) => float(v, op, f64::atan),
            (Builtin::Length, [s]) => s.as_str(op).map(|s| Value::numb(count(s.chars().count()))),
            (Builtin::Substr, [s, start, len]) => substr(s, start, len),
            (Builtin::Random, [low, high]) => self.random(low, high),
            (Builtin::Ord, [set, n, component]) => ord(set, n, component),
            (Builtin::Min | Builtin::Max, values) => extremum(values, function == Builtin::Max),
            (Builtin::Vabs, [Value::Term(term)]) => self.vif.vabs(&mut self.model, term.clone()).map(Value::from_term),
            (Builtin::Vabs, [v]) => v.as_number(op).map(|n| Value::Number(n.abs())),
            _ => unreachable!(),
        };
        result.at(span)
    }

    /// Uniformly distributed in `[low, high)`.
    fn random(&mut self, low: &Value, high: &Value) -> Result<Value, ErrorKind> {
        let low = to_f64(low.as_rational("random")?);
        let high = to_f64(high.as_rational("random")?);
        if low > high {
            return Err(ErrorKind::Invalid(format!("random: {low} is larger than {high}")));
        }
        let sample: f64 = self.rng.gen();
        from_f64(low + sample * (high - low), "random").map(Value::numb)
    }

    pub(super) fn eval_bool(&mut self, expr: &Expr, scope: &Scope<'_>, op: &str) -> EvalResult<bool> {
        self.eval(expr, scope)?.as_bool(op).at(&expr.span)
    }

    pub(super) fn eval_set(&mut self, expr: &Expr, scope: &Scope<'_>) -> EvalResult<Set> {
        self.eval(expr, scope)?.into_set("set").at(&expr.span)
    }

    pub(super) fn eval_term(&mut self, expr: &Expr, scope: &Scope<'_>, op: &str) -> EvalResult<Term> {
        self.eval(expr, scope)?.into_term(op).at(&expr.span)
    }

    pub(super) fn eval_number(&mut self, expr: &Expr, scope: &Scope<'_>, op: &str) -> EvalResult<Number> {
        self.eval(expr, scope)?.as_number(op).cloned().at(&expr.span)
    }

    pub(super) fn eval_rational(&mut self, expr: &Expr, scope: &Scope<'_>, op: &str) -> EvalResult<BigRational> {
        self.eval(expr, scope)?.as_rational(op).cloned().at(&expr.span)
    }

    pub(super) fn eval_integer(&mut self, expr: &Expr, scope: &Scope<'_>, op: &str) -> EvalResult<i64> {
        numeric::as_i64(&self.eval_rational(expr, scope, op)?).at(&expr.span)
    }

    pub(super) fn eval_count(&mut self, expr: &Expr, scope: &Scope<'_>, op: &str) -> EvalResult<usize> {
        numeric::as_usize(&self.eval_rational(expr, scope, op)?).at(&expr.span)
    }

    pub(super) fn eval_str(&mut self, expr: &Expr, scope: &Scope<'_>, op: &str) -> EvalResult<String> {
        self.eval(expr, scope)?.as_str(op).map(str::to_string).at(&expr.span)
    }

    pub(super) fn eval_elem(&mut self, expr: &Expr, scope: &Scope<'_>) -> EvalResult<Elem> {
        self.eval(expr, scope)?.into_elem("tuple").at(&expr.span)
    }
}

fn numbers<'v>(a: &'v Value, b: &'v Value, op: &str) -> Result<(&'v Number, &'v Number), ErrorKind> {
    Ok((a.as_number(op)?, b.as_number(op)?))
}

fn sets(a: Value, b: Value, op: BinOp) -> Result<Set, ErrorKind> {
    let a = a.into_set("set operation")?;
    let b = b.into_set("set operation")?;
    match op {
        BinOp::Union => a.union(&b),
        BinOp::Inter => a.inter(&b),
        BinOp::Without => a.without(&b),
        BinOp::SymDiff => a.symdiff(&b),
        _ => Ok(a.cross(&b)),
    }
}

fn float(value: &Value, op: &str, f: fn(f64) -> f64) -> Result<Value, ErrorKind> {
    float_fn(value.as_rational(op)?, op, f).map(Value::numb)
}

/// `len` characters of `s` starting at the zero-based position `start`.
fn substr(s: &Value, start: &Value, len: &Value) -> Result<Value, ErrorKind> {
    let s = s.as_str("substr")?;
    let start = numeric::as_usize(start.as_rational("substr")?)?;
    let len = numeric::as_usize(len.as_rational("substr")?)?;
    Ok(Value::Str(s.chars().skip(start).take(len).collect()))
}

/// Component `component` of the `n`-th tuple of `set`, both counted from one.
fn ord(set: &Value, n: &Value, component: &Value) -> Result<Value, ErrorKind> {
    let set = set.as_set("ord")?;
    let n = numeric::as_usize(n.as_rational("ord")?)?;
    let component = numeric::as_usize(component.as_rational("ord")?)?;
    let tuple = set
        .nth(n)
        .ok_or_else(|| ErrorKind::Invalid(format!("ord: set has no element {n}")))?;
    component
        .checked_sub(1)
        .and_then(|i| tuple.elems().get(i))
        .map(Elem::to_value)
        .ok_or_else(|| ErrorKind::Invalid(format!("ord: {tuple} has no component {component}")))
}

/// `min`/`max` of a list of numbers, or of the members of a single set.
fn extremum(values: &[Value], maximize: bool) -> Result<Value, ErrorKind> {
    let op = if maximize { "max" } else { "min" };
    let numbers = match values {
        [Value::Set(set)] => set
            .iter()
            .map(|t| match t.elems() {
                [Elem::Numb(v)] => Ok(Number::Finite(v.clone())),
                _ => Err(ErrorKind::mismatch(op, "set of numbers", "set of tuples")),
            })
            .collect::<Result<Vec<_>, _>>()?,
        _ => values
            .iter()
            .map(|v| v.as_number(op).cloned())
            .collect::<Result<Vec<_>, _>>()?,
    };
    let best = if maximize {
        numbers.into_iter().max()
    } else {
        numbers.into_iter().min()
    };
    best.map(Value::Number).ok_or(ErrorKind::EmptyDomain(op))
}
