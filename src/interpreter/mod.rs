//! Executes a parsed program statement by statement, filling the symbol
//! table and assembling the [`Model`].

mod error;
mod eval;
pub mod model;
pub(crate) mod numeric;
pub mod read;
pub mod sets;
pub mod symbols;
pub mod term;
pub mod value;
pub mod vif;

#[cfg(test)]
mod test;

use std::io::Write;
use std::path::PathBuf;
use std::rc::Rc;

use indexmap::IndexMap;
use num_traits::Zero;
use rand::rngs::StdRng;
use rand::SeedableRng;
use regex::Regex;
use tracing::{debug, warn};

pub use error::{ErrorKind, EvalResult, SemanticError};
pub use model::{Constraint, Model, Objective, Relation, SosConstraint, VarClass, VarId, Variable};
pub use read::{FileSource, MemorySource, TableSource};
pub use sets::Set;
pub use symbols::{Define, Family, Scope, Symbol, SymbolTable};
pub use term::Term;
pub use value::{Bound, Elem, Number, Tuple, Value};
pub use vif::{BigM, VifStrategy};

use crate::config::Options;
use crate::parser::{
    self, ConFlags, ConRel, DefineDecl, Expr, ExprKind, IndexSet, Name, ObjectiveDecl, ParamBody,
    ParamDecl, ReadOption, ReadSpec, SetBody, SetDecl, SosBody, SosDecl, Span, Statement, VarDecl,
    VarType,
};
use read::{read_table, ReadOptions, Row, Template};
use vif::{CmpOp, Vif, VifCondition, VifRelation};

/// Attaches a position to value-level errors.
trait Located<T> {
    fn at(self, span: &Span) -> EvalResult<T>;
}

impl<T> Located<T> for Result<T, ErrorKind> {
    fn at(self, span: &Span) -> EvalResult<T> {
        self.map_err(|kind| kind.at(span))
    }
}

/// Whether an iteration over an index set goes on.
enum Flow {
    Continue,
    Stop,
}

pub struct Evaluator {
    symbols: SymbolTable,
    model: Model,
    rng: StdRng,
    source: Box<dyn TableSource>,
    output: Box<dyn Write>,
    vif: Box<dyn VifStrategy>,
    /// Defines currently being expanded, innermost last.
    defines: Vec<String>,
    /// Tuples of the enclosing `forall`s, used to name generated rows.
    name_path: Vec<Tuple>,
    check_failures: usize,
}

impl Evaluator {
    pub fn new(options: &Options) -> Self {
        Self {
            symbols: SymbolTable::new(),
            model: Model::new(),
            rng: StdRng::seed_from_u64(options.seed),
            source: Box::new(FileSource::new(options.base_dir.clone())),
            output: Box::new(std::io::stdout()),
            vif: Box::new(BigM),
            defines: vec![],
            name_path: vec![],
            check_failures: 0,
        }
    }

    pub fn with_table_source(mut self, source: impl TableSource + 'static) -> Self {
        self.source = Box::new(source);
        self
    }

    /// Where `print` writes to, stdout unless changed.
    pub fn with_output(mut self, output: impl Write + 'static) -> Self {
        self.output = Box::new(output);
        self
    }

    pub fn with_vif_strategy(mut self, strategy: impl VifStrategy + 'static) -> Self {
        self.vif = Box::new(strategy);
        self
    }

    pub fn run(&mut self, program: &parser::Program) -> EvalResult<()> {
        for statement in &program.statements {
            self.execute(statement)?;
        }
        Ok(())
    }

    /// Runs one top level statement. Declarations stay in effect for every
    /// later call.
    pub fn execute(&mut self, statement: &Statement) -> EvalResult<()> {
        self.name_path.clear();
        self.defines.clear();
        debug!(statement = statement_kind(statement), "executing");
        self.statement(statement, &Scope::root())
    }

    pub fn model(&self) -> &Model {
        &self.model
    }

    pub fn into_model(self) -> Model {
        self.model
    }

    pub fn symbols(&self) -> &SymbolTable {
        &self.symbols
    }

    /// Number of `check` statements that evaluated to false.
    pub fn check_failures(&self) -> usize {
        self.check_failures
    }

    fn statement(&mut self, statement: &Statement, scope: &Scope<'_>) -> EvalResult<()> {
        match statement {
            Statement::Set(decl) => self.declare_set(decl, scope),
            Statement::Param(decl) => self.declare_param(decl, scope),
            Statement::Var(decl) => self.declare_var(decl, scope),
            Statement::Objective(decl) => self.objective(decl, scope),
            Statement::Subto(decl) => self.constraint(&decl.name.name, &decl.body, scope),
            Statement::Sos(decl) => {
                let priority = match &decl.priority {
                    Some(expr) => self.eval_integer(expr, scope, "priority")?,
                    None => 0,
                };
                self.sos(decl, &decl.body, priority, scope)
            }
            Statement::Define(decl) => self.define(decl),
            Statement::Print(items, span) => self.print(items, scope, span),
            Statement::Check(expr, span) => {
                if !self.eval_bool(expr, scope, "check")? {
                    self.check_failures += 1;
                    warn!(position = %span, "check failed");
                }
                Ok(())
            }
            Statement::Forall(index, body, _) => self.for_each(index, scope, |ev, frame, tuple| {
                ev.name_path.push(tuple.clone());
                let result = ev.statement(body, frame);
                ev.name_path.pop();
                result.map(|()| Flow::Continue)
            }),
        }
    }

    /// Runs `body` once for every tuple of the index set that matches the
    /// pattern and satisfies the `with` condition, in set order.
    fn for_each<F>(&mut self, index: &IndexSet, scope: &Scope<'_>, mut body: F) -> EvalResult<()>
    where
        F: FnMut(&mut Self, &Scope<'_>, &Tuple) -> EvalResult<Flow>,
    {
        let set = self.eval_set(&index.set, scope)?;
        for tuple in set.iter() {
            let mut frame = scope.child();
            if !self.bind_pattern(index, tuple, &mut frame)? {
                continue;
            }
            if let Some(condition) = &index.condition {
                if !self.eval_bool(condition, &frame, "with")? {
                    continue;
                }
            }
            if let Flow::Stop = body(self, &frame, tuple)? {
                break;
            }
        }
        Ok(())
    }

    /// Binds the names of the pattern to the components of `tuple`. Returns
    /// false if a non-name component does not match.
    fn bind_pattern(&mut self, index: &IndexSet, tuple: &Tuple, frame: &mut Scope<'_>) -> EvalResult<bool> {
        let Some(pattern) = &index.pattern else {
            return Ok(true);
        };
        if pattern.len() != tuple.arity() {
            return Err(ErrorKind::ArityMismatch {
                expected: pattern.len(),
                found: tuple.arity(),
            }
            .at(&index.span));
        }
        for (item, elem) in pattern.iter().zip(tuple.elems()) {
            match item.as_name() {
                Some(name) => frame.bind(name, elem.to_value()),
                None => {
                    if &self.eval_elem(item, frame)? != elem {
                        return Ok(false);
                    }
                }
            }
        }
        Ok(true)
    }

    /// Every tuple the index set yields.
    fn domain(&mut self, index: &IndexSet, scope: &Scope<'_>) -> EvalResult<Set> {
        let mut domain = Set::empty();
        self.for_each(index, scope, |_, _, tuple| {
            domain.insert(tuple.clone()).at(&index.span)?;
            Ok(Flow::Continue)
        })?;
        Ok(domain)
    }

    /// `base`, suffixed with the tuples of the enclosing `forall`s.
    fn qualified(&self, base: &str) -> String {
        if self.name_path.is_empty() {
            return base.to_string();
        }
        let suffix: Vec<String> = self.name_path.iter().map(Tuple::name_suffix).collect();
        format!("{base}[{}]", suffix.join(","))
    }

    fn ensure_fresh(&self, name: &Name) -> EvalResult<()> {
        if self.symbols.contains(&name.name) {
            return Err(ErrorKind::DuplicateSymbol(name.name.clone()).at(&name.span));
        }
        Ok(())
    }

    fn declare_set(&mut self, decl: &SetDecl, scope: &Scope<'_>) -> EvalResult<()> {
        let name = &decl.name.name;
        self.ensure_fresh(&decl.name)?;
        let family = match (&decl.index, &decl.body) {
            (None, SetBody::Expr(expr)) => Family::scalar(self.eval_set(expr, scope)?),
            (Some(index), SetBody::Expr(expr)) => {
                let mut domain = Set::empty();
                let mut entries = IndexMap::new();
                self.for_each(index, scope, |ev, frame, tuple| {
                    let set = ev.eval_set(expr, frame)?;
                    domain.insert(tuple.clone()).at(&index.span)?;
                    entries.insert(tuple.clone(), set);
                    Ok(Flow::Continue)
                })?;
                Family::indexed(Some(domain), entries, None)
            }
            (index, SetBody::Entries(list)) => {
                let domain = match index {
                    Some(index) => Some(self.domain(index, scope)?),
                    None => None,
                };
                let mut entries = IndexMap::new();
                for (key, value) in list {
                    let key_tuple = self.eval(key, scope)?.into_tuple("set entry").at(&key.span)?;
                    let set = self.eval_set(value, scope)?;
                    insert_entry(name, domain.as_ref(), &mut entries, key_tuple, set).at(&key.span)?;
                }
                Family::indexed(domain, entries, None)
            }
            (_, SetBody::Subsets { set, size, max_size }) => {
                let base = self.eval_set(set, scope)?;
                let min = self.eval_count(size, scope, "subsets")?;
                let max = match max_size {
                    Some(expr) => self.eval_count(expr, scope, "subsets")?,
                    None => min,
                };
                numbered(base.subsets(min, max).at(&decl.span)?)
            }
            (_, SetBody::Powerset(set)) => numbered(self.eval_set(set, scope)?.powerset().at(&decl.span)?),
        };
        self.symbols.declare(name, Symbol::Set(family)).at(&decl.name.span)
    }

    fn declare_param(&mut self, decl: &ParamDecl, scope: &Scope<'_>) -> EvalResult<()> {
        let name = &decl.name.name;
        self.ensure_fresh(&decl.name)?;
        let default = match &decl.default {
            Some(expr) => Some(self.eval(expr, scope)?),
            None => None,
        };
        let domain = match (&decl.index, &decl.body) {
            (Some(index), body) if !matches!(body, ParamBody::Expr(_)) => Some(self.domain(index, scope)?),
            _ => None,
        };
        let mut entries: IndexMap<Tuple, Value> = IndexMap::new();
        match &decl.body {
            ParamBody::Expr(expr) => match &decl.index {
                None => {
                    entries.insert(Tuple::empty(), self.eval(expr, scope)?);
                }
                Some(index) => {
                    let mut members = Set::empty();
                    self.for_each(index, scope, |ev, frame, tuple| {
                        let value = ev.eval(expr, frame)?;
                        members.insert(tuple.clone()).at(&index.span)?;
                        entries.insert(tuple.clone(), value);
                        Ok(Flow::Continue)
                    })?;
                    let symbol = param_symbol(Some(members), entries, default).at(&decl.span)?;
                    return self.symbols.declare(name, symbol).at(&decl.name.span);
                }
            },
            ParamBody::Entries(list) => {
                for (key, value) in list {
                    let key_tuple = self.eval(key, scope)?.into_tuple("parameter entry").at(&key.span)?;
                    let value = self.eval(value, scope)?;
                    insert_entry(name, domain.as_ref(), &mut entries, key_tuple, value).at(&key.span)?;
                }
            }
            ParamBody::Matrix { columns, rows } => {
                let columns = columns
                    .iter()
                    .map(|column| self.eval_elem(column, scope))
                    .collect::<EvalResult<Vec<_>>>()?;
                for (keys, values) in rows {
                    if values.len() != columns.len() {
                        return Err(ErrorKind::Invalid(format!(
                            "matrix row has {} values for {} columns",
                            values.len(),
                            columns.len()
                        ))
                        .at(&decl.span));
                    }
                    let row = keys
                        .iter()
                        .map(|key| self.eval_elem(key, scope))
                        .collect::<EvalResult<Vec<_>>>()?;
                    for (column, value) in columns.iter().zip(values) {
                        let mut key = row.clone();
                        key.push(column.clone());
                        let span = &value.span;
                        let value = self.eval(value, scope)?;
                        insert_entry(name, domain.as_ref(), &mut entries, Tuple(key), value).at(span)?;
                    }
                }
            }
            ParamBody::Read(spec) => {
                for (key, value) in self.read_rows(spec, scope, true)? {
                    if let Some(value) = value {
                        insert_entry(name, domain.as_ref(), &mut entries, key, value.to_value())
                            .at(&spec.file.span)?;
                    }
                }
            }
            ParamBody::Empty => {}
        }
        let symbol = param_symbol(domain, entries, default).at(&decl.span)?;
        self.symbols.declare(name, symbol).at(&decl.name.span)
    }

    fn declare_var(&mut self, decl: &VarDecl, scope: &Scope<'_>) -> EvalResult<()> {
        self.ensure_fresh(&decl.name)?;
        let family = match &decl.index {
            None => Family::scalar(self.add_variable(decl, &decl.name.name, scope)?),
            Some(index) => {
                let mut domain = Set::empty();
                let mut entries = IndexMap::new();
                self.for_each(index, scope, |ev, frame, tuple| {
                    let name = format!("{}[{}]", decl.name.name, tuple.name_suffix());
                    let id = ev.add_variable(decl, &name, frame)?;
                    domain.insert(tuple.clone()).at(&index.span)?;
                    entries.insert(tuple.clone(), id);
                    Ok(Flow::Continue)
                })?;
                Family::indexed(Some(domain), entries, None)
            }
        };
        self.symbols
            .declare(&decl.name.name, Symbol::Var(family))
            .at(&decl.name.span)
    }

    fn add_variable(&mut self, decl: &VarDecl, name: &str, scope: &Scope<'_>) -> EvalResult<VarId> {
        let lower = self.eval_bound(decl.lower.as_ref(), scope)?;
        let upper = self.eval_bound(decl.upper.as_ref(), scope)?;
        let (class, binary) = match decl.typ {
            VarType::Real => (VarClass::Continuous, false),
            VarType::Integer => (VarClass::Integer, false),
            VarType::Binary => (VarClass::Binary, true),
            VarType::ImplicitInteger => (VarClass::Implicit, false),
            VarType::ImplicitBinary => (VarClass::Implicit, true),
        };
        if binary && (lower.is_some() || upper.is_some()) {
            return Err(ErrorKind::Invalid(format!("binary variable '{name}' cannot have bounds")).at(&decl.span));
        }
        let mut lower = lower.unwrap_or_else(Number::zero);
        let mut upper = upper.unwrap_or(if binary { Number::one() } else { Number::PlusInfinity });
        if class != VarClass::Continuous {
            if let Number::Finite(v) = &lower {
                lower = Number::Finite(v.ceil());
            }
            if let Number::Finite(v) = &upper {
                upper = Number::Finite(v.floor());
            }
        }
        if lower > upper {
            warn!(variable = name, %lower, %upper, "lower bound exceeds upper bound");
        }
        let priority = match &decl.priority {
            Some(expr) => Some(self.eval_integer(expr, scope, "priority")?),
            None => None,
        };
        let startval = match &decl.startval {
            Some(expr) => Some(self.eval_rational(expr, scope, "startval")?),
            None => None,
        };
        Ok(self.model.add_variable(Variable {
            name: name.to_string(),
            class,
            lower,
            upper,
            priority,
            startval,
            objective: Zero::zero(),
        }))
    }

    fn eval_bound(&mut self, expr: Option<&Expr>, scope: &Scope<'_>) -> EvalResult<Option<Bound>> {
        match expr {
            Some(expr) => Ok(Some(self.eval_number(expr, scope, "bound")?)),
            None => Ok(None),
        }
    }

    fn objective(&mut self, decl: &ObjectiveDecl, scope: &Scope<'_>) -> EvalResult<()> {
        let term = self.eval_term(&decl.term, scope, "objective")?;
        self.model
            .set_objective(Objective {
                sense: decl.sense,
                name: decl.name.name.clone(),
                term,
            })
            .at(&decl.span)
    }

    fn constraint(&mut self, base: &str, constraint: &parser::Constraint, scope: &Scope<'_>) -> EvalResult<()> {
        match constraint {
            parser::Constraint::Plain { lhs, rel, rhs, flags } => {
                let term = self.difference(lhs, rhs, scope)?;
                let name = self.qualified(base);
                self.model.add_linear(&name, term, *rel, *flags);
                Ok(())
            }
            parser::Constraint::Range {
                low,
                lower_rel,
                term,
                upper_rel,
                high,
                flags,
            } => {
                if lower_rel != upper_rel || *lower_rel == ConRel::Eq {
                    return Err(ErrorKind::Invalid(
                        "both relations of a range constraint must point the same way".to_string(),
                    )
                    .at(&term.span));
                }
                let mut low = self.eval_number(low, scope, "range constraint")?;
                let mut high = self.eval_number(high, scope, "range constraint")?;
                if *lower_rel == ConRel::Ge {
                    std::mem::swap(&mut low, &mut high);
                }
                let body = self.eval_term(term, scope, "range constraint")?;
                self.range_constraint(base, body, low, high, *flags).at(&term.span)
            }
            parser::Constraint::Vif {
                condition,
                then,
                otherwise,
                flags,
            } => {
                let condition_span = &condition.span;
                let condition = self.vif_condition(condition, scope)?;
                let then = VifRelation {
                    term: self.difference(&then.lhs, &then.rhs, scope)?,
                    rel: then.rel,
                };
                let otherwise = match otherwise {
                    Some(branch) => Some(VifRelation {
                        term: self.difference(&branch.lhs, &branch.rhs, scope)?,
                        rel: branch.rel,
                    }),
                    None => None,
                };
                let vif = Vif {
                    name: self.qualified(base),
                    condition,
                    then,
                    otherwise,
                    flags: *flags,
                };
                self.vif.expand(&mut self.model, vif).at(condition_span)
            }
            parser::Constraint::And(parts) => {
                for part in parts {
                    self.constraint(base, part, scope)?;
                }
                Ok(())
            }
            parser::Constraint::Forall(index, body) => self.for_each(index, scope, |ev, frame, tuple| {
                ev.name_path.push(tuple.clone());
                let result = ev.constraint(base, body, frame);
                ev.name_path.pop();
                result.map(|()| Flow::Continue)
            }),
            parser::Constraint::If {
                condition,
                then,
                otherwise,
            } => {
                if self.eval_bool(condition, scope, "if")? {
                    self.constraint(base, then, scope)
                } else if let Some(otherwise) = otherwise {
                    self.constraint(base, otherwise, scope)
                } else {
                    Ok(())
                }
            }
        }
    }

    /// `lhs - rhs` as a linear term.
    fn difference(&mut self, lhs: &Expr, rhs: &Expr, scope: &Scope<'_>) -> EvalResult<Term> {
        let lhs = self.constraint_side(lhs, scope)?;
        let rhs = self.constraint_side(rhs, scope)?;
        Ok(lhs.sub(&rhs))
    }

    /// One side of a relation. Only range constraints may have an infinite
    /// bound.
    fn constraint_side(&mut self, expr: &Expr, scope: &Scope<'_>) -> EvalResult<Term> {
        match self.eval(expr, scope)? {
            Value::Number(n) if !n.is_finite() => Err(ErrorKind::Invalid(format!(
                "constraint side is infinite ({n}), use a range constraint for a free bound"
            ))
            .at(&expr.span)),
            value => value.into_term("constraint").at(&expr.span),
        }
    }

    /// Adds `low <= term <= high`, either side possibly infinite.
    fn range_constraint(
        &mut self,
        base: &str,
        mut term: Term,
        low: Number,
        high: Number,
        flags: ConFlags,
    ) -> Result<(), ErrorKind> {
        let constant = Number::Finite(term.take_constant());
        let lhs = low.sub(&constant)?;
        let rhs = high.sub(&constant)?;
        let relation = match (&lhs, &rhs) {
            (Number::MinusInfinity, Number::PlusInfinity) => {
                return Err(ErrorKind::Invalid(
                    "range constraint is unbounded on both sides".to_string(),
                ))
            }
            (Number::MinusInfinity, _) => Relation::Rhs,
            (_, Number::PlusInfinity) => Relation::Lhs,
            (l, r) if l == r => Relation::Equal,
            _ => Relation::Range,
        };
        let name = self.qualified(base);
        if lhs > rhs {
            warn!(constraint = %name, %lhs, %rhs, "range constraint is infeasible");
        }
        self.model.add_constraint(Constraint {
            name,
            term,
            relation,
            lhs,
            rhs,
            flags,
        });
        Ok(())
    }

    fn vif_condition(&mut self, expr: &Expr, scope: &Scope<'_>) -> EvalResult<VifCondition> {
        match &expr.kind {
            ExprKind::Binary(op @ (parser::BinOp::And | parser::BinOp::Or | parser::BinOp::Xor), a, b) => {
                let a = Box::new(self.vif_condition(a, scope)?);
                let b = Box::new(self.vif_condition(b, scope)?);
                Ok(match op {
                    parser::BinOp::And => VifCondition::And(a, b),
                    parser::BinOp::Or => VifCondition::Or(a, b),
                    _ => VifCondition::Xor(a, b),
                })
            }
            ExprKind::Unary(parser::UnOp::Not, inner) => {
                Ok(VifCondition::Not(Box::new(self.vif_condition(inner, scope)?)))
            }
            ExprKind::Binary(op, a, b) => {
                let cmp = match op {
                    parser::BinOp::Le => CmpOp::Le,
                    parser::BinOp::Lt => CmpOp::Lt,
                    parser::BinOp::Ge => CmpOp::Ge,
                    parser::BinOp::Gt => CmpOp::Gt,
                    parser::BinOp::Eq => CmpOp::Eq,
                    parser::BinOp::Ne => CmpOp::Ne,
                    _ => return Err(ErrorKind::Vif("condition must be a comparison".to_string()).at(&expr.span)),
                };
                Ok(VifCondition::Atom(self.difference(a, b, scope)?, cmp))
            }
            _ => Err(ErrorKind::Vif("condition must be a comparison".to_string()).at(&expr.span)),
        }
    }

    fn sos(&mut self, decl: &SosDecl, body: &SosBody, priority: i64, scope: &Scope<'_>) -> EvalResult<()> {
        let entries = match body {
            SosBody::Forall(index, inner) => {
                return self.for_each(index, scope, |ev, frame, tuple| {
                    ev.name_path.push(tuple.clone());
                    let result = ev.sos(decl, inner, priority, frame);
                    ev.name_path.pop();
                    result.map(|()| Flow::Continue)
                })
            }
            SosBody::Weighted(items) => {
                let mut entries = vec![];
                for (var, weight) in items {
                    let term = self.eval_term(var, scope, "sos")?;
                    let Some(id) = term.as_single_var() else {
                        return Err(ErrorKind::Invalid("sos entries must be single variables".to_string())
                            .at(&var.span));
                    };
                    entries.push((id, self.eval_rational(weight, scope, "sos weight")?));
                }
                entries
            }
            SosBody::Term(expr) => {
                let term = self.eval_term(expr, scope, "sos")?;
                if !term.constant_part().is_zero() {
                    return Err(ErrorKind::Invalid("sos term must not have a constant".to_string()).at(&expr.span));
                }
                term.coefficients().map(|(id, coef)| (id, coef.clone())).collect()
            }
        };
        let name = self.qualified(&decl.name.name);
        if entries.is_empty() {
            warn!(sos = %name, "sos constraint has no variables");
        }
        self.model.add_sos(SosConstraint {
            name,
            typ: decl.typ,
            priority,
            entries,
        });
        Ok(())
    }

    fn define(&mut self, decl: &DefineDecl) -> EvalResult<()> {
        let mut params: Vec<String> = vec![];
        for param in &decl.params {
            if params.contains(&param.name) {
                return Err(ErrorKind::Invalid(format!("parameter '{}' appears twice", param.name)).at(&param.span));
            }
            params.push(param.name.clone());
        }
        let define = Define {
            kind: decl.kind,
            params,
            body: Rc::new(decl.body.clone()),
        };
        self.symbols
            .declare(&decl.name.name, Symbol::Define(define))
            .at(&decl.name.span)
    }

    fn print(&mut self, items: &[Expr], scope: &Scope<'_>, span: &Span) -> EvalResult<()> {
        let mut line = String::new();
        for item in items {
            line.push_str(&self.render(item, scope)?);
        }
        debug!(output = %line, "print");
        writeln!(self.output, "{line}")
            .map_err(|source| ErrorKind::Io {
                path: PathBuf::from("<output>"),
                source,
            })
            .at(span)
    }

    /// Text `print` shows for one item. A bare indexed variable lists the
    /// names of all its members.
    fn render(&mut self, item: &Expr, scope: &Scope<'_>) -> EvalResult<String> {
        if let Some(name) = item.as_name() {
            if let (None, Some(Symbol::Var(family))) = (scope.lookup(name), self.symbols.get(name)) {
                if !family.is_scalar() {
                    let names: Vec<&str> = family
                        .entries
                        .values()
                        .map(|id| self.model.variable(*id).name.as_str())
                        .collect();
                    return Ok(names.join(" "));
                }
            }
        }
        Ok(match self.eval(item, scope)? {
            Value::Term(term) => self.model.format_term(&term),
            value => value.to_string(),
        })
    }

    /// Loads the rows of a `read` expression. Parameters need a value
    /// column in the template, sets must not have one.
    fn read_rows(&mut self, spec: &ReadSpec, scope: &Scope<'_>, with_value: bool) -> EvalResult<Vec<Row>> {
        let file = self.eval_str(&spec.file, scope, "read")?;
        let text = self.eval_str(&spec.template, scope, "read")?;
        let template = Template::parse(&text).at(&spec.template.span)?;
        match (with_value, template.value.is_some()) {
            (true, false) => {
                return Err(ErrorKind::Read(format!("template \"{text}\" has no value column")).at(&spec.template.span))
            }
            (false, true) => {
                return Err(ErrorKind::Read(format!("template \"{text}\" of a set has a value column"))
                    .at(&spec.template.span))
            }
            _ => {}
        }
        let mut options = ReadOptions::default();
        for option in &spec.options {
            match option {
                ReadOption::Skip(expr) => options.skip = self.eval_count(expr, scope, "skip")?,
                ReadOption::Use(expr) => options.use_lines = Some(self.eval_count(expr, scope, "use")?),
                ReadOption::Comment(expr) => options.comment = self.eval_str(expr, scope, "comment")?,
                ReadOption::Match(expr) => {
                    let pattern = self.eval_str(expr, scope, "match")?;
                    let regex = Regex::new(&pattern)
                        .map_err(|e| ErrorKind::Read(format!("bad pattern \"{pattern}\": {e}")))
                        .at(&expr.span)?;
                    options.pattern = Some(regex);
                }
            }
        }
        let contents = self.source.open(&file).at(&spec.file.span)?;
        let rows = read_table(&file, &contents, &template, &options).at(&spec.file.span)?;
        debug!(file = %file, rows = rows.len(), "read table");
        Ok(rows)
    }
}

fn statement_kind(statement: &Statement) -> &'static str {
    match statement {
        Statement::Set(_) => "set",
        Statement::Param(_) => "param",
        Statement::Var(_) => "var",
        Statement::Objective(_) => "objective",
        Statement::Subto(_) => "subto",
        Statement::Sos(_) => "sos",
        Statement::Define(_) => "define",
        Statement::Print(..) => "print",
        Statement::Check(..) => "check",
        Statement::Forall(..) => "forall",
    }
}

fn insert_entry<T>(
    name: &str,
    domain: Option<&Set>,
    entries: &mut IndexMap<Tuple, T>,
    key: Tuple,
    value: T,
) -> Result<(), ErrorKind> {
    if domain.is_some_and(|domain| !domain.contains(&key)) {
        return Err(ErrorKind::Invalid(format!("{key} is not in the index set of '{name}'")));
    }
    if entries.contains_key(&key) {
        return Err(ErrorKind::Invalid(format!("'{name}' has two entries for {key}")));
    }
    entries.insert(key, value);
    Ok(())
}

/// The sets of `subsets` and `powerset`, indexed `<1>`, `<2>`, ...
fn numbered(sets: Vec<Set>) -> Family<Set> {
    let keys: Vec<Tuple> = (1..=sets.len())
        .map(|i| Tuple(vec![Elem::Numb(numeric::count(i))]))
        .collect();
    let domain = Set::from_elems(keys.iter().flat_map(|k| k.0.clone()));
    Family::indexed(Some(domain), keys.into_iter().zip(sets).collect(), None)
}

/// Numeric or string parameter, depending on what the values are.
fn param_symbol(
    domain: Option<Set>,
    entries: IndexMap<Tuple, Value>,
    default: Option<Value>,
) -> Result<Symbol, ErrorKind> {
    let strings = entries
        .values()
        .chain(default.iter())
        .next()
        .is_some_and(|v| matches!(v, Value::Str(_)));
    if strings {
        let entries = entries
            .into_iter()
            .map(|(key, value)| Ok((key, value.as_str("parameter")?.to_string())))
            .collect::<Result<IndexMap<_, _>, ErrorKind>>()?;
        let default = default
            .map(|v| v.as_str("parameter default").map(str::to_string))
            .transpose()?;
        Ok(Symbol::Strg(Family::indexed(domain, entries, default)))
    } else {
        let entries = entries
            .into_iter()
            .map(|(key, value)| Ok((key, value.as_number("parameter")?.clone())))
            .collect::<Result<IndexMap<_, _>, ErrorKind>>()?;
        let default = default
            .map(|v| v.as_number("parameter default").cloned())
            .transpose()?;
        Ok(Symbol::Numb(Family::indexed(domain, entries, default)))
    }
}
