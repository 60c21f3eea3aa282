use std::fmt;

use indexmap::IndexMap;
use num_rational::BigRational;
use num_traits::Zero;
use tracing::warn;

use super::error::ErrorKind;
use super::term::Term;
use super::value::Number;
use crate::parser::{ConFlags, ConRel, Sense, SosType};

/// Index of a variable in [`Model::variables`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct VarId(pub usize);

impl fmt::Display for VarId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "v{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VarClass {
    Continuous,
    Integer,
    Binary,
    /// Integral in every feasible solution, so the solver may relax it.
    Implicit,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Variable {
    pub name: String,
    pub class: VarClass,
    pub lower: Number,
    pub upper: Number,
    pub priority: Option<i64>,
    pub startval: Option<BigRational>,
    /// Coefficient in the objective.
    pub objective: BigRational,
}

/// Which sides of `lhs <= term <= rhs` are active.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Relation {
    /// `term >= lhs`
    Lhs,
    /// `term <= rhs`
    Rhs,
    /// `term == lhs == rhs`
    Equal,
    /// `lhs <= term <= rhs`
    Range,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Constraint {
    pub name: String,
    /// Only the variable part, the constant has been moved into the bounds.
    pub term: Term,
    pub relation: Relation,
    pub lhs: Number,
    pub rhs: Number,
    pub flags: ConFlags,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SosConstraint {
    pub name: String,
    pub typ: SosType,
    pub priority: i64,
    /// Variables with their weights, in declaration order.
    pub entries: Vec<(VarId, BigRational)>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Objective {
    pub sense: Sense,
    pub name: String,
    pub term: Term,
}

/// The optimization model assembled while a program runs.
#[derive(Debug, Default)]
pub struct Model {
    pub variables: Vec<Variable>,
    pub constraints: Vec<Constraint>,
    pub sos: Vec<SosConstraint>,
    pub objective: Option<Objective>,
    names: IndexMap<String, usize>,
}

impl Model {
    pub fn new() -> Self {
        Self::default()
    }

    /// Hands out `base`, or `base_1`, `base_2`... if it is already taken.
    /// Variables, constraints and SOS share one namespace.
    pub(crate) fn unique_name(&mut self, base: &str) -> String {
        let Some(&taken) = self.names.get(base) else {
            self.names.insert(base.to_string(), 0);
            return base.to_string();
        };
        let mut count = taken;
        loop {
            count += 1;
            let candidate = format!("{base}_{count}");
            if !self.names.contains_key(&candidate) {
                self.names.insert(base.to_string(), count);
                self.names.insert(candidate.clone(), 0);
                return candidate;
            }
        }
    }

    pub(crate) fn add_variable(&mut self, mut variable: Variable) -> VarId {
        variable.name = self.unique_name(&variable.name);
        self.variables.push(variable);
        VarId(self.variables.len() - 1)
    }

    pub(crate) fn add_constraint(&mut self, mut constraint: Constraint) {
        constraint.name = self.unique_name(&constraint.name);
        self.constraints.push(constraint);
    }

    /// Adds `term REL 0`, moving the constant of `term` to the bound side.
    pub(crate) fn add_linear(&mut self, name: &str, mut term: Term, rel: ConRel, flags: ConFlags) {
        let bound = Number::Finite(-term.take_constant());
        if term.is_constant() {
            warn!(constraint = name, "constraint has no variables");
        }
        let (relation, lhs, rhs) = match rel {
            ConRel::Le => (Relation::Rhs, Number::MinusInfinity, bound),
            ConRel::Ge => (Relation::Lhs, bound, Number::PlusInfinity),
            ConRel::Eq => (Relation::Equal, bound.clone(), bound),
        };
        self.add_constraint(Constraint {
            name: name.to_string(),
            term,
            relation,
            lhs,
            rhs,
            flags,
        });
    }

    pub(crate) fn add_sos(&mut self, mut sos: SosConstraint) {
        sos.name = self.unique_name(&sos.name);
        self.sos.push(sos);
    }

    pub(crate) fn set_objective(&mut self, objective: Objective) -> Result<(), ErrorKind> {
        if self.objective.is_some() {
            return Err(ErrorKind::DuplicateObjective);
        }
        for (id, coef) in objective.term.coefficients() {
            self.variables[id.0].objective += coef;
        }
        self.objective = Some(objective);
        Ok(())
    }

    pub fn variable(&self, id: VarId) -> &Variable {
        &self.variables[id.0]
    }

    pub fn variable_by_name(&self, name: &str) -> Option<(VarId, &Variable)> {
        self.variables
            .iter()
            .enumerate()
            .find(|(_, v)| v.name == name)
            .map(|(i, v)| (VarId(i), v))
    }

    pub fn constraint_by_name(&self, name: &str) -> Option<&Constraint> {
        self.constraints.iter().find(|c| c.name == name)
    }

    pub fn sos_by_name(&self, name: &str) -> Option<&SosConstraint> {
        self.sos.iter().find(|s| s.name == name)
    }

    /// Renders a term with variable names instead of ids.
    pub fn format_term(&self, term: &Term) -> String {
        let mut parts: Vec<String> = term
            .coefficients()
            .map(|(id, coef)| format!("{} {}", Number::Finite(coef.clone()), self.variables[id.0].name))
            .collect();
        if !term.constant_part().is_zero() || parts.is_empty() {
            parts.push(Number::Finite(term.constant_part().clone()).to_string());
        }
        parts.join(" + ")
    }
}

impl fmt::Display for Model {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(objective) = &self.objective {
            let sense = match objective.sense {
                Sense::Minimize => "minimize",
                Sense::Maximize => "maximize",
            };
            writeln!(f, "{sense} {}: {}", objective.name, self.format_term(&objective.term))?;
        }
        writeln!(f, "variables: {}", self.variables.len())?;
        for v in self.variables.iter() {
            writeln!(f, "  {} {:?} [{}, {}]", v.name, v.class, v.lower, v.upper)?;
        }
        writeln!(f, "constraints: {}", self.constraints.len())?;
        for c in self.constraints.iter() {
            let term = self.format_term(&c.term);
            match c.relation {
                Relation::Lhs => writeln!(f, "  {}: {} >= {}", c.name, term, c.lhs)?,
                Relation::Rhs => writeln!(f, "  {}: {} <= {}", c.name, term, c.rhs)?,
                Relation::Equal => writeln!(f, "  {}: {} == {}", c.name, term, c.rhs)?,
                Relation::Range => writeln!(f, "  {}: {} <= {} <= {}", c.name, c.lhs, term, c.rhs)?,
            }
        }
        write!(f, "sos: {}", self.sos.len())
    }
}
