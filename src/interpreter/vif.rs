//! Turning `vif ... then ... else ... end` and `vabs(...)` into plain linear
//! constraints.

use num_rational::BigRational;
use num_traits::{One, Signed, Zero};

use super::error::ErrorKind;
use super::model::{Model, VarClass, Variable};
use super::term::Term;
use super::value::Number;
use crate::parser::{ConFlags, ConRel};

/// Comparison of a term against zero inside a `vif` condition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CmpOp {
    Le,
    Lt,
    Ge,
    Gt,
    Eq,
    Ne,
}

#[derive(Debug, Clone, PartialEq)]
pub enum VifCondition {
    /// `term OP 0`
    Atom(Term, CmpOp),
    And(Box<VifCondition>, Box<VifCondition>),
    Or(Box<VifCondition>, Box<VifCondition>),
    Xor(Box<VifCondition>, Box<VifCondition>),
    Not(Box<VifCondition>),
}

/// `term REL 0`
#[derive(Debug, Clone, PartialEq)]
pub struct VifRelation {
    pub term: Term,
    pub rel: ConRel,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Vif {
    pub name: String,
    pub condition: VifCondition,
    pub then: VifRelation,
    pub otherwise: Option<VifRelation>,
    pub flags: ConFlags,
}

/// Decides how the non-linear constructs of a program, conditional
/// constraints and absolute values of terms, end up in the model.
pub trait VifStrategy {
    fn expand(&mut self, model: &mut Model, vif: Vif) -> Result<(), ErrorKind>;

    /// A linear term equal to `|term|` in every feasible solution.
    fn vabs(&mut self, model: &mut Model, term: Term) -> Result<Term, ErrorKind>;
}

/// Big-M reformulation: every condition gets a binary indicator, and each
/// branch is relaxed by the bounds of its term when it is not selected.
/// `vabs` gets a binary sign indicator and a bounded helper variable.
///
/// Condition terms must be integral and every variable involved needs
/// finite bounds.
#[derive(Debug, Default)]
pub struct BigM;

impl VifStrategy for BigM {
    fn expand(&mut self, model: &mut Model, vif: Vif) -> Result<(), ErrorKind> {
        let mut ctx = Context {
            model,
            name: &vif.name,
            flags: vif.flags,
            fail: ErrorKind::Vif,
        };
        let selected = ctx.indicator(&vif.condition)?;
        ctx.branch(&vif.then, &selected, true)?;
        if let Some(otherwise) = &vif.otherwise {
            ctx.branch(otherwise, &selected, false)?;
        }
        Ok(())
    }

    fn vabs(&mut self, model: &mut Model, term: Term) -> Result<Term, ErrorKind> {
        let mut ctx = Context {
            model,
            name: "vabs",
            flags: ConFlags::default(),
            fail: ErrorKind::Vabs,
        };
        ctx.absolute(term)
    }
}

struct Context<'m> {
    model: &'m mut Model,
    name: &'m str,
    flags: ConFlags,
    fail: fn(String) -> ErrorKind,
}

impl Context<'_> {
    fn add(&mut self, suffix: &str, term: Term, rel: ConRel) {
        let name = format!("{}_{suffix}", self.name);
        self.model.add_linear(&name, term, rel, self.flags);
    }

    fn helper(&mut self, suffix: &str, class: VarClass, lower: Number, upper: Number) -> Term {
        let id = self.model.add_variable(Variable {
            name: format!("{}_{suffix}", self.name),
            class,
            lower,
            upper,
            priority: None,
            startval: None,
            objective: BigRational::zero(),
        });
        Term::var(id)
    }

    fn binary(&mut self) -> Term {
        self.helper("vif", VarClass::Binary, Number::zero(), Number::one())
    }

    /// Smallest and largest value `term` can take within the variable bounds.
    fn bounds(&self, term: &Term) -> Result<(BigRational, BigRational), ErrorKind> {
        let mut low = term.constant_part().clone();
        let mut high = low.clone();
        for (id, coef) in term.coefficients() {
            let var = self.model.variable(id);
            let (Number::Finite(lower), Number::Finite(upper)) = (&var.lower, &var.upper) else {
                return Err((self.fail)(format!("variable {} needs finite bounds", var.name)));
            };
            if coef.is_positive() {
                low += coef * lower;
                high += coef * upper;
            } else {
                low += coef * upper;
                high += coef * lower;
            }
        }
        Ok((low, high))
    }

    fn check_integral(&self, term: &Term) -> Result<(), ErrorKind> {
        if !term.constant_part().is_integer() {
            return Err(ErrorKind::Vif("condition has a fractional constant".to_string()));
        }
        for (id, coef) in term.coefficients() {
            let var = self.model.variable(id);
            if var.class == VarClass::Continuous || !coef.is_integer() {
                return Err(ErrorKind::Vif(format!(
                    "condition on {} is not integral",
                    var.name
                )));
            }
        }
        Ok(())
    }

    /// A 0/1 term that is one exactly when `condition` holds.
    fn indicator(&mut self, condition: &VifCondition) -> Result<Term, ErrorKind> {
        match condition {
            VifCondition::Atom(term, op) => self.atom(term, *op),
            VifCondition::Not(inner) => {
                let inner = self.indicator(inner)?;
                Ok(Term::constant(BigRational::one()).sub(&inner))
            }
            VifCondition::And(a, b) => {
                let (a, b) = (self.indicator(a)?, self.indicator(b)?);
                let r = self.binary();
                self.add("vif_and", r.clone().sub(&a), ConRel::Le);
                self.add("vif_and", r.clone().sub(&b), ConRel::Le);
                // r >= a + b - 1
                let lower = a.add(&b).sub(&r).sub(&Term::constant(BigRational::one()));
                self.add("vif_and", lower, ConRel::Le);
                Ok(r)
            }
            VifCondition::Or(a, b) => {
                let (a, b) = (self.indicator(a)?, self.indicator(b)?);
                let r = self.binary();
                self.add("vif_or", r.clone().sub(&a), ConRel::Ge);
                self.add("vif_or", r.clone().sub(&b), ConRel::Ge);
                self.add("vif_or", r.clone().sub(&a).sub(&b), ConRel::Le);
                Ok(r)
            }
            VifCondition::Xor(a, b) => {
                let (a, b) = (self.indicator(a)?, self.indicator(b)?);
                let r = self.binary();
                self.add("vif_xor", r.clone().sub(&a).sub(&b), ConRel::Le);
                self.add("vif_xor", r.clone().sub(&a).add(&b), ConRel::Ge);
                self.add("vif_xor", r.clone().sub(&b).add(&a), ConRel::Ge);
                // r <= 2 - a - b
                let two = Term::constant(BigRational::from_integer(2.into()));
                self.add("vif_xor", r.clone().add(&a).add(&b).sub(&two), ConRel::Le);
                Ok(r)
            }
        }
    }

    fn atom(&mut self, term: &Term, op: CmpOp) -> Result<Term, ErrorKind> {
        self.check_integral(term)?;
        let one = Term::constant(BigRational::one());
        let negated = term.scale(&-BigRational::one());
        match op {
            CmpOp::Le => self.less_equal_zero(term.clone()),
            // t < 0  <=>  t + 1 <= 0
            CmpOp::Lt => self.less_equal_zero(term.clone().add(&one)),
            CmpOp::Ge => self.less_equal_zero(negated),
            CmpOp::Gt => self.less_equal_zero(negated.add(&one)),
            CmpOp::Eq => self.indicator(&VifCondition::And(
                Box::new(VifCondition::Atom(term.clone(), CmpOp::Le)),
                Box::new(VifCondition::Atom(term.clone(), CmpOp::Ge)),
            )),
            CmpOp::Ne => {
                let equal = self.atom(term, CmpOp::Eq)?;
                Ok(one.sub(&equal))
            }
        }
    }

    /// Indicator `r` with `r = 1 <=> t <= 0`, for integral `t`.
    fn less_equal_zero(&mut self, t: Term) -> Result<Term, ErrorKind> {
        let (min, max) = self.bounds(&t)?;
        let one = Term::constant(BigRational::one());
        let r = self.binary();
        // r = 1  =>  t <= 0, as  t + max r - max <= 0
        let upper = t.clone().add(&r.scale(&max)).sub(&Term::constant(max));
        self.add("vif_c", upper, ConRel::Le);
        // r = 0  =>  t >= 1, as  t - (min - 1) r - 1 >= 0
        let slack = min - BigRational::one();
        let lower = t.sub(&r.scale(&slack)).sub(&one);
        self.add("vif_c", lower, ConRel::Ge);
        Ok(r)
    }

    /// `r` with `r = |t|`, using a sign indicator `s` that is one for
    /// `t >= 0` and zero for `t <= 0`.
    fn absolute(&mut self, t: Term) -> Result<Term, ErrorKind> {
        let (min, max) = self.bounds(&t)?;
        if !min.is_negative() {
            return Ok(t);
        }
        if !max.is_positive() {
            return Ok(t.scale(&-BigRational::one()));
        }
        let two = BigRational::from_integer(2.into());
        let upper = Number::Finite((-min.clone()).max(max.clone()));
        let s = self.helper("sign", VarClass::Binary, Number::zero(), Number::one());
        let r = self.helper("abs", VarClass::Continuous, Number::zero(), upper);
        // s = 1  =>  t >= 0, as  t + min s - min >= 0
        let nonnegative = t.clone().add(&s.scale(&min)).sub(&Term::constant(min.clone()));
        self.add("c", nonnegative, ConRel::Ge);
        // s = 0  =>  t <= 0, as  t - max s <= 0
        self.add("c", t.clone().sub(&s.scale(&max)), ConRel::Le);
        self.add("c", r.clone().sub(&t), ConRel::Ge);
        self.add("c", r.clone().add(&t), ConRel::Ge);
        // s = 1  =>  r <= t, as  r - t + 2 min - 2 min s <= 0
        let twice_min = &two * &min;
        let below_t = r
            .clone()
            .sub(&t)
            .add(&Term::constant(twice_min.clone()))
            .sub(&s.scale(&twice_min));
        self.add("c", below_t, ConRel::Le);
        // s = 0  =>  r <= -t, as  r + t - 2 max s <= 0
        self.add("c", r.clone().add(&t).sub(&s.scale(&(&two * &max))), ConRel::Le);
        Ok(r)
    }

    /// Enforces `relation` when `selected` is one (`active`), or when it is
    /// zero (`!active`).
    fn branch(&mut self, relation: &VifRelation, selected: &Term, active: bool) -> Result<(), ErrorKind> {
        let (min, max) = self.bounds(&relation.term)?;
        let suffix = if active { "vif_then" } else { "vif_else" };
        let t = &relation.term;
        let add_side = |ctx: &mut Self, rel: ConRel, big_m: &BigRational| {
            // active:  t <= M (1 - s)   inactive:  t <= M s   (and likewise for >=)
            let relaxed = if active {
                t.clone().add(&selected.scale(big_m)).sub(&Term::constant(big_m.clone()))
            } else {
                t.clone().sub(&selected.scale(big_m))
            };
            ctx.add(suffix, relaxed, rel);
        };
        match relation.rel {
            ConRel::Le => add_side(self, ConRel::Le, &max),
            ConRel::Ge => add_side(self, ConRel::Ge, &min),
            ConRel::Eq => {
                add_side(self, ConRel::Le, &max);
                add_side(self, ConRel::Ge, &min);
            }
        }
        Ok(())
    }
}
