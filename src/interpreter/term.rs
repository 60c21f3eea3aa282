use std::collections::BTreeMap;
use std::fmt;

use num_rational::BigRational;
use num_traits::{One, Zero};

use super::error::ErrorKind;
use super::model::VarId;
use super::numeric::format_rational;

/// A linear expression over model variables plus a constant.
///
/// Coefficients are kept sorted by variable id and zero coefficients are
/// dropped, so two terms describing the same function compare equal.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Term {
    coefs: BTreeMap<VarId, BigRational>,
    constant: BigRational,
}

impl Term {
    pub fn constant(value: BigRational) -> Self {
        Self {
            coefs: BTreeMap::new(),
            constant: value,
        }
    }

    pub fn var(id: VarId) -> Self {
        let mut coefs = BTreeMap::new();
        coefs.insert(id, BigRational::one());
        Self {
            coefs,
            constant: BigRational::zero(),
        }
    }

    pub fn coefficients(&self) -> impl Iterator<Item = (VarId, &BigRational)> {
        self.coefs.iter().map(|(id, coef)| (*id, coef))
    }

    pub fn coefficient(&self, id: VarId) -> BigRational {
        self.coefs.get(&id).cloned().unwrap_or_else(BigRational::zero)
    }

    pub fn constant_part(&self) -> &BigRational {
        &self.constant
    }

    pub fn is_constant(&self) -> bool {
        self.coefs.is_empty()
    }

    pub fn len(&self) -> usize {
        self.coefs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.coefs.is_empty() && self.constant.is_zero()
    }

    /// The single variable with coefficient one, if that is all this term is.
    pub fn as_single_var(&self) -> Option<VarId> {
        match (self.coefs.iter().next(), self.coefs.len()) {
            (Some((id, coef)), 1) if coef.is_one() && self.constant.is_zero() => Some(*id),
            _ => None,
        }
    }

    pub fn add_coef(&mut self, id: VarId, coef: &BigRational) {
        let entry = self.coefs.entry(id).or_insert_with(BigRational::zero);
        *entry += coef;
        if entry.is_zero() {
            self.coefs.remove(&id);
        }
    }

    pub fn add_constant(&mut self, value: &BigRational) {
        self.constant += value;
    }

    /// Splits off the constant, leaving only the variable part.
    pub fn take_constant(&mut self) -> BigRational {
        std::mem::replace(&mut self.constant, BigRational::zero())
    }

    pub fn add(mut self, other: &Term) -> Term {
        for (id, coef) in other.coefs.iter() {
            self.add_coef(*id, coef);
        }
        self.constant += &other.constant;
        self
    }

    pub fn sub(self, other: &Term) -> Term {
        self.add(&other.scale(&-BigRational::one()))
    }

    pub fn scale(&self, factor: &BigRational) -> Term {
        if factor.is_zero() {
            return Term::default();
        }
        Term {
            coefs: self
                .coefs
                .iter()
                .map(|(id, coef)| (*id, coef * factor))
                .collect(),
            constant: &self.constant * factor,
        }
    }

    /// Product of two terms, as long as one of them is constant.
    pub fn mul(&self, other: &Term) -> Result<Term, ErrorKind> {
        match (self.is_constant(), other.is_constant()) {
            (_, true) => Ok(self.scale(&other.constant)),
            (true, false) => Ok(other.scale(&self.constant)),
            (false, false) => Err(ErrorKind::Nonlinear),
        }
    }

    pub fn div(&self, divisor: &BigRational) -> Result<Term, ErrorKind> {
        if divisor.is_zero() {
            return Err(ErrorKind::DivisionByZero);
        }
        Ok(self.scale(&divisor.recip()))
    }
}

impl fmt::Display for Term {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut first = true;
        for (id, coef) in self.coefs.iter() {
            if !first {
                write!(f, " + ")?;
            }
            write!(f, "{} {}", format_rational(coef), id)?;
            first = false;
        }
        if first || !self.constant.is_zero() {
            if !first {
                write!(f, " + ")?;
            }
            write!(f, "{}", format_rational(&self.constant))?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::interpreter::numeric::integer;

    #[test]
    fn test_zero_coefficients_vanish() {
        let x = Term::var(VarId(0));
        let t = x.clone().sub(&x);
        assert!(t.is_constant());
        assert_eq!(t, Term::default());
    }

    #[test]
    fn test_nonlinear_product() {
        let x = Term::var(VarId(0));
        let y = Term::var(VarId(1));
        assert!(matches!(x.mul(&y), Err(ErrorKind::Nonlinear)));
        let three = Term::constant(integer(3));
        let t = x.mul(&three).unwrap().add(&y);
        assert_eq!(t.coefficient(VarId(0)), integer(3));
        assert_eq!(t.coefficient(VarId(1)), integer(1));
        assert_eq!(t.len(), 2);
    }

    #[test]
    fn test_single_var() {
        assert_eq!(Term::var(VarId(4)).as_single_var(), Some(VarId(4)));
        let shifted = Term::var(VarId(4)).add(&Term::constant(integer(1)));
        assert_eq!(shifted.as_single_var(), None);
    }
}
