//! Finite sets of equal-arity tuples.

use std::fmt;

use indexmap::IndexSet;
use num_rational::BigRational;
use num_traits::{Signed, Zero};

use super::error::ErrorKind;
use super::value::{Elem, Tuple};

/// Upper limit for `powerset`, which enumerates every subset.
const MAX_POWERSET_BASE: usize = 24;

/// Tuples are kept in insertion order, which is the order iteration visits
/// them in. Equality ignores the order.
#[derive(Debug, Clone, Default)]
pub struct Set {
    arity: usize,
    tuples: IndexSet<Tuple>,
}

impl PartialEq for Set {
    fn eq(&self, other: &Self) -> bool {
        self.tuples.len() == other.tuples.len() && self.tuples.iter().all(|t| other.contains(t))
    }
}

impl Set {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn from_tuples(tuples: impl IntoIterator<Item = Tuple>) -> Result<Self, ErrorKind> {
        let mut set = Self::empty();
        for tuple in tuples {
            set.insert(tuple)?;
        }
        Ok(set)
    }

    /// A one-dimensional set of plain elements.
    pub fn from_elems(elems: impl IntoIterator<Item = Elem>) -> Self {
        let tuples: IndexSet<Tuple> = elems.into_iter().map(|e| Tuple(vec![e])).collect();
        Self {
            arity: if tuples.is_empty() { 0 } else { 1 },
            tuples,
        }
    }

    /// Adds a tuple, ignoring duplicates. All tuples must share one arity
    /// and the element types of the first tuple.
    pub fn insert(&mut self, tuple: Tuple) -> Result<bool, ErrorKind> {
        match self.tuples.first() {
            None => self.arity = tuple.arity(),
            Some(_) if tuple.arity() != self.arity => {
                return Err(ErrorKind::ArityMismatch {
                    expected: self.arity,
                    found: tuple.arity(),
                })
            }
            Some(first) if !first.same_types(&tuple) => return Err(type_mismatch(first, &tuple)),
            Some(_) => {}
        }
        Ok(self.tuples.insert(tuple))
    }

    pub fn arity(&self) -> usize {
        self.arity
    }

    pub fn len(&self) -> usize {
        self.tuples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tuples.is_empty()
    }

    pub fn contains(&self, tuple: &Tuple) -> bool {
        self.tuples.contains(tuple)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Tuple> {
        self.tuples.iter()
    }

    /// The `n`-th tuple, counting from one.
    pub fn nth(&self, n: usize) -> Option<&Tuple> {
        n.checked_sub(1).and_then(|i| self.tuples.get_index(i))
    }

    fn check_compatible(&self, other: &Set) -> Result<(), ErrorKind> {
        let (Some(a), Some(b)) = (self.tuples.first(), other.tuples.first()) else {
            return Ok(());
        };
        if self.arity != other.arity {
            return Err(ErrorKind::ArityMismatch {
                expected: self.arity,
                found: other.arity,
            });
        }
        if !a.same_types(b) {
            return Err(type_mismatch(a, b));
        }
        Ok(())
    }

    fn with_tuples(&self, other: &Set, tuples: IndexSet<Tuple>) -> Set {
        let arity = if tuples.is_empty() { 0 } else { self.arity.max(other.arity) };
        Set { arity, tuples }
    }

    pub fn union(&self, other: &Set) -> Result<Set, ErrorKind> {
        self.check_compatible(other)?;
        let tuples = self.tuples.union(&other.tuples).cloned().collect();
        Ok(self.with_tuples(other, tuples))
    }

    pub fn inter(&self, other: &Set) -> Result<Set, ErrorKind> {
        self.check_compatible(other)?;
        let tuples = self.tuples.intersection(&other.tuples).cloned().collect();
        Ok(self.with_tuples(other, tuples))
    }

    pub fn without(&self, other: &Set) -> Result<Set, ErrorKind> {
        self.check_compatible(other)?;
        let tuples = self.tuples.difference(&other.tuples).cloned().collect();
        Ok(self.with_tuples(other, tuples))
    }

    pub fn symdiff(&self, other: &Set) -> Result<Set, ErrorKind> {
        self.check_compatible(other)?;
        let tuples = self
            .tuples
            .symmetric_difference(&other.tuples)
            .cloned()
            .collect();
        Ok(self.with_tuples(other, tuples))
    }

    /// Every tuple of `self` concatenated with every tuple of `other`, in
    /// row-major order.
    pub fn cross(&self, other: &Set) -> Set {
        let tuples: IndexSet<Tuple> = self
            .tuples
            .iter()
            .flat_map(|a| other.tuples.iter().map(move |b| a.concat(b)))
            .collect();
        let arity = if tuples.is_empty() { 0 } else { self.arity + other.arity };
        Set { arity, tuples }
    }

    pub fn is_subset(&self, other: &Set) -> bool {
        self.tuples.iter().all(|t| other.contains(t))
    }

    /// Keeps the given one-based components of every tuple.
    pub fn proj(&self, positions: &[usize]) -> Result<Set, ErrorKind> {
        for &p in positions {
            if p == 0 || (!self.is_empty() && p > self.arity) {
                return Err(ErrorKind::Invalid(format!(
                    "projection index {p} is out of range for tuples of {} elements",
                    self.arity
                )));
            }
        }
        let tuples: IndexSet<Tuple> = self
            .tuples
            .iter()
            .map(|t| Tuple(positions.iter().map(|&p| t.0[p - 1].clone()).collect()))
            .collect();
        let arity = if tuples.is_empty() { 0 } else { positions.len() };
        Ok(Set { arity, tuples })
    }

    /// `{from .. to by step}`; `inclusive` decides whether `to` itself may
    /// be part of the set.
    pub fn range(
        from: &BigRational,
        to: &BigRational,
        step: &BigRational,
        inclusive: bool,
    ) -> Result<Set, ErrorKind> {
        if step.is_zero() {
            return Err(ErrorKind::Invalid("range step must not be zero".to_string()));
        }
        let mut elems = vec![];
        let mut current = from.clone();
        let in_range = |v: &BigRational| match (step.is_positive(), inclusive) {
            (true, true) => v <= to,
            (true, false) => v < to,
            (false, true) => v >= to,
            (false, false) => v > to,
        };
        while in_range(&current) {
            elems.push(Elem::Numb(current.clone()));
            current += step;
        }
        Ok(Set::from_elems(elems))
    }

    /// All subsets, ordered by the bit pattern of the members they pick.
    pub fn powerset(&self) -> Result<Vec<Set>, ErrorKind> {
        if self.len() > MAX_POWERSET_BASE {
            return Err(ErrorKind::Invalid(format!(
                "powerset of a set with {} elements is too large",
                self.len()
            )));
        }
        let members: Vec<&Tuple> = self.tuples.iter().collect();
        let mut subsets = vec![];
        for mask in 0u64..(1u64 << members.len()) {
            let picked = members
                .iter()
                .enumerate()
                .filter(|(i, _)| mask & (1 << i) != 0)
                .map(|(_, t)| (*t).clone());
            subsets.push(Set::from_tuples(picked)?);
        }
        Ok(subsets)
    }

    /// All subsets with between `min` and `max` members, smallest first,
    /// each size in lexicographic order of member positions.
    pub fn subsets(&self, min: usize, max: usize) -> Result<Vec<Set>, ErrorKind> {
        if min > max || max > self.len() {
            return Err(ErrorKind::Invalid(format!(
                "cannot choose between {min} and {max} of {} elements",
                self.len()
            )));
        }
        let members: Vec<&Tuple> = self.tuples.iter().collect();
        let mut subsets = vec![];
        for size in min..=max {
            let mut picks: Vec<usize> = (0..size).collect();
            loop {
                subsets.push(Set::from_tuples(picks.iter().map(|&i| members[i].clone()))?);
                // advance to the next combination
                let Some(pos) = (0..size).rev().find(|&i| picks[i] != i + members.len() - size) else {
                    break;
                };
                picks[pos] += 1;
                for i in pos + 1..size {
                    picks[i] = picks[i - 1] + 1;
                }
            }
        }
        Ok(subsets)
    }
}

fn type_mismatch(expected: &Tuple, found: &Tuple) -> ErrorKind {
    let types = |t: &Tuple| {
        let names: Vec<&str> = t.elems().iter().map(Elem::type_name).collect();
        format!("<{}>", names.join(","))
    };
    ErrorKind::mismatch("set", &types(expected), &types(found))
}

impl fmt::Display for Set {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let items: Vec<String> = self
            .tuples
            .iter()
            .map(|t| match t.elems() {
                [single] => single.to_string(),
                _ => t.to_string(),
            })
            .collect();
        write!(f, "{{{}}}", items.join(","))
    }
}
