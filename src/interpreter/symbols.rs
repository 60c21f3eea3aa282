use std::rc::Rc;

use indexmap::IndexMap;

use super::error::ErrorKind;
use super::model::VarId;
use super::sets::Set;
use super::value::{Number, Tuple, Value};
use crate::parser::{DefineKind, Expr};

/// A declared name with one value per index tuple. Scalars live under the
/// empty tuple.
#[derive(Debug, Clone)]
pub struct Family<T> {
    pub domain: Option<Set>,
    pub entries: IndexMap<Tuple, T>,
    pub default: Option<T>,
}

impl<T: Clone> Family<T> {
    pub fn scalar(value: T) -> Self {
        let mut entries = IndexMap::new();
        entries.insert(Tuple::empty(), value);
        Self {
            domain: None,
            entries,
            default: None,
        }
    }

    pub fn indexed(domain: Option<Set>, entries: IndexMap<Tuple, T>, default: Option<T>) -> Self {
        Self {
            domain,
            entries,
            default,
        }
    }

    pub fn is_scalar(&self) -> bool {
        self.domain.is_none() && self.entries.len() == 1 && self.entries.contains_key(&Tuple::empty())
    }

    /// The entry for `index`, else the default, else an error.
    pub fn get(&self, name: &str, index: &Tuple) -> Result<T, ErrorKind> {
        self.entries
            .get(index)
            .or(self.default.as_ref())
            .cloned()
            .ok_or_else(|| ErrorKind::UnknownIndex {
                symbol: name.to_string(),
                index: index.to_string(),
            })
    }

    /// The set of tuples this family is indexed over.
    pub fn index_set(&self) -> Result<Set, ErrorKind> {
        match &self.domain {
            Some(domain) => Ok(domain.clone()),
            None => Set::from_tuples(self.entries.keys().cloned()),
        }
    }
}

/// A `defnumb`/`defstrg`/`defbool`/`defset` macro.
#[derive(Debug, Clone)]
pub struct Define {
    pub kind: DefineKind,
    pub params: Vec<String>,
    pub body: Rc<Expr>,
}

#[derive(Debug, Clone)]
pub enum Symbol {
    Set(Family<Set>),
    Numb(Family<Number>),
    Strg(Family<String>),
    Var(Family<VarId>),
    Define(Define),
}

impl Symbol {
    pub fn kind_name(&self) -> &'static str {
        match self {
            Self::Set(_) => "set",
            Self::Numb(_) => "numeric parameter",
            Self::Strg(_) => "string parameter",
            Self::Var(_) => "variable",
            Self::Define(_) => "define",
        }
    }

    /// Looks up one member of the family as a value.
    pub fn lookup(&self, name: &str, index: &Tuple) -> Result<Value, ErrorKind> {
        match self {
            Self::Set(f) => f.get(name, index).map(Value::Set),
            Self::Numb(f) => f.get(name, index).map(Value::Number),
            Self::Strg(f) => f.get(name, index).map(Value::Str),
            Self::Var(f) => f
                .get(name, index)
                .map(|id| Value::Term(super::term::Term::var(id))),
            Self::Define(_) => Err(ErrorKind::Invalid(format!(
                "define '{name}' must be called with arguments"
            ))),
        }
    }

    pub fn index_set(&self, name: &str) -> Result<Set, ErrorKind> {
        match self {
            Self::Set(f) => f.index_set(),
            Self::Numb(f) => f.index_set(),
            Self::Strg(f) => f.index_set(),
            Self::Var(f) => f.index_set(),
            Self::Define(_) => Err(ErrorKind::Invalid(format!("define '{name}' has no index set"))),
        }
    }
}

/// Local bindings made by index patterns and define parameters. Frames are
/// chained, inner frames shadow outer ones.
#[derive(Debug, Default)]
pub struct Scope<'s> {
    parent: Option<&'s Scope<'s>>,
    bindings: Vec<(String, Value)>,
}

impl Scope<'_> {
    pub fn root() -> Self {
        Self::default()
    }

    pub fn child(&self) -> Scope<'_> {
        Scope {
            parent: Some(self),
            bindings: vec![],
        }
    }

    pub fn bind(&mut self, name: &str, value: Value) {
        self.bindings.push((name.to_string(), value));
    }

    pub fn lookup(&self, name: &str) -> Option<&Value> {
        self.bindings
            .iter()
            .rev()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v)
            .or_else(|| self.parent.and_then(|p| p.lookup(name)))
    }
}

/// Global, append-only registry of everything declared so far.
#[derive(Debug, Default)]
pub struct SymbolTable {
    symbols: IndexMap<String, Symbol>,
}

impl SymbolTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn declare(&mut self, name: &str, symbol: Symbol) -> Result<(), ErrorKind> {
        if self.symbols.contains_key(name) {
            return Err(ErrorKind::DuplicateSymbol(name.to_string()));
        }
        self.symbols.insert(name.to_string(), symbol);
        Ok(())
    }

    pub fn get(&self, name: &str) -> Option<&Symbol> {
        self.symbols.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.symbols.contains_key(name)
    }
}
