use std::cell::RefCell;
use std::collections::HashMap;

use super::ast::{Expr, IndexSet};
use super::combinators::{ParseResult, ParserInput};

type Key = (usize, usize);

/// A cached outcome: the result and how many tokens were left after it.
type Entry<R> = Option<(R, usize)>;

/// Packrat cache for the rules the grammar tends to re-enter at the same
/// position (constraint sides, brace contents, index sets).
#[derive(Debug, Default)]
pub(crate) struct ParserCache {
    expressions: HashMap<Key, Entry<Expr>>,
    index_sets: HashMap<Key, Entry<IndexSet>>,
}

impl ParserCache {
    pub fn new() -> Self {
        Self::default()
    }
}

pub(super) trait Cacheable: Clone + Sized {
    fn try_load(cache: &RefCell<ParserCache>, key: Key) -> Option<Entry<Self>>;
    fn store(cache: &RefCell<ParserCache>, key: Key, value: Entry<Self>);
}

impl Cacheable for Expr {
    fn try_load(cache: &RefCell<ParserCache>, key: Key) -> Option<Entry<Self>> {
        cache.borrow().expressions.get(&key).cloned()
    }
    fn store(cache: &RefCell<ParserCache>, key: Key, value: Entry<Self>) {
        cache.borrow_mut().expressions.insert(key, value);
    }
}

impl Cacheable for IndexSet {
    fn try_load(cache: &RefCell<ParserCache>, key: Key) -> Option<Entry<Self>> {
        cache.borrow().index_sets.get(&key).cloned()
    }
    fn store(cache: &RefCell<ParserCache>, key: Key, value: Entry<Self>) {
        cache.borrow_mut().index_sets.insert(key, value);
    }
}

/// Runs `rule` at `input`, or replays what it produced there before.
pub(super) fn memoized<'a, R>(
    input: ParserInput<'a>,
    rule: fn(ParserInput<'a>) -> ParseResult<'a, R>,
) -> ParseResult<'a, R>
where
    R: Cacheable,
{
    let key = (input.0.as_ptr() as usize, rule as usize);
    if let Some(entry) = R::try_load(input.1.cache, key) {
        return match entry {
            Some((value, remaining)) => {
                ParseResult::Ok((value, input.advance(input.0.len() - remaining)))
            }
            None => ParseResult::Err,
        };
    }
    let result = rule(input);
    let entry = match &result {
        ParseResult::Ok((value, rest)) => Some((value.clone(), rest.0.len())),
        ParseResult::Err => None,
    };
    R::store(input.1.cache, key, entry);
    result
}
