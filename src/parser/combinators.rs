use std::cell::RefCell;
use std::collections::BTreeSet;

use super::error::SyntaxError;
use super::locations::Span;
use super::memo::ParserCache;
use super::tokenizer::{Token, TokenType};

#[derive(Debug)]
pub enum ParseResult<'a, Output> {
    Ok((Output, ParserInput<'a>)),
    Err,
}

/// Furthest point any alternative reached, and what it wanted to see there.
/// Positions are counted as remaining tokens, so smaller is further.
#[derive(Debug, Default)]
pub(crate) struct Diagnostics {
    remaining: Option<usize>,
    expected: BTreeSet<String>,
}

#[derive(Debug, Clone, Copy)]
pub struct ParserState<'a> {
    diagnostics: &'a RefCell<Diagnostics>,
    pub(super) cache: &'a RefCell<ParserCache>,
}

impl<'a> ParserState<'a> {
    pub(crate) fn new(diagnostics: &'a RefCell<Diagnostics>, cache: &'a RefCell<ParserCache>) -> Self {
        Self { diagnostics, cache }
    }

    pub(super) fn expected(&self, remaining: usize, what: &str) {
        let mut diagnostics = self.diagnostics.borrow_mut();
        match diagnostics.remaining {
            Some(r) if r < remaining => return,
            Some(r) if r == remaining => {}
            _ => {
                diagnostics.remaining = Some(remaining);
                diagnostics.expected.clear();
            }
        }
        diagnostics.expected.insert(what.to_string());
    }

    /// Turns the recorded failure into an error for the statement starting at `input`.
    pub(super) fn syntax_error(&self, input: ParserInput<'a>) -> SyntaxError {
        let mut diagnostics = self.diagnostics.borrow_mut();
        let offset = diagnostics
            .remaining
            .map_or(0, |r| input.0.len().saturating_sub(r));
        let expected = std::mem::take(&mut diagnostics.expected).into_iter().collect();
        diagnostics.remaining = None;
        match input.0.get(offset).or(input.0.last()) {
            Some(token) => SyntaxError::new(token.span.clone(), &token.to_string(), expected),
            None => SyntaxError::new(Default::default(), "end of input", expected),
        }
    }

    pub(super) fn reset(&self) {
        let mut diagnostics = self.diagnostics.borrow_mut();
        diagnostics.remaining = None;
        diagnostics.expected.clear();
    }
}

#[derive(Debug, Clone, Copy)]
pub struct ParserInput<'a>(pub(super) &'a [Token], pub(super) ParserState<'a>);

impl<'a> ParserInput<'a> {
    pub fn new(input: &'a [Token], state: ParserState<'a>) -> Self {
        Self(input, state)
    }

    pub(super) fn advance(self, n: usize) -> Self {
        Self(&self.0[n.min(self.0.len())..], self.1)
    }

    pub(super) fn at_end(&self) -> bool {
        matches!(self.0.first(), None | Some(Token { typ: TokenType::ENDMARKER, .. }))
    }

    /// Skips past the next `;`, or up to the end marker.
    pub(super) fn recover(self) -> Self {
        let mut rest = self;
        while !rest.at_end() {
            let typ = rest.0[0].typ;
            rest = rest.advance(1);
            if typ == TokenType::SEMI {
                break;
            }
        }
        rest
    }
}

impl<'a, T> ParseResult<'a, T> {
    pub(super) fn or_else<O>(self, op: O) -> Self
    where
        O: FnOnce() -> Self,
    {
        match self {
            Self::Ok(inner) => Self::Ok(inner),
            Self::Err => op(),
        }
    }
    pub(super) fn map<U, F>(self, op: F) -> ParseResult<'a, U>
    where
        F: FnOnce((T, ParserInput<'a>)) -> (U, ParserInput<'a>),
    {
        match self {
            Self::Ok(inner) => ParseResult::Ok(op(inner)),
            Self::Err => ParseResult::Err,
        }
    }
    pub(super) fn and_then<U, F>(self, op: F) -> ParseResult<'a, U>
    where
        F: FnOnce((T, ParserInput<'a>)) -> ParseResult<'a, U>,
    {
        match self {
            Self::Ok(inner) => op(inner),
            Self::Err => ParseResult::Err,
        }
    }
}

pub(super) trait Parser<'a, Output> {
    fn parse(&self, input: ParserInput<'a>) -> ParseResult<'a, Output>;
    fn map<F, MappedOutput>(self, map_fn: F) -> BoxedParser<'a, MappedOutput>
    where
        Self: Sized + 'a,
        Output: 'a,
        MappedOutput: 'a,
        F: Fn(Output) -> MappedOutput + 'a,
    {
        BoxedParser::new(map(self, map_fn))
    }
    fn discard(self) -> BoxedParser<'a, ()>
    where
        Self: Sized + 'a,
        Output: 'a,
    {
        BoxedParser::new(map(self, |_| ()))
    }
    fn or(self, parser: impl Parser<'a, Output> + 'a) -> BoxedParser<'a, Output>
    where
        Self: Sized + 'a,
        Output: 'a,
    {
        let alternative = move |input| self.parse(input).or_else(|| parser.parse(input));
        BoxedParser::new(alternative)
    }
}

impl<'a, F, Output> Parser<'a, Output> for F
where
    F: Fn(ParserInput<'a>) -> ParseResult<'a, Output>,
{
    fn parse(&self, input: ParserInput<'a>) -> ParseResult<'a, Output> {
        self(input)
    }
}

pub(super) struct BoxedParser<'a, Output> {
    parser: Box<dyn Parser<'a, Output> + 'a>,
}

impl<'a, Output> BoxedParser<'a, Output> {
    fn new(parser: impl Parser<'a, Output> + 'a) -> Self {
        Self {
            parser: Box::new(parser),
        }
    }
}

impl<'a, Output> Parser<'a, Output> for BoxedParser<'a, Output> {
    fn parse(&self, input: ParserInput<'a>) -> ParseResult<'a, Output> {
        self.parser.parse(input)
    }
}

pub(super) fn pair<'a, R1, R2>(
    parser1: impl Parser<'a, R1>,
    parser2: impl Parser<'a, R2>,
) -> impl Parser<'a, (R1, R2)> {
    move |input| {
        parser1.parse(input).and_then(|(result1, next_input)| {
            parser2
                .parse(next_input)
                .map(|(result2, rest)| ((result1, result2), rest))
        })
    }
}

pub(super) fn map<'a, F, A, B>(
    parser: impl Parser<'a, A>,
    map_fn: F,
) -> impl Fn(ParserInput<'a>) -> ParseResult<'a, B>
where
    F: Fn(A) -> B,
{
    move |input| {
        parser
            .parse(input)
            .map(|(result, rest)| (map_fn(result), rest))
    }
}

pub(super) fn left<'a, A, B>(
    left_parser: impl Parser<'a, A>,
    right_parser: impl Parser<'a, B>,
) -> impl Parser<'a, A> {
    map(pair(left_parser, right_parser), |(left, _right)| left)
}

pub(super) fn right<'a, A, B>(
    left_parser: impl Parser<'a, A>,
    right_parser: impl Parser<'a, B>,
) -> impl Parser<'a, B> {
    map(pair(left_parser, right_parser), |(_left, right)| right)
}

pub(super) fn pred<'a, A, F>(parser: impl Parser<'a, A>, predicate: F) -> impl Parser<'a, A>
where
    F: Fn(&A) -> bool,
{
    move |input| {
        if let ParseResult::Ok((result, rest)) = parser.parse(input) {
            if predicate(&result) {
                return ParseResult::Ok((result, rest));
            }
        }
        ParseResult::Err
    }
}

pub(super) fn zero_or_more<'a, R>(parser: impl Parser<'a, R>) -> impl Parser<'a, Vec<R>> {
    move |input| {
        let mut result = Vec::new();
        let mut tmp_input = input;
        while let ParseResult::Ok((next, rest)) = parser.parse(tmp_input) {
            tmp_input = rest;
            result.push(next);
        }
        ParseResult::Ok((result, tmp_input))
    }
}

pub(super) fn one_or_more<'a, R>(parser: impl Parser<'a, R>) -> impl Parser<'a, Vec<R>> {
    pred(zero_or_more(parser), |items: &Vec<R>| !items.is_empty())
}

pub(super) fn maybe<'a, R>(parser: impl Parser<'a, R>) -> impl Parser<'a, Option<R>> {
    move |input| match parser.parse(input) {
        ParseResult::Ok((value, rest)) => ParseResult::Ok((Some(value), rest)),
        ParseResult::Err => ParseResult::Ok((None, input)),
    }
}

pub(super) fn tok<'a>(expected_type: TokenType) -> impl Fn(ParserInput<'a>) -> ParseResult<'a, Token> {
    move |input: ParserInput<'a>| match input.0.first() {
        Some(token) if token.typ == expected_type => {
            ParseResult::Ok((token.clone(), input.advance(1)))
        }
        _ => {
            input.1.expected(input.0.len(), &expected_type.describe());
            ParseResult::Err
        }
    }
}

pub(super) fn token<'a>(
    expected_type: TokenType,
    expected_lexeme: &'static str,
) -> impl Fn(ParserInput<'a>) -> ParseResult<'a, Token> {
    move |input: ParserInput<'a>| match input.0.first() {
        Some(token) if token.typ == expected_type && token.lexeme.as_str() == expected_lexeme => {
            ParseResult::Ok((token.clone(), input.advance(1)))
        }
        _ => {
            input.1.expected(input.0.len(), &format!("'{expected_lexeme}'"));
            ParseResult::Err
        }
    }
}

/// Shorthand for a reserved word.
pub(super) fn kw<'a>(word: &'static str) -> impl Fn(ParserInput<'a>) -> ParseResult<'a, Token> {
    token(TokenType::KEYWORD, word)
}

/// Matches the first entry of `table` whose token and lexeme fit, yielding its value.
pub(super) fn one_of<'a, V: Copy + 'a>(
    table: &'static [(TokenType, &'static str, V)],
) -> impl Fn(ParserInput<'a>) -> ParseResult<'a, V> {
    move |input: ParserInput<'a>| {
        if let Some(first) = input.0.first() {
            for (typ, lexeme, value) in table {
                if first.typ == *typ && first.lexeme == *lexeme {
                    return ParseResult::Ok((*value, input.advance(1)));
                }
            }
        }
        for (_, lexeme, _) in table {
            input.1.expected(input.0.len(), &format!("'{lexeme}'"));
        }
        ParseResult::Err
    }
}

pub(super) fn sep_by<'a, R>(parser: impl Parser<'a, R>, sep: TokenType) -> impl Parser<'a, Vec<R>> {
    move |input| {
        if let ParseResult::Ok((first, rest)) = parser.parse(input) {
            let mut result = Vec::new();
            let mut tmp_input = rest;
            result.push(first);
            while let ParseResult::Ok((next, rest)) =
                tok(sep).parse(tmp_input).and_then(|(_, s)| parser.parse(s))
            {
                tmp_input = rest;
                result.push(next)
            }
            return ParseResult::Ok((result, tmp_input));
        }
        ParseResult::Err
    }
}

/// Pairs the result with the span of the tokens it consumed.
pub(super) fn spanned<'a, R>(parser: impl Parser<'a, R>) -> impl Parser<'a, (R, Span)> {
    move |input: ParserInput<'a>| {
        parser.parse(input).map(|(result, rest)| {
            let consumed = input.0.len() - rest.0.len();
            let span = match (input.0.first(), consumed) {
                (Some(first), n) if n > 0 => first.span.till(&input.0[n - 1]),
                _ => Span::Indetermined,
            };
            ((result, span), rest)
        })
    }
}
