mod ast;
mod combinators;
mod error;
mod grammar;
mod locations;
mod memo;
pub mod tokenizer;

pub use ast::*;
pub use error::{SyntaxError, TokenizeError};
pub use grammar::parse;
pub use locations::{Locatable, Location, Span};
pub use tokenizer::{tokenize_file, tokenize_string, Token};

#[cfg(test)]
mod test;
