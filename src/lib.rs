//! A compiler for ZIMPL-style mathematical modelling programs.
//!
//! Source text is tokenized, parsed into a [`Program`] and then executed by
//! the [`Evaluator`], which produces a [`Model`] of variables, linear
//! constraints, SOS constraints and an objective.

pub mod config;
pub mod interpreter;
pub mod parser;

use thiserror::Error;

pub use config::{Options, DEFAULT_SEED};
pub use interpreter::{Evaluator, Model, SemanticError};
pub use parser::{parse, tokenize_file, tokenize_string, Program, SyntaxError, TokenizeError};

#[derive(Debug, Error)]
pub enum CompileError {
    #[error(transparent)]
    Tokenize(#[from] TokenizeError),
    #[error("{}", .0.iter().map(ToString::to_string).collect::<Vec<_>>().join("\n"))]
    Syntax(Vec<SyntaxError>),
    #[error(transparent)]
    Semantic(#[from] SemanticError),
}

/// Compiles a whole program with default options.
pub fn compile(source: &str) -> Result<Model, CompileError> {
    compile_with(source, &Options::default())
}

pub fn compile_with(source: &str, options: &Options) -> Result<Model, CompileError> {
    let tokens = tokenize_string(source)?;
    let (program, errors) = parse(&tokens);
    if !errors.is_empty() {
        return Err(CompileError::Syntax(errors));
    }
    let mut evaluator = Evaluator::new(options);
    evaluator.run(&program)?;
    Ok(evaluator.into_model())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_compile() {
        let model = compile(
            "set I := {1 to 3};\n\
             var x[I] integer <= 5;\n\
             maximize total: sum <i> in I: i * x[i];\n\
             subto cap: sum <i> in I: x[i] <= 7;\n",
        )
        .unwrap();
        assert_eq!(model.variables.len(), 3);
        assert_eq!(model.constraints.len(), 1);
        assert!(model.objective.is_some());
    }

    #[test]
    fn test_compile_reports_syntax_errors() {
        match compile("set I := {1, 2;\nparam p := 3;\n") {
            Err(CompileError::Syntax(errors)) => {
                assert!(!errors.is_empty());
                assert!(errors[0].to_string().starts_with("syntax error at"));
            }
            other => panic!("expected a syntax error, got {other:?}"),
        }
    }

    #[test]
    fn test_oversized_literal_is_a_syntax_error() {
        assert!(matches!(
            compile("param a := 1e2000000000;"),
            Err(CompileError::Syntax(_))
        ));
        assert!(compile("param a := 1e300;").is_ok());
    }

    #[test]
    fn test_compile_reports_semantic_errors() {
        assert!(matches!(
            compile("param p := q + 1;"),
            Err(CompileError::Semantic(_))
        ));
    }

    #[test]
    fn test_compile_reports_tokenize_errors() {
        assert!(matches!(
            compile("param p := \"open;"),
            Err(CompileError::Tokenize(_))
        ));
    }
}
