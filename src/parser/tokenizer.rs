use super::error::TokenizeError;
use super::locations::{Location, Span};
use const_format::concatcp;
use once_cell::sync::Lazy;
use regex::Regex;
use std::fs::File;
use std::io::{self, BufRead};
use std::path::Path;

#[derive(Clone, Default, Debug)]
pub struct Token {
    pub(crate) typ: TokenType,
    pub(crate) lexeme: String,
    pub(crate) span: Span,
}

impl std::fmt::Display for Token {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.typ {
            TokenType::ENDMARKER => write!(f, "end of input"),
            TokenType::STRING => write!(f, "\"{}\"", self.lexeme),
            _ => write!(f, "'{}'", self.lexeme),
        }
    }
}

#[allow(non_camel_case_types)]
#[allow(clippy::upper_case_acronyms)]
#[derive(Clone, Copy, PartialEq, Eq, Debug, Default)]
pub(crate) enum TokenType {
    ENDMARKER,
    NAME,
    NUMBER,
    STRING,
    KEYWORD,
    LPAR,
    RPAR,
    LSQB,
    RSQB,
    LBRACE,
    RBRACE,
    COLON,
    COLONEQUAL,
    COMMA,
    SEMI,
    PLUS,
    MINUS,
    STAR,
    DOUBLESTAR,
    SLASH,
    CIRCUMFLEX,
    EXCLAMATION,
    VBAR,
    LESS,
    GREATER,
    EQEQUAL,
    NOTEQUAL,
    LESSEQUAL,
    GREATEREQUAL,
    DOUBLEDOT,
    #[default]
    ERRORTOKEN,
}

impl TokenType {
    /// How the token kind shows up in an expected-token list.
    pub(crate) fn describe(&self) -> String {
        match self {
            Self::ENDMARKER => "end of input".to_string(),
            Self::NAME => "name".to_string(),
            Self::NUMBER => "number".to_string(),
            Self::STRING => "string".to_string(),
            Self::KEYWORD => "keyword".to_string(),
            Self::ERRORTOKEN => "valid token".to_string(),
            _ => SIMPLE_TOKENS
                .iter()
                .find(|(_, typ)| typ == self)
                .map_or("token".to_string(), |(lexeme, _)| format!("'{lexeme}'")),
        }
    }
}

const COLONEQUAL: (&str, TokenType) = (":=", TokenType::COLONEQUAL);
const DOUBLEDOT: (&str, TokenType) = ("..", TokenType::DOUBLEDOT);
const EQEQUAL: (&str, TokenType) = ("==", TokenType::EQEQUAL);
const NOTEQUAL: (&str, TokenType) = ("!=", TokenType::NOTEQUAL);
const LESSGREATER: (&str, TokenType) = ("<>", TokenType::NOTEQUAL);
const LESSEQUAL: (&str, TokenType) = ("<=", TokenType::LESSEQUAL);
const GREATEREQUAL: (&str, TokenType) = (">=", TokenType::GREATEREQUAL);
const DOUBLESTAR: (&str, TokenType) = ("**", TokenType::DOUBLESTAR);
const LPAR: (&str, TokenType) = ("(", TokenType::LPAR);
const RPAR: (&str, TokenType) = (")", TokenType::RPAR);
const LSQB: (&str, TokenType) = ("[", TokenType::LSQB);
const RSQB: (&str, TokenType) = ("]", TokenType::RSQB);
const LBRACE: (&str, TokenType) = ("{", TokenType::LBRACE);
const RBRACE: (&str, TokenType) = ("}", TokenType::RBRACE);
const COLON: (&str, TokenType) = (":", TokenType::COLON);
const COMMA: (&str, TokenType) = (",", TokenType::COMMA);
const SEMI: (&str, TokenType) = (";", TokenType::SEMI);
const PLUS: (&str, TokenType) = ("+", TokenType::PLUS);
const MINUS: (&str, TokenType) = ("-", TokenType::MINUS);
const STAR: (&str, TokenType) = ("*", TokenType::STAR);
const SLASH: (&str, TokenType) = ("/", TokenType::SLASH);
const CIRCUMFLEX: (&str, TokenType) = ("^", TokenType::CIRCUMFLEX);
const EXCLAMATION: (&str, TokenType) = ("!", TokenType::EXCLAMATION);
const VBAR: (&str, TokenType) = ("|", TokenType::VBAR);
const LESS: (&str, TokenType) = ("<", TokenType::LESS);
const GREATER: (&str, TokenType) = (">", TokenType::GREATER);

// Longer lexemes first, the table is scanned in order.
const SIMPLE_TOKENS: [(&str, TokenType); 26] = [
    COLONEQUAL,
    DOUBLEDOT,
    EQEQUAL,
    NOTEQUAL,
    LESSGREATER,
    LESSEQUAL,
    GREATEREQUAL,
    DOUBLESTAR,
    LPAR,
    RPAR,
    LSQB,
    RSQB,
    LBRACE,
    RBRACE,
    COLON,
    COMMA,
    SEMI,
    PLUS,
    MINUS,
    STAR,
    SLASH,
    CIRCUMFLEX,
    EXCLAMATION,
    VBAR,
    LESS,
    GREATER,
];

macro_rules! alternative {
    ($t:expr) => {{
        $t
    }};
    ($t:expr, $($ts:expr),+) => {{
        concatcp!($t, "|", alternative!($($ts),+))
    }}
}

macro_rules! group {
    ($($ts:expr),+) => {{
        concatcp!(r"(?:", alternative!($($ts),+), ")")
    }}
}

macro_rules! maybe {
    ($($ts:expr),+) => {
        concatcp!(group!($($ts),+), r"?")
    }
}

const S_WHITESPACE: &str = r"^[ \f\t\r]+";
const S_COMMENT: &str = r"^#[^\r\n]*";
const S_NAME: &str = r"^[A-Za-z_][A-Za-z0-9_]*";
const S_DIGITS: &str = r"[0-9]+";
const S_EXPONENT: &str = concatcp!(r"[eE][-+]?", S_DIGITS);
// `1..5` must lex as `1`, `..`, `5`, so a point needs a digit after it.
const S_POINTNUMBER: &str = group!(concatcp!(S_DIGITS, r"\.", S_DIGITS), concatcp!(r"\.", S_DIGITS), S_DIGITS);
const S_NUMBER: &str = concatcp!(r"^", S_POINTNUMBER, maybe!(S_EXPONENT));
const S_WHOLE_NUMBER: &str = concatcp!(S_NUMBER, "$");
const S_KEYWORDS: &str = r"^(?:and|argmax|argmin|as|abs|acos|asin|atan|binary|by|card|ceil|check|checkonly|comment|cos|cross|default|defbool|defnumb|defset|defstrg|div|do|else|end|exists|exp|floor|forall|if|implicit|in|indexset|indicator|infinity|integer|inter|length|ln|log|match|max|maximize|min|minimize|mod|not|or|ord|param|powerset|print|priority|prod|proj|random|read|real|round|scale|separate|set|sgn|sin|skip|sos|sqrt|startval|subsets|substr|subto|sum|symdiff|tan|then|to|type1|type2|union|until|use|vabs|var|vif|with|without|xor)\b";

static WHITESPACE: Lazy<Regex> =
    Lazy::new(|| Regex::new(S_WHITESPACE).expect("Error compiling regex."));
static COMMENT: Lazy<Regex> = Lazy::new(|| Regex::new(S_COMMENT).expect("Error compiling regex."));
static NAME: Lazy<Regex> = Lazy::new(|| Regex::new(S_NAME).expect("Error compiling regex."));
static NUMBER: Lazy<Regex> = Lazy::new(|| Regex::new(S_NUMBER).expect("Error compiling regex."));
pub(crate) static WHOLE_NUMBER: Lazy<Regex> =
    Lazy::new(|| Regex::new(S_WHOLE_NUMBER).expect("Error compiling regex."));
static KEYWORDS: Lazy<Regex> =
    Lazy::new(|| Regex::new(S_KEYWORDS).expect("Error compiling regex."));

pub struct Tokenizer {
    tokens: Vec<Token>,
    start: usize,
    last: Location,
}

impl Default for Tokenizer {
    fn default() -> Self {
        Self::new()
    }
}

impl Tokenizer {
    pub fn new() -> Self {
        Self {
            tokens: vec![],
            start: 0,
            last: Location::default(),
        }
    }

    pub fn tokenize(&mut self, input: impl Iterator<Item = String>) -> Result<(), TokenizeError> {
        for (lineno, line) in input.enumerate() {
            self.tokenize_line(line.as_str(), lineno + 1)?;
        }
        Ok(())
    }

    pub fn finalize(mut self) -> Vec<Token> {
        let Location { line, column } = self.last.clone();
        self.tokens.push(Token {
            typ: TokenType::ENDMARKER,
            lexeme: "".to_string(),
            span: Span::new(line, column, line, column),
        });
        self.tokens
    }

    fn tokenize_line(&mut self, line: &str, lineno: usize) -> Result<(), TokenizeError> {
        self.start = 0;
        while self.start < line.len() {
            let rest = &line[self.start..];
            if COMMENT.is_match(rest) {
                break;
            }
            if let Some(m) = WHITESPACE.find(rest) {
                self.start += m.end();
                continue;
            }
            if rest.starts_with('"') {
                self.string(line, lineno)?;
                continue;
            }
            if self.find_by_regex(&KEYWORDS, TokenType::KEYWORD, line, lineno)
                || self.find_by_regex(&NUMBER, TokenType::NUMBER, line, lineno)
                || self.find_by_regex(&NAME, TokenType::NAME, line, lineno)
            {
                continue;
            }
            match SIMPLE_TOKENS.iter().find(|(lexeme, _)| rest.starts_with(lexeme)) {
                Some((lexeme, typ)) => {
                    let end = self.start + lexeme.len();
                    self.push(*typ, lexeme.to_string(), lineno, end);
                }
                None => {
                    return Err(TokenizeError::UnexpectedCharacter {
                        character: rest.chars().next().unwrap_or(' '),
                        location: Location {
                            line: lineno,
                            column: self.start + 1,
                        },
                    })
                }
            }
        }
        self.last = Location {
            line: lineno,
            column: line.len() + 1,
        };
        Ok(())
    }

    fn string(&mut self, line: &str, lineno: usize) -> Result<(), TokenizeError> {
        let mut value = String::new();
        let mut escaped = false;
        for (offset, chr) in line[self.start + 1..].char_indices() {
            if escaped {
                value.push(match chr {
                    'n' => '\n',
                    't' => '\t',
                    other => other,
                });
                escaped = false;
            } else if chr == '\\' {
                escaped = true;
            } else if chr == '"' {
                let end = self.start + 1 + offset + 1;
                self.push(TokenType::STRING, value, lineno, end);
                return Ok(());
            } else {
                value.push(chr);
            }
        }
        Err(TokenizeError::UnterminatedString(Location {
            line: lineno,
            column: self.start + 1,
        }))
    }

    fn push(&mut self, typ: TokenType, lexeme: String, lineno: usize, end: usize) {
        self.tokens.push(Token {
            typ,
            lexeme,
            span: Span::new(lineno, self.start + 1, lineno, end + 1),
        });
        self.start = end;
    }

    fn find_by_regex(&mut self, regex: &Regex, token_type: TokenType, line: &str, lineno: usize) -> bool {
        if let Some(m) = regex.find(&line[self.start..]) {
            let end = self.start + m.end();
            self.push(token_type, m.as_str().to_string(), lineno, end);
            return true;
        }
        false
    }
}

pub fn tokenize_string(input: &str) -> Result<Vec<Token>, TokenizeError> {
    let mut tokenizer = Tokenizer::new();
    tokenizer.tokenize(input.lines().map(str::to_string))?;
    Ok(tokenizer.finalize())
}

pub fn tokenize_file<P>(path: P) -> Result<Vec<Token>, TokenizeError>
where
    P: AsRef<Path>,
{
    let lines = read_lines(&path)?;
    let mut tokenizer = Tokenizer::new();
    tokenizer.tokenize(lines.map_while(Result::ok))?;
    Ok(tokenizer.finalize())
}

fn read_lines<P>(filename: P) -> io::Result<io::Lines<io::BufReader<File>>>
where
    P: AsRef<Path>,
{
    let file = File::open(filename)?;
    Ok(io::BufReader::new(file).lines())
}
