// # ========================= START OF THE GRAMMAR =========================
//
// # General grammatical elements and rules:
// #
// # * Strings with single quotes (') denote KEYWORDS or punctuation
// # * Upper case names (NAME, NUMBER, STRING) denote token kinds
// # * Every statement ends in ';'. A statement that fails to parse is reported
// #   at the furthest token any alternative reached, and parsing resumes after
// #   the next ';'.
// #
// # Grammar Syntax:
// #
// # e1 e2       Match e1, then match e2.
// # e1 | e2     Match e1 or e2, first match wins (PEG ordered choice).
// # [ e ]       Optionally match e.
// # e*          Match zero or more occurrences of e.
// # e+          Match one or more occurrences of e.
// # s.e+        One or more e separated by s.

use std::cell::RefCell;

use super::ast::*;
use super::combinators::*;
use super::error::SyntaxError;
use super::memo::{memoized, ParserCache};
use super::tokenizer::{Token, TokenType as TT};
use crate::interpreter::numeric::parse_decimal;

/// Parses a whole token stream, collecting one error per broken statement.
pub fn parse(input: &[Token]) -> (Program, Vec<SyntaxError>) {
    let diagnostics = RefCell::new(Diagnostics::default());
    let cache = RefCell::new(ParserCache::new());
    let state = ParserState::new(&diagnostics, &cache);
    let mut rest = ParserInput::new(input, state);
    let mut statements = vec![];
    let mut errors = vec![];
    while !rest.at_end() {
        match statement(rest) {
            ParseResult::Ok((stmt, next)) => {
                statements.push(stmt);
                rest = next;
            }
            ParseResult::Err => {
                errors.push(state.syntax_error(rest));
                rest = rest.recover();
            }
        }
        state.reset();
    }
    (Program { statements }, errors)
}

// # STATEMENTS
// # ==========

// statement: command ';'
fn statement(input: ParserInput) -> ParseResult<Statement> {
    left(command, tok(TT::SEMI)).parse(input)
}

// command:
//     | set_decl
//     | param_decl
//     | var_decl
//     | objective
//     | subto_decl
//     | sos_decl
//     | define_decl
//     | 'do' do_command
//     | print_cmd
//     | check_cmd
fn command(input: ParserInput) -> ParseResult<Statement> {
    set_decl
        .or(param_decl)
        .or(var_decl)
        .or(objective)
        .or(subto_decl)
        .or(sos_decl)
        .or(define_decl)
        .or(right(kw("do"), do_command))
        .or(print_cmd)
        .or(check_cmd)
        .parse(input)
}

// do_command: forall_cmd | print_cmd | check_cmd
fn do_command(input: ParserInput) -> ParseResult<Statement> {
    forall_cmd.or(print_cmd).or(check_cmd).parse(input)
}

// forall_cmd: 'forall' idxset do_sep (forall_cmd | command)
fn forall_cmd(input: ParserInput) -> ParseResult<Statement> {
    pair(kw("forall"), pair(left(idxset, do_sep), forall_cmd.or(command)))
        .map(|(start, (index, body))| {
            let span = start.span.till(&body);
            Statement::Forall(index, Box::new(body), span)
        })
        .parse(input)
}

// do_sep: 'do' | ':'
fn do_sep(input: ParserInput) -> ParseResult<()> {
    kw("do").or(tok(TT::COLON)).discard().parse(input)
}

// print_cmd: 'print' ','.expr+
fn print_cmd(input: ParserInput) -> ParseResult<Statement> {
    spanned(right(kw("print"), sep_by(expr, TT::COMMA)))
        .map(|(items, span)| Statement::Print(items, span))
        .parse(input)
}

// check_cmd: 'check' expr
fn check_cmd(input: ParserInput) -> ParseResult<Statement> {
    spanned(right(kw("check"), expr))
        .map(|(predicate, span)| Statement::Check(predicate, span))
        .parse(input)
}

fn name(input: ParserInput) -> ParseResult<Name> {
    tok(TT::NAME).map(Name::from).parse(input)
}

// decl_index: '[' [idxset] ']'
fn decl_index(input: ParserInput) -> ParseResult<Option<IndexSet>> {
    left(right(tok(TT::LSQB), maybe(idxset)), tok(TT::RSQB)).parse(input)
}

// set_decl: 'set' NAME [decl_index] ':=' set_body
fn set_decl(input: ParserInput) -> ParseResult<Statement> {
    spanned(pair(
        right(kw("set"), name),
        pair(left(maybe(decl_index), tok(TT::COLONEQUAL)), set_body),
    ))
    .map(|((name, (index, body)), span)| {
        Statement::Set(SetDecl {
            name,
            index: index.flatten(),
            body,
            span,
        })
    })
    .parse(input)
}

// set_body:
//     | 'subsets' '(' expr ',' expr [',' expr] ')'
//     | 'powerset' '(' expr ')'
//     | ','.set_entry+
//     | expr
fn set_body(input: ParserInput) -> ParseResult<SetBody> {
    subsets
        .or(right(kw("powerset"), parenthesized).map(SetBody::Powerset))
        .or(sep_by(set_entry, TT::COMMA).map(SetBody::Entries))
        .or(expr.map(SetBody::Expr))
        .parse(input)
}

fn subsets(input: ParserInput) -> ParseResult<SetBody> {
    right(
        pair(kw("subsets"), tok(TT::LPAR)),
        pair(
            expr,
            pair(
                right(tok(TT::COMMA), expr),
                left(maybe(right(tok(TT::COMMA), expr)), tok(TT::RPAR)),
            ),
        ),
    )
    .map(|(set, (size, max_size))| SetBody::Subsets {
        set,
        size,
        max_size,
    })
    .parse(input)
}

// set_entry: tuple union_expr
fn set_entry(input: ParserInput) -> ParseResult<(Expr, Expr)> {
    pair(tuple, union_expr).parse(input)
}

// param_decl: 'param' NAME [decl_index] [':=' param_body] ['default' expr]
fn param_decl(input: ParserInput) -> ParseResult<Statement> {
    spanned(pair(
        right(kw("param"), name),
        pair(
            maybe(decl_index),
            pair(
                maybe(right(tok(TT::COLONEQUAL), param_body)),
                maybe(right(kw("default"), expr)),
            ),
        ),
    ))
    .map(|((name, (index, (body, default))), span)| {
        Statement::Param(ParamDecl {
            name,
            index: index.flatten(),
            body: body.unwrap_or(ParamBody::Empty),
            default,
            span,
        })
    })
    .parse(input)
}

// param_body: read_spec | matrix | ','.param_entry+ | expr
fn param_body(input: ParserInput) -> ParseResult<ParamBody> {
    read_spec
        .map(ParamBody::Read)
        .or(matrix)
        .or(sep_by(param_entry, TT::COMMA).map(ParamBody::Entries))
        .or(expr.map(ParamBody::Expr))
        .parse(input)
}

// param_entry: tuple additive
fn param_entry(input: ParserInput) -> ParseResult<(Expr, Expr)> {
    pair(tuple, additive).parse(input)
}

// matrix: '|' ','.additive+ '|' matrix_row+
fn matrix(input: ParserInput) -> ParseResult<ParamBody> {
    pair(
        right(tok(TT::VBAR), left(additive_list, tok(TT::VBAR))),
        one_or_more(matrix_row),
    )
    .map(|(columns, rows)| ParamBody::Matrix { columns, rows })
    .parse(input)
}

// matrix_row: '|' ','.additive+ '|' ','.additive+ '|'
fn matrix_row(input: ParserInput) -> ParseResult<(Vec<Expr>, Vec<Expr>)> {
    pair(
        right(tok(TT::VBAR), left(additive_list, tok(TT::VBAR))),
        left(additive_list, tok(TT::VBAR)),
    )
    .parse(input)
}

fn additive_list(input: ParserInput) -> ParseResult<Vec<Expr>> {
    sep_by(additive, TT::COMMA).parse(input)
}

enum VarAttr {
    Lower(Expr),
    Upper(Expr),
    Priority(Expr),
    Startval(Expr),
}

static VAR_TYPES: [(TT, &str, VarType); 3] = [
    (TT::KEYWORD, "real", VarType::Real),
    (TT::KEYWORD, "integer", VarType::Integer),
    (TT::KEYWORD, "binary", VarType::Binary),
];

static IMPLICIT_TYPES: [(TT, &str, VarType); 2] = [
    (TT::KEYWORD, "integer", VarType::ImplicitInteger),
    (TT::KEYWORD, "binary", VarType::ImplicitBinary),
];

// var_decl: 'var' NAME [decl_index] [var_type] var_attr*
// var_type: 'real' | 'integer' | 'binary' | 'implicit' ('integer' | 'binary')
fn var_decl(input: ParserInput) -> ParseResult<Statement> {
    spanned(pair(
        right(kw("var"), name),
        pair(
            maybe(decl_index),
            pair(
                maybe(one_of(&VAR_TYPES).or(right(kw("implicit"), one_of(&IMPLICIT_TYPES)))),
                zero_or_more(var_attr),
            ),
        ),
    ))
    .map(|((name, (index, (typ, attrs))), span)| {
        let mut decl = VarDecl {
            name,
            index: index.flatten(),
            typ: typ.unwrap_or(VarType::Real),
            lower: None,
            upper: None,
            priority: None,
            startval: None,
            span,
        };
        for attr in attrs {
            match attr {
                VarAttr::Lower(e) => decl.lower = Some(e),
                VarAttr::Upper(e) => decl.upper = Some(e),
                VarAttr::Priority(e) => decl.priority = Some(e),
                VarAttr::Startval(e) => decl.startval = Some(e),
            }
        }
        Statement::Var(decl)
    })
    .parse(input)
}

// var_attr: '>=' additive | '<=' additive | 'priority' additive | 'startval' additive
fn var_attr(input: ParserInput) -> ParseResult<VarAttr> {
    right(tok(TT::GREATEREQUAL), additive)
        .map(VarAttr::Lower)
        .or(right(tok(TT::LESSEQUAL), additive).map(VarAttr::Upper))
        .or(right(kw("priority"), additive).map(VarAttr::Priority))
        .or(right(kw("startval"), additive).map(VarAttr::Startval))
        .parse(input)
}

static SENSES: [(TT, &str, Sense); 4] = [
    (TT::KEYWORD, "minimize", Sense::Minimize),
    (TT::KEYWORD, "min", Sense::Minimize),
    (TT::KEYWORD, "maximize", Sense::Maximize),
    (TT::KEYWORD, "max", Sense::Maximize),
];

// objective: ('minimize' | 'min' | 'maximize' | 'max') NAME ':' union_expr
fn objective(input: ParserInput) -> ParseResult<Statement> {
    spanned(pair(one_of(&SENSES), pair(left(name, tok(TT::COLON)), union_expr)))
        .map(|((sense, (name, term)), span)| {
            Statement::Objective(ObjectiveDecl {
                sense,
                name,
                term,
                span,
            })
        })
        .parse(input)
}

// subto_decl: 'subto' NAME ':' constraint_list
fn subto_decl(input: ParserInput) -> ParseResult<Statement> {
    spanned(pair(right(kw("subto"), left(name, tok(TT::COLON))), constraint_list))
        .map(|((name, body), span)| Statement::Subto(SubtoDecl { name, body, span }))
        .parse(input)
}

// constraint_list: 'and'.constraint_item+
fn constraint_list(input: ParserInput) -> ParseResult<Constraint> {
    sep_by_keyword(constraint_item, "and")
        .map(|mut items| {
            if items.len() == 1 {
                items.remove(0)
            } else {
                Constraint::And(items)
            }
        })
        .parse(input)
}

fn sep_by_keyword<'a, R: 'a>(
    parser: impl Parser<'a, R> + Copy + 'a,
    word: &'static str,
) -> impl Parser<'a, Vec<R>> {
    pair(parser, zero_or_more(right(kw(word), parser))).map(|(first, rest)| {
        let mut items = vec![first];
        items.extend(rest);
        items
    })
}

// constraint_item:
//     | 'forall' idxset do_sep constraint_list
//     | 'if' expr 'then' constraint_list ['else' constraint_list] 'end'
//     | vif
//     | relation
fn constraint_item(input: ParserInput) -> ParseResult<Constraint> {
    constraint_forall
        .or(constraint_if)
        .or(vif)
        .or(relation)
        .parse(input)
}

fn constraint_forall(input: ParserInput) -> ParseResult<Constraint> {
    pair(right(kw("forall"), left(idxset, do_sep)), constraint_list)
        .map(|(index, body)| Constraint::Forall(index, Box::new(body)))
        .parse(input)
}

fn constraint_if(input: ParserInput) -> ParseResult<Constraint> {
    pair(
        right(kw("if"), left(expr, kw("then"))),
        pair(
            constraint_list,
            left(maybe(right(kw("else"), constraint_list)), kw("end")),
        ),
    )
    .map(|(condition, (then, otherwise))| Constraint::If {
        condition,
        then: Box::new(then),
        otherwise: otherwise.map(Box::new),
    })
    .parse(input)
}

// vif: 'vif' expr 'then' vif_branch ['else' vif_branch] 'end' con_flags
fn vif(input: ParserInput) -> ParseResult<Constraint> {
    pair(
        right(kw("vif"), left(expr, kw("then"))),
        pair(
            vif_branch,
            pair(
                left(maybe(right(kw("else"), vif_branch)), kw("end")),
                con_flags,
            ),
        ),
    )
    .map(|(condition, (then, (otherwise, flags)))| Constraint::Vif {
        condition,
        then,
        otherwise,
        flags,
    })
    .parse(input)
}

// vif_branch: union_expr con_rel union_expr
fn vif_branch(input: ParserInput) -> ParseResult<VifBranch> {
    pair(union_expr, pair(con_rel, union_expr))
        .map(|(lhs, (rel, rhs))| VifBranch { lhs, rel, rhs })
        .parse(input)
}

// relation: union_expr con_rel union_expr [con_rel union_expr] con_flags
fn relation(input: ParserInput) -> ParseResult<Constraint> {
    pair(
        union_expr,
        pair(
            con_rel,
            pair(union_expr, pair(maybe(pair(con_rel, union_expr)), con_flags)),
        ),
    )
    .map(|(lhs, (rel, (mid, (range, flags))))| match range {
        None => Constraint::Plain {
            lhs,
            rel,
            rhs: mid,
            flags,
        },
        Some((upper_rel, high)) => Constraint::Range {
            low: lhs,
            lower_rel: rel,
            term: mid,
            upper_rel,
            high,
            flags,
        },
    })
    .parse(input)
}

static CON_RELS: [(TT, &str, ConRel); 3] = [
    (TT::LESSEQUAL, "<=", ConRel::Le),
    (TT::GREATEREQUAL, ">=", ConRel::Ge),
    (TT::EQEQUAL, "==", ConRel::Eq),
];

// con_rel: '<=' | '>=' | '=='
fn con_rel(input: ParserInput) -> ParseResult<ConRel> {
    one_of(&CON_RELS).parse(input)
}

static CON_FLAGS: [(TT, &str, u8); 4] = [
    (TT::KEYWORD, "scale", ConFlags::SCALE),
    (TT::KEYWORD, "separate", ConFlags::SEPARATE),
    (TT::KEYWORD, "checkonly", ConFlags::CHECKONLY),
    (TT::KEYWORD, "indicator", ConFlags::INDICATOR),
];

// con_flags: (',' ('scale' | 'separate' | 'checkonly' | 'indicator'))*
fn con_flags(input: ParserInput) -> ParseResult<ConFlags> {
    zero_or_more(right(tok(TT::COMMA), one_of(&CON_FLAGS)))
        .map(|bits| ConFlags(bits.into_iter().fold(0, |acc, bit| acc | bit)))
        .parse(input)
}

static SOS_TYPES: [(TT, &str, SosType); 2] = [
    (TT::KEYWORD, "type1", SosType::One),
    (TT::KEYWORD, "type2", SosType::Two),
];

type SosParts = (Name, Option<SosType>, Option<Expr>, SosBody);

// sos_decl:
//     | 'sos' NAME ':' [sos_type] ['priority' additive] [':'] sos_body
//     | 'sos' sos_type ':' NAME ':' sos_body
fn sos_decl(input: ParserInput) -> ParseResult<Statement> {
    spanned(right(kw("sos"), named_sos.or(typed_sos)))
        .map(|((name, typ, priority, body), span)| {
            Statement::Sos(SosDecl {
                name,
                typ: typ.unwrap_or(SosType::One),
                priority,
                body,
                span,
            })
        })
        .parse(input)
}

fn named_sos(input: ParserInput) -> ParseResult<SosParts> {
    pair(
        left(name, tok(TT::COLON)),
        pair(
            maybe(one_of(&SOS_TYPES)),
            pair(
                maybe(right(kw("priority"), additive)),
                right(maybe(tok(TT::COLON)), sos_body),
            ),
        ),
    )
    .map(|(name, (typ, (priority, body)))| (name, typ, priority, body))
    .parse(input)
}

fn typed_sos(input: ParserInput) -> ParseResult<SosParts> {
    pair(
        left(one_of(&SOS_TYPES), tok(TT::COLON)),
        pair(left(name, tok(TT::COLON)), sos_body),
    )
    .map(|(typ, (name, body))| (name, Some(typ), None, body))
    .parse(input)
}

// sos_body:
//     | 'forall' idxset do_sep sos_body
//     | ','.(additive ':' additive)+
//     | union_expr
fn sos_body(input: ParserInput) -> ParseResult<SosBody> {
    pair(right(kw("forall"), left(idxset, do_sep)), sos_body)
        .map(|(index, body)| SosBody::Forall(index, Box::new(body)))
        .or(sep_by(pair(additive, right(tok(TT::COLON), additive)), TT::COMMA).map(SosBody::Weighted))
        .or(union_expr.map(SosBody::Term))
        .parse(input)
}

static DEFINE_KINDS: [(TT, &str, DefineKind); 4] = [
    (TT::KEYWORD, "defnumb", DefineKind::Numb),
    (TT::KEYWORD, "defstrg", DefineKind::Strg),
    (TT::KEYWORD, "defbool", DefineKind::Bool),
    (TT::KEYWORD, "defset", DefineKind::Set),
];

// define_decl: ('defnumb' | 'defstrg' | 'defbool' | 'defset') NAME '(' [','.NAME+] ')' ':=' expr
fn define_decl(input: ParserInput) -> ParseResult<Statement> {
    spanned(pair(
        pair(one_of(&DEFINE_KINDS), name),
        pair(
            left(
                right(tok(TT::LPAR), maybe(sep_by(name, TT::COMMA))),
                pair(tok(TT::RPAR), tok(TT::COLONEQUAL)),
            ),
            expr,
        ),
    ))
    .map(|(((kind, name), (params, body)), span)| {
        Statement::Define(DefineDecl {
            kind,
            name,
            params: params.unwrap_or_default(),
            body,
            span,
        })
    })
    .parse(input)
}

// # INDEX SETS
// # ==========

// idxset: [pattern 'in'] union_expr ['with' expr]
// pattern: tuple | NAME
fn idxset(input: ParserInput) -> ParseResult<IndexSet> {
    memoized(input, idxset_uncached)
}

fn idxset_uncached(input: ParserInput) -> ParseResult<IndexSet> {
    spanned(pair(
        maybe(left(pattern, kw("in"))),
        pair(union_expr, maybe(right(kw("with"), expr))),
    ))
    .map(|((pattern, (set, condition)), span)| IndexSet {
        pattern,
        set: Box::new(set),
        condition: condition.map(Box::new),
        span,
    })
    .parse(input)
}

fn pattern(input: ParserInput) -> ParseResult<Vec<Expr>> {
    tuple_items
        .or(name_expr.map(|e| vec![e]))
        .parse(input)
}

// # EXPRESSIONS
// # ===========

fn binary(op: BinOp, lhs: Expr, rhs: Expr) -> Expr {
    let span = lhs.span.till(&rhs);
    Expr::new(ExprKind::Binary(op, Box::new(lhs), Box::new(rhs)), span)
}

fn fold_binary((first, rest): (Expr, Vec<(BinOp, Expr)>)) -> Expr {
    rest.into_iter()
        .fold(first, |lhs, (op, rhs)| binary(op, lhs, rhs))
}

// expr: or_expr
pub(super) fn expr(input: ParserInput) -> ParseResult<Expr> {
    memoized(input, or_expr)
}

static OR_OPS: [(TT, &str, BinOp); 2] = [
    (TT::KEYWORD, "or", BinOp::Or),
    (TT::KEYWORD, "xor", BinOp::Xor),
];

// or_expr: and_expr (('or' | 'xor') and_expr)*
fn or_expr(input: ParserInput) -> ParseResult<Expr> {
    pair(and_expr, zero_or_more(pair(one_of(&OR_OPS), and_expr)))
        .map(fold_binary)
        .parse(input)
}

static AND_OPS: [(TT, &str, BinOp); 1] = [(TT::KEYWORD, "and", BinOp::And)];

// and_expr: not_expr ('and' not_expr)*
fn and_expr(input: ParserInput) -> ParseResult<Expr> {
    pair(not_expr, zero_or_more(pair(one_of(&AND_OPS), not_expr)))
        .map(fold_binary)
        .parse(input)
}

// not_expr: 'not' not_expr | comparison
fn not_expr(input: ParserInput) -> ParseResult<Expr> {
    pair(kw("not"), not_expr)
        .map(|(start, e)| {
            let span = start.span.till(&e);
            Expr::new(ExprKind::Unary(UnOp::Not, Box::new(e)), span)
        })
        .or(comparison)
        .parse(input)
}

static COMPARE_OPS: [(TT, &str, BinOp); 8] = [
    (TT::EQEQUAL, "==", BinOp::Eq),
    (TT::NOTEQUAL, "!=", BinOp::Ne),
    (TT::NOTEQUAL, "<>", BinOp::Ne),
    (TT::LESSEQUAL, "<=", BinOp::Le),
    (TT::GREATEREQUAL, ">=", BinOp::Ge),
    (TT::LESS, "<", BinOp::Lt),
    (TT::GREATER, ">", BinOp::Gt),
    (TT::KEYWORD, "in", BinOp::In),
];

// comparison: union_expr [compare_op union_expr]
fn comparison(input: ParserInput) -> ParseResult<Expr> {
    pair(union_expr, maybe(pair(one_of(&COMPARE_OPS), union_expr)))
        .map(|(lhs, rhs)| match rhs {
            Some((op, rhs)) => binary(op, lhs, rhs),
            None => lhs,
        })
        .parse(input)
}

static UNION_OPS: [(TT, &str, BinOp); 3] = [
    (TT::KEYWORD, "union", BinOp::Union),
    (TT::KEYWORD, "symdiff", BinOp::SymDiff),
    (TT::KEYWORD, "without", BinOp::Without),
];

// union_expr: inter_expr (('union' | 'symdiff' | 'without') inter_expr)*
fn union_expr(input: ParserInput) -> ParseResult<Expr> {
    memoized(input, union_expr_uncached)
}

fn union_expr_uncached(input: ParserInput) -> ParseResult<Expr> {
    pair(inter_expr, zero_or_more(pair(one_of(&UNION_OPS), inter_expr)))
        .map(fold_binary)
        .parse(input)
}

static INTER_OPS: [(TT, &str, BinOp); 2] = [
    (TT::KEYWORD, "inter", BinOp::Inter),
    (TT::KEYWORD, "cross", BinOp::Cross),
];

// inter_expr: additive (('inter' | 'cross') additive)*
fn inter_expr(input: ParserInput) -> ParseResult<Expr> {
    pair(additive, zero_or_more(pair(one_of(&INTER_OPS), additive)))
        .map(fold_binary)
        .parse(input)
}

static ADDITIVE_OPS: [(TT, &str, BinOp); 2] = [
    (TT::PLUS, "+", BinOp::Add),
    (TT::MINUS, "-", BinOp::Sub),
];

// additive: multiplicative (('+' | '-') multiplicative)*
fn additive(input: ParserInput) -> ParseResult<Expr> {
    memoized(input, additive_uncached)
}

fn additive_uncached(input: ParserInput) -> ParseResult<Expr> {
    pair(multiplicative, zero_or_more(pair(one_of(&ADDITIVE_OPS), multiplicative)))
        .map(fold_binary)
        .parse(input)
}

static MULTIPLICATIVE_OPS: [(TT, &str, BinOp); 4] = [
    (TT::STAR, "*", BinOp::Mul),
    (TT::SLASH, "/", BinOp::Div),
    (TT::KEYWORD, "mod", BinOp::Mod),
    (TT::KEYWORD, "div", BinOp::IntDiv),
];

// multiplicative: unary (('*' | '/' | 'mod' | 'div') unary)*
fn multiplicative(input: ParserInput) -> ParseResult<Expr> {
    pair(unary, zero_or_more(pair(one_of(&MULTIPLICATIVE_OPS), unary)))
        .map(fold_binary)
        .parse(input)
}

// unary: '-' unary | '+' unary | power
fn unary(input: ParserInput) -> ParseResult<Expr> {
    pair(tok(TT::MINUS), unary)
        .map(|(start, e)| {
            let span = start.span.till(&e);
            Expr::new(ExprKind::Unary(UnOp::Neg, Box::new(e)), span)
        })
        .or(right(tok(TT::PLUS), unary))
        .or(power)
        .parse(input)
}

static POWER_OPS: [(TT, &str, BinOp); 2] = [
    (TT::CIRCUMFLEX, "^", BinOp::Pow),
    (TT::DOUBLESTAR, "**", BinOp::Pow),
];

// power: postfix [('^' | '**') unary]
fn power(input: ParserInput) -> ParseResult<Expr> {
    pair(postfix, maybe(pair(one_of(&POWER_OPS), unary)))
        .map(|(base, exponent)| match exponent {
            Some((op, exponent)) => binary(op, base, exponent),
            None => base,
        })
        .parse(input)
}

// postfix: primary '!'*
fn postfix(input: ParserInput) -> ParseResult<Expr> {
    pair(primary, zero_or_more(tok(TT::EXCLAMATION)))
        .map(|(e, bangs)| {
            bangs.into_iter().fold(e, |e, bang| {
                let span = e.span.till(&bang);
                Expr::new(ExprKind::Unary(UnOp::Factorial, Box::new(e)), span)
            })
        })
        .parse(input)
}

// primary:
//     | NUMBER
//     | STRING
//     | 'infinity'
//     | '(' expr ')'
//     | tuple
//     | braces
//     | if_expr
//     | builtin_call
//     | aggregate
//     | arg_extremum
//     | indexed_set_op
//     | 'exists' '(' idxset ')'
//     | 'proj' '(' expr ',' expr ')'
//     | 'indexset' '(' NAME ')'
//     | read_spec
//     | NAME arguments
//     | NAME '[' ','.expr+ ']'
//     | NAME
fn primary(input: ParserInput) -> ParseResult<Expr> {
    number
        .or(string)
        .or(kw("infinity").map(|t| Expr::new(ExprKind::Infinity, t.span)))
        .or(parenthesized)
        .or(tuple)
        .or(braces)
        .or(if_expr)
        .or(builtin_call)
        .or(aggregate)
        .or(arg_extremum)
        .or(indexed_set_op)
        .or(exists)
        .or(proj)
        .or(indexset_of)
        .or(spanned(read_spec).map(|(spec, span)| Expr::new(ExprKind::Read(spec), span)))
        .or(call)
        .or(subscript)
        .or(name_expr)
        .parse(input)
}

fn number(input: ParserInput) -> ParseResult<Expr> {
    tok(TT::NUMBER)
        .parse(input)
        .and_then(|(t, rest)| match parse_decimal(&t.lexeme) {
            Some(value) => ParseResult::Ok((Expr::new(ExprKind::Number(value), t.span), rest)),
            None => ParseResult::Err,
        })
}

fn string(input: ParserInput) -> ParseResult<Expr> {
    tok(TT::STRING)
        .map(|t| Expr::new(ExprKind::Str(t.lexeme), t.span))
        .parse(input)
}

fn name_expr(input: ParserInput) -> ParseResult<Expr> {
    tok(TT::NAME)
        .map(|t| Expr::new(ExprKind::Name(t.lexeme), t.span))
        .parse(input)
}

fn parenthesized(input: ParserInput) -> ParseResult<Expr> {
    left(right(tok(TT::LPAR), expr), tok(TT::RPAR)).parse(input)
}

// arguments: '(' [','.expr+] ')'
fn arguments(input: ParserInput) -> ParseResult<Vec<Expr>> {
    left(right(tok(TT::LPAR), maybe(sep_by(expr, TT::COMMA))), tok(TT::RPAR))
        .map(|args| args.unwrap_or_default())
        .parse(input)
}

fn call(input: ParserInput) -> ParseResult<Expr> {
    spanned(pair(tok(TT::NAME), arguments))
        .map(|((name, args), span)| Expr::new(ExprKind::Call(name.lexeme, args), span))
        .parse(input)
}

fn subscript(input: ParserInput) -> ParseResult<Expr> {
    spanned(pair(
        tok(TT::NAME),
        left(right(tok(TT::LSQB), sep_by(expr, TT::COMMA)), tok(TT::RSQB)),
    ))
    .map(|((name, args), span)| Expr::new(ExprKind::Subscript(name.lexeme, args), span))
    .parse(input)
}

// tuple: '<' [','.additive+] '>' | '<>'
fn tuple(input: ParserInput) -> ParseResult<Expr> {
    spanned(tuple_items)
        .map(|(items, span)| Expr::new(ExprKind::Tuple(items), span))
        .parse(input)
}

fn tuple_items(input: ParserInput) -> ParseResult<Vec<Expr>> {
    left(
        right(tok(TT::LESS), maybe(sep_by(additive, TT::COMMA))),
        tok(TT::GREATER),
    )
    .map(|items| items.unwrap_or_default())
    .or(token(TT::NOTEQUAL, "<>").map(|_| vec![]))
    .parse(input)
}

static RANGE_KINDS: [(TT, &str, RangeKind); 3] = [
    (TT::DOUBLEDOT, "..", RangeKind::Inclusive),
    (TT::KEYWORD, "to", RangeKind::Inclusive),
    (TT::KEYWORD, "until", RangeKind::Exclusive),
];

// braces:
//     | '{' additive ('..' | 'to' | 'until') additive ['by' additive] '}'
//     | '{' pattern 'in' idxset [do_sep expr] '}'
//     | '{' [','.additive+] '}'
fn braces(input: ParserInput) -> ParseResult<Expr> {
    spanned(right(tok(TT::LBRACE), left(brace_contents, tok(TT::RBRACE))))
        .map(|(kind, span)| Expr::new(kind, span))
        .parse(input)
}

fn brace_contents(input: ParserInput) -> ParseResult<ExprKind> {
    range_contents
        .or(builder_contents)
        .or(maybe(additive_list).map(|items| ExprKind::SetLiteral(items.unwrap_or_default())))
        .parse(input)
}

fn range_contents(input: ParserInput) -> ParseResult<ExprKind> {
    pair(
        additive,
        pair(
            one_of(&RANGE_KINDS),
            pair(additive, maybe(right(kw("by"), additive))),
        ),
    )
    .map(|(from, (kind, (to, step)))| ExprKind::Range {
        from: Box::new(from),
        to: Box::new(to),
        step: step.map(Box::new),
        kind,
    })
    .parse(input)
}

fn builder_contents(input: ParserInput) -> ParseResult<ExprKind> {
    pair(
        pred(idxset, |index: &IndexSet| index.pattern.is_some()),
        maybe(right(do_sep, expr)),
    )
    .map(|(index, body)| ExprKind::SetBuilder(index, body.map(Box::new)))
    .parse(input)
}

// if_expr: 'if' expr 'then' expr 'else' expr 'end'
fn if_expr(input: ParserInput) -> ParseResult<Expr> {
    spanned(pair(
        right(kw("if"), expr),
        pair(
            right(kw("then"), expr),
            left(right(kw("else"), expr), kw("end")),
        ),
    ))
    .map(|((condition, (then, otherwise)), span)| {
        Expr::new(
            ExprKind::If(Box::new(condition), Box::new(then), Box::new(otherwise)),
            span,
        )
    })
    .parse(input)
}

static BUILTINS: [(TT, &str, Builtin); 23] = [
    (TT::KEYWORD, "card", Builtin::Card),
    (TT::KEYWORD, "abs", Builtin::Abs),
    (TT::KEYWORD, "sgn", Builtin::Sgn),
    (TT::KEYWORD, "round", Builtin::Round),
    (TT::KEYWORD, "floor", Builtin::Floor),
    (TT::KEYWORD, "ceil", Builtin::Ceil),
    (TT::KEYWORD, "log", Builtin::Log),
    (TT::KEYWORD, "ln", Builtin::Ln),
    (TT::KEYWORD, "exp", Builtin::Exp),
    (TT::KEYWORD, "sqrt", Builtin::Sqrt),
    (TT::KEYWORD, "sin", Builtin::Sin),
    (TT::KEYWORD, "cos", Builtin::Cos),
    (TT::KEYWORD, "tan", Builtin::Tan),
    (TT::KEYWORD, "asin", Builtin::Asin),
    (TT::KEYWORD, "acos", Builtin::Acos),
    (TT::KEYWORD, "atan", Builtin::Atan),
    (TT::KEYWORD, "length", Builtin::Length),
    (TT::KEYWORD, "substr", Builtin::Substr),
    (TT::KEYWORD, "random", Builtin::Random),
    (TT::KEYWORD, "ord", Builtin::Ord),
    (TT::KEYWORD, "min", Builtin::Min),
    (TT::KEYWORD, "max", Builtin::Max),
    (TT::KEYWORD, "vabs", Builtin::Vabs),
];

// builtin_call: builtin arguments
fn builtin_call(input: ParserInput) -> ParseResult<Expr> {
    spanned(pair(one_of(&BUILTINS), arguments))
        .map(|((function, args), span)| Expr::new(ExprKind::Builtin(function, args), span))
        .parse(input)
}

static AGGREGATES: [(TT, &str, Aggregate); 4] = [
    (TT::KEYWORD, "sum", Aggregate::Sum),
    (TT::KEYWORD, "prod", Aggregate::Prod),
    (TT::KEYWORD, "min", Aggregate::Min),
    (TT::KEYWORD, "max", Aggregate::Max),
];

// aggregate: ('sum' | 'prod' | 'min' | 'max') idxset do_sep multiplicative
fn aggregate(input: ParserInput) -> ParseResult<Expr> {
    spanned(pair(
        one_of(&AGGREGATES),
        pair(left(idxset, do_sep), multiplicative),
    ))
    .map(|((op, (index, body)), span)| {
        Expr::new(ExprKind::Aggregate(op, index, Box::new(body)), span)
    })
    .parse(input)
}

static ARG_EXTREMA: [(TT, &str, bool); 2] = [
    (TT::KEYWORD, "argmin", false),
    (TT::KEYWORD, "argmax", true),
];

// arg_extremum: ('argmin' | 'argmax') ['(' expr ')'] idxset do_sep multiplicative
fn arg_extremum(input: ParserInput) -> ParseResult<Expr> {
    spanned(pair(
        one_of(&ARG_EXTREMA),
        pair(
            maybe(parenthesized),
            pair(left(idxset, do_sep), multiplicative),
        ),
    ))
    .map(|((maximize, (count, (index, body))), span)| {
        Expr::new(
            ExprKind::ArgExtremum {
                maximize,
                count: count.map(Box::new),
                index,
                body: Box::new(body),
            },
            span,
        )
    })
    .parse(input)
}

static INDEXED_SET_OPS: [(TT, &str, BinOp); 2] = [
    (TT::KEYWORD, "union", BinOp::Union),
    (TT::KEYWORD, "inter", BinOp::Inter),
];

// indexed_set_op: ('union' | 'inter') idxset do_sep union_expr
fn indexed_set_op(input: ParserInput) -> ParseResult<Expr> {
    spanned(pair(
        one_of(&INDEXED_SET_OPS),
        pair(left(idxset, do_sep), union_expr),
    ))
    .map(|((op, (index, body)), span)| {
        Expr::new(ExprKind::IndexedSetOp(op, index, Box::new(body)), span)
    })
    .parse(input)
}

fn exists(input: ParserInput) -> ParseResult<Expr> {
    spanned(right(
        pair(kw("exists"), tok(TT::LPAR)),
        left(idxset, tok(TT::RPAR)),
    ))
    .map(|(index, span)| Expr::new(ExprKind::Exists(index), span))
    .parse(input)
}

fn proj(input: ParserInput) -> ParseResult<Expr> {
    spanned(right(
        pair(kw("proj"), tok(TT::LPAR)),
        pair(expr, left(right(tok(TT::COMMA), expr), tok(TT::RPAR))),
    ))
    .map(|((set, fields), span)| Expr::new(ExprKind::Proj(Box::new(set), Box::new(fields)), span))
    .parse(input)
}

fn indexset_of(input: ParserInput) -> ParseResult<Expr> {
    spanned(right(
        pair(kw("indexset"), tok(TT::LPAR)),
        left(name, tok(TT::RPAR)),
    ))
    .map(|(name, span)| Expr::new(ExprKind::IndexSetOf(name), span))
    .parse(input)
}

// read_spec: 'read' additive 'as' additive read_option*
// read_option: ('skip' | 'use' | 'comment' | 'match') additive
fn read_spec(input: ParserInput) -> ParseResult<ReadSpec> {
    pair(
        right(kw("read"), additive),
        pair(right(kw("as"), additive), zero_or_more(read_option)),
    )
    .map(|(file, (template, options))| ReadSpec {
        file: Box::new(file),
        template: Box::new(template),
        options,
    })
    .parse(input)
}

fn read_option(input: ParserInput) -> ParseResult<ReadOption> {
    right(kw("skip"), additive)
        .map(ReadOption::Skip)
        .or(right(kw("use"), additive).map(ReadOption::Use))
        .or(right(kw("comment"), additive).map(ReadOption::Comment))
        .or(right(kw("match"), additive).map(ReadOption::Match))
        .parse(input)
}
