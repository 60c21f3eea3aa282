use super::{parse, tokenize_string, Program, Statement, SyntaxError};

fn parse_string(input: &str) -> Result<(Program, Vec<SyntaxError>), String> {
    let tokens = tokenize_string(input).map_err(|e| e.to_string())?;
    Ok(parse(&tokens))
}

fn parse_tree_matches(input: &str, tree_repr: &str) {
    let result = parse_string(input);
    assert!(
        matches!(result, Ok((_, ref errors)) if errors.is_empty()),
        "\nFailed to parse \"{}\": {:?}\n",
        input,
        result.as_ref().map(|(_, errors)| errors)
    );
    if let Ok((ref tree, _)) = result {
        let result_repr = format!("{tree:?}");
        assert!(
            result_repr.contains(tree_repr),
            "\nFailed to parse \"{}\":\nexpected \"{}\" somewhere in \"{}\"\n",
            input,
            tree_repr,
            result_repr
        )
    } else {
        unreachable!()
    }
}

fn assert_raises_error(input: &str, expected: &str) {
    let result = parse_string(input);
    assert!(matches!(result, Ok((_, ref errors)) if !errors.is_empty()));
    match result {
        Ok((_, ref errors)) => {
            let err = errors.first().unwrap();
            assert!(
                err.expected.iter().any(|e| e == expected),
                "\n\"{}\": expected {} among {:?}\n",
                input,
                expected,
                err.expected
            );
        }
        _ => unreachable!(),
    }
}

#[test]
fn test_set_declarations() {
    parse_tree_matches("set I := {1,2,3};", "SetDecl { name: Name(\"I\"), index: None");
    parse_tree_matches("set I := {1,2,3};", "SetLiteral([Number(");
    parse_tree_matches("set E := {};", "SetLiteral([])");
    parse_tree_matches("set R := {1..10};", "kind: Inclusive");
    parse_tree_matches("set R := {1 to 10 by 2};", "step: Some(Number(");
    parse_tree_matches("set R := {0 until 5};", "kind: Exclusive");
    parse_tree_matches("set P := {<1,\"a\">, <2,\"b\">};", "Tuple([Number(");
    parse_tree_matches("set C := I cross J;", "Binary(Cross, Name(\"I\"), Name(\"J\"))");
    parse_tree_matches(
        "set U := A union B inter C;",
        "Binary(Union, Name(\"A\"), Binary(Inter, Name(\"B\"), Name(\"C\")))",
    );
    parse_tree_matches("set D := A without B symdiff C;", "Binary(SymDiff, Binary(Without");
    parse_tree_matches("set S[I] := <1> {1,2}, <2> {3};", "Entries([(Tuple(");
    parse_tree_matches("set S[<i> in I] := {i..3};", "index: Some(IndexSet { pattern: Some([Name(\"i\")])");
    parse_tree_matches("set SS := subsets(I, 2);", "Subsets { set: Name(\"I\")");
    parse_tree_matches("set SS := subsets(I, 1, 2);", "max_size: Some(");
    parse_tree_matches("set PS := powerset(I);", "Powerset(Name(\"I\"))");
    parse_tree_matches("set Q := proj(P, <1>);", "Proj(Name(\"P\"), Tuple(");
    parse_tree_matches("set X := indexset(p);", "IndexSetOf(Name(\"p\"))");
}

#[test]
fn test_set_builders() {
    parse_tree_matches(
        "set B := {<i> in I with i > 1};",
        "SetBuilder(IndexSet { pattern: Some([Name(\"i\")]), set: Name(\"I\"), condition: Some(Binary(Gt",
    );
    parse_tree_matches("set B := {<i,j> in I cross J: <j,i>};", "SetBuilder(IndexSet { pattern: Some([Name(\"i\"), Name(\"j\")])");
    parse_tree_matches("set B := {i in I do i * 2};", "Some(Binary(Mul, Name(\"i\")");
    parse_tree_matches("set U := union <i> in I: S[i];", "IndexedSetOp(Union");
    parse_tree_matches("set N := inter <i> in I: S[i];", "IndexedSetOp(Inter");
}

#[test]
fn test_param_declarations() {
    parse_tree_matches("param n := 5;", "ParamDecl { name: Name(\"n\"), index: None, body: Expr(Number(");
    parse_tree_matches("param s := \"abc\";", "Expr(Str(\"abc\"))");
    parse_tree_matches(
        "param p[I] := <1> 10, <2> 20 default 0;",
        "Entries([(Tuple([Number(",
    );
    parse_tree_matches("param p[I] := <1> 10 default 0;", "default: Some(Number(");
    parse_tree_matches("param q[I] default 1;", "body: Empty");
    parse_tree_matches("param big := infinity;", "Expr(Infinity)");
    parse_tree_matches("param e := 1.5e3;", "numer: 1500, denom: 1");
    parse_tree_matches("param h := .25;", "numer: 1, denom: 4");
    parse_tree_matches(
        "param m[I*J] := | 1, 2 | |1| 3, 4 | |2| 5, 6 |;",
        "Matrix { columns: [Number(",
    );
}

#[test]
fn test_var_declarations() {
    parse_tree_matches("var x;", "typ: Real, lower: None, upper: None");
    parse_tree_matches("var x[I] >= 0 <= 10;", "lower: Some(Number(");
    parse_tree_matches("var x[I] integer >= -5 <= 5;", "typ: Integer, lower: Some(Unary(Neg");
    parse_tree_matches("var b[I] binary;", "typ: Binary");
    parse_tree_matches("var z implicit binary;", "typ: ImplicitBinary");
    parse_tree_matches("var z implicit integer;", "typ: ImplicitInteger");
    parse_tree_matches("var y real >= -infinity;", "lower: Some(Unary(Neg, Infinity))");
    parse_tree_matches("var y integer priority 5 startval 2;", "priority: Some(Number(");
    parse_tree_matches("var y integer priority 5 startval 2;", "startval: Some(Number(");
}

#[test]
fn test_objectives() {
    parse_tree_matches(
        "minimize cost: sum <i> in I: c[i] * x[i];",
        "ObjectiveDecl { sense: Minimize, name: Name(\"cost\"), term: Aggregate(Sum",
    );
    parse_tree_matches("maximize profit: 3 * x + 2 * y;", "sense: Maximize");
    parse_tree_matches("min c: x;", "sense: Minimize");
    parse_tree_matches("max c: x;", "sense: Maximize");
}

#[test]
fn test_constraints() {
    parse_tree_matches(
        "subto c: x + y <= 5;",
        "Plain { lhs: Binary(Add, Name(\"x\"), Name(\"y\")), rel: Le, rhs: Number(",
    );
    parse_tree_matches("subto c: x == 1;", "rel: Eq");
    parse_tree_matches("subto c: 1 <= x + y <= 4;", "Range { low: Number(");
    parse_tree_matches("subto c: 4 >= x >= 1;", "lower_rel: Ge");
    parse_tree_matches(
        "subto c: forall <i> in I: x[i] <= i;",
        "Forall(IndexSet { pattern: Some([Name(\"i\")]), set: Name(\"I\"), condition: None }, Plain",
    );
    parse_tree_matches(
        "subto c: forall <i> in I do forall <j> in J: x[i,j] >= 0;",
        "Forall(IndexSet { pattern: Some([Name(\"j\")])",
    );
    parse_tree_matches("subto c: x <= 5 and y >= 1;", "And([Plain");
    parse_tree_matches("subto c: x <= 5, scale, separate;", "flags: ConFlags(3)");
    parse_tree_matches("subto c: x <= 5, checkonly, indicator;", "flags: ConFlags(12)");
    parse_tree_matches(
        "subto c: if n > 2 then x <= 1 else x >= 2 end;",
        "If { condition: Binary(Gt",
    );
    parse_tree_matches("subto c: if n > 2 then x <= 1 end;", "otherwise: None");
}

#[test]
fn test_vif_constraints() {
    parse_tree_matches(
        "subto c: vif x <= 2 then y >= 1 end;",
        "Vif { condition: Binary(Le, Name(\"x\"), Number(",
    );
    parse_tree_matches(
        "subto c: vif x <= 2 and y != 0 then z == 1 else z == 0 end;",
        "otherwise: Some(VifBranch { lhs: Name(\"z\"), rel: Eq",
    );
    parse_tree_matches("subto c: vif not x >= 1 then y <= 0 end;", "Unary(Not");
}

#[test]
fn test_sos_declarations() {
    parse_tree_matches(
        "sos s1: type1: x[1]:1, x[2]:2;",
        "SosDecl { name: Name(\"s1\"), typ: One, priority: None, body: Weighted([(Subscript(\"x\"",
    );
    parse_tree_matches("sos type2: s: x[1]:1, x[2]:2;", "typ: Two");
    parse_tree_matches("sos s: type2 priority 10: sum <i> in I: i * x[i];", "body: Term(Aggregate(Sum");
    parse_tree_matches("sos s: type2 priority 10: x[1]:1;", "priority: Some(Number(");
    parse_tree_matches("sos s: forall <i> in I do x[i]:1, y[i]:2;", "body: Forall(IndexSet");
}

#[test]
fn test_defines() {
    parse_tree_matches(
        "defnumb sq(a) := a * a;",
        "DefineDecl { kind: Numb, name: Name(\"sq\"), params: [Name(\"a\")]",
    );
    parse_tree_matches("defstrg greet(n) := \"hi \" + n;", "kind: Strg");
    parse_tree_matches("defbool small(a, b) := a < b;", "params: [Name(\"a\"), Name(\"b\")]");
    parse_tree_matches("defset odd() := {1, 3};", "kind: Set, name: Name(\"odd\"), params: []");
    parse_tree_matches("param q := sq(3);", "Call(\"sq\", [Number(");
}

#[test]
fn test_commands() {
    parse_tree_matches("print \"n = \", n;", "Print([Str(\"n = \"), Name(\"n\")]");
    parse_tree_matches("do print card(I);", "Builtin(Card, [Name(\"I\")])");
    parse_tree_matches("check card(I) == 3;", "Check(Binary(Eq, Builtin(Card");
    parse_tree_matches("do check n > 1;", "Check(");
    parse_tree_matches(
        "do forall <i> in I do print i;",
        "Forall(IndexSet { pattern: Some([Name(\"i\")]), set: Name(\"I\"), condition: None }, Print(",
    );
    parse_tree_matches(
        "do forall <i> in {1,2}: subto c: x[i] <= i;",
        "Forall(IndexSet { pattern: Some([Name(\"i\")]), set: SetLiteral(",
    );
    parse_tree_matches("do forall <i> in I do forall <j> in J do print i, j;", "Forall(IndexSet { pattern: Some([Name(\"j\")])");
}

#[test]
fn test_expressions() {
    parse_tree_matches(
        "param a := 1 + 2 * 3;",
        "Binary(Add, Number(Ratio { numer: 1, denom: 1 }), Binary(Mul",
    );
    parse_tree_matches("param a := (1 + 2) * 3;", "Binary(Mul, Binary(Add");
    parse_tree_matches("param a := 1 - 2 - 3;", "Binary(Sub, Binary(Sub");
    parse_tree_matches("param a := -2 ^ 2;", "Unary(Neg, Binary(Pow");
    parse_tree_matches("param a := 2 ** 3;", "Binary(Pow");
    parse_tree_matches("param a := 5!;", "Unary(Factorial, Number(");
    parse_tree_matches("param a := 7 mod 3 + 7 div 2;", "Binary(Add, Binary(Mod");
    parse_tree_matches("param a := 7 div 2;", "Binary(IntDiv");
    parse_tree_matches("param a := if n < 3 then 1 else 2 end;", "If(Binary(Lt, Name(\"n\")");
    parse_tree_matches("param b := 1 in I and not 2 in I or n <> 3;", "Binary(Or, Binary(And, Binary(In");
    parse_tree_matches("param b := n != 3 xor m == 1;", "Binary(Xor, Binary(Ne");
    parse_tree_matches("param m := max(1, 2, 3);", "Builtin(Max, [Number(");
    parse_tree_matches("param m := max <i> in I: p[i];", "Aggregate(Max, IndexSet");
    parse_tree_matches("param m := min <i> in I: p[i];", "Aggregate(Min, IndexSet");
    parse_tree_matches("param m := prod <i> in I: i;", "Aggregate(Prod");
    parse_tree_matches("set A := argmax(2) <i> in I: p[i];", "ArgExtremum { maximize: true, count: Some(Number(");
    parse_tree_matches("set A := argmin <i> in I: p[i];", "ArgExtremum { maximize: false, count: None");
    parse_tree_matches("param e := if exists(<i> in I with i > 2) then 1 else 0 end;", "Exists(IndexSet");
    parse_tree_matches("param s := substr(\"hello\", 1, 3);", "Builtin(Substr");
    parse_tree_matches("param r := random(0, 1);", "Builtin(Random");
    parse_tree_matches("subto c: vabs(x - y) <= 3;", "Builtin(Vabs, [Binary(Sub");
    parse_tree_matches("param o := ord(I, 2, 1);", "Builtin(Ord");
    parse_tree_matches("param t := <>;", "Tuple([])");
}

#[test]
fn test_read_expressions() {
    parse_tree_matches(
        "set S := read \"data.txt\" as \"<1s>\";",
        "Read(ReadSpec { file: Str(\"data.txt\"), template: Str(\"<1s>\"), options: [] })",
    );
    parse_tree_matches(
        "param p[S] := read \"data.txt\" as \"<1s> 2n\" skip 1 use 3 comment \"%\";",
        "options: [Skip(Number(Ratio { numer: 1, denom: 1 })), Use(",
    );
    parse_tree_matches("set S := read \"d\" as \"<1n>\" match \"^a\";", "Match(Str(\"^a\"))");
}

#[test]
fn test_comments_and_whitespace() {
    parse_tree_matches("# a comment\nset I := {1}; # trailing\n", "SetDecl");
    parse_tree_matches("set\n  I\n :=\n {1}\n;", "SetDecl");
}

#[test]
fn test_statement_count() {
    let (program, errors) = parse_string("set I := {1}; param n := 2; var x[I];").unwrap();
    assert!(errors.is_empty());
    assert_eq!(program.statements.len(), 3);
    assert!(matches!(program.statements[2], Statement::Var(_)));
}

#[test]
fn test_syntax_errors() {
    assert_raises_error("subto c: x < 5;", "'<='");
    assert_raises_error("subto c: x < 5;", "'=='");
    assert_raises_error("set I := {1,2;", "'}'");
    assert_raises_error("param n := 3", "';'");
    assert_raises_error("var x[I] >= ;", "number");
    assert_raises_error("subto c x <= 1;", "':'");
    assert_raises_error("param n := if a then 1 end;", "'else'");
}

#[test]
fn test_error_position() {
    let (_, errors) = parse_string("set I := {1};\nparam n := * 2;").unwrap();
    assert_eq!(errors.len(), 1);
    let start = errors[0].span.start().unwrap();
    assert_eq!(start.line, 2);
    assert_eq!(start.column, 12);
    assert_eq!(errors[0].found, "'*'");
}

#[test]
fn test_error_recovery() {
    let (program, errors) =
        parse_string("set A := {1,2; set B := {3}; param p := ; var x;").unwrap();
    assert_eq!(errors.len(), 2);
    assert_eq!(program.statements.len(), 2);
    assert!(matches!(program.statements[0], Statement::Set(_)));
    assert!(matches!(program.statements[1], Statement::Var(_)));
}

#[test]
fn test_tokenize_errors() {
    assert!(parse_string("param n := 3 @ 4;").is_err());
    assert!(parse_string("param s := \"open;").is_err());
}
