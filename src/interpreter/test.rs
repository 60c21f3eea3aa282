use std::cell::RefCell;
use std::io;
use std::rc::Rc;

use num_rational::BigRational;

use super::numeric::integer;
use super::*;
use crate::parser::{parse, tokenize_string, SosType};

#[derive(Clone, Default)]
struct SharedBuffer(Rc<RefCell<Vec<u8>>>);

impl io::Write for SharedBuffer {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.borrow_mut().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl SharedBuffer {
    fn contents(&self) -> String {
        String::from_utf8_lossy(&self.0.borrow()).into_owned()
    }
}

fn evaluator() -> Evaluator {
    Evaluator::new(&Options::default())
}

fn run(evaluator: &mut Evaluator, source: &str) -> EvalResult<()> {
    let tokens = tokenize_string(source).unwrap_or_else(|e| panic!("\nFailed to tokenize \"{source}\": {e}\n"));
    let (program, errors) = parse(&tokens);
    assert!(errors.is_empty(), "\nFailed to parse \"{source}\": {errors:?}\n");
    evaluator.run(&program)
}

fn evaluate(source: &str) -> Evaluator {
    let mut ev = evaluator();
    if let Err(e) = run(&mut ev, source) {
        panic!("\nFailed to evaluate \"{source}\": {e}\n");
    }
    ev
}

fn compile_ok(source: &str) -> Model {
    evaluate(source).into_model()
}

fn assert_semantic_error(source: &str, expected: &str) {
    match run(&mut evaluator(), source) {
        Ok(()) => panic!("\n\"{source}\" evaluated without error, expected \"{expected}\"\n"),
        Err(e) => assert!(
            e.to_string().contains(expected),
            "\n\"{source}\": expected \"{expected}\" in \"{e}\"\n"
        ),
    }
}

/// Runs the checks in `source` and asserts that all of them held.
fn assert_checks_pass(source: &str) {
    let ev = evaluate(source);
    assert_eq!(ev.check_failures(), 0, "\nfailed checks in \"{source}\"\n");
}

fn number(ev: &Evaluator, name: &str, index: Tuple) -> Number {
    match ev.symbols().get(name) {
        Some(Symbol::Numb(family)) => family.get(name, &index).unwrap(),
        other => panic!("{name} is not a numeric parameter: {other:?}"),
    }
}

fn scalar(ev: &Evaluator, name: &str) -> Number {
    number(ev, name, Tuple::empty())
}

fn ratio(n: i64, d: i64) -> Number {
    Number::Finite(BigRational::new(n.into(), d.into()))
}

#[test]
fn test_linear_constraint() {
    let model = compile_ok("set I := {1,2,3}; var x[I] >= 0 <= 10; subto c: sum <i> in I: x[i] <= 5;");
    let names: Vec<&str> = model.variables.iter().map(|v| v.name.as_str()).collect();
    assert_eq!(names, vec!["x[1]", "x[2]", "x[3]"]);
    assert_eq!(model.variables[0].upper, Number::from_i64(10));
    assert_eq!(model.constraints.len(), 1);
    let c = &model.constraints[0];
    assert_eq!(c.name, "c");
    assert_eq!(c.relation, Relation::Rhs);
    assert_eq!(c.lhs, Number::MinusInfinity);
    assert_eq!(c.rhs, Number::from_i64(5));
    assert_eq!(c.term.coefficients().count(), 3);
}

#[test]
fn test_constant_moves_to_bound() {
    let model = compile_ok("var x; var y; subto c: 2 * x + 3 >= y - 4;");
    let c = model.constraint_by_name("c").unwrap();
    // 2x - y + 7 >= 0
    assert_eq!(c.relation, Relation::Lhs);
    assert_eq!(c.lhs, Number::from_i64(-7));
    assert_eq!(c.rhs, Number::PlusInfinity);
    assert_eq!(c.term.coefficient(VarId(0)), integer(2));
    assert_eq!(c.term.coefficient(VarId(1)), integer(-1));
}

#[test]
fn test_param_default() {
    let ev = evaluate(
        "set I := {\"a\",\"b\",\"c\"};
         param p[I] := <\"a\"> 1, <\"b\"> 2 default 0;
         param q := p[\"c\"] + p[\"a\"];",
    );
    assert_eq!(scalar(&ev, "q"), Number::from_i64(1));
    assert_eq!(
        number(&ev, "p", Tuple(vec![Elem::Str("b".into())])),
        Number::from_i64(2)
    );
}

#[test]
fn test_param_errors() {
    assert_semantic_error("set I := {1,2}; param p[I] := <3> 1;", "not in the index set");
    assert_semantic_error("set I := {1,2}; param p[I] := <1> 1, <1> 2;", "two entries");
    assert_semantic_error("set I := {1}; param p[I] := <1> 2; param q := p[5];", "has no entry for <5>");
    assert_semantic_error("param q := zz + 1;", "unknown symbol 'zz'");
    assert_semantic_error("param q := \"a\" + 1;", "type mismatch");
}

#[test]
fn test_indexed_param_expression() {
    let ev = evaluate("set I := {1..4}; param sq[<i> in I with i > 1] := i * i;");
    assert_eq!(number(&ev, "sq", Tuple(vec![Elem::Numb(integer(3))])), Number::from_i64(9));
    match ev.symbols().get("sq") {
        Some(Symbol::Numb(family)) => assert_eq!(family.index_set().unwrap().len(), 3),
        other => panic!("unexpected symbol {other:?}"),
    }
}

#[test]
fn test_matrix_param() {
    assert_checks_pass(
        "set I := {1,2};
         param m[I*I] := | 1, 2 | |1| 3, 4 | |2| 5, 6 |;
         check m[2,1] == 5;
         check m[1,2] == 4;",
    );
    assert_semantic_error("set I := {1,2}; param m[I*I] := | 1, 2 | |1| 3 |;", "1 values for 2 columns");
}

#[test]
fn test_range_constraints() {
    let model = compile_ok(
        "var x <= 10; var y <= 10;
         subto r: 1 <= x + y <= 4;
         subto s: 6 >= x - 2 >= 2;
         subto t: -infinity <= x <= 3;
         subto u: 2 <= x + 1 <= 2;",
    );
    let r = model.constraint_by_name("r").unwrap();
    assert_eq!((r.relation, &r.lhs, &r.rhs), (Relation::Range, &Number::from_i64(1), &Number::from_i64(4)));
    let s = model.constraint_by_name("s").unwrap();
    assert_eq!((s.relation, &s.lhs, &s.rhs), (Relation::Range, &Number::from_i64(4), &Number::from_i64(8)));
    let t = model.constraint_by_name("t").unwrap();
    assert_eq!((t.relation, &t.rhs), (Relation::Rhs, &Number::from_i64(3)));
    let u = model.constraint_by_name("u").unwrap();
    assert_eq!((u.relation, &u.lhs, &u.rhs), (Relation::Equal, &Number::from_i64(1), &Number::from_i64(1)));
}

#[test]
fn test_mixed_range_relations() {
    assert_semantic_error("var x; subto c: 1 <= x >= 0;", "same way");
    assert_semantic_error("var x; subto c: 1 == x == 1;", "same way");
    assert_semantic_error("var x; subto c: -infinity <= x <= infinity;", "unbounded on both sides");
}

#[test]
fn test_forall_naming() {
    let model = compile_ok(
        "var x[{1,2}];
         do forall <i> in {1,2}: subto c: x[i] <= i;
         subto d: forall <i> in {1,2}: x[i] >= 0;",
    );
    let names: Vec<&str> = model.constraints.iter().map(|c| c.name.as_str()).collect();
    assert_eq!(names, vec!["c[1]", "c[2]", "d[1]", "d[2]"]);
    assert_eq!(model.constraints[1].rhs, Number::from_i64(2));
}

#[test]
fn test_name_collisions() {
    let model = compile_ok("var x; subto c: x <= 1; subto c: x <= 2;");
    assert!(model.constraint_by_name("c").is_some());
    assert!(model.constraint_by_name("c_1").is_some());
}

#[test]
fn test_sos() {
    let model = compile_ok("var x[{1,2}]; sos s1: type1: x[1]:1, x[2]:2;");
    let sos = model.sos_by_name("s1").unwrap();
    assert_eq!(sos.typ, SosType::One);
    assert_eq!(sos.priority, 0);
    assert_eq!(sos.entries, vec![(VarId(0), integer(1)), (VarId(1), integer(2))]);

    let model = compile_ok("set I := {1,2,3}; var x[I]; sos s: type2 priority 10: sum <i> in I: i * x[i];");
    let sos = model.sos_by_name("s").unwrap();
    assert_eq!(sos.priority, 10);
    assert_eq!(sos.entries[2], (VarId(2), integer(3)));

    assert_semantic_error("var x; sos s: type1: 2 * x:1;", "single variables");
}

#[test]
fn test_sos_type_before_name() {
    let model = compile_ok("var x[{1,2}]; sos type1: s1: x[1]:1, x[2]:2;");
    assert_eq!(model.sos.len(), 1);
    let sos = model.sos_by_name("s1").unwrap();
    assert_eq!(sos.typ, SosType::One);
    assert_eq!(sos.entries, vec![(VarId(0), integer(1)), (VarId(1), integer(2))]);
}

#[test]
fn test_default_outside_enumerated_domain() {
    let ev = evaluate(
        "param p[{\"a\",\"b\"}] := <\"a\"> 1, <\"b\"> 2 default 0;
         param q := p[\"c\"];",
    );
    assert_eq!(scalar(&ev, "q"), Number::zero());
}

#[test]
fn test_compilation_is_deterministic() {
    let source = "set I := {1 to 4};
         param r[<i> in I] := random(0, 10);
         var x[I] integer >= 0 <= 5;
         var y >= -2 <= 2;
         maximize obj: sum <i> in I: r[i] * x[i];
         subto c: forall <i> in I with i > 1: x[i] - x[i-1] <= 2;
         subto v: vif x[1] >= 2 then y <= 0 end;
         subto a: vabs(y) <= 1;
         sos s: type1: x[1]:1, x[2]:2;";
    let first = compile_ok(source);
    let second = compile_ok(source);
    assert_eq!(format!("{first:?}"), format!("{second:?}"));
    assert_eq!(first.to_string(), second.to_string());
    assert_eq!(first.variables, second.variables);
    assert_eq!(first.constraints, second.constraints);
}

#[test]
fn test_set_elements_share_types() {
    assert_semantic_error("set A := {1, \"a\"};", "type mismatch in set");
    assert_semantic_error("set A := {<1, \"a\">, <\"b\", 2>};", "expected <number,string>");
    assert_semantic_error("set A := {1, 2} union {\"a\"};", "type mismatch in set");
}

#[test]
fn test_infinite_constraint_side() {
    assert_semantic_error("var x; subto c: x <= infinity;", "constraint side is infinite");
    assert_semantic_error("var x; subto c: -infinity <= x;", "constraint side is infinite");
    let model = compile_ok("var x; subto c: -infinity <= x <= 4;");
    assert_eq!(model.constraints[0].rhs, Number::from_i64(4));
}

#[test]
fn test_oversized_powers() {
    assert_semantic_error("param a := 2 ^ 100000000000;", "exponent is too large");
    assert_semantic_error("param a := 1000000000!;", "is too large");
    let ev = evaluate("param a := 1 ^ 100000000000; param b := 2 ^ 64;");
    assert_eq!(scalar(&ev, "a"), Number::one());
    assert_eq!(scalar(&ev, "b"), Number::Finite(integer(1 << 32) * integer(1 << 32)));
}

#[test]
fn test_exact_rationals() {
    let ev = evaluate("param a := 1/3; param b := a * 3; check b == 1;");
    assert_eq!(scalar(&ev, "a"), ratio(1, 3));
    assert_eq!(scalar(&ev, "b"), Number::from_i64(1));
    assert_eq!(ev.check_failures(), 0);
}

#[test]
fn test_empty_aggregates() {
    let ev = evaluate("set E := {}; param s := sum <i> in E: i; param p := prod <i> in E: i;");
    assert_eq!(scalar(&ev, "s"), Number::zero());
    assert_eq!(scalar(&ev, "p"), Number::one());
    assert_semantic_error("set E := {}; param m := min <i> in E: i;", "min over an empty domain");
    assert_semantic_error("set E := {}; param m := max(E);", "max over an empty domain");
}

#[test]
fn test_set_expressions() {
    assert_checks_pass(
        "set A := {1..5};
         set B := {<i> in A with i mod 2 == 0};
         check card(B) == 2;
         check B == {4, 2};
         set C := A cross {\"a\", \"b\"};
         check card(C) == 10;
         check card(proj(C, <2>)) == 2;
         check <3, \"a\"> in C;
         check ord(C, 2, 2) == \"b\";
         set D := {i in A do i * i};
         check 25 in D;
         check {1, 4} <= D;
         set P := powerset({1, 2, 3});
         check card(indexset(P)) == 8;
         check P[8] == {1, 2, 3};
         set S := subsets({1, 2, 3}, 2);
         check card(indexset(S)) == 3;
         set U := union <i> in {1, 2}: {i, i + 1};
         check U == {1, 2, 3};
         set N := inter <i> in {1, 2}: {i, i + 1};
         check N == {2};
         check card({1 to 10 by 3}) == 4;
         check card({0 until 5}) == 5;
         check card(A without {1} symdiff {7}) == 5;",
    );
}

#[test]
fn test_pattern_filters_and_shadowing() {
    let ev = evaluate(
        "param i := 10;
         set I := {1, 2};
         param s := sum <i> in I: i;
         param t := i;
         set P := {<1, \"a\">, <2, \"b\">, <1, \"c\">};
         param k := sum <1, n> in P: 1;",
    );
    assert_eq!(scalar(&ev, "s"), Number::from_i64(3));
    assert_eq!(scalar(&ev, "t"), Number::from_i64(10));
    assert_eq!(scalar(&ev, "k"), Number::from_i64(2));
    assert_semantic_error("set P := {<1, 2>}; param k := sum <i> in P: i;", "arity mismatch");
}

#[test]
fn test_argmin_argmax() {
    assert_checks_pass(
        "set A := {1..5};
         set M := argmax(2) <i> in A: -(i - 3) ^ 2;
         check M == {3, 2};
         set L := argmin <i> in A: (i - 4) ^ 2;
         check L == {4};",
    );
}

#[test]
fn test_builtins() {
    assert_checks_pass(
        "check abs(-3) == 3;
         check floor(2.5) == 2;
         check ceil(2.1) == 3;
         check round(2.5) == 3;
         check round(-2.5) == -3;
         check sgn(-4) == -1;
         check length(\"abc\") == 3;
         check substr(\"hello\", 1, 3) == \"ell\";
         check max(1, 5, 3) == 5;
         check min({4, 2, 9}) == 2;
         check 5! == 120;
         check 7 mod 3 == 1;
         check 7 div 2 == 3;
         check 2 ^ 10 == 1024;
         check sqrt(16) == 4;
         check ln(1) == 0;
         check exp(0) == 1;
         check \"abc\" < \"abd\";
         check \"ab\" + \"c\" == \"abc\";
         check if 1 < 2 then 1 else 0 end == 1;
         check exists(<i> in {1, 2, 3} with i > 2);
         check not exists(<i> in {1, 2, 3} with i > 3);
         check 1 == 1 xor 1 == 2;",
    );
    assert_semantic_error("param a := 1 / 0;", "division by zero");
    assert_semantic_error("param a := sqrt(-1);", "no finite result");
    assert_semantic_error("param a := infinity - infinity;", "infinity");
    assert_semantic_error("param a := card(1, 2);", "takes 1 arguments");
}

#[test]
fn test_random_is_deterministic() {
    let first = evaluate("param r := random(0, 1);");
    let second = evaluate("param r := random(0, 1);");
    let value = scalar(&first, "r");
    assert_eq!(value, scalar(&second, "r"));
    assert!(value >= Number::zero() && value < Number::one());
}

#[test]
fn test_defines() {
    let ev = evaluate(
        "defnumb sq(a) := a * a;
         defset odd() := {1, 3};
         defbool small(a, b) := a < b;
         defstrg greet(n) := \"hi \" + n;
         param q := sq(3);
         param c := card(odd());
         param s := if small(1, 2) then 1 else 0 end;
         param g := length(greet(\"bob\"));",
    );
    assert_eq!(scalar(&ev, "q"), Number::from_i64(9));
    assert_eq!(scalar(&ev, "c"), Number::from_i64(2));
    assert_eq!(scalar(&ev, "s"), Number::from_i64(1));
    assert_eq!(scalar(&ev, "g"), Number::from_i64(6));

    assert_semantic_error("defnumb sq(a) := a * a; param q := sq(1, 2);", "takes 1 arguments, 2 given");
    assert_semantic_error("defnumb f(a) := f(a); param q := f(1);", "refers to itself");
    assert_semantic_error("defstrg g(a) := a + 1; param q := g(1);", "type mismatch");
    assert_semantic_error("defnumb f(a, a) := a;", "appears twice");
}

#[test]
fn test_define_builds_terms() {
    let model = compile_ok("var x; defnumb twice(t) := 2 * t; subto c: twice(x) <= 4;");
    let c = model.constraint_by_name("c").unwrap();
    assert_eq!(c.term.coefficient(VarId(0)), integer(2));
}

#[test]
fn test_var_bounds() {
    let model = compile_ok("var b binary; var n integer >= 1.5 <= 4.7; var y; var f real >= -infinity;");
    let (_, b) = model.variable_by_name("b").unwrap();
    assert_eq!((b.class, &b.lower, &b.upper), (VarClass::Binary, &Number::zero(), &Number::one()));
    let (_, n) = model.variable_by_name("n").unwrap();
    assert_eq!((&n.lower, &n.upper), (&Number::from_i64(2), &Number::from_i64(4)));
    let (_, y) = model.variable_by_name("y").unwrap();
    assert_eq!((y.class, &y.lower, &y.upper), (VarClass::Continuous, &Number::zero(), &Number::PlusInfinity));
    let (_, f) = model.variable_by_name("f").unwrap();
    assert_eq!(f.lower, Number::MinusInfinity);

    let model = compile_ok("var z integer priority 5 startval 2;");
    assert_eq!(model.variables[0].priority, Some(5));
    assert_eq!(model.variables[0].startval, Some(integer(2)));

    assert_semantic_error("var b binary <= 3;", "cannot have bounds");
}

#[test]
fn test_objective() {
    let model = compile_ok("var x; var y; maximize profit: 3 * x + 2 * y;");
    let objective = model.objective.as_ref().unwrap();
    assert_eq!(objective.sense, parser::Sense::Maximize);
    assert_eq!(objective.name, "profit");
    assert_eq!(model.variables[0].objective, integer(3));
    assert_eq!(model.variables[1].objective, integer(2));
    assert_semantic_error("var x; minimize a: x; minimize b: x;", "objective is already set");
}

#[test]
fn test_nonlinear_terms() {
    assert_semantic_error("var x; var y; subto c: x * y <= 1;", "not linear");
    assert_semantic_error("var x; subto c: 1 / x <= 1;", "not linear");
    assert_semantic_error("var x; subto c: x ^ 2 <= 1;", "not linear");
    let model = compile_ok("var x; subto c: x / 2 + x ^ 1 <= 1;");
    assert_eq!(model.constraints[0].term.coefficient(VarId(0)), BigRational::new(3.into(), 2.into()));
}

#[test]
fn test_conditional_constraints() {
    let model = compile_ok(
        "param n := 3; var x;
         subto c: if n > 2 then x <= 1 else x >= 2 end;
         subto d: if n > 5 then x <= 1 end;
         subto e: x <= 4 and x >= 1;",
    );
    let names: Vec<&str> = model.constraints.iter().map(|c| c.name.as_str()).collect();
    assert_eq!(names, vec!["c", "e", "e_1"]);
    assert_eq!(model.constraints[0].rhs, Number::from_i64(1));
}

#[test]
fn test_vif() {
    let model = compile_ok(
        "var x integer >= 0 <= 5; var y >= 0 <= 10;
         subto c: vif x >= 3 then y <= 2 end;",
    );
    let names: Vec<&str> = model.constraints.iter().map(|c| c.name.as_str()).collect();
    assert_eq!(names, vec!["c_vif_c", "c_vif_c_1", "c_vif_then"]);
    let (r, helper) = model.variable_by_name("c_vif").unwrap();
    assert_eq!(helper.class, VarClass::Binary);
    // y <= 10 - 8 r
    let then = model.constraint_by_name("c_vif_then").unwrap();
    assert_eq!(then.term.coefficient(r), integer(8));
    assert_eq!(then.rhs, Number::from_i64(10));

    let model = compile_ok(
        "var x integer >= 0 <= 5; var y >= 0 <= 10;
         subto c: vif x >= 3 and x != 5 then y <= 2 else y >= 1 end;",
    );
    assert!(model.constraint_by_name("c_vif_else").is_some());
    assert!(model.constraint_by_name("c_vif_and").is_some());

    assert_semantic_error("var z <= 4; var y <= 1; subto c: vif z >= 1 then y <= 0 end;", "not integral");
    assert_semantic_error("var z integer; var y <= 1; subto c: vif z >= 1 then y <= 0 end;", "finite bounds");
}

#[test]
fn test_vabs() {
    let model = compile_ok(
        "var x integer >= -3 <= 5; var y >= 0 <= 4;
         subto c: vabs(x) <= 2;
         subto d: vabs(y + 1) <= 9;",
    );
    let names: Vec<&str> = model.variables.iter().map(|v| v.name.as_str()).collect();
    assert_eq!(names, vec!["x", "y", "vabs_sign", "vabs_abs"]);
    let (s, sign) = model.variable_by_name("vabs_sign").unwrap();
    assert_eq!(sign.class, VarClass::Binary);
    let (r, abs) = model.variable_by_name("vabs_abs").unwrap();
    assert_eq!(abs.lower, Number::zero());
    assert_eq!(abs.upper, Number::from_i64(5));

    let names: Vec<&str> = model.constraints.iter().map(|c| c.name.as_str()).collect();
    assert_eq!(
        names,
        vec!["vabs_c", "vabs_c_1", "vabs_c_2", "vabs_c_3", "vabs_c_4", "vabs_c_5", "c", "d"]
    );
    // r - x - 6 + 6 s <= 0
    let upper = model.constraint_by_name("vabs_c_4").unwrap();
    assert_eq!(upper.term.coefficient(r), integer(1));
    assert_eq!(upper.term.coefficient(VarId(0)), integer(-1));
    assert_eq!(upper.term.coefficient(s), integer(6));
    assert_eq!(upper.rhs, Number::from_i64(6));

    let c = model.constraint_by_name("c").unwrap();
    assert_eq!(c.term.coefficients().count(), 1);
    assert_eq!(c.term.coefficient(r), integer(1));
    assert_eq!(c.rhs, Number::from_i64(2));
    // y + 1 is never negative, so it is used as is
    let d = model.constraint_by_name("d").unwrap();
    assert_eq!(d.term.coefficient(VarId(1)), integer(1));
    assert_eq!(d.rhs, Number::from_i64(8));

    let model = compile_ok("var x >= -4 <= -1; subto c: vabs(x) <= 2;");
    assert_eq!(model.variables.len(), 1);
    assert_eq!(model.constraints[0].term.coefficient(VarId(0)), integer(-1));

    let ev = evaluate("param a := vabs(-7/2); param b := vabs(3);");
    assert_eq!(scalar(&ev, "a"), ratio(7, 2));
    assert_eq!(scalar(&ev, "b"), Number::from_i64(3));

    assert_semantic_error("var z; subto c: vabs(z - 1) <= 1;", "vabs: variable z needs finite bounds");
}

/// Leaves vif statements out and passes vabs terms through unchanged.
struct Passthrough;

impl VifStrategy for Passthrough {
    fn expand(&mut self, _model: &mut Model, _vif: Vif) -> Result<(), ErrorKind> {
        Ok(())
    }

    fn vabs(&mut self, _model: &mut Model, term: Term) -> Result<Term, ErrorKind> {
        Ok(term)
    }
}

#[test]
fn test_vabs_uses_the_strategy() {
    let mut ev = evaluator().with_vif_strategy(Passthrough);
    run(&mut ev, "var x >= -1 <= 1; subto c: vabs(x) <= 1;").unwrap();
    assert_eq!(ev.model().variables.len(), 1);
    assert_eq!(ev.model().constraints.len(), 1);
}

#[test]
fn test_read() {
    let source = MemorySource::new().with_file("costs.txt", "# name cost\na 3\nb 4\n");
    let mut ev = evaluator().with_table_source(source);
    run(
        &mut ev,
        "set S := read \"costs.txt\" as \"<1s>\";
         param c[S] := read \"costs.txt\" as \"<1s> 2n\";
         param total := sum <s> in S: c[s];",
    )
    .unwrap();
    assert_eq!(scalar(&ev, "total"), Number::from_i64(7));
    assert_eq!(number(&ev, "c", Tuple(vec![Elem::Str("b".into())])), Number::from_i64(4));

    let mut ev = evaluator().with_table_source(MemorySource::new());
    let err = run(&mut ev, "set S := read \"missing.txt\" as \"<1s>\";").unwrap_err();
    assert!(matches!(err.kind, ErrorKind::Io { .. }));
    assert_semantic_error("set S := read \"x.txt\" as \"<1s> 2n\";", "has a value column");
}

#[test]
fn test_checks() {
    let ev = evaluate("check 1 == 2; check 1 == 1; check card({1}) > 3;");
    assert_eq!(ev.check_failures(), 2);
    assert_semantic_error("check 1 + 1;", "expected boolean");
}

#[test]
fn test_duplicate_symbols() {
    assert_semantic_error("param n := 1; set n := {1};", "'n' is already declared");
    assert_semantic_error("var x; var x;", "'x' is already declared");
}

#[test]
fn test_print() {
    let output = SharedBuffer::default();
    let mut ev = evaluator().with_output(output.clone());
    run(
        &mut ev,
        "set I := {1, 2}; var x[I]; var y;
         print \"card: \", card(I);
         print x;
         print 1/4;
         print I;
         print 2 * y + 1;
         do forall <i> in I do print \"i=\", i;",
    )
    .unwrap();
    assert_eq!(
        output.contents(),
        "card: 2\nx[1] x[2]\n0.25\n{1,2}\n2 y + 1\ni=1\ni=2\n"
    );
}

#[test]
fn test_statements_keep_state() {
    let mut ev = evaluator();
    run(&mut ev, "set I := {1, 2};").unwrap();
    run(&mut ev, "var x[I];").unwrap();
    run(&mut ev, "subto c: sum <i> in I: x[i] == 1;").unwrap();
    assert_eq!(ev.model().variables.len(), 2);
    assert_eq!(ev.model().constraints[0].relation, Relation::Equal);
}

#[test]
fn test_error_position() {
    let err = run(&mut evaluator(), "param a := 1;\nparam b := a / 0;").unwrap_err();
    assert!(matches!(err.kind, ErrorKind::DivisionByZero));
    assert_eq!(err.span.start().map(|l| l.line), Some(2));
}
