// ABOUTME: End-to-end engine scenarios driven through execute()

use pochard::value::{equal, uncons};
use pochard::{read_all, Context, LispError, Reader, Value};

fn run(ctx: &mut Context, src: &str) -> Vec<String> {
    let values = ctx.execute(src).unwrap();
    values.iter().map(|v| ctx.stringify(v).unwrap()).collect()
}

#[test]
fn intern_uniqueness() {
    let mut ctx = Context::new();
    assert_eq!(run(&mut ctx, "(eq? 'sym 'sym)"), vec!["#t"]);

    let a = read_all(&mut ctx, "spelling").unwrap().pop().unwrap();
    let b = read_all(&mut ctx, "spelling").unwrap().pop().unwrap();
    assert!(pochard::value::eq(&a, &b));
}

#[test]
fn nil_is_the_only_falsy_value() {
    let mut ctx = Context::new();
    let out = run(
        &mut ctx,
        "(if () 'then 'else)
         (if 0 'then 'else)
         (if 0.0 'then 'else)
         (if \"\" 'then 'else)
         (if '(()) 'then 'else)
         (if #t 'then 'else)",
    );
    assert_eq!(out, vec!["else", "then", "then", "then", "then", "then"]);
}

#[test]
fn tail_recursion_runs_at_depth_one_million() {
    let mut ctx = Context::new();
    let out = run(
        &mut ctx,
        "(define (loop n) (if (equal? n 0) 'ok (loop (sub n 1))))
         (loop 1000000)",
    );
    assert_eq!(out[1], "ok");
    assert!(ctx.s.is_empty());
}

#[test]
fn arguments_evaluate_left_to_right() {
    let mut ctx = Context::new();
    let out = run(
        &mut ctx,
        "(define order ())
         (define (note x) (begin (set! order (cons x order)) x))
         (define (three a b c) c)
         (three (note 1) (note 2) (note 3))
         order",
    );
    assert_eq!(out[4], "(3 2 1)");
}

#[test]
fn callcc_round_trip() {
    let mut ctx = Context::new();
    assert_eq!(
        run(&mut ctx, "(call/cc (lambda (k) (k 'value)))"),
        vec!["value"]
    );
}

#[test]
fn invoking_a_saved_continuation_replaces_the_computation() {
    let mut ctx = Context::new();
    let out = run(
        &mut ctx,
        "(define c ())
         (sub (call/cc (lambda (k) (begin (set! c k) 10))) 1)
         (c 100)",
    );
    assert_eq!(out[1], "9");
    assert_eq!(out[2], "99");
}

#[test]
fn quasiquote_laws() {
    let mut ctx = Context::new();
    // `x is 'x for non-pair x
    let out = run(&mut ctx, "(eq? `x 'x) (equal? `5 5)");
    assert_eq!(out, vec!["#t", "#t"]);

    // `(a ,b c) builds the same value as consing by hand
    let out = run(
        &mut ctx,
        "(define b 42)
         (equal? `(a ,b c) (cons 'a (cons b (cons 'c ()))))",
    );
    assert_eq!(out[1], "#t");
}

#[test]
fn closures_capture_their_defining_environment() {
    let mut ctx = Context::new();
    let out = run(
        &mut ctx,
        "(define (make-acc)
           (begin
             (define total 0)
             (lambda (n) (begin (set! total (sub total (sub 0 n))) total))))
         (define acc (make-acc))
         (acc 3)
         (acc 4)
         (define other (make-acc))
         (other 1)
         (acc 2)",
    );
    assert_eq!(out[2], "3");
    assert_eq!(out[3], "7"); // same captured binding
    assert_eq!(out[5], "1"); // a fresh closure gets a fresh binding
    assert_eq!(out[6], "9");
}

#[test]
fn read_stringify_round_trip() {
    let mut ctx = Context::new();
    for src in [
        "()",
        "#t",
        "42",
        "-3",
        "2.5",
        "sym",
        "(1 2 3)",
        "(a (b (c)) 1.5 #t ())",
    ] {
        let datum = read_all(&mut ctx, src).unwrap().pop().unwrap();
        let text = ctx.stringify(&datum).unwrap();
        let back = read_all(&mut ctx, &text).unwrap().pop().unwrap();
        assert!(equal(&datum, &back), "round trip failed for {:?}", src);
    }
}

#[test]
fn spec_factorial_scenario() {
    let mut ctx = Context::new();
    let out = run(
        &mut ctx,
        "(define (fact n) (if (equal? n 0) 1 (mul n (fact (sub n 1)))))
         (fact 5)",
    );
    assert_eq!(out, vec!["()", "120"]);
}

#[test]
fn trap_reports_the_error_kind() {
    let mut ctx = Context::new();
    let results = ctx.execute("(trap (car '()))").unwrap();
    let (flag, rest) = uncons(&results[0]).unwrap();
    assert!(flag.is_nil());
    let (message, tail) = uncons(&rest).unwrap();
    assert!(tail.is_nil());
    match &message {
        Value::Str(s) => assert!(s.starts_with("TypeError:"), "got {:?}", s),
        other => panic!("expected string message, got {:?}", other),
    }
}

#[test]
fn reader_feeds_incrementally() {
    let mut ctx = Context::new();
    let mut reader = Reader::new();
    let mut seen = Vec::new();
    {
        let mut sink = |_: &mut Context, v: Value| -> Result<(), LispError> {
            seen.push(v);
            Ok(())
        };
        reader.feed(&mut ctx, "(sub 5", &mut sink).unwrap();
    }
    assert!(seen.is_empty());
    {
        let mut sink = |_: &mut Context, v: Value| -> Result<(), LispError> {
            seen.push(v);
            Ok(())
        };
        reader.feed(&mut ctx, " 2)\n", &mut sink).unwrap();
        reader.finish(&mut ctx, &mut sink).unwrap();
    }
    assert_eq!(seen.len(), 1);

    let value = ctx.eval(seen.pop().unwrap()).unwrap();
    assert_eq!(ctx.stringify(&value).unwrap(), "3");
}

#[test]
fn brackets_alias_parens_but_must_match() {
    let mut ctx = Context::new();
    assert_eq!(run(&mut ctx, "[sub 5 [sub 3 1]]"), vec!["3"]);
    assert!(matches!(
        ctx.execute("(sub 1 2]"),
        Err(LispError::Syntax(_))
    ));
}

#[test]
fn boundary_error_kinds() {
    let mut ctx = Context::new();
    assert!(matches!(ctx.execute("missing"), Err(LispError::Name(_))));
    assert!(matches!(
        ctx.execute("(set! missing 1)"),
        Err(LispError::Name(_))
    ));
    assert!(matches!(ctx.execute("(1 2)"), Err(LispError::Syntax(_))));
    assert!(matches!(
        ctx.execute("((lambda (a) a) 1 2)"),
        Err(LispError::Syntax(_))
    ));
    assert!(matches!(ctx.execute("(car 5)"), Err(LispError::Type(_))));
    assert!(matches!(
        ctx.execute("(error \"no\")"),
        Err(LispError::User(_))
    ));
    assert!(matches!(ctx.execute("(exit 2)"), Err(LispError::Exit(_))));
}

#[test]
fn numeric_literals() {
    let mut ctx = Context::new();
    let out = run(&mut ctx, "0xff 0o10 0b101 -3 1e5 .5 42.");
    assert_eq!(out, vec!["255", "8", "5", "-3", "100000.0", "0.5", "42.0"]);
}

#[test]
fn two_contexts_are_independent() {
    let mut a = Context::new();
    let mut b = Context::new();
    a.execute("(define x 1)").unwrap();
    assert!(matches!(b.execute("x"), Err(LispError::Name(_))));
}

#[test]
fn eval_primitive_on_data_and_text() {
    let mut ctx = Context::new();
    let out = run(
        &mut ctx,
        "(eval '(sub 5 2))
         (eval \"(sub 5 2) (sub 9 1)\")",
    );
    assert_eq!(out, vec!["3", "8"]);
}
