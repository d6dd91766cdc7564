use crate::quark::Quark;
use crate::runtime::evaluator::Evaluator;
use crate::runtime::{RuntimeError, Value};
use pretty_assertions::assert_eq;

fn eval(source: &str) -> Result<Value, RuntimeError> {
    Evaluator::new().evaluate_str(source)
}

#[test]
fn global_environment_has_const_builtins() {
    let evaluator = Evaluator::new();
    let global = evaluator.global();
    for name in [
        "eval", "protect", "return", "block", "for", "throw", "try", "lambda", "gamma", "const",
        "trans", "unref", "if", "list", "nameset", "+", "-", "==", "<",
    ] {
        assert!(
            global.exists(Quark::intern(name)).unwrap(),
            "missing builtin {}",
            name
        );
    }
    let err = evaluator.evaluate_str("(trans list 1)").unwrap_err();
    assert!(matches!(err, RuntimeError::Const(_)));
}

#[test]
fn builtin_arity_is_checked_before_invocation() {
    let err = eval("(eval 1 2)").unwrap_err();
    assert_eq!(err.to_string(), "argument error: eval expects 1 arguments, got 2");
    assert!(matches!(eval("(return 1 2)"), Err(RuntimeError::Argument(_))));
    assert!(matches!(eval("(lambda x)"), Err(RuntimeError::Argument(_))));
    assert!(matches!(eval("(for (a) (nil))"), Err(RuntimeError::Argument(_))));
}

#[test]
fn eval_reaches_a_fixed_point() {
    assert_eq!(eval("(trans x 5) (trans y (protect x)) (eval (protect y))").unwrap(), Value::Integer(5));
    // a name bound to its own lexical form evaluates to itself
    assert_eq!(
        eval("(trans z (protect z)) (eval z)").unwrap(),
        Value::lexical("z")
    );
    assert_eq!(eval("(eval nil)").unwrap(), Value::Nil);
}

#[test]
fn protect_returns_the_form_unevaluated() {
    assert_eq!(
        eval("(protect (+ 1 2))").unwrap(),
        Value::list(vec![Value::lexical("+"), Value::Integer(1), Value::Integer(2)])
    );
}

#[test]
fn block_scope_is_released() {
    assert_eq!(eval("(block (trans inner 3))").unwrap(), Value::Integer(3));
    assert!(matches!(
        eval("(block (trans inner 3)) inner"),
        Err(RuntimeError::Eval(_))
    ));
    // the block sees its enclosing scope
    assert_eq!(eval("(trans outer 4) (block outer)").unwrap(), Value::Integer(4));
}

#[test]
fn for_stops_at_the_shortest_iterable() {
    let evaluator = Evaluator::new();
    let result = evaluator
        .evaluate_str("(for (a b) ((list 1 2) (list 10 20 30)) (list a b))")
        .unwrap();
    assert_eq!(result, Value::list(vec![Value::Integer(2), Value::Integer(20)]));

    // the loop scope is a child of the caller: `count` shadows the global one
    let iterations = evaluator
        .evaluate_str(
            "(trans count 0)
             (for (a b) ((list 1 2) (list 10 20 30)) (trans count (+ count 1)))",
        )
        .unwrap();
    assert_eq!(iterations, Value::Integer(2));
    assert_eq!(evaluator.evaluate_str("count").unwrap(), Value::Integer(0));
    assert_eq!(evaluator.evaluate_str("(for (c) (\"ab\") c)").unwrap(), Value::from("b"));
    assert_eq!(evaluator.evaluate_str("(for (c) (nil) c)").unwrap(), Value::Nil);
    assert!(matches!(
        evaluator.evaluate_str("(for (c) (5) c)"),
        Err(RuntimeError::Type(_))
    ));
    assert!(matches!(
        evaluator.evaluate_str("(for (a b) ((list 1)) a)"),
        Err(RuntimeError::Argument(_))
    ));
    assert!(matches!(
        evaluator.evaluate_str("(for () () 1)"),
        Err(RuntimeError::Argument(_))
    ));
    assert!(matches!(evaluator.evaluate_str("a"), Err(RuntimeError::Eval(_))));
}

#[test]
fn throw_shapes() {
    let err = eval("(throw)").unwrap_err();
    assert_eq!(err.eid(), Some("user-exception"));
    let err = eval("(throw \"foo\")").unwrap_err();
    assert_eq!(err.eid(), Some("foo"));
    let err = eval("(throw \"foo\" \"bar\" 3)").unwrap_err();
    match err {
        RuntimeError::Exception(exception) => {
            assert_eq!(exception.eid, "foo");
            assert_eq!(exception.reason.as_deref(), Some("bar"));
            assert_eq!(exception.payload, Value::Integer(3));
        }
        other => panic!("expected exception, got {:?}", other),
    }
    assert!(matches!(eval("(throw 1)"), Err(RuntimeError::Type(_))));
    assert_eq!(
        eval("(try (throw (try (throw \"a\" \"b\") what)) what:eid)").unwrap(),
        Value::from("a")
    );
}

#[test]
fn try_yields_payload_or_runs_handler() {
    assert_eq!(eval("(try (throw \"e\" \"r\" 9))").unwrap(), Value::Integer(9));
    assert_eq!(eval("(try (throw \"e\"))").unwrap(), Value::Nil);
    assert_eq!(eval("(try 5)").unwrap(), Value::Integer(5));
    assert_eq!(eval("(try (throw \"e\" \"r\") what:reason)").unwrap(), Value::from("r"));
    // typed runtime errors reach the handler under their own id
    assert_eq!(eval("(try unbound-name what:eid)").unwrap(), Value::from("eval-error"));
    assert_eq!(eval("(try (1 2) what:eid)").unwrap(), Value::from("type-error"));
}

#[test]
fn lambda_and_gamma_methods() {
    let evaluator = Evaluator::new();
    evaluator.evaluate_str("(const f (lambda (x) x))").unwrap();
    assert_eq!(evaluator.evaluate_str("(f:lambda-p)").unwrap(), Value::Boolean(true));
    assert_eq!(evaluator.evaluate_str("(f:gamma-p)").unwrap(), Value::Boolean(false));
    evaluator.evaluate_str("(f:set-form (protect (+ x 1)))").unwrap();
    assert_eq!(evaluator.evaluate_str("(f 1)").unwrap(), Value::Integer(2));
    evaluator.evaluate_str("(f:add-argument \"y\")").unwrap();
    evaluator.evaluate_str("(f:set-form (protect (+ x y)))").unwrap();
    assert_eq!(evaluator.evaluate_str("(f 1 2)").unwrap(), Value::Integer(3));
    evaluator.evaluate_str("(f:add-closed-variable \"z\" 10)").unwrap();
    evaluator.evaluate_str("(f:set-form (protect (+ x y z)))").unwrap();
    assert_eq!(evaluator.evaluate_str("(f 1 2)").unwrap(), Value::Integer(13));
    assert_eq!(evaluator.evaluate_str("f:z").unwrap(), Value::Integer(10));
    evaluator.evaluate_str("(trans f:z 20)").unwrap();
    assert_eq!(evaluator.evaluate_str("(f 1 2)").unwrap(), Value::Integer(23));
    assert!(matches!(
        evaluator.evaluate_str("(f:set-form)"),
        Err(RuntimeError::Argument(_))
    ));
}

#[test]
fn definitions_through_namesets() {
    let evaluator = Evaluator::new();
    evaluator.evaluate_str("(const ns (nameset this))").unwrap();
    evaluator.evaluate_str("(trans ns:v 1)").unwrap();
    assert_eq!(evaluator.evaluate_str("ns:v").unwrap(), Value::Integer(1));
    // the child resolves upward through its parent
    assert_eq!(evaluator.evaluate_str("ns:+").unwrap().type_name(), "builtin");
    evaluator.evaluate_str("(unref ns:v)").unwrap();
    assert!(matches!(evaluator.evaluate_str("ns:v"), Err(RuntimeError::Eval(_))));
    evaluator.evaluate_str("(const ns:k 2)").unwrap();
    assert!(matches!(
        evaluator.evaluate_str("(unref ns:k)"),
        Err(RuntimeError::Const(_))
    ));
    assert!(matches!(
        evaluator.evaluate_str("(trans this 1)"),
        Err(RuntimeError::Nameset(_))
    ));
    assert!(matches!(
        evaluator.evaluate_str("(trans .. 1)"),
        Err(RuntimeError::Nameset(_))
    ));
}

#[test]
fn arithmetic_and_comparison() {
    assert_eq!(eval("(+ 1 2 3)").unwrap(), Value::Integer(6));
    assert_eq!(eval("(+)").unwrap(), Value::Integer(0));
    assert_eq!(eval("(+ 1 2.5)").unwrap(), Value::Real(3.5));
    assert_eq!(eval("(- 5)").unwrap(), Value::Integer(-5));
    assert_eq!(eval("(- 10 3 2)").unwrap(), Value::Integer(5));
    assert_eq!(eval("(== 2 2.0)").unwrap(), Value::Boolean(true));
    assert_eq!(eval("(== \"a\" \"a\")").unwrap(), Value::Boolean(true));
    assert_eq!(eval("(< 1 2)").unwrap(), Value::Boolean(true));
    assert_eq!(eval("(if (< 2 1) 1 2)").unwrap(), Value::Integer(2));
    assert_eq!(eval("(if false 1)").unwrap(), Value::Nil);
    assert!(matches!(eval("(+ 1 \"a\")"), Err(RuntimeError::Type(_))));
}
