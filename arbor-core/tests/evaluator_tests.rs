use arbor::{Environment, Error, Value, boot, call, exec, init};

// ============================================================================
// Self-evaluation
// ============================================================================

#[test]
fn literals_evaluate_to_themselves() {
    let env = init();
    for literal in [
        Value::Null,
        Value::Bool(true),
        Value::int(42),
        Value::float(2.5),
        Value::str("hello"),
    ] {
        assert_eq!(call(&env, &literal).unwrap(), literal);
    }
}

#[test]
fn literal_programs_round_trip() {
    for text in ["null", "true", "false", "5", "0.5", "\"hi\""] {
        assert_eq!(boot(text).unwrap(), text);
    }
}

#[test]
fn objects_are_literals() {
    assert_eq!(boot(r#"{"a":[1,2]}"#).unwrap(), r#"{"a":[1,2]}"#);
}

#[test]
fn quote_protects_lists_from_evaluation() {
    assert_eq!(boot(r#"["quote", [1, 2]]"#).unwrap(), "[1,2]");
}

// ============================================================================
// Call dispatch
// ============================================================================

#[test]
fn addition_end_to_end() {
    assert_eq!(boot(r#"["+", 1, 2]"#).unwrap(), "3");
}

#[test]
fn conditional_end_to_end() {
    assert_eq!(
        boot(r#"["if", ["<", 1, 2], ["quote", "yes"], ["quote", "no"]]"#).unwrap(),
        "\"yes\""
    );
}

#[test]
fn empty_call_is_not_callable() {
    assert!(matches!(boot("[]"), Err(Error::NotCallable(_))));
}

#[test]
fn numbers_are_not_callable() {
    assert!(matches!(boot("[5, 1]"), Err(Error::NotCallable(_))));
}

#[test]
fn unknown_callee_name_fails_resolution() {
    assert!(matches!(
        boot(r#"["no-such-thing"]"#),
        Err(Error::NameNotFound(_))
    ));
}

#[test]
fn null_resolution_is_callee_not_found() {
    // A getq override that declines (yields null) turns a string callee
    // into a missing one.
    let env = init();
    env.set("getq", arbor::parse(r#"["quote", null]"#).unwrap())
        .unwrap();
    let program = arbor::parse(r#"["x"]"#).unwrap();
    assert!(matches!(
        call(&env, &program),
        Err(Error::CalleeNotFound(_))
    ));
}

#[test]
fn aliases_redispatch_to_their_targets() {
    // ":=" resolves to the string "set", which resolves again.
    assert_eq!(boot(r#"[":=", "x", 5]"#).unwrap(), "5");
    assert_eq!(boot(r#"["~~", 5]"#).unwrap(), "-5");
    // The empty-string alias is quote.
    assert_eq!(boot(r#"["", [1, 2]]"#).unwrap(), "[1,2]");
}

#[test]
fn environment_callee_scopes_its_argument() {
    assert_eq!(boot(r#"[["dict", "a", 41], [":", "a"]]"#).unwrap(), "41");
}

#[test]
fn marked_object_literal_acts_as_environment() {
    assert_eq!(
        boot(r#"[["quote", {"ARBOR": true, "a": 41}], [":", "a"]]"#).unwrap(),
        "41"
    );
}

#[test]
fn unmarked_object_callee_is_rejected_by_the_guard() {
    assert!(matches!(
        boot(r#"[["quote", {"a": 1}], [":", "a"]]"#),
        Err(Error::Privileged(_))
    ));
}

// ============================================================================
// Variable idioms
// ============================================================================

#[test]
fn var_binds_quoted_and_call_derefs() {
    assert_eq!(boot(r#"["do", ["=", "x", 5], ["x"]]"#).unwrap(), "5");
}

#[test]
fn var_returns_the_installed_binding() {
    assert_eq!(boot(r#"["=", "x", 5]"#).unwrap(), r#"["quote",5]"#);
}

#[test]
fn set_then_get_round_trips() {
    assert_eq!(
        boot(r#"["do", [":=", "x", 5], [":", "x"]]"#).unwrap(),
        "5"
    );
}

#[test]
fn mut_applies_through_the_binding() {
    assert_eq!(
        boot(r#"["do", ["=", "i", 3], ["mut", "+", "i", 10], ["i"]]"#).unwrap(),
        "13"
    );
}

#[test]
fn eval_takes_one_extra_step() {
    // pass evaluates once, eval twice.
    assert_eq!(
        boot(r#"["pass", ["quote", ["+", 1, 2]]]"#).unwrap(),
        r#"["+",1,2]"#
    );
    assert_eq!(boot(r#"["eval", ["quote", ["+", 1, 2]]]"#).unwrap(), "3");
}

// ============================================================================
// Embedding surface
// ============================================================================

#[test]
fn exec_keeps_state_between_programs() {
    let env = init();
    exec(&env, r#"["=", "x", 5]"#).unwrap();
    assert_eq!(exec(&env, r#"["x"]"#).unwrap(), "5");
}

#[test]
fn exec_reports_syntax_errors() {
    assert!(matches!(exec(&init(), "[1,"), Err(Error::Syntax(_))));
}

#[test]
fn init_returns_marked_independent_roots() {
    let a = init();
    let b = init();
    assert!(a.is_runtime());
    assert!(!a.ptr_eq(&b));
    a.set("x", Value::int(1)).unwrap();
    assert_eq!(b.get("x"), None);
}

#[test]
fn core_operations_are_guarded_outside_runtime_records() {
    let plain = Environment::new();
    assert!(matches!(
        arbor::core_func(&plain, &[Value::str("envq")]),
        Err(Error::Privileged(_))
    ));
}
