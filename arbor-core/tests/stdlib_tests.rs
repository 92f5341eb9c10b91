use arbor::{Error, boot};

// ============================================================================
// Operators
// ============================================================================

#[test]
fn arithmetic_operators() {
    assert_eq!(boot(r#"["-", 7, 2]"#).unwrap(), "5");
    assert_eq!(boot(r#"["*", 6, 7]"#).unwrap(), "42");
    assert_eq!(boot(r#"["/", 1, 2]"#).unwrap(), "0.5");
    assert_eq!(boot(r#"["/", 4, 2]"#).unwrap(), "2");
    assert_eq!(boot(r#"["%", 7, 3]"#).unwrap(), "1");
}

#[test]
fn string_addition_concatenates() {
    assert_eq!(boot(r#"["+", ["quote", "a"], 1]"#).unwrap(), "\"a1\"");
    assert_eq!(
        boot(r#"["+", ["quote", "a"], ["quote", "b"]]"#).unwrap(),
        "\"ab\""
    );
}

#[test]
fn comparison_operators() {
    assert_eq!(boot(r#"["<", 1, 2]"#).unwrap(), "true");
    assert_eq!(boot(r#"[">=", 2, 2]"#).unwrap(), "true");
    assert_eq!(
        boot(r#"["<", ["quote", "apple"], ["quote", "pear"]]"#).unwrap(),
        "true"
    );
}

#[test]
fn equality_is_loose_and_strict() {
    assert_eq!(boot(r#"["==", 5, ["quote", "5"]]"#).unwrap(), "true");
    assert_eq!(boot(r#"["===", 5, ["quote", "5"]]"#).unwrap(), "false");
    assert_eq!(boot(r#"["!=", 1, 2]"#).unwrap(), "true");
}

#[test]
fn bitwise_operators() {
    assert_eq!(boot(r#"["<<", 1, 4]"#).unwrap(), "16");
    assert_eq!(boot(r#"[">>", -8, 1]"#).unwrap(), "-4");
    assert_eq!(boot(r#"[">>>", -1, 28]"#).unwrap(), "15");
    assert_eq!(boot(r#"["&", 6, 3]"#).unwrap(), "2");
    assert_eq!(boot(r#"["~", 0]"#).unwrap(), "-1");
}

#[test]
fn typeof_reports_runtime_kinds() {
    assert_eq!(boot(r#"["typeof", 1]"#).unwrap(), "\"number\"");
    assert_eq!(boot(r#"["typeof", ["quote", [1]]]"#).unwrap(), "\"list\"");
    assert_eq!(boot(r#"["typeof", ["dict"]]"#).unwrap(), "\"environment\"");
}

#[test]
fn membership_and_kind_tests() {
    assert_eq!(
        boot(r#"["in", ["quote", "a"], ["dict", "a", 1]]"#).unwrap(),
        "true"
    );
    assert_eq!(boot(r#"["in", 1, ["list", 9, 9]]"#).unwrap(), "true");
    assert_eq!(boot(r#"["in", 2, ["list", 9, 9]]"#).unwrap(), "false");
    assert_eq!(
        boot(r#"["has", ["dict", "a", 1], ["quote", "a"]]"#).unwrap(),
        "true"
    );
    assert_eq!(
        boot(r#"["instanceof", ["list"], ["quote", "Array"]]"#).unwrap(),
        "true"
    );
    assert_eq!(
        boot(r#"["is", 1, ["quote", "number"]]"#).unwrap(),
        "true"
    );
}

// ============================================================================
// Control flow
// ============================================================================

#[test]
fn untaken_branches_never_evaluate() {
    assert_eq!(
        boot(r#"["if", ["<", 1, 2], 1, ["throw", 0]]"#).unwrap(),
        "1"
    );
    assert_eq!(boot(r#"["&&", false, ["throw", 0]]"#).unwrap(), "false");
    assert_eq!(boot(r#"["||", 5, ["throw", 0]]"#).unwrap(), "5");
}

#[test]
fn if_without_alternative_yields_null() {
    assert_eq!(boot(r#"["if", false, 1]"#).unwrap(), "null");
}

#[test]
fn cond_picks_the_first_matching_pair() {
    assert_eq!(
        boot(r#"["cond", false, 1, true, 2, true, 3]"#).unwrap(),
        "2"
    );
    assert_eq!(boot(r#"["cond", false, 1]"#).unwrap(), "null");
}

#[test]
fn case_matches_values_and_lists() {
    assert_eq!(
        boot(r#"["case", 2, 0, 1, 10, ["quote", [2, 3]], 20]"#).unwrap(),
        "20"
    );
    assert_eq!(boot(r#"["case", 9, 0, 1, 10]"#).unwrap(), "0");
}

#[test]
fn loops_collect_body_results() {
    assert_eq!(boot(r#"["loop", 3, 1]"#).unwrap(), "[1,1,1]");
    assert_eq!(
        boot(
            r#"["do", ["=", "i", 0],
                ["while", ["<", ["i"], 3], ["do", ["mut", "+", "i", 1], ["i"]]]]"#
        )
        .unwrap(),
        "[1,2,3]"
    );
    assert_eq!(
        boot(
            r#"["for", ["=", "i", 0], ["<", ["i"], 2], ["mut", "+", "i", 1], ["i"]]"#
        )
        .unwrap(),
        "[0,1]"
    );
    assert_eq!(
        boot(
            r#"["do", ["=", "i", 0],
                ["until", ["<", ["i"], 0], ["do", ["mut", "+", "i", 1], ["i"]]]]"#
        )
        .unwrap(),
        "[1]"
    );
}

#[test]
fn logic_operators_yield_operands_or_booleans() {
    assert_eq!(boot(r#"["&&", 1, 2]"#).unwrap(), "2");
    assert_eq!(boot(r#"["||", 0, 2]"#).unwrap(), "2");
    assert_eq!(boot(r#"["&&&", 1, 2]"#).unwrap(), "true");
    assert_eq!(boot(r#"["?:", true, 1, 2]"#).unwrap(), "1");
    assert_eq!(boot(r#"[",", 1, 2]"#).unwrap(), "2");
    assert_eq!(boot(r#"["!", 0]"#).unwrap(), "true");
    assert_eq!(boot(r#"["void", 1]"#).unwrap(), "null");
}

// ============================================================================
// Iteration
// ============================================================================

#[test]
fn forin_binds_indices() {
    assert_eq!(
        boot(r#"["forin", "i", ["list", 9, 9], ["i"]]"#).unwrap(),
        "[0,1]"
    );
}

#[test]
fn each_binds_elements() {
    assert_eq!(
        boot(r#"["each", "v", ["list", 1, 2, 3], ["*", ["v"], 2]]"#).unwrap(),
        "[2,4,6]"
    );
}

#[test]
fn find_and_filter() {
    assert_eq!(
        boot(r#"["find", "v", ["list", 1, 2, 3], [">", ["v"], 1]]"#).unwrap(),
        "2"
    );
    assert_eq!(
        boot(r#"["find", "v", ["list", 1], [">", ["v"], 9]]"#).unwrap(),
        "null"
    );
    assert_eq!(
        boot(r#"["filter", "v", ["list", 1, 2, 3, 4], [">", ["v"], 2]]"#).unwrap(),
        "[3,4]"
    );
}

#[test]
fn iteration_combinators_require_lists() {
    assert!(matches!(
        boot(r#"["each", "v", 5, ["v"]]"#),
        Err(Error::BadArgumentType(_))
    ));
}

#[test]
fn table_and_range() {
    assert_eq!(
        boot(r#"["table", "i", 0, 3, 1, ["*", ["i"], ["i"]]]"#).unwrap(),
        "[0,1,4]"
    );
    assert_eq!(boot(r#"["range", 0, 3, 1]"#).unwrap(), "[0,1,2]");
}

#[test]
fn folds() {
    assert_eq!(
        boot(r#"["foldl", "a", "b", ["list", 1, 2, 3], ["+", ["a"], ["b"]]]"#).unwrap(),
        "6"
    );
    assert_eq!(
        boot(r#"["foldr", "a", "b", ["list", 8, 4, 2], ["/", ["a"], ["b"]]]"#).unwrap(),
        "4"
    );
    assert_eq!(
        boot(r#"["foldl", "a", "b", ["list"], 0]"#).unwrap(),
        "null"
    );
}

#[test]
fn map_and_reduce_call_a_function_value() {
    assert_eq!(
        boot(r#"["map", ["lambda", "argcall", "x", "i", ["*", ["x"], 10]], ["list", 1, 2]]"#)
            .unwrap(),
        "[10,20]"
    );
    assert_eq!(
        boot(
            r#"["reducel", ["lambda", "argcall", "a", "b", ["+", ["a"], ["b"]]], ["list", 1, 2, 3]]"#
        )
        .unwrap(),
        "6"
    );
}

// ============================================================================
// Collections
// ============================================================================

#[test]
fn list_head_do() {
    assert_eq!(boot(r#"["list", 1, ["quote", "x"]]"#).unwrap(), r#"[1,"x"]"#);
    assert_eq!(boot(r#"["head", 1, 2]"#).unwrap(), "1");
    assert_eq!(boot(r#"["do", 1, 2, 3]"#).unwrap(), "3");
}

#[test]
fn dict_builds_a_marked_record() {
    assert_eq!(
        boot(r#"["dict", "a", 1, "b", 2]"#).unwrap(),
        r#"{"ARBOR":true,"a":1,"b":2}"#
    );
}

#[test]
fn count_tallies_values() {
    assert_eq!(
        boot(r#"["count", "a", "b", "a"]"#).unwrap(),
        r#"{"ARBOR":true,"a":2,"b":1}"#
    );
}

#[test]
fn mkenv_chains_to_the_current_scope() {
    assert_eq!(
        boot(r#"["do", ["=", "x", 7], [["mkenv"], ["x"]]]"#).unwrap(),
        "7"
    );
}

#[test]
fn length_index_and_friends() {
    assert_eq!(boot(r#"["length", ["list", 1, 2, 3]]"#).unwrap(), "3");
    assert_eq!(boot(r#"["length", ["quote", "abc"]]"#).unwrap(), "3");
    assert_eq!(boot(r#"["index", ["list", 5, 6], 1]"#).unwrap(), "6");
    assert_eq!(boot(r#"["index", ["list", 5, 6], 9]"#).unwrap(), "null");
    assert_eq!(boot(r#"["xindex", ["list", 5, 6], 3]"#).unwrap(), "6");
    assert_eq!(
        boot(r#"["indexSet", ["list", 1, 2], 0, 9]"#).unwrap(),
        "[9,2]"
    );
    assert!(matches!(
        boot(r#"["indexSet", ["quote", "ab"], 0, ["quote", "c"]]"#),
        Err(Error::BadArgumentType(_))
    ));
    assert!(matches!(
        boot(r#"["length", 5]"#),
        Err(Error::BadArgumentType(_))
    ));
}

#[test]
fn keys_lists_member_names() {
    assert_eq!(
        boot(r#"["keys", ["dict", "b", 1, "a", 2]]"#).unwrap(),
        r#"["ARBOR","a","b"]"#
    );
}

// ============================================================================
// Conversions
// ============================================================================

#[test]
fn conversions() {
    assert_eq!(boot(r#"["string", ["list", 1, 2]]"#).unwrap(), "\"1,2\"");
    assert_eq!(boot(r#"["number", true]"#).unwrap(), "1");
    assert_eq!(boot(r#"["number", ["quote", "2.5"]]"#).unwrap(), "2.5");
    assert_eq!(boot(r#"["boolean", ["quote", ""]]"#).unwrap(), "false");
    assert_eq!(boot(r#"["int", ["quote", "12px"]]"#).unwrap(), "12");
    assert_eq!(boot(r#"["int", ["quote", "ff"], 16]"#).unwrap(), "255");
    assert_eq!(boot(r#"["float", ["quote", "2.5rem"]]"#).unwrap(), "2.5");
    assert_eq!(boot(r#"["chr", 104, 105]"#).unwrap(), "\"hi\"");
    assert_eq!(boot(r#"["isNaN", ["quote", "x"]]"#).unwrap(), "true");
    assert_eq!(boot(r#"["isFinite", 1]"#).unwrap(), "true");
    assert_eq!(boot(r#"["isArray", ["list"]]"#).unwrap(), "true");
}

#[test]
fn parse_and_stringify_round_trip() {
    assert_eq!(
        boot(r#"["stringify", ["parse", ["quote", "[1,2]"]]]"#).unwrap(),
        r#""[1,2]""#
    );
    // repr is an alias for stringify.
    assert_eq!(boot(r#"["repr", ["quote", "x"]]"#).unwrap(), r#""\"x\"""#);
}

// ============================================================================
// Constants
// ============================================================================

#[test]
fn constants_are_nullary_calls() {
    assert!(boot(r#"["PI"]"#).unwrap().starts_with("3.14159"));
    assert_eq!(boot(r#"["undefined"]"#).unwrap(), "null");
    // Non-finite numbers have no notation of their own.
    assert_eq!(boot(r#"["Infinity"]"#).unwrap(), "null");
    assert_eq!(boot(r#"["NaN"]"#).unwrap(), "null");
}

// ============================================================================
// Host bridges
// ============================================================================

#[test]
fn math_bridge_methods() {
    assert_eq!(boot(r#"["Math", ["floor", 2.7]]"#).unwrap(), "2");
    assert_eq!(boot(r#"["Math", ["round", -1.5]]"#).unwrap(), "-1");
    assert_eq!(boot(r#"["Math", ["max", 1, 5, 3]]"#).unwrap(), "5");
    assert_eq!(boot(r#"["Math", ["pow", 2, 10]]"#).unwrap(), "1024");
}

#[test]
fn bridge_records_fall_back_to_the_library() {
    assert_eq!(boot(r#"["Math", ["+", 1, 2]]"#).unwrap(), "3");
}

#[test]
fn string_bridge_methods() {
    assert_eq!(
        boot(r#"["String", ["toUpperCase", ["quote", "ab"]]]"#).unwrap(),
        "\"AB\""
    );
    assert_eq!(
        boot(r#"["String", ["slice", ["quote", "hello"], 1, 3]]"#).unwrap(),
        "\"el\""
    );
    assert_eq!(
        boot(r#"["String", ["split", ["quote", "a-b"], ["quote", "-"]]]"#).unwrap(),
        r#"["a","b"]"#
    );
    assert_eq!(
        boot(r#"["String", ["indexOf", ["quote", "hello"], ["quote", "ll"]]]"#).unwrap(),
        "2"
    );
}

#[test]
fn array_bridge_methods() {
    assert_eq!(
        boot(r#"["Array", ["join", ["list", 1, 2], ["quote", "-"]]]"#).unwrap(),
        "\"1-2\""
    );
    assert_eq!(
        boot(r#"["Array", ["reverse", ["list", 1, 2, 3]]]"#).unwrap(),
        "[3,2,1]"
    );
    assert_eq!(
        boot(r#"["Array", ["indexOf", ["list", 5, 6], 6]]"#).unwrap(),
        "1"
    );
}

#[test]
fn number_bridge_methods() {
    assert_eq!(
        boot(r#"["Number", ["toFixed", 3.14159, 2]]"#).unwrap(),
        "\"3.14\""
    );
    assert_eq!(
        boot(r#"["Number", ["toString", 255, 16]]"#).unwrap(),
        "\"ff\""
    );
}

#[test]
fn bridge_methods_check_their_receiver() {
    assert!(matches!(
        boot(r#"["String", ["toUpperCase", 5]]"#),
        Err(Error::BadMethodAccess(_))
    ));
    assert!(matches!(
        boot(r#"["Array", ["join", 5]]"#),
        Err(Error::BadMethodAccess(_))
    ));
}

// ============================================================================
// Regexp helpers
// ============================================================================

#[test]
fn regexp_helpers() {
    assert_eq!(
        boot(r#"["reTest", ["quote", "^a+$"], ["quote", "aaa"]]"#).unwrap(),
        "true"
    );
    assert_eq!(
        boot(r#"["reMatch", ["quote", "\\d+"], ["quote", "a1b22"]]"#).unwrap(),
        r#"["1","22"]"#
    );
    assert_eq!(
        boot(r#"["reReplace", ["quote", "\\s+"], ["quote", "a  b"], ["quote", "_"]]"#).unwrap(),
        "\"a_b\""
    );
    assert!(matches!(
        boot(r#"["reTest", ["quote", "("], ["quote", "x"]]"#),
        Err(Error::BadArgumentType(_))
    ));
}
