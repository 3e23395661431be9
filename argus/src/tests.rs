use crate::checker::{CheckKind, Checker};
use crate::decorate::{check_args, check_rets, decorate, Config, ErrorHandling, HostFn};
use crate::error::BuildError;
use crate::nfa::build;
use crate::parser;
use crate::registry::Registry;
use crate::signature::{ParamNode, Signature, TypeExpr};
use crate::value::Value;
use proptest::prelude::*;
use regex::Regex as LibRegex;
use std::cell::RefCell;
use std::rc::Rc;

const VARARG_SIG: &str =
    "func( [string [, userdata] [, boolean],] [number,] ... )\n... : ((table, string/number) / boolean)*";

fn registry_with_mytable() -> Registry {
    let mut registry = Registry::new();
    registry
        .register("mytable", |v| {
            matches!(v.field("is_mytable"), Some(Value::Boolean(true)))
        })
        .unwrap();
    registry
}

fn new_mytable() -> Value {
    Value::table_from([("is_mytable", Value::from(true))])
}

#[test]
fn required_single_argument() {
    let registry = Registry::new();
    let checker = check_args("func( n ) ==> number\nn : number/boolean", &registry).unwrap();
    assert!(checker.check(&[Value::from(12)]).is_ok());
    assert!(checker.check(&[Value::from(false)]).is_ok());
    let err = checker
        .check(&[Value::from(12), Value::from(13)])
        .unwrap_err();
    assert_eq!(err.to_string(), "func: too many arguments (expected 1).");
    let err = checker.check(&[]).unwrap_err();
    assert_eq!(
        err.to_string(),
        "func: missing argument(s) at index 1 (expected number/boolean)."
    );
    let err = checker.check(&[Value::from("x")]).unwrap_err();
    assert_eq!(
        err.to_string(),
        "func: number/boolean expected for argument no. 1 (got string)."
    );
}

#[test]
fn decorated_function_invokes_underlying() {
    let registry = Registry::new();
    let called = Rc::new(RefCell::new(Vec::new()));
    let log = called.clone();
    let f: HostFn = Rc::new(move |args| {
        if let Value::Number(n) = &args[0] {
            log.borrow_mut().push(*n);
        }
        Ok(vec![Value::from(0)])
    });
    let wrapped = decorate(
        f,
        "func( n ) ==> number\nn : number/boolean",
        &registry,
        &Config::default(),
    )
    .unwrap();
    assert_eq!(wrapped(&[Value::from(12)]).unwrap(), vec![Value::from(0)]);
    assert!(wrapped(&[Value::from("x")]).is_err());
    // the rejected call never reached the function
    assert_eq!(*called.borrow(), vec![12.0]);
}

#[test]
fn return_value_sequences() {
    let registry = Registry::new();
    let checker = check_rets("func( string ) ==> number/string, string", &registry).unwrap();
    assert!(checker.check(&[Value::from(1), Value::from("nix")]).is_ok());
    assert!(checker
        .check(&[Value::from("nix"), Value::from("da")])
        .is_ok());
    let err = checker
        .check(&[Value::from(1), Value::from("nix"), Value::from(2)])
        .unwrap_err();
    assert_eq!(err.to_string(), "func: too many return values (expected 2).");
    let err = checker.check(&[]).unwrap_err();
    assert_eq!(
        err.to_string(),
        "func: missing return value(s) at index 1 (expected number/string)."
    );
    let err = checker.check(&[Value::from(false)]).unwrap_err();
    assert_eq!(
        err.to_string(),
        "func: number/string expected for return value no. 1 (got boolean)."
    );
}

#[test]
fn optional_groups_and_vararg() {
    let registry = Registry::new();
    let checker = check_args(VARARG_SIG, &registry).unwrap();
    assert!(checker.check(&[]).is_ok());
    assert!(checker
        .check(&[Value::from("a"), Value::userdata("file"), Value::from(true)])
        .is_ok());
    assert!(checker
        .check(&[
            Value::from(12),
            Value::table(),
            Value::from("b"),
            Value::from(false),
            Value::from(true),
            Value::table(),
            Value::from(13),
        ])
        .is_ok());
    let err = checker.check(&[Value::userdata("file")]).unwrap_err();
    let message = err.to_string();
    assert!(message.contains("got userdata"), "{message}");
    assert!(message.contains("too many arguments"), "{message}");
}

#[test]
fn method_receiver_offsets() {
    let registry = Registry::new();
    let checker = check_args("obj:method( number )", &registry).unwrap();
    assert!(checker.check(&[Value::table(), Value::from(12)]).is_ok());
    assert!(checker
        .check(&[Value::userdata("obj"), Value::from(12)])
        .is_ok());
    let err = checker.check(&[Value::table()]).unwrap_err();
    assert_eq!(
        err.to_string(),
        "obj.method: missing argument(s) at index 1 (expected number)."
    );
    let err = checker.check(&[Value::from(12)]).unwrap_err();
    assert_eq!(
        err.to_string(),
        "obj.method: userdata/table expected for argument no. 0 (got number)."
    );
}

#[test]
fn custom_type_with_overlapping_predicates() {
    let registry = registry_with_mytable();
    let docstring = "func( number, [table,] mytable ) => (table, boolean) / (mytable, number)";
    let checker = check_args(docstring, &registry).unwrap();
    assert!(checker.dfa().needs_backtracking());
    assert!(checker
        .check(&[Value::from(1), Value::table(), new_mytable()])
        .is_ok());
    // the optional table is skipped, which the first-match strategy alone would miss
    assert!(checker.check(&[Value::from(1), new_mytable()]).is_ok());
    let err = checker
        .check(&[Value::from(2), new_mytable(), Value::table()])
        .unwrap_err();
    assert_eq!(
        err.to_string(),
        "func: mytable expected for argument no. 3 (got table) , or too many arguments (expected 2)."
    );

    let rets = check_rets(docstring, &registry).unwrap();
    assert!(rets.check(&[Value::table(), Value::from(true)]).is_ok());
    assert!(rets.check(&[new_mytable(), Value::from(7)]).is_ok());
    // a mytable is also a table, so this only fits the first return shape
    assert!(rets.check(&[new_mytable(), Value::from(true)]).is_ok());
    assert!(rets.check(&[Value::table(), Value::from(7)]).is_err());
}

#[test]
fn build_errors() {
    let registry = Registry::new();
    assert_eq!(
        parser::signature("A docstring without any signature.\n\nJust prose.").unwrap_err(),
        BuildError::NoSignature
    );
    assert_eq!(
        check_args("func( a ) ==> number", &registry).unwrap_err(),
        BuildError::UndefinedType("a".into())
    );
    assert_eq!(
        check_args("func( a, a ) ==> number\na : number", &registry).unwrap_err(),
        BuildError::DuplicateParamUse("a".into())
    );
    assert_eq!(
        check_args("func( a ) ==> number\na : number\na : integer", &registry).unwrap_err(),
        BuildError::ParamRedefined("a".into())
    );
    assert_eq!(
        check_rets("func( a ) ==> n\na : number", &registry).unwrap_err(),
        BuildError::UndefinedType("n".into())
    );
}

#[test]
fn malformed_signature_reporting() {
    assert!(matches!(
        parser::signature("func( n ==> number").unwrap_err(),
        BuildError::MalformedSignature { .. }
    ));
    assert!(matches!(
        parser::signature("func( ..., n )\nn : number").unwrap_err(),
        BuildError::MalformedSignature { .. }
    ));
    assert!(matches!(
        parser::signature("func( [...] )").unwrap_err(),
        BuildError::MalformedSignature { .. }
    ));
    // a later paragraph that parses wins over an earlier malformed candidate
    let sig = parser::signature("broken( n ==> number\n\nfunc( n )\nn : number").unwrap();
    assert_eq!(sig.designator, "func");
}

#[test]
fn first_matching_paragraph_wins() {
    let sig = parser::signature(
        "Frobnicates the widget.\n\nSee also the spin module.\n\nwidget.frob( w ) ==> boolean\nw : table",
    )
    .unwrap();
    assert_eq!(sig.designator, "widget.frob");
    assert!(!sig.is_method);
    assert_eq!(sig.returns.len(), 1);
}

#[test]
fn comments_and_arrows() {
    let registry = Registry::new();
    let docstring = "func( a, -- first\n      b ) =====> number -- the result\na : number\nb : string";
    let sig = parser::signature(docstring).unwrap();
    assert_eq!(sig.params.len(), 2);
    assert_eq!(sig.returns, vec![TypeExpr::Name(Rc::from("number"))]);
    let checker = check_args(docstring, &registry).unwrap();
    assert!(checker.check(&[Value::from(1), Value::from("s")]).is_ok());
}

#[test]
fn method_self_prefers_object() {
    let mut registry = Registry::new();
    registry
        .register("object", |v| matches!(v, Value::Table(_)))
        .unwrap();
    let checker = check_args("obj:method( number )", &registry).unwrap();
    assert!(checker.check(&[Value::table(), Value::from(1)]).is_ok());
    let err = checker
        .check(&[Value::userdata("x"), Value::from(1)])
        .unwrap_err();
    assert_eq!(
        err.to_string(),
        "obj.method: object expected for argument no. 0 (got userdata)."
    );
}

#[test]
fn explicit_self_mapping_overrides_default() {
    let registry = Registry::new();
    let checker = check_args("obj:method( n )\nself : table\nn : number", &registry).unwrap();
    assert!(checker.check(&[Value::table(), Value::from(1)]).is_ok());
    assert!(checker
        .check(&[Value::userdata("x"), Value::from(1)])
        .is_err());
}

#[test]
fn empty_parameter_list() {
    let registry = Registry::new();
    let checker = check_args("ping()", &registry).unwrap();
    assert!(checker.check(&[]).is_ok());
    let err = checker.check(&[Value::Nil]).unwrap_err();
    assert_eq!(err.to_string(), "ping: too many arguments (expected 0).");
}

#[test]
fn unknown_types_fail_at_build_not_parse() {
    let registry = Registry::new();
    let sig = parser::signature("func( zzz )").unwrap();
    assert!(sig.type_of("zzz").is_none());
    assert_eq!(
        check_args("func( zzz )", &registry).unwrap_err(),
        BuildError::UndefinedType("zzz".into())
    );
}

#[test]
fn unmapped_vararg_is_undefined() {
    let registry = Registry::new();
    assert_eq!(
        check_args("func( ... )", &registry).unwrap_err(),
        BuildError::UndefinedType("...".into())
    );
}

#[test]
fn registry_name_grammar() {
    let mut registry = Registry::new();
    assert_eq!(
        registry.register("3d", |_| true).unwrap_err(),
        BuildError::InvalidTypeName("3d".into())
    );
    assert!(registry.register("_ok2", |_| true).is_ok());
}

#[test]
fn no_return_clauses() {
    let registry = Registry::new();
    let checker = check_rets("func( n )\nn : number", &registry).unwrap();
    assert!(checker.check(&[]).is_ok());
    assert!(checker.check(&[Value::Nil]).is_err());
    // decoration simply skips return checking
    let f: HostFn = Rc::new(|_| Ok(vec![Value::Nil]));
    let wrapped = decorate(f, "func( n )\nn : number", &registry, &Config::default()).unwrap();
    assert!(wrapped(&[Value::from(1)]).is_ok());
}

#[test]
fn decoration_config() {
    let registry = Registry::new();
    let f: HostFn = Rc::new(|_| Ok(vec![Value::from("not a number")]));

    let config = Config {
        enabled: false,
        ..Config::default()
    };
    let wrapped = decorate(f.clone(), "func( n )\nn : number", &registry, &config).unwrap();
    assert!(wrapped(&[Value::Nil]).is_ok());

    let wrapped = decorate(
        f.clone(),
        "func( n ) ==> number\nn : number",
        &registry,
        &Config::default(),
    )
    .unwrap();
    let err = wrapped(&[Value::from(1)]).unwrap_err();
    assert_eq!(err.kind(), CheckKind::Return);
    assert_eq!(
        err.to_string(),
        "func: number expected for return value no. 1 (got string)."
    );

    let config = Config {
        check_returns: false,
        ..Config::default()
    };
    let wrapped = decorate(f, "func( n ) ==> number\nn : number", &registry, &config).unwrap();
    assert!(wrapped(&[Value::from(1)]).is_ok());
    assert!(wrapped(&[Value::Nil]).is_err()); // arguments are still checked
}

#[test]
fn reported_build_errors_degrade() {
    let registry = Registry::new();
    let seen = Rc::new(RefCell::new(Vec::new()));
    let log = seen.clone();
    let config = Config {
        on_build_error: ErrorHandling::Report(Rc::new(move |e: &BuildError| {
            log.borrow_mut().push(e.clone())
        })),
        ..Config::default()
    };
    let f: HostFn = Rc::new(|_| Ok(vec![]));
    let wrapped = decorate(f, "func( a )", &registry, &config).unwrap();
    assert!(wrapped(&[Value::Nil]).is_ok());
    assert_eq!(*seen.borrow(), vec![BuildError::UndefinedType("a".into())]);
}

#[test]
fn backtracking_flag_heuristic() {
    let registry = registry_with_mytable();
    // purely primitive branching stays linear
    let sig = parser::signature(VARARG_SIG).unwrap();
    assert!(!build::assemble_args(&sig, &registry).unwrap().needs_backtracking());
    // a user type after an optional group forces backtracking
    let sig = parser::signature("func( number, [table,] mytable )").unwrap();
    assert!(build::assemble_args(&sig, &registry).unwrap().needs_backtracking());
    // a user type alone stays linear
    let sig = parser::signature("func( mytable )").unwrap();
    assert!(!build::assemble_args(&sig, &registry).unwrap().needs_backtracking());
}

#[test]
fn error_messages_are_deterministic() {
    let registry = registry_with_mytable();
    let docstring = "func( number, [table,] mytable )";
    let checker = check_args(docstring, &registry).unwrap();
    let args = [Value::from(2), new_mytable(), Value::table()];
    let first = checker.check(&args).unwrap_err().to_string();
    for _ in 0..10 {
        assert_eq!(checker.check(&args).unwrap_err().to_string(), first);
    }
    let rebuilt = check_args(docstring, &registry).unwrap();
    assert_eq!(rebuilt.check(&args).unwrap_err().to_string(), first);
}

fn type_name() -> impl Strategy<Value = Rc<str>> {
    prop::sample::select(vec!["number", "string", "boolean", "table", "userdata", "nil"])
        .prop_map(|name| Rc::from(name))
}

fn type_expr() -> impl Strategy<Value = TypeExpr> {
    type_name().prop_map(TypeExpr::Name).prop_recursive(4, 24, 4, |inner| {
        prop_oneof![
            prop::collection::vec(inner.clone(), 2..4).prop_map(TypeExpr::Seq),
            prop::collection::vec(inner.clone(), 2..4).prop_map(TypeExpr::Alt),
            inner.clone().prop_map(|e| TypeExpr::Star(Box::new(e))),
            inner.prop_map(|e| TypeExpr::Opt(Box::new(e))),
        ]
    })
}

// The restricted right-hand side of a named mapping line.
fn name_alt() -> impl Strategy<Value = TypeExpr> {
    prop::collection::vec(type_name().prop_map(TypeExpr::Name), 1..3).prop_map(|mut names| {
        if names.len() > 1 {
            TypeExpr::Alt(names)
        } else {
            names.remove(0)
        }
    })
}

prop_compose! {
    fn signature_strategy()(
        names in prop::sample::subsequence(vec!["alpha", "beta", "gamma", "delta"], 0..=4),
        groups in prop::collection::vec(any::<bool>(), 4),
        mapped in prop::collection::vec(any::<bool>(), 4),
        rhss in prop::collection::vec(name_alt(), 4),
        returns in prop::collection::vec(type_expr(), 0..3),
        vararg in any::<bool>(),
        vararg_mapped in any::<bool>(),
        vararg_expr in type_expr(),
        method in any::<bool>(),
    ) -> Signature {
        let mut params = Vec::new();
        let mut param_types: Vec<(Rc<str>, TypeExpr)> = Vec::new();
        for (idx, name) in names.iter().enumerate() {
            let node = ParamNode::Named(Rc::from(*name));
            params.push(if groups[idx] { ParamNode::Group(vec![node]) } else { node });
            if mapped[idx] {
                param_types.push((Rc::from(*name), rhss[idx].clone()));
            }
        }
        if vararg {
            if vararg_mapped {
                params.push(ParamNode::Vararg(vararg_expr.clone()));
                param_types.push((Rc::from("..."), vararg_expr));
            } else {
                params.push(ParamNode::Vararg(TypeExpr::Name(Rc::from("..."))));
            }
        }
        Signature {
            designator: if method { "m.obj:frob".into() } else { "m.obj.frob".into() },
            is_method: method,
            params,
            returns,
            param_types,
            raw_text: String::new(),
        }
    }
}

fn oracle_expr() -> impl Strategy<Value = TypeExpr> {
    let leaf = prop_oneof![
        Just(TypeExpr::Name(Rc::from("number"))),
        Just(TypeExpr::Name(Rc::from("string"))),
        Just(TypeExpr::Name(Rc::from("boolean"))),
    ];
    leaf.prop_recursive(3, 16, 3, |inner| {
        prop_oneof![
            prop::collection::vec(inner.clone(), 2..4).prop_map(TypeExpr::Seq),
            prop::collection::vec(inner.clone(), 2..4).prop_map(TypeExpr::Alt),
            inner.clone().prop_map(|e| TypeExpr::Star(Box::new(e))),
            inner.prop_map(|e| TypeExpr::Opt(Box::new(e))),
        ]
    })
}

fn kind_letter(name: &str) -> char {
    match name {
        "number" => 'n',
        "string" => 's',
        _ => 'b',
    }
}

fn to_pattern(expr: &TypeExpr) -> String {
    match expr {
        TypeExpr::Name(name) => kind_letter(name).to_string(),
        TypeExpr::Seq(items) => items
            .iter()
            .map(|item| format!("(?:{})", to_pattern(item)))
            .collect(),
        TypeExpr::Alt(items) => format!(
            "(?:{})",
            items.iter().map(to_pattern).collect::<Vec<_>>().join("|")
        ),
        TypeExpr::Star(inner) => format!("(?:{})*", to_pattern(inner)),
        TypeExpr::Opt(inner) => format!("(?:{})?", to_pattern(inner)),
    }
}

fn value_for(letter: char) -> Value {
    match letter {
        'n' => Value::from(1),
        's' => Value::from("x"),
        _ => Value::from(true),
    }
}

proptest! {
    /// The parser terminates with a signature or an error on any input.
    #[test]
    fn parser_never_panics(docstring in any::<String>()) {
        let _ = parser::signature(&docstring);
    }

    /// As above, over inputs biased towards signature-like shapes.
    #[test]
    fn parser_never_panics_on_near_signatures(docstring in "[a-z(),:=>/\\[\\]. \n-]{0,80}") {
        let _ = parser::signature(&docstring);
    }

    /// Rendering a signature to canonical text and re-parsing yields the same signature.
    #[test]
    fn signature_text_round_trips(sig in signature_strategy()) {
        let text = sig.to_text();
        let reparsed = parser::signature(&text).unwrap();
        prop_assert!(sig.same_shape(&reparsed), "rendered as: {}", text);
    }

    /// The compiled checker accepts exactly the regular language of the type expression,
    /// with kinds as letters and the regex crate as oracle. Also pins down that the
    /// backtracking interpreter recognizes the same language as the linear one.
    #[test]
    fn checker_agrees_with_regex_oracle(expr in oracle_expr(), word in "[nsb]{0,8}") {
        let registry = Registry::new();
        let dfa = build::from_expr(&expr, &registry).unwrap().to_dfa();
        let values: Vec<Value> = word.chars().map(value_for).collect();
        let oracle = LibRegex::new(&format!("^(?:{})$", to_pattern(&expr))).unwrap();

        let checker = Checker::new(dfa.clone(), CheckKind::Argument, "t".into(), 0, 1);
        prop_assert_eq!(checker.check(&values).is_ok(), oracle.is_match(&word));

        let mut forced = dfa;
        forced.needs_backtracking = true;
        let forced = Checker::new(forced, CheckKind::Argument, "t".into(), 0, 1);
        prop_assert_eq!(forced.check(&values).is_ok(), oracle.is_match(&word));
    }
}
