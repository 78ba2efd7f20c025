use stepexpr::{
    evaluate, parse, standard_registry, tokenize, Arg, Engine, Environment, Error, EvalError,
    OpClass, OpError, Operand, OperationNode, Outcome, ParseView, Record, Registry,
    RegistryError, RewriteError, Scheduler, Value,
};

fn eval(host: &Record, text: &str) -> Result<Value, Error> {
    evaluate(host, text, 100_000)
}

#[test]
fn single_literal() {
    assert_eq!(eval(&Record::new(), "'only'").unwrap(), Value::from("only"));
}

#[test]
fn or_chain_groups_left() {
    let registry = standard_registry();
    let tokens = tokenize(&registry, "'a' || 'b' || 'c'").unwrap();
    let (root, pool) = parse(&registry, tokens, 1_000).unwrap();
    let outer = pool.get(root.as_node().unwrap()).unwrap();
    assert_eq!(outer.op().name(), "||");
    let inner = pool.get(outer.operands()[0].as_node().unwrap()).unwrap();
    assert_eq!(inner.op().name(), "||");
    assert_eq!(pool.len(), 2);
}

#[test]
fn and_returns_operand_values() {
    let host = Record::new();
    assert_eq!(eval(&host, "'true' && 'asdfg'").unwrap(), Value::from("asdfg"));
    assert_eq!(eval(&host, "'false' && 'asdfg'").unwrap(), Value::from("false"));
}

#[test]
fn untaken_branch_is_never_evaluated() {
    let host = Record::new();
    assert_eq!(eval(&host, "'true' || *'absent'").unwrap(), Value::from("true"));
}

#[test]
fn leftmost_error_wins() {
    let host = Record::new();
    let err = eval(&host, "*'first' ^ *'second'").unwrap_err();
    assert_eq!(err.to_string(), "Can't dereference given key: 'first'");
}

#[test]
fn unmatched_close_paren() {
    let err = eval(&Record::new(), "('a' || 'b'))").unwrap_err();
    match err {
        Error::Parse(e) => assert_eq!(e.message(), "Unexpected ')' parenthesis"),
        other => panic!("expected a parse error, got {other}"),
    }
}

#[test]
fn bind_then_apply_equals_full_call() {
    let host = Record::new();
    let curried = eval(&host, "'StartsWith' bind 'na' apply 'name'").unwrap();
    let direct = eval(&host, "call('StartsWith', 'na', 'name')").unwrap();
    assert_eq!(curried, direct);
    assert_eq!(curried, Value::Bool(true));
}

#[test]
fn partial_functions_compare_structurally() {
    let host = Record::new();
    assert_eq!(
        eval(&host, "('StartsWith' bind 'a') == ('StartsWith' bind 'a')").unwrap(),
        Value::Bool(true)
    );
    assert_eq!(
        eval(&host, "('StartsWith' bind 'a') == ('StartsWith' bind 'b')").unwrap(),
        Value::Bool(false)
    );
}

#[test]
fn re_evaluation_is_identical() {
    let host = Record::new().set("a", "x");
    let expr = Engine::standard().compile("$'KEYS' map ('k' => { *v'k' })").unwrap();
    let first = expr.evaluate(&host).unwrap();
    assert_eq!(first, Value::from(vec!["x"]));
    for _ in 0..3 {
        assert_eq!(expr.evaluate(&host).unwrap(), first);
    }
}

#[test]
fn budget_is_reported_not_truncated() {
    let expr = Engine::standard()
        .compile("!!!!!!!!!!!!!!!!!!!!'x'")
        .unwrap();
    assert_eq!(
        expr.evaluate_with_budget(&Record::new(), 10),
        Err(EvalError::BudgetExceeded { budget: 10 })
    );
}

#[test]
fn long_chain_runs_with_bounded_depth() {
    let text = std::iter::repeat("'a'")
        .take(2_000)
        .collect::<Vec<_>>()
        .join(" ^ ");
    let expr = Engine::standard().compile(&text).unwrap();
    let report = expr.evaluate_detailed(&Record::new());
    // 1999 xors of falsy literals.
    assert_eq!(report.result(), Ok(&Value::Bool(false)));
    assert!(report.max_depth() < 12, "depth {}", report.max_depth());
}

#[test]
fn deep_nesting_does_not_overflow() {
    let depth = 5_000;
    let text = format!("{}'x'{}", "(".repeat(depth), ")".repeat(depth));
    let negated = format!("{}{text}", "!".repeat(depth));
    let expr = Engine::standard().compile(&negated).unwrap();
    assert_eq!(expr.evaluate(&Record::new()).unwrap(), Value::Bool(false));
}

#[test]
fn deeply_nested_braces_compile_and_run() {
    let depth = 40_000;
    let text = format!(
        "('x' => {}'a'{}) apply 'y'",
        "{".repeat(depth),
        "}".repeat(depth)
    );
    let expr = Engine::standard().compile(&text).unwrap();
    assert_eq!(expr.evaluate(&Record::new()).unwrap(), Value::from("a"));

    let depth = 100_000;
    let text = format!("'x' => {}'a'{}", "{".repeat(depth), "}".repeat(depth));
    let engine = Engine::builder().parse_budget(1_000_000).build().unwrap();
    let expr = engine.compile(&text).unwrap();
    assert_eq!(expr.pool().len(), 1);
}

#[test]
fn sub_expressions_are_dynamically_scoped() {
    // `f` is created where `y` is unbound and applied where it is bound.
    let host = Record::new();
    let text = "('f' => { ('y' => { v'f' apply 'arg' }) apply 'dynamic' }) apply ('x' => { v'y' })";
    assert_eq!(eval(&host, text).unwrap(), Value::from("dynamic"));

    let expr = Engine::standard().compile("('x' => { v'y' }) apply 'arg'").unwrap();
    let env = Environment::new().with("y", "from caller".into());
    assert_eq!(
        expr.evaluate_with(&host, &env).unwrap(),
        Value::from("from caller")
    );
    let err = expr.evaluate(&host).unwrap_err();
    assert_eq!(err.to_string(), "Can't find variable: 'y'");
}

#[test]
fn inner_binding_shadows_outer() {
    let host = Record::new();
    let text = "('x' => { ('x' => { v'x' }) apply 'inner' }) apply 'outer'";
    assert_eq!(eval(&host, text).unwrap(), Value::from("inner"));
}

#[test]
fn bare_block_at_root() {
    let err = eval(&Record::new(), "{ 'a' }").unwrap_err();
    assert_eq!(err, Error::Eval(EvalError::BareBlock));
}

#[test]
fn block_outside_arrow_is_rejected() {
    let err = eval(&Record::new(), "!{ 'a' }").unwrap_err();
    assert!(matches!(
        err,
        Error::Eval(EvalError::Operator {
            source: OpError::Unevaluated(_),
            ..
        })
    ));
}

#[test]
fn duplicate_registration_is_an_error() {
    fn konst(_: &stepexpr::Scope<'_>, _: Vec<Arg>) -> Result<Outcome, OpError> {
        Ok(Value::Bool(true).into())
    }
    let err = Registry::builder()
        .with_standard_library()
        .operator("&&", OpClass::Infix2, |op| op.eval(konst))
        .build()
        .unwrap_err();
    assert_eq!(
        err,
        RegistryError::Duplicate {
            name: "&&".into(),
            arity: 2
        }
    );
}

#[test]
fn overloaded_function_name_fails_at_build() {
    fn konst(_: &stepexpr::Scope<'_>, _: Vec<Arg>) -> Result<Outcome, OpError> {
        Ok(Value::Bool(true).into())
    }
    let err = Registry::builder()
        .function("f", 1, konst)
        .function("f", 2, konst)
        .build()
        .unwrap_err();
    assert_eq!(
        err,
        RegistryError::AmbiguousName {
            name: "f".into(),
            arities: vec![1, 2]
        }
    );
}

#[test]
fn rewrite_to_unregistered_operator_fails_at_evaluation() {
    fn konst(_: &stepexpr::Scope<'_>, _: Vec<Arg>) -> Result<Outcome, OpError> {
        Ok(Value::Bool(true).into())
    }
    fn to_ghost(_: &ParseView<'_>, operands: Vec<Operand>) -> Result<OperationNode, RewriteError> {
        Ok(OperationNode::new("ghost", operands))
    }
    let registry = Registry::builder()
        .operator("haunt", OpClass::Prefix1, |op| op.eval(konst).parse(to_ghost))
        .build()
        .unwrap();
    let engine = Engine::builder().registry(registry).build().unwrap();
    let err = engine.evaluate(&Record::new(), "haunt 'x'").unwrap_err();
    let Error::Eval(EvalError::UnknownOperator { name, arity, snapshot }) = &err else {
        panic!("expected an unknown operator, got {err}");
    };
    assert_eq!((name.as_str(), *arity), ("ghost", 1));
    assert_eq!(snapshot.stack().last().map(String::as_str), Some("ghost#1"));
    assert_eq!(err.to_string(), "no operator 'ghost' takes 1 operand(s)");
}

#[test]
fn first_failing_element_wins_in_map() {
    let host = Record::new().set("items", vec!["a", "b", "c"]);
    let text = "*'items' map ('k' => {
        ?: (v'k' == 'a') v'k' (?: (v'k' == 'b') *'absent' v'nope')
    })";
    let err = eval(&host, text).unwrap_err();
    let Error::Eval(EvalError::Operator { source, .. }) = &err else {
        panic!("expected an operator error, got {err}");
    };
    assert_eq!(source, &OpError::MissingKey("absent".into()));

    // Without the failing elements the same map yields the full list.
    let host = Record::new().set("items", vec!["a", "a"]);
    assert_eq!(eval(&host, text).unwrap(), Value::from(vec!["a", "a"]));
}

#[test]
fn zero_budget_is_an_evaluation_error() {
    let err = evaluate(&Record::new(), "'x'", 0).unwrap_err();
    assert_eq!(err, Error::Eval(EvalError::BudgetExceeded { budget: 0 }));
    assert_eq!(evaluate(&Record::new(), "'x'", 1).unwrap(), Value::from("x"));
}

#[test]
fn custom_operator_extends_standard_library() {
    fn upper(_: &stepexpr::Scope<'_>, args: Vec<Arg>) -> Result<Outcome, OpError> {
        let mut it = args.into_iter();
        match it.next().map(Arg::into_value).transpose()? {
            Some(Value::Str(s)) => Ok(Value::Str(s.to_uppercase()).into()),
            other => Err(OpError::invalid("`upper` needs a literal", other.into_iter().collect())),
        }
    }
    let registry = Registry::builder()
        .with_standard_library()
        .operator("upper", OpClass::Prefix1, |op| op.eval(upper))
        .build()
        .unwrap();
    let engine = Engine::builder().registry(registry).build().unwrap();
    assert_eq!(
        engine.evaluate(&Record::new(), "upper 'abc' == 'ABC'").unwrap(),
        Value::Bool(true)
    );
}

#[test]
fn scheduler_is_usable_directly() {
    use stepexpr::scheduler::Step;

    fn countdown(n: u32) -> Result<Step<u32, &'static str, EvalError>, EvalError> {
        Ok(if n == 0 {
            Step::Done("liftoff")
        } else {
            Step::Continue(n - 1)
        })
    }
    let (value, stats) = Scheduler::new(4, 1_000).run_with_stats(countdown, 100).unwrap();
    assert_eq!(value, "liftoff");
    assert_eq!(stats.steps, 101);
}
