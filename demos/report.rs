use stepexpr::{Engine, Record};

fn main() {
    let engine = Engine::builder()
        .step_budget(10_000)
        .batch_size(8)
        .build()
        .expect("invalid engine configuration");

    let expr = engine
        .compile(
            "'ifStartsWith' ? (
                *'ifStartsWith' map ('start' => {
                    call('StartsWith', v'start', 'surname1')
                }) reduce 'any'
            ) : call('StartsWith', 'name', 'surname1')",
        )
        .expect("failed to compile expression");

    let user = Record::new().set("ifStartsWith", vec!["name", "surname"]);

    let report = expr.evaluate_detailed(&user);

    println!("{report}");
    println!();
    println!("Steps: {}", report.steps());
    println!("Max depth: {}", report.max_depth());
    println!("Duration: {:?}", report.duration());

    let missing = expr.evaluate_with_budget(&user, 5);
    println!("With a budget of 5: {missing:?}");
}
