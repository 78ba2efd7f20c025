use stepexpr::{Engine, Record};
use tracing_subscriber::EnvFilter;

fn main() {
    // RUST_LOG=stepexpr=debug shows compile and evaluation events.
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let engine = Engine::standard();
    let expr = engine
        .compile(
            "$'KEYS' filter ('StartsWith' bind 'name') \
             map ('k' => { *v'k' in *'whiteList' }) reduce 'all'",
        )
        .expect("failed to compile expression");

    println!("{expr}");

    let user = Record::new()
        .set("name1", "Tim")
        .set("name2", "John")
        .set("whiteList", vec!["Tim", "John", "Luke"]);

    match expr.evaluate(&user) {
        Ok(value) => println!("Result: {value}"),
        Err(err) => println!("Evaluation failed: {err}"),
    }

    let intruder = user.set("name3", "Mallory");
    match expr.evaluate(&intruder) {
        Ok(value) => println!("With an unknown name: {value}"),
        Err(err) => println!("Evaluation failed: {err}"),
    }
}
