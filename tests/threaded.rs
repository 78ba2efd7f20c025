use std::sync::Arc;
use std::thread;

use stepexpr::{Engine, Record, Value};

const WHITELIST: &str =
    "$'KEYS' filter ('StartsWith' bind 'name') map ('k' => { *v'k' in *'whiteList' }) reduce 'all'";

fn host(names: &[&str]) -> Record {
    let mut record = Record::new().set("whiteList", vec!["Tim", "John", "Luca"]);
    for (i, name) in names.iter().enumerate() {
        record.insert(&format!("name{i}"), Value::from(*name));
    }
    record
}

#[test]
fn evaluate_across_threads() {
    let expr = Arc::new(Engine::standard().compile(WHITELIST).unwrap());

    let cases: Vec<(Vec<&'static str>, bool)> = vec![
        (vec!["Tim", "John"], true),
        (vec!["Tim", "Stephen"], false),
        (vec![], true),
        (vec!["Luca"], true),
    ];

    let handles: Vec<_> = cases
        .into_iter()
        .map(|(names, expected)| {
            let expr = Arc::clone(&expr);
            thread::spawn(move || {
                let record = host(&names);
                (expr.evaluate(&record), expected)
            })
        })
        .collect();

    for handle in handles {
        let (result, expected) = handle.join().unwrap();
        assert_eq!(result, Ok(Value::Bool(expected)));
    }
}

#[test]
fn shared_engine_compiles_on_many_threads() {
    let engine = Arc::new(Engine::standard());

    let handles: Vec<_> = (0..8)
        .map(|i| {
            let engine = Arc::clone(&engine);
            thread::spawn(move || {
                let text = format!("'v{i}' == 'v{i}'");
                engine.evaluate(&Record::new(), &text)
            })
        })
        .collect();

    for handle in handles {
        assert_eq!(handle.join().unwrap().unwrap(), Value::Bool(true));
    }
}
