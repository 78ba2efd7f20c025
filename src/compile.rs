use std::collections::{HashMap, HashSet};

use crate::types::{Definition, Kind, OpClass, OpKey, Registration, Registry, RegistryError, MAX_ARITY};

const RESERVED: [char; 5] = ['\'', '(', ')', '{', '}'];

pub(crate) fn build_registry(entries: Vec<Registration>) -> Result<Registry, RegistryError> {
    check_names(&entries)?;
    check_duplicates(&entries)?;
    check_function_arities(&entries)?;
    check_classes(&entries)?;

    let mut operators: Vec<(String, OpClass)> = Vec::new();
    let mut functions: HashMap<String, usize> = HashMap::new();
    let mut defs: HashMap<OpKey, Definition> = HashMap::with_capacity(entries.len());

    for entry in entries {
        let Some(eval) = entry.eval else {
            return Err(RegistryError::MissingBody { name: entry.name });
        };
        match entry.kind {
            Kind::Operator(class) => operators.push((entry.name.clone(), class)),
            Kind::Function => {
                functions.insert(entry.name.clone(), entry.arity);
            }
        }
        let def = entry.into_definition(eval);
        defs.insert(def.key().clone(), def);
    }

    // Longest first so the tokenizer prefers `&&` over `&`; ties by name for
    // a stable order.
    operators.sort_by(|a, b| b.0.len().cmp(&a.0.len()).then_with(|| a.0.cmp(&b.0)));

    tracing::debug!(
        operators = operators.len(),
        functions = defs.len() - operators.len(),
        "registry built"
    );

    Ok(Registry {
        defs,
        operators,
        functions,
    })
}

fn check_names(entries: &[Registration]) -> Result<(), RegistryError> {
    for entry in entries {
        if entry.name.is_empty() {
            return Err(RegistryError::EmptyName);
        }
        let reserved = entry.name.contains(&RESERVED[..])
            || entry.name.chars().any(char::is_whitespace)
            || (entry.kind == Kind::Function && entry.name.contains('#'));
        if reserved {
            return Err(RegistryError::ReservedCharacter {
                name: entry.name.clone(),
            });
        }
        if entry.arity > MAX_ARITY {
            return Err(RegistryError::ArityTooLarge {
                name: entry.name.clone(),
                arity: entry.arity,
                max: MAX_ARITY,
            });
        }
    }
    Ok(())
}

fn check_duplicates(entries: &[Registration]) -> Result<(), RegistryError> {
    let mut seen = HashSet::new();
    for entry in entries {
        if !seen.insert((entry.name.as_str(), entry.arity)) {
            return Err(RegistryError::Duplicate {
                name: entry.name.clone(),
                arity: entry.arity,
            });
        }
    }
    Ok(())
}

/// A bare function name must resolve to a single arity.
fn check_function_arities(entries: &[Registration]) -> Result<(), RegistryError> {
    let mut arities: HashMap<&str, Vec<usize>> = HashMap::new();
    for entry in entries.iter().filter(|e| e.kind == Kind::Function) {
        arities.entry(entry.name.as_str()).or_default().push(entry.arity);
    }
    // Report the first offending name in registration order.
    for entry in entries {
        let Some(found) = arities.get(entry.name.as_str()) else {
            continue;
        };
        if found.len() > 1 {
            let mut arities = found.clone();
            arities.sort_unstable();
            return Err(RegistryError::AmbiguousName {
                name: entry.name.clone(),
                arities,
            });
        }
    }
    Ok(())
}

/// An operator name carries a single class; the tokenizer attaches it to
/// every occurrence.
fn check_classes(entries: &[Registration]) -> Result<(), RegistryError> {
    let mut classes: HashMap<&str, OpClass> = HashMap::new();
    for entry in entries {
        let Kind::Operator(class) = entry.kind else {
            continue;
        };
        if let Some(first) = classes.insert(entry.name.as_str(), class) {
            if first != class {
                return Err(RegistryError::ConflictingClass {
                    name: entry.name.clone(),
                    first: first.to_string(),
                    second: class.to_string(),
                });
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Arg, OpError, Outcome, RegistryBuilder, Scope, Value};

    fn konst(_: &Scope<'_>, _: Vec<Arg>) -> Result<Outcome, OpError> {
        Ok(Outcome::Value(Value::Bool(true)))
    }

    #[test]
    fn duplicate_name_and_arity_rejected() {
        let result = RegistryBuilder::new()
            .function("StartsWith", 2, konst)
            .function("StartsWith", 2, konst)
            .build();
        assert_eq!(
            result.unwrap_err(),
            RegistryError::Duplicate {
                name: "StartsWith".into(),
                arity: 2
            }
        );
    }

    #[test]
    fn same_function_name_with_two_arities_rejected() {
        let result = RegistryBuilder::new()
            .function("f", 2, konst)
            .function("g", 1, konst)
            .function("f", 1, konst)
            .build();
        assert_eq!(
            result.unwrap_err(),
            RegistryError::AmbiguousName {
                name: "f".into(),
                arities: vec![1, 2],
            }
        );
    }

    #[test]
    fn operator_and_function_may_share_a_name() {
        let reg = RegistryBuilder::new()
            .operator("not", OpClass::Prefix1, |op| op.eval(konst))
            .function("not", 2, konst)
            .build()
            .unwrap();
        assert_eq!(reg.resolve_name("not").unwrap().arity(), 2);
    }

    #[test]
    fn operator_and_function_collide_on_key() {
        let result = RegistryBuilder::new()
            .operator("call", OpClass::Prefix1, |op| op.eval(konst))
            .function("call", 1, konst)
            .build();
        assert!(matches!(result, Err(RegistryError::Duplicate { .. })));
    }

    #[test]
    fn conflicting_classes_rejected() {
        let result = RegistryBuilder::new()
            .operator("-", OpClass::Prefix1, |op| op.eval(konst))
            .operator("-", OpClass::Infix2, |op| op.eval(konst))
            .build();
        assert_eq!(
            result.unwrap_err(),
            RegistryError::ConflictingClass {
                name: "-".into(),
                first: "prefix1".into(),
                second: "infix2".into(),
            }
        );
    }

    #[test]
    fn arity_above_max_rejected() {
        let result = RegistryBuilder::new().function("wide", 6, konst).build();
        assert!(matches!(
            result,
            Err(RegistryError::ArityTooLarge { arity: 6, max: 5, .. })
        ));
    }

    #[test]
    fn zero_arity_function_allowed() {
        let reg = RegistryBuilder::new().function("now", 0, konst).build().unwrap();
        assert!(reg.resolve("now", 0).is_some());
    }

    #[test]
    fn empty_name_rejected() {
        let result = RegistryBuilder::new().function("", 1, konst).build();
        assert_eq!(result.unwrap_err(), RegistryError::EmptyName);
    }

    #[test]
    fn reserved_characters_rejected() {
        for name in ["a b", "f(", "'q", "g#2"] {
            let result = RegistryBuilder::new().function(name, 1, konst).build();
            assert!(
                matches!(result, Err(RegistryError::ReservedCharacter { .. })),
                "{name} should be rejected"
            );
        }
    }

    #[test]
    fn operator_without_body_rejected() {
        let result = RegistryBuilder::new()
            .operator("then", OpClass::Prefix1, |op| op)
            .build();
        assert_eq!(
            result.unwrap_err(),
            RegistryError::MissingBody {
                name: "then".into()
            }
        );
    }

    #[test]
    fn registration_order_is_irrelevant() {
        let a = RegistryBuilder::new()
            .operator("&", OpClass::Infix2, |op| op.eval(konst))
            .operator("&&", OpClass::Infix2, |op| op.eval(konst))
            .build()
            .unwrap();
        let b = RegistryBuilder::new()
            .operator("&&", OpClass::Infix2, |op| op.eval(konst))
            .operator("&", OpClass::Infix2, |op| op.eval(konst))
            .build()
            .unwrap();
        let names_a: Vec<_> = a.operators().collect();
        let names_b: Vec<_> = b.operators().collect();
        assert_eq!(names_a, names_b);
    }
}
