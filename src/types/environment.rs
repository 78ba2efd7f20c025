use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use super::Value;

/// Variable bindings visible to `v'name'`.
///
/// Extending never mutates: [`with`](Self::with) returns a new environment
/// and leaves every clone of the old one untouched.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Environment {
    vars: Arc<HashMap<String, Value>>,
}

impl Environment {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Copy of this environment with `name` bound to `value`, shadowing any
    /// previous binding of the same name.
    #[must_use]
    pub fn with(&self, name: &str, value: Value) -> Self {
        let mut vars = HashMap::clone(&self.vars);
        vars.insert(name.to_owned(), value);
        Self {
            vars: Arc::new(vars),
        }
    }

    #[must_use]
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.vars.get(name)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.vars.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.vars.is_empty()
    }

    /// Bindings sorted by name.
    #[must_use]
    pub fn bindings(&self) -> Vec<(String, Value)> {
        let mut out: Vec<_> = self
            .vars
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect();
        out.sort_by(|a, b| a.0.cmp(&b.0));
        out
    }
}

impl fmt::Display for Environment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parts: Vec<String> = self
            .bindings()
            .iter()
            .map(|(k, v)| format!("{k} = {v}"))
            .collect();
        write!(f, "{{{}}}", parts.join(", "))
    }
}
