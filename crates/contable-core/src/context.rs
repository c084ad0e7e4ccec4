//! Server-maintained user context.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Key/value summary of what the server knows about the current user.
///
/// Display state only. Each successful fetch replaces the whole mapping;
/// values are kept as received so they can be echoed back verbatim in
/// `user_context` on the next chat turn.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserContext(Map<String, Value>);

impl UserContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_map(map: Map<String, Value>) -> Self {
        Self(map)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    /// Entries rendered as display strings, in key order.
    pub fn display_entries(&self) -> Vec<(String, String)> {
        self.0
            .iter()
            .map(|(k, v)| (k.clone(), display_value(v)))
            .collect()
    }
}

impl FromIterator<(String, Value)> for UserContext {
    fn from_iter<I: IntoIterator<Item = (String, Value)>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

fn display_value(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn scalars_are_displayed_as_text() {
        let ctx: UserContext = serde_json::from_value(json!({
            "empresa": "Acme SAC",
            "consultas": 3,
            "activo": true,
        }))
        .unwrap();

        assert_eq!(
            ctx.display_entries(),
            vec![
                ("activo".to_string(), "true".to_string()),
                ("consultas".to_string(), "3".to_string()),
                ("empresa".to_string(), "Acme SAC".to_string()),
            ]
        );
    }

    #[test]
    fn empty_context_is_valid() {
        let ctx: UserContext = serde_json::from_value(json!({})).unwrap();
        assert!(ctx.is_empty());
        assert_eq!(serde_json::to_value(&ctx).unwrap(), json!({}));
    }
}
