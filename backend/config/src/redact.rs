//! Masks secrets in a config value tree so it can be printed or logged.

use serde_json::Value;

const SENSITIVE_KEYS: &[&str] = &["apiKey", "api_key", "token", "secret", "password"];

const MASK: &str = "***";

/// Replace sensitive string fields with `"***"`, keeping a short prefix so
/// the operator can tell which key is configured.
pub fn redact(value: &Value) -> Value {
    match value {
        Value::Object(map) => Value::Object(
            map.iter()
                .map(|(k, v)| {
                    let v = match v {
                        Value::String(s) if is_sensitive(k) => Value::String(mask(s)),
                        other => redact(other),
                    };
                    (k.clone(), v)
                })
                .collect(),
        ),
        Value::Array(items) => Value::Array(items.iter().map(redact).collect()),
        other => other.clone(),
    }
}

fn is_sensitive(key: &str) -> bool {
    SENSITIVE_KEYS.iter().any(|k| k.eq_ignore_ascii_case(key))
}

fn mask(s: &str) -> String {
    if s.is_empty() {
        return String::new();
    }
    if s.chars().count() <= 8 {
        return MASK.to_string();
    }
    let prefix: String = s.chars().take(4).collect();
    format!("{prefix}{MASK}")
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn masks_api_key_keeps_other_fields() {
        let v = json!({ "provider": { "kind": "openai", "apiKey": "sk-abcdefghijklmnop" } });
        let r = redact(&v);
        assert_eq!(r["provider"]["apiKey"], "sk-a***");
        assert_eq!(r["provider"]["kind"], "openai");
    }

    #[test]
    fn short_secrets_fully_masked() {
        let r = redact(&json!({ "token": "abc" }));
        assert_eq!(r["token"], "***");
    }
}
