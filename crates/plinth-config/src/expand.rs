// ── Environment placeholder expansion ──
//
// `${VAR}` is replaced by the variable's value; `${VAR:default}` falls
// back to `default`. A variable that is set but empty counts as unset.
// A reference that resolves to nothing is left in place verbatim.

use std::borrow::Cow;

use once_cell::sync::Lazy;
use regex::{Captures, Regex};
use serde_json::Value;

static PLACEHOLDER: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\$\{([A-Za-z0-9_]+)(?::([^}]+))?\}")
        .expect("hard-coded placeholder pattern is valid")
});

/// Expand placeholders in `input` against the process environment.
pub fn expand_str(input: &str) -> Cow<'_, str> {
    expand_str_with(input, |key| std::env::var(key).ok())
}

/// Expand placeholders in `input`, resolving variables through `lookup`.
pub fn expand_str_with<F>(input: &str, lookup: F) -> Cow<'_, str>
where
    F: Fn(&str) -> Option<String>,
{
    PLACEHOLDER.replace_all(input, |caps: &Captures<'_>| {
        let key = &caps[1];
        if let Some(value) = lookup(key).filter(|v| !v.is_empty()) {
            return value;
        }
        caps.get(2)
            .map_or_else(|| caps[0].to_owned(), |default| default.as_str().to_owned())
    })
}

/// Expand every string inside `value`, recursing through objects and arrays.
pub fn expand_value_with<F>(value: &mut Value, lookup: &F)
where
    F: Fn(&str) -> Option<String>,
{
    match value {
        Value::String(s) => {
            let expanded = match expand_str_with(s, lookup) {
                Cow::Owned(expanded) => expanded,
                Cow::Borrowed(_) => return,
            };
            *s = expanded;
        }
        Value::Array(items) => {
            for item in items {
                expand_value_with(item, lookup);
            }
        }
        Value::Object(map) => {
            for item in map.values_mut() {
                expand_value_with(item, lookup);
            }
        }
        Value::Null | Value::Bool(_) | Value::Number(_) => {}
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use pretty_assertions::assert_eq;
    use serde_json::json;

    use super::*;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| ((*k).to_owned(), (*v).to_owned()))
            .collect();
        move |key| vars.get(key).cloned()
    }

    #[test]
    fn set_variable_wins_over_default() {
        let lookup = env(&[("ORDER_DSN", "postgres://db")]);
        assert_eq!(
            expand_str_with("${ORDER_DSN:memory://default}", &lookup),
            "postgres://db"
        );
    }

    #[test]
    fn default_used_when_unset_or_empty() {
        let lookup = env(&[("EMPTY", "")]);
        assert_eq!(expand_str_with("${MISSING:fallback}", &lookup), "fallback");
        assert_eq!(expand_str_with("${EMPTY:fallback}", &lookup), "fallback");
    }

    #[test]
    fn unresolved_reference_left_verbatim() {
        let lookup = env(&[]);
        assert_eq!(expand_str_with("dsn=${MISSING}", &lookup), "dsn=${MISSING}");
    }

    #[test]
    fn default_may_contain_colons() {
        let lookup = env(&[]);
        assert_eq!(
            expand_str_with("${DSN:postgres://localhost:5432/app}", &lookup),
            "postgres://localhost:5432/app"
        );
    }

    #[test]
    fn multiple_references_in_one_string() {
        let lookup = env(&[("HOST", "db"), ("PORT", "5432")]);
        assert_eq!(
            expand_str_with("${HOST}:${PORT} via ${PROXY:none}", &lookup),
            "db:5432 via none"
        );
    }

    #[test]
    fn plain_text_is_borrowed() {
        let lookup = env(&[]);
        assert!(matches!(
            expand_str_with("no placeholders", &lookup),
            Cow::Borrowed(_)
        ));
    }

    #[test]
    fn nested_values_expanded_and_scalars_untouched() {
        let lookup = env(&[("GREETING", "Hi")]);
        let mut value = json!({
            "greeting": "${GREETING:Hello}",
            "pool": 8,
            "tls": true,
            "hosts": ["${HOST:a}", { "inner": "${GREETING}" }],
            "nothing": null,
        });

        expand_value_with(&mut value, &lookup);

        assert_eq!(
            value,
            json!({
                "greeting": "Hi",
                "pool": 8,
                "tls": true,
                "hosts": ["a", { "inner": "Hi" }],
                "nothing": null,
            })
        );
    }
}
