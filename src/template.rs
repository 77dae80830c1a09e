//! Endpoint path templates
//!
//! Child stream endpoints carry `{placeholder}` segments, e.g.
//! `/work_packages/{work_package_id}/attachments`, filled from the parent
//! context before the first request.

use crate::error::{Error, Result};
use crate::types::{JsonObject, JsonValue};
use regex::Regex;
use serde_json::Value;
use std::sync::LazyLock;

/// Regex for matching path placeholders: {name}
static PLACEHOLDER_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\{([a-zA-Z_][a-zA-Z0-9_]*)\}").unwrap());

/// Render a path template with values from `context`.
///
/// Only scalar values are substituted; a missing or non-scalar value is an
/// error so that a half-rendered path is never requested.
pub fn render(template: &str, context: &JsonObject) -> Result<String> {
    let mut missing = Vec::new();

    let rendered = PLACEHOLDER_REGEX.replace_all(template, |caps: &regex::Captures<'_>| {
        let name = &caps[1];
        match context.get(name).and_then(value_to_segment) {
            Some(segment) => segment,
            None => {
                missing.push(name.to_string());
                String::new()
            }
        }
    });

    if missing.is_empty() {
        Ok(rendered.into_owned())
    } else {
        Err(Error::undefined_var(missing.join(", ")))
    }
}

/// Check if a path contains placeholders
pub fn has_placeholders(template: &str) -> bool {
    PLACEHOLDER_REGEX.is_match(template)
}

/// Extract all placeholder names from a template
pub fn extract_variables(template: &str) -> Vec<String> {
    PLACEHOLDER_REGEX
        .captures_iter(template)
        .map(|cap| cap[1].to_string())
        .collect()
}

fn value_to_segment(value: &JsonValue) -> Option<String> {
    match value {
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn context(value: JsonValue) -> JsonObject {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn test_render_numeric_placeholder() {
        let ctx = context(json!({"work_package_id": 42, "work_package_title": "Fix"}));
        let path = render("/work_packages/{work_package_id}/attachments", &ctx).unwrap();
        assert_eq!(path, "/work_packages/42/attachments");
    }

    #[test]
    fn test_render_without_placeholders() {
        let path = render("/projects", &JsonObject::new()).unwrap();
        assert_eq!(path, "/projects");
    }

    #[test]
    fn test_render_missing_value() {
        let err = render("/work_packages/{work_package_id}/attachments", &JsonObject::new())
            .unwrap_err();
        assert!(err.to_string().contains("work_package_id"));
    }

    #[test]
    fn test_render_rejects_non_scalar() {
        let ctx = context(json!({"work_package_id": null}));
        assert!(render("/work_packages/{work_package_id}", &ctx).is_err());

        let ctx = context(json!({"work_package_id": {"nested": 1}}));
        assert!(render("/work_packages/{work_package_id}", &ctx).is_err());
    }

    #[test]
    fn test_has_placeholders() {
        assert!(has_placeholders("/work_packages/{work_package_id}/attachments"));
        assert!(!has_placeholders("/work_packages"));
    }

    #[test]
    fn test_extract_variables() {
        assert_eq!(
            extract_variables("/a/{first}/b/{second_id}"),
            vec!["first", "second_id"]
        );
    }
}
