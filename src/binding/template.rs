// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! Template rendering for naming strategies and custom mappings.
//!
//! Templates are written in the dotted form used by binding authors,
//! `{{ .service.kind | upper }}_{{ .name | upper }}`, and rendered with
//! minijinja after the leading dots of field references are dropped.

use minijinja::{Environment, Error, ErrorKind, UndefinedBehavior, Value};

pub struct TemplateEngine {
    env: Environment<'static>,
}

impl TemplateEngine {
    /// Referencing a missing field is an error.
    pub fn strict() -> Self {
        Self::with_undefined(UndefinedBehavior::Strict)
    }

    /// Missing fields render as empty strings.
    pub fn lenient() -> Self {
        Self::with_undefined(UndefinedBehavior::Chainable)
    }

    fn with_undefined(behavior: UndefinedBehavior) -> Self {
        let mut env = Environment::new();
        env.set_undefined_behavior(behavior);
        env.add_filter("json", json);
        env.add_function("json", json);
        Self { env }
    }

    pub fn render(&self, template: &str, ctx: &serde_json::Value) -> Result<String, Error> {
        self.env.render_str(&normalize(template), ctx)
    }
}

/// Serialize a value as JSON
fn json(value: Value) -> Result<String, Error> {
    serde_json::to_string(&value)
        .map_err(|e| Error::new(ErrorKind::InvalidOperation, format!("json: {}", e)))
}

/// Rewrite every `{{ ... }}` expression into minijinja syntax.
fn normalize(template: &str) -> String {
    let mut result = String::with_capacity(template.len());
    let mut remaining = template;

    while let Some(start) = remaining.find("{{") {
        result.push_str(&remaining[..start + 2]);
        remaining = &remaining[start + 2..];

        match remaining.find("}}") {
            Some(end) => {
                result.push_str(&normalize_expression(&remaining[..end]));
                result.push_str("}}");
                remaining = &remaining[end + 2..];
            }
            None => {
                result.push_str(remaining);
                remaining = "";
            }
        }
    }

    result.push_str(remaining);
    result
}

/// `json .a` becomes `.a | json`, then leading dots of field references go.
fn normalize_expression(expr: &str) -> String {
    let trimmed = expr.trim();
    let rewritten = match trimmed.strip_prefix("json ") {
        Some(arg) => format!(" {} | json ", arg.trim()),
        None => expr.to_string(),
    };
    strip_field_dots(&rewritten)
}

fn strip_field_dots(expr: &str) -> String {
    let mut result = String::with_capacity(expr.len());
    let mut chars = expr.chars().peekable();
    let mut quote: Option<char> = None;

    while let Some(ch) = chars.next() {
        match (ch, quote) {
            ('"' | '\'', None) => {
                quote = Some(ch);
                result.push(ch);
            }
            (c, Some(q)) if c == q => {
                quote = None;
                result.push(ch);
            }
            ('.', None) => {
                let starts_reference = result
                    .chars()
                    .last()
                    .is_none_or(|c| c.is_whitespace() || matches!(c, '(' | '|' | ','));
                let next_is_ident = chars
                    .peek()
                    .is_some_and(|c| c.is_alphanumeric() || *c == '_');
                if !(starts_reference && next_is_ident) {
                    result.push('.');
                }
            }
            _ => result.push(ch),
        }
    }

    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_normalize_drops_leading_dots() {
        assert_eq!(
            normalize("{{ .service.kind | upper }}_{{ .name | upper }}"),
            "{{ service.kind | upper }}_{{ name | upper }}"
        );
    }

    #[test]
    fn test_normalize_keeps_quoted_dots_and_literals() {
        assert_eq!(normalize("x.{{ \".a\" }}.y"), "x.{{ \".a\" }}.y");
    }

    #[test]
    fn test_normalize_json_function() {
        assert_eq!(normalize("{{ json .status }}"), "{{ status | json }}");
    }

    #[test]
    fn test_strict_render_fails_on_missing_field() {
        let engine = TemplateEngine::strict();
        assert!(engine.render("{{ .missing.field }}", &json!({})).is_err());
    }

    #[test]
    fn test_lenient_render_renders_missing_as_empty() {
        let engine = TemplateEngine::lenient();
        let out = engine.render("a{{ .missing.field }}b", &json!({})).unwrap();
        assert_eq!(out, "ab");
    }

    #[test]
    fn test_json_rendering() {
        let engine = TemplateEngine::lenient();
        let out = engine
            .render("{{ json .status.urls }}", &json!({"status": {"urls": ["a", "b"]}}))
            .unwrap();
        assert_eq!(out, r#"["a","b"]"#);
    }
}
