//! Placeholder substitution for prompt templates.
//!
//! # Syntax
//!
//! - `{name}` substitutes the value supplied for `name`
//! - `{{` renders a literal `{`, `}}` a literal `}`
//!
//! Every artifact kind declares the placeholders it accepts. Rendering fails
//! closed: a name outside that set, or one the caller did not supply, is an
//! error rather than a silent blank.

use std::collections::HashMap;

use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TemplateError {
    #[error("unknown placeholder '{{{name}}}' at position {position} (allowed: {allowed})")]
    UnknownPlaceholder {
        name: String,
        position: usize,
        allowed: String,
    },

    #[error("no value supplied for placeholder '{{{name}}}' at position {position}")]
    MissingPlaceholder { name: String, position: usize },

    #[error("unmatched brace at position {position} in template")]
    UnmatchedBrace { position: usize },

    #[error("empty placeholder '{{}}' at position {position} in template")]
    EmptyPlaceholder { position: usize },
}

/// Values for one render, keyed by placeholder name.
#[derive(Debug, Clone, Default)]
pub struct PromptValues {
    values: HashMap<&'static str, String>,
}

impl PromptValues {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, name: &'static str, value: impl Into<String>) -> Self {
        self.insert(name, value);
        self
    }

    pub fn insert(&mut self, name: &'static str, value: impl Into<String>) {
        self.values.insert(name, value.into());
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.values.get(name).map(String::as_str)
    }
}

/// Render `template` accepting only the placeholders in `allowed`.
pub fn render(
    template: &str,
    allowed: &[&str],
    values: &PromptValues,
) -> Result<String, TemplateError> {
    let mut result = String::with_capacity(template.len());
    let mut chars = template.char_indices().peekable();

    while let Some((pos, ch)) = chars.next() {
        match ch {
            '{' => {
                if let Some((_, '{')) = chars.peek() {
                    chars.next();
                    result.push('{');
                    continue;
                }

                let mut name = String::new();
                loop {
                    match chars.next() {
                        Some((_, '}')) => break,
                        Some((_, c)) => name.push(c),
                        None => return Err(TemplateError::UnmatchedBrace { position: pos }),
                    }
                }

                let name = name.trim();
                if name.is_empty() {
                    return Err(TemplateError::EmptyPlaceholder { position: pos });
                }
                if !allowed.contains(&name) {
                    return Err(TemplateError::UnknownPlaceholder {
                        name: name.to_string(),
                        position: pos,
                        allowed: allowed.join(", "),
                    });
                }
                match values.get(name) {
                    Some(value) => result.push_str(value),
                    None => {
                        return Err(TemplateError::MissingPlaceholder {
                            name: name.to_string(),
                            position: pos,
                        })
                    }
                }
            }
            '}' => match chars.peek() {
                Some((_, '}')) => {
                    chars.next();
                    result.push('}');
                }
                _ => return Err(TemplateError::UnmatchedBrace { position: pos }),
            },
            _ => result.push(ch),
        }
    }

    Ok(result)
}

#[cfg(test)]
mod tests {
    use super::*;

    const ALLOWED: &[&str] = &["feature_id", "rules"];

    #[test]
    fn substitutes_named_placeholders() {
        let values = PromptValues::new()
            .with("feature_id", "login")
            .with("rules", "max_fail_count: 5");
        let out = render("Feature {feature_id}\n{rules}", ALLOWED, &values).unwrap();
        assert_eq!(out, "Feature login\nmax_fail_count: 5");
    }

    #[test]
    fn doubled_braces_are_literal() {
        let values = PromptValues::new().with("feature_id", "login");
        let out = render(
            "return {{\"errorCode\": ...}} for {feature_id}",
            ALLOWED,
            &values,
        )
        .unwrap();
        assert_eq!(out, "return {\"errorCode\": ...} for login");
    }

    #[test]
    fn unknown_placeholder_fails_closed() {
        let values = PromptValues::new().with("feature_id", "login");
        let err = render("{feature_id} {api_spec}", ALLOWED, &values).unwrap_err();
        assert!(matches!(
            err,
            TemplateError::UnknownPlaceholder { ref name, position: 13, .. } if name == "api_spec"
        ));
    }

    #[test]
    fn allowed_but_unsupplied_placeholder_fails() {
        let values = PromptValues::new().with("feature_id", "login");
        let err = render("{feature_id} {rules}", ALLOWED, &values).unwrap_err();
        assert_eq!(
            err,
            TemplateError::MissingPlaceholder {
                name: "rules".to_string(),
                position: 13
            }
        );
    }

    #[test]
    fn malformed_templates_are_rejected() {
        let values = PromptValues::new();
        assert_eq!(
            render("open {feature_id", ALLOWED, &values).unwrap_err(),
            TemplateError::UnmatchedBrace { position: 5 }
        );
        assert_eq!(
            render("empty {}", ALLOWED, &values).unwrap_err(),
            TemplateError::EmptyPlaceholder { position: 6 }
        );
    }

    #[test]
    fn lone_closing_brace_is_rejected() {
        let values = PromptValues::new().with("feature_id", "login");
        assert_eq!(
            render("x } {feature_id}", ALLOWED, &values).unwrap_err(),
            TemplateError::UnmatchedBrace { position: 2 }
        );
        assert_eq!(
            render("{feature_id}}", ALLOWED, &values).unwrap_err(),
            TemplateError::UnmatchedBrace { position: 12 }
        );
    }

    #[test]
    fn supplied_values_are_not_reparsed() {
        let values = PromptValues::new()
            .with("feature_id", "login")
            .with("rules", "{ not: a placeholder }");
        let out = render("{rules}", ALLOWED, &values).unwrap();
        assert_eq!(out, "{ not: a placeholder }");
    }
}
