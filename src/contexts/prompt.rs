use serde::Serialize;
use serde_json::Value;
use thiserror::Error;

/// Errors raised while loading or populating prompt templates
#[derive(Error, Debug)]
pub enum PromptError {
    #[error("Required placeholder '{0}' could not be resolved")]
    MissingMandatoryPlaceholder(String),

    #[error("Invalid path '{0}' in placeholder")]
    InvalidPlaceholderPath(String),

    #[error("Prompt is invalid: {0}")]
    InvalidPrompt(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Segment {
    Text(String),
    Field {
        /// Placeholder as written, without the `?`.
        path: String,
        /// JSON pointer into the rendered input, e.g. `/screen/name`.
        pointer: String,
        optional: bool,
    },
}

/// A prompt with `{{input.a.b}}` (or optional `{{input.a?}}`) placeholders,
/// split into segments when loaded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PromptTemplate {
    segments: Vec<Segment>,
}

impl PromptTemplate {
    /// Placeholders must be rooted at `input`; anything else is rejected
    /// here rather than at render time. An unclosed `{{` is kept as text.
    pub fn parse(template: &str) -> Result<Self, PromptError> {
        let mut segments = Vec::new();
        let mut rest = template;

        while let Some(open) = rest.find("{{") {
            let Some(close) = rest[open..].find("}}").map(|c| open + c) else {
                break;
            };
            if open > 0 {
                segments.push(Segment::Text(rest[..open].to_string()));
            }
            segments.push(field(&rest[open + 2..close])?);
            rest = &rest[close + 2..];
        }
        if !rest.is_empty() {
            segments.push(Segment::Text(rest.to_string()));
        }

        Ok(Self { segments })
    }

    /// Placeholder paths in order of appearance.
    pub fn fields(&self) -> impl Iterator<Item = &str> {
        self.segments.iter().filter_map(|s| match s {
            Segment::Field { path, .. } => Some(path.as_str()),
            Segment::Text(_) => None,
        })
    }

    pub fn render<T: Serialize>(&self, input: &T) -> Result<String, PromptError> {
        let input =
            serde_json::to_value(input).map_err(|e| PromptError::InvalidPrompt(e.to_string()))?;

        let mut out = String::new();
        for segment in &self.segments {
            match segment {
                Segment::Text(text) => out.push_str(text),
                Segment::Field {
                    path,
                    pointer,
                    optional,
                } => match input.pointer(pointer) {
                    Some(Value::String(s)) => out.push_str(s),
                    Some(Value::Null) => {}
                    Some(other) => out.push_str(&other.to_string()),
                    None if *optional => {}
                    None => return Err(PromptError::MissingMandatoryPlaceholder(path.clone())),
                },
            }
        }
        Ok(out)
    }
}

fn field(raw: &str) -> Result<Segment, PromptError> {
    let (path, optional) = match raw.trim().strip_suffix('?') {
        Some(path) => (path.trim(), true),
        None => (raw.trim(), false),
    };

    let pointer = match path.strip_prefix("input") {
        Some("") => String::new(),
        Some(nested) if nested.starts_with('.') && !nested.ends_with('.') => nested.replace('.', "/"),
        _ => return Err(PromptError::InvalidPlaceholderPath(path.to_string())),
    };

    Ok(Segment::Field {
        path: path.to_string(),
        pointer,
        optional,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Serialize)]
    struct TestInput {
        scenario: String,
        count: i32,
    }

    #[derive(Serialize)]
    struct Screen {
        name: String,
    }

    #[derive(Serialize)]
    struct NestedInput {
        scenario: String,
        screen: Screen,
    }

    fn input() -> TestInput {
        TestInput {
            scenario: "Tap on Add".to_string(),
            count: 3,
        }
    }

    fn render(template: &str) -> Result<String, PromptError> {
        PromptTemplate::parse(template)?.render(&input())
    }

    #[test]
    fn test_mandatory_placeholders() {
        assert_eq!(
            render("Scenario: {{input.scenario}} ({{input.count}} actions)").unwrap(),
            "Scenario: Tap on Add (3 actions)"
        );
    }

    #[test]
    fn test_optional_placeholder_missing() {
        assert_eq!(render("Notes: {{input.notes?}}").unwrap(), "Notes: ");
    }

    #[test]
    fn test_mandatory_placeholder_missing() {
        match render("Missing: {{input.missing_field}}") {
            Err(PromptError::MissingMandatoryPlaceholder(field)) => {
                assert_eq!(field, "input.missing_field");
            }
            other => panic!("Expected MissingMandatoryPlaceholder error, got {:?}", other),
        }
    }

    #[test]
    fn test_foreign_root_is_rejected_at_parse() {
        assert!(matches!(
            PromptTemplate::parse("Invalid: {{output.field}}"),
            Err(PromptError::InvalidPlaceholderPath(path)) if path == "output.field"
        ));
        assert!(PromptTemplate::parse("{{inputs.field}}").is_err());
    }

    #[test]
    fn test_nested_placeholder() {
        let nested = NestedInput {
            scenario: "Delete a task".to_string(),
            screen: Screen {
                name: "Tasks".to_string(),
            },
        };
        let template = PromptTemplate::parse("{{input.scenario}} on {{ input.screen.name }}").unwrap();
        assert_eq!(template.render(&nested).unwrap(), "Delete a task on Tasks");
    }

    #[test]
    fn test_substituted_values_are_not_rescanned() {
        let braces = TestInput {
            scenario: "{{input.count}}".to_string(),
            count: 1,
        };
        let template = PromptTemplate::parse("{{input.scenario}}").unwrap();
        assert_eq!(template.render(&braces).unwrap(), "{{input.count}}");
    }

    #[test]
    fn test_unclosed_braces_stay_literal() {
        let template = PromptTemplate::parse("{{input.scenario}} then {{ nothing").unwrap();
        assert_eq!(template.fields().collect::<Vec<_>>(), vec!["input.scenario"]);
        assert_eq!(template.render(&input()).unwrap(), "Tap on Add then {{ nothing");
    }
}
