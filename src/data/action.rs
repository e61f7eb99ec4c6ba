use serde::{Deserialize, Serialize};

use super::hierarchy::{HierarchyNode, ViewNode};

/// One raw frame of a recorded interaction trace.
///
/// This mirrors the JSON produced by the scenario explorer:
/// `{"element": {"element": {...}, "hierarchy": [...]}, "type": "...", "data": ...}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActionFrame {
    pub element: ElementLookup,
    #[serde(rename = "type")]
    pub kind: ActionKind,
    #[serde(default)]
    pub data: Option<String>,
}

/// Result of locating an element on screen, with the screen it was found on.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ElementLookup {
    pub element: ElementInfo,
    pub hierarchy: Vec<HierarchyNode>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ElementInfo {
    pub name: String,
    /// Opaque locator, an XPath expression for UiAutomator traces.
    #[serde(rename = "xpath", alias = "locator")]
    pub locator: String,
    pub screen_description: String,
}

/// Kind of user interaction. The set is open: unknown kinds are carried
/// through verbatim.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum ActionKind {
    Tap,
    InputText,
    Other(String),
}

impl ActionKind {
    pub fn as_str(&self) -> &str {
        match self {
            ActionKind::Tap => "tap",
            ActionKind::InputText => "input_text",
            ActionKind::Other(kind) => kind,
        }
    }
}

impl From<String> for ActionKind {
    fn from(kind: String) -> Self {
        match kind.to_ascii_lowercase().replace('-', "_").as_str() {
            "tap" | "click" => ActionKind::Tap,
            "input_text" | "input" | "type_text" => ActionKind::InputText,
            _ => ActionKind::Other(kind),
        }
    }
}

impl From<ActionKind> for String {
    fn from(kind: ActionKind) -> Self {
        kind.as_str().to_string()
    }
}

/// A normalized user interaction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActionRecord {
    pub element_name: String,
    pub element_locator: String,
    pub element_action: ActionKind,
    pub element_action_data: Option<String>,
    pub screen_description: String,
    pub screen_hierarchy: Vec<ViewNode>,
}

/// What the interface stage is allowed to see of an action: no locator and
/// no hierarchy.
#[derive(Debug, Serialize)]
pub struct InterfaceAction<'a> {
    pub element_name: &'a str,
    pub element_action: &'a ActionKind,
    pub element_action_data: Option<&'a str>,
    pub screen_description: &'a str,
}

/// What the implementation stage is allowed to see of an action: no free-text
/// screen description.
#[derive(Debug, Serialize)]
pub struct ImplementationAction<'a> {
    pub element_name: &'a str,
    pub element_locator: &'a str,
    pub element_action: &'a ActionKind,
    pub element_action_data: Option<&'a str>,
    pub screen_hierarchy: &'a [ViewNode],
}

impl ActionRecord {
    pub fn for_interfaces(&self) -> InterfaceAction<'_> {
        InterfaceAction {
            element_name: &self.element_name,
            element_action: &self.element_action,
            element_action_data: self.element_action_data.as_deref(),
            screen_description: &self.screen_description,
        }
    }

    pub fn for_implementation(&self) -> ImplementationAction<'_> {
        ImplementationAction {
            element_name: &self.element_name,
            element_locator: &self.element_locator,
            element_action: &self.element_action,
            element_action_data: self.element_action_data.as_deref(),
            screen_hierarchy: &self.screen_hierarchy,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_action_kind_aliases() {
        assert_eq!(ActionKind::from("click".to_string()), ActionKind::Tap);
        assert_eq!(ActionKind::from("input-text".to_string()), ActionKind::InputText);
        assert_eq!(
            ActionKind::from("swipe".to_string()),
            ActionKind::Other("swipe".to_string())
        );
        assert_eq!(String::from(ActionKind::InputText), "input_text");
    }

    #[test]
    fn test_frame_accepts_locator_alias() {
        let frame: ActionFrame = serde_json::from_value(json!({
            "element": {
                "element": {
                    "name": "Add button",
                    "locator": "//button[@text='Add']",
                    "screen_description": "Task list"
                },
                "hierarchy": []
            },
            "type": "tap"
        }))
        .unwrap();

        assert_eq!(frame.element.element.locator, "//button[@text='Add']");
        assert_eq!(frame.kind, ActionKind::Tap);
        assert_eq!(frame.data, None);
    }

    #[test]
    fn test_stage_views_hide_fields() {
        let record = ActionRecord {
            element_name: "Login".to_string(),
            element_locator: "//x".to_string(),
            element_action: ActionKind::Tap,
            element_action_data: None,
            screen_description: "Login button".to_string(),
            screen_hierarchy: vec![ViewNode {
                text: Some("Login".to_string()),
                ..ViewNode::default()
            }],
        };

        let interfaces = serde_json::to_string(&record.for_interfaces()).unwrap();
        assert!(!interfaces.contains("//x"));
        assert!(!interfaces.contains("screen_hierarchy"));

        let implementation = serde_json::to_string(&record.for_implementation()).unwrap();
        assert!(!implementation.contains("Login button"));
        assert!(implementation.contains("//x"));
    }
}
