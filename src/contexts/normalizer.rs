use crate::data::{ActionFrame, ActionRecord, HierarchyNode, NodeField};

/// Hierarchy attributes that carry no meaning for code generation.
pub const HIERARCHY_FIELDS_DROPPED: [NodeField; 3] =
    [NodeField::Bounds, NodeField::Index, NodeField::Package];

/// Reads a recorded trace. A frame missing a required key is rejected.
pub fn parse_trace(json: &str) -> Result<Vec<ActionFrame>, serde_json::Error> {
    serde_json::from_str(json)
}

/// Turns recorded frames into action records, one per frame, in order.
pub fn normalize(frames: &[ActionFrame]) -> Vec<ActionRecord> {
    frames
        .iter()
        .map(|frame| ActionRecord {
            element_name: frame.element.element.name.clone(),
            element_locator: frame.element.element.locator.clone(),
            element_action: frame.kind.clone(),
            element_action_data: frame.data.clone(),
            screen_description: frame.element.element.screen_description.clone(),
            screen_hierarchy: HierarchyNode::prune(
                &frame.element.hierarchy,
                &HIERARCHY_FIELDS_DROPPED,
            ),
        })
        .collect()
}
