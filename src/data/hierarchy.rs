use serde::{Deserialize, Serialize};

/// One node of a device screen hierarchy as recorded in a trace.
///
/// `index`, `package` and `bounds` are always present on recorded nodes;
/// a trace missing any of them is rejected at deserialization.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HierarchyNode {
    pub index: i64,
    pub package: String,
    pub bounds: String,
    #[serde(default, rename = "class", skip_serializing_if = "Option::is_none")]
    pub class_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(default, rename = "resource-id", skip_serializing_if = "Option::is_none")]
    pub resource_id: Option<String>,
    #[serde(default, rename = "content-desc", skip_serializing_if = "Option::is_none")]
    pub content_desc: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<HierarchyNode>,
}

impl HierarchyNode {
    /// Projects a recorded tree into a [`ViewNode`] tree without `fields`.
    pub fn prune(nodes: &[HierarchyNode], fields: &[NodeField]) -> Vec<ViewNode> {
        let views: Vec<ViewNode> = nodes.iter().map(ViewNode::from).collect();
        without_fields(&views, fields)
    }
}

/// Scalar attributes of a hierarchy node that a projection may drop.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NodeField {
    Index,
    Package,
    Bounds,
    ClassName,
    Text,
    ResourceId,
    ContentDesc,
}

/// A hierarchy node after projection: every scalar attribute is optional.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ViewNode {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub index: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub package: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bounds: Option<String>,
    #[serde(default, rename = "class", skip_serializing_if = "Option::is_none")]
    pub class_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(default, rename = "resource-id", skip_serializing_if = "Option::is_none")]
    pub resource_id: Option<String>,
    #[serde(default, rename = "content-desc", skip_serializing_if = "Option::is_none")]
    pub content_desc: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<ViewNode>,
}

impl ViewNode {
    fn clear(&mut self, field: NodeField) {
        match field {
            NodeField::Index => self.index = None,
            NodeField::Package => self.package = None,
            NodeField::Bounds => self.bounds = None,
            NodeField::ClassName => self.class_name = None,
            NodeField::Text => self.text = None,
            NodeField::ResourceId => self.resource_id = None,
            NodeField::ContentDesc => self.content_desc = None,
        }
    }
}

impl From<&HierarchyNode> for ViewNode {
    fn from(node: &HierarchyNode) -> Self {
        Self {
            index: Some(node.index),
            package: Some(node.package.clone()),
            bounds: Some(node.bounds.clone()),
            class_name: node.class_name.clone(),
            text: node.text.clone(),
            resource_id: node.resource_id.clone(),
            content_desc: node.content_desc.clone(),
            children: node.children.iter().map(ViewNode::from).collect(),
        }
    }
}

/// Returns a copy of `nodes` with `fields` removed from every node, children
/// included. The input is left untouched and dropping an absent field is a
/// no-op, so applying the same projection twice changes nothing.
pub fn without_fields(nodes: &[ViewNode], fields: &[NodeField]) -> Vec<ViewNode> {
    nodes
        .iter()
        .map(|node| {
            let mut copy = ViewNode {
                children: without_fields(&node.children, fields),
                ..node.clone()
            };
            for field in fields {
                copy.clear(*field);
            }
            copy
        })
        .collect()
}
