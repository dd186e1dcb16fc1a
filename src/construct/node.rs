//! Nodes of the composition tree

use std::sync::atomic::{AtomicU64, Ordering};

use super::value::{Properties, Value};

static NEXT_STACK_ID: AtomicU64 = AtomicU64::new(1);

/// Identity of the stack a node belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct StackId(u64);

impl StackId {
    pub(crate) fn next() -> Self {
        Self(NEXT_STACK_ID.fetch_add(1, Ordering::Relaxed))
    }
}

/// Handle to a node in a [`Stack`](super::Stack)
///
/// Handles are only meaningful for the stack that created them; using one
/// with another stack yields [`ConstructError::ForeignNode`](super::ConstructError::ForeignNode).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeId {
    pub(crate) stack: StackId,
    pub(crate) index: usize,
}

/// A node in the composition tree
#[derive(Debug, Clone)]
pub struct Node {
    pub(crate) id: String,
    pub(crate) parent: Option<NodeId>,
    pub(crate) children: Vec<NodeId>,
    pub(crate) element: Option<Element>,
}

impl Node {
    /// Construct id, unique among siblings
    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn parent(&self) -> Option<NodeId> {
        self.parent
    }

    /// Children in construction order
    pub fn children(&self) -> &[NodeId] {
        &self.children
    }

    /// Template element carried by this node, if any
    pub fn element(&self) -> Option<&Element> {
        self.element.as_ref()
    }
}

/// Something that becomes an entry in the synthesized template
#[derive(Debug, Clone)]
pub enum Element {
    Resource(CfnResource),
    Output(CfnOutput),
}

/// A low-level resource: a type name plus its property bag
#[derive(Debug, Clone)]
pub struct CfnResource {
    /// Engine type name, e.g. `AWS::ApiGateway::UsagePlan`
    pub resource_type: String,
    pub properties: Properties,
    /// Resources that must be created before this one
    pub depends_on: Vec<NodeId>,
    /// Replaces the path-derived logical id
    pub logical_id_override: Option<String>,
    /// Values hashed into a logical id suffix at synthesis
    pub hash_components: Vec<Value>,
}

impl CfnResource {
    pub fn new(resource_type: impl Into<String>, properties: Properties) -> Self {
        Self {
            resource_type: resource_type.into(),
            properties,
            depends_on: Vec::new(),
            logical_id_override: None,
            hash_components: Vec::new(),
        }
    }
}

/// A template output
#[derive(Debug, Clone)]
pub struct CfnOutput {
    pub value: Value,
    pub description: Option<String>,
    pub export_name: Option<String>,
}

impl CfnOutput {
    pub fn new(value: impl Into<Value>) -> Self {
        Self {
            value: value.into(),
            description: None,
            export_name: None,
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn with_export_name(mut self, name: impl Into<String>) -> Self {
        self.export_name = Some(name.into());
        self
    }
}
