//! The stack: root of a composition tree and owner of its nodes

use std::fmt;

use crate::template::{synthesize, SynthConfig, Template};

use super::error::ConstructError;
use super::logical_id::{make_unique_id, HIDDEN_FROM_HUMAN_ID, HIDDEN_ID};
use super::node::{CfnOutput, CfnResource, Element, Node, NodeId, StackId};

/// Check run against the finished tree before synthesis
type Check = Box<dyn Fn(&Stack) -> Result<(), String>>;

/// Stack-level template settings
#[derive(Debug, Clone, Default)]
pub struct StackProps {
    /// Template `Description`
    pub description: Option<String>,
}

impl StackProps {
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }
}

/// A deployable unit, synthesized into exactly one template
///
/// Nodes live in an arena owned by the stack and are addressed by
/// [`NodeId`]. Children keep construction order, which is also the order
/// entries appear in the template.
pub struct Stack {
    id: StackId,
    props: StackProps,
    nodes: Vec<Node>,
    validations: Vec<(NodeId, Check)>,
}

impl fmt::Debug for Stack {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Stack")
            .field("name", &self.name())
            .field("nodes", &self.nodes.len())
            .field("validations", &self.validations.len())
            .finish()
    }
}

impl Stack {
    /// Create an empty stack
    pub fn new(name: impl Into<String>) -> Self {
        Self::with_props(name, StackProps::default())
    }

    /// Create an empty stack with template settings
    pub fn with_props(name: impl Into<String>, props: StackProps) -> Self {
        let root = Node {
            id: name.into(),
            parent: None,
            children: Vec::new(),
            element: None,
        };
        Self {
            id: StackId::next(),
            props,
            nodes: vec![root],
            validations: Vec::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.nodes[0].id
    }

    pub fn description(&self) -> Option<&str> {
        self.props.description.as_deref()
    }

    /// The stack's own node, parent of all top-level constructs
    pub fn root(&self) -> NodeId {
        NodeId {
            stack: self.id,
            index: 0,
        }
    }

    /// Number of nodes, the root included
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.len() == 1
    }

    pub fn node(&self, id: NodeId) -> Result<&Node, ConstructError> {
        self.check_owned(id)?;
        Ok(&self.nodes[id.index])
    }

    fn node_mut(&mut self, id: NodeId) -> Result<&mut Node, ConstructError> {
        self.check_owned(id)?;
        Ok(&mut self.nodes[id.index])
    }

    fn check_owned(&self, id: NodeId) -> Result<(), ConstructError> {
        if id.stack != self.id || id.index >= self.nodes.len() {
            return Err(ConstructError::ForeignNode {
                stack: self.name().to_string(),
            });
        }
        Ok(())
    }

    /// Add a plain scope node
    pub fn add_child(&mut self, parent: NodeId, id: &str) -> Result<NodeId, ConstructError> {
        self.insert(parent, id, None)
    }

    /// Add a node carrying a resource
    pub fn add_resource(
        &mut self,
        parent: NodeId,
        id: &str,
        resource: CfnResource,
    ) -> Result<NodeId, ConstructError> {
        self.insert(parent, id, Some(Element::Resource(resource)))
    }

    /// Add a node carrying an output
    pub fn add_output(
        &mut self,
        parent: NodeId,
        id: &str,
        output: CfnOutput,
    ) -> Result<NodeId, ConstructError> {
        self.insert(parent, id, Some(Element::Output(output)))
    }

    fn insert(
        &mut self,
        parent: NodeId,
        id: &str,
        element: Option<Element>,
    ) -> Result<NodeId, ConstructError> {
        self.check_owned(parent)?;
        if id.is_empty() {
            return Err(ConstructError::invalid_id(
                id,
                "only the stack root may have an empty id",
            ));
        }
        let id = id.replace('/', "--");
        if self.find_child(parent, &id).is_some() {
            return Err(ConstructError::duplicate_id(self.path(parent), id));
        }

        let node_id = NodeId {
            stack: self.id,
            index: self.nodes.len(),
        };
        self.nodes.push(Node {
            id,
            parent: Some(parent),
            children: Vec::new(),
            element,
        });
        self.nodes[parent.index].children.push(node_id);
        tracing::trace!(path = %self.path(node_id), "added construct");
        Ok(node_id)
    }

    /// Find a direct child by construct id
    pub fn find_child(&self, parent: NodeId, id: &str) -> Option<NodeId> {
        let node = self.node(parent).ok()?;
        node.children
            .iter()
            .copied()
            .find(|child| self.nodes[child.index].id == id)
    }

    /// The resource a higher-level construct wraps
    pub fn default_child(&self, id: NodeId) -> Option<NodeId> {
        self.find_child(id, HIDDEN_FROM_HUMAN_ID)
            .or_else(|| self.find_child(id, HIDDEN_ID))
    }

    /// Construct ids from just below the root down to `id`
    pub fn path_components(&self, id: NodeId) -> Vec<&str> {
        if self.check_owned(id).is_err() {
            return Vec::new();
        }
        let mut components = Vec::new();
        let mut current = id;
        while let Some(parent) = self.nodes[current.index].parent {
            components.push(self.nodes[current.index].id.as_str());
            current = parent;
        }
        components.reverse();
        components
    }

    /// Slash-separated path of a node; the root's path is the stack name
    pub fn path(&self, id: NodeId) -> String {
        if id == self.root() {
            return self.name().to_string();
        }
        self.path_components(id).join("/")
    }

    /// Path a child `id` of `parent` would have, before it is added
    pub fn child_path(&self, parent: NodeId, id: &str) -> String {
        let id = id.replace('/', "--");
        if parent == self.root() {
            id
        } else {
            format!("{}/{}", self.path(parent), id)
        }
    }

    /// Identifier unique within the stack, derived from the node's path
    pub fn unique_id(&self, id: NodeId) -> Result<String, ConstructError> {
        self.check_owned(id)?;
        make_unique_id(&self.path_components(id))
    }

    pub fn resource(&self, id: NodeId) -> Result<&CfnResource, ConstructError> {
        match &self.node(id)?.element {
            Some(Element::Resource(resource)) => Ok(resource),
            _ => Err(ConstructError::validation(self.path(id), "not a resource")),
        }
    }

    pub fn resource_mut(&mut self, id: NodeId) -> Result<&mut CfnResource, ConstructError> {
        let path = self.path(id);
        match &mut self.node_mut(id)?.element {
            Some(Element::Resource(resource)) => Ok(resource),
            _ => Err(ConstructError::validation(path, "not a resource")),
        }
    }

    /// Make `from` depend on `to`; both must be resources of this stack
    pub fn add_dependency(&mut self, from: NodeId, to: NodeId) -> Result<(), ConstructError> {
        self.resource(to)?;
        let resource = self.resource_mut(from)?;
        if !resource.depends_on.contains(&to) {
            resource.depends_on.push(to);
        }
        Ok(())
    }

    /// Replace the path-derived logical id of a resource
    pub fn override_logical_id(
        &mut self,
        id: NodeId,
        logical_id: impl Into<String>,
    ) -> Result<(), ConstructError> {
        let logical_id = logical_id.into();
        if logical_id.is_empty() || !logical_id.chars().all(|c| c.is_ascii_alphanumeric()) {
            return Err(ConstructError::invalid_id(
                logical_id,
                "logical ids must be non-empty and alphanumeric",
            ));
        }
        self.resource_mut(id)?.logical_id_override = Some(logical_id);
        Ok(())
    }

    /// Register a check run against the whole stack at synthesis time
    pub fn add_validation<F>(&mut self, node: NodeId, check: F) -> Result<(), ConstructError>
    where
        F: Fn(&Stack) -> Result<(), String> + 'static,
    {
        self.check_owned(node)?;
        self.validations.push((node, Box::new(check)));
        Ok(())
    }

    /// Run registered checks in registration order; the first failure wins
    pub fn validate(&self) -> Result<(), ConstructError> {
        for (node, check) in &self.validations {
            check(self).map_err(|message| ConstructError::validation(self.path(*node), message))?;
        }
        Ok(())
    }

    /// `id` and everything below it, depth first in construction order
    pub fn descendants(&self, id: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        if self.check_owned(id).is_err() {
            return out;
        }
        let mut stack = vec![id];
        while let Some(current) = stack.pop() {
            out.push(current);
            stack.extend(self.nodes[current.index].children.iter().rev().copied());
        }
        out
    }

    /// Follow default children until a node with a template element
    pub fn resolve_element(&self, target: NodeId) -> Result<Option<NodeId>, ConstructError> {
        let mut current = target;
        loop {
            if self.node(current)?.element.is_some() {
                return Ok(Some(current));
            }
            match self.default_child(current) {
                Some(child) => current = child,
                None => return Ok(None),
            }
        }
    }

    /// Synthesize with default settings
    pub fn synth(&self) -> Result<Template, ConstructError> {
        synthesize(self, &SynthConfig::default())
    }

    pub fn synth_with_config(&self, config: &SynthConfig) -> Result<Template, ConstructError> {
        synthesize(self, config)
    }
}
