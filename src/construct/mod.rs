//! Composition tree: stacks, nodes, property values and logical ids
//!
//! Constructs are added to a [`Stack`] and addressed through [`NodeId`]
//! handles. Resource nodes carry a [`CfnResource`] whose properties may
//! reference other nodes; those references stay symbolic until synthesis.

pub mod error;
pub mod logical_id;
pub mod node;
pub mod stack;
pub mod value;

pub use error::ConstructError;
pub use logical_id::make_unique_id;
pub use node::{CfnOutput, CfnResource, Element, Node, NodeId};
pub use stack::{Stack, StackProps};
pub use value::{Properties, Pseudo, Value};
