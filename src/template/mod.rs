//! Template synthesis
//!
//! This module turns a [`Stack`](crate::construct::Stack) into the
//! declarative document consumed by the provisioning engine.

pub mod config;
pub mod document;
pub mod synth;

pub use config::SynthConfig;
pub use document::Template;
pub use synth::synthesize;
