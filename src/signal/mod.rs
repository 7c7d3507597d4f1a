//! Signal pipeline
//!
//! Turns a market snapshot into a sized, reason-coded trade decision

pub mod modifiers;
mod pipeline;
mod types;

pub use modifiers::SourceWeights;
pub use pipeline::SignalPipeline;
pub use types::{Decision, Modifier, RejectReason, Side, Signal, SourceReading, ACCEPTED};
