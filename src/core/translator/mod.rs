//! Per-upstream request adaptation
//!
//! The translator produces an owned, adapted copy of the inbound request
//! for one specific source; the original is never mutated. When a
//! tools-bearing request lands on an upstream without native function
//! calling, the `fc_compat` layer rewrites the conversation into a
//! prompt-based tool protocol and later re-projects the reply into the
//! standard tool-calling shape.

pub mod fc_compat;
mod translate;

pub use translate::{translate, TranslatedRequest};
