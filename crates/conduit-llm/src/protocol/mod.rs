//! Vendor wire-format types
//!
//! Pure serde shapes, one module per vendor. Response payloads are modeled
//! as tagged unions so the block kind is decided at deserialization time.

pub mod anthropic;
pub mod gemini;
pub mod ollama;
pub mod openai;
