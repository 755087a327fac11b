//! Data models for the public HTTP surface and the upstream chat service.
//!
//! - `api`: request/response/event shapes served to the frontend.
//! - `ollama`: the subset of the Ollama-style chat API this service consumes.

pub mod api;
pub mod ollama;
