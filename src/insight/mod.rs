//! Model-generated insights: prompt building, the model client, and reply
//! normalization.

pub mod client;
pub mod normalizer;
pub mod prompt;

pub use client::{ClientConfig, OllamaClient, TextGenerator};
