pub mod agentic;
pub mod client;
pub mod diagnosis;
pub mod prompts;
pub mod retry;
pub mod tools;

#[cfg(test)]
pub(crate) mod testing;

pub use client::InferenceClient;
pub use diagnosis::{Diagnoser, DiagnosisSettings};
pub use retry::RetryPolicy;
