pub mod bundle;
pub mod changepoint;
pub mod classifier;
pub mod extraction;
pub mod junit;
pub mod operators;
pub mod orchestrator;
pub mod reducer;

pub use bundle::{ArtifactBundle, ArtifactSource, DirectorySource};
pub use classifier::classify;
pub use extraction::{CommandClusterer, FrequencyClusterer, LineClusterer};
pub use orchestrator::{AnalysisSettings, Orchestrator};
