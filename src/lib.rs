pub mod cache;
pub mod config;
pub mod dom;
pub mod extractor;
pub mod fetcher;
pub mod host;
pub mod normalizer;
pub mod orchestrator;
pub mod quality;
pub mod remote;
pub mod resolver;

pub use extractor::model::{Confidence, PolicyFields, PolicyConfidence, PolicySummary};
pub use orchestrator::{Orchestrator, PageSnapshot};
pub use orchestrator::state::{ContextState, DetectionResult, Status};
pub use resolver::PolicyUrlCandidates;
