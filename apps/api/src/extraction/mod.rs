pub mod fallback;
pub mod handlers;
pub mod heuristics;
pub mod input;
pub mod normalizer;
pub mod orchestrator;
pub mod prompts;
pub mod remote;
pub mod vocabulary;
