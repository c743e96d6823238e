// Profile ("DNA dossier") engine.
// Implements: trigger policy, bounded history windows, synthesis, versioned commit.
// All LLM calls go through llm_client; no direct provider calls here.

pub mod generator;
pub mod handlers;
pub mod prompts;
pub mod trigger;
pub mod versioning;
