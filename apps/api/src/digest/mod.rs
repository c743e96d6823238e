// Digest ("newsletter") engine.
// On-demand and scheduled generation share one pipeline; only the scheduled
// path carries the one-per-day guard.

pub mod generator;
pub mod handlers;
pub mod prompts;
pub mod scheduler;
