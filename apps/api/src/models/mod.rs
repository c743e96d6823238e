pub mod annotation;
pub mod counters;
pub mod digest;
pub mod event;
pub mod profile;
