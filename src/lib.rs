// Library surface for headless/integration tests and reuse.
// Keep this lean to avoid coupling to bin-only types in main.rs (App, ui).
pub mod app_dirs;
pub mod config;
pub mod corpus;
pub mod metrics;
pub mod results;
pub mod runtime;
pub mod session;
pub mod storage;
pub mod submit;
