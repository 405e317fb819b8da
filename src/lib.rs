// Core modules
pub mod auth;
pub mod config;
pub mod env_check;
pub mod gate;
pub mod types;

// HTTP host
pub mod api;
pub mod server;

// Re-export key types and functions
pub use api::{AppState, create_router};
pub use auth::{AuthTier, SessionContext, SessionError, SessionResolver, SessionState};
pub use config::{AdminAllowList, ConfigError, GateConfig};
pub use env_check::EnvReport;
pub use gate::{Decision, Gate, GateRequest, Verdict};
pub use server::start_gate_http;
