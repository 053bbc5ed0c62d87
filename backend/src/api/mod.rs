//! HTTP API module.
//!
//! Upload/export endpoints, response types and the log broadcaster.

pub mod logs;
pub mod server;
pub mod types;

pub use logs::*;
pub use server::{router, start_server, BusyFlag, BusyGuard};
pub use types::*;
