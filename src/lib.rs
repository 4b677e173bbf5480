//! =============================================================================
//! Crate Entry Points
//! =============================================================================
//!
//! The bridge is split into a handful of subsystems (configuration, compiler
//! discovery, process management, diagnostic parsing, code actions, protocol
//! handlers) so each concern can be exercised in isolation. The stdio server
//! in [`server`] wires them together.

pub mod actions;
pub mod config;
pub mod documents;
pub mod process;
pub mod protocol;
pub mod provider;
pub mod rpc;
pub mod server;
pub mod types;
pub mod utils;

pub use server::run_stdio_server;
