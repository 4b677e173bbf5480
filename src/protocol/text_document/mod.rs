//! =============================================================================
//! textDocument/* Handlers
//! =============================================================================
//!
//! Houses handlers for open/change/save and code actions.

pub mod code_action;
pub mod did_change;
pub mod did_open;
pub mod did_save;
