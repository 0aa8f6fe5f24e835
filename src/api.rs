//! Entry points for the surrounding shell.
//!
//! The shell (context menu, settings page, overlay buttons) sends tagged
//! `ExtensionRequest` messages; `dispatch` routes each one to the session.

pub mod dispatch;

pub use dispatch::handle_request;
