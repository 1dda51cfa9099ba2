//! TUI module: Terminal User Interface using Ratatui.
//!
//! One screen per workflow step:
//! - Home with registry counts
//! - Recipient and donor entry forms
//! - Compatibility check and priority ranking
//! - Record management

mod app;
mod styles;
mod ui;

pub use app::{App, Screen};
pub use styles::ClinicalTheme;
