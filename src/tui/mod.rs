//! TUI module: Terminal User Interface using Ratatui.
//!
//! Screens:
//! - Dashboard with the loaded model and its verification status
//! - Patient data input
//! - Assessment result with risk factors and feature importance

mod app;
mod styles;
mod ui;

pub use app::{App, Screen};
pub use styles::MedicalTheme;
