//! Overlays drawn on top of the dashboard.

pub mod report_viewer;
pub mod toast;
