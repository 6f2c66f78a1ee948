//! Output module for end-of-run reporting

pub mod stats;

pub use stats::{print_summary, render_summary};
