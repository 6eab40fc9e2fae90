//! Output formatting module
//!
//! Console sink for progress lines and formatters for the final summary.

mod console;
mod formatter;

pub use console::{Console, Palette};
pub use formatter::{OutputFormat, SummaryFormatter};

#[cfg(test)]
pub use console::CaptureBuffer;
