//! Format instruction loading
//!
//! Reads the shared instruction text appended to every prompt.

use std::io::ErrorKind;
use std::path::Path;
use tracing::{error, info, warn};

/// Read the response-format instruction appended to prompts.
///
/// A missing or unreadable file yields an empty instruction.
pub fn load_format_instruction(path: &Path) -> String {
    match std::fs::read_to_string(path) {
        Ok(text) => {
            let text = text.trim().to_string();
            info!("Loaded format instruction from {} ({} chars)", path.display(), text.len());
            text
        }
        Err(e) if e.kind() == ErrorKind::NotFound => {
            warn!("Format instruction file not found: {}", path.display());
            String::new()
        }
        Err(e) => {
            error!("Error loading format instruction from {}: {}", path.display(), e);
            String::new()
        }
    }
}
