//! Serialized console output
//!
//! All progress lines go through one mutex-guarded writer so lines printed by
//! concurrent workers never interleave.

use std::io::{self, Write};
use std::sync::{Arc, Mutex, PoisonError};

/// ANSI color decorator, applied only at the presentation boundary
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Palette {
    enabled: bool,
}

impl Palette {
    pub fn new(enabled: bool) -> Self {
        Self { enabled }
    }

    fn paint(&self, code: &str, text: &str) -> String {
        if self.enabled {
            format!("{code}{text}\x1b[0m")
        } else {
            text.to_string()
        }
    }

    pub fn red(&self, text: &str) -> String {
        self.paint("\x1b[91m", text)
    }

    pub fn green(&self, text: &str) -> String {
        self.paint("\x1b[92m", text)
    }

    pub fn yellow(&self, text: &str) -> String {
        self.paint("\x1b[93m", text)
    }

    pub fn blue(&self, text: &str) -> String {
        self.paint("\x1b[94m", text)
    }

    pub fn cyan(&self, text: &str) -> String {
        self.paint("\x1b[96m", text)
    }

    pub fn white(&self, text: &str) -> String {
        self.paint("\x1b[97m", text)
    }

    pub fn bold(&self, text: &str) -> String {
        self.paint("\x1b[1m", text)
    }

    /// Green at or above 80%, yellow at or above 50%, red below
    pub fn rate(&self, rate: f64, text: &str) -> String {
        if rate >= 80.0 {
            self.green(text)
        } else if rate >= 50.0 {
            self.yellow(text)
        } else {
            self.red(text)
        }
    }
}

/// Shared line-oriented output sink
#[derive(Clone)]
pub struct Console {
    sink: Arc<Mutex<Box<dyn Write + Send>>>,
    palette: Palette,
}

impl Console {
    /// Console writing to stdout
    pub fn stdout(colorize: bool) -> Self {
        Self::from_writer(io::stdout(), colorize)
    }

    pub fn from_writer(writer: impl Write + Send + 'static, colorize: bool) -> Self {
        Self {
            sink: Arc::new(Mutex::new(Box::new(writer))),
            palette: Palette::new(colorize),
        }
    }

    pub fn palette(&self) -> Palette {
        self.palette
    }

    /// Write one complete line while holding the sink lock.
    ///
    /// Write errors are ignored; console output never affects a run.
    pub fn line(&self, text: impl AsRef<str>) {
        let mut sink = self.sink.lock().unwrap_or_else(PoisonError::into_inner);
        let _ = writeln!(sink, "{}", text.as_ref());
        let _ = sink.flush();
    }
}

impl std::fmt::Debug for Console {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Console")
            .field("palette", &self.palette)
            .finish_non_exhaustive()
    }
}

/// In-memory writer for capturing console output in tests
#[cfg(test)]
#[derive(Clone, Default)]
pub struct CaptureBuffer(Arc<Mutex<Vec<u8>>>);

#[cfg(test)]
impl CaptureBuffer {
    pub fn contents(&self) -> String {
        String::from_utf8_lossy(&self.0.lock().unwrap()).into_owned()
    }
}

#[cfg(test)]
impl Write for CaptureBuffer {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}
