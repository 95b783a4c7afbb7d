//! Output destinations for log lines.

use std::fmt;
use std::fs::{self, OpenOptions};
use std::io::{self, BufWriter, Write};
use std::path::Path;
use std::sync::{Arc, Mutex, PoisonError};

/// A writable destination owned by a [`Logger`](super::Logger).
///
/// The logger serializes access, so a sink only needs to be `Send`.
pub struct Sink {
    label: &'static str,
    writer: Box<dyn Write + Send>,
}

impl Sink {
    pub fn stdout() -> Self {
        Self {
            label: "stdout",
            writer: Box::new(io::stdout()),
        }
    }

    pub fn stderr() -> Self {
        Self {
            label: "stderr",
            writer: Box::new(io::stderr()),
        }
    }

    /// Open `path` in append mode, creating it and its parent directory if needed.
    pub fn file(path: &Path) -> io::Result<Self> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        let file = OpenOptions::new().create(true).append(true).open(path)?;
        Ok(Self {
            label: "file",
            writer: Box::new(BufWriter::new(file)),
        })
    }

    /// Capture lines in memory; keep a clone of `buffer` to read them back.
    pub fn buffer(buffer: &SharedBuffer) -> Self {
        Self {
            label: "buffer",
            writer: Box::new(buffer.clone()),
        }
    }

    /// Wrap an arbitrary writer.
    pub fn writer<W: Write + Send + 'static>(writer: W) -> Self {
        Self {
            label: "writer",
            writer: Box::new(writer),
        }
    }

    pub fn label(&self) -> &'static str {
        self.label
    }
}

impl Write for Sink {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.writer.write(buf)
    }

    fn write_all(&mut self, buf: &[u8]) -> io::Result<()> {
        self.writer.write_all(buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.writer.flush()
    }
}

impl fmt::Debug for Sink {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Sink").field("label", &self.label).finish()
    }
}

/// Cloneable in-memory sink. All clones share the same bytes.
#[derive(Debug, Clone, Default)]
pub struct SharedBuffer {
    bytes: Arc<Mutex<Vec<u8>>>,
}

impl SharedBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Everything written so far, lossily decoded.
    pub fn contents(&self) -> String {
        let bytes = self.bytes.lock().unwrap_or_else(PoisonError::into_inner);
        String::from_utf8_lossy(&bytes).into_owned()
    }

    /// Complete lines written so far, without their terminators.
    pub fn lines(&self) -> Vec<String> {
        self.contents().lines().map(str::to_owned).collect()
    }

    pub fn clear(&self) {
        self.bytes
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
    }

    pub fn is_empty(&self) -> bool {
        self.bytes
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .is_empty()
    }
}

impl Write for SharedBuffer {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.bytes
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}
