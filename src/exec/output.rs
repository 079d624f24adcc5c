// src/exec/output.rs

//! Output sinks for task-visible output.
//!
//! Every execution context carries an [`Output`]. The top-level run writes to
//! the process stdio (or whatever the caller passes in); each branch of a
//! parallel group gets a private [`SharedBuffer`] that is flushed to the
//! parent sink as one block when the branch completes.

use std::fmt;
use std::io::{self, Write};
use std::sync::{Arc, Mutex};

type Sink = Arc<Mutex<dyn Write + Send>>;

/// Destination for a context's stdout/stderr.
#[derive(Clone)]
pub struct Output {
    stdout: Sink,
    stderr: Sink,
}

impl fmt::Debug for Output {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Output").finish_non_exhaustive()
    }
}

impl Output {
    /// Write to the process stdout/stderr.
    pub fn stdio() -> Self {
        Self {
            stdout: Arc::new(Mutex::new(io::stdout())),
            stderr: Arc::new(Mutex::new(io::stderr())),
        }
    }

    /// Drop everything. Used by collect-mode walks.
    pub fn discard() -> Self {
        Self::from_writer(io::sink())
    }

    /// Send both streams to a single writer.
    pub fn from_writer<W: Write + Send + 'static>(writer: W) -> Self {
        let sink: Sink = Arc::new(Mutex::new(writer));
        Self {
            stdout: sink.clone(),
            stderr: sink,
        }
    }

    /// Both streams into one shared in-memory buffer.
    pub fn buffered() -> (Self, SharedBuffer) {
        let buffer = SharedBuffer::default();
        (Self::from_writer(buffer.clone()), buffer)
    }

    pub fn write_stdout(&self, bytes: &[u8]) -> io::Result<()> {
        write_locked(&self.stdout, bytes)
    }

    pub fn write_stderr(&self, bytes: &[u8]) -> io::Result<()> {
        write_locked(&self.stderr, bytes)
    }
}

fn write_locked(sink: &Sink, bytes: &[u8]) -> io::Result<()> {
    let mut guard = sink.lock().unwrap_or_else(|e| e.into_inner());
    guard.write_all(bytes)?;
    guard.flush()
}

/// Growable byte buffer shared between a writer and its owner.
#[derive(Clone, Default)]
pub struct SharedBuffer {
    inner: Arc<Mutex<Vec<u8>>>,
}

impl fmt::Debug for SharedBuffer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SharedBuffer")
            .field("len", &self.len())
            .finish()
    }
}

impl SharedBuffer {
    pub fn len(&self) -> usize {
        self.inner.lock().unwrap_or_else(|e| e.into_inner()).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Drain the buffer, leaving it empty.
    pub fn take(&self) -> Vec<u8> {
        std::mem::take(&mut *self.inner.lock().unwrap_or_else(|e| e.into_inner()))
    }

    /// Copy of the current contents as (lossy) UTF-8.
    pub fn contents(&self) -> String {
        let guard = self.inner.lock().unwrap_or_else(|e| e.into_inner());
        String::from_utf8_lossy(&guard).into_owned()
    }
}

impl Write for SharedBuffer {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.inner
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}
