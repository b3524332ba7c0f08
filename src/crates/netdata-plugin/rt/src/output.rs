//! Shared protocol output.

use std::io;
use std::sync::Arc;
use tokio::io::{AsyncWrite, AsyncWriteExt};
use tokio::sync::{Mutex, MutexGuard};

/// Writer for sending chart protocol lines to netdata.
///
/// Cloning yields another handle to the same stream. Each [`write_raw`]
/// call holds the lock for the whole slice, so a block written in one call
/// is never interleaved with lines from another handle.
///
/// [`write_raw`]: ProtocolWriter::write_raw
#[derive(Debug)]
pub struct ProtocolWriter<W> {
    inner: Arc<Mutex<W>>,
}

impl<W> Clone for ProtocolWriter<W> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<W> ProtocolWriter<W>
where
    W: AsyncWrite + Unpin + Send,
{
    /// Create a new protocol writer
    pub fn new(writer: W) -> Self {
        Self {
            inner: Arc::new(Mutex::new(writer)),
        }
    }

    /// Write raw protocol bytes and flush
    pub async fn write_raw(&self, data: &[u8]) -> io::Result<()> {
        let mut writer = self.inner.lock().await;
        writer.write_all(data).await?;
        writer.flush().await
    }

    /// Lock the underlying stream.
    pub async fn lock(&self) -> MutexGuard<'_, W> {
        self.inner.lock().await
    }
}

impl ProtocolWriter<tokio::io::Stdout> {
    /// Create a protocol writer on stdout
    pub fn stdout() -> Self {
        Self::new(tokio::io::stdout())
    }
}

impl Default for ProtocolWriter<tokio::io::Stdout> {
    fn default() -> Self {
        Self::stdout()
    }
}
