//! FIFO conduit lifecycle and exact-byte I/O.
//!
//! The underlying transport is a POSIX FIFO: ordered, reliable, half-duplex,
//! with no message boundaries. Opening the write end of a FIFO normally
//! blocks until a reader attaches; the non-blocking handles used here
//! preserve that rendezvous by retrying `ENXIO` until a reader appears.

use std::ffi::CString;
use std::os::unix::ffi::OsStrExt;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::unix::pipe;
use tracing::trace;

use crate::error::{ChannelError, Result};

/// Interval between rendezvous attempts while no reader is attached.
const RENDEZVOUS_POLL: Duration = Duration::from_millis(10);

/// Creates a FIFO special file at `path` (mode 0666).
pub fn create(path: &Path) -> Result<()> {
    let cpath = CString::new(path.as_os_str().as_bytes()).map_err(|_| ChannelError::Create {
        path: path.to_path_buf(),
        source: std::io::Error::from(std::io::ErrorKind::InvalidInput),
    })?;
    // mkfifo has no portable wrapper in std; errno carries the cause.
    let rc = unsafe { libc::mkfifo(cpath.as_ptr(), 0o666) };
    if rc != 0 {
        return Err(ChannelError::Create {
            path: path.to_path_buf(),
            source: std::io::Error::last_os_error(),
        });
    }
    Ok(())
}

/// Removes the FIFO special file at `path`.
pub fn remove(path: &Path) -> Result<()> {
    std::fs::remove_file(path).map_err(|source| ChannelError::Remove {
        path: path.to_path_buf(),
        source,
    })
}

/// The read end of a conduit.
#[derive(Debug)]
pub struct ChannelReader {
    rx: pipe::Receiver,
    path: PathBuf,
}

impl ChannelReader {
    /// Opens the read end of the FIFO at `path`. Opening for read does not
    /// block on a writer.
    pub fn open(path: &Path) -> Result<Self> {
        let rx = pipe::OpenOptions::new()
            .open_receiver(path)
            .map_err(|source| ChannelError::Open {
                path: path.to_path_buf(),
                source,
            })?;
        Ok(Self {
            rx,
            path: path.to_path_buf(),
        })
    }

    /// Reads exactly `buf.len()` bytes, retrying partial reads internally.
    ///
    /// A peer closing the conduit mid-message surfaces as
    /// [`ChannelError::Closed`], never a silently short read, because the
    /// transport has no framing of its own.
    pub async fn read_exact(&mut self, buf: &mut [u8]) -> Result<()> {
        match self.rx.read_exact(buf).await {
            Ok(_) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::UnexpectedEof => Err(ChannelError::Closed),
            Err(e) => Err(ChannelError::Read(e)),
        }
    }

    /// Path of the underlying FIFO.
    pub fn path(&self) -> &Path {
        &self.path
    }
}

/// The write end of a conduit.
#[derive(Debug)]
pub struct ChannelWriter {
    tx: pipe::Sender,
    path: PathBuf,
}

impl ChannelWriter {
    /// Connects the write end, waiting indefinitely for a reader to attach
    /// (rendezvous-on-open, as a blocking `open(O_WRONLY)` would).
    pub async fn connect(path: &Path) -> Result<Self> {
        Self::connect_inner(path, None).await
    }

    /// Connects the write end, giving up with [`ChannelError::ConnectTimeout`]
    /// if no reader attaches within `timeout`. Used where the caller must
    /// not stall on an absent peer.
    pub async fn connect_timeout(path: &Path, timeout: Duration) -> Result<Self> {
        Self::connect_inner(path, Some(timeout)).await
    }

    async fn connect_inner(path: &Path, timeout: Option<Duration>) -> Result<Self> {
        let started = Instant::now();
        loop {
            match pipe::OpenOptions::new().open_sender(path) {
                Ok(tx) => {
                    trace!(path = %path.display(), "conduit write end connected");
                    return Ok(Self {
                        tx,
                        path: path.to_path_buf(),
                    });
                }
                Err(e) if e.raw_os_error() == Some(libc::ENXIO) => {
                    if let Some(limit) = timeout {
                        if started.elapsed() >= limit {
                            return Err(ChannelError::ConnectTimeout {
                                path: path.to_path_buf(),
                                waited: started.elapsed(),
                            });
                        }
                    }
                    tokio::time::sleep(RENDEZVOUS_POLL).await;
                }
                Err(source) => {
                    return Err(ChannelError::Connect {
                        path: path.to_path_buf(),
                        source,
                    });
                }
            }
        }
    }

    /// Writes all of `buf`, retrying partial writes internally.
    pub async fn write_all(&mut self, buf: &[u8]) -> Result<()> {
        self.tx.write_all(buf).await.map_err(ChannelError::Write)
    }

    /// Path of the underlying FIFO.
    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fifo_path(dir: &tempfile::TempDir, name: &str) -> PathBuf {
        dir.path().join(name)
    }

    #[tokio::test]
    async fn test_create_open_write_read() {
        let dir = tempfile::tempdir().unwrap();
        let path = fifo_path(&dir, "chan");
        create(&path).unwrap();

        let mut reader = ChannelReader::open(&path).unwrap();
        let mut writer = ChannelWriter::connect(&path).await.unwrap();

        writer.write_all(b"exact bytes").await.unwrap();
        let mut buf = [0u8; 11];
        reader.read_exact(&mut buf).await.unwrap();
        assert_eq!(&buf, b"exact bytes");
    }

    #[tokio::test]
    async fn test_connect_waits_for_reader() {
        let dir = tempfile::tempdir().unwrap();
        let path = fifo_path(&dir, "chan");
        create(&path).unwrap();

        let connect_path = path.clone();
        let connector = tokio::spawn(async move {
            let mut w = ChannelWriter::connect(&connect_path).await.unwrap();
            w.write_all(&[0xAB]).await.unwrap();
        });

        // Attach the reader after the writer has started its rendezvous.
        tokio::time::sleep(Duration::from_millis(50)).await;
        let mut reader = ChannelReader::open(&path).unwrap();
        let mut buf = [0u8; 1];
        reader.read_exact(&mut buf).await.unwrap();
        assert_eq!(buf[0], 0xAB);
        connector.await.unwrap();
    }

    #[tokio::test]
    async fn test_connect_timeout_without_reader() {
        let dir = tempfile::tempdir().unwrap();
        let path = fifo_path(&dir, "chan");
        create(&path).unwrap();

        let err = ChannelWriter::connect_timeout(&path, Duration::from_millis(100))
            .await
            .unwrap_err();
        assert!(matches!(err, ChannelError::ConnectTimeout { .. }));
    }

    #[tokio::test]
    async fn test_eof_mid_message_is_closed_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = fifo_path(&dir, "chan");
        create(&path).unwrap();

        let mut reader = ChannelReader::open(&path).unwrap();
        let mut writer = ChannelWriter::connect(&path).await.unwrap();
        writer.write_all(&[1, 2]).await.unwrap();
        drop(writer);

        let mut buf = [0u8; 4];
        let err = reader.read_exact(&mut buf).await.unwrap_err();
        assert!(matches!(err, ChannelError::Closed));
    }

    #[test]
    fn test_create_fails_on_existing_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = fifo_path(&dir, "chan");
        create(&path).unwrap();
        assert!(matches!(
            create(&path).unwrap_err(),
            ChannelError::Create { .. }
        ));
        remove(&path).unwrap();
        create(&path).unwrap();
    }
}
