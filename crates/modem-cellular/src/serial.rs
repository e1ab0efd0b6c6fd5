//! Serial port transport pipe
//!
//! [`SerialPipe`] implements [`ModemPipe`] over a tokio_serial stream. Opens
//! and closes run on spawned tasks and report back through the attached
//! [`PipeListener`]. The byte stream itself is exposed through
//! [`transmit`](SerialPipe::transmit) and [`receive`](SerialPipe::receive)
//! for whichever chat or multiplexing engine currently owns the pipe.

use std::fmt;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::runtime::Handle;
use tokio_serial::{SerialPortBuilderExt, SerialStream};
use tracing::{debug, info, warn};

use crate::error::PipeError;
use crate::pipe::{ModemPipe, PipeEvent, PipeListener};

struct SerialInner {
    port: String,
    baud_rate: u32,
    listener: Mutex<Option<PipeListener>>,
    stream: tokio::sync::Mutex<Option<SerialStream>>,
}

impl SerialInner {
    fn notify(&self, event: PipeEvent) {
        let listener = self
            .listener
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone();
        if let Some(listener) = listener {
            listener.notify(event);
        }
    }

    async fn open(&self) -> Result<(), PipeError> {
        let mut stream = self.stream.lock().await;
        if stream.is_some() {
            return Err(PipeError::Busy(self.port.clone()));
        }

        let opened = tokio_serial::new(&self.port, self.baud_rate)
            .timeout(Duration::from_millis(100))
            .open_native_async()
            .map_err(|source| PipeError::Open {
                port: self.port.clone(),
                source,
            })?;
        *stream = Some(opened);
        drop(stream);

        info!("opened {} at {} baud", self.port, self.baud_rate);
        self.notify(PipeEvent::Opened);
        Ok(())
    }

    async fn close(&self) {
        let closed = self.stream.lock().await.take();
        if closed.is_some() {
            info!("closed {}", self.port);
            self.notify(PipeEvent::Closed);
        }
    }
}

/// Transport pipe backed by a serial port
#[derive(Clone)]
pub struct SerialPipe {
    inner: Arc<SerialInner>,
}

impl SerialPipe {
    /// Create a closed pipe for `port`
    pub fn new(port: impl Into<String>, baud_rate: u32) -> Self {
        Self {
            inner: Arc::new(SerialInner {
                port: port.into(),
                baud_rate,
                listener: Mutex::new(None),
                stream: tokio::sync::Mutex::new(None),
            }),
        }
    }

    /// Device path
    pub fn port(&self) -> &str {
        &self.inner.port
    }

    /// Baud rate
    pub fn baud_rate(&self) -> u32 {
        self.inner.baud_rate
    }

    /// Open the port and wait for the result
    pub async fn open(&self) -> Result<(), PipeError> {
        self.inner.open().await
    }

    /// Close the port and wait until it is released
    pub async fn close(&self) {
        self.inner.close().await
    }

    /// Whether the port is currently open
    pub async fn is_open(&self) -> bool {
        self.inner.stream.lock().await.is_some()
    }

    /// Write all of `data`
    pub async fn transmit(&self, data: &[u8]) -> Result<usize, PipeError> {
        let mut stream = self.inner.stream.lock().await;
        let stream = stream
            .as_mut()
            .ok_or_else(|| PipeError::NotOpen(self.inner.port.clone()))?;
        stream.write_all(data).await?;
        stream.flush().await?;
        debug!("transmitted {} bytes on {}", data.len(), self.inner.port);
        Ok(data.len())
    }

    /// Read whatever is available, waiting at most `timeout`
    ///
    /// Returns `Ok(0)` when nothing arrived in time.
    pub async fn receive(&self, buf: &mut [u8], timeout: Duration) -> Result<usize, PipeError> {
        let mut stream = self.inner.stream.lock().await;
        let stream = stream
            .as_mut()
            .ok_or_else(|| PipeError::NotOpen(self.inner.port.clone()))?;
        match tokio::time::timeout(timeout, stream.read(buf)).await {
            Ok(Ok(n)) => Ok(n),
            Ok(Err(e)) if e.kind() == std::io::ErrorKind::TimedOut => Ok(0),
            Ok(Err(e)) => Err(e.into()),
            Err(_) => Ok(0),
        }
    }

    fn spawn<F>(&self, what: &str, task: F) -> Result<(), PipeError>
    where
        F: std::future::Future<Output = ()> + Send + 'static,
    {
        let handle = Handle::try_current().map_err(|e| {
            PipeError::Io(std::io::Error::other(format!(
                "cannot {} {}: {}",
                what, self.inner.port, e
            )))
        })?;
        handle.spawn(task);
        Ok(())
    }
}

impl fmt::Debug for SerialPipe {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SerialPipe")
            .field("port", &self.inner.port)
            .field("baud_rate", &self.inner.baud_rate)
            .finish()
    }
}

impl ModemPipe for SerialPipe {
    fn name(&self) -> &str {
        &self.inner.port
    }

    fn attach(&self, listener: PipeListener) {
        *self
            .inner
            .listener
            .lock()
            .unwrap_or_else(PoisonError::into_inner) = Some(listener);
    }

    fn release(&self) {
        self.inner
            .listener
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
    }

    fn open_async(&self) -> Result<(), PipeError> {
        let inner = Arc::clone(&self.inner);
        self.spawn("open", async move {
            if let Err(e) = inner.open().await {
                warn!("{}", e);
            }
        })
    }

    fn close_async(&self) -> Result<(), PipeError> {
        let inner = Arc::clone(&self.inner);
        self.spawn("close", async move { inner.close().await })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::ModemEvent;
    use crate::queue::EventQueue;

    const MISSING_PORT: &str = "/dev/modemctl-test-no-such-port";

    #[tokio::test]
    async fn test_open_missing_port_fails() {
        let pipe = SerialPipe::new(MISSING_PORT, 115_200);
        let err = pipe.open().await.unwrap_err();
        assert!(matches!(err, PipeError::Open { .. }));
        assert!(!pipe.is_open().await);
    }

    #[tokio::test]
    async fn test_open_async_failure_posts_nothing() {
        let queue = EventQueue::default();
        let pipe = SerialPipe::new(MISSING_PORT, 115_200);
        pipe.attach(PipeListener::bus(queue.sender()));

        pipe.open_async().unwrap();
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert!(!queue.drain().contains(&ModemEvent::BusOpened));
    }

    #[tokio::test]
    async fn test_io_requires_open_port() {
        let pipe = SerialPipe::new(MISSING_PORT, 9600);
        assert!(matches!(
            pipe.transmit(b"AT\r").await,
            Err(PipeError::NotOpen(_))
        ));
        let mut buf = [0u8; 16];
        assert!(matches!(
            pipe.receive(&mut buf, Duration::from_millis(10)).await,
            Err(PipeError::NotOpen(_))
        ));
    }

    #[tokio::test]
    async fn test_close_when_closed_is_silent() {
        let queue = EventQueue::default();
        let pipe = SerialPipe::new(MISSING_PORT, 9600);
        pipe.attach(PipeListener::bus(queue.sender()));
        pipe.close().await;
        assert!(queue.is_empty());
    }

    #[test]
    fn test_open_async_outside_runtime_is_an_error() {
        let pipe = SerialPipe::new(MISSING_PORT, 9600);
        assert!(matches!(pipe.open_async(), Err(PipeError::Io(_))));
    }
}
