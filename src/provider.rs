//! Byte source trait for serial data

use crate::Result;

/// Trait for raw telemetry byte sources
///
/// Sources abstract over the live serial device and recorded captures. The
/// driver asks how many bytes are waiting before every read and skips the
/// read entirely when the answer is zero, so a quiet link never blocks the
/// scheduler.
#[async_trait::async_trait]
pub trait ByteSource: Send + 'static {
    /// Number of bytes that can be read without waiting
    ///
    /// Returns:
    /// - `Ok(Some(n))` - `n` bytes are waiting (possibly zero)
    /// - `Ok(None)` - the source is exhausted and will never produce more
    /// - `Err(e)` - the source failed
    async fn bytes_available(&mut self) -> Result<Option<usize>>;

    /// Read up to `buf.len()` waiting bytes, returning how many were read
    ///
    /// Only called after [`ByteSource::bytes_available`] reported data.
    async fn read_available(&mut self, buf: &mut [u8]) -> Result<usize>;

    /// Human-readable description for logs
    fn describe(&self) -> String;
}

#[async_trait::async_trait]
impl<S: ByteSource + ?Sized> ByteSource for Box<S> {
    async fn bytes_available(&mut self) -> Result<Option<usize>> {
        (**self).bytes_available().await
    }

    async fn read_available(&mut self, buf: &mut [u8]) -> Result<usize> {
        (**self).read_available(buf).await
    }

    fn describe(&self) -> String {
        (**self).describe()
    }
}
