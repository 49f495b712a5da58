use std::io;
use std::pin::Pin;
use std::task::{ready, Context, Poll};

use tokio::io::{AsyncRead, AsyncReadExt, ReadBuf, Take};

/// Error carried inside the `io::Error` returned once the limit is crossed.
#[derive(Debug, thiserror::Error)]
#[error("upload exceeds the limit of {limit} bytes")]
pub struct LimitExceeded {
    pub limit: u64,
}

/// Reader that fails as soon as more than `limit` bytes have been read.
///
/// At most `limit + 1` bytes are ever pulled from the inner reader, so an oversized
/// body is rejected without draining it. The state flags survive the error being
/// flattened by whatever consumed the reader (a storage backend, `io::copy`), so the
/// caller can tell an oversized body apart from a broken source.
pub struct SizeLimitedReader<R> {
    inner: Take<R>,
    limit: u64,
    consumed: u64,
    exceeded: bool,
    source_error: Option<(io::ErrorKind, String)>,
}

impl<R: AsyncRead + Unpin> SizeLimitedReader<R> {
    pub fn new(inner: R, limit: u64) -> Self {
        Self {
            inner: inner.take(limit.saturating_add(1)),
            limit,
            consumed: 0,
            exceeded: false,
            source_error: None,
        }
    }
}

impl<R> SizeLimitedReader<R> {
    pub fn limit(&self) -> u64 {
        self.limit
    }

    pub fn consumed(&self) -> u64 {
        self.consumed
    }

    pub fn is_exceeded(&self) -> bool {
        self.exceeded
    }

    /// Reconstruct the last error reported by the inner reader, if any.
    pub fn source_error(&self) -> Option<io::Error> {
        self.source_error
            .as_ref()
            .map(|(kind, msg)| io::Error::new(*kind, msg.clone()))
    }

    fn limit_error(&self) -> io::Error {
        io::Error::new(
            io::ErrorKind::InvalidData,
            LimitExceeded { limit: self.limit },
        )
    }
}

impl<R: AsyncRead + Unpin> AsyncRead for SizeLimitedReader<R> {
    fn poll_read(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<io::Result<()>> {
        let this = self.get_mut();
        if this.exceeded {
            return Poll::Ready(Err(this.limit_error()));
        }

        let before = buf.filled().len();
        if let Err(e) = ready!(Pin::new(&mut this.inner).poll_read(cx, buf)) {
            this.source_error = Some((e.kind(), e.to_string()));
            return Poll::Ready(Err(e));
        }

        this.consumed += (buf.filled().len() - before) as u64;
        if this.consumed > this.limit {
            // nothing may be handed out alongside an error
            buf.set_filled(before);
            this.exceeded = true;
            return Poll::Ready(Err(this.limit_error()));
        }

        Poll::Ready(Ok(()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Endless source that records how much was pulled from it.
    struct Endless {
        served: u64,
    }

    impl AsyncRead for Endless {
        fn poll_read(
            mut self: Pin<&mut Self>,
            _cx: &mut Context<'_>,
            buf: &mut ReadBuf<'_>,
        ) -> Poll<io::Result<()>> {
            let n = buf.remaining().min(4096);
            buf.put_slice(&vec![0xAB; n]);
            self.served += n as u64;
            Poll::Ready(Ok(()))
        }
    }

    #[tokio::test]
    async fn test_within_limit() {
        let mut reader = SizeLimitedReader::new(&b"hello"[..], 5);
        let mut out = Vec::new();
        reader.read_to_end(&mut out).await.unwrap();
        assert_eq!(out, b"hello");
        assert!(!reader.is_exceeded());
        assert_eq!(reader.consumed(), 5);
    }

    #[tokio::test]
    async fn test_over_limit_stops_pulling() {
        let mut source = Endless { served: 0 };
        let err = {
            let mut reader = SizeLimitedReader::new(&mut source, 10_000);
            let mut out = Vec::new();
            let err = reader.read_to_end(&mut out).await.unwrap_err();
            assert!(reader.is_exceeded());
            assert!(reader.source_error().is_none());
            err
        };

        assert_eq!(err.kind(), io::ErrorKind::InvalidData);
        assert!(err.get_ref().unwrap().is::<LimitExceeded>());
        assert!(source.served <= 10_001);
    }

    #[tokio::test]
    async fn test_crossing_read_hands_out_nothing() {
        let mut reader = SizeLimitedReader::new(&b"0123456789"[..], 3);
        let mut storage = [0u8; 16];
        let mut buf = ReadBuf::new(&mut storage);

        let result = std::future::poll_fn(|cx| Pin::new(&mut reader).poll_read(cx, &mut buf)).await;

        assert!(result.is_err());
        assert_eq!(buf.filled().len(), 0);
        assert!(reader.is_exceeded());
    }

    #[tokio::test]
    async fn test_read_to_end_keeps_earlier_reads() {
        let mut reader = SizeLimitedReader::new(&b"abcdef"[..], 4);
        let mut out = b"prefix".to_vec();
        let err = reader.read_to_end(&mut out).await.unwrap_err();
        assert!(err.get_ref().unwrap().is::<LimitExceeded>());
        assert_eq!(out, b"prefix");
    }

    #[tokio::test]
    async fn test_errors_after_exceeding_are_sticky() {
        let mut reader = SizeLimitedReader::new(&b"too long"[..], 3);
        let mut out = Vec::new();
        assert!(reader.read_to_end(&mut out).await.is_err());
        let mut buf = [0u8; 4];
        assert!(reader.read(&mut buf).await.is_err());
    }
}
