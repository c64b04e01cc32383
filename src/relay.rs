//! Streaming relay of upstream response bodies
//!
//! [`RelayBody`] reads the upstream body into one pooled buffer and hands
//! each chunk to hyper as its own data frame. hyper writes every frame to the
//! client socket as soon as it is produced, which gives the same effect as a
//! write followed by a flush per chunk: partial output (e.g. token streams)
//! reaches the client immediately.

use crate::buffer_pool::PooledBuffer;
use bytes::Bytes;
use futures::TryStreamExt;
use http_body_util::BodyExt;
use hyper::body::{Body, Frame, SizeHint};
use log::{debug, error};
use std::io;
use std::pin::Pin;
use std::task::{Context, Poll};
use tokio::io::{AsyncRead, ReadBuf};
use tokio_util::io::StreamReader;

pub struct RelayBody {
    reader: Pin<Box<dyn AsyncRead + Send>>,
    buf: PooledBuffer,
    target: String,
    upstream_hint: SizeHint,
    bytes_relayed: u64,
    finished: bool,
}

impl RelayBody {
    /// Wraps `upstream`, holding `buf` until the relay is dropped.
    pub fn new<B>(upstream: B, buf: PooledBuffer, target: String) -> Self
    where
        B: Body<Data = Bytes> + Send + 'static,
        B::Error: Into<Box<dyn std::error::Error + Send + Sync>>,
    {
        let upstream_hint = upstream.size_hint();
        let stream = TryStreamExt::map_err(upstream.into_data_stream(), io::Error::other);

        Self {
            reader: Box::pin(StreamReader::new(stream)),
            buf,
            target,
            upstream_hint,
            bytes_relayed: 0,
            finished: false,
        }
    }

    pub fn bytes_relayed(&self) -> u64 {
        self.bytes_relayed
    }
}

impl Body for RelayBody {
    type Data = Bytes;
    type Error = io::Error;

    fn poll_frame(
        mut self: Pin<&mut Self>,
        cx: &mut Context<'_>,
    ) -> Poll<Option<Result<Frame<Self::Data>, Self::Error>>> {
        let this = &mut *self;
        if this.finished {
            return Poll::Ready(None);
        }

        let mut read_buf = ReadBuf::new(&mut this.buf[..]);
        match this.reader.as_mut().poll_read(cx, &mut read_buf) {
            Poll::Pending => Poll::Pending,
            Poll::Ready(Ok(())) => {
                let chunk = read_buf.filled();
                if chunk.is_empty() {
                    this.finished = true;
                    debug!(
                        "Relayed {} bytes from [{}]",
                        this.bytes_relayed, this.target
                    );
                    return Poll::Ready(None);
                }

                let chunk = Bytes::copy_from_slice(chunk);
                this.bytes_relayed += chunk.len() as u64;
                Poll::Ready(Some(Ok(Frame::data(chunk))))
            }
            Poll::Ready(Err(e)) => {
                // Status and headers are already on the wire; returning the
                // error makes hyper abort the connection.
                this.finished = true;
                error!("Error reading response body from [{}]: {}", this.target, e);
                Poll::Ready(Some(Err(e)))
            }
        }
    }

    fn is_end_stream(&self) -> bool {
        self.finished
    }

    fn size_hint(&self) -> SizeHint {
        match self.upstream_hint.exact() {
            Some(total) => SizeHint::with_exact(total.saturating_sub(self.bytes_relayed)),
            None => SizeHint::default(),
        }
    }
}

impl Drop for RelayBody {
    fn drop(&mut self) {
        if !self.finished {
            debug!(
                "Response relay for [{}] dropped after {} bytes, client went away",
                self.target, self.bytes_relayed
            );
        }
    }
}
