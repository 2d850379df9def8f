//! Response body that keeps a dispatch open until it is fully sent.

use axum::body::{Body, Bytes};
use http_body::{Body as HttpBody, Frame, SizeHint};
use std::pin::Pin;
use std::task::{Context, Poll};

use crate::load_balancer::DispatchGuard;

/// Wraps a proxied response body and owns the request's [`DispatchGuard`].
///
/// The guard is finished with `success` once the last frame has been
/// produced. A stream error finishes it as a failure. Dropping the body
/// early (client went away) drops the guard without an outcome, which is
/// also a failure.
pub struct TrackedBody {
    inner: Body,
    guard: Option<DispatchGuard>,
    success: bool,
}

impl TrackedBody {
    pub fn new(inner: Body, guard: DispatchGuard, success: bool) -> Self {
        let mut body = Self {
            inner,
            guard: Some(guard),
            success,
        };
        // Empty bodies are never polled.
        if body.inner.is_end_stream() {
            body.complete(success);
        }
        body
    }

    fn complete(&mut self, success: bool) {
        if let Some(guard) = self.guard.take() {
            guard.finish(success);
        }
    }
}

impl HttpBody for TrackedBody {
    type Data = Bytes;
    type Error = axum::Error;

    fn poll_frame(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
    ) -> Poll<Option<Result<Frame<Self::Data>, Self::Error>>> {
        let this = self.get_mut();
        let polled = Pin::new(&mut this.inner).poll_frame(cx);

        match &polled {
            Poll::Ready(Some(Ok(_))) if this.inner.is_end_stream() => this.complete(this.success),
            Poll::Ready(None) => this.complete(this.success),
            Poll::Ready(Some(Err(e))) => {
                if let Some(guard) = &this.guard {
                    tracing::warn!(server = %guard.id, error = %e, "Response body failed mid-stream");
                }
                this.complete(false);
            }
            _ => {}
        }
        polled
    }

    fn is_end_stream(&self) -> bool {
        self.inner.is_end_stream()
    }

    fn size_hint(&self) -> SizeHint {
        self.inner.size_hint()
    }
}
