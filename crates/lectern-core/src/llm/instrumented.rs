//! Stream wrapper that keeps a tracing span entered while it is polled.
//!
//! Without this, the span created around a streaming call would close as
//! soon as the stream was returned, long before the reply finished.

use std::pin::Pin;
use std::task::{Context, Poll};

use futures_util::Stream;
use pin_project_lite::pin_project;

pin_project! {
    pub struct InstrumentedStream<S> {
        #[pin]
        inner: S,
        span: tracing::Span,
    }
}

impl<S> InstrumentedStream<S> {
    pub fn new(inner: S, span: tracing::Span) -> Self {
        Self { inner, span }
    }
}

impl<S: Stream> Stream for InstrumentedStream<S> {
    type Item = S::Item;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let this = self.project();
        let _enter = this.span.enter();
        this.inner.poll_next(cx)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.inner.size_hint()
    }
}
