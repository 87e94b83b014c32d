use std::{
    pin::Pin,
    task::{Context, Poll},
};

use bytes::Bytes;
use http_body_util::{combinators::BoxBody, BodyExt, Empty, Full};
use hyper::body::{Body, Frame, SizeHint};

use crate::BoxError;

/// The body type that flows through the gateway, inbound and outbound.
#[derive(Debug)]
pub struct RgBody {
    body: BoxBody<Bytes, BoxError>,
}

impl Default for RgBody {
    fn default() -> Self {
        Self::empty()
    }
}

impl RgBody {
    pub fn new<B>(body: B) -> Self
    where
        B: Body<Data = Bytes> + Send + Sync + 'static,
        B::Error: Into<BoxError>,
    {
        Self {
            body: body.map_err(Into::into).boxed(),
        }
    }
    pub fn empty() -> Self {
        Self {
            body: Empty::new().map_err(|never| match never {}).boxed(),
        }
    }
    pub fn full(data: impl Into<Bytes>) -> Self {
        Self {
            body: Full::new(data.into()).map_err(|never| match never {}).boxed(),
        }
    }
    /// Read the whole body into memory.
    ///
    /// # Errors
    /// If the underlying stream fails.
    pub async fn collect_bytes(self) -> Result<Bytes, BoxError> {
        Ok(self.body.collect().await?.to_bytes())
    }
}

impl Body for RgBody {
    type Data = Bytes;
    type Error = BoxError;

    #[inline]
    fn poll_frame(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Result<Frame<Self::Data>, Self::Error>>> {
        Pin::new(&mut self.body).poll_frame(cx)
    }

    fn is_end_stream(&self) -> bool {
        self.body.is_end_stream()
    }

    fn size_hint(&self) -> SizeHint {
        self.body.size_hint()
    }
}
