use hyper::header::{HeaderValue, CONTENT_LENGTH, TRANSFER_ENCODING};
use hyper::{body::Body, Response, StatusCode};

use crate::RgBody;

/// Set the content length header when the body size is known, otherwise leave framing to hyper.
///
/// A `Transfer-Encoding` header is dropped as soon as a `Content-Length` is present.
pub fn with_length_or_chunked(resp: &mut Response<RgBody>) {
    let status = resp.status();
    if status.is_informational() || status == StatusCode::NO_CONTENT || status == StatusCode::NOT_MODIFIED {
        return;
    }
    if let Some(len) = resp.body().size_hint().exact() {
        resp.headers_mut().insert(CONTENT_LENGTH, HeaderValue::from(len));
    }
    if resp.headers().contains_key(CONTENT_LENGTH) {
        resp.headers_mut().remove(TRANSFER_ENCODING);
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_known_length() {
        let mut resp = Response::new(RgBody::full("hello"));
        resp.headers_mut().insert(TRANSFER_ENCODING, HeaderValue::from_static("chunked"));
        with_length_or_chunked(&mut resp);
        assert_eq!(resp.headers().get(CONTENT_LENGTH).map(|v| v.as_bytes()), Some(b"5".as_slice()));
        assert!(!resp.headers().contains_key(TRANSFER_ENCODING));
    }
}
