//! Response value handed to callers on success.

use bytes::Bytes;
use http::{HeaderMap, StatusCode};
use serde::de::DeserializeOwned;

use crate::error::{ClientError, Origin};

/// A complete response: status line, headers, buffered body.
#[derive(Debug, Clone)]
pub struct Response {
    status: StatusCode,
    headers: HeaderMap,
    body: Bytes,
}

impl Response {
    pub fn new(status: StatusCode, headers: HeaderMap, body: Bytes) -> Self {
        Self {
            status,
            headers,
            body,
        }
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }

    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    pub fn body(&self) -> &Bytes {
        &self.body
    }

    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }

    /// Decode the body as JSON. A malformed body surfaces as
    /// [`Category::ProtocolError`](crate::Category::ProtocolError) with the
    /// serde error preserved in the cause chain.
    pub fn json<T: DeserializeOwned>(&self) -> crate::Result<T> {
        serde_json::from_slice(&self.body)
            .map_err(|e| ClientError::normalize(Origin::Decode, Box::new(e)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn malformed_body_is_a_protocol_error_with_cause() {
        let resp = Response::new(
            StatusCode::OK,
            HeaderMap::new(),
            Bytes::from_static(b"{not json"),
        );
        let err = resp.json::<serde_json::Value>().unwrap_err();
        assert_eq!(err.category(), crate::Category::ProtocolError);
        assert!(std::error::Error::source(&err).is_some());
    }
}
