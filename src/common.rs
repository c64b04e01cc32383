use crate::error::ProxyError;
use bytes::Bytes;
use http_body_util::combinators::UnsyncBoxBody;
use http_body_util::{BodyExt, Full};
use hyper::{Response, StatusCode};

/// Body type of every response the proxy writes: either a fixed message or
/// a relayed upstream stream.
pub type ProxyBody = UnsyncBoxBody<Bytes, std::io::Error>;

/// Wraps fixed content in a [`ProxyBody`].
pub fn full<T: Into<Bytes>>(content: T) -> ProxyBody {
    Full::new(content.into())
        .map_err(|never| match never {})
        .boxed_unsync()
}

/// Common response builder utilities to eliminate code duplication
pub struct ResponseBuilder;

impl ResponseBuilder {
    /// Creates a plain-text response with a custom status and message
    pub fn error(status: StatusCode, message: &str) -> Response<ProxyBody> {
        let mut response = Response::new(full(format!("{}\n", message)));
        *response.status_mut() = status;
        response.headers_mut().insert(
            hyper::header::CONTENT_TYPE,
            hyper::header::HeaderValue::from_static("text/plain; charset=utf-8"),
        );
        response.headers_mut().insert(
            hyper::header::X_CONTENT_TYPE_OPTIONS,
            hyper::header::HeaderValue::from_static("nosniff"),
        );
        response
    }

    /// Creates the response that ends a request failing with `err`
    pub fn from_error(err: &ProxyError) -> Response<ProxyBody> {
        Self::error(err.status_code(), &err.client_message())
    }

    /// Creates a standard internal server error response
    pub fn internal_server_error() -> Response<ProxyBody> {
        Self::error(StatusCode::INTERNAL_SERVER_ERROR, "Internal Server Error")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_error_response_shape() {
        let response = ResponseBuilder::from_error(&ProxyError::FeatureDisabled);
        assert_eq!(response.status(), StatusCode::FORBIDDEN);
        assert_eq!(
            response.headers().get(hyper::header::CONTENT_TYPE).unwrap(),
            "text/plain; charset=utf-8"
        );

        let body = response.into_body().collect().await.unwrap().to_bytes();
        assert_eq!(&body[..], b"The any site proxy function is disabled.\n");
    }

    #[tokio::test]
    async fn test_internal_server_error() {
        let response = ResponseBuilder::internal_server_error();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);

        let body = response.into_body().collect().await.unwrap().to_bytes();
        assert_eq!(&body[..], b"Internal Server Error\n");
    }
}
