//! Response types and conversion traits.
//!
//! Views may return anything implementing [`IntoResponse`]. [`Redirect`]
//! builds the `302 Found` and `301 Moved Permanently` responses the redirect
//! assertions look for.

use bytes::Bytes;
use http::header::{CONTENT_TYPE, HeaderValue, LOCATION};
use http::{Response, StatusCode};
use http_body_util::Full;

/// The body type used for view responses.
pub type BoxBody = Full<Bytes>;

const TEXT_PLAIN: &str = "text/plain; charset=utf-8";

/// Trait for types that can be converted into a view response.
///
/// # Examples
///
/// ```
/// use viewtest::response::{BoxBody, IntoResponse};
/// use http::Response;
///
/// struct Greeting(&'static str);
///
/// impl IntoResponse for Greeting {
///     fn into_response(self) -> Response<BoxBody> {
///         self.0.into_response()
///     }
/// }
/// ```
pub trait IntoResponse {
    fn into_response(self) -> Response<BoxBody>;
}

fn text(status: StatusCode, body: impl Into<Bytes>) -> Response<BoxBody> {
    let mut response = Response::new(Full::new(body.into()));
    *response.status_mut() = status;
    response
        .headers_mut()
        .insert(CONTENT_TYPE, HeaderValue::from_static(TEXT_PLAIN));
    response
}

impl IntoResponse for Response<BoxBody> {
    fn into_response(self) -> Response<BoxBody> {
        self
    }
}

impl IntoResponse for &'static str {
    fn into_response(self) -> Response<BoxBody> {
        text(StatusCode::OK, self)
    }
}

impl IntoResponse for String {
    fn into_response(self) -> Response<BoxBody> {
        text(StatusCode::OK, self)
    }
}

impl IntoResponse for StatusCode {
    fn into_response(self) -> Response<BoxBody> {
        let mut response = Response::new(Full::new(Bytes::new()));
        *response.status_mut() = self;
        response
    }
}

impl IntoResponse for (StatusCode, String) {
    fn into_response(self) -> Response<BoxBody> {
        text(self.0, self.1)
    }
}

impl IntoResponse for (StatusCode, &'static str) {
    fn into_response(self) -> Response<BoxBody> {
        text(self.0, self.1)
    }
}

impl<T: IntoResponse, E: IntoResponse> IntoResponse for std::result::Result<T, E> {
    fn into_response(self) -> Response<BoxBody> {
        match self {
            Ok(v) => v.into_response(),
            Err(e) => e.into_response(),
        }
    }
}

/// A redirect response.
///
/// # Examples
///
/// ```
/// use viewtest::response::{IntoResponse, Redirect};
///
/// let response = Redirect::to("/login/").into_response();
/// assert_eq!(response.status(), 302);
/// assert_eq!(response.headers().get("location").unwrap(), "/login/");
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Redirect {
    status: StatusCode,
    location: String,
}

impl Redirect {
    /// `302 Found` to `location`.
    pub fn to(location: impl Into<String>) -> Self {
        Self {
            status: StatusCode::FOUND,
            location: location.into(),
        }
    }

    /// `301 Moved Permanently` to `location`.
    pub fn permanent(location: impl Into<String>) -> Self {
        Self {
            status: StatusCode::MOVED_PERMANENTLY,
            location: location.into(),
        }
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }

    pub fn location(&self) -> &str {
        &self.location
    }
}

impl IntoResponse for Redirect {
    fn into_response(self) -> Response<BoxBody> {
        match HeaderValue::from_str(&self.location) {
            Ok(location) => {
                let mut response = self.status.into_response();
                response.headers_mut().insert(LOCATION, location);
                response
            }
            Err(_) => {
                tracing::warn!(location = %self.location, "redirect target is not a valid header value");
                text(
                    StatusCode::INTERNAL_SERVER_ERROR,
                    format!("invalid redirect location: {:?}", self.location),
                )
            }
        }
    }
}
