//! Error types for request construction and response assertions.
//!
//! Building a request can fail when a middleware refuses to be constructed,
//! when a pre-processor rejects the request, or when the per-call request
//! parameters cannot be turned into a valid `http::Request`. All of these are
//! reported through [`Error`] and propagate unchanged to the test.
//!
//! Redirect assertions report through [`AssertionError`], which the panicking
//! `assert_*` helpers turn into a test failure message.

use std::fmt;

use http::StatusCode;

/// Result alias used throughout the crate.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors raised while building a simulated request.
#[derive(Debug)]
pub enum Error {
    /// A middleware constructor failed.
    Construct {
        /// Name of the middleware class.
        middleware: String,
        /// Reason reported by the constructor.
        message: String,
    },
    /// A pre-processor rejected the request.
    Middleware {
        /// Name of the middleware class.
        middleware: String,
        /// Reason reported by the pre-processor.
        message: String,
    },
    /// A header name or value passed to the builder is not valid HTTP.
    InvalidHeader { name: String, reason: String },
    /// The assembled request is not a valid `http::Request`.
    InvalidRequest(String),
    /// Query, form or JSON data could not be serialized.
    Serialize(String),
}

impl Error {
    /// Creates an error for a pre-processor that rejected the request.
    ///
    /// The middleware name is filled in by the factory when it is empty.
    pub fn middleware(message: impl Into<String>) -> Self {
        Self::Middleware {
            middleware: String::new(),
            message: message.into(),
        }
    }

    /// Creates an error for a middleware constructor that failed.
    pub fn construct(message: impl Into<String>) -> Self {
        Self::Construct {
            middleware: String::new(),
            message: message.into(),
        }
    }

    /// Attaches the middleware class name if the error does not carry one yet.
    pub(crate) fn in_middleware(mut self, name: &str) -> Self {
        match &mut self {
            Error::Construct { middleware, .. } | Error::Middleware { middleware, .. }
                if middleware.is_empty() =>
            {
                *middleware = name.to_string();
            }
            _ => {}
        }
        self
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::Construct {
                middleware,
                message,
            } => write!(f, "failed to construct middleware '{}': {}", middleware, message),
            Error::Middleware {
                middleware,
                message,
            } => write!(f, "middleware '{}' rejected request: {}", middleware, message),
            Error::InvalidHeader { name, reason } => {
                write!(f, "invalid header '{}': {}", name, reason)
            }
            Error::InvalidRequest(reason) => write!(f, "invalid request: {}", reason),
            Error::Serialize(reason) => write!(f, "failed to serialize request data: {}", reason),
        }
    }
}

impl std::error::Error for Error {}

impl From<http::Error> for Error {
    fn from(err: http::Error) -> Self {
        Error::InvalidRequest(err.to_string())
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::Serialize(err.to_string())
    }
}

impl From<serde_urlencoded::ser::Error> for Error {
    fn from(err: serde_urlencoded::ser::Error) -> Self {
        Error::Serialize(err.to_string())
    }
}

/// A failed redirect assertion.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AssertionError {
    /// The response status is not one of the redirect codes.
    NotRedirect {
        status: StatusCode,
        expected: Vec<StatusCode>,
    },
    /// The response status is a redirect code but should not be.
    UnexpectedRedirect {
        status: StatusCode,
        location: Option<String>,
    },
    /// The `Location` header does not match the expected URL exactly.
    LocationMismatch {
        expected: String,
        actual: Option<String>,
    },
}

impl fmt::Display for AssertionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AssertionError::NotRedirect { status, expected } => {
                let codes: Vec<String> = expected.iter().map(|c| c.as_u16().to_string()).collect();
                write!(
                    f,
                    "expected a redirect, got status {} (redirect codes: [{}])",
                    status.as_u16(),
                    codes.join(", ")
                )
            }
            AssertionError::UnexpectedRedirect { status, location } => match location {
                Some(location) => write!(
                    f,
                    "unexpected redirect with status {} to '{}'",
                    status.as_u16(),
                    location
                ),
                None => write!(f, "unexpected redirect with status {}", status.as_u16()),
            },
            AssertionError::LocationMismatch { expected, actual } => match actual {
                Some(actual) => write!(
                    f,
                    "redirect location mismatch: expected '{}', got '{}'",
                    expected, actual
                ),
                None => write!(
                    f,
                    "redirect location mismatch: expected '{}', response has no Location header",
                    expected
                ),
            },
        }
    }
}

impl std::error::Error for AssertionError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_middleware_error_display() {
        let err = Error::middleware("session store unavailable").in_middleware("SessionMiddleware");
        assert_eq!(
            err.to_string(),
            "middleware 'SessionMiddleware' rejected request: session store unavailable"
        );
    }

    #[test]
    fn test_in_middleware_keeps_existing_name() {
        let err = Error::Construct {
            middleware: "Inner".to_string(),
            message: "missing argument".to_string(),
        }
        .in_middleware("Outer");

        match err {
            Error::Construct { middleware, .. } => assert_eq!(middleware, "Inner"),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_in_middleware_ignores_other_variants() {
        let err = Error::InvalidRequest("bad uri".to_string()).in_middleware("Any");
        assert_eq!(err.to_string(), "invalid request: bad uri");
    }

    #[test]
    fn test_not_redirect_display() {
        let err = AssertionError::NotRedirect {
            status: StatusCode::OK,
            expected: vec![StatusCode::FOUND, StatusCode::MOVED_PERMANENTLY],
        };
        assert_eq!(
            err.to_string(),
            "expected a redirect, got status 200 (redirect codes: [302, 301])"
        );
    }

    #[test]
    fn test_location_mismatch_display() {
        let err = AssertionError::LocationMismatch {
            expected: "/login/".to_string(),
            actual: Some("/login".to_string()),
        };
        assert_eq!(
            err.to_string(),
            "redirect location mismatch: expected '/login/', got '/login'"
        );

        let err = AssertionError::LocationMismatch {
            expected: "/login/".to_string(),
            actual: None,
        };
        assert!(err.to_string().contains("no Location header"));
    }

    #[test]
    fn test_unexpected_redirect_display() {
        let err = AssertionError::UnexpectedRedirect {
            status: StatusCode::MOVED_PERMANENTLY,
            location: Some("/next/".to_string()),
        };
        assert_eq!(err.to_string(), "unexpected redirect with status 301 to '/next/'");
    }
}
