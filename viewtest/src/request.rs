//! Simulated request type and the attributes injected into it.
//!
//! A simulated request is a plain `http::Request<Bytes>`. Everything the
//! factory and the middleware attach to it lives in the request's
//! [`Extensions`](http::Extensions): the test user, connection information,
//! a per-request context, and whatever typed values pre-processors insert.
//! [`RequestExt`] gives typed access to the attributes the factory manages.

use std::any::Any;
use std::collections::HashMap;
use std::fmt;
use std::net::IpAddr;
use std::sync::Arc;
use std::time::Instant;

use bytes::Bytes;
use http::uri::Scheme;

/// The request type handed to views and pre-processors.
pub type ViewRequest = http::Request<Bytes>;

/// Path parameters passed to a view alongside the request.
pub type PathParams = HashMap<String, String>;

/// Builds path params from key-value pairs.
pub fn params(pairs: &[(&str, &str)]) -> PathParams {
    pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect()
}

/// The user attached to a request.
///
/// Holds any test-supplied value, or nothing for an anonymous request.
#[derive(Clone, Default)]
pub struct RequestUser(Option<Arc<dyn Any + Send + Sync>>);

impl RequestUser {
    /// A request without a user.
    pub fn anonymous() -> Self {
        Self(None)
    }

    pub fn new<U: Send + Sync + 'static>(user: U) -> Self {
        Self(Some(Arc::new(user)))
    }

    /// Returns the user if one is set and it has type `U`.
    pub fn get<U: Send + Sync + 'static>(&self) -> Option<&U> {
        self.0.as_ref().and_then(|user| user.downcast_ref::<U>())
    }

    pub fn is_set(&self) -> bool {
        self.0.is_some()
    }
}

impl fmt::Debug for RequestUser {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.0 {
            Some(_) => f.write_str("RequestUser(<set>)"),
            None => f.write_str("RequestUser(None)"),
        }
    }
}

/// Connection details of the simulated client.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectionInfo {
    pub scheme: Scheme,
    pub remote_addr: IpAddr,
}

impl ConnectionInfo {
    pub fn is_secure(&self) -> bool {
        self.scheme == Scheme::HTTPS
    }
}

/// Per-request context carrying a trace id and the construction time.
#[derive(Debug, Clone)]
pub struct RequestContext {
    pub trace_id: String,
    pub created_at: Instant,
}

impl RequestContext {
    pub fn new() -> Self {
        Self::with_trace_id(uuid::Uuid::new_v4().to_string())
    }

    pub fn with_trace_id(trace_id: impl Into<String>) -> Self {
        Self {
            trace_id: trace_id.into(),
            created_at: Instant::now(),
        }
    }

    /// Time elapsed since the request was built.
    pub fn elapsed(&self) -> std::time::Duration {
        self.created_at.elapsed()
    }
}

impl Default for RequestContext {
    fn default() -> Self {
        Self::new()
    }
}

/// Typed access to the attributes the factory injects into a request.
pub trait RequestExt {
    /// Returns the request user if one is set and it has type `U`.
    fn user<U: Send + Sync + 'static>(&self) -> Option<&U>;

    /// Returns `true` when a user of any type is attached.
    fn has_user(&self) -> bool;

    /// Replaces the request user.
    fn set_user(&mut self, user: RequestUser);

    fn connection_info(&self) -> Option<&ConnectionInfo>;

    fn context(&self) -> Option<&RequestContext>;

    /// Returns `true` when the request was built with the `https` scheme.
    fn is_secure(&self) -> bool {
        self.connection_info().is_some_and(ConnectionInfo::is_secure)
    }

    /// Rebuilds the absolute URI from scheme, `Host` header and path.
    fn build_absolute_uri(&self) -> String;
}

impl<B> RequestExt for http::Request<B> {
    fn user<U: Send + Sync + 'static>(&self) -> Option<&U> {
        self.extensions()
            .get::<RequestUser>()
            .and_then(|user| user.get::<U>())
    }

    fn has_user(&self) -> bool {
        self.extensions()
            .get::<RequestUser>()
            .is_some_and(RequestUser::is_set)
    }

    fn set_user(&mut self, user: RequestUser) {
        self.extensions_mut().insert(user);
    }

    fn connection_info(&self) -> Option<&ConnectionInfo> {
        self.extensions().get::<ConnectionInfo>()
    }

    fn context(&self) -> Option<&RequestContext> {
        self.extensions().get::<RequestContext>()
    }

    fn build_absolute_uri(&self) -> String {
        let scheme = self
            .connection_info()
            .map(|info| info.scheme.as_str())
            .unwrap_or("http");
        let host = self
            .headers()
            .get(http::header::HOST)
            .and_then(|v| v.to_str().ok())
            .unwrap_or("");
        let path = self
            .uri()
            .path_and_query()
            .map(|pq| pq.as_str())
            .unwrap_or("/");

        format!("{}://{}{}", scheme, host, path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, PartialEq)]
    struct Member {
        name: String,
    }

    #[test]
    fn test_params_helper() {
        let p = params(&[("slug", "intro"), ("page", "2")]);
        assert_eq!(p.get("slug"), Some(&"intro".to_string()));
        assert_eq!(p.get("page"), Some(&"2".to_string()));
        assert_eq!(p.len(), 2);
    }

    #[test]
    fn test_anonymous_user() {
        let user = RequestUser::anonymous();
        assert!(!user.is_set());
        assert!(user.get::<Member>().is_none());
    }

    #[test]
    fn test_user_downcast() {
        let user = RequestUser::new(Member {
            name: "ada".to_string(),
        });
        assert!(user.is_set());
        assert_eq!(user.get::<Member>().unwrap().name, "ada");
        assert!(user.get::<String>().is_none());
    }

    #[test]
    fn test_request_ext_user() {
        let mut request = http::Request::new(Bytes::new());
        assert!(!request.has_user());

        request.set_user(RequestUser::new("grace".to_string()));
        assert!(request.has_user());
        assert_eq!(request.user::<String>(), Some(&"grace".to_string()));

        request.set_user(RequestUser::anonymous());
        assert!(!request.has_user());
    }

    #[test]
    fn test_context_generates_unique_trace_ids() {
        let a = RequestContext::new();
        let b = RequestContext::new();
        assert_eq!(a.trace_id.len(), 36);
        assert_ne!(a.trace_id, b.trace_id);
    }

    #[test]
    fn test_build_absolute_uri() {
        let mut request = http::Request::builder()
            .uri("/search/?q=rust")
            .header("host", "testserver")
            .body(Bytes::new())
            .unwrap();
        request.extensions_mut().insert(ConnectionInfo {
            scheme: Scheme::HTTPS,
            remote_addr: IpAddr::from([127, 0, 0, 1]),
        });

        assert!(request.is_secure());
        assert_eq!(
            request.build_absolute_uri(),
            "https://testserver/search/?q=rust"
        );
    }

    #[test]
    fn test_user_debug_hides_value() {
        let user = RequestUser::new("secret".to_string());
        assert_eq!(format!("{:?}", user), "RequestUser(<set>)");
    }
}
