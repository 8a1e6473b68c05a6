//! Request construction with simulated middleware pre-processing.
//!
//! [`RequestFactory`] builds a [`ViewRequest`] for each HTTP verb. After the
//! base request is assembled the factory attaches the test user and runs the
//! pre-processors of its fixed middleware list followed by the per-call
//! middleware list, in order. Each middleware is constructed fresh for every
//! request.
//!
//! # Examples
//!
//! ```
//! use viewtest::prelude::*;
//!
//! #[derive(Debug, PartialEq)]
//! struct Member(&'static str);
//!
//! let factory = RequestFactory::new([MiddlewareClass::of::<SessionMiddleware>()]);
//! let request = factory
//!     .post("/comments/")
//!     .user(Member("ada"))
//!     .form(&[("body", "nice post")])
//!     .build()
//!     .unwrap();
//!
//! assert_eq!(request.method(), Method::POST);
//! assert_eq!(request.user::<Member>(), Some(&Member("ada")));
//! assert!(request.extensions().get::<Session>().is_some());
//! ```

use bytes::Bytes;
use http::header::{CONTENT_TYPE, HOST, HeaderMap, HeaderName, HeaderValue};
use http::uri::Scheme;
use http::{Method, Request};
use serde::Serialize;

use crate::config::FactoryDefaults;
use crate::error::{Error, Result};
use crate::middleware::MiddlewareClass;
use crate::request::{ConnectionInfo, RequestContext, RequestUser, ViewRequest};

/// Constructor used by a test case to build its factory.
pub type FactoryClass = fn(Vec<MiddlewareClass>) -> RequestFactory;

/// Builds simulated requests for views under test.
#[derive(Debug, Clone, Default)]
pub struct RequestFactory {
    middleware_classes: Vec<MiddlewareClass>,
    defaults: FactoryDefaults,
}

impl RequestFactory {
    /// Creates a factory whose middleware runs for every request.
    pub fn new<I>(middleware_classes: I) -> Self
    where
        I: IntoIterator<Item = MiddlewareClass>,
    {
        Self::with_defaults(middleware_classes, FactoryDefaults::default())
    }

    /// Creates a factory with a custom server environment.
    pub fn with_defaults<I>(middleware_classes: I, defaults: FactoryDefaults) -> Self
    where
        I: IntoIterator<Item = MiddlewareClass>,
    {
        Self {
            middleware_classes: middleware_classes.into_iter().collect(),
            defaults,
        }
    }

    /// The fixed middleware list.
    pub fn middleware_classes(&self) -> &[MiddlewareClass] {
        &self.middleware_classes
    }

    pub fn defaults(&self) -> &FactoryDefaults {
        &self.defaults
    }

    /// Starts a GET request.
    pub fn get(&self, path: &str) -> RequestBuilder<'_> {
        self.request(Method::GET, path)
    }

    /// Starts a POST request.
    pub fn post(&self, path: &str) -> RequestBuilder<'_> {
        self.request(Method::POST, path)
    }

    /// Starts a HEAD request.
    pub fn head(&self, path: &str) -> RequestBuilder<'_> {
        self.request(Method::HEAD, path)
    }

    /// Starts a DELETE request.
    pub fn delete(&self, path: &str) -> RequestBuilder<'_> {
        self.request(Method::DELETE, path)
    }

    /// Starts an OPTIONS request.
    pub fn options(&self, path: &str) -> RequestBuilder<'_> {
        self.request(Method::OPTIONS, path)
    }

    /// Starts a PUT request.
    pub fn put(&self, path: &str) -> RequestBuilder<'_> {
        self.request(Method::PUT, path)
    }

    /// Starts a request with an arbitrary method.
    pub fn request(&self, method: Method, path: &str) -> RequestBuilder<'_> {
        RequestBuilder::new(self, method, path)
    }
}

/// Builder for a single simulated request.
///
/// Invalid parameters are recorded and reported by [`build`](Self::build),
/// so the builder methods can be chained freely.
pub struct RequestBuilder<'a> {
    factory: &'a RequestFactory,
    method: Method,
    path: String,
    query: Option<String>,
    headers: HeaderMap,
    body: Bytes,
    user: RequestUser,
    secure: bool,
    middleware_classes: Vec<MiddlewareClass>,
    error: Option<Error>,
}

impl<'a> RequestBuilder<'a> {
    fn new(factory: &'a RequestFactory, method: Method, path: &str) -> Self {
        Self {
            factory,
            method,
            path: path.to_string(),
            query: None,
            headers: HeaderMap::new(),
            body: Bytes::new(),
            user: RequestUser::anonymous(),
            secure: false,
            middleware_classes: Vec::new(),
            error: None,
        }
    }

    fn fail(&mut self, err: Error) {
        if self.error.is_none() {
            self.error = Some(err);
        }
    }

    /// Attaches a user to the request.
    pub fn user<U: Send + Sync + 'static>(mut self, user: U) -> Self {
        self.user = RequestUser::new(user);
        self
    }

    /// Adds a middleware that runs after the factory's fixed list.
    pub fn middleware(mut self, class: MiddlewareClass) -> Self {
        self.middleware_classes.push(class);
        self
    }

    /// Adds several per-call middleware, preserving their order.
    pub fn middleware_classes<I>(mut self, classes: I) -> Self
    where
        I: IntoIterator<Item = MiddlewareClass>,
    {
        self.middleware_classes.extend(classes);
        self
    }

    /// Adds a header, replacing any default with the same name.
    pub fn header(mut self, name: &str, value: &str) -> Self {
        let name_parsed = HeaderName::from_bytes(name.as_bytes());
        let value_parsed = HeaderValue::from_str(value);

        match (name_parsed, value_parsed) {
            (Ok(name), Ok(value)) => {
                self.headers.insert(name, value);
            }
            (Err(e), _) => self.fail(Error::InvalidHeader {
                name: name.to_string(),
                reason: e.to_string(),
            }),
            (_, Err(e)) => self.fail(Error::InvalidHeader {
                name: name.to_string(),
                reason: e.to_string(),
            }),
        }
        self
    }

    /// Sets the `Content-Type` header.
    pub fn content_type(self, content_type: &str) -> Self {
        self.header(CONTENT_TYPE.as_str(), content_type)
    }

    /// Serializes `data` into the query string.
    pub fn query<T: Serialize + ?Sized>(mut self, data: &T) -> Self {
        match serde_urlencoded::to_string(data) {
            Ok(query) => self.query = Some(query),
            Err(e) => self.fail(e.into()),
        }
        self
    }

    /// Sets a urlencoded form body.
    pub fn form<T: Serialize + ?Sized>(mut self, data: &T) -> Self {
        match serde_urlencoded::to_string(data) {
            Ok(body) => {
                self.body = Bytes::from(body);
                self.headers.insert(
                    CONTENT_TYPE,
                    HeaderValue::from_static("application/x-www-form-urlencoded"),
                );
            }
            Err(e) => self.fail(e.into()),
        }
        self
    }

    /// Sets a JSON body.
    pub fn json<T: Serialize + ?Sized>(mut self, data: &T) -> Self {
        match serde_json::to_vec(data) {
            Ok(body) => {
                self.body = Bytes::from(body);
                self.headers
                    .insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
            }
            Err(e) => self.fail(e.into()),
        }
        self
    }

    /// Sets raw body bytes.
    pub fn body(mut self, body: impl Into<Bytes>) -> Self {
        self.body = body.into();
        self
    }

    /// Simulates a request made over `https`.
    pub fn secure(mut self, secure: bool) -> Self {
        self.secure = secure;
        self
    }

    /// Builds the request and runs the middleware pre-processors.
    ///
    /// Fails with the first invalid builder parameter, or with the error of
    /// the first middleware that cannot be constructed or rejects the request.
    pub fn build(self) -> Result<ViewRequest> {
        if let Some(err) = self.error {
            return Err(err);
        }

        let factory = self.factory;
        let defaults = &factory.defaults;
        let uri = request_uri(&self.path, self.query.as_deref());
        let scheme = if self.secure {
            Scheme::HTTPS
        } else {
            defaults.scheme.clone()
        };

        let mut headers = defaults.headers.clone();
        if !headers.contains_key(HOST) {
            let host = HeaderValue::from_str(&defaults.host(&scheme)).map_err(|e| {
                Error::InvalidHeader {
                    name: HOST.to_string(),
                    reason: e.to_string(),
                }
            })?;
            headers.insert(HOST, host);
        }
        headers.extend(self.headers);

        let mut request = Request::builder()
            .method(self.method)
            .uri(uri)
            .body(self.body)?;
        *request.headers_mut() = headers;

        let extensions = request.extensions_mut();
        extensions.insert(ConnectionInfo {
            scheme,
            remote_addr: defaults.remote_addr,
        });
        extensions.insert(RequestContext::new());
        extensions.insert(self.user);

        tracing::debug!(
            method = %request.method(),
            uri = %request.uri(),
            fixed = factory.middleware_classes.len(),
            per_call = self.middleware_classes.len(),
            "built request"
        );

        for class in factory
            .middleware_classes
            .iter()
            .chain(self.middleware_classes.iter())
        {
            class.process(&mut request)?;
        }

        Ok(request)
    }
}

fn request_uri(path: &str, query: Option<&str>) -> String {
    let path = if path.is_empty() { "/" } else { path };
    match query {
        Some(query) if !query.is_empty() => {
            let sep = if path.contains('?') { '&' } else { '?' };
            format!("{}{}{}", path, sep, query)
        }
        _ => path.to_string(),
    }
}
