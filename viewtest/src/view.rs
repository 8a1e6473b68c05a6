//! Views under test.
//!
//! A [`View`] is a shareable callable from a request (and path parameters)
//! to a response. Views come from plain functions via [`View::from_fn`] or
//! from class-based views implementing [`ClassView`], turned into a callable
//! with [`as_view`].

use std::fmt;
use std::sync::Arc;

use http::header::{ALLOW, CONTENT_LENGTH, HeaderValue};
use http::{Method, Response, StatusCode};

use crate::request::{PathParams, ViewRequest};
use crate::response::{BoxBody, IntoResponse};

type ViewFn = dyn Fn(ViewRequest, PathParams) -> Response<BoxBody> + Send + Sync;

/// A callable view.
#[derive(Clone)]
pub struct View {
    inner: Arc<ViewFn>,
}

impl View {
    /// Wraps a view taking the request and path parameters.
    pub fn new<F, Out>(view: F) -> Self
    where
        F: Fn(ViewRequest, PathParams) -> Out + Send + Sync + 'static,
        Out: IntoResponse,
    {
        Self {
            inner: Arc::new(move |request, params| view(request, params).into_response()),
        }
    }

    /// Wraps a view taking only the request.
    pub fn from_fn<F, Out>(view: F) -> Self
    where
        F: Fn(ViewRequest) -> Out + Send + Sync + 'static,
        Out: IntoResponse,
    {
        Self::new(move |request, _params| view(request))
    }

    /// Calls the view without path parameters.
    pub fn call(&self, request: ViewRequest) -> Response<BoxBody> {
        (self.inner)(request, PathParams::new())
    }

    /// Calls the view with path parameters.
    pub fn call_with(&self, request: ViewRequest, params: PathParams) -> Response<BoxBody> {
        (self.inner)(request, params)
    }
}

impl fmt::Debug for View {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("View")
    }
}

type MethodHandler<V> =
    Box<dyn Fn(&mut V, ViewRequest, PathParams) -> Response<BoxBody> + Send + Sync>;

/// Per-method handlers of a class-based view.
///
/// # Examples
///
/// ```
/// use viewtest::prelude::*;
///
/// #[derive(Default)]
/// struct ArticleView;
///
/// impl ClassView for ArticleView {
///     fn methods() -> MethodRouter<Self> {
///         MethodRouter::new()
///             .get(|_view, _req, _params| "article")
///             .post(|_view, _req, _params| Redirect::to("/articles/"))
///     }
/// }
///
/// let view = as_view::<ArticleView>();
/// let factory = RequestFactory::default();
/// let response = view.call(factory.delete("/articles/1/").build().unwrap());
/// assert_eq!(response.status(), StatusCode::METHOD_NOT_ALLOWED);
/// ```
pub struct MethodRouter<V> {
    handlers: Vec<(Method, MethodHandler<V>)>,
}

impl<V: 'static> MethodRouter<V> {
    pub fn new() -> Self {
        Self {
            handlers: Vec::new(),
        }
    }

    /// Registers a handler for `method`, replacing an earlier one.
    pub fn on<F, Out>(mut self, method: Method, handler: F) -> Self
    where
        F: Fn(&mut V, ViewRequest, PathParams) -> Out + Send + Sync + 'static,
        Out: IntoResponse,
    {
        self.handlers.retain(|(m, _)| *m != method);
        let handler: MethodHandler<V> = Box::new(
            move |view: &mut V, request: ViewRequest, params: PathParams| {
                handler(view, request, params).into_response()
            },
        );
        self.handlers.push((method, handler));
        self
    }

    pub fn get<F, Out>(self, handler: F) -> Self
    where
        F: Fn(&mut V, ViewRequest, PathParams) -> Out + Send + Sync + 'static,
        Out: IntoResponse,
    {
        self.on(Method::GET, handler)
    }

    pub fn post<F, Out>(self, handler: F) -> Self
    where
        F: Fn(&mut V, ViewRequest, PathParams) -> Out + Send + Sync + 'static,
        Out: IntoResponse,
    {
        self.on(Method::POST, handler)
    }

    pub fn put<F, Out>(self, handler: F) -> Self
    where
        F: Fn(&mut V, ViewRequest, PathParams) -> Out + Send + Sync + 'static,
        Out: IntoResponse,
    {
        self.on(Method::PUT, handler)
    }

    pub fn delete<F, Out>(self, handler: F) -> Self
    where
        F: Fn(&mut V, ViewRequest, PathParams) -> Out + Send + Sync + 'static,
        Out: IntoResponse,
    {
        self.on(Method::DELETE, handler)
    }

    pub fn head<F, Out>(self, handler: F) -> Self
    where
        F: Fn(&mut V, ViewRequest, PathParams) -> Out + Send + Sync + 'static,
        Out: IntoResponse,
    {
        self.on(Method::HEAD, handler)
    }

    pub fn options<F, Out>(self, handler: F) -> Self
    where
        F: Fn(&mut V, ViewRequest, PathParams) -> Out + Send + Sync + 'static,
        Out: IntoResponse,
    {
        self.on(Method::OPTIONS, handler)
    }

    fn find(&self, method: &Method) -> Option<&MethodHandler<V>> {
        self.handlers
            .iter()
            .find(|(m, _)| m == method)
            .map(|(_, handler)| handler)
    }

    /// Methods the view answers, including the implied HEAD and OPTIONS.
    pub fn allowed_methods(&self) -> Vec<Method> {
        let mut allowed: Vec<Method> = self.handlers.iter().map(|(m, _)| m.clone()).collect();
        if self.find(&Method::GET).is_some() && self.find(&Method::HEAD).is_none() {
            allowed.push(Method::HEAD);
        }
        if self.find(&Method::OPTIONS).is_none() {
            allowed.push(Method::OPTIONS);
        }
        allowed
    }

    fn allow_header(&self) -> HeaderValue {
        let methods = self.allowed_methods();
        let allowed: Vec<&str> = methods.iter().map(Method::as_str).collect();
        HeaderValue::from_str(&allowed.join(", ")).unwrap_or(HeaderValue::from_static(""))
    }

    fn dispatch(&self, view: &mut V, request: ViewRequest, params: PathParams) -> Response<BoxBody> {
        let method = request.method().clone();

        if let Some(handler) = self.find(&method) {
            return handler(view, request, params);
        }

        if method == Method::HEAD
            && let Some(get) = self.find(&Method::GET)
        {
            return get(view, request, params);
        }

        if method == Method::OPTIONS {
            let mut response = StatusCode::OK.into_response();
            response.headers_mut().insert(ALLOW, self.allow_header());
            response
                .headers_mut()
                .insert(CONTENT_LENGTH, HeaderValue::from_static("0"));
            return response;
        }

        tracing::warn!(method = %method, path = %request.uri().path(), "method not allowed");
        let mut response = StatusCode::METHOD_NOT_ALLOWED.into_response();
        response.headers_mut().insert(ALLOW, self.allow_header());
        response
    }
}

impl<V: 'static> Default for MethodRouter<V> {
    fn default() -> Self {
        Self::new()
    }
}

/// A class-based view.
///
/// A fresh instance is created with `Default::default()` for every request,
/// and the request is dispatched to the handler registered for its method.
pub trait ClassView: Default + Send + 'static {
    /// The per-method handlers of this view.
    fn methods() -> MethodRouter<Self>;
}

/// Turns a class-based view into a callable [`View`].
pub fn as_view<V: ClassView>() -> View {
    let router = Arc::new(V::methods());
    View::new(move |request, params| {
        let mut instance = V::default();
        router.dispatch(&mut instance, request, params)
    })
}

/// A class-based view type that can be turned into a [`View`].
#[derive(Clone, Copy)]
pub struct ViewClass {
    name: &'static str,
    as_view: fn() -> View,
}

impl ViewClass {
    pub fn of<V: ClassView>() -> Self {
        Self {
            name: std::any::type_name::<V>(),
            as_view: as_view::<V>,
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn as_view(&self) -> View {
        (self.as_view)()
    }
}

impl fmt::Debug for ViewClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("ViewClass").field(&self.name).finish()
    }
}

/// Where a test case's view comes from.
#[derive(Debug, Clone)]
pub enum ViewSource {
    FromClass(ViewClass),
    FromFunction(View),
}

impl ViewSource {
    /// Picks the view class when present, otherwise the view function.
    pub fn select(class: Option<ViewClass>, function: Option<View>) -> Option<Self> {
        match (class, function) {
            (Some(class), _) => Some(ViewSource::FromClass(class)),
            (None, Some(function)) => Some(ViewSource::FromFunction(function)),
            (None, None) => None,
        }
    }

    pub fn resolve(self) -> View {
        match self {
            ViewSource::FromClass(class) => class.as_view(),
            ViewSource::FromFunction(view) => view,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::factory::RequestFactory;
    use crate::request::params;
    use crate::response::Redirect;

    #[derive(Default)]
    struct Counter {
        hits: u32,
    }

    impl ClassView for Counter {
        fn methods() -> MethodRouter<Self> {
            MethodRouter::new()
                .get(|view: &mut Counter, _req, _params| {
                    view.hits += 1;
                    format!("hits={}", view.hits)
                })
                .post(|_view: &mut Counter, _req, _params| Redirect::to("/done/"))
        }
    }

    fn header(response: &Response<BoxBody>, name: http::header::HeaderName) -> String {
        response
            .headers()
            .get(name)
            .map(|v| v.to_str().unwrap().to_string())
            .unwrap_or_default()
    }

    #[test]
    fn test_function_view_receives_request() {
        let view = View::from_fn(|request: ViewRequest| request.uri().path().to_string());
        let factory = RequestFactory::default();
        let response = view.call(factory.get("/hello/").build().unwrap());
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[test]
    fn test_view_with_params() {
        let view = View::new(|_request, params: PathParams| match params.get("id") {
            Some(_) => StatusCode::OK,
            None => StatusCode::NOT_FOUND,
        });
        let factory = RequestFactory::default();

        let response = view.call_with(factory.get("/").build().unwrap(), params(&[("id", "7")]));
        assert_eq!(response.status(), StatusCode::OK);

        let response = view.call(factory.get("/").build().unwrap());
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[test]
    fn test_class_view_dispatch() {
        let view = as_view::<Counter>();
        let factory = RequestFactory::default();

        let response = view.call(factory.post("/").build().unwrap());
        assert_eq!(response.status(), StatusCode::FOUND);
        assert_eq!(header(&response, http::header::LOCATION), "/done/");
    }

    #[tokio::test]
    async fn test_class_view_instance_per_request() {
        use http_body_util::BodyExt;

        let view = as_view::<Counter>();
        let factory = RequestFactory::default();

        for _ in 0..2 {
            let response = view.call(factory.get("/").build().unwrap());
            let body = response.into_body().collect().await.unwrap().to_bytes();
            assert_eq!(&body[..], b"hits=1");
        }
    }

    #[test]
    fn test_head_falls_back_to_get() {
        let view = as_view::<Counter>();
        let response = view.call(RequestFactory::default().head("/").build().unwrap());
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[test]
    fn test_options_lists_allowed_methods() {
        let view = as_view::<Counter>();
        let response = view.call(RequestFactory::default().options("/").build().unwrap());
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(header(&response, ALLOW), "GET, POST, HEAD, OPTIONS");
        assert_eq!(header(&response, CONTENT_LENGTH), "0");
    }

    #[test]
    fn test_unknown_method_not_allowed() {
        let view = as_view::<Counter>();
        let response = view.call(RequestFactory::default().put("/").build().unwrap());
        assert_eq!(response.status(), StatusCode::METHOD_NOT_ALLOWED);
        assert_eq!(header(&response, ALLOW), "GET, POST, HEAD, OPTIONS");
    }

    #[test]
    fn test_on_replaces_handler() {
        let router: MethodRouter<Counter> = MethodRouter::new()
            .get(|_, _, _| StatusCode::OK)
            .get(|_, _, _| StatusCode::ACCEPTED);
        assert_eq!(router.allowed_methods(), vec![Method::GET, Method::HEAD, Method::OPTIONS]);
    }

    #[test]
    fn test_view_source_prefers_class() {
        let function = View::from_fn(|_req: ViewRequest| StatusCode::NO_CONTENT);
        let source = ViewSource::select(Some(ViewClass::of::<Counter>()), Some(function.clone()));
        assert!(matches!(source, Some(ViewSource::FromClass(_))));

        let source = ViewSource::select(None, Some(function));
        assert!(matches!(source, Some(ViewSource::FromFunction(_))));

        assert!(ViewSource::select(None, None).is_none());
    }

    #[test]
    fn test_view_class_name() {
        assert!(ViewClass::of::<Counter>().name().ends_with("Counter"));
    }
}
