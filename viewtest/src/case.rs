//! View test cases.
//!
//! A test case is a type implementing [`ViewTestCase`]; its associated
//! functions are the case's configuration. [`ViewTest::setup`] wires a fresh
//! view and request factory from that configuration before each test, and
//! the fixture offers the redirect assertions.
//!
//! # Examples
//!
//! ```
//! use viewtest::prelude::*;
//!
//! struct NextViewCase;
//!
//! impl ViewTestCase for NextViewCase {
//!     fn view_function() -> Option<View> {
//!         Some(View::from_fn(|_request| Redirect::to("/next/")))
//!     }
//! }
//!
//! let case = ViewTest::<NextViewCase>::setup();
//! let response = case.view().call(case.factory().get("/").build().unwrap());
//! case.assert_redirect(&response, Some("/next/"));
//! assert!(case.check_redirect(&response, Some("/other/")).is_err());
//! ```

use std::fmt;
use std::marker::PhantomData;

use http::header::LOCATION;
use http::{Response, StatusCode};

use crate::error::AssertionError;
use crate::factory::{FactoryClass, RequestFactory};
use crate::middleware::MiddlewareClass;
use crate::view::{View, ViewClass, ViewSource};

/// Status codes treated as redirects unless a case overrides them.
pub const DEFAULT_REDIRECT_CODES: [StatusCode; 2] =
    [StatusCode::FOUND, StatusCode::MOVED_PERMANENTLY];

/// Configuration of a view test case.
///
/// Every function has a default; override the ones the case needs.
pub trait ViewTestCase: Sized + 'static {
    /// Class-based view under test. Takes precedence over
    /// [`view_function`](Self::view_function).
    fn view_class() -> Option<ViewClass> {
        None
    }

    /// Function view under test.
    fn view_function() -> Option<View> {
        None
    }

    /// Constructor for the request factory. `None` leaves the factory unset.
    fn factory_class() -> Option<FactoryClass> {
        Some(|classes: Vec<MiddlewareClass>| RequestFactory::new(classes))
    }

    /// Middleware handed to the factory constructor.
    fn middleware_classes() -> Vec<MiddlewareClass> {
        Vec::new()
    }

    fn redirect_codes() -> Vec<StatusCode> {
        DEFAULT_REDIRECT_CODES.to_vec()
    }

    /// Runs after the view and factory are wired.
    fn set_up(_case: &mut ViewTest<Self>) {}
}

/// The per-test fixture of a [`ViewTestCase`].
pub struct ViewTest<C: ViewTestCase> {
    view: Option<View>,
    factory: Option<RequestFactory>,
    redirect_codes: Vec<StatusCode>,
    _case: PhantomData<fn() -> C>,
}

impl<C: ViewTestCase> ViewTest<C> {
    /// Wires a fresh view and factory from the case configuration.
    pub fn setup() -> Self {
        let name = case_name::<C>();
        let source = ViewSource::select(C::view_class(), C::view_function());
        match &source {
            Some(ViewSource::FromClass(class)) => {
                tracing::debug!(case = name, view_class = class.name(), "wiring view class");
            }
            Some(ViewSource::FromFunction(_)) => {
                tracing::debug!(case = name, "wiring view function");
            }
            None => tracing::debug!(case = name, "no view configured"),
        }

        let factory = C::factory_class().map(|construct| construct(C::middleware_classes()));

        let mut case = Self {
            view: source.map(ViewSource::resolve),
            factory,
            redirect_codes: C::redirect_codes(),
            _case: PhantomData,
        };
        C::set_up(&mut case);
        case
    }

    /// The view under test.
    ///
    /// # Panics
    ///
    /// Panics when the case configures neither a view class nor a view function.
    #[track_caller]
    pub fn view(&self) -> &View {
        match &self.view {
            Some(view) => view,
            None => panic!(
                "{} has no view: set view_class or view_function",
                case_name::<C>()
            ),
        }
    }

    pub fn try_view(&self) -> Option<&View> {
        self.view.as_ref()
    }

    /// Replaces the view under test.
    pub fn set_view(&mut self, view: View) {
        self.view = Some(view);
    }

    /// The request factory.
    ///
    /// # Panics
    ///
    /// Panics when the case's `factory_class` is `None`.
    #[track_caller]
    pub fn factory(&self) -> &RequestFactory {
        match &self.factory {
            Some(factory) => factory,
            None => panic!("{} has no request factory", case_name::<C>()),
        }
    }

    pub fn try_factory(&self) -> Option<&RequestFactory> {
        self.factory.as_ref()
    }

    pub fn redirect_codes(&self) -> &[StatusCode] {
        &self.redirect_codes
    }

    /// Checks that `response` is a redirect, to `expected_url` when given.
    ///
    /// The `Location` header must equal `expected_url` exactly. An empty
    /// `expected_url` skips the location check.
    pub fn check_redirect<B>(
        &self,
        response: &Response<B>,
        expected_url: Option<&str>,
    ) -> Result<(), AssertionError> {
        check_redirect(response, &self.redirect_codes, expected_url)
    }

    /// Checks that `response` is not a redirect.
    pub fn check_not_redirect<B>(&self, response: &Response<B>) -> Result<(), AssertionError> {
        check_not_redirect(response, &self.redirect_codes)
    }

    /// Asserts that `response` is a redirect, to `expected_url` when given.
    #[track_caller]
    pub fn assert_redirect<B>(&self, response: &Response<B>, expected_url: Option<&str>) {
        if let Err(err) = self.check_redirect(response, expected_url) {
            panic!("{}", err);
        }
    }

    /// Asserts that `response` is not a redirect.
    #[track_caller]
    pub fn assert_not_redirect<B>(&self, response: &Response<B>) {
        if let Err(err) = self.check_not_redirect(response) {
            panic!("{}", err);
        }
    }
}

impl<C: ViewTestCase> fmt::Debug for ViewTest<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ViewTest")
            .field("case", &case_name::<C>())
            .field("view", &self.view)
            .field("factory", &self.factory)
            .field("redirect_codes", &self.redirect_codes)
            .finish()
    }
}

/// Checks a response against a list of redirect codes and an optional location.
pub fn check_redirect<B>(
    response: &Response<B>,
    redirect_codes: &[StatusCode],
    expected_url: Option<&str>,
) -> Result<(), AssertionError> {
    let status = response.status();
    if !redirect_codes.contains(&status) {
        return Err(AssertionError::NotRedirect {
            status,
            expected: redirect_codes.to_vec(),
        });
    }

    if let Some(expected) = expected_url.filter(|url| !url.is_empty()) {
        let header = response.headers().get(LOCATION);
        if header.map(|v| v.as_bytes()) != Some(expected.as_bytes()) {
            return Err(AssertionError::LocationMismatch {
                expected: expected.to_string(),
                actual: location(response),
            });
        }
    }

    Ok(())
}

/// Checks that a response status is not among the redirect codes.
pub fn check_not_redirect<B>(
    response: &Response<B>,
    redirect_codes: &[StatusCode],
) -> Result<(), AssertionError> {
    let status = response.status();
    if redirect_codes.contains(&status) {
        return Err(AssertionError::UnexpectedRedirect {
            status,
            location: location(response),
        });
    }
    Ok(())
}

fn location<B>(response: &Response<B>) -> Option<String> {
    response
        .headers()
        .get(LOCATION)
        .map(|v| String::from_utf8_lossy(v.as_bytes()).into_owned())
}

fn case_name<C>() -> &'static str {
    let full = std::any::type_name::<C>();
    full.rsplit("::").next().unwrap_or(full)
}
