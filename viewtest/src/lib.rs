//! Helpers for unit-testing HTTP view handlers.
//!
//! [`RequestFactory`](factory::RequestFactory) builds simulated requests and
//! runs middleware pre-processors against them. [`ViewTestCase`](case::ViewTestCase)
//! wires a view under test to a fresh factory before each test and provides
//! redirect assertions. The [`view_test`] attribute turns a function taking
//! the fixture into a `#[test]`.
//!
//! ```
//! use viewtest::prelude::*;
//!
//! struct LoginCase;
//!
//! impl ViewTestCase for LoginCase {
//!     fn view_function() -> Option<View> {
//!         Some(View::from_fn(|request: ViewRequest| {
//!             if request.has_user() {
//!                 Redirect::to("/dashboard/").into_response()
//!             } else {
//!                 "login form".into_response()
//!             }
//!         }))
//!     }
//! }
//!
//! let case = ViewTest::<LoginCase>::setup();
//!
//! let anonymous = case.view().call(case.factory().get("/login/").build().unwrap());
//! case.assert_not_redirect(&anonymous);
//!
//! let member = case.factory().get("/login/").user("ada").build().unwrap();
//! case.assert_redirect(&case.view().call(member), Some("/dashboard/"));
//! ```

extern crate self as viewtest;

pub mod case;
pub mod config;
pub mod error;
pub mod factory;
pub mod middleware;
pub mod observability;
pub mod request;
pub mod response;
pub mod view;

pub use http;
pub use viewtest_macros::view_test;

pub mod prelude {
    pub use crate::case::{ViewTest, ViewTestCase};
    pub use crate::config::FactoryDefaults;
    pub use crate::error::{AssertionError, Error, Result};
    pub use crate::factory::{FactoryClass, RequestFactory};
    pub use crate::middleware::{
        Middleware, MiddlewareClass, PreProcessor, Session, SessionMiddleware, TraceIdMiddleware,
    };
    pub use crate::request::{PathParams, RequestExt, RequestUser, ViewRequest, params};
    pub use crate::response::{IntoResponse, Redirect};
    pub use crate::view::{ClassView, MethodRouter, View, ViewClass, ViewSource, as_view};

    pub use http::{Method, StatusCode};

    pub use viewtest_macros::view_test;
}
