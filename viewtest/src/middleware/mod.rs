//! Middleware simulation for request construction.
//!
//! A middleware is any type implementing [`Middleware`]. It takes part in
//! request pre-processing only if it exposes a [`PreProcessor`] through
//! [`Middleware::pre_processor`]; otherwise it is constructed and dropped
//! without being invoked.
//!
//! The factory does not hold middleware instances. It holds
//! [`MiddlewareClass`]es, named constructors that produce a fresh instance
//! for every request.
//!
//! # Examples
//!
//! ```
//! use viewtest::prelude::*;
//!
//! #[derive(Clone, Debug, PartialEq)]
//! struct Flag(bool);
//!
//! #[derive(Default)]
//! struct SetFlagMiddleware;
//!
//! impl Middleware for SetFlagMiddleware {
//!     fn pre_processor(&mut self) -> Option<&mut dyn PreProcessor> {
//!         Some(self)
//!     }
//! }
//!
//! impl PreProcessor for SetFlagMiddleware {
//!     fn process_request(&mut self, request: &mut ViewRequest) -> Result<()> {
//!         request.extensions_mut().insert(Flag(true));
//!         Ok(())
//!     }
//! }
//!
//! let factory = RequestFactory::new([MiddlewareClass::of::<SetFlagMiddleware>()]);
//! let request = factory.get("/x/").build().unwrap();
//! assert_eq!(request.extensions().get::<Flag>(), Some(&Flag(true)));
//! ```

mod session;
mod trace_id;

pub use session::{SESSION_COOKIE_NAME, Session, SessionMiddleware};
pub use trace_id::{TRACE_ID_HEADER, TraceIdMiddleware};

use std::fmt;
use std::sync::Arc;

use crate::error::Result;
use crate::request::ViewRequest;

/// The request-processing capability of a middleware.
pub trait PreProcessor {
    /// Inspects or mutates the request in place.
    ///
    /// Returning an error aborts request construction.
    fn process_request(&mut self, request: &mut ViewRequest) -> Result<()>;
}

/// A middleware that may take part in request pre-processing.
pub trait Middleware: Send + 'static {
    /// Returns the pre-processing capability, if this middleware has one.
    fn pre_processor(&mut self) -> Option<&mut dyn PreProcessor> {
        None
    }
}

type Constructor = Arc<dyn Fn() -> Result<Box<dyn Middleware>> + Send + Sync>;

/// A named constructor for a middleware.
#[derive(Clone)]
pub struct MiddlewareClass {
    name: String,
    construct: Constructor,
}

impl MiddlewareClass {
    /// Class for a middleware built with `Default::default()`.
    pub fn of<M: Middleware + Default>() -> Self {
        Self {
            name: short_type_name::<M>().to_string(),
            construct: Arc::new(|| -> Result<Box<dyn Middleware>> { Ok(Box::new(M::default())) }),
        }
    }

    /// Class for a middleware built by a fallible constructor.
    pub fn from_fn<F, M>(name: impl Into<String>, construct: F) -> Self
    where
        F: Fn() -> Result<M> + Send + Sync + 'static,
        M: Middleware,
    {
        Self {
            name: name.into(),
            construct: Arc::new(move || construct().map(|m| Box::new(m) as Box<dyn Middleware>)),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Constructs a fresh instance.
    pub fn construct(&self) -> Result<Box<dyn Middleware>> {
        (self.construct)().map_err(|e| e.in_middleware(&self.name))
    }

    /// Constructs an instance and runs its pre-processor against `request`.
    ///
    /// Returns whether a pre-processor was invoked.
    pub(crate) fn process(&self, request: &mut ViewRequest) -> Result<bool> {
        let mut instance = self.construct()?;

        match instance.pre_processor() {
            Some(pre) => {
                tracing::debug!(middleware = %self.name, "running pre-processor");
                pre.process_request(request)
                    .map_err(|e| e.in_middleware(&self.name))?;
                Ok(true)
            }
            None => {
                tracing::trace!(middleware = %self.name, "no pre-processor, skipping");
                Ok(false)
            }
        }
    }
}

impl fmt::Debug for MiddlewareClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("MiddlewareClass").field(&self.name).finish()
    }
}

fn short_type_name<T: ?Sized>() -> &'static str {
    let full = std::any::type_name::<T>();
    let base = full.split('<').next().unwrap_or(full);
    base.rsplit("::").next().unwrap_or(base)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use bytes::Bytes;

    #[derive(Default)]
    struct Inert;

    impl Middleware for Inert {}

    #[derive(Default)]
    struct Stamp;

    #[derive(Debug, Clone, PartialEq)]
    struct Stamped;

    impl Middleware for Stamp {
        fn pre_processor(&mut self) -> Option<&mut dyn PreProcessor> {
            Some(self)
        }
    }

    impl PreProcessor for Stamp {
        fn process_request(&mut self, request: &mut ViewRequest) -> Result<()> {
            request.extensions_mut().insert(Stamped);
            Ok(())
        }
    }

    struct Reject;

    impl Middleware for Reject {
        fn pre_processor(&mut self) -> Option<&mut dyn PreProcessor> {
            Some(self)
        }
    }

    impl PreProcessor for Reject {
        fn process_request(&mut self, _request: &mut ViewRequest) -> Result<()> {
            Err(Error::middleware("not allowed"))
        }
    }

    #[test]
    fn test_class_name_from_type() {
        assert_eq!(MiddlewareClass::of::<Stamp>().name(), "Stamp");
        assert_eq!(MiddlewareClass::of::<SessionMiddleware>().name(), "SessionMiddleware");
    }

    #[test]
    fn test_inert_middleware_is_not_invoked() {
        let mut request = http::Request::new(Bytes::new());
        let ran = MiddlewareClass::of::<Inert>().process(&mut request).unwrap();
        assert!(!ran);
    }

    #[test]
    fn test_pre_processor_mutates_request() {
        let mut request = http::Request::new(Bytes::new());
        let ran = MiddlewareClass::of::<Stamp>().process(&mut request).unwrap();
        assert!(ran);
        assert_eq!(request.extensions().get::<Stamped>(), Some(&Stamped));
    }

    #[test]
    fn test_pre_processor_error_carries_class_name() {
        let class = MiddlewareClass::from_fn("Reject", || Ok(Reject));
        let mut request = http::Request::new(Bytes::new());
        let err = class.process(&mut request).unwrap_err();
        assert_eq!(err.to_string(), "middleware 'Reject' rejected request: not allowed");
    }

    #[test]
    fn test_failing_constructor() {
        let class = MiddlewareClass::from_fn("NeedsConfig", || -> Result<Inert> {
            Err(Error::construct("missing api key"))
        });
        let mut request = http::Request::new(Bytes::new());
        let err = class.process(&mut request).unwrap_err();
        assert!(matches!(err, Error::Construct { ref middleware, .. } if middleware == "NeedsConfig"));
    }

    #[test]
    fn test_each_process_constructs_fresh_instance() {
        use std::sync::atomic::{AtomicUsize, Ordering};

        static BUILT: AtomicUsize = AtomicUsize::new(0);
        let class = MiddlewareClass::from_fn("Counting", || {
            BUILT.fetch_add(1, Ordering::SeqCst);
            Ok(Inert)
        });

        let mut request = http::Request::new(Bytes::new());
        class.process(&mut request).unwrap();
        class.process(&mut request).unwrap();
        assert_eq!(BUILT.load(Ordering::SeqCst), 2);
    }
}
