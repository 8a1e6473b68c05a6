use crate::error::Result;
use crate::request::{RequestContext, ViewRequest};

use super::{Middleware, PreProcessor};

pub const TRACE_ID_HEADER: &str = "x-trace-id";

/// Adopts an incoming `x-trace-id` header as the request's trace id.
///
/// Requests without the header keep the context assigned by the factory.
#[derive(Debug, Clone, Copy, Default)]
pub struct TraceIdMiddleware;

impl TraceIdMiddleware {
    pub fn new() -> Self {
        Self
    }
}

impl Middleware for TraceIdMiddleware {
    fn pre_processor(&mut self) -> Option<&mut dyn PreProcessor> {
        Some(self)
    }
}

impl PreProcessor for TraceIdMiddleware {
    fn process_request(&mut self, request: &mut ViewRequest) -> Result<()> {
        let incoming = request
            .headers()
            .get(TRACE_ID_HEADER)
            .and_then(|v| v.to_str().ok())
            .filter(|v| !v.is_empty())
            .map(String::from);

        if let Some(trace_id) = incoming {
            request
                .extensions_mut()
                .insert(RequestContext::with_trace_id(trace_id));
        }

        Ok(())
    }
}
