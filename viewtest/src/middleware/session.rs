use std::collections::HashMap;

use serde::Serialize;
use serde::de::DeserializeOwned;

use crate::error::Result;
use crate::request::ViewRequest;

use super::{Middleware, PreProcessor};

/// Name of the cookie carrying the session key.
pub const SESSION_COOKIE_NAME: &str = "sessionid";

/// An in-memory session attached to a request.
///
/// Values are stored as JSON so views can read back any serde type.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Session {
    key: Option<String>,
    data: HashMap<String, serde_json::Value>,
    modified: bool,
}

impl Session {
    pub fn new() -> Self {
        Self::default()
    }

    /// A session bound to an existing key.
    pub fn with_key(key: impl Into<String>) -> Self {
        Self {
            key: Some(key.into()),
            ..Self::default()
        }
    }

    pub fn key(&self) -> Option<&str> {
        self.key.as_deref()
    }

    pub fn get<T: DeserializeOwned>(&self, name: &str) -> Option<T> {
        self.data
            .get(name)
            .and_then(|value| serde_json::from_value(value.clone()).ok())
    }

    pub fn insert<T: Serialize>(&mut self, name: impl Into<String>, value: T) -> Result<()> {
        self.data.insert(name.into(), serde_json::to_value(value)?);
        self.modified = true;
        Ok(())
    }

    pub fn remove(&mut self, name: &str) -> Option<serde_json::Value> {
        let removed = self.data.remove(name);
        if removed.is_some() {
            self.modified = true;
        }
        removed
    }

    pub fn contains_key(&self, name: &str) -> bool {
        self.data.contains_key(name)
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Whether the session changed since it was attached.
    pub fn is_modified(&self) -> bool {
        self.modified
    }
}

/// Attaches an empty [`Session`] to every request.
///
/// The session key is taken from the `sessionid` cookie when present.
#[derive(Debug, Clone, Copy, Default)]
pub struct SessionMiddleware;

impl Middleware for SessionMiddleware {
    fn pre_processor(&mut self) -> Option<&mut dyn PreProcessor> {
        Some(self)
    }
}

impl PreProcessor for SessionMiddleware {
    fn process_request(&mut self, request: &mut ViewRequest) -> Result<()> {
        let key = session_key(request);
        let session = match key {
            Some(key) => Session::with_key(key),
            None => Session::new(),
        };
        request.extensions_mut().insert(session);
        Ok(())
    }
}

fn session_key(request: &ViewRequest) -> Option<String> {
    request
        .headers()
        .get_all(http::header::COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|cookies| cookies.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(name, _)| *name == SESSION_COOKIE_NAME)
        .map(|(_, value)| value.to_string())
}
