//! Request/response pair a context can be bound to

use axum::http::{HeaderMap, HeaderName, HeaderValue, Request, request::Parts};
use std::fmt;
use std::sync::{Arc, Mutex, PoisonError};

/// Transport a context was derived for
///
/// Holds the head of the incoming request and, optionally, a sink for
/// response headers (for example `set-cookie` written by a session
/// strategy). Cloning is cheap; equality is identity of the underlying
/// request and response.
#[derive(Clone)]
pub struct Transport {
    request: Arc<Parts>,
    response: Option<ResponseHeaders>,
}

impl Transport {
    /// Build from a request head
    pub fn new(request: Parts) -> Self {
        Self {
            request: Arc::new(request),
            response: None,
        }
    }

    /// Build from a full request, dropping its body
    pub fn from_request<B>(request: Request<B>) -> Self {
        let (parts, _body) = request.into_parts();
        Self::new(parts)
    }

    /// Attach a response header sink
    pub fn with_response(mut self, response: ResponseHeaders) -> Self {
        self.response = Some(response);
        self
    }

    pub fn request(&self) -> &Parts {
        &self.request
    }

    pub fn response(&self) -> Option<&ResponseHeaders> {
        self.response.as_ref()
    }

    /// Shortcut for a request header as UTF-8
    pub fn header(&self, name: &str) -> Option<&str> {
        self.request
            .headers
            .get(name)
            .and_then(|value| value.to_str().ok())
    }
}

impl PartialEq for Transport {
    fn eq(&self, other: &Self) -> bool {
        let same_response = match (&self.response, &other.response) {
            (Some(a), Some(b)) => a.ptr_eq(b),
            (None, None) => true,
            _ => false,
        };
        Arc::ptr_eq(&self.request, &other.request) && same_response
    }
}

impl fmt::Debug for Transport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Transport")
            .field("method", &self.request.method)
            .field("uri", &self.request.uri)
            .field("response", &self.response.is_some())
            .finish()
    }
}

/// Shared sink for headers to be written on the response
#[derive(Clone, Default)]
pub struct ResponseHeaders {
    headers: Arc<Mutex<HeaderMap>>,
}

impl ResponseHeaders {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a header; earlier values for the same name are kept
    pub fn append(&self, name: HeaderName, value: HeaderValue) {
        self.lock().append(name, value);
    }

    /// Replace every value of a header
    pub fn insert(&self, name: HeaderName, value: HeaderValue) {
        self.lock().insert(name, value);
    }

    /// Copy of the headers written so far
    pub fn snapshot(&self) -> HeaderMap {
        self.lock().clone()
    }

    pub fn ptr_eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.headers, &other.headers)
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HeaderMap> {
        self.headers.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl fmt::Debug for ResponseHeaders {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("ResponseHeaders")
            .field(&*self.lock())
            .finish()
    }
}
