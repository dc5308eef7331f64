use http::{HeaderMap, HeaderName, HeaderValue, Method};
use serde::ser::{Serialize, SerializeMap, Serializer};
use std::time::Duration;

use crate::body::Body;
use crate::error::ClientError;

/// Ordered query parameters.
///
/// Insertion order is kept: it is part of the canonical form used to match
/// identical in-flight reads, so `a=1&b=2` and `b=2&a=1` are different keys.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Params(Vec<(String, String)>);

impl Params {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a pair and return the set (builder style)
    #[must_use]
    pub fn with(mut self, name: impl Into<String>, value: impl ToString) -> Self {
        self.push(name, value);
        self
    }

    pub fn push(&mut self, name: impl Into<String>, value: impl ToString) {
        self.0.push((name.into(), value.to_string()));
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// JSON object text of the pairs, in insertion order.
    #[must_use]
    pub fn canonical(&self) -> String {
        // A map of strings cannot fail to serialize.
        serde_json::to_string(self).unwrap_or_default()
    }

    /// `application/x-www-form-urlencoded` rendering for the URL.
    ///
    /// # Errors
    /// Returns [`ClientError::BuildError`] if encoding fails.
    pub fn to_query_string(&self) -> Result<String, ClientError> {
        serde_urlencoded::to_string(&self.0)
            .map_err(|e| ClientError::BuildError(format!("Invalid query parameters: {e}")))
    }
}

impl Serialize for Params {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.0.len()))?;
        for (name, value) in &self.0 {
            map.serialize_entry(name, value)?;
        }
        map.end()
    }
}

impl<K: Into<String>, V: ToString> FromIterator<(K, V)> for Params {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self(
            iter.into_iter()
                .map(|(k, v)| (k.into(), v.to_string()))
                .collect(),
        )
    }
}

/// Per-call options accepted by every verb of the console client.
#[derive(Debug, Clone, Default)]
pub struct RequestOptions {
    params: Option<Params>,
    disable_duplicate: bool,
    skip_error_handler: bool,
    timeout: Option<Duration>,
    headers: HeaderMap,
}

impl RequestOptions {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Query parameters appended to the target path
    #[must_use]
    pub fn params(mut self, params: Params) -> Self {
        self.params = Some(params);
        self
    }

    /// Always issue a dedicated request, never joining or being joined
    #[must_use]
    pub fn disable_duplicate(mut self) -> Self {
        self.disable_duplicate = true;
        self
    }

    /// Do not report a failure of this call to the error notifier
    #[must_use]
    pub fn skip_error_handler(mut self) -> Self {
        self.skip_error_handler = true;
        self
    }

    /// Per-request timeout, overriding the transport default
    #[must_use]
    pub fn timeout(mut self, duration: Duration) -> Self {
        self.timeout = Some(duration);
        self
    }

    /// Add an extra header
    ///
    /// # Errors
    /// Returns [`ClientError::BuildError`] for an invalid name or value.
    pub fn header<K, V>(mut self, key: K, value: V) -> Result<Self, ClientError>
    where
        K: TryInto<HeaderName>,
        V: TryInto<HeaderValue>,
        K::Error: std::fmt::Display,
        V::Error: std::fmt::Display,
    {
        let key = key
            .try_into()
            .map_err(|e| ClientError::BuildError(format!("Invalid header name: {e}")))?;
        let value = value
            .try_into()
            .map_err(|e| ClientError::BuildError(format!("Invalid header value: {e}")))?;
        self.headers.insert(key, value);
        Ok(self)
    }

    #[must_use]
    pub fn get_params(&self) -> Option<&Params> {
        self.params.as_ref()
    }

    #[must_use]
    pub fn is_duplicate_disabled(&self) -> bool {
        self.disable_duplicate
    }

    #[must_use]
    pub fn is_error_handler_skipped(&self) -> bool {
        self.skip_error_handler
    }

    #[must_use]
    pub fn get_timeout(&self) -> Option<Duration> {
        self.timeout
    }

    #[must_use]
    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }
}

/// A fully assembled request as handed to the transport.
#[derive(Debug, Clone)]
pub struct Request {
    method: Method,
    path: String,
    params: Option<Params>,
    headers: HeaderMap,
    body: Body,
    timeout: Option<Duration>,
}

impl Request {
    /// Create a new request builder
    #[must_use]
    pub fn builder() -> RequestBuilder {
        RequestBuilder::default()
    }

    #[must_use]
    pub fn method(&self) -> &Method {
        &self.method
    }

    #[must_use]
    pub fn path(&self) -> &str {
        &self.path
    }

    #[must_use]
    pub fn params(&self) -> Option<&Params> {
        self.params.as_ref()
    }

    #[must_use]
    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    #[must_use]
    pub fn body(&self) -> &Body {
        &self.body
    }

    #[must_use]
    pub fn timeout(&self) -> Option<Duration> {
        self.timeout
    }

    /// Path plus encoded query, ready to be appended to the base URL.
    ///
    /// A path that already carries a query string gets the parameters
    /// appended with `&`.
    ///
    /// # Errors
    /// Returns [`ClientError::BuildError`] if the parameters cannot be encoded.
    pub fn path_and_query(&self) -> Result<String, ClientError> {
        let mut target = if self.path.starts_with('/') {
            self.path.clone()
        } else {
            format!("/{}", self.path)
        };
        if let Some(params) = self.params.as_ref().filter(|p| !p.is_empty()) {
            target.push(if target.contains('?') { '&' } else { '?' });
            target.push_str(&params.to_query_string()?);
        }
        Ok(target)
    }
}

/// Builder for constructing requests with a fluent API
#[derive(Debug, Default)]
pub struct RequestBuilder {
    method: Option<Method>,
    path: Option<String>,
    params: Option<Params>,
    headers: HeaderMap,
    body: Body,
    timeout: Option<Duration>,
}

impl RequestBuilder {
    #[must_use]
    pub fn method(mut self, method: Method) -> Self {
        self.method = Some(method);
        self
    }

    #[must_use]
    pub fn path(mut self, path: impl Into<String>) -> Self {
        self.path = Some(path.into());
        self
    }

    #[must_use]
    pub fn params(mut self, params: Option<Params>) -> Self {
        self.params = params;
        self
    }

    /// Merge headers; later values replace earlier ones with the same name
    #[must_use]
    pub fn headers(mut self, headers: &HeaderMap) -> Self {
        for (name, value) in headers {
            self.headers.insert(name.clone(), value.clone());
        }
        self
    }

    #[must_use]
    pub fn body<B: Into<Body>>(mut self, body: B) -> Self {
        self.body = body.into();
        self
    }

    /// Set the body to a JSON-serialized value and add Content-Type header
    ///
    /// # Errors
    /// Returns [`ClientError::Serialization`] if the value cannot be encoded.
    pub fn json<T: serde::Serialize + ?Sized>(mut self, value: &T) -> Result<Self, ClientError> {
        self.body = Body::from_json(value)?;
        self.headers.insert(
            http::header::CONTENT_TYPE,
            HeaderValue::from_static("application/json"),
        );
        Ok(self)
    }

    #[must_use]
    pub fn timeout(mut self, duration: Option<Duration>) -> Self {
        self.timeout = duration;
        self
    }

    /// Build the request
    ///
    /// # Errors
    /// Returns [`ClientError::BuildError`] when no path was given.
    pub fn build(self) -> Result<Request, ClientError> {
        let method = self.method.unwrap_or(Method::GET);
        let path = self
            .path
            .ok_or_else(|| ClientError::BuildError("Request path is required".into()))?;

        Ok(Request {
            method,
            path,
            params: self.params,
            headers: self.headers,
            body: self.body,
            timeout: self.timeout,
        })
    }
}
