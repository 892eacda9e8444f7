//! Incoming HTTP request type.

use std::collections::HashMap;

use http::Method;
use url::form_urlencoded;

/// An incoming HTTP request.
///
/// The query string is kept twice: verbatim (as the client sent it) and
/// decoded into ordered `(key, value)` pairs. Middleware that edits one keeps
/// the other in step.
pub struct Request {
    pub(crate) method: Method,
    pub(crate) path: String,
    pub(crate) query_string: String,
    pub(crate) query: Vec<(String, String)>,
    pub(crate) headers: Vec<(String, String)>,
    pub(crate) body: Vec<u8>,
    pub(crate) params: HashMap<String, String>,
}

impl Request {
    /// Builds a request for `uri` (path plus optional `?query`).
    ///
    /// ```rust
    /// use tsu_pjax::Request;
    /// use http::Method;
    ///
    /// let req = Request::new(Method::GET, "/articles/?page=2")
    ///     .with_header("x-pjax", "true");
    /// assert_eq!(req.path(), "/articles/");
    /// assert_eq!(req.query_param("page"), Some("2"));
    /// assert!(req.is_pjax());
    /// ```
    pub fn new(method: Method, uri: &str) -> Self {
        let (path, query_string) = match uri.split_once('?') {
            Some((path, query)) => (path, query),
            None => (uri, ""),
        };
        Self {
            method,
            path: path.to_owned(),
            query_string: query_string.to_owned(),
            query: decode_query(query_string),
            headers: Vec::new(),
            body: Vec::new(),
            params: HashMap::new(),
        }
    }

    pub fn with_header(mut self, name: &str, value: &str) -> Self {
        self.headers.push((name.to_owned(), value.to_owned()));
        self
    }

    pub fn with_body(mut self, body: impl Into<Vec<u8>>) -> Self {
        self.body = body.into();
        self
    }

    pub(crate) fn from_http(parts: http::request::Parts, body: Vec<u8>) -> Self {
        let query_string = parts.uri.query().unwrap_or_default().to_owned();
        let headers = parts.headers.iter()
            .filter_map(|(k, v)| Some((k.as_str().to_owned(), v.to_str().ok()?.to_owned())))
            .collect();
        Self {
            method: parts.method,
            path: parts.uri.path().to_owned(),
            query: decode_query(&query_string),
            query_string,
            headers,
            body,
            params: HashMap::new(),
        }
    }

    pub fn method(&self) -> &Method { &self.method }
    pub fn path(&self) -> &str { &self.path }
    pub fn headers(&self) -> &[(String, String)] { &self.headers }
    pub fn body(&self) -> &[u8] { &self.body }

    /// The raw query string, without the leading `?`.
    pub fn query_string(&self) -> &str { &self.query_string }

    /// Decoded query parameters in the order they were sent.
    pub fn query(&self) -> &[(String, String)] { &self.query }

    /// First value of a decoded query parameter.
    pub fn query_param(&self, key: &str) -> Option<&str> {
        self.query.iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    /// Case-insensitive header lookup.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    /// Returns a named path parameter.
    ///
    /// For a route `/users/{id}`, `req.param("id")` on `/users/42` returns `Some("42")`.
    pub fn param(&self, key: &str) -> Option<&str> {
        self.params.get(key).map(String::as_str)
    }

    /// `true` when the client asked for a page fragment rather than a full page.
    pub fn is_pjax(&self) -> bool {
        self.header(crate::pjax::PJAX_HEADER).is_some_and(|v| !v.is_empty())
    }

    /// A copy of everything but the body, kept by the router for the
    /// response leg after the handler has consumed the request.
    pub(crate) fn head(&self) -> Self {
        Self {
            method: self.method.clone(),
            path: self.path.clone(),
            query_string: self.query_string.clone(),
            query: self.query.clone(),
            headers: self.headers.clone(),
            body: Vec::new(),
            params: self.params.clone(),
        }
    }

    /// Drops every query parameter named `key`, from both the decoded pairs and
    /// the raw query string. Returns `true` if anything was removed.
    pub(crate) fn remove_query_param(&mut self, key: &str) -> bool {
        let before = self.query.len();
        self.query.retain(|(k, _)| k != key);
        if self.query.len() == before {
            return false;
        }
        self.query_string = self.query_string
            .split('&')
            .filter(|pair| {
                let raw_key = pair.split('=').next().unwrap_or_default();
                form_urlencoded::parse(raw_key.as_bytes())
                    .next()
                    .is_none_or(|(k, _)| k != key)
            })
            .collect::<Vec<_>>()
            .join("&");
        true
    }
}

fn decode_query(query: &str) -> Vec<(String, String)> {
    form_urlencoded::parse(query.as_bytes()).into_owned().collect()
}
