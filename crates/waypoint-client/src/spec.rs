//! Declarative descriptors for remote operations.
//!
//! A [`CallSpec`] is a `const`-constructible description of one remote
//! operation: path template, HTTP method, declared parameter names, response
//! shape, and body source. The client marshals requests and decodes
//! responses from this metadata alone; there is no runtime reflection.

/// HTTP method of a declared operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    Get,
    Post,
    Put,
    Patch,
    Delete,
}

impl Method {
    /// POST/PUT/PATCH conventionally carry a JSON body; GET/DELETE carry
    /// their payload as a query string.
    pub(crate) fn carries_body(self) -> bool {
        matches!(self, Method::Post | Method::Put | Method::Patch)
    }

    pub(crate) fn as_reqwest(self) -> reqwest::Method {
        match self {
            Method::Get => reqwest::Method::GET,
            Method::Post => reqwest::Method::POST,
            Method::Put => reqwest::Method::PUT,
            Method::Patch => reqwest::Method::PATCH,
            Method::Delete => reqwest::Method::DELETE,
        }
    }
}

/// Statically declared shape of a successful response payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResponseShape {
    /// A single JSON object decoding into one structured value.
    Item,
    /// A JSON array whose elements decode into structured values, in order.
    List,
    /// Raw JSON value, passed through unconverted.
    Raw,
}

/// Where the payload mapping comes from.
///
/// The declared property replaces the ambiguous "a lone structured argument
/// supersedes loose scalars" inference: call sites say which behavior they
/// want, and a `SingleArg` spec invoked with anything other than exactly one
/// structured argument is a configuration error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BodySource {
    /// Flatten every non-placeholder argument into one `{name: value}` map.
    MergedArgs,
    /// Exactly one non-placeholder argument, serializing to a JSON object;
    /// its fields become the payload verbatim (never nested under the
    /// argument's name).
    SingleArg,
}

/// Declarative metadata for one remote operation.
#[derive(Debug, Clone, Copy)]
pub struct CallSpec {
    method: Method,
    path: &'static str,
    params: &'static [&'static str],
    response: Option<ResponseShape>,
    body: BodySource,
}

impl CallSpec {
    pub const fn new(method: Method, path: &'static str) -> Self {
        Self {
            method,
            path,
            params: &[],
            response: None,
            body: BodySource::MergedArgs,
        }
    }

    /// Declare the parameter names, in declaration order.
    pub const fn params(mut self, params: &'static [&'static str]) -> Self {
        self.params = params;
        self
    }

    /// Declare the response shape. A spec without one is unusable: the shape
    /// drives both request construction and decoding.
    pub const fn returns(mut self, shape: ResponseShape) -> Self {
        self.response = Some(shape);
        self
    }

    /// Take the payload from a single structured argument instead of merging
    /// loose arguments.
    pub const fn body_from_single_arg(mut self) -> Self {
        self.body = BodySource::SingleArg;
        self
    }

    pub fn method(&self) -> Method {
        self.method
    }

    pub fn path(&self) -> &'static str {
        self.path
    }

    pub fn param_names(&self) -> &'static [&'static str] {
        self.params
    }

    pub fn response_shape(&self) -> Option<ResponseShape> {
        self.response
    }

    pub fn body_source(&self) -> BodySource {
        self.body
    }
}
