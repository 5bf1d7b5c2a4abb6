//! Content-fetch client for the `/V1/` content API
//!
//! Formats URL templates, dispatches GETs through per-verb handler chains
//! and objectifies the response body under a category tag derived from the
//! request path.

pub mod handler;

use std::time::Duration;

use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;

use crate::error::{Error, ErrorKind, Result, Span};
use crate::node::Node;
use crate::objectify::objectify;
use handler::{dispatch, FailureLog, Handler, HttpHandler, Request, TracingFailureLog, Verb};

pub use handler::{RawResponse, DEFAULT_TIMEOUT};

/// Login credentials for the content API
#[derive(Clone, Debug)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

impl Credentials {
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
        }
    }

    /// `Basic base64(user:password)` header value
    pub fn basic_header(&self) -> String {
        let token = STANDARD.encode(format!("{}:{}", self.username, self.password));
        format!("Basic {token}")
    }
}

/// Per-call overrides; the client instance is never mutated by them
#[derive(Clone, Debug, Default)]
pub struct RequestOptions {
    server: Option<String>,
    headers: Option<Vec<(String, String)>>,
}

impl RequestOptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sends this call to a different server
    pub fn server(mut self, server: impl Into<String>) -> Self {
        self.server = Some(server.into());
        self
    }

    /// Replaces the headers for this call
    pub fn headers(mut self, headers: Vec<(String, String)>) -> Self {
        self.headers = Some(headers);
        self
    }
}

/// Blocking client for one server with one set of credentials
///
/// Construction builds the Basic-Auth header once and installs the default
/// HTTP handler on the GET chain. All state is immutable after
/// construction, so a shared instance is safe across threads.
pub struct Client {
    server: String,
    headers: Vec<(String, String)>,
    get_chain: Vec<Box<dyn Handler>>,
    put_chain: Vec<Box<dyn Handler>>,
    post_chain: Vec<Box<dyn Handler>>,
    delete_chain: Vec<Box<dyn Handler>>,
    failure_log: Box<dyn FailureLog>,
}

impl std::fmt::Debug for Client {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Client")
            .field("server", &self.server)
            .field("get_handlers", &self.get_chain.len())
            .finish_non_exhaustive()
    }
}

impl Client {
    /// Creates a client with the default HTTP handler and timeout
    pub fn new(credentials: &Credentials, server: impl Into<String>) -> Self {
        Self::with_timeout(credentials, server, DEFAULT_TIMEOUT)
    }

    /// Creates a client with an explicit timeout on the default handler
    pub fn with_timeout(
        credentials: &Credentials,
        server: impl Into<String>,
        timeout: Duration,
    ) -> Self {
        let mut client = Self::bare(credentials, server);
        client.register_handler(Verb::Get, Box::new(HttpHandler::with_timeout(timeout)));
        client
    }

    /// Creates a client with empty handler chains
    ///
    /// Callers register their own handlers; a GET against a bare client
    /// fails with `HandlersExhausted`.
    pub fn bare(credentials: &Credentials, server: impl Into<String>) -> Self {
        Self {
            server: server.into(),
            headers: vec![("Authorization".to_string(), credentials.basic_header())],
            get_chain: Vec::new(),
            put_chain: Vec::new(),
            post_chain: Vec::new(),
            delete_chain: Vec::new(),
            failure_log: Box::new(TracingFailureLog),
        }
    }

    /// Appends a handler to a verb's chain
    pub fn register_handler(&mut self, verb: Verb, handler: Box<dyn Handler>) {
        self.chain_mut(verb).push(handler);
    }

    /// Replaces the failure log used during dispatch
    pub fn set_failure_log(&mut self, failure_log: Box<dyn FailureLog>) {
        self.failure_log = failure_log;
    }

    /// The configured server
    pub fn server(&self) -> &str {
        &self.server
    }

    /// Fetches and objectifies `template` filled with `params`
    pub fn get(&self, template: &str, params: &[&str]) -> Result<Node> {
        self.get_with(template, params, &RequestOptions::default())
    }

    /// Like [`Self::get`], with per-call overrides
    pub fn get_with(&self, template: &str, params: &[&str], options: &RequestOptions) -> Result<Node> {
        let path = fill_template(template, params)?;
        let category = category_tag(&path)?.to_string();
        let response = self.dispatch(Verb::Get, &path, options)?;
        if !response.is_success() {
            return Err(Error::with_message(
                ErrorKind::UnexpectedStatus {
                    code: response.status,
                },
                Span::empty(),
                format!("GET {path} returned status {}", response.status),
            ));
        }
        objectify(&response.body, &category).map_err(|err| {
            Error::with_source(
                ErrorKind::RequestHandling,
                format!("GET {path} returned an unusable body"),
                err,
            )
        })
    }

    /// Fetches `template` filled with `params` and returns the response
    /// uninterpreted; status handling is up to the caller
    pub fn get_raw(&self, template: &str, params: &[&str]) -> Result<RawResponse> {
        self.get_raw_with(template, params, &RequestOptions::default())
    }

    /// Like [`Self::get_raw`], with per-call overrides
    pub fn get_raw_with(
        &self,
        template: &str,
        params: &[&str],
        options: &RequestOptions,
    ) -> Result<RawResponse> {
        let path = fill_template(template, params)?;
        self.dispatch(Verb::Get, &path, options)
    }

    fn dispatch(&self, verb: Verb, path: &str, options: &RequestOptions) -> Result<RawResponse> {
        let server = options.server.as_deref().unwrap_or(&self.server);
        let headers = options.headers.clone().unwrap_or_else(|| self.headers.clone());
        let request = Request {
            verb,
            url: join_url(server, path),
            headers,
        };
        dispatch(self.chain(verb), &request, self.failure_log.as_ref())
    }

    fn chain(&self, verb: Verb) -> &[Box<dyn Handler>] {
        match verb {
            Verb::Get => &self.get_chain,
            Verb::Put => &self.put_chain,
            Verb::Post => &self.post_chain,
            Verb::Delete => &self.delete_chain,
        }
    }

    fn chain_mut(&mut self, verb: Verb) -> &mut Vec<Box<dyn Handler>> {
        match verb {
            Verb::Get => &mut self.get_chain,
            Verb::Put => &mut self.put_chain,
            Verb::Post => &mut self.post_chain,
            Verb::Delete => &mut self.delete_chain,
        }
    }
}

/// Substitutes `params` positionally into the `{}` placeholders
///
/// An arity mismatch in either direction is an [`ErrorKind::InvalidUrl`].
pub fn fill_template(template: &str, params: &[&str]) -> Result<String> {
    let mut out = String::with_capacity(template.len());
    let mut rest = template;
    let mut used = 0;
    while let Some(at) = rest.find("{}") {
        let (head, tail) = rest.split_at(at);
        out.push_str(head);
        let param = params.get(used).ok_or_else(|| arity_error(template, params.len()))?;
        out.push_str(param);
        used += 1;
        rest = tail.get(2..).unwrap_or_default();
    }
    if used != params.len() {
        return Err(arity_error(template, params.len()));
    }
    out.push_str(rest);
    Ok(out)
}

fn arity_error(template: &str, supplied: usize) -> Error {
    Error::with_message(
        ErrorKind::InvalidUrl,
        Span::empty(),
        format!("template {template:?} does not take {supplied} parameters"),
    )
}

/// Extracts the category tag: the first path segment after `/V1/`
pub fn category_tag(path: &str) -> Result<&str> {
    let after = path.find("/V1/").map(|at| at.saturating_add(4)).and_then(|at| path.get(at..));
    let segment = after
        .map(|rest| rest.split('/').next().unwrap_or_default())
        .unwrap_or_default();
    if segment.is_empty() {
        return Err(Error::with_message(
            ErrorKind::InvalidUrl,
            Span::empty(),
            format!("no /V1/ category segment in {path:?}"),
        ));
    }
    Ok(segment)
}

/// Joins server and path, defaulting to http when no scheme is given
///
/// The original protocol addressed servers as bare `host:port`.
fn join_url(server: &str, path: &str) -> String {
    let trimmed = server.trim_end_matches('/');
    if trimmed.contains("://") {
        format!("{trimmed}{path}")
    } else {
        format!("http://{trimmed}{path}")
    }
}
