//! Pluggable request handlers and the failure-log capability

use std::time::Duration;

use tracing::warn;

use crate::error::{Error, ErrorKind, Result, Span};

/// HTTP verb a handler chain is registered for
///
/// Only GET is exercised by the content API today; the rest are
/// structurally anticipated.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Verb {
    Get,
    Put,
    Post,
    Delete,
}

impl Verb {
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Get => "GET",
            Self::Put => "PUT",
            Self::Post => "POST",
            Self::Delete => "DELETE",
        }
    }
}

impl std::fmt::Display for Verb {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One outgoing request, fully resolved before dispatch
#[derive(Clone, Debug)]
pub struct Request {
    pub verb: Verb,
    /// Absolute URL, server already joined with the formatted path
    pub url: String,
    pub headers: Vec<(String, String)>,
}

/// An uninterpreted response: status, headers and body as received
#[derive(Clone, Debug)]
pub struct RawResponse {
    pub status: u16,
    pub headers: Vec<(String, String)>,
    pub body: Vec<u8>,
}

impl RawResponse {
    /// Returns true for a 2xx status
    pub const fn is_success(&self) -> bool {
        self.status >= 200 && self.status < 300
    }

    /// First header with the given name, compared case-insensitively
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    /// Body decoded as UTF-8
    pub fn body_str(&self) -> Result<&str> {
        std::str::from_utf8(&self.body).map_err(|err| {
            Error::with_source(ErrorKind::RequestHandling, "response body is not utf-8", err)
        })
    }
}

/// One request handler in a verb's chain
///
/// Handlers are tried in registration order; the first success wins. A
/// handler failure is reported once through the chain's [`FailureLog`]
/// before the next handler is tried.
pub trait Handler: Send + Sync {
    /// Name used in dispatch diagnostics
    fn name(&self) -> &str;

    /// Performs the request
    fn call(&self, request: &Request) -> Result<RawResponse>;
}

/// Receives one report per failed handler during dispatch
pub trait FailureLog: Send + Sync {
    fn log(&self, error: &Error);
}

/// Default failure log, routing to the tracing facade
#[derive(Clone, Copy, Debug, Default)]
pub struct TracingFailureLog;

impl FailureLog for TracingFailureLog {
    fn log(&self, error: &Error) {
        warn!(%error, "request handler failed");
    }
}

/// Default timeout for the built-in HTTP handler
///
/// The wire protocol defines none; without one a GET can hang forever.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Blocking HTTP handler backed by a ureq agent
#[derive(Debug)]
pub struct HttpHandler {
    agent: ureq::Agent,
}

impl HttpHandler {
    /// Creates a handler with [`DEFAULT_TIMEOUT`]
    pub fn new() -> Self {
        Self::with_timeout(DEFAULT_TIMEOUT)
    }

    /// Creates a handler with an explicit connect/overall timeout
    pub fn with_timeout(timeout: Duration) -> Self {
        let agent = ureq::AgentBuilder::new()
            .timeout_connect(timeout)
            .timeout(timeout)
            .build();
        Self { agent }
    }
}

impl Default for HttpHandler {
    fn default() -> Self {
        Self::new()
    }
}

impl Handler for HttpHandler {
    fn name(&self) -> &str {
        "http"
    }

    fn call(&self, request: &Request) -> Result<RawResponse> {
        let mut req = self.agent.request(request.verb.as_str(), &request.url);
        for (name, value) in &request.headers {
            req = req.set(name, value);
        }

        let response = match req.call() {
            Ok(response) => response,
            // Non-2xx is still a response; status handling is the caller's
            // decision, raw callers inspect it directly.
            Err(ureq::Error::Status(_, response)) => response,
            Err(err) => {
                return Err(Error::with_source(
                    ErrorKind::RequestHandling,
                    format!("{} {} failed", request.verb, request.url),
                    err,
                ));
            }
        };

        let status = response.status();
        let headers = response
            .headers_names()
            .into_iter()
            .filter_map(|name| {
                response
                    .header(&name)
                    .map(|value| (name.clone(), value.to_string()))
            })
            .collect();

        let mut body = Vec::new();
        use std::io::Read as _;
        response
            .into_reader()
            .read_to_end(&mut body)
            .map_err(|err| {
                Error::with_source(ErrorKind::RequestHandling, "failed to read response body", err)
            })?;

        Ok(RawResponse {
            status,
            headers,
            body,
        })
    }
}

/// Dispatches a request through an ordered handler chain
///
/// Every failure is logged exactly once; when no handler succeeds the
/// aggregate [`ErrorKind::HandlersExhausted`] is returned rather than an
/// implicit empty result.
pub(crate) fn dispatch(
    handlers: &[Box<dyn Handler>],
    request: &Request,
    failure_log: &dyn FailureLog,
) -> Result<RawResponse> {
    let mut attempts = 0;
    for handler in handlers {
        match handler.call(request) {
            Ok(response) => return Ok(response),
            Err(error) => {
                attempts += 1;
                failure_log.log(&error);
            }
        }
    }
    Err(Error::with_message(
        ErrorKind::HandlersExhausted { attempts },
        Span::empty(),
        format!(
            "all {attempts} {} handlers failed for {}",
            request.verb, request.url
        ),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    struct CannedHandler {
        body: &'static str,
    }

    impl Handler for CannedHandler {
        fn name(&self) -> &str {
            "canned"
        }

        fn call(&self, _request: &Request) -> Result<RawResponse> {
            Ok(RawResponse {
                status: 200,
                headers: Vec::new(),
                body: self.body.as_bytes().to_vec(),
            })
        }
    }

    struct FailingHandler;

    impl Handler for FailingHandler {
        fn name(&self) -> &str {
            "failing"
        }

        fn call(&self, _request: &Request) -> Result<RawResponse> {
            Err(Error::with_message(
                ErrorKind::RequestHandling,
                Span::empty(),
                "connection refused",
            ))
        }
    }

    #[derive(Default)]
    struct RecordingLog {
        messages: Mutex<Vec<String>>,
    }

    impl FailureLog for RecordingLog {
        fn log(&self, error: &Error) {
            self.messages
                .lock()
                .expect("log mutex poisoned")
                .push(error.to_string());
        }
    }

    fn request() -> Request {
        Request {
            verb: Verb::Get,
            url: "http://server/V1/CATEGORIES/".to_string(),
            headers: Vec::new(),
        }
    }

    #[test]
    fn test_first_success_wins() {
        static CALLS: AtomicUsize = AtomicUsize::new(0);

        struct Counting;
        impl Handler for Counting {
            fn name(&self) -> &str {
                "counting"
            }
            fn call(&self, _request: &Request) -> Result<RawResponse> {
                CALLS.fetch_add(1, Ordering::SeqCst);
                Ok(RawResponse {
                    status: 200,
                    headers: Vec::new(),
                    body: Vec::new(),
                })
            }
        }

        let handlers: Vec<Box<dyn Handler>> = vec![
            Box::new(CannedHandler { body: "first" }),
            Box::new(Counting),
        ];
        let log = RecordingLog::default();
        let response = dispatch(&handlers, &request(), &log).expect("dispatch failed");
        assert_eq!(response.body, b"first");
        assert_eq!(CALLS.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_failure_logged_once_then_next_handler() {
        let handlers: Vec<Box<dyn Handler>> = vec![
            Box::new(FailingHandler),
            Box::new(CannedHandler { body: "second" }),
        ];
        let log = RecordingLog::default();
        let response = dispatch(&handlers, &request(), &log).expect("dispatch failed");
        assert_eq!(response.body, b"second");
        let messages = log.messages.lock().expect("log mutex poisoned");
        assert_eq!(messages.len(), 1);
        assert!(messages[0].contains("connection refused"));
    }

    #[test]
    fn test_exhausted_chain_is_explicit() {
        let handlers: Vec<Box<dyn Handler>> =
            vec![Box::new(FailingHandler), Box::new(FailingHandler)];
        let log = RecordingLog::default();
        let err = dispatch(&handlers, &request(), &log).unwrap_err();
        assert_eq!(err.kind(), &ErrorKind::HandlersExhausted { attempts: 2 });
        assert_eq!(log.messages.lock().expect("log mutex poisoned").len(), 2);
    }

    #[test]
    fn test_empty_chain_is_exhausted_with_zero_attempts() {
        let log = RecordingLog::default();
        let err = dispatch(&[], &request(), &log).unwrap_err();
        assert_eq!(err.kind(), &ErrorKind::HandlersExhausted { attempts: 0 });
    }

    #[test]
    fn test_raw_response_helpers() {
        let response = RawResponse {
            status: 204,
            headers: vec![("Content-Type".to_string(), "text/xml".to_string())],
            body: b"ok".to_vec(),
        };
        assert!(response.is_success());
        assert_eq!(response.header("content-type"), Some("text/xml"));
        assert_eq!(response.body_str().expect("utf-8"), "ok");

        let failed = RawResponse {
            status: 404,
            headers: Vec::new(),
            body: Vec::new(),
        };
        assert!(!failed.is_success());
    }
}
