//! Response model: the result-or-failure value an executor produces.
//!
//! The dispatcher never looks inside a response; it only decides whether
//! to deliver it. Everything here exists for listeners.

use serde::{Deserialize, Serialize};

use super::errors::ExecuteError;
use super::request::Request;

/// Response headers as reported by the transport.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Headers {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    response_code: Option<u16>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    entries: Vec<(String, String)>,
}

impl Headers {
    pub fn new(response_code: u16) -> Self {
        Self {
            response_code: Some(response_code),
            entries: Vec::new(),
        }
    }

    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.entries.push((name.into(), value.into()));
        self
    }

    pub fn response_code(&self) -> Option<u16> {
        self.response_code
    }

    /// First value for `name`, compared case-insensitively.
    pub fn get(&self, name: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(n, _)| n.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(n, v)| (n.as_str(), v.as_str()))
    }
}

/// A successful execution.
#[derive(Debug, Clone, PartialEq)]
pub struct Success {
    pub url: String,
    pub payload: serde_json::Value,
    pub headers: Headers,
    pub network_millis: u64,
}

impl Success {
    pub fn new(url: impl Into<String>, payload: serde_json::Value) -> Self {
        Self {
            url: url.into(),
            payload,
            headers: Headers::default(),
            network_millis: 0,
        }
    }

    pub fn with_headers(mut self, headers: Headers) -> Self {
        self.headers = headers;
        self
    }

    pub fn with_network_millis(mut self, millis: u64) -> Self {
        self.network_millis = millis;
        self
    }
}

/// A failed execution, with everything `ResponseListener::on_failed` reports.
#[derive(Debug, Clone, PartialEq)]
pub struct Failure {
    pub url: Option<String>,
    pub tag: Option<serde_json::Value>,
    pub cause: ExecuteError,
    /// HTTP status, or [`Failure::UNKNOWN_STATUS`] when the transport never got one.
    pub status_code: i32,
    pub network_millis: u64,
}

impl Failure {
    /// Status code reported when no response headers were received.
    pub const UNKNOWN_STATUS: i32 = -1;

    pub fn new(cause: ExecuteError) -> Self {
        Self {
            url: None,
            tag: None,
            cause,
            status_code: Self::UNKNOWN_STATUS,
            network_millis: 0,
        }
    }

    /// Failure pre-filled with the request's url and tag.
    pub fn for_request(request: &Request, cause: ExecuteError) -> Self {
        Self {
            url: Some(request.url().to_string()),
            tag: request.tag().cloned(),
            ..Self::new(cause)
        }
    }

    /// Stand-in for an executor that returned nothing.
    ///
    /// url and tag are absent, status code and elapsed time are both zero.
    pub fn unknown_abnormal() -> Self {
        Self {
            status_code: 0,
            ..Self::new(ExecuteError::UnknownAbnormal)
        }
    }

    /// Take the status code from headers; absent code keeps the sentinel.
    pub fn with_headers(mut self, headers: &Headers) -> Self {
        self.status_code = headers
            .response_code()
            .map_or(Self::UNKNOWN_STATUS, i32::from);
        self
    }

    pub fn with_status_code(mut self, status_code: i32) -> Self {
        self.status_code = status_code;
        self
    }

    pub fn with_network_millis(mut self, millis: u64) -> Self {
        self.network_millis = millis;
        self
    }
}

/// Result-or-failure of one execution.
#[derive(Debug, Clone, PartialEq)]
pub enum Response {
    Succeeded(Success),
    Failed(Failure),
}

impl Response {
    pub fn is_succeeded(&self) -> bool {
        matches!(self, Response::Succeeded(_))
    }

    pub fn network_millis(&self) -> u64 {
        match self {
            Response::Succeeded(s) => s.network_millis,
            Response::Failed(f) => f.network_millis,
        }
    }
}

impl From<Success> for Response {
    fn from(success: Success) -> Self {
        Response::Succeeded(success)
    }
}

impl From<Failure> for Response {
    fn from(failure: Failure) -> Self {
        Response::Failed(failure)
    }
}
