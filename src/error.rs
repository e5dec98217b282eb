// Copyright (C) 2026 vipr contributors
//
// Permission is hereby granted, free of charge, to any
// person obtaining a copy of this software and associated
// documentation files (the "Software"), to deal in the
// Software without restriction, including without
// limitation the rights to use, copy, modify, merge,
// publish, distribute, sublicense, and/or sell copies of
// the Software, and to permit persons to whom the Software
// is furnished to do so, subject to the following
// conditions:
//
// The above copyright notice and this permission notice
// shall be included in all copies or substantial portions
// of the Software.
//
// THE SOFTWARE IS PROVIDED "AS IS", WITHOUT WARRANTY OF
// ANY KIND, EXPRESS OR IMPLIED, INCLUDING BUT NOT LIMITED
// TO THE WARRANTIES OF MERCHANTABILITY, FITNESS FOR A
// PARTICULAR PURPOSE AND NONINFRINGEMENT. IN NO EVENT
// SHALL THE AUTHORS OR COPYRIGHT HOLDERS BE LIABLE FOR ANY
// CLAIM, DAMAGES OR OTHER LIABILITY, WHETHER IN AN ACTION
// OF CONTRACT, TORT OR OTHERWISE, ARISING FROM, OUT OF OR
// IN CONNECTION WITH THE SOFTWARE OR THE USE OR OTHER
// DEALINGS IN THE SOFTWARE.

use std::result;

use serde_json;
use thiserror::Error;

/// Every failure the client, the task poller and the volume driver can
/// report.
///
/// Only [`ViprError::Unauthorized`] is retried (once, after logging in
/// again) by [`with_auth_retry`][1]. Everything else travels to the caller
/// untouched.
///
/// [1]: fn.with_auth_retry.html
#[derive(Debug, Error)]
pub enum ViprError {
    #[error("{0}")]
    LibBug(String),
    /// Controller replied with data this library does not understand.
    #[error("{0}")]
    BackendBug(String),
    /// The session token is missing, expired or was rejected (HTTP 401).
    #[error("{0}")]
    Unauthorized(String),
    #[error("{0}")]
    PermissionDenied(String),
    #[error("{0}")]
    NotFound(String),
    #[error("{0}")]
    InvalidArgument(String),
    #[error("{0}")]
    NameConflict(String),
    #[error("{0}")]
    ServiceUnavailable(String),
    /// Any other non-2xx reply.
    #[error("HTTP {status}: {message}")]
    Http { status: u16, message: String },
    /// An asynchronous task ended in the `error` state.
    #[error("Task {op_id} is in ERROR state: {detail}")]
    TaskFailed { op_id: String, detail: String },
    /// Gave up waiting for something the caller required to finish.
    #[error("{0}")]
    TimeOut(String),
    #[error("{0}")]
    TransportCommunication(String),
    #[error("{0}")]
    TransportSerialization(String),
}

pub type Result<T> = result::Result<T, ViprError>;

impl ViprError {
    /// HTTP status code this error was built from, if any.
    pub fn status(&self) -> Option<u16> {
        match *self {
            ViprError::Unauthorized(_) => Some(HTTP_UNAUTHORIZED),
            ViprError::PermissionDenied(_) => Some(HTTP_FORBIDDEN),
            ViprError::NotFound(_) => Some(HTTP_NOT_FOUND),
            ViprError::NameConflict(_) => Some(HTTP_CONFLICT),
            ViprError::ServiceUnavailable(_) => Some(HTTP_UNAVAILABLE),
            ViprError::Http { status, .. } => Some(status),
            _ => None,
        }
    }

    /// Whether logging in again could make the failed call succeed.
    pub fn is_auth_failure(&self) -> bool {
        self.status() == Some(HTTP_UNAUTHORIZED)
    }

    /// Build the error for a non-2xx reply. `body` is whatever the
    /// controller sent back; its service-error document is used for the
    /// message when it parses.
    pub fn from_status(status: u16, body: &str) -> ViprError {
        let msg = match serde_json::from_str::<ServiceErrorBody>(body) {
            Ok(e) => e.message(status),
            Err(_) if body.trim().is_empty() => {
                format!("HTTP status {} with empty reply", status)
            }
            Err(_) => body.trim().to_string(),
        };
        match status {
            HTTP_BAD_REQUEST => ViprError::InvalidArgument(msg),
            HTTP_UNAUTHORIZED => ViprError::Unauthorized(msg),
            HTTP_FORBIDDEN => ViprError::PermissionDenied(msg),
            HTTP_NOT_FOUND => ViprError::NotFound(msg),
            HTTP_CONFLICT => ViprError::NameConflict(msg),
            HTTP_UNAVAILABLE => ViprError::ServiceUnavailable(msg),
            _ => ViprError::Http {
                status,
                message: msg,
            },
        }
    }

    /// Prefix the message with `context`, keeping the variant so that
    /// callers can still match on the failure class.
    pub fn context(self, context: &str) -> ViprError {
        let wrap = |m: String| format!("{}: {}", context, m);
        match self {
            ViprError::LibBug(m) => ViprError::LibBug(wrap(m)),
            ViprError::BackendBug(m) => ViprError::BackendBug(wrap(m)),
            ViprError::Unauthorized(m) => ViprError::Unauthorized(wrap(m)),
            ViprError::PermissionDenied(m) => {
                ViprError::PermissionDenied(wrap(m))
            }
            ViprError::NotFound(m) => ViprError::NotFound(wrap(m)),
            ViprError::InvalidArgument(m) => {
                ViprError::InvalidArgument(wrap(m))
            }
            ViprError::NameConflict(m) => ViprError::NameConflict(wrap(m)),
            ViprError::ServiceUnavailable(m) => {
                ViprError::ServiceUnavailable(wrap(m))
            }
            ViprError::Http { status, message } => ViprError::Http {
                status,
                message: wrap(message),
            },
            ViprError::TaskFailed { op_id, detail } => ViprError::TaskFailed {
                op_id,
                detail: wrap(detail),
            },
            ViprError::TimeOut(m) => ViprError::TimeOut(wrap(m)),
            ViprError::TransportCommunication(m) => {
                ViprError::TransportCommunication(wrap(m))
            }
            ViprError::TransportSerialization(m) => {
                ViprError::TransportSerialization(wrap(m))
            }
        }
    }
}

impl From<::reqwest::Error> for ViprError {
    fn from(e: ::reqwest::Error) -> Self {
        if e.is_timeout() {
            ViprError::TimeOut(format!("HTTP request timed out: {}", e))
        } else {
            ViprError::TransportCommunication(format!("{}", e))
        }
    }
}

impl From<::serde_json::Error> for ViprError {
    fn from(e: ::serde_json::Error) -> Self {
        ViprError::TransportSerialization(format!(
            "Failed to convert controller reply to vipr struct: {}",
            e
        ))
    }
}

impl From<::url::ParseError> for ViprError {
    fn from(e: ::url::ParseError) -> Self {
        ViprError::InvalidArgument(format!("Failed to parse URL: {}", e))
    }
}

impl From<::regex::Error> for ViprError {
    fn from(e: ::regex::Error) -> Self {
        ViprError::LibBug(format!("Regex error: {}", e))
    }
}

impl From<::reqwest::header::ToStrError> for ViprError {
    fn from(e: ::reqwest::header::ToStrError) -> Self {
        ViprError::BackendBug(format!("Invalid HTTP header value: {}", e))
    }
}

pub(crate) const HTTP_BAD_REQUEST: u16 = 400;
pub(crate) const HTTP_UNAUTHORIZED: u16 = 401;
pub(crate) const HTTP_FORBIDDEN: u16 = 403;
pub(crate) const HTTP_NOT_FOUND: u16 = 404;
pub(crate) const HTTP_CONFLICT: u16 = 409;
pub(crate) const HTTP_UNAVAILABLE: u16 = 503;

/// Error document the controller attaches to non-2xx replies.
#[derive(Deserialize, Debug, Default)]
pub(crate) struct ServiceErrorBody {
    pub(crate) code: Option<i64>,
    pub(crate) description: Option<String>,
    pub(crate) details: Option<String>,
    #[serde(default)]
    pub(crate) retryable: bool,
}

impl ServiceErrorBody {
    fn message(&self, status: u16) -> String {
        let mut msg = match (&self.description, &self.details) {
            (Some(desc), Some(det)) => format!("{}: {}", desc, det),
            (Some(desc), None) => desc.to_string(),
            (None, Some(det)) => det.to_string(),
            (None, None) => format!("HTTP status {}", status),
        };
        if let Some(code) = self.code {
            msg = format!("{} (service code {})", msg, code);
        }
        if self.retryable {
            msg.push_str(", retryable");
        }
        msg
    }
}
