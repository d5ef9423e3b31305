// Copyright (C) Hygon Info Technologies Ltd.
//
// SPDX-License-Identifier: Apache-2.0
//

//! Error and status types shared by every public entry point.
//!
//! Errors never unwind across the crate boundary: the status wrappers in
//! [`crate::verify`] convert them (and any stray panic) into a [`Status`].

use std::fmt;

use serde::{Deserialize, Serialize};

/// Coarse error classes surfaced in [`Status::code`].
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
#[repr(i32)]
pub enum ErrorCode {
    Success = 0,
    /// Malformed inputs the caller can fix: unknown platform tag, wrong
    /// report version or report type.
    ArgumentError = 1,
    /// Well-formed JSON that is structurally invalid: wrong quote length,
    /// Base64 decode failure, missing required field.
    InvalidFormat = 2,
    /// Cryptographic failures, vendor-library errors, quote under-reads and
    /// policy mismatches.
    InternalError = 3,
}

#[derive(Debug)]
pub enum Error {
    Argument(String),
    Format(String),
    Internal { message: String, details: String },
    /// A signature or MAC did not check out.
    BadSignature,
    Io(std::io::Error),
    Ssl(openssl::error::ErrorStack),
    Json(serde_json::Error),
    Base64(base64::DecodeError),
    Http(hyper::Error),
    Uri(hyper::http::uri::InvalidUri),
}

pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    pub fn code(&self) -> ErrorCode {
        match self {
            Error::Argument(_) => ErrorCode::ArgumentError,
            Error::Format(_) | Error::Json(_) | Error::Base64(_) => ErrorCode::InvalidFormat,
            Error::Internal { .. }
            | Error::BadSignature
            | Error::Io(_)
            | Error::Ssl(_)
            | Error::Http(_)
            | Error::Uri(_) => ErrorCode::InternalError,
        }
    }

    /// Internal error whose `details` equal its message.
    pub(crate) fn internal(message: impl Into<String>) -> Self {
        let message = message.into();
        let details = message.clone();
        Error::Internal { message, details }
    }

    /// Internal error tagged with the verification step it occurred in.
    pub(crate) fn step(step: &str, message: impl Into<String>) -> Self {
        let message = message.into();
        let details = format!("{}: {}", step, message);
        Error::Internal { message, details }
    }

    /// Re-tag a lower-level failure with the step it occurred in.
    pub(crate) fn in_step(step: &str, err: Error) -> Self {
        Error::step(step, err.to_string())
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::Argument(msg) => write!(f, "{}", msg),
            Error::Format(msg) => write!(f, "{}", msg),
            Error::Internal { message, .. } => write!(f, "{}", message),
            Error::BadSignature => write!(f, "bad signature"),
            Error::Io(e) => write!(f, "io error: {}", e),
            Error::Ssl(e) => write!(f, "openssl error: {}", e),
            Error::Json(e) => write!(f, "json error: {}", e),
            Error::Base64(e) => write!(f, "base64 decode error: {}", e),
            Error::Http(e) => write!(f, "http error: {}", e),
            Error::Uri(e) => write!(f, "invalid uri: {}", e),
        }
    }
}

impl std::error::Error for Error {}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        Error::Io(err)
    }
}

impl From<openssl::error::ErrorStack> for Error {
    fn from(err: openssl::error::ErrorStack) -> Self {
        Error::Ssl(err)
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::Json(err)
    }
}

impl From<base64::DecodeError> for Error {
    fn from(err: base64::DecodeError) -> Self {
        Error::Base64(err)
    }
}

impl From<hyper::Error> for Error {
    fn from(err: hyper::Error) -> Self {
        Error::Http(err)
    }
}

impl From<hyper::http::uri::InvalidUri> for Error {
    fn from(err: hyper::http::uri::InvalidUri) -> Self {
        Error::Uri(err)
    }
}

impl From<std::array::TryFromSliceError> for Error {
    fn from(_: std::array::TryFromSliceError) -> Self {
        Error::Format("slice length mismatch".to_string())
    }
}

/// Outcome of a verification call.
///
/// `code` 0 means success; otherwise `message` is a short reason and
/// `details` the long-form diagnostic (failing chain step, or one line per
/// policy entry).
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Status {
    pub code: i32,
    pub message: String,
    pub details: String,
}

impl Status {
    pub fn ok() -> Self {
        Status {
            code: ErrorCode::Success as i32,
            message: "success".to_string(),
            details: String::new(),
        }
    }

    pub fn is_success(&self) -> bool {
        self.code == ErrorCode::Success as i32
    }
}

impl From<Error> for Status {
    fn from(err: Error) -> Self {
        let details = match &err {
            Error::Internal { details, .. } => details.clone(),
            _ => String::new(),
        };
        Status {
            code: err.code() as i32,
            message: err.to_string(),
            details,
        }
    }
}
