//! # Errors
//!
//! A structured error taxonomy for the campus backend.
//! Core goals:
//! - every failure has a machine-distinguishable kind and a human message
//! - errors travel inside `anyhow::Error` through the service layers
//! - transport-agnostic (the HTTP adapter decides how to serialize)

use std::fmt;

use anyhow::Error as AnyError;
use serde_json::Value;

/// Error kinds with their HTTP status codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    BadRequest,          // 400
    UnroutableResource,  // 400
    InvalidCredentials,  // 401
    AccessBlocked,       // 403
    NotFound,            // 404
    ConstraintViolation, // 409
    SerializationError,  // 422
    GeneralError,        // 500
    SchemaUnavailable,   // 500
    StorageFailure,      // 500
    NotImplemented,      // 501
    Unavailable,         // 503
}

impl ErrorKind {
    pub fn status_code(&self) -> u16 {
        match self {
            ErrorKind::BadRequest => 400,
            ErrorKind::UnroutableResource => 400,
            ErrorKind::InvalidCredentials => 401,
            ErrorKind::AccessBlocked => 403,
            ErrorKind::NotFound => 404,
            ErrorKind::ConstraintViolation => 409,
            ErrorKind::SerializationError => 422,
            ErrorKind::GeneralError => 500,
            ErrorKind::SchemaUnavailable => 500,
            ErrorKind::StorageFailure => 500,
            ErrorKind::NotImplemented => 501,
            ErrorKind::Unavailable => 503,
        }
    }

    /// Kind name as it appears on the wire (e.g. "AccessBlocked").
    pub fn name(&self) -> &'static str {
        match self {
            ErrorKind::BadRequest => "BadRequest",
            ErrorKind::UnroutableResource => "UnroutableResource",
            ErrorKind::InvalidCredentials => "InvalidCredentials",
            ErrorKind::AccessBlocked => "AccessBlocked",
            ErrorKind::NotFound => "NotFound",
            ErrorKind::ConstraintViolation => "ConstraintViolation",
            ErrorKind::SerializationError => "SerializationError",
            ErrorKind::GeneralError => "GeneralError",
            ErrorKind::SchemaUnavailable => "SchemaUnavailable",
            ErrorKind::StorageFailure => "StorageFailure",
            ErrorKind::NotImplemented => "NotImplemented",
            ErrorKind::Unavailable => "Unavailable",
        }
    }

    /// Kebab-cased class name.
    pub fn class_name(&self) -> &'static str {
        match self {
            ErrorKind::BadRequest => "bad-request",
            ErrorKind::UnroutableResource => "unroutable-resource",
            ErrorKind::InvalidCredentials => "invalid-credentials",
            ErrorKind::AccessBlocked => "access-blocked",
            ErrorKind::NotFound => "not-found",
            ErrorKind::ConstraintViolation => "constraint-violation",
            ErrorKind::SerializationError => "serialization-error",
            ErrorKind::GeneralError => "general-error",
            ErrorKind::SchemaUnavailable => "schema-unavailable",
            ErrorKind::StorageFailure => "storage-failure",
            ErrorKind::NotImplemented => "not-implemented",
            ErrorKind::Unavailable => "unavailable",
        }
    }
}

/// A structured campus error that can live inside `anyhow::Error`.
#[derive(Debug)]
pub struct CampusError {
    pub kind: ErrorKind,
    pub message: String,
    pub data: Option<Value>,
    pub source: Option<AnyError>,
}

impl CampusError {
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            data: None,
            source: None,
        }
    }

    pub fn with_data(mut self, data: Value) -> Self {
        self.data = Some(data);
        self
    }

    pub fn with_source(mut self, source: AnyError) -> Self {
        self.source = Some(source);
        self
    }

    pub fn code(&self) -> u16 {
        self.kind.status_code()
    }

    pub fn name(&self) -> &'static str {
        self.kind.name()
    }

    pub fn class_name(&self) -> &'static str {
        self.kind.class_name()
    }

    /// Convert into `anyhow::Error` so it flows through the service layers.
    pub fn into_anyhow(self) -> AnyError {
        AnyError::new(self)
    }

    /// Find a `CampusError` anywhere in an `anyhow::Error` chain.
    pub fn from_anyhow(err: &AnyError) -> Option<&CampusError> {
        err.chain().find_map(|e| e.downcast_ref::<CampusError>())
    }

    /// Kind of an arbitrary error; `GeneralError` when it is not a `CampusError`.
    pub fn kind_of(err: &AnyError) -> ErrorKind {
        Self::from_anyhow(err)
            .map(|e| e.kind)
            .unwrap_or(ErrorKind::GeneralError)
    }

    /// Turn any error into a CampusError:
    /// - if it is already a CampusError, keep it (lossless)
    /// - otherwise wrap as GeneralError
    pub fn normalize(err: AnyError) -> CampusError {
        match err.downcast::<CampusError>() {
            Ok(campus) => campus,
            Err(other) => {
                CampusError::new(ErrorKind::GeneralError, other.to_string()).with_source(other)
            }
        }
    }

    /// A copy suitable for returning to clients: the inner `source` is dropped.
    pub fn sanitize_for_client(&self) -> CampusError {
        CampusError {
            kind: self.kind,
            message: self.message.clone(),
            data: self.data.clone(),
            source: None,
        }
    }

    /// Wire payload: `{success: false, name, message, code, className, data?}`.
    pub fn to_json(&self) -> Value {
        use serde_json::json;

        let mut base = json!({
            "success": false,
            "name": self.name(),
            "message": self.message,
            "code": self.code(),
            "className": self.class_name(),
        });

        if let Some(d) = &self.data {
            base["data"] = d.clone();
        }
        base
    }

    // ---- Constructors ----

    pub fn bad_request(msg: impl Into<String>) -> Self {
        Self::new(ErrorKind::BadRequest, msg)
    }
    pub fn unroutable(msg: impl Into<String>) -> Self {
        Self::new(ErrorKind::UnroutableResource, msg)
    }
    pub fn invalid_credentials(msg: impl Into<String>) -> Self {
        Self::new(ErrorKind::InvalidCredentials, msg)
    }
    pub fn access_blocked(msg: impl Into<String>) -> Self {
        Self::new(ErrorKind::AccessBlocked, msg)
    }
    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::new(ErrorKind::NotFound, msg)
    }
    pub fn constraint_violation(msg: impl Into<String>) -> Self {
        Self::new(ErrorKind::ConstraintViolation, msg)
    }
    pub fn serialization(msg: impl Into<String>) -> Self {
        Self::new(ErrorKind::SerializationError, msg)
    }
    pub fn general_error(msg: impl Into<String>) -> Self {
        Self::new(ErrorKind::GeneralError, msg)
    }
    pub fn schema_unavailable(msg: impl Into<String>) -> Self {
        Self::new(ErrorKind::SchemaUnavailable, msg)
    }
    pub fn not_implemented(msg: impl Into<String>) -> Self {
        Self::new(ErrorKind::NotImplemented, msg)
    }
    pub fn unavailable(msg: impl Into<String>) -> Self {
        Self::new(ErrorKind::Unavailable, msg)
    }
}

impl fmt::Display for CampusError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({}): {}", self.name(), self.code(), self.message)
    }
}

impl std::error::Error for CampusError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.source
            .as_ref()
            .map(|e| e.as_ref() as &(dyn std::error::Error + 'static))
    }
}
