//! DynamoDB error types.
//!
//! DynamoDB errors carry a short error code (the suffix of the `__type` field
//! on the wire) and a human-readable message. Errors that never reached the
//! service, such as connection failures, use [`DynamoDBErrorCode::Transport`].

use std::fmt;

/// Well-known DynamoDB error codes a read-only client can observe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[non_exhaustive]
pub enum DynamoDBErrorCode {
    /// Table or index not found.
    ResourceNotFoundException,
    /// Validation error.
    #[default]
    ValidationException,
    /// Provisioned throughput exceeded.
    ProvisionedThroughputExceededException,
    /// Request limit exceeded.
    RequestLimitExceeded,
    /// Serialization error.
    SerializationException,
    /// Internal server error.
    InternalServerError,
    /// Access denied.
    AccessDeniedException,
    /// Unknown credentials or operation.
    UnrecognizedClientException,
    /// The request failed before a response was received.
    Transport,
    /// A code this client does not know about.
    Unknown,
}

impl DynamoDBErrorCode {
    /// Parse a short error code string, as found in error metadata.
    ///
    /// Fully-qualified `__type` values (`prefix#Code`) are accepted too.
    #[must_use]
    pub fn from_code(code: &str) -> Self {
        let short = code.rsplit('#').next().unwrap_or(code);
        match short {
            "ResourceNotFoundException" => Self::ResourceNotFoundException,
            "ValidationException" => Self::ValidationException,
            "ProvisionedThroughputExceededException" => {
                Self::ProvisionedThroughputExceededException
            }
            "RequestLimitExceeded" => Self::RequestLimitExceeded,
            "SerializationException" => Self::SerializationException,
            "InternalServerError" => Self::InternalServerError,
            "AccessDeniedException" => Self::AccessDeniedException,
            "UnrecognizedClientException" => Self::UnrecognizedClientException,
            _ => Self::Unknown,
        }
    }

    /// Returns the short error code string.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ResourceNotFoundException => "ResourceNotFoundException",
            Self::ValidationException => "ValidationException",
            Self::ProvisionedThroughputExceededException => {
                "ProvisionedThroughputExceededException"
            }
            Self::RequestLimitExceeded => "RequestLimitExceeded",
            Self::SerializationException => "SerializationException",
            Self::InternalServerError => "InternalServerError",
            Self::AccessDeniedException => "AccessDeniedException",
            Self::UnrecognizedClientException => "UnrecognizedClientException",
            Self::Transport => "Transport",
            Self::Unknown => "Unknown",
        }
    }
}

impl fmt::Display for DynamoDBErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A DynamoDB error surfaced by a store client.
#[derive(Debug)]
pub struct DynamoDBError {
    /// The error code.
    pub code: DynamoDBErrorCode,
    /// A human-readable error message.
    pub message: String,
    /// The underlying source error, if any.
    pub source: Option<Box<dyn std::error::Error + Send + Sync>>,
}

impl fmt::Display for DynamoDBError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "DynamoDBError({}): {}", self.code, self.message)
    }
}

impl std::error::Error for DynamoDBError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.source
            .as_ref()
            .map(|e| e.as_ref() as &(dyn std::error::Error + 'static))
    }
}

impl DynamoDBError {
    /// Create a new `DynamoDBError` with a custom message.
    #[must_use]
    pub fn with_message(code: DynamoDBErrorCode, message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            code,
            source: None,
        }
    }

    /// Set the source error.
    #[must_use]
    pub fn with_source(mut self, source: impl std::error::Error + Send + Sync + 'static) -> Self {
        self.source = Some(Box::new(source));
        self
    }

    /// Table or resource not found.
    #[must_use]
    pub fn resource_not_found(message: impl Into<String>) -> Self {
        Self::with_message(DynamoDBErrorCode::ResourceNotFoundException, message)
    }
}
