//! Storage error types
//!
//! Structured errors raised by [`Collection`](super::Collection) implementations.
//! They carry the operation that failed, a category, and the resource involved,
//! so the handler layer can translate them into HTTP-facing errors without
//! inspecting message strings.
//!
//! # Example
//!
//! ```rust
//! use tour_service::store::{StoreError, StoreErrorKind};
//!
//! let error = StoreError::not_found("Tour", "tour_01h455vb4pex5vsknk084sn02q");
//! assert!(matches!(error.kind, StoreErrorKind::NotFound));
//! assert!(error.entity_id.is_some());
//! ```

use std::fmt;

/// Operation being performed when the storage error occurred
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StoreOperation {
    /// Querying documents with a filter
    Find,
    /// Loading a single document by id
    FindById,
    /// Counting documents matching a filter
    Count,
    /// Inserting a new document
    Create,
    /// Updating a document by id
    Update,
    /// Deleting a document by id
    Delete,
}

impl fmt::Display for StoreOperation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Find => write!(f, "find"),
            Self::FindById => write!(f, "find_by_id"),
            Self::Count => write!(f, "count_documents"),
            Self::Create => write!(f, "create"),
            Self::Update => write!(f, "find_by_id_and_update"),
            Self::Delete => write!(f, "find_by_id_and_delete"),
        }
    }
}

/// Category of storage error
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StoreErrorKind {
    /// Document was not found
    NotFound,
    /// Field constraints were violated (required, range, enum, length)
    ValidationFailed,
    /// A unique key already exists
    Duplicate,
    /// A value could not be interpreted as the field's declared type
    InvalidValue,
    /// The backing store could not be reached
    Unavailable,
    /// Unexpected failure inside the store
    Internal,
}

impl fmt::Display for StoreErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotFound => write!(f, "not_found"),
            Self::ValidationFailed => write!(f, "validation_failed"),
            Self::Duplicate => write!(f, "duplicate"),
            Self::InvalidValue => write!(f, "invalid_value"),
            Self::Unavailable => write!(f, "unavailable"),
            Self::Internal => write!(f, "internal"),
        }
    }
}

/// Structured storage error with operation context
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreError {
    /// The operation being performed when the error occurred
    pub operation: StoreOperation,
    /// The category of error
    pub kind: StoreErrorKind,
    /// Human-readable error message
    pub message: String,
    /// The resource involved (e.g., "Tour", "Review")
    pub entity_type: Option<String>,
    /// The id of the document involved
    pub entity_id: Option<String>,
}

impl StoreError {
    /// Create a new storage error
    pub fn new(operation: StoreOperation, kind: StoreErrorKind, message: impl Into<String>) -> Self {
        Self {
            operation,
            kind,
            message: message.into(),
            entity_type: None,
            entity_id: None,
        }
    }

    /// Create a "not found" error with entity context
    pub fn not_found(entity_type: impl Into<String>, entity_id: impl Into<String>) -> Self {
        Self {
            operation: StoreOperation::FindById,
            kind: StoreErrorKind::NotFound,
            message: "No document found with that ID".to_string(),
            entity_type: Some(entity_type.into()),
            entity_id: Some(entity_id.into()),
        }
    }

    /// Create a validation error from the individual field messages
    ///
    /// ```rust
    /// use tour_service::store::{StoreError, StoreOperation};
    ///
    /// let error = StoreError::validation_failed(
    ///     StoreOperation::Create,
    ///     &["A tour must have a name".to_string(), "A tour must have a price".to_string()],
    /// );
    /// assert_eq!(
    ///     error.message,
    ///     "Invalid input data. A tour must have a name. A tour must have a price"
    /// );
    /// ```
    pub fn validation_failed(operation: StoreOperation, messages: &[String]) -> Self {
        Self::new(
            operation,
            StoreErrorKind::ValidationFailed,
            format!("Invalid input data. {}", messages.join(". ")),
        )
    }

    /// Create a duplicate unique key error
    pub fn duplicate(operation: StoreOperation, value: impl fmt::Display) -> Self {
        Self::new(
            operation,
            StoreErrorKind::Duplicate,
            format!("Duplicate field value '{value}'. Please use another value"),
        )
    }

    /// Create an invalid value error for a field
    pub fn invalid_value(
        operation: StoreOperation,
        field: impl fmt::Display,
        value: impl fmt::Display,
    ) -> Self {
        Self::new(
            operation,
            StoreErrorKind::InvalidValue,
            format!("Invalid {field}: {value}."),
        )
    }

    /// Create an internal error
    pub fn internal(operation: StoreOperation, message: impl Into<String>) -> Self {
        Self::new(operation, StoreErrorKind::Internal, message)
    }

    /// Add entity context to an existing error
    #[must_use]
    pub fn with_entity(
        mut self,
        entity_type: impl Into<String>,
        entity_id: impl Into<String>,
    ) -> Self {
        self.entity_type = Some(entity_type.into());
        self.entity_id = Some(entity_id.into());
        self
    }

    /// Set the resource name without an id
    #[must_use]
    pub fn with_entity_type(mut self, entity_type: impl Into<String>) -> Self {
        self.entity_type = Some(entity_type.into());
        self
    }

    /// Set the operation that caused the error
    #[must_use]
    pub fn with_operation(mut self, operation: StoreOperation) -> Self {
        self.operation = operation;
        self
    }

    /// Transient errors that may succeed on retry
    pub fn is_retriable(&self) -> bool {
        matches!(self.kind, StoreErrorKind::Unavailable)
    }
}

impl fmt::Display for StoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Store {} error during {}: {}",
            self.kind, self.operation, self.message
        )?;
        if let (Some(ref entity_type), Some(ref entity_id)) = (&self.entity_type, &self.entity_id) {
            write!(f, " [{}: {}]", entity_type, entity_id)?;
        }
        Ok(())
    }
}

impl std::error::Error for StoreError {}
