use std::fmt;
use thiserror::Error;

/// A required input is missing or unusable; generation does not start.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("Payer name is missing for contact {0}")]
    MissingPayerName(u64),
    #[error("Recipient IBAN is missing")]
    MissingIban,
    #[error("Payment template '{0}' has no amount")]
    MissingAmount(String),
    #[error("Amount must not be negative: {0}")]
    NegativeAmount(String),
    #[error("Amount does not fit into 15 digits: {0}")]
    AmountTooLarge(String),
}

/// Failure reported by an external collaborator (barcode encoder, HTML merge, file export).
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("Encoding failed: {0}")]
pub struct EncodingError(pub String);

impl EncodingError {
    pub fn new(message: impl Into<String>) -> Self {
        Self(message.into())
    }
}

/// Why a single generation task produced no record.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TaskFailure {
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error(transparent)]
    Encoding(#[from] EncodingError),
    #[error("Task panicked: {0}")]
    Panicked(String),
}

/// Failure of a whole batch run in the background.
#[derive(Error, Debug)]
pub enum BatchError {
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error("Generation worker panicked")]
    WorkerPanicked,
}

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Failed to access template file: {0}")]
    Io(#[from] std::io::Error),
    #[error("Malformed line {line}: {content}")]
    Malformed { line: usize, content: String },
    #[error("Invalid amount '{0}'")]
    InvalidAmount(String),
    #[error("Invalid flag '{0}'")]
    InvalidFlag(String),
}

/// Non-fatal condition met while resolving a template or a reference.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Warning {
    UnknownKind(String),
    UnknownAttribute { kind: String, attribute: String },
    MissingDependent(String),
    UnsupportedReferencePlaceholder(String),
    NonNumericReference { resolved: String, fallback: String },
}

impl fmt::Display for Warning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Warning::UnknownKind(kind) => write!(f, "unknown placeholder kind '{}'", kind),
            Warning::UnknownAttribute { kind, attribute } => {
                write!(f, "unknown attribute '{}' for '{}'", attribute, kind)
            }
            Warning::MissingDependent(attribute) => write!(
                f,
                "'underaged_attributes.{}' used without an underaged member",
                attribute
            ),
            Warning::UnsupportedReferencePlaceholder(raw) => {
                write!(f, "unsupported placeholder in reference: {}", raw)
            }
            Warning::NonNumericReference { resolved, fallback } => write!(
                f,
                "reference '{}' is not numeric, using contact id {}",
                resolved, fallback
            ),
        }
    }
}

/// A resolved value together with the warnings raised while producing it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resolved<T> {
    pub value: T,
    pub warnings: Vec<Warning>,
}

impl<T> Resolved<T> {
    pub fn new(value: T) -> Self {
        Self {
            value,
            warnings: Vec::new(),
        }
    }

    pub fn with_warnings(value: T, warnings: Vec<Warning>) -> Self {
        Self { value, warnings }
    }

    pub fn is_clean(&self) -> bool {
        self.warnings.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_task_failure_from_validation() {
        let failure: TaskFailure = ValidationError::MissingIban.into();
        assert_eq!(failure.to_string(), "Recipient IBAN is missing");
    }

    #[test]
    fn test_resolved_is_clean() {
        assert!(Resolved::new("x").is_clean());
        let resolved = Resolved::with_warnings(2, vec![Warning::UnknownKind("x".into())]);
        assert!(!resolved.is_clean());
        assert_eq!(resolved.warnings[0].to_string(), "unknown placeholder kind 'x'");
    }
}
