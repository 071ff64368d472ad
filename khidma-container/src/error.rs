//! Error types for Khidma container operations.
//!
//! Messages name the contract involved and, where it helps, who required
//! it and what to do about it.

use crate::context::ScopeId;
use crate::key::ContractKey;
use std::fmt;

/// Main error type for all Khidma operations.
#[derive(Debug, thiserror::Error)]
pub enum KhidmaError {
    /// Requested contract was never registered.
    #[error("{}", .0)]
    UnknownService(UnknownServiceError),

    /// Scoped contract requested under the global scope.
    #[error("{}", .0)]
    InvalidScopeUsage(InvalidScopeUsageError),

    /// A value did not have the expected static type.
    #[error("{}", .0)]
    AmbiguousCast(AmbiguousCastError),

    /// A service constructor returned an error.
    #[error("Failed to construct {key}: {source}")]
    ConstructionFailed {
        key: ContractKey,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// A name-keyed registry already holds an entry under this name.
    #[error("{name} is already registered and cannot be registered twice")]
    DuplicateRegistration { name: String },

    /// A name-keyed registry has no entry under this name.
    #[error("{name} is not registered")]
    MissingRegistration { name: String },

    /// A process-wide container was already installed.
    #[error("A container is already installed for this process")]
    AlreadyInstalled,

    /// No process-wide container was installed.
    #[error("No container is installed. Call global::install() during startup")]
    NotInstalled,
}

/// Error when a contract was not registered.
#[derive(Debug)]
pub struct UnknownServiceError {
    /// The contract that was requested
    pub requested: ContractKey,
    /// Whose injection plan asked for it (if known)
    pub required_by: Option<ContractKey>,
    /// Registered contracts with similar names
    pub suggestions: Vec<String>,
}

impl fmt::Display for UnknownServiceError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Service '{}' is not registered", self.requested)?;

        if let Some(ref consumer) = self.required_by {
            write!(f, "\n  Required by: {consumer}")?;
        }

        if !self.suggestions.is_empty() {
            write!(f, "\n  Did you mean one of:")?;
            for suggestion in &self.suggestions {
                write!(f, "\n    - {suggestion}")?;
            }
        }

        write!(
            f,
            "\n  Hint: register an implementation with #[service({}, ...)] or ContainerBuilder::service()",
            self.requested.short_name()
        )
    }
}

/// Error when a scoped contract is resolved outside of any scope.
#[derive(Debug)]
pub struct InvalidScopeUsageError {
    pub contract: ContractKey,
    pub scope: ScopeId,
    /// Whose injection plan asked for it (if known)
    pub required_by: Option<ContractKey>,
}

impl fmt::Display for InvalidScopeUsageError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Service '{}' is scoped and cannot be resolved in the {} context",
            self.contract, self.scope,
        )?;
        if let Some(ref consumer) = self.required_by {
            write!(f, "\n  Required by: {consumer}")?;
        }
        write!(
            f,
            "\n  Hint: scoped services cannot be injected into singleton services; resolve it with a scope id"
        )
    }
}

/// Error when a value is not of the expected type.
#[derive(Debug)]
pub struct AmbiguousCastError {
    pub expected: &'static str,
    /// The type actually found, when known
    pub actual: Option<&'static str>,
}

impl fmt::Display for AmbiguousCastError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.actual {
            Some(actual) => write!(f, "Expected a value of type {}, found {}", self.expected, actual),
            None => write!(f, "Expected a value of type {}, found nothing", self.expected),
        }
    }
}

/// Convenient Result type for Khidma operations.
pub type Result<T> = std::result::Result<T, KhidmaError>;
