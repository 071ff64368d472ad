//! Service lifetime policies.
//!
//! - [`Lifetime::Transient`]: new instance every resolve
//! - [`Lifetime::Singleton`]: one instance for the whole process
//! - [`Lifetime::Scoped`]: one instance per scope identifier
use std::fmt;

use serde::Deserialize;

/// Defines how instances of a service are shared.
///
/// # Examples
/// ```
/// use khidma_container::lifetime::Lifetime;
///
/// assert!(Lifetime::Singleton.is_cached());
/// assert!(!Lifetime::Transient.is_cached());
/// assert_eq!(Lifetime::Scoped.to_string(), "Scoped");
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize)]
pub enum Lifetime {
    /// New instance created on every resolve call.
    ///
    /// Never cached. Dependencies see the requester's caller metadata.
    Transient,

    /// One instance shared across the entire process.
    ///
    /// Created on first resolve (or at build time when marked eager) and
    /// kept until the container is dropped. Its own dependencies are
    /// resolved under the global scope.
    Singleton,

    /// One instance per scope identifier.
    ///
    /// Created on first resolve within a scope, dropped when the scope is
    /// reset. Cannot be resolved under the global scope.
    Scoped,
}

impl Lifetime {
    /// Returns `true` if instances are cached.
    #[inline]
    pub fn is_cached(&self) -> bool {
        matches!(self, Lifetime::Singleton | Lifetime::Scoped)
    }

    #[inline]
    pub fn is_singleton(&self) -> bool {
        matches!(self, Lifetime::Singleton)
    }
}

impl fmt::Display for Lifetime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Lifetime::Transient => write!(f, "Transient"),
            Lifetime::Singleton => write!(f, "Singleton"),
            Lifetime::Scoped => write!(f, "Scoped"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lifetime_is_cached() {
        assert!(Lifetime::Singleton.is_cached());
        assert!(Lifetime::Scoped.is_cached());
        assert!(!Lifetime::Transient.is_cached());
    }

    #[test]
    fn only_singleton_is_singleton() {
        assert!(Lifetime::Singleton.is_singleton());
        assert!(!Lifetime::Scoped.is_singleton());
    }

    #[test]
    fn lifetime_display() {
        assert_eq!(format!("{}", Lifetime::Singleton), "Singleton");
        assert_eq!(format!("{}", Lifetime::Scoped), "Scoped");
        assert_eq!(format!("{}", Lifetime::Transient), "Transient");
    }
}
