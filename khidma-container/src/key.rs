//! Contract identification keys.
//!
//! [`ContractKey`] identifies a contract (usually a `dyn Trait`) or an
//! implementation type inside the container.

use std::any::{TypeId, type_name};
use std::fmt;
use std::hash::{Hash, Hasher};

use khidma_support::rendering::shorten_type_name;

/// Identifies a type known to the container.
///
/// Two keys are equal when their [`TypeId`]s are equal; the type name is
/// carried only for diagnostics.
///
/// # Examples
/// ```
/// use khidma_container::key::ContractKey;
///
/// trait Clock {}
///
/// let key = ContractKey::of::<dyn Clock>();
/// assert!(key.type_name().ends_with("Clock"));
/// assert_eq!(key.short_name(), "dyn Clock");
/// assert_eq!(key, ContractKey::of::<dyn Clock>());
/// ```
#[derive(Clone, Copy)]
pub struct ContractKey {
    type_id: TypeId,
    type_name: &'static str,
}

impl ContractKey {
    /// Creates a key for type `T`.
    #[inline]
    pub fn of<T: ?Sized + 'static>() -> Self {
        Self {
            type_id: TypeId::of::<T>(),
            type_name: type_name::<T>(),
        }
    }

    /// Creates a key from a raw [`TypeId`] and type name.
    ///
    /// Prefer [`ContractKey::of`] when the type is nameable.
    #[inline]
    pub fn from_raw(type_id: TypeId, type_name: &'static str) -> Self {
        Self { type_id, type_name }
    }

    #[inline]
    pub fn type_id(&self) -> TypeId {
        self.type_id
    }

    /// Returns the fully qualified type name.
    #[inline]
    pub fn type_name(&self) -> &'static str {
        self.type_name
    }

    /// Returns the type name without module paths.
    pub fn short_name(&self) -> String {
        shorten_type_name(self.type_name)
    }
}

impl PartialEq for ContractKey {
    fn eq(&self, other: &Self) -> bool {
        self.type_id == other.type_id
    }
}

impl Eq for ContractKey {}

impl Hash for ContractKey {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.type_id.hash(state);
    }
}

impl fmt::Debug for ContractKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ContractKey({})", self.type_name)
    }
}

impl fmt::Display for ContractKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.type_name)
    }
}
