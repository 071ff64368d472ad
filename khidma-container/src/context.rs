//! Resolution context: scope identifier and caller metadata.
//!
//! A [`ResolutionContext`] travels through every resolve call. It is
//! built by the entry point (`resolve`, `inject_into`, an injection plan)
//! and never stored by the container.

use std::any::{Any, type_name};
use std::borrow::Cow;
use std::fmt;
use std::sync::Arc;

use crate::error::{AmbiguousCastError, KhidmaError, Result};
use crate::key::ContractKey;

/// Partitions the scoped cache.
///
/// Any negative value denotes the global context; [`ScopeId::GLOBAL`] is
/// the canonical one. Scoped services cannot be resolved there.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ScopeId(i64);

impl ScopeId {
    /// The "no scope" context used by singletons and system calls.
    pub const GLOBAL: ScopeId = ScopeId(-1);

    #[inline]
    pub const fn new(id: i64) -> Self {
        Self(id)
    }

    #[inline]
    pub const fn get(&self) -> i64 {
        self.0
    }

    #[inline]
    pub const fn is_global(&self) -> bool {
        self.0 < 0
    }
}

impl From<i64> for ScopeId {
    fn from(id: i64) -> Self {
        Self(id)
    }
}

impl From<i32> for ScopeId {
    fn from(id: i32) -> Self {
        Self(id as i64)
    }
}

impl fmt::Display for ScopeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_global() {
            write!(f, "global")
        } else {
            write!(f, "scope#{}", self.0)
        }
    }
}

/// Who is asking for an injection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OriginKind {
    /// Nothing is known about the caller.
    Unknown,
    /// An ordinary object whose construction is owned by the host.
    Object,
    /// A context-free call, e.g. `Container::resolve` from host code.
    System,
    /// The dependencies of a singleton service.
    Singleton,
    /// The dependencies of a scoped service.
    Scoped,
}

impl fmt::Display for OriginKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            OriginKind::Unknown => "Unknown",
            OriginKind::Object => "Object",
            OriginKind::System => "System",
            OriginKind::Singleton => "Singleton",
            OriginKind::Scoped => "Scoped",
        };
        f.write_str(label)
    }
}

/// Describes the object on whose behalf a resolution happens.
///
/// Resolvable as a pseudo-contract: a field typed
/// `Option<Arc<CallerMetadata>>` or an entry point parameter
/// `Arc<CallerMetadata>` receives the metadata of the current context.
#[derive(Clone)]
pub struct CallerMetadata {
    name: Cow<'static, str>,
    origin: OriginKind,
    object_type: Option<ContractKey>,
    reference: Option<Arc<dyn Any + Send + Sync>>,
}

impl CallerMetadata {
    /// Metadata for a caller nobody described.
    pub fn unknown() -> Self {
        Self {
            name: Cow::Borrowed("Unknown Target"),
            origin: OriginKind::Unknown,
            object_type: None,
            reference: None,
        }
    }

    pub fn new(name: impl Into<Cow<'static, str>>, origin: OriginKind) -> Self {
        Self {
            name: name.into(),
            origin,
            object_type: None,
            reference: None,
        }
    }

    /// Metadata for a context-free call from host code.
    pub fn system(name: impl Into<Cow<'static, str>>) -> Self {
        Self::new(name, OriginKind::System)
    }

    /// Metadata for a host-owned object of type `T`.
    pub fn object<T: ?Sized + 'static>(name: impl Into<Cow<'static, str>>) -> Self {
        Self::new(name, OriginKind::Object).with_type::<T>()
    }

    /// Metadata describing a service created by the container.
    ///
    /// Carries no reference: the service is still being injected and is
    /// not shared yet, so [`try_reference`](Self::try_reference) on this
    /// metadata always fails with `AmbiguousCast`.
    pub(crate) fn owned_by(implementation: ContractKey, origin: OriginKind) -> Self {
        Self {
            name: Cow::Owned(implementation.short_name()),
            origin,
            object_type: Some(implementation),
            reference: None,
        }
    }

    /// Records the static type of the originating object.
    pub fn with_type<T: ?Sized + 'static>(mut self) -> Self {
        self.object_type = Some(ContractKey::of::<T>());
        self
    }

    /// Attaches a handle to the originating object.
    pub fn with_reference<T: Send + Sync + 'static>(mut self, reference: Arc<T>) -> Self {
        if self.object_type.is_none() {
            self.object_type = Some(ContractKey::of::<T>());
        }
        self.reference = Some(reference);
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn origin(&self) -> OriginKind {
        self.origin
    }

    pub fn object_type(&self) -> Option<ContractKey> {
        self.object_type
    }

    pub fn is_unknown(&self) -> bool {
        self.origin == OriginKind::Unknown
    }

    /// Returns the attached reference as `Arc<T>`.
    ///
    /// # Errors
    /// [`KhidmaError::AmbiguousCast`] when no reference is attached or it
    /// is not a `T`.
    pub fn try_reference<T: Send + Sync + 'static>(&self) -> Result<Arc<T>> {
        let reference = self.reference.clone().ok_or_else(|| {
            KhidmaError::AmbiguousCast(AmbiguousCastError {
                expected: type_name::<T>(),
                actual: None,
            })
        })?;

        reference.downcast::<T>().map_err(|_| {
            KhidmaError::AmbiguousCast(AmbiguousCastError {
                expected: type_name::<T>(),
                actual: self.object_type.map(|k| k.type_name()),
            })
        })
    }

    /// Runs `action` with the reference when it is a `T`, `fallback` otherwise.
    pub fn use_reference<T, R>(
        &self,
        action: impl FnOnce(Arc<T>) -> R,
        fallback: impl FnOnce() -> R,
    ) -> R
    where
        T: Send + Sync + 'static,
    {
        match self.try_reference::<T>() {
            Ok(reference) => action(reference),
            Err(_) => fallback(),
        }
    }
}

impl Default for CallerMetadata {
    fn default() -> Self {
        Self::unknown()
    }
}

impl fmt::Debug for CallerMetadata {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CallerMetadata")
            .field("name", &self.name)
            .field("origin", &self.origin)
            .field("object_type", &self.object_type)
            .field("has_reference", &self.reference.is_some())
            .finish()
    }
}

/// State carried through one resolution.
#[derive(Debug, Clone)]
pub struct ResolutionContext {
    scope: ScopeId,
    caller: Arc<CallerMetadata>,
    consumer: Option<ContractKey>,
}

impl ResolutionContext {
    pub fn new(scope: impl Into<ScopeId>, caller: CallerMetadata) -> Self {
        Self {
            scope: scope.into(),
            caller: Arc::new(caller),
            consumer: None,
        }
    }

    /// Global scope, unknown caller.
    pub fn global() -> Self {
        Self::new(ScopeId::GLOBAL, CallerMetadata::unknown())
    }

    pub fn scope(&self) -> ScopeId {
        self.scope
    }

    pub fn caller(&self) -> &CallerMetadata {
        &self.caller
    }

    /// Shared handle to the caller metadata, handed out verbatim when the
    /// pseudo-contract is resolved.
    pub fn caller_handle(&self) -> &Arc<CallerMetadata> {
        &self.caller
    }

    /// The type whose injection plan is currently running, if any.
    pub fn consumer(&self) -> Option<ContractKey> {
        self.consumer
    }

    pub(crate) fn for_consumer(&self, consumer: ContractKey) -> Self {
        Self {
            scope: self.scope,
            caller: self.caller.clone(),
            consumer: Some(consumer),
        }
    }

    pub(crate) fn with_caller(&self, caller: CallerMetadata) -> Self {
        Self {
            scope: self.scope,
            caller: Arc::new(caller),
            consumer: self.consumer,
        }
    }
}
