//! Service and injection-target descriptors.
//!
//! A [`ServiceDescriptor`] says "contract `C` is implemented by `I` with
//! this lifetime". A [`TargetDescriptor`] names a type that consumes
//! services without providing one. Both can be handed to the
//! [`ContainerBuilder`](crate::container::ContainerBuilder) directly or
//! submitted through `inventory` as [`ServiceEntry`] / [`TargetEntry`].

use std::any::Any;
use std::fmt;
use std::sync::Arc;

use crate::error::{AmbiguousCastError, KhidmaError, Result};
use crate::key::ContractKey;
use crate::lifetime::Lifetime;
use crate::plan::{Injectable, InjectionPlan, compile_plan};

/// A resolved service as stored by the caches.
///
/// The `Any` holds an `Arc<C>` for the contract `C` it was resolved for;
/// use [`resolve`](crate::container::resolve) to get it back typed.
pub type Instance = Arc<dyn Any + Send + Sync>;

/// A freshly constructed implementation, before injection.
pub type RawInstance = Box<dyn Any + Send + Sync>;

pub(crate) type ConstructFn = Arc<dyn Fn() -> Result<RawInstance> + Send + Sync>;
pub(crate) type PublishFn = Arc<dyn Fn(RawInstance) -> Result<Instance> + Send + Sync>;

/// Error type accepted from fallible constructors.
pub type ConstructError = Box<dyn std::error::Error + Send + Sync>;

/// Registration of one implementation against one contract.
#[derive(Clone)]
pub struct ServiceDescriptor {
    pub(crate) contract: ContractKey,
    pub(crate) implementation: ContractKey,
    pub(crate) lifetime: Lifetime,
    pub(crate) eager: bool,
    pub(crate) construct: ConstructFn,
    pub(crate) publish: PublishFn,
    pub(crate) plan: fn() -> InjectionPlan,
}

impl ServiceDescriptor {
    /// Registers `I` (built with `Default`) as the implementation of `C`.
    ///
    /// `upcast` turns the implementation into the contract, usually the
    /// identity closure `|service| service` coerced to `Arc<dyn Trait>`.
    pub fn new<C, I>(lifetime: Lifetime, upcast: fn(Arc<I>) -> Arc<C>) -> Self
    where
        C: ?Sized + Send + Sync + 'static,
        I: Injectable + Default,
    {
        Self::from_fn::<C, I>(lifetime, || Ok(I::default()), upcast)
    }

    /// Registers a concrete type as its own contract.
    pub fn concrete<I: Injectable + Default>(lifetime: Lifetime) -> Self {
        Self::new::<I, I>(lifetime, |service| service)
    }

    /// Registers `I` with a fallible parameterless constructor.
    pub fn from_fn<C, I>(
        lifetime: Lifetime,
        constructor: impl Fn() -> std::result::Result<I, ConstructError> + Send + Sync + 'static,
        upcast: fn(Arc<I>) -> Arc<C>,
    ) -> Self
    where
        C: ?Sized + Send + Sync + 'static,
        I: Injectable,
    {
        let contract = ContractKey::of::<C>();
        let implementation = ContractKey::of::<I>();

        let construct: ConstructFn = Arc::new(move || {
            constructor()
                .map(|service| Box::new(service) as RawInstance)
                .map_err(|source| KhidmaError::ConstructionFailed {
                    key: implementation,
                    source,
                })
        });

        let publish: PublishFn = Arc::new(move |raw: RawInstance| {
            let service = raw.downcast::<I>().map_err(|_| {
                KhidmaError::AmbiguousCast(AmbiguousCastError {
                    expected: implementation.type_name(),
                    actual: None,
                })
            })?;
            let shared: Arc<C> = upcast(Arc::from(service));
            Ok(Arc::new(shared) as Instance)
        });

        Self {
            contract,
            implementation,
            lifetime,
            eager: false,
            construct,
            publish,
            plan: compile_plan::<I>,
        }
    }

    /// Marks the service for creation while the container is built.
    ///
    /// Only honoured for singletons.
    pub fn eager(mut self) -> Self {
        self.eager = true;
        self
    }

    pub fn contract(&self) -> ContractKey {
        self.contract
    }

    pub fn implementation(&self) -> ContractKey {
        self.implementation
    }

    pub fn lifetime(&self) -> Lifetime {
        self.lifetime
    }

    pub fn is_eager(&self) -> bool {
        self.eager
    }
}

impl fmt::Debug for ServiceDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ServiceDescriptor")
            .field("contract", &self.contract)
            .field("implementation", &self.implementation)
            .field("lifetime", &self.lifetime)
            .field("eager", &self.eager)
            .finish()
    }
}

/// A type that receives injections but is not itself a service.
#[derive(Clone, Copy)]
pub struct TargetDescriptor {
    pub(crate) consumer: ContractKey,
    pub(crate) plan: fn() -> InjectionPlan,
}

impl TargetDescriptor {
    pub fn of<T: Injectable>() -> Self {
        Self {
            consumer: ContractKey::of::<T>(),
            plan: compile_plan::<T>,
        }
    }

    pub fn consumer(&self) -> ContractKey {
        self.consumer
    }
}

impl fmt::Debug for TargetDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("TargetDescriptor").field(&self.consumer).finish()
    }
}

/// Statically submitted service registration.
///
/// Emitted by `#[service(...)]`; collected by
/// [`ContainerBuilder::discover`](crate::container::ContainerBuilder::discover).
pub struct ServiceEntry {
    describe: fn() -> ServiceDescriptor,
}

impl ServiceEntry {
    pub const fn new(describe: fn() -> ServiceDescriptor) -> Self {
        Self { describe }
    }

    pub fn descriptor(&self) -> ServiceDescriptor {
        (self.describe)()
    }
}

/// Statically submitted injection target.
///
/// Emitted by `#[derive(Injectable)]` with `#[injectable(target)]`.
pub struct TargetEntry {
    describe: fn() -> TargetDescriptor,
}

impl TargetEntry {
    pub const fn new(describe: fn() -> TargetDescriptor) -> Self {
        Self { describe }
    }

    pub fn descriptor(&self) -> TargetDescriptor {
        (self.describe)()
    }
}

inventory::collect!(ServiceEntry);
inventory::collect!(TargetEntry);

#[cfg(test)]
mod tests {
    use super::*;

    trait Clock: Send + Sync {
        fn now(&self) -> u64;
    }

    #[derive(Default)]
    struct SystemClock;
    impl Clock for SystemClock {
        fn now(&self) -> u64 {
            1
        }
    }
    impl Injectable for SystemClock {}

    #[test]
    fn descriptor_records_identities() {
        let descriptor =
            ServiceDescriptor::new::<dyn Clock, SystemClock>(Lifetime::Singleton, |c| c);
        assert_eq!(descriptor.contract(), ContractKey::of::<dyn Clock>());
        assert_eq!(descriptor.implementation(), ContractKey::of::<SystemClock>());
        assert_eq!(descriptor.lifetime(), Lifetime::Singleton);
        assert!(!descriptor.is_eager());
        assert!(descriptor.eager().is_eager());
    }

    #[test]
    fn construct_then_publish_yields_contract() {
        let descriptor =
            ServiceDescriptor::new::<dyn Clock, SystemClock>(Lifetime::Transient, |c| c);
        let raw = (descriptor.construct)().unwrap();
        let instance = (descriptor.publish)(raw).unwrap();

        let clock = instance.downcast_ref::<Arc<dyn Clock>>().unwrap();
        assert_eq!(clock.now(), 1);
    }

    #[test]
    fn failing_constructor_is_construction_failed() {
        let descriptor = ServiceDescriptor::from_fn::<dyn Clock, SystemClock>(
            Lifetime::Singleton,
            || Err("no hardware clock".into()),
            |c| c,
        );

        match (descriptor.construct)() {
            Err(KhidmaError::ConstructionFailed { key, .. }) => {
                assert_eq!(key, ContractKey::of::<SystemClock>());
            }
            Err(other) => panic!("Expected ConstructionFailed, got: {other:?}"),
            Ok(_) => panic!("Expected ConstructionFailed, got an instance"),
        }
    }

    #[test]
    fn publish_rejects_foreign_instance() {
        let descriptor = ServiceDescriptor::concrete::<SystemClock>(Lifetime::Transient);
        assert!((descriptor.publish)(Box::new(3u8)).is_err());
    }

    #[test]
    fn entries_describe_lazily() {
        fn describe() -> ServiceDescriptor {
            ServiceDescriptor::concrete::<SystemClock>(Lifetime::Scoped)
        }
        let entry = ServiceEntry::new(describe);
        assert_eq!(entry.descriptor().lifetime(), Lifetime::Scoped);

        let target = TargetEntry::new(TargetDescriptor::of::<SystemClock>);
        assert_eq!(target.descriptor().consumer(), ContractKey::of::<SystemClock>());
    }
}
