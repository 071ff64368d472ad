//! Descriptor registry: the build-once lookup tables.
//!
//! [`Registry::build`] takes every service and injection-target
//! descriptor, keeps one descriptor per contract, compiles factories and
//! injection plans, and lists the singletons to create eagerly. The
//! result is never mutated afterwards, so it is read without locks.

use std::collections::HashMap;
use std::sync::Arc;

use tracing::{debug, trace, warn};

use crate::context::{CallerMetadata, ResolutionContext};
use crate::descriptor::{Instance, ServiceDescriptor, TargetDescriptor};
use crate::error::Result;
use crate::factory::{Factory, FactoryTable, compile_factory};
use crate::key::ContractKey;
use crate::lifetime::Lifetime;
use crate::plan::InjectionPlan;

/// Trait for resolving dependencies.
///
/// This is what injection plans receive to resolve the contracts they
/// need. Separated from the container so plans can be exercised alone.
pub trait Resolver: Send + Sync {
    fn resolve_key(&self, key: &ContractKey, ctx: &ResolutionContext) -> Result<Instance>;
}

/// Lookup tables built once before the first resolution.
pub struct Registry {
    descriptors: HashMap<ContractKey, ServiceDescriptor>,
    order: Vec<ContractKey>,
    factories: FactoryTable,
    plans: HashMap<ContractKey, Arc<InjectionPlan>>,
    eager: Vec<ContractKey>,
}

impl Registry {
    /// Builds the registry.
    ///
    /// - A later descriptor for the same contract replaces the earlier one.
    /// - `eager` is honoured for singletons only; on other lifetimes it is
    ///   ignored with a warning.
    /// - Eager singletons get no factory: they are constructed once, from
    ///   their descriptor, while the container starts.
    /// - A plan is compiled for every implementation and every target.
    pub fn build(
        services: impl IntoIterator<Item = ServiceDescriptor>,
        targets: impl IntoIterator<Item = TargetDescriptor>,
    ) -> Self {
        let reserved = ContractKey::of::<CallerMetadata>();
        let mut descriptors: HashMap<ContractKey, ServiceDescriptor> = HashMap::new();
        let mut order = Vec::new();

        for descriptor in services {
            let contract = descriptor.contract;

            if contract == reserved {
                warn!(
                    implementation = %descriptor.implementation,
                    "CallerMetadata is supplied by the resolver and cannot be registered, ignoring"
                );
                continue;
            }

            debug!(
                contract = %contract,
                implementation = %descriptor.implementation,
                lifetime = %descriptor.lifetime,
                eager = descriptor.eager,
                "Registered service"
            );

            match descriptors.insert(contract, descriptor) {
                Some(previous) => warn!(
                    contract = %contract,
                    replaced = %previous.implementation,
                    "Service registered twice, the last registration wins"
                ),
                None => order.push(contract),
            }
        }

        let mut factories = FactoryTable::default();
        let mut plans: HashMap<ContractKey, Arc<InjectionPlan>> = HashMap::new();
        let mut eager = Vec::new();

        for contract in &order {
            let descriptor = &descriptors[contract];
            let mut eager_singleton = false;

            if descriptor.eager {
                if descriptor.lifetime == Lifetime::Singleton {
                    eager_singleton = true;
                    eager.push(*contract);
                } else {
                    warn!(
                        implementation = %descriptor.implementation,
                        lifetime = %descriptor.lifetime,
                        "Eager creation is only valid on singleton services, ignoring the marker"
                    );
                }
            }

            if !eager_singleton {
                factories.insert(*contract, compile_factory(descriptor));
            }

            plans
                .entry(descriptor.implementation)
                .or_insert_with(|| Arc::new((descriptor.plan)()));
        }

        for target in targets {
            trace!(consumer = %target.consumer, "Registered injection target");
            plans
                .entry(target.consumer)
                .or_insert_with(|| Arc::new((target.plan)()));
        }

        Self {
            descriptors,
            order,
            factories,
            plans,
            eager,
        }
    }

    pub fn descriptor(&self, contract: &ContractKey) -> Option<&ServiceDescriptor> {
        self.descriptors.get(contract)
    }

    pub(crate) fn factory(&self, contract: &ContractKey) -> Option<&Factory> {
        self.factories.get(contract)
    }

    /// The compiled plan for a service implementation or injection target.
    pub fn plan(&self, consumer: &ContractKey) -> Option<&Arc<InjectionPlan>> {
        self.plans.get(consumer)
    }

    /// Contracts to create at startup, in registration order.
    pub fn eager_contracts(&self) -> &[ContractKey] {
        &self.eager
    }

    /// Descriptors in registration order.
    pub fn descriptors(&self) -> impl Iterator<Item = &ServiceDescriptor> {
        self.order.iter().map(|contract| &self.descriptors[contract])
    }

    pub(crate) fn factory_count(&self) -> usize {
        self.factories.len()
    }

    pub(crate) fn plan_count(&self) -> usize {
        self.plans.len()
    }

    /// Returns the number of registered contracts.
    pub fn len(&self) -> usize {
        self.descriptors.len()
    }

    /// Returns true if no contracts are registered.
    pub fn is_empty(&self) -> bool {
        self.descriptors.is_empty()
    }
}

impl std::fmt::Debug for Registry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Registry")
            .field("services", &self.descriptors.len())
            .field("factories", &self.factories.len())
            .field("plans", &self.plans.len())
            .field("eager", &self.eager)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::plan::{Injectable, PlanBuilder};

    trait Clock: Send + Sync {}
    trait Store: Send + Sync {}

    #[derive(Default)]
    struct SystemClock;
    impl Clock for SystemClock {}
    impl Injectable for SystemClock {}

    #[derive(Default)]
    struct FakeClock;
    impl Clock for FakeClock {}
    impl Injectable for FakeClock {}

    #[derive(Default)]
    struct MemoryStore {
        clock: Option<Arc<dyn Clock>>,
    }
    impl Store for MemoryStore {}
    impl Injectable for MemoryStore {
        fn declare(plan: &mut PlanBuilder<Self>) {
            plan.field::<dyn Clock>("clock", |this, clock| this.clock = Some(clock));
        }
    }

    #[derive(Default)]
    struct Widget;
    impl Injectable for Widget {}

    fn clock(lifetime: Lifetime) -> ServiceDescriptor {
        ServiceDescriptor::new::<dyn Clock, SystemClock>(lifetime, |c| c)
    }

    fn store() -> ServiceDescriptor {
        ServiceDescriptor::new::<dyn Store, MemoryStore>(Lifetime::Scoped, |s| s)
    }

    #[test]
    fn build_indexes_descriptors() {
        let registry = Registry::build(vec![clock(Lifetime::Singleton), store()], vec![]);

        assert_eq!(registry.len(), 2);
        let d = registry.descriptor(&ContractKey::of::<dyn Store>()).unwrap();
        assert_eq!(d.implementation(), ContractKey::of::<MemoryStore>());
        assert_eq!(registry.factory_count(), 2);
    }

    #[test]
    fn last_registration_wins() {
        let fake = ServiceDescriptor::new::<dyn Clock, FakeClock>(Lifetime::Transient, |c| c);
        let registry = Registry::build(vec![clock(Lifetime::Singleton), fake], vec![]);

        assert_eq!(registry.len(), 1);
        let d = registry.descriptor(&ContractKey::of::<dyn Clock>()).unwrap();
        assert_eq!(d.implementation(), ContractKey::of::<FakeClock>());
        assert_eq!(d.lifetime(), Lifetime::Transient);
    }

    #[test]
    fn eager_singleton_listed_without_factory() {
        let registry = Registry::build(vec![clock(Lifetime::Singleton).eager(), store()], vec![]);

        assert_eq!(registry.eager_contracts(), &[ContractKey::of::<dyn Clock>()]);
        assert!(registry.factory(&ContractKey::of::<dyn Clock>()).is_none());
        assert!(registry.factory(&ContractKey::of::<dyn Store>()).is_some());
    }

    #[test]
    fn eager_marker_ignored_on_other_lifetimes() {
        let registry = Registry::build(
            vec![clock(Lifetime::Transient).eager(), store().eager()],
            vec![],
        );

        assert!(registry.eager_contracts().is_empty());
        assert_eq!(registry.factory_count(), 2);
    }

    #[test]
    fn plans_compiled_for_services_and_targets() {
        let registry = Registry::build(
            vec![clock(Lifetime::Singleton), store()],
            vec![TargetDescriptor::of::<Widget>()],
        );

        assert_eq!(registry.plan_count(), 3);
        let plan = registry.plan(&ContractKey::of::<MemoryStore>()).unwrap();
        assert_eq!(plan.dependencies(), vec![ContractKey::of::<dyn Clock>()]);
        assert!(registry.plan(&ContractKey::of::<Widget>()).unwrap().is_noop());
    }

    #[test]
    fn caller_metadata_cannot_be_registered() {
        #[derive(Default)]
        struct Impostor;
        impl Injectable for Impostor {}

        let descriptor = ServiceDescriptor::from_fn::<CallerMetadata, Impostor>(
            Lifetime::Singleton,
            || Ok(Impostor),
            |_| Arc::new(CallerMetadata::unknown()),
        );
        let registry = Registry::build(vec![descriptor], vec![]);
        assert!(registry.is_empty());
    }

    #[test]
    fn descriptors_keep_registration_order() {
        let registry = Registry::build(vec![store(), clock(Lifetime::Singleton)], vec![]);
        let contracts: Vec<ContractKey> = registry.descriptors().map(|d| d.contract()).collect();
        assert_eq!(
            contracts,
            vec![ContractKey::of::<dyn Store>(), ContractKey::of::<dyn Clock>()]
        );
    }
}
