//! # The Container: heart of Khidma
//!
//! Resolves contracts to instances and applies their lifetime policy.
//!
//! # Architecture
//! ```text
//! ContainerBuilder  ──build()──>  Registry (descriptors, factories, plans)
//!                                    │
//!                                    ▼
//!                                 Container ── resolve / inject_into / reset_scope
//!                                    │
//!                       ┌────────────┴────────────┐
//!                 singleton cache           scoped caches (per ScopeId)
//! ```
//!
//! # Examples
//! ```rust
//! use khidma_container::prelude::*;
//! use std::sync::Arc;
//!
//! trait Clock: Send + Sync {
//!     fn now(&self) -> u64;
//! }
//!
//! #[derive(Default)]
//! struct SystemClock;
//! impl Clock for SystemClock {
//!     fn now(&self) -> u64 { 42 }
//! }
//! impl Injectable for SystemClock {}
//!
//! let container = Container::builder()
//!     .service(ServiceDescriptor::new::<dyn Clock, SystemClock>(Lifetime::Singleton, |c| c))
//!     .build()
//!     .expect("Failed to build container");
//!
//! let a: Arc<dyn Clock> = container.resolve(0).expect("Failed to resolve");
//! let b: Arc<dyn Clock> = container.resolve(7).expect("Failed to resolve");
//! assert!(Arc::ptr_eq(&a, &b));
//! ```

use std::any::type_name;
use std::fmt;
use std::sync::Arc;

use khidma_support::rendering::{RegistrationRow, render_registrations, suggest_similar};
use tracing::{debug, info, instrument, trace, warn};

use crate::cache::{InstanceCache, ScopedCache};
use crate::context::{CallerMetadata, OriginKind, ResolutionContext, ScopeId};
use crate::descriptor::{Instance, ServiceDescriptor, ServiceEntry, TargetDescriptor, TargetEntry};
use crate::error::{
    AmbiguousCastError, InvalidScopeUsageError, KhidmaError, Result, UnknownServiceError,
};
use crate::key::ContractKey;
use crate::lifetime::Lifetime;
use crate::plan::{Injectable, compile_plan};
use crate::provider::{Provider, ServiceCatalog};
use crate::registry::{Registry, Resolver};
use crate::settings::ContainerSettings;

// ============================================================
// ContainerBuilder
// ============================================================

/// Collects descriptors, then builds a [`Container`].
///
/// # Examples
/// ```rust,ignore
/// let container = Container::builder()
///     .discover()
///     .add_provider(&TimeProvider)
///     .service(ServiceDescriptor::new::<dyn SessionStore, MemoryStore>(Lifetime::Scoped, |s| s))
///     .target::<HealthBar>()
///     .build()?;
/// ```
pub struct ContainerBuilder {
    services: Vec<ServiceDescriptor>,
    targets: Vec<TargetDescriptor>,
    settings: ContainerSettings,
}

impl ContainerBuilder {
    fn new() -> Self {
        Self {
            services: Vec::new(),
            targets: Vec::new(),
            settings: ContainerSettings::default(),
        }
    }

    pub fn settings(mut self, settings: ContainerSettings) -> Self {
        self.settings = settings;
        self
    }

    /// Registers a service. A later registration of the same contract wins.
    pub fn service(mut self, descriptor: ServiceDescriptor) -> Self {
        self.services.push(descriptor);
        self
    }

    /// Declares `T` as an injection target so its plan is compiled up front.
    pub fn target<T: Injectable>(mut self) -> Self {
        self.targets.push(TargetDescriptor::of::<T>());
        self
    }

    /// Add a [`Provider`] module.
    pub fn add_provider(mut self, provider: &dyn Provider) -> Self {
        debug!(provider = provider.name(), "Adding provider");
        provider.register(&mut self);
        self
    }

    /// Adds every service and target submitted with `#[service]` or
    /// `#[injectable(target)]` anywhere in the final binary.
    ///
    /// Submission order across crates is unspecified, so a contract
    /// should be submitted at most once.
    pub fn discover(mut self) -> Self {
        let before = (self.services.len(), self.targets.len());

        self.services
            .extend(inventory::iter::<ServiceEntry>().map(ServiceEntry::descriptor));
        self.targets
            .extend(inventory::iter::<TargetEntry>().map(TargetEntry::descriptor));

        debug!(
            services = self.services.len() - before.0,
            targets = self.targets.len() - before.1,
            "Discovered submitted registrations"
        );
        self
    }

    /// Builds the registry and creates eager singletons.
    ///
    /// # Errors
    /// Whatever an eager singleton's construction or injection returns.
    #[instrument(skip(self), name = "container_build")]
    pub fn build(self) -> Result<Container> {
        info!(
            services = self.services.len(),
            targets = self.targets.len(),
            "Building container"
        );

        let registry = Registry::build(self.services, self.targets);
        let container = Container {
            inner: Arc::new(Inner {
                registry,
                singletons: InstanceCache::default(),
                scoped: ScopedCache::default(),
                settings: self.settings,
            }),
        };

        if container.inner.settings.instantiate_eager {
            for contract in container.inner.registry.eager_contracts() {
                if let Some(descriptor) = container.inner.registry.descriptor(contract) {
                    debug!(contract = %contract, "Creating eager singleton");
                    container.singleton(descriptor)?;
                }
            }
        }

        info!(
            services = container.inner.registry.len(),
            factories = container.inner.registry.factory_count(),
            plans = container.inner.registry.plan_count(),
            singletons = container.inner.singletons.len(),
            "Container built successfully ✓"
        );
        Ok(container)
    }
}

impl ServiceCatalog for ContainerBuilder {
    fn add_service(&mut self, descriptor: ServiceDescriptor) {
        self.services.push(descriptor);
    }

    fn add_target(&mut self, target: TargetDescriptor) {
        self.targets.push(target);
    }
}

// ═══════════════════════════════════════════
// Container
// ═══════════════════════════════════════════

struct Inner {
    registry: Registry,
    singletons: InstanceCache,
    scoped: ScopedCache,
    settings: ContainerSettings,
}

/// Thread-safe dependency injection container.
///
/// Created by [`ContainerBuilder::build()`]. Cloning is cheap and every
/// clone shares the same caches.
#[derive(Clone)]
pub struct Container {
    inner: Arc<Inner>,
}

impl Container {
    /// Create a new builder.
    pub fn builder() -> ContainerBuilder {
        ContainerBuilder::new()
    }

    /// Resolves contract `C` on behalf of host code.
    ///
    /// ```rust,ignore
    /// let store: Arc<dyn SessionStore> = container.resolve(scene_id)?;
    /// ```
    ///
    /// # Errors
    /// - [`KhidmaError::UnknownService`]: `C` is not registered
    /// - [`KhidmaError::InvalidScopeUsage`]: `C` is scoped and `scope` is global
    pub fn resolve<C>(&self, scope: impl Into<ScopeId>) -> Result<Arc<C>>
    where
        C: ?Sized + Send + Sync + 'static,
    {
        let ctx = ResolutionContext::new(scope, CallerMetadata::system("Container"));
        resolve::<C>(self, &ctx)
    }

    /// Resolves contract `C` with an explicit context.
    pub fn resolve_with<C>(&self, ctx: &ResolutionContext) -> Result<Arc<C>>
    where
        C: ?Sized + Send + Sync + 'static,
    {
        resolve::<C>(self, ctx)
    }

    /// Runs `T`'s injection plan against an instance built elsewhere.
    ///
    /// Calling it again re-resolves and overwrites every injected member.
    ///
    /// # Errors
    /// The first failing resolution; members injected before it keep their
    /// new values.
    pub fn inject_into<T: Injectable>(
        &self,
        instance: &mut T,
        scope: impl Into<ScopeId>,
        caller: CallerMetadata,
    ) -> Result<()> {
        let consumer = ContractKey::of::<T>();
        let ctx = ResolutionContext::new(scope, caller);
        trace!(consumer = %consumer, scope = %ctx.scope(), caller = ctx.caller().name(), "Injecting");

        match self.inner.registry.plan(&consumer) {
            Some(plan) => plan.execute(instance, self, &ctx),
            None if self.inner.settings.compile_missing_plans => {
                warn!(
                    consumer = %consumer,
                    "Type is not a declared injection target, compiling its plan for this call"
                );
                compile_plan::<T>().execute(instance, self, &ctx)
            }
            None => Err(KhidmaError::UnknownService(UnknownServiceError {
                requested: consumer,
                required_by: None,
                suggestions: vec![],
            })),
        }
    }

    /// Drops every scoped instance of `scope`.
    ///
    /// The next scoped resolution in that scope builds new instances.
    /// Returns whether the scope had a cache; absent scopes are a no-op.
    ///
    /// Must not run concurrently with resolutions in the same scope. An
    /// instance still being built finishes into the dropped cache, while
    /// the scoped dependencies it resolves land in the new one, so it can
    /// outlive the reset through whoever holds it.
    pub fn reset_scope(&self, scope: impl Into<ScopeId>) -> bool {
        let scope = scope.into();
        let existed = self.inner.scoped.reset(scope);
        debug!(scope = %scope, existed, "Reset scope");
        existed
    }

    pub fn is_registered<C: ?Sized + 'static>(&self) -> bool {
        self.inner.registry.descriptor(&ContractKey::of::<C>()).is_some()
    }

    pub fn descriptor(&self, contract: &ContractKey) -> Option<&ServiceDescriptor> {
        self.inner.registry.descriptor(contract)
    }

    pub fn registry(&self) -> &Registry {
        &self.inner.registry
    }

    /// Scopes that currently hold scoped instances.
    pub fn active_scopes(&self) -> Vec<ScopeId> {
        self.inner.scoped.active_scopes()
    }

    /// Number of scoped instances cached for `scope`.
    pub fn scoped_count(&self, scope: impl Into<ScopeId>) -> usize {
        self.inner
            .scoped
            .peek(scope.into())
            .map_or(0, |cache| cache.len())
    }

    /// Number of singletons created so far.
    pub fn singleton_count(&self) -> usize {
        self.inner.singletons.len()
    }

    /// Returns the number of registered contracts.
    pub fn len(&self) -> usize {
        self.inner.registry.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.registry.is_empty()
    }

    /// Renders the registration table.
    pub fn report(&self) -> String {
        let rows: Vec<RegistrationRow> = self
            .inner
            .registry
            .descriptors()
            .map(|d| RegistrationRow {
                lifetime: d.lifetime().to_string(),
                contract: d.contract().short_name(),
                implementation: d.implementation().short_name(),
                eager: d.is_eager() && d.lifetime().is_singleton(),
            })
            .collect();
        render_registrations(&rows)
    }

    // ── Lifetime dispatch ──

    fn singleton(&self, descriptor: &ServiceDescriptor) -> Result<Instance> {
        self.inner
            .singletons
            .get_or_try_insert_with(&descriptor.contract, || {
                let owner = CallerMetadata::owned_by(descriptor.implementation, OriginKind::Singleton);
                let ctx = ResolutionContext::new(ScopeId::GLOBAL, owner);
                let instance = self.instantiate(descriptor, &ctx)?;
                debug!(contract = %descriptor.contract, "Created singleton");
                Ok(instance)
            })
    }

    fn scoped(&self, descriptor: &ServiceDescriptor, ctx: &ResolutionContext) -> Result<Instance> {
        let scope = ctx.scope();
        if scope.is_global() {
            warn!(contract = %descriptor.contract, "Scoped service requested without a scope");
            return Err(KhidmaError::InvalidScopeUsage(InvalidScopeUsageError {
                contract: descriptor.contract,
                scope,
                required_by: ctx.consumer(),
            }));
        }

        self.inner
            .scoped
            .scope(scope)
            .get_or_try_insert_with(&descriptor.contract, || {
                let owner = CallerMetadata::owned_by(descriptor.implementation, OriginKind::Scoped);
                let ctx = ResolutionContext::new(scope, owner);
                let instance = self.instantiate(descriptor, &ctx)?;
                debug!(contract = %descriptor.contract, scope = %scope, "Created scoped instance");
                Ok(instance)
            })
    }

    fn transient(&self, descriptor: &ServiceDescriptor, ctx: &ResolutionContext) -> Result<Instance> {
        if ctx.caller().is_unknown() {
            let ctx = ctx.with_caller(CallerMetadata::owned_by(
                descriptor.implementation,
                OriginKind::Unknown,
            ));
            return self.instantiate(descriptor, &ctx);
        }
        self.instantiate(descriptor, ctx)
    }

    /// Construct, inject, publish. Nothing is cached here.
    fn instantiate(&self, descriptor: &ServiceDescriptor, ctx: &ResolutionContext) -> Result<Instance> {
        // Eager singletons have no compiled factory.
        let mut raw = match self.inner.registry.factory(&descriptor.contract) {
            Some(factory) => factory()?,
            None => (descriptor.construct)()?,
        };

        if let Some(plan) = self.inner.registry.plan(&descriptor.implementation) {
            plan.execute(&mut *raw, self, ctx)?;
        }

        (descriptor.publish)(raw)
    }

    fn unknown_service(&self, key: &ContractKey, ctx: &ResolutionContext) -> KhidmaError {
        let names: Vec<&str> = self
            .inner
            .registry
            .descriptors()
            .map(|d| d.contract().type_name())
            .collect();

        KhidmaError::UnknownService(UnknownServiceError {
            requested: *key,
            required_by: ctx.consumer(),
            suggestions: suggest_similar(key.type_name(), &names, 3),
        })
    }
}

impl Resolver for Container {
    fn resolve_key(&self, key: &ContractKey, ctx: &ResolutionContext) -> Result<Instance> {
        if *key == ContractKey::of::<CallerMetadata>() {
            trace!(caller = ctx.caller().name(), "Resolving caller metadata");
            return Ok(Arc::new(ctx.caller_handle().clone()) as Instance);
        }

        let descriptor = self
            .inner
            .registry
            .descriptor(key)
            .ok_or_else(|| self.unknown_service(key, ctx))?;

        trace!(contract = %key, lifetime = %descriptor.lifetime, scope = %ctx.scope(), "Resolving");

        match descriptor.lifetime {
            Lifetime::Transient => self.transient(descriptor, ctx),
            Lifetime::Singleton => self.singleton(descriptor),
            Lifetime::Scoped => self.scoped(descriptor, ctx),
        }
    }
}

impl fmt::Debug for Container {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Container")
            .field("registered", &self.inner.registry.len())
            .field("singletons", &self.inner.singletons.len())
            .field("scopes", &self.inner.scoped.active_scopes())
            .finish()
    }
}

// ═══════════════════════════════════════════
// Free function for use inside plans
// ═══════════════════════════════════════════

/// Resolve a typed contract from a [`Resolver`].
///
/// ```rust,ignore
/// let clock: Arc<dyn Clock> = khidma_container::container::resolve(resolver, ctx)?;
/// ```
pub fn resolve<C>(resolver: &dyn Resolver, ctx: &ResolutionContext) -> Result<Arc<C>>
where
    C: ?Sized + Send + Sync + 'static,
{
    let key = ContractKey::of::<C>();
    let instance = resolver.resolve_key(&key, ctx)?;
    instance.downcast_ref::<Arc<C>>().cloned().ok_or_else(|| {
        KhidmaError::AmbiguousCast(AmbiguousCastError {
            expected: type_name::<Arc<C>>(),
            actual: None,
        })
    })
}

// ═══════════════════════════════════════════
// Prelude
// ═══════════════════════════════════════════

pub mod prelude {
    pub use super::{Container, ContainerBuilder, resolve};
    pub use crate::context::{CallerMetadata, OriginKind, ResolutionContext, ScopeId};
    pub use crate::descriptor::{ServiceDescriptor, TargetDescriptor};
    pub use crate::error::{KhidmaError, Result};
    pub use crate::key::ContractKey;
    pub use crate::lifetime::Lifetime;
    pub use crate::plan::{Injectable, PlanBuilder};
    pub use crate::provider::{Provider, ServiceCatalog};
    pub use crate::settings::ContainerSettings;
}
