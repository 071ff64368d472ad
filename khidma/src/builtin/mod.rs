//! Services shipped with Khidma.
//!
//! | Contract | Implementation | Lifetime |
//! |---|---|---|
//! | `dyn Logger` | [`TracingLogger`] | Transient |
//! | `dyn ReferenceRegistry` | [`SceneReferences`] | Singleton |
//! | `dyn EventBus` | [`SceneEvents`] | Singleton |
//!
//! ```rust
//! use khidma::prelude::*;
//! use std::sync::Arc;
//!
//! let container = Container::builder()
//!     .add_provider(&BuiltinServices)
//!     .build()
//!     .expect("Failed to build container");
//!
//! let logger: Arc<dyn Logger> = container.resolve(ScopeId::GLOBAL).expect("Failed to resolve");
//! assert_eq!(logger.prefix(), "[Sy][Container]");
//! ```

pub mod events;
pub mod logger;
pub mod references;

pub use events::{EventBus, EventBusExt, SceneEvents, SubscriptionId};
pub use logger::{Logger, TracingLogger};
pub use references::{Reference, ReferenceRegistry, ReferenceRegistryExt, SceneReferences};

use khidma_container::{Lifetime, Provider, ServiceCatalog, ServiceDescriptor};

/// Registers the built-in services.
pub struct BuiltinServices;

impl Provider for BuiltinServices {
    fn register(&self, catalog: &mut dyn ServiceCatalog) {
        catalog.add_service(ServiceDescriptor::new::<dyn Logger, TracingLogger>(
            Lifetime::Transient,
            |logger| logger,
        ));
        catalog.add_service(ServiceDescriptor::new::<dyn ReferenceRegistry, SceneReferences>(
            Lifetime::Singleton,
            |references| references,
        ));
        catalog.add_service(ServiceDescriptor::new::<dyn EventBus, SceneEvents>(
            Lifetime::Singleton,
            |events| events,
        ));
    }

    fn name(&self) -> &str {
        "BuiltinServices"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use khidma_container::{Container, ScopeId};
    use std::sync::Arc;

    #[test]
    fn registry_logger_describes_the_registry() {
        let container = Container::builder()
            .add_provider(&BuiltinServices)
            .build()
            .unwrap();

        let references: Arc<dyn ReferenceRegistry> = container.resolve(ScopeId::GLOBAL).unwrap();
        assert!(references.is_empty());
        assert!(container.is_registered::<dyn Logger>());
        assert_eq!(container.singleton_count(), 1);
    }

    #[test]
    fn event_bus_is_shared_with_logging_off() {
        let container = Container::builder()
            .add_provider(&BuiltinServices)
            .build()
            .unwrap();

        let events: Arc<dyn EventBus> = container.resolve(1).unwrap();
        let same: Arc<dyn EventBus> = container.resolve(2).unwrap();
        assert!(Arc::ptr_eq(&events, &same));
        assert!(events.logs_disabled());

        events.subscribe("saved", |_: &()| {}).unwrap();
        assert_eq!(same.invoke("saved", &()).unwrap(), 1);
    }
}
