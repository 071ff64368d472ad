//! Provider trait: a module of related registrations.
//!
//! Providers group the services of one area of an application, so the
//! startup code adds a handful of providers instead of one long list.
//!
//! # Examples
//! ```rust,ignore
//! struct TimeProvider;
//!
//! impl Provider for TimeProvider {
//!     fn register(&self, catalog: &mut dyn ServiceCatalog) {
//!         catalog.add_service(
//!             ServiceDescriptor::new::<dyn Clock, SystemClock>(Lifetime::Singleton, |c| c).eager(),
//!         );
//!         catalog.add_target(TargetDescriptor::of::<ClockWidget>());
//!     }
//! }
//! ```

use crate::descriptor::{ServiceDescriptor, TargetDescriptor};

/// A module that registers related services into a container.
pub trait Provider: Send + Sync {
    /// Adds descriptors to the catalog.
    ///
    /// Called once during container construction.
    fn register(&self, catalog: &mut dyn ServiceCatalog);

    /// Optional: human-readable name for logs.
    fn name(&self) -> &str {
        std::any::type_name::<Self>()
    }
}

/// Registration surface handed to providers.
///
/// A subset of the builder API, so providers can be tested against a
/// mock catalog.
pub trait ServiceCatalog {
    fn add_service(&mut self, descriptor: ServiceDescriptor);

    fn add_target(&mut self, target: TargetDescriptor);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lifetime::Lifetime;
    use crate::plan::Injectable;

    struct MockCatalog {
        services: Vec<ServiceDescriptor>,
        targets: usize,
    }

    impl ServiceCatalog for MockCatalog {
        fn add_service(&mut self, descriptor: ServiceDescriptor) {
            self.services.push(descriptor);
        }

        fn add_target(&mut self, _target: TargetDescriptor) {
            self.targets += 1;
        }
    }

    #[derive(Default)]
    struct Counter;
    impl Injectable for Counter {}

    struct TestProvider;

    impl Provider for TestProvider {
        fn register(&self, catalog: &mut dyn ServiceCatalog) {
            catalog.add_service(ServiceDescriptor::concrete::<Counter>(Lifetime::Transient));
            catalog.add_target(TargetDescriptor::of::<Counter>());
        }
    }

    #[test]
    fn provider_registers_descriptors() {
        let mut catalog = MockCatalog {
            services: vec![],
            targets: 0,
        };

        TestProvider.register(&mut catalog);

        assert_eq!(catalog.services.len(), 1);
        assert_eq!(catalog.services[0].lifetime(), Lifetime::Transient);
        assert_eq!(catalog.targets, 1);
    }

    #[test]
    fn provider_has_name() {
        assert!(TestProvider.name().contains("TestProvider"));
    }
}
