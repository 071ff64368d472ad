//! # Khidma: Dependency Injection Container for Rust
//!
//! Contracts (usually `dyn Trait`) are mapped to implementations with a
//! lifetime: transient, singleton, or scoped to a host-defined scope id.
//! Services and host-created objects get their dependencies through
//! compiled injection plans.
//!
//! ```rust
//! use khidma::prelude::*;
//! use std::sync::Arc;
//!
//! trait Clock: Send + Sync {
//!     fn now(&self) -> u64;
//! }
//!
//! #[derive(Default, Injectable)]
//! struct SystemClock;
//!
//! impl Clock for SystemClock {
//!     fn now(&self) -> u64 { 7 }
//! }
//!
//! #[derive(Default, Injectable)]
//! struct Scheduler {
//!     #[inject]
//!     clock: Option<Arc<dyn Clock>>,
//! }
//!
//! let container = Container::builder()
//!     .service(ServiceDescriptor::new::<dyn Clock, SystemClock>(Lifetime::Singleton, |c| c))
//!     .target::<Scheduler>()
//!     .build()
//!     .expect("Failed to build container");
//!
//! let mut scheduler = Scheduler::default();
//! container
//!     .inject_into(&mut scheduler, 0, CallerMetadata::system("Boot"))
//!     .expect("Failed to inject");
//! assert_eq!(scheduler.clock.unwrap().now(), 7);
//! ```

extern crate self as khidma;

pub use khidma_container::*;
pub use khidma_derive::*;
pub use khidma_support::*;

pub mod builtin;

pub mod prelude {
    pub use crate::builtin::{
        BuiltinServices, EventBus, EventBusExt, Logger, ReferenceRegistry, ReferenceRegistryExt,
        SceneEvents, SceneReferences, TracingLogger,
    };
    pub use khidma_container::prelude::*;
    pub use khidma_derive::{Injectable, service};
}
