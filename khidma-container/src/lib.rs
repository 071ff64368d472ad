//! Core container implementation for Khidma DI.
//!
//! Registration produces [`ServiceDescriptor`]s, the [`registry::Registry`]
//! compiles them into factories and injection plans, and the
//! [`Container`] resolves contracts against singleton and scoped caches.

mod cache;

pub mod container;
pub mod context;
pub mod descriptor;
pub mod error;
pub mod factory;
pub mod global;
pub mod key;
pub mod lifetime;
pub mod plan;
pub mod provider;
pub mod registry;
pub mod settings;

pub use container::{Container, ContainerBuilder, prelude, resolve};
pub use context::{CallerMetadata, OriginKind, ResolutionContext, ScopeId};
pub use descriptor::{
    ConstructError, Instance, ServiceDescriptor, ServiceEntry, TargetDescriptor, TargetEntry,
};
pub use error::{KhidmaError, Result};
pub use key::ContractKey;
pub use lifetime::Lifetime;
pub use plan::{Arguments, EntryPoint, Injectable, InjectionPlan, PlanBuilder, compile_plan};
pub use provider::{Provider, ServiceCatalog};
pub use registry::Resolver;
pub use settings::ContainerSettings;

#[doc(hidden)]
pub use inventory;
