//! Factory compilation.
//!
//! A factory is the zero-argument constructor of one implementation,
//! wrapped once at registry build time so resolving never has to look
//! at the descriptor's construction details again.

use std::collections::HashMap;
use std::sync::Arc;

use tracing::trace;

use crate::descriptor::{RawInstance, ServiceDescriptor};
use crate::error::Result;
use crate::key::ContractKey;

/// A compiled constructor.
pub type Factory = Arc<dyn Fn() -> Result<RawInstance> + Send + Sync>;

/// Builds the factory for one descriptor.
pub fn compile_factory(descriptor: &ServiceDescriptor) -> Factory {
    let construct = descriptor.construct.clone();
    let implementation = descriptor.implementation;

    Arc::new(move || {
        trace!(implementation = %implementation, "Constructing");
        construct()
    })
}

/// Factories keyed by contract. Immutable once the registry is built.
#[derive(Default)]
pub(crate) struct FactoryTable {
    factories: HashMap<ContractKey, Factory>,
}

impl FactoryTable {
    pub fn insert(&mut self, contract: ContractKey, factory: Factory) {
        self.factories.insert(contract, factory);
    }

    pub fn get(&self, contract: &ContractKey) -> Option<&Factory> {
        self.factories.get(contract)
    }

    pub fn len(&self) -> usize {
        self.factories.len()
    }
}
