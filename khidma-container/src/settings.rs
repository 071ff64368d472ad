//! Container settings.
//!
//! Deserializable so hosts can keep them next to the rest of their
//! configuration; every field has a default.

use serde::Deserialize;

/// Tunables applied by [`ContainerBuilder::build`](crate::container::ContainerBuilder::build)
/// and the resulting container.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct ContainerSettings {
    /// Create singletons marked eager while building.
    ///
    /// When `false` they are created on first resolve like any other
    /// singleton.
    pub instantiate_eager: bool,

    /// Let `inject_into` compile a plan for a type that was never
    /// declared as an injection target.
    ///
    /// When `false` such calls fail with `UnknownService`.
    pub compile_missing_plans: bool,
}

impl Default for ContainerSettings {
    fn default() -> Self {
        Self {
            instantiate_eager: true,
            compile_missing_plans: true,
        }
    }
}
