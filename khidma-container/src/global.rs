//! Process-wide container slot.
//!
//! For collaborators that are created by a host framework and cannot be
//! handed the container explicitly. Install once during startup; the
//! slot cannot be replaced afterwards.

use once_cell::sync::OnceCell;
use tracing::info;

use crate::container::Container;
use crate::error::{KhidmaError, Result};

static GLOBAL: OnceCell<Container> = OnceCell::new();

/// Installs `container` as the process-wide container.
///
/// # Errors
/// [`KhidmaError::AlreadyInstalled`] if a container was installed before.
pub fn install(container: Container) -> Result<&'static Container> {
    GLOBAL
        .set(container)
        .map_err(|_| KhidmaError::AlreadyInstalled)?;
    info!("Installed process-wide container");
    get()
}

/// Returns the process-wide container.
///
/// # Errors
/// [`KhidmaError::NotInstalled`] before [`install`] succeeded.
pub fn get() -> Result<&'static Container> {
    GLOBAL.get().ok_or(KhidmaError::NotInstalled)
}

pub fn is_installed() -> bool {
    GLOBAL.get().is_some()
}
