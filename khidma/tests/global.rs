//! The process-wide container slot.

use khidma::global;
use khidma::prelude::*;
use std::sync::Arc;

#[test]
fn install_once_then_get() {
    assert!(matches!(global::get(), Err(KhidmaError::NotInstalled)));
    assert!(!global::is_installed());

    let container = Container::builder()
        .add_provider(&BuiltinServices)
        .build()
        .unwrap();
    let installed = global::install(container).unwrap();
    assert!(global::is_installed());

    let logger: Arc<dyn Logger> = global::get().unwrap().resolve(0).unwrap();
    assert_eq!(logger.prefix(), "[Sy][Container]");
    assert_eq!(installed.len(), 3);

    let again = Container::builder().build().unwrap();
    assert!(matches!(global::install(again), Err(KhidmaError::AlreadyInstalled)));
}
