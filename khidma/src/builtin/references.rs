//! Name-keyed registry of live host objects.
//!
//! Objects owned by the host (scene entities, UI panels, ...) register
//! themselves under their type name so other collaborators can look them
//! up without holding the object directly. Names are the short type name,
//! so at most one object of each type can be registered at a time.

use std::any::{Any, type_name};
use std::collections::HashMap;
use std::sync::Arc;

use khidma_container::error::AmbiguousCastError;
use khidma_container::{KhidmaError, Result};
use khidma_support::rendering::shorten_type_name;
use parking_lot::RwLock;
use tracing::debug;

use super::logger::Logger;
use crate::Injectable;

/// A registered object together with its concrete type name.
#[derive(Clone)]
pub struct Reference {
    type_name: &'static str,
    value: Arc<dyn Any + Send + Sync>,
}

impl Reference {
    pub fn new<T: Send + Sync + 'static>(value: Arc<T>) -> Self {
        Self {
            type_name: type_name::<T>(),
            value,
        }
    }

    pub fn type_name(&self) -> &'static str {
        self.type_name
    }

    /// Downcasts to `T`.
    ///
    /// # Errors
    /// [`KhidmaError::AmbiguousCast`] if the object is not a `T`.
    pub fn downcast<T: Send + Sync + 'static>(&self) -> Result<Arc<T>> {
        self.value.clone().downcast::<T>().map_err(|_| {
            KhidmaError::AmbiguousCast(AmbiguousCastError {
                expected: type_name::<T>(),
                actual: Some(self.type_name),
            })
        })
    }
}

/// The name an object of type `T` is registered under.
pub fn reference_name<T: ?Sized>() -> String {
    shorten_type_name(type_name::<T>())
}

/// Object-safe registry contract. Use the typed helpers from
/// [`ReferenceRegistryExt`].
pub trait ReferenceRegistry: Send + Sync {
    /// Adds `reference` under `name`. The first registration wins.
    fn register_named(&self, name: String, reference: Reference) -> Result<()>;

    fn unregister_named(&self, name: &str) -> Result<()>;

    /// Like [`lookup`](Self::lookup), but a miss is an error and is reported.
    fn fetch(&self, name: &str) -> Result<Reference>;

    /// Silent lookup.
    fn lookup(&self, name: &str) -> Option<Reference>;

    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Typed access on top of [`ReferenceRegistry`].
pub trait ReferenceRegistryExt: ReferenceRegistry {
    fn register<T: Send + Sync + 'static>(&self, object: Arc<T>) -> Result<()> {
        self.register_named(reference_name::<T>(), Reference::new(object))
    }

    fn unregister<T: Send + Sync + 'static>(&self) -> Result<()> {
        self.unregister_named(&reference_name::<T>())
    }

    /// Returns the registered `T`.
    ///
    /// # Errors
    /// - [`KhidmaError::MissingRegistration`] when nothing is registered
    ///   under `T`'s name
    /// - [`KhidmaError::AmbiguousCast`] when the object there is not a `T`
    fn get<T: Send + Sync + 'static>(&self) -> Result<Arc<T>> {
        self.fetch(&reference_name::<T>())?.downcast::<T>()
    }

    /// Runs `action` with the registered `T`, or `fallback` if there is none.
    fn use_reference<T, R>(&self, action: impl FnOnce(Arc<T>) -> R, fallback: impl FnOnce() -> R) -> R
    where
        T: Send + Sync + 'static,
    {
        match self
            .lookup(&reference_name::<T>())
            .and_then(|reference| reference.downcast::<T>().ok())
        {
            Some(object) => action(object),
            None => fallback(),
        }
    }
}

impl<R: ReferenceRegistry + ?Sized> ReferenceRegistryExt for R {}

/// [`ReferenceRegistry`] backed by a map, registered as a singleton.
///
/// Failures are returned to the caller and also reported through the
/// injected [`Logger`].
#[derive(Default, Injectable)]
#[injectable(entry = "inject")]
pub struct SceneReferences {
    logger: Option<Arc<dyn Logger>>,
    references: RwLock<HashMap<String, Reference>>,
}

impl SceneReferences {
    fn inject(&mut self, logger: Arc<dyn Logger>) {
        self.logger = Some(logger);
    }

    fn report(&self, err: KhidmaError) -> KhidmaError {
        let message = err.to_string();
        match (&self.logger, &err) {
            (Some(logger), KhidmaError::DuplicateRegistration { .. }) => logger.error(&message),
            (Some(logger), _) => logger.warn(&message),
            (None, _) => tracing::warn!("{message}"),
        }
        err
    }
}

impl ReferenceRegistry for SceneReferences {
    fn register_named(&self, name: String, reference: Reference) -> Result<()> {
        let mut references = self.references.write();
        if references.contains_key(&name) {
            drop(references);
            return Err(self.report(KhidmaError::DuplicateRegistration { name }));
        }
        debug!(name = %name, object = reference.type_name(), "Registered reference");
        references.insert(name, reference);
        Ok(())
    }

    fn unregister_named(&self, name: &str) -> Result<()> {
        let removed = self.references.write().remove(name);
        match removed {
            Some(_) => {
                debug!(name, "Unregistered reference");
                Ok(())
            }
            None => Err(self.report(KhidmaError::MissingRegistration {
                name: name.to_owned(),
            })),
        }
    }

    fn fetch(&self, name: &str) -> Result<Reference> {
        self.lookup(name).ok_or_else(|| {
            self.report(KhidmaError::MissingRegistration {
                name: name.to_owned(),
            })
        })
    }

    fn lookup(&self, name: &str) -> Option<Reference> {
        self.references.read().get(name).cloned()
    }

    fn len(&self) -> usize {
        self.references.read().len()
    }
}

impl std::fmt::Debug for SceneReferences {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut names: Vec<String> = self.references.read().keys().cloned().collect();
        names.sort();
        f.debug_struct("SceneReferences")
            .field("references", &names)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct HealthBar {
        value: u32,
    }

    struct Minimap;

    #[derive(Default)]
    struct RecordingLogger {
        lines: parking_lot::Mutex<Vec<String>>,
    }

    impl Logger for RecordingLogger {
        fn log(&self, message: &str) {
            self.lines.lock().push(format!("log {message}"));
        }

        fn warn(&self, message: &str) {
            self.lines.lock().push(format!("warn {message}"));
        }

        fn error(&self, message: &str) {
            self.lines.lock().push(format!("error {message}"));
        }

        fn prefix(&self) -> &str {
            ""
        }

        fn set_disabled(&self, _disabled: bool) {}

        fn is_disabled(&self) -> bool {
            false
        }
    }

    fn recorded() -> (SceneReferences, Arc<RecordingLogger>) {
        let logger = Arc::new(RecordingLogger::default());
        let mut references = SceneReferences::default();
        references.inject(logger.clone());
        (references, logger)
    }

    #[test]
    fn failures_are_logged() {
        let (references, logger) = recorded();

        assert!(references.get::<Minimap>().is_err());
        assert!(references.unregister::<Minimap>().is_err());
        references.register(Arc::new(Minimap)).unwrap();
        assert!(references.register(Arc::new(Minimap)).is_err());

        let lines = logger.lines.lock().clone();
        assert_eq!(lines.len(), 3);
        assert!(lines[0].starts_with("warn Minimap"));
        assert!(lines[1].starts_with("warn Minimap"));
        assert!(lines[2].starts_with("error Minimap"));
    }

    #[test]
    fn use_reference_stays_silent() {
        let (references, logger) = recorded();
        references.use_reference(|_: Arc<Minimap>| (), || ());
        assert!(logger.lines.lock().is_empty());
    }

    #[test]
    fn register_then_get() {
        let references = SceneReferences::default();
        references.register(Arc::new(HealthBar { value: 10 })).unwrap();
        assert_eq!(references.get::<HealthBar>().unwrap().value, 10);
        assert_eq!(references.len(), 1);
    }

    #[test]
    fn first_registration_wins() {
        let references = SceneReferences::default();
        references.register(Arc::new(HealthBar { value: 1 })).unwrap();
        let err = references.register(Arc::new(HealthBar { value: 2 })).unwrap_err();
        assert!(matches!(err, KhidmaError::DuplicateRegistration { .. }));
        assert_eq!(references.get::<HealthBar>().unwrap().value, 1);
    }

    #[test]
    fn missing_reference() {
        let references = SceneReferences::default();
        assert!(matches!(
            references.get::<Minimap>(),
            Err(KhidmaError::MissingRegistration { .. })
        ));
        assert!(matches!(
            references.unregister::<Minimap>(),
            Err(KhidmaError::MissingRegistration { .. })
        ));
    }

    #[test]
    fn unregister_removes() {
        let references = SceneReferences::default();
        references.register(Arc::new(Minimap)).unwrap();
        references.unregister::<Minimap>().unwrap();
        assert!(references.is_empty());
    }

    #[test]
    fn same_name_other_type_is_ambiguous() {
        let references = SceneReferences::default();
        references
            .register_named(reference_name::<HealthBar>(), Reference::new(Arc::new(Minimap)))
            .unwrap();
        assert!(matches!(
            references.get::<HealthBar>(),
            Err(KhidmaError::AmbiguousCast(_))
        ));
    }

    #[test]
    fn use_reference_with_fallback() {
        let references = SceneReferences::default();
        let missing = references.use_reference(|bar: Arc<HealthBar>| bar.value, || 0);
        assert_eq!(missing, 0);

        references.register(Arc::new(HealthBar { value: 7 })).unwrap();
        let found = references.use_reference(|bar: Arc<HealthBar>| bar.value, || 0);
        assert_eq!(found, 7);
    }
}
