//! Module and processor registries
//!
//! A registry maps a type name to the constructor that builds instances of
//! that type. The hosting process builds one [`ModuleRegistry`] and one
//! [`ProcessorRegistry`], populates them, and hands them to the router; the
//! two never share keys.
//!
//! A malformed registration (empty type, missing constructor, duplicate type)
//! is a programming error in an implementation crate and panics immediately.

use cuebridge_core::{Module, ModuleConfig, ModuleError, Params, ProcessError, Processor};
use parking_lot::RwLock;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

/// Builds a module from its config
pub type ModuleConstructor =
    Arc<dyn Fn(&ModuleConfig) -> Result<Arc<dyn Module>, ModuleError> + Send + Sync>;

/// Builds a processor from its params
pub type ProcessorConstructor =
    Arc<dyn Fn(&Params) -> Result<Arc<dyn Processor>, ProcessError> + Send + Sync>;

/// A type name paired with its constructor
pub struct Registration<C> {
    pub type_name: String,
    pub constructor: Option<C>,
}

pub type ModuleRegistration = Registration<ModuleConstructor>;
pub type ProcessorRegistration = Registration<ProcessorConstructor>;

impl ModuleRegistration {
    pub fn new<F>(type_name: &str, constructor: F) -> Self
    where
        F: Fn(&ModuleConfig) -> Result<Arc<dyn Module>, ModuleError> + Send + Sync + 'static,
    {
        Self {
            type_name: type_name.to_string(),
            constructor: Some(Arc::new(constructor)),
        }
    }
}

impl ProcessorRegistration {
    pub fn new<F>(type_name: &str, constructor: F) -> Self
    where
        F: Fn(&Params) -> Result<Arc<dyn Processor>, ProcessError> + Send + Sync + 'static,
    {
        Self {
            type_name: type_name.to_string(),
            constructor: Some(Arc::new(constructor)),
        }
    }
}

impl<C> fmt::Debug for Registration<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Registration")
            .field("type_name", &self.type_name)
            .field("has_constructor", &self.constructor.is_some())
            .finish()
    }
}

/// Lock-protected table of constructors keyed by type name
pub struct Registry<C> {
    kind: &'static str,
    entries: RwLock<HashMap<String, C>>,
}

pub type ModuleRegistry = Registry<ModuleConstructor>;
pub type ProcessorRegistry = Registry<ProcessorConstructor>;

impl ModuleRegistry {
    pub fn new() -> Self {
        Self::with_kind("module")
    }
}

impl Default for ModuleRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl ProcessorRegistry {
    pub fn new() -> Self {
        Self::with_kind("processor")
    }
}

impl Default for ProcessorRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl<C: Clone> Registry<C> {
    fn with_kind(kind: &'static str) -> Self {
        Self {
            kind,
            entries: RwLock::new(HashMap::new()),
        }
    }

    /// Add a registration.
    ///
    /// # Panics
    ///
    /// If the type name is empty, the constructor is missing, or the type is
    /// already registered.
    pub fn register(&self, registration: Registration<C>) {
        let Registration {
            type_name,
            constructor,
        } = registration;

        if type_name.is_empty() {
            panic!("{} registration has an empty type", self.kind);
        }

        let Some(constructor) = constructor else {
            panic!("{} registration {} has no constructor", self.kind, type_name);
        };

        let mut entries = self.entries.write();
        if entries.contains_key(&type_name) {
            drop(entries);
            panic!("{} type {} is already registered", self.kind, type_name);
        }
        entries.insert(type_name, constructor);
    }

    pub fn lookup(&self, type_name: &str) -> Option<C> {
        self.entries.read().get(type_name).cloned()
    }

    pub fn contains(&self, type_name: &str) -> bool {
        self.entries.read().contains_key(type_name)
    }

    /// Registered type names, sorted
    pub fn types(&self) -> Vec<String> {
        let mut types: Vec<String> = self.entries.read().keys().cloned().collect();
        types.sort();
        types
    }

    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }
}

impl<C> fmt::Debug for Registry<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut types: Vec<String> = self.entries.read().keys().cloned().collect();
        types.sort();
        f.debug_struct("Registry")
            .field("kind", &self.kind)
            .field("types", &types)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cuebridge_core::Payload;

    struct Identity;

    impl Processor for Identity {
        fn processor_type(&self) -> &str {
            "identity"
        }

        fn process(&self, payload: Payload) -> Result<Option<Payload>, ProcessError> {
            Ok(Some(payload))
        }
    }

    fn identity_registration(type_name: &str) -> ProcessorRegistration {
        ProcessorRegistration::new(type_name, |_params| Ok(Arc::new(Identity) as Arc<dyn Processor>))
    }

    #[test]
    fn test_register_and_lookup() {
        let registry = ProcessorRegistry::new();
        registry.register(identity_registration("identity"));

        assert!(registry.contains("identity"));
        assert_eq!(registry.types(), vec!["identity".to_string()]);

        let constructor = registry.lookup("identity").unwrap();
        let processor = constructor(&Params::new()).unwrap();
        assert_eq!(processor.processor_type(), "identity");

        assert!(registry.lookup("missing").is_none());
    }

    #[test]
    #[should_panic(expected = "already registered")]
    fn test_duplicate_type_panics() {
        let registry = ProcessorRegistry::new();
        registry.register(identity_registration("identity"));
        registry.register(identity_registration("identity"));
    }

    #[test]
    #[should_panic(expected = "empty type")]
    fn test_empty_type_panics() {
        let registry = ProcessorRegistry::new();
        registry.register(identity_registration(""));
    }

    #[test]
    #[should_panic(expected = "no constructor")]
    fn test_missing_constructor_panics() {
        let registry = ModuleRegistry::new();
        registry.register(ModuleRegistration {
            type_name: "net.tcp.client".to_string(),
            constructor: None,
        });
    }

    #[test]
    fn test_registries_are_keyed_independently() {
        let modules = ModuleRegistry::new();
        let processors = ProcessorRegistry::new();
        processors.register(identity_registration("shared.name"));

        assert!(!modules.contains("shared.name"));
        assert!(modules.is_empty());
        assert_eq!(processors.len(), 1);
    }
}
