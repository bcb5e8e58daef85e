use super::{Extension, PluginCreator};
use crate::error::RegistryError;
use crate::node::ElementKind;
use std::sync::{Arc, OnceLock, PoisonError, RwLock};

/// Catalog of package definitions, keyed by primary namespace URI.
#[derive(Default)]
pub struct ExtensionRegistry {
    extensions: Vec<Arc<dyn Extension>>,
}

impl ExtensionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a package; a second package with the same primary URI is
    /// rejected and the registry is left unchanged.
    pub fn register(&mut self, extension: Arc<dyn Extension>) -> Result<(), RegistryError> {
        if self.extensions.iter().any(|e| e.uri() == extension.uri()) {
            return Err(RegistryError::AlreadyRegistered {
                uri: extension.uri().to_string(),
            });
        }
        tracing::debug!(package = extension.name(), uri = extension.uri(), "registered extension");
        self.extensions.push(extension);
        Ok(())
    }

    /// Lookup by any namespace the package uses.
    pub fn by_uri(&self, uri: &str) -> Option<Arc<dyn Extension>> {
        self.extensions.iter().find(|e| e.supports_uri(uri)).cloned()
    }

    pub fn by_name(&self, name: &str) -> Option<Arc<dyn Extension>> {
        self.extensions.iter().find(|e| e.name() == name).cloned()
    }

    /// Creator for `kind` in the package owning `uri`.
    pub fn plugin_creator(&self, uri: &str, kind: ElementKind) -> Option<Arc<dyn PluginCreator>> {
        self.by_uri(uri)?
            .plugin_creators()
            .into_iter()
            .find(|c| c.extension_point().kind == kind)
    }

    pub fn extensions(&self) -> &[Arc<dyn Extension>] {
        &self.extensions
    }

    pub fn len(&self) -> usize {
        self.extensions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.extensions.is_empty()
    }
}

fn global() -> &'static RwLock<ExtensionRegistry> {
    static REGISTRY: OnceLock<RwLock<ExtensionRegistry>> = OnceLock::new();
    REGISTRY.get_or_init(|| RwLock::new(ExtensionRegistry::new()))
}

/// Registers a package process-wide.
pub fn register_extension(extension: impl Extension + 'static) -> Result<(), RegistryError> {
    let result = global()
        .write()
        .unwrap_or_else(PoisonError::into_inner)
        .register(Arc::new(extension));
    if let Err(err) = &result {
        tracing::warn!(error = %err, "extension registration rejected");
    }
    result
}

pub fn extension_by_uri(uri: &str) -> Option<Arc<dyn Extension>> {
    global()
        .read()
        .unwrap_or_else(PoisonError::into_inner)
        .by_uri(uri)
}

pub fn extension_by_name(name: &str) -> Option<Arc<dyn Extension>> {
    global()
        .read()
        .unwrap_or_else(PoisonError::into_inner)
        .by_name(name)
}

pub fn plugin_creator(uri: &str, kind: ElementKind) -> Option<Arc<dyn PluginCreator>> {
    global()
        .read()
        .unwrap_or_else(PoisonError::into_inner)
        .plugin_creator(uri, kind)
}

pub fn registered_extensions() -> Vec<Arc<dyn Extension>> {
    global()
        .read()
        .unwrap_or_else(PoisonError::into_inner)
        .extensions()
        .to_vec()
}
