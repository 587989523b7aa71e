//! Registry resolving transport identifiers to constructors.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use parking_lot::RwLock;
use thiserror::Error;
use tracing::{debug, trace};

use crate::cache::ResponseCache;

use super::Transport;

/// Identifier deployments conventionally register their engine under.
pub const DEFAULT_TRANSPORT: &str = "native";

/// Options handed to a transport constructor.
#[derive(Clone, Default)]
pub struct TransportOptions {
    /// Response cache the transport should consult and fill.
    pub cache: Option<Arc<dyn ResponseCache>>,
    /// Whether the transport should log requests and responses.
    pub log_enabled: bool,
}

impl fmt::Debug for TransportOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TransportOptions")
            .field("cache", &self.cache.is_some())
            .field("log_enabled", &self.log_enabled)
            .finish()
    }
}

/// Errors raised while registering or resolving transports.
#[derive(Debug, Error, PartialEq, Eq)]
#[non_exhaustive]
pub enum RegistryError {
    /// No constructor is registered under the requested identifier.
    #[error("undefined transport: {0:?}")]
    Unknown(String),

    /// The identifier is not a valid transport name.
    #[error("invalid transport identifier: {0:?}")]
    InvalidIdentifier(String),

    /// A constructor is already registered under this identifier.
    #[error("transport already registered: {0:?}")]
    Duplicate(String),
}

type Constructor = Box<dyn Fn(TransportOptions) -> Box<dyn Transport> + Send + Sync>;

/// Maps transport identifiers to constructor functions.
///
/// Identifiers are fixed lowercase names, validated when the constructor
/// is registered; resolution at call time is a plain map lookup, never a
/// name-pattern search.
pub struct TransportRegistry {
    inner: RwLock<HashMap<String, Constructor>>,
}

impl TransportRegistry {
    /// An empty registry.
    pub fn new() -> Self {
        Self {
            inner: RwLock::new(HashMap::new()),
        }
    }

    /// Register `constructor` under `name`.
    ///
    /// Names are validated here: lowercase ASCII alphanumerics, non-empty,
    /// and not already taken.
    pub fn register<F>(&self, name: &str, constructor: F) -> Result<(), RegistryError>
    where
        F: Fn(TransportOptions) -> Box<dyn Transport> + Send + Sync + 'static,
    {
        if name.is_empty()
            || !name
                .chars()
                .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit())
        {
            return Err(RegistryError::InvalidIdentifier(name.to_owned()));
        }

        let mut inner = self.inner.write();
        if inner.contains_key(name) {
            return Err(RegistryError::Duplicate(name.to_owned()));
        }
        inner.insert(name.to_owned(), Box::new(constructor));
        debug!(name, "transport registered");
        Ok(())
    }

    /// Build a transport for `name`.
    pub fn build(
        &self,
        name: &str,
        options: TransportOptions,
    ) -> Result<Box<dyn Transport>, RegistryError> {
        let inner = self.inner.read();
        let constructor = inner
            .get(name)
            .ok_or_else(|| RegistryError::Unknown(name.to_owned()))?;
        trace!(name, "building transport");
        Ok(constructor(options))
    }

    /// Whether a constructor is registered under `name`.
    pub fn contains(&self, name: &str) -> bool {
        self.inner.read().contains_key(name)
    }
}

impl Default for TransportRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for TransportRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let inner = self.inner.read();
        let mut names: Vec<&str> = inner.keys().map(String::as_str).collect();
        names.sort_unstable();
        f.debug_struct("TransportRegistry")
            .field("transports", &names)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use crate::transport::mock::MockHandle;

    fn registry_with_mock() -> (TransportRegistry, MockHandle) {
        let registry = TransportRegistry::new();
        let mock = MockHandle::default();
        let handle = mock.clone();
        registry
            .register("mock", move |options| Box::new(handle.transport(options)))
            .unwrap();
        (registry, mock)
    }

    #[test]
    fn unknown_identifier_fails_resolution() {
        let (registry, _mock) = registry_with_mock();
        let error = registry
            .build("missing", TransportOptions::default())
            .map(|_| ())
            .unwrap_err();
        assert_eq!(error, RegistryError::Unknown("missing".to_owned()));
    }

    #[test]
    fn registered_identifier_resolves() {
        let (registry, _mock) = registry_with_mock();
        assert!(registry.contains("mock"));
        assert!(registry.build("mock", TransportOptions::default()).is_ok());
    }

    #[test]
    fn identifiers_are_validated_at_registration() {
        let registry = TransportRegistry::new();
        for name in ["", "Mock", "my-transport", "with space"] {
            let error = registry
                .register(name, |options| {
                    Box::new(MockHandle::default().transport(options))
                })
                .unwrap_err();
            assert_eq!(error, RegistryError::InvalidIdentifier(name.to_owned()));
        }
    }

    #[test]
    fn duplicate_registration_is_rejected() {
        let (registry, _mock) = registry_with_mock();
        let error = registry
            .register("mock", |options| {
                Box::new(MockHandle::default().transport(options))
            })
            .unwrap_err();
        assert_eq!(error, RegistryError::Duplicate("mock".to_owned()));
    }
}
