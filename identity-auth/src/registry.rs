//! Table of identity providers available to the orchestrator.
//!
//! A [`RegistryBuilder`] collects providers during startup and rejects duplicate
//! names; [`RegistryBuilder::build`] freezes it into an immutable [`Registry`]
//! that can be shared across request handlers without locking.

use std::collections::BTreeMap;
use std::sync::Arc;

use log::*;

use crate::error::{provider_error, Error, ErrorKind};
use crate::oauth::Provider;

/// Collects providers during startup.
#[derive(Default)]
pub struct RegistryBuilder {
    providers: BTreeMap<String, Arc<dyn Provider>>,
}

impl RegistryBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add providers keyed by their name.
    ///
    /// Fails on the first provider whose name is already registered; providers
    /// before it in `providers` stay registered.
    pub fn register<I>(&mut self, providers: I) -> Result<&mut Self, Error>
    where
        I: IntoIterator<Item = Arc<dyn Provider>>,
    {
        for provider in providers {
            let name = provider.name().to_string();
            if self.providers.contains_key(&name) {
                return Err(provider_error(
                    ErrorKind::ProviderAlreadyRegistered,
                    &format!("provider {name} is already registered"),
                ));
            }
            debug!("Registering identity provider {name}");
            self.providers.insert(name, provider);
        }
        Ok(self)
    }

    /// Register a single provider.
    pub fn with_provider(mut self, provider: impl Provider + 'static) -> Result<Self, Error> {
        self.register([Arc::new(provider) as Arc<dyn Provider>])?;
        Ok(self)
    }

    /// Freeze the table for serving.
    pub fn build(self) -> Registry {
        info!(
            "Identity provider registry ready with {} provider(s)",
            self.providers.len()
        );
        Registry {
            providers: self.providers,
        }
    }
}

/// Frozen, read-only provider table.
#[derive(Clone, Default)]
pub struct Registry {
    providers: BTreeMap<String, Arc<dyn Provider>>,
}

impl Registry {
    pub fn builder() -> RegistryBuilder {
        RegistryBuilder::new()
    }

    /// Look up a provider by name.
    pub fn lookup(&self, name: &str) -> Result<Arc<dyn Provider>, Error> {
        self.providers.get(name).cloned().ok_or_else(|| {
            provider_error(
                ErrorKind::ProviderNotRegistered,
                &format!("no provider for {name} exists"),
            )
        })
    }

    /// Registered provider names in ascending order.
    pub fn list_names(&self) -> Vec<&str> {
        self.providers.keys().map(String::as_str).collect()
    }

    pub fn len(&self) -> usize {
        self.providers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.providers.is_empty()
    }
}

impl std::fmt::Debug for Registry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Registry")
            .field("providers", &self.list_names())
            .finish()
    }
}
