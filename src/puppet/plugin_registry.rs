// Copyright (c) 2025 Bountyy Oy. All rights reserved.
// This software is proprietary and confidential.

use std::collections::HashMap;
use tracing::debug;

use crate::errors::RegistryError;
use crate::plugins::{CredentialsCollector, Exploiter, Fingerprinter, Payload, PluginHandle};
use crate::types::{PluginKind, PluginName};

/// Keyed store of every plugin the agent has loaded.
///
/// Loading happens once during agent startup while the registry is still
/// exclusively owned. Afterwards it is shared behind an `Arc` and only read,
/// so lookups need no locking.
#[derive(Debug, Default)]
pub struct PluginRegistry {
    plugins: HashMap<PluginKind, HashMap<PluginName, PluginHandle>>,
}

impl PluginRegistry {
    pub fn new() -> Self {
        Self {
            plugins: HashMap::new(),
        }
    }

    /// Register a plugin under its manifest name. Fails if a plugin of the
    /// same kind and name is already present; an existing registration is
    /// never overwritten.
    pub fn load_plugin(&mut self, handle: PluginHandle) -> Result<(), RegistryError> {
        let kind = handle.kind();
        let name = handle.name().clone();

        let slot = self.plugins.entry(kind).or_default();
        if slot.contains_key(&name) {
            return Err(RegistryError::DuplicateRegistration { kind, name });
        }

        debug!(kind = %kind, name = %name, "Loaded plugin");
        slot.insert(name, handle);
        Ok(())
    }

    /// Look up a plugin. No fallback of any sort: an unknown kind/name pair
    /// is an error the caller must handle.
    pub fn get_plugin(
        &self,
        kind: PluginKind,
        name: &PluginName,
    ) -> Result<&PluginHandle, RegistryError> {
        self.plugins
            .get(&kind)
            .and_then(|slot| slot.get(name))
            .ok_or_else(|| RegistryError::PluginNotFound {
                kind,
                name: name.clone(),
            })
    }

    pub fn credentials_collector(
        &self,
        name: &PluginName,
    ) -> Result<&dyn CredentialsCollector, RegistryError> {
        match self.get_plugin(PluginKind::CredentialsCollector, name)? {
            PluginHandle::CredentialsCollector(plugin) => Ok(plugin.as_ref()),
            // load_plugin keys by variant, so a mismatched handle cannot be
            // stored under this kind
            _ => Err(RegistryError::PluginNotFound {
                kind: PluginKind::CredentialsCollector,
                name: name.clone(),
            }),
        }
    }

    pub fn fingerprinter(&self, name: &PluginName) -> Result<&dyn Fingerprinter, RegistryError> {
        match self.get_plugin(PluginKind::Fingerprinter, name)? {
            PluginHandle::Fingerprinter(plugin) => Ok(plugin.as_ref()),
            _ => Err(RegistryError::PluginNotFound {
                kind: PluginKind::Fingerprinter,
                name: name.clone(),
            }),
        }
    }

    pub fn exploiter(&self, name: &PluginName) -> Result<&dyn Exploiter, RegistryError> {
        match self.get_plugin(PluginKind::Exploiter, name)? {
            PluginHandle::Exploiter(plugin) => Ok(plugin.as_ref()),
            _ => Err(RegistryError::PluginNotFound {
                kind: PluginKind::Exploiter,
                name: name.clone(),
            }),
        }
    }

    pub fn payload(&self, name: &PluginName) -> Result<&dyn Payload, RegistryError> {
        match self.get_plugin(PluginKind::Payload, name)? {
            PluginHandle::Payload(plugin) => Ok(plugin.as_ref()),
            _ => Err(RegistryError::PluginNotFound {
                kind: PluginKind::Payload,
                name: name.clone(),
            }),
        }
    }

    pub fn len(&self) -> usize {
        self.plugins.values().map(HashMap::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.plugins.values().all(HashMap::is_empty)
    }
}
