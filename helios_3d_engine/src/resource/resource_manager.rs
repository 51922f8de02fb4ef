/// Resource manager - registry, handle namespace and memory accounting for
/// one resource kind.
///
/// Resources live in a `SlotMap` keyed by `ResourceHandle`, with a name
/// index on the side. Every resource reports load/unload events to a shared
/// `UsageTracker`, which `check_usage` uses to evict the least recently
/// touched reloadable resources once the memory budget is exceeded.

use std::sync::{Arc, Mutex, PoisonError};
use rdst::RadixSort;
use rustc_hash::FxHashMap;
use slotmap::{Key, KeyData, SlotMap};
use crate::error::Result;
use super::resource::{ManualResourceLoader, Resource, ResourceHandle, ResourceKind, ResourceNotifier};

/// Named creation parameters forwarded to `ResourceKind::set_parameter`
pub type ResourceParams = FxHashMap<String, String>;

// ===== CONFIG =====

/// Resource manager configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResourceManagerConfig {
    /// Bytes of loaded data allowed before `check_usage` starts evicting
    pub memory_budget: usize,
}

impl Default for ResourceManagerConfig {
    fn default() -> Self {
        Self { memory_budget: usize::MAX }
    }
}

// ===== USAGE TRACKER =====

/// Tracks the loaded size of every resource of a manager.
///
/// Loaded events replace the recorded size and unloaded events remove it,
/// so duplicate notifications never double count.
#[derive(Debug, Default)]
pub struct UsageTracker {
    loaded: Mutex<FxHashMap<ResourceHandle, usize>>,
}

impl UsageTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Total bytes of loaded resources
    pub fn total(&self) -> usize {
        self.loaded.lock().unwrap_or_else(PoisonError::into_inner).values().sum()
    }

    /// Number of loaded resources
    pub fn loaded_count(&self) -> usize {
        self.loaded.lock().unwrap_or_else(PoisonError::into_inner).len()
    }
}

impl ResourceNotifier for UsageTracker {
    fn resource_loaded(&self, handle: ResourceHandle, size: usize) {
        self.loaded.lock().unwrap_or_else(PoisonError::into_inner).insert(handle, size);
    }

    fn resource_unloaded(&self, handle: ResourceHandle, _size: usize) {
        self.loaded.lock().unwrap_or_else(PoisonError::into_inner).remove(&handle);
    }

    fn resource_touched(&self, _handle: ResourceHandle, _tick: u64) {}
}

// ===== RESOURCE MANAGER =====

/// Owns every resource of kind `K`
pub struct ResourceManager<K: ResourceKind> {
    resources: SlotMap<ResourceHandle, Resource<K>>,
    /// Name to handle (case-sensitive, unique across groups)
    names: FxHashMap<String, ResourceHandle>,
    tracker: Arc<UsageTracker>,
    memory_budget: usize,
    /// Builds the payload of newly created resources
    factory: Box<dyn Fn() -> K + Send + Sync>,
}

impl<K: ResourceKind> ResourceManager<K> {
    /// Create an empty manager
    ///
    /// # Arguments
    ///
    /// * `config` - Memory budget
    /// * `factory` - Builds the default payload for each created resource
    pub fn new(config: ResourceManagerConfig, factory: impl Fn() -> K + Send + Sync + 'static) -> Self {
        Self {
            resources: SlotMap::with_key(),
            names: FxHashMap::default(),
            tracker: Arc::new(UsageTracker::new()),
            memory_budget: config.memory_budget,
            factory: Box::new(factory),
        }
    }

    /// Resource type name of this manager
    pub fn resource_type(&self) -> &'static str {
        K::RESOURCE_TYPE
    }

    // ===== CREATION =====

    /// Create and register an unloaded resource
    ///
    /// # Errors
    ///
    /// `InvalidResource` if a resource with this name already exists.
    pub fn create(
        &mut self,
        name: &str,
        group: &str,
        is_manual: bool,
        loader: Option<Arc<dyn ManualResourceLoader<K>>>,
        params: Option<&ResourceParams>,
    ) -> Result<ResourceHandle> {
        if self.names.contains_key(name) {
            crate::engine_bail!("helios3d::ResourceManager", InvalidResource =>
                "{} with the name '{}' already exists", K::RESOURCE_TYPE, name);
        }

        let mut kind = (self.factory)();
        if let Some(params) = params {
            for (key, value) in params {
                if !kind.set_parameter(key, value) {
                    crate::engine_debug!("helios3d::ResourceManager",
                        "{} '{}': ignoring unknown parameter '{}'", K::RESOURCE_TYPE, name, key);
                }
            }
        }

        let mut resource = Resource::new(name, group, is_manual, loader, kind);
        let notifier: Arc<dyn ResourceNotifier> = self.tracker.clone();
        resource.set_notifier(Some(notifier));

        let handle = self.resources.insert(resource);
        if let Some(resource) = self.resources.get_mut(handle) {
            resource.set_handle(handle);
        }
        self.names.insert(name.to_string(), handle);

        crate::engine_debug!("helios3d::ResourceManager",
            "Created {} '{}' in group '{}'", K::RESOURCE_TYPE, name, group);
        Ok(handle)
    }

    /// Return the existing resource with this name, or create it.
    ///
    /// The boolean is true when the resource was created by this call.
    pub fn create_or_retrieve(
        &mut self,
        name: &str,
        group: &str,
        is_manual: bool,
        loader: Option<Arc<dyn ManualResourceLoader<K>>>,
        params: Option<&ResourceParams>,
    ) -> Result<(ResourceHandle, bool)> {
        match self.names.get(name) {
            Some(&handle) => Ok((handle, false)),
            None => self.create(name, group, is_manual, loader, params).map(|handle| (handle, true)),
        }
    }

    /// Create the resource if needed, then load it
    pub fn load(&mut self, name: &str, group: &str) -> Result<ResourceHandle> {
        let (handle, _) = self.create_or_retrieve(name, group, false, None, None)?;
        self.load_handle(handle)?;
        Ok(handle)
    }

    /// Load a registered resource, then enforce the memory budget
    pub(crate) fn load_handle(&mut self, handle: ResourceHandle) -> Result<()> {
        let resource = self.resource_mut(handle)?;
        resource.load()?;
        resource.touch()?;
        self.check_usage();
        Ok(())
    }

    // ===== LOOKUP =====

    pub fn handle_of(&self, name: &str) -> Option<ResourceHandle> {
        self.names.get(name).copied()
    }

    /// Lookup by name (no touch)
    pub fn get_by_name(&self, name: &str) -> Option<&Resource<K>> {
        self.handle_of(name).and_then(|handle| self.resources.get(handle))
    }

    /// Lookup by handle, touching (and loading) the resource
    pub fn get_by_handle(&mut self, handle: ResourceHandle) -> Result<&mut Resource<K>> {
        let resource = self.resource_mut(handle)?;
        resource.touch()?;
        Ok(resource)
    }

    /// Lookup by handle (no touch)
    pub fn get(&self, handle: ResourceHandle) -> Option<&Resource<K>> {
        self.resources.get(handle)
    }

    /// Mutable lookup by handle (no touch)
    pub fn get_mut(&mut self, handle: ResourceHandle) -> Option<&mut Resource<K>> {
        self.resources.get_mut(handle)
    }

    pub fn resource_exists(&self, name: &str) -> bool {
        self.names.contains_key(name)
    }

    pub fn resource_count(&self) -> usize {
        self.resources.len()
    }

    pub fn handles(&self) -> impl Iterator<Item = ResourceHandle> + '_ {
        self.resources.keys()
    }

    fn resource_mut(&mut self, handle: ResourceHandle) -> Result<&mut Resource<K>> {
        match self.resources.get_mut(handle) {
            Some(resource) => Ok(resource),
            None => Err(crate::engine_err!("helios3d::ResourceManager", InvalidResource =>
                "No {} with handle {:?}", K::RESOURCE_TYPE, handle)),
        }
    }

    fn handle_by_name(&self, name: &str) -> Result<ResourceHandle> {
        match self.handle_of(name) {
            Some(handle) => Ok(handle),
            None => Err(crate::engine_err!("helios3d::ResourceManager", InvalidResource =>
                "{} '{}' not found", K::RESOURCE_TYPE, name)),
        }
    }

    // ===== UNLOAD / RELOAD =====

    pub fn unload(&mut self, handle: ResourceHandle) -> Result<()> {
        self.resource_mut(handle)?.unload();
        Ok(())
    }

    pub fn unload_by_name(&mut self, name: &str) -> Result<()> {
        let handle = self.handle_by_name(name)?;
        self.unload(handle)
    }

    /// Unload every resource (they stay registered)
    pub fn unload_all(&mut self) {
        for resource in self.resources.values_mut() {
            resource.unload();
        }
    }

    /// Reload every loaded resource, stopping at the first failure
    pub fn reload_all(&mut self) -> Result<()> {
        for resource in self.resources.values_mut() {
            resource.reload()?;
        }
        Ok(())
    }

    // ===== REMOVAL =====

    /// Unregister and drop a resource (unloading it first)
    pub fn remove(&mut self, handle: ResourceHandle) -> Result<()> {
        let Some(resource) = self.resources.remove(handle) else {
            crate::engine_bail!("helios3d::ResourceManager", InvalidResource =>
                "No {} with handle {:?}", K::RESOURCE_TYPE, handle);
        };
        self.names.remove(resource.name());
        crate::engine_debug!("helios3d::ResourceManager",
            "Removed {} '{}'", K::RESOURCE_TYPE, resource.name());
        Ok(())
    }

    pub fn remove_by_name(&mut self, name: &str) -> Result<()> {
        let handle = self.handle_by_name(name)?;
        self.remove(handle)
    }

    pub fn remove_all(&mut self) {
        self.resources.clear();
        self.names.clear();
    }

    // ===== MEMORY =====

    /// Bytes held by loaded resources
    pub fn memory_usage(&self) -> usize {
        self.tracker.total()
    }

    pub fn memory_budget(&self) -> usize {
        self.memory_budget
    }

    /// Change the budget and evict down to it
    pub fn set_memory_budget(&mut self, bytes: usize) {
        self.memory_budget = bytes;
        self.check_usage();
    }

    /// Shared tracker receiving this manager's resource notifications
    pub fn usage_tracker(&self) -> &Arc<UsageTracker> {
        &self.tracker
    }

    /// Unload least recently touched reloadable resources until usage fits
    /// the budget. Returns the number of resources unloaded.
    pub fn check_usage(&mut self) -> usize {
        let mut usage = self.memory_usage();
        if usage <= self.memory_budget {
            return 0;
        }

        // Sort key: access tick in the high half, handle bits in the low half
        let mut candidates: Vec<u128> = self.resources.iter()
            .filter(|(_, resource)| resource.is_loaded() && resource.is_reloadable())
            .map(|(handle, resource)| {
                ((resource.last_accessed() as u128) << 64) | handle.data().as_ffi() as u128
            })
            .collect();
        candidates.radix_sort_unstable();

        let mut evicted = 0;
        for key in candidates {
            if usage <= self.memory_budget {
                break;
            }
            let handle = ResourceHandle::from(KeyData::from_ffi(key as u64));
            if let Some(resource) = self.resources.get_mut(handle) {
                crate::engine_debug!("helios3d::ResourceManager",
                    "Evicting {} '{}' ({} bytes) to meet the memory budget",
                    K::RESOURCE_TYPE, resource.name(), resource.size());
                resource.unload();
                evicted += 1;
            }
            usage = self.memory_usage();
        }

        if usage > self.memory_budget {
            crate::engine_warn!("helios3d::ResourceManager",
                "{} memory usage {} still exceeds budget {} (remaining resources are not reloadable)",
                K::RESOURCE_TYPE, usage, self.memory_budget);
        }
        evicted
    }
}

#[cfg(test)]
#[path = "resource_manager_tests.rs"]
mod tests;
