/// Resource - the load/unload/reload state machine shared by every
/// managed asset type.
///
/// A `Resource<K>` carries the bookkeeping (name, group, handle, loading
/// state, size, last access tick) and delegates the actual data work to its
/// `ResourceKind` payload. Manual resources obtain their data from an
/// injected `ManualResourceLoader` instead of the kind's own `load_impl`.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use slotmap::new_key_type;
use crate::error::Result;

new_key_type! {
    /// Stable handle of a resource inside its manager
    pub struct ResourceHandle;
}

/// Process-wide access counter (starts at 1; 0 means "never accessed")
static ACCESS_TICK: AtomicU64 = AtomicU64::new(1);

fn next_access_tick() -> u64 {
    ACCESS_TICK.fetch_add(1, Ordering::Relaxed)
}

// ===== LOADING STATE =====

/// Lifecycle state of a resource
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum LoadingState {
    #[default]
    Unloaded,
    Loading,
    Loaded,
    Unloading,
}

// ===== TRAITS =====

/// Type-specific half of a resource.
///
/// `Resource<K>` drives the state machine and calls these hooks in the order
/// `pre_load`, `load_impl`, `calculate_size`, `post_load` on load and
/// `pre_unload`, `unload_impl`, `post_unload` on unload.
pub trait ResourceKind: Send + 'static {
    /// Type name used in log messages ("Texture", "Mesh", ...)
    const RESOURCE_TYPE: &'static str;

    /// Load the data for a non-manual resource
    fn load_impl(&mut self, name: &str, group: &str) -> Result<()>;

    /// Release the loaded data
    fn unload_impl(&mut self);

    /// Bytes held while loaded
    fn calculate_size(&self) -> usize;

    fn pre_load(&mut self) {}

    fn post_load(&mut self) {}

    fn pre_unload(&mut self) {}

    fn post_unload(&mut self) {}

    /// Apply a named creation parameter. Returns false for unknown keys.
    fn set_parameter(&mut self, _name: &str, _value: &str) -> bool {
        false
    }
}

/// Supplies the data of a manually loaded resource.
///
/// Called synchronously from `Resource::load` while the resource is in the
/// `Loading` state.
pub trait ManualResourceLoader<K: ResourceKind>: Send + Sync {
    fn load_resource(&self, resource: &mut Resource<K>) -> Result<()>;
}

/// Receives lifecycle notifications from resources (the owning manager).
pub trait ResourceNotifier: Send + Sync {
    fn resource_loaded(&self, handle: ResourceHandle, size: usize);

    fn resource_unloaded(&self, handle: ResourceHandle, size: usize);

    fn resource_touched(&self, handle: ResourceHandle, tick: u64);
}

// ===== RESOURCE =====

/// A named, lazily loaded resource
pub struct Resource<K: ResourceKind> {
    name: String,
    group: String,
    handle: ResourceHandle,
    state: LoadingState,
    is_manual: bool,
    size: usize,
    last_accessed: u64,
    /// Where the data came from (file path, description)
    origin: Option<String>,
    loader: Option<Arc<dyn ManualResourceLoader<K>>>,
    creator: Option<Arc<dyn ResourceNotifier>>,
    kind: K,
}

impl<K: ResourceKind> Resource<K> {
    /// Create an unloaded resource
    ///
    /// The handle stays null until a manager registers the resource.
    pub fn new(
        name: impl Into<String>,
        group: impl Into<String>,
        is_manual: bool,
        loader: Option<Arc<dyn ManualResourceLoader<K>>>,
        kind: K,
    ) -> Self {
        Self {
            name: name.into(),
            group: group.into(),
            handle: ResourceHandle::default(),
            state: LoadingState::Unloaded,
            is_manual,
            size: 0,
            last_accessed: 0,
            origin: None,
            loader,
            creator: None,
            kind,
        }
    }

    // ===== LIFECYCLE =====

    /// Load the resource if it is unloaded.
    ///
    /// A manual resource without a loader logs a warning and stays unloaded.
    /// On failure the state returns to `Unloaded` and the error propagates.
    pub fn load(&mut self) -> Result<()> {
        if self.state != LoadingState::Unloaded {
            return Ok(());
        }

        if self.is_manual && self.loader.is_none() {
            crate::engine_warn!("helios3d::Resource",
                "{} instance '{}' was defined as manually loaded, but no manual loader was provided. \
                 This resource will be lost if it has to be reloaded.",
                K::RESOURCE_TYPE, self.name);
            return Ok(());
        }

        self.state = LoadingState::Loading;
        self.kind.pre_load();

        let result = match (self.is_manual, self.loader.clone()) {
            (true, Some(loader)) => loader.load_resource(self),
            _ => self.kind.load_impl(&self.name, &self.group),
        };
        if let Err(error) = result {
            self.state = LoadingState::Unloaded;
            return Err(error);
        }

        self.size = self.kind.calculate_size();
        self.kind.post_load();
        self.state = LoadingState::Loaded;

        crate::engine_trace!("helios3d::Resource",
            "Loaded {} '{}' ({} bytes)", K::RESOURCE_TYPE, self.name, self.size);
        if let Some(creator) = &self.creator {
            creator.resource_loaded(self.handle, self.size);
        }
        Ok(())
    }

    /// Unload the resource if it is loaded
    pub fn unload(&mut self) {
        if self.state != LoadingState::Loaded {
            return;
        }

        self.state = LoadingState::Unloading;
        self.kind.pre_unload();
        self.kind.unload_impl();
        self.kind.post_unload();

        let freed = std::mem::take(&mut self.size);
        self.state = LoadingState::Unloaded;

        crate::engine_trace!("helios3d::Resource",
            "Unloaded {} '{}' ({} bytes)", K::RESOURCE_TYPE, self.name, freed);
        if let Some(creator) = &self.creator {
            creator.resource_unloaded(self.handle, freed);
        }
    }

    /// Unload then load again. Does nothing when not loaded.
    pub fn reload(&mut self) -> Result<()> {
        if self.state != LoadingState::Loaded {
            return Ok(());
        }
        self.unload();
        self.load()
    }

    /// Mark as used now, loading it first if needed
    pub fn touch(&mut self) -> Result<()> {
        self.last_accessed = next_access_tick();
        if self.state == LoadingState::Unloaded {
            self.load()?;
        }
        if let Some(creator) = &self.creator {
            creator.resource_touched(self.handle, self.last_accessed);
        }
        Ok(())
    }

    // ===== ACCESSORS =====

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn group(&self) -> &str {
        &self.group
    }

    pub fn handle(&self) -> ResourceHandle {
        self.handle
    }

    pub fn loading_state(&self) -> LoadingState {
        self.state
    }

    pub fn is_loaded(&self) -> bool {
        self.state == LoadingState::Loaded
    }

    pub fn is_loading(&self) -> bool {
        self.state == LoadingState::Loading
    }

    pub fn is_manually_loaded(&self) -> bool {
        self.is_manual
    }

    /// Whether the data can be recreated after an unload
    pub fn is_reloadable(&self) -> bool {
        !self.is_manual || self.loader.is_some()
    }

    /// Bytes held while loaded (0 when unloaded)
    pub fn size(&self) -> usize {
        self.size
    }

    /// Tick of the last `touch` (0 if never touched)
    pub fn last_accessed(&self) -> u64 {
        self.last_accessed
    }

    pub fn origin(&self) -> Option<&str> {
        self.origin.as_deref()
    }

    pub fn set_origin(&mut self, origin: impl Into<String>) {
        self.origin = Some(origin.into());
    }

    pub fn has_loader(&self) -> bool {
        self.loader.is_some()
    }

    pub fn kind(&self) -> &K {
        &self.kind
    }

    pub fn kind_mut(&mut self) -> &mut K {
        &mut self.kind
    }

    /// Install the object notified of load/unload/touch events
    pub fn set_notifier(&mut self, creator: Option<Arc<dyn ResourceNotifier>>) {
        self.creator = creator;
    }

    pub(crate) fn set_handle(&mut self, handle: ResourceHandle) {
        self.handle = handle;
    }

    /// Change the loading state directly (used by kinds loading from memory)
    pub(crate) fn set_loading_state(&mut self, state: LoadingState) {
        self.state = state;
    }

    /// Refresh the recorded size and report it (used after in-memory loads)
    pub(crate) fn finish_external_load(&mut self) {
        self.size = self.kind.calculate_size();
        self.state = LoadingState::Loaded;
        if let Some(creator) = &self.creator {
            creator.resource_loaded(self.handle, self.size);
        }
    }
}

impl<K: ResourceKind> Drop for Resource<K> {
    fn drop(&mut self) {
        self.unload();
    }
}

impl<K: ResourceKind> std::fmt::Debug for Resource<K> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Resource")
            .field("type", &K::RESOURCE_TYPE)
            .field("name", &self.name)
            .field("group", &self.group)
            .field("state", &self.state)
            .field("size", &self.size)
            .finish()
    }
}

#[cfg(test)]
#[path = "resource_tests.rs"]
mod tests;
