//! Unit tests for resource_manager.rs
//!
//! Error paths log through the engine logger and are #[serial].

use std::sync::Arc;
use serial_test::serial;
use crate::error::{Error, Result};
use crate::resource::{
    ManualResourceLoader, Resource, ResourceKind, ResourceManager, ResourceManagerConfig,
    ResourceNotifier, ResourceParams, UsageTracker,
};

// ============================================================================
// TEST HELPERS
// ============================================================================

struct Blob {
    bytes: usize,
    data: Option<Vec<u8>>,
    load_calls: u32,
}

impl ResourceKind for Blob {
    const RESOURCE_TYPE: &'static str = "Blob";

    fn load_impl(&mut self, _name: &str, _group: &str) -> Result<()> {
        self.load_calls += 1;
        self.data = Some(vec![0; self.bytes]);
        Ok(())
    }

    fn unload_impl(&mut self) {
        self.data = None;
    }

    fn calculate_size(&self) -> usize {
        self.data.as_ref().map_or(0, Vec::len)
    }

    fn set_parameter(&mut self, name: &str, value: &str) -> bool {
        match name {
            "bytes" => value.parse().map(|bytes| self.bytes = bytes).is_ok(),
            _ => false,
        }
    }
}

struct Generator;

impl ManualResourceLoader<Blob> for Generator {
    fn load_resource(&self, resource: &mut Resource<Blob>) -> Result<()> {
        let bytes = resource.kind().bytes;
        resource.kind_mut().data = Some(vec![7; bytes]);
        Ok(())
    }
}

fn manager(budget: usize) -> ResourceManager<Blob> {
    ResourceManager::new(ResourceManagerConfig { memory_budget: budget }, || Blob {
        bytes: 100,
        data: None,
        load_calls: 0,
    })
}

// ============================================================================
// CREATION AND LOOKUP
// ============================================================================

#[test]
fn test_config_default_budget_is_unbounded() {
    assert_eq!(ResourceManagerConfig::default().memory_budget, usize::MAX);
}

#[test]
fn test_create_registers_unloaded_resource() {
    let mut blobs = manager(usize::MAX);
    let handle = blobs.create("rock", "General", false, None, None).unwrap();

    assert_eq!(blobs.resource_type(), "Blob");
    assert_eq!(blobs.resource_count(), 1);
    assert!(blobs.resource_exists("rock"));
    assert!(!blobs.resource_exists("Rock"));
    assert_eq!(blobs.handle_of("rock"), Some(handle));

    let rock = blobs.get(handle).unwrap();
    assert_eq!(rock.handle(), handle);
    assert_eq!(rock.name(), "rock");
    assert!(!rock.is_loaded());
    assert_eq!(blobs.memory_usage(), 0);
}

#[test]
#[serial]
fn test_duplicate_name_is_rejected() {
    let mut blobs = manager(usize::MAX);
    blobs.create("rock", "General", false, None, None).unwrap();

    let result = blobs.create("rock", "Other", false, None, None);
    assert!(matches!(result, Err(Error::InvalidResource(_))));
    assert_eq!(blobs.resource_count(), 1);
}

#[test]
fn test_create_or_retrieve() {
    let mut blobs = manager(usize::MAX);
    let (first, created) = blobs.create_or_retrieve("rock", "General", false, None, None).unwrap();
    assert!(created);

    let (second, created) = blobs.create_or_retrieve("rock", "General", false, None, None).unwrap();
    assert!(!created);
    assert_eq!(first, second);
    assert_eq!(blobs.resource_count(), 1);
}

#[test]
fn test_creation_params_reach_the_kind() {
    let mut blobs = manager(usize::MAX);
    let mut params = ResourceParams::default();
    params.insert("bytes".to_string(), "42".to_string());
    params.insert("colour".to_string(), "red".to_string());

    let handle = blobs.create("rock", "General", false, None, Some(&params)).unwrap();
    assert_eq!(blobs.get(handle).unwrap().kind().bytes, 42);
}

#[test]
fn test_get_by_name_does_not_touch() {
    let mut blobs = manager(usize::MAX);
    blobs.create("rock", "General", false, None, None).unwrap();

    let rock = blobs.get_by_name("rock").unwrap();
    assert_eq!(rock.last_accessed(), 0);
    assert!(!rock.is_loaded());
    assert!(blobs.get_by_name("missing").is_none());
}

#[test]
fn test_get_by_handle_touches_and_loads() {
    let mut blobs = manager(usize::MAX);
    let handle = blobs.create("rock", "General", false, None, None).unwrap();

    let rock = blobs.get_by_handle(handle).unwrap();
    assert!(rock.is_loaded());
    assert!(rock.last_accessed() > 0);
    assert_eq!(blobs.memory_usage(), 100);
}

#[test]
fn test_handles_lists_every_resource() {
    let mut blobs = manager(usize::MAX);
    let a = blobs.create("a", "General", false, None, None).unwrap();
    let b = blobs.create("b", "General", false, None, None).unwrap();

    let handles: Vec<_> = blobs.handles().collect();
    assert_eq!(handles.len(), 2);
    assert!(handles.contains(&a));
    assert!(handles.contains(&b));
}

// ============================================================================
// LOAD / UNLOAD / RELOAD
// ============================================================================

#[test]
fn test_load_creates_and_loads() {
    let mut blobs = manager(usize::MAX);
    let handle = blobs.load("rock", "General").unwrap();
    let again = blobs.load("rock", "General").unwrap();

    assert_eq!(handle, again);
    let rock = blobs.get(handle).unwrap();
    assert!(rock.is_loaded());
    assert_eq!(rock.kind().load_calls, 1);
    assert_eq!(blobs.memory_usage(), 100);
}

#[test]
fn test_unload_updates_usage() {
    let mut blobs = manager(usize::MAX);
    let a = blobs.load("a", "General").unwrap();
    blobs.load("b", "General").unwrap();
    assert_eq!(blobs.memory_usage(), 200);

    blobs.unload(a).unwrap();
    assert_eq!(blobs.memory_usage(), 100);
    assert!(!blobs.get(a).unwrap().is_loaded());

    blobs.unload_by_name("b").unwrap();
    assert_eq!(blobs.memory_usage(), 0);
    assert_eq!(blobs.usage_tracker().loaded_count(), 0);
}

#[test]
#[serial]
fn test_unload_unknown_name_fails() {
    let mut blobs = manager(usize::MAX);
    assert!(matches!(blobs.unload_by_name("ghost"), Err(Error::InvalidResource(_))));
}

#[test]
fn test_unload_all_keeps_registrations() {
    let mut blobs = manager(usize::MAX);
    blobs.load("a", "General").unwrap();
    blobs.load("b", "General").unwrap();

    blobs.unload_all();
    assert_eq!(blobs.memory_usage(), 0);
    assert_eq!(blobs.resource_count(), 2);
}

#[test]
fn test_reload_all_only_touches_loaded() {
    let mut blobs = manager(usize::MAX);
    let a = blobs.load("a", "General").unwrap();
    let b = blobs.create("b", "General", false, None, None).unwrap();

    blobs.reload_all().unwrap();

    assert_eq!(blobs.get(a).unwrap().kind().load_calls, 2);
    assert_eq!(blobs.get(b).unwrap().kind().load_calls, 0);
    assert_eq!(blobs.memory_usage(), 100);
}

// ============================================================================
// REMOVAL
// ============================================================================

#[test]
fn test_remove_frees_name_and_memory() {
    let mut blobs = manager(usize::MAX);
    let handle = blobs.load("rock", "General").unwrap();

    blobs.remove(handle).unwrap();
    assert_eq!(blobs.resource_count(), 0);
    assert!(!blobs.resource_exists("rock"));
    assert!(blobs.get(handle).is_none());
    assert_eq!(blobs.memory_usage(), 0);

    // The name can be reused
    let fresh = blobs.create("rock", "General", false, None, None).unwrap();
    assert_ne!(fresh, handle);
}

#[test]
#[serial]
fn test_remove_stale_handle_fails() {
    let mut blobs = manager(usize::MAX);
    let handle = blobs.create("rock", "General", false, None, None).unwrap();
    blobs.remove_by_name("rock").unwrap();

    assert!(matches!(blobs.remove(handle), Err(Error::InvalidResource(_))));
    assert!(matches!(blobs.get_by_handle(handle), Err(Error::InvalidResource(_))));
}

#[test]
fn test_remove_all() {
    let mut blobs = manager(usize::MAX);
    blobs.load("a", "General").unwrap();
    blobs.create("b", "General", false, None, None).unwrap();

    blobs.remove_all();
    assert_eq!(blobs.resource_count(), 0);
    assert_eq!(blobs.memory_usage(), 0);
    assert!(!blobs.resource_exists("a"));
}

#[test]
fn test_dropping_manager_unloads_everything() {
    let mut blobs = manager(usize::MAX);
    blobs.load("a", "General").unwrap();
    let tracker = blobs.usage_tracker().clone();
    assert_eq!(tracker.total(), 100);

    drop(blobs);
    assert_eq!(tracker.total(), 0);
}

// ============================================================================
// MEMORY BUDGET
// ============================================================================

#[test]
fn test_usage_tracker_is_idempotent() {
    let mut blobs = manager(usize::MAX);
    let handle = blobs.create("a", "General", false, None, None).unwrap();

    let tracker = UsageTracker::new();
    tracker.resource_loaded(handle, 10);
    tracker.resource_loaded(handle, 10);
    assert_eq!(tracker.total(), 10);
    tracker.resource_unloaded(handle, 10);
    tracker.resource_unloaded(handle, 10);
    assert_eq!(tracker.total(), 0);
}

#[test]
fn test_check_usage_within_budget_does_nothing() {
    let mut blobs = manager(1000);
    blobs.load("a", "General").unwrap();
    assert_eq!(blobs.check_usage(), 0);
    assert_eq!(blobs.memory_usage(), 100);
}

#[test]
fn test_loading_past_budget_evicts_least_recent() {
    let mut blobs = manager(250);
    let a = blobs.load("a", "General").unwrap();
    let b = blobs.load("b", "General").unwrap();
    let c = blobs.load("c", "General").unwrap();

    assert!(!blobs.get(a).unwrap().is_loaded());
    assert!(blobs.get(b).unwrap().is_loaded());
    assert!(blobs.get(c).unwrap().is_loaded());
    assert_eq!(blobs.memory_usage(), 200);
}

#[test]
fn test_lowering_budget_respects_recent_touches() {
    let mut blobs = manager(usize::MAX);
    let a = blobs.load("a", "General").unwrap();
    let b = blobs.load("b", "General").unwrap();
    let c = blobs.load("c", "General").unwrap();
    blobs.get_by_handle(a).unwrap();

    blobs.set_memory_budget(150);

    assert_eq!(blobs.memory_budget(), 150);
    assert!(blobs.get(a).unwrap().is_loaded());
    assert!(!blobs.get(b).unwrap().is_loaded());
    assert!(!blobs.get(c).unwrap().is_loaded());
    assert_eq!(blobs.memory_usage(), 100);
}

#[test]
fn test_check_usage_reports_evictions() {
    let mut blobs = manager(usize::MAX);
    blobs.load("a", "General").unwrap();
    blobs.load("b", "General").unwrap();
    blobs.load("c", "General").unwrap();

    // Lower the budget without evicting through the setter
    blobs.memory_budget = 100;
    assert_eq!(blobs.check_usage(), 2);
    assert_eq!(blobs.check_usage(), 0);
}

#[test]
fn test_manual_resource_with_loader_is_evictable() {
    let mut blobs = manager(usize::MAX);
    let loader: Arc<dyn ManualResourceLoader<Blob>> = Arc::new(Generator);
    let handle = blobs.create("generated", "General", true, Some(loader), None).unwrap();
    blobs.get_by_handle(handle).unwrap();
    assert_eq!(blobs.memory_usage(), 100);

    blobs.set_memory_budget(0);
    assert!(!blobs.get(handle).unwrap().is_loaded());

    // The loader brings it back
    blobs.set_memory_budget(usize::MAX);
    let generated = blobs.get_by_handle(handle).unwrap();
    assert!(generated.is_loaded());
    assert_eq!(generated.kind().data.as_deref(), Some(&[7u8; 100][..]));
}
