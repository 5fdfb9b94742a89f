use std::{
	sync::{
		atomic::{AtomicUsize, Ordering},
		Arc, Mutex,
	},
	time::Duration,
};

use scopes_rpc::{
	CannedQuery, CompletionStatus, RegistryError, Runtime, ScopeMetadata, ScopeState,
	SearchMetadata,
};
use tokio::time::timeout;
use tracing_test::traced_test;

mod common;

use common::{listeners::SearchRecorder, scopes::StreamScope};

const DEADLINE: Duration = Duration::from_secs(5);

#[tokio::test]
#[traced_test]
async fn register_find_and_search_roundtrip() {
	let runtime = Runtime::new();

	runtime
		.register_scope(
			ScopeMetadata::new("music", "Music")
				.with_description("local music library")
				.with_author("tests"),
			Arc::new(StreamScope::new(2)),
		)
		.unwrap();

	let registry = runtime.registry();

	let metadata = registry.get_metadata("music").await.unwrap();
	assert_eq!(metadata.display_name(), "Music");
	assert_eq!(metadata.description(), "local music library");

	let listing = registry.list().await.unwrap();
	assert_eq!(listing.len(), 1);
	assert!(listing.contains_key("music"));

	let scope = registry.find("music").await.unwrap();

	let listener = SearchRecorder::new();
	let _ctrl = scope
		.search(
			CannedQuery::new("music", "q"),
			SearchMetadata::default(),
			listener.clone(),
		)
		.unwrap();

	let details = timeout(DEADLINE, listener.wait_finished()).await.unwrap();
	assert_eq!(details.status(), CompletionStatus::Ok);
	assert_eq!(listener.result_count(), 2);

	runtime.shutdown();
}

#[tokio::test]
#[traced_test]
async fn unknown_and_invalid_ids_are_rejected() {
	let runtime = Runtime::new();
	let registry = runtime.registry();

	assert!(matches!(
		registry.find("nope").await.unwrap_err(),
		RegistryError::NotFound(_)
	));

	assert!(matches!(
		registry.get_metadata("").await.unwrap_err(),
		RegistryError::EmptyId
	));

	assert!(matches!(
		registry.get_metadata("a/b").await.unwrap_err(),
		RegistryError::InvalidId(_)
	));

	assert!(matches!(
		runtime
			.register_scope(ScopeMetadata::new("", "Empty"), Arc::new(StreamScope::new(0)))
			.unwrap_err(),
		RegistryError::EmptyId
	));

	runtime.shutdown();
}

#[tokio::test]
#[traced_test]
async fn re_registration_replaces_the_existing_entry() {
	let runtime = Runtime::new();

	let proxy = runtime
		.register_scope(
			ScopeMetadata::new("music", "Music"),
			Arc::new(StreamScope::new(0)),
		)
		.unwrap();

	// Direct re-add under the same id reports a replacement, not a new entry.
	let registry_object = runtime.registry_object();
	assert!(!registry_object
		.add(
			"music",
			ScopeMetadata::new("music", "Music v2"),
			proxy.clone(),
		)
		.unwrap());
	assert!(registry_object
		.add("films", ScopeMetadata::new("films", "Films"), proxy)
		.unwrap());

	let metadata = runtime.registry().get_metadata("music").await.unwrap();
	assert_eq!(metadata.display_name(), "Music v2");

	runtime.shutdown();
}

#[tokio::test]
#[traced_test]
async fn unregister_removes_the_scope() {
	let runtime = Runtime::new();

	runtime
		.register_scope(
			ScopeMetadata::new("music", "Music"),
			Arc::new(StreamScope::new(0)),
		)
		.unwrap();

	assert!(runtime.unregister_scope("music").unwrap());
	assert!(!runtime.unregister_scope("music").unwrap());

	assert!(matches!(
		runtime.registry().find("music").await.unwrap_err(),
		RegistryError::NotFound(_)
	));

	runtime.shutdown();
}

#[tokio::test]
#[traced_test]
async fn scope_state_callbacks_observe_the_lifecycle() {
	let runtime = Runtime::new();

	let states = Arc::new(Mutex::new(Vec::new()));

	runtime.registry_object().set_scope_state_callback("music", {
		let states = Arc::clone(&states);
		Arc::new(move |state| states.lock().unwrap().push(state))
	});

	runtime
		.register_scope(
			ScopeMetadata::new("music", "Music"),
			Arc::new(StreamScope::new(0)),
		)
		.unwrap();
	runtime.unregister_scope("music").unwrap();

	assert_eq!(
		*states.lock().unwrap(),
		vec![ScopeState::Running, ScopeState::Stopped]
	);

	runtime.shutdown();
}

#[tokio::test]
#[traced_test]
async fn list_update_callback_fires_on_add_and_remove() {
	let runtime = Runtime::new();

	let updates = Arc::new(AtomicUsize::new(0));

	runtime.registry_object().set_list_update_callback({
		let updates = Arc::clone(&updates);
		Arc::new(move || {
			updates.fetch_add(1, Ordering::AcqRel);
		})
	});

	runtime
		.register_scope(
			ScopeMetadata::new("music", "Music"),
			Arc::new(StreamScope::new(0)),
		)
		.unwrap();
	runtime.unregister_scope("music").unwrap();

	assert_eq!(updates.load(Ordering::Acquire), 2);

	runtime.shutdown();
}

#[tokio::test]
#[traced_test]
async fn concurrent_mutation_keeps_the_map_consistent() {
	let runtime = Runtime::new();

	let proxy = runtime
		.register_scope(
			ScopeMetadata::new("seed", "Seed"),
			Arc::new(StreamScope::new(0)),
		)
		.unwrap();

	let registry_object = Arc::clone(runtime.registry_object());

	let workers = (0..8)
		.map(|worker| {
			let registry_object = Arc::clone(&registry_object);
			let proxy = proxy.clone();

			tokio::spawn(async move {
				for i in 0..50 {
					let id = format!("scope-{worker}-{i}");

					assert!(registry_object
						.add(id.clone(), ScopeMetadata::new(id.clone(), id.clone()), proxy.clone())
						.unwrap());
					assert!(registry_object.locate(&id).is_ok());

					// Snapshots taken mid-churn always contain whole entries.
					for (list_id, metadata) in registry_object.list() {
						assert_eq!(list_id, metadata.scope_id());
					}

					assert!(registry_object.remove(&id).unwrap());
				}
			})
		})
		.collect::<Vec<_>>();

	for worker in workers {
		worker.await.unwrap();
	}

	let listing = registry_object.list();
	assert_eq!(listing.len(), 1);
	assert!(listing.contains_key("seed"));

	runtime.shutdown();
}

#[tokio::test]
#[traced_test]
async fn lookups_fail_once_the_runtime_shuts_down() {
	let runtime = Runtime::new();

	runtime
		.register_scope(
			ScopeMetadata::new("music", "Music"),
			Arc::new(StreamScope::new(0)),
		)
		.unwrap();

	runtime.shutdown();

	assert!(matches!(
		runtime.registry().find("music").await.unwrap_err(),
		RegistryError::Middleware(_)
	));
}
