use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use fieldcast_model::replicated;
use fieldcast_store::{AttrMap, MemoryBackend, PubSub, StoreError, StoreResult, Subscription};
use fieldcast_sync::{
    ChangeListener, ChangeMessage, HandleConfig, MirrorRegistry, ObjectHandle, SyncError,
};
use fieldcast_types::{ObjectId, Ulid};
use tokio::sync::RwLock;
use tokio::time::sleep;

replicated! {
    #[derive(Debug, Default, Clone)]
    struct User {
        name: String,
        email: String,
        age: u32,
    }
}

replicated! {
    #[derive(Debug, Default)]
    struct Contact {
        name: String,
        email: String => "email_address",
    }
}

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

fn harness() -> (Arc<MemoryBackend>, ObjectHandle, ChangeListener) {
    init_tracing();
    let backend = Arc::new(MemoryBackend::new());
    let writer = ObjectHandle::new(
        backend.clone(),
        backend.clone(),
        HandleConfig::for_prefix("user"),
    );
    let listener = ChangeListener::new(backend.clone(), "user-updates");
    (backend, writer, listener)
}

fn alice() -> User {
    User {
        name: "Alice".into(),
        email: "alice@example.com".into(),
        age: 30,
    }
}

// ── Delivery ────────────────────────────────────────────────────

#[tokio::test]
async fn full_replication_round_trip() {
    let (backend, mut writer, mut listener) = harness();
    let mut ours = alice();
    writer.save(&ours).await.unwrap();
    let id = writer.id().unwrap().clone();

    // Peer process: load the object, then mirror it live.
    let mut reader = ObjectHandle::new(
        backend.clone(),
        backend.clone(),
        HandleConfig::for_prefix("user"),
    );
    let mut theirs = User::default();
    reader.load(id.clone(), &mut theirs).await.unwrap();
    assert_eq!(theirs.name, "Alice");

    let mirror = Arc::new(RwLock::new(theirs));
    listener.register(id, mirror.clone()).await;
    listener.start().await.unwrap();

    ours.email = "alice@new.example".into();
    writer.save(&ours).await.unwrap();

    let mut applied = false;
    for _ in 0..100 {
        if mirror.read().await.email == "alice@new.example" {
            applied = true;
            break;
        }
        sleep(Duration::from_millis(10)).await;
    }
    assert!(applied, "change never reached the mirror");
    // Fields the save did not touch keep their loaded values.
    assert_eq!(mirror.read().await.name, "Alice");
    assert_eq!(mirror.read().await.age, 30);
    listener.stop().await;
}

#[tokio::test]
async fn applies_remote_changes_to_a_registered_mirror() {
    let (_backend, mut writer, mut listener) = harness();
    let mut user = alice();
    writer.save(&user).await.unwrap();
    let id = writer.id().unwrap().clone();

    let mirror = Arc::new(RwLock::new(User::default()));
    listener.register(id, mirror.clone()).await;
    listener.start().await.unwrap();

    user.email = "moved@example.com".into();
    writer.save(&user).await.unwrap();

    let mut applied = false;
    for _ in 0..100 {
        if mirror.read().await.email == "moved@example.com" {
            applied = true;
            break;
        }
        sleep(Duration::from_millis(10)).await;
    }
    assert!(applied, "change never reached the mirror");
    listener.stop().await;
}

#[tokio::test]
async fn mirror_tracks_a_sequence_of_saves() {
    let (_backend, mut writer, mut listener) = harness();
    let mut user = alice();
    writer.save(&user).await.unwrap();
    let id = writer.id().unwrap().clone();

    let mirror = Arc::new(RwLock::new(User::default()));
    listener.start().await.unwrap();
    listener.register(id, mirror.clone()).await;

    for age in [31, 32, 33] {
        user.age = age;
        writer.save(&user).await.unwrap();
    }

    let mut applied = false;
    for _ in 0..100 {
        if mirror.read().await.age == 33 {
            applied = true;
            break;
        }
        sleep(Duration::from_millis(10)).await;
    }
    assert!(applied, "final age never reached the mirror");
    listener.stop().await;
}

#[tokio::test]
async fn objects_update_independently() {
    let (backend, mut one, mut listener) = harness();
    let mut first = alice();
    one.save(&first).await.unwrap();
    let first_id = one.id().unwrap().clone();

    let mut two = ObjectHandle::new(
        backend.clone(),
        backend.clone(),
        HandleConfig::for_prefix("user"),
    );
    let mut second = User {
        name: "Bob".into(),
        email: "bob@example.com".into(),
        age: 40,
    };
    two.save(&second).await.unwrap();
    let second_id = two.id().unwrap().clone();

    let first_mirror = Arc::new(RwLock::new(User::default()));
    let second_mirror = Arc::new(RwLock::new(User::default()));
    listener.register(first_id, first_mirror.clone()).await;
    listener.register(second_id, second_mirror.clone()).await;
    listener.start().await.unwrap();

    second.email = "bob@elsewhere.com".into();
    two.save(&second).await.unwrap();

    let mut applied = false;
    for _ in 0..100 {
        if second_mirror.read().await.email == "bob@elsewhere.com" {
            applied = true;
            break;
        }
        sleep(Duration::from_millis(10)).await;
    }
    assert!(applied, "change never reached the second mirror");
    // The other object's mirror saw nothing.
    assert_eq!(first_mirror.read().await.email, "");

    first.email = "alice@elsewhere.com".into();
    one.save(&first).await.unwrap();

    let mut applied = false;
    for _ in 0..100 {
        if first_mirror.read().await.email == "alice@elsewhere.com" {
            applied = true;
            break;
        }
        sleep(Duration::from_millis(10)).await;
    }
    assert!(applied, "change never reached the first mirror");
    listener.stop().await;
}

#[tokio::test]
async fn override_attributes_map_back_to_fields() {
    init_tracing();
    let backend = Arc::new(MemoryBackend::new());
    let mut writer = ObjectHandle::new(
        backend.clone(),
        backend.clone(),
        HandleConfig::for_prefix("contact"),
    );
    let mut contact = Contact {
        name: "Carol".into(),
        email: "carol@example.com".into(),
    };
    writer.save(&contact).await.unwrap();
    let id = writer.id().unwrap().clone();

    let mut listener = ChangeListener::new(backend.clone(), "contact-updates");
    let mirror = Arc::new(RwLock::new(Contact::default()));
    listener.register(id, mirror.clone()).await;
    listener.start().await.unwrap();

    contact.email = "carol@elsewhere.com".into();
    writer.save(&contact).await.unwrap();

    let mut applied = false;
    for _ in 0..100 {
        if mirror.read().await.email == "carol@elsewhere.com" {
            applied = true;
            break;
        }
        sleep(Duration::from_millis(10)).await;
    }
    assert!(applied, "overridden attribute never mapped back");
    listener.stop().await;
}

// ── Registration ────────────────────────────────────────────────

#[tokio::test]
async fn registry_keeps_one_mirror_per_identifier() {
    let registry = MirrorRegistry::new();
    let id = ObjectId::from_parts("user", Ulid::from_parts(1_700_000_000_000, 42));

    let first = Arc::new(RwLock::new(User::default()));
    let second = Arc::new(RwLock::new(User::default()));
    registry.register(id.clone(), first.clone()).await;
    registry.register(id.clone(), second.clone()).await;
    assert_eq!(registry.len().await, 1);

    let mut changes = AttrMap::new();
    changes.insert("name".into(), "Dana".into());
    let applied = registry.apply(&ChangeMessage::new(id, changes)).await;

    assert_eq!(applied, Some(1));
    assert_eq!(second.read().await.name, "Dana");
    // The replaced mirror was never written.
    assert_eq!(first.read().await.name, "");
}

#[tokio::test]
async fn re_registering_an_identifier_replaces_the_mirror() {
    let (_backend, mut writer, mut listener) = harness();
    let mut user = alice();
    writer.save(&user).await.unwrap();
    let id = writer.id().unwrap().clone();

    let replaced = Arc::new(RwLock::new(User::default()));
    let current = Arc::new(RwLock::new(User::default()));
    listener.register(id.clone(), replaced.clone()).await;
    listener.register(id, current.clone()).await;
    assert_eq!(listener.registry().len().await, 1);
    listener.start().await.unwrap();

    user.email = "replacement@example.com".into();
    writer.save(&user).await.unwrap();

    let mut applied = false;
    for _ in 0..100 {
        if current.read().await.email == "replacement@example.com" {
            applied = true;
            break;
        }
        sleep(Duration::from_millis(10)).await;
    }
    assert!(applied, "change never reached the replacing mirror");
    // The replaced mirror saw nothing.
    assert_eq!(replaced.read().await.email, "");
    listener.stop().await;
}

// ── Robustness ──────────────────────────────────────────────────

#[tokio::test]
async fn garbage_payloads_are_skipped() {
    let (backend, mut writer, mut listener) = harness();
    let mut user = alice();
    writer.save(&user).await.unwrap();
    let id = writer.id().unwrap().clone();

    let mirror = Arc::new(RwLock::new(User::default()));
    listener.register(id, mirror.clone()).await;
    listener.start().await.unwrap();

    backend.publish("user-updates", "{{{ not json").await.unwrap();
    backend.publish("user-updates", "\"wrong shape\"").await.unwrap();

    user.email = "still@alive.com".into();
    writer.save(&user).await.unwrap();

    let mut applied = false;
    for _ in 0..100 {
        if mirror.read().await.email == "still@alive.com" {
            applied = true;
            break;
        }
        sleep(Duration::from_millis(10)).await;
    }
    assert!(applied, "listener did not survive garbage payloads");
    listener.stop().await;
}

#[tokio::test]
async fn unmapped_attributes_are_ignored() {
    let (backend, mut writer, mut listener) = harness();
    writer.save(&alice()).await.unwrap();
    let id = writer.id().unwrap().clone();

    let mirror = Arc::new(RwLock::new(User::default()));
    listener.register(id.clone(), mirror.clone()).await;
    listener.start().await.unwrap();

    let mut changes = AttrMap::new();
    changes.insert("ghost".into(), "1".into());
    changes.insert("email".into(), "real@example.com".into());
    let payload = ChangeMessage::new(id, changes).encode().unwrap();
    backend.publish("user-updates", &payload).await.unwrap();

    let mut applied = false;
    for _ in 0..100 {
        if mirror.read().await.email == "real@example.com" {
            applied = true;
            break;
        }
        sleep(Duration::from_millis(10)).await;
    }
    assert!(applied, "mapped attribute never applied");
    listener.stop().await;
}

#[tokio::test]
async fn messages_for_unregistered_objects_are_ignored() {
    let (_backend, mut writer, mut listener) = harness();
    listener.start().await.unwrap();

    // Nothing registered; deliveries must be absorbed quietly.
    writer.save(&alice()).await.unwrap();
    sleep(Duration::from_millis(50)).await;

    assert!(listener.is_listening());
    assert!(listener.registry().is_empty().await);
    listener.stop().await;
}

#[tokio::test]
async fn unregister_stops_application() {
    let (_backend, mut writer, mut listener) = harness();
    let mut user = alice();
    writer.save(&user).await.unwrap();
    let id = writer.id().unwrap().clone();

    let mirror = Arc::new(RwLock::new(User::default()));
    listener.register(id.clone(), mirror.clone()).await;
    listener.start().await.unwrap();

    user.email = "first@example.com".into();
    writer.save(&user).await.unwrap();

    let mut applied = false;
    for _ in 0..100 {
        if mirror.read().await.email == "first@example.com" {
            applied = true;
            break;
        }
        sleep(Duration::from_millis(10)).await;
    }
    assert!(applied, "first change never reached the mirror");

    assert!(listener.unregister(&id).await);
    assert!(!listener.unregister(&id).await);

    user.email = "second@example.com".into();
    writer.save(&user).await.unwrap();
    sleep(Duration::from_millis(100)).await;

    assert_eq!(mirror.read().await.email, "first@example.com");
    listener.stop().await;
}

#[tokio::test]
async fn dropped_mirrors_are_pruned_on_delivery() {
    let (_backend, mut writer, mut listener) = harness();
    let mut user = alice();
    writer.save(&user).await.unwrap();
    let id = writer.id().unwrap().clone();

    let mirror = Arc::new(RwLock::new(User::default()));
    listener.register(id, mirror.clone()).await;
    listener.start().await.unwrap();
    assert_eq!(listener.registry().len().await, 1);

    drop(mirror);
    user.age = 31;
    writer.save(&user).await.unwrap();

    let mut pruned = false;
    for _ in 0..100 {
        if listener.registry().is_empty().await {
            pruned = true;
            break;
        }
        sleep(Duration::from_millis(10)).await;
    }
    assert!(pruned, "dead registration never pruned");
    listener.stop().await;
}

// ── Lifecycle ───────────────────────────────────────────────────

#[tokio::test]
async fn start_is_idempotent_and_stop_is_terminal() {
    let (_backend, _writer, mut listener) = harness();
    assert!(!listener.is_listening());

    listener.start().await.unwrap();
    assert!(listener.is_listening());
    listener.start().await.unwrap();
    assert!(listener.is_listening());

    listener.stop().await;
    assert!(!listener.is_listening());

    let err = listener.start().await.unwrap_err();
    assert!(matches!(err, SyncError::ListenerStopped));
}

#[tokio::test]
async fn stop_halts_delivery() {
    let (_backend, mut writer, mut listener) = harness();
    let mut user = alice();
    writer.save(&user).await.unwrap();
    let id = writer.id().unwrap().clone();

    let mirror = Arc::new(RwLock::new(User::default()));
    listener.register(id, mirror.clone()).await;
    listener.start().await.unwrap();

    user.email = "seen@example.com".into();
    writer.save(&user).await.unwrap();

    let mut applied = false;
    for _ in 0..100 {
        if mirror.read().await.email == "seen@example.com" {
            applied = true;
            break;
        }
        sleep(Duration::from_millis(10)).await;
    }
    assert!(applied, "change never reached the mirror");

    listener.stop().await;

    user.email = "unseen@example.com".into();
    writer.save(&user).await.unwrap();
    sleep(Duration::from_millis(100)).await;

    assert_eq!(mirror.read().await.email, "seen@example.com");
}

struct OfflineBus;

#[async_trait]
impl PubSub for OfflineBus {
    async fn publish(&self, _channel: &str, _payload: &str) -> StoreResult<()> {
        Err(StoreError::Backend("bus offline".into()))
    }

    async fn subscribe(&self, _channel: &str) -> StoreResult<Box<dyn Subscription>> {
        Err(StoreError::Backend("bus offline".into()))
    }
}

#[tokio::test]
async fn subscribe_failure_surfaces_as_transport_error() {
    init_tracing();
    let mut listener = ChangeListener::new(Arc::new(OfflineBus), "user-updates");
    let err = listener.start().await.unwrap_err();
    assert!(matches!(err, SyncError::Transport(_)));
    assert!(!listener.is_listening());
}
