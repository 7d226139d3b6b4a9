use super::*;
use crate::config::{ScanConfig, SshKeyPair};
use crate::git::ProvenanceSource;
use crate::EnvSentinelError;
use age::secrecy::ExposeSecret;
use pretty_assertions::assert_eq;
use std::collections::BTreeSet;
use tempfile::TempDir;

struct NoRemotes;

impl ProvenanceSource for NoRemotes {
    fn remotes(&self, _dir: &Path) -> BTreeSet<String> {
        BTreeSet::new()
    }
}

fn write_keypair(dir: &Path, name: &str) -> SshKeyPair {
    let identity = age::x25519::Identity::generate();
    let private = dir.join(name);
    let public = dir.join(format!("{name}.pub"));
    fs::write(&private, identity.to_string().expose_secret()).unwrap();
    fs::write(&public, identity.to_public().to_string()).unwrap();
    SshKeyPair { private, public }
}

fn test_config(dir: &Path) -> Config {
    Config {
        keys: vec![write_keypair(dir, "snapshot.key")],
        scan: ScanConfig::default(),
    }
}

fn tracked(dir: &Path, name: &str, content: &[u8]) -> TrackedFile {
    let path = dir.join(name);
    fs::write(&path, content).unwrap();
    TrackedFile::from_disk_with(&path, &NoRemotes).unwrap()
}

#[test]
fn test_open_close_round_trip() {
    let dir = TempDir::new().unwrap();
    let snapshot = dir.path().join("snapshots.age");
    let config = test_config(dir.path());

    let mut store = Store::open_at(&snapshot, config.clone()).unwrap();
    let record = tracked(dir.path(), ".env", b"TOKEN=a\n");
    store.insert(&record).unwrap();
    store.close(CloseMode::Write).unwrap();
    assert!(snapshot.exists());

    let store = Store::open_at(&snapshot, config).unwrap();
    assert_eq!(store.list().unwrap(), vec![record.clone()]);
    assert_eq!(store.fetch(record.path()).unwrap(), record);
    store.close(CloseMode::ReadOnly).unwrap();
}

#[test]
fn test_mutations_survive_only_write_close() {
    let dir = TempDir::new().unwrap();
    let snapshot = dir.path().join("snapshots.age");
    let config = test_config(dir.path());

    let mut store = Store::open_at(&snapshot, config.clone()).unwrap();
    let record = tracked(dir.path(), ".env", b"TOKEN=a\n");
    store.insert(&record).unwrap();
    store.close(CloseMode::Write).unwrap();

    // Delete, but close read-only: the mutation must be discarded.
    let mut store = Store::open_at(&snapshot, config.clone()).unwrap();
    store.delete(record.path()).unwrap();
    assert!(store.has_changes());
    store.close(CloseMode::ReadOnly).unwrap();

    let store = Store::open_at(&snapshot, config.clone()).unwrap();
    assert_eq!(store.list().unwrap(), vec![record.clone()]);
    store.close(CloseMode::ReadOnly).unwrap();

    // Same delete closed with write mode persists.
    let mut store = Store::open_at(&snapshot, config.clone()).unwrap();
    store.delete(record.path()).unwrap();
    store.close(CloseMode::Write).unwrap();

    let store = Store::open_at(&snapshot, config).unwrap();
    assert!(store.list().unwrap().is_empty());
    store.close(CloseMode::ReadOnly).unwrap();
}

#[test]
fn test_fresh_store_materializes_empty_artifact() {
    let dir = TempDir::new().unwrap();
    let snapshot = dir.path().join("snapshots.age");
    let config = test_config(dir.path());

    let store = Store::open_at(&snapshot, config.clone()).unwrap();
    assert!(store.has_changes());
    store.close(CloseMode::Write).unwrap();
    assert!(snapshot.exists());

    let store = Store::open_at(&snapshot, config).unwrap();
    assert!(store.list().unwrap().is_empty());
    assert!(!store.has_changes());
    store.close(CloseMode::ReadOnly).unwrap();
}

#[test]
fn test_unchanged_close_does_not_rewrite_artifact() {
    let dir = TempDir::new().unwrap();
    let snapshot = dir.path().join("snapshots.age");
    let config = test_config(dir.path());

    let mut store = Store::open_at(&snapshot, config.clone()).unwrap();
    store.insert(&tracked(dir.path(), ".env", b"TOKEN=a\n")).unwrap();
    store.close(CloseMode::Write).unwrap();
    let before = fs::read(&snapshot).unwrap();

    // Re-encryption is randomized, so identical bytes prove no write happened.
    let store = Store::open_at(&snapshot, config).unwrap();
    store.close(CloseMode::Write).unwrap();
    assert_eq!(fs::read(&snapshot).unwrap(), before);
}

#[test]
fn test_delete_missing_is_not_found() {
    let dir = TempDir::new().unwrap();
    let snapshot = dir.path().join("snapshots.age");

    let mut store = Store::open_at(&snapshot, test_config(dir.path())).unwrap();
    let err = store.delete(Path::new("/nope/.env")).unwrap_err();
    assert!(matches!(err, EnvSentinelError::NotFound(_)));
    store.close(CloseMode::ReadOnly).unwrap();
}

#[test]
fn test_wrong_identity_cannot_open() {
    let dir = TempDir::new().unwrap();
    let snapshot = dir.path().join("snapshots.age");
    let config = test_config(dir.path());

    let store = Store::open_at(&snapshot, config).unwrap();
    store.close(CloseMode::Write).unwrap();

    let other = Config {
        keys: vec![write_keypair(dir.path(), "other.key")],
        scan: ScanConfig::default(),
    };
    let err = Store::open_at(&snapshot, other).unwrap_err();
    assert!(matches!(
        err,
        EnvSentinelError::Crypto(crate::crypto::CryptoError::NoMatchingIdentity)
    ));
    // The artifact is never modified by a failed open.
    assert!(snapshot.exists());
}

#[test]
fn test_any_configured_identity_can_open() {
    let dir = TempDir::new().unwrap();
    let snapshot = dir.path().join("snapshots.age");

    let first = write_keypair(dir.path(), "first.key");
    let second = write_keypair(dir.path(), "second.key");
    let both = Config {
        keys: vec![first, second.clone()],
        scan: ScanConfig::default(),
    };

    let mut store = Store::open_at(&snapshot, both).unwrap();
    let record = tracked(dir.path(), ".env", b"TOKEN=a\n");
    store.insert(&record).unwrap();
    store.close(CloseMode::Write).unwrap();

    // Opening with only the second key still works.
    let only_second = Config {
        keys: vec![second],
        scan: ScanConfig::default(),
    };
    let store = Store::open_at(&snapshot, only_second).unwrap();
    assert_eq!(store.list().unwrap(), vec![record]);
    store.close(CloseMode::ReadOnly).unwrap();
}

#[test]
fn test_insert_replaces_record_for_same_path() {
    let dir = TempDir::new().unwrap();
    let snapshot = dir.path().join("snapshots.age");
    let config = test_config(dir.path());

    let mut store = Store::open_at(&snapshot, config.clone()).unwrap();
    store.insert(&tracked(dir.path(), ".env", b"A=1\n")).unwrap();
    let updated = tracked(dir.path(), ".env", b"A=2\n");
    store.insert(&updated).unwrap();
    store.close(CloseMode::Write).unwrap();

    let store = Store::open_at(&snapshot, config).unwrap();
    assert_eq!(store.list().unwrap(), vec![updated]);
    store.close(CloseMode::ReadOnly).unwrap();
}

#[test]
fn test_update_required_follows_outcome_flags() {
    let dir = TempDir::new().unwrap();
    let snapshot = dir.path().join("snapshots.age");

    let store = Store::open_at(&snapshot, test_config(dir.path())).unwrap();

    let backed_up = SyncOutcome {
        backed_up: true,
        ..SyncOutcome::default()
    };
    let restored = SyncOutcome {
        restored: true,
        ..SyncOutcome::default()
    };
    let dir_updated = SyncOutcome {
        dir_updated: true,
        ..SyncOutcome::default()
    };

    assert!(store.update_required(&backed_up));
    assert!(store.update_required(&dir_updated));
    assert!(!store.update_required(&restored));
    assert!(!store.update_required(&SyncOutcome::default()));
    store.close(CloseMode::ReadOnly).unwrap();
}
