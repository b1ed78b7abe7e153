//! Shared fixtures for unit tests: `/Team/Docs/a.txt` (10 bytes).

use crate::tree::{DriveTree, RootScope};
use gdfs_cache::{CacheStore, MemoryKvStore};
use gdfs_remote::MemoryRemote;
use std::sync::Arc;
use std::time::Duration;

pub const TTL: Option<Duration> = Some(Duration::from_secs(600));
pub const A_TXT: &[u8] = b"0123456789";

pub fn seeded_remote() -> Arc<MemoryRemote> {
    let remote = Arc::new(MemoryRemote::new());
    let team = remote.add_drive("Team");
    let docs = remote.seed_folder(&team.id, "Docs").unwrap();
    remote.seed_file(&docs.id, "a.txt", A_TXT).unwrap();
    remote
}

pub fn tree_over(remote: Arc<MemoryRemote>, ttl: Option<Duration>) -> DriveTree {
    let cache = CacheStore::new(Arc::new(MemoryKvStore::new()), "test", ttl);
    DriveTree::new(remote, cache, RootScope::AllDrives)
}

pub fn seeded_tree(ttl: Option<Duration>) -> (Arc<MemoryRemote>, DriveTree) {
    let remote = seeded_remote();
    let tree = tree_over(remote.clone(), ttl);
    (remote, tree)
}
