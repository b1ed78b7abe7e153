use gdfs_core::error::GdfsError;
use gdfs_core::types::{NewObject, ObjectChanges, ObjectKind};
use gdfs_remote::{MemoryRemote, RemoteObjectService, RemoteOp};
use tokio::io::AsyncReadExt;

async fn read_all(remote: &MemoryRemote, id: &gdfs_core::ObjectId) -> Vec<u8> {
    let mut stream = remote.open_read_stream(id).await.unwrap();
    let mut buf = Vec::new();
    stream.read_to_end(&mut buf).await.unwrap();
    buf
}

#[tokio::test]
async fn test_list_containers() {
    let remote = MemoryRemote::new();
    remote.add_drive("Team");
    remote.add_drive("Ops");
    let drives = remote.list_containers().await.unwrap();
    let names: Vec<_> = drives.iter().map(|d| d.name.as_str()).collect();
    assert_eq!(names, vec!["Team", "Ops"]);
    assert!(drives.iter().all(|d| d.kind == ObjectKind::Drive));
    assert_eq!(remote.calls(RemoteOp::ListContainers), 1);
}

#[tokio::test]
async fn test_create_and_list_children() {
    let remote = MemoryRemote::new();
    let team = remote.add_drive("Team");
    let docs = remote
        .create(&team.id, "Docs", true, &NewObject::folder())
        .await
        .unwrap();
    assert_eq!(docs.kind, ObjectKind::Folder);
    assert_eq!(docs.drive_id.as_ref(), Some(&team.id));
    let children = remote.list_children(&team.id, Some(&team.id)).await.unwrap();
    assert_eq!(children.len(), 1);
    assert_eq!(children[0].id, docs.id);
}

#[tokio::test]
async fn test_list_children_of_missing_container() {
    let remote = MemoryRemote::new();
    let err = remote.list_children(&"nope".into(), None).await.unwrap_err();
    assert!(err.is_not_found());
}

#[tokio::test]
async fn test_duplicate_names_permitted() {
    let remote = MemoryRemote::new();
    let team = remote.add_drive("Team");
    remote.seed_file(&team.id, "a.txt", b"1").unwrap();
    remote.seed_file(&team.id, "a.txt", b"2").unwrap();
    assert_eq!(remote.children_named(&team.id, "a.txt").len(), 2);
}

#[tokio::test]
async fn test_upload_and_read() {
    let remote = MemoryRemote::new();
    let team = remote.add_drive("Team");
    let file = remote
        .create(&team.id, "a.txt", false, &NewObject::file("a.txt"))
        .await
        .unwrap();
    assert_eq!(file.mime_type, "text/plain");
    let updated = remote
        .upload(&file.id, Box::new(std::io::Cursor::new(b"hello".to_vec())), 5)
        .await
        .unwrap();
    assert_eq!(updated.size, 5);
    assert_eq!(read_all(&remote, &file.id).await, b"hello");
}

#[tokio::test]
async fn test_upload_size_mismatch() {
    let remote = MemoryRemote::new();
    let team = remote.add_drive("Team");
    let file = remote.seed_file(&team.id, "a.txt", b"").unwrap();
    let err = remote
        .upload(&file.id, Box::new(std::io::Cursor::new(b"abc".to_vec())), 10)
        .await
        .unwrap_err();
    assert!(matches!(err, GdfsError::InvalidArgument(_)));
}

#[tokio::test]
async fn test_upload_oversized_declaration() {
    let remote = MemoryRemote::new();
    let team = remote.add_drive("Team");
    let file = remote.seed_file(&team.id, "a.txt", b"").unwrap();
    let err = remote
        .upload(&file.id, Box::new(std::io::Cursor::new(b"abc".to_vec())), u64::MAX)
        .await
        .unwrap_err();
    assert!(matches!(err, GdfsError::InvalidArgument(_)));
}

#[tokio::test]
async fn test_trash_hides_from_listing() {
    let remote = MemoryRemote::new();
    let team = remote.add_drive("Team");
    let file = remote.seed_file(&team.id, "a.txt", b"x").unwrap();
    remote.delete(&file.id, false).await.unwrap();
    assert!(remote.list_children(&team.id, None).await.unwrap().is_empty());
    assert!(remote.get_by_id(&file.id).await.unwrap().trashed);
}

#[tokio::test]
async fn test_permanent_delete_removes_subtree() {
    let remote = MemoryRemote::new();
    let team = remote.add_drive("Team");
    let docs = remote.seed_folder(&team.id, "Docs").unwrap();
    let file = remote.seed_file(&docs.id, "a.txt", b"x").unwrap();
    remote.delete(&docs.id, true).await.unwrap();
    assert!(remote.object(&docs.id).is_none());
    assert!(remote.object(&file.id).is_none());
    assert!(remote.get_by_id(&file.id).await.unwrap_err().is_not_found());
}

#[tokio::test]
async fn test_rename_and_reparent() {
    let remote = MemoryRemote::new();
    let team = remote.add_drive("Team");
    let ops = remote.add_drive("Ops");
    let docs = remote.seed_folder(&team.id, "Docs").unwrap();
    let file = remote.seed_file(&docs.id, "a.txt", b"x").unwrap();

    let renamed = remote
        .update_metadata(&docs.id, &ObjectChanges::rename("Papers"))
        .await
        .unwrap();
    assert_eq!(renamed.name, "Papers");

    let moved = remote.reparent(&docs.id, &team.id, &ops.id).await.unwrap();
    assert_eq!(moved.parent_ids, vec![ops.id.clone()]);
    assert_eq!(moved.drive_id.as_ref(), Some(&ops.id));
    assert_eq!(remote.object(&file.id).unwrap().drive_id.as_ref(), Some(&ops.id));
}

#[tokio::test]
async fn test_reparent_wrong_old_parent() {
    let remote = MemoryRemote::new();
    let team = remote.add_drive("Team");
    let docs = remote.seed_folder(&team.id, "Docs").unwrap();
    let other = remote.seed_folder(&team.id, "Other").unwrap();
    let err = remote.reparent(&docs.id, &other.id, &team.id).await.unwrap_err();
    assert!(matches!(err, GdfsError::ConflictingState(_)));
}

#[tokio::test]
async fn test_reparent_into_own_subtree() {
    let remote = MemoryRemote::new();
    let team = remote.add_drive("Team");
    let docs = remote.seed_folder(&team.id, "Docs").unwrap();
    let inner = remote.seed_folder(&docs.id, "Inner").unwrap();
    let err = remote.reparent(&docs.id, &team.id, &inner.id).await.unwrap_err();
    assert!(matches!(err, GdfsError::InvalidArgument(_)));
}

#[tokio::test]
async fn test_copy_file() {
    let remote = MemoryRemote::new();
    let team = remote.add_drive("Team");
    let file = remote.seed_file(&team.id, "a.txt", b"data").unwrap();
    let copy = remote
        .copy(&file.id, &team.id, "b.txt", &ObjectChanges::default())
        .await
        .unwrap();
    assert_ne!(copy.id, file.id);
    assert_eq!(copy.name, "b.txt");
    assert_eq!(copy.size, 4);
    assert_eq!(read_all(&remote, &copy.id).await, b"data");
}

#[tokio::test]
async fn test_copy_folder_rejected() {
    let remote = MemoryRemote::new();
    let team = remote.add_drive("Team");
    let docs = remote.seed_folder(&team.id, "Docs").unwrap();
    let err = remote
        .copy(&docs.id, &team.id, "Docs2", &ObjectChanges::default())
        .await
        .unwrap_err();
    assert!(matches!(err, GdfsError::InvalidArgument(_)));
}

#[tokio::test]
async fn test_create_under_file_rejected() {
    let remote = MemoryRemote::new();
    let team = remote.add_drive("Team");
    let file = remote.seed_file(&team.id, "a.txt", b"").unwrap();
    let err = remote
        .create(&file.id, "x", true, &NewObject::folder())
        .await
        .unwrap_err();
    assert!(matches!(err, GdfsError::InvalidArgument(_)));
}

#[tokio::test]
async fn test_fail_after() {
    let remote = MemoryRemote::new();
    let team = remote.add_drive("Team");
    remote.fail_after(RemoteOp::Create, 1);
    remote
        .create(&team.id, "one", true, &NewObject::folder())
        .await
        .unwrap();
    let err = remote
        .create(&team.id, "two", true, &NewObject::folder())
        .await
        .unwrap_err();
    assert!(matches!(err, GdfsError::RemoteUnavailable(_)));
    assert_eq!(remote.calls(RemoteOp::Create), 2);
    remote.clear_faults();
    remote
        .create(&team.id, "three", true, &NewObject::folder())
        .await
        .unwrap();
}

#[tokio::test]
async fn test_call_counters_reset() {
    let remote = MemoryRemote::new();
    remote.list_containers().await.unwrap();
    remote.list_containers().await.unwrap();
    assert_eq!(remote.total_calls(), 2);
    remote.reset_calls();
    assert_eq!(remote.total_calls(), 0);
}
