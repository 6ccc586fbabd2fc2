use fff_core::index::{FileEvent, Index};
use std::fs;

#[test]
fn every_record_has_a_unique_absolute_path() {
    let dir = tempfile::tempdir().unwrap();
    fs::create_dir_all(dir.path().join("nested")).unwrap();
    fs::write(dir.path().join("a.rs"), "fn a() {}").unwrap();
    fs::write(dir.path().join("nested/b.rs"), "fn b() {}").unwrap();
    fs::write(dir.path().join("nested/c.rs"), "fn c() {}").unwrap();

    let index = Index::init(dir.path()).unwrap();
    index.rescan(None).unwrap();

    let snapshot = index.snapshot();
    assert_eq!(snapshot.records.len(), 3);

    let mut paths: Vec<_> = snapshot.records.iter().map(|r| &r.absolute_path).collect();
    paths.sort();
    paths.dedup();
    assert_eq!(paths.len(), 3);
}

#[test]
fn rescan_with_no_change_preserves_the_record_set() {
    let dir = tempfile::tempdir().unwrap();
    fs::write(dir.path().join("a.rs"), "fn a() {}").unwrap();
    fs::write(dir.path().join("b.rs"), "fn b() {}").unwrap();

    let index = Index::init(dir.path()).unwrap();
    index.rescan(None).unwrap();
    let before: Vec<_> = {
        let mut names: Vec<_> = index
            .snapshot()
            .records
            .iter()
            .map(|r| r.name.clone())
            .collect();
        names.sort();
        names
    };

    index.rescan(None).unwrap();
    let after: Vec<_> = {
        let mut names: Vec<_> = index
            .snapshot()
            .records
            .iter()
            .map(|r| r.name.clone())
            .collect();
        names.sort();
        names
    };

    assert_eq!(before, after);
}

#[test]
fn restart_discards_the_old_base_and_scans_the_new_one() {
    let old_dir = tempfile::tempdir().unwrap();
    let new_dir = tempfile::tempdir().unwrap();
    fs::write(old_dir.path().join("old.rs"), "fn old() {}").unwrap();
    fs::write(new_dir.path().join("new.rs"), "fn new() {}").unwrap();

    let index = Index::init(old_dir.path()).unwrap();
    index.rescan(None).unwrap();
    assert_eq!(index.snapshot().records.len(), 1);

    let restarted = index.restart(new_dir.path(), None).unwrap();
    assert_eq!(restarted.snapshot().records.len(), 1);
    assert_eq!(restarted.snapshot().records[0].name, "new.rs");
}

#[test]
fn apply_event_renamed_moves_the_record() {
    let dir = tempfile::tempdir().unwrap();
    let old_path = dir.path().join("old_name.rs");
    let new_path = dir.path().join("new_name.rs");
    fs::write(&old_path, "fn f() {}").unwrap();

    let index = Index::init(dir.path()).unwrap();
    index.rescan(None).unwrap();
    assert_eq!(index.snapshot().records.len(), 1);

    fs::rename(&old_path, &new_path).unwrap();
    index
        .apply_event(
            FileEvent::Renamed {
                from: old_path,
                to: new_path,
            },
            None,
        )
        .unwrap();

    let snapshot = index.snapshot();
    assert_eq!(snapshot.records.len(), 1);
    assert_eq!(snapshot.records[0].name, "new_name.rs");
}
