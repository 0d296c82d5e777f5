//! Integration tests for tree construction and layered stacking.

use layerbox::filetree::{FileInfo, FileTree, PathAction, SortOrder};

fn file(path: &str, size: u64, fingerprint: &str) -> FileInfo {
    FileInfo::regular(path, size, fingerprint)
}

fn whiteout(path: &str) -> FileInfo {
    FileInfo::regular(path, 0, "")
}

#[test]
fn test_added_paths_are_retrievable_with_equal_info() {
    let mut tree = FileTree::new();
    let paths =
        ["/etc/hosts", "/etc/passwd", "/usr/bin/env", "/usr/lib/libc.so", "/var/log/dmesg"];

    for (idx, path) in paths.iter().enumerate() {
        let info = file(path, (idx as u64 + 1) * 10, &format!("fp-{idx}"));
        tree.add(path, info.clone()).unwrap();
        let node = tree.get(path).unwrap();
        assert_eq!(tree.info(node), &info, "info should round-trip for {path}");
    }
    assert_eq!(tree.count(), 11);
}

#[test]
fn test_copy_preserves_structure_and_isolates_mutation() {
    let mut tree = FileTree::new();
    tree.add("/bin/sh", FileInfo::symlink("/bin/sh", "/bin/bash")).unwrap();
    tree.add("/data/blob", file("/data/blob", 512, "blob")).unwrap();
    tree.set_sort_order(SortOrder::BySizeDesc);

    let copied = tree.copy();
    assert!(copied.structurally_equals(&tree));
    assert_eq!(copied.sort_order(), SortOrder::BySizeDesc);

    let mut copied = copied;
    copied.add("/data/extra", file("/data/extra", 1, "extra")).unwrap();
    assert!(tree.get("/data/extra").is_err());
    assert!(!copied.structurally_equals(&tree));
}

#[test]
fn test_stack_identity_laws() {
    let mut populated = FileTree::new();
    populated.add("/a/b", file("/a/b", 4, "b")).unwrap();
    populated.add("/c", file("/c", 2, "c")).unwrap();
    let snapshot = populated.copy();

    // stacking an empty upper changes nothing
    let failed = populated.stack(&FileTree::new());
    assert!(failed.is_empty());
    assert!(populated.structurally_equals(&snapshot));

    // stacking onto an empty lower reproduces the upper
    let mut empty = FileTree::new();
    let failed = empty.stack(&populated);
    assert!(failed.is_empty());
    assert!(empty.structurally_equals(&populated));
}

#[test]
fn test_stack_overwrites_existing_payloads() {
    let mut lower = FileTree::new();
    lower.add("/app/config", file("/app/config", 10, "v1")).unwrap();

    let mut upper = FileTree::new();
    upper.add("/app/config", file("/app/config", 12, "v2")).unwrap();

    let failed = lower.stack(&upper);
    assert!(failed.is_empty());

    let node = lower.get("/app/config").unwrap();
    assert_eq!(lower.info(node).fingerprint, "v2");
    assert_eq!(lower.info(node).size, 12);
    assert_eq!(lower.count(), 2);
}

#[test]
fn test_stack_whiteout_removes_whole_subtree() {
    let mut lower = FileTree::new();
    lower.add("/srv/data/a", file("/srv/data/a", 1, "a")).unwrap();
    lower.add("/srv/data/b", file("/srv/data/b", 1, "b")).unwrap();
    lower.add("/srv/keep", file("/srv/keep", 1, "k")).unwrap();

    let mut upper = FileTree::new();
    upper.add("/srv/.wh.data", whiteout("/srv/.wh.data")).unwrap();

    let failed = lower.stack(&upper);
    assert!(failed.is_empty());
    assert!(lower.get("/srv/data").is_err());
    assert!(lower.get("/srv/data/a").is_err());
    assert!(lower.get("/srv/keep").is_ok());
    assert_eq!(lower.count(), 2);
}

#[test]
fn test_stack_records_failed_whiteouts_and_continues() {
    let mut lower = FileTree::new();
    lower.add("/present", file("/present", 1, "p")).unwrap();

    let mut upper = FileTree::new();
    upper.add("/.wh.absent", whiteout("/.wh.absent")).unwrap();
    upper.add("/added", file("/added", 1, "a")).unwrap();

    let failed = lower.stack(&upper);
    assert_eq!(failed.len(), 1);
    assert_eq!(failed[0].path, "/absent");
    assert_eq!(failed[0].action, PathAction::Remove);

    // the rest of the layer still applied
    assert!(lower.get("/added").is_ok());
}

#[test]
fn test_stack_range_starts_from_the_base_layer() {
    let mut base = FileTree::new();
    base.add("/rootfs", file("/rootfs", 100, "base")).unwrap();

    let mut layer1 = FileTree::new();
    layer1.add("/opt/tool", file("/opt/tool", 10, "tool")).unwrap();

    let mut layer2 = FileTree::new();
    layer2.add("/.wh.rootfs", whiteout("/.wh.rootfs")).unwrap();
    layer2.add("/opt/tool", file("/opt/tool", 12, "tool-v2")).unwrap();

    let trees = [&base, &layer1, &layer2];

    // applying only layer 2 still sees paths accumulated below the range
    let (stacked, failed) = FileTree::stack_range(&trees, 2, 2);
    assert!(failed.is_empty());
    assert!(stacked.get("/rootfs").is_err(), "whiteout should find the base file");
    let tool = stacked.get("/opt/tool").unwrap();
    assert_eq!(stacked.info(tool).fingerprint, "tool-v2");

    // the full range accumulates every layer
    let (stacked, failed) = FileTree::stack_range(&trees, 1, 2);
    assert!(failed.is_empty());
    assert!(stacked.get("/opt/tool").is_ok());
    assert!(stacked.get("/rootfs").is_err());

    // inputs were not mutated
    assert!(base.get("/rootfs").is_ok());
    assert!(layer1.get("/rootfs").is_err());
}

#[test]
fn test_paths_roundtrip_after_stacking() {
    let mut lower = FileTree::new();
    lower.add("/a/b/c", file("/a/b/c", 1, "c")).unwrap();

    let mut upper = FileTree::new();
    upper.add("/a/d", file("/a/d", 1, "d")).unwrap();
    upper.add("/e", file("/e", 1, "e")).unwrap();

    lower.stack(&upper);

    let mut checked = 0;
    lower
        .visit_depth_child_first(
            &mut |tree, id| {
                if id != tree.root() {
                    let path = tree.path(id);
                    assert_eq!(tree.get(&path).unwrap(), id, "{path} should round-trip");
                    checked += 1;
                }
                Ok(())
            },
            None,
        )
        .unwrap();
    assert_eq!(checked, 5);
}
