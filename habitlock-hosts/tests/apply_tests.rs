//! HostsFile manager integration tests over temp files: round-trips,
//! idempotence, backup behavior, and the error taxonomy.

use std::collections::BTreeSet;
use std::fs;

use habitlock_hosts::{HostsError, HostsFile};
use tempfile::TempDir;

const BASE: &str = "##\n# Host Database\n##\n127.0.0.1\tlocalhost\n::1             localhost\n";

fn setup() -> (TempDir, HostsFile) {
    let dir = TempDir::new().expect("tempdir");
    let hosts_path = dir.path().join("hosts");
    fs::write(&hosts_path, BASE).expect("seed hosts");
    let manager = HostsFile::new(hosts_path, dir.path().join("backups"));
    (dir, manager)
}

fn domains(list: &[&str]) -> Vec<String> {
    list.iter().map(|d| d.to_string()).collect()
}

fn as_set(v: Vec<String>) -> BTreeSet<String> {
    v.into_iter().collect()
}

#[test]
fn apply_then_read_round_trips() {
    let (_dir, manager) = setup();
    manager.apply(&domains(&["reddit.com", "x.com"])).expect("apply");

    let managed = as_set(manager.managed_domains().expect("read"));
    let expected = as_set(domains(&["reddit.com", "www.reddit.com", "x.com", "www.x.com"]));
    assert_eq!(managed, expected);
}

#[test]
fn round_trip_is_exact_for_www_prefixed_inputs() {
    let (_dir, manager) = setup();
    let input = domains(&["www.reddit.com", "www.x.com"]);
    manager.apply(&input).expect("apply");
    assert_eq!(as_set(manager.managed_domains().expect("read")), as_set(input));
}

#[test]
fn apply_twice_is_idempotent() {
    let (_dir, manager) = setup();
    let list = domains(&["reddit.com", "x.com"]);

    manager.apply(&list).expect("first apply");
    let first = fs::read_to_string(manager.path()).expect("read");

    manager.apply(&list).expect("second apply");
    let second = fs::read_to_string(manager.path()).expect("read");

    assert_eq!(first, second, "re-applying the same set must be byte-identical");
}

#[test]
fn apply_empty_removes_section_and_restores_original_bytes() {
    let (_dir, manager) = setup();
    manager.apply(&domains(&["reddit.com"])).expect("apply");
    manager.apply(&[]).expect("clear");

    let content = fs::read_to_string(manager.path()).expect("read");
    assert_eq!(content, BASE, "content outside the section is untouched");
    assert!(manager.managed_domains().expect("read").is_empty());
}

#[test]
fn apply_then_clear_restores_files_without_trailing_newline() {
    let dir = TempDir::new().expect("tempdir");
    let hosts_path = dir.path().join("hosts");
    fs::write(&hosts_path, "127.0.0.1\tlocalhost").expect("seed");
    let manager = HostsFile::new(&hosts_path, dir.path().join("backups"));

    manager.apply(&domains(&["a.com"])).expect("apply");
    manager.apply(&[]).expect("clear");

    assert_eq!(
        fs::read_to_string(&hosts_path).expect("read"),
        "127.0.0.1\tlocalhost",
        "clearing must not leave a newline the file never had"
    );
}

#[test]
fn every_apply_creates_a_backup() {
    let (dir, manager) = setup();
    manager.apply(&domains(&["reddit.com"])).expect("first");
    manager.apply(&[]).expect("second");

    let backups: Vec<_> = fs::read_dir(dir.path().join("backups"))
        .expect("read backups")
        .filter_map(|e| e.ok())
        .collect();
    assert_eq!(backups.len(), 2, "one snapshot per mutation");
}

#[test]
fn backup_taken_before_mutation_preserves_prior_content() {
    let (dir, manager) = setup();
    manager.apply(&domains(&["reddit.com"])).expect("apply");

    let backups_dir = dir.path().join("backups");
    let mut names: Vec<_> = fs::read_dir(&backups_dir)
        .expect("read backups")
        .filter_map(|e| e.ok())
        .map(|e| e.path())
        .collect();
    names.sort();
    let first = fs::read_to_string(&names[0]).expect("read snapshot");
    assert_eq!(first, BASE, "snapshot must hold the pre-mutation content");
}

#[test]
fn restore_copies_snapshot_verbatim() {
    let (dir, manager) = setup();
    manager.apply(&domains(&["reddit.com"])).expect("apply");

    let backups_dir = dir.path().join("backups");
    let snapshot = fs::read_dir(&backups_dir)
        .expect("read backups")
        .filter_map(|e| e.ok())
        .map(|e| e.path())
        .next()
        .expect("one snapshot");

    manager.restore(&snapshot).expect("restore");
    assert_eq!(fs::read_to_string(manager.path()).expect("read"), BASE);
}

#[test]
fn missing_hosts_file_is_not_found() {
    let dir = TempDir::new().expect("tempdir");
    let manager = HostsFile::new(dir.path().join("absent"), dir.path().join("backups"));

    let err = manager.managed_domains().unwrap_err();
    assert!(matches!(err, HostsError::NotFound { .. }), "got: {err}");

    let err = manager.apply(&domains(&["reddit.com"])).unwrap_err();
    assert!(matches!(err, HostsError::NotFound { .. }), "got: {err}");
}

#[cfg(unix)]
#[test]
fn unwritable_hosts_file_reports_permission_denied() {
    use std::os::unix::fs::PermissionsExt;

    let dir = TempDir::new().expect("tempdir");
    let backups = TempDir::new().expect("backups tempdir");
    let hosts_path = dir.path().join("hosts");
    fs::write(&hosts_path, BASE).expect("seed");

    // Read-only directory: the .tmp sibling cannot be created.
    fs::set_permissions(dir.path(), fs::Permissions::from_mode(0o555)).expect("chmod");
    let manager = HostsFile::new(&hosts_path, backups.path());
    let result = manager.apply(&domains(&["reddit.com"]));
    fs::set_permissions(dir.path(), fs::Permissions::from_mode(0o755)).expect("chmod back");

    // Permission bits don't bind root; only assert the taxonomy when the
    // write actually failed.
    if let Err(err) = result {
        assert!(
            matches!(err, HostsError::PermissionDenied { .. }),
            "privilege failures must be distinct, got: {err}"
        );
    }
}

#[test]
fn failed_backup_aborts_before_any_write() {
    let dir = TempDir::new().expect("tempdir");
    let hosts_path = dir.path().join("hosts");
    fs::write(&hosts_path, BASE).expect("seed");

    // A file where the backup directory should be makes snapshotting fail.
    let bogus_backups = dir.path().join("backups");
    fs::write(&bogus_backups, "not a directory").expect("block dir");

    let manager = HostsFile::new(&hosts_path, &bogus_backups);
    let err = manager.apply(&domains(&["reddit.com"])).unwrap_err();
    assert!(matches!(err, HostsError::Backup { .. }), "got: {err}");

    let content = fs::read_to_string(&hosts_path).expect("read");
    assert_eq!(content, BASE, "live file must be untouched when backup fails");
}
