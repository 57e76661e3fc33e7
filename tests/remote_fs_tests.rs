mod common;

use std::fs;

use common::{setup_temp_dir, write_file};
use rocketlink::remote::LocalLink;
use rocketlink::remote_fs::{Listing, RemoteFs};

fn path_str(path: &std::path::Path) -> String {
    path.to_string_lossy().into_owned()
}

#[test]
fn test_resolve_dir() {
    let device = setup_temp_dir();
    let link = LocalLink::new();
    let remote = RemoteFs::new(&link);
    fs::create_dir(device.path().join("DCIM")).unwrap();

    let nested = format!("{}/DCIM/../DCIM", path_str(device.path()));
    let expected = path_str(&device.path().join("DCIM"));
    assert_eq!(remote.resolve_dir(&nested).unwrap(), Some(expected));

    let missing = path_str(&device.path().join("nope"));
    assert_eq!(remote.resolve_dir(&missing).unwrap(), None);
}

#[test]
fn test_list_splits_dirs_and_files() {
    let device = setup_temp_dir();
    write_file(&device.path().join("beta/inner.txt"), 1);
    fs::create_dir(device.path().join("alpha")).unwrap();
    write_file(&device.path().join("d.txt"), 1);
    write_file(&device.path().join("c.txt"), 1);

    let link = LocalLink::new();
    let listing = RemoteFs::new(&link).list(&path_str(device.path())).unwrap();

    assert_eq!(
        listing,
        Listing {
            dirs: vec!["alpha".into(), "beta".into()],
            files: vec!["c.txt".into(), "d.txt".into()],
        }
    );
}

#[test]
fn test_rename_within_dir() {
    let device = setup_temp_dir();
    write_file(&device.path().join("old name.txt"), 3);
    let link = LocalLink::new();
    let remote = RemoteFs::new(&link);
    let dir = path_str(device.path());

    assert!(remote.rename(&dir, "old name.txt", "new name.txt").unwrap());
    assert!(!device.path().join("old name.txt").exists());
    assert!(device.path().join("new name.txt").is_file());

    assert!(!remote.rename(&dir, "absent.txt", "other.txt").unwrap());
}

#[test]
fn test_make_dir_copy_into_and_remove() {
    let device = setup_temp_dir();
    write_file(&device.path().join("src/a.txt"), 7);
    write_file(&device.path().join("b.txt"), 5);
    let link = LocalLink::new();
    let remote = RemoteFs::new(&link);

    let backup = path_str(&device.path().join("backup/2024"));
    assert!(remote.make_dir(&backup).unwrap());
    assert!(device.path().join("backup/2024").is_dir());

    let sources = vec![
        path_str(&device.path().join("src")),
        path_str(&device.path().join("b.txt")),
    ];
    assert!(remote.copy_into(&sources, &backup).unwrap());
    assert!(device.path().join("backup/2024/src/a.txt").is_file());
    assert!(device.path().join("backup/2024/b.txt").is_file());
    assert_eq!(remote.size(&backup).unwrap(), 12);

    assert!(remote.remove(&sources).unwrap());
    assert!(!device.path().join("src").exists());
    assert!(!device.path().join("b.txt").exists());
    assert!(remote.remove(&[]).unwrap());
    assert!(remote.copy_into(&[], &backup).unwrap());
}

#[test]
fn test_describe_size() {
    let device = setup_temp_dir();
    write_file(&device.path().join("big.bin"), 1536);
    let link = LocalLink::new();

    let described = RemoteFs::new(&link)
        .describe_size(&path_str(&device.path().join("big.bin")))
        .unwrap();
    assert_eq!(described, "1.5KB (1536B)");
}
