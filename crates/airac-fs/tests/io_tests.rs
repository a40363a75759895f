use airac_fs::{NormalizedPath, io};
use assert_fs::prelude::*;
use predicates::prelude::*;
use proptest::prelude::*;

#[test]
fn copy_file_creates_target_directories() {
    let temp = assert_fs::TempDir::new().unwrap();
    let source = temp.child("NavData/AIRWAY.txt");
    source.write_str("UL980 ...").unwrap();

    let target = temp.child("EDGG/EDGG/NavData/airway.txt");
    io::copy_file(source.path(), target.path()).unwrap();

    target.assert(predicate::str::contains("UL980"));
}

#[test]
fn walk_files_skips_directories() {
    let temp = assert_fs::TempDir::new().unwrap();
    temp.child("EDGG/Settings").create_dir_all().unwrap();
    temp.child("EDGG/Settings/Screen.txt").touch().unwrap();
    temp.child("EDGG.prf").touch().unwrap();

    let files = io::walk_files(temp.path()).unwrap();
    assert_eq!(
        files,
        vec![
            NormalizedPath::new("EDGG.prf"),
            NormalizedPath::new("EDGG/Settings/Screen.txt"),
        ]
    );

    let dirs = io::walk_dirs(temp.path()).unwrap();
    assert_eq!(
        dirs,
        vec![NormalizedPath::new("EDGG"), NormalizedPath::new("EDGG/Settings")]
    );
}

#[test]
fn write_atomic_overwrites_existing_content() {
    let temp = assert_fs::TempDir::new().unwrap();
    let file = temp.child("TopSkySettings.txt");
    file.write_str("Window_CARD=0,0,0\n").unwrap();

    io::write_atomic(file.path(), b"Window_CARD=0,1350,1180\n").unwrap();

    file.assert("Window_CARD=0,1350,1180\n");
}

proptest! {
    #[test]
    fn normalized_paths_never_contain_backslashes(s in "[a-zA-Z0-9_ .\\\\/]{0,40}") {
        let path = NormalizedPath::new(&s);
        prop_assert!(!path.as_str().contains('\\'));
        prop_assert_eq!(NormalizedPath::new(path.as_str()), path);
    }
}
