// ---------------------------------------------------------------------------
// Integration tests for winvfs
//
// Each test drives the public API end to end: descriptors built from raw
// strings, a MemoryFs instance mutated through them, and the observable
// state verified afterwards.
// ---------------------------------------------------------------------------

use std::io::{Read, Seek, SeekFrom, Write};

use winvfs::{
    Drive, FileName, FsError, MemoryFs, PathError, RelativeDirectory, RelativeFile,
    RootedDirectory, RootedFile, Snapshot, StreamMode,
};

fn init_tracing() {
    static INIT: std::sync::Once = std::sync::Once::new();
    INIT.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
            .with_test_writer()
            .try_init();
    });
}

// ---------------------------------------------------------------------------
// Descriptor arithmetic
// ---------------------------------------------------------------------------

#[test]
fn descriptors_compose_without_touching_an_engine() {
    let drive = Drive::from_string("c:").unwrap();
    let docs = drive
        .join(&RelativeDirectory::from_string("users\\anna\\docs").unwrap())
        .unwrap();
    let report = docs
        .with_file_name(&FileName::from_string("report.txt").unwrap())
        .unwrap();

    assert_eq!(report.canonical(), "c:\\users\\anna\\docs\\report.txt");
    assert_eq!(report.parent(), docs);
    assert_eq!(report.drive(), drive);

    let back_up = docs
        .join(&RelativeDirectory::from_string("..\\..").unwrap())
        .unwrap();
    assert_eq!(back_up, RootedDirectory::from_string("c:\\users").unwrap());
}

#[test]
fn construction_rejects_malformed_paths() {
    assert!(matches!(
        RootedFile::from_string("c:\\bad|name.txt"),
        Err(PathError::InvalidCharacter { ch: '|', .. })
    ));
    assert!(matches!(
        RootedDirectory::from_string("relative\\only"),
        Err(PathError::NotRooted(_))
    ));
    assert!(matches!(
        RelativeFile::from_string("c:\\rooted.txt"),
        Err(PathError::RootedInRelativeContext(_))
    ));
    assert!(matches!(
        RootedDirectory::from_string("c:\\a\\..\\..\\b"),
        Err(PathError::AscendsAboveRoot(_))
    ));
}

#[test]
fn relative_from_inverts_join() {
    let base = RootedDirectory::from_string("c:\\projects\\app").unwrap();
    let target = RootedDirectory::from_string("c:\\projects\\lib\\src").unwrap();

    let hop = target.relative_from(&base).unwrap();
    assert_eq!(hop.canonical(), "..\\lib\\src");
    assert_eq!(base.join(&hop).unwrap(), target);
}

// ---------------------------------------------------------------------------
// Directory tree population and listing
// ---------------------------------------------------------------------------

#[test]
fn populate_and_list_a_crowded_directory() {
    init_tracing();
    let mut fs = MemoryFs::with_drives(["c:"]).unwrap();

    fs.create_directory(&fs.rooted_directory("c:\\work\\src\\path").unwrap())
        .unwrap();
    fs.create_directory(&fs.rooted_directory("c:\\work\\src\\tree").unwrap())
        .unwrap();
    fs.create_directory(&fs.rooted_directory("c:\\work\\target").unwrap())
        .unwrap();
    for path in [
        "c:\\work\\readme.md",
        "c:\\work\\src\\lib.rs",
        "c:\\work\\src\\path\\mod.rs",
        "c:\\work\\src\\tree\\arena.rs",
        "c:\\work\\target\\out.bin",
    ] {
        fs.write_file(&fs.rooted_file(path).unwrap(), path.as_bytes())
            .unwrap();
    }

    let work = fs.rooted_directory("c:\\work").unwrap();
    let direct: Vec<String> = fs
        .files(&work)
        .unwrap()
        .iter()
        .map(|f| f.file_name().as_str().to_string())
        .collect();
    assert_eq!(direct, vec!["readme.md"]);

    let subdirs = fs.directories(&work).unwrap();
    assert_eq!(subdirs.len(), 2);

    let everything = fs.all_files(&work).unwrap();
    assert_eq!(everything.len(), 5);
    // Each listed descriptor resolves back to its own content.
    for file in &everything {
        assert_eq!(fs.read_file(file).unwrap(), file.canonical().as_bytes());
    }
}

#[test]
fn case_differences_are_one_identity() {
    init_tracing();
    let mut fs = MemoryFs::with_drives(["C:"]).unwrap();
    fs.create_directory(&fs.rooted_directory("c:\\Shared").unwrap())
        .unwrap();
    fs.write_file(&fs.rooted_file("C:\\SHARED\\Notes.TXT").unwrap(), b"n")
        .unwrap();

    // Creating the folder again under another casing reuses it.
    fs.create_directory(&fs.rooted_directory("c:\\shared").unwrap())
        .unwrap();
    assert_eq!(
        fs.files(&fs.rooted_directory("c:\\shared").unwrap())
            .unwrap()
            .len(),
        1
    );

    // The listing preserves the first-created casing.
    let listed = &fs.files(&fs.rooted_directory("c:\\SHARED").unwrap()).unwrap()[0];
    assert_eq!(listed.file_name().as_str(), "Notes.TXT");
    assert_eq!(
        listed,
        &fs.rooted_file("c:\\shared\\notes.txt").unwrap()
    );
}

// ---------------------------------------------------------------------------
// Streams
// ---------------------------------------------------------------------------

#[test]
fn stream_modes_behave_like_their_disk_counterparts() {
    init_tracing();
    let mut fs = MemoryFs::with_drives(["c:"]).unwrap();
    let file = fs.rooted_file("c:\\log.txt").unwrap();

    {
        let mut w = fs.open_write(&file).unwrap();
        assert_eq!(w.mode(), StreamMode::Write);
        w.write_all(b"first line\n").unwrap();
    }
    {
        let mut a = fs.open_append(&file).unwrap();
        assert!(a.seek(SeekFrom::Start(0)).is_err());
        a.write_all(b"second line\n").unwrap();
    }
    {
        let mut m = fs.open_modify(&file).unwrap();
        m.seek(SeekFrom::Start(0)).unwrap();
        m.write_all(b"FIRST").unwrap();
    }

    assert_eq!(
        fs.read_to_string(&file).unwrap(),
        "FIRST line\nsecond line\n"
    );

    // Re-opening for write discards everything.
    drop(fs.open_write(&file).unwrap());
    assert_eq!(fs.read_to_string(&file).unwrap(), "");
}

#[test]
fn open_files_pin_their_whole_ancestry_against_delete() {
    init_tracing();
    let mut fs = MemoryFs::with_drives(["c:"]).unwrap();
    let dir = fs.rooted_directory("c:\\busy\\deep").unwrap();
    fs.create_directory(&dir).unwrap();
    let file = fs.rooted_file("c:\\busy\\deep\\held.txt").unwrap();
    fs.write_file(&file, b"x").unwrap();

    let reader = fs.open_read(&file).unwrap();
    let top = fs.rooted_directory("c:\\busy").unwrap();
    assert!(matches!(
        fs.delete_directory(&top, true),
        Err(FsError::InUse(_))
    ));
    // The failed delete removed nothing.
    assert!(fs.file_exists(&file));

    drop(reader);
    assert_eq!(fs.delete_directory(&top, true).unwrap(), true);
    assert!(!fs.directory_exists(&dir));
}

#[test]
fn a_stream_survives_moving_its_file() {
    init_tracing();
    let mut fs = MemoryFs::with_drives(["c:"]).unwrap();
    fs.create_directory(&fs.rooted_directory("c:\\a").unwrap())
        .unwrap();
    fs.create_directory(&fs.rooted_directory("c:\\b").unwrap())
        .unwrap();
    let src = fs.rooted_file("c:\\a\\f.txt").unwrap();
    let dst = fs.rooted_file("c:\\b\\f.txt").unwrap();
    fs.write_file(&src, b"follow me").unwrap();

    let mut reader = fs.open_read(&src).unwrap();
    fs.move_file(&src, &dst).unwrap();

    let mut text = String::new();
    reader.read_to_string(&mut text).unwrap();
    assert_eq!(text, "follow me");
    assert!(fs.file_exists(&dst));
}

// ---------------------------------------------------------------------------
// Move and copy
// ---------------------------------------------------------------------------

#[test]
fn move_keeps_identity_copy_forks_it() {
    init_tracing();
    let mut fs = MemoryFs::with_drives(["c:"]).unwrap();
    fs.create_directory(&fs.rooted_directory("c:\\in").unwrap())
        .unwrap();
    fs.create_directory(&fs.rooted_directory("c:\\out").unwrap())
        .unwrap();
    let original = fs.rooted_file("c:\\in\\data.bin").unwrap();
    fs.write_file(&original, &[1, 2, 3]).unwrap();
    fs.set_last_modified(&original, 1000).unwrap();

    let moved = fs.rooted_file("c:\\out\\data.bin").unwrap();
    fs.move_file(&original, &moved).unwrap();
    assert_eq!(fs.last_modified(&moved).unwrap(), 1000);

    let copied = fs.rooted_file("c:\\out\\copy.bin").unwrap();
    fs.copy_file(&moved, &copied).unwrap();
    assert_ne!(fs.last_modified(&copied).unwrap(), 1000);

    fs.append_file(&moved, &[4]).unwrap();
    assert_eq!(fs.read_file(&moved).unwrap(), vec![1, 2, 3, 4]);
    assert_eq!(fs.read_file(&copied).unwrap(), vec![1, 2, 3]);
}

#[test]
fn directory_move_refuses_its_own_subtree() {
    init_tracing();
    let mut fs = MemoryFs::with_drives(["c:"]).unwrap();
    fs.create_directory(&fs.rooted_directory("c:\\tree\\branch").unwrap())
        .unwrap();
    assert!(matches!(
        fs.move_directory(
            &fs.rooted_directory("c:\\tree").unwrap(),
            &fs.rooted_directory("c:\\tree\\branch\\trap").unwrap(),
        ),
        Err(FsError::InvalidOperation(_))
    ));
    assert!(fs.directory_exists(&fs.rooted_directory("c:\\tree\\branch").unwrap()));
}

// ---------------------------------------------------------------------------
// Snapshots
// ---------------------------------------------------------------------------

#[test]
fn snapshot_travels_between_instances_as_json() {
    init_tracing();
    let mut source = MemoryFs::with_drives(["c:"]).unwrap();
    source
        .create_directory(&source.rooted_directory("c:\\cfg").unwrap())
        .unwrap();
    source
        .write_file(
            &source.rooted_file("c:\\cfg\\settings.json").unwrap(),
            b"{\"answer\":42}",
        )
        .unwrap();

    let json = source.snapshot().to_json().unwrap();

    let mut replica = MemoryFs::new();
    replica.restore(&Snapshot::from_json(&json).unwrap()).unwrap();
    assert_eq!(
        replica
            .read_to_string(&replica.rooted_file("c:\\cfg\\settings.json").unwrap())
            .unwrap(),
        "{\"answer\":42}"
    );
}

// ---------------------------------------------------------------------------
// Instance isolation and current directory
// ---------------------------------------------------------------------------

#[test]
fn instances_are_isolated_and_reject_foreign_descriptors() {
    init_tracing();
    let mut left = MemoryFs::with_drives(["c:"]).unwrap();
    let mut right = MemoryFs::with_drives(["c:"]).unwrap();

    let left_file = left.rooted_file("c:\\only-left.txt").unwrap();
    left.write_file(&left_file, b"x").unwrap();

    // An untagged descriptor resolves against whichever instance it is
    // handed to.
    let untagged = RootedFile::from_string("c:\\only-left.txt").unwrap();
    assert!(left.file_exists(&untagged));
    assert!(!right.file_exists(&untagged));

    // A descriptor minted by one instance is not accepted for mutation by
    // another.
    assert!(matches!(
        right.write_file(&left_file, b"y"),
        Err(FsError::InvalidOperation(_))
    ));

    // Equality also distinguishes the two instances' descriptors.
    let right_file = right.rooted_file("c:\\only-left.txt").unwrap();
    assert_ne!(left_file, right_file);
}

#[test]
fn current_directory_tracks_an_existing_location() {
    init_tracing();
    let mut fs = MemoryFs::with_drives(["c:"]).unwrap();
    let dir = fs.rooted_directory("c:\\session").unwrap();
    fs.create_directory(&dir).unwrap();
    fs.set_current_directory(dir.clone()).unwrap();
    assert_eq!(fs.current_directory(), Some(&dir));

    fs.clear();
    assert!(fs.current_directory().is_none());
}
