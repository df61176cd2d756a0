use anyhow::Result;
use s3access::io::cloud::{FakeObjectIO, ObjectIO};
use s3access::io::storage::join_location;
use s3access::{LocalStorage, ObjectStorage, Storage, StorageOptions};
use std::io::{BufRead, Write};
use std::sync::Arc;

fn object_storage() -> (FakeObjectIO, ObjectStorage) {
    let io = FakeObjectIO::new();
    let storage = ObjectStorage::new(Arc::new(io.clone()), StorageOptions::default());
    (io, storage)
}

#[test]
fn object_glob_filters_listed_keys() -> Result<()> {
    let (io, storage) = object_storage();
    for key in [
        "logs/2019-02-07-00-05-00-AAA",
        "logs/2019-02-07-00-55-00-BBB",
        "logs/2019-02-07-01-05-00-CCC",
        "other/2019-02-07-00-05-00-DDD",
    ] {
        io.put("raw", key, b"x")?;
    }

    let found = storage.glob("s3://raw/logs/2019-02-07-00*")?;
    assert_eq!(
        found,
        vec![
            "s3://raw/logs/2019-02-07-00-05-00-AAA".to_string(),
            "s3://raw/logs/2019-02-07-00-55-00-BBB".to_string(),
        ]
    );
    assert!(storage.glob("s3://missing-bucket/logs/*")?.is_empty());
    Ok(())
}

#[test]
fn object_read_write_round_trip() -> Result<()> {
    let (io, storage) = object_storage();
    let location = "s3://out/a/b.txt";

    let mut sink = storage.create(location)?;
    sink.write_all(b"first\nsecond\n")?;
    assert!(!storage.exists(location)?);
    sink.commit()?;
    assert!(storage.exists(location)?);

    let lines: Vec<String> = storage.open_read(location)?.lines().collect::<Result<_, _>>()?;
    assert_eq!(lines, vec!["first", "second"]);

    storage.touch("s3://out/marker", b"done")?;
    assert_eq!(io.get("out", "marker")?, b"done");

    storage.delete(location)?;
    storage.delete(location)?;
    assert!(!storage.exists(location)?);
    assert!(!storage.is_local());
    Ok(())
}

#[test]
fn object_read_of_missing_key_fails() {
    let (_io, storage) = object_storage();
    let err = storage.open_read("s3://out/nothing").err().unwrap();
    assert!(format!("{err:#}").contains("s3://out/nothing"));
}

#[test]
fn options_are_kept() {
    let io = FakeObjectIO::new();
    let options = StorageOptions {
        region: Some("us-west-1".into()),
        endpoint: Some("http://localhost:9000".into()),
        acl: None,
    };
    let storage = ObjectStorage::new(Arc::new(io), options.clone());
    assert_eq!(storage.options(), &options);
}

#[test]
fn local_storage_operations() -> Result<()> {
    let tmp = tempfile::tempdir()?;
    let root = tmp.path().display().to_string();
    let storage = LocalStorage;

    let dir = join_location(&root, "x=1/y=2");
    storage.create_dir_all(&dir)?;
    let file = join_location(&dir, "part.bin");
    let mut sink = storage.create(&file)?;
    sink.write_all(b"payload")?;
    sink.commit()?;
    assert_eq!(std::fs::read(&file)?, b"payload");

    assert_eq!(storage.glob(&join_location(&root, "x=1/*/*.bin"))?, vec![file.clone()]);
    // Directories never match.
    assert!(storage.glob(&join_location(&root, "x=1/*"))?.is_empty());

    storage.delete(&file)?;
    storage.delete(&file)?;
    assert!(!storage.exists(&file)?);
    assert!(storage.is_local());
    Ok(())
}
