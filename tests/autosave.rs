use std::fs;
use std::io::Cursor;

use sqltab::{AutoSave, BaseFormat, Builder, Compression, DumpOptions, Error, FileType};
use tempfile::tempdir;

fn read_rows(path: &std::path::Path) -> Vec<String> {
    let content = fs::read_to_string(path).unwrap();
    content.lines().skip(1).map(str::to_string).collect()
}

#[test]
fn commit_saves_and_overwrites() {
    let dir = tempdir().unwrap();
    let out = tempdir().unwrap();
    let file = dir.path().join("test.csv");
    fs::write(&file, "name,age\nAlice,25\n").unwrap();

    let mut db = Builder::new()
        .path(&file)
        .auto_save(AutoSave::on_commit(out.path()))
        .open()
        .unwrap();

    let tx = db.transaction().unwrap();
    tx.execute("INSERT INTO test VALUES ('David', 40)", []).unwrap();
    tx.commit().unwrap();

    let saved = out.path().join("test.csv");
    let mut rows = read_rows(&saved);
    rows.sort();
    assert_eq!(rows, vec!["Alice,25", "David,40"]);

    // A second commit overwrites rather than appends.
    let tx = db.transaction().unwrap();
    tx.execute("INSERT INTO test VALUES ('Eve', 41)", []).unwrap();
    tx.commit().unwrap();

    let mut rows = read_rows(&saved);
    rows.sort();
    assert_eq!(rows, vec!["Alice,25", "David,40", "Eve,41"]);
}

#[test]
fn close_saves_once() {
    let dir = tempdir().unwrap();
    let out = tempdir().unwrap();
    let file = dir.path().join("test.csv");
    fs::write(&file, "name,age\nAlice,25\n").unwrap();

    let db = Builder::new()
        .path(&file)
        .auto_save(AutoSave::on_close(out.path()))
        .open()
        .unwrap();

    db.execute("INSERT INTO test VALUES ('David', 40)", []).unwrap();
    assert!(!out.path().join("test.csv").exists());

    db.close().unwrap();
    let mut rows = read_rows(&out.path().join("test.csv"));
    rows.sort();
    assert_eq!(rows, vec!["Alice,25", "David,40"]);
}

#[test]
fn overwrite_mode_saves_next_to_the_first_original_path() {
    let dir = tempdir().unwrap();
    let file = dir.path().join("test.csv");
    fs::write(&file, "name,age\nAlice,25\n").unwrap();

    let db = Builder::new()
        .path(&file)
        .auto_save(AutoSave::overwrite_on_close())
        .open()
        .unwrap();
    db.execute("UPDATE test SET age = 26", []).unwrap();
    db.close().unwrap();

    let content = fs::read_to_string(&file).unwrap();
    assert_eq!(content, "name,age\nAlice,26\n");
}

#[test]
fn overwrite_mode_rejects_non_path_inputs() {
    let err = Builder::new()
        .stream(
            Cursor::new(b"a\n1\n".to_vec()),
            "t",
            FileType::new(BaseFormat::Csv, Compression::None),
        )
        .auto_save(AutoSave::overwrite_on_commit())
        .open()
        .unwrap_err();
    assert!(matches!(err, Error::AutoSaveOverwriteOnNonFile));
}

#[test]
fn auto_save_honours_dump_options() {
    let dir = tempdir().unwrap();
    let out = tempdir().unwrap();
    let file = dir.path().join("data.csv");
    fs::write(&file, "a,b\n1,2\n").unwrap();

    let db = Builder::new()
        .path(&file)
        .auto_save(
            AutoSave::on_close(out.path())
                .options(DumpOptions::new(BaseFormat::Ltsv, Compression::Gzip)),
        )
        .open()
        .unwrap();
    db.close().unwrap();

    assert!(out.path().join("data.ltsv.gz").exists());
}

#[test]
fn manual_dump_works_without_auto_save() {
    let dir = tempdir().unwrap();
    let out = tempdir().unwrap();
    let file = dir.path().join("data.csv");
    fs::write(&file, "a,b\n1,2\n").unwrap();

    let db = sqltab::open([&file]).unwrap();
    db.dump(out.path(), &DumpOptions::default()).unwrap();
    assert_eq!(
        fs::read_to_string(out.path().join("data.csv")).unwrap(),
        "a,b\n1,2\n"
    );
}
