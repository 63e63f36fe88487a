use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::TempDir;

const PRODUCTS_IMPORTER: &str = r#"{
    "id": "products",
    "name": "Product catalogue",
    "fetcher": "file",
    "parser": { "kind": "csv" },
    "processor": {
        "entity_type": "product",
        "mappings": [
            { "target": "guid", "columns": [{ "source": "sku", "unique": true }] },
            { "target": "title", "columns": [{ "source": "title" }] }
        ]
    }
}"#;

fn feedpipe_cmd(db: &TempDir) -> Command {
    let mut cmd = Command::cargo_bin("feedpipe").unwrap();
    cmd.env("FEEDPIPE_DB_PATH", db.path().join("test.db").to_str().unwrap())
        .env("FEEDPIPE_IMPORT_LIMIT", "2")
        .env("FEEDPIPE_LOG", "warn");
    cmd
}

#[test]
fn test_help_lists_commands() {
    Command::cargo_bin("feedpipe")
        .unwrap()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("import"))
        .stdout(predicate::str::contains("expire"))
        .stdout(predicate::str::contains("importer"));
}

#[test]
fn test_import_help_shows_until_done_flag() {
    Command::cargo_bin("feedpipe")
        .unwrap()
        .arg("import")
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("--until-done"))
        .stdout(predicate::str::contains("--all"));
}

#[test]
fn test_list_without_feeds() {
    let db = TempDir::new().unwrap();

    feedpipe_cmd(&db)
        .arg("list")
        .assert()
        .success()
        .stdout(predicate::str::contains("No feeds configured"));
}

#[test]
fn test_import_requires_feed_or_all() {
    let db = TempDir::new().unwrap();

    feedpipe_cmd(&db)
        .arg("import")
        .assert()
        .failure()
        .stderr(predicate::str::contains("Error:"));
}

#[test]
fn test_add_with_unknown_importer_fails() {
    let db = TempDir::new().unwrap();

    feedpipe_cmd(&db)
        .args(["add", "/tmp/products.csv", "--importer", "missing"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Importer not found"));
}

mod csv_import {
    use super::*;

    fn setup() -> TempDir {
        let dir = TempDir::new().unwrap();
        let csv = dir.path().join("products.csv");
        std::fs::write(&csv, "sku,title\na1,Kettle\na2,\"Toaster, 2 slots\"\na3,Mug\n").unwrap();

        feedpipe_cmd(&dir)
            .args(["importer", "add", PRODUCTS_IMPORTER])
            .assert()
            .success()
            .stdout(predicate::str::contains("Importer saved: products"));

        feedpipe_cmd(&dir)
            .args(["add", csv.to_str().unwrap(), "--importer", "products"])
            .assert()
            .success()
            .stdout(predicate::str::contains("Feed added successfully"));

        dir
    }

    #[test]
    fn test_import_until_done_is_idempotent() {
        let dir = setup();

        feedpipe_cmd(&dir)
            .args(["import", "1", "--until-done"])
            .assert()
            .success()
            .stdout(predicate::str::contains("complete (3 created, 0 updated, 0 failed)"));

        feedpipe_cmd(&dir)
            .args(["import", "1", "--until-done"])
            .assert()
            .success()
            .stdout(predicate::str::contains("complete (0 created, 0 updated, 0 failed)"));
    }

    #[test]
    fn test_single_import_reports_progress() {
        let dir = setup();

        feedpipe_cmd(&dir)
            .args(["import", "1"])
            .assert()
            .success()
            .stdout(predicate::str::contains("(2 created, 0 updated, 0 failed)"))
            .stdout(predicate::str::contains("complete").not());

        feedpipe_cmd(&dir)
            .arg("list")
            .assert()
            .success()
            .stdout(predicate::str::contains("Import in progress"));
    }

    #[test]
    fn test_remove_feed() {
        let dir = setup();

        feedpipe_cmd(&dir)
            .args(["import", "--all", "--until-done"])
            .assert()
            .success();

        feedpipe_cmd(&dir)
            .args(["remove", "1"])
            .assert()
            .success()
            .stdout(predicate::str::contains("Removed:"));

        feedpipe_cmd(&dir)
            .arg("list")
            .assert()
            .success()
            .stdout(predicate::str::contains("No feeds configured"));
    }

    #[test]
    fn test_importer_list() {
        let dir = setup();

        feedpipe_cmd(&dir)
            .args(["importer", "list"])
            .assert()
            .success()
            .stdout(predicate::str::contains("products [file -> csv -> product]"));
    }
}
