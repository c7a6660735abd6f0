#![allow(dead_code)]

use std::fs;
use std::path::{Path, PathBuf};

use assert_cmd::Command;
use chrono::NaiveDate;
use daylist::clock::FixedClock;
use daylist::task::parse_date;
use daylist::{Collection, Engine, Store};
use serde_json::Value;
use tempfile::TempDir;

pub struct TestDir {
    dir: TempDir,
}

impl TestDir {
    pub fn new() -> Self {
        let dir = tempfile::tempdir().expect("failed to create tempdir");
        Self { dir }
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    pub fn data_dir(&self) -> PathBuf {
        self.dir.path().join("data")
    }

    pub fn store(&self) -> Store {
        Store::new(self.data_dir())
    }

    pub fn engine(&self, today: &str) -> Engine {
        Engine::initialize(self.store(), FixedClock(date(today))).expect("initialize engine")
    }

    pub fn file(&self, collection: Collection) -> PathBuf {
        self.store().collection_file(collection)
    }

    /// Raw JSON records of a collection file; empty when the file is absent.
    pub fn records(&self, collection: Collection) -> Vec<Value> {
        let path = self.file(collection);
        if !path.exists() {
            return Vec::new();
        }
        let text = fs::read_to_string(&path).expect("read collection");
        serde_json::from_str(&text).expect("collection json")
    }

    pub fn last_update(&self) -> Option<String> {
        fs::read_to_string(self.data_dir().join("last_update.txt")).ok()
    }

    /// `daylist` binary running in this directory with a pinned date.
    pub fn cmd(&self, today: &str) -> Command {
        let mut cmd = Command::cargo_bin("daylist").expect("binary");
        cmd.current_dir(self.path())
            .env_remove("DAYLIST_DATA_DIR")
            .env_remove("RUST_LOG")
            .env("DAYLIST_TODAY", today);
        cmd
    }
}

pub fn date(raw: &str) -> NaiveDate {
    parse_date(raw).expect("date")
}
