//! Shared fixtures: a throwaway SQLite database behind the same AnyPool the
//! library uses in production.

#![allow(dead_code)]

use sqlfns::prelude::*;
use std::path::PathBuf;
use tempfile::TempDir;

pub struct TestDb {
    pub session: SessionManager,
    pub fns: SqlFunctions,
    _dir: TempDir,
}

pub fn sql_dir() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("tests").join("sql")
}

pub async fn setup() -> TestDb {
    setup_with(PoolSettings::default()).await
}

pub async fn setup_with(settings: PoolSettings) -> TestDb {
    let dir = tempfile::tempdir().expect("tempdir");
    let url = format!("sqlite://{}?mode=rwc", dir.path().join("test.db").display());

    let session = SessionManager::connect(&url, &settings)
        .await
        .expect("connect");
    let fns = generate(&session, sql_dir(), &PolicyConfig::default()).expect("generate");
    fns.call("createTable", params![]).await.expect("create table");

    TestDb {
        session,
        fns,
        _dir: dir,
    }
}

impl TestDb {
    pub async fn create_person(&self, id: &str, first: &str, last: &str, age: i64, phone: &str) -> Record {
        self.fns
            .call("createOnePerson", params![id, first, last, age, phone])
            .await
            .expect("createOnePerson")
            .into_single()
            .expect("inserted row")
    }

    pub async fn count(&self) -> i64 {
        let row = self
            .fns
            .call("countPersons", params![])
            .await
            .expect("countPersons")
            .into_single()
            .expect("count row");
        row["total"].as_i64().expect("integer count")
    }

    pub fn sql(&self, name: &str) -> String {
        self.fns.statement(name).expect("statement").to_string()
    }
}
