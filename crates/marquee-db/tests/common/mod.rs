#![allow(dead_code)]

use std::path::{Path, PathBuf};
use std::time::Duration;

use marquee_crypto::password::HashCost;
use marquee_db::{Database, DbConfig};
use marquee_types::models::{Movie, Runtime, User};
use tempfile::TempDir;

pub const PASSWORD: &str = "pa55word1234";

pub fn config() -> DbConfig {
    DbConfig {
        connection_timeout: Duration::from_secs(5),
        query_timeout: Duration::from_secs(5),
        ..DbConfig::default()
    }
}

pub fn memory_db() -> Database {
    Database::open_in_memory(&config()).unwrap()
}

/// A database in a scratch directory, for tests that also need a raw
/// connection beside the pool.
pub struct FileDb {
    pub db: Database,
    pub path: PathBuf,
    _dir: TempDir,
}

impl FileDb {
    pub fn new() -> Self {
        Self::with_connections(2)
    }

    pub fn with_connections(max_connections: u32) -> Self {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("marquee.db");
        let db = Database::open(&DbConfig {
            path: path.clone(),
            max_connections,
            min_idle: Some(1),
            ..config()
        })
        .unwrap();
        Self { db, path, _dir: dir }
    }

    pub fn raw(&self) -> rusqlite::Connection {
        raw_connection(&self.path)
    }
}

fn raw_connection(path: &Path) -> rusqlite::Connection {
    let conn = rusqlite::Connection::open(path).unwrap();
    conn.busy_timeout(Duration::from_secs(5)).unwrap();
    conn
}

pub fn cheap_cost() -> HashCost {
    HashCost {
        memory_kib: 64,
        iterations: 1,
        parallelism: 1,
    }
}

pub fn new_user(name: &str, email: &str) -> User {
    let mut user = User::new(name, email);
    user.password.set_with_cost(PASSWORD, &cheap_cost()).unwrap();
    user
}

pub async fn insert_user(db: &Database, name: &str, email: &str) -> User {
    let mut user = new_user(name, email);
    db.insert_user(&mut user).await.unwrap();
    user
}

pub fn genres(names: &[&str]) -> Vec<String> {
    names.iter().map(|g| g.to_string()).collect()
}

pub async fn insert_movie(db: &Database, title: &str, year: i32, tags: &[&str]) -> Movie {
    let mut movie = Movie::new(title, year, Runtime(100), genres(tags));
    db.insert_movie(&mut movie).await.unwrap();
    movie
}
