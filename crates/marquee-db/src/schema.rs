use rusqlite::Connection;
use tracing::info;

use marquee_types::models::PERMISSION_CATALOG;

/// Create any missing tables, the title search index and its triggers, and
/// seed the permission catalog. Safe to run on every open; existing tables
/// are never altered.
pub fn bootstrap(conn: &Connection) -> rusqlite::Result<()> {
    conn.execute_batch(
        "
        CREATE TABLE IF NOT EXISTS movies (
            id          INTEGER PRIMARY KEY AUTOINCREMENT,
            created_at  TEXT NOT NULL,
            title       TEXT NOT NULL,
            year        INTEGER NOT NULL,
            runtime     INTEGER NOT NULL,
            genres      TEXT NOT NULL DEFAULT '[]' CHECK (json_valid(genres)),
            version     INTEGER NOT NULL DEFAULT 1
        );

        CREATE VIRTUAL TABLE IF NOT EXISTS movies_fts USING fts5(
            title,
            content = 'movies',
            content_rowid = 'id',
            tokenize = 'unicode61'
        );

        CREATE TRIGGER IF NOT EXISTS movies_fts_insert AFTER INSERT ON movies BEGIN
            INSERT INTO movies_fts (rowid, title) VALUES (new.id, new.title);
        END;

        CREATE TRIGGER IF NOT EXISTS movies_fts_delete AFTER DELETE ON movies BEGIN
            INSERT INTO movies_fts (movies_fts, rowid, title) VALUES ('delete', old.id, old.title);
        END;

        CREATE TRIGGER IF NOT EXISTS movies_fts_update AFTER UPDATE OF title ON movies BEGIN
            INSERT INTO movies_fts (movies_fts, rowid, title) VALUES ('delete', old.id, old.title);
            INSERT INTO movies_fts (rowid, title) VALUES (new.id, new.title);
        END;

        CREATE TABLE IF NOT EXISTS users (
            id             INTEGER PRIMARY KEY AUTOINCREMENT,
            created_at     TEXT NOT NULL,
            name           TEXT NOT NULL,
            email          TEXT NOT NULL COLLATE NOCASE,
            password_hash  TEXT NOT NULL,
            activated      INTEGER NOT NULL DEFAULT 0,
            version        INTEGER NOT NULL DEFAULT 1,
            CONSTRAINT users_email_key UNIQUE (email)
        );

        CREATE TABLE IF NOT EXISTS permissions (
            id    INTEGER PRIMARY KEY,
            code  TEXT NOT NULL UNIQUE
        );

        CREATE TABLE IF NOT EXISTS users_permissions (
            user_id        INTEGER NOT NULL REFERENCES users(id) ON DELETE CASCADE,
            permission_id  INTEGER NOT NULL REFERENCES permissions(id) ON DELETE CASCADE,
            PRIMARY KEY (user_id, permission_id)
        );

        CREATE TABLE IF NOT EXISTS tokens (
            hash     BLOB PRIMARY KEY,
            user_id  INTEGER NOT NULL REFERENCES users(id) ON DELETE CASCADE,
            expiry   INTEGER NOT NULL,
            scope    TEXT NOT NULL
        );

        CREATE INDEX IF NOT EXISTS idx_tokens_user ON tokens(user_id);
        ",
    )?;

    let mut seed = conn.prepare("INSERT OR IGNORE INTO permissions (code) VALUES (?1)")?;
    for code in PERMISSION_CATALOG {
        seed.execute([code])?;
    }

    info!("Schema ready ({} permission codes in catalog)", PERMISSION_CATALOG.len());
    Ok(())
}
