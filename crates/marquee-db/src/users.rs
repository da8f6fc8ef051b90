use chrono::{DateTime, Utc};
use rusqlite::{OptionalExtension, Row, params};
use tracing::{debug, warn};

use marquee_crypto::password::Password;
use marquee_types::models::User;

use crate::error::is_unique_violation;
use crate::{DataError, Database, Result};

pub(crate) const USER_COLUMNS: &str =
    "users.id, users.created_at, users.name, users.email, users.password_hash, users.activated, users.version";

const EMAIL_COLUMN: &str = "users.email";

impl Database {
    // -- Users --

    /// Insert `user`, filling in the id, creation time and initial version.
    /// The plaintext password is dropped from `user` once the row is written.
    pub async fn insert_user(&self, user: &mut User) -> Result<()> {
        let hash = user
            .password
            .hash()
            .ok_or(DataError::MissingPasswordHash)?
            .to_string();
        let (name, email, activated) = (user.name.clone(), user.email.clone(), user.activated);

        let (id, created_at, version): (i64, DateTime<Utc>, i32) = self
            .run("insert_user", move |conn| {
                conn.query_row(
                    "INSERT INTO users (created_at, name, email, password_hash, activated)
                     VALUES (?1, ?2, ?3, ?4, ?5)
                     RETURNING id, created_at, version",
                    params![Utc::now(), name, email, hash, activated],
                    |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?)),
                )
                .map_err(map_email_conflict)
            })
            .await?;

        user.id = id;
        user.created_at = created_at;
        user.version = version;
        user.password.clear_plaintext();
        debug!(id, "user inserted");
        Ok(())
    }

    /// Look up an account by email, case-insensitively.
    pub async fn get_user_by_email(&self, email: &str) -> Result<User> {
        let email = email.to_string();

        self.run("get_user_by_email", move |conn| {
            conn.query_row(
                &format!("SELECT {USER_COLUMNS} FROM users WHERE email = ?1"),
                [email],
                user_from_row,
            )
            .optional()?
            .ok_or(DataError::RecordNotFound)
        })
        .await
    }

    /// Write `user` back if nobody has changed it since it was read.
    ///
    /// Same version check as [`Database::update_movie`]. Taking an email that
    /// belongs to another account is `DuplicateEmail`, reported ahead of any
    /// version conflict.
    pub async fn update_user(&self, user: &mut User) -> Result<()> {
        let hash = user
            .password
            .hash()
            .ok_or(DataError::MissingPasswordHash)?
            .to_string();
        let (name, email, activated) = (user.name.clone(), user.email.clone(), user.activated);
        let (id, held_version) = (user.id, user.version);

        let version: i32 = self
            .run("update_user", move |conn| {
                conn.query_row(
                    "UPDATE users
                     SET name = ?1, email = ?2, password_hash = ?3, activated = ?4, version = version + 1
                     WHERE id = ?5 AND version = ?6
                     RETURNING version",
                    params![name, email, hash, activated, id, held_version],
                    |row| row.get(0),
                )
                .optional()
                .map_err(map_email_conflict)?
                .ok_or(DataError::EditConflict)
            })
            .await
            .inspect_err(|e| {
                if matches!(e, DataError::EditConflict) {
                    warn!(id, version = held_version, "user update lost a version race");
                }
            })?;

        user.version = version;
        user.password.clear_plaintext();
        Ok(())
    }
}

fn map_email_conflict(err: rusqlite::Error) -> DataError {
    if is_unique_violation(&err, EMAIL_COLUMN) {
        DataError::DuplicateEmail
    } else {
        DataError::Sqlite(err)
    }
}

/// Map the seven `USER_COLUMNS`.
pub(crate) fn user_from_row(row: &Row<'_>) -> rusqlite::Result<User> {
    Ok(User {
        id: row.get(0)?,
        created_at: row.get(1)?,
        name: row.get(2)?,
        email: row.get(3)?,
        password: Password::from_hash(row.get(4)?),
        activated: row.get(5)?,
        version: row.get(6)?,
    })
}
