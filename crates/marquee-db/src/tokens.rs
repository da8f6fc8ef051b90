use chrono::Utc;
use rusqlite::{OptionalExtension, params};

use marquee_crypto::token::token_hash;
use marquee_types::models::User;

use crate::users::{USER_COLUMNS, user_from_row};
use crate::{DataError, Database, Result};

impl Database {
    // -- Tokens --

    /// The owner of the unexpired `scope` token whose plaintext is
    /// `plaintext`. Only the SHA-256 digest is ever compared; an expired,
    /// mis-scoped or unknown token is `RecordNotFound`.
    pub async fn get_user_for_token(&self, scope: &str, plaintext: &str) -> Result<User> {
        let hash = token_hash(plaintext);
        let scope = scope.to_string();

        self.run("get_user_for_token", move |conn| {
            conn.query_row(
                &format!(
                    "SELECT {USER_COLUMNS}
                     FROM users
                     INNER JOIN tokens ON users.id = tokens.user_id
                     WHERE tokens.hash = ?1 AND tokens.scope = ?2 AND tokens.expiry > ?3"
                ),
                params![&hash[..], scope, Utc::now().timestamp()],
                user_from_row,
            )
            .optional()?
            .ok_or(DataError::RecordNotFound)
        })
        .await
    }
}
