use rusqlite::{OptionalExtension, params};
use tracing::{debug, info};

use marquee_types::models::{PermissionGrant, Permissions};

use crate::error::is_foreign_key_violation;
use crate::{DataError, Database, Result};

impl Database {
    // -- Permissions --

    /// Every code granted to `user_id`, ascending. An unknown user simply has
    /// no permissions.
    pub async fn get_all_permissions_for_user(&self, user_id: i64) -> Result<Permissions> {
        self.run("get_all_permissions_for_user", move |conn| {
            let mut stmt = conn.prepare(
                "SELECT permissions.code
                 FROM permissions
                 INNER JOIN users_permissions ON users_permissions.permission_id = permissions.id
                 INNER JOIN users ON users_permissions.user_id = users.id
                 WHERE users.id = ?1
                 ORDER BY permissions.code",
            )?;
            let codes = stmt
                .query_map([user_id], |row| row.get::<_, String>(0))?
                .collect::<rusqlite::Result<Vec<_>>>()?;
            Ok(Permissions::from(codes))
        })
        .await
    }

    /// Grant each catalog code in `codes` to `user_id`.
    ///
    /// Codes missing from the catalog are skipped and listed in the report's
    /// `unknown`. Codes the user already holds count as granted. Lookups and
    /// inserts share one transaction, so either every known code is granted
    /// or none is.
    pub async fn add_permissions_for_user(
        &self,
        user_id: i64,
        codes: &[&str],
    ) -> Result<PermissionGrant> {
        let mut requested: Vec<String> = Vec::with_capacity(codes.len());
        for code in codes {
            if !requested.iter().any(|c| c == code) {
                requested.push(code.to_string());
            }
        }

        let report = self
            .run("add_permissions_for_user", move |conn| {
                let tx = conn.transaction()?;

                let exists: bool = tx.query_row(
                    "SELECT EXISTS (SELECT 1 FROM users WHERE id = ?1)",
                    [user_id],
                    |row| row.get(0),
                )?;
                if !exists {
                    return Err(DataError::RecordNotFound);
                }

                let mut report = PermissionGrant::default();
                {
                    let mut lookup = tx.prepare("SELECT id FROM permissions WHERE code = ?1")?;
                    let mut grant = tx.prepare(
                        "INSERT OR IGNORE INTO users_permissions (user_id, permission_id) VALUES (?1, ?2)",
                    )?;

                    for code in requested {
                        let Some(permission_id) = lookup
                            .query_row([&code], |row| row.get::<_, i64>(0))
                            .optional()?
                        else {
                            report.unknown.push(code);
                            continue;
                        };

                        grant
                            .execute(params![user_id, permission_id])
                            .map_err(|e| {
                                if is_foreign_key_violation(&e) {
                                    DataError::RecordNotFound
                                } else {
                                    DataError::Sqlite(e)
                                }
                            })?;
                        report.granted.push(code);
                    }
                }

                tx.commit()?;
                Ok(report)
            })
            .await?;

        if report.is_complete() {
            debug!(user_id, granted = ?report.granted, "permissions granted");
        } else {
            info!(user_id, unknown = ?report.unknown, "skipped permission codes not in catalog");
        }
        Ok(report)
    }
}
