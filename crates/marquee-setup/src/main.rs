use anyhow::{Context, bail};
use tracing::{info, warn};

use marquee_crypto::password::HashCost;
use marquee_db::{DataError, Database, DbConfig};
use marquee_types::models::{PERMISSION_CATALOG, User};
use marquee_types::validation::validate_user;
use marquee_types::validator::Validator;

struct AdminAccount {
    name: String,
    email: String,
    password: String,
}

impl AdminAccount {
    /// All three `MARQUEE_ADMIN_*` variables, or none when any is unset.
    fn from_env() -> Option<Self> {
        Some(Self {
            name: std::env::var("MARQUEE_ADMIN_NAME").ok()?,
            email: std::env::var("MARQUEE_ADMIN_EMAIL").ok()?,
            password: std::env::var("MARQUEE_ADMIN_PASSWORD").ok()?,
        })
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env if present
    let _ = dotenvy::dotenv();

    // Init logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "marquee=debug".into()),
        )
        .init();

    // Init database (creates the schema and seeds the catalog)
    let config = DbConfig::from_env();
    let db = Database::open(&config)
        .with_context(|| format!("opening {}", config.path.display()))?;
    db.ping().await.context("database did not answer")?;

    let (connections, idle) = db.pool_state();
    info!(connections, idle, timeout = ?db.query_timeout(), "Database ready");

    let Some(admin) = AdminAccount::from_env() else {
        info!("MARQUEE_ADMIN_* not set, skipping admin account");
        return Ok(());
    };

    let user = ensure_admin(&db, admin).await?;
    let report = db.add_permissions_for_user(user.id, PERMISSION_CATALOG).await?;
    info!(user_id = user.id, granted = ?report.granted, "Admin permissions granted");
    if !report.is_complete() {
        warn!(unknown = ?report.unknown, "Catalog codes missing from database");
    }

    Ok(())
}

/// Create the admin account, or load it when the email is already taken.
async fn ensure_admin(db: &Database, admin: AdminAccount) -> anyhow::Result<User> {
    let mut user = User::new(admin.name, admin.email);
    user.activated = true;
    user.password
        .set_with_cost(&admin.password, &HashCost::from_env())
        .context("hashing admin password")?;

    let mut v = Validator::new();
    validate_user(&mut v, &user);
    if !v.valid() {
        for (field, message) in v.errors() {
            warn!(field = %field, "{message}");
        }
        bail!("admin account is invalid");
    }

    match db.insert_user(&mut user).await {
        Ok(()) => {
            info!(user_id = user.id, email = %user.email, "Admin account created");
            Ok(user)
        }
        Err(DataError::DuplicateEmail) => {
            let existing = db.get_user_by_email(&user.email).await?;
            info!(user_id = existing.id, email = %existing.email, "Admin account already exists");
            Ok(existing)
        }
        Err(e) => Err(e.into()),
    }
}
