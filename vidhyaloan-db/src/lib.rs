pub mod client;
pub(crate) mod record;

/// Embedded migrations, run by the server at startup.
pub static MIGRATOR: sqlx::migrate::Migrator = sqlx::migrate!();
