mod from_row;
mod schema;
pub mod queries;

pub use schema::{init_db, init_ledger_db};

use std::sync::Arc;

use r2d2::Pool;
use r2d2_sqlite::SqliteConnectionManager;

use crate::activation::Coordinator;
use crate::crypto::{EnvelopeKey, SigningKeys};
use crate::replay::ReplayGuard;

pub type DbPool = Pool<SqliteConnectionManager>;

/// Application state shared by every handler
#[derive(Clone)]
pub struct AppState {
    /// Card store
    pub db: DbPool,
    /// Activation attempt ledger (separate file to isolate growth)
    pub ledger: DbPool,
    pub envelope: EnvelopeKey,
    pub signing: SigningKeys,
    pub replay: ReplayGuard,
    /// Owns the dedup and status caches
    pub coordinator: Arc<Coordinator>,
}

pub fn create_pool(database_path: &str) -> Result<DbPool, r2d2::Error> {
    let manager = SqliteConnectionManager::file(database_path);
    Pool::builder().max_size(10).build(manager)
}
