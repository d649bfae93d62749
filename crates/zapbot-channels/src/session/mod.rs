//! SQLx-based session storage backend for `whatsapp-rust`.
//!
//! Implements the `Backend` trait surface (SignalStore + ProtocolStore +
//! AppSyncStore + DeviceStore) over SQLite. The session database is
//! dedicated to the WhatsApp pairing state, so losing it only means
//! re-scanning the QR code.

mod app_sync;
mod device;
mod protocol;
mod signal;

use sqlx::{Pool, Sqlite, SqlitePool};

/// SQLx-backed WhatsApp session store.
pub struct SessionStore {
    pool: Pool<Sqlite>,
}

impl SessionStore {
    /// Open (or create) the session database and apply the schema.
    pub async fn new(db_path: &str) -> Result<Self, sqlx::Error> {
        let pool = SqlitePool::connect(&format!("sqlite:{db_path}?mode=rwc")).await?;
        Self::init_schema(&pool).await?;
        Ok(Self { pool })
    }

    async fn init_schema(pool: &Pool<Sqlite>) -> Result<(), sqlx::Error> {
        sqlx::raw_sql(
            "CREATE TABLE IF NOT EXISTS identities (
                address TEXT PRIMARY KEY,
                key_data BLOB NOT NULL
            );
            CREATE TABLE IF NOT EXISTS sessions (
                address TEXT PRIMARY KEY,
                session_data BLOB NOT NULL
            );
            CREATE TABLE IF NOT EXISTS prekeys (
                id INTEGER PRIMARY KEY,
                record BLOB NOT NULL,
                uploaded INTEGER NOT NULL DEFAULT 0
            );
            CREATE TABLE IF NOT EXISTS signed_prekeys (
                id INTEGER PRIMARY KEY,
                record BLOB NOT NULL
            );
            CREATE TABLE IF NOT EXISTS sender_keys (
                address TEXT PRIMARY KEY,
                record BLOB NOT NULL
            );
            CREATE TABLE IF NOT EXISTS sync_keys (
                key_id BLOB PRIMARY KEY,
                key_data BLOB NOT NULL,
                timestamp INTEGER NOT NULL DEFAULT 0,
                fingerprint BLOB
            );
            CREATE TABLE IF NOT EXISTS sync_versions (
                collection TEXT PRIMARY KEY,
                data TEXT NOT NULL
            );
            CREATE TABLE IF NOT EXISTS sync_mutation_macs (
                collection TEXT NOT NULL,
                index_mac BLOB NOT NULL,
                version INTEGER NOT NULL,
                value_mac BLOB NOT NULL,
                PRIMARY KEY (collection, index_mac)
            );
            CREATE TABLE IF NOT EXISTS skdm_recipients (
                group_jid TEXT NOT NULL,
                device_jid TEXT NOT NULL,
                PRIMARY KEY (group_jid, device_jid)
            );
            CREATE TABLE IF NOT EXISTS lid_mappings (
                lid TEXT PRIMARY KEY,
                phone_number TEXT NOT NULL,
                created_at INTEGER NOT NULL DEFAULT 0,
                updated_at INTEGER NOT NULL DEFAULT 0,
                learning_source TEXT NOT NULL DEFAULT ''
            );
            CREATE TABLE IF NOT EXISTS base_keys (
                address TEXT NOT NULL,
                message_id TEXT NOT NULL,
                base_key BLOB NOT NULL,
                PRIMARY KEY (address, message_id)
            );
            CREATE TABLE IF NOT EXISTS device_lists (
                user TEXT PRIMARY KEY,
                data TEXT NOT NULL
            );
            CREATE TABLE IF NOT EXISTS forget_sender_keys (
                group_jid TEXT NOT NULL,
                participant TEXT NOT NULL,
                PRIMARY KEY (group_jid, participant)
            );
            CREATE TABLE IF NOT EXISTS device_info (
                id INTEGER PRIMARY KEY,
                data BLOB NOT NULL
            );",
        )
        .execute(pool)
        .await?;

        Ok(())
    }
}
