use rusqlite::Connection;

/// Initialize the card store schema
pub fn init_db(conn: &Connection) -> rusqlite::Result<()> {
    conn.execute_batch(
        r#"
        PRAGMA journal_mode = WAL;
        PRAGMA synchronous = NORMAL;

        -- Activation codes. Rows are never removed; deletion is a status value.
        -- expired_at and seid are set iff status = 'used'
        CREATE TABLE IF NOT EXISTS cards (
            id TEXT PRIMARY KEY,
            value TEXT NOT NULL UNIQUE,
            app_id TEXT NOT NULL DEFAULT '',
            user_id TEXT NOT NULL DEFAULT '',
            user_name TEXT NOT NULL DEFAULT '',
            days INTEGER NOT NULL DEFAULT 0,
            minutes INTEGER NOT NULL DEFAULT 0,
            time_type TEXT NOT NULL CHECK (time_type IN ('hourly', 'daily', 'weekly', 'monthly', 'yearly')),
            status TEXT NOT NULL CHECK (status IN ('unused', 'used', 'locked', 'deleted')),
            used INTEGER NOT NULL DEFAULT 0,
            seid TEXT,
            used_at INTEGER,
            locked_at INTEGER,
            deleted_at INTEGER,
            expired_at INTEGER,
            remark TEXT NOT NULL DEFAULT '',
            created_at INTEGER NOT NULL
        );
        CREATE INDEX IF NOT EXISTS idx_cards_status ON cards(status);
        CREATE INDEX IF NOT EXISTS idx_cards_user ON cards(user_id);
        "#,
    )?;
    Ok(())
}

/// Initialize the attempt ledger schema (separate DB file)
/// Append-only workload, so WAL with relaxed sync
pub fn init_ledger_db(conn: &Connection) -> rusqlite::Result<()> {
    conn.execute_batch(
        r#"
        PRAGMA journal_mode = WAL;
        PRAGMA synchronous = NORMAL;
        PRAGMA wal_autocheckpoint = 1000;
        PRAGMA journal_size_limit = 67108864;

        CREATE TABLE IF NOT EXISTS activation_attempts (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            card_value TEXT NOT NULL,
            activation_at INTEGER NOT NULL,
            success INTEGER NOT NULL,
            error_message TEXT,
            request_data TEXT,    -- decrypted request snapshot
            response_data TEXT,   -- result snapshot or error text
            created_at INTEGER NOT NULL
        );
        CREATE INDEX IF NOT EXISTS idx_attempts_value_time ON activation_attempts(card_value, activation_at);
        CREATE INDEX IF NOT EXISTS idx_attempts_created ON activation_attempts(created_at);
        "#,
    )?;
    Ok(())
}
