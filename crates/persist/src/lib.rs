//! Zestraw persistence: minimal client-local blob store.
//! One fixed slot holds the serialized cart. Keep code tiny and predictable.

#![forbid(unsafe_code)]

use anyhow::{Context, Result};
use metrics::{counter, histogram};
use tracing::debug;

/// Slot name the cart engine writes under.
pub const CART_SLOT: &str = "cart";

/// Client-local key-value store: one opaque body per slot.
/// Implementations must never interpret the bytes.
pub trait Store: Send + Sync {
    fn save(&self, slot: &str, body: &[u8]) -> Result<()>;
    /// Latest body for the slot, `None` when nothing was ever saved.
    fn load(&self, slot: &str) -> Result<Option<Vec<u8>>>;
}

/// SQLite-backed store. Simple, synchronous. Cart writes are small and the
/// CLI isn't latency sensitive here.
pub struct SqliteStore {
    db: std::sync::Mutex<rusqlite::Connection>,
}

impl SqliteStore {
    pub fn open_default() -> Result<Self> {
        let path = std::env::var("ZESTRAW_DB_PATH").unwrap_or_else(|_| default_db_path());
        Self::open(&path)
    }

    pub fn open(path: &str) -> Result<Self> {
        let started = std::time::Instant::now();
        let db = rusqlite::Connection::open(path)
            .with_context(|| format!("opening sqlite db at {}", path))?;
        db.pragma_update(None, "journal_mode", &"WAL").ok();
        db.pragma_update(None, "synchronous", &"NORMAL").ok();
        db.execute(
            "CREATE TABLE IF NOT EXISTS cart_state (
                slot TEXT NOT NULL,
                ts   INTEGER NOT NULL,
                body BLOB NOT NULL
            )",
            [],
        )
        .context("creating cart_state table")?;
        db.execute(
            "CREATE INDEX IF NOT EXISTS idx_cart_state_slot_ts ON cart_state(slot, ts DESC)",
            [],
        )
        .ok();
        let me = Self { db: std::sync::Mutex::new(db) };
        histogram!("persist_open_ms", started.elapsed().as_secs_f64() * 1000.0);
        Ok(me)
    }
}

impl Store for SqliteStore {
    fn save(&self, slot: &str, body: &[u8]) -> Result<()> {
        let started = std::time::Instant::now();
        let mut db = self.db.lock().unwrap();
        let tx = db.transaction()?;
        tx.execute(
            "INSERT INTO cart_state(slot, ts, body) VALUES (?1, ?2, ?3)",
            (slot, now_ts(), body),
        )?;
        // Keep the latest 3 revisions per slot (delete older rows by rowid)
        tx.execute(
            "DELETE FROM cart_state
             WHERE slot = ?1
               AND rowid NOT IN (
                   SELECT rowid FROM cart_state WHERE slot = ?1 ORDER BY ts DESC, rowid DESC LIMIT 3
               )",
            [slot],
        )?;
        tx.commit()?;
        histogram!("persist_save_ms", started.elapsed().as_secs_f64() * 1000.0);
        counter!("persist_save_total", 1u64);
        debug!(slot, bytes = body.len(), "persist: saved");
        Ok(())
    }

    fn load(&self, slot: &str) -> Result<Option<Vec<u8>>> {
        let started = std::time::Instant::now();
        let db = self.db.lock().unwrap();
        let mut stmt = db.prepare(
            "SELECT body FROM cart_state WHERE slot = ?1 ORDER BY ts DESC, rowid DESC LIMIT 1",
        )?;
        let mut rows = stmt.query([slot])?;
        let out = match rows.next()? {
            Some(row) => Some(row.get::<_, Vec<u8>>(0)?),
            None => None,
        };
        histogram!("persist_load_ms", started.elapsed().as_secs_f64() * 1000.0);
        Ok(out)
    }
}

/// In-memory store for tests and ephemeral runs.
#[derive(Default)]
pub struct MemoryStore {
    slots: std::sync::Mutex<std::collections::HashMap<String, Vec<u8>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Store for MemoryStore {
    fn save(&self, slot: &str, body: &[u8]) -> Result<()> {
        self.slots.lock().unwrap().insert(slot.to_string(), body.to_vec());
        Ok(())
    }

    fn load(&self, slot: &str) -> Result<Option<Vec<u8>>> {
        Ok(self.slots.lock().unwrap().get(slot).cloned())
    }
}

fn default_db_path() -> String {
    if let Some(home) = std::env::var_os("HOME") {
        let mut p = std::path::PathBuf::from(home);
        p.push(".zestraw");
        let _ = std::fs::create_dir_all(&p);
        p.push("zestraw.db");
        return p.to_string_lossy().to_string();
    }
    // Fallback to current directory
    "zestraw.db".to_string()
}

pub fn now_ts() -> i64 {
    // seconds since epoch
    let now = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap_or_default();
    now.as_secs() as i64
}
