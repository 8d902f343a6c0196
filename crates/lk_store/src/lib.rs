//! lk_store — Durable local storage for the Larkline send queue
//!
//! # Storage strategy
//! SQLite via sqlx, WAL journal mode. Message bodies arrive here already
//! end-to-end encrypted (base64 ciphertext + IV), so columns hold opaque
//! ciphertext and plaintext metadata (timestamps, ids, delivery state) that
//! the queue needs for efficient queries. Nothing in this crate can read a
//! message body.
//!
//! # Atomicity
//! Every queue mutation is a single UPDATE/DELETE statement guarded by the
//! row's current state, and callers get `rows_affected` back — a sync pass
//! incrementing retries and a concurrent user cancel can interleave in any
//! order without losing either update.
//!
//! # Migration
//! SQLx migrations in `migrations/` are run on open.

pub mod conflicts;
pub mod db;
pub mod error;
pub mod models;
pub mod queue;

pub use db::Store;
pub use error::StoreError;
