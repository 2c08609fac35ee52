//! Application layer containing the mall entry/exit orchestration.
//!
//! `MallService` composes the user, session and balance stores with the
//! geofence and billing rules. Stores are injected as boxed ports so the
//! same flow runs against memory, JSON files or RocksDB.

pub mod mall;
