//! SQLite database handle for the Courtside store.

pub use courtside_core::db::DatabaseError;

courtside_core::define_database!(Store, "Store migrations complete");
