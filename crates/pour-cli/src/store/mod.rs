pub mod actor;
pub mod db;

pub use actor::DbHandle;
pub use db::{DbError, HistoryEvent, StateDb};
