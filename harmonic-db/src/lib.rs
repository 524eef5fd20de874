pub mod error;
pub mod history;
pub mod models;
pub mod snapshot;
pub mod storage;
