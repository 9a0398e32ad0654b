pub mod kind;
pub mod models;
pub mod offset;
pub mod types;

// Re-exports
pub use bigdecimal;
pub use chrono;
pub use hex;
pub use indexmap;
pub use log;
pub use ordered_float;
pub use parking_lot;
pub use rust_decimal;
pub use serde;
pub use serde_json;
pub use serde_yaml;
pub use thiserror;
