pub mod config;
pub mod id;
pub mod document;
pub mod query;
pub mod collection;
pub mod store;
pub mod error;

pub use collection::{CheckReport, Collection};
pub use config::{Config, OnCollision};
pub use document::{Document, ID_FIELD};
pub use error::{PantexError, Result};
pub use id::IdStrategy;
pub use query::Query;
pub use store::Database;
