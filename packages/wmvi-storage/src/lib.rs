pub mod db;
pub mod ingest;
pub mod language;
pub mod matches;
pub mod models;
pub mod registry;
pub mod schema;
pub mod search;
pub mod state;
pub mod stats;
pub mod terms;

mod error;

pub use error::Error;

pub type Result<T, E = Error> = std::result::Result<T, E>;
