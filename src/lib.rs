pub mod db;
pub mod error;
pub mod import;
pub mod parser;
pub mod pipeline;
pub mod record;
pub mod settings;
pub mod sources;
pub mod upsert;

pub use error::{Error, Result};
