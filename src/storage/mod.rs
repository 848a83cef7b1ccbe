pub mod db;
mod items;
pub mod models;
mod tables;

pub use db::{Database, MetadataError};
pub use items::MetadataStore;
pub use tables::*;
