mod blobs;
mod items;
mod service;

pub use blobs::serve_blob;
pub use items::{delete_item, get_item, list_items, upload_item};
pub use service::{index, method_not_allowed, not_found};
