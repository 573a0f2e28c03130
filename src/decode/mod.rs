//! Response decoder module
//!
//! Extracts record arrays from Ad Manager JSON response bodies. Listing
//! responses carry their records under a resource-named field
//! (`orders`, `placements`, `reports`); row pages carry them under `rows`.

mod decoders;
mod types;

pub use decoders::{extract_path, extract_path_string, JsonDecoder};
pub use types::RecordDecoder;
