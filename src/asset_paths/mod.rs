//! Helpers for normalising asset references before and after resolution.
//!
//! Filtering external references, appending the implied extension and joining the
//! resolved path onto the public prefix are kept apart so each rule can be tested alone.

mod extname;
mod filters;
mod join;

pub use extname::{AssetKind, extname, path_with_extname};
pub use filters::is_external_reference;
pub use join::join_asset_path;
