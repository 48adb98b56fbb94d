//! Asset identity: classification, deterministic naming and the dedup map.

pub mod classifier;
pub mod path_resolver;
pub mod store;

pub use classifier::{AssetClass, classify};
pub use path_resolver::{FALLBACK_EXTENSION, extension_for, hashed_file_name, url_digest};
pub use store::{AssetRecord, AssetStore, Registration};
