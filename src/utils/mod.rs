pub mod constants;
pub mod url_utils;

pub use constants::*;
pub use url_utils::{canonicalize_url, host_dir_name, is_http_url, is_same_site};
