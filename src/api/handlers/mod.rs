pub mod fallback;
pub mod upload;

pub use fallback::{fallback, preflight};
pub use upload::upload_file;
