//! Formula engine API.

mod apply;
mod expand;
mod format;
mod resolve;
mod spec;

pub use apply::{apply, ApplyOptions};
pub use format::{format_dynamic, format_number};
pub use resolve::HeaderMap;
