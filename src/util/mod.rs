//! Utility functions for common operations.
//!
//! - **Text processing**: Unicode-aware truncation, control character
//!   stripping for scraped titles, and slug derivation for new posts.
//! - **Links**: validation before opening post links in the browser.

mod links;
mod text;

pub use links::validate_url_for_open;
pub use text::{slugify, strip_control_chars, truncate_to_width};

/// Maximum allowed search query length, shared by the search bar and the search query
pub const MAX_SEARCH_QUERY_LENGTH: usize = 256;
