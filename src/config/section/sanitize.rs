//! `[sanitize]` section configuration.
//!
//! # Example
//!
//! ```toml
//! [sanitize]
//! extra_forbidden_tags = ["form", "svg"]   # Dropped on top of the built-in list
//! keep_comments = false
//! ```

use serde::{Deserialize, Serialize};

/// Replacement markup sanitation settings.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SanitizeConfig {
    /// Tags removed (with their content) in addition to the built-in list.
    pub extra_forbidden_tags: Vec<String>,
    /// Keep HTML comments in replacement markup.
    pub keep_comments: bool,
}
