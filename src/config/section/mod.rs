//! Configuration section definitions.
//!
//! Each module corresponds to a section in `livepatch.toml`:
//!
//! | Module     | TOML Section   | Purpose                               |
//! |------------|----------------|---------------------------------------|
//! | `markup`   | `[markup]`     | Instrumentation attribute/class names |
//! | `sanitize` | `[sanitize]`   | Replacement markup sanitation         |
//! | `serve`    | `[serve]`      | Development server                    |

mod markup;
mod sanitize;
mod serve;

pub use markup::MarkupConfig;
pub use sanitize::SanitizeConfig;
pub use serve::ServeConfig;
