//! `[markup]` section configuration.
//!
//! Names the authoring instrumentation the reconciler reads from the page.
//!
//! # Example
//!
//! ```toml
//! [markup]
//! page_root = "main"                              # Element bound as page root
//! resource_attr = "data-aue-resource"             # Editable resource id
//! richtext_resource_attr = "data-richtext-resource"
//! richtext_prop_attr = "data-richtext-prop"
//! block_class = "block"                           # Widget boundary class
//! section_class = "section"                       # Section boundary class
//! icon_prefix = "/icons"                          # Where icon SVGs are served
//! ```

use serde::{Deserialize, Serialize};

use crate::config::ConfigDiagnostics;

/// Instrumentation vocabulary.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MarkupConfig {
    pub page_root: String,
    pub resource_attr: String,
    pub richtext_resource_attr: String,
    pub richtext_prop_attr: String,
    pub block_class: String,
    pub section_class: String,
    pub icon_prefix: String,
}

impl Default for MarkupConfig {
    fn default() -> Self {
        Self {
            page_root: "main".into(),
            resource_attr: "data-aue-resource".into(),
            richtext_resource_attr: "data-richtext-resource".into(),
            richtext_prop_attr: "data-richtext-prop".into(),
            block_class: "block".into(),
            section_class: "section".into(),
            icon_prefix: "/icons".into(),
        }
    }
}

impl MarkupConfig {
    pub fn validate(&self, diag: &mut ConfigDiagnostics) {
        let names = [
            ("markup.page_root", &self.page_root),
            ("markup.resource_attr", &self.resource_attr),
            ("markup.richtext_resource_attr", &self.richtext_resource_attr),
            ("markup.richtext_prop_attr", &self.richtext_prop_attr),
            ("markup.block_class", &self.block_class),
            ("markup.section_class", &self.section_class),
        ];
        for (field, value) in names {
            if !is_valid_name(value) {
                diag.error_with_hint(
                    field,
                    format!("`{value}` is not a valid name"),
                    "use lowercase letters, digits and `-`",
                );
            }
        }
        if self.resource_attr == self.richtext_resource_attr {
            diag.error(
                "markup.richtext_resource_attr",
                "must differ from markup.resource_attr",
            );
        }
    }
}

fn is_valid_name(s: &str) -> bool {
    !s.is_empty()
        && s.chars()
            .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || matches!(c, '-' | '_'))
}
