//! Clipboard configuration.

use serde::{Deserialize, Serialize};
use smol_str::SmolStr;

use crate::platform::{Capabilities, LineEnding};

/// Off-screen style for the element that hosts a fragment while its plain
/// text is measured. It must still take part in layout.
pub const LAYOUT_SURFACE_STYLE: &str = "position:fixed;overflow:hidden;bottom:100%;right:100%;";

/// Style for the paste scrape surface. It sits inside the viewport so the
/// platform does not scroll to it when it inserts.
pub const SCRAPE_SURFACE_STYLE: &str =
    "position:fixed; overflow:hidden; top:0; right:100%; width:1px; height:1px;";

/// Per-editor clipboard settings.
///
/// Every field has a default, so partial configs deserialize cleanly.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClipboardConfig {
    /// Plain text line endings. `None` follows the platform.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub line_ending: Option<LineEnding>,

    /// Tag of the transient surfaces (layout host and scrape surface).
    pub surface_tag: SmolStr,

    pub scrape_surface_style: String,

    pub layout_surface_style: String,

    /// Whether holding the plain text modifier (shift) during paste forces
    /// plain text insertion.
    pub plain_text_modifier: bool,
}

impl Default for ClipboardConfig {
    fn default() -> Self {
        Self {
            line_ending: None,
            surface_tag: SmolStr::new_static("div"),
            scrape_surface_style: SCRAPE_SURFACE_STYLE.to_string(),
            layout_surface_style: LAYOUT_SURFACE_STYLE.to_string(),
            plain_text_modifier: true,
        }
    }
}

impl ClipboardConfig {
    /// Effective line ending: the configured override, else the platform's.
    pub fn line_ending(&self, capabilities: &Capabilities) -> LineEnding {
        self.line_ending.unwrap_or(capabilities.line_ending)
    }
}
