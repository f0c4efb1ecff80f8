//! Platform description for clipboard workarounds.
//!
//! Clipboard support differs wildly between hosts. Rather than checking
//! browser flags inline, callers describe the host once as a `Platform` and
//! the resolver and writer consult the derived `Capabilities`.

use serde::{Deserialize, Serialize};

/// Native line-ending convention for plain text on the host.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LineEnding {
    /// `\n`
    #[default]
    Lf,
    /// `\r\n`
    CrLf,
}

/// Host platform flags.
///
/// Detection from a user agent lives in `from_user_agent`; native hosts can
/// build the struct directly.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Platform {
    pub windows: bool,
    pub mac: bool,
    pub ios: bool,
    pub android: bool,
    /// Legacy EdgeHTML. Chromium Edge reports as `chrome`.
    pub edge: bool,
    pub gecko: bool,
    pub safari: bool,
    pub chrome: bool,
}

impl Platform {
    /// Classify a browser from its user agent and `navigator.platform`.
    ///
    /// `max_touch_points` distinguishes iPadOS (which claims to be a Mac) from
    /// real Macs.
    pub fn from_user_agent(user_agent: &str, platform: &str, max_touch_points: u32) -> Self {
        let ua = user_agent.to_lowercase();
        let platform = platform.to_lowercase();

        // iPhone/iPad/iPod in UA, or Mac platform with touch
        let ios = ua.contains("iphone")
            || ua.contains("ipad")
            || ua.contains("ipod")
            || (platform.contains("mac") && max_touch_points > 0);
        let mac = platform.contains("mac") && !ios;
        let windows = platform.starts_with("win") || ua.contains("windows nt");
        let android = ua.contains("android");

        // EdgeHTML identifies as "Edge/"; Chromium Edge uses "Edg/".
        let edge = ua.contains("edge/");
        let chrome = ua.contains("chrome") && !edge;
        let safari = ua.contains("safari") && !ua.contains("chrome") && !edge;
        let gecko = ua.contains("gecko/") && !ua.contains("like gecko");

        Self {
            windows,
            mac,
            ios,
            android,
            edge,
            gecko,
            safari,
            chrome,
        }
    }

    /// What the clipboard layer may rely on for this host.
    pub fn capabilities(&self) -> Capabilities {
        Capabilities {
            // EdgeHTML only accepts plain text writes; iOS Safari ignores
            // clipboardData writes entirely.
            outbound_write: !self.edge && !self.ios,
            // EdgeHTML only exposes the plain text item.
            item_reads_plain_only: self.edge,
            // Firefox does not advertise text/rtf but converts it to markup
            // when it inserts the content itself.
            type_reads_hide_rich_text: self.gecko,
            line_ending: if self.windows {
                LineEnding::CrLf
            } else {
                LineEnding::Lf
            },
        }
    }
}

/// Derived clipboard capabilities.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Capabilities {
    /// Copy and cut can write both outbound slots themselves.
    pub outbound_write: bool,
    /// Inbound reads only ever see plain text, so neither the item nor the
    /// type interface is worth using without file payloads.
    pub item_reads_plain_only: bool,
    /// Type enumeration may omit a legacy rich text channel that platform
    /// default insertion would still honour.
    pub type_reads_hide_rich_text: bool,
    pub line_ending: LineEnding,
}

impl Default for Capabilities {
    fn default() -> Self {
        Platform::default().capabilities()
    }
}
