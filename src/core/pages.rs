//! Page shell: which client page a path renders and the static labels shown
//! on it.

use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Page {
    /// Realtime console with tools, charts and the event log
    Console,
    /// Record, transcribe, answer and speak
    VoiceBot,
}

impl Page {
    pub const ALL: [Page; 2] = [Page::Console, Page::VoiceBot];

    /// Page routed at `path`. Unknown paths still get `index.html` from the
    /// static server but render no page.
    pub fn from_path(path: &str) -> Option<Self> {
        let trimmed = path.trim_end_matches('/');
        match trimmed {
            "" => Some(Self::Console),
            "/simple-voice-bot" => Some(Self::VoiceBot),
            _ => None,
        }
    }

    pub fn path(&self) -> &'static str {
        match self {
            Self::Console => "/",
            Self::VoiceBot => "/simple-voice-bot",
        }
    }

    /// Navigation link text.
    pub fn nav_label(&self) -> &'static str {
        match self {
            Self::Console => "REALTIME",
            Self::VoiceBot => "VOICE",
        }
    }
}

/// Capability tags advertised on both pages.
pub const CAPABILITIES: [&str; 8] = [
    "MySQL DW",
    "Text-to-SQL",
    "Analyze Data",
    "Python Charts",
    "Yahoo Finance",
    "Update Trackers",
    "Slide Deck",
    "Email Reports",
];

#[derive(Debug, Clone, Serialize)]
pub struct NavLink {
    pub label: &'static str,
    pub path: &'static str,
}

/// Navigation bar entries in display order.
pub fn navigation() -> Vec<NavLink> {
    Page::ALL
        .iter()
        .map(|page| NavLink {
            label: page.nav_label(),
            path: page.path(),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_path() {
        assert_eq!(Page::from_path("/"), Some(Page::Console));
        assert_eq!(Page::from_path(""), Some(Page::Console));
        assert_eq!(Page::from_path("/simple-voice-bot"), Some(Page::VoiceBot));
        assert_eq!(Page::from_path("/simple-voice-bot/"), Some(Page::VoiceBot));
        assert_eq!(Page::from_path("/settings"), None);
    }

    #[test]
    fn test_navigation_labels() {
        let nav = navigation();
        assert_eq!(nav[0].label, "REALTIME");
        assert_eq!(nav[0].path, "/");
        assert_eq!(nav[1].label, "VOICE");
        for page in Page::ALL {
            assert_eq!(Page::from_path(page.path()), Some(page));
        }
    }

    #[test]
    fn test_capabilities() {
        assert_eq!(CAPABILITIES.len(), 8);
        assert!(CAPABILITIES.contains(&"Text-to-SQL"));
    }
}
