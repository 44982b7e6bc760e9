//! Plugin settings: the storefront label and the badge CSS override.
//!
//! Both settings live in the options store as plain strings. Readers apply
//! defaults for missing keys; writers sanitize before persisting.

use serde::{Deserialize, Serialize};

/// Label shown next to the list price when none has been configured.
pub const DEFAULT_LABEL: &str = "List Price";

/// A settings key, paired with its option-store name and default.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SettingKey {
    Label,
    CustomCss,
}

impl SettingKey {
    pub const ALL: [SettingKey; 2] = [SettingKey::Label, SettingKey::CustomCss];

    /// The key under which this setting is stored in the options table.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            SettingKey::Label => "msrp_label",
            SettingKey::CustomCss => "msrp_custom_css",
        }
    }

    /// Value readers substitute when the option row is missing.
    #[must_use]
    pub const fn default_value(self) -> &'static str {
        match self {
            SettingKey::Label => DEFAULT_LABEL,
            SettingKey::CustomCss => "",
        }
    }

    /// Cleans a raw submitted value according to this key's policy.
    #[must_use]
    pub fn sanitize(self, raw: &str) -> String {
        match self {
            SettingKey::Label => sanitize_label(raw),
            SettingKey::CustomCss => sanitize_css(raw),
        }
    }
}

/// The full settings view returned by reads, with defaults already applied.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Settings {
    pub label: String,
    pub custom_css: String,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            label: DEFAULT_LABEL.to_string(),
            custom_css: String::new(),
        }
    }
}

/// A partial settings update. Absent fields are left untouched in the store;
/// present fields are sanitized and written, even when empty.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SettingsPatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub custom_css: Option<String>,
}

impl SettingsPatch {
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.label.is_none() && self.custom_css.is_none()
    }
}

/// Strips markup tags from a string, keeping the surrounding text.
#[must_use]
pub fn strip_tags(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    let mut in_tag = false;
    for ch in input.chars() {
        match ch {
            '<' => in_tag = true,
            '>' => in_tag = false,
            _ if !in_tag => out.push(ch),
            _ => {}
        }
    }
    out
}

/// Cleans a label value: tags removed, control characters dropped, runs of
/// whitespace collapsed to single spaces, ends trimmed.
#[must_use]
pub fn sanitize_label(raw: &str) -> String {
    let stripped = strip_tags(raw);
    let cleaned: String = stripped.chars().filter(|c| !c.is_control()).collect();
    cleaned.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Cleans a CSS value: tags removed so the text cannot close the emitted
/// style element, control characters dropped except line structure.
#[must_use]
pub fn sanitize_css(raw: &str) -> String {
    let stripped = strip_tags(raw);
    let cleaned: String = stripped
        .chars()
        .filter(|c| !c.is_control() || matches!(c, '\n' | '\r' | '\t'))
        .collect();
    cleaned.trim().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn setting_key_names_and_defaults() {
        assert_eq!(SettingKey::Label.as_str(), "msrp_label");
        assert_eq!(SettingKey::CustomCss.as_str(), "msrp_custom_css");
        assert_eq!(SettingKey::Label.default_value(), "List Price");
        assert_eq!(SettingKey::CustomCss.default_value(), "");
    }

    #[test]
    fn default_settings_use_default_label() {
        let settings = Settings::default();
        assert_eq!(settings.label, "List Price");
        assert_eq!(settings.custom_css, "");
    }

    #[test]
    fn strip_tags_removes_markup() {
        assert_eq!(strip_tags("<b>MSRP</b>"), "MSRP");
        assert_eq!(strip_tags("a <span class=\"x\">b</span> c"), "a b c");
    }

    #[test]
    fn strip_tags_drops_unclosed_tag_tail() {
        assert_eq!(strip_tags("price <script src="), "price ");
    }

    #[test]
    fn sanitize_label_collapses_whitespace() {
        assert_eq!(sanitize_label("  Suggested   Retail\tPrice  "), "Suggested Retail Price");
    }

    #[test]
    fn sanitize_label_strips_tags_and_controls() {
        assert_eq!(sanitize_label("<em>List</em> Price\u{0}"), "List Price");
    }

    #[test]
    fn sanitize_label_empty_stays_empty() {
        assert_eq!(sanitize_label(""), "");
        assert_eq!(sanitize_label("   "), "");
    }

    #[test]
    fn sanitize_css_preserves_newlines() {
        let css = "color: red;\nfont-weight: bold;";
        assert_eq!(sanitize_css(css), css);
    }

    #[test]
    fn sanitize_css_cannot_close_style_element() {
        let cleaned = sanitize_css("color: red; </style><script>alert(1)</script>");
        assert!(!cleaned.contains('<'));
        assert!(!cleaned.contains('>'));
    }

    #[test]
    fn settings_patch_empty_detection() {
        assert!(SettingsPatch::default().is_empty());
        let patch = SettingsPatch {
            label: Some("MSRP".to_string()),
            custom_css: None,
        };
        assert!(!patch.is_empty());
    }

    #[test]
    fn settings_patch_deserializes_partial_body() {
        let patch: SettingsPatch = serde_json::from_str(r#"{"label":"MSRP"}"#).unwrap();
        assert_eq!(patch.label.as_deref(), Some("MSRP"));
        assert!(patch.custom_css.is_none());
    }
}
