/// User configuration and its partial-update form
use serde::{Deserialize, Serialize};

use crate::tab_data::GroupColor;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Locale {
    #[default]
    En,
    Zh,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Theme {
    Light,
    Dark,
    #[default]
    System,
}

/// Idle minutes before a background tab may be discarded
///
/// Stored as the bare number of minutes; `0` means never.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(try_from = "u32", into = "u32")]
pub enum SuspendTimeout {
    Disabled,
    Minutes15,
    #[default]
    Minutes30,
    Minutes60,
}

impl SuspendTimeout {
    pub fn minutes(self) -> u32 {
        match self {
            SuspendTimeout::Disabled => 0,
            SuspendTimeout::Minutes15 => 15,
            SuspendTimeout::Minutes30 => 30,
            SuspendTimeout::Minutes60 => 60,
        }
    }

    /// `None` when suspension is turned off
    pub fn as_millis(self) -> Option<i64> {
        match self {
            SuspendTimeout::Disabled => None,
            other => Some(other.minutes() as i64 * 60_000),
        }
    }
}

impl TryFrom<u32> for SuspendTimeout {
    type Error = String;

    fn try_from(minutes: u32) -> Result<Self, Self::Error> {
        match minutes {
            0 => Ok(SuspendTimeout::Disabled),
            15 => Ok(SuspendTimeout::Minutes15),
            30 => Ok(SuspendTimeout::Minutes30),
            60 => Ok(SuspendTimeout::Minutes60),
            other => Err(format!("unsupported suspend timeout: {} minutes", other)),
        }
    }
}

impl From<SuspendTimeout> for u32 {
    fn from(timeout: SuspendTimeout) -> u32 {
        timeout.minutes()
    }
}

/// User rule: `pattern` is matched as a substring of the domain or URL
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CustomRule {
    pub pattern: String,
    pub group_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<GroupColor>,
}

impl CustomRule {
    pub fn matches(&self, domain: &str, url: &str) -> bool {
        domain.contains(self.pattern.as_str()) || url.contains(self.pattern.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Settings {
    pub locale: Locale,
    pub theme: Theme,
    pub auto_organize: bool,
    pub suspend_timeout: SuspendTimeout,
    pub custom_rules: Vec<CustomRule>,
    pub excluded_sites: Vec<String>,
    pub enabled: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Settings {
            locale: Locale::En,
            theme: Theme::System,
            auto_organize: true,
            suspend_timeout: SuspendTimeout::Minutes30,
            custom_rules: Vec::new(),
            excluded_sites: Vec::new(),
            enabled: true,
        }
    }
}

impl Settings {
    pub fn merge(&self, patch: SettingsPatch) -> Settings {
        let current = self.clone();
        Settings {
            locale: patch.locale.unwrap_or(current.locale),
            theme: patch.theme.unwrap_or(current.theme),
            auto_organize: patch.auto_organize.unwrap_or(current.auto_organize),
            suspend_timeout: patch.suspend_timeout.unwrap_or(current.suspend_timeout),
            custom_rules: patch.custom_rules.unwrap_or(current.custom_rules),
            excluded_sites: patch.excluded_sites.unwrap_or(current.excluded_sites),
            enabled: patch.enabled.unwrap_or(current.enabled),
        }
    }
}

/// Partial settings sent by the options page
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SettingsPatch {
    pub locale: Option<Locale>,
    pub theme: Option<Theme>,
    pub auto_organize: Option<bool>,
    pub suspend_timeout: Option<SuspendTimeout>,
    pub custom_rules: Option<Vec<CustomRule>>,
    pub excluded_sites: Option<Vec<String>>,
    pub enabled: Option<bool>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_defaults() {
        let settings = Settings::default();
        assert!(settings.auto_organize);
        assert!(settings.enabled);
        assert_eq!(settings.suspend_timeout.minutes(), 30);
        assert!(settings.custom_rules.is_empty());
    }

    #[test]
    fn test_suspend_timeout_wire_format() {
        let value = serde_json::to_value(SuspendTimeout::Minutes15).unwrap();
        assert_eq!(value, json!(15));

        let parsed: SuspendTimeout = serde_json::from_value(json!(0)).unwrap();
        assert_eq!(parsed, SuspendTimeout::Disabled);
        assert_eq!(parsed.as_millis(), None);

        assert!(serde_json::from_value::<SuspendTimeout>(json!(45)).is_err());
    }

    #[test]
    fn test_partial_stored_settings_take_defaults() {
        let stored: Settings = serde_json::from_value(json!({
            "autoOrganize": false,
            "excludedSites": ["bank.com"]
        }))
        .unwrap();

        assert!(!stored.auto_organize);
        assert_eq!(stored.excluded_sites, vec!["bank.com".to_string()]);
        assert_eq!(stored.suspend_timeout, SuspendTimeout::Minutes30);
        assert_eq!(stored.theme, Theme::System);
    }

    #[test]
    fn test_merge_only_overrides_present_fields() {
        let patch: SettingsPatch = serde_json::from_value(json!({
            "suspendTimeout": 60,
            "customRules": [{"pattern": "jira", "groupName": "Work", "color": "red"}]
        }))
        .unwrap();

        let merged = Settings::default().merge(patch);

        assert_eq!(merged.suspend_timeout, SuspendTimeout::Minutes60);
        assert_eq!(merged.custom_rules.len(), 1);
        assert_eq!(merged.custom_rules[0].color, Some(GroupColor::Red));
        assert!(merged.auto_organize);
    }

    #[test]
    fn test_custom_rule_matches_domain_or_url() {
        let rule = CustomRule {
            pattern: "/wiki/".to_string(),
            group_name: "Wiki".to_string(),
            color: None,
        };
        assert!(rule.matches("en.wikipedia.org", "https://en.wikipedia.org/wiki/Rust"));
        assert!(!rule.matches("en.wikipedia.org", "https://en.wikipedia.org/"));
    }
}
