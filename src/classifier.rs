/// Tab classification: custom rules → smart keyword groups → domain fallback
use crate::domain::{domain_display_name, extract_domain, is_excluded, is_qualifying_url};
use crate::settings::Settings;
use crate::tab_data::GroupColor;

/// Keyword table consulted in order; first group with a hit wins
pub const SMART_GROUPS: &[(&[&str], &str)] = &[
    (&["react", "reactjs", "react.dev"], "React"),
    (&["vue", "vuejs", "vuejs.org"], "Vue"),
    (&["angular", "angularjs"], "Angular"),
    (&["typescript", "typescriptlang"], "TypeScript"),
    (&["python", "pypi", "django", "flask"], "Python"),
    (&["rust", "crates.io", "rust-lang"], "Rust"),
    (&["docker", "kubernetes", "k8s"], "DevOps"),
    (&["aws", "amazon web services", "ec2", "s3"], "AWS"),
    (&["figma", "sketch", "design"], "Design"),
    (&["chatgpt", "openai", "claude", "anthropic", "gemini", "ai"], "AI"),
];

/// Which layer produced a group name
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RuleSource {
    CustomRule,
    SmartGroup,
    Domain,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GroupAssignment {
    pub name: String,
    /// Explicit colour from a custom rule, if it carried one
    pub color: Option<GroupColor>,
    pub source: RuleSource,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Classification {
    /// Not an http(s) page
    Unqualified,
    /// Domain is on the excluded-sites list
    Excluded,
    Group(GroupAssignment),
}

impl Classification {
    pub fn into_group(self) -> Option<GroupAssignment> {
        match self {
            Classification::Group(assignment) => Some(assignment),
            _ => None,
        }
    }
}

/// Map a tab's URL and title to its target group
pub fn classify(url: &str, title: &str, settings: &Settings) -> Classification {
    if !is_qualifying_url(url) {
        return Classification::Unqualified;
    }

    let domain = extract_domain(url).unwrap_or_default();
    if is_excluded(&domain, &settings.excluded_sites) {
        return Classification::Excluded;
    }

    if let Some(rule) = settings.custom_rules.iter().find(|r| r.matches(&domain, url)) {
        return Classification::Group(GroupAssignment {
            name: rule.group_name.clone(),
            color: rule.color,
            source: RuleSource::CustomRule,
        });
    }

    if let Some(name) = smart_group_name(url, title) {
        return Classification::Group(GroupAssignment {
            name: name.to_string(),
            color: None,
            source: RuleSource::SmartGroup,
        });
    }

    Classification::Group(GroupAssignment {
        name: domain_display_name(&domain),
        color: None,
        source: RuleSource::Domain,
    })
}

/// First smart group whose keywords appear in "url title"
pub fn smart_group_name(url: &str, title: &str) -> Option<&'static str> {
    let text = format!("{} {}", url, title).to_lowercase();
    SMART_GROUPS
        .iter()
        .find(|(keywords, _)| keywords.iter().any(|kw| text.contains(kw)))
        .map(|(_, name)| *name)
}
