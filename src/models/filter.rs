use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

use super::project::Project;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum SentStatus {
    #[default]
    Any,
    Sent,
    NotSent,
}

impl SentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            SentStatus::Any => "any",
            SentStatus::Sent => "sent",
            SentStatus::NotSent => "not_sent",
        }
    }

    pub fn from_str(s: &str) -> Self {
        match s {
            "sent" => SentStatus::Sent,
            "not_sent" => SentStatus::NotSent,
            _ => SentStatus::Any,
        }
    }

    pub fn matches(&self, is_sent: bool) -> bool {
        match self {
            SentStatus::Any => true,
            SentStatus::Sent => is_sent,
            SentStatus::NotSent => !is_sent,
        }
    }
}

/// Active/inactive split of the collection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Partition {
    Active,
    Inactive,
}

impl Partition {
    pub fn is_active(&self) -> bool {
        matches!(self, Partition::Active)
    }
}

/// Filter selection. An empty set places no restriction on its dimension;
/// a non-empty set matches projects carrying any of its members.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct FilterCriteria {
    #[serde(default)]
    pub grades: BTreeSet<String>,
    #[serde(default)]
    pub sent_status: SentStatus,
    #[serde(default)]
    pub styles: BTreeSet<String>,
    #[serde(default)]
    pub holds: BTreeSet<String>,
}

impl FilterCriteria {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_grades<I, S>(mut self, grades: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.grades = grades.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_sent_status(mut self, sent_status: SentStatus) -> Self {
        self.sent_status = sent_status;
        self
    }

    pub fn with_styles<I, S>(mut self, styles: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.styles = styles.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_holds<I, S>(mut self, holds: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.holds = holds.into_iter().map(Into::into).collect();
        self
    }

    /// True when the criteria select everything
    pub fn is_unrestricted(&self) -> bool {
        self.grades.is_empty()
            && self.sent_status == SentStatus::Any
            && self.styles.is_empty()
            && self.holds.is_empty()
    }

    pub fn matches(&self, project: &Project) -> bool {
        (self.grades.is_empty() || self.grades.contains(&project.grade))
            && self.sent_status.matches(project.is_sent)
            && (self.styles.is_empty() || self.styles.iter().any(|s| project.has_style(s)))
            && (self.holds.is_empty() || self.holds.iter().any(|h| project.has_hold(h)))
    }
}
