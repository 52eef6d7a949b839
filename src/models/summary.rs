use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};

use super::grade::v_scale_index;
use super::project::Project;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GradeCount {
    pub grade: String,
    pub count: u64,
}

/// Number of sends, overall and per grade
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct SendsSummary {
    pub total: u64,
    pub by_grade: Vec<GradeCount>,
}

impl SendsSummary {
    /// Count sent projects per grade. Grades come out in V-scale order, with
    /// grades outside the scale after them in name order.
    pub fn from_projects(projects: &[Project]) -> Self {
        let mut counts: HashMap<&str, u64> = HashMap::new();
        for project in projects.iter().filter(|p| p.is_sent) {
            *counts.entry(project.grade.as_str()).or_insert(0) += 1;
        }

        Self::from_counts(
            counts
                .into_iter()
                .map(|(grade, count)| GradeCount {
                    grade: grade.to_string(),
                    count,
                })
                .collect(),
        )
    }

    /// Build from per-grade counts in any order; zero counts are dropped
    pub fn from_counts(mut by_grade: Vec<GradeCount>) -> Self {
        by_grade.retain(|g| g.count > 0);
        by_grade.sort_by(|a, b| grade_order(&a.grade).cmp(&grade_order(&b.grade)));
        Self {
            total: by_grade.iter().map(|g| g.count).sum(),
            by_grade,
        }
    }

    pub fn count_for(&self, grade: &str) -> u64 {
        self.by_grade
            .iter()
            .find(|g| g.grade == grade)
            .map(|g| g.count)
            .unwrap_or(0)
    }

    pub fn as_map(&self) -> BTreeMap<String, u64> {
        self.by_grade
            .iter()
            .map(|g| (g.grade.clone(), g.count))
            .collect()
    }
}

fn grade_order(grade: &str) -> (usize, &str) {
    (v_scale_index(grade).unwrap_or(usize::MAX), grade)
}

/// Done/practicing split for one style or hold tag
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TagSummary {
    pub tag: String,
    pub done: u64,
    pub practicing: u64,
}

impl TagSummary {
    pub fn total(&self) -> u64 {
        self.done + self.practicing
    }
}

/// Which tag list a [`TagSummary`] is computed over
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TagKind {
    Style,
    Hold,
}

impl TagKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            TagKind::Style => "style",
            TagKind::Hold => "hold",
        }
    }

    pub fn tags<'p>(&self, project: &'p Project) -> &'p [String] {
        match self {
            TagKind::Style => &project.style,
            TagKind::Hold => &project.holds,
        }
    }
}

/// Per-tag counts in order of first appearance
pub fn tag_summaries(projects: &[Project], kind: TagKind) -> Vec<TagSummary> {
    let mut summaries: Vec<TagSummary> = Vec::new();
    for project in projects {
        for tag in kind.tags(project) {
            let index = match summaries.iter().position(|s| &s.tag == tag) {
                Some(index) => index,
                None => {
                    summaries.push(TagSummary {
                        tag: tag.clone(),
                        done: 0,
                        practicing: 0,
                    });
                    summaries.len() - 1
                }
            };
            if project.is_sent {
                summaries[index].done += 1;
            } else {
                summaries[index].practicing += 1;
            }
        }
    }
    summaries
}
