//! Reactive collection store
//!
//! Holds the known project collection, the annotation overlays keyed by
//! project id, and the three summary aggregates. The store makes no gateway
//! calls. Every field changes by full replacement only.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};

use crate::models::{Coordinate, Project, SendsSummary, TagSummary};
use crate::utils::{Observable, Subscription};

/// Generation of a fetch. Tokens are handed out in increasing order and a
/// replacement carrying a token older than the last applied one is dropped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct FetchToken(u64);

impl FetchToken {
    pub fn value(&self) -> u64 {
        self.0
    }
}

pub type AnnotationMap = HashMap<String, Vec<Coordinate>>;

pub struct ProjectStore {
    projects: Observable<Vec<Project>>,
    annotations: Observable<AnnotationMap>,
    sends: Observable<SendsSummary>,
    styles: Observable<Vec<TagSummary>>,
    holds: Observable<Vec<TagSummary>>,
    next_token: AtomicU64,
}

impl Default for ProjectStore {
    fn default() -> Self {
        Self::new()
    }
}

impl ProjectStore {
    pub fn new() -> Self {
        Self {
            projects: Observable::default(),
            annotations: Observable::default(),
            sends: Observable::default(),
            styles: Observable::default(),
            holds: Observable::default(),
            next_token: AtomicU64::new(0),
        }
    }

    /// Take the token for a fetch that is about to start
    pub fn begin_fetch(&self) -> FetchToken {
        FetchToken(self.next_token.fetch_add(1, Ordering::SeqCst) + 1)
    }

    /// Replace the whole collection and rebuild the annotation map from it.
    /// Returns false when a newer replacement already landed.
    pub fn replace_projects(&self, token: FetchToken, projects: Vec<Project>) -> bool {
        let annotations = annotation_map(&projects);
        if !self.projects.replace(token.0, projects) {
            return false;
        }
        self.annotations.replace(token.0, annotations);
        true
    }

    /// Drop one project locally ahead of the next fetch
    pub fn evict(&self, id: &str) -> bool {
        let token = self.begin_fetch();
        let remaining: Vec<Project> = self
            .projects
            .snapshot()
            .into_iter()
            .filter(|p| p.id() != Some(id))
            .collect();
        self.replace_projects(token, remaining)
    }

    pub fn replace_sends(&self, token: FetchToken, summary: SendsSummary) -> bool {
        self.sends.replace(token.0, summary)
    }

    pub fn replace_styles(&self, token: FetchToken, summaries: Vec<TagSummary>) -> bool {
        self.styles.replace(token.0, summaries)
    }

    pub fn replace_holds(&self, token: FetchToken, summaries: Vec<TagSummary>) -> bool {
        self.holds.replace(token.0, summaries)
    }

    /// Forget everything, e.g. when the signed-in account changes
    pub fn clear(&self) {
        let token = self.begin_fetch();
        self.replace_projects(token, Vec::new());
        self.replace_sends(token, SendsSummary::default());
        self.replace_styles(token, Vec::new());
        self.replace_holds(token, Vec::new());
    }

    pub fn subscribe_projects<F>(&self, callback: F) -> Subscription
    where
        F: Fn(&Vec<Project>) + Send + Sync + 'static,
    {
        self.projects.subscribe(callback)
    }

    pub fn subscribe_annotations<F>(&self, callback: F) -> Subscription
    where
        F: Fn(&AnnotationMap) + Send + Sync + 'static,
    {
        self.annotations.subscribe(callback)
    }

    pub fn subscribe_sends<F>(&self, callback: F) -> Subscription
    where
        F: Fn(&SendsSummary) + Send + Sync + 'static,
    {
        self.sends.subscribe(callback)
    }

    pub fn subscribe_styles<F>(&self, callback: F) -> Subscription
    where
        F: Fn(&Vec<TagSummary>) + Send + Sync + 'static,
    {
        self.styles.subscribe(callback)
    }

    pub fn subscribe_holds<F>(&self, callback: F) -> Subscription
    where
        F: Fn(&Vec<TagSummary>) + Send + Sync + 'static,
    {
        self.holds.subscribe(callback)
    }

    pub fn projects(&self) -> Vec<Project> {
        self.projects.snapshot()
    }

    pub fn annotations(&self) -> AnnotationMap {
        self.annotations.snapshot()
    }

    pub fn annotations_for(&self, id: &str) -> Vec<Coordinate> {
        self.annotations.snapshot().remove(id).unwrap_or_default()
    }

    pub fn sends(&self) -> SendsSummary {
        self.sends.snapshot()
    }

    pub fn styles(&self) -> Vec<TagSummary> {
        self.styles.snapshot()
    }

    pub fn holds(&self) -> Vec<TagSummary> {
        self.holds.snapshot()
    }
}

fn annotation_map(projects: &[Project]) -> AnnotationMap {
    projects
        .iter()
        .filter_map(|p| p.id().map(|id| (id.to_string(), p.coordinates.clone())))
        .collect()
}
