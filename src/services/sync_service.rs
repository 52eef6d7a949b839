//! Sync service
//!
//! Wires a gateway to a [`ProjectStore`]. There is no incremental patching:
//! every successful mutation invalidates the entire cached collection and is
//! followed by a full re-fetch. Each re-fetch carries a [`FetchToken`], so a
//! response that lands after a newer one is discarded.

use std::sync::Arc;
use tracing::{debug, info};

use super::coordinator::{self, AnnotationPoint, Asset};
use super::project_store::ProjectStore;
use super::queries;
use super::summaries;
use crate::adapters::{CommandGateway, GatewayError, HttpGateway};
use crate::config::SyncConfig;
use crate::error::{FetchOutcome, SyncError};
use crate::models::{Coordinate, FilterCriteria, Partition, Project, Session};

pub use super::project_store::FetchToken;

pub struct SyncService {
    gateway: Arc<dyn CommandGateway>,
    store: Arc<ProjectStore>,
}

impl SyncService {
    pub fn new(gateway: Arc<dyn CommandGateway>) -> Self {
        Self::with_store(gateway, Arc::new(ProjectStore::new()))
    }

    pub fn with_store(gateway: Arc<dyn CommandGateway>, store: Arc<ProjectStore>) -> Self {
        Self { gateway, store }
    }

    /// Service talking to the remote backend described by `config`
    pub fn connect(config: &SyncConfig, session: &Session) -> Result<Self, GatewayError> {
        let gateway = HttpGateway::new(config)?.with_token(session.token.clone());
        Ok(Self::new(Arc::new(gateway)))
    }

    pub fn store(&self) -> &Arc<ProjectStore> {
        &self.store
    }

    pub fn gateway(&self) -> &Arc<dyn CommandGateway> {
        &self.gateway
    }

    /// Re-fetch the whole collection into the store. A failed fetch leaves
    /// the store as it was.
    pub async fn refresh(&self, session: &Session) -> FetchOutcome<Vec<Project>> {
        let token = self.store.begin_fetch();
        let outcome = queries::fetch_all(self.gateway.as_ref(), session).await;
        self.apply(token, &outcome);
        outcome
    }

    fn apply(&self, token: FetchToken, outcome: &FetchOutcome<Vec<Project>>) {
        let projects = match outcome {
            FetchOutcome::Data(projects) => projects.clone(),
            FetchOutcome::Empty => Vec::new(),
            FetchOutcome::Failed(_) => return,
        };
        let count = projects.len();
        if self.store.replace_projects(token, projects) {
            debug!("Store now holds {} projects (fetch {})", count, token.value());
        } else {
            debug!("Discarded superseded fetch {}", token.value());
        }
    }

    pub async fn fetch_active(&self, session: &Session) -> FetchOutcome<Vec<Project>> {
        queries::fetch_active(self.gateway.as_ref(), session).await
    }

    pub async fn fetch_inactive(&self, session: &Session) -> FetchOutcome<Vec<Project>> {
        queries::fetch_inactive(self.gateway.as_ref(), session).await
    }

    pub async fn fetch_filtered(
        &self,
        session: &Session,
        partition: Partition,
        criteria: &FilterCriteria,
    ) -> FetchOutcome<Vec<Project>> {
        queries::fetch_filtered(self.gateway.as_ref(), session, partition, criteria).await
    }

    pub async fn fetch_by_id(&self, id: &str) -> FetchOutcome<Project> {
        queries::fetch_by_id(self.gateway.as_ref(), id).await
    }

    pub async fn create(
        &self,
        session: &Session,
        project: Project,
        asset: Option<&Asset>,
    ) -> Result<Option<String>, SyncError> {
        let id = coordinator::create_project(self.gateway.as_ref(), session, project, asset).await?;
        self.refresh(session).await;
        Ok(id)
    }

    pub async fn edit(&self, session: &Session, project: Project, asset: Option<&Asset>) -> Result<(), SyncError> {
        coordinator::edit_project(self.gateway.as_ref(), session, project, asset).await?;
        self.refresh(session).await;
        Ok(())
    }

    pub async fn delete(&self, session: &Session, id: &str) -> Result<(), SyncError> {
        coordinator::delete_project(self.gateway.as_ref(), id).await?;
        self.store.evict(id);
        self.refresh(session).await;
        Ok(())
    }

    pub async fn update_annotations(
        &self,
        session: &Session,
        project_id: &str,
        points: &[AnnotationPoint],
    ) -> Result<Vec<Coordinate>, SyncError> {
        let saved = coordinator::update_annotations(self.gateway.as_ref(), project_id, points).await?;
        self.refresh(session).await;
        Ok(saved)
    }

    /// Summaries derived from the collection currently in the store
    pub fn recompute_summaries(&self) {
        summaries::recompute_from_store(&self.store);
    }

    /// Summaries as computed by the backend
    pub async fn refresh_summaries(&self, session: &Session) -> Result<(), SyncError> {
        summaries::refresh_from_server(self.gateway.as_ref(), session, &self.store).await
    }

    /// Drop everything cached for the previous account
    pub fn switch_account(&self) {
        info!("Clearing cached projects and summaries");
        self.store.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::Command;
    use crate::storage::LocalBackend;
    use async_trait::async_trait;
    use serde_json::{json, Value};
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::Mutex;

    fn local_service() -> SyncService {
        SyncService::new(Arc::new(LocalBackend::open_in_memory().unwrap()))
    }

    fn session() -> Session {
        Session::new("climber-1")
    }

    #[tokio::test]
    async fn test_create_fetch_delete_scenario() {
        let service = local_service();
        let session = session();

        let project = Project::new("V4").with_attempts(3);
        service.create(&session, project, None).await.unwrap();

        let all = service.refresh(&session).await.into_items();
        assert_eq!(all.len(), 1);
        let stored = &all[0];
        assert_eq!(stored.attempts, 3);
        assert_eq!(stored.grade, "V4");
        assert!(!stored.is_sent);
        let id = stored.id().unwrap().to_string();
        assert_eq!(service.store().projects(), all);

        service.delete(&session, &id).await.unwrap();
        assert!(service.refresh(&session).await.is_empty());
        assert!(service.store().projects().is_empty());
    }

    #[tokio::test]
    async fn test_mutations_refresh_the_store() {
        let service = local_service();
        let session = session();

        service
            .create(&session, Project::new("V2").with_style(vec!["slab".into()]), None)
            .await
            .unwrap();
        assert_eq!(service.store().projects().len(), 1);

        let stored = service.store().projects().remove(0);
        let id = stored.id().unwrap().to_string();
        let points = vec![AnnotationPoint::new(0.4, 0.6).with_note(vec!["start".into()])];
        service.update_annotations(&session, &id, &points).await.unwrap();
        assert_eq!(
            service.store().annotations_for(&id),
            vec![Coordinate::new(0.4, 0.6).with_note(vec!["start".into()])]
        );

        let edited = service.store().projects().remove(0).with_attempts(5).with_coordinates(Vec::new());
        service.edit(&session, edited, None).await.unwrap();
        let after = service.store().projects().remove(0);
        assert_eq!(after.attempts, 5);
        assert_eq!(after.coordinates.len(), 1);
    }

    #[tokio::test]
    async fn test_summary_scenario() {
        let service = local_service();
        let session = session();
        for project in [
            Project::new("V2").sent(chrono::Utc::now()),
            Project::new("V2").sent(chrono::Utc::now()),
            Project::new("V4").sent(chrono::Utc::now()),
        ] {
            service.create(&session, project, None).await.unwrap();
        }

        service.recompute_summaries();
        let local = service.store().sends();
        assert_eq!(local.total, 3);
        assert_eq!(local.count_for("V2"), 2);
        assert_eq!(local.count_for("V4"), 1);

        service.refresh_summaries(&session).await.unwrap();
        assert_eq!(service.store().sends(), local);
    }

    #[tokio::test]
    async fn test_filter_identity() {
        let service = local_service();
        let session = session();
        service.create(&session, Project::new("V1"), None).await.unwrap();
        service
            .create(&session, Project::new("V3").with_active(false), None)
            .await
            .unwrap();

        for partition in [Partition::Active, Partition::Inactive] {
            let unfiltered = match partition {
                Partition::Active => service.fetch_active(&session).await,
                Partition::Inactive => service.fetch_inactive(&session).await,
            };
            let filtered = service
                .fetch_filtered(&session, partition, &FilterCriteria::default())
                .await;
            assert_eq!(filtered.into_items(), unfiltered.into_items());
        }
    }

    /// Fails every command while `down` is set
    struct Flaky {
        inner: LocalBackend,
        down: AtomicBool,
        calls: Mutex<Vec<Command>>,
    }

    #[async_trait]
    impl CommandGateway for Flaky {
        async fn invoke(&self, command: Command, args: Value) -> Result<Value, GatewayError> {
            self.calls.lock().unwrap().push(command);
            if self.down.load(Ordering::SeqCst) {
                return Err(GatewayError::Transport("network unreachable".into()));
            }
            self.inner.invoke(command, args).await
        }
    }

    #[tokio::test]
    async fn test_failed_refresh_keeps_previous_state() {
        let flaky = Arc::new(Flaky {
            inner: LocalBackend::open_in_memory().unwrap(),
            down: AtomicBool::new(false),
            calls: Mutex::new(Vec::new()),
        });
        let service = SyncService::new(flaky.clone());
        let session = session();
        service.create(&session, Project::new("V7"), None).await.unwrap();

        flaky.down.store(true, Ordering::SeqCst);
        let outcome = service.refresh(&session).await;
        assert!(outcome.is_failed());
        assert_eq!(service.store().projects().len(), 1);

        let result = service.create(&session, Project::new("V8"), Some(&Asset::new("a.png", vec![1]))).await;
        assert!(result.is_err());
        let calls = flaky.calls.lock().unwrap();
        assert_eq!(calls.last(), Some(&Command::UploadImage));
        assert!(!calls[2..].contains(&Command::InsertProject));
    }

    #[tokio::test]
    async fn test_superseded_fetch_is_discarded() {
        let service = local_service();
        let older = service.store().begin_fetch();
        let newer = service.store().begin_fetch();

        service.apply(newer, &FetchOutcome::Data(vec![Project::new("V3")]));
        service.apply(older, &FetchOutcome::Empty);
        assert_eq!(service.store().projects().len(), 1);
    }

    #[tokio::test]
    async fn test_missing_account_leaves_store_untouched() {
        let service = local_service();
        let token = service.store().begin_fetch();
        service.store().replace_projects(token, vec![Project::new("V1")]);

        let outcome = service.refresh(&Session::anonymous()).await;
        assert!(matches!(outcome.error(), Some(SyncError::MissingAccount)));
        assert_eq!(service.store().projects().len(), 1);
    }

    #[test]
    fn test_connect_uses_config() {
        let service = SyncService::connect(&SyncConfig::default(), &session().with_token("t0ken"));
        assert!(service.is_ok());
    }

    #[tokio::test]
    async fn test_switch_account_clears_store() {
        let service = local_service();
        service.create(&session(), Project::new("V2").sent(chrono::Utc::now()), None).await.unwrap();
        service.recompute_summaries();
        assert_eq!(service.store().sends().total, 1);

        service.switch_account();
        assert!(service.store().projects().is_empty());
        assert_eq!(service.store().sends().total, 0);

        let json = json!({ "accountId": "other" });
        let other = service.gateway().invoke(Command::GetAllProjects, json).await.unwrap();
        assert_eq!(other, json!([]));
    }
}
