//! One browsing session: the open bucket, its fetched keys, navigation state
//! and the load bookkeeping that keeps late responses from clobbering it.
//!
//! Loading is split in two so that the fetch itself can run anywhere:
//! [`BrowserSession::open_bucket`] hands out a [`LoadTicket`], and whatever
//! performed the fetch passes the ticket back to
//! [`BrowserSession::complete_load`]. Only the ticket of the most recent load
//! is honoured; earlier ones are reported as [`LoadOutcome::Stale`].

use crate::browser::navigation::{IgnoredReason, Navigator, Transition};
use crate::browser::projector::project;
use crate::models::namespace::{Breadcrumb, Entry, KeySet};
use crate::services::key_lister::{KeyLister, ListError};
use tracing::{debug, info, warn};

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum LoadState {
    /// No bucket open.
    Idle,
    Loading,
    Ready,
    Failed { error: ListError },
}

/// Receipt for one bucket load.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LoadTicket {
    bucket: String,
    generation: u64,
}

impl LoadTicket {
    pub fn bucket(&self) -> &str {
        &self.bucket
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum LoadOutcome {
    Applied,
    Stale,
}

/// Coarse status for renderers.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ViewStatus {
    Idle,
    Loading,
    Ready,
    Error,
}

/// Everything a renderer needs, computed fresh from the session.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BrowserView {
    pub bucket: Option<String>,
    pub status: ViewStatus,
    pub error: Option<String>,
    pub current_prefix: String,
    pub entries: Vec<Entry>,
    pub breadcrumbs: Vec<Breadcrumb>,
    pub selected_leaf: Option<String>,
}

#[derive(Debug)]
pub struct BrowserSession {
    navigator: Option<Navigator>,
    keys: KeySet,
    load: LoadState,
    generation: u64,
}

impl Default for BrowserSession {
    fn default() -> Self {
        Self::new()
    }
}

impl BrowserSession {
    pub fn new() -> Self {
        Self {
            navigator: None,
            keys: KeySet::new(),
            load: LoadState::Idle,
            generation: 0,
        }
    }

    pub fn bucket(&self) -> Option<&str> {
        self.navigator.as_ref().map(Navigator::bucket)
    }

    pub fn load_state(&self) -> &LoadState {
        &self.load
    }

    pub fn keys(&self) -> &KeySet {
        &self.keys
    }

    pub fn navigator(&self) -> Option<&Navigator> {
        self.navigator.as_ref()
    }

    /// Start browsing `bucket` from its root. Any load still in flight,
    /// for this bucket or another, is superseded.
    pub fn open_bucket(&mut self, bucket: impl Into<String>) -> LoadTicket {
        let bucket = bucket.into();
        self.navigator = Some(Navigator::new(bucket.clone()));
        self.begin_load(bucket)
    }

    /// Fetch the open bucket again, keeping the user's place when the new
    /// listing arrives. `None` when no bucket is open.
    pub fn retry(&mut self) -> Option<LoadTicket> {
        let bucket = self.bucket()?.to_string();
        Some(self.begin_load(bucket))
    }

    fn begin_load(&mut self, bucket: String) -> LoadTicket {
        self.generation += 1;
        self.keys = KeySet::new();
        self.load = LoadState::Loading;
        info!(bucket = %bucket, generation = self.generation, "loading bucket listing");
        LoadTicket {
            bucket,
            generation: self.generation,
        }
    }

    /// Apply a finished fetch, unless a newer load or a close happened since
    /// `ticket` was issued.
    pub fn complete_load(
        &mut self,
        ticket: LoadTicket,
        result: Result<Vec<String>, ListError>,
    ) -> LoadOutcome {
        let current = ticket.generation == self.generation
            && self.bucket() == Some(ticket.bucket.as_str())
            && self.load == LoadState::Loading;
        if !current {
            debug!(
                bucket = %ticket.bucket,
                generation = ticket.generation,
                latest = self.generation,
                "discarding stale listing"
            );
            return LoadOutcome::Stale;
        }

        match result {
            Ok(keys) => {
                self.keys = keys.into_iter().collect();
                info!(bucket = %ticket.bucket, keys = self.keys.len(), "bucket listing loaded");
                self.load = LoadState::Ready;
                self.revalidate_selection();
            }
            Err(error) => {
                warn!(bucket = %ticket.bucket, %error, "bucket listing failed");
                self.keys = KeySet::new();
                self.load = LoadState::Failed { error };
                // Nothing is listed, so nothing can stay selected.
                if let Some(nav) = self.navigator.as_mut() {
                    nav.clear_selection();
                }
            }
        }
        LoadOutcome::Applied
    }

    /// Leave the browser. Any in-flight load becomes stale.
    pub fn close(&mut self) {
        self.generation += 1;
        self.navigator = None;
        self.keys = KeySet::new();
        self.load = LoadState::Idle;
    }

    /// A retry can deliver a listing in which the selected key no longer
    /// exists; drop the selection rather than point at a missing key.
    fn revalidate_selection(&mut self) {
        let Some(nav) = self.navigator.as_mut() else {
            return;
        };
        if nav
            .selected_leaf()
            .is_some_and(|leaf| !self.keys.contains(leaf))
        {
            debug!(bucket = %nav.bucket(), "selection vanished after reload");
            nav.clear_selection();
        }
    }

    pub fn drill_into(&mut self, folder_name: &str) -> Transition {
        self.with_navigator(|nav, keys| nav.drill_into(keys, folder_name))
    }

    pub fn select_leaf(&mut self, leaf_name: &str) -> Transition {
        self.with_navigator(|nav, keys| nav.select_leaf(keys, leaf_name))
    }

    /// Up one level, or [`Transition::ExitBrowser`] at the bucket root.
    /// Backing out works even while the listing is loading or failed.
    pub fn go_back(&mut self) -> Transition {
        match self.navigator.as_mut() {
            Some(nav) => nav.go_back(),
            None => Transition::ExitBrowser,
        }
    }

    pub fn jump_to_breadcrumb(&mut self, target_prefix: &str) -> Transition {
        match self.navigator.as_mut() {
            Some(nav) => nav.jump_to_breadcrumb(target_prefix),
            None => Transition::Ignored(IgnoredReason::NotABreadcrumb(target_prefix.to_string())),
        }
    }

    fn with_navigator(
        &mut self,
        apply: impl FnOnce(&mut Navigator, &KeySet) -> Transition,
    ) -> Transition {
        match (self.navigator.as_mut(), &self.load) {
            (Some(nav), LoadState::Ready) => apply(nav, &self.keys),
            _ => {
                warn!(state = ?self.load, "navigation requested without a loaded listing");
                Transition::Ignored(IgnoredReason::NotLoaded)
            }
        }
    }

    pub fn view(&self) -> BrowserView {
        let (status, error) = match &self.load {
            LoadState::Idle => (ViewStatus::Idle, None),
            LoadState::Loading => (ViewStatus::Loading, None),
            LoadState::Ready => (ViewStatus::Ready, None),
            LoadState::Failed { error } => (ViewStatus::Error, Some(error.to_string())),
        };

        match &self.navigator {
            Some(nav) => BrowserView {
                bucket: Some(nav.bucket().to_string()),
                status,
                error,
                current_prefix: nav.current_prefix().to_string(),
                entries: project(&self.keys, nav.current_prefix()),
                breadcrumbs: nav.breadcrumbs(),
                selected_leaf: nav.selected_leaf().map(str::to_string),
            },
            None => BrowserView {
                bucket: None,
                status,
                error,
                current_prefix: String::new(),
                entries: Vec::new(),
                breadcrumbs: Vec::new(),
                selected_leaf: None,
            },
        }
    }

    /// Open `bucket` and fetch it inline. Convenient when nothing else can
    /// happen while the fetch runs; event loops should spawn the fetch and
    /// call [`complete_load`](Self::complete_load) themselves.
    pub async fn load_bucket(&mut self, lister: &dyn KeyLister, bucket: &str) -> LoadOutcome {
        let ticket = self.open_bucket(bucket);
        let result = lister.list_keys(bucket).await;
        self.complete_load(ticket, result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;

    fn listing() -> Vec<String> {
        [
            "logs/2024/a.txt",
            "logs/2024/b.txt",
            "logs/readme.md",
            "photo.png",
        ]
        .into_iter()
        .map(String::from)
        .collect()
    }

    fn ready_session() -> BrowserSession {
        let mut session = BrowserSession::new();
        let ticket = session.open_bucket("media");
        assert_eq!(session.complete_load(ticket, Ok(listing())), LoadOutcome::Applied);
        session
    }

    fn entry_names(view: &BrowserView) -> Vec<&str> {
        view.entries.iter().map(|e| e.name.as_str()).collect()
    }

    #[test]
    fn new_session_is_idle() {
        let view = BrowserSession::new().view();
        assert_eq!(view.status, ViewStatus::Idle);
        assert_eq!(view.bucket, None);
        assert!(view.entries.is_empty());
    }

    #[test]
    fn loaded_session_shows_root_level() {
        let view = ready_session().view();
        assert_eq!(view.status, ViewStatus::Ready);
        assert_eq!(entry_names(&view), vec!["logs/", "photo.png"]);
        assert_eq!(view.breadcrumbs.len(), 1);
        assert_eq!(view.breadcrumbs[0].label, "media");
    }

    #[test]
    fn navigation_scenario() {
        let mut session = ready_session();
        assert_eq!(session.select_leaf("photo.png"), Transition::Moved);
        assert_eq!(session.view().selected_leaf.as_deref(), Some("photo.png"));

        assert_eq!(session.drill_into("logs/"), Transition::Moved);
        assert_eq!(session.view().selected_leaf, None);
        assert_eq!(session.drill_into("2024/"), Transition::Moved);
        assert_eq!(entry_names(&session.view()), vec!["a.txt", "b.txt"]);

        assert_eq!(session.go_back(), Transition::Moved);
        let view = session.view();
        assert_eq!(view.current_prefix, "logs/");
        assert_eq!(entry_names(&view), vec!["2024/", "readme.md"]);

        assert_eq!(session.jump_to_breadcrumb(""), Transition::Moved);
        assert_eq!(session.go_back(), Transition::ExitBrowser);
    }

    #[test]
    fn superseded_load_is_discarded() {
        let mut session = BrowserSession::new();
        let first = session.open_bucket("alpha");
        let second = session.open_bucket("beta");

        assert_eq!(
            session.complete_load(first, Ok(vec!["from-alpha.txt".into()])),
            LoadOutcome::Stale
        );
        assert_eq!(session.view().status, ViewStatus::Loading);

        assert_eq!(
            session.complete_load(second, Ok(vec!["from-beta.txt".into()])),
            LoadOutcome::Applied
        );
        let view = session.view();
        assert_eq!(view.bucket.as_deref(), Some("beta"));
        assert_eq!(entry_names(&view), vec!["from-beta.txt"]);
    }

    #[test]
    fn reopening_same_bucket_supersedes_first_request() {
        let mut session = BrowserSession::new();
        let first = session.open_bucket("media");
        let second = session.open_bucket("media");
        assert_eq!(session.complete_load(first, Ok(vec![])), LoadOutcome::Stale);
        assert_eq!(session.complete_load(second, Ok(listing())), LoadOutcome::Applied);
        assert_eq!(session.keys().len(), 4);
    }

    #[test]
    fn result_after_close_is_discarded() {
        let mut session = BrowserSession::new();
        let ticket = session.open_bucket("media");
        session.close();
        assert_eq!(session.complete_load(ticket, Ok(listing())), LoadOutcome::Stale);
        assert_eq!(session.view().status, ViewStatus::Idle);
    }

    #[test]
    fn duplicate_completion_is_discarded() {
        let mut session = BrowserSession::new();
        let ticket = session.open_bucket("media");
        assert_eq!(
            session.complete_load(ticket.clone(), Ok(listing())),
            LoadOutcome::Applied
        );
        assert_eq!(session.complete_load(ticket, Ok(vec![])), LoadOutcome::Stale);
        assert_eq!(session.keys().len(), 4);
    }

    #[test]
    fn failure_surfaces_error_with_no_entries() {
        let mut session = BrowserSession::new();
        let ticket = session.open_bucket("media");
        let error = ListError::Malformed("expected array, got object".into());
        assert_eq!(session.complete_load(ticket, Err(error.clone())), LoadOutcome::Applied);

        let view = session.view();
        assert_eq!(view.status, ViewStatus::Error);
        assert_eq!(view.error, Some(error.to_string()));
        assert!(view.entries.is_empty());
        assert_eq!(
            session.drill_into("logs/"),
            Transition::Ignored(IgnoredReason::NotLoaded)
        );
    }

    #[test]
    fn retry_recovers_and_keeps_position() {
        let mut session = ready_session();
        session.drill_into("logs/");
        session.select_leaf("readme.md");

        let ticket = session.retry().unwrap();
        assert_eq!(session.view().status, ViewStatus::Loading);
        let mut next = listing();
        next.retain(|k| k != "logs/readme.md");
        assert_eq!(session.complete_load(ticket, Ok(next)), LoadOutcome::Applied);

        let view = session.view();
        assert_eq!(view.current_prefix, "logs/");
        assert_eq!(view.selected_leaf, None);
        assert_eq!(entry_names(&view), vec!["2024/"]);
    }

    #[test]
    fn failed_retry_drops_selection_but_keeps_position() {
        let mut session = ready_session();
        assert_eq!(session.select_leaf("photo.png"), Transition::Moved);

        let ticket = session.retry().unwrap();
        let error = ListError::Transport("connection refused".into());
        assert_eq!(session.complete_load(ticket, Err(error)), LoadOutcome::Applied);

        let view = session.view();
        assert_eq!(view.status, ViewStatus::Error);
        assert!(view.entries.is_empty());
        assert_eq!(view.selected_leaf, None);
        assert_eq!(view.current_prefix, "");
        assert_eq!(view.bucket.as_deref(), Some("media"));
    }

    #[test]
    fn retry_without_bucket_does_nothing() {
        assert!(BrowserSession::new().retry().is_none());
    }

    #[test]
    fn empty_listing_is_ready_not_failed() {
        let mut session = BrowserSession::new();
        let ticket = session.open_bucket("empty");
        session.complete_load(ticket, Ok(Vec::new()));
        let view = session.view();
        assert_eq!(view.status, ViewStatus::Ready);
        assert!(view.entries.is_empty());
    }

    struct FixedLister;

    #[async_trait]
    impl KeyLister for FixedLister {
        async fn list_buckets(&self) -> Result<Vec<String>, ListError> {
            Ok(vec!["media".into()])
        }

        async fn list_keys(&self, _bucket: &str) -> Result<Vec<String>, ListError> {
            Ok(listing())
        }
    }

    #[tokio::test]
    async fn load_bucket_fetches_inline() {
        let mut session = BrowserSession::new();
        let outcome = session.load_bucket(&FixedLister, "media").await;
        assert_eq!(outcome, LoadOutcome::Applied);
        assert_eq!(entry_names(&session.view()), vec!["logs/", "photo.png"]);
    }
}
