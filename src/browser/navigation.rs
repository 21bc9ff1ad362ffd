//! Navigation state machine over one bucket's virtual folder tree.
//!
//! Every transition is a synchronous update of `(current_prefix,
//! selected_leaf)` checked against the already-fetched key listing. A
//! transition whose precondition does not hold leaves the state untouched and
//! reports [`Transition::Ignored`]; that only happens when the caller's view
//! of the listing has drifted, so it is logged rather than raised.

use crate::browser::{breadcrumbs::breadcrumbs, projector};
use crate::models::namespace::{Breadcrumb, KeySet, ObjectKey, Prefix};
use tracing::{debug, warn};

/// Where the user is and what they have highlighted.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct NavigationState {
    pub current_prefix: Prefix,
    /// Full key of the highlighted leaf at the current level.
    pub selected_leaf: Option<ObjectKey>,
}

/// Result of applying a transition.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Transition {
    Moved,
    Ignored(IgnoredReason),
    /// `go_back` at the root: the caller should leave the browser.
    ExitBrowser,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum IgnoredReason {
    NotAFolder(String),
    NotALeaf(String),
    NotABreadcrumb(String),
    /// The bucket listing has not arrived (or failed).
    NotLoaded,
}

/// Navigation state bound to a bucket name (used for the root crumb).
#[derive(Clone, Debug)]
pub struct Navigator {
    bucket: String,
    state: NavigationState,
}

impl Navigator {
    pub fn new(bucket: impl Into<String>) -> Self {
        Self {
            bucket: bucket.into(),
            state: NavigationState::default(),
        }
    }

    pub fn bucket(&self) -> &str {
        &self.bucket
    }

    pub fn state(&self) -> &NavigationState {
        &self.state
    }

    pub fn current_prefix(&self) -> &Prefix {
        &self.state.current_prefix
    }

    pub fn selected_leaf(&self) -> Option<&str> {
        self.state.selected_leaf.as_deref()
    }

    pub fn breadcrumbs(&self) -> Vec<Breadcrumb> {
        breadcrumbs(&self.bucket, &self.state.current_prefix)
    }

    pub fn clear_selection(&mut self) {
        self.state.selected_leaf = None;
    }

    /// Back to the bucket root with nothing selected.
    pub fn reset(&mut self) {
        self.state = NavigationState::default();
    }

    pub fn drill_into(&mut self, keys: &KeySet, folder_name: &str) -> Transition {
        let current = &self.state.current_prefix;
        let next = match current.child(folder_name) {
            Some(next) if projector::has_folder(keys, current, folder_name) => next,
            _ => {
                return self.ignore(IgnoredReason::NotAFolder(folder_name.to_string()));
            }
        };
        debug!(bucket = %self.bucket, prefix = %next, "drill into folder");
        self.state = NavigationState {
            current_prefix: next,
            selected_leaf: None,
        };
        Transition::Moved
    }

    pub fn select_leaf(&mut self, keys: &KeySet, leaf_name: &str) -> Transition {
        let current = &self.state.current_prefix;
        if !projector::has_leaf(keys, current, leaf_name) {
            return self.ignore(IgnoredReason::NotALeaf(leaf_name.to_string()));
        }
        self.state.selected_leaf = Some(format!("{}{}", current, leaf_name));
        Transition::Moved
    }

    pub fn go_back(&mut self) -> Transition {
        match self.state.current_prefix.parent() {
            Some(parent) => {
                debug!(bucket = %self.bucket, prefix = %parent, "go back");
                self.state = NavigationState {
                    current_prefix: parent,
                    selected_leaf: None,
                };
                Transition::Moved
            }
            None => Transition::ExitBrowser,
        }
    }

    pub fn jump_to_breadcrumb(&mut self, target_prefix: &str) -> Transition {
        let on_trail = self
            .breadcrumbs()
            .iter()
            .any(|crumb| crumb.target_prefix == target_prefix);
        let target = match Prefix::parse(target_prefix) {
            Some(target) if on_trail => target,
            _ => {
                return self.ignore(IgnoredReason::NotABreadcrumb(target_prefix.to_string()));
            }
        };
        self.state = NavigationState {
            current_prefix: target,
            selected_leaf: None,
        };
        Transition::Moved
    }

    fn ignore(&self, reason: IgnoredReason) -> Transition {
        warn!(
            bucket = %self.bucket,
            prefix = %self.state.current_prefix,
            ?reason,
            "ignoring navigation request"
        );
        Transition::Ignored(reason)
    }
}
