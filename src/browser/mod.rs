//! The namespace browser: turns a flat key listing into a navigable folder
//! hierarchy and tracks where the user is inside it.
//!
//! - `projector` computes the entries visible under a prefix.
//! - `breadcrumbs` derives the trail back to the bucket root.
//! - `navigation` is the transition logic over `(prefix, selection)`.
//! - `session` ties a bucket's fetched keys to navigation and guards against
//!   late fetch results.

pub mod breadcrumbs;
pub mod navigation;
pub mod projector;
pub mod session;

pub use navigation::{IgnoredReason, NavigationState, Navigator, Transition};
pub use projector::project;
pub use session::{BrowserSession, BrowserView, LoadOutcome, LoadState, LoadTicket, ViewStatus};
