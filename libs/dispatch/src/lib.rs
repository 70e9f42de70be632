//! Pattern matching and behavior dispatch
//!
//! ## Purpose
//!
//! Routes messages to handlers. Patterns compile once into a wildcard
//! classification that picks the cheapest matcher for their shape;
//! behaviors hold an ordered case list, dispatch first-match-wins with
//! explicit `Skip` fall-through, and cache shape-compatibility bitmasks per
//! type token so repeated messages of one shape skip re-matching.
//!
//! ## Architecture Role
//!
//! ```text
//! ┌────────────────┐   Message + token   ┌────────────────┐
//! │    message     │────────────────────►│    dispatch    │
//! │  COW tuples    │                     │ case! patterns │
//! └────────────────┘                     │ Behavior cache │
//!                                        └───────┬────────┘
//!                                 HandlerOutcome │
//!                                                ▼
//!                                        ┌────────────────┐
//!                                        │ ResultVisitor  │
//!                                        │ (caller-owned) │
//!                                        └────────────────┘
//! ```
//!
//! The engine is passive: it never blocks, spawns, or measures time.
//! Timeouts are declared here but driven by the owning scheduler through
//! [`Behavior::handle_timeout`].

mod behavior;
mod cache;
mod pattern;
mod visitor;

pub use behavior::{ArgList, Behavior, Case, CaseHandler};
pub use pattern::{Pattern, PatternAtom, WildcardPosition};
pub use visitor::{
    CollectResponse, HandlerError, HandlerOutcome, IntoOutcome, ResultVisitor, VoidKind,
};

#[doc(hidden)]
pub mod __private {
    pub use types::registry::expect_type_id;
}
