//! Verdict feed infrastructure.
//!
//! - [`VerdictSource`]: where a run's verdicts are appended and read back.
//! - [`VerdictFeed`]: the in-process source, a partitioned, ordered,
//!   append-only feed of
//!   [`VerdictRecord`](smoke_core::verdict::VerdictRecord)s keyed by run id.
//! - [`Subscription`]: explicit handle onto one partition; consuming or
//!   dropping it unsubscribes.

pub mod feed;
pub mod source;
pub mod subscription;

pub use feed::VerdictFeed;
pub use source::{FeedError, VerdictSource};
pub use subscription::Subscription;
