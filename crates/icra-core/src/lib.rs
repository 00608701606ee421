//! ICRA Core
//!
//! In-process broadcast hub for the browsing stream.
//!
//! This crate provides:
//! - The [`Visit`] data model shared by the broker bridge and subscribers
//! - [`RecentHistory`], the bounded replay cache for late joiners
//! - The [`Hub`] task that owns subscribers and fans visits out to them
//! - Subscriber [`Session`]s and the relay that drains them to a transport

pub mod error;
pub mod history;
pub mod hub;
pub mod session;
pub mod visit;

pub use error::{Error, Result};
pub use history::RecentHistory;
pub use hub::{Hub, HubConfig, HubHandle, HubStats};
pub use session::{relay, RelayExit, Session, SessionId, VisitSink};
pub use visit::{Resource, Visit};

