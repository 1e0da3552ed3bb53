//! ActivityStreams 2.0 object model
//!
//! Typed representations of Actors, Activities, and generic objects with
//! JSON-LD serialization:
//! - `object`: the generic object envelope and Tombstone
//! - `actor`: federated identities (local and mirrored remote)
//! - `activity`: the activity envelope and emitted activity types
//! - `event`: the Event extended object with validated enumerations
//! - `context`: JSON-LD `@context` blocks

pub mod context;

mod activity;
mod actor;
mod event;
mod object;

pub use activity::{Activity, ActivityType, audience_for_visibility};
pub use actor::{Actor, ActorEndpoints, ActorPublicKey};
pub use event::{Event, EventStatus, JoinMode, RepliesModerationOption};
pub use object::{BaseObject, Tombstone};
