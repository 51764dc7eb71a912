#[macro_use]
mod macros;

#[cfg(feature = "bincode")]
pub mod binary;
pub mod event;
pub mod filter;
pub mod id;
pub mod verify;

pub use event::{Event, EventKind, Tag, Tags, Timestamp};
pub use filter::Filter;
pub use id::{EventId, IdHash, IdentHash, PubHash, PubKey, Serial, Signature};
pub use verify::{Verifier, VerifiedEvent};
