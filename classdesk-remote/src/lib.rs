//! Remote record-set store client for Classdesk.
//!
//! The remote store is the durable, multi-device copy of every managed
//! record set, one row per `(owner, data key)` pair. This crate provides:
//!
//! - **`RemoteStore`**: the async row-level contract (upsert, fetch,
//!   delete-all, change listing) the sync layer is written against
//! - **`SupabaseStore`**: the hosted implementation, speaking PostgREST
//!   conventions over HTTP
//! - **`MemoryStore`**: an in-process implementation for tests and
//!   offline development
//! - **`ChangeFeed`**: a cursor-based polling task that turns change
//!   listing into a push-style subscription
//!
//! All failures surface as typed [`RemoteError`] values; nothing in this
//! crate panics on a backend or network fault.

mod error;
mod feed;
mod memory;
mod store;
mod supabase;

pub use error::{RemoteError, RemoteResult};
pub use feed::{ChangeFeed, ChangeSubscription};
pub use memory::MemoryStore;
pub use store::RemoteStore;
pub use supabase::{SupabaseConfig, SupabaseStore};
