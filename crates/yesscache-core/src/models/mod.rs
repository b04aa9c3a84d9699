//! Plain data types shared across the offline cache manager.
//!
//! These are owned, host-independent renditions of the fetch primitives
//! (requests, responses), the background sync queue items, and the
//! notifications shown for push messages.

pub mod notification;
pub mod request;
pub mod response;
pub mod sync;

pub use notification::{Notification, NotificationAction};
pub use request::{Method, Request};
pub use response::Response;
pub use sync::{SyncItem, SyncTag};
