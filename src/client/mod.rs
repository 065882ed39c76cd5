//! Client-side status reconciliation: the payment page and order lists combine
//! the realtime push channel with polling so that a missed event never leaves
//! a view stale.

pub mod api;
pub mod reconcile;
pub mod watcher;

pub use api::{ClientError, StorefrontClient};
pub use reconcile::{Outcome, Reconciler};
pub use watcher::{refresh_list, watch_payment, ChannelHealth, StatusSource};
