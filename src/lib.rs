//! # broadcast
//!
//! `broadcast` is a minimal, in-memory notification hub. A topic is resolved
//! with a value at most meaningfully once per generation; listeners
//! subscribed before or after the resolution each receive the value exactly
//! once, repeating listeners receive every resolution, and pending listeners
//! can be cancelled before they fire. Listeners always run on a later turn,
//! never inside the call that triggered them.
//!
//! ## Core Modules
//!
//! - `hub`: the notification hub, its topic state and the deferred dispatcher.
//! - `config`: loads hub and logging settings from file and environment.
//! - `utils`: shared error type and logging initialisation.
//!
//! ## Example
//!
//! ```no_run
//! use broadcast::{Hub, Listener};
//!
//! #[tokio::main]
//! async fn main() {
//!     let hub: Hub<&'static str, i32> = Hub::new();
//!
//!     let ready = hub.wait_for("ready");
//!     hub.subscribe_once("ready", &Listener::new(|v: &[i32]| println!("got {v:?}")));
//!     hub.resolve("ready", 42);
//!
//!     assert_eq!(&*ready.await.unwrap(), &[42]);
//! }
//! ```

pub mod config;
pub mod hub;
pub mod utils;

pub use hub::{broadcast, DeliveryFailure, Hub, Listener, ListenerId, Payload, Pending, Resolver};
pub use utils::error::{HubError, Result};
