//! Locking primitives shared between the run loop and producer threads.
//!
//! `parking_lot` locks never poison, so a producer thread that panics while
//! holding the inbound queue cannot leave the run loop stuck on an error it
//! has no way to recover from.

pub use parking_lot::{Condvar, Mutex};
pub use std::sync::Arc;
