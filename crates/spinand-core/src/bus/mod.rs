//! Bus traits and abstractions
//!
//! This module defines the transport interface the protocol layer drives.

mod traits;

pub use traits::*;
