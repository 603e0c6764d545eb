//! SPI NAND protocol layer
//!
//! [`send_command`] maps one command descriptor onto one bus transaction.
//! The free functions re-exported from `spinand` build the descriptor for
//! each NAND operation and send it.

mod dispatch;
mod spinand;

pub use dispatch::send_command;
pub use spinand::*;
