//! Wire types shared by the Purse server and its clients.
//!
//! Nothing in this crate touches the database. It carries the HTTP request and
//! response shapes, the payment gateway payloads, webhook signature helpers and
//! exact conversion between major and minor currency units.

#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![deny(clippy::panic)]
#![forbid(unsafe_code)]

pub mod amount;
pub mod objects;
pub mod signature;
