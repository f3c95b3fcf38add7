//! Wire types shared by the table client and the catalogue backend.

pub mod domain;
pub mod error;
pub mod protocol;
pub mod query;
