//! Bearer authorization cookies derived from a secret via an
//! incrementally-extendable SHA-256 midstate commitment.
//!
//! A [`MasterRune`](master_rune::MasterRune) holds a secret and mints
//! [`Rune`](rune::Rune)s. Anyone holding a rune can restrict it further
//! without consulting the issuer — restricting only narrows what the rune
//! authorizes, never widens it — and the issuer verifies authenticity in
//! constant time against the original secret.

pub mod alternative;
pub mod error;
pub mod master_rune;
pub mod restriction;
pub mod rune;
pub mod sha256;
pub mod value;

pub use alternative::{Alternative, Operator};
pub use error::{Error, Result};
pub use master_rune::MasterRune;
pub use restriction::Restriction;
pub use rune::Rune;
pub use value::{FieldValue, Value};
