//! Request admission: key lookup, validity and per-key rate limits

mod gate;

pub use gate::{Admission, AuthGate, Principal};
