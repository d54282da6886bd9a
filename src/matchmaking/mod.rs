//! Who plays and who waits

pub mod connection;
pub mod roster;

pub use connection::{Outbound, OutboundRx, OutboundTx, PlayerConnection, ProbeStatus};
pub use roster::{Roster, Slot};
