//! Actor implementations

pub mod connection;

pub use connection::{ConnectionActor, ConnectionActorArgs};
