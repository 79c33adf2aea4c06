//! Sense firmware library.
//!
//! The event dispatch core: a single-consumer bounded [`worker`] that
//! serializes all deferred work, and a generic [`pubsub`] layer built on
//! it.  Around it sit the producers (sampling loop, buttons) and
//! consumers (status indicator, metrics) of the board firmware.  All
//! hardware access goes through `embedded-hal` pins or the [`ports`]
//! traits, so everything here runs on the host for testing.

#![deny(unused_must_use)]

pub mod config;
pub mod drivers;
pub mod error;
pub mod events;
pub mod indicator;
pub mod metrics;
pub mod notification;
pub mod ports;
pub mod pubsub;
pub mod sampling;
pub mod system;
pub mod worker;
