//! Input drivers that publish onto the system pubsub.

pub mod button;
