//! Port traits: the boundary between the dispatch core's producers and
//! the hardware.
//!
//! Digital inputs and outputs go through `embedded-hal` directly; the
//! sensors that need more than a pin are described here.  Targets supply
//! real drivers, tests supply recording fakes.

use crate::error::Result;

/// Read-side port for the proximity sensor.
pub trait ProximitySensor {
    /// Power up and configure the sensor.
    fn enable(&mut self) -> Result<()>;

    /// Take one raw sample (larger is closer).
    fn read_sample(&mut self) -> Result<u16>;
}

impl<T: ProximitySensor + ?Sized> ProximitySensor for &mut T {
    fn enable(&mut self) -> Result<()> {
        (**self).enable()
    }

    fn read_sample(&mut self) -> Result<u16> {
        (**self).read_sample()
    }
}
