//! Integration test driver for `tests/integration/` submodule.
//!
//! Each `mod` below maps to a file that exercises a specific subsystem
//! against mock hardware.  All tests run on the host (x86_64) with a
//! real worker thread and no real hardware required.

mod pubsub_tests;
