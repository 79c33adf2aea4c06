//! Debounced button driver and the four-button manager.
//!
//! ## Hardware
//!
//! Active-low momentary switches with pull-ups on plain GPIO inputs.
//! `poll()` is called at a steady rate (button thread or timer task);
//! each call samples the pin and runs the debounce state machine.
//!
//! ## Debounce
//!
//! | State    | Input                         | Next                         |
//! |----------|-------------------------------|------------------------------|
//! | Stable   | level differs from stable     | Settling (since = now)       |
//! | Settling | level flips back to stable    | Stable, no edge              |
//! | Settling | level held for `debounce_ms`  | Stable, edge reported        |

use embedded_hal::digital::InputPin;
use log::debug;

use crate::events::{ButtonId, Event};
use crate::pubsub::PubSub;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum DebounceState {
    Stable,
    Settling { pressed: bool, since_ms: u32 },
}

pub struct Button<P> {
    pin: P,
    pressed: bool,
    state: DebounceState,
}

impl<P: InputPin> Button<P> {
    pub fn new(pin: P) -> Self {
        Self {
            pin,
            pressed: false,
            state: DebounceState::Stable,
        }
    }

    /// Debounced level.
    pub fn is_pressed(&self) -> bool {
        self.pressed
    }

    /// Sample the pin.  Returns `Some(pressed)` when a debounced edge
    /// completes on this call.
    pub fn poll(&mut self, now_ms: u32, debounce_ms: u32) -> Option<bool> {
        // A failed read is treated as "no change".
        let raw = self.pin.is_low().ok()?;

        match self.state {
            DebounceState::Stable => {
                if raw != self.pressed {
                    self.state = DebounceState::Settling {
                        pressed: raw,
                        since_ms: now_ms,
                    };
                }
                None
            }

            DebounceState::Settling { pressed, since_ms } => {
                if raw != pressed {
                    self.state = DebounceState::Stable;
                    return None;
                }

                if now_ms.wrapping_sub(since_ms) >= debounce_ms {
                    self.pressed = pressed;
                    self.state = DebounceState::Stable;
                    return Some(pressed);
                }

                None
            }
        }
    }
}

/// The board's A/B/X/Y buttons, publishing [`Event::Button`] edges.
pub struct ButtonManager<P> {
    buttons: [Button<P>; 4],
    debounce_ms: u32,
    dropped: u32,
}

impl<P: InputPin> ButtonManager<P> {
    pub fn new(a: P, b: P, x: P, y: P, debounce_ms: u32) -> Self {
        Self {
            buttons: [a, b, x, y].map(Button::new),
            debounce_ms,
            dropped: 0,
        }
    }

    pub fn is_pressed(&self, id: ButtonId) -> bool {
        self.buttons[id as usize].is_pressed()
    }

    /// Edges that could not be published because the event queue was full.
    pub fn dropped(&self) -> u32 {
        self.dropped
    }

    /// Poll every button and publish the edges found.  Returns the
    /// number of events published.
    pub fn poll<'a, const C: usize, const N: usize>(
        &mut self,
        now_ms: u32,
        pubsub: &'a PubSub<'a, Event, C, N>,
    ) -> usize {
        let mut published = 0;
        for (id, button) in ButtonId::ALL.into_iter().zip(self.buttons.iter_mut()) {
            let Some(pressed) = button.poll(now_ms, self.debounce_ms) else {
                continue;
            };
            let event = if pressed {
                Event::pressed(id)
            } else {
                Event::released(id)
            };
            if pubsub.publish(event) {
                published += 1;
            } else {
                self.dropped += 1;
                debug!("button: {:?} edge dropped, event queue full", id);
            }
        }
        published
    }
}
