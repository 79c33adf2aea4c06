//! Fixed-size subscriber table with generation-checked tokens.
//!
//! Each slot carries a generation counter that is bumped every time the
//! slot is vacated.  A [`Token`] records both the slot index and the
//! generation it was issued under, so a token from a previous occupant
//! of a reused slot no longer matches.

/// Handle for one subscription.  Only useful for unsubscribing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Token {
    index: u16,
    generation: u16,
}

#[derive(Clone, Copy)]
struct Slot<C> {
    callback: Option<C>,
    generation: u16,
}

/// `N` callback slots, filled lowest index first.
pub struct SubscriberTable<C: Copy, const N: usize> {
    slots: [Slot<C>; N],
    count: usize,
}

impl<C: Copy, const N: usize> SubscriberTable<C, N> {
    pub const fn new() -> Self {
        assert!(N <= u16::MAX as usize, "too many subscriber slots");
        Self {
            slots: [Slot {
                callback: None,
                generation: 0,
            }; N],
            count: 0,
        }
    }

    /// Store `callback` in the first empty slot.  Returns `None`, and
    /// stores nothing, when every slot is occupied.
    pub fn subscribe(&mut self, callback: C) -> Option<Token> {
        let (index, slot) = self
            .slots
            .iter_mut()
            .enumerate()
            .find(|(_, s)| s.callback.is_none())?;
        slot.callback = Some(callback);
        self.count += 1;
        Some(Token {
            index: index as u16,
            generation: slot.generation,
        })
    }

    /// Vacate the slot `token` was issued for.  Stale or foreign tokens
    /// return `false` and change nothing.
    pub fn unsubscribe(&mut self, token: Token) -> bool {
        let Some(slot) = self.slots.get_mut(usize::from(token.index)) else {
            return false;
        };
        if slot.callback.is_none() || slot.generation != token.generation {
            return false;
        }
        slot.callback = None;
        slot.generation = slot.generation.wrapping_add(1);
        self.count -= 1;
        true
    }

    pub fn len(&self) -> usize {
        self.count
    }

    pub fn is_empty(&self) -> bool {
        self.count == 0
    }

    pub const fn capacity(&self) -> usize {
        N
    }

    /// Occupied callbacks in slot order.
    pub fn iter(&self) -> impl Iterator<Item = C> + '_ {
        self.slots.iter().filter_map(|s| s.callback)
    }

    /// Copy of the callback slots, so they can be invoked after the
    /// table's lock is released.
    pub fn snapshot(&self) -> [Option<C>; N] {
        self.slots.map(|s| s.callback)
    }
}

impl<C: Copy, const N: usize> Default for SubscriberTable<C, N> {
    fn default() -> Self {
        Self::new()
    }
}
