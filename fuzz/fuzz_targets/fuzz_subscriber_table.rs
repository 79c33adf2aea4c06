//! Fuzz target: `SubscriberTable`
//!
//! Each input byte is one operation: the high bit selects subscribe or
//! unsubscribe, the low bits pick a value or a previously issued token.
//! Checks that:
//! - the table never holds more than its slot count
//! - a stale token never removes a subscriber
//! - `len` always agrees with `iter`
//!
//! cargo fuzz run fuzz_subscriber_table

#![no_main]

use libfuzzer_sys::fuzz_target;
use sense::pubsub::{SubscriberTable, Token};

const SLOTS: usize = 4;

fuzz_target!(|data: &[u8]| {
    let mut table: SubscriberTable<u8, SLOTS> = SubscriberTable::new();
    let mut issued: Vec<(Token, bool)> = Vec::new();

    for &byte in data {
        if byte & 0x80 == 0 {
            let was_full = table.len() == SLOTS;
            match table.subscribe(byte) {
                Some(token) => {
                    assert!(!was_full, "subscribe succeeded on a full table");
                    issued.push((token, true));
                }
                None => assert!(was_full, "subscribe failed with a free slot"),
            }
        } else if !issued.is_empty() {
            let pick = usize::from(byte & 0x7f) % issued.len();
            let (token, live) = issued[pick];
            let removed = table.unsubscribe(token);
            assert_eq!(removed, live, "unsubscribe disagreed with token liveness");
            issued[pick].1 = false;
        }

        assert!(table.len() <= SLOTS);
        assert_eq!(table.len(), table.iter().count());
        assert_eq!(table.len(), issued.iter().filter(|(_, live)| *live).count());
    }
});
