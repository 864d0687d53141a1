//! The corruption policy applied to each batch of key events.
//!
//! This is pure domain logic: given the shared [`FilterState`] and a mutable
//! batch, walk the batch in order and corrupt the key-downs the probability
//! draw selects. The batch is never reordered, grown, or shrunk – upstream
//! must receive exactly the events the hardware produced, with only the
//! selected ones rewritten in place.

use tracing::debug;

use crate::event::{KeyEvent, KeyTransition};
use crate::scancode::{CHAOS_SCAN_CODES, SCANCODE_SPACE};
use crate::state::{CorruptionMode, FilterState};

/// Applies the configured corruption policy to a batch, in place.
///
/// Only `Make` (key-down) transitions are eligible; corrupting a key-up
/// would leave upstream with stuck keys. Probability and mode are re-read
/// from the shared state for every event, so a configuration change landing
/// mid-batch takes effect from the next event onward.
pub fn corrupt_batch(state: &FilterState, events: &mut [KeyEvent]) {
    for event in events.iter_mut() {
        if !event.is_make() {
            continue;
        }

        let draw = state.next_draw();
        if draw % 100 >= state.probability() {
            continue;
        }

        match state.mode() {
            Some(CorruptionMode::Chaos) => {
                // Second draw picks the replacement so selection and choice
                // are independent.
                let index = state.next_draw() as usize % CHAOS_SCAN_CODES.len();
                let replacement = CHAOS_SCAN_CODES[index];
                debug!(
                    "swapped key-down 0x{:02X} -> 0x{:02X}",
                    event.scan_code, replacement
                );
                event.scan_code = replacement;
            }
            Some(CorruptionMode::DropLetters) => {
                debug!("suppressed key-down 0x{:02X}", event.scan_code);
                event.transition = KeyTransition::Break;
            }
            Some(CorruptionMode::DropSpace) => {
                if event.scan_code == SCANCODE_SPACE {
                    debug!("suppressed space key-down");
                    event.transition = KeyTransition::Break;
                }
            }
            // Normal and unrecognized raw modes corrupt nothing.
            Some(CorruptionMode::Normal) | None => {}
        }
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
