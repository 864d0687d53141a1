//! Named scan codes and the Chaos-mode replacement table.

/// Space bar scan code (set 1).
pub const SCANCODE_SPACE: u16 = 0x39;

/// Scan codes a corrupted key-down may be rewritten to in Chaos mode:
/// Backspace, the three letter rows, and the digit row keys they share a
/// block with. Restricting replacements to printable/editing keys keeps the
/// injected faults visible without ever emitting modifier or system keys.
pub const CHAOS_SCAN_CODES: [u16; 27] = [
    0x0E, // Backspace
    0x10, 0x11, 0x12, 0x13, 0x14, 0x15, 0x16, 0x17, 0x18, 0x19, // Q..P
    0x1E, 0x1F, 0x20, 0x21, 0x22, 0x23, 0x24, 0x25, 0x26, // A..L
    0x2C, 0x2D, 0x2E, 0x2F, 0x30, 0x31, 0x32, // Z..M
];

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_chaos_table_has_27_entries() {
        assert_eq!(CHAOS_SCAN_CODES.len(), 27);
    }

    #[test]
    fn test_chaos_table_has_no_duplicates() {
        let mut codes = CHAOS_SCAN_CODES.to_vec();
        codes.sort_unstable();
        codes.dedup();
        assert_eq!(codes.len(), CHAOS_SCAN_CODES.len());
    }

    #[test]
    fn test_chaos_table_excludes_space() {
        assert!(!CHAOS_SCAN_CODES.contains(&SCANCODE_SPACE));
    }
}
