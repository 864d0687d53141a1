//! Shared filter configuration state.
//!
//! Exactly one [`FilterState`] exists per pipeline attachment. The corruption
//! path reads it on every key event while the control channel may be writing
//! it from another task at the same time, so every field is its own atomic.
//!
//! # Why relaxed atomics and not a lock? (for beginners)
//!
//! The contract here is *per-field* atomicity only: a reader must never see
//! a torn value for probability, mode, or seed, but it does not need to see
//! all three change together. `AtomicU32` with `Ordering::Relaxed` gives
//! exactly that – each load/store is indivisible, with no memory barriers
//! and no lock. A `Mutex` would give a stronger guarantee nobody needs,
//! and it would put a lock acquisition on the path of every keystroke,
//! where the lower layer may re-enter during completion.

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::OnceLock;

use serde::{Deserialize, Serialize};

use crate::control::wire::KeyboardAttributes;
use crate::rand::{lcg_step, Lcg31};

/// Probability applied to a freshly attached filter.
pub const DEFAULT_PROBABILITY: u32 = 10;

/// Corruption policy selected by the `mode` configuration field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[repr(u32)]
pub enum CorruptionMode {
    /// Pass everything through untouched.
    Normal = 0,
    /// Rewrite selected key-downs to a random allow-listed scan code.
    Chaos = 1,
    /// Suppress selected key-downs entirely.
    DropLetters = 2,
    /// Suppress selected key-downs of the space bar only.
    DropSpace = 3,
}

impl CorruptionMode {
    /// Decodes a raw mode value.
    ///
    /// The control protocol does not validate `mode`; values outside 0–3 are
    /// stored as-is and simply select no corruption arm, which is why this
    /// returns `Option` rather than an error.
    pub fn from_raw(raw: u32) -> Option<Self> {
        match raw {
            0 => Some(CorruptionMode::Normal),
            1 => Some(CorruptionMode::Chaos),
            2 => Some(CorruptionMode::DropLetters),
            3 => Some(CorruptionMode::DropSpace),
            _ => None,
        }
    }
}

/// One configuration update: the payload of a `SetConfig` request.
///
/// `mode` stays a raw `u32` here because unrecognized values are legal on
/// the wire (they act as "no corruption"); only `probability` is validated,
/// by the dispatch layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FilterConfig {
    /// Percentage of eligible events to corrupt, 0–100 inclusive.
    pub probability: u32,
    /// Raw corruption mode value.
    pub mode: u32,
}

impl FilterConfig {
    /// Convenience constructor from a typed mode.
    pub fn new(probability: u32, mode: CorruptionMode) -> Self {
        Self {
            probability,
            mode: mode as u32,
        }
    }
}

/// The shared configuration read by every processed event.
///
/// Created once at attach time, dropped when the pipeline detaches. Fields
/// are written only by the configuration operation and the seed step; the
/// attributes snapshot is written at most once by the first successful
/// forwarded attribute query.
#[derive(Debug)]
pub struct FilterState {
    probability: AtomicU32,
    mode: AtomicU32,
    seed: AtomicU32,
    attributes: OnceLock<KeyboardAttributes>,
}

impl FilterState {
    /// Creates state with the attach-time defaults: Chaos mode at 10 %,
    /// seeded from the system clock.
    pub fn new() -> Self {
        Self::with_seed(Lcg31::from_time().seed())
    }

    /// Creates state with an explicit seed, for reproducible runs.
    pub fn with_seed(seed: u32) -> Self {
        Self {
            probability: AtomicU32::new(DEFAULT_PROBABILITY),
            mode: AtomicU32::new(CorruptionMode::Chaos as u32),
            seed: AtomicU32::new(Lcg31::new(seed).seed()),
            attributes: OnceLock::new(),
        }
    }

    /// Current corruption probability in percent.
    pub fn probability(&self) -> u32 {
        self.probability.load(Ordering::Relaxed)
    }

    /// Current raw mode value.
    pub fn mode_raw(&self) -> u32 {
        self.mode.load(Ordering::Relaxed)
    }

    /// Current mode, if the raw value names one.
    pub fn mode(&self) -> Option<CorruptionMode> {
        CorruptionMode::from_raw(self.mode_raw())
    }

    /// Applies a validated configuration update, one field at a time.
    pub fn apply(&self, config: FilterConfig) {
        self.probability.store(config.probability, Ordering::Relaxed);
        self.mode.store(config.mode, Ordering::Relaxed);
    }

    /// Advances the shared seed by one LCG step and returns the new draw.
    ///
    /// Load-step-store rather than a compare-and-swap loop: concurrent
    /// drawers may occasionally duplicate a draw, which is harmless for
    /// fault injection and keeps the hot path to two relaxed accesses.
    pub fn next_draw(&self) -> u32 {
        let next = lcg_step(self.seed.load(Ordering::Relaxed));
        self.seed.store(next, Ordering::Relaxed);
        next
    }

    /// Current seed value, for diagnostics and reproduction.
    pub fn seed(&self) -> u32 {
        self.seed.load(Ordering::Relaxed)
    }

    /// Caches the keyboard attributes descriptor.
    ///
    /// The first caller wins; later calls are ignored and return `false`.
    pub fn cache_attributes(&self, attributes: KeyboardAttributes) -> bool {
        self.attributes.set(attributes).is_ok()
    }

    /// Returns the cached descriptor, or the zeroed descriptor when no
    /// forwarded query has completed yet. The cache is best-effort by
    /// contract.
    pub fn attributes_snapshot(&self) -> KeyboardAttributes {
        self.attributes.get().copied().unwrap_or_default()
    }
}

impl Default for FilterState {
    fn default() -> Self {
        Self::new()
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
