//! Lifecycle state machine.
//!
//! # States
//! - Initializing: signal routes installed, setup still running
//! - Running: normal operation
//! - Reloading: a reload was requested or is being carried out
//! - Terminating: shutdown requested; absorbing
//!
//! # State Transitions
//! ```text
//! Initializing → Running            mark_running()
//! Running      → Reloading          request_reload() / request_fake_death()
//! Reloading    → Running            finish_reload()
//! any          → Terminating        request_terminate()
//! ```
//!
//! # Design Decisions
//! - The whole state is one `AtomicU8`, so a request from a signal task is a single
//!   compare-and-swap and is never observed half-applied
//! - Request methods only record; the main loop consumes with the `take_*` methods

use std::sync::atomic::{AtomicU8, Ordering};

use serde::Serialize;

const PHASE_MASK: u8 = 0b0000_0011;
const RELOAD_PENDING: u8 = 0b0000_0100;
const FAKING_DEATH: u8 = 0b0000_1000;
const REMOTE_DEBUG: u8 = 0b0001_0000;
const DEBUG_ENABLED: u8 = 0b0010_0000;

/// Position on the Running/Reloading/Terminating axis.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    Initializing,
    Running,
    Reloading,
    Terminating,
}

impl Phase {
    fn bits(self) -> u8 {
        match self {
            Phase::Initializing => 0,
            Phase::Running => 1,
            Phase::Reloading => 2,
            Phase::Terminating => 3,
        }
    }

    fn from_bits(word: u8) -> Self {
        match word & PHASE_MASK {
            0 => Phase::Initializing,
            1 => Phase::Running,
            2 => Phase::Reloading,
            _ => Phase::Terminating,
        }
    }
}

fn with_phase(word: u8, phase: Phase) -> u8 {
    (word & !PHASE_MASK) | phase.bits()
}

/// Point-in-time copy of the lifecycle state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct LifecycleSnapshot {
    pub phase: Phase,
    pub reload_pending: bool,
    pub faking_death: bool,
    pub remote_debug_requested: bool,
    pub debug: bool,
}

impl LifecycleSnapshot {
    fn from_word(word: u8) -> Self {
        Self {
            phase: Phase::from_bits(word),
            reload_pending: word & RELOAD_PENDING != 0,
            faking_death: word & FAKING_DEATH != 0,
            remote_debug_requested: word & REMOTE_DEBUG != 0,
            debug: word & DEBUG_ENABLED != 0,
        }
    }
}

/// Shared lifecycle context.
///
/// Created once at startup and handed by `Arc` to the signal router and the main loop.
#[derive(Debug)]
pub struct Lifecycle {
    word: AtomicU8,
}

impl Lifecycle {
    /// New context in `Initializing`, with debug output on or off.
    pub fn new(debug: bool) -> Self {
        let word = if debug { DEBUG_ENABLED } else { 0 };
        Self {
            word: AtomicU8::new(word),
        }
    }

    /// Apply `f` atomically. Returns the previous word on success.
    fn update(&self, f: impl FnMut(u8) -> Option<u8>) -> Result<u8, u8> {
        self.word.fetch_update(Ordering::SeqCst, Ordering::SeqCst, f)
    }

    fn load(&self) -> u8 {
        self.word.load(Ordering::SeqCst)
    }

    pub fn snapshot(&self) -> LifecycleSnapshot {
        LifecycleSnapshot::from_word(self.load())
    }

    pub fn phase(&self) -> Phase {
        Phase::from_bits(self.load())
    }

    pub fn is_terminating(&self) -> bool {
        self.phase() == Phase::Terminating
    }

    pub fn is_faking_death(&self) -> bool {
        self.load() & FAKING_DEATH != 0
    }

    pub fn debug_enabled(&self) -> bool {
        self.load() & DEBUG_ENABLED != 0
    }

    /// Request a reload. Refused once terminating.
    pub fn request_reload(&self) -> bool {
        self.update(reload_word).is_ok()
    }

    /// Request shutdown. Always accepted; repeating it changes nothing.
    pub fn request_terminate(&self) {
        let _ = self.update(|word| {
            if Phase::from_bits(word) == Phase::Terminating {
                None
            } else {
                Some(with_phase(word, Phase::Terminating))
            }
        });
    }

    /// Mark the next reload as a simulated crash, and request that reload.
    ///
    /// Returns whether the reload part was honored.
    pub fn request_fake_death(&self) -> bool {
        let previous = self.update(|word| {
            let word = word | FAKING_DEATH;
            Some(reload_word(word).unwrap_or(word))
        });

        match previous {
            Ok(word) => Phase::from_bits(word) != Phase::Terminating,
            Err(_) => false,
        }
    }

    /// Request remote debug activation. The phase is left alone.
    pub fn request_remote_debug(&self) {
        self.word.fetch_or(REMOTE_DEBUG, Ordering::SeqCst);
    }

    /// Leave `Initializing`. A reload requested during setup keeps the phase at `Reloading`.
    pub fn mark_running(&self) -> bool {
        self.update(|word| match Phase::from_bits(word) {
            Phase::Initializing if word & RELOAD_PENDING != 0 => Some(with_phase(word, Phase::Reloading)),
            Phase::Initializing => Some(with_phase(word, Phase::Running)),
            _ => None,
        })
        .is_ok()
    }

    /// Consume a pending reload request. Never honored once terminating.
    pub fn take_reload(&self) -> bool {
        match self.update(|word| {
            if word & RELOAD_PENDING != 0 {
                Some(word & !RELOAD_PENDING)
            } else {
                None
            }
        }) {
            Ok(previous) => Phase::from_bits(previous) != Phase::Terminating,
            Err(_) => false,
        }
    }

    /// Return from `Reloading` to `Running` unless another reload is already queued.
    pub fn finish_reload(&self) {
        let _ = self.update(|word| match Phase::from_bits(word) {
            Phase::Reloading if word & RELOAD_PENDING == 0 => Some(with_phase(word, Phase::Running)),
            _ => None,
        });
    }

    /// Consume a pending remote debug request.
    pub fn take_remote_debug(&self) -> bool {
        self.word.fetch_and(!REMOTE_DEBUG, Ordering::SeqCst) & REMOTE_DEBUG != 0
    }

    pub fn set_debug(&self, enabled: bool) {
        if enabled {
            self.word.fetch_or(DEBUG_ENABLED, Ordering::SeqCst);
        } else {
            self.word.fetch_and(!DEBUG_ENABLED, Ordering::SeqCst);
        }
    }
}

impl Default for Lifecycle {
    fn default() -> Self {
        Self::new(false)
    }
}

/// Word with a reload recorded, or `None` if reloads are no longer accepted.
fn reload_word(word: u8) -> Option<u8> {
    match Phase::from_bits(word) {
        Phase::Terminating => None,
        Phase::Initializing => Some(word | RELOAD_PENDING),
        Phase::Running | Phase::Reloading => Some(with_phase(word | RELOAD_PENDING, Phase::Reloading)),
    }
}
