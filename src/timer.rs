//! Periodic timer set driven by explicit elapsed time.
//!
//! Nothing here reads a clock.  The owner calls [`TimerSet::advance`] with
//! the milliseconds that passed, and every timer that came due in that
//! window is reported to a [`TimerDelegate`] in chronological order.  Tests
//! step time by hand; the console binary feeds it wall-clock deltas.
//!
//! ```text
//!   elapsed_ms ──▶ TimerSet.advance() ──▶ TimerDelegate.on_timer_fired(id)
//!                    │                        │
//!                    │ (earliest due first,   ├─▶ temperature drift
//!                    │  ties in slot order)   ├─▶ fill advance
//!                    ▼                        └─▶ controller poll
//!                 phase carried over
//! ```
//!
//! Advancing by `a` then `b` fires exactly the same sequence as advancing
//! by `a + b` once.

use crate::app::ports::TimerDelegate;
use log::{info, warn};

/// Maximum number of timers in one set (stack-allocated).
const MAX_TIMERS: usize = 4;

/// Handle to a timer slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TimerId(usize);

#[derive(Debug, Clone)]
struct TimerEntry {
    label: &'static str,
    period_ms: u64,
    /// Milliseconds since the last fire (or since enable).
    phase_ms: u64,
    enabled: bool,
}

impl TimerEntry {
    fn due_in(&self) -> u64 {
        self.period_ms - self.phase_ms
    }
}

/// A fixed-capacity set of periodic timers.
pub struct TimerSet {
    slots: [Option<TimerEntry>; MAX_TIMERS],
}

impl Default for TimerSet {
    fn default() -> Self {
        Self::new()
    }
}

impl TimerSet {
    pub fn new() -> Self {
        Self {
            slots: [None, None, None, None],
        }
    }

    /// Add an enabled periodic timer.  Returns `None` if the set is full or
    /// the period is zero.
    pub fn add(&mut self, label: &'static str, period_ms: u64) -> Option<TimerId> {
        if period_ms == 0 {
            warn!("Timer '{}': zero period rejected", label);
            return None;
        }
        let (i, slot) = self
            .slots
            .iter_mut()
            .enumerate()
            .find(|(_, s)| s.is_none())?;
        info!("Timer: added '{}' every {} ms at slot {}", label, period_ms, i);
        *slot = Some(TimerEntry {
            label,
            period_ms,
            phase_ms: 0,
            enabled: true,
        });
        Some(TimerId(i))
    }

    /// Enable or disable one timer.  Phase is kept.
    pub fn set_enabled(&mut self, id: TimerId, enabled: bool) {
        if let Some(entry) = self.entry_mut(id) {
            entry.enabled = enabled;
        }
    }

    /// Restart a timer's period from now.
    pub fn reset_phase(&mut self, id: TimerId) {
        if let Some(entry) = self.entry_mut(id) {
            entry.phase_ms = 0;
        }
    }

    pub fn is_enabled(&self, id: TimerId) -> bool {
        self.slots
            .get(id.0)
            .and_then(Option::as_ref)
            .is_some_and(|e| e.enabled)
    }

    pub fn label(&self, id: TimerId) -> Option<&'static str> {
        self.slots.get(id.0).and_then(Option::as_ref).map(|e| e.label)
    }

    /// Number of enabled timers.
    pub fn active_count(&self) -> usize {
        self.slots
            .iter()
            .filter(|s| s.as_ref().is_some_and(|e| e.enabled))
            .count()
    }

    /// Advance time by `elapsed_ms`, firing every timer that comes due.
    /// Returns the number of fires.
    pub fn advance(&mut self, elapsed_ms: u64, delegate: &mut dyn TimerDelegate) -> usize {
        let mut remaining = elapsed_ms;
        let mut fired = 0;

        loop {
            // Earliest due timer; `min` on (due, slot) breaks ties by slot.
            let next = self
                .slots
                .iter()
                .enumerate()
                .filter_map(|(i, s)| s.as_ref().filter(|e| e.enabled).map(|e| (e.due_in(), i)))
                .min();

            let Some((due, slot)) = next.filter(|(due, _)| *due <= remaining) else {
                break;
            };

            for entry in self.slots.iter_mut().flatten().filter(|e| e.enabled) {
                entry.phase_ms += due;
            }
            if let Some(entry) = self.slots[slot].as_mut() {
                entry.phase_ms = 0;
            }
            remaining -= due;
            fired += 1;
            delegate.on_timer_fired(TimerId(slot));
        }

        for entry in self.slots.iter_mut().flatten().filter(|e| e.enabled) {
            entry.phase_ms += remaining;
        }
        fired
    }

    fn entry_mut(&mut self, id: TimerId) -> Option<&mut TimerEntry> {
        self.slots.get_mut(id.0).and_then(Option::as_mut)
    }
}

// ═══════════════════════════════════════════════════════════════
//  Tests
// ═══════════════════════════════════════════════════════════════
