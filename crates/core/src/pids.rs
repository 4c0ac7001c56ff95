//! Shared array of live build PIDs
//!
//! One slot per instance. The owning worker publishes the PID of the
//! `timeout` wrapper while its build is running and clears it afterwards;
//! the shutdown path reads the array and signals each live PID directly.
//! The `timeout` helper puts the build in its own process group, so a
//! group signal from the supervisor would never reach it.

use std::sync::atomic::{AtomicI32, Ordering};
use std::sync::Arc;

/// Fixed-length array of live child PIDs, one slot per instance.
///
/// Each slot has exactly one writer (its owning worker). The reader is the
/// signal-handling thread, which tolerates racy reads: a stale PID that is
/// signalled after the process already exited just produces ESRCH.
#[derive(Clone)]
pub struct PidSlots {
    slots: Arc<[AtomicI32]>,
}

impl PidSlots {
    /// Allocate `n` zeroed slots.
    pub fn new(n: usize) -> Self {
        let slots: Vec<AtomicI32> = (0..n).map(|_| AtomicI32::new(0)).collect();
        Self {
            slots: slots.into(),
        }
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// Publish the live build PID for an instance.
    pub fn publish(&self, instance: usize, pid: u32) {
        self.slots[instance].store(pid as i32, Ordering::Relaxed);
    }

    /// Clear the slot once the build has been reaped.
    pub fn clear(&self, instance: usize) {
        self.slots[instance].store(0, Ordering::Relaxed);
    }

    pub fn get(&self, instance: usize) -> i32 {
        self.slots[instance].load(Ordering::Relaxed)
    }

    /// Snapshot of all non-zero PIDs.
    pub fn live(&self) -> Vec<i32> {
        self.slots
            .iter()
            .map(|slot| slot.load(Ordering::Relaxed))
            .filter(|&pid| pid != 0)
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn publish_and_clear() {
        let slots = PidSlots::new(3);
        assert!(slots.live().is_empty());

        slots.publish(0, 1234);
        slots.publish(2, 5678);
        assert_eq!(slots.get(0), 1234);
        assert_eq!(slots.get(1), 0);
        assert_eq!(slots.live(), vec![1234, 5678]);

        slots.clear(0);
        assert_eq!(slots.live(), vec![5678]);
    }

    #[test]
    fn clones_share_the_array() {
        let slots = PidSlots::new(1);
        let other = slots.clone();
        slots.publish(0, 42);
        assert_eq!(other.get(0), 42);
    }
}
