//! Lock-free time handoff between the main loop and the display interrupt
//!
//! One writer (the clock, lowest priority) and any number of readers (the
//! display ISR, the scheduler). The cell holds two slots of `AtomicU32`
//! words; the writer fills the slot the readers are not pointed at, then
//! publishes its generation. Cortex-M4 has no 64-bit atomics, so the local
//! time is packed into three 32-bit words:
//!
//! ```text
//! w0: year << 16 | month << 8 | day
//! w1: hour << 24 | minute << 16 | second << 8 | weekday
//! w2: day_of_year << 16 | dst
//! ```
//!
//! Each slot carries a version word equal to the generation stored in it.
//! The writer zeroes it before touching the data and sets it after, so a
//! reader that sees the same non-zero version before and after copying
//! has a consistent copy. A reader preempting the writer on a single core
//! always sees the fully published other slot, so the retry loop only
//! spins on multi-core hosts.

use core::sync::atomic::{fence, AtomicU32, Ordering};

use crate::local_time::LocalTime;

/// Generation reserved for "never synchronized"
const UNSYNCHRONIZED_GENERATION: u32 = 0;

/// A published local time and its generation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct TimeSnapshot {
    pub local: LocalTime,
    /// Incremented on every publish; 0 before the first sync
    pub generation: u32,
}

impl TimeSnapshot {
    /// Sentinel returned before the first publish
    pub const UNSYNCHRONIZED: Self = Self {
        local: LocalTime::UNSET,
        generation: UNSYNCHRONIZED_GENERATION,
    };

    pub const fn is_synchronized(&self) -> bool {
        self.generation != UNSYNCHRONIZED_GENERATION
    }
}

struct Slot {
    version: AtomicU32,
    words: [AtomicU32; 3],
}

impl Slot {
    const fn new() -> Self {
        Self {
            version: AtomicU32::new(0),
            words: [AtomicU32::new(0), AtomicU32::new(0), AtomicU32::new(0)],
        }
    }
}

/// Single-writer, multi-reader time cell
///
/// Usable from a `static`; reads never block and never fail.
pub struct SnapshotCell {
    current: AtomicU32,
    slots: [Slot; 2],
}

impl Default for SnapshotCell {
    fn default() -> Self {
        Self::new()
    }
}

impl SnapshotCell {
    pub const fn new() -> Self {
        Self {
            current: AtomicU32::new(UNSYNCHRONIZED_GENERATION),
            slots: [Slot::new(), Slot::new()],
        }
    }

    /// Publish a new local time and return its generation
    ///
    /// Must only be called from one context at a time.
    pub fn publish(&self, local: &LocalTime) -> u32 {
        let mut next = self.current.load(Ordering::Relaxed).wrapping_add(1);
        if next == UNSYNCHRONIZED_GENERATION {
            // Skip the sentinel and keep alternating slots
            next = 2;
        }
        let slot = &self.slots[(next & 1) as usize];
        let words = pack(local);

        slot.version.store(0, Ordering::Relaxed);
        fence(Ordering::Release);
        for (dst, word) in slot.words.iter().zip(words) {
            dst.store(word, Ordering::Relaxed);
        }
        slot.version.store(next, Ordering::Release);
        self.current.store(next, Ordering::Release);
        next
    }

    /// Latest complete snapshot, or [`TimeSnapshot::UNSYNCHRONIZED`]
    pub fn read(&self) -> TimeSnapshot {
        loop {
            let generation = self.current.load(Ordering::Acquire);
            if generation == UNSYNCHRONIZED_GENERATION {
                return TimeSnapshot::UNSYNCHRONIZED;
            }
            let slot = &self.slots[(generation & 1) as usize];
            let before = slot.version.load(Ordering::Acquire);
            let words = [
                slot.words[0].load(Ordering::Relaxed),
                slot.words[1].load(Ordering::Relaxed),
                slot.words[2].load(Ordering::Relaxed),
            ];
            fence(Ordering::Acquire);
            let after = slot.version.load(Ordering::Relaxed);
            if before == generation && after == generation {
                return TimeSnapshot {
                    local: unpack(words),
                    generation,
                };
            }
            core::hint::spin_loop();
        }
    }

    /// Generation of the latest publish (0 if none)
    pub fn generation(&self) -> u32 {
        self.current.load(Ordering::Acquire)
    }
}

fn pack(local: &LocalTime) -> [u32; 3] {
    [
        u32::from(local.year()) << 16 | u32::from(local.month()) << 8 | u32::from(local.day()),
        u32::from(local.hour()) << 24
            | u32::from(local.minute()) << 16
            | u32::from(local.second()) << 8
            | u32::from(local.weekday()),
        u32::from(local.day_of_year()) << 16 | u32::from(local.is_dst()),
    ]
}

fn unpack(words: [u32; 3]) -> LocalTime {
    let [w0, w1, w2] = words;
    LocalTime::from_fields(
        (w0 >> 16) as u16,
        (w0 >> 8) as u8,
        w0 as u8,
        (w1 >> 24) as u8,
        (w1 >> 16) as u8,
        (w1 >> 8) as u8,
        w1 as u8,
        (w2 >> 16) as u16,
        w2 & 1 == 1,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicBool;
    use std::sync::Arc;

    #[test]
    fn test_unsynchronized_before_first_publish() {
        let cell = SnapshotCell::new();
        let snapshot = cell.read();
        assert_eq!(snapshot, TimeSnapshot::UNSYNCHRONIZED);
        assert!(!snapshot.is_synchronized());
        assert_eq!(cell.generation(), 0);
    }

    #[test]
    fn test_publish_then_read() {
        let cell = SnapshotCell::new();
        let local = LocalTime::at(2024, 10, 27, 2, 59, 59);
        assert_eq!(cell.publish(&local), 1);
        let snapshot = cell.read();
        assert_eq!(snapshot.local, local);
        assert_eq!(snapshot.generation, 1);
        assert!(snapshot.is_synchronized());

        let later = LocalTime::at(2024, 10, 27, 2, 0, 0);
        assert_eq!(cell.publish(&later), 2);
        assert_eq!(cell.read().local, later);
    }

    #[test]
    fn test_generation_skips_sentinel_on_wrap() {
        let cell = SnapshotCell::new();
        cell.current.store(u32::MAX, Ordering::Relaxed);
        let local = LocalTime::at(2030, 1, 1, 0, 0, 0);
        assert_eq!(cell.publish(&local), 2);
        assert_eq!(cell.read().local, local);
        assert!(cell.read().is_synchronized());
    }

    #[test]
    fn test_dst_flag_survives_packing() {
        let cell = SnapshotCell::new();
        let utc = hal_abstractions::UtcInstant::from_unix_secs(1_719_835_200);
        let local = LocalTime::from_utc(utc, 7200, true);
        cell.publish(&local);
        assert!(cell.read().local.is_dst());
        assert_eq!(cell.read().local, local);
    }

    #[test]
    fn test_no_torn_reads_under_contention() {
        // Every published time has hour == minute == second, so a mix of
        // two snapshots shows up as unequal fields.
        let cell = Arc::new(SnapshotCell::new());
        let done = Arc::new(AtomicBool::new(false));

        let readers: Vec<_> = (0..3)
            .map(|_| {
                let cell = Arc::clone(&cell);
                let done = Arc::clone(&done);
                std::thread::spawn(move || {
                    let mut last_generation = 0;
                    while !done.load(Ordering::Relaxed) {
                        let snapshot = cell.read();
                        if !snapshot.is_synchronized() {
                            continue;
                        }
                        let (h, m, s) = snapshot.local.hms();
                        assert_eq!(h, m);
                        assert_eq!(m, s);
                        assert_eq!(snapshot.local.day(), h + 1);
                        assert!(snapshot.generation >= last_generation);
                        last_generation = snapshot.generation;
                    }
                })
            })
            .collect();

        for i in 0..200_000u32 {
            let v = (i % 24) as u8;
            cell.publish(&LocalTime::at(2024, 1, v + 1, v, v, v));
        }
        done.store(true, Ordering::Relaxed);
        for reader in readers {
            reader.join().unwrap();
        }
    }
}
