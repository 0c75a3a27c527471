//! Microsecond timing for the bit-banged activation and the MTP write cycle
//!
//! All waits are busy-waits. The driver only needs a [`DelayNs`] that blocks
//! for at least the requested time plus a monotonic [`Instant`] source to
//! measure how long a transaction or an idle gap took.

use embedded_hal::delay::DelayNs;

/// Monotonic instant with microsecond resolution
pub type Instant = fugit::TimerInstantU64<1_000_000>;

/// Duration with microsecond resolution
pub type Duration = fugit::MicrosDurationU64;

/// A blocking delay that can also report monotonic time
pub trait MonotonicTimer: DelayNs {
    /// Current time point
    fn now(&mut self) -> Instant;

    /// Time elapsed since `since`
    ///
    /// Saturates to zero if `since` lies in the future.
    fn elapsed(&mut self, since: Instant) -> Duration {
        self.now()
            .checked_duration_since(since)
            .unwrap_or(Duration::from_ticks(0))
    }
}

impl<T: MonotonicTimer + ?Sized> MonotonicTimer for &mut T {
    fn now(&mut self) -> Instant {
        T::now(self)
    }
}

/// Busy-wait timer over a free-running 32-bit cycle counter
///
/// `read` returns the raw counter (for example the Cortex-M DWT `CYCCNT`),
/// `cycles_per_us` is the counter frequency in MHz. The counter is extended
/// to 64 bits, so wrap-arounds are handled as long as the timer is polled at
/// least once per counter period.
#[derive(Debug)]
pub struct CycleTimer<F> {
    read: F,
    cycles_per_us: u32,
    last: u32,
    total: u64,
}

impl<F> CycleTimer<F>
where
    F: FnMut() -> u32,
{
    /// Create a timer; a `cycles_per_us` of zero is treated as one
    pub fn new(mut read: F, cycles_per_us: u32) -> Self {
        let last = read();
        Self {
            read,
            cycles_per_us: cycles_per_us.max(1),
            last,
            total: 0,
        }
    }

    fn cycles(&mut self) -> u64 {
        let raw = (self.read)();
        self.total += u64::from(raw.wrapping_sub(self.last));
        self.last = raw;
        self.total
    }
}

impl<F> DelayNs for CycleTimer<F>
where
    F: FnMut() -> u32,
{
    fn delay_ns(&mut self, ns: u32) {
        let target = (u64::from(ns) * u64::from(self.cycles_per_us)).div_ceil(1_000);
        let start = self.cycles();
        while self.cycles() - start < target {
            core::hint::spin_loop();
        }
    }
}

impl<F> MonotonicTimer for CycleTimer<F>
where
    F: FnMut() -> u32,
{
    fn now(&mut self) -> Instant {
        Instant::from_ticks(self.cycles() / u64::from(self.cycles_per_us))
    }
}
