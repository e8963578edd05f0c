//! Periodic timers and tap targets.
//!
//! Timers are plain values of a `Copy` task type; the caller matches on the
//! task when it fires, so handlers keep direct access to their owner's state
//! without storing closures.

use core::fmt;

use embedded_graphics::{
    prelude::Point,
    primitives::{ContainsPoint, Rectangle},
};

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum SchedulerError {
    Full,
}

impl fmt::Display for SchedulerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SchedulerError::Full => f.write_str("no free slot"),
        }
    }
}

/// Cancellable handle to a registered timer or tap target.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct TimerHandle {
    slot: u8,
    generation: u16,
}

#[derive(Copy, Clone, Debug)]
struct Slot<T> {
    task: T,
    period_ms: u32,
    last_ms: u64,
    generation: u16,
}

pub struct Scheduler<T: Copy, const N: usize> {
    slots: heapless::Vec<Option<Slot<T>>, N>,
    generation: u16,
}

impl<T: Copy, const N: usize> Scheduler<T, N> {
    pub fn new() -> Self {
        Self {
            slots: heapless::Vec::new(),
            generation: 0,
        }
    }

    /// Run `task` every `period_ms`, first time one period after `now_ms`.
    pub fn register_periodic(
        &mut self,
        task: T,
        period_ms: u32,
        now_ms: u64,
    ) -> Result<TimerHandle, SchedulerError> {
        self.generation = self.generation.wrapping_add(1);
        let slot = Slot {
            task,
            period_ms,
            last_ms: now_ms,
            generation: self.generation,
        };

        let index = match self.slots.iter().position(Option::is_none) {
            Some(i) => {
                self.slots[i] = Some(slot);
                i
            }
            None => {
                self.slots.push(Some(slot)).map_err(|_| SchedulerError::Full)?;
                self.slots.len() - 1
            }
        };
        Ok(TimerHandle {
            slot: index as u8,
            generation: self.generation,
        })
    }

    /// Stop a timer. Returns false when the handle is stale.
    pub fn cancel(&mut self, handle: TimerHandle) -> bool {
        let Some(slot) = self.slots.get_mut(handle.slot as usize) else {
            return false;
        };
        if slot.as_ref().map(|s| s.generation) != Some(handle.generation) {
            return false;
        }
        *slot = None;
        true
    }

    pub fn is_active(&self, handle: TimerHandle) -> bool {
        matches!(
            self.slots.get(handle.slot as usize),
            Some(Some(s)) if s.generation == handle.generation
        )
    }

    /// Call `run` for every due timer, in registration order.
    ///
    /// A timer is due when a full period passed since it last ran; it then
    /// restarts from `now_ms`, so a late loop never fires it twice.
    pub fn fire_due(&mut self, now_ms: u64, mut run: impl FnMut(T)) -> usize {
        let mut fired = 0;
        for slot in self.slots.iter_mut().flatten() {
            if now_ms.saturating_sub(slot.last_ms) >= slot.period_ms as u64 {
                slot.last_ms = now_ms;
                run(slot.task);
                fired += 1;
            }
        }
        fired
    }
}

impl<T: Copy, const N: usize> Default for Scheduler<T, N> {
    fn default() -> Self {
        Self::new()
    }
}

/// Tap regions mapped to a fixed target.
pub struct TapRegistry<T: Copy, const N: usize> {
    targets: heapless::Vec<(Rectangle, T), N>,
}

impl<T: Copy, const N: usize> TapRegistry<T, N> {
    pub fn new() -> Self {
        Self { targets: heapless::Vec::new() }
    }

    pub fn register(&mut self, area: Rectangle, target: T) -> Result<(), SchedulerError> {
        self.targets
            .push((area, target))
            .map_err(|_| SchedulerError::Full)
    }

    /// First registered target containing `p`.
    pub fn hit(&self, p: Point) -> Option<T> {
        self.targets
            .iter()
            .find(|(area, _)| area.contains(p))
            .map(|(_, t)| *t)
    }
}

impl<T: Copy, const N: usize> Default for TapRegistry<T, N> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use embedded_graphics::prelude::Size;

    #[derive(Copy, Clone, Debug, PartialEq, Eq)]
    enum Task {
        Fast,
        Slow,
    }

    fn run(s: &mut Scheduler<Task, 4>, now: u64) -> Vec<Task> {
        let mut out = Vec::new();
        s.fire_due(now, |t| out.push(t));
        out
    }

    #[test]
    fn test_fires_at_period() {
        let mut s: Scheduler<Task, 4> = Scheduler::new();
        s.register_periodic(Task::Fast, 50, 0).unwrap();
        s.register_periodic(Task::Slow, 5000, 0).unwrap();

        assert!(run(&mut s, 49).is_empty());
        assert_eq!(run(&mut s, 50), vec![Task::Fast]);
        assert!(run(&mut s, 99).is_empty());
        assert_eq!(run(&mut s, 5000), vec![Task::Fast, Task::Slow]);
    }

    #[test]
    fn test_late_loop_fires_once() {
        let mut s: Scheduler<Task, 4> = Scheduler::new();
        s.register_periodic(Task::Fast, 50, 0).unwrap();
        assert_eq!(run(&mut s, 400), vec![Task::Fast]);
        assert!(run(&mut s, 420).is_empty());
        assert_eq!(run(&mut s, 450), vec![Task::Fast]);
    }

    #[test]
    fn test_cancel_stops_timer() {
        let mut s: Scheduler<Task, 4> = Scheduler::new();
        let h = s.register_periodic(Task::Fast, 10, 0).unwrap();
        assert!(s.cancel(h));
        assert!(!s.is_active(h));
        assert!(run(&mut s, 100).is_empty());
        assert!(!s.cancel(h));
    }

    #[test]
    fn test_stale_handle_does_not_cancel_reused_slot() {
        let mut s: Scheduler<Task, 1> = Scheduler::new();
        let old = s.register_periodic(Task::Fast, 10, 0).unwrap();
        s.cancel(old);
        let new = s.register_periodic(Task::Slow, 10, 0).unwrap();

        assert!(!s.cancel(old));
        assert!(s.is_active(new));
    }

    #[test]
    fn test_capacity() {
        let mut s: Scheduler<Task, 1> = Scheduler::new();
        s.register_periodic(Task::Fast, 10, 0).unwrap();
        assert_eq!(s.register_periodic(Task::Slow, 10, 0), Err(SchedulerError::Full));
    }

    #[test]
    fn test_tap_hit() {
        let mut taps: TapRegistry<u8, 2> = TapRegistry::new();
        taps.register(Rectangle::new(Point::new(10, 10), Size::new(80, 40)), 1).unwrap();
        taps.register(Rectangle::new(Point::new(150, 10), Size::new(80, 40)), 2).unwrap();

        assert_eq!(taps.hit(Point::new(10, 10)), Some(1));
        assert_eq!(taps.hit(Point::new(229, 49)), Some(2));
        assert_eq!(taps.hit(Point::new(90, 10)), None);
        assert!(taps.register(Rectangle::zero(), 3).is_err());
    }
}
