//! Simulated biometrics for the dashboard widgets.

use core::fmt::Write;

use heapless::String;

pub type Label = String<16>;

// Simple RNG (xorshift32)
#[derive(Clone, Debug)]
pub struct Rng(u32);

impl Rng {
    pub const fn new(seed: u32) -> Self {
        // xorshift is stuck at zero
        Self(if seed == 0 { 0x2545_F491 } else { seed })
    }

    pub fn next_u32(&mut self) -> u32 {
        self.0 ^= self.0 << 13;
        self.0 ^= self.0 >> 17;
        self.0 ^= self.0 << 5;
        self.0
    }

    pub fn range(&mut self, max: u32) -> u32 {
        self.next_u32() % max
    }
}

pub struct SimulatedMetrics {
    heart_rate: u8,
    steps: u32,
    battery: u8,
    rng: Rng,
}

impl SimulatedMetrics {
    pub fn new(seed: u32) -> Self {
        Self {
            heart_rate: 72,
            steps: 1000,
            battery: 100,
            rng: Rng::new(seed),
        }
    }

    pub fn heart_rate(&self) -> u8 {
        self.heart_rate
    }

    pub fn steps(&self) -> u32 {
        self.steps
    }

    pub fn battery(&self) -> u8 {
        self.battery
    }

    /// One simulated second passed; `second` is the displayed time in
    /// whole seconds.
    pub fn on_second(&mut self, second: u64) {
        self.heart_rate = 60 + self.rng.range(41) as u8;
        self.steps = self.steps.saturating_add(1);
        if second % 10 == 0 && self.battery > 0 {
            self.battery -= 1;
        }
    }

    pub fn heart_rate_label(&self) -> Label {
        let mut s = Label::new();
        let _ = write!(s, "HR {}", self.heart_rate);
        s
    }

    pub fn steps_label(&self) -> Label {
        let mut s = Label::new();
        let _ = write!(s, "{} steps", self.steps);
        s
    }

    pub fn battery_label(&self) -> Label {
        let mut s = Label::new();
        let _ = write!(s, "BAT {}%", self.battery);
        s
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_starting_values() {
        let m = SimulatedMetrics::new(1);
        assert_eq!((m.heart_rate(), m.steps(), m.battery()), (72, 1000, 100));
        assert_eq!(m.heart_rate_label().as_str(), "HR 72");
        assert_eq!(m.steps_label().as_str(), "1000 steps");
        assert_eq!(m.battery_label().as_str(), "BAT 100%");
    }

    #[test]
    fn test_heart_rate_stays_in_range() {
        let mut m = SimulatedMetrics::new(0xDEAD_BEEF);
        for s in 1..2_000 {
            m.on_second(s);
            assert!((60..=100).contains(&m.heart_rate()));
        }
    }

    #[test]
    fn test_steps_count_every_second() {
        let mut m = SimulatedMetrics::new(7);
        for s in 1..=25 {
            m.on_second(s);
        }
        assert_eq!(m.steps(), 1025);
    }

    #[test]
    fn test_battery_drops_every_tenth_second_and_floors() {
        let mut m = SimulatedMetrics::new(7);
        for s in 1..=30 {
            m.on_second(s);
        }
        assert_eq!(m.battery(), 97);

        for s in 31..=2_000 {
            m.on_second(s);
        }
        assert_eq!(m.battery(), 0);
    }

    #[test]
    fn test_zero_seed_still_random() {
        let mut r = Rng::new(0);
        assert_ne!(r.next_u32(), 0);
    }
}
