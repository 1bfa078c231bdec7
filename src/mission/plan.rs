use std::time::Duration;

/// Parameters of one patrol run. Every setter clamps instead of rejecting.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MissionPlan {
    rounds: u8,
    height_cm: i32,
    stay_duration: Duration,
}

impl MissionPlan {
    pub const ROUNDS_RANGE: (u8, u8) = (1, 10);
    pub const HEIGHT_RANGE_CM: (i32, i32) = (40, 300);
    pub const STAY_RANGE_S: (f64, f64) = (0.5, 30.0);

    pub fn new(rounds: u32, height_cm: i32, stay_duration_s: f64) -> Self {
        let mut plan = Self::default();
        plan.set_rounds(rounds);
        plan.set_height(height_cm);
        plan.set_stay_duration(stay_duration_s);
        plan
    }

    pub fn set_rounds(&mut self, rounds: u32) -> u8 {
        let (lo, hi) = Self::ROUNDS_RANGE;
        self.rounds = rounds.clamp(lo as u32, hi as u32) as u8;
        self.rounds
    }

    pub fn set_height(&mut self, height_cm: i32) -> i32 {
        let (lo, hi) = Self::HEIGHT_RANGE_CM;
        self.height_cm = height_cm.clamp(lo, hi);
        self.height_cm
    }

    pub fn set_stay_duration(&mut self, seconds: f64) -> Duration {
        let (lo, hi) = Self::STAY_RANGE_S;
        let seconds = if seconds.is_nan() { lo } else { seconds.clamp(lo, hi) };
        self.stay_duration = Duration::from_secs_f64(seconds);
        self.stay_duration
    }

    pub fn rounds(&self) -> u8 {
        self.rounds
    }

    pub fn height_cm(&self) -> i32 {
        self.height_cm
    }

    pub fn stay_duration(&self) -> Duration {
        self.stay_duration
    }
}

impl Default for MissionPlan {
    fn default() -> Self {
        Self {
            rounds: 3,
            height_cm: 100,
            stay_duration: Duration::from_secs(3),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_setters_clamp() {
        let mut plan = MissionPlan::default();
        assert_eq!(plan.set_rounds(20), 10);
        assert_eq!(plan.set_rounds(0), 1);
        assert_eq!(plan.set_height(10), 40);
        assert_eq!(plan.set_height(1000), 300);
        assert_eq!(plan.set_stay_duration(60.0), Duration::from_secs(30));
        assert_eq!(plan.set_stay_duration(0.1), Duration::from_millis(500));
        assert_eq!(plan.set_stay_duration(f64::NAN), Duration::from_millis(500));
    }

    #[test]
    fn test_in_range_values_kept() {
        let plan = MissionPlan::new(1, 100, 1.0);
        assert_eq!(plan.rounds(), 1);
        assert_eq!(plan.height_cm(), 100);
        assert_eq!(plan.stay_duration(), Duration::from_secs(1));
    }
}
