//! Sawtooth sweep voice: A3 to A6 over four seconds, then a one-second fade.

/// Start frequency (Hz), A3
const START_HZ: f64 = 220.0;

/// End frequency (Hz), A6
const END_HZ: f64 = 1760.0;

/// Duration of the frequency ramp and the held gain (seconds)
const SWEEP_S: f64 = 4.0;

/// Time at which the fade-out reaches silence (seconds)
const END_S: f64 = 5.0;

/// Voice gain while sweeping
const LEVEL: f64 = 0.1;

/// One sweep in flight
#[derive(Debug, Clone)]
pub struct SawSweep {
    phase: f64,
    elapsed_s: f64,
    sample_period_s: f64,
}

impl SawSweep {
    pub fn new(sample_rate: u32) -> Self {
        Self {
            phase: 0.0,
            elapsed_s: 0.0,
            sample_period_s: 1.0 / sample_rate as f64,
        }
    }

    /// Oscillator frequency at time `t` (seconds since trigger)
    pub fn frequency_at(t: f64) -> f64 {
        let progress = (t / SWEEP_S).clamp(0.0, 1.0);
        START_HZ + (END_HZ - START_HZ) * progress
    }

    /// Voice gain at time `t` (seconds since trigger)
    pub fn gain_at(t: f64) -> f64 {
        if t <= SWEEP_S {
            LEVEL
        } else if t < END_S {
            LEVEL * (END_S - t) / (END_S - SWEEP_S)
        } else {
            0.0
        }
    }

    pub fn is_finished(&self) -> bool {
        self.elapsed_s >= END_S
    }

    /// Add this voice into `out`
    pub fn mix_into(&mut self, out: &mut [f32]) {
        for sample in out.iter_mut() {
            if self.is_finished() {
                return;
            }
            let t = self.elapsed_s;
            let saw = 2.0 * self.phase - 1.0;
            *sample += (saw * Self::gain_at(t)) as f32;

            self.phase += Self::frequency_at(t) * self.sample_period_s;
            self.phase -= self.phase.floor();
            self.elapsed_s += self.sample_period_s;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_frequency_ramp() {
        assert_eq!(SawSweep::frequency_at(0.0), 220.0);
        assert_eq!(SawSweep::frequency_at(2.0), 990.0);
        assert_eq!(SawSweep::frequency_at(4.0), 1760.0);
        assert_eq!(SawSweep::frequency_at(4.5), 1760.0);
    }

    #[test]
    fn test_gain_envelope() {
        assert_eq!(SawSweep::gain_at(0.0), 0.1);
        assert_eq!(SawSweep::gain_at(4.0), 0.1);
        assert!((SawSweep::gain_at(4.5) - 0.05).abs() < 1e-12);
        assert_eq!(SawSweep::gain_at(5.0), 0.0);
    }

    #[test]
    fn test_sweep_finishes_after_five_seconds() {
        let sample_rate = 8000;
        let mut sweep = SawSweep::new(sample_rate);
        let mut block = vec![0.0f32; sample_rate as usize];

        for _ in 0..5 {
            assert!(!sweep.is_finished());
            block.fill(0.0);
            sweep.mix_into(&mut block);
            assert!(block.iter().all(|s| s.abs() <= 0.1 + 1e-6));
        }
        // Float accumulation may leave a handful of samples
        block.fill(0.0);
        sweep.mix_into(&mut block[..16]);
        assert!(sweep.is_finished());
    }
}
