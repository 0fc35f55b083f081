//! Cosine-decay-with-restarts learning-rate schedule.

use std::fmt;

/// Learning rate as a pure function of the global step count.
///
/// Decays from `initial_lr` along a cosine curve over `first_decay_steps`
/// steps, then restarts. With `t_mul = 1` every period has the same length,
/// so restarts land at exact multiples of `first_decay_steps`; `t_mul > 1`
/// stretches each successive period by that factor, and `m_mul` scales each
/// restart's peak. The rate never drops below `alpha * initial_lr`.
#[derive(Debug, Clone, PartialEq)]
pub struct CosineDecayRestarts {
    initial_lr: f64,
    first_decay_steps: usize,
    t_mul: f64,
    m_mul: f64,
    alpha: f64,
}

impl CosineDecayRestarts {
    /// Create a schedule.
    ///
    /// # Panics
    /// Panics if `first_decay_steps` is 0 or `t_mul < 1`.
    pub fn new(
        initial_lr: f64,
        first_decay_steps: usize,
        t_mul: f64,
        m_mul: f64,
        alpha: f64,
    ) -> Self {
        assert!(first_decay_steps > 0, "first_decay_steps must be positive");
        assert!(t_mul >= 1.0, "t_mul must be >= 1, got {t_mul}");
        Self {
            initial_lr,
            first_decay_steps,
            t_mul,
            m_mul,
            alpha,
        }
    }

    /// The learning rate at `step`.
    pub fn lr_at(&self, step: usize) -> f64 {
        let t = step as f64 / self.first_decay_steps as f64;

        // Locate the current restart period and the fraction completed in it.
        let (i_restart, fraction) = if (self.t_mul - 1.0).abs() < f64::EPSILON {
            let i = t.floor();
            (i, t - i)
        } else {
            // Periods form a geometric series; invert it to find the index.
            let i = ((1.0 - t * (1.0 - self.t_mul)).ln() / self.t_mul.ln()).floor();
            let elapsed = (1.0 - self.t_mul.powf(i)) / (1.0 - self.t_mul);
            (i, (t - elapsed) / self.t_mul.powf(i))
        };

        let m_fac = self.m_mul.powf(i_restart);
        let cosine_decayed = 0.5 * m_fac * (1.0 + (std::f64::consts::PI * fraction).cos());
        let decayed = (1.0 - self.alpha) * cosine_decayed + self.alpha;
        self.initial_lr * decayed
    }
}

impl fmt::Display for CosineDecayRestarts {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "CosineDecayRestarts(initial_lr={}, first_decay_steps={}, t_mul={}, m_mul={}, alpha={})",
            self.initial_lr, self.first_decay_steps, self.t_mul, self.m_mul, self.alpha
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn default_schedule() -> CosineDecayRestarts {
        CosineDecayRestarts::new(0.001, 5000, 1.0, 1.0, 0.1)
    }

    #[test]
    fn test_initial_rate_at_step_zero() {
        let schedule = default_schedule();
        assert!((schedule.lr_at(0) - 0.001).abs() < 1e-12);
    }

    #[test]
    fn test_restart_at_period_multiples() {
        let schedule = default_schedule();
        for step in [5000, 10000, 15000, 50000] {
            let lr = schedule.lr_at(step);
            assert!(
                (lr - 0.001).abs() < 1e-12,
                "expected restart to initial rate at step {step}, got {lr}"
            );
        }
        // Just before a restart the rate sits at the floor.
        let before = schedule.lr_at(4999);
        assert!(before < schedule.lr_at(5000));
    }

    #[test]
    fn test_bounded_below_by_alpha() {
        let schedule = default_schedule();
        let floor = 0.1 * 0.001;
        for step in (0..20000).step_by(13) {
            let lr = schedule.lr_at(step);
            assert!(
                lr >= floor - 1e-15,
                "lr {lr} fell below floor {floor} at step {step}"
            );
            assert!(lr <= 0.001 + 1e-15);
        }
    }

    #[test]
    fn test_midpoint_of_first_period() {
        // fraction = 0.5 -> cosine term 0.5 -> decayed = 0.9 * 0.5 + 0.1
        let schedule = default_schedule();
        let expected = 0.001 * (0.9 * 0.5 + 0.1);
        assert!((schedule.lr_at(2500) - expected).abs() < 1e-9);
    }

    #[test]
    fn test_t_mul_stretches_periods() {
        let schedule = CosineDecayRestarts::new(0.001, 5000, 2.0, 1.0, 0.1);
        // First restart after 5000 steps, second after 5000 + 10000.
        assert!((schedule.lr_at(5000) - 0.001).abs() < 1e-9);
        assert!((schedule.lr_at(15000) - 0.001).abs() < 1e-9);
        // Step 10000 is mid-second-period, not a restart.
        let mid = schedule.lr_at(10000);
        assert!(mid < 0.001 - 1e-6, "step 10000 should be mid-decay, got {mid}");
    }

    #[test]
    fn test_m_mul_scales_restart_peaks() {
        let schedule = CosineDecayRestarts::new(0.001, 5000, 1.0, 0.5, 0.0);
        assert!((schedule.lr_at(0) - 0.001).abs() < 1e-12);
        assert!((schedule.lr_at(5000) - 0.0005).abs() < 1e-9);
        assert!((schedule.lr_at(10000) - 0.00025).abs() < 1e-9);
    }

    #[test]
    #[should_panic]
    fn test_zero_period_rejected() {
        let _ = CosineDecayRestarts::new(0.001, 0, 1.0, 1.0, 0.1);
    }
}
