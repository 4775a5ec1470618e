use rand::Rng;

/// Laplace-mechanism differential privacy (§4.G). `scale = sensitivity /
/// epsilon`; each publication draws independent noise, so the accountant
/// below tracks budget spent rather than the mechanism itself.
#[derive(Debug, Clone, Copy)]
pub struct LaplaceMechanism {
    epsilon: f64,
    sensitivity: f64,
}

impl LaplaceMechanism {
    pub fn new(epsilon: f64, sensitivity: f64) -> Self {
        Self { epsilon, sensitivity }
    }

    fn scale(&self) -> f64 {
        self.sensitivity / self.epsilon
    }

    /// Draws `eta ~ Laplace(0, sensitivity/epsilon)` and returns `max(0,
    /// utility + eta)`. The clamp biases the published value upward in
    /// expectation for small utilities; this is a known property of
    /// applying Laplace DP to a non-negative quantity, not a defect to fix.
    pub fn perturb(&self, utility: u64, rng: &mut impl Rng) -> u64 {
        let eta = sample_laplace(self.scale(), rng);
        let published = utility as f64 + eta;
        published.max(0.0).round() as u64
    }
}

fn sample_laplace(scale: f64, rng: &mut impl Rng) -> f64 {
    // Inverse-CDF sampling: u ~ Uniform(-0.5, 0.5), x = -scale * sign(u) * ln(1 - 2|u|).
    let u: f64 = rng.random_range(-0.5..0.5);
    -scale * u.signum() * (1.0 - 2.0 * u.abs()).ln()
}

/// Tracks cumulative epsilon spent across rounds and clients (§4.G: "the
/// system publishes cumulative epsilon").
#[derive(Debug, Clone, Copy, Default)]
pub struct PrivacyBudget {
    consumed: f64,
}

impl PrivacyBudget {
    pub fn new() -> Self {
        Self::default()
    }

    /// Advances the running total by `epsilon` for one client in one round.
    pub fn spend(&mut self, epsilon: f64) {
        self.consumed += epsilon;
    }

    pub fn consumed(&self) -> f64 {
        self.consumed
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::SmallRng;
    use rand::SeedableRng;

    #[test]
    fn published_utility_is_never_negative() {
        let mechanism = LaplaceMechanism::new(0.1, 5.0);
        let mut rng = SmallRng::seed_from_u64(7);
        for _ in 0..1000 {
            let published = mechanism.perturb(0, &mut rng);
            assert!(published as i64 >= 0);
        }
    }

    #[test]
    fn budget_accumulates_across_spends() {
        let mut budget = PrivacyBudget::new();
        budget.spend(0.5);
        budget.spend(0.25);
        assert!((budget.consumed() - 0.75).abs() < 1e-9);
    }

    #[test]
    fn larger_epsilon_shrinks_expected_noise_magnitude() {
        let mut rng = SmallRng::seed_from_u64(42);
        let tight = LaplaceMechanism::new(5.0, 1.0);
        let loose = LaplaceMechanism::new(0.05, 1.0);

        let tight_spread: i64 = (0..200).map(|_| (tight.perturb(1000, &mut rng) as i64 - 1000).abs()).sum();
        let loose_spread: i64 = (0..200).map(|_| (loose.perturb(1000, &mut rng) as i64 - 1000).abs()).sum();
        assert!(tight_spread < loose_spread);
    }
}
