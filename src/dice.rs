/// Source of randomness for every probabilistic decision the pet makes.
///
/// Production uses `fastrand::Rng`; tests script the draws.
pub trait Dice {
    /// Uniform draw in `[0, 1)`.
    fn unit(&mut self) -> f64;

    /// `true` with probability `p`.
    fn chance(&mut self, p: f64) -> bool {
        self.unit() < p
    }

    /// Uniform integer in `lo..=hi`.
    fn pick(&mut self, lo: u32, hi: u32) -> u32 {
        let span = (hi - lo + 1) as f64;
        (lo + (self.unit() * span).floor() as u32).min(hi)
    }

    /// Uniform float in `[lo, hi)`.
    fn between(&mut self, lo: f64, hi: f64) -> f64 {
        lo + self.unit() * (hi - lo)
    }
}

impl Dice for fastrand::Rng {
    fn unit(&mut self) -> f64 {
        self.f64()
    }

    fn pick(&mut self, lo: u32, hi: u32) -> u32 {
        self.u32(lo..=hi)
    }
}
