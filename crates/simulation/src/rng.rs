/// Modulus of the linear-congruential generator.
const LCG_MODULUS: u64 = 233_280;
const LCG_MULTIPLIER: u64 = 9_301;
const LCG_INCREMENT: u64 = 49_297;

/// A small deterministic generator for scenario simulation.
///
/// The seed string is folded into a 32-bit state with the classic
/// `hash * 31 + code_unit` string hash (over UTF-16 code units), and every draw
/// advances a linear-congruential step. The same seed always yields the same
/// sequence on every platform. This is not a statistical-quality generator and
/// must never be used for anything security related.
#[derive(Debug, Clone)]
pub struct SeededRng {
    state: u64,
}

impl SeededRng {
    pub fn from_seed(seed: &str) -> Self {
        let hash = seed
            .encode_utf16()
            .fold(0i32, |hash, unit| hash.wrapping_mul(31).wrapping_add(unit as i32));
        Self {
            state: u64::from(hash.unsigned_abs()) % LCG_MODULUS,
        }
    }

    /// Next value in `[0, 1)`.
    pub fn next_f64(&mut self) -> f64 {
        self.state = (self.state * LCG_MULTIPLIER + LCG_INCREMENT) % LCG_MODULUS;
        self.state as f64 / LCG_MODULUS as f64
    }

    /// Next value in `[-1, 1)`.
    pub fn next_signed(&mut self) -> f64 {
        self.next_f64() * 2.0 - 1.0
    }
}
