const SEED: u128 = 0x246C_CB2D_3B40_2853_9918_0A6D_BC3A_F444;

/// A small xorshift generator, usable in const contexts.
#[derive(Clone, Debug)]
pub struct XorShiftState {
    state: u128,
}

impl XorShiftState {
    pub const fn new() -> Self {
        Self { state: SEED }
    }

    /// A generator whose stream is decorrelated from the default one by `salt`.
    pub const fn with_salt(salt: u64) -> Self {
        let mut state = SEED ^ ((salt as u128) << 64 | salt as u128);
        if state == 0 {
            state = SEED;
        }
        Self { state }
    }

    /// Generates the next random number in the sequence, consuming self
    /// This is done to allow for const evaluation.
    pub const fn next_self(mut self) -> (u64, Self) {
        let mut x = self.state;
        x ^= x >> 12;
        x ^= x << 25;
        x ^= x >> 27;
        self.state = x;
        #[allow(clippy::cast_possible_truncation)]
        let r = x as u64; // truncation is the intended behavior here.
        let r = r ^ (x >> 64) as u64; // add in the high bits.
        (r, self)
    }

    /// Generates the next random number in the sequence.
    pub fn next_u64(&mut self) -> u64 {
        let (r, next) = self.clone().next_self();
        *self = next;
        r
    }

    /// Generates a random number with only a few bits set.
    /// This will advance the generator by three steps.
    pub fn random_few_bits(&mut self) -> u64 {
        self.next_u64() & self.next_u64() & self.next_u64()
    }
}

impl Default for XorShiftState {
    fn default() -> Self {
        Self::new()
    }
}
