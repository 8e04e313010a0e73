use crate::Generator;
use rand::Rng;
use snip_core::shortcode::{ALPHABET, LENGTH};
use snip_core::ShortCode;

/// Samples six characters uniformly, with replacement, from `[A-Za-z0-9]`.
///
/// Uses the thread-local RNG, so one instance can be shared freely between
/// concurrent store operations.
#[derive(Debug, Clone, Copy, Default)]
pub struct RandomGenerator;

impl RandomGenerator {
    pub fn new() -> Self {
        Self
    }
}

impl Generator for RandomGenerator {
    type Output = ShortCode;

    fn generate(&self) -> ShortCode {
        let mut rng = rand::rng();
        let code: String = (0..LENGTH)
            .map(|_| ALPHABET[rng.random_range(0..ALPHABET.len())] as char)
            .collect();
        ShortCode::new_unchecked(code)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn generates_valid_codes() {
        let generator = RandomGenerator::new();
        for _ in 0..1_000 {
            let code = generator.generate();
            assert!(ShortCode::new(code.as_str()).is_ok(), "invalid code {code}");
        }
    }

    #[test]
    fn codes_are_spread_out() {
        let generator = RandomGenerator::new();
        let codes: HashSet<_> = (0..1_000).map(|_| generator.generate()).collect();
        // 1000 draws from 62^6 should essentially never repeat.
        assert!(codes.len() > 990);
    }

    #[test]
    fn generator_is_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<RandomGenerator>();
    }

    #[test]
    fn shared_across_threads() {
        let generator = std::sync::Arc::new(RandomGenerator::new());
        let handles: Vec<_> = (0..4)
            .map(|_| {
                let generator = std::sync::Arc::clone(&generator);
                std::thread::spawn(move || generator.generate())
            })
            .collect();

        for handle in handles {
            assert_eq!(handle.join().unwrap().as_str().len(), LENGTH);
        }
    }
}
