use crate::Generator;
use snip_core::ShortCode;
use std::sync::atomic::{AtomicUsize, Ordering};

/// A generator that replays a fixed list of codes, wrapping around at the end.
///
/// Useful wherever the exact codes matter, e.g. to force a collision by
/// scripting the same code twice.
#[derive(Debug)]
pub struct ScriptedGenerator {
    cursor: AtomicUsize,
    codes: Vec<ShortCode>,
}

impl ScriptedGenerator {
    /// Creates a generator replaying `codes` in order.
    ///
    /// # Panics
    ///
    /// Panics if `codes` is empty.
    pub fn new<I, S>(codes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let codes: Vec<_> = codes.into_iter().map(ShortCode::new_unchecked).collect();
        assert!(!codes.is_empty(), "scripted generator needs at least one code");
        Self {
            cursor: AtomicUsize::new(0),
            codes,
        }
    }
}

impl Generator for ScriptedGenerator {
    type Output = ShortCode;

    fn generate(&self) -> ShortCode {
        let index = self.cursor.fetch_add(1, Ordering::SeqCst);
        self.codes[index % self.codes.len()].clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn replays_in_order() {
        let generator = ScriptedGenerator::new(["aaaaaa", "bbbbbb"]);

        assert_eq!(generator.generate().as_str(), "aaaaaa");
        assert_eq!(generator.generate().as_str(), "bbbbbb");
        assert_eq!(generator.generate().as_str(), "aaaaaa");
    }

    #[test]
    #[should_panic]
    fn rejects_empty_script() {
        let _ = ScriptedGenerator::new(Vec::<String>::new());
    }
}
