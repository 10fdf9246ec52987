use std::sync::atomic::{AtomicU64, Ordering};

use chrono::Utc;

use super::value_objects::OrderNumber;

pub const ORDER_NUMBER_PREFIX: &str = "DK";
const SUFFIX_DIGITS: u32 = 6;

/// Issues `DK` + the last six digits of the current time in milliseconds.
///
/// The millisecond value only ever moves forward inside one generator, so two
/// numbers issued by the same process differ even when requested within the
/// same millisecond. Across processes (or after the six digits wrap) the
/// store's unique constraint catches collisions and creation retries.
#[derive(Debug)]
pub struct OrderNumberGenerator {
    last: AtomicU64,
}

impl Default for OrderNumberGenerator {
    fn default() -> Self {
        Self::new()
    }
}

impl OrderNumberGenerator {
    pub fn new() -> Self {
        Self { last: AtomicU64::new(0) }
    }

    /// Start as if `millis` had just been issued. Used to pin numbers in tests.
    pub fn starting_after(millis: u64) -> Self {
        Self { last: AtomicU64::new(millis) }
    }

    pub fn next(&self) -> OrderNumber {
        let now = Utc::now().timestamp_millis().max(0) as u64;
        let mut current = self.last.load(Ordering::Relaxed);

        loop {
            let candidate = now.max(current + 1);
            match self.last.compare_exchange_weak(current, candidate, Ordering::SeqCst, Ordering::Relaxed) {
                Ok(_) => return format_number(candidate),
                Err(actual) => current = actual,
            }
        }
    }
}

fn format_number(millis: u64) -> OrderNumber {
    let suffix = millis % 10u64.pow(SUFFIX_DIGITS);
    OrderNumber(format!("{ORDER_NUMBER_PREFIX}{suffix:06}"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;
    use std::sync::Arc;

    #[test]
    fn test_format() {
        let number = OrderNumberGenerator::new().next();
        assert!(number.as_str().starts_with("DK"));
        assert_eq!(number.as_str().len(), 8);
        assert!(number.as_str()[2..].chars().all(|c| c.is_ascii_digit()));
    }

    #[test]
    fn test_numbers_are_distinct_in_a_tight_loop() {
        let generator = OrderNumberGenerator::new();
        let numbers: HashSet<_> = (0..1000).map(|_| generator.next()).collect();
        assert_eq!(numbers.len(), 1000);
    }

    #[test]
    fn test_numbers_are_distinct_across_threads() {
        let generator = Arc::new(OrderNumberGenerator::new());
        let handles: Vec<_> = (0..4)
            .map(|_| {
                let generator = generator.clone();
                std::thread::spawn(move || (0..250).map(|_| generator.next()).collect::<Vec<_>>())
            })
            .collect();

        let mut all = HashSet::new();
        for handle in handles {
            for number in handle.join().unwrap() {
                assert!(all.insert(number));
            }
        }
        assert_eq!(all.len(), 1000);
    }

    #[test]
    fn test_starting_after_pins_sequence_in_the_future() {
        let far_future = Utc::now().timestamp_millis() as u64 + 10_000_000;
        let generator = OrderNumberGenerator::starting_after(far_future);

        let first = generator.next();
        let second = generator.next();
        assert_eq!(first, format_number(far_future + 1));
        assert_eq!(second, format_number(far_future + 2));
    }
}
