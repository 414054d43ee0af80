//! Multiplication-table sample source.

use crate::envelope::Envelope;
use crate::source::{EventSource, SourceFactory};

/// Error payload for keys that are not numbers.
pub const NOT_A_NUMBER: &str = "Expected multiplicand to be a number";
/// Error payload for a product that no longer fits a finite float.
pub const OUT_OF_RANGE: &str = "Product is out of range";

/// Multiplication table for one multiplicand: yields `m*1, m*2, m*3, ...`.
///
/// ```
/// use socknet::MultiTable;
///
/// let mut table = MultiTable::new(3.0);
/// assert_eq!(table.next_value(), 3.0);
/// assert_eq!(table.next_value(), 6.0);
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct MultiTable {
    multiplicand: f64,
    multiplier: u64,
}

impl MultiTable {
    pub fn new(multiplicand: f64) -> Self {
        Self {
            multiplicand,
            multiplier: 0,
        }
    }

    /// Advances the multiplier, then returns the product.
    pub fn next_value(&mut self) -> f64 {
        self.multiplier += 1;
        self.multiplicand * self.multiplier as f64
    }

    pub fn multiplier(&self) -> u64 {
        self.multiplier
    }
}

impl EventSource for MultiTable {
    fn fetch(&mut self) -> Envelope {
        let value = self.next_value();
        if value.is_finite() {
            Envelope::data(value)
        } else {
            Envelope::error(OUT_OF_RANGE)
        }
    }
}

/// Factory building a [`MultiTable`] from a numeric topic key.
#[derive(Debug, Default, Clone, Copy)]
pub struct MultiTableSource;

impl MultiTableSource {
    /// Parses a topic key as a number: keys containing `.` as floats,
    /// everything else as integers.
    ///
    /// Integers past the `i64` range are accepted and rounded to the nearest
    /// float.
    pub fn parse_key(key: &str) -> Option<f64> {
        let key = key.trim();
        if key.contains('.') {
            return key.parse::<f64>().ok().filter(|m| m.is_finite());
        }
        if let Ok(m) = key.parse::<i64>() {
            return Some(m as f64);
        }
        let digits = key.strip_prefix(|c: char| c == '+' || c == '-').unwrap_or(key);
        if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
            return None;
        }
        key.parse::<f64>().ok().filter(|m| m.is_finite())
    }
}

impl SourceFactory for MultiTableSource {
    fn create(&self, key: &str) -> Result<Box<dyn EventSource>, Envelope> {
        match Self::parse_key(key) {
            Some(m) => Ok(Box::new(MultiTable::new(m))),
            None => Err(Envelope::error(NOT_A_NUMBER)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::SourceMap;
    use serde_json::json;
    use std::sync::Arc;

    #[test]
    fn first_fetch_is_one_step_in() {
        let mut table = MultiTable::new(4.0);
        assert_eq!(table.multiplier(), 0);
        assert_eq!(table.fetch(), Envelope::data(4.0));
        assert_eq!(table.multiplier(), 1);
    }

    #[test]
    fn nth_fetch_is_m_times_n() {
        let mut table = MultiTable::new(2.5);
        let values: Vec<f64> = (0..4).map(|_| table.next_value()).collect();
        assert_eq!(values, vec![2.5, 5.0, 7.5, 10.0]);
    }

    #[test]
    fn key_parsing_follows_dot_rule() {
        assert_eq!(MultiTableSource::parse_key("3"), Some(3.0));
        assert_eq!(MultiTableSource::parse_key("-2"), Some(-2.0));
        assert_eq!(MultiTableSource::parse_key("2.5"), Some(2.5));
        assert_eq!(MultiTableSource::parse_key("1e3"), None);
        assert_eq!(MultiTableSource::parse_key("abc"), None);
        assert_eq!(MultiTableSource::parse_key(""), None);
    }

    #[test]
    fn integers_past_i64_are_still_numbers() {
        assert_eq!(
            MultiTableSource::parse_key("100000000000000000000"),
            Some(1e20)
        );
        assert_eq!(
            MultiTableSource::parse_key("-100000000000000000000"),
            Some(-1e20)
        );
        assert_eq!(MultiTableSource::parse_key("+"), None);
        assert_eq!(MultiTableSource::parse_key("12a"), None);
    }

    #[test]
    fn overflowing_product_is_an_error_not_null() {
        let map = SourceMap::new(Arc::new(MultiTableSource));
        assert_eq!(map.fetch("1.5e308").data, json!(1.5e308));
        assert_eq!(map.fetch("1.5e308"), Envelope::error(OUT_OF_RANGE));
    }

    #[test]
    fn non_numeric_key_yields_error_payload() {
        let map = SourceMap::new(Arc::new(MultiTableSource));
        let env = map.fetch("topic.x");
        assert_eq!(env, Envelope::error(NOT_A_NUMBER));
        assert!(map.is_empty());
    }

    #[test]
    fn map_streams_table_per_key() {
        let map = SourceMap::new(Arc::new(MultiTableSource));
        assert_eq!(map.fetch("3").data, json!(3.0));
        assert_eq!(map.fetch("3").data, json!(6.0));
        assert_eq!(map.fetch("5").data, json!(5.0));
        assert_eq!(map.fetch("3").data, json!(9.0));
    }
}
