//! Observed value storage and the summaries derived from it

use std::collections::{HashMap, HashSet};

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::classify::{TypeTag, date_value, numeric_value};
use super::config::InferenceConfig;

/// Every raw value observed for one type of one field, in arrival order.
///
/// Values are never deduplicated or evicted. The distinct count is only
/// needed at commit time, so it is recomputed there rather than maintained
/// on every push.
#[derive(Debug, Clone, Default)]
pub struct ValueStore {
    values: Vec<Value>,
    unique: usize,
}

impl ValueStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn push(&mut self, value: Value) {
        self.values.push(value);
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Value> {
        self.values.iter()
    }

    pub fn as_slice(&self) -> &[Value] {
        &self.values
    }

    /// Distinct values as of the last commit
    pub fn unique(&self) -> usize {
        self.unique
    }

    /// Recompute the distinct count
    pub(crate) fn finalize(&mut self) {
        let distinct: HashSet<String> = self.values.iter().map(canonical).collect();
        self.unique = distinct.len();
    }

    /// Derive the type-specific summary for values of `tag`
    pub(crate) fn summarize(&self, tag: TypeTag, config: &InferenceConfig) -> Option<ValueSummary> {
        if self.values.is_empty() {
            return None;
        }
        match tag {
            t if t.is_numeric() => {
                let numbers: Vec<f64> = self
                    .values
                    .iter()
                    .filter_map(|v| numeric_value(tag, v))
                    // NaN and the infinities have no JSON representation
                    .filter(|n| n.is_finite())
                    .collect();
                numeric_summary(&numbers, config.compute_median)
            }
            TypeTag::String if config.string_frequencies => Some(frequency_summary(&self.values)),
            TypeTag::Date => {
                let dates: Vec<DateTime<Utc>> = self.values.iter().filter_map(date_value).collect();
                let earliest = dates.iter().min()?;
                let latest = dates.iter().max()?;
                Some(ValueSummary::DateRange {
                    earliest: earliest.to_rfc3339_opts(SecondsFormat::Millis, true),
                    latest: latest.to_rfc3339_opts(SecondsFormat::Millis, true),
                })
            }
            _ => None,
        }
    }
}

/// Type-specific aggregate over a value store
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ValueSummary {
    /// Number, Double and Long
    Numeric {
        min: f64,
        max: f64,
        mean: f64,
        #[serde(skip_serializing_if = "Option::is_none")]
        median: Option<f64>,
    },
    /// String values by descending occurrence, ties in first-seen order
    Frequencies { values: Vec<String>, counts: Vec<usize> },
    /// Date bounds as RFC 3339 UTC timestamps
    DateRange { earliest: String, latest: String },
}

fn numeric_summary(numbers: &[f64], with_median: bool) -> Option<ValueSummary> {
    if numbers.is_empty() {
        return None;
    }
    let (min, max, sum) = numbers.iter().fold(
        (f64::INFINITY, f64::NEG_INFINITY, 0.0),
        |(min, max, sum), &n| (min.min(n), max.max(n), sum + n),
    );
    Some(ValueSummary::Numeric {
        min,
        max,
        mean: sum / numbers.len() as f64,
        median: if with_median { median(numbers) } else { None },
    })
}

/// Median over a sorted copy; the stored sample keeps its arrival order.
fn median(numbers: &[f64]) -> Option<f64> {
    if numbers.is_empty() {
        return None;
    }
    let mut sorted = numbers.to_vec();
    sorted.sort_by(f64::total_cmp);
    let mid = sorted.len() / 2;
    if sorted.len() % 2 == 0 {
        Some((sorted[mid - 1] + sorted[mid]) / 2.0)
    } else {
        Some(sorted[mid])
    }
}

fn frequency_summary(values: &[Value]) -> ValueSummary {
    let mut order: Vec<(String, usize)> = Vec::new();
    let mut index: HashMap<&str, usize> = HashMap::new();
    for text in values.iter().filter_map(Value::as_str) {
        match index.get(text) {
            Some(&i) => order[i].1 += 1,
            None => {
                index.insert(text, order.len());
                order.push((text.to_string(), 1));
            }
        }
    }
    // Stable sort keeps first-seen order among equal counts
    order.sort_by(|a, b| b.1.cmp(&a.1));
    let (values, counts) = order.into_iter().unzip();
    ValueSummary::Frequencies { values, counts }
}

/// Canonical rendering used for equality of raw values
pub(crate) fn canonical(value: &Value) -> String {
    value.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn store(values: &[Value]) -> ValueStore {
        let mut store = ValueStore::new();
        for v in values {
            store.push(v.clone());
        }
        store.finalize();
        store
    }

    #[test]
    fn test_unique_counts_distinct_values() {
        let s = store(&[json!(1), json!(2), json!(1), json!(3)]);
        assert_eq!(s.len(), 4);
        assert_eq!(s.unique(), 3);
    }

    #[test]
    fn test_unique_is_stale_until_finalize() {
        let mut s = store(&[json!("a")]);
        s.push(json!("b"));
        assert_eq!(s.unique(), 1);
        s.finalize();
        assert_eq!(s.unique(), 2);
    }

    #[test]
    fn test_numeric_summary() {
        let s = store(&[json!(4), json!(1), json!(7)]);
        let config = InferenceConfig::default();
        assert_eq!(
            s.summarize(TypeTag::Number, &config),
            Some(ValueSummary::Numeric {
                min: 1.0,
                max: 7.0,
                mean: 4.0,
                median: None
            })
        );
    }

    #[test]
    fn test_median_leaves_sample_order_untouched() {
        let s = store(&[json!(9), json!(1), json!(5), json!(3)]);
        let config = InferenceConfig::builder().compute_median(true).build();
        match s.summarize(TypeTag::Number, &config) {
            Some(ValueSummary::Numeric { median, .. }) => assert_eq!(median, Some(4.0)),
            other => panic!("Expected numeric summary, got {other:?}"),
        }
        assert_eq!(s.as_slice(), &[json!(9), json!(1), json!(5), json!(3)]);
    }

    #[test]
    fn test_long_summary_reads_markers() {
        let s = store(&[json!({"$numberLong": "10"}), json!({"$numberLong": "20"})]);
        match s.summarize(TypeTag::Long, &InferenceConfig::default()) {
            Some(ValueSummary::Numeric { min, max, mean, .. }) => {
                assert_eq!((min, max, mean), (10.0, 20.0, 15.0));
            }
            other => panic!("Expected numeric summary, got {other:?}"),
        }
    }

    #[test]
    fn test_non_finite_doubles_left_out_of_summary() {
        let s = store(&[
            json!({"$numberDouble": "NaN"}),
            json!({"$numberDouble": "2.5"}),
            json!({"$numberDouble": "Infinity"}),
            json!({"$numberDecimal": "-Infinity"}),
            json!(0.5),
        ]);
        assert_eq!(
            s.summarize(TypeTag::Double, &InferenceConfig::default()),
            Some(ValueSummary::Numeric {
                min: 0.5,
                max: 2.5,
                mean: 1.5,
                median: None
            })
        );
    }

    #[test]
    fn test_only_non_finite_doubles_have_no_summary() {
        let s = store(&[json!({"$numberDouble": "NaN"}), json!({"$numberDouble": "Infinity"})]);
        assert_eq!(s.summarize(TypeTag::Double, &InferenceConfig::default()), None);
        assert_eq!(s.unique(), 2);
    }

    #[test]
    fn test_string_frequencies_sorted_with_stable_ties() {
        let s = store(&[json!("b"), json!("a"), json!("c"), json!("a"), json!("c")]);
        assert_eq!(
            s.summarize(TypeTag::String, &InferenceConfig::default()),
            Some(ValueSummary::Frequencies {
                values: vec!["a".into(), "c".into(), "b".into()],
                counts: vec![2, 2, 1],
            })
        );
    }

    #[test]
    fn test_string_frequencies_can_be_disabled() {
        let s = store(&[json!("a")]);
        let config = InferenceConfig::builder().string_frequencies(false).build();
        assert_eq!(s.summarize(TypeTag::String, &config), None);
    }

    #[test]
    fn test_date_range() {
        let s = store(&[
            json!({"$date": "2024-03-01T00:00:00Z"}),
            json!({"$date": "2023-12-31T23:59:59Z"}),
        ]);
        assert_eq!(
            s.summarize(TypeTag::Date, &InferenceConfig::default()),
            Some(ValueSummary::DateRange {
                earliest: "2023-12-31T23:59:59.000Z".into(),
                latest: "2024-03-01T00:00:00.000Z".into(),
            })
        );
    }

    #[test]
    fn test_other_types_have_no_summary() {
        let s = store(&[json!(true)]);
        assert_eq!(s.summarize(TypeTag::Boolean, &InferenceConfig::default()), None);
    }
}
