//! Feature/label association statistics for training-set analysis.

use std::collections::BTreeMap;
use std::fmt::Write as _;

use crate::features::LabeledVector;

/// Occurrence counts of one feature per label, with its chi-square score.
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureStat {
    pub name: String,
    /// Number of vectors containing the feature, by label.
    pub counts: [u64; 2],
    pub chi_square: f64,
}

/// Compute statistics for every learnable feature, strongest association first.
pub fn feature_stats(examples: &[LabeledVector]) -> Vec<FeatureStat> {
    let mut totals = [0u64; 2];
    let mut counts: BTreeMap<&str, [u64; 2]> = BTreeMap::new();
    for example in examples {
        let label = usize::from(example.label.min(1));
        totals[label] += 1;
        for (name, _) in example.vector.learnable() {
            counts.entry(name).or_default()[label] += 1;
        }
    }

    let mut stats: Vec<FeatureStat> = counts
        .into_iter()
        .map(|(name, counts)| FeatureStat {
            name: name.to_string(),
            counts,
            chi_square: chi_square(counts, totals),
        })
        .collect();
    stats.sort_by(|a, b| b.chi_square.total_cmp(&a.chi_square));
    stats
}

/// 2x2 chi-square of feature presence against the label.
fn chi_square(present: [u64; 2], totals: [u64; 2]) -> f64 {
    let a = present[1] as f64;
    let b = present[0] as f64;
    let c = (totals[1] - present[1]) as f64;
    let d = (totals[0] - present[0]) as f64;
    let n = a + b + c + d;
    let den = (a + b) * (c + d) * (a + c) * (b + d);
    if den == 0.0 {
        0.0
    } else {
        n * (a * d - b * c).powi(2) / den
    }
}

/// Render the `limit` strongest features as a table.
pub fn format_top(stats: &[FeatureStat], limit: usize) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "{:>10} {:>8} {:>8}  feature", "chi2", "neg", "pos");
    for stat in stats.iter().take(limit) {
        let _ = writeln!(
            out,
            "{:>10.3} {:>8} {:>8}  {}",
            stat.chi_square, stat.counts[0], stat.counts[1], stat.name
        );
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::features::FeatureVector;

    fn example(features: &[&str], label: u8) -> LabeledVector {
        let mut b = FeatureVector::builder();
        for f in features {
            b.set(*f);
        }
        b.build().label(label)
    }

    #[test]
    fn discriminative_features_rank_first() {
        let examples = vec![
            example(&["named", "common"], 1),
            example(&["named", "common"], 1),
            example(&["common"], 0),
            example(&["common", "_cluster.x"], 0),
        ];
        let stats = feature_stats(&examples);
        assert_eq!(stats[0].name, "named");
        assert_eq!(stats[0].counts, [0, 2]);
        assert!(stats[0].chi_square > stats[1].chi_square);
        assert!(stats.iter().all(|s| !s.name.starts_with('_')));
        assert!(format_top(&stats, 1).contains("named"));
    }
}
