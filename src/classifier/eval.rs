//! Evaluation measures: precision/recall counts and confusion matrices.

use std::collections::BTreeSet;
use std::fmt;

use serde::{Deserialize, Serialize};

/// Scalar measure derived from precision/recall counts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Measure {
    Precision,
    Recall,
    F1,
    Accuracy,
}

/// True positive, false positive and false negative counts.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PrecisionRecall {
    pub tp: u64,
    pub fp: u64,
    pub fn_: u64,
    /// True negatives, when known; only accuracy uses them.
    pub tn: u64,
}

impl PrecisionRecall {
    pub fn new(tp: u64, fp: u64, fn_: u64) -> Self {
        Self {
            tp,
            fp,
            fn_,
            tn: 0,
        }
    }

    /// Accumulate counts.
    pub fn add(&mut self, tp: u64, fp: u64, fn_: u64) {
        self.tp += tp;
        self.fp += fp;
        self.fn_ += fn_;
    }

    pub fn precision(&self) -> f64 {
        ratio(self.tp, self.tp + self.fp)
    }

    pub fn recall(&self) -> f64 {
        ratio(self.tp, self.tp + self.fn_)
    }

    pub fn f1(&self) -> f64 {
        let (p, r) = (self.precision(), self.recall());
        if p + r == 0.0 { 0.0 } else { 2.0 * p * r / (p + r) }
    }

    pub fn accuracy(&self) -> f64 {
        ratio(self.tp + self.tn, self.tp + self.tn + self.fp + self.fn_)
    }

    pub fn measure(&self, measure: Measure) -> f64 {
        match measure {
            Measure::Precision => self.precision(),
            Measure::Recall => self.recall(),
            Measure::F1 => self.f1(),
            Measure::Accuracy => self.accuracy(),
        }
    }
}

impl std::ops::AddAssign for PrecisionRecall {
    fn add_assign(&mut self, other: Self) {
        self.tp += other.tp;
        self.fp += other.fp;
        self.fn_ += other.fn_;
        self.tn += other.tn;
    }
}

impl fmt::Display for PrecisionRecall {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "p={:.3} r={:.3} f1={:.3} (tp={} fp={} fn={})",
            self.precision(),
            self.recall(),
            self.f1(),
            self.tp,
            self.fp,
            self.fn_
        )
    }
}

fn ratio(num: u64, den: u64) -> f64 {
    if den == 0 { 0.0 } else { num as f64 / den as f64 }
}

/// Set-level agreement between gold and predicted item sets.
///
/// Counts overlapping items like [`PrecisionRecall`] and also tracks how many
/// predicted sets match their gold set exactly.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SetPrecisionRecall {
    pub items: PrecisionRecall,
    pub exact: u64,
    pub total: u64,
}

impl SetPrecisionRecall {
    pub fn add<T: Ord>(&mut self, gold: &BTreeSet<T>, predicted: &BTreeSet<T>) {
        let tp = gold.intersection(predicted).count() as u64;
        self.items.add(
            tp,
            predicted.len() as u64 - tp,
            gold.len() as u64 - tp,
        );
        self.total += 1;
        if gold == predicted {
            self.exact += 1;
        }
    }

    /// Fraction of sets reproduced exactly.
    pub fn exact_ratio(&self) -> f64 {
        ratio(self.exact, self.total)
    }
}

impl fmt::Display for SetPrecisionRecall {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} exact={}/{} ({:.3})",
            self.items,
            self.exact,
            self.total,
            self.exact_ratio()
        )
    }
}

/// Binary confusion matrix indexed by `[gold][predicted]`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConfusionMatrix {
    counts: [[u64; 2]; 2],
}

impl ConfusionMatrix {
    pub fn add(&mut self, gold: u8, predicted: u8) {
        self.counts[usize::from(gold.min(1))][usize::from(predicted.min(1))] += 1;
    }

    pub fn count(&self, gold: u8, predicted: u8) -> u64 {
        self.counts[usize::from(gold.min(1))][usize::from(predicted.min(1))]
    }

    pub fn total(&self) -> u64 {
        self.counts.iter().flatten().sum()
    }

    /// Precision/recall counts treating `label` as the positive class.
    pub fn precision_recall(&self, label: u8) -> PrecisionRecall {
        let pos = usize::from(label.min(1));
        let neg = 1 - pos;
        PrecisionRecall {
            tp: self.counts[pos][pos],
            fp: self.counts[neg][pos],
            fn_: self.counts[pos][neg],
            tn: self.counts[neg][neg],
        }
    }

    pub fn accuracy(&self) -> f64 {
        ratio(self.counts[0][0] + self.counts[1][1], self.total())
    }
}

impl std::ops::AddAssign for ConfusionMatrix {
    fn add_assign(&mut self, other: Self) {
        for (row, other_row) in self.counts.iter_mut().zip(other.counts) {
            for (cell, other_cell) in row.iter_mut().zip(other_row) {
                *cell += other_cell;
            }
        }
    }
}

impl fmt::Display for ConfusionMatrix {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "gold\\pred {:>8} {:>8}", 0, 1)?;
        for (gold, row) in self.counts.iter().enumerate() {
            writeln!(f, "{gold:>9} {:>8} {:>8}", row[0], row[1])?;
        }
        for label in [0, 1] {
            writeln!(f, "label {label}: {}", self.precision_recall(label))?;
        }
        write!(f, "accuracy: {:.3}", self.accuracy())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn precision_recall_measures() {
        let pr = PrecisionRecall::new(3, 1, 2);
        assert!((pr.precision() - 0.75).abs() < 1e-9);
        assert!((pr.recall() - 0.6).abs() < 1e-9);
        assert!((pr.f1() - 2.0 * 0.75 * 0.6 / 1.35).abs() < 1e-9);
        assert_eq!(PrecisionRecall::default().f1(), 0.0);
    }

    #[test]
    fn confusion_matrix_per_label() {
        let mut m = ConfusionMatrix::default();
        m.add(1, 1);
        m.add(1, 0);
        m.add(0, 0);
        m.add(0, 0);
        let pos = m.precision_recall(1);
        assert_eq!((pos.tp, pos.fp, pos.fn_, pos.tn), (1, 0, 1, 2));
        assert!((m.accuracy() - 0.75).abs() < 1e-9);
        assert!(m.to_string().contains("accuracy"));
    }

    #[test]
    fn set_agreement() {
        let mut spr = SetPrecisionRecall::default();
        spr.add(&BTreeSet::from([1, 2]), &BTreeSet::from([1, 2]));
        spr.add(&BTreeSet::from([3, 4]), &BTreeSet::from([4, 5]));
        assert_eq!(spr.exact, 1);
        assert_eq!(spr.items, PrecisionRecall::new(3, 1, 1));
    }
}
