//! Parsed codeml site-model results.
//!
//! A [`ModelResult`] can only be obtained from the parser. Internally a model
//! section is walked through crate-private staged builders (header, class
//! table, sequence label, site rows) where each step consumes the previous
//! one, so a half-read section never escapes.
//!
//! ```compile_fail
//! let header = rst_reader::model::ModelHeader::new(1);
//! ```

use std::collections::BTreeMap;

#[cfg(feature = "serde")]
use serde::Serialize;

pub type ModelId = i64;

/// Id used when a report holds a single model without a `Model <n>:` header.
pub const SINGLE_MODEL_ID: ModelId = -1;

/// All models of one report, ordered by id.
pub type ReportResults = BTreeMap<ModelId, ModelResult>;

pub fn model_label(model_id: ModelId) -> String {
    if model_id == SINGLE_MODEL_ID {
        "Model unknown".to_string()
    } else {
        format!("Model {model_id}")
    }
}

/// Mixture weights ("p:") and dN/dS ratios ("w:") of the K site classes.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize))]
pub struct ClassTable {
    weights: Vec<f64>,
    ratios: Vec<f64>,
}

impl ClassTable {
    /// Returns `None` unless both rows hold the same, non-zero number of classes.
    pub fn new(weights: Vec<f64>, ratios: Vec<f64>) -> Option<Self> {
        if weights.is_empty() || weights.len() != ratios.len() {
            return None;
        }
        Some(Self { weights, ratios })
    }

    #[inline(always)]
    pub fn k(&self) -> usize {
        self.weights.len()
    }

    #[inline(always)]
    pub fn weights(&self) -> &[f64] {
        &self.weights
    }

    #[inline(always)]
    pub fn ratios(&self) -> &[f64] {
        &self.ratios
    }

    /// Probability-weighted mean of the class ratios.
    pub fn expected_ratio(&self, probabilities: &[f64]) -> f64 {
        probabilities
            .iter()
            .zip(self.ratios.iter())
            .map(|(p, w)| p * w)
            .sum()
    }
}

#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize))]
pub struct SiteRecord {
    position: usize,
    amino_acid: char,
    class_probabilities: Vec<f64>,
    mle_estimate: f64,
    annotation: String,
    expected_value: f64,
}

impl SiteRecord {
    #[inline(always)]
    pub fn position(&self) -> usize {
        self.position
    }

    #[inline(always)]
    pub fn amino_acid(&self) -> char {
        self.amino_acid
    }

    #[inline(always)]
    pub fn class_probabilities(&self) -> &[f64] {
        &self.class_probabilities
    }

    #[inline(always)]
    pub fn mle_estimate(&self) -> f64 {
        self.mle_estimate
    }

    pub fn annotation(&self) -> &str {
        &self.annotation
    }

    /// Weighted mean dN/dS at this site, fixed when the site table was closed.
    #[inline(always)]
    pub fn expected_value(&self) -> f64 {
        self.expected_value
    }
}

/// One row of the site table before the table is closed.
#[derive(Clone, Debug, PartialEq)]
pub(crate) struct SiteRow {
    pub(crate) position: usize,
    pub(crate) amino_acid: char,
    pub(crate) class_probabilities: Vec<f64>,
    pub(crate) mle_estimate: f64,
    pub(crate) annotation: String,
}

/// A model whose header has been read.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) struct ModelHeader {
    model_id: ModelId,
}

impl ModelHeader {
    pub(crate) fn new(model_id: ModelId) -> Self {
        Self { model_id }
    }

    pub(crate) fn model_id(&self) -> ModelId {
        self.model_id
    }

    pub(crate) fn with_classes(self, classes: ClassTable) -> ClassedModel {
        ClassedModel {
            model_id: self.model_id,
            classes,
        }
    }
}

/// A model whose class table has been read.
#[derive(Clone, Debug, PartialEq)]
pub(crate) struct ClassedModel {
    model_id: ModelId,
    classes: ClassTable,
}

impl ClassedModel {
    pub(crate) fn model_id(&self) -> ModelId {
        self.model_id
    }

    pub(crate) fn with_sequence_label(self, sequence_label: String) -> LabelledModel {
        LabelledModel {
            model_id: self.model_id,
            classes: self.classes,
            sequence_label,
            rows: Vec::new(),
        }
    }
}

/// A model collecting its site table.
#[derive(Clone, Debug, PartialEq)]
pub(crate) struct LabelledModel {
    model_id: ModelId,
    classes: ClassTable,
    sequence_label: String,
    rows: Vec<SiteRow>,
}

impl LabelledModel {
    pub(crate) fn model_id(&self) -> ModelId {
        self.model_id
    }

    pub(crate) fn k(&self) -> usize {
        self.classes.k()
    }

    /// Position the next row must carry.
    pub(crate) fn next_position(&self) -> usize {
        self.rows.len() + 1
    }

    /// Appends a row. The caller checks position and arity first.
    pub(crate) fn push_row(&mut self, row: SiteRow) {
        debug_assert_eq!(row.position, self.next_position());
        debug_assert_eq!(row.class_probabilities.len(), self.k());
        self.rows.push(row);
    }

    /// Closes the site table, computing every expected value, and records the
    /// log-likelihood.
    pub(crate) fn finish(self, log_likelihood: f64) -> ModelResult {
        let classes = self.classes;
        let sites = self
            .rows
            .into_iter()
            .map(|row| SiteRecord {
                expected_value: classes.expected_ratio(&row.class_probabilities),
                position: row.position,
                amino_acid: row.amino_acid,
                class_probabilities: row.class_probabilities,
                mle_estimate: row.mle_estimate,
                annotation: row.annotation,
            })
            .collect();
        ModelResult {
            model_id: self.model_id,
            classes,
            sequence_label: self.sequence_label,
            sites,
            log_likelihood,
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize))]
pub struct ModelResult {
    model_id: ModelId,
    classes: ClassTable,
    sequence_label: String,
    sites: Vec<SiteRecord>,
    log_likelihood: f64,
}

impl ModelResult {
    pub fn model_id(&self) -> ModelId {
        self.model_id
    }

    pub fn display_label(&self) -> String {
        model_label(self.model_id)
    }

    pub fn k(&self) -> usize {
        self.classes.k()
    }

    pub fn class_weights(&self) -> &[f64] {
        self.classes.weights()
    }

    pub fn class_ratios(&self) -> &[f64] {
        self.classes.ratios()
    }

    pub fn sequence_label(&self) -> &str {
        &self.sequence_label
    }

    pub fn sites(&self) -> &[SiteRecord] {
        &self.sites
    }

    pub fn log_likelihood(&self) -> f64 {
        self.log_likelihood
    }

    pub fn amino_acids(&self) -> String {
        self.sites.iter().map(|s| s.amino_acid).collect()
    }

    pub fn expected_values(&self) -> Vec<f64> {
        self.sites.iter().map(|s| s.expected_value).collect()
    }

    pub fn mean_expected_value(&self) -> Option<f64> {
        if self.sites.is_empty() {
            return None;
        }
        let total: f64 = self.sites.iter().map(|s| s.expected_value).sum();
        Some(total / self.sites.len() as f64)
    }

    /// Site probabilities transposed to one layer per class, in class order.
    /// Stacking the layers gives the per-site posterior bar chart.
    pub fn class_probability_layers(&self) -> Vec<Vec<f64>> {
        (0..self.k())
            .map(|class| {
                self.sites
                    .iter()
                    .map(|s| s.class_probabilities[class])
                    .collect()
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(position: usize, amino_acid: char, probs: &[f64]) -> SiteRow {
        SiteRow {
            position,
            amino_acid,
            class_probabilities: probs.to_vec(),
            mle_estimate: 0.5,
            annotation: String::new(),
        }
    }

    fn two_class_model() -> ModelResult {
        let classes = ClassTable::new(vec![0.6, 0.4], vec![0.1, 2.5]).unwrap();
        let mut model = ModelHeader::new(3)
            .with_classes(classes)
            .with_sequence_label("Hsa".to_string());
        model.push_row(row(1, 'M', &[1.0, 0.0]));
        model.push_row(row(2, 'K', &[0.25, 0.75]));
        model.finish(-10.5)
    }

    #[test]
    fn test_class_table_rejects_unequal_rows() {
        assert!(ClassTable::new(vec![0.5, 0.5], vec![1.0]).is_none());
        assert!(ClassTable::new(vec![], vec![]).is_none());
        assert_eq!(ClassTable::new(vec![1.0], vec![0.3]).unwrap().k(), 1);
    }

    #[test]
    fn test_expected_values_are_frozen_at_finish() {
        let model = two_class_model();
        assert_eq!(model.sites().len(), 2);
        assert!((model.sites()[0].expected_value() - 0.1).abs() < 1e-12);
        assert!((model.sites()[1].expected_value() - (0.025 + 1.875)).abs() < 1e-12);
        assert_eq!(model.log_likelihood(), -10.5);
        assert_eq!(model.sequence_label(), "Hsa");
        assert_eq!(model.amino_acids(), "MK");
    }

    #[test]
    fn test_probability_layers() {
        let model = two_class_model();
        assert_eq!(
            model.class_probability_layers(),
            vec![vec![1.0, 0.25], vec![0.0, 0.75]]
        );
        let mean = model.mean_expected_value().unwrap();
        assert!((mean - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_model_label() {
        assert_eq!(model_label(SINGLE_MODEL_ID), "Model unknown");
        assert_eq!(model_label(2), "Model 2");
        assert_eq!(two_class_model().display_label(), "Model 3");
    }
}
