//! Machine-readable contracts shared by codemlp outputs and plotting consumers.

use serde::{Deserialize, Serialize};

pub const REPORT_SUMMARY_SCHEMA: &str = "codemlp.report_summary.v1";
pub const BOOTSTRAP_SERIES_SCHEMA: &str = "codemlp.bootstrap_series.v1";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelSummary {
    pub model_id: i64,
    pub label: String,
    pub k: usize,
    pub class_weights: Vec<f64>,
    pub class_ratios: Vec<f64>,
    pub sequence_label: String,
    pub site_count: usize,
    pub log_likelihood: f64,
    #[serde(default)]
    pub mean_expected_value: Option<f64>,
}

/// Overview of every model parsed from one report.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReportSummary {
    pub schema: String,
    pub source: String,
    pub models: Vec<ModelSummary>,
}

impl ReportSummary {
    pub fn new(source: &str, models: Vec<ModelSummary>) -> Self {
        Self {
            schema: REPORT_SUMMARY_SCHEMA.to_string(),
            source: source.to_string(),
            models,
        }
    }

    pub fn model(&self, model_id: i64) -> Option<&ModelSummary> {
        self.models.iter().find(|m| m.model_id == model_id)
    }

    pub fn from_json(text: &str) -> Result<Self, String> {
        let summary: Self =
            serde_json::from_str(text).map_err(|e| format!("Invalid report summary JSON: {e}"))?;
        if summary.schema != REPORT_SUMMARY_SCHEMA {
            return Err(format!(
                "Unsupported report summary schema '{}', expected '{REPORT_SUMMARY_SCHEMA}'",
                summary.schema
            ));
        }
        Ok(summary)
    }
}

/// One site of one model, flattened for tabular export.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SiteRow {
    pub model_id: i64,
    pub position: usize,
    pub amino_acid: String,
    pub class_probabilities: Vec<f64>,
    pub mle_estimate: f64,
    pub expected_value: f64,
    pub annotation: String,
}

/// Expected value of one site across bootstrap replicates.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SiteSpread {
    pub position: usize,
    pub amino_acid: String,
    pub mean: f64,
    pub min: f64,
    pub max: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BootstrapSeries {
    pub schema: String,
    pub model_id: i64,
    pub label: String,
    pub amino_acids: String,
    /// Per-site expected values, one vector per replicate in input order.
    pub replicates: Vec<Vec<f64>>,
    pub spread: Vec<SiteSpread>,
}

impl BootstrapSeries {
    pub fn new(
        model_id: i64,
        label: String,
        amino_acids: String,
        replicates: Vec<Vec<f64>>,
        spread: Vec<SiteSpread>,
    ) -> Self {
        Self {
            schema: BOOTSTRAP_SERIES_SCHEMA.to_string(),
            model_id,
            label,
            amino_acids,
            replicates,
            spread,
        }
    }

    pub fn replicate_count(&self) -> usize {
        self.replicates.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn summary() -> ReportSummary {
        ReportSummary::new(
            "run1/rst",
            vec![ModelSummary {
                model_id: 2,
                label: "Model 2".to_string(),
                k: 2,
                class_weights: vec![0.6, 0.4],
                class_ratios: vec![0.1, 2.5],
                sequence_label: "seq_a".to_string(),
                site_count: 3,
                log_likelihood: -1234.56,
                mean_expected_value: Some(1.2),
            }],
        )
    }

    #[test]
    fn test_summary_json_is_accepted_back() {
        let text = serde_json::to_string(&summary()).unwrap();
        let back = ReportSummary::from_json(&text).unwrap();
        assert_eq!(back.schema, REPORT_SUMMARY_SCHEMA);
        assert_eq!(back.model(2).unwrap().site_count, 3);
        assert!(back.model(1).is_none());
    }

    #[test]
    fn test_foreign_schema_is_rejected() {
        let text = serde_json::to_string(&summary())
            .unwrap()
            .replace(REPORT_SUMMARY_SCHEMA, "codemlp.report_summary.v0");
        let err = ReportSummary::from_json(&text).unwrap_err();
        assert!(err.contains("Unsupported"));
    }

    #[test]
    fn test_missing_mean_defaults_to_none() {
        let text = r#"{"schema":"codemlp.report_summary.v1","source":"x","models":[
            {"model_id":-1,"label":"Model unknown","k":1,"class_weights":[1.0],
             "class_ratios":[0.2],"sequence_label":"s","site_count":0,"log_likelihood":-1.0}]}"#;
        let back = ReportSummary::from_json(text).unwrap();
        assert_eq!(back.models[0].mean_expected_value, None);
    }
}
