//! Loading single reports and turning parsed models into export contracts.

use crate::error::{CodemlpError, Result};
use codemlp_protocol::{ModelSummary, ReportSummary, SiteRow};
use itertools::Itertools;
use log::{debug, info};
use rst_reader::{ModelId, ModelResult, ParserLimits, ReportParser, ReportResults};
use std::fs::File;
use std::io::{BufReader, Write};
use std::path::Path;

/// Opens and parses one codeml `rst` report.
pub fn load_report(path: &Path, limits: &ParserLimits) -> Result<ReportResults> {
    let file = File::open(path).map_err(|e| {
        CodemlpError::String(format!("Could not open report '{}': {e}", path.display()))
    })?;
    let report = ReportParser::with_limits(*limits)
        .parse(BufReader::new(file))
        .map_err(|source| CodemlpError::Parse {
            path: path.display().to_string(),
            source,
        })?;
    info!("Parsed {} model(s) from '{}'", report.len(), path.display());
    for model in report.values() {
        debug!(
            "{}: K={}, {} sites, lnL={}",
            model.display_label(),
            model.k(),
            model.sites().len(),
            model.log_likelihood()
        );
    }
    Ok(report)
}

pub fn summarize_model(model: &ModelResult) -> ModelSummary {
    ModelSummary {
        model_id: model.model_id(),
        label: model.display_label(),
        k: model.k(),
        class_weights: model.class_weights().to_vec(),
        class_ratios: model.class_ratios().to_vec(),
        sequence_label: model.sequence_label().to_string(),
        site_count: model.sites().len(),
        log_likelihood: model.log_likelihood(),
        mean_expected_value: model.mean_expected_value(),
    }
}

pub fn summarize(source: &str, report: &ReportResults) -> ReportSummary {
    ReportSummary::new(source, report.values().map(summarize_model).collect())
}

pub fn site_rows(report: &ReportResults) -> Vec<SiteRow> {
    report
        .values()
        .flat_map(|model| {
            model.sites().iter().map(move |site| SiteRow {
                model_id: model.model_id(),
                position: site.position(),
                amino_acid: site.amino_acid().to_string(),
                class_probabilities: site.class_probabilities().to_vec(),
                mle_estimate: site.mle_estimate(),
                expected_value: site.expected_value(),
                annotation: site.annotation().to_string(),
            })
        })
        .collect()
}

/// Writes one CSV row per site. Probability columns run to the largest K in
/// the report; models with fewer classes leave the extra cells empty.
pub fn write_sites_csv<W: Write>(report: &ReportResults, writer: W) -> Result<()> {
    let max_k = report.values().map(|m| m.k()).max().unwrap_or(0);
    let mut wtr = csv::Writer::from_writer(writer);

    let mut header = vec!["model_id".to_string(), "position".into(), "amino_acid".into()];
    header.extend((1..=max_k).map(|k| format!("p{k}")));
    header.extend(["mle_estimate".into(), "expected_value".into(), "annotation".into()]);
    wtr.write_record(&header)?;

    for row in site_rows(report) {
        let mut record = vec![
            row.model_id.to_string(),
            row.position.to_string(),
            row.amino_acid,
        ];
        record.extend(row.class_probabilities.iter().map(|p| p.to_string()));
        record.resize(3 + max_k, String::new());
        record.push(row.mle_estimate.to_string());
        record.push(format!("{:.6}", row.expected_value));
        record.push(row.annotation);
        wtr.write_record(&record)?;
    }
    wtr.flush()?;
    Ok(())
}

/// Likelihood-ratio statistic `2 (lnL_alt - lnL_null)` for two nested models.
pub fn likelihood_ratio(report: &ReportResults, null_id: ModelId, alt_id: ModelId) -> Result<f64> {
    let lnl = |id: ModelId| {
        report
            .get(&id)
            .map(|m| m.log_likelihood())
            .ok_or_else(|| CodemlpError::String(format!("Model {id} not found in report")))
    };
    Ok(2.0 * (lnl(alt_id)? - lnl(null_id)?))
}

pub fn format_summary_text(summary: &ReportSummary) -> String {
    let mut out = format!("Report: {}\n", summary.source);
    for model in &summary.models {
        out += &format!(
            "{} (sequence {}): K={} lnL={:.6} sites={}\n",
            model.label, model.sequence_label, model.k, model.log_likelihood, model.site_count
        );
        out += &format!(
            "  p: {}\n  w: {}\n",
            model.class_weights.iter().map(|v| format!("{v:.5}")).join(" "),
            model.class_ratios.iter().map(|v| format!("{v:.5}")).join(" ")
        );
        if let Some(mean) = model.mean_expected_value {
            out += &format!("  mean expected w: {mean:.4}\n");
        }
    }
    out
}
