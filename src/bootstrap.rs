//! Bootstrap replicates: several reports of the same alignment, parsed in
//! parallel and compared site by site.

use crate::error::{CodemlpError, Result};
use crate::report::load_report;
use codemlp_protocol::{BootstrapSeries, SiteSpread};
use itertools::Itertools;
use log::info;
use rayon::prelude::*;
use rst_reader::{model_label, ModelId, ParserLimits, ReportResults};
use std::io::Write;
use std::path::PathBuf;

/// Parses every report, keeping input order. `jobs` caps the worker threads.
pub fn parse_reports(
    paths: &[PathBuf],
    limits: &ParserLimits,
    jobs: Option<usize>,
) -> Result<Vec<ReportResults>> {
    let parse_all = || {
        paths
            .par_iter()
            .map(|path| load_report(path, limits))
            .collect::<Result<Vec<_>>>()
    };
    match jobs {
        Some(threads) => rayon::ThreadPoolBuilder::new()
            .num_threads(threads)
            .build()
            .map_err(|e| {
                CodemlpError::String(format!("Could not start {threads} worker threads: {e}"))
            })?
            .install(parse_all),
        None => parse_all(),
    }
}

#[derive(Debug, Clone)]
pub struct BootstrapSet {
    replicates: Vec<ReportResults>,
}

impl BootstrapSet {
    /// Requires at least one replicate, and that all replicates hold the same
    /// models with the same number of sites each.
    pub fn new(replicates: Vec<ReportResults>) -> Result<Self> {
        let Some(first) = replicates.first() else {
            return Err(CodemlpError::ReplicateMismatch(
                "no replicate reports given".to_string(),
            ));
        };
        let expected_ids = first.keys().copied().collect::<Vec<_>>();
        for (i, replicate) in replicates.iter().enumerate().skip(1) {
            let ids = replicate.keys().copied().collect::<Vec<_>>();
            if ids != expected_ids {
                return Err(CodemlpError::ReplicateMismatch(format!(
                    "replicate {} has models [{}], expected [{}]",
                    i + 1,
                    ids.iter().join(", "),
                    expected_ids.iter().join(", ")
                )));
            }
            for (id, model) in replicate {
                let expected_sites = first[id].sites().len();
                if model.sites().len() != expected_sites {
                    return Err(CodemlpError::ReplicateMismatch(format!(
                        "replicate {}: {} has {} sites, expected {expected_sites}",
                        i + 1,
                        model.display_label(),
                        model.sites().len()
                    )));
                }
            }
        }
        info!(
            "{} replicate(s) with {} model(s) each",
            replicates.len(),
            expected_ids.len()
        );
        Ok(Self { replicates })
    }

    pub fn replicate_count(&self) -> usize {
        self.replicates.len()
    }

    pub fn model_ids(&self) -> Vec<ModelId> {
        self.replicates[0].keys().copied().collect()
    }

    pub fn replicates(&self) -> &[ReportResults] {
        &self.replicates
    }

    pub fn series(&self, model_id: ModelId) -> Result<BootstrapSeries> {
        let reference = self.replicates[0].get(&model_id).ok_or_else(|| {
            CodemlpError::String(format!("{} not found in replicates", model_label(model_id)))
        })?;
        let replicates = self
            .replicates
            .iter()
            .map(|r| r[&model_id].expected_values())
            .collect::<Vec<_>>();

        let spread = reference
            .sites()
            .iter()
            .enumerate()
            .map(|(i, site)| {
                let values = replicates.iter().map(|evs| evs[i]);
                let (min, max) = values
                    .clone()
                    .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), v| {
                        (lo.min(v), hi.max(v))
                    });
                SiteSpread {
                    position: site.position(),
                    amino_acid: site.amino_acid().to_string(),
                    mean: values.sum::<f64>() / replicates.len() as f64,
                    min,
                    max,
                }
            })
            .collect();

        Ok(BootstrapSeries::new(
            model_id,
            reference.display_label(),
            reference.amino_acids(),
            replicates,
            spread,
        ))
    }

    pub fn all_series(&self) -> Result<Vec<BootstrapSeries>> {
        self.model_ids().into_iter().map(|id| self.series(id)).collect()
    }
}

pub fn format_series_text(series: &BootstrapSeries) -> String {
    let mut out = format!(
        "{} ({} replicates)\n",
        series.label,
        series.replicate_count()
    );
    for site in &series.spread {
        out += &format!(
            "{:>5} {}  mean {:.4}  [{:.4}, {:.4}]\n",
            site.position, site.amino_acid, site.mean, site.min, site.max
        );
    }
    out
}

/// One CSV row per (model, site) with the spread across replicates.
pub fn write_spread_csv<W: Write>(series: &[BootstrapSeries], writer: W) -> Result<()> {
    let mut wtr = csv::Writer::from_writer(writer);
    wtr.write_record(["model_id", "position", "amino_acid", "mean", "min", "max"])?;
    for s in series {
        for site in &s.spread {
            wtr.write_record([
                s.model_id.to_string(),
                site.position.to_string(),
                site.amino_acid.clone(),
                format!("{:.6}", site.mean),
                format!("{:.6}", site.min),
                format!("{:.6}", site.max),
            ])?;
        }
    }
    wtr.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rst_reader::SINGLE_MODEL_ID;
    use std::path::Path;

    fn replicate_paths() -> Vec<PathBuf> {
        (1..=3)
            .map(|i| PathBuf::from(format!("test_files/bootstrap/rep{i}.rst")))
            .collect()
    }

    #[test]
    fn test_parse_reports_keeps_order() {
        let reports = parse_reports(&replicate_paths(), &ParserLimits::default(), Some(2)).unwrap();
        let lnls: Vec<f64> = reports
            .iter()
            .map(|r| r[&SINGLE_MODEL_ID].log_likelihood())
            .collect();
        assert_eq!(lnls, vec![-1201.0, -1202.0, -1203.0]);
    }

    #[test]
    fn test_parse_reports_fails_on_any_bad_report() {
        let mut paths = replicate_paths();
        paths.push(PathBuf::from("nonexistent_file.rst"));
        assert!(parse_reports(&paths, &ParserLimits::default(), None).is_err());
    }

    #[test]
    fn test_series_spread() {
        let reports = parse_reports(&replicate_paths(), &ParserLimits::default(), None).unwrap();
        let set = BootstrapSet::new(reports).unwrap();
        assert_eq!(set.replicate_count(), 3);
        assert_eq!(set.model_ids(), vec![SINGLE_MODEL_ID]);
        assert_eq!(set.replicates()[2][&SINGLE_MODEL_ID].log_likelihood(), -1203.0);

        let series = set.series(SINGLE_MODEL_ID).unwrap();
        assert_eq!(series.label, "Model unknown");
        assert_eq!(series.amino_acids, "MAK");
        assert_eq!(series.replicate_count(), 3);
        let means = [0.34, 1.3, 2.02];
        for (site, mean) in series.spread.iter().zip(means) {
            assert!((site.mean - mean).abs() < 1e-9);
            assert!(site.min <= site.mean && site.mean <= site.max);
        }
        assert!((series.spread[0].min - 0.1).abs() < 1e-9);
        assert!((series.spread[0].max - 0.58).abs() < 1e-9);
        assert!(set.series(3).is_err());

        let text = format_series_text(&series);
        assert!(text.starts_with("Model unknown (3 replicates)"));

        let mut out = Vec::new();
        write_spread_csv(&set.all_series().unwrap(), &mut out).unwrap();
        let csv_text = String::from_utf8(out).unwrap();
        let lines: Vec<&str> = csv_text.lines().collect();
        assert_eq!(lines.len(), 4);
        assert_eq!(lines[0], "model_id,position,amino_acid,mean,min,max");
        assert_eq!(lines[1], "-1,1,M,0.340000,0.100000,0.580000");
    }

    #[test]
    fn test_mismatched_replicates() {
        let single = load_report(
            Path::new("test_files/single_model.rst"),
            &ParserLimits::default(),
        )
        .unwrap();
        let two = load_report(Path::new("test_files/two_models.rst"), &ParserLimits::default())
            .unwrap();
        let err = BootstrapSet::new(vec![single.clone(), two]).unwrap_err();
        assert!(matches!(err, CodemlpError::ReplicateMismatch(_)));

        assert!(BootstrapSet::new(vec![]).is_err());

        let rep = load_report(
            Path::new("test_files/bootstrap/rep1.rst"),
            &ParserLimits::default(),
        )
        .unwrap();
        assert!(BootstrapSet::new(vec![single.clone(), rep]).is_ok());

        let short = rst_reader::parse_report_str(
            &std::fs::read_to_string("test_files/single_model.rst")
                .unwrap()
                .replace("   3 K   0.20000 0.80000 ( 2)  2.020 *\n", ""),
        )
        .unwrap();
        let err = BootstrapSet::new(vec![single, short]).unwrap_err();
        assert!(err.to_string().contains("has 2 sites, expected 3"));
    }
}
