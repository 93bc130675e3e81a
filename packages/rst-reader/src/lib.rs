//! Reader for the `rst` report that codeml writes for site models.
//!
//! ```
//! let report = "TREE #  1:  (1, 2);\n\
//!     dN/dS (w) for site classes (K=2)\n\n\
//!     p:   0.6 0.4\n\
//!     w:   0.1 2.5\n\n\
//!     (amino acids refer to 1st sequence: seq_a)\n\n\
//!        1 M   0.9 0.1 ( 1)  0.34\n\n\
//!     lnL = -12.5\n";
//! let models = rst_reader::parse_report_str(report).unwrap();
//! let model = &models[&rst_reader::SINGLE_MODEL_ID];
//! assert_eq!(model.sites().len(), 1);
//! assert!((model.sites()[0].expected_value() - 0.34).abs() < 1e-9);
//! ```

pub mod error;
pub mod limits;
pub mod model;
pub mod parser;

use std::io::BufRead;

pub use error::{ParseStage, RstError};
pub use limits::ParserLimits;
pub use model::{
    model_label, ClassTable, ModelId, ModelResult, ReportResults, SiteRecord, SINGLE_MODEL_ID,
};
pub use parser::ReportParser;

/// Parses a report with the default lookahead limits.
pub fn parse_report<R: BufRead>(reader: R) -> Result<ReportResults, RstError> {
    ReportParser::new().parse(reader)
}

pub fn parse_report_str(text: &str) -> Result<ReportResults, RstError> {
    ReportParser::new().parse_str(text)
}
