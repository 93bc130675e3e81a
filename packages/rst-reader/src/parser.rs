use std::io::{self, BufRead};
use std::sync::LazyLock;

use regex::Regex;

use crate::error::{ParseStage, Result, RstError};
use crate::limits::ParserLimits;
use crate::model::{
    ClassTable, ClassedModel, LabelledModel, ModelHeader, ModelId, ReportResults, SINGLE_MODEL_ID,
    SiteRow,
};

const MODEL_HEADER_PREFIX: &str = "Model ";
const SINGLE_MODEL_PREFIX: &str = "TREE #";
const CLASS_COUNT_MARKER: &str = "dN/dS (w) for site classes (K=";
const WEIGHTS_PREFIX: &str = "p:";
const RATIOS_PREFIX: &str = "w:";
const SEQUENCE_LABEL_PREFIX: &str = "(amino acids refer to ";
const LOG_LIKELIHOOD_PREFIX: &str = "lnL = ";

//    12 K   0.566 0.434 ( 1)  0.434 *
// position, residue, K posteriors, (class), mean w, annotation
static SITE_ROW: LazyLock<Regex> = LazyLock::new(|| {
    const NUM: &str = r"[-+]?(?:\d+\.?\d*|\.\d+)(?:[eE][-+]?\d+)?";
    Regex::new(&format!(
        r"^(\d+)\s+([A-Z])\s+((?:{NUM}\s+)+)\(\s*\d+\s*\)\s+({NUM})(.*)$"
    ))
    .expect("site row pattern is valid")
});

/// Line reader that remembers how many lines it has handed out.
struct LineCursor<R> {
    lines: io::Lines<R>,
    line_no: usize,
}

impl<R: BufRead> LineCursor<R> {
    fn new(reader: R) -> Self {
        Self {
            lines: reader.lines(),
            line_no: 0,
        }
    }

    fn next_line(&mut self) -> Result<Option<String>> {
        match self.lines.next() {
            Some(line) => {
                self.line_no += 1;
                Ok(Some(line?))
            }
            None => Ok(None),
        }
    }

    /// 1-based number of the line most recently returned.
    fn line_no(&self) -> usize {
        self.line_no
    }
}

enum Scan {
    Found(String),
    Exhausted,
    EndOfStream,
}

/// Checks `first` (if given) and then following lines against `accept`,
/// giving up once more than `skip_limit` lines have been rejected.
fn scan_until<R: BufRead>(
    cursor: &mut LineCursor<R>,
    first: Option<String>,
    skip_limit: usize,
    accept: impl Fn(&str) -> bool,
) -> Result<Scan> {
    let mut line = match first {
        Some(line) => Some(line),
        None => cursor.next_line()?,
    };
    let mut skipped = 0;
    while let Some(text) = line {
        if accept(&text) {
            return Ok(Scan::Found(text));
        }
        skipped += 1;
        if skipped > skip_limit {
            return Ok(Scan::Exhausted);
        }
        line = cursor.next_line()?;
    }
    Ok(Scan::EndOfStream)
}

fn parse_floats(fields: &str) -> std::result::Result<Vec<f64>, String> {
    fields
        .split_whitespace()
        .map(|v| {
            v.parse::<f64>()
                .map_err(|_| format!("'{v}' is not a number"))
        })
        .collect()
}

fn parse_class_row(line: &str, prefix: &str, k: usize) -> std::result::Result<Vec<f64>, String> {
    let fields = line
        .strip_prefix(prefix)
        .ok_or_else(|| format!("expected a '{prefix}' line, found '{}'", line.trim()))?;
    let values = parse_floats(fields)?;
    if values.len() != k {
        return Err(format!(
            "'{prefix}' line has {} values, expected {k}",
            values.len()
        ));
    }
    Ok(values)
}

fn parse_class_count(line: &str) -> Option<usize> {
    let start = line.find(CLASS_COUNT_MARKER)? + CLASS_COUNT_MARKER.len();
    let digits: String = line[start..]
        .trim_start()
        .chars()
        .take_while(|c| c.is_ascii_digit())
        .collect();
    digits.parse::<usize>().ok().filter(|k| *k > 0)
}

fn parse_model_id(line: &str) -> Option<ModelId> {
    let rest = line.strip_prefix(MODEL_HEADER_PREFIX)?;
    rest.split(':').next()?.trim().parse::<ModelId>().ok()
}

fn parse_sequence_label(line: &str) -> Option<String> {
    let mut label = line.split(':').nth(1)?.trim().to_string();
    label.pop();
    Some(label)
}

fn parse_site_row(line: &str) -> Option<SiteRow> {
    let caps = SITE_ROW.captures(line)?;
    let position = caps[1].parse::<usize>().ok()?;
    let amino_acid = caps[2].chars().next()?;
    let class_probabilities = parse_floats(&caps[3]).ok()?;
    let mle_estimate = caps[4].parse::<f64>().ok()?;
    Some(SiteRow {
        position,
        amino_acid,
        class_probabilities,
        mle_estimate,
        annotation: caps[5].trim_start().to_string(),
    })
}

/// Streaming reader for codeml `rst` reports.
///
/// One call to [`ReportParser::parse`] walks the report once, front to back,
/// and either returns every model in it or the first problem found.
#[derive(Clone, Copy, Debug, Default)]
pub struct ReportParser {
    limits: ParserLimits,
}

impl ReportParser {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_limits(limits: ParserLimits) -> Self {
        Self { limits }
    }

    pub fn limits(&self) -> &ParserLimits {
        &self.limits
    }

    pub fn parse_str(&self, text: &str) -> Result<ReportResults> {
        self.parse(text.as_bytes())
    }

    pub fn parse<R: BufRead>(&self, reader: R) -> Result<ReportResults> {
        let mut cursor = LineCursor::new(reader);
        let mut results = ReportResults::new();

        while let Some(header) = Self::seek_header(&mut cursor)? {
            if results.contains_key(&header.model_id()) {
                return Err(RstError::DuplicateModel {
                    model: header.model_id(),
                    line: cursor.line_no(),
                });
            }
            let classed = self.read_class_table(&mut cursor, header)?;
            let mut model = self.read_sequence_label(&mut cursor, classed)?;
            let boundary = Self::read_site_table(&mut cursor, &mut model)?;
            let log_likelihood =
                self.read_log_likelihood(&mut cursor, model.model_id(), boundary)?;
            let model = model.finish(log_likelihood);
            results.insert(model.model_id(), model);
        }

        Ok(results)
    }

    fn seek_header<R: BufRead>(cursor: &mut LineCursor<R>) -> Result<Option<ModelHeader>> {
        while let Some(line) = cursor.next_line()? {
            if line.starts_with(MODEL_HEADER_PREFIX) {
                let model_id = parse_model_id(&line).ok_or_else(|| RstError::MalformedHeader {
                    line: cursor.line_no(),
                    text: line.trim().to_string(),
                })?;
                return Ok(Some(ModelHeader::new(model_id)));
            }
            if line.starts_with(SINGLE_MODEL_PREFIX) {
                return Ok(Some(ModelHeader::new(SINGLE_MODEL_ID)));
            }
        }
        Ok(None)
    }

    fn read_class_table<R: BufRead>(
        &self,
        cursor: &mut LineCursor<R>,
        header: ModelHeader,
    ) -> Result<ClassedModel> {
        let model = header.model_id();
        let malformed = |line: usize, detail: String| RstError::MalformedClassTable {
            model,
            line,
            detail,
        };
        let eof = || RstError::PrematureEndOfFile {
            model,
            stage: ParseStage::ClassTable,
        };

        let count_line = match scan_until(cursor, None, self.limits.class_table_window, |l| {
            l.contains(CLASS_COUNT_MARKER)
        })? {
            Scan::Found(line) => line,
            Scan::Exhausted => {
                return Err(malformed(
                    cursor.line_no(),
                    format!(
                        "no class count within {} lines of the header",
                        self.limits.class_table_window
                    ),
                ));
            }
            Scan::EndOfStream => return Err(eof()),
        };
        let k = parse_class_count(&count_line).ok_or_else(|| {
            malformed(
                cursor.line_no(),
                format!("cannot read K from '{}'", count_line.trim()),
            )
        })?;

        // codeml leaves one blank line between the count and the rows
        let mut line = cursor.next_line()?.ok_or_else(eof)?;
        if line.trim().is_empty() {
            line = cursor.next_line()?.ok_or_else(eof)?;
        }
        let weights = parse_class_row(&line, WEIGHTS_PREFIX, k)
            .map_err(|detail| malformed(cursor.line_no(), detail))?;

        let line = cursor.next_line()?.ok_or_else(eof)?;
        let ratios = parse_class_row(&line, RATIOS_PREFIX, k)
            .map_err(|detail| malformed(cursor.line_no(), detail))?;

        let classes = ClassTable::new(weights, ratios)
            .ok_or_else(|| malformed(cursor.line_no(), "uneven class rows".to_string()))?;
        Ok(header.with_classes(classes))
    }

    fn read_sequence_label<R: BufRead>(
        &self,
        cursor: &mut LineCursor<R>,
        classed: ClassedModel,
    ) -> Result<LabelledModel> {
        let model = classed.model_id();
        match scan_until(cursor, None, self.limits.sequence_label_window, |l| {
            l.starts_with(SEQUENCE_LABEL_PREFIX)
        })? {
            Scan::Found(line) => {
                let label =
                    parse_sequence_label(&line).ok_or_else(|| RstError::MalformedSequenceLabel {
                        model,
                        line: cursor.line_no(),
                        text: line.trim().to_string(),
                    })?;
                Ok(classed.with_sequence_label(label))
            }
            Scan::Exhausted => Err(RstError::MissingSequenceLabel {
                model,
                line: cursor.line_no(),
            }),
            Scan::EndOfStream => Err(RstError::PrematureEndOfFile {
                model,
                stage: ParseStage::SequenceLabel,
            }),
        }
    }

    /// Reads rows until the first line that is not one; that line is returned.
    fn read_site_table<R: BufRead>(
        cursor: &mut LineCursor<R>,
        model: &mut LabelledModel,
    ) -> Result<String> {
        let eof = RstError::PrematureEndOfFile {
            model: model.model_id(),
            stage: ParseStage::SiteTable,
        };

        // Separator between the label and the first row.
        if cursor.next_line()?.is_none() {
            return Err(eof);
        }

        loop {
            let Some(line) = cursor.next_line()? else {
                return Err(eof);
            };
            let Some(row) = parse_site_row(line.trim()) else {
                return Ok(line);
            };
            let expected = model.next_position();
            if row.position != expected {
                return Err(RstError::PositionMismatch {
                    model: model.model_id(),
                    line: cursor.line_no(),
                    expected,
                    actual: row.position,
                });
            }
            if row.class_probabilities.len() != model.k() {
                return Err(RstError::SiteArity {
                    model: model.model_id(),
                    line: cursor.line_no(),
                    position: row.position,
                    expected: model.k(),
                    actual: row.class_probabilities.len(),
                });
            }
            model.push_row(row);
        }
    }

    fn read_log_likelihood<R: BufRead>(
        &self,
        cursor: &mut LineCursor<R>,
        model: ModelId,
        boundary: String,
    ) -> Result<f64> {
        let line = match scan_until(
            cursor,
            Some(boundary),
            self.limits.log_likelihood_window,
            |l| l.starts_with(LOG_LIKELIHOOD_PREFIX),
        )? {
            Scan::Found(line) => line,
            Scan::Exhausted | Scan::EndOfStream => {
                return Err(RstError::MissingLogLikelihood {
                    model,
                    line: cursor.line_no(),
                });
            }
        };
        line[LOG_LIKELIHOOD_PREFIX.len()..]
            .trim()
            .parse::<f64>()
            .map_err(|_| RstError::MalformedLogLikelihood {
                model,
                line: cursor.line_no(),
                text: line.trim().to_string(),
            })
    }
}
