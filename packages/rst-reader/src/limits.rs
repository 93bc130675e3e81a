#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Lines that may be skipped after a model header before the class-count line.
pub const CLASS_TABLE_WINDOW: usize = 8;
/// Lines that may be skipped after the class table before the sequence label.
pub const SEQUENCE_LABEL_WINDOW: usize = 6;
/// Lines that may be skipped after the site table before the `lnL = ` line.
pub const LOG_LIKELIHOOD_WINDOW: usize = 30;

/// Bounded lookahead of each scanning stage.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize), serde(default))]
pub struct ParserLimits {
    pub class_table_window: usize,
    pub sequence_label_window: usize,
    pub log_likelihood_window: usize,
}

impl Default for ParserLimits {
    fn default() -> Self {
        Self {
            class_table_window: CLASS_TABLE_WINDOW,
            sequence_label_window: SEQUENCE_LABEL_WINDOW,
            log_likelihood_window: LOG_LIKELIHOOD_WINDOW,
        }
    }
}
