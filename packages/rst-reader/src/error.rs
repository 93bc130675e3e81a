use std::fmt;

use thiserror::Error;

use crate::model::ModelId;

/// Section of a model the parser was reading when a problem surfaced.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ParseStage {
    Header,
    ClassTable,
    SequenceLabel,
    SiteTable,
    LogLikelihood,
}

impl ParseStage {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Header => "model header",
            Self::ClassTable => "class table",
            Self::SequenceLabel => "sequence label",
            Self::SiteTable => "site table",
            Self::LogLikelihood => "log-likelihood",
        }
    }
}

impl fmt::Display for ParseStage {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Error)]
pub enum RstError {
    #[error("I/O error while reading report: {0}")]
    Io(#[from] std::io::Error),

    #[error("line {line}: cannot read model id from header '{text}'")]
    MalformedHeader { line: usize, text: String },

    #[error("model {model} already parsed")]
    DuplicateModel { model: ModelId, line: usize },

    #[error("model {model}: malformed class table at line {line}: {detail}")]
    MalformedClassTable {
        model: ModelId,
        line: usize,
        detail: String,
    },

    #[error("model {model}: no '(amino acids refer to' line found by line {line}")]
    MissingSequenceLabel { model: ModelId, line: usize },

    #[error("model {model}: line {line}: sequence label has no ':' in '{text}'")]
    MalformedSequenceLabel {
        model: ModelId,
        line: usize,
        text: String,
    },

    #[error(
        "model {model}: line {line}: site position does not match, expected {expected} got {actual}"
    )]
    PositionMismatch {
        model: ModelId,
        line: usize,
        expected: usize,
        actual: usize,
    },

    #[error(
        "model {model}: line {line}: site {position} has {actual} class probabilities, expected {expected}"
    )]
    SiteArity {
        model: ModelId,
        line: usize,
        position: usize,
        expected: usize,
        actual: usize,
    },

    #[error("model {model}: report ended early while reading the {stage}")]
    PrematureEndOfFile { model: ModelId, stage: ParseStage },

    #[error("model {model}: no 'lnL = ' line found by line {line}")]
    MissingLogLikelihood { model: ModelId, line: usize },

    #[error("model {model}: line {line}: cannot read log-likelihood from '{text}'")]
    MalformedLogLikelihood {
        model: ModelId,
        line: usize,
        text: String,
    },
}

impl RstError {
    /// Model the error belongs to, if one had been identified.
    pub fn model(&self) -> Option<ModelId> {
        match self {
            Self::Io(_) | Self::MalformedHeader { .. } => None,
            Self::DuplicateModel { model, .. }
            | Self::MalformedClassTable { model, .. }
            | Self::MissingSequenceLabel { model, .. }
            | Self::MalformedSequenceLabel { model, .. }
            | Self::PositionMismatch { model, .. }
            | Self::SiteArity { model, .. }
            | Self::PrematureEndOfFile { model, .. }
            | Self::MissingLogLikelihood { model, .. }
            | Self::MalformedLogLikelihood { model, .. } => Some(*model),
        }
    }

    pub fn stage(&self) -> Option<ParseStage> {
        match self {
            Self::Io(_) => None,
            Self::MalformedHeader { .. } | Self::DuplicateModel { .. } => Some(ParseStage::Header),
            Self::MalformedClassTable { .. } => Some(ParseStage::ClassTable),
            Self::MissingSequenceLabel { .. } | Self::MalformedSequenceLabel { .. } => {
                Some(ParseStage::SequenceLabel)
            }
            Self::PositionMismatch { .. } | Self::SiteArity { .. } => Some(ParseStage::SiteTable),
            Self::PrematureEndOfFile { stage, .. } => Some(*stage),
            Self::MissingLogLikelihood { .. } | Self::MalformedLogLikelihood { .. } => {
                Some(ParseStage::LogLikelihood)
            }
        }
    }
}

pub type Result<T> = std::result::Result<T, RstError>;
