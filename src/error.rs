//! Rich diagnostic error types for the opinion argument pipeline.
//!
//! Each subsystem defines its own error type with miette `#[diagnostic]` derives,
//! providing error codes, help text, and source chains so users know exactly what
//! went wrong and how to fix it.

use miette::Diagnostic;
use thiserror::Error;

/// Top-level error type for opinion argument extraction.
///
/// Each variant wraps a subsystem-specific error, preserving the full diagnostic
/// chain (error codes, help text, sources) through to the user.
#[derive(Debug, Error, Diagnostic)]
pub enum OpinionError {
    #[error(transparent)]
    #[diagnostic(transparent)]
    Document(#[from] DocumentError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Classifier(#[from] ClassifierError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Model(#[from] ModelError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Config(#[from] ConfigError),
}

// ---------------------------------------------------------------------------
// Document errors
// ---------------------------------------------------------------------------

#[derive(Debug, Error, Diagnostic)]
pub enum DocumentError {
    #[error("unknown term index {index} (document has {len} terms)")]
    #[diagnostic(
        code(opinion::document::unknown_term),
        help(
            "A dependency, predicate, role or entity refers to a term that was never added. \
             Term indexes are positions in document order, starting at 0."
        )
    )]
    UnknownTerm { index: usize, len: usize },

    #[error("term {index} has more than one incoming dependency")]
    #[diagnostic(
        code(opinion::document::multiple_heads),
        help(
            "Dependency edges must form a tree per sentence: each term may be the target \
             of at most one edge. Check the parser output for duplicated arcs."
        )
    )]
    MultipleHeads { index: usize },

    #[error("dependency cycle through term {index}")]
    #[diagnostic(
        code(opinion::document::cycle),
        help("Following incoming edges upward must reach a root. Remove the offending arc.")
    )]
    Cycle { index: usize },

    #[error("dependency {from} -> {to} crosses sentence boundaries")]
    #[diagnostic(
        code(opinion::document::cross_sentence),
        help("Both ends of a dependency edge must belong to the same sentence.")
    )]
    CrossSentence { from: usize, to: usize },

    #[error("term {index} is out of document order (offset {offset} < {previous})")]
    #[diagnostic(
        code(opinion::document::order),
        help("Terms must be supplied sorted by character offset.")
    )]
    OutOfOrder {
        index: usize,
        offset: usize,
        previous: usize,
    },

    #[error("failed to read document {path}")]
    #[diagnostic(
        code(opinion::document::io),
        help("Check that the file exists and is readable.")
    )]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("malformed document JSON: {message}")]
    #[diagnostic(
        code(opinion::document::parse),
        help(
            "Documents are JSON objects with `id`, `terms`, `deps`, and optional \
             `predicates` and `entities` arrays."
        )
    )]
    Parse { message: String },
}

/// Result type for document operations.
pub type DocumentResult<T> = std::result::Result<T, DocumentError>;

// ---------------------------------------------------------------------------
// Classifier errors
// ---------------------------------------------------------------------------

#[derive(Debug, Error, Diagnostic)]
pub enum ClassifierError {
    #[error("empty training set")]
    #[diagnostic(
        code(opinion::classifier::empty_training_set),
        help(
            "No labelled vectors were collected. Add training samples with \
             `LinkTrainer::add` / `SpanTrainer::add` before calling `finish`."
        )
    )]
    EmptyTrainingSet,

    #[error("training set only contains label {label}")]
    #[diagnostic(
        code(opinion::classifier::single_class),
        help(
            "A binary classifier needs both positive and negative examples. \
             The corpus may be too small, or the POS filter may exclude every gold argument."
        )
    )]
    SingleClass { label: u8 },

    #[error("empty parameter grid")]
    #[diagnostic(
        code(opinion::classifier::empty_grid),
        help("Supply at least one parameter combination to train over.")
    )]
    EmptyGrid,

    #[error("invalid classifier parameters: {message}")]
    #[diagnostic(
        code(opinion::classifier::invalid_parameters),
        help("The regularisation constant and both class weights must be positive and finite.")
    )]
    InvalidParameters { message: String },
}

/// Result type for classifier operations.
pub type ClassifierResult<T> = std::result::Result<T, ClassifierError>;

// ---------------------------------------------------------------------------
// Model (persistence) errors
// ---------------------------------------------------------------------------

#[derive(Debug, Error, Diagnostic)]
pub enum ModelError {
    #[error("missing model component: {path}")]
    #[diagnostic(
        code(opinion::model::missing_path),
        help(
            "A labeller directory must contain a `model` file and, for link labellers, \
             a `properties` file. Re-export the model with `write_to`."
        )
    )]
    MissingPath { path: String },

    #[error("I/O error on {path}")]
    #[diagnostic(
        code(opinion::model::io),
        help("Check that the model directory exists and has correct permissions.")
    )]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("cannot (de)serialize model {path}: {message}")]
    #[diagnostic(
        code(opinion::model::serde),
        help(
            "The model file is not a valid classifier dump. \
             It may have been written by an incompatible version; retrain the model."
        )
    )]
    Serialization { path: String, message: String },

    #[error("malformed property file {path} at line {line}: \"{content}\"")]
    #[diagnostic(
        code(opinion::model::properties),
        help("Property files contain `key=value` lines; blank lines and `#` comments are ignored.")
    )]
    MalformedProperties {
        path: String,
        line: usize,
        content: String,
    },
}

/// Result type for model persistence.
pub type ModelResult<T> = std::result::Result<T, ModelError>;

// ---------------------------------------------------------------------------
// Configuration errors
// ---------------------------------------------------------------------------

#[derive(Debug, Error, Diagnostic)]
pub enum ConfigError {
    #[error("{role} {present} labeller configured without its {missing} labeller")]
    #[diagnostic(
        code(opinion::config::unpaired_labeller),
        help(
            "Link and span labellers work in pairs: a {role} link labeller needs a {role} \
             span labeller and vice versa. Provide both or neither."
        )
    )]
    UnpairedLabeller {
        role: String,
        present: &'static str,
        missing: &'static str,
    },

    #[error("failed to read config {path}")]
    #[diagnostic(
        code(opinion::config::read),
        help("Check that the file exists and is readable.")
    )]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to write config {path}")]
    #[diagnostic(
        code(opinion::config::write),
        help("Check that the parent directory exists and you have write permissions.")
    )]
    Write {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("malformed config {path}: {message}")]
    #[diagnostic(
        code(opinion::config::parse),
        help(
            "The pipeline config is TOML. Known keys: holder_unique, target_unique, \
             link_grid_size, span_grid_size, analyze, joint_span, holder_pos, target_pos."
        )
    )]
    Parse { path: String, message: String },
}

/// Result type for configuration operations.
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

/// Convenience result alias used throughout the crate.
pub type OpinionResult<T> = std::result::Result<T, OpinionError>;
