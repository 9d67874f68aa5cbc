// thiserror's #[error("...{field}...")] format strings reference struct fields,
// but the compiler doesn't see through the derive macro and reports false positives.
#![allow(unused_assignments)]

//! # opinion-args
//!
//! Opinion holder and target extraction over dependency-parsed, SRL-annotated
//! documents.
//!
//! ## Architecture
//!
//! - **Document model** (`document`): terms, dependency tree, predicates and
//!   entities, with read-only traversal helpers in `document::tree`
//! - **Link labelling** (`link`): candidate argument heads of an expression
//!   and a classifier scoring each of them
//! - **Span expansion** (`expand`): classifier-guided growth of a head into
//!   its full argument span
//! - **Clustering** (`arguments`): coordination clusters, best-cluster
//!   selection and span merging
//! - **Pipeline** (`pipeline`): holder/target extractor, its TOML config and
//!   the trainer building it from gold opinions
//! - **Classifier** (`classifier`): binary classifier trait, logistic
//!   regression, grid search and cross-validation
//!
//! ## Library usage
//!
//! ```no_run
//! use std::path::Path;
//!
//! use opinion_args::document::{Document, TermId};
//! use opinion_args::pipeline::ArgumentExtractor;
//!
//! let extractor: ArgumentExtractor =
//!     ArgumentExtractor::read_from(Path::new("models/opinion")).unwrap();
//! let doc = Document::read_from(Path::new("doc.json")).unwrap();
//! let arguments = extractor.extract(&doc, TermId(4));
//! for holder in &arguments.holder {
//!     println!("holder: {}", doc.text_of(holder.terms()));
//! }
//! extractor.release(&doc);
//! ```

pub mod arguments;
pub mod classifier;
pub mod document;
pub mod error;
pub mod expand;
pub mod features;
pub mod link;
pub mod pipeline;
pub mod properties;
pub mod span;
pub mod srl;

pub use arguments::find_arguments;
pub use document::{Document, TermId};
pub use error::{OpinionError, OpinionResult};
pub use expand::SpanLabeller;
pub use link::LinkLabeller;
pub use pipeline::{ArgumentExtractor, Arguments, PipelineConfig, PipelineTrainer, Role};
pub use span::Span;
