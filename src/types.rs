//! Data types used throughout the GaugeLSP server.
//!
//! This module contains the "model" structs and enums that represent
//! extracted Gauge information (steps, concepts, concept definitions)
//! as well as the document classification used by goto-definition.

use std::path::PathBuf;

/// The two kinds of documents a goto-definition request can target.
///
/// Produced once per request by [`crate::util::document_kind`]; the
/// dispatcher matches on it to pick the right parser.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentKind {
    /// A concept file (`*.cpt`): headings declare concepts, `*` lines are
    /// the steps the concept expands to.
    Concept,
    /// A specification file (`*.spec`, `*.md`, or anything else the server
    /// is asked about).
    Spec,
}

/// A step reference extracted from a spec or concept file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Step {
    /// 1-based line the step is declared on.
    pub line_no: u32,
    /// The step text as written, without the leading `*`
    /// (e.g. `Say "hello" to <name>`).
    pub text: String,
    /// The canonical value used as a lookup key: every parameter replaced
    /// with `{}` (e.g. `Say {} to {}`).
    pub value: String,
}

/// A concept declared in a `.cpt` file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Concept {
    /// The concept heading, parsed the same way as a step so that a step
    /// invoking the concept produces the same `value`.
    pub heading: Step,
    /// The steps the concept is composed of, in source order.
    pub steps: Vec<Step>,
}

/// Where a concept is defined.  Stored in the concept dictionary, keyed by
/// the concept's canonical value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConceptInfo {
    /// Path of the `.cpt` file declaring the concept.
    pub file: PathBuf,
    /// 1-based line of the concept heading.
    pub line_no: u32,
}
