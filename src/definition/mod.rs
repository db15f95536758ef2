/// Goto definition support.
///
/// Given a cursor on a step in a spec (`.spec`/`.md`) or concept (`.cpt`)
/// file, find where that step is defined:
///
///   - **Concepts**: a step that invokes a concept jumps to the concept's
///     heading in its `.cpt` file, spanning the whole heading line.
///   - **Step implementations**: any other step is looked up in the runner,
///     which reports the implementation's file and span.
///
/// - [`resolve`]: Entry points. Request decoding, document classification,
///   finding the step on the requested line, and the concept-then-runner
///   search order.
/// - [`concept`]: Concept dictionary lookup and whole-line ranges, reading
///   the concept file from the editor or from disk via the line cache.
/// - [`step`]: The runner round trip and translation of the runner's
///   1-based span into an LSP range.
mod concept;
mod resolve;
mod step;
