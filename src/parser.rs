/// Spec and concept file parsing.
///
/// Gauge documents are markdown.  The only structure goto-definition needs
/// is the list of steps (lines starting with `*`) and, for concept files,
/// which heading each step belongs to.  Everything else (descriptions,
/// tables, tags, comments) is skipped.
///
/// Step parameters are normalised away so that a step invocation and its
/// definition compare equal:
///
/// ```text
/// * Say "hello" to <name>     ->  Say {} to {}
/// ```
use crate::types::{Concept, Step};

/// The placeholder that replaces every parameter in a step value.
const PARAM_PLACEHOLDER: &str = "{}";

/// A spec or concept file could not be parsed.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{path}:{line_no} {message}")]
pub struct ParseError {
    /// Context path passed to the parser (may be empty for in-memory text).
    pub path: String,
    /// 1-based line the error was found on.
    pub line_no: u32,
    /// Human readable description.
    pub message: String,
}

impl ParseError {
    fn new(path: &str, line_no: u32, message: impl Into<String>) -> Self {
        Self {
            path: path.to_string(),
            line_no,
            message: message.into(),
        }
    }
}

/// Parse a specification file and return every step in source order.
///
/// Steps may appear in contexts, scenarios, and teardowns alike; they are
/// returned as a flat list.
pub fn parse_spec(content: &str, path: &str) -> Result<Vec<Step>, ParseError> {
    let mut steps = Vec::new();
    for (idx, line) in content.lines().enumerate() {
        let line_no = line_number(idx);
        if let Some(rest) = step_text(line) {
            steps.push(parse_step(rest, line_no, path)?);
        }
    }
    Ok(steps)
}

/// Parse a concept file.
///
/// Each top-level heading opens a concept; the `*` lines that follow are its
/// steps.  Headings are either `# Heading` or a line underlined with `=`.
/// A step outside any concept, a `##` heading, and a concept without steps
/// are errors.
pub fn parse_concepts(content: &str, path: &str) -> Result<Vec<Concept>, ParseError> {
    let lines: Vec<&str> = content.lines().collect();
    let mut concepts: Vec<Concept> = Vec::new();
    let mut current: Option<Concept> = None;
    let mut idx = 0;

    while idx < lines.len() {
        let line_no = line_number(idx);
        let trimmed = lines[idx].trim_start();

        if trimmed.starts_with("##") {
            return Err(ParseError::new(
                path,
                line_no,
                "Scenario heading is not allowed in concept file",
            ));
        }

        let heading = match trimmed.strip_prefix('#') {
            Some(heading) => Some(heading),
            None if !trimmed.is_empty()
                && step_text(trimmed).is_none()
                && is_heading_underline(lines.get(idx + 1)) =>
            {
                // Skip the `===` line.
                idx += 1;
                Some(trimmed)
            }
            None => None,
        };

        if let Some(heading) = heading {
            if let Some(done) = current.take() {
                concepts.push(finish_concept(done, path)?);
            }
            let heading = heading.trim();
            if heading.is_empty() {
                return Err(ParseError::new(path, line_no, "Concept heading should not be blank"));
            }
            current = Some(Concept {
                heading: parse_step(heading, line_no, path)?,
                steps: Vec::new(),
            });
        } else if let Some(rest) = step_text(trimmed) {
            let step = parse_step(rest, line_no, path)?;
            match current.as_mut() {
                Some(concept) => concept.steps.push(step),
                None => {
                    return Err(ParseError::new(
                        path,
                        line_no,
                        "Step is not defined inside a concept heading",
                    ));
                }
            }
        }

        idx += 1;
    }

    if let Some(done) = current.take() {
        concepts.push(finish_concept(done, path)?);
    }
    Ok(concepts)
}

/// Compute the canonical value of a step's text.
///
/// Quoted (`"..."`) and dynamic (`<...>`) parameters become `{}` and runs of
/// whitespace collapse to a single space.  A `\"` inside a quoted parameter
/// does not end it.
pub fn step_value(text: &str) -> Result<String, String> {
    let mut value = String::with_capacity(text.len());
    let mut chars = text.chars().peekable();

    while let Some(c) = chars.next() {
        match c {
            '"' => {
                let mut closed = false;
                while let Some(inner) = chars.next() {
                    match inner {
                        '\\' => {
                            chars.next();
                        }
                        '"' => {
                            closed = true;
                            break;
                        }
                        _ => {}
                    }
                }
                if !closed {
                    return Err("String not terminated".to_string());
                }
                value.push_str(PARAM_PLACEHOLDER);
            }
            '<' => {
                let rest: String = chars.clone().collect();
                match rest.find('>') {
                    Some(end) => {
                        // Skip the parameter name and the closing `>`.
                        for _ in 0..rest[..=end].chars().count() {
                            chars.next();
                        }
                        value.push_str(PARAM_PLACEHOLDER);
                    }
                    None => value.push(c),
                }
            }
            _ => value.push(c),
        }
    }

    Ok(value.split_whitespace().collect::<Vec<_>>().join(" "))
}

fn parse_step(text: &str, line_no: u32, path: &str) -> Result<Step, ParseError> {
    let text = text.trim();
    if text.is_empty() {
        return Err(ParseError::new(path, line_no, "Step should not be blank"));
    }
    let value = step_value(text).map_err(|msg| ParseError::new(path, line_no, msg))?;
    Ok(Step {
        line_no,
        text: text.to_string(),
        value,
    })
}

fn finish_concept(concept: Concept, path: &str) -> Result<Concept, ParseError> {
    if concept.steps.is_empty() {
        return Err(ParseError::new(
            path,
            concept.heading.line_no,
            "Concept should have at least one step",
        ));
    }
    Ok(concept)
}

/// Whether `line` is a `===` heading underline.
fn is_heading_underline(line: Option<&&str>) -> bool {
    line.map(|l| l.trim())
        .is_some_and(|l| !l.is_empty() && l.chars().all(|c| c == '='))
}

/// The text after the leading `*` of a step line, if `line` is one.
fn step_text(line: &str) -> Option<&str> {
    line.trim_start().strip_prefix('*')
}

fn line_number(idx: usize) -> u32 {
    u32::try_from(idx).map_or(u32::MAX, |n| n.saturating_add(1))
}
