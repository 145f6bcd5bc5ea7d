//! Whitespace normalization for arguments and scoped blocks.

use crate::parser::ast::{Segment, Template};

/// Trim leading whitespace of the first text segment and trailing whitespace
/// of the last one. Used for inline arguments.
pub fn trim_inline(template: &Template) -> Template {
    let mut segments = template.segments.clone();
    if let Some(Segment::Text(first)) = segments.first_mut() {
        let start = first.len() - first.trim_start().len();
        first.replace_range(..start, "");
    }
    if let Some(Segment::Text(last)) = segments.last_mut() {
        let end = last.trim_end().len();
        last.truncate(end);
    }
    segments.retain(|segment| !matches!(segment, Segment::Text(text) if text.is_empty()));
    Template::new(segments)
}

/// Normalize a scoped block: drop leading and trailing blank lines, then
/// strip the indentation of the first non-blank line from every line.
///
/// Relative indentation is kept. Text that follows an invocation on the same
/// line is not a line start and is left alone.
pub fn trim_block(template: &Template) -> Template {
    let mut segments = template.segments.clone();

    if let Some(Segment::Text(first)) = segments.first_mut() {
        let blank = first.len() - first.trim_start().len();
        if let Some(newline) = first[..blank].rfind('\n') {
            first.replace_range(..=newline, "");
        }
    }
    if let Some(Segment::Text(last)) = segments.last_mut() {
        let content = last.trim_end().len();
        if let Some(newline) = last[content..].find('\n') {
            last.truncate(content + newline);
        }
    }
    segments.retain(|segment| !matches!(segment, Segment::Text(text) if text.is_empty()));

    let indent: String = match segments.first() {
        Some(Segment::Text(text)) => text
            .chars()
            .take_while(|c| *c == ' ' || *c == '\t')
            .collect(),
        _ => String::new(),
    };
    if indent.is_empty() {
        return Template::new(segments);
    }

    let mut at_line_start = true;
    for segment in &mut segments {
        match segment {
            Segment::Text(text) => {
                *text = dedent(text, &indent, at_line_start);
                at_line_start = text.ends_with('\n');
            }
            Segment::Macro(_) | Segment::Variable(_) => at_line_start = false,
        }
    }
    segments.retain(|segment| !matches!(segment, Segment::Text(text) if text.is_empty()));
    Template::new(segments)
}

fn dedent(text: &str, indent: &str, starts_line: bool) -> String {
    let mut out = String::with_capacity(text.len());
    for (i, line) in text.split_inclusive('\n').enumerate() {
        if i > 0 || starts_line {
            out.push_str(strip_indent(line, indent));
        } else {
            out.push_str(line);
        }
    }
    out
}

/// Remove as much of `indent` as the line actually starts with.
fn strip_indent<'a>(line: &'a str, indent: &str) -> &'a str {
    let matched = line
        .bytes()
        .zip(indent.bytes())
        .take_while(|(a, b)| a == b)
        .count();
    &line[matched..]
}
