/*!
 * Merging new cues into an existing ASS document.
 *
 * The existing text is parsed into sections, new styles are reconciled
 * against the ones already defined, and the new style and cue lines are
 * inserted at the end of their sections. Every existing line is written back
 * unchanged, including its line ending and a leading byte-order mark, so
 * merging a document with nothing to add returns the input verbatim.
 */

use std::collections::HashMap;

use log::debug;

use crate::errors::DocumentError;

use super::document::{Document, EVENT_FORMAT, STYLE_FORMAT, StyleSpec};

const BOM: char = '\u{FEFF}';

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SectionKind {
    ScriptInfo,
    Styles,
    Events,
    Other,
}

impl SectionKind {
    fn from_header(header: &str) -> Self {
        match header.to_ascii_lowercase().as_str() {
            "[script info]" => Self::ScriptInfo,
            "[v4+ styles]" | "[v4 styles]" | "[v4 styles+]" => Self::Styles,
            "[events]" => Self::Events,
            _ => Self::Other,
        }
    }
}

#[derive(Debug)]
struct Section {
    kind: SectionKind,
    /// Index of the `[...]` line
    header: usize,
    /// Index of the last non-blank line, the header included
    last_content: usize,
    format: Option<Vec<String>>,
    /// SSA `[V4 Styles]`, whose Alignment uses the legacy numbering
    legacy: bool,
}

#[derive(Debug)]
struct ExistingStyle {
    name: String,
    values: Vec<String>,
}

/// Structural view over the existing text; lines keep their endings
#[derive(Debug)]
struct ParsedDocument<'a> {
    bom: bool,
    lines: Vec<&'a str>,
    eol: &'static str,
    sections: Vec<Section>,
    styles: Vec<ExistingStyle>,
}

impl ParsedDocument<'_> {
    fn section(&self, kind: SectionKind) -> Option<&Section> {
        self.sections.iter().find(|s| s.kind == kind)
    }

    fn ends_blank(&self) -> bool {
        self.lines.last().is_none_or(|l| l.trim().is_empty())
    }
}

fn parse_format(value: &str) -> Vec<String> {
    value.split(',').map(|f| f.trim().to_string()).collect()
}

fn has_field(format: &[String], name: &str) -> bool {
    format.iter().any(|f| f.eq_ignore_ascii_case(name))
}

fn parse(text: &str) -> Result<ParsedDocument<'_>, DocumentError> {
    let (bom, body) = match text.strip_prefix(BOM) {
        Some(rest) => (true, rest),
        None => (false, text),
    };
    let lines: Vec<&str> = body.split_inclusive('\n').collect();
    let eol = if lines.first().is_some_and(|l| l.ends_with("\r\n")) { "\r\n" } else { "\n" };

    let mut sections: Vec<Section> = Vec::new();
    let mut styles = Vec::new();

    for (idx, raw) in lines.iter().enumerate() {
        let line_no = idx + 1;
        let content = raw.trim();

        if content.starts_with('[') && content.ends_with(']') {
            let kind = SectionKind::from_header(content);
            if kind != SectionKind::Other && sections.iter().any(|s| s.kind == kind) {
                return Err(DocumentError::malformed(line_no, format!("duplicate section {}", content)));
            }
            sections.push(Section {
                kind,
                header: idx,
                last_content: idx,
                format: None,
                legacy: content.eq_ignore_ascii_case("[v4 styles]"),
            });
            continue;
        }

        if content.is_empty() {
            continue;
        }

        let Some(section) = sections.last_mut() else {
            if content.starts_with(';') || content.starts_with('!') {
                continue;
            }
            return Err(DocumentError::malformed(line_no, "content before the first section"));
        };
        section.last_content = idx;

        if content.starts_with(';') || !matches!(section.kind, SectionKind::Styles | SectionKind::Events) {
            continue;
        }
        let Some((key, value)) = content.split_once(':') else {
            continue;
        };
        let key = key.trim();

        if key.eq_ignore_ascii_case("format") {
            if section.format.is_some() {
                return Err(DocumentError::malformed(line_no, "repeated Format line"));
            }
            let format = parse_format(value);
            match section.kind {
                SectionKind::Styles if !has_field(&format, "name") => {
                    return Err(DocumentError::malformed(line_no, "style Format has no Name field"));
                }
                SectionKind::Events if !has_field(&format, "style") => {
                    return Err(DocumentError::malformed(line_no, "event Format has no Style field"));
                }
                SectionKind::Events if !format.last().is_some_and(|f| f.eq_ignore_ascii_case("text")) => {
                    return Err(DocumentError::malformed(line_no, "event Format must end with Text"));
                }
                _ => {}
            }
            section.format = Some(format);
            continue;
        }

        let Some(format) = &section.format else {
            return Err(DocumentError::malformed(line_no, format!("{} line before Format", key)));
        };

        if section.kind == SectionKind::Styles && key.eq_ignore_ascii_case("style") {
            let values: Vec<String> = value.splitn(format.len(), ',').map(|v| v.trim().to_string()).collect();
            if values.len() != format.len() {
                return Err(DocumentError::malformed(
                    line_no,
                    format!("style has {} fields, Format declares {}", values.len(), format.len()),
                ));
            }
            let name_idx = format.iter().position(|f| f.eq_ignore_ascii_case("name")).unwrap_or(0);
            styles.push(ExistingStyle {
                name: values[name_idx].clone(),
                values,
            });
        }
    }

    if !sections.iter().any(|s| s.kind == SectionKind::ScriptInfo) {
        return Err(DocumentError::malformed(0, "missing [Script Info] section"));
    }

    Ok(ParsedDocument {
        bom,
        lines,
        eol,
        sections,
        styles,
    })
}

/// Outcome of matching the new styles against the existing ones
#[derive(Debug, Default)]
struct Reconciliation {
    /// New style name to the name its cues must reference
    names: HashMap<String, String>,
    /// Styles to add, already renamed where needed
    added: Vec<StyleSpec>,
}

/// Identical styles are shared; a same-named style with different values is
/// added under `name_2`, `name_3`, ... Names compare case-insensitively.
fn reconcile_styles(existing: &[ExistingStyle], incoming: &[StyleSpec], format: &[String]) -> Reconciliation {
    let mut taken: Vec<String> = existing.iter().map(|s| s.name.to_lowercase()).collect();
    let mut result = Reconciliation::default();

    for style in incoming {
        let values: Vec<String> = format.iter().map(|f| style.field(f)).collect();
        let identical = existing.iter().find(|e| {
            e.name.to_lowercase() == style.name.to_lowercase()
                && format
                    .iter()
                    .zip(e.values.iter().zip(&values))
                    .all(|(field, (a, b))| field.eq_ignore_ascii_case("name") || a == b)
        });

        if let Some(existing_style) = identical {
            debug!("Style '{}' already defined identically, reusing it", style.name);
            result.names.insert(style.name.clone(), existing_style.name.clone());
            continue;
        }

        let name = if taken.contains(&style.name.to_lowercase()) {
            let mut suffix = 2;
            loop {
                let candidate = format!("{}_{}", style.name, suffix);
                if !taken.contains(&candidate.to_lowercase()) {
                    break candidate;
                }
                suffix += 1;
            }
        } else {
            style.name.clone()
        };

        if name != style.name {
            debug!("Style '{}' collides with an existing style, adding it as '{}'", style.name, name);
        }
        taken.push(name.to_lowercase());
        result.names.insert(style.name.clone(), name.clone());
        result.added.push(style.renamed(name));
    }

    result
}

/// SSA alignment for a numpad one: 1-3 bottom, 5-7 top, 9-11 middle
fn legacy_alignment(numpad: u8) -> u8 {
    let column = (numpad.clamp(1, 9) - 1) % 3 + 1;
    match (numpad.clamp(1, 9) - 1) / 3 {
        0 => column,
        1 => column + 8,
        _ => column + 4,
    }
}

fn owned_format(format: &[&str]) -> Vec<String> {
    format.iter().map(|f| f.to_string()).collect()
}

/// Merge a newly assembled document into existing ASS text
///
/// Existing lines are preserved byte for byte. New styles go after the last
/// line of the style section and new cues after the last existing cue; a
/// missing style or event section is created. Fails without producing any
/// output when the existing text does not have a usable ASS structure.
pub fn merge(existing: &str, new: &Document) -> Result<String, DocumentError> {
    let parsed = parse(existing)?;
    if new.styles().is_empty() && new.cues().is_empty() {
        return Ok(existing.to_string());
    }

    let styles_section = parsed.section(SectionKind::Styles);
    let events_section = parsed.section(SectionKind::Events);

    let style_format = styles_section
        .and_then(|s| s.format.clone())
        .unwrap_or_else(|| owned_format(&STYLE_FORMAT));
    let event_format = events_section
        .and_then(|s| s.format.clone())
        .unwrap_or_else(|| owned_format(&EVENT_FORMAT));

    let incoming: Vec<StyleSpec> = if styles_section.is_some_and(|s| s.legacy) {
        new.styles()
            .iter()
            .map(|s| StyleSpec {
                alignment: legacy_alignment(s.alignment),
                ..s.clone()
            })
            .collect()
    } else {
        new.styles().to_vec()
    };
    let reconciliation = reconcile_styles(&parsed.styles, &incoming, &style_format);

    let mut style_lines = Vec::new();
    if styles_section.is_none_or(|s| s.format.is_none()) && !reconciliation.added.is_empty() {
        style_lines.push(format!("Format: {}", style_format.join(", ")));
    }
    style_lines.extend(reconciliation.added.iter().map(|s| s.to_line(&style_format)));

    let mut event_lines = Vec::new();
    if events_section.is_none_or(|s| s.format.is_none()) && !new.cues().is_empty() {
        event_lines.push(format!("Format: {}", event_format.join(", ")));
    }
    event_lines.extend(new.cues().iter().map(|cue| {
        let style = reconciliation.names.get(&cue.style).unwrap_or(&cue.style);
        cue.to_line(&event_format, style)
    }));

    // before[i] holds the lines inserted ahead of existing line i
    let mut before: Vec<Vec<String>> = vec![Vec::new(); parsed.lines.len() + 1];
    let mut tail_blocks: Vec<Vec<String>> = Vec::new();

    if !reconciliation.added.is_empty() {
        match (styles_section, events_section) {
            (Some(section), _) => before[section.last_content + 1].append(&mut style_lines),
            (None, Some(events)) => {
                let slot = &mut before[events.header];
                slot.push("[V4+ Styles]".to_string());
                slot.append(&mut style_lines);
                slot.push(String::new());
            }
            (None, None) => {
                let mut block = vec!["[V4+ Styles]".to_string()];
                block.append(&mut style_lines);
                tail_blocks.push(block);
            }
        }
    }

    if !new.cues().is_empty() {
        match events_section {
            Some(section) => before[section.last_content + 1].append(&mut event_lines),
            None => {
                let mut block = vec!["[Events]".to_string()];
                block.append(&mut event_lines);
                tail_blocks.push(block);
            }
        }
    }

    for (idx, block) in tail_blocks.into_iter().enumerate() {
        let slot = &mut before[parsed.lines.len()];
        if idx > 0 || !parsed.ends_blank() {
            slot.push(String::new());
        }
        slot.extend(block);
    }

    let mut out = String::with_capacity(existing.len() + 128 * new.cues().len());
    if parsed.bom {
        out.push(BOM);
    }
    let body_start = out.len();
    for (idx, inserted) in before.iter().enumerate() {
        for line in inserted {
            if out.len() > body_start && !out.ends_with('\n') {
                out.push_str(parsed.eol);
            }
            out.push_str(line);
            out.push_str(parsed.eol);
        }
        if let Some(line) = parsed.lines.get(idx) {
            out.push_str(line);
        }
    }

    Ok(out)
}
