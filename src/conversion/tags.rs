/*!
 * Structured ASS override tags.
 *
 * Tags are kept as data until serialization so callers can inspect what a
 * cue does without re-parsing markup.
 */

use std::fmt;

use super::color::AssColor;

/// One inline override tag
#[derive(Debug, Clone, PartialEq)]
pub enum OverrideTag {
    /// `\an<n>`, numpad alignment independent of the style
    Alignment(u8),
    /// `\move(x1,y1,x2,y2)` over the whole cue
    Move { x1: i32, y1: i32, x2: i32, y2: i32 },
    /// `\pos(x,y)`
    Pos { x: i32, y: i32 },
    /// `\1c&HBBGGRR&`
    PrimaryColor(AssColor),
    /// `\1a&HAA&`
    PrimaryAlpha(u8),
    /// `\fn<name>`
    FontName(String),
}

impl fmt::Display for OverrideTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Alignment(an) => write!(f, "\\an{}", an),
            Self::Move { x1, y1, x2, y2 } => write!(f, "\\move({},{},{},{})", x1, y1, x2, y2),
            Self::Pos { x, y } => write!(f, "\\pos({},{})", x, y),
            Self::PrimaryColor(color) => write!(f, "\\1c{}", color.tag_value()),
            Self::PrimaryAlpha(alpha) => write!(f, "\\1a&H{:02X}&", alpha),
            Self::FontName(name) => write!(f, "\\fn{}", name),
        }
    }
}

/// Render a tag sequence as one `{...}` block; empty input renders nothing
pub fn render_block(tags: &[OverrideTag]) -> String {
    if tags.is_empty() {
        return String::new();
    }
    let mut block = String::from("{");
    for tag in tags {
        block.push_str(&tag.to_string());
    }
    block.push('}');
    block
}

/// Replace characters that would be read as ASS markup
///
/// Braces open and close override blocks and a backslash starts an escape
/// such as `\N`, so all three are swapped for their fullwidth forms.
/// Line breaks collapse to spaces since a danmaku is a single line.
pub fn escape_text(text: &str) -> String {
    text.chars()
        .map(|c| match c {
            '{' => '｛',
            '}' => '｝',
            '\\' => '＼',
            '\r' | '\n' => ' ',
            other => other,
        })
        .collect()
}
