/*!
 * ASS document model and assembly.
 *
 * A `Document` is the complete output of a conversion: script info header,
 * style table and ordered cues. Construction checks that every cue points at
 * a defined style, so a `Document` value is always internally consistent.
 */

use std::collections::HashSet;
use std::fmt;

use crate::app_config::Settings;
use crate::danmaku::PositionClass;
use crate::errors::DocumentError;

use super::color::{AssColor, alpha_from_opacity};
use super::cue::Cue;

/// Field order of the `[V4+ Styles]` section
pub const STYLE_FORMAT: [&str; 23] = [
    "Name", "Fontname", "Fontsize", "PrimaryColour", "SecondaryColour", "OutlineColour", "BackColour",
    "Bold", "Italic", "Underline", "StrikeOut", "ScaleX", "ScaleY", "Spacing", "Angle", "BorderStyle",
    "Outline", "Shadow", "Alignment", "MarginL", "MarginR", "MarginV", "Encoding",
];

/// Field order of the `[Events]` section
pub const EVENT_FORMAT: [&str; 10] = [
    "Layer", "Start", "End", "Style", "Name", "MarginL", "MarginR", "MarginV", "Effect", "Text",
];

const SCRIPT_COMMENT: &str = "; Script generated by danmu2ass";

/// Format an ASS timestamp `H:MM:SS.CC`, rounded to the centisecond
pub fn format_timestamp(seconds: f64) -> String {
    let total_cs = (seconds.max(0.0) * 100.0).round() as u64;
    let cs = total_cs % 100;
    let total_secs = total_cs / 100;
    let secs = total_secs % 60;
    let minutes = (total_secs / 60) % 60;
    let hours = total_secs / 3600;
    format!("{}:{:02}:{:02}.{:02}", hours, minutes, secs, cs)
}

/// One entry of the style table
#[derive(Debug, Clone, PartialEq)]
pub struct StyleSpec {
    pub name: String,
    pub font_name: String,
    pub font_size: u32,
    pub primary: AssColor,
    pub secondary: AssColor,
    pub outline: AssColor,
    pub back: AssColor,
    pub bold: bool,
    pub outline_width: f64,
    pub shadow: f64,
    /// Numpad alignment
    pub alignment: u8,
    pub margin: u32,
    pub encoding: u8,
}

impl StyleSpec {
    /// Default style for a position class
    pub fn for_class(position: PositionClass, settings: &Settings) -> Self {
        Self {
            name: position.style_name().to_string(),
            font_name: settings.font_name.clone(),
            font_size: settings.font_size,
            primary: AssColor::WHITE.with_alpha(alpha_from_opacity(settings.opacity)),
            secondary: AssColor::RED,
            outline: AssColor::BLACK,
            back: AssColor::BLACK.with_alpha(0x80),
            bold: false,
            outline_width: 1.0,
            shadow: 0.0,
            alignment: position.alignment(),
            margin: 10,
            encoding: 1,
        }
    }

    pub fn renamed(&self, name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..self.clone()
        }
    }

    /// Value of a style field by its `Format:` name (case-insensitive)
    ///
    /// Fields this model does not carry render as their ASS defaults so the
    /// style can be written under any style-section format.
    pub fn field(&self, name: &str) -> String {
        let flag = |b: bool| if b { "-1" } else { "0" }.to_string();
        match name.trim().to_ascii_lowercase().as_str() {
            "name" => self.name.clone(),
            "fontname" => self.font_name.clone(),
            "fontsize" => self.font_size.to_string(),
            "primarycolour" => self.primary.style_value(),
            "secondarycolour" => self.secondary.style_value(),
            "outlinecolour" | "tertiarycolour" => self.outline.style_value(),
            "backcolour" => self.back.style_value(),
            "bold" => flag(self.bold),
            "scalex" | "scaley" => "100".to_string(),
            "borderstyle" => "1".to_string(),
            "outline" => format_number(self.outline_width),
            "shadow" => format_number(self.shadow),
            "alignment" => self.alignment.to_string(),
            "marginl" | "marginr" | "marginv" => self.margin.to_string(),
            "encoding" => self.encoding.to_string(),
            _ => "0".to_string(),
        }
    }

    /// `Style:` line for the given field order
    pub fn to_line<S: AsRef<str>>(&self, format: &[S]) -> String {
        let values: Vec<String> = format.iter().map(|f| self.field(f.as_ref())).collect();
        format!("Style: {}", values.join(","))
    }
}

fn format_number(value: f64) -> String {
    if value.fract() == 0.0 {
        format!("{}", value as i64)
    } else {
        format!("{}", value)
    }
}

impl Cue {
    /// Value of an event field by its `Format:` name, with `style` in place
    /// of the cue's own style name
    pub fn field(&self, name: &str, style: &str) -> String {
        match name.trim().to_ascii_lowercase().as_str() {
            "start" => format_timestamp(self.start_seconds),
            "end" => format_timestamp(self.end_seconds),
            "style" => style.to_string(),
            "text" => self.rendered_text(),
            "name" | "effect" => String::new(),
            "marked" => "Marked=0".to_string(),
            _ => "0".to_string(),
        }
    }

    /// `Dialogue:` line for the given field order
    pub fn to_line<S: AsRef<str>>(&self, format: &[S], style: &str) -> String {
        let values: Vec<String> = format.iter().map(|f| self.field(f.as_ref(), style)).collect();
        format!("Dialogue: {}", values.join(","))
    }
}

/// A complete subtitle document
#[derive(Debug, Clone, PartialEq)]
pub struct Document {
    header: Vec<(String, String)>,
    styles: Vec<StyleSpec>,
    cues: Vec<Cue>,
}

impl Document {
    /// Build a document, rejecting duplicate style names and cues that
    /// reference undefined styles
    pub fn new(header: Vec<(String, String)>, styles: Vec<StyleSpec>, cues: Vec<Cue>) -> Result<Self, DocumentError> {
        let mut names = HashSet::new();
        for style in &styles {
            if !names.insert(style.name.as_str()) {
                return Err(DocumentError::DuplicateStyle {
                    style: style.name.clone(),
                });
            }
        }
        if let Some(cue) = cues.iter().find(|c| !names.contains(c.style.as_str())) {
            return Err(DocumentError::DanglingStyle {
                style: cue.style.clone(),
            });
        }
        Ok(Self { header, styles, cues })
    }

    /// A document with nothing to contribute to a merge
    pub fn empty() -> Self {
        Self {
            header: Vec::new(),
            styles: Vec::new(),
            cues: Vec::new(),
        }
    }

    pub fn header(&self) -> &[(String, String)] {
        &self.header
    }

    pub fn styles(&self) -> &[StyleSpec] {
        &self.styles
    }

    pub fn cues(&self) -> &[Cue] {
        &self.cues
    }

    pub fn style(&self, name: &str) -> Option<&StyleSpec> {
        self.styles.iter().find(|s| s.name == name)
    }

    /// Serialize as ASS text with `\n` line endings
    pub fn to_ass(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for Document {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        writeln!(f, "[Script Info]")?;
        writeln!(f, "{}", SCRIPT_COMMENT)?;
        for (key, value) in &self.header {
            writeln!(f, "{}: {}", key, value)?;
        }
        writeln!(f)?;

        writeln!(f, "[V4+ Styles]")?;
        writeln!(f, "Format: {}", STYLE_FORMAT.join(", "))?;
        for style in &self.styles {
            writeln!(f, "{}", style.to_line(&STYLE_FORMAT))?;
        }
        writeln!(f)?;

        writeln!(f, "[Events]")?;
        writeln!(f, "Format: {}", EVENT_FORMAT.join(", "))?;
        for cue in &self.cues {
            writeln!(f, "{}", cue.to_line(&EVENT_FORMAT, &cue.style))?;
        }
        Ok(())
    }
}

/// Builds documents from cues according to the settings
pub struct DocumentAssembler<'a> {
    settings: &'a Settings,
}

impl<'a> DocumentAssembler<'a> {
    pub fn new(settings: &'a Settings) -> Self {
        Self { settings }
    }

    pub fn header(&self) -> Vec<(String, String)> {
        let entry = |k: &str, v: String| (k.to_string(), v);
        vec![
            entry("Title", "Bahamut Anime Danmaku".to_string()),
            entry("ScriptType", "v4.00+".to_string()),
            entry("WrapStyle", "2".to_string()),
            entry("ScaledBorderAndShadow", "yes".to_string()),
            entry("YCbCr Matrix", "TV.601".to_string()),
            entry("PlayResX", self.settings.resolution.width.to_string()),
            entry("PlayResY", self.settings.resolution.height.to_string()),
            entry("Timer", "100.0000".to_string()),
        ]
    }

    /// One style per enabled position class
    pub fn styles(&self) -> Vec<StyleSpec> {
        PositionClass::ALL
            .into_iter()
            .filter(|p| match p {
                PositionClass::Scroll => self.settings.enable_scroll,
                PositionClass::Top => self.settings.enable_top,
                PositionClass::Bottom => self.settings.enable_bottom,
            })
            .map(|p| StyleSpec::for_class(p, self.settings))
            .collect()
    }

    /// Assemble a document; cues are ordered by start time, ties keep their
    /// input order
    pub fn assemble(&self, mut cues: Vec<Cue>) -> Result<Document, DocumentError> {
        cues.sort_by(|a, b| a.start_seconds.total_cmp(&b.start_seconds));
        Document::new(self.header(), self.styles(), cues)
    }
}
