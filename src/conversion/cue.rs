/*!
 * Cue construction and comment filtering.
 */

use std::fmt;

use crate::app_config::Settings;
use crate::danmaku::{Comment, PositionClass};

use super::color::convert_color;
use super::segment::{self, GlyphCategory};
use super::tags::{self, OverrideTag};
use super::trajectory::{Motion, Trajectory};

/// Why a comment produced no cue
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum DropReason {
    /// Its position class is disabled
    Disabled,
    /// Nothing left after trimming
    Empty,
    /// Contains a configured keyword
    Keyword,
    /// Contains emoji/symbols while `filter_emoji` is on
    Emoji,
    /// Repeats an earlier record from the same user
    Duplicate,
}

impl fmt::Display for DropReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Disabled => "position disabled",
            Self::Empty => "empty text",
            Self::Keyword => "keyword",
            Self::Emoji => "emoji",
            Self::Duplicate => "duplicate",
        };
        f.write_str(s)
    }
}

/// A text run with the font it is rendered in
#[derive(Debug, Clone, PartialEq)]
pub struct FontRun {
    pub font: String,
    /// Already escaped
    pub text: String,
}

/// One timed display event
#[derive(Debug, Clone, PartialEq)]
pub struct Cue {
    pub start_seconds: f64,
    pub end_seconds: f64,
    /// Name of the style this cue uses
    pub style: String,
    pub position: PositionClass,
    /// Leading override block (motion, colour, alpha)
    pub tags: Vec<OverrideTag>,
    pub runs: Vec<FontRun>,
}

impl Cue {
    pub fn duration(&self) -> f64 {
        self.end_seconds - self.start_seconds
    }

    /// Cue text with all override tags, as written after the last comma of
    /// a `Dialogue:` line
    pub fn rendered_text(&self) -> String {
        let mut text = tags::render_block(&self.tags);
        for run in &self.runs {
            text.push_str(&tags::render_block(&[OverrideTag::FontName(run.font.clone())]));
            text.push_str(&run.text);
        }
        text
    }

    /// Plain text without any markup
    pub fn plain_text(&self) -> String {
        self.runs.iter().map(|r| r.text.as_str()).collect()
    }
}

/// Cue start in seconds: source time plus the user offset, never negative
pub fn start_seconds(time_offset_tenths: u64, user_offset_seconds: f64) -> f64 {
    (time_offset_tenths as f64 / 10.0 + user_offset_seconds).max(0.0)
}

/// Filters comments and turns planned comments into cues
pub struct CueBuilder<'a> {
    settings: &'a Settings,
    keywords: Vec<String>,
}

impl<'a> CueBuilder<'a> {
    pub fn new(settings: &'a Settings) -> Self {
        let keywords = settings
            .filter_keywords
            .iter()
            .map(|k| k.trim().to_lowercase())
            .filter(|k| !k.is_empty())
            .collect();
        Self { settings, keywords }
    }

    pub fn is_enabled(&self, position: PositionClass) -> bool {
        match position {
            PositionClass::Scroll => self.settings.enable_scroll,
            PositionClass::Top => self.settings.enable_top,
            PositionClass::Bottom => self.settings.enable_bottom,
        }
    }

    /// Decide whether a comment is kept; returns its trimmed text if so
    pub fn accept<'c>(&self, comment: &'c Comment) -> Result<&'c str, DropReason> {
        if !self.is_enabled(comment.position) {
            return Err(DropReason::Disabled);
        }

        let text = comment.text.trim();
        if text.is_empty() {
            return Err(DropReason::Empty);
        }

        if !self.keywords.is_empty() {
            let lowered = text.to_lowercase();
            if self.keywords.iter().any(|k| lowered.contains(k.as_str())) {
                return Err(DropReason::Keyword);
            }
        }

        if self.settings.filter_emoji && segment::has_fallback(text) {
            return Err(DropReason::Emoji);
        }

        Ok(text)
    }

    /// Build the cue for an accepted comment
    pub fn build(&self, comment: &Comment, text: &str, start: f64, trajectory: &Trajectory) -> Cue {
        // The cue carries its own anchor so it positions correctly in any
        // style table it is merged into
        let mut tags = Vec::with_capacity(4);
        tags.push(OverrideTag::Alignment(comment.position.alignment()));
        match trajectory.motion {
            Motion::Scroll { start_x, end_x, y } => tags.push(OverrideTag::Move {
                x1: start_x.round() as i32,
                y1: y.round() as i32,
                x2: end_x.round() as i32,
                y2: y.round() as i32,
            }),
            Motion::Fixed { x, y } => tags.push(OverrideTag::Pos {
                x: x.round() as i32,
                y: y.round() as i32,
            }),
        }

        let color = convert_color(comment.color_packed, self.settings.opacity);
        tags.push(OverrideTag::PrimaryColor(color));
        tags.push(OverrideTag::PrimaryAlpha(color.alpha));

        let runs = segment::segment(text)
            .into_iter()
            .map(|run| FontRun {
                font: match run.category {
                    GlyphCategory::Primary => self.settings.font_name.clone(),
                    GlyphCategory::Fallback => self.settings.fallback_font.clone(),
                },
                text: tags::escape_text(&run.text),
            })
            .collect();

        Cue {
            start_seconds: start,
            end_seconds: start + trajectory.duration,
            style: comment.position.style_name().to_string(),
            position: comment.position,
            tags,
            runs,
        }
    }
}
