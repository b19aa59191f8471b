use log::{debug, warn};
use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;

// @module: Danmaku comment model and raw API records

/// Where a comment is displayed on screen
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PositionClass {
    /// Moves from the right edge to the left edge
    Scroll,
    /// Fixed, centered near the top edge
    Top,
    /// Fixed, centered near the bottom edge
    Bottom,
}

impl PositionClass {
    pub const ALL: [PositionClass; 3] = [Self::Scroll, Self::Top, Self::Bottom];

    /// Map the API's numeric position; unknown values scroll
    pub fn from_api(position: i64) -> Self {
        match position {
            1 => Self::Top,
            2 => Self::Bottom,
            _ => Self::Scroll,
        }
    }

    /// Numpad alignment (`\an`) the class is anchored with
    ///
    /// Scroll cues are anchored at their top-left corner so motion
    /// coordinates describe the text's left edge; top and bottom cues are
    /// centered on their slot.
    pub fn alignment(&self) -> u8 {
        match self {
            Self::Scroll => 7,
            Self::Top => 8,
            Self::Bottom => 2,
        }
    }

    // @returns: Default style name for this class
    pub fn style_name(&self) -> &'static str {
        match self {
            Self::Scroll => "scroll",
            Self::Top => "top",
            Self::Bottom => "bottom",
        }
    }
}

impl fmt::Display for PositionClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.style_name())
    }
}

/// A single danmaku comment
#[derive(Debug, Clone, PartialEq)]
pub struct Comment {
    pub text: String,

    /// Offset from the start of the video in tenths of a second
    pub time_offset_tenths: u64,

    /// 0xRRGGBB
    pub color_packed: u32,

    pub position: PositionClass,

    /// Opaque submitter id, only used for deduplication
    pub user_id: String,
}

impl Comment {
    pub fn new(text: impl Into<String>, time_offset_tenths: u64, color_packed: u32, position: PositionClass) -> Self {
        Self {
            text: text.into(),
            time_offset_tenths,
            color_packed: color_packed & 0x00FF_FFFF,
            position,
            user_id: String::new(),
        }
    }

    pub fn with_user(mut self, user_id: impl Into<String>) -> Self {
        self.user_id = user_id.into();
        self
    }

    /// Offset from the start of the video in seconds
    pub fn time_seconds(&self) -> f64 {
        self.time_offset_tenths as f64 / 10.0
    }
}

/// Danmu record as returned by the anime danmu API
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DanmuRecord {
    #[serde(default)]
    pub text: String,

    /// `#RRGGBB`
    #[serde(default = "default_color")]
    pub color: String,

    #[serde(default, deserialize_with = "lenient_i64")]
    pub size: i64,

    #[serde(default, deserialize_with = "lenient_i64")]
    pub position: i64,

    /// Tenths of a second, sent as either a number or a string; required
    #[serde(deserialize_with = "required_i64")]
    pub time: i64,

    #[serde(default, deserialize_with = "lenient_i64")]
    pub sn: i64,

    #[serde(default)]
    pub userid: String,
}

fn default_color() -> String {
    "#FFFFFF".to_string()
}

#[derive(Deserialize)]
#[serde(untagged)]
enum Lenient {
    Int(i64),
    Float(f64),
    Str(String),
    Null,
}

impl Lenient {
    fn into_i64(self) -> Result<Option<i64>, String> {
        match self {
            Self::Int(n) => Ok(Some(n)),
            Self::Float(f) => Ok(Some(f as i64)),
            Self::Str(s) => {
                let s = s.trim();
                s.parse::<i64>()
                    .or_else(|_| s.parse::<f64>().map(|f| f as i64))
                    .map(Some)
                    .map_err(|_| format!("'{}' is not a number", s))
            }
            Self::Null => Ok(None),
        }
    }
}

/// Accept integers, floats and numeric strings; `null` reads as 0
fn lenient_i64<'de, D: Deserializer<'de>>(deserializer: D) -> Result<i64, D::Error> {
    Lenient::deserialize(deserializer)?
        .into_i64()
        .map(|n| n.unwrap_or(0))
        .map_err(serde::de::Error::custom)
}

/// Like `lenient_i64`, but `null` is an error
fn required_i64<'de, D: Deserializer<'de>>(deserializer: D) -> Result<i64, D::Error> {
    Lenient::deserialize(deserializer)?
        .into_i64()
        .map_err(serde::de::Error::custom)?
        .ok_or_else(|| serde::de::Error::custom("value is null"))
}

/// Parse `#RRGGBB` (or `RRGGBB`), falling back to white
pub fn parse_hex_color(color: &str) -> u32 {
    let hex = color.trim().trim_start_matches('#');
    if hex.len() != 6 {
        return 0xFF_FFFF;
    }
    u32::from_str_radix(hex, 16).unwrap_or(0xFF_FFFF)
}

impl From<DanmuRecord> for Comment {
    fn from(record: DanmuRecord) -> Self {
        Comment {
            time_offset_tenths: record.time.max(0) as u64,
            color_packed: parse_hex_color(&record.color),
            position: PositionClass::from_api(record.position),
            user_id: record.userid,
            text: record.text,
        }
    }
}

/// Top-level API response `{"data": {"danmu": [...]}}`
#[derive(Debug, Deserialize)]
pub struct DanmuResponse {
    pub data: Option<DanmuData>,
}

#[derive(Debug, Deserialize)]
pub struct DanmuData {
    /// Kept raw so one broken record does not fail the whole response
    pub danmu: Option<Vec<serde_json::Value>>,
}

/// Records of a response plus the number that could not be read
#[derive(Debug, Default)]
pub struct DanmuRecords {
    pub records: Vec<DanmuRecord>,
    pub skipped: usize,
}

impl DanmuResponse {
    /// Take the records out of the response, if it carries any payload
    ///
    /// Unreadable records are skipped and counted.
    pub fn into_records(self) -> Option<DanmuRecords> {
        let raw = self.data.and_then(|d| d.danmu)?;
        let mut result = DanmuRecords {
            records: Vec::with_capacity(raw.len()),
            skipped: 0,
        };
        for (index, value) in raw.into_iter().enumerate() {
            match serde_json::from_value::<DanmuRecord>(value) {
                Ok(record) => result.records.push(record),
                Err(e) => {
                    debug!("Skipping danmu record {}: {}", index, e);
                    result.skipped += 1;
                }
            }
        }
        if result.skipped > 0 {
            warn!("Skipped {} unreadable danmu records", result.skipped);
        }
        Some(result)
    }
}
