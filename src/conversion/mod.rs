/*!
 * Danmaku to ASS conversion engine.
 *
 * The engine is synchronous and free of I/O: it takes fully materialized
 * comments plus an immutable `Settings` value and produces a `Document`, or
 * the final text when merging into an existing file.
 *
 * Pipeline: filter and deduplicate, order by start time, plan trajectories,
 * build cues, assemble the document.
 */

pub mod color;
pub mod cue;
pub mod document;
pub mod merge;
pub mod segment;
pub mod tags;
pub mod trajectory;

use std::collections::{BTreeMap, HashSet};

use log::{debug, trace, warn};

use crate::app_config::Settings;
use crate::danmaku::Comment;
use crate::errors::DocumentError;

pub use color::{AssColor, convert_color};
pub use cue::{Cue, CueBuilder, DropReason, start_seconds};
pub use document::{Document, DocumentAssembler, StyleSpec, format_timestamp};
pub use merge::merge;
pub use segment::{GlyphCategory, TextRun, segment};
pub use tags::OverrideTag;
pub use trajectory::{Motion, Trajectory, TrajectoryPlanner};

/// Summary of one conversion run
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ConversionReport {
    /// Comments received
    pub total: usize,
    /// Cues written
    pub emitted: usize,
    /// Dropped comments per reason
    pub dropped: BTreeMap<DropReason, usize>,
    /// Earliest source time in seconds, before any offset
    pub earliest_seconds: Option<f64>,
    /// Latest source time in seconds, before any offset
    pub latest_seconds: Option<f64>,
}

impl ConversionReport {
    fn record_drop(&mut self, reason: DropReason) {
        *self.dropped.entry(reason).or_insert(0) += 1;
    }

    fn record_time(&mut self, seconds: f64) {
        self.earliest_seconds = Some(self.earliest_seconds.map_or(seconds, |t| t.min(seconds)));
        self.latest_seconds = Some(self.latest_seconds.map_or(seconds, |t| t.max(seconds)));
    }

    pub fn dropped_for(&self, reason: DropReason) -> usize {
        self.dropped.get(&reason).copied().unwrap_or(0)
    }

    /// Comments removed by filters, duplicates excluded
    pub fn filtered(&self) -> usize {
        self.dropped
            .iter()
            .filter(|(reason, _)| **reason != DropReason::Duplicate)
            .map(|(_, count)| count)
            .sum()
    }

    pub fn duplicates(&self) -> usize {
        self.dropped_for(DropReason::Duplicate)
    }

    /// No cue survived; the document only carries styles
    pub fn is_empty_result(&self) -> bool {
        self.emitted == 0
    }
}

/// Result of converting a batch of comments
#[derive(Debug, Clone)]
pub struct Conversion {
    pub document: Document,
    pub report: ConversionReport,
}

/// Converts comments into subtitle documents
pub struct Converter<'a> {
    settings: &'a Settings,
}

impl<'a> Converter<'a> {
    pub fn new(settings: &'a Settings) -> Self {
        Self { settings }
    }

    /// Convert comments, shifting every cue by `time_offset` seconds
    ///
    /// Comments are processed in start order with ties kept in input order,
    /// so identical input always yields an identical document.
    pub fn convert(&self, comments: &[Comment], time_offset: f64) -> Result<Conversion, DocumentError> {
        let builder = CueBuilder::new(self.settings);
        let mut report = ConversionReport {
            total: comments.len(),
            ..ConversionReport::default()
        };

        let mut seen = HashSet::new();
        let mut accepted: Vec<(f64, &Comment, &str)> = Vec::with_capacity(comments.len());
        for comment in comments {
            report.record_time(comment.time_seconds());
            match builder.accept(comment) {
                Ok(text) => {
                    if self.settings.dedup && !seen.insert((comment.user_id.as_str(), comment.time_offset_tenths, text)) {
                        trace!("Dropping duplicate danmaku '{}' at {:.1}s", text, comment.time_seconds());
                        report.record_drop(DropReason::Duplicate);
                        continue;
                    }
                    accepted.push((start_seconds(comment.time_offset_tenths, time_offset), comment, text));
                }
                Err(reason) => {
                    trace!("Dropping danmaku '{}': {}", comment.text, reason);
                    report.record_drop(reason);
                }
            }
        }

        accepted.sort_by(|a, b| a.0.total_cmp(&b.0));

        let mut planner = TrajectoryPlanner::new(self.settings);
        let cues: Vec<Cue> = accepted
            .iter()
            .filter_map(|&(start, comment, text)| {
                planner
                    .plan(text, comment.position, start)
                    .map(|trajectory| builder.build(comment, text, start, &trajectory))
            })
            .collect();
        report.emitted = cues.len();

        let document = DocumentAssembler::new(self.settings).assemble(cues)?;

        debug!(
            "Converted {} of {} danmaku ({} filtered, {} duplicates)",
            report.emitted,
            report.total,
            report.filtered(),
            report.duplicates()
        );
        if report.is_empty_result() {
            warn!("No danmaku left after filtering, the document only contains styles");
        }

        Ok(Conversion { document, report })
    }

    /// Convert and serialize, merging into `existing` ASS text when given
    pub fn convert_to_text(
        &self,
        comments: &[Comment],
        time_offset: f64,
        existing: Option<&str>,
    ) -> Result<(String, ConversionReport), DocumentError> {
        let Conversion { document, report } = self.convert(comments, time_offset)?;
        let text = match existing {
            Some(existing) => merge(existing, &document)?,
            None => document.to_ass(),
        };
        Ok((text, report))
    }
}
