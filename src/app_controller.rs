use anyhow::{Context, Result};
use indicatif::{ProgressBar, ProgressStyle};
use log::{debug, info, warn};
use std::path::PathBuf;
use std::time::{Duration, Instant};

use crate::app_config::Settings;
use crate::conversion::{ConversionReport, Converter, DropReason};
use crate::danmaku::Comment;
use crate::errors::AppError;
use crate::file_utils::FileManager;
use crate::providers::{CommentSource, GamerDanmuSource, StaticSource};
use crate::resolver::resolve_reference;

// @module: Application controller for danmaku conversion

/// Earliest comment time, in seconds, above which an offset hint is logged
const LATE_START_HINT_SECS: f64 = 60.0;

/// One conversion job as requested on the command line
#[derive(Debug, Clone)]
pub struct ConvertRequest {
    /// Video serial or page URL; not needed with `input_json`
    pub reference: Option<String>,
    pub output: PathBuf,
    /// Seconds added to every cue, may be negative
    pub time_offset: f64,
    /// Existing subtitle file to merge into
    pub merge: Option<PathBuf>,
    /// Saved API response to convert instead of fetching
    pub input_json: Option<PathBuf>,
}

impl ConvertRequest {
    pub fn new(reference: impl Into<String>, output: impl Into<PathBuf>) -> Self {
        Self {
            reference: Some(reference.into()),
            output: output.into(),
            time_offset: 0.0,
            merge: None,
            input_json: None,
        }
    }
}

/// Main application controller for danmaku conversion
pub struct Controller {
    // @field: Resolved, validated settings
    settings: Settings,
}

impl Controller {
    // @method: Create a new controller with the given settings
    pub fn with_settings(settings: Settings) -> Result<Self> {
        settings.validate()?;
        Ok(Self { settings })
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    /// Run the workflow: resolve, fetch, convert, optionally merge, write
    pub async fn run(&self, request: &ConvertRequest) -> Result<ConversionReport> {
        let (source, video_sn): (Box<dyn CommentSource>, String) = match &request.input_json {
            Some(path) => {
                let source = StaticSource::from_file(path).map_err(AppError::from)?;
                let sn = match &request.reference {
                    Some(reference) => resolve_reference(reference)?,
                    None => "local".to_string(),
                };
                (Box::new(source) as Box<dyn CommentSource>, sn)
            }
            None => {
                let reference = request
                    .reference
                    .as_deref()
                    .ok_or_else(|| AppError::InvalidReference("no video reference given".to_string()))?;
                let sn = resolve_reference(reference)?;
                let source = GamerDanmuSource::new(&self.settings).map_err(AppError::from)?;
                (Box::new(source) as Box<dyn CommentSource>, sn)
            }
        };

        self.run_with_source(source.as_ref(), &video_sn, request).await
    }

    /// Run the workflow against a given comment source
    pub async fn run_with_source(
        &self,
        source: &dyn CommentSource,
        video_sn: &str,
        request: &ConvertRequest,
    ) -> Result<ConversionReport> {
        let start_time = Instant::now();

        let comments = self.fetch_with_progress(source, video_sn).await?;
        info!("Fetched {} danmaku for video {}", comments.len(), video_sn);

        let existing = match &request.merge {
            Some(path) if FileManager::file_exists(path) => {
                info!("Merging danmaku into existing subtitle file: {:?}", path);
                Some(FileManager::read_to_string(path)?)
            }
            Some(path) => {
                warn!("Merge file {:?} does not exist, writing danmaku only", path);
                None
            }
            None => None,
        };

        let converter = Converter::new(&self.settings);
        let (text, report) = converter
            .convert_to_text(&comments, request.time_offset, existing.as_deref())
            .map_err(AppError::from)
            .with_context(|| format!("Failed to build subtitles for video {}", video_sn))?;

        Self::log_report(&report);

        FileManager::write_document(&request.output, &text)?;
        info!(
            "Wrote {} danmaku to {:?} in {:.2}s",
            report.emitted,
            request.output,
            start_time.elapsed().as_secs_f64()
        );

        Ok(report)
    }

    async fn fetch_with_progress(&self, source: &dyn CommentSource, video_sn: &str) -> Result<Vec<Comment>> {
        let spinner = ProgressBar::new_spinner();
        let style = ProgressStyle::default_spinner()
            .template("{spinner:.green} [{elapsed_precise}] {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner());
        spinner.set_style(style);
        spinner.set_message(format!("Fetching danmaku for video {} from {}", video_sn, source.name()));
        spinner.enable_steady_tick(Duration::from_millis(100));

        let result = source.fetch(video_sn).await;
        spinner.finish_and_clear();

        let comments = result
            .map_err(AppError::from)
            .with_context(|| format!("Failed to fetch danmaku for video {}", video_sn))?;
        Ok(comments)
    }

    fn log_report(report: &ConversionReport) {
        if let (Some(earliest), Some(latest)) = (report.earliest_seconds, report.latest_seconds) {
            info!(
                "Danmaku time range: {:.1}s to {:.1}s (span {:.1}s)",
                earliest,
                latest,
                latest - earliest
            );
            if earliest > LATE_START_HINT_SECS {
                info!(
                    "Earliest danmaku appears at {:.1}s, a negative --time-offset may be needed",
                    earliest
                );
            }
        }

        for (reason, count) in &report.dropped {
            debug!("Dropped {} danmaku: {}", count, reason);
        }
        let filtered = report.filtered();
        if filtered > 0 {
            info!(
                "Filtered {} danmaku ({} by keyword, {} emoji)",
                filtered,
                report.dropped_for(DropReason::Keyword),
                report.dropped_for(DropReason::Emoji)
            );
        }
        if report.duplicates() > 0 {
            info!("Skipped {} duplicate danmaku", report.duplicates());
        }
    }
}
