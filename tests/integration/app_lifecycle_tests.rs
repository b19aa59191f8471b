/*!
 * Controller lifecycle tests: settings, sources, merging and output files
 */

use anyhow::Result;
use std::fs;

use danmu2ass::app_config::Settings;
use danmu2ass::app_controller::{ConvertRequest, Controller};
use danmu2ass::conversion::DropReason;
use danmu2ass::providers::StaticSource;

use crate::common;

/// Test rejecting invalid settings up front
#[test]
fn test_controller_withInvalidSettings_shouldFail() {
    let settings = Settings {
        opacity: 1.5,
        ..Settings::default()
    };
    assert!(Controller::with_settings(settings).is_err());

    let settings = Settings {
        font_size: 0,
        ..Settings::default()
    };
    assert!(Controller::with_settings(settings).is_err());
}

/// Test writing a fresh subtitle file from a source
#[tokio::test]
async fn test_runWithSource_shouldWriteSubtitleFile() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let output = temp_dir.path().join("danmaku.ass");
    let controller = Controller::with_settings(Settings::default())?;
    let source = StaticSource::new(common::sample_comments());

    let request = ConvertRequest::new("12345", &output);
    let report = controller.run_with_source(&source, "12345", &request).await?;

    assert_eq!(report.emitted, 3);
    assert_eq!(source.fetch_count(), 1);

    let text = fs::read_to_string(&output)?;
    assert!(text.starts_with('\u{FEFF}'));
    assert_eq!(common::dialogue_lines(&text).len(), 3);
    assert_eq!(common::style_lines(&text).len(), 3);
    Ok(())
}

/// Test that a missing merge target degrades to a plain document
#[tokio::test]
async fn test_runWithSource_withMissingMergeFile_shouldWriteDanmakuOnly() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let output = temp_dir.path().join("out.ass");
    let controller = Controller::with_settings(Settings::default())?;
    let source = StaticSource::new(common::sample_comments());

    let mut request = ConvertRequest::new("1", &output);
    request.merge = Some(temp_dir.path().join("missing.ass"));
    controller.run_with_source(&source, "1", &request).await?;

    let text = fs::read_to_string(&output)?;
    assert!(text.contains("; Script generated by danmu2ass"));
    assert_eq!(common::dialogue_lines(&text).len(), 3);
    Ok(())
}

/// Test merging into an existing episode subtitle
#[tokio::test]
async fn test_runWithSource_withMergeFile_shouldKeepExistingLines() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let existing = common::create_test_file(temp_dir.path(), "episode.zh.ass", common::sample_existing_ass())?;
    let output = temp_dir.path().join("episode.ass");
    let controller = Controller::with_settings(Settings::default())?;
    let source = StaticSource::new(common::sample_comments());

    let mut request = ConvertRequest::new("1", &output);
    request.merge = Some(existing.clone());
    request.time_offset = -5.0;
    let report = controller.run_with_source(&source, "1", &request).await?;
    assert_eq!(report.emitted, 3);

    let bytes = fs::read(&output)?;
    assert!(bytes.starts_with(&[0xEF, 0xBB, 0xBF]));
    assert!(!bytes[3..].starts_with(&[0xEF, 0xBB, 0xBF]));

    let text = String::from_utf8(bytes)?;
    assert!(text.contains("Title: Episode 1\r\n"));
    assert!(text.contains("{\\i1}第二句{\\i0}, 有逗號\r\n"));
    assert!(!text.contains("danmu2ass"));

    let dialogues = common::dialogue_lines(&text);
    assert_eq!(dialogues.len(), 5);
    assert!(dialogues[2].starts_with("Dialogue: 0,0:00:05.00,"));
    assert_eq!(common::style_lines(&text).len(), 4);

    // The source file itself stays untouched
    assert_eq!(fs::read_to_string(&existing)?, common::sample_existing_ass());
    Ok(())
}

/// Test that a failing source leaves no output behind
#[tokio::test]
async fn test_runWithSource_withFailingSource_shouldNotCreateOutput() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let output = temp_dir.path().join("never.ass");
    let controller = Controller::with_settings(Settings::default())?;
    let source = StaticSource::failing("connection reset");

    let request = ConvertRequest::new("1", &output);
    let err = controller.run_with_source(&source, "1", &request).await.unwrap_err();

    assert!(format!("{:#}", err).contains("connection reset"));
    assert!(!output.exists());
    Ok(())
}

/// Test that filtered comments are reported and absent from the output
#[tokio::test]
async fn test_runWithSource_withKeywordFilter_shouldReportDrops() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let output = temp_dir.path().join("filtered.ass");
    let settings = Settings {
        filter_keywords: vec!["高能".to_string()],
        ..Settings::default()
    };
    let controller = Controller::with_settings(settings)?;
    let source = StaticSource::new(common::sample_comments());

    let report = controller
        .run_with_source(&source, "1", &ConvertRequest::new("1", &output))
        .await?;

    assert_eq!(report.dropped_for(DropReason::Keyword), 1);
    assert_eq!(report.filtered(), 1);
    let text = fs::read_to_string(&output)?;
    assert!(!text.contains("前方高能"));
    Ok(())
}

/// Test the offline path converting a saved API response
#[tokio::test]
async fn test_run_withInputJson_shouldConvertWithoutReference() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let input = common::create_test_file(temp_dir.path(), "danmu.json", common::sample_api_response())?;
    let output = temp_dir.path().join("offline.ass");
    let controller = Controller::with_settings(Settings::default())?;

    let request = ConvertRequest {
        reference: None,
        output: output.clone(),
        time_offset: 0.0,
        merge: None,
        input_json: Some(input),
    };
    let report = controller.run(&request).await?;

    assert_eq!(report.total, 5);
    assert_eq!(report.duplicates(), 1);
    assert_eq!(common::dialogue_lines(&fs::read_to_string(&output)?).len(), 4);
    Ok(())
}

/// Test that an unusable reference fails before anything is fetched
#[tokio::test]
async fn test_run_withInvalidReference_shouldFail() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let output = temp_dir.path().join("bad.ass");
    let controller = Controller::with_settings(Settings::default())?;

    let err = controller
        .run(&ConvertRequest::new("not a video", &output))
        .await
        .unwrap_err();

    assert!(err.to_string().contains("not a video"));
    assert!(!output.exists());
    Ok(())
}
