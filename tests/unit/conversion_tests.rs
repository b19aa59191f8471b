/*!
 * Tests for the conversion engine
 */

use danmu2ass::app_config::{Preset, Settings};
use danmu2ass::conversion::trajectory::{min_readable_speed, text_pixel_width};
use danmu2ass::conversion::{
    AssColor, Converter, DropReason, GlyphCategory, OverrideTag, TrajectoryPlanner, convert_color, segment,
    start_seconds,
};
use danmu2ass::{Comment, PositionClass};

use crate::common;

/// Test cue start computation
#[test]
fn test_startSeconds_withOffsets_shouldShiftAndClampAtZero() {
    let cases = [(1234, -60.0, 63.4), (0, 0.0, 0.0), (50, -10.0, 0.0), (50, 1.5, 6.5)];
    for (tenths, offset, expected) in cases {
        let start = start_seconds(tenths, offset);
        assert!((start - expected).abs() < 1e-9, "{} tenths {} offset gave {}", tenths, offset, start);
    }
}

/// Test opacity only affecting the alpha byte
#[test]
fn test_convertColor_withExtremeOpacities_shouldKeepChannels() {
    let opaque = convert_color(0xFF8040, 1.0);
    let invisible = convert_color(0xFF8040, 0.0);
    assert_eq!(opaque, AssColor { alpha: 0, blue: 0x40, green: 0x80, red: 0xFF });
    assert_eq!(invisible.alpha, 255);
    assert_eq!((invisible.blue, invisible.green, invisible.red), (0x40, 0x80, 0xFF));
}

/// Test that segmentation never loses or reorders text
#[test]
fn test_segment_withAssortedText_shouldBeLossless() {
    let samples = [
        "前方高能！！！",
        "8888888",
        "笑死😂😂😂 www",
        "🇹🇼🇭🇰",
        "👨‍👩‍👧 family",
        "♪～ OP 神曲 ～♪",
        "{\\an8}注入",
        "",
    ];
    for sample in samples {
        let runs = segment(sample);
        let joined: String = runs.iter().map(|r| r.text.as_str()).collect();
        assert_eq!(joined, sample);
        for pair in runs.windows(2) {
            assert_ne!(pair[0].category, pair[1].category, "runs must be coalesced in {:?}", sample);
        }
    }
    assert!(segment("😂").iter().all(|r| r.category == GlyphCategory::Fallback));
}

/// Test the readable speed floor for every preset and length
#[test]
fn test_scrollTrajectory_withAnyLength_shouldStayAboveMinimumSpeed() {
    for preset in Preset::ALL {
        let settings = preset.apply(Settings::default());
        let mut planner = TrajectoryPlanner::new(&settings);
        for len in [1usize, 3, 10, 30, 80, 200] {
            let text = "彈".repeat(len);
            let trajectory = planner
                .plan(&text, PositionClass::Scroll, len as f64)
                .expect("non-empty text should be planned");
            let distance = f64::from(settings.resolution.width) + text_pixel_width(&text, settings.font_size);
            let speed = distance / trajectory.duration;
            assert!(
                speed >= min_readable_speed(settings.font_size) - 1e-9,
                "preset {} len {} speed {}",
                preset,
                len,
                speed
            );
        }
    }
}

/// Test that simultaneous scrolling comments get separate lanes
#[test]
fn test_scrollLanes_withBurst_shouldNotShareRows() {
    let settings = Settings::default();
    let comments: Vec<Comment> = (0..10)
        .map(|i| Comment::new(format!("同時{}", i), 100, 0xFFFFFF, PositionClass::Scroll))
        .collect();
    let conversion = Converter::new(&settings).convert(&comments, 0.0).unwrap();

    let mut rows: Vec<i32> = conversion
        .document
        .cues()
        .iter()
        .map(|cue| match cue.tags[1] {
            OverrideTag::Move { y1, y2, .. } => {
                assert_eq!(y1, y2);
                y1
            }
            ref other => panic!("scroll cue should carry a move tag after its anchor, got {:?}", other),
        })
        .collect();
    rows.sort_unstable();
    rows.dedup();
    assert_eq!(rows.len(), 10);
}

/// Test determinism of the whole conversion
#[test]
fn test_convert_withIdenticalInput_shouldBeByteIdentical() {
    let settings = Settings {
        filter_keywords: vec!["劇透".to_string()],
        ..Settings::default()
    };
    let comments: Vec<Comment> = (0..200)
        .map(|i| {
            let position = PositionClass::from_api(i % 3);
            Comment::new(format!("彈幕 {} ⭐", i), (i * 7 % 600) as u64, (i * 0x10101) as u32, position)
                .with_user(format!("u{}", i % 13))
        })
        .collect();

    let first = Converter::new(&settings).convert(&comments, -1.5).unwrap().document.to_ass();
    let second = Converter::new(&settings).convert(&comments, -1.5).unwrap().document.to_ass();
    assert_eq!(first, second);
}

/// Test keyword and emoji filtering
#[test]
fn test_convert_withFilters_shouldDropMatchingComments() {
    let settings = Settings {
        filter_keywords: vec!["spoiler".to_string(), "劇透".to_string()],
        filter_emoji: true,
        ..Settings::default()
    };
    let comments = vec![
        Comment::new("No SPOILERS please", 10, 0xFFFFFF, PositionClass::Scroll),
        Comment::new("前面有劇透", 20, 0xFFFFFF, PositionClass::Top),
        Comment::new("太好笑了😂", 30, 0xFFFFFF, PositionClass::Scroll),
        Comment::new("正常彈幕！", 40, 0xFFFFFF, PositionClass::Bottom),
    ];
    let conversion = Converter::new(&settings).convert(&comments, 0.0).unwrap();

    let texts: Vec<String> = conversion.document.cues().iter().map(|c| c.plain_text()).collect();
    assert_eq!(texts, vec!["正常彈幕！".to_string()]);
    assert_eq!(conversion.report.dropped_for(DropReason::Keyword), 2);
    assert_eq!(conversion.report.dropped_for(DropReason::Emoji), 1);
    assert_eq!(conversion.report.filtered(), 3);
}

/// Test the three position classes end to end
#[test]
fn test_convert_withOneCommentPerClass_shouldEmitStylesAndOrderedCues() {
    let settings = Settings::default();
    let conversion = Converter::new(&settings).convert(&common::sample_comments(), 0.0).unwrap();
    let document = &conversion.document;

    assert_eq!(document.styles().len(), 3);
    assert_eq!(document.cues().len(), 3);
    let starts: Vec<f64> = document.cues().iter().map(|c| c.start_seconds).collect();
    assert_eq!(starts, vec![10.0, 20.0, 30.0]);
    let styles: Vec<&str> = document.cues().iter().map(|c| c.style.as_str()).collect();
    assert_eq!(styles, vec!["scroll", "top", "bottom"]);

    let text = document.to_ass();
    assert_eq!(common::style_lines(&text).len(), 3);
    assert_eq!(common::dialogue_lines(&text).len(), 3);
    assert!(text.contains("PlayResX: 1920\nPlayResY: 1080\n"));
}

/// Test that a disabled class removes both its style and its cues
#[test]
fn test_convert_withDisabledClass_shouldOmitStyleAndCues() {
    let settings = Settings {
        enable_top: false,
        ..Settings::default()
    };
    let conversion = Converter::new(&settings).convert(&common::sample_comments(), 0.0).unwrap();

    assert_eq!(conversion.document.styles().len(), 2);
    assert_eq!(conversion.document.cues().len(), 2);
    assert!(conversion.document.style("top").is_none());
    assert_eq!(conversion.report.dropped_for(DropReason::Disabled), 1);
}

/// Test equal start times keeping input order
#[test]
fn test_convert_withEqualStarts_shouldKeepInputOrder() {
    let settings = Settings::default();
    let comments = vec![
        Comment::new("first", 50, 0xFFFFFF, PositionClass::Top),
        Comment::new("early", 10, 0xFFFFFF, PositionClass::Top),
        Comment::new("second", 50, 0xFFFFFF, PositionClass::Bottom),
        Comment::new("third", 50, 0xFFFFFF, PositionClass::Top),
    ];
    let conversion = Converter::new(&settings).convert(&comments, 0.0).unwrap();
    let texts: Vec<String> = conversion.document.cues().iter().map(|c| c.plain_text()).collect();
    assert_eq!(texts, vec!["early", "first", "second", "third"]);
}

/// Test rendered cue markup
#[test]
fn test_dialogueLine_withScrollComment_shouldCarryMoveColorAndFonts() {
    let settings = Settings {
        opacity: 1.0,
        fallback_font: "Noto Color Emoji".to_string(),
        ..Settings::default()
    };
    let comments = vec![Comment::new("好耶😀", 32, 0xFF8040, PositionClass::Scroll)];
    let text = Converter::new(&settings).convert(&comments, 0.0).unwrap().document.to_ass();

    let lines = common::dialogue_lines(&text);
    assert_eq!(lines.len(), 1);
    // 3 wide glyphs at 42px
    assert_eq!(
        lines[0],
        "Dialogue: 0,0:00:03.20,0:00:15.20,scroll,,0,0,0,,{\\an7\\move(1920,42,-126,42)\\1c&H4080FF&\\1a&H00&}{\\fnNoto Sans CJK TC}好耶{\\fnNoto Color Emoji}😀"
    );
    let conversion = Converter::new(&settings).convert(&comments, 0.0).unwrap();
    let tags = &conversion.document.cues()[0].tags;
    assert_eq!(tags[0], OverrideTag::Alignment(7));
    assert!(matches!(tags[1], OverrideTag::Move { x1: 1920, .. }));
}
