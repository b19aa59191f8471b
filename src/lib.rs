/*!
 * # danmu2ass - Bahamut anime danmaku to ASS subtitles
 *
 * A Rust library for converting the danmaku of an anime episode into an ASS
 * subtitle file that libass based players render as scrolling and fixed
 * overlays.
 *
 * ## Features
 *
 * - Fetch danmaku from the Bahamut anime danmu API, with retries
 * - Scrolling, top and bottom danmaku with collision-free scroll lanes
 * - Readable scroll speeds for short and long comments
 * - Emoji and symbol runs rendered with a fallback font
 * - Keyword, emoji and duplicate filtering
 * - Resolution presets from 720p to 8K
 * - Merging into an existing ASS subtitle without touching its lines
 *
 * ## Architecture
 *
 * The library is organized in these main modules:
 * - `app_config`: Configuration file, presets and settings validation
 * - `danmaku`: Comment model and raw API records
 * - `conversion`: The synchronous conversion engine:
 *   - `conversion::trajectory`: Scroll lanes and durations
 *   - `conversion::cue`: Filtering and cue construction
 *   - `conversion::document`: Document model and assembly
 *   - `conversion::merge`: Merging into existing ASS text
 * - `providers`: Comment sources (danmu API, static lists)
 * - `resolver`: Video reference resolution
 * - `file_utils`: File system operations
 * - `app_controller`: Main application controller
 * - `errors`: Custom error types for the application
 *
 * ## License
 *
 * This project is licensed under the MIT License
 */

// Global lints configuration
// These lints will be allowed but not auto-fixed
#![allow(clippy::uninlined_format_args)]
#![allow(clippy::redundant_closure_for_method_calls)]

// Public modules
pub mod app_config;
pub mod app_controller;
pub mod conversion;
pub mod danmaku;
pub mod errors;
pub mod file_utils;
pub mod providers;
pub mod resolver;

// Re-export main types for easier usage
pub use app_config::{Config, Preset, Settings};
pub use conversion::{ConversionReport, Converter, Document};
pub use danmaku::{Comment, PositionClass};
pub use errors::{AppError, DocumentError, FetchError};
pub use resolver::resolve_reference;
