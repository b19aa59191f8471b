/*!
 * On-screen trajectory planning.
 *
 * Scrolling comments travel from just off the right edge to just off the
 * left edge on a horizontal lane. Their duration starts from the configured
 * scroll duration and is adjusted so the speed stays inside a readable band:
 * short comments are never slower than the floor, and long comments are
 * given more time instead of racing past faster than the ceiling.
 *
 * Fixed comments sit centered at a single slot near the top or bottom edge.
 */

use log::trace;

use crate::app_config::Settings;
use crate::danmaku::PositionClass;

/// Slowest allowed scroll speed, in font sizes per second
const MIN_SPEED_FONT_SIZES_PER_SEC: f64 = 3.5;

/// Fastest allowed scroll speed, in font sizes per second
const MAX_SPEED_FONT_SIZES_PER_SEC: f64 = 8.0;

/// Lane pitch relative to the font size
const LANE_HEIGHT_FACTOR: f64 = 1.2;

/// Horizontal clearance kept between consecutive comments in a lane
const LANE_GAP_FACTOR: f64 = 0.5;

/// Where and how a cue moves
#[derive(Debug, Clone, PartialEq)]
pub enum Motion {
    /// Moves horizontally along row `y`; x values refer to the text's left edge
    Scroll { start_x: f64, end_x: f64, y: f64 },
    /// Static at the anchor point of the style's alignment
    Fixed { x: f64, y: f64 },
}

/// Planned display of one comment
#[derive(Debug, Clone, PartialEq)]
pub struct Trajectory {
    /// Seconds on screen
    pub duration: f64,
    pub motion: Motion,
    /// Pixel width estimate used for the plan
    pub text_width: f64,
}

impl Trajectory {
    /// Pixels per second for scrolling motion, zero for fixed
    pub fn speed(&self) -> f64 {
        match self.motion {
            Motion::Scroll { start_x, end_x, .. } => (start_x - end_x) / self.duration,
            Motion::Fixed { .. } => 0.0,
        }
    }
}

/// Estimated on-screen width of one glyph
///
/// ASCII glyphs are taken as half a font size wide, everything else
/// (CJK, kana, emoji) as a full font size.
pub fn glyph_width(c: char, font_size: f64) -> f64 {
    if c.is_ascii() { font_size / 2.0 } else { font_size }
}

/// Estimated on-screen width of a text in pixels
pub fn text_pixel_width(text: &str, font_size: u32) -> f64 {
    let font_size = f64::from(font_size);
    text.chars().map(|c| glyph_width(c, font_size)).sum()
}

pub fn min_readable_speed(font_size: u32) -> f64 {
    f64::from(font_size) * MIN_SPEED_FONT_SIZES_PER_SEC
}

pub fn max_readable_speed(font_size: u32) -> f64 {
    f64::from(font_size) * MAX_SPEED_FONT_SIZES_PER_SEC
}

/// Duration needed to travel `distance` pixels, starting from `base` seconds
pub fn scroll_duration(distance: f64, base: f64, font_size: u32) -> f64 {
    let min_speed = min_readable_speed(font_size);
    let max_speed = max_readable_speed(font_size);
    let speed = distance / base;
    if speed < min_speed {
        distance / min_speed
    } else if speed > max_speed {
        distance / max_speed
    } else {
        base
    }
}

/// Last comment placed on a lane
#[derive(Debug, Clone, Copy)]
struct LaneOccupant {
    start: f64,
    end: f64,
    speed: f64,
    width: f64,
}

impl LaneOccupant {
    /// Time at which the occupant's tail has entered the screen plus the gap
    fn clear_at(&self, gap: f64) -> f64 {
        self.start + (self.width + gap) / self.speed
    }
}

/// Plans trajectories for one conversion run
///
/// Comments must be fed in ascending start time so lane allocation is
/// deterministic.
pub struct TrajectoryPlanner<'a> {
    settings: &'a Settings,
    lanes: Vec<Option<LaneOccupant>>,
}

impl<'a> TrajectoryPlanner<'a> {
    pub fn new(settings: &'a Settings) -> Self {
        let lane_count = Self::lane_count_for(settings);
        Self {
            settings,
            lanes: vec![None; lane_count],
        }
    }

    fn font_size(&self) -> f64 {
        f64::from(self.settings.font_size)
    }

    fn lane_height_for(settings: &Settings) -> f64 {
        (f64::from(settings.font_size) * LANE_HEIGHT_FACTOR).round()
    }

    fn lane_count_for(settings: &Settings) -> usize {
        let usable = f64::from(settings.resolution.height) - 2.0 * f64::from(settings.font_size);
        ((usable / Self::lane_height_for(settings)).floor() as usize).max(1)
    }

    pub fn lane_count(&self) -> usize {
        self.lanes.len()
    }

    /// Top edge of a scroll lane
    pub fn lane_y(&self, lane: usize) -> f64 {
        self.font_size() + lane as f64 * Self::lane_height_for(self.settings)
    }

    /// Plan a comment starting at `start` seconds; empty text yields nothing
    pub fn plan(&mut self, text: &str, position: PositionClass, start: f64) -> Option<Trajectory> {
        if text.is_empty() {
            return None;
        }

        let width = f64::from(self.settings.resolution.width);
        let height = f64::from(self.settings.resolution.height);
        let text_width = text_pixel_width(text, self.settings.font_size);

        let trajectory = match position {
            PositionClass::Scroll => {
                let distance = width + text_width;
                let duration = scroll_duration(distance, self.settings.scroll_duration, self.settings.font_size);
                let speed = distance / duration;
                let lane = self.allocate_lane(start, duration, speed, text_width);
                trace!("Scroll comment at {:.1}s assigned lane {} ({:.2}s, {:.0}px/s)", start, lane, duration, speed);
                Trajectory {
                    duration,
                    motion: Motion::Scroll {
                        start_x: width,
                        end_x: -text_width,
                        y: self.lane_y(lane),
                    },
                    text_width,
                }
            }
            PositionClass::Top => Trajectory {
                duration: self.settings.fixed_duration,
                motion: Motion::Fixed {
                    x: width / 2.0,
                    y: self.font_size(),
                },
                text_width,
            },
            PositionClass::Bottom => Trajectory {
                duration: self.settings.fixed_duration,
                motion: Motion::Fixed {
                    x: width / 2.0,
                    y: height - self.font_size(),
                },
                text_width,
            },
        };

        Some(trajectory)
    }

    /// Pick the first lane that neither overlaps nor gets caught up with;
    /// otherwise the lane that clears earliest
    fn allocate_lane(&mut self, start: f64, duration: f64, speed: f64, text_width: f64) -> usize {
        let screen_width = f64::from(self.settings.resolution.width);
        let gap = self.font_size() * LANE_GAP_FACTOR;

        let free = self.lanes.iter().position(|lane| match lane {
            None => true,
            Some(occupant) => {
                // New head reaches the left edge no earlier than the old tail leaves it
                start >= occupant.clear_at(gap) && start + screen_width / speed >= occupant.end
            }
        });

        let lane = free.unwrap_or_else(|| {
            let mut best = 0;
            let mut best_clear = f64::INFINITY;
            for (idx, lane) in self.lanes.iter().enumerate() {
                let clear = lane.map_or(f64::NEG_INFINITY, |o| o.clear_at(gap));
                if clear < best_clear {
                    best = idx;
                    best_clear = clear;
                }
            }
            best
        });

        self.lanes[lane] = Some(LaneOccupant {
            start,
            end: start + duration,
            speed,
            width: text_width,
        });
        lane
    }
}
