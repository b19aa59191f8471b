/*!
 * Script segmentation for font fallback.
 *
 * Splits comment text into runs of ordinary script and runs of emoji,
 * pictographs and symbols, so each run can be given a font that actually
 * carries its glyphs.
 */

/// Glyph category of a run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GlyphCategory {
    /// Rendered with the configured font
    Primary,
    /// Rendered with the emoji-capable fallback font
    Fallback,
}

/// A maximal run of text sharing one glyph category
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextRun {
    pub text: String,
    pub category: GlyphCategory,
}

/// Inclusive code point ranges rendered with the fallback font
///
/// Sorted by start so lookups can binary search.
const FALLBACK_RANGES: &[(u32, u32)] = &[
    (0x00A9, 0x00A9),   // copyright sign
    (0x00AE, 0x00AE),   // registered sign
    (0x200D, 0x200D),   // zero width joiner
    (0x203C, 0x203C),   // double exclamation mark
    (0x2049, 0x2049),   // exclamation question mark
    (0x20A0, 0x20CF),   // currency symbols
    (0x20D0, 0x20FF),   // combining marks for symbols, keycap
    (0x2100, 0x214F),   // letterlike symbols
    (0x2150, 0x218F),   // number forms
    (0x2190, 0x21FF),   // arrows
    (0x2200, 0x22FF),   // mathematical operators
    (0x2300, 0x23FF),   // miscellaneous technical
    (0x2400, 0x24FF),   // control pictures, OCR, enclosed alphanumerics
    (0x2500, 0x25FF),   // box drawing, block elements, geometric shapes
    (0x2600, 0x27BF),   // miscellaneous symbols, dingbats
    (0x2900, 0x297F),   // supplemental arrows-B
    (0x2B00, 0x2BFF),   // miscellaneous symbols and arrows
    (0x3030, 0x3030),   // wavy dash
    (0x303D, 0x303D),   // part alternation mark
    (0x3200, 0x33FF),   // enclosed CJK letters, CJK compatibility
    (0xFE00, 0xFE0F),   // variation selectors
    (0x1F000, 0x1FAFF), // mahjong through symbols and pictographs extended-A
    (0x1FB00, 0x1FBFF), // symbols for legacy computing
    (0xE0020, 0xE007F), // tag characters (flag sequences)
    (0xE0100, 0xE01EF), // variation selectors supplement
];

/// Whether a code point needs the fallback font
pub fn is_fallback(c: char) -> bool {
    let code = c as u32;
    let idx = FALLBACK_RANGES.partition_point(|&(start, _)| start <= code);
    idx > 0 && code <= FALLBACK_RANGES[idx - 1].1
}

pub fn category_of(c: char) -> GlyphCategory {
    if is_fallback(c) {
        GlyphCategory::Fallback
    } else {
        GlyphCategory::Primary
    }
}

/// Split text into runs of coalesced glyph categories
///
/// Concatenating the run texts in order yields the input exactly.
pub fn segment(text: &str) -> Vec<TextRun> {
    let mut runs: Vec<TextRun> = Vec::new();
    for c in text.chars() {
        let category = category_of(c);
        match runs.last_mut() {
            Some(run) if run.category == category => run.text.push(c),
            _ => runs.push(TextRun {
                text: c.to_string(),
                category,
            }),
        }
    }
    runs
}

/// Whether any part of the text needs the fallback font
pub fn has_fallback(text: &str) -> bool {
    text.chars().any(is_fallback)
}
