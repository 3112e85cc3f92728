//! Range and curve text codec.
//!
//! Designer-facing values are written as `"min..max"` where each side is a
//! whitespace separated vector, e.g. `"0 1 0..0 2 0"`. A single side is used
//! for both min and max. Curves are comma separated lists of ranges.
//!
//! Parsing never fails: missing or malformed components take the
//! corresponding default.

use stardust_common::Color;

/// Separator between the min and max side of a range.
const RANGE_SEPARATOR: &str = "..";

/// Separator between curve keys.
const LIST_SEPARATOR: char = ',';

/// Parses one side of a range, returning `None` for unparseable tokens.
fn parse_components(side: &str) -> Vec<Option<f32>> {
    side.split_whitespace()
        .map(|token| token.parse::<f32>().ok().filter(|v| v.is_finite()))
        .collect()
}

/// Splits `text` into its min and max sides.
fn split_sides(text: &str) -> (&str, &str) {
    let mut parts = text.split(RANGE_SEPARATOR);
    let min = parts.next().unwrap_or_default();
    let max = parts.next().unwrap_or(min);
    (min, max)
}

/// Parses a vector range into `[min.., max..]`.
///
/// The result always has `2 * defaults.len()` elements.
///
/// ```
/// use stardust_kernel::range::parse_range;
///
/// assert_eq!(parse_range("8 9..10", &[1.0, 2.0, 3.0]), [8.0, 9.0, 3.0, 10.0, 2.0, 3.0]);
/// ```
#[must_use]
pub fn parse_range(text: &str, defaults: &[f32]) -> Vec<f32> {
    let (min, max) = split_sides(text);
    let mut out = Vec::with_capacity(defaults.len() * 2);

    for side in [min, max] {
        let components = parse_components(side);
        out.extend(
            defaults
                .iter()
                .enumerate()
                .map(|(i, def)| components.get(i).copied().flatten().unwrap_or(*def)),
        );
    }

    out
}

/// Parses a comma separated list of vector ranges and concatenates them.
#[must_use]
pub fn parse_range_list(text: &str, defaults: &[f32]) -> Vec<f32> {
    text.split(LIST_SEPARATOR)
        .flat_map(|entry| parse_range(entry, defaults))
        .collect()
}

/// Parses a comma separated list of color ranges (`"red..blue,white"`).
///
/// Each entry yields a min and a max color. Unknown or empty colors are white.
#[must_use]
pub fn parse_color_range_list(text: &str) -> Vec<Color> {
    text.split(LIST_SEPARATOR)
        .flat_map(|entry| {
            let (min, max) = split_sides(entry);
            [Color::parse_or_white(min), Color::parse_or_white(max)]
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    const XYZ: [f32; 3] = [1.0, 2.0, 3.0];

    #[test]
    fn test_parse_range_defaults() {
        assert_eq!(parse_range("", &XYZ), [1.0, 2.0, 3.0, 1.0, 2.0, 3.0]);
    }

    #[test]
    fn test_parse_range_single_side() {
        assert_eq!(parse_range("5", &XYZ), [5.0, 2.0, 3.0, 5.0, 2.0, 3.0]);
        assert_eq!(parse_range("5 6", &XYZ), [5.0, 6.0, 3.0, 5.0, 6.0, 3.0]);
        assert_eq!(parse_range("5 6 7 8", &XYZ), [5.0, 6.0, 7.0, 5.0, 6.0, 7.0]);
    }

    #[test]
    fn test_parse_range_both_sides() {
        assert_eq!(parse_range("8 9..10", &XYZ), [8.0, 9.0, 3.0, 10.0, 2.0, 3.0]);
        assert_eq!(parse_range("..5 6 7", &XYZ), [1.0, 2.0, 3.0, 5.0, 6.0, 7.0]);
        assert_eq!(parse_range("2 3 4..5 6 7", &XYZ), [2.0, 3.0, 4.0, 5.0, 6.0, 7.0]);
        assert_eq!(parse_range("5 6 7..", &XYZ), [5.0, 6.0, 7.0, 1.0, 2.0, 3.0]);
    }

    #[test]
    fn test_parse_range_malformed_tokens() {
        assert_eq!(parse_range("x 9..y", &XYZ), [1.0, 9.0, 3.0, 1.0, 2.0, 3.0]);
        assert_eq!(parse_range("1..2..3", &[0.0]), [1.0, 2.0]);
        assert_eq!(parse_range("  4   5  ", &XYZ), [4.0, 5.0, 3.0, 4.0, 5.0, 3.0]);
    }

    #[test]
    fn test_parse_range_list() {
        assert_eq!(
            parse_range_list("1,2,,,3", &[10.0]),
            [1.0, 1.0, 2.0, 2.0, 10.0, 10.0, 10.0, 10.0, 3.0, 3.0]
        );
        assert_eq!(
            parse_range_list("5 6 7..,9..10 11 12", &XYZ),
            [5.0, 6.0, 7.0, 1.0, 2.0, 3.0, 9.0, 2.0, 3.0, 10.0, 11.0, 12.0]
        );
    }

    #[test]
    fn test_parse_color_range_list() {
        let colors: Vec<u32> = parse_color_range_list("black..red,blue,,#ff0..#00ffaa")
            .into_iter()
            .map(Color::to_hex)
            .collect();
        assert_eq!(
            colors,
            [0x00_0000, 0xFF_0000, 0x00_00FF, 0x00_00FF, 0xFF_FFFF, 0xFF_FFFF, 0xFF_FF00, 0x00_FFAA]
        );
    }

    proptest! {
        #[test]
        fn prop_empty_text_reproduces_defaults(
            defaults in prop::collection::vec(-1.0e6f32..1.0e6, 1..6),
            blank in "[ \t]{0,4}",
        ) {
            let parsed = parse_range(&blank, &defaults);
            let expected: Vec<f32> = defaults.iter().chain(defaults.iter()).copied().collect();
            prop_assert_eq!(parsed, expected);
        }

        #[test]
        fn prop_range_length_is_fixed(text in ".{0,40}", len in 1usize..5) {
            let defaults = vec![0.5; len];
            prop_assert_eq!(parse_range(&text, &defaults).len(), len * 2);
        }

        #[test]
        fn prop_list_length_tracks_entries(text in "[0-9 .,]{0,40}") {
            let entries = text.split(',').count();
            prop_assert_eq!(parse_range_list(&text, &[0.0, 0.0]).len(), entries * 4);
        }
    }
}
