use crate::models::Color;
use chrono::Weekday;
use std::collections::HashSet;

/// Encodes a schedule as comma-joined weekday tags, e.g. `"1,3,5"`.
///
/// Tags run 1 through 7 with Monday as 1 and are emitted in ascending order,
/// so equal schedules always encode to the same string. An empty set encodes
/// to the empty string.
pub fn schedule_to_string(schedule: &HashSet<Weekday>) -> String {
    let mut tags: Vec<u32> = schedule.iter().map(|day| day.number_from_monday()).collect();
    tags.sort_unstable();
    tags.iter()
        .map(|tag| tag.to_string())
        .collect::<Vec<_>>()
        .join(",")
}

/// Decodes a comma-joined weekday tag string back into a schedule.
///
/// Tokens that are not an integer in 1..=7 are logged and discarded rather
/// than failing the whole schedule.
pub fn schedule_from_string(raw: &str) -> HashSet<Weekday> {
    let mut days = HashSet::new();
    for token in raw.split(',') {
        let token = token.trim();
        if token.is_empty() {
            continue;
        }
        match token.parse::<u8>().ok().and_then(weekday_from_tag) {
            Some(day) => {
                days.insert(day);
            }
            None => {
                tracing::warn!(token = token, "discarding malformed schedule token");
            }
        }
    }
    days
}

fn weekday_from_tag(tag: u8) -> Option<Weekday> {
    match tag {
        1 => Some(Weekday::Mon),
        2 => Some(Weekday::Tue),
        3 => Some(Weekday::Wed),
        4 => Some(Weekday::Thu),
        5 => Some(Weekday::Fri),
        6 => Some(Weekday::Sat),
        7 => Some(Weekday::Sun),
        _ => None,
    }
}

pub fn color_to_hex(color: Color) -> String {
    format!("#{:02X}{:02X}{:02X}", color.r, color.g, color.b)
}

/// Decodes a `#RRGGBB` string, with or without the leading `#`. Anything
/// unparseable yields [`Color::FALLBACK`] instead of an error so that one
/// corrupt row cannot take down a whole list fetch.
pub fn color_from_hex(raw: &str) -> Color {
    let hex = raw.trim().trim_start_matches('#');
    if hex.len() == 6 && hex.is_ascii() {
        if let (Ok(r), Ok(g), Ok(b)) = (
            u8::from_str_radix(&hex[0..2], 16),
            u8::from_str_radix(&hex[2..4], 16),
            u8::from_str_radix(&hex[4..6], 16),
        ) {
            return Color { r, g, b };
        }
    }
    if !raw.is_empty() {
        tracing::warn!(value = raw, "unparseable color, using fallback");
    }
    Color::FALLBACK
}
