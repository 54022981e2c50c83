//! Frontmatter parser for vault documents.
//!
//! Pure functions converting document text into an [`Admission`]. Nothing
//! here raises: malformed fields are treated as absent, and a document that
//! cannot yield an entity comes back as a typed rejection.

use crate::model::{Admission, Entity, EntityId, EntityType, Importance, RejectReason};
use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use once_cell::sync::Lazy;
use regex::Regex;
use serde_yaml::{Mapping, Value};

// Frontmatter keys
const KEY_TIME_START: &str = "time_start";
const KEY_TIME_END: &str = "time_end";
const KEY_BORN: &str = "born";
const KEY_DIED: &str = "died";
const KEY_TYPE: &str = "type";
const KEY_NAME: &str = "name";
const KEY_PARTICIPANTS: &str = "participants";
const KEY_TAGS: &str = "tags";
const KEY_IMPORTANCE: &str = "importance";
const KEY_LOCATION: &str = "location";

const FRONTMATTER_DELIMITER: &str = "---";
const FRONTMATTER_END_ALT: &str = "...";

static YEAR_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^-?\d+$").expect("valid year regex"));
static DATE_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(-?\d{1,6})-(\d{1,2})(?:-(\d{1,2}))?$").expect("valid date regex")
});
static WIKILINK_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\[\[([^\]|]+)(?:\|[^\]]+)?\]\]").expect("valid wikilink regex"));

/// Parse one document into an admission decision.
///
/// # Rules
/// - The text must open with a `---` line and contain a closing `---` (or
///   `...`) line; the block between is YAML.
/// - `time_start` (falling back to `born`) must be present and readable.
/// - `time_end` (falling back to `died`) is optional; an unreadable value,
///   or one earlier than the start, is dropped.
/// - `type` defaults to `event`; `name` defaults to the file stem of `id`.
pub fn parse_document(id: &EntityId, text: &str) -> Admission {
    let Some((yaml, _body)) = split_frontmatter(text) else {
        return Admission::rejected(id.clone(), RejectReason::MissingFrontmatter);
    };

    let fields = match serde_yaml::from_str::<Value>(yaml) {
        Ok(Value::Mapping(mapping)) => mapping,
        Ok(Value::Null) => Mapping::new(),
        Ok(_) => {
            return Admission::rejected(
                id.clone(),
                RejectReason::MalformedFrontmatter("frontmatter is not a mapping".to_string()),
            )
        }
        Err(e) => {
            return Admission::rejected(
                id.clone(),
                RejectReason::MalformedFrontmatter(e.to_string()),
            )
        }
    };

    let Some(start_value) = first_present(&fields, KEY_TIME_START, KEY_BORN) else {
        return Admission::rejected(id.clone(), RejectReason::MissingTimeStart);
    };
    let Some(time_start) = parse_time_value(start_value) else {
        return Admission::rejected(
            id.clone(),
            RejectReason::MalformedTimeStart {
                raw: scalar_to_string(start_value).unwrap_or_else(|| format!("{start_value:?}")),
            },
        );
    };

    let time_end = first_present(&fields, KEY_TIME_END, KEY_DIED).and_then(|value| {
        let parsed = parse_time_value(value);
        if parsed.is_none() {
            tracing::debug!(id = %id, "unparseable time_end dropped");
        }
        parsed
    });
    if time_end.is_some_and(|end| end < time_start) {
        tracing::debug!(id = %id, "time_end earlier than time_start dropped");
    }

    let entity_type = fields
        .get(KEY_TYPE)
        .and_then(Value::as_str)
        .map(EntityType::parse)
        .unwrap_or_default();

    let name = fields
        .get(KEY_NAME)
        .and_then(scalar_to_string)
        .filter(|n| !n.trim().is_empty())
        .unwrap_or_else(|| id.file_stem().to_string());

    let entity = Entity::new(id.clone(), entity_type, name, time_start)
        .with_time_end(time_end)
        .with_participants(participant_list(fields.get(KEY_PARTICIPANTS)))
        .with_tags(string_list(fields.get(KEY_TAGS)))
        .with_importance(fields.get(KEY_IMPORTANCE).and_then(parse_importance))
        .with_location(
            fields
                .get(KEY_LOCATION)
                .and_then(Value::as_str)
                .map(str::to_string),
        );

    Admission::Admitted(entity)
}

/// Split a document into `(frontmatter, body)`.
///
/// Returns `None` when the text does not open with a `---` line or the
/// block is never closed.
pub fn split_frontmatter(text: &str) -> Option<(&str, &str)> {
    let text = text.strip_prefix('\u{feff}').unwrap_or(text);
    let mut lines = text.split_inclusive('\n');
    let first = lines.next()?;
    if first.trim_end() != FRONTMATTER_DELIMITER {
        return None;
    }

    let yaml_start = first.len();
    let mut offset = yaml_start;
    for line in lines {
        let trimmed = line.trim_end();
        if trimmed == FRONTMATTER_DELIMITER || trimmed == FRONTMATTER_END_ALT {
            return Some((&text[yaml_start..offset], &text[offset + line.len()..]));
        }
        offset += line.len();
    }
    None
}

/// Read a frontmatter value as an instant.
///
/// Accepts integers (a signed year, January 1 00:00 UTC), integer-valued
/// floats, and strings understood by [`parse_time_str`].
pub fn parse_time_value(value: &Value) -> Option<DateTime<Utc>> {
    match value {
        Value::Number(n) => {
            if let Some(year) = n.as_i64() {
                year_start(year)
            } else {
                n.as_f64()
                    .filter(|f| f.is_finite() && f.fract() == 0.0)
                    .and_then(|f| year_start(f as i64))
            }
        }
        Value::String(s) => parse_time_str(s),
        Value::Tagged(tagged) => parse_time_value(&tagged.value),
        _ => None,
    }
}

/// Parse a textual time value.
///
/// Accepted forms, tried in order:
/// - signed year: `1069`, `-221`
/// - calendar date: `1069-01-01`, `1069-01`, `-0221-03-15`
/// - RFC 3339: `2024-05-01T12:00:00+02:00`
/// - naive date-time, read as UTC: `2024-05-01T12:00:00`, `2024-05-01 12:00:00`
pub fn parse_time_str(raw: &str) -> Option<DateTime<Utc>> {
    let s = raw.trim();
    if s.is_empty() {
        return None;
    }

    if YEAR_RE.is_match(s) {
        return year_start(s.parse().ok()?);
    }

    if let Some(caps) = DATE_RE.captures(s) {
        let year: i32 = caps.get(1)?.as_str().parse().ok()?;
        let month: u32 = caps.get(2)?.as_str().parse().ok()?;
        let day: u32 = match caps.get(3) {
            Some(d) => d.as_str().parse().ok()?,
            None => 1,
        };
        return Some(NaiveDate::from_ymd_opt(year, month, day)?.and_hms_opt(0, 0, 0)?.and_utc());
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.with_timezone(&Utc));
    }

    ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"]
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(s, fmt).ok())
        .map(|naive| naive.and_utc())
}

/// Link targets of `[[target]]` and `[[target|alias]]`, in order.
pub fn extract_wikilinks(text: &str) -> Vec<String> {
    WIKILINK_RE
        .captures_iter(text)
        .filter_map(|caps| caps.get(1))
        .map(|m| m.as_str().to_string())
        .collect()
}

fn year_start(year: i64) -> Option<DateTime<Utc>> {
    let year = i32::try_from(year).ok()?;
    Some(NaiveDate::from_ymd_opt(year, 1, 1)?.and_hms_opt(0, 0, 0)?.and_utc())
}

/// First of `primary`, `fallback` that is present and not null.
fn first_present<'a>(fields: &'a Mapping, primary: &str, fallback: &str) -> Option<&'a Value> {
    [primary, fallback]
        .into_iter()
        .filter_map(|key| fields.get(key))
        .find(|value| !value.is_null())
}

fn parse_importance(value: &Value) -> Option<Importance> {
    let raw = match value {
        Value::Number(n) => n.as_i64().or_else(|| {
            n.as_f64()
                .filter(|f| f.is_finite() && f.fract() == 0.0)
                .map(|f| f as i64)
        })?,
        Value::String(s) => s.trim().parse().ok()?,
        _ => return None,
    };
    Importance::new(raw).ok()
}

/// Sequences become lists of their scalar items; anything else is empty.
fn string_list(value: Option<&Value>) -> Vec<String> {
    match value {
        Some(Value::Sequence(items)) => items.iter().filter_map(scalar_to_string).collect(),
        _ => Vec::new(),
    }
}

/// Participant references with link syntax stripped.
///
/// `"[[Su Shi|Dongpo]]"` and an unquoted `[[Su Shi]]` (which YAML reads as a
/// nested sequence) both become `Su Shi`.
fn participant_list(value: Option<&Value>) -> Vec<String> {
    match value {
        Some(Value::Sequence(items)) => items.iter().filter_map(participant_reference).collect(),
        _ => Vec::new(),
    }
}

fn participant_reference(value: &Value) -> Option<String> {
    match value {
        Value::Sequence(inner) if inner.len() == 1 => participant_reference(&inner[0]),
        Value::String(s) => {
            let target = extract_wikilinks(s).into_iter().next();
            let target = target.as_deref().unwrap_or(s);
            let target = target.split('#').next().unwrap_or(target).trim();
            (!target.is_empty()).then(|| target.to_string())
        }
        other => scalar_to_string(other),
    }
}

fn scalar_to_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn id(raw: &str) -> EntityId {
        EntityId::new(raw).unwrap()
    }

    fn admit(text: &str) -> Entity {
        match parse_document(&id("people/Su Shi.md"), text) {
            Admission::Admitted(entity) => entity,
            Admission::Rejected(r) => panic!("expected admission, got {:?}", r.reason()),
        }
    }

    fn reject(text: &str) -> RejectReason {
        match parse_document(&id("notes/x.md"), text) {
            Admission::Rejected(r) => r.reason().clone(),
            Admission::Admitted(e) => panic!("expected rejection, got {e:?}"),
        }
    }

    fn year(y: i32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, 1, 1, 0, 0, 0).unwrap()
    }

    // ===== split_frontmatter =====

    #[test]
    fn split_returns_yaml_and_body() {
        let (yaml, body) = split_frontmatter("---\na: 1\n---\nbody text\n").unwrap();
        assert_eq!(yaml, "a: 1\n");
        assert_eq!(body, "body text\n");
    }

    #[test]
    fn split_handles_crlf_and_dots_terminator() {
        let (yaml, body) = split_frontmatter("---\r\na: 1\r\n...\r\nrest").unwrap();
        assert_eq!(yaml, "a: 1\r\n");
        assert_eq!(body, "rest");
    }

    #[test]
    fn split_requires_opening_and_closing_delimiters() {
        assert!(split_frontmatter("a: 1\n---\n").is_none());
        assert!(split_frontmatter("---\na: 1\n").is_none());
        assert!(split_frontmatter("").is_none());
    }

    // ===== parse_document =====

    #[test]
    fn full_document_is_admitted() {
        let entity = admit(
            "---\n\
             type: Person\n\
             name: Su Shi\n\
             time_start: 1037\n\
             time_end: 1101-08-24\n\
             participants: [Ouyang Xiu, 1057]\n\
             tags:\n  - song\n  - poet\n\
             importance: 5\n\
             location: Meishan\n\
             ---\n\
             Poet of the [[Song dynasty|Song]].\n",
        );
        assert_eq!(entity.entity_type(), EntityType::Person);
        assert_eq!(entity.name(), "Su Shi");
        assert_eq!(entity.time_start(), year(1037));
        assert_eq!(
            entity.time_end(),
            Some(Utc.with_ymd_and_hms(1101, 8, 24, 0, 0, 0).unwrap())
        );
        assert_eq!(entity.participants(), ["Ouyang Xiu", "1057"]);
        assert_eq!(entity.tags(), ["song", "poet"]);
        assert_eq!(entity.importance().map(|i| i.get()), Some(5));
        assert_eq!(entity.location(), Some("Meishan"));
    }

    #[test]
    fn born_and_died_are_fallbacks() {
        let entity = admit("---\nborn: 1037\ndied: 1101\n---\n");
        assert_eq!(entity.time_start(), year(1037));
        assert_eq!(entity.time_end(), Some(year(1101)));
    }

    #[test]
    fn null_time_start_falls_back_to_born() {
        let entity = admit("---\ntime_start:\nborn: 1037\n---\n");
        assert_eq!(entity.time_start(), year(1037));
    }

    #[test]
    fn defaults_for_type_and_name() {
        let entity = admit("---\ntime_start: 1037\ntype: dynasty\n---\n");
        assert_eq!(entity.entity_type(), EntityType::Event);
        assert_eq!(entity.name(), "Su Shi");
    }

    #[test]
    fn missing_frontmatter_is_rejected() {
        assert_eq!(reject("# Just a note\n"), RejectReason::MissingFrontmatter);
    }

    #[test]
    fn missing_time_start_is_rejected() {
        assert_eq!(reject("---\nname: Idle\n---\n"), RejectReason::MissingTimeStart);
        assert_eq!(reject("---\n---\n"), RejectReason::MissingTimeStart);
    }

    #[test]
    fn malformed_time_start_is_rejected_with_raw_value() {
        assert_eq!(
            reject("---\ntime_start: sometime in spring\n---\n"),
            RejectReason::MalformedTimeStart {
                raw: "sometime in spring".to_string()
            }
        );
    }

    #[test]
    fn invalid_yaml_is_rejected() {
        assert!(matches!(
            reject("---\ntime_start: [1037\n---\n"),
            RejectReason::MalformedFrontmatter(_)
        ));
        assert!(matches!(
            reject("---\n- 1037\n---\n"),
            RejectReason::MalformedFrontmatter(_)
        ));
    }

    #[test]
    fn unreadable_or_inverted_end_is_dropped() {
        assert_eq!(admit("---\ntime_start: 1037\ntime_end: later\n---\n").time_end(), None);
        assert_eq!(admit("---\ntime_start: 1037\ntime_end: 1000\n---\n").time_end(), None);
    }

    #[test]
    fn importance_outside_range_or_fractional_is_absent() {
        assert_eq!(admit("---\ntime_start: 1\nimportance: 9\n---\n").importance(), None);
        assert_eq!(admit("---\ntime_start: 1\nimportance: 2.5\n---\n").importance(), None);
        assert_eq!(
            admit("---\ntime_start: 1\nimportance: \"4\"\n---\n")
                .importance()
                .map(|i| i.get()),
            Some(4)
        );
        assert_eq!(
            admit("---\ntime_start: 1\nimportance: 3.0\n---\n")
                .importance()
                .map(|i| i.get()),
            Some(3)
        );
    }

    #[test]
    fn non_sequence_lists_are_empty() {
        let entity = admit("---\ntime_start: 1\ntags: song\nparticipants: {a: 1}\n---\n");
        assert!(entity.tags().is_empty());
        assert!(entity.participants().is_empty());
    }

    #[test]
    fn participant_links_are_reduced_to_targets() {
        let entity = admit(
            "---\ntime_start: 1057\nparticipants:\n\
             \x20 - \"[[Su Shi|Dongpo]]\"\n\
             \x20 - [[Ouyang Xiu]]\n\
             \x20 - \"[[people/Zeng Gong#Life]]\"\n\
             \x20 - plain name\n---\n",
        );
        assert_eq!(
            entity.participants(),
            ["Su Shi", "Ouyang Xiu", "people/Zeng Gong", "plain name"]
        );
    }

    // ===== time values =====

    #[test]
    fn signed_years() {
        assert_eq!(parse_time_str("1069"), Some(year(1069)));
        assert_eq!(parse_time_str("-221"), Some(year(-221)));
        assert_eq!(parse_time_value(&Value::from(-221)), Some(year(-221)));
    }

    #[test]
    fn calendar_dates() {
        assert_eq!(
            parse_time_str("1069-03"),
            Some(Utc.with_ymd_and_hms(1069, 3, 1, 0, 0, 0).unwrap())
        );
        assert_eq!(
            parse_time_str("-0221-03-15"),
            Some(Utc.with_ymd_and_hms(-221, 3, 15, 0, 0, 0).unwrap())
        );
        assert_eq!(parse_time_str("1069-13-01"), None);
    }

    #[test]
    fn date_times() {
        assert_eq!(
            parse_time_str("2024-05-01T12:00:00+02:00"),
            Some(Utc.with_ymd_and_hms(2024, 5, 1, 10, 0, 0).unwrap())
        );
        assert_eq!(
            parse_time_str("2024-05-01 12:30:00"),
            Some(Utc.with_ymd_and_hms(2024, 5, 1, 12, 30, 0).unwrap())
        );
    }

    #[test]
    fn unreadable_time_values() {
        assert_eq!(parse_time_str(""), None);
        assert_eq!(parse_time_str("Tang dynasty"), None);
        assert_eq!(parse_time_value(&Value::Bool(true)), None);
        assert_eq!(parse_time_value(&Value::from(1069.5)), None);
    }

    // ===== wikilinks =====

    #[test]
    fn wikilinks_with_and_without_alias() {
        assert_eq!(
            extract_wikilinks("See [[Su Shi]] and [[Ouyang Xiu|his mentor]]; not [single]."),
            vec!["Su Shi", "Ouyang Xiu"]
        );
    }

    #[test]
    fn no_wikilinks() {
        assert!(extract_wikilinks("plain text").is_empty());
    }
}
