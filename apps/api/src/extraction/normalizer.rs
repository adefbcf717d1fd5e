//! Profile Normalizer: maps any strategy's raw fields onto the canonical schema.
//!
//! Pure: the current date is an argument and nothing is retained between calls.
//! Field names are looked up through alias lists, so the remote service, the
//! heuristics and the static record can all disagree on spelling.

use chrono::NaiveDate;
use serde_json::{Map, Value};

use crate::models::document::DocumentKind;
use crate::models::extraction::ExtractionResult;
use crate::models::profile::{
    CanonicalJobPosting, CanonicalProfile, ParsedDocument, WorkExperience, NOT_DETECTED,
    NOT_SPECIFIED,
};

const DAYS_PER_YEAR: f64 = 365.25;

/// Nested objects some remote payloads group identity fields under.
const IDENTITY_CONTAINERS: &[&str] = &["personal_info", "personal", "identity", "contact"];

const OPEN_MARKERS: &[&str] = &[
    "present", "current", "now", "ongoing", "today", "présent", "present day", "actuel",
    "actuellement", "aujourd'hui", "aujourd’hui", "en cours", "à ce jour",
];

const MONTHS: &[(&str, u32)] = &[
    ("jan", 1), ("fév", 2), ("fev", 2), ("feb", 2), ("mar", 3), ("avr", 4), ("apr", 4),
    ("mai", 5), ("may", 5), ("juin", 6), ("jun", 6), ("juil", 7), ("jul", 7), ("aoû", 8),
    ("aou", 8), ("aug", 8), ("sep", 9), ("oct", 10), ("nov", 11), ("déc", 12), ("dec", 12),
];

pub fn normalize(result: &ExtractionResult, today: NaiveDate) -> ParsedDocument {
    match result.kind {
        DocumentKind::Cv => ParsedDocument::Cv(normalize_profile(&result.fields, today)),
        DocumentKind::JobPosting => ParsedDocument::JobPosting(normalize_posting(&result.fields)),
    }
}

fn normalize_profile(fields: &Map<String, Value>, today: NaiveDate) -> CanonicalProfile {
    let experiences: Vec<WorkExperience> = lookup(
        fields,
        &["experiences", "experience", "work_experience", "work_history"],
    )
    .and_then(Value::as_array)
    .map(|items| items.iter().map(work_experience).collect::<Vec<_>>())
    .filter(|items| !items.is_empty())
    .unwrap_or_else(|| vec![WorkExperience::not_detected()]);

    let total = total_experience_years(&experiences, today).or_else(|| {
        lookup(fields, &["experience_years", "years_of_experience"])
            .and_then(as_years)
            .filter(|y| *y > 0)
    });

    let mut skills = lookup(fields, &["skills", "competences", "compétences", "skill_set"])
        .map(flatten_list)
        .unwrap_or_default();
    if skills.is_empty() {
        skills.push(NOT_DETECTED.to_string());
    }

    CanonicalProfile {
        name: scalar_or(fields, &["name", "full_name", "nom"], NOT_DETECTED),
        email: scalar_or(fields, &["email", "mail", "e-mail"], NOT_DETECTED),
        phone: scalar_or(fields, &["phone", "telephone", "téléphone", "tel"], NOT_DETECTED),
        title: scalar_or(
            fields,
            &["title", "current_title", "headline", "poste", "job_title"],
            NOT_DETECTED,
        ),
        experiences,
        skills,
        total_experience_years: total,
        experience: experience_label(total),
    }
}

fn normalize_posting(fields: &Map<String, Value>) -> CanonicalJobPosting {
    let list = |keys: &[&str]| {
        let items = lookup(fields, keys).map(flatten_list).unwrap_or_default();
        if items.is_empty() {
            vec![NOT_SPECIFIED.to_string()]
        } else {
            items
        }
    };

    CanonicalJobPosting {
        title: scalar_or(fields, &["title", "job_title", "poste"], NOT_SPECIFIED),
        company: scalar_or(
            fields,
            &["company", "entreprise", "organization", "employer"],
            NOT_SPECIFIED,
        ),
        location: scalar_or(fields, &["location", "lieu", "city"], NOT_SPECIFIED),
        experience: scalar_or(
            fields,
            &["experience", "required_experience", "experience_required"],
            NOT_SPECIFIED,
        ),
        salary: lookup(
            fields,
            &["salary", "compensation", "salary_range", "remuneration", "rémunération"],
        )
        .and_then(compensation)
        .unwrap_or_else(|| NOT_SPECIFIED.to_string()),
        skills: list(&["skills", "competences", "compétences", "requirements"]),
        responsibilities: list(&["responsibilities", "missions", "tasks"]),
        benefits: list(&["benefits", "avantages", "perks"]),
    }
}

/// Sums fractional-year spans; entries without a parsable start are skipped.
/// `None` when the rounded total is zero.
pub fn total_experience_years(experiences: &[WorkExperience], today: NaiveDate) -> Option<u32> {
    let years: f64 = experiences
        .iter()
        .filter_map(|e| {
            let start = e.start_date?;
            let end = e.end_date.unwrap_or(today);
            let days = (end - start).num_days().max(0);
            Some(days as f64 / DAYS_PER_YEAR)
        })
        .sum();

    let rounded = years.round() as u32;
    (rounded > 0).then_some(rounded)
}

pub fn experience_label(years: Option<u32>) -> String {
    match years {
        Some(1) => "1 an".to_string(),
        Some(n) => format!("{n} ans"),
        None => NOT_DETECTED.to_string(),
    }
}

fn work_experience(value: &Value) -> WorkExperience {
    let empty = Map::new();
    let obj = match value {
        Value::Object(obj) => obj,
        _ => &empty,
    };
    let fallback_title = value.as_str().map(str::trim).filter(|s| !s.is_empty());

    let start = scalar(obj, &["start", "start_date", "date_start", "from", "debut", "début"]);
    let is_current = obj
        .get("current")
        .or_else(|| obj.get("is_current"))
        .and_then(Value::as_bool)
        .unwrap_or(false);
    let end = if is_current {
        None
    } else {
        scalar(obj, &["end", "end_date", "date_end", "to", "fin"]).filter(|e| !is_open_marker(e))
    };

    WorkExperience {
        title: scalar(obj, &["title", "role", "position", "poste", "job_title"])
            .or_else(|| fallback_title.map(str::to_string))
            .unwrap_or_else(|| NOT_DETECTED.to_string()),
        organization: scalar(
            obj,
            &["organization", "company", "employer", "entreprise", "organisation"],
        )
        .unwrap_or_else(|| NOT_DETECTED.to_string()),
        start_date: start.as_deref().and_then(parse_date),
        end_date: end.as_deref().and_then(parse_date),
        start,
        end,
    }
}

fn is_open_marker(raw: &str) -> bool {
    let lower = raw.trim().to_lowercase();
    lower.is_empty() || OPEN_MARKERS.contains(&lower.as_str())
}

/// Accepts `YYYY-MM-DD`, `DD/MM/YYYY`, `YYYY-MM`, `YYYY/MM`, `MM/YYYY`, `MM-YYYY`,
/// `YYYY`, ISO timestamps, and `juin 2020` / `June 2020`. Partial dates resolve to
/// the first day of the period.
pub fn parse_date(raw: &str) -> Option<NaiveDate> {
    let raw = raw.trim();
    let head = raw.get(..10).unwrap_or(raw);

    for fmt in ["%Y-%m-%d", "%d/%m/%Y", "%Y/%m/%d", "%d-%m-%Y", "%d.%m.%Y"] {
        if let Ok(date) = NaiveDate::parse_from_str(head, fmt) {
            return Some(date);
        }
    }

    let parts: Vec<&str> = raw.split(['-', '/', '.']).map(str::trim).collect();
    match parts.as_slice() {
        [year] if is_year(year) => NaiveDate::from_ymd_opt(year.parse().ok()?, 1, 1),
        [year, month] if is_year(year) => ymd(year, month),
        [month, year] if is_year(year) => ymd(year, month),
        _ => month_name_date(raw),
    }
}

fn is_year(s: &str) -> bool {
    s.len() == 4 && s.chars().all(|c| c.is_ascii_digit())
}

fn ymd(year: &str, month: &str) -> Option<NaiveDate> {
    NaiveDate::from_ymd_opt(year.parse().ok()?, month.parse().ok()?, 1)
}

fn month_name_date(raw: &str) -> Option<NaiveDate> {
    let lower = raw.to_lowercase();
    let mut words = lower.split_whitespace();
    let (month_word, year) = (words.next()?, words.next()?);
    if words.next().is_some() || !is_year(year) {
        return None;
    }
    let month = MONTHS
        .iter()
        .find(|(prefix, _)| month_word.starts_with(prefix))
        .map(|(_, m)| *m)?;
    NaiveDate::from_ymd_opt(year.parse().ok()?, month, 1)
}

/// Top-level field first, then the same keys inside identity containers.
fn lookup<'a>(fields: &'a Map<String, Value>, keys: &[&str]) -> Option<&'a Value> {
    keys.iter()
        .find_map(|k| fields.get(*k).filter(|v| !v.is_null()))
        .or_else(|| {
            IDENTITY_CONTAINERS
                .iter()
                .filter_map(|c| fields.get(*c).and_then(Value::as_object))
                .find_map(|nested| keys.iter().find_map(|k| nested.get(*k).filter(|v| !v.is_null())))
        })
}

fn scalar(fields: &Map<String, Value>, keys: &[&str]) -> Option<String> {
    lookup(fields, keys).and_then(value_to_string)
}

fn scalar_or(fields: &Map<String, Value>, keys: &[&str], sentinel: &str) -> String {
    scalar(fields, keys).unwrap_or_else(|| sentinel.to_string())
}

fn value_to_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.trim().to_string()).filter(|s| !s.is_empty()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

fn as_years(value: &Value) -> Option<u32> {
    match value {
        Value::Number(n) => n.as_f64().map(|f| f.round().max(0.0) as u32),
        Value::String(s) => s
            .split(|c: char| !c.is_ascii_digit())
            .find(|p| !p.is_empty())
            .and_then(|p| p.parse().ok()),
        _ => None,
    }
}

/// `"45k€"`, `48000`, or `{"min": 45000, "max": 55000, "currency": "EUR"}`.
fn compensation(value: &Value) -> Option<String> {
    match value {
        Value::Object(obj) => {
            let min = obj.get("min").and_then(value_to_string);
            let max = obj.get("max").and_then(value_to_string);
            let currency = obj
                .get("currency")
                .and_then(value_to_string)
                .map(|c| format!(" {c}"))
                .unwrap_or_default();
            match (min, max) {
                (Some(min), Some(max)) => Some(format!("{min} - {max}{currency}")),
                (Some(v), None) | (None, Some(v)) => Some(format!("{v}{currency}")),
                (None, None) => None,
            }
        }
        other => value_to_string(other),
    }
}

/// Flattens arrays, comma/semicolon strings, `{"name": ..}` items and category
/// objects into one list, deduplicated case-insensitively in first-seen order.
fn flatten_list(value: &Value) -> Vec<String> {
    let mut out: Vec<String> = Vec::new();
    collect_items(value, &mut out);
    let mut seen: Vec<String> = Vec::new();
    out.retain(|item| {
        let key = item.to_lowercase();
        if seen.contains(&key) {
            false
        } else {
            seen.push(key);
            true
        }
    });
    out
}

fn collect_items(value: &Value, out: &mut Vec<String>) {
    match value {
        Value::String(s) => out.extend(
            s.split([',', ';', '\n', '•'])
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(str::to_string),
        ),
        Value::Number(n) => out.push(n.to_string()),
        Value::Array(items) => {
            for item in items {
                match item {
                    // List items are kept whole; only top-level strings are split.
                    Value::String(s) if !s.trim().is_empty() => out.push(s.trim().to_string()),
                    other => collect_items(other, out),
                }
            }
        }
        Value::Object(obj) => match obj.get("name").and_then(value_to_string) {
            Some(name) => out.push(name),
            None => obj.values().for_each(|v| collect_items(v, out)),
        },
        Value::Null | Value::Bool(_) => {}
    }
}
