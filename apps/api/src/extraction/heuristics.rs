//! Heuristic Extractor: rule-based field extraction from raw text and a filename hint.
//!
//! Pattern and keyword driven, never statistical. `extract` cannot fail: whatever
//! it cannot find is left out (CV) or set to the sentinel (job posting), and the
//! normalizer fills in the rest.

use std::path::Path;
use std::sync::LazyLock;

use regex::Regex;
use serde_json::{json, Map, Value};

use crate::extraction::vocabulary::{select_group, skills_in_text};
use crate::models::document::DocumentKind;
use crate::models::extraction::{ExtractionResult, ExtractionSource};
use crate::models::profile::NOT_SPECIFIED;

/// Filename tokens that mark a document as a CV rather than name the person.
const CV_MARKERS: &[&str] = &[
    "cv", "resume", "résumé", "curriculum", "vitae", "final", "version", "new", "nouveau",
    "draft", "copy", "copie", "updated", "maj",
];

/// How far into the text a name is looked for.
const NAME_SCAN_LINES: usize = 8;

static EMAIL_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b[a-z0-9._%+-]+@[a-z0-9.-]+\.[a-z]{2,}\b").expect("email regex")
});

static PHONE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?:\+\d{1,3}[\s.-]?[1-9]|\b0[1-9])(?:[\s.-]?\d{2}){4}\b").expect("phone regex")
});

static TITLE_LABEL_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^(?:titre|poste(?:\s+actuel)?|title|position|job\s+title|intitul[ée](?:\s+du\s+poste)?)\s*[:\-–]\s*(.+)$")
        .expect("title label regex")
});

static EXPERIENCE_LINE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(concat!(
        r"(?i)^(?:de\s+|from\s+|depuis\s+)?",
        r"(\d{1,2}/\d{4}|\d{4}-\d{2}|\d{4})",
        r"\s*(?:-|–|—|à|au|to|until)\s*",
        r"(\d{1,2}/\d{4}|\d{4}-\d{2}|\d{4}|pr[ée]sent|aujourd['’]hui|actuel(?:lement)?|en\s+cours|current|now|today)",
        r"\s*[:,|\-–—]?\s*(.*)$"
    ))
    .expect("experience line regex")
});

static YEARS_HINT_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)(\d{1,2})\s*\+?\s*(?:ans|années|years?)\s+(?:d['’]\s*exp[ée]rience|of\s+experience|experience|d['’]exp)")
        .expect("years hint regex")
});

static COMPANY_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^(?:entreprise|soci[ée]t[ée]|company|employeur|employer|client)\s*[:\-–]\s*(.+)$")
        .expect("company regex")
});

static LOCATION_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^(?:(?:lieu(?:\s+de\s+travail)?|localisation|location|ville|city|adresse)\s*[:\-–]|📍)\s*(.+)$")
        .expect("location regex")
});

static SALARY_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^(?:(?:salaire|r[ée]mun[ée]ration|salary|compensation|package)\s*[:\-–]|💰)\s*(.+)$")
        .expect("salary regex")
});

static REQUIRED_EXPERIENCE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^(?:exp[ée]rience(?:\s+requise)?|experience(?:\s+required)?|niveau\s+d['’]exp[ée]rience)\s*[:\-–]\s*(.+)$")
        .expect("required experience regex")
});

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Section {
    Skills,
    Responsibilities,
    Benefits,
}

impl Section {
    fn field(&self) -> &'static str {
        match self {
            Section::Skills => "skills",
            Section::Responsibilities => "responsibilities",
            Section::Benefits => "benefits",
        }
    }
}

const SECTION_KEYWORDS: &[(Section, &[&str])] = &[
    (
        Section::Benefits,
        &["avantage", "benefits", "perks", "nous offrons", "we offer", "pourquoi nous rejoindre"],
    ),
    (
        Section::Responsibilities,
        &["responsab", "mission", "vos tâches", "tâches", "what you'll do", "what you will do"],
    ),
    (
        Section::Skills,
        &[
            "compétence", "competence", "profil", "skills", "requirements", "qualifications",
            "prérequis", "stack", "requis", "what we're looking for",
        ],
    ),
];

/// Runs the heuristics for `kind`. Never fails.
pub fn extract(text: &str, kind: DocumentKind, filename_hint: Option<&str>) -> ExtractionResult {
    let fields = match kind {
        DocumentKind::Cv => extract_cv(text, filename_hint),
        DocumentKind::JobPosting => extract_job_posting(text),
    };
    ExtractionResult::new(kind, ExtractionSource::Heuristic, fields)
}

fn extract_cv(text: &str, filename_hint: Option<&str>) -> Map<String, Value> {
    let mut fields = Map::new();

    let name = filename_hint
        .and_then(name_from_filename)
        .or_else(|| name_from_text(text));
    if let Some(name) = name {
        fields.insert("name".to_string(), json!(name));
    }

    if let Some(email) = EMAIL_RE.find(text) {
        fields.insert("email".to_string(), json!(email.as_str()));
    }
    if let Some(phone) = PHONE_RE.find(text) {
        fields.insert("phone".to_string(), json!(phone.as_str().trim()));
    }

    if let Some(title) = text
        .lines()
        .map(strip_bullet_marker)
        .find_map(|l| TITLE_LABEL_RE.captures(l))
        .map(|c| c[1].trim().to_string())
    {
        fields.insert("title".to_string(), json!(title));
    }

    let experiences = experience_lines(text);
    if !experiences.is_empty() {
        fields.insert("experiences".to_string(), Value::Array(experiences));
    }
    if let Some(years) = YEARS_HINT_RE
        .captures(text)
        .and_then(|c| c[1].parse::<u32>().ok())
    {
        fields.insert("experience_years".to_string(), json!(years));
    }

    let haystack = format!(
        "{} {}",
        filename_hint.unwrap_or_default().to_lowercase(),
        text.to_lowercase()
    );
    let group = select_group(&haystack);
    let mut skills = skills_in_text(text);
    if skills.is_empty() {
        skills = group.skills.iter().map(|s| s.to_string()).collect();
    }
    fields.insert("skills".to_string(), json!(skills));
    fields.insert("skill_domain".to_string(), json!(group.domain));

    fields
}

/// `"CV_Jean_Dupont.pdf"` → `"Jean Dupont"`. `None` when only markers remain.
pub fn name_from_filename(filename: &str) -> Option<String> {
    let stem = Path::new(filename).file_stem()?.to_str()?;
    let tokens: Vec<String> = stem
        .split(|c: char| c == '_' || c == '-' || c == '.' || c.is_whitespace())
        .filter(|t| !t.is_empty())
        .filter(|t| !CV_MARKERS.contains(&t.to_lowercase().as_str()))
        .filter(|t| !is_version_token(t))
        .filter(|t| t.chars().all(|c| c.is_alphabetic() || c == '\''))
        .map(title_case)
        .collect();

    if tokens.is_empty() {
        None
    } else {
        Some(tokens.join(" "))
    }
}

fn is_version_token(token: &str) -> bool {
    let lower = token.to_lowercase();
    let digits = lower.strip_prefix('v').unwrap_or(&lower);
    !digits.is_empty() && digits.chars().all(|c| c.is_ascii_digit())
}

/// First early line that reads like a proper name: 2–4 capitalised alphabetic words.
fn name_from_text(text: &str) -> Option<String> {
    text.lines()
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .take(NAME_SCAN_LINES)
        .find(|line| looks_like_name(line))
        .map(|line| {
            line.split_whitespace()
                .map(title_case)
                .collect::<Vec<_>>()
                .join(" ")
        })
}

fn looks_like_name(line: &str) -> bool {
    let words: Vec<&str> = line.split_whitespace().collect();
    if !(2..=4).contains(&words.len()) {
        return false;
    }
    words.iter().all(|w| {
        let first_upper = w.chars().next().is_some_and(char::is_uppercase);
        let letters_only = w.chars().all(|c| c.is_alphabetic() || c == '-' || c == '\'');
        let not_marker = !CV_MARKERS.contains(&w.to_lowercase().as_str());
        first_upper && letters_only && not_marker
    })
}

/// `"DUPONT"` → `"Dupont"`, `"curie-lefèvre"` → `"Curie-Lefèvre"`.
fn title_case(word: &str) -> String {
    word.split('-')
        .map(|part| {
            let mut chars = part.chars();
            match chars.next() {
                Some(first) => first
                    .to_uppercase()
                    .chain(chars.flat_map(char::to_lowercase))
                    .collect(),
                None => String::new(),
            }
        })
        .collect::<Vec<String>>()
        .join("-")
}

/// Lines like `2019 - 2022 Développeur chez Acme` or `06/2020 – présent : Lead, Globex`.
fn experience_lines(text: &str) -> Vec<Value> {
    text.lines()
        .map(strip_bullet_marker)
        .filter_map(|line| EXPERIENCE_LINE_RE.captures(line))
        .map(|caps| {
            let start = caps[1].to_string();
            let end_raw = caps[2].to_string();
            let end = if end_raw.chars().next().is_some_and(|c| c.is_ascii_digit()) {
                json!(end_raw)
            } else {
                Value::Null
            };
            let (title, organization) = split_role(caps[3].trim());
            let mut entry = Map::new();
            entry.insert("start".to_string(), json!(start));
            entry.insert("end".to_string(), end);
            if let Some(title) = title {
                entry.insert("title".to_string(), json!(title));
            }
            if let Some(org) = organization {
                entry.insert("organization".to_string(), json!(org));
            }
            Value::Object(entry)
        })
        .collect()
}

fn split_role(rest: &str) -> (Option<String>, Option<String>) {
    if rest.is_empty() {
        return (None, None);
    }
    const SEPARATORS: &[&str] = &[" chez ", " at ", " @ ", " - ", " – ", " — ", " | ", ", "];
    for sep in SEPARATORS {
        if let Some((title, org)) = rest.split_once(sep) {
            let title = title.trim();
            let org = org.trim();
            return (
                (!title.is_empty()).then(|| title.to_string()),
                (!org.is_empty()).then(|| org.to_string()),
            );
        }
    }
    (Some(rest.to_string()), None)
}

fn extract_job_posting(text: &str) -> Map<String, Value> {
    let lines: Vec<&str> = text.lines().map(str::trim).collect();
    let mut fields = Map::new();

    let title = lines
        .iter()
        .find(|l| !l.is_empty())
        .map(|l| clean_title(l))
        .filter(|t| !t.is_empty())
        .unwrap_or_else(|| NOT_SPECIFIED.to_string());
    fields.insert("title".to_string(), json!(title));

    for (field, re) in [
        ("company", &*COMPANY_RE),
        ("location", &*LOCATION_RE),
        ("salary", &*SALARY_RE),
        ("experience", &*REQUIRED_EXPERIENCE_RE),
    ] {
        let value = labelled_value(&lines, re);
        fields.insert(
            field.to_string(),
            json!(value.unwrap_or_else(|| NOT_SPECIFIED.to_string())),
        );
    }
    if fields.get("experience").and_then(Value::as_str) == Some(NOT_SPECIFIED) {
        if let Some(m) = YEARS_HINT_RE.find(text) {
            fields.insert("experience".to_string(), json!(m.as_str()));
        }
    }

    let mut sections = collect_sections(&lines);
    if sections[0].1.is_empty() {
        // No skills section: fall back to vocabulary mentions anywhere in the posting.
        sections[0].1 = skills_in_text(text);
    }
    for (section, items) in sections {
        let items = if items.is_empty() {
            vec![NOT_SPECIFIED.to_string()]
        } else {
            items
        };
        fields.insert(section.field().to_string(), json!(items));
    }

    fields
}

fn clean_title(line: &str) -> String {
    let line = strip_bullet_marker(line).trim_start_matches('#').trim();
    let line = TITLE_LABEL_RE
        .captures(line)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str())
        .unwrap_or(line);
    line.trim_end_matches(':').trim().to_string()
}

fn labelled_value(lines: &[&str], re: &Regex) -> Option<String> {
    lines
        .iter()
        .map(|l| strip_bullet_marker(l))
        .find_map(|l| re.captures(l))
        .map(|c| c[1].trim().to_string())
        .filter(|v| !v.is_empty())
}

/// Walks the lines once, assigning bullets to the section opened by the last heading.
/// Returned in fixed order: skills, responsibilities, benefits.
fn collect_sections(lines: &[&str]) -> [(Section, Vec<String>); 3] {
    let mut out = [
        (Section::Skills, Vec::new()),
        (Section::Responsibilities, Vec::new()),
        (Section::Benefits, Vec::new()),
    ];
    let mut current: Option<Section> = None;
    let title_idx = lines.iter().position(|l| !l.is_empty());

    for (idx, line) in lines.iter().enumerate() {
        if line.is_empty() {
            continue;
        }
        if let Some(item) = bullet_item(line) {
            if let Some(section) = current {
                push_item(&mut out, section, item);
            }
            continue;
        }
        // The title line is never a heading, even when it names one.
        if Some(idx) == title_idx {
            continue;
        }
        if let Some((section, inline)) = section_heading(line) {
            current = Some(section);
            if let Some(rest) = inline {
                for item in rest.split([',', ';']).map(str::trim).filter(|s| !s.is_empty()) {
                    push_item(&mut out, section, item);
                }
            }
        } else if line.ends_with(':') {
            // Some other heading closes the open section.
            current = None;
        }
    }

    out
}

fn push_item(out: &mut [(Section, Vec<String>); 3], section: Section, item: &str) {
    if let Some((_, items)) = out.iter_mut().find(|(s, _)| *s == section) {
        items.push(item.to_string());
    }
}

fn section_heading(line: &str) -> Option<(Section, Option<&str>)> {
    let line = line.trim_start_matches(|c: char| !c.is_alphanumeric());
    let (head, inline) = match line.split_once(':') {
        Some((head, rest)) => (head, Some(rest.trim()).filter(|r| !r.is_empty())),
        None => (line, None),
    };
    if head.chars().count() > 60 || head.split_whitespace().count() > 6 {
        return None;
    }
    let lower = head.to_lowercase();
    SECTION_KEYWORDS
        .iter()
        .find(|(_, keywords)| keywords.iter().any(|k| lower.contains(k)))
        .map(|(section, _)| (*section, inline))
}

/// The text of a bullet or numbered line, or `None` for plain lines.
fn bullet_item(line: &str) -> Option<&str> {
    const MARKERS: &[char] = &['-', '*', '•', '·', '▪', '◦', '✓', '✔', '→', '>', '–'];
    let trimmed = line.trim_start();
    if let Some(rest) = trimmed.strip_prefix(MARKERS) {
        let item = rest.trim();
        return (!item.is_empty()).then_some(item);
    }
    let digits = trimmed.chars().take_while(char::is_ascii_digit).count();
    if digits > 0 && digits <= 2 {
        let rest = &trimmed[digits..];
        if let Some(rest) = rest.strip_prefix(['.', ')']) {
            if rest.starts_with(char::is_whitespace) {
                let item = rest.trim();
                return (!item.is_empty()).then_some(item);
            }
        }
    }
    None
}

fn strip_bullet_marker(line: &str) -> &str {
    bullet_item(line).unwrap_or(line).trim()
}

#[cfg(test)]
mod tests {
    use super::*;

    const CV_TEXT: &str = "\
Marie Curie-Lefèvre
Titre : Développeuse Full-Stack
marie.lefevre@example.fr | +33 6 12 34 56 78

Expériences
2019 - 2022 Développeuse chez Acme
06/2022 – présent : Lead technique, Globex

Compétences : Rust, TypeScript, Docker
";

    const POSTING_TEXT: &str = "\
# Développeur Backend Rust (H/F)
Entreprise : Globex
📍 Lyon, France
Salaire : 50-60k€
Expérience : 3 ans minimum

Vos missions :
- Concevoir des services réseau
- Maintenir la CI

Compétences requises
• Rust
• PostgreSQL

Avantages
1. Télétravail partiel
2. Tickets restaurant
";

    #[test]
    fn test_name_from_filename_strips_markers_and_extension() {
        assert_eq!(name_from_filename("CV_Jean_Dupont.pdf").as_deref(), Some("Jean Dupont"));
        assert_eq!(name_from_filename("jean-dupont-resume-v2.docx").as_deref(), Some("Jean Dupont"));
        assert_eq!(name_from_filename("CV_2024.pdf"), None);
    }

    #[test]
    fn test_filename_hint_with_empty_text_yields_name() {
        let result = extract("", DocumentKind::Cv, Some("CV_Jean_Dupont.pdf"));
        assert_eq!(result.source, ExtractionSource::Heuristic);
        assert_eq!(result.fields["name"], "Jean Dupont");
        // Nothing else to go on: generic skill group, no title or experience.
        assert_eq!(result.fields["skill_domain"], "generic");
        assert!(result.fields.get("title").is_none());
        assert!(result.fields.get("experiences").is_none());
    }

    #[test]
    fn test_cv_fields_from_text() {
        let result = extract(CV_TEXT, DocumentKind::Cv, None);
        let f = &result.fields;
        assert_eq!(f["name"], "Marie Curie-Lefèvre");
        assert_eq!(f["email"], "marie.lefevre@example.fr");
        assert_eq!(f["phone"], "+33 6 12 34 56 78");
        assert_eq!(f["title"], "Développeuse Full-Stack");
        assert_eq!(f["skills"], json!(["TypeScript", "Rust", "Docker"]));

        let exps = f["experiences"].as_array().unwrap();
        assert_eq!(exps.len(), 2);
        assert_eq!(exps[0]["start"], "2019");
        assert_eq!(exps[0]["end"], "2022");
        assert_eq!(exps[0]["title"], "Développeuse");
        assert_eq!(exps[0]["organization"], "Acme");
        assert_eq!(exps[1]["start"], "06/2022");
        assert!(exps[1]["end"].is_null());
        assert_eq!(exps[1]["title"], "Lead technique");
        assert_eq!(exps[1]["organization"], "Globex");
    }

    #[test]
    fn test_filename_hint_selects_skill_group_when_text_has_no_skills() {
        let result = extract("", DocumentKind::Cv, Some("CV_Marketing_Paul_Martin.pdf"));
        assert_eq!(result.fields["skill_domain"], "marketing");
        assert_eq!(result.fields["skills"][0], "SEO");
    }

    #[test]
    fn test_years_hint() {
        let result = extract("Ingénieur avec 7 ans d'expérience en C++", DocumentKind::Cv, None);
        assert_eq!(result.fields["experience_years"], 7);
    }

    #[test]
    fn test_job_posting_structure() {
        let result = extract(POSTING_TEXT, DocumentKind::JobPosting, None);
        let f = &result.fields;
        assert_eq!(f["title"], "Développeur Backend Rust (H/F)");
        assert_eq!(f["company"], "Globex");
        assert_eq!(f["location"], "Lyon, France");
        assert_eq!(f["salary"], "50-60k€");
        assert_eq!(f["experience"], "3 ans minimum");
        assert_eq!(
            f["responsibilities"],
            json!(["Concevoir des services réseau", "Maintenir la CI"])
        );
        assert_eq!(f["skills"], json!(["Rust", "PostgreSQL"]));
        assert_eq!(f["benefits"], json!(["Télétravail partiel", "Tickets restaurant"]));
    }

    #[test]
    fn test_job_posting_missing_sections_get_sentinel() {
        let result = extract("Chargé de mission\nUn poste passionnant.", DocumentKind::JobPosting, None);
        let f = &result.fields;
        assert_eq!(f["title"], "Chargé de mission");
        assert_eq!(f["company"], NOT_SPECIFIED);
        assert_eq!(f["location"], NOT_SPECIFIED);
        assert_eq!(f["salary"], NOT_SPECIFIED);
        assert_eq!(f["skills"], json!([NOT_SPECIFIED]));
        assert_eq!(f["responsibilities"], json!([NOT_SPECIFIED]));
        assert_eq!(f["benefits"], json!([NOT_SPECIFIED]));
    }

    #[test]
    fn test_inline_section_heading_is_split() {
        let result = extract(
            "Data Analyst\nCompétences : SQL, Python; Tableau\n",
            DocumentKind::JobPosting,
            None,
        );
        assert_eq!(result.fields["skills"], json!(["SQL", "Python", "Tableau"]));
    }

    #[test]
    fn test_unrelated_heading_closes_section() {
        let text = "Titre\nAvantages\n- Mutuelle\nÀ propos de nous :\n- Fondée en 2010\n";
        let result = extract(text, DocumentKind::JobPosting, None);
        assert_eq!(result.fields["benefits"], json!(["Mutuelle"]));
    }

    #[test]
    fn test_title_after_blank_lines_is_not_a_heading() {
        let text = "\n\nResponsable Marketing Digital\nEntreprise : Acme\n- Poste basé à Lyon\n- CDI\nAvantages\n- Mutuelle";
        let result = extract(text, DocumentKind::JobPosting, None);
        let f = &result.fields;
        assert_eq!(f["title"], "Responsable Marketing Digital");
        assert_eq!(f["company"], "Acme");
        assert_eq!(f["responsibilities"], json!([NOT_SPECIFIED]));
        assert_eq!(f["benefits"], json!(["Mutuelle"]));
    }

    #[test]
    fn test_empty_input_never_fails() {
        let cv = extract("", DocumentKind::Cv, None);
        assert!(cv.fields.get("name").is_none());
        assert!(!cv.fields["skills"].as_array().unwrap().is_empty());
        let posting = extract("", DocumentKind::JobPosting, None);
        assert_eq!(posting.fields["title"], NOT_SPECIFIED);
    }

    #[test]
    fn test_bullet_item_markers() {
        assert_eq!(bullet_item("- item"), Some("item"));
        assert_eq!(bullet_item("• item"), Some("item"));
        assert_eq!(bullet_item("3) item"), Some("item"));
        assert_eq!(bullet_item("2024 was good"), None);
        assert_eq!(bullet_item("plain"), None);
    }
}
