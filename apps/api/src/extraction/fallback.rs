//! Terminal record of the strategy chain. Built from constants, so it cannot fail.

use serde_json::{json, Map, Value};

use crate::models::document::DocumentKind;
use crate::models::extraction::{ExtractionResult, ExtractionSource};
use crate::models::profile::NOT_SPECIFIED;

pub fn static_record(kind: DocumentKind) -> ExtractionResult {
    let fields = match kind {
        DocumentKind::Cv => sample_profile(),
        DocumentKind::JobPosting => empty_posting(),
    };
    ExtractionResult::new(kind, ExtractionSource::StaticFallback, fields)
}

fn sample_profile() -> Map<String, Value> {
    to_map(json!({
        "name": "Candidat",
        "email": "candidat@example.com",
        "phone": "+33 6 00 00 00 00",
        "title": "Développeur Full-Stack",
        "experiences": [
            {
                "title": "Développeur Full-Stack",
                "organization": "Entreprise Tech",
                "start": "2021-09",
                "end": null
            },
            {
                "title": "Développeur Junior",
                "organization": "Agence Web",
                "start": "2019-09",
                "end": "2021-08"
            }
        ],
        "skills": ["JavaScript", "React", "Node.js", "SQL", "Git"]
    }))
}

fn empty_posting() -> Map<String, Value> {
    to_map(json!({
        "title": NOT_SPECIFIED,
        "company": NOT_SPECIFIED,
        "location": NOT_SPECIFIED,
        "experience": NOT_SPECIFIED,
        "salary": NOT_SPECIFIED,
        "skills": [NOT_SPECIFIED],
        "responsibilities": [NOT_SPECIFIED],
        "benefits": [NOT_SPECIFIED]
    }))
}

fn to_map(value: Value) -> Map<String, Value> {
    match value {
        Value::Object(map) => map,
        _ => Map::new(),
    }
}
