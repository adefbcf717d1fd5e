//! Local answers for when the remote assistant is unreachable.
//!
//! Intent detection is keyword based and checked in a fixed order, so a message
//! mentioning both improvement and strengths is treated as an improvement request.

use crate::models::profile::{is_sentinel, ParsedDocument};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Intent {
    Improve,
    Strengths,
    SkillsToDevelop,
    MatchingRoles,
    Summary,
}

const INTENT_KEYWORDS: &[(Intent, &[&str])] = &[
    (
        Intent::Improve,
        &["amélior", "amelior", "improve", "better", "conseil", "advice", "optimis", "renforcer"],
    ),
    (
        Intent::Strengths,
        &["point fort", "points forts", "force", "strength", "atout", "strong"],
    ),
    (
        Intent::SkillsToDevelop,
        &[
            "développer", "developper", "apprendre", "learn", "manque", "missing", "lacun",
            "progresser", "develop",
        ],
    ),
    (
        Intent::MatchingRoles,
        &["poste", "métier", "metier", "rôle", "role", "job", "emploi", "candidat", "position"],
    ),
];

/// Skills suggested for growth, per document skill already present.
const GROWTH_PAIRS: &[(&str, &str)] = &[
    ("javascript", "TypeScript"),
    ("react", "Next.js"),
    ("python", "FastAPI"),
    ("sql", "Modélisation de données"),
    ("docker", "Kubernetes"),
    ("excel", "Power BI"),
    ("seo", "Google Analytics"),
    ("figma", "Design System"),
    ("rust", "Programmation asynchrone"),
];

const GENERIC_GROWTH: &[&str] = &["Gestion de projet", "Anglais professionnel", "Cloud (AWS ou Azure)"];

pub fn detect(message: &str) -> Intent {
    let lower = message.to_lowercase();
    INTENT_KEYWORDS
        .iter()
        .find(|(_, keywords)| keywords.iter().any(|k| lower.contains(k)))
        .map(|(intent, _)| *intent)
        .unwrap_or(Intent::Summary)
}

pub fn local_reply(intent: Intent, document: &ParsedDocument) -> String {
    let title = known(document.title()).unwrap_or("votre profil");
    let skills = top_skills(document);
    let experience = known(document.experience());

    match intent {
        Intent::Improve => {
            let mut tips = vec![
                "Quantifiez vos réalisations (chiffres, délais, volumes) dans chaque expérience.".to_string(),
                format!("Mettez en avant les compétences clés pour {title} dès le haut du document."),
            ];
            if skills.is_empty() {
                tips.push("Ajoutez une section compétences explicite.".to_string());
            }
            if experience.is_none() {
                tips.push("Indiquez clairement les dates de chaque expérience.".to_string());
            }
            format!("Pistes d'amélioration :\n- {}", tips.join("\n- "))
        }
        Intent::Strengths => match (skills.is_empty(), experience) {
            (false, Some(exp)) => format!(
                "Vos points forts pour {title} : {} ainsi que {exp} d'expérience.",
                skills.join(", ")
            ),
            (false, None) => format!("Vos points forts pour {title} : {}.", skills.join(", ")),
            (true, _) => format!(
                "Le document ne détaille pas assez de compétences pour dégager des points forts pour {title}."
            ),
        },
        Intent::SkillsToDevelop => {
            let growth = growth_skills(document);
            format!(
                "Pour progresser en tant que {title}, vous pourriez développer : {}.",
                growth.join(", ")
            )
        }
        Intent::MatchingRoles => {
            let base = known(document.title()).unwrap_or("un poste polyvalent");
            let mut roles = vec![base.to_string()];
            if let Some(first) = skills.first() {
                roles.push(format!("Spécialiste {first}"));
            }
            if experience.is_some() {
                roles.push(format!("{base} senior"));
            }
            format!("Postes correspondant à ce profil : {}.", roles.join(", "))
        }
        Intent::Summary => {
            let mut summary = format!("Synthèse pour {title}");
            if let Some(exp) = experience {
                summary.push_str(&format!(", {exp} d'expérience"));
            }
            if !skills.is_empty() {
                summary.push_str(&format!(", compétences principales : {}", skills.join(", ")));
            }
            summary.push('.');
            summary
        }
    }
}

fn known(value: &str) -> Option<&str> {
    (!is_sentinel(value) && !value.trim().is_empty()).then_some(value)
}

fn top_skills(document: &ParsedDocument) -> Vec<&str> {
    document
        .skills()
        .iter()
        .map(String::as_str)
        .filter(|s| known(s).is_some())
        .take(5)
        .collect()
}

fn growth_skills(document: &ParsedDocument) -> Vec<String> {
    let have: Vec<String> = document.skills().iter().map(|s| s.to_lowercase()).collect();
    let mut growth: Vec<String> = GROWTH_PAIRS
        .iter()
        .filter(|(present, next)| {
            have.iter().any(|h| h.as_str() == *present) && !have.contains(&next.to_lowercase())
        })
        .map(|(_, next)| next.to_string())
        .take(3)
        .collect();
    if growth.is_empty() {
        growth = GENERIC_GROWTH.iter().map(|s| s.to_string()).collect();
    }
    growth
}
