//! Fixed skill vocabulary grouped by domain.
//!
//! Group order is the tie-break: the first group whose triggers appear wins.
//! `GENERIC` is used when no group matches.

#[derive(Debug)]
pub struct SkillGroup {
    pub domain: &'static str,
    /// Lowercase substrings that select this group (matched against filename hint and text).
    pub triggers: &'static [&'static str],
    /// Skills recognised in text, and the default set when none are found.
    pub skills: &'static [&'static str],
}

pub const SKILL_GROUPS: &[SkillGroup] = &[
    SkillGroup {
        domain: "development",
        triggers: &[
            "dev", "développeur", "developer", "engineer", "ingénieur", "fullstack",
            "full-stack", "backend", "frontend", "software", "logiciel", "programm",
        ],
        skills: &[
            "JavaScript", "TypeScript", "React", "Node.js", "Python", "Java", "Rust", "Go",
            "PHP", "SQL", "Git", "Docker", "Kubernetes", "AWS", "HTML", "CSS",
        ],
    },
    SkillGroup {
        domain: "data",
        triggers: &[
            "data", "donnée", "analyst", "analyste", "machine learning", "scientist",
            "statisti", " bi ",
        ],
        skills: &[
            "Python", "SQL", "Pandas", "Machine Learning", "Power BI", "Tableau", "Excel",
            "Spark", "TensorFlow", "Statistiques",
        ],
    },
    SkillGroup {
        domain: "marketing",
        triggers: &[
            "marketing", "seo", "communication", "social media", "réseaux sociaux",
            "growth", "brand", "marque",
        ],
        skills: &[
            "SEO", "SEA", "Google Analytics", "Content Marketing", "Social Media",
            "Emailing", "CRM", "Copywriting",
        ],
    },
    SkillGroup {
        domain: "design",
        triggers: &["design", " ux", " ui ", "graphi", "figma", "créati"],
        skills: &[
            "Figma", "Adobe XD", "Photoshop", "Illustrator", "UX Research", "Prototypage",
            "Design System",
        ],
    },
    SkillGroup {
        domain: "finance",
        triggers: &["financ", "comptab", "accounting", "audit", "contrôle de gestion"],
        skills: &[
            "Comptabilité", "Excel", "SAP", "Contrôle de gestion", "Audit", "Fiscalité",
            "Reporting",
        ],
    },
    SkillGroup {
        domain: "sales",
        triggers: &["sales", "commercial", "vente", "business developer", "account manager"],
        skills: &[
            "Négociation", "Prospection", "CRM", "Salesforce", "Relation client",
            "Business Development",
        ],
    },
];

pub const GENERIC: SkillGroup = SkillGroup {
    domain: "generic",
    triggers: &[],
    skills: &[
        "Communication",
        "Travail en équipe",
        "Gestion de projet",
        "Organisation",
        "Pack Office",
    ],
};

/// First group, in declared order, with a trigger present in `haystack` (already lowercased).
pub fn select_group(haystack: &str) -> &'static SkillGroup {
    SKILL_GROUPS
        .iter()
        .find(|g| g.triggers.iter().any(|t| haystack.contains(t)))
        .unwrap_or(&GENERIC)
}

/// Every vocabulary skill mentioned in `text`, in the order they appear, no duplicates.
pub fn skills_in_text(text: &str) -> Vec<String> {
    let lower = text.to_lowercase();
    let mut hits: Vec<(usize, &str)> = SKILL_GROUPS
        .iter()
        .chain(std::iter::once(&GENERIC))
        .flat_map(|g| g.skills.iter())
        .filter_map(|skill| first_mention(&lower, &skill.to_lowercase()).map(|pos| (pos, *skill)))
        .collect();
    // Stable, so two skills at one position keep vocabulary order.
    hits.sort_by_key(|(pos, _)| *pos);

    let mut found: Vec<String> = Vec::new();
    for (_, skill) in hits {
        if !found.iter().any(|f| f.eq_ignore_ascii_case(skill)) {
            found.push(skill.to_string());
        }
    }
    found
}

/// Byte offset of the first whole-word occurrence, so "go" does not match
/// "google" and "sql" matches "SQL,".
fn first_mention(haystack: &str, needle: &str) -> Option<usize> {
    haystack
        .match_indices(needle)
        .find(|(idx, _)| {
            let before = haystack[..*idx].chars().next_back();
            let after = haystack[*idx + needle.len()..].chars().next();
            !before.is_some_and(char::is_alphanumeric) && !after.is_some_and(char::is_alphanumeric)
        })
        .map(|(idx, _)| idx)
}
