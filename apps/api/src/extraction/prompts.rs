// Extraction prompt templates.
// All prompts for the remote extraction strategy are defined here.

pub const CV_EXTRACTION_SYSTEM: &str = "\
You are a precise CV data extractor. \
Read the candidate's document and return its facts as JSON. \
You MUST respond with valid JSON only, no markdown fences, no explanations. \
Never invent data: use null for anything the document does not state.";

pub const CV_EXTRACTION_PROMPT: &str = r#"Extract the candidate profile from the following CV.

FILE NAME: {filename}

CV TEXT:
{content}

OUTPUT SCHEMA (return exactly this structure):
{
  "name": "string" | null,
  "email": "string" | null,
  "phone": "string" | null,
  "title": "string" | null,
  "experiences": [
    {"title": "string", "organization": "string", "start": "YYYY-MM" | null, "end": "YYYY-MM" | null}
  ],
  "skills": ["string"],
  "experience_years": number | null
}

RULES:
- "end" is null for the current position.
- List experiences most recent first.
- "skills" holds individual skills, not categories."#;

pub const JOB_POSTING_EXTRACTION_SYSTEM: &str = "\
You are a precise job posting analyst. \
Read the posting and return its facts as JSON. \
You MUST respond with valid JSON only, no markdown fences, no explanations. \
Never invent data: use null for anything the posting does not state.";

pub const JOB_POSTING_EXTRACTION_PROMPT: &str = r#"Extract the structured fields from the following job posting.

FILE NAME: {filename}

POSTING TEXT:
{content}

OUTPUT SCHEMA (return exactly this structure):
{
  "title": "string" | null,
  "company": "string" | null,
  "location": "string" | null,
  "experience": "string" | null,
  "salary": "string" | null,
  "skills": ["string"],
  "responsibilities": ["string"],
  "benefits": ["string"]
}"#;
