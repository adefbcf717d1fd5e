// Shared prompt fragments.
// Each service that needs LLM calls defines its own prompts.rs alongside it.

/// Prepended by the request augmentor to the last user message of chat-endpoint calls.
pub const EXHAUSTIVE_READING_PREFIX: &str = "\
    IMPORTANT: Read ALL of the content supplied below, from the first line to the last. \
    Go through every section (header, profile, experience, education, skills, languages, \
    projects, requirements, responsibilities, benefits) and do not stop after the first one. \
    Extract every piece of information that fits the requested fields. \
    Respond with strict JSON only: no commentary, no markdown fences, no text before or after the JSON.";
