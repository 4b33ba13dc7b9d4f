use serde::Serialize;

/// Marker introducing a summary replacement
pub const SUMMARY_MARKER: &str = "SUMMARY_UPDATE:";
/// Marker introducing persona attribute lines
pub const PERSONA_MARKER: &str = "PERSONA_UPDATE:";
/// Marker introducing a memory note
pub const MEMORY_MARKER: &str = "MEMORY_UPDATE:";

/// Directives found in one agent reply
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Directives {
    /// Replacement summary
    pub summary: Option<String>,
    /// Persona attributes in the order they were written
    pub persona: Vec<(String, String)>,
    /// New memory note
    pub memory: Option<String>,
}

impl Directives {
    /// True when no directive was found
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.summary.is_none() && self.persona.is_empty() && self.memory.is_none()
    }
}

/// Extract every directive from a reply
#[must_use]
pub fn parse_directives(text: &str) -> Directives {
    Directives {
        summary: summary_update_from(text),
        persona: persona_update_from(text),
        memory: section_after(text, MEMORY_MARKER),
    }
}

/// Summary payload: text after the first `SUMMARY_UPDATE:`, trimmed
#[must_use]
pub fn summary_update_from(text: &str) -> Option<String> {
    section_after(text, SUMMARY_MARKER)
}

/// Persona payload: `key: value` lines after the first `PERSONA_UPDATE:`
#[must_use]
pub fn persona_update_from(text: &str) -> Vec<(String, String)> {
    let Some(body) = raw_section(text, PERSONA_MARKER) else {
        return Vec::new();
    };

    body.lines()
        .filter_map(|line| {
            let (key, value) = line.split_once(':')?;
            let key = key.trim();
            if key.is_empty() {
                return None;
            }
            Some((key.to_string(), value.trim().to_string()))
        })
        .collect()
}

/// Trimmed text following the first occurrence of `marker`; empty is `None`
#[must_use]
pub fn section_after(text: &str, marker: &str) -> Option<String> {
    let body = raw_section(text, marker)?.trim();
    if body.is_empty() {
        None
    } else {
        Some(body.to_string())
    }
}

/// Everything after the first `marker`, including any later markers
fn raw_section<'a>(text: &'a str, marker: &str) -> Option<&'a str> {
    let start = text.find(marker)? + marker.len();
    Some(&text[start..])
}
