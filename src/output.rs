//! Output types: generated results and document facts.

use serde::{Deserialize, Serialize};

/// The three artefacts a generation request can produce.
///
/// Each field is either empty or holds the value from the most recent
/// successful response.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResultSet {
    pub summary: String,
    pub quiz: String,
    pub assignments: String,
}

impl ResultSet {
    /// True when no field has content.
    pub fn is_empty(&self) -> bool {
        self.summary.is_empty() && self.quiz.is_empty() && self.assignments.is_empty()
    }

    /// Non-empty sections as `(heading, body)` pairs, in display order.
    pub fn sections(&self) -> Vec<(&'static str, &str)> {
        [
            ("Summary", self.summary.as_str()),
            ("Quiz", self.quiz.as_str()),
            ("Assignment ideas", self.assignments.as_str()),
        ]
        .into_iter()
        .filter(|(_, body)| !body.is_empty())
        .collect()
    }

    /// Render the non-empty sections as a Markdown document.
    pub fn to_markdown(&self) -> String {
        let mut out = String::new();
        for (heading, body) in self.sections() {
            if !out.is_empty() {
                out.push('\n');
            }
            out.push_str(&format!("## {}\n\n{}\n", heading, body.trim_end()));
        }
        out
    }
}

/// Facts about a document, available without extracting its text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentInfo {
    pub name: String,
    pub page_count: usize,
    pub byte_len: usize,
}
