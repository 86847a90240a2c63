//! Score breakdown trees

use serde::{Deserialize, Serialize};
use std::fmt;

/// One node of a score explanation: a value, what it represents, and the
/// sub-explanations it was computed from
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Explanation {
    value: f32,
    description: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    details: Vec<Explanation>,
}

impl Explanation {
    pub fn new(value: f32, description: impl Into<String>) -> Self {
        Self {
            value,
            description: description.into(),
            details: Vec::new(),
        }
    }

    pub fn value(&self) -> f32 {
        self.value
    }

    pub fn set_value(&mut self, value: f32) {
        self.value = value;
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn set_description(&mut self, description: impl Into<String>) {
        self.description = description.into();
    }

    pub fn details(&self) -> &[Explanation] {
        &self.details
    }

    pub fn add_detail(&mut self, detail: Explanation) {
        self.details.push(detail);
    }

    /// Builder form of [`add_detail`](Self::add_detail)
    pub fn with_detail(mut self, detail: Explanation) -> Self {
        self.details.push(detail);
        self
    }

    /// Take the first detail out of this node, dropping the wrapper
    pub(crate) fn into_first_detail(mut self) -> Explanation {
        if self.details.is_empty() {
            return self;
        }
        self.details.swap_remove(0)
    }

    /// Whether the explained document matched (positive value)
    pub fn is_match(&self) -> bool {
        self.value > 0.0
    }

    /// Render as nested HTML lists
    pub fn to_html(&self) -> String {
        let mut out = String::new();
        self.write_html(&mut out);
        out
    }

    fn write_html(&self, out: &mut String) {
        out.push_str("<ul>\n<li>");
        out.push_str(&format!("{:?} = {}", self.value, escape_html(&self.description)));
        out.push_str("</li>\n");
        for detail in &self.details {
            detail.write_html(out);
        }
        out.push_str("</ul>\n");
    }

    fn write_indented(&self, f: &mut fmt::Formatter<'_>, depth: usize) -> fmt::Result {
        writeln!(f, "{}{:?} = {}", "  ".repeat(depth), self.value, self.description)?;
        for detail in &self.details {
            detail.write_indented(f, depth + 1)?;
        }
        Ok(())
    }
}

impl fmt::Display for Explanation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.write_indented(f, 0)
    }
}

fn escape_html(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}
