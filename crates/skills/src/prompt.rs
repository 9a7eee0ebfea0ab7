//! Progressive prompt sections.
//!
//! `prompt.md` may split its instructions into sections introduced by a
//! `# @section <trigger>` heading. A section is activated when the host
//! passes its trigger; a leading `*` (`# @section *security`) marks the
//! section as required, so it is always included.

use serde::Serialize;

pub const PROMPT_FILENAME: &str = "prompt.md";

const SECTION_MARKER: &str = "# @section";

/// A section of `prompt.md` introduced by `# @section <trigger>`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PromptSection {
    pub trigger: String,
    pub required: bool,
    pub body: String,
}

/// `prompt.md` split into the always-on preamble and its sections.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct PromptDocument {
    pub preamble: String,
    pub sections: Vec<PromptSection>,
}

pub fn parse_prompt(raw: &str) -> PromptDocument {
    let mut doc = PromptDocument::default();
    let mut current: Option<PromptSection> = None;
    let mut buf = String::new();

    for line in raw.lines() {
        if let Some(rest) = line.trim_end().strip_prefix(SECTION_MARKER)
            && (rest.is_empty() || rest.starts_with(char::is_whitespace))
        {
            flush(&mut doc, current.take(), &mut buf);
            let trigger = rest.trim();
            let (required, trigger) = match trigger.strip_prefix('*') {
                Some(t) => (true, t.trim()),
                None => (false, trigger),
            };
            current = Some(PromptSection {
                trigger: trigger.to_string(),
                required,
                body: String::new(),
            });
            continue;
        }
        buf.push_str(line);
        buf.push('\n');
    }
    flush(&mut doc, current, &mut buf);
    doc
}

fn flush(doc: &mut PromptDocument, section: Option<PromptSection>, buf: &mut String) {
    let text = buf.trim().to_string();
    buf.clear();
    match section {
        Some(mut s) => {
            s.body = text;
            doc.sections.push(s);
        },
        None => doc.preamble = text,
    }
}

impl PromptDocument {
    /// Preamble, every required section, and every section whose trigger is
    /// in `triggers`, in document order.
    pub fn activate(&self, triggers: &[String]) -> String {
        let mut parts: Vec<&str> = Vec::new();
        if !self.preamble.is_empty() {
            parts.push(&self.preamble);
        }
        for section in &self.sections {
            let wanted = section.required
                || triggers
                    .iter()
                    .any(|t| t.eq_ignore_ascii_case(&section.trigger));
            if wanted && !section.body.is_empty() {
                parts.push(&section.body);
            }
        }
        parts.join("\n\n")
    }

    pub fn required_triggers(&self) -> Vec<&str> {
        self.sections
            .iter()
            .filter(|s| s.required)
            .map(|s| s.trigger.as_str())
            .collect()
    }
}
