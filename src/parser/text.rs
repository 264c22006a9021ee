use super::events::{parse_topic, Event, EventSource};

const BULLET: char = '•';
const SUB_SKILL_PREFIXES: &[char] = &[BULLET, '-', 'o'];

/// Page text pulled out of a PDF, one outline cue per line.
pub struct TextOutline {
    text: String,
    title: Option<String>,
}

impl TextOutline {
    pub fn new(text: impl Into<String>) -> Self {
        TextOutline {
            text: text.into(),
            title: None,
        }
    }

    /// Plain text carries no title element; let the caller provide one.
    pub fn with_title(mut self, title: Option<String>) -> Self {
        self.title = title;
        self
    }
}

impl EventSource for TextOutline {
    fn events(&self) -> Vec<Event> {
        let mut events: Vec<Event> = self.title.iter().cloned().map(Event::Title).collect();
        events.extend(classify_lines(&self.text));
        events
    }
}

/// Classify each non-blank line. Parent gating is left to the reducer.
pub fn classify_lines(text: &str) -> Vec<Event> {
    text.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .filter_map(classify_line)
        .collect()
}

fn classify_line(line: &str) -> Option<Event> {
    if let Some((title, weight)) = parse_topic(line) {
        return Some(Event::Topic { title, weight });
    }

    // Skill: capitalized, not a bullet
    let first = line.chars().next()?;
    if first.is_uppercase() && first != BULLET {
        return Some(Event::Skill(line.to_string()));
    }

    if line.starts_with(SUB_SKILL_PREFIXES) {
        let text = line
            .trim_start_matches(|c: char| SUB_SKILL_PREFIXES.contains(&c) || c == ' ')
            .trim();
        return Some(Event::SubSkill {
            text: text.to_string(),
            links: Vec::new(),
        });
    }

    None
}
