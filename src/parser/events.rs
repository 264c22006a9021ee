use std::sync::LazyLock;

use regex::Regex;
use tracing::debug;

use crate::outline::{ChangeEntry, OutlineDocument, Skill, SubSkill, TopicArea};

static WEIGHT_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\((\d+[-–]\d+%)\)").unwrap());

/// One structural cue found in a document, in document order.
#[derive(Debug, Clone, PartialEq)]
pub enum Event {
    Title(String),
    UpdateDate(String),
    Topic { title: String, weight: String },
    Skill(String),
    SubSkill { text: String, links: Vec<String> },
    Change {
        description: String,
        date: String,
        change_type: String,
    },
}

/// Anything that can turn a loaded document into an ordered event stream.
pub trait EventSource {
    fn events(&self) -> Vec<Event>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    NoTopic,
    InTopic,
    InSkill,
}

/// Parse a topic heading: `"Plan and manage (15-20%)"` → `("Plan and manage", "15-20%")`.
/// Every weight parenthetical is removed from the title.
pub fn parse_topic(text: &str) -> Option<(String, String)> {
    let caps = WEIGHT_RE.captures(text)?;
    let weight = caps[1].to_string();
    let title = WEIGHT_RE.replace_all(text, "").trim().to_string();
    Some((title, weight))
}

/// Fold events into an outline. Skills and sub-skills with no open parent are dropped.
pub fn reduce(events: impl IntoIterator<Item = Event>, doc: &mut OutlineDocument) {
    let mut state = State::NoTopic;

    for event in events {
        match event {
            Event::Title(title) => doc.metadata.exam_title = title,
            Event::UpdateDate(date) => doc.metadata.exam_update_date = date,
            Event::Topic { title, weight } => {
                doc.topic_areas.push(TopicArea::new(&title, &weight));
                state = State::InTopic;
            }
            Event::Skill(name) => match (state, doc.topic_areas.last_mut()) {
                (State::InTopic | State::InSkill, Some(topic)) => {
                    topic.skills.push(Skill::new(&name));
                    state = State::InSkill;
                }
                _ => debug!("dropping skill without topic: {}", name),
            },
            Event::SubSkill { text, links } => {
                let skill = doc
                    .topic_areas
                    .last_mut()
                    .and_then(|t| t.skills.last_mut())
                    .filter(|_| state == State::InSkill);
                match skill {
                    Some(skill) => skill.sub_skills.push(SubSkill::new(&text, links)),
                    None => debug!("dropping sub-skill without skill: {}", text),
                }
            }
            Event::Change {
                description,
                date,
                change_type,
            } => doc.change_log.push(ChangeEntry {
                change_id: None,
                change_description: description,
                change_date: Some(date),
                change_type: Some(change_type),
                skill_prior: None,
                skill_current: None,
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn empty_doc() -> OutlineDocument {
        OutlineDocument::new("AI-102", "test", "2024-01-01T00:00:00")
    }

    fn topic(title: &str) -> Event {
        Event::Topic {
            title: title.to_string(),
            weight: "10-15%".to_string(),
        }
    }

    fn sub(text: &str) -> Event {
        Event::SubSkill {
            text: text.to_string(),
            links: vec![],
        }
    }

    #[test]
    fn topic_heading_split() {
        let (title, weight) = parse_topic("Plan and manage an Azure AI solution (15-20%)").unwrap();
        assert_eq!(title, "Plan and manage an Azure AI solution");
        assert_eq!(weight, "15-20%");
    }

    #[test]
    fn topic_heading_en_dash() {
        let (title, weight) = parse_topic("Implement NLP solutions (15–20%)").unwrap();
        assert_eq!(title, "Implement NLP solutions");
        assert_eq!(weight, "15–20%");
    }

    #[test]
    fn malformed_weight_is_not_a_topic() {
        assert!(parse_topic("Plan and manage (15%)").is_none());
        assert!(parse_topic("Plan and manage 15-20%").is_none());
        assert!(parse_topic("Plan and manage (a-b%)").is_none());
    }

    #[test]
    fn builds_three_levels() {
        let mut doc = empty_doc();
        reduce(
            vec![topic("A"), Event::Skill("S1".into()), sub("x"), sub("y"), Event::Skill("S2".into()), topic("B")],
            &mut doc,
        );
        assert_eq!(doc.topic_areas.len(), 2);
        assert_eq!(doc.topic_areas[0].skills.len(), 2);
        assert_eq!(doc.topic_areas[0].skills[0].sub_skills.len(), 2);
        assert!(doc.topic_areas[0].skills[1].sub_skills.is_empty());
        assert!(doc.topic_areas[1].skills.is_empty());
    }

    #[test]
    fn markers_before_topic_are_dropped() {
        let mut doc = empty_doc();
        reduce(vec![Event::Skill("orphan".into()), sub("orphan"), topic("A")], &mut doc);
        assert_eq!(doc.topic_areas.len(), 1);
        assert!(doc.topic_areas[0].skills.is_empty());
    }

    #[test]
    fn new_topic_clears_current_skill() {
        let mut doc = empty_doc();
        reduce(
            vec![topic("A"), Event::Skill("S1".into()), topic("B"), sub("lost")],
            &mut doc,
        );
        assert!(doc.topic_areas[0].skills[0].sub_skills.is_empty());
        assert!(doc.topic_areas[1].skills.is_empty());
    }

    #[test]
    fn change_rows_ignore_state() {
        let mut doc = empty_doc();
        reduce(
            vec![Event::Change {
                description: "Updated skill wording".into(),
                date: "2024-03-01".into(),
                change_type: "Update".into(),
            }],
            &mut doc,
        );
        assert_eq!(doc.change_log.len(), 1);
        assert_eq!(doc.change_log[0].change_date.as_deref(), Some("2024-03-01"));
    }
}
