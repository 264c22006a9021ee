use crate::outline::{OutlineDocument, DEFAULT_CHANGE_TYPE};

const UNKNOWN_DATE: &str = "Unknown";

/// Run-scoped id counters, one per entity kind. Every run starts at 1.
#[derive(Debug, Clone, Copy)]
pub struct IdCounters {
    topic: u32,
    skill: u32,
    sub_skill: u32,
    change: u32,
}

impl Default for IdCounters {
    fn default() -> Self {
        IdCounters {
            topic: 1,
            skill: 1,
            sub_skill: 1,
            change: 1,
        }
    }
}

impl IdCounters {
    fn next_topic(&mut self) -> String {
        let id = format!("TOPIC-{:03}", self.topic);
        self.topic += 1;
        id
    }

    fn next_skill(&mut self) -> String {
        let id = format!("SKILL-{:04}", self.skill);
        self.skill += 1;
        id
    }

    fn next_sub_skill(&mut self) -> String {
        let id = format!("SUBSKILL-{:05}", self.sub_skill);
        self.sub_skill += 1;
        id
    }

    fn next_change(&mut self) -> String {
        let id = format!("CHANGE-{:03}", self.change);
        self.change += 1;
        id
    }
}

/// Assign ids depth-first and fill defaults. Pure; the input is left untouched.
///
/// Ids are positional: any `change_id` already present is overwritten, and
/// re-normalizing yields the same ids only while entity order is unchanged.
pub fn normalize(raw: &OutlineDocument) -> OutlineDocument {
    let mut doc = raw.clone();
    let mut ids = IdCounters::default();

    for topic in &mut doc.topic_areas {
        let topic_id = ids.next_topic();

        for skill in &mut topic.skills {
            let skill_id = ids.next_skill();

            for sub in &mut skill.sub_skills {
                sub.sub_skill_id = Some(ids.next_sub_skill());
                sub.skill_id = Some(skill_id.clone());
                sub.topic_id = Some(topic_id.clone());
            }

            skill.skill_id = Some(skill_id);
            skill.topic_id = Some(topic_id.clone());
        }

        topic.topic_id = Some(topic_id);
    }

    let default_date = if doc.metadata.exam_update_date.trim().is_empty() {
        UNKNOWN_DATE.to_string()
    } else {
        doc.metadata.exam_update_date.clone()
    };

    for change in &mut doc.change_log {
        change.change_id = Some(ids.next_change());
        change
            .change_type
            .get_or_insert_with(|| DEFAULT_CHANGE_TYPE.to_string());
        change.change_date.get_or_insert_with(|| default_date.clone());
    }

    doc
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::outline::{ChangeEntry, Skill, SubSkill, TopicArea};

    fn raw() -> OutlineDocument {
        let mut doc = OutlineDocument::new("AI-102", "guide.html", "2024-05-01T10:00:00");
        for t in 0..2 {
            let mut topic = TopicArea::new(&format!("Topic {}", t), "10-15%");
            for s in 0..3 {
                let mut skill = Skill::new(&format!("Skill {}.{}", t, s));
                for i in 0..2 {
                    skill.sub_skills.push(SubSkill::new(&format!("Sub {}.{}.{}", t, s, i), vec![]));
                }
                topic.skills.push(skill);
            }
            doc.topic_areas.push(topic);
        }
        doc
    }

    fn change(date: Option<&str>, kind: Option<&str>) -> ChangeEntry {
        ChangeEntry {
            change_id: Some("CUSTOM-9".into()),
            change_description: "Reworded".into(),
            change_date: date.map(String::from),
            change_type: kind.map(String::from),
            skill_prior: None,
            skill_current: None,
        }
    }

    #[test]
    fn ids_are_global_per_kind() {
        let doc = normalize(&raw());
        let t1 = &doc.topic_areas[1];
        assert_eq!(t1.topic_id.as_deref(), Some("TOPIC-002"));
        assert_eq!(t1.skills[0].skill_id.as_deref(), Some("SKILL-0004"));
        assert_eq!(t1.skills[0].topic_id.as_deref(), Some("TOPIC-002"));
        let sub = &t1.skills[2].sub_skills[1];
        assert_eq!(sub.sub_skill_id.as_deref(), Some("SUBSKILL-00012"));
        assert_eq!(sub.skill_id.as_deref(), Some("SKILL-0006"));
        assert_eq!(sub.topic_id.as_deref(), Some("TOPIC-002"));
    }

    #[test]
    fn fifteenth_skill() {
        let mut doc = OutlineDocument::new("AI-102", "x", "y");
        let mut topic = TopicArea::new("T", "1-5%");
        topic.skills = (0..15).map(|i| Skill::new(&i.to_string())).collect();
        doc.topic_areas.push(topic);
        let doc = normalize(&doc);
        assert_eq!(doc.topic_areas[0].skills[14].skill_id.as_deref(), Some("SKILL-0015"));
    }

    #[test]
    fn ids_unique_and_order_preserved() {
        let input = raw();
        let doc = normalize(&input);
        let mut seen = std::collections::HashSet::new();
        let names: Vec<(&str, &str)> = doc
            .topic_areas
            .iter()
            .flat_map(|t| &t.skills)
            .flat_map(|s| &s.sub_skills)
            .map(|s| {
                assert!(seen.insert(s.sub_skill_id.clone().unwrap()));
                (s.sub_skill.as_str(), s.sub_skill_id.as_deref().unwrap())
            })
            .collect();
        let before: Vec<&str> = input
            .topic_areas
            .iter()
            .flat_map(|t| &t.skills)
            .flat_map(|s| &s.sub_skills)
            .map(|s| s.sub_skill.as_str())
            .collect();
        assert_eq!(names.iter().map(|(n, _)| *n).collect::<Vec<_>>(), before);
        assert_eq!(seen.len(), 12);
    }

    #[test]
    fn change_defaults_and_overwritten_ids() {
        let mut input = raw();
        input.metadata.exam_update_date = "2024-04-29".into();
        input.change_log = vec![change(None, None), change(Some("2024-01-01"), Some("Added"))];
        let doc = normalize(&input);
        let c0 = &doc.change_log[0];
        assert_eq!(c0.change_id.as_deref(), Some("CHANGE-001"));
        assert_eq!(c0.change_type.as_deref(), Some("Update"));
        assert_eq!(c0.change_date.as_deref(), Some("2024-04-29"));
        let c1 = &doc.change_log[1];
        assert_eq!(c1.change_id.as_deref(), Some("CHANGE-002"));
        assert_eq!(c1.change_type.as_deref(), Some("Added"));
        assert_eq!(c1.change_date.as_deref(), Some("2024-01-01"));
    }

    #[test]
    fn missing_update_date_falls_back_to_unknown() {
        let mut input = raw();
        input.change_log = vec![change(None, None)];
        let doc = normalize(&input);
        assert_eq!(doc.change_log[0].change_date.as_deref(), Some("Unknown"));
    }

    #[test]
    fn renormalizing_is_stable() {
        let once = normalize(&raw());
        let twice = normalize(&once);
        assert_eq!(once, twice);
    }

    #[test]
    fn input_untouched() {
        let input = raw();
        let _ = normalize(&input);
        assert!(input.topic_areas[0].topic_id.is_none());
    }
}
