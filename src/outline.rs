use serde::{Deserialize, Serialize};

pub const DEFAULT_EXAM_CODE: &str = "AI-102";
pub const DEFAULT_CHANGE_TYPE: &str = "Update";

/// Exam outline as produced by extraction (no ids) or normalization (ids filled).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutlineDocument {
    pub metadata: Metadata,
    pub topic_areas: Vec<TopicArea>,
    pub change_log: Vec<ChangeEntry>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Metadata {
    #[serde(alias = "examCode")]
    pub exam_code: String,
    #[serde(default, alias = "examTitle")]
    pub exam_title: String,
    #[serde(default, alias = "extractionDate")]
    pub extraction_date: String,
    #[serde(default, alias = "sourceFile")]
    pub source_file: String,
    #[serde(default, alias = "examUpdateDate")]
    pub exam_update_date: String,
    #[serde(default, skip_serializing_if = "Option::is_none", alias = "sourceUrl")]
    pub source_url: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TopicArea {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub topic_id: Option<String>,
    pub topic_area: String,
    pub percentage_weight: String,
    pub skills: Vec<Skill>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Skill {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub skill_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub topic_id: Option<String>,
    pub skill: String,
    pub sub_skills: Vec<SubSkill>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubSkill {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sub_skill_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub skill_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub topic_id: Option<String>,
    pub sub_skill: String,
    #[serde(default)]
    pub reference_links: Vec<String>,
    #[serde(default)]
    pub annotation: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChangeEntry {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub change_id: Option<String>,
    #[serde(default)]
    pub change_description: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub change_date: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub change_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub skill_prior: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub skill_current: Option<String>,
}

impl OutlineDocument {
    /// Empty document for `source_file`, stamped with `extraction_date`.
    pub fn new(exam_code: &str, source_file: &str, extraction_date: &str) -> Self {
        OutlineDocument {
            metadata: Metadata {
                exam_code: exam_code.to_string(),
                exam_title: String::new(),
                extraction_date: extraction_date.to_string(),
                source_file: source_file.to_string(),
                exam_update_date: String::new(),
                source_url: None,
            },
            topic_areas: Vec::new(),
            change_log: Vec::new(),
        }
    }

    pub fn skill_count(&self) -> usize {
        self.topic_areas.iter().map(|t| t.skills.len()).sum()
    }

    pub fn sub_skill_count(&self) -> usize {
        self.topic_areas.iter().map(TopicArea::sub_skill_count).sum()
    }
}

impl TopicArea {
    pub fn new(title: &str, weight: &str) -> Self {
        TopicArea {
            topic_id: None,
            topic_area: title.to_string(),
            percentage_weight: weight.to_string(),
            skills: Vec::new(),
        }
    }

    pub fn sub_skill_count(&self) -> usize {
        self.skills.iter().map(|s| s.sub_skills.len()).sum()
    }
}

impl Skill {
    pub fn new(name: &str) -> Self {
        Skill {
            skill_id: None,
            topic_id: None,
            skill: name.to_string(),
            sub_skills: Vec::new(),
        }
    }
}

impl SubSkill {
    pub fn new(text: &str, reference_links: Vec<String>) -> Self {
        SubSkill {
            sub_skill_id: None,
            skill_id: None,
            topic_id: None,
            sub_skill: text.to_string(),
            reference_links,
            annotation: String::new(),
        }
    }
}
