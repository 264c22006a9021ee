use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::outline::{OutlineDocument, Skill, SubSkill, TopicArea, DEFAULT_CHANGE_TYPE};

pub const SUB_SKILLS_CSV: &str = "database_ready.csv";
pub const CHANGE_LOG_CSV: &str = "change_log.csv";
const LINK_SEPARATOR: &str = "|";

/// One flattened sub-skill with its ancestors.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubSkillRow {
    pub sub_skill_id: String,
    pub skill_id: String,
    pub topic_id: String,
    pub topic_area: String,
    pub percentage_weight: String,
    pub skill: String,
    pub sub_skill: String,
    pub reference_links: String,
    pub annotation: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChangeRow {
    pub change_id: String,
    pub change_description: String,
    pub change_date: String,
    pub change_type: String,
}

pub fn sub_skill_rows(doc: &OutlineDocument) -> Vec<SubSkillRow> {
    let mut rows = Vec::with_capacity(doc.sub_skill_count());
    for topic in &doc.topic_areas {
        for skill in &topic.skills {
            for sub in &skill.sub_skills {
                rows.push(SubSkillRow {
                    sub_skill_id: sub.sub_skill_id.clone().unwrap_or_default(),
                    skill_id: sub.skill_id.clone().unwrap_or_default(),
                    topic_id: sub.topic_id.clone().unwrap_or_default(),
                    topic_area: topic.topic_area.clone(),
                    percentage_weight: topic.percentage_weight.clone(),
                    skill: skill.skill.clone(),
                    sub_skill: sub.sub_skill.clone(),
                    reference_links: sub.reference_links.join(LINK_SEPARATOR),
                    annotation: sub.annotation.clone(),
                });
            }
        }
    }
    rows
}

pub fn change_rows(doc: &OutlineDocument) -> Vec<ChangeRow> {
    doc.change_log
        .iter()
        .map(|c| ChangeRow {
            change_id: c.change_id.clone().unwrap_or_default(),
            change_description: c.change_description.clone(),
            change_date: c.change_date.clone().unwrap_or_default(),
            change_type: c
                .change_type
                .clone()
                .unwrap_or_else(|| DEFAULT_CHANGE_TYPE.to_string()),
        })
        .collect()
}

/// The part of the tree a flat export can carry: topics and skills that own sub-skills.
pub fn representable_topics(doc: &OutlineDocument) -> Vec<TopicArea> {
    doc.topic_areas
        .iter()
        .cloned()
        .filter_map(|mut t| {
            t.skills.retain(|s| !s.sub_skills.is_empty());
            (!t.skills.is_empty()).then_some(t)
        })
        .collect()
}

/// Regroup flattened rows by ancestor ids, keeping first-seen order.
/// Topics and skills without sub-skills have no rows and do not come back.
pub fn rebuild_topics(rows: &[SubSkillRow]) -> Vec<TopicArea> {
    let mut topics: Vec<TopicArea> = Vec::new();

    for row in rows {
        let topic_pos = match topics.iter().position(|t| t.topic_id.as_deref() == Some(row.topic_id.as_str())) {
            Some(pos) => pos,
            None => {
                let mut topic = TopicArea::new(&row.topic_area, &row.percentage_weight);
                topic.topic_id = Some(row.topic_id.clone());
                topics.push(topic);
                topics.len() - 1
            }
        };
        let topic = &mut topics[topic_pos];

        let skill_pos = match topic.skills.iter().position(|s| s.skill_id.as_deref() == Some(row.skill_id.as_str())) {
            Some(pos) => pos,
            None => {
                let mut skill = Skill::new(&row.skill);
                skill.skill_id = Some(row.skill_id.clone());
                skill.topic_id = Some(row.topic_id.clone());
                topic.skills.push(skill);
                topic.skills.len() - 1
            }
        };

        let links = if row.reference_links.is_empty() {
            Vec::new()
        } else {
            row.reference_links.split(LINK_SEPARATOR).map(str::to_string).collect()
        };
        let mut sub = SubSkill::new(&row.sub_skill, links);
        sub.sub_skill_id = Some(row.sub_skill_id.clone());
        sub.skill_id = Some(row.skill_id.clone());
        sub.topic_id = Some(row.topic_id.clone());
        sub.annotation = row.annotation.clone();
        topic.skills[skill_pos].sub_skills.push(sub);
    }

    topics
}

fn write_csv<T: Serialize>(path: &Path, rows: &[T], headers: &[&str]) -> Result<()> {
    let mut writer = csv::WriterBuilder::new()
        .has_headers(false)
        .from_path(path)
        .with_context(|| format!("Failed to create {:?}", path))?;
    writer.write_record(headers)?;
    for row in rows {
        writer.serialize(row)?;
    }
    writer.flush()?;
    Ok(())
}

/// Write `database_ready.csv` and `change_log.csv` into `dir`.
pub fn export_csv(doc: &OutlineDocument, dir: &Path) -> Result<(PathBuf, PathBuf)> {
    std::fs::create_dir_all(dir).with_context(|| format!("Failed to create {:?}", dir))?;

    let sub_path = dir.join(SUB_SKILLS_CSV);
    let subs = sub_skill_rows(doc);
    write_csv(
        &sub_path,
        &subs,
        &[
            "sub_skill_id", "skill_id", "topic_id", "topic_area", "percentage_weight",
            "skill", "sub_skill", "reference_links", "annotation",
        ],
    )?;

    let change_path = dir.join(CHANGE_LOG_CSV);
    let changes = change_rows(doc);
    write_csv(
        &change_path,
        &changes,
        &["change_id", "change_description", "change_date", "change_type"],
    )?;

    info!("Wrote {} sub-skill rows, {} change rows", subs.len(), changes.len());
    Ok((sub_path, change_path))
}

pub fn read_sub_skill_csv(path: &Path) -> Result<Vec<SubSkillRow>> {
    let mut reader = csv::Reader::from_path(path).with_context(|| format!("Failed to open {:?}", path))?;
    let rows = reader.deserialize().collect::<Result<Vec<SubSkillRow>, _>>()?;
    Ok(rows)
}

/// Re-read the exported sub-skill CSV and confirm it regroups into the same tree.
pub fn check_round_trip(doc: &OutlineDocument, csv_path: &Path) -> Result<()> {
    let rows = read_sub_skill_csv(csv_path)?;
    let rebuilt = rebuild_topics(&rows);
    if !same_membership(&rebuilt, &representable_topics(doc)) {
        anyhow::bail!("{:?} does not regroup into the exported outline", csv_path);
    }
    info!("Round-trip check passed for {} rows", rows.len());
    Ok(())
}

/// Compare ids and order only; text may legitimately differ (e.g. links containing `|`).
fn same_membership(a: &[TopicArea], b: &[TopicArea]) -> bool {
    fn ids(topics: &[TopicArea]) -> Vec<(Option<&str>, Option<&str>, Option<&str>)> {
        topics
            .iter()
            .flat_map(|t| {
                t.skills.iter().flat_map(move |s| {
                    s.sub_skills.iter().map(move |ss| {
                        (t.topic_id.as_deref(), s.skill_id.as_deref(), ss.sub_skill_id.as_deref())
                    })
                })
            })
            .collect()
    }
    a.len() == b.len() && ids(a) == ids(b)
}

// ── Statistics ──

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Statistics {
    pub total_topic_areas: usize,
    pub total_skills: usize,
    pub total_sub_skills: usize,
    pub total_reference_links: usize,
    pub topic_breakdown: Vec<TopicStats>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TopicStats {
    pub topic_area: String,
    pub percentage_weight: String,
    pub skills_count: usize,
    pub sub_skills_count: usize,
}

pub fn statistics(doc: &OutlineDocument) -> Statistics {
    let topic_breakdown: Vec<TopicStats> = doc
        .topic_areas
        .iter()
        .map(|t| TopicStats {
            topic_area: t.topic_area.clone(),
            percentage_weight: t.percentage_weight.clone(),
            skills_count: t.skills.len(),
            sub_skills_count: t.sub_skill_count(),
        })
        .collect();

    let total_reference_links = doc
        .topic_areas
        .iter()
        .flat_map(|t| &t.skills)
        .flat_map(|s| &s.sub_skills)
        .map(|s| s.reference_links.len())
        .sum();

    Statistics {
        total_topic_areas: doc.topic_areas.len(),
        total_skills: doc.skill_count(),
        total_sub_skills: doc.sub_skill_count(),
        total_reference_links,
        topic_breakdown,
    }
}

impl Statistics {
    pub fn print(&self) {
        println!("Total Topic Areas:     {}", self.total_topic_areas);
        println!("Total Skills:          {}", self.total_skills);
        println!("Total Sub-Skills:      {}", self.total_sub_skills);
        println!("Total Reference Links: {}", self.total_reference_links);
        for t in &self.topic_breakdown {
            println!("\n{} ({})", t.topic_area, t.percentage_weight);
            println!("  Skills:     {}", t.skills_count);
            println!("  Sub-skills: {}", t.sub_skills_count);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::loader::Loaded;
    use crate::normalize::normalize;
    use crate::parser::{extract, ExtractOptions};

    fn canonical() -> OutlineDocument {
        let html = std::fs::read_to_string("tests/fixtures/ai102.html").unwrap();
        let raw = extract(
            &Loaded::Html(html),
            &ExtractOptions {
                exam_code: "AI-102",
                source_file: "tests/fixtures/ai102.html",
                extraction_date: "2024-05-01T10:00:00",
                title: None,
            },
        );
        normalize(&raw)
    }

    #[test]
    fn flatten_carries_ancestors() {
        let rows = sub_skill_rows(&canonical());
        assert_eq!(rows.len(), 4);
        assert_eq!(rows[0].sub_skill_id, "SUBSKILL-00001");
        assert_eq!(rows[0].topic_area, "Plan and manage an Azure AI solution");
        assert_eq!(rows[0].reference_links, "https://learn.microsoft.com/azure/ai-services/computer-vision/");
        assert_eq!(rows[3].topic_id, "TOPIC-003");
        assert_eq!(rows[3].skill_id, "SKILL-0004");
    }

    #[test]
    fn multiple_links_pipe_joined() {
        let mut doc = canonical();
        doc.topic_areas[0].skills[0].sub_skills[0].reference_links = vec!["a".into(), "b".into()];
        assert_eq!(sub_skill_rows(&doc)[0].reference_links, "a|b");
    }

    #[test]
    fn rows_rebuild_same_tree() {
        let doc = canonical();
        let rebuilt = rebuild_topics(&sub_skill_rows(&doc));
        assert_eq!(rebuilt, representable_topics(&doc));
    }

    #[test]
    fn csv_round_trip() {
        let doc = canonical();
        let dir = tempfile::tempdir().unwrap();
        let (subs, changes) = export_csv(&doc, dir.path()).unwrap();

        let rows = read_sub_skill_csv(&subs).unwrap();
        assert_eq!(rebuild_topics(&rows), representable_topics(&doc));

        let change_csv = std::fs::read_to_string(changes).unwrap();
        let mut lines = change_csv.lines();
        assert_eq!(lines.next(), Some("change_id,change_description,change_date,change_type"));
        assert_eq!(lines.next(), Some("CHANGE-001,Updated skill wording,2024-03-01,Update"));
    }

    #[test]
    fn round_trip_check_detects_reordering() {
        let doc = canonical();
        let dir = tempfile::tempdir().unwrap();
        let (subs, _) = export_csv(&doc, dir.path()).unwrap();
        check_round_trip(&doc, &subs).unwrap();

        let mut reordered = doc.clone();
        reordered.topic_areas.swap(0, 2);
        assert!(check_round_trip(&reordered, &subs).is_err());
    }

    #[test]
    fn stats_totals() {
        let stats = statistics(&canonical());
        assert_eq!(stats.total_topic_areas, 3);
        assert_eq!(stats.total_skills, 4);
        assert_eq!(stats.total_sub_skills, 4);
        assert_eq!(stats.total_reference_links, 1);
        assert_eq!(stats.topic_breakdown[0].skills_count, 2);
        assert_eq!(stats.topic_breakdown[0].sub_skills_count, 3);
        assert_eq!(stats.topic_breakdown[1].sub_skills_count, 0);
    }
}
