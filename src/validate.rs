use std::sync::LazyLock;

use anyhow::{Context, Result};
use regex::Regex;
use serde_json::Value;

use crate::error::PipelineError;
use crate::normalize::normalize;
use crate::outline::OutlineDocument;

static WEIGHT_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^\d+[-–]\d+%$").unwrap());

const REQUIRED_KEYS: &[&str] = &["metadata", "topic_areas", "change_log"];

/// Collect every structural violation in a raw outline. Empty means valid.
pub fn validate(data: &Value, expected_exam_code: &str) -> Vec<String> {
    let mut errors = Vec::new();

    for key in REQUIRED_KEYS {
        if data.get(key).is_none() {
            errors.push(format!("Missing required key: {}", key));
        }
    }

    if let Some(meta) = data.get("metadata") {
        match meta.get("exam_code").or_else(|| meta.get("examCode")) {
            None => errors.push("Missing metadata.exam_code".to_string()),
            Some(code) if code.as_str() != Some(expected_exam_code) => {
                let shown = code.as_str().map(str::to_string).unwrap_or_else(|| code.to_string());
                errors.push(format!("Invalid exam_code: {}", shown));
            }
            Some(_) => {}
        }
    }

    if let Some(topics) = data.get("topic_areas") {
        match topics.as_array() {
            None => errors.push("topic_areas must be an array".to_string()),
            Some(topics) if topics.is_empty() => errors.push("topic_areas array is empty".to_string()),
            Some(topics) => {
                for (idx, topic) in topics.iter().enumerate() {
                    validate_topic(idx, topic, &mut errors);
                }
            }
        }
    }

    if let Some(changes) = data.get("change_log") {
        if !changes.is_array() {
            errors.push("change_log must be an array".to_string());
        }
    }

    errors
}

/// Gate for normalization: every violation is printed, then the run halts
/// with `PipelineError::Validation` and nothing is normalized.
pub fn validate_and_normalize(data: &Value, exam_code: &str) -> Result<OutlineDocument> {
    let errors = validate(data, exam_code);
    if !errors.is_empty() {
        println!("\nVALIDATION ERRORS:");
        for e in &errors {
            println!("  • {}", e);
        }
        return Err(PipelineError::Validation(errors).into());
    }
    println!("Validation passed.");

    let raw: OutlineDocument =
        serde_json::from_value(data.clone()).context("Outline fields have unexpected types")?;
    Ok(normalize(&raw))
}

fn validate_topic(idx: usize, topic: &Value, errors: &mut Vec<String>) {
    match topic.get("topic_area") {
        None => errors.push(format!("Topic {}: missing topic_area", idx)),
        Some(title) if title.as_str().map_or(true, |t| t.trim().is_empty()) => {
            errors.push(format!("Topic {}: empty topic_area", idx));
        }
        Some(_) => {}
    }

    match topic.get("percentage_weight") {
        None => errors.push(format!("Topic {}: missing percentage_weight", idx)),
        Some(weight) if !weight.as_str().is_some_and(|w| WEIGHT_RE.is_match(w)) => {
            errors.push(format!("Topic {}: malformed percentage_weight: {}", idx, weight));
        }
        Some(_) => {}
    }

    let Some(skills) = topic.get("skills") else {
        errors.push(format!("Topic {}: missing skills", idx));
        return;
    };
    let Some(skills) = skills.as_array() else {
        errors.push(format!("Topic {}: skills must be an array", idx));
        return;
    };

    for (skill_idx, skill) in skills.iter().enumerate() {
        if skill.get("skill").is_none() {
            errors.push(format!("Topic {}, Skill {}: missing skill name", idx, skill_idx));
        }
        match skill.get("sub_skills") {
            None => errors.push(format!("Topic {}, Skill {}: missing sub_skills", idx, skill_idx)),
            Some(subs) if !subs.is_array() => {
                errors.push(format!("Topic {}, Skill {}: sub_skills must be an array", idx, skill_idx));
            }
            Some(_) => {}
        }
    }
}
