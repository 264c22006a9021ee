use std::path::Path;

use anyhow::{Context, Result};
use indicatif::{ProgressBar, ProgressStyle};
use rusqlite::types::Value;
use rusqlite::{params, Connection};
use tracing::info;

use crate::outline::{OutlineDocument, DEFAULT_CHANGE_TYPE};

pub fn connect(path: &Path) -> Result<Connection> {
    if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
        std::fs::create_dir_all(dir).with_context(|| format!("Failed to create {:?}", dir))?;
    }
    let conn = Connection::open(path).with_context(|| format!("Failed to open {:?}", path))?;
    conn.execute_batch("PRAGMA journal_mode=WAL; PRAGMA foreign_keys=ON;")?;
    Ok(conn)
}

pub fn init_schema(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "
        CREATE TABLE IF NOT EXISTS exam_metadata (
            exam_code        TEXT PRIMARY KEY,
            exam_title       TEXT,
            extraction_date  TEXT,
            exam_update_date TEXT,
            source_url       TEXT,
            source_file      TEXT
        );

        CREATE TABLE IF NOT EXISTS topic_areas (
            topic_id          TEXT PRIMARY KEY,
            topic_area        TEXT NOT NULL,
            percentage_weight TEXT NOT NULL
        );

        CREATE TABLE IF NOT EXISTS skills (
            skill_id  TEXT PRIMARY KEY,
            topic_id  TEXT NOT NULL REFERENCES topic_areas(topic_id),
            skill     TEXT NOT NULL
        );
        CREATE INDEX IF NOT EXISTS idx_skills_topic ON skills(topic_id);

        CREATE TABLE IF NOT EXISTS sub_skills (
            sub_skill_id    TEXT PRIMARY KEY,
            skill_id        TEXT NOT NULL REFERENCES skills(skill_id),
            topic_id        TEXT NOT NULL REFERENCES topic_areas(topic_id),
            sub_skill       TEXT NOT NULL,
            reference_links TEXT,
            annotation      TEXT
        );
        CREATE INDEX IF NOT EXISTS idx_sub_skills_skill ON sub_skills(skill_id);
        CREATE INDEX IF NOT EXISTS idx_sub_skills_topic ON sub_skills(topic_id);

        CREATE TABLE IF NOT EXISTS change_log (
            change_id          TEXT PRIMARY KEY,
            change_description TEXT,
            change_date        TEXT,
            change_type        TEXT,
            skill_prior        TEXT,
            skill_current      TEXT
        );
        ",
    )?;
    Ok(())
}

// ── Load ──

#[derive(Debug, Default, PartialEq, Eq)]
pub struct LoadCounts {
    pub topics: usize,
    pub skills: usize,
    pub sub_skills: usize,
    pub changes: usize,
}

impl LoadCounts {
    pub fn print(&self) {
        println!(
            "Loaded {} topics, {} skills, {} sub-skills, {} change log entries.",
            self.topics, self.skills, self.sub_skills, self.changes,
        );
    }
}

/// Upsert a canonical outline in one transaction. Any failure rolls the whole load back.
pub fn save_outline(conn: &Connection, doc: &OutlineDocument) -> Result<LoadCounts> {
    let pb = ProgressBar::new(LOAD_STEPS);
    pb.set_style(ProgressStyle::default_bar().template("[{elapsed_precise}] {bar:40} {pos}/{len} {msg}")?);
    save_outline_with_progress(conn, doc, &pb)
}

const LOAD_STEPS: u64 = 5;

fn save_outline_with_progress(conn: &Connection, doc: &OutlineDocument, pb: &ProgressBar) -> Result<LoadCounts> {
    match upsert_outline(conn, doc, pb) {
        Ok(counts) => {
            pb.finish_and_clear();
            info!(
                "Loaded {} topics, {} skills, {} sub-skills, {} changes",
                counts.topics, counts.skills, counts.sub_skills, counts.changes
            );
            Ok(counts)
        }
        Err(e) => {
            pb.abandon_with_message("load rolled back");
            Err(e)
        }
    }
}

fn upsert_outline(conn: &Connection, doc: &OutlineDocument, pb: &ProgressBar) -> Result<LoadCounts> {
    let tx = conn.unchecked_transaction()?;
    let mut counts = LoadCounts::default();
    {
        pb.set_message("exam_metadata");
        let m = &doc.metadata;
        tx.execute(
            "INSERT INTO exam_metadata
             (exam_code, exam_title, extraction_date, exam_update_date, source_url, source_file)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)
             ON CONFLICT (exam_code) DO UPDATE SET
                exam_title = excluded.exam_title,
                extraction_date = excluded.extraction_date,
                exam_update_date = excluded.exam_update_date,
                source_url = excluded.source_url,
                source_file = excluded.source_file",
            params![
                m.exam_code,
                m.exam_title,
                m.extraction_date,
                m.exam_update_date,
                m.source_url.as_deref().unwrap_or(""),
                m.source_file,
            ],
        )?;
        pb.inc(1);

        pb.set_message("topic_areas");
        let mut t_stmt = tx.prepare(
            "INSERT INTO topic_areas (topic_id, topic_area, percentage_weight)
             VALUES (?1, ?2, ?3)
             ON CONFLICT (topic_id) DO UPDATE SET
                topic_area = excluded.topic_area,
                percentage_weight = excluded.percentage_weight",
        )?;
        for t in &doc.topic_areas {
            t_stmt.execute(params![required(&t.topic_id, "topic_id")?, t.topic_area, t.percentage_weight])?;
            counts.topics += 1;
        }
        pb.inc(1);

        pb.set_message("skills");
        let mut s_stmt = tx.prepare(
            "INSERT INTO skills (skill_id, topic_id, skill)
             VALUES (?1, ?2, ?3)
             ON CONFLICT (skill_id) DO UPDATE SET
                topic_id = excluded.topic_id,
                skill = excluded.skill",
        )?;
        for s in doc.topic_areas.iter().flat_map(|t| &t.skills) {
            s_stmt.execute(params![
                required(&s.skill_id, "skill_id")?,
                required(&s.topic_id, "topic_id")?,
                s.skill,
            ])?;
            counts.skills += 1;
        }
        pb.inc(1);

        pb.set_message("sub_skills");
        let mut ss_stmt = tx.prepare(
            "INSERT INTO sub_skills (sub_skill_id, skill_id, topic_id, sub_skill, reference_links, annotation)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)
             ON CONFLICT (sub_skill_id) DO UPDATE SET
                skill_id = excluded.skill_id,
                topic_id = excluded.topic_id,
                sub_skill = excluded.sub_skill,
                reference_links = excluded.reference_links,
                annotation = excluded.annotation",
        )?;
        for ss in doc
            .topic_areas
            .iter()
            .flat_map(|t| &t.skills)
            .flat_map(|s| &s.sub_skills)
        {
            ss_stmt.execute(params![
                required(&ss.sub_skill_id, "sub_skill_id")?,
                required(&ss.skill_id, "skill_id")?,
                required(&ss.topic_id, "topic_id")?,
                ss.sub_skill,
                ss.reference_links.join("|"),
                ss.annotation,
            ])?;
            counts.sub_skills += 1;
        }
        pb.inc(1);

        pb.set_message("change_log");
        let mut c_stmt = tx.prepare(
            "INSERT INTO change_log
             (change_id, change_description, change_date, change_type, skill_prior, skill_current)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)
             ON CONFLICT (change_id) DO UPDATE SET
                change_description = excluded.change_description,
                change_date = excluded.change_date,
                change_type = excluded.change_type,
                skill_prior = excluded.skill_prior,
                skill_current = excluded.skill_current",
        )?;
        for (idx, c) in doc.change_log.iter().enumerate() {
            let change_id = c
                .change_id
                .clone()
                .unwrap_or_else(|| format!("CHANGE-{:03}", idx + 1));
            c_stmt.execute(params![
                change_id,
                c.change_description,
                c.change_date.as_deref().unwrap_or(""),
                c.change_type.as_deref().unwrap_or(DEFAULT_CHANGE_TYPE),
                c.skill_prior.as_deref().unwrap_or(""),
                c.skill_current.as_deref().unwrap_or(""),
            ])?;
            counts.changes += 1;
        }
        pb.inc(1);
    }
    tx.commit()?;
    Ok(counts)
}

fn required<'a>(id: &'a Option<String>, field: &str) -> Result<&'a str> {
    id.as_deref()
        .with_context(|| format!("Outline is not normalized: missing {}", field))
}

// ── Reports ──

pub struct QueryResult {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

impl QueryResult {
    pub fn print(&self, title: &str) {
        println!("\n{}", "=".repeat(80));
        println!("{}", title);
        println!("{}", "=".repeat(80));
        println!("{}", self.columns.join(" | "));
        println!("{}", "-".repeat(80));
        if self.rows.is_empty() {
            println!("(No results)");
        }
        for row in &self.rows {
            println!("{}", row.join(" | "));
        }
        println!("\nRows returned: {}", self.rows.len());
    }
}

/// Fixed read-only reports over the loaded outline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum Report {
    Overview,
    TopicSkills,
    References,
    Changes,
    Hierarchy,
    Search,
    Summary,
}

impl Report {
    pub const ALL: [Report; 7] = [
        Report::Overview,
        Report::TopicSkills,
        Report::References,
        Report::Changes,
        Report::Hierarchy,
        Report::Search,
        Report::Summary,
    ];

    pub fn title(&self) -> &'static str {
        match self {
            Report::Overview => "TOPIC OVERVIEW - All exam topics with counts",
            Report::TopicSkills => "SKILLS IN TOPIC AREA - Detailed breakdown",
            Report::References => "SUB-SKILLS WITH REFERENCE LINKS - First 10",
            Report::Changes => "CHANGE LOG - Exam update history",
            Report::Hierarchy => "HIERARCHICAL VIEW - Topics > Skills > Sub-skill counts",
            Report::Search => "SEARCH - Sub-skills matching keywords",
            Report::Summary => "OVERALL STATISTICS - Dataset summary",
        }
    }
}

pub struct ReportParams<'a> {
    pub topic_id: &'a str,
    pub keywords: &'a [String],
}

pub fn run_report(conn: &Connection, report: Report, p: &ReportParams) -> Result<QueryResult> {
    match report {
        Report::Overview => query(
            conn,
            "SELECT t.topic_area, t.percentage_weight,
                    COUNT(DISTINCT s.skill_id) AS num_skills,
                    COUNT(ss.sub_skill_id) AS num_sub_skills
             FROM topic_areas t
             LEFT JOIN skills s ON t.topic_id = s.topic_id
             LEFT JOIN sub_skills ss ON s.skill_id = ss.skill_id
             GROUP BY t.topic_id, t.topic_area, t.percentage_weight
             ORDER BY t.topic_id",
            &[],
        ),
        Report::TopicSkills => query(
            conn,
            "SELECT t.topic_area, s.skill, COUNT(ss.sub_skill_id) AS num_sub_skills
             FROM topic_areas t
             JOIN skills s ON t.topic_id = s.topic_id
             LEFT JOIN sub_skills ss ON s.skill_id = ss.skill_id
             WHERE t.topic_id = ?1
             GROUP BY t.topic_area, s.skill_id, s.skill
             ORDER BY s.skill_id",
            &[Value::Text(p.topic_id.to_string())],
        ),
        Report::References => query(
            conn,
            "SELECT t.topic_area, s.skill, ss.sub_skill, ss.reference_links
             FROM sub_skills ss
             JOIN skills s ON ss.skill_id = s.skill_id
             JOIN topic_areas t ON ss.topic_id = t.topic_id
             WHERE ss.reference_links != ''
             ORDER BY ss.sub_skill_id
             LIMIT 10",
            &[],
        ),
        Report::Changes => query(
            conn,
            "SELECT change_type, change_description, change_date
             FROM change_log
             ORDER BY change_id",
            &[],
        ),
        Report::Hierarchy => query(
            conn,
            "SELECT t.topic_area, t.percentage_weight, s.skill,
                    COUNT(ss.sub_skill_id) AS sub_skills_count
             FROM topic_areas t
             LEFT JOIN skills s ON t.topic_id = s.topic_id
             LEFT JOIN sub_skills ss ON s.skill_id = ss.skill_id
             GROUP BY t.topic_id, t.topic_area, t.percentage_weight, s.skill_id, s.skill
             ORDER BY t.topic_id, s.skill_id
             LIMIT 20",
            &[],
        ),
        Report::Search => search(conn, p.keywords),
        Report::Summary => query(
            conn,
            "SELECT 'Total Topics' AS metric, COUNT(DISTINCT topic_id) AS count FROM topic_areas
             UNION ALL
             SELECT 'Total Skills', COUNT(DISTINCT skill_id) FROM skills
             UNION ALL
             SELECT 'Total Sub-Skills', COUNT(DISTINCT sub_skill_id) FROM sub_skills
             UNION ALL
             SELECT 'Sub-Skills with References', COUNT(DISTINCT sub_skill_id)
             FROM sub_skills WHERE reference_links != ''",
            &[],
        ),
    }
}

/// Case-insensitive substring match on sub-skill text, any keyword.
fn search(conn: &Connection, keywords: &[String]) -> Result<QueryResult> {
    let conditions: Vec<String> = (1..=keywords.len())
        .map(|i| format!("LOWER(ss.sub_skill) LIKE ?{}", i))
        .collect();
    let where_clause = if conditions.is_empty() {
        String::new()
    } else {
        format!(" WHERE {}", conditions.join(" OR "))
    };
    let sql = format!(
        "SELECT t.topic_area, s.skill, ss.sub_skill
         FROM sub_skills ss
         JOIN skills s ON ss.skill_id = s.skill_id
         JOIN topic_areas t ON ss.topic_id = t.topic_id{}
         ORDER BY ss.sub_skill_id",
        where_clause
    );
    let params: Vec<Value> = keywords
        .iter()
        .map(|k| Value::Text(format!("%{}%", k.to_lowercase())))
        .collect();
    query(conn, &sql, &params)
}

fn query(conn: &Connection, sql: &str, params: &[Value]) -> Result<QueryResult> {
    let mut stmt = conn.prepare(sql)?;
    let columns: Vec<String> = stmt.column_names().iter().map(|c| c.to_string()).collect();
    let width = columns.len();
    let rows = stmt
        .query_map(rusqlite::params_from_iter(params.iter()), |row| {
            (0..width)
                .map(|i| row.get::<_, Value>(i).map(display_value))
                .collect::<Result<Vec<_>, _>>()
        })?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(QueryResult { columns, rows })
}

fn display_value(v: Value) -> String {
    match v {
        Value::Null => "NULL".to_string(),
        Value::Integer(i) => i.to_string(),
        Value::Real(f) => f.to_string(),
        Value::Text(s) => s,
        Value::Blob(b) => format!("<{} bytes>", b.len()),
    }
}

// ── Stats ──

pub struct TableCounts {
    pub topics: usize,
    pub skills: usize,
    pub sub_skills: usize,
    pub changes: usize,
}

pub fn get_counts(conn: &Connection) -> Result<TableCounts> {
    let count = |table: &str| -> Result<usize> {
        Ok(conn.query_row(&format!("SELECT COUNT(*) FROM {}", table), [], |r| r.get(0))?)
    };
    Ok(TableCounts {
        topics: count("topic_areas")?,
        skills: count("skills")?,
        sub_skills: count("sub_skills")?,
        changes: count("change_log")?,
    })
}
