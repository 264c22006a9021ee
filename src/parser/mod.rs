pub mod events;
pub mod html;
pub mod text;

use tracing::warn;

use crate::loader::Loaded;
use crate::outline::OutlineDocument;
use events::EventSource;

/// Caller-supplied facts that the document itself may not carry.
pub struct ExtractOptions<'a> {
    pub exam_code: &'a str,
    pub source_file: &'a str,
    pub extraction_date: &'a str,
    pub title: Option<String>,
}

/// Two-step pipeline: document → events → raw outline (no ids).
pub fn extract(loaded: &Loaded, opts: &ExtractOptions) -> OutlineDocument {
    let source: Box<dyn EventSource> = match loaded {
        Loaded::Html(markup) => {
            if opts.title.is_some() {
                warn!("--title is ignored for HTML input; the page's own title is used");
            }
            Box::new(html::HtmlOutline::parse(markup))
        }
        Loaded::Text(text) => Box::new(text::TextOutline::new(text.as_str()).with_title(opts.title.clone())),
    };

    let mut doc = OutlineDocument::new(opts.exam_code, opts.source_file, opts.extraction_date);
    events::reduce(source.events(), &mut doc);
    doc
}

#[cfg(test)]
mod tests {
    use super::*;

    fn opts() -> ExtractOptions<'static> {
        ExtractOptions {
            exam_code: "AI-102",
            source_file: "guide",
            extraction_date: "2024-05-01T10:00:00",
            title: None,
        }
    }

    #[test]
    fn html_and_text_share_output_contract() {
        let html = extract(
            &Loaded::Html("<main><h2>A (1-5%)</h2><h3>Skill</h3><ul><li>item</li></ul></main>".into()),
            &opts(),
        );
        let text = extract(&Loaded::Text("A (1-5%)\nSkill\n• item".into()), &opts());
        assert_eq!(html.topic_areas, text.topic_areas);
        assert_eq!(html.metadata.extraction_date, "2024-05-01T10:00:00");
    }

    #[test]
    fn n_topics_in_order() {
        let text: String = (1..=7).map(|i| format!("Topic {} ({}-{}%)\n", i, i, i + 5)).collect();
        let doc = extract(&Loaded::Text(text), &opts());
        assert_eq!(doc.topic_areas.len(), 7);
        for (i, t) in doc.topic_areas.iter().enumerate() {
            assert_eq!(t.topic_area, format!("Topic {}", i + 1));
        }
    }

    #[test]
    fn repeated_extraction_is_identical() {
        let text = std::fs::read_to_string("tests/fixtures/ai102.txt").unwrap();
        let a = serde_json::to_string(&extract(&Loaded::Text(text.clone()), &opts())).unwrap();
        let b = serde_json::to_string(&extract(&Loaded::Text(text), &opts())).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn html_keeps_its_own_title() {
        let opts = ExtractOptions {
            title: Some("Caller title".into()),
            ..opts()
        };
        let doc = extract(&Loaded::Html("<h1>Exam AI-102</h1><main></main>".into()), &opts);
        assert_eq!(doc.metadata.exam_title, "Exam AI-102");
        let doc = extract(&Loaded::Text("A (1-5%)".into()), &opts);
        assert_eq!(doc.metadata.exam_title, "Caller title");
    }
}
