use std::sync::LazyLock;

use scraper::{ElementRef, Html, Selector};
use tracing::warn;

use super::events::{parse_topic, Event, EventSource};
use crate::outline::DEFAULT_CHANGE_TYPE;

static TITLE_SEL: LazyLock<Selector> = LazyLock::new(|| Selector::parse("h1, title").unwrap());
static TIME_SEL: LazyLock<Selector> = LazyLock::new(|| Selector::parse("time").unwrap());
static MAIN_SEL: LazyLock<Selector> = LazyLock::new(|| Selector::parse("main, article").unwrap());
static MAIN_ID_SEL: LazyLock<Selector> = LazyLock::new(|| Selector::parse("#main-content").unwrap());
static BODY_SEL: LazyLock<Selector> = LazyLock::new(|| Selector::parse("body").unwrap());
static BLOCK_SEL: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("h2, h3, h4, ul, ol, table").unwrap());
static ANCHOR_SEL: LazyLock<Selector> = LazyLock::new(|| Selector::parse("a").unwrap());
static ROW_SEL: LazyLock<Selector> = LazyLock::new(|| Selector::parse("tr").unwrap());
static CELL_SEL: LazyLock<Selector> = LazyLock::new(|| Selector::parse("td, th").unwrap());

/// Study-guide page markup.
pub struct HtmlOutline {
    document: Html,
}

impl HtmlOutline {
    pub fn parse(html: &str) -> Self {
        HtmlOutline {
            document: Html::parse_document(html),
        }
    }

    fn main_content(&self) -> Option<ElementRef<'_>> {
        [&*MAIN_SEL, &*MAIN_ID_SEL, &*BODY_SEL]
            .into_iter()
            .find_map(|sel| self.document.select(sel).next())
    }
}

impl EventSource for HtmlOutline {
    fn events(&self) -> Vec<Event> {
        let mut events = Vec::new();

        if let Some(title) = self.document.select(&TITLE_SEL).next() {
            events.push(Event::Title(text_of(title)));
        }
        if let Some(time) = self.document.select(&TIME_SEL).next() {
            let date = time
                .value()
                .attr("datetime")
                .map(str::to_string)
                .unwrap_or_else(|| text_of(time));
            events.push(Event::UpdateDate(date));
        }

        let Some(main) = self.main_content() else {
            warn!("could not find main content area");
            return events;
        };

        for elem in main.select(&BLOCK_SEL) {
            match elem.value().name() {
                tag @ ("h2" | "h3" | "h4") => {
                    let heading = text_of(elem);
                    if let Some((title, weight)) = parse_topic(&heading) {
                        events.push(Event::Topic { title, weight });
                    } else if tag == "h3" {
                        events.push(Event::Skill(heading));
                    }
                }
                "ul" | "ol" => events.extend(list_items(elem)),
                "table" => events.extend(change_rows(elem)),
                _ => {}
            }
        }

        events
    }
}

/// Direct `li` children only; nested lists are visited on their own.
fn list_items(list: ElementRef<'_>) -> impl Iterator<Item = Event> + '_ {
    list.children()
        .filter_map(ElementRef::wrap)
        .filter(|child| child.value().name() == "li")
        .map(|li| Event::SubSkill {
            text: text_of(li),
            links: li
                .select(&ANCHOR_SEL)
                .map(|a| a.value().attr("href").unwrap_or("").to_string())
                .collect(),
        })
}

/// Header row skipped; description, date, type columns.
fn change_rows(table: ElementRef<'_>) -> Vec<Event> {
    let rows: Vec<ElementRef<'_>> = table.select(&ROW_SEL).collect();
    if rows.len() < 2 {
        return Vec::new();
    }

    rows[1..]
        .iter()
        .filter_map(|row| {
            let cells: Vec<String> = row.select(&CELL_SEL).map(text_of).collect();
            let description = cells.first()?.clone();
            Some(Event::Change {
                description,
                date: cells.get(1).cloned().unwrap_or_default(),
                change_type: cells
                    .get(2)
                    .cloned()
                    .unwrap_or_else(|| DEFAULT_CHANGE_TYPE.to_string()),
            })
        })
        .collect()
}

/// Each text fragment trimmed, then concatenated.
fn text_of(elem: ElementRef<'_>) -> String {
    elem.text().map(str::trim).collect()
}
