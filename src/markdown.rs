//! Markdown conversion with heading-id generation.
//!
//! Conversion is a pure function from Markdown text to an HTML fragment plus
//! the headings found along the way. The headings feed the `toc_nav()`
//! template helper; nothing in discovery or staleness looks at them.

use pulldown_cmark::{Event, Options, Parser, Tag, TagEnd, html};

/// A heading encountered during conversion.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Heading {
    /// Heading level (1-6).
    pub level: u8,
    /// The generated (or author-supplied) anchor id.
    pub id: String,
    /// The heading text with inline markup flattened.
    pub text: String,
}

/// Result of converting a Markdown document.
#[derive(Debug, Default)]
pub struct MarkdownOutput {
    pub html: String,
    pub headings: Vec<Heading>,
}

/// Convert Markdown text to an HTML fragment.
///
/// Headings get stable ids derived from their text (deduplicated with a
/// numeric suffix) so they can be linked from a table of contents. Everything
/// else is handed to pulldown-cmark unchanged.
pub fn convert(markdown: &str) -> MarkdownOutput {
    let options =
        Options::ENABLE_TABLES | Options::ENABLE_STRIKETHROUGH | Options::ENABLE_DEFINITION_LIST;

    let parser = Parser::new_ext(markdown, options);

    struct HeadingState {
        level: pulldown_cmark::HeadingLevel,
        id: Option<String>,
    }
    let mut in_heading: Option<HeadingState> = None;
    let mut heading_text = String::new();
    let mut used_ids: std::collections::HashSet<String> = std::collections::HashSet::new();
    let mut headings: Vec<Heading> = Vec::new();

    let events: Vec<Event> = parser
        .flat_map(|event| match event {
            Event::Start(Tag::Heading { level, ref id, .. }) => {
                in_heading = Some(HeadingState {
                    level,
                    id: id.as_ref().map(|i| i.to_string()),
                });
                heading_text.clear();
                vec![]
            }
            Event::End(TagEnd::Heading(_)) if in_heading.is_some() => {
                let state = in_heading.take().unwrap();

                let id = match state.id {
                    Some(id) => id,
                    None => {
                        let base = slugify(&heading_text);
                        let mut id = base.clone();
                        let mut suffix = 1;
                        while used_ids.contains(&id) {
                            id = format!("{base}-{suffix}");
                            suffix += 1;
                        }
                        id
                    }
                };
                used_ids.insert(id.clone());

                headings.push(Heading {
                    level: state.level as u8,
                    id: id.clone(),
                    text: heading_text.clone(),
                });

                vec![Event::Html(
                    format!(
                        "<h{} id=\"{}\">{}</h{}>\n",
                        state.level as usize, id, heading_text, state.level as usize,
                    )
                    .into(),
                )]
            }
            Event::Text(ref text) if in_heading.is_some() => {
                heading_text.push_str(text);
                vec![]
            }
            Event::Code(ref code) if in_heading.is_some() => {
                heading_text.push_str(code);
                vec![]
            }
            _ => vec![event],
        })
        .collect();

    let mut html_output = String::new();
    html::push_html(&mut html_output, events.into_iter());

    MarkdownOutput {
        html: html_output,
        headings,
    }
}

/// Convert a string to a slug suitable for use as an HTML id.
fn slugify(s: &str) -> String {
    let lowered = s.to_lowercase();
    let restricted: String = lowered
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || c.is_whitespace() || *c == '-')
        .collect();

    restricted
        .split(|c: char| c.is_whitespace() || c == '-')
        .filter(|w| !w.is_empty())
        .collect::<Vec<_>>()
        .join("-")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_slugify() {
        assert_eq!(slugify("Hello World"), "hello-world");
        assert_eq!(slugify("What's New?"), "whats-new");
        assert_eq!(slugify("API  Reference"), "api-reference");
        assert_eq!(slugify("a - b"), "a-b");
    }

    #[test]
    fn test_convert_basic() {
        let output = convert("# Hello\n\nWorld\n");

        assert!(output.html.contains("<h1 id=\"hello\">Hello</h1>"));
        assert!(output.html.contains("<p>World</p>"));
        assert_eq!(output.headings.len(), 1);
        assert_eq!(output.headings[0].text, "Hello");
        assert_eq!(output.headings[0].level, 1);
    }

    #[test]
    fn test_convert_duplicate_headings() {
        let output = convert("## Setup\n\n## Setup\n");

        assert_eq!(output.headings[0].id, "setup");
        assert_eq!(output.headings[1].id, "setup-1");
    }

    #[test]
    fn test_convert_code_block_escaped() {
        let output = convert("```rust\nlet x = 1 < 2;\n```\n");

        assert!(output.html.contains("language-rust"));
        assert!(output.html.contains("1 &lt; 2"));
    }

    #[test]
    fn test_convert_table() {
        let output = convert("| a | b |\n|---|---|\n| 1 | 2 |\n");

        assert!(output.html.contains("<table>"));
    }
}
