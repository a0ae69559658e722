//! Minimal markdown rendering for terminal display.
//!
//! [`render`] turns answer text into display [`Node`]s.  It is a pure
//! function: it never sees or mutates chat state, and it is safe to call on
//! an answer that is still growing.
//!
//! Parsing is done by pulldown-cmark; this module only folds its event
//! stream into the handful of block kinds the terminal renderer draws.

use std::ops::Range;

use pulldown_cmark::{CodeBlockKind, Event, HeadingLevel, Options, Parser, Tag, TagEnd};

/// One block of rendered output.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Node {
    /// An ATX or setext heading.
    Heading {
        /// Heading level, 1 through 6.
        level: u8,
        /// Heading text with inline markup resolved.
        text: String,
    },
    /// Prose with soft line breaks folded into single spaces.
    Paragraph(String),
    /// A bulleted or numbered list entry.
    ListItem {
        /// `-` for bullets, `n.` for numbered entries.
        marker: String,
        /// Entry text.
        text: String,
    },
    /// A fenced or indented code block, kept verbatim.
    CodeBlock {
        /// First word of the fence's info string, if any.
        lang: Option<String>,
        /// Code lines joined by newlines.
        body: String,
    },
    /// A `>` quotation.
    Quote(String),
    /// A horizontal rule.
    Rule,
}

/// Renders markdown `text` into display nodes.
///
/// An unterminated fence runs to the end of the text.
pub fn render(text: &str) -> Vec<Node> {
    let mut state = RenderState::new(text);
    for (event, range) in Parser::new_ext(text, options()).into_offset_iter() {
        state.handle_event(event, range);
    }
    state.finish()
}

fn options() -> Options {
    Options::ENABLE_STRIKETHROUGH | Options::ENABLE_TASKLISTS
}

fn heading_level_to_u8(level: HeadingLevel) -> u8 {
    match level {
        HeadingLevel::H1 => 1,
        HeadingLevel::H2 => 2,
        HeadingLevel::H3 => 3,
        HeadingLevel::H4 => 4,
        HeadingLevel::H5 => 5,
        HeadingLevel::H6 => 6,
    }
}

struct RenderState<'a> {
    source: &'a str,
    nodes: Vec<Node>,
    text: String,
    heading: Option<u8>,
    code: Option<(Option<String>, String)>,
    /// Next number for each open list; `None` for bullet lists.
    lists: Vec<Option<u64>>,
    item_marker: Option<String>,
    quote_depth: usize,
    /// Closing delimiter to re-emit for each open emphasis span.
    emphasis: Vec<Option<&'a str>>,
}

impl<'a> RenderState<'a> {
    fn new(source: &'a str) -> Self {
        Self {
            source,
            nodes: Vec::new(),
            text: String::new(),
            heading: None,
            code: None,
            lists: Vec::new(),
            item_marker: None,
            quote_depth: 0,
            emphasis: Vec::new(),
        }
    }

    fn handle_event(&mut self, event: Event<'a>, range: Range<usize>) {
        match event {
            Event::Start(tag) => self.handle_start_tag(tag, range),
            Event::End(tag) => self.handle_end_tag(tag),
            Event::Text(text) | Event::Code(text) => self.push_text(&text),
            Event::InlineMath(text) | Event::DisplayMath(text) => self.push_text(&text),
            Event::Html(html) | Event::InlineHtml(html) => self.push_text(&html),
            Event::SoftBreak | Event::HardBreak => self.push_text(" "),
            Event::Rule => {
                self.flush_block();
                self.nodes.push(Node::Rule);
            }
            Event::TaskListMarker(checked) => {
                self.text.push_str(if checked { "[x] " } else { "[ ] " });
            }
            Event::FootnoteReference(_) => {}
        }
    }

    fn handle_start_tag(&mut self, tag: Tag<'a>, range: Range<usize>) {
        match tag {
            Tag::Paragraph | Tag::HtmlBlock => {}
            Tag::Heading { level, .. } => {
                self.flush_block();
                self.heading = Some(heading_level_to_u8(level));
            }
            Tag::CodeBlock(kind) => {
                self.flush_block();
                let lang = match kind {
                    CodeBlockKind::Fenced(info) => {
                        info.split_whitespace().next().map(str::to_string)
                    }
                    CodeBlockKind::Indented => None,
                };
                self.code = Some((lang, String::new()));
            }
            Tag::List(start) => {
                // Text already gathered belongs to the enclosing item.
                self.flush_block();
                self.lists.push(start);
            }
            Tag::Item => {
                self.flush_block();
                let marker = match self.lists.last_mut() {
                    Some(Some(number)) => {
                        let marker = format!("{number}.");
                        *number += 1;
                        marker
                    }
                    _ => "-".to_string(),
                };
                self.item_marker = Some(marker);
            }
            Tag::BlockQuote(_) => {
                self.flush_block();
                self.quote_depth += 1;
            }
            Tag::Emphasis => self.start_emphasis(range, 1),
            Tag::Strong => self.start_emphasis(range, 2),
            _ => {}
        }
    }

    fn handle_end_tag(&mut self, tag: TagEnd) {
        match tag {
            TagEnd::Paragraph | TagEnd::HtmlBlock => self.flush_block(),
            TagEnd::Heading(_) => {
                if let Some(level) = self.heading.take() {
                    let text = self.take_text();
                    self.nodes.push(Node::Heading { level, text });
                }
            }
            TagEnd::CodeBlock => {
                if let Some((lang, mut body)) = self.code.take() {
                    if body.ends_with('\n') {
                        body.pop();
                    }
                    self.nodes.push(Node::CodeBlock { lang, body });
                }
            }
            TagEnd::List(_) => {
                self.flush_block();
                self.lists.pop();
            }
            TagEnd::Item => {
                self.flush_block();
                self.item_marker = None;
            }
            TagEnd::BlockQuote(_) => {
                self.flush_block();
                self.quote_depth = self.quote_depth.saturating_sub(1);
            }
            TagEnd::Emphasis | TagEnd::Strong => {
                if let Some(Some(close)) = self.emphasis.pop() {
                    self.text.push_str(close);
                }
            }
            _ => {}
        }
    }

    /// Opens an emphasis span of `width` delimiter characters.
    ///
    /// A span wedged between word characters, as in `2*3*4`, is almost
    /// always arithmetic or an identifier, so its delimiters are kept.
    fn start_emphasis(&mut self, range: Range<usize>, width: usize) {
        let before = self.source[..range.start].chars().next_back();
        let after = self.source[range.end..].chars().next();
        let intraword = before.is_some_and(char::is_alphanumeric)
            && after.is_some_and(char::is_alphanumeric);
        let close = if intraword {
            let open = self.source.get(range.start..range.start + width);
            self.text.push_str(open.unwrap_or_default());
            self.source.get(range.end.saturating_sub(width)..range.end)
        } else {
            None
        };
        self.emphasis.push(close);
    }

    fn push_text(&mut self, text: &str) {
        match self.code.as_mut() {
            Some((_, body)) => body.push_str(text),
            None => self.text.push_str(text),
        }
    }

    fn take_text(&mut self) -> String {
        let text = self.text.trim().to_string();
        self.text.clear();
        text
    }

    fn flush_block(&mut self) {
        let text = self.take_text();
        if text.is_empty() {
            return;
        }
        let node = if let Some(marker) = self.item_marker.take() {
            Node::ListItem { marker, text }
        } else if self.quote_depth > 0 {
            Node::Quote(text)
        } else {
            Node::Paragraph(text)
        };
        self.nodes.push(node);
    }

    fn finish(mut self) -> Vec<Node> {
        self.flush_block();
        self.nodes
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn paragraphs_join_lines() {
        let nodes = render("first line\nsecond line\n\nnext paragraph");
        assert_eq!(
            nodes,
            vec![
                Node::Paragraph("first line second line".to_string()),
                Node::Paragraph("next paragraph".to_string()),
            ]
        );
    }

    #[test]
    fn headings_lists_and_quotes() {
        let text = "## Steps\n\n- mix\n- bake\n\n2. serve\n3. rest\n\n> enjoy\n\n---\n\n#hashtag";
        assert_eq!(
            render(text),
            vec![
                Node::Heading {
                    level: 2,
                    text: "Steps".to_string()
                },
                Node::ListItem {
                    marker: "-".to_string(),
                    text: "mix".to_string()
                },
                Node::ListItem {
                    marker: "-".to_string(),
                    text: "bake".to_string()
                },
                Node::ListItem {
                    marker: "2.".to_string(),
                    text: "serve".to_string()
                },
                Node::ListItem {
                    marker: "3.".to_string(),
                    text: "rest".to_string()
                },
                Node::Quote("enjoy".to_string()),
                Node::Rule,
                Node::Paragraph("#hashtag".to_string()),
            ]
        );
    }

    #[test]
    fn nested_list_keeps_parent_text() {
        let nodes = render("- fruit\n  - apple\n- bread");
        assert_eq!(
            nodes,
            vec![
                Node::ListItem {
                    marker: "-".to_string(),
                    text: "fruit".to_string()
                },
                Node::ListItem {
                    marker: "-".to_string(),
                    text: "apple".to_string()
                },
                Node::ListItem {
                    marker: "-".to_string(),
                    text: "bread".to_string()
                },
            ]
        );
    }

    #[test]
    fn code_blocks_are_verbatim() {
        let text = "```rust\nfn main() {\n    println!(\"hi\");\n}\n```\nafter";
        let nodes = render(text);
        assert_eq!(
            nodes,
            vec![
                Node::CodeBlock {
                    lang: Some("rust".to_string()),
                    body: "fn main() {\n    println!(\"hi\");\n}".to_string(),
                },
                Node::Paragraph("after".to_string()),
            ]
        );
    }

    #[test]
    fn unterminated_fence_runs_to_end() {
        let nodes = render("```\nlet x = 1;\n\nlet y = 2;");
        assert_eq!(
            nodes,
            vec![Node::CodeBlock {
                lang: None,
                body: "let x = 1;\n\nlet y = 2;".to_string(),
            }]
        );
    }

    #[test]
    fn empty_text_renders_nothing() {
        assert!(render("").is_empty());
        assert!(render("  \n\n ").is_empty());
    }

    #[test]
    fn inline_markup_is_resolved() {
        assert_eq!(
            render("**bold**, _em_ and `a_b * c`"),
            vec![Node::Paragraph("bold, em and a_b * c".to_string())]
        );
        assert_eq!(
            render("# The **best** plan"),
            vec![Node::Heading {
                level: 1,
                text: "The best plan".to_string()
            }]
        );
    }

    #[test]
    fn identifiers_and_arithmetic_survive() {
        let text = "Call my_snake_case fn and compute 2*3*4.";
        assert_eq!(render(text), vec![Node::Paragraph(text.to_string())]);
        assert_eq!(
            render("x**2**y and 2 * 3"),
            vec![Node::Paragraph("x**2**y and 2 * 3".to_string())]
        );
    }
}
