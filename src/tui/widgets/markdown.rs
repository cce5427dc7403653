//! Markdown → ratatui Lines renderer.
//!
//! Summaries and podcast transcripts arrive as markdown; this converts them
//! to `Vec<Line<'static>>` for display in scrollable paragraphs. Code blocks
//! render on a contrasting background without syntax highlighting.

use pulldown_cmark::{CodeBlockKind, Event, Parser, Tag, TagEnd};
use ratatui::{
    style::{Color, Modifier, Style},
    text::{Line, Span},
};

use crate::tui::theme;

const CODE_BG: Color = Color::Rgb(0x22, 0x26, 0x33);

/// Convert markdown text to ratatui Lines.
pub fn markdown_to_lines(md: &str) -> Vec<Line<'static>> {
    let parser = Parser::new(md);
    let mut lines: Vec<Line<'static>> = Vec::new();

    let mut current_spans: Vec<Span<'static>> = Vec::new();
    // Style stack for nested formatting
    let mut style_stack: Vec<Style> = vec![Style::default()];

    let mut in_code_block = false;
    let mut code_buffer = String::new();
    let mut list_depth: usize = 0;
    let mut in_heading = false;

    for event in parser {
        match event {
            Event::Start(Tag::Heading { level, .. }) => {
                flush_line(&mut current_spans, &mut lines);
                let style = match level {
                    pulldown_cmark::HeadingLevel::H1 => Style::default()
                        .fg(theme::ACCENT)
                        .add_modifier(Modifier::BOLD),
                    pulldown_cmark::HeadingLevel::H2 => Style::default()
                        .fg(theme::PRIMARY_LIGHT)
                        .add_modifier(Modifier::BOLD),
                    pulldown_cmark::HeadingLevel::H3 => Style::default().fg(theme::SUCCESS),
                    _ => Style::default().fg(theme::TEXT).add_modifier(Modifier::BOLD),
                };
                style_stack.push(style);
                in_heading = true;
            }
            Event::End(TagEnd::Heading(_)) => {
                style_stack.pop();
                flush_line(&mut current_spans, &mut lines);
                in_heading = false;
            }

            Event::Start(Tag::Strong) => {
                let base = current_style(&style_stack);
                style_stack.push(base.add_modifier(Modifier::BOLD));
            }
            Event::End(TagEnd::Strong) => {
                style_stack.pop();
            }
            Event::Start(Tag::Emphasis) => {
                let base = current_style(&style_stack);
                style_stack.push(base.add_modifier(Modifier::ITALIC));
            }
            Event::End(TagEnd::Emphasis) => {
                style_stack.pop();
            }

            Event::Code(code) => {
                current_spans.push(Span::styled(
                    format!(" {} ", code),
                    Style::default().fg(theme::TEXT).bg(theme::BG_SURFACE),
                ));
            }

            Event::Start(Tag::CodeBlock(CodeBlockKind::Fenced(_)))
            | Event::Start(Tag::CodeBlock(CodeBlockKind::Indented)) => {
                flush_line(&mut current_spans, &mut lines);
                in_code_block = true;
                code_buffer.clear();
            }
            Event::End(TagEnd::CodeBlock) => {
                for code_line in code_buffer.lines() {
                    lines.push(Line::from(Span::styled(
                        code_line.to_string(),
                        Style::default().fg(theme::TEXT).bg(CODE_BG),
                    )));
                }
                in_code_block = false;
            }

            Event::Start(Tag::List(_)) => {
                list_depth += 1;
            }
            Event::End(TagEnd::List(_)) => {
                list_depth = list_depth.saturating_sub(1);
                if list_depth == 0 {
                    lines.push(Line::raw(""));
                }
            }
            Event::Start(Tag::Item) => {
                flush_line(&mut current_spans, &mut lines);
                let indent = "  ".repeat(list_depth.saturating_sub(1));
                current_spans.push(Span::styled(
                    format!("{indent}• "),
                    Style::default().fg(theme::PRIMARY_LIGHT),
                ));
            }
            Event::End(TagEnd::Item) => {
                flush_line(&mut current_spans, &mut lines);
            }

            Event::Start(Tag::Link { .. }) => {
                style_stack.push(
                    Style::default()
                        .fg(theme::INFO)
                        .add_modifier(Modifier::UNDERLINED),
                );
            }
            Event::End(TagEnd::Link) => {
                style_stack.pop();
            }

            Event::Start(Tag::Paragraph) => {}
            Event::End(TagEnd::Paragraph) => {
                flush_line(&mut current_spans, &mut lines);
                if !in_heading {
                    lines.push(Line::raw(""));
                }
            }

            Event::Text(text) => {
                if in_code_block {
                    code_buffer.push_str(&text);
                } else {
                    let style = current_style(&style_stack);
                    current_spans.push(Span::styled(text.to_string(), style));
                }
            }

            Event::SoftBreak => {
                if !in_code_block {
                    current_spans.push(Span::raw(" "));
                }
            }
            Event::HardBreak => {
                flush_line(&mut current_spans, &mut lines);
            }

            Event::Rule => {
                flush_line(&mut current_spans, &mut lines);
                lines.push(Line::styled(
                    "─".repeat(40),
                    Style::default().fg(theme::TEXT_DIM),
                ));
                lines.push(Line::raw(""));
            }

            Event::Start(Tag::BlockQuote) => {
                flush_line(&mut current_spans, &mut lines);
                let base = current_style(&style_stack);
                style_stack.push(base.fg(theme::TEXT_MUTED).add_modifier(Modifier::ITALIC));
                current_spans.push(Span::styled("│ ", Style::default().fg(theme::TEXT_DIM)));
            }
            Event::End(TagEnd::BlockQuote) => {
                flush_line(&mut current_spans, &mut lines);
                style_stack.pop();
            }

            _ => {}
        }
    }

    flush_line(&mut current_spans, &mut lines);

    // Trim trailing empty lines
    while lines
        .last()
        .is_some_and(|l| l.spans.is_empty() || l.to_string().is_empty())
    {
        lines.pop();
    }

    lines
}

fn current_style(stack: &[Style]) -> Style {
    stack.last().copied().unwrap_or_default()
}

fn flush_line(spans: &mut Vec<Span<'static>>, lines: &mut Vec<Line<'static>>) {
    if !spans.is_empty() {
        lines.push(Line::from(std::mem::take(spans)));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn text_of(lines: &[Line]) -> String {
        lines
            .iter()
            .map(|l| l.to_string())
            .collect::<Vec<_>>()
            .join("\n")
    }

    #[test]
    fn test_plain_text() {
        let lines = markdown_to_lines("Hello world");
        assert_eq!(lines.len(), 1);
        assert!(lines[0].to_string().contains("Hello world"));
    }

    #[test]
    fn test_bold_text() {
        let lines = markdown_to_lines("**bold text**");
        assert!(lines[0]
            .spans
            .iter()
            .any(|s| s.style.add_modifier.contains(Modifier::BOLD)));
    }

    #[test]
    fn test_headings() {
        let lines = markdown_to_lines("# Title\n## Section");
        assert!(lines[0]
            .spans
            .iter()
            .any(|s| s.style.fg == Some(theme::ACCENT)));
        assert!(lines[1]
            .spans
            .iter()
            .any(|s| s.style.fg == Some(theme::PRIMARY_LIGHT)));
    }

    #[test]
    fn test_code_block_background() {
        let lines = markdown_to_lines("```\nlet x = 1;\n```");
        assert!(lines
            .iter()
            .any(|l| l.spans.iter().any(|s| s.style.bg == Some(CODE_BG))));
    }

    #[test]
    fn test_list_bullets() {
        let lines = markdown_to_lines("- one\n- two");
        assert!(text_of(&lines).contains('•'));
    }

    #[test]
    fn test_empty_input() {
        assert!(markdown_to_lines("").is_empty());
    }
}
