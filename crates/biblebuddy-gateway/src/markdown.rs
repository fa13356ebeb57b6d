//! Markdown subset used by assistant replies, rendered to HTML.
//!
//! Raw HTML in the input is always escaped; only the markup produced here
//! reaches the page. Supported: `#` headings, `-`/`*`/`+` and numbered
//! lists, fenced code blocks, paragraphs, `**bold**`, `*italic*` and
//! `` `code` ``.

use crate::page::escape;

#[derive(Clone, Copy, PartialEq, Eq)]
enum ListKind {
    Bullet,
    Numbered,
}

impl ListKind {
    fn tag(self) -> &'static str {
        match self {
            ListKind::Bullet => "ul",
            ListKind::Numbered => "ol",
        }
    }
}

/// Renders `text` to an HTML fragment.
pub fn render(text: &str) -> String {
    let mut out = String::with_capacity(text.len() + text.len() / 4);
    let mut paragraph: Vec<&str> = Vec::new();
    let mut list: Option<(ListKind, Vec<&str>)> = None;
    let mut lines = text.lines();

    while let Some(line) = lines.next() {
        let trimmed = line.trim();

        if trimmed.starts_with("```") {
            flush_paragraph(&mut out, &mut paragraph);
            flush_list(&mut out, &mut list);
            let mut code: Vec<&str> = Vec::new();
            for line in lines.by_ref() {
                if line.trim_start().starts_with("```") {
                    break;
                }
                code.push(line);
            }
            out.push_str("<pre><code>");
            out.push_str(&escape(&code.join("\n")));
            out.push_str("</code></pre>");
            continue;
        }

        if trimmed.is_empty() {
            flush_paragraph(&mut out, &mut paragraph);
            flush_list(&mut out, &mut list);
            continue;
        }

        if let Some((level, title)) = heading(trimmed) {
            flush_paragraph(&mut out, &mut paragraph);
            flush_list(&mut out, &mut list);
            out.push_str(&format!("<h{level}>{}</h{level}>", inline(title)));
            continue;
        }

        if let Some((kind, item)) = list_item(trimmed) {
            flush_paragraph(&mut out, &mut paragraph);
            match &mut list {
                Some((current, items)) if *current == kind => items.push(item),
                _ => {
                    flush_list(&mut out, &mut list);
                    list = Some((kind, vec![item]));
                }
            }
            continue;
        }

        flush_list(&mut out, &mut list);
        paragraph.push(trimmed);
    }

    flush_paragraph(&mut out, &mut paragraph);
    flush_list(&mut out, &mut list);
    out
}

fn flush_paragraph(out: &mut String, paragraph: &mut Vec<&str>) {
    if paragraph.is_empty() {
        return;
    }
    let lines: Vec<String> = paragraph.drain(..).map(inline).collect();
    out.push_str("<p>");
    out.push_str(&lines.join("<br>"));
    out.push_str("</p>");
}

fn flush_list(out: &mut String, list: &mut Option<(ListKind, Vec<&str>)>) {
    let Some((kind, items)) = list.take() else {
        return;
    };
    out.push_str(&format!("<{}>", kind.tag()));
    for item in items {
        out.push_str("<li>");
        out.push_str(&inline(item));
        out.push_str("</li>");
    }
    out.push_str(&format!("</{}>", kind.tag()));
}

/// `## Title` → `(2, "Title")`.
fn heading(line: &str) -> Option<(usize, &str)> {
    let level = line.chars().take_while(|c| *c == '#').count();
    if !(1..=6).contains(&level) {
        return None;
    }
    line[level..]
        .strip_prefix(' ')
        .map(|title| (level, title.trim()))
}

fn list_item(line: &str) -> Option<(ListKind, &str)> {
    for marker in ["- ", "* ", "+ "] {
        if let Some(item) = line.strip_prefix(marker) {
            return Some((ListKind::Bullet, item.trim()));
        }
    }
    let digits = line.chars().take_while(char::is_ascii_digit).count();
    if digits == 0 {
        return None;
    }
    line[digits..]
        .strip_prefix(". ")
        .map(|item| (ListKind::Numbered, item.trim()))
}

/// Inline spans. Unclosed markers are kept as literal text.
fn inline(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut rest = text;

    while let Some(ch) = rest.chars().next() {
        if let Some((inner, after)) = span(rest, "`") {
            out.push_str("<code>");
            out.push_str(&escape(inner));
            out.push_str("</code>");
            rest = after;
            continue;
        }
        if let Some((inner, after)) = span(rest, "**") {
            out.push_str("<strong>");
            out.push_str(&inline(inner));
            out.push_str("</strong>");
            rest = after;
            continue;
        }
        if let Some((inner, after)) = span(rest, "*") {
            out.push_str("<em>");
            out.push_str(&inline(inner));
            out.push_str("</em>");
            rest = after;
            continue;
        }
        out.push_str(&escape(&rest[..ch.len_utf8()]));
        rest = &rest[ch.len_utf8()..];
    }
    out
}

/// Splits `` `x` rest`` into `("x", " rest")` for the given delimiter.
fn span<'a>(text: &'a str, delimiter: &str) -> Option<(&'a str, &'a str)> {
    let body = text.strip_prefix(delimiter)?;
    if body.starts_with(' ') || body.starts_with(delimiter) {
        return None;
    }
    let end = body.find(delimiter)?;
    if end == 0 {
        return None;
    }
    Some((&body[..end], &body[end + delimiter.len()..]))
}
