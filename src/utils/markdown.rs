//! Markdown rendering and text helpers for publishing.
//!
//! The agent drafts articles in Markdown; WordPress wants HTML. The
//! renderer covers the subset the agent actually emits: headings, bold,
//! italics, links, unordered lists, and paragraphs.

const ELLIPSIS: &str = "...";

/// Renders a Markdown document to HTML. Raw HTML in the input is escaped.
pub fn markdown_to_html(markdown: &str) -> String {
    let mut html = String::with_capacity(markdown.len() * 2);
    let mut in_list = false;
    let mut paragraph = String::new();

    let mut flush_paragraph = |html: &mut String, paragraph: &mut String| {
        if !paragraph.is_empty() {
            html.push_str("<p>");
            html.push_str(paragraph);
            html.push_str("</p>\n");
            paragraph.clear();
        }
    };

    for line in markdown.lines() {
        let trimmed = line.trim();

        if trimmed.is_empty() {
            if in_list {
                html.push_str("</ul>\n");
                in_list = false;
            }
            flush_paragraph(&mut html, &mut paragraph);
            continue;
        }

        if let Some(rest) = heading(trimmed) {
            if in_list {
                html.push_str("</ul>\n");
                in_list = false;
            }
            flush_paragraph(&mut html, &mut paragraph);
            let (level, text) = rest;
            html.push_str(&format!(
                "<h{level}>{}</h{level}>\n",
                render_inline(text)
            ));
            continue;
        }

        if let Some(item) = trimmed
            .strip_prefix("- ")
            .or_else(|| trimmed.strip_prefix("* "))
        {
            flush_paragraph(&mut html, &mut paragraph);
            if !in_list {
                html.push_str("<ul>\n");
                in_list = true;
            }
            html.push_str(&format!("<li>{}</li>\n", render_inline(item)));
            continue;
        }

        if in_list {
            html.push_str("</ul>\n");
            in_list = false;
        }
        if !paragraph.is_empty() {
            paragraph.push(' ');
        }
        paragraph.push_str(&render_inline(trimmed));
    }

    if in_list {
        html.push_str("</ul>\n");
    }
    flush_paragraph(&mut html, &mut paragraph);
    html.trim_end().to_string()
}

fn heading(line: &str) -> Option<(usize, &str)> {
    let hashes = line.bytes().take_while(|&b| b == b'#').count();
    if (1..=6).contains(&hashes) {
        line[hashes..]
            .strip_prefix(' ')
            .map(|text| (hashes, text))
    } else {
        None
    }
}

fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            _ => out.push(c),
        }
    }
    out
}

/// Renders bold, italic, and link spans inside a single line.
fn render_inline(text: &str) -> String {
    let mut out = escape_html(text);
    out = replace_links(&out);
    out = replace_delimited(&out, "**", "<strong>", "</strong>");
    out = replace_delimited(&out, "*", "<em>", "</em>");
    out
}

fn replace_delimited(text: &str, delim: &str, open: &str, close: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut rest = text;
    loop {
        let Some(start) = rest.find(delim) else {
            out.push_str(rest);
            return out;
        };
        let after = &rest[start + delim.len()..];
        let Some(end) = after.find(delim) else {
            out.push_str(rest);
            return out;
        };
        out.push_str(&rest[..start]);
        out.push_str(open);
        out.push_str(&after[..end]);
        out.push_str(close);
        rest = &after[end + delim.len()..];
    }
}

fn replace_links(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut rest = text;
    loop {
        let Some(open_bracket) = rest.find('[') else {
            out.push_str(rest);
            return out;
        };
        let candidate = &rest[open_bracket..];
        let link = candidate.find("](").and_then(|close_bracket| {
            let label = &candidate[1..close_bracket];
            let after = &candidate[close_bracket + 2..];
            after
                .find(')')
                .map(|close_paren| (label, &after[..close_paren], close_bracket + 2 + close_paren))
        });
        match link {
            Some((label, url, consumed)) => {
                out.push_str(&rest[..open_bracket]);
                out.push_str(&format!("<a href=\"{url}\">{label}</a>"));
                rest = &candidate[consumed + 1..];
            }
            None => {
                out.push_str(&rest[..=open_bracket]);
                rest = &rest[open_bracket + 1..];
            }
        }
    }
}

/// Lowercase URL slug from a title. Non-alphanumeric runs collapse to a
/// single hyphen.
pub fn slugify(title: &str) -> String {
    let mut slug = String::with_capacity(title.len());
    let mut last_was_hyphen = true;
    for c in title.chars() {
        if c.is_ascii_alphanumeric() {
            slug.push(c.to_ascii_lowercase());
            last_was_hyphen = false;
        } else if !last_was_hyphen {
            slug.push('-');
            last_was_hyphen = true;
        }
    }
    if slug.ends_with('-') {
        slug.pop();
    }
    slug
}

/// Truncates to at most `max_len` characters, cutting at a word boundary
/// and appending an ellipsis. Strings within the limit pass through.
pub fn truncate_at_word(text: &str, max_len: usize) -> String {
    if text.chars().count() <= max_len {
        return text.to_string();
    }
    let budget = max_len.saturating_sub(ELLIPSIS.len());
    let cut: String = text.chars().take(budget).collect();
    let trimmed = match cut.rfind(' ') {
        Some(pos) if pos > 0 => &cut[..pos],
        _ => cut.as_str(),
    };
    format!("{}{ELLIPSIS}", trimmed.trim_end())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn renders_headings_lists_and_paragraphs() {
        let markdown = "# Title\n\nFirst paragraph\nstill first.\n\n- one\n- two\n\nLast.";
        let html = markdown_to_html(markdown);
        assert!(html.contains("<h1>Title</h1>"));
        assert!(html.contains("<p>First paragraph still first.</p>"));
        assert!(html.contains("<ul>\n<li>one</li>\n<li>two</li>\n</ul>"));
        assert!(html.contains("<p>Last.</p>"));
    }

    #[test]
    fn renders_inline_spans() {
        let html = markdown_to_html("This is **bold** and *subtle* with a [link](https://example.com).");
        assert!(html.contains("<strong>bold</strong>"));
        assert!(html.contains("<em>subtle</em>"));
        assert!(html.contains(r#"<a href="https://example.com">link</a>"#));
    }

    #[test]
    fn escapes_raw_html() {
        let html = markdown_to_html("beware of <script>alert(1)</script>");
        assert!(html.contains("&lt;script&gt;"));
        assert!(!html.contains("<script>"));
    }

    #[test]
    fn hash_without_space_is_not_a_heading() {
        let html = markdown_to_html("#hashtag content");
        assert!(html.contains("<p>#hashtag content</p>"));
    }

    #[test]
    fn slugify_collapses_punctuation() {
        assert_eq!(slugify("Five SEO Moves, Fast!"), "five-seo-moves-fast");
        assert_eq!(slugify("  spaced   out  "), "spaced-out");
    }

    #[test]
    fn short_text_is_not_truncated() {
        assert_eq!(truncate_at_word("short", 200), "short");
    }

    #[test]
    fn truncation_cuts_at_word_boundary() {
        let text = "alpha beta gamma delta";
        let truncated = truncate_at_word(text, 15);
        assert!(truncated.chars().count() <= 15);
        assert_eq!(truncated, "alpha beta...");
    }
}
