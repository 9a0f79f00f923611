//! Markdown-subset rendering of assistant replies.
//!
//! `parse` turns raw text into structured fragments; `render` serializes
//! those fragments into safe markup. The pipeline is ordered so that later
//! rules never re-interpret the output of earlier ones: fenced code
//! blocks, inline code, bold, single emphasis, line breaks. Every literal
//! span is HTML-entity-escaped at serialization time, before any wrapper
//! tag is applied; only the wrapper tags themselves are emitted unescaped.

/// A structured piece of rendered content.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Fragment {
    /// Fenced code block; body is verbatim, never re-processed.
    CodeBlock { language: String, code: String },
    /// Inline run of styled text.
    Span(InlineSpan),
    LineBreak,
}

/// Inline text with its resolved styling. Inline code is exclusive of
/// emphasis; bold and italic may combine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InlineSpan {
    pub text: String,
    pub code: bool,
    pub bold: bool,
    pub italic: bool,
}

/// Render raw assistant text into safe markup. Pure and deterministic;
/// input is always raw text, never markup.
pub fn render(raw: &str) -> String {
    to_markup(&parse(raw))
}

/// Parse raw text into structured fragments.
pub fn parse(raw: &str) -> Vec<Fragment> {
    let mut fragments = Vec::new();
    let mut rest = raw;

    while let Some(open) = rest.find("```") {
        match parse_fence(&rest[open + 3..]) {
            Some(fence) => {
                parse_inline(&rest[..open], &mut fragments);
                fragments.push(Fragment::CodeBlock {
                    language: fence.language.to_string(),
                    code: fence.body.trim().to_string(),
                });
                rest = fence.remainder;
            }
            None => {
                // Unterminated or malformed fence: the marker is literal.
                parse_inline(&rest[..open + 3], &mut fragments);
                rest = &rest[open + 3..];
            }
        }
    }

    parse_inline(rest, &mut fragments);
    fragments
}

/// HTML-entity-escape a literal span.
pub fn escape_html(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            _ => escaped.push(c),
        }
    }
    escaped
}

struct Fence<'a> {
    language: &'a str,
    body: &'a str,
    remainder: &'a str,
}

/// Parse a fenced block starting just after the opening backticks: an
/// optional word-character language tag, a newline, then the body up to
/// the closing fence.
fn parse_fence(after_open: &str) -> Option<Fence<'_>> {
    let newline = after_open.find('\n')?;
    let tag = &after_open[..newline];
    if !tag.chars().all(|c| c.is_ascii_alphanumeric() || c == '_') {
        return None;
    }

    let body_start = newline + 1;
    let close = after_open[body_start..].find("```")?;
    Some(Fence {
        language: if tag.is_empty() { "text" } else { tag },
        body: &after_open[body_start..body_start + close],
        remainder: &after_open[body_start + close + 3..],
    })
}

/// Inline code spans, then emphasis, over a segment with no fences.
fn parse_inline(segment: &str, out: &mut Vec<Fragment>) {
    let mut rest = segment;

    while let Some(open) = rest.find('`') {
        let after = &rest[open + 1..];
        // A span needs a closing backtick and a non-empty body.
        match after.find('`') {
            Some(close) if close > 0 => {
                parse_emphasis(&rest[..open], out);
                out.push(Fragment::Span(InlineSpan {
                    text: after[..close].to_string(),
                    code: true,
                    bold: false,
                    italic: false,
                }));
                rest = &after[close + 1..];
            }
            _ => {
                parse_emphasis(&rest[..open + 1], out);
                rest = after;
            }
        }
    }

    parse_emphasis(rest, out);
}

/// Bold before single emphasis, so `**` pairs are never half-eaten by
/// the single-marker rule.
fn parse_emphasis(segment: &str, out: &mut Vec<Fragment>) {
    let mut rest = segment;

    while let Some(open) = rest.find("**") {
        match rest[open + 2..].find("**") {
            Some(close) => {
                parse_italic(&rest[..open], false, out);
                parse_italic(&rest[open + 2..open + 2 + close], true, out);
                rest = &rest[open + 2 + close + 2..];
            }
            None => {
                parse_italic(&rest[..open + 2], false, out);
                rest = &rest[open + 2..];
            }
        }
    }

    parse_italic(rest, false, out);
}

/// Single emphasis, matched only when the markers are not adjacent to
/// another `*` (bold remnants stay literal).
fn parse_italic(segment: &str, bold: bool, out: &mut Vec<Fragment>) {
    let bytes = segment.as_bytes();
    let mut cursor = 0;

    while let Some(found) = segment[cursor..].find('*') {
        let open = cursor + found;
        let matched = (|| {
            if open > 0 && bytes[open - 1] == b'*' {
                return None;
            }
            let close = open + 1 + segment[open + 1..].find('*')?;
            if close == open + 1 {
                return None;
            }
            if close + 1 < bytes.len() && bytes[close + 1] == b'*' {
                return None;
            }
            Some(close)
        })();

        match matched {
            Some(close) => {
                push_text(&segment[cursor..open], bold, false, out);
                push_text(&segment[open + 1..close], bold, true, out);
                cursor = close + 1;
            }
            None => {
                push_text(&segment[cursor..open + 1], bold, false, out);
                cursor = open + 1;
            }
        }
    }

    push_text(&segment[cursor..], bold, false, out);
}

/// Split literal text on newlines into spans and breaks.
fn push_text(text: &str, bold: bool, italic: bool, out: &mut Vec<Fragment>) {
    for (i, piece) in text.split('\n').enumerate() {
        if i > 0 {
            out.push(Fragment::LineBreak);
        }
        if !piece.is_empty() {
            out.push(Fragment::Span(InlineSpan {
                text: piece.to_string(),
                code: false,
                bold,
                italic,
            }));
        }
    }
}

/// Serialize fragments into safe markup. Consecutive spans sharing a
/// style share one wrapper.
fn to_markup(fragments: &[Fragment]) -> String {
    let mut out = String::new();
    let mut i = 0;

    while i < fragments.len() {
        match &fragments[i] {
            Fragment::CodeBlock { language, code } => {
                out.push_str(&format!(
                    "<div class=\"code-block\">\
                     <div class=\"code-header\">\
                     <span class=\"code-language\">{}</span>\
                     <button class=\"copy-code\">Copy</button>\
                     </div>\
                     <pre class=\"code-content\">{}</pre>\
                     </div>",
                    language,
                    escape_html(code)
                ));
                i += 1;
            }
            Fragment::LineBreak => {
                out.push_str("<br>");
                i += 1;
            }
            Fragment::Span(span) if span.code => {
                out.push_str("<code>");
                out.push_str(&escape_html(&span.text));
                out.push_str("</code>");
                i += 1;
            }
            Fragment::Span(_) => {
                // Maximal run of plain/emphasis spans.
                let mut run = Vec::new();
                while let Some(Fragment::Span(span)) = fragments.get(i) {
                    if span.code {
                        break;
                    }
                    run.push(span);
                    i += 1;
                }
                emphasis_run(&run, &mut out);
            }
        }
    }

    out
}

fn emphasis_run(spans: &[&InlineSpan], out: &mut String) {
    let mut i = 0;
    while i < spans.len() {
        let bold = spans[i].bold;
        let start = i;
        while i < spans.len() && spans[i].bold == bold {
            i += 1;
        }
        if bold {
            out.push_str("<strong>");
        }
        italic_run(&spans[start..i], out);
        if bold {
            out.push_str("</strong>");
        }
    }
}

fn italic_run(spans: &[&InlineSpan], out: &mut String) {
    let mut i = 0;
    while i < spans.len() {
        let italic = spans[i].italic;
        let start = i;
        while i < spans.len() && spans[i].italic == italic {
            i += 1;
        }
        if italic {
            out.push_str("<em>");
        }
        for span in &spans[start..i] {
            out.push_str(&escape_html(&span.text));
        }
        if italic {
            out.push_str("</em>");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn escapes_angle_brackets_and_quotes() {
        assert_eq!(
            render("<script>alert(\"xss\")</script>"),
            "&lt;script&gt;alert(&quot;xss&quot;)&lt;/script&gt;"
        );
    }

    #[test]
    fn escapes_inside_code_block_verbatim() {
        let markup = render("```html\n<b>&</b>\n```");
        assert!(markup.contains("<pre class=\"code-content\">&lt;b&gt;&amp;&lt;/b&gt;</pre>"));
        assert!(markup.contains("<span class=\"code-language\">html</span>"));
        assert!(markup.contains("copy-code"));
    }

    #[test]
    fn code_block_language_defaults_to_text() {
        let markup = render("```\nlet x = 1;\n```");
        assert!(markup.contains("<span class=\"code-language\">text</span>"));
    }

    #[test]
    fn code_block_body_is_not_reinterpreted() {
        let markup = render("```\n**not bold** `not code`\n```");
        assert!(markup.contains("**not bold** `not code`"));
        assert!(!markup.contains("<strong>"));
    }

    #[test]
    fn unterminated_fence_stays_literal() {
        let markup = render("```rust\nfn main() {}");
        assert!(markup.contains("```rust"));
        assert!(!markup.contains("code-block"));
    }

    #[test]
    fn inline_code_is_escaped_and_wrapped() {
        assert_eq!(render("use `<T>` here"), "use <code>&lt;T&gt;</code> here");
    }

    #[test]
    fn bold_is_processed_before_single_emphasis() {
        assert_eq!(render("**bold**"), "<strong>bold</strong>");
        assert_eq!(render("a **b** c"), "a <strong>b</strong> c");
    }

    #[test]
    fn single_emphasis_wraps_plain_pairs() {
        assert_eq!(render("an *em* word"), "an <em>em</em> word");
    }

    #[test]
    fn emphasis_inside_bold_body() {
        assert_eq!(render("**a *b* c**"), "<strong>a <em>b</em> c</strong>");
    }

    #[test]
    fn lone_asterisks_stay_literal() {
        assert_eq!(render("2 * 3 * 4 = 24"), "2 <em> 3 </em> 4 = 24");
        assert_eq!(render("a * b"), "a * b");
    }

    #[test]
    fn newlines_become_line_breaks() {
        assert_eq!(render("one\ntwo"), "one<br>two");
    }

    #[test]
    fn empty_input_renders_empty() {
        assert_eq!(render(""), "");
        assert!(parse("").is_empty());
    }

    #[test]
    fn parse_produces_structured_fragments() {
        let fragments = parse("hi **there**\n```rust\nfn x() {}\n```");
        assert_eq!(
            fragments,
            vec![
                Fragment::Span(InlineSpan {
                    text: "hi ".to_string(),
                    code: false,
                    bold: false,
                    italic: false,
                }),
                Fragment::Span(InlineSpan {
                    text: "there".to_string(),
                    code: false,
                    bold: true,
                    italic: false,
                }),
                Fragment::LineBreak,
                Fragment::CodeBlock {
                    language: "rust".to_string(),
                    code: "fn x() {}".to_string(),
                },
            ]
        );
    }

    #[test]
    fn user_content_never_leaks_raw_angle_brackets() {
        let hostile = "*<i>* **<b>** `<c>` ```\n<d>\n``` <e>";
        let markup = render(hostile);
        let mut stripped = markup.clone();
        for tag in [
            "<div class=\"code-block\">",
            "<div class=\"code-header\">",
            "<span class=\"code-language\">",
            "<button class=\"copy-code\">",
            "</button>",
            "</span>",
            "</div>",
            "<pre class=\"code-content\">",
            "</pre>",
            "<code>",
            "</code>",
            "<strong>",
            "</strong>",
            "<em>",
            "</em>",
            "<br>",
        ] {
            stripped = stripped.replace(tag, "");
        }
        assert!(
            !stripped.contains('<') && !stripped.contains('>'),
            "unsanctioned tag in: {markup}"
        );
    }
}
