use std::hash::{DefaultHasher, Hash, Hasher};
use std::sync::OnceLock;

use pulldown_cmark::{CodeBlockKind, Event, Options, Parser, Tag, TagEnd, html::push_html};
use syntect::highlighting::{Theme, ThemeSet};
use syntect::html::highlighted_html_for_string;
use syntect::parsing::SyntaxSet;

use crate::stabilize::stabilize;

/// Shared syntect highlighting assets (loaded once).
struct SyntectAssets {
    syntax_set: SyntaxSet,
    theme: Theme,
}

fn syntect_assets() -> &'static SyntectAssets {
    static ASSETS: OnceLock<SyntectAssets> = OnceLock::new();
    ASSETS.get_or_init(|| {
        let syntax_set = SyntaxSet::load_defaults_newlines();
        let theme_set = ThemeSet::load_defaults();
        let theme = theme_set
            .themes
            .get("InspiredGitHub")
            .cloned()
            .unwrap_or_else(|| {
                theme_set
                    .themes
                    .values()
                    .next()
                    .cloned()
                    .expect("syntect ships with at least one theme")
            });
        SyntectAssets { syntax_set, theme }
    })
}

/// Identifier for a fenced block's copy affordance, derived from the code
/// content and language so identical blocks in one message share copy-state
/// keys deterministically.
pub fn block_id(lang: &str, code: &str) -> u64 {
    let mut hasher = DefaultHasher::new();
    lang.hash(&mut hasher);
    code.hash(&mut hasher);
    hasher.finish()
}

/// Markdown to HTML, with syntax-highlighted fenced code and per-block copy
/// affordances.
#[derive(Debug, Default, Clone, Copy)]
pub struct MarkdownRenderer;

impl MarkdownRenderer {
    pub fn new() -> Self {
        Self
    }

    /// Render completed content as-is.
    pub fn render(&self, markdown: &str) -> String {
        let options = Options::ENABLE_TABLES | Options::ENABLE_STRIKETHROUGH;
        let parser = Parser::new_ext(markdown, options);

        let mut events = Vec::new();
        let mut code = String::new();
        let mut code_lang: Option<String> = None;

        for event in parser {
            match event {
                Event::Start(Tag::CodeBlock(kind)) => {
                    code.clear();
                    code_lang = Some(fence_language(&kind));
                }
                Event::End(TagEnd::CodeBlock) => {
                    let lang = code_lang.take().unwrap_or_default();
                    events.push(Event::Html(self.code_block_html(&lang, &code).into()));
                }
                Event::Text(text) if code_lang.is_some() => code.push_str(&text),
                other => events.push(other),
            }
        }

        let mut output = String::new();
        push_html(&mut output, events.into_iter());
        output
    }

    /// Render an in-progress buffer: stabilize the truncated markdown first
    /// so no dangling syntax reaches the screen.
    pub fn render_streaming(&self, buffer: &str) -> String {
        self.render(&stabilize(buffer))
    }

    fn code_block_html(&self, lang: &str, code: &str) -> String {
        let id = block_id(lang, code);
        let body = self.highlight(lang, code);
        format!(
            "<div class=\"code-block\" data-lang=\"{lang}\" data-copy-id=\"{id:016x}\">\
             <button type=\"button\" class=\"copy-button\" data-copy-target=\"{id:016x}\">Copy</button>\
             {body}</div>",
            lang = escape_attr(lang),
        )
    }

    fn highlight(&self, lang: &str, code: &str) -> String {
        let assets = syntect_assets();
        if !lang.is_empty() {
            if let Some(syntax) = assets.syntax_set.find_syntax_by_token(lang) {
                if let Ok(html) =
                    highlighted_html_for_string(code, &assets.syntax_set, syntax, &assets.theme)
                {
                    return html;
                }
            }
        }
        format!("<pre><code>{}</code></pre>", escape_html(code))
    }
}

/// First word of the fence info string; indented blocks have no language.
fn fence_language(kind: &CodeBlockKind<'_>) -> String {
    match kind {
        CodeBlockKind::Fenced(info) => info
            .split_whitespace()
            .next()
            .unwrap_or_default()
            .to_string(),
        CodeBlockKind::Indented => String::new(),
    }
}

fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            _ => out.push(c),
        }
    }
    out
}

fn escape_attr(text: &str) -> String {
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
