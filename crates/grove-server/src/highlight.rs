//! Server-side syntax highlighting for the file viewer

use std::sync::LazyLock;

use syntect::highlighting::ThemeSet;
use syntect::html::highlighted_html_for_string;
use syntect::parsing::{SyntaxReference, SyntaxSet};
use tracing::debug;

static SYNTAXES: LazyLock<SyntaxSet> = LazyLock::new(SyntaxSet::load_defaults_newlines);
static THEMES: LazyLock<ThemeSet> = LazyLock::new(ThemeSet::load_defaults);

pub const DEFAULT_THEME: &str = "base16-ocean.dark";

/// Files above this size are sent without markup.
const MAX_HIGHLIGHT_BYTES: usize = 512 * 1024;

fn syntax_for<'a>(syntaxes: &'a SyntaxSet, path: &str, content: &str) -> &'a SyntaxReference {
    let file_name = path.rsplit('/').next().unwrap_or(path);
    let extension = file_name.rsplit_once('.').map(|(_, ext)| ext).unwrap_or(file_name);
    syntaxes
        .find_syntax_by_extension(extension)
        .or_else(|| syntaxes.find_syntax_by_first_line(content))
        .unwrap_or_else(|| syntaxes.find_syntax_plain_text())
}

/// Name of the syntax that would be used for `path`.
pub fn syntax_name(path: &str, content: &str) -> String {
    syntax_for(&SYNTAXES, path, content).name.clone()
}

/// Render `content` as standalone highlighted HTML (`<pre>` with inline
/// styles). `None` for oversized input or an unknown theme.
pub fn highlight_html(path: &str, content: &str, theme: &str) -> Option<String> {
    if content.len() > MAX_HIGHLIGHT_BYTES {
        debug!("Skipping highlighting for {} ({} bytes)", path, content.len());
        return None;
    }
    let theme = THEMES.themes.get(theme)?;
    let syntax = syntax_for(&SYNTAXES, path, content);
    match highlighted_html_for_string(content, &SYNTAXES, syntax, theme) {
        Ok(html) => Some(html),
        Err(e) => {
            debug!("Highlighting {} failed: {}", path, e);
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_syntax_detection() {
        assert_eq!(syntax_name("src/main.rs", "fn main() {}"), "Rust");
        assert_eq!(syntax_name("Makefile", "all:\n"), "Makefile");
        assert_eq!(syntax_name("notes.unknownext", "hello"), "Plain Text");
        assert_eq!(syntax_name("bin/run", "#!/bin/bash\necho hi\n"), "Bourne Again Shell (bash)");
    }

    #[test]
    fn test_highlight_html() {
        let html = highlight_html("lib.rs", "pub fn answer() -> u32 { 42 }\n", DEFAULT_THEME).unwrap();
        assert!(html.starts_with("<pre"));
        assert!(html.contains("answer"));

        assert!(highlight_html("lib.rs", "fn x() {}", "no-such-theme").is_none());
        let huge = "a".repeat(MAX_HIGHLIGHT_BYTES + 1);
        assert!(highlight_html("big.txt", &huge, DEFAULT_THEME).is_none());
    }
}
