use regex::Regex;

/// Renders the board's markup dialect to an HTML fragment.
///
/// Supported markup, applied in this order:
/// - `**bold**` becomes `<strong>bold</strong>`
/// - `*italic*` becomes `<em>italic</em>`
/// - `[label](url)` becomes a link opening in a new tab
/// - newlines become `<br/>`
///
/// The input is not HTML-escaped, so the output must only be rendered for
/// text the viewer is willing to trust.
#[derive(Debug, Clone)]
pub struct TextFormatter {
    bold: Regex,
    italic: Regex,
    link: Regex,
}

impl TextFormatter {
    pub fn new() -> Result<Self, regex::Error> {
        Ok(Self {
            bold: Regex::new(r"\*\*(.*?)\*\*")?,
            italic: Regex::new(r"\*(.*?)\*")?,
            link: Regex::new(r"\[(.*?)\]\((.*?)\)")?,
        })
    }

    pub fn to_html(&self, text: &str) -> String {
        if text.is_empty() {
            return String::new();
        }

        let html = self.bold.replace_all(text, "<strong>${1}</strong>");
        let html = self.italic.replace_all(&html, "<em>${1}</em>");
        let html = self.link.replace_all(
            &html,
            r#"<a href="${2}" target="_blank" rel="noopener noreferrer">${1}</a>"#,
        );
        html.replace('\n', "<br/>")
    }
}
