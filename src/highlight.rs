//! HTML syntax coloring for rendered dumps.

const COLOR_DEFAULT: &str = "#0000BB";
const COLOR_KEYWORD: &str = "#007700";
const COLOR_COMMENT: &str = "#FF8000";
const COLOR_TEXT: &str = "#000000";

/// Stand-ins for comment openers, so dumped text containing them is not
/// colored as a comment.
const COMMENT_TOKENS: [(&str, &str); 2] = [("/*", "|***|***|"), ("//", "|**|**|")];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Class {
    Plain,
    Word,
    Keyword,
    Number,
    Operator,
    Comment,
}

impl Class {
    fn color(self) -> &'static str {
        match self {
            Class::Plain => COLOR_TEXT,
            Class::Word | Class::Number => COLOR_DEFAULT,
            Class::Keyword | Class::Operator => COLOR_KEYWORD,
            Class::Comment => COLOR_COMMENT,
        }
    }
}

/// Colors a dump, leaving literal `/*` and `//` in the dumped data alone.
pub fn highlight_dump(text: &str) -> String {
    let mut protected = text.to_string();
    for (marker, token) in COMMENT_TOKENS {
        protected = protected.replace(marker, token);
    }
    let mut html = colorize(&protected);
    for (marker, token) in COMMENT_TOKENS {
        html = html.replace(token, marker);
    }
    html
}

/// Colors arbitrary text as HTML. Comments (`//` to end of line, `/* */`)
/// are recognized.
pub fn colorize(src: &str) -> String {
    let runs = lex(src);
    let mut out = String::with_capacity(src.len().saturating_mul(2));
    out.push_str(&format!("<code><span style=\"color: {COLOR_TEXT}\">"));
    for (class, text) in runs {
        out.push_str(&format!(
            "<span style=\"color: {}\">{}</span>",
            class.color(),
            escape_html(&text)
        ));
    }
    out.push_str("</span></code>");
    out
}

fn lex(src: &str) -> Vec<(Class, String)> {
    let chars: Vec<char> = src.chars().collect();
    let mut runs: Vec<(Class, String)> = Vec::new();
    let mut i = 0;
    while i < chars.len() {
        let c = chars[i];
        let next = chars.get(i + 1).copied();
        let (class, end) = if c == '/' && next == Some('/') {
            let end = chars[i..]
                .iter()
                .position(|&c| c == '\n')
                .map_or(chars.len(), |p| i + p);
            (Class::Comment, end)
        } else if c == '/' && next == Some('*') {
            let mut end = chars.len();
            let mut j = i + 2;
            while j + 1 < chars.len() {
                if chars[j] == '*' && chars[j + 1] == '/' {
                    end = j + 2;
                    break;
                }
                j += 1;
            }
            (Class::Comment, end)
        } else if c.is_ascii_digit() || (c == '-' && next.is_some_and(|n| n.is_ascii_digit())) {
            let mut j = i + 1;
            while j < chars.len() && (chars[j].is_ascii_digit() || chars[j] == '.') {
                j += 1;
            }
            (Class::Number, j)
        } else if c.is_alphabetic() || c == '_' {
            let mut j = i + 1;
            while j < chars.len() && (chars[j].is_alphanumeric() || chars[j] == '_') {
                j += 1;
            }
            let word: String = chars[i..j].iter().collect();
            let class = if matches!(word.as_str(), "true" | "false" | "null") {
                Class::Keyword
            } else {
                Class::Word
            };
            (class, j)
        } else if c == '=' && next == Some('>') {
            (Class::Operator, i + 2)
        } else if matches!(c, '[' | ']' | '(' | ')' | '#' | '.' | '{' | '}') {
            (Class::Operator, i + 1)
        } else {
            (Class::Plain, i + 1)
        };

        let text: String = chars[i..end].iter().collect();
        match runs.last_mut() {
            Some((last, buf)) if *last == class && class != Class::Comment => buf.push_str(&text),
            _ => runs.push((class, text)),
        }
        i = end;
    }
    runs
}

fn escape_html(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            ' ' => out.push_str("&nbsp;"),
            '\n' => out.push_str("<br />"),
            other => out.push(other),
        }
    }
    out
}
