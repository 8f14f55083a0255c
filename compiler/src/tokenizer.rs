use regex::Regex;
use lazy_static::lazy_static;
use crate::utils::{quote, error};
use crate::error::FieldGenError;

lazy_static! {
    pub static ref TOKEN_REGEX:   Regex = Regex::new(r"([A-Za-z_][A-Za-z0-9_]*|\*|\[[^\[\]]*\]|\{|\s+)").unwrap();
    pub static ref WHITESPACE_RX: Regex = Regex::new(r"^\s+$").unwrap();
    static ref UNION_OPEN:        Regex = Regex::new(r"\bunion\s*\{").unwrap();
}

/// Byte-order marks, both decoded and as latin-1 mojibake.
const ENCODING_MARKERS: [&str; 2] = ["\u{feff}", "\u{ef}\u{bb}\u{bf}"];

/// A cleaned statement of the input, tagged with the physical line it came
/// from and the column where its text starts.
#[derive(Debug, Clone, PartialEq)]
pub struct Line {
    pub text:   String,
    pub line:   usize,
    pub column: usize,
}

#[derive(Debug, PartialEq)]
pub struct Token {
    pub text:   String,
    pub line:   usize,
    pub column: usize,
}

/// Normalizes raw header text into cleaned statements.
///
/// Comments (`/* */`, possibly spanning lines, and `//`), encoding markers,
/// closing braces, statement terminators, anonymous `union {` wrappers and
/// preprocessor lines are removed. A physical line is split after every `{`
/// and at every `;`, so `struct a { int x; };` yields one statement per
/// declaration. Statements that clean up to nothing are kept as empty text.
/// Removed comments and wrappers are blanked rather than cut, so columns
/// still point into the physical line.
pub fn normalize_header(text: &str) -> Vec<Line> {
    let mut lines = Vec::new();
    let mut in_comment = false;

    for (index, raw) in text.lines().enumerate() {
        let line = index + 1;
        let mut cleaned = raw.to_string();
        for marker in ENCODING_MARKERS {
            cleaned = cleaned.replace(marker, "");
        }
        let cleaned = strip_comments(&cleaned, &mut in_comment);
        let cleaned = UNION_OPEN.replace_all(&cleaned, |caps: &regex::Captures| " ".repeat(caps[0].len()));

        if cleaned.trim_start().starts_with('#') {
            lines.push(Line { text: String::new(), line, column: 1 });
            continue;
        }

        for (offset, statement) in split_statements(&cleaned) {
            let statement = statement.replace('}', " ");
            let leading = statement.len() - statement.trim_start().len();
            lines.push(Line {
                text: statement.trim().to_string(),
                line,
                column: offset + leading + 1,
            });
        }
    }

    lines
}

/// Blanks block comments and cuts line comments from one physical line,
/// carrying the open-comment state across lines.
fn strip_comments(line: &str, in_comment: &mut bool) -> String {
    let mut out = String::with_capacity(line.len());
    let mut rest = line;

    loop {
        if *in_comment {
            match rest.find("*/") {
                Some(end) => {
                    out.push_str(&blank(&rest[..end + 2]));
                    rest = &rest[end + 2..];
                    *in_comment = false;
                }
                None => {
                    out.push_str(&blank(rest));
                    return out;
                }
            }
        } else {
            let block = rest.find("/*");
            let inline = rest.find("//");
            match (block, inline) {
                (Some(b), Some(l)) if l < b => {
                    out.push_str(&rest[..l]);
                    return out;
                }
                (None, Some(l)) => {
                    out.push_str(&rest[..l]);
                    return out;
                }
                (Some(b), _) => {
                    out.push_str(&rest[..b]);
                    out.push_str("  ");
                    rest = &rest[b + 2..];
                    *in_comment = true;
                }
                (None, None) => {
                    out.push_str(rest);
                    return out;
                }
            }
        }
    }
}

fn blank(text: &str) -> String {
    " ".repeat(text.len())
}

/// Splits a comment-free line after each `{` and at each `;`, returning each
/// statement with its byte offset in the line.
fn split_statements(line: &str) -> Vec<(usize, String)> {
    let mut statements = Vec::new();
    let mut current = String::new();
    let mut start = 0;

    for (index, c) in line.char_indices() {
        match c {
            '{' => {
                current.push(c);
                statements.push((start, std::mem::take(&mut current)));
                start = index + 1;
            }
            ';' => {
                statements.push((start, std::mem::take(&mut current)));
                start = index + 1;
            }
            _ => current.push(c),
        }
    }
    statements.push((start, current));
    statements
}

/// Splits one cleaned statement into identifier, `*`, `[...]` and `{` tokens.
/// Any other character is unsupported syntax.
pub fn tokenize_statement(statement: &Line) -> Result<Vec<Token>, FieldGenError> {
    let text = statement.text.as_str();
    let mut tokens = Vec::new();
    let mut last_end = 0;

    for mat in TOKEN_REGEX.find_iter(text) {
        if mat.start() > last_end {
            let unexpected = &text[last_end..mat.start()];
            return Err(error(
                &format!("Unsupported syntax {} in {}", quote(unexpected), quote(text)),
                statement.line,
                statement.column + last_end,
            ));
        }
        if !WHITESPACE_RX.is_match(mat.as_str()) {
            tokens.push(Token {
                text:   mat.as_str().to_string(),
                line:   statement.line,
                column: statement.column + mat.start(),
            });
        }
        last_end = mat.end();
    }

    if last_end != text.len() {
        let unexpected = &text[last_end..];
        return Err(error(
            &format!("Unsupported syntax {} in {}", quote(unexpected), quote(text)),
            statement.line,
            statement.column + last_end,
        ));
    }

    Ok(tokens)
}
