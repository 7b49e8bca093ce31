use once_cell::sync::Lazy;
use std::collections::HashSet;

use super::FormulaErrorKind;

/// Python keywords. None of them is part of the grammar.
const KEYWORDS: [&str; 35] = [
    "False", "None", "True", "and", "as", "assert", "async", "await", "break", "class",
    "continue", "def", "del", "elif", "else", "except", "finally", "for", "from", "global",
    "if", "import", "in", "is", "lambda", "nonlocal", "not", "or", "pass", "raise", "return",
    "try", "while", "with", "yield",
];

static KEYWORD_SET: Lazy<HashSet<&'static str>> = Lazy::new(|| KEYWORDS.into_iter().collect());

/// Punctuation that is lexed only so the parser can name the rejected construct.
const FORBIDDEN_SYMBOLS: [&str; 25] = [
    ":=", "==", "!=", "<=", ">=", "<<", ">>", "->", ".", "[", "]", "{", "}", "=", "<", ">",
    ":", ";", "@", "&", "|", "^", "~", "!", "`",
];

#[derive(Debug, Clone, PartialEq)]
pub enum TokenKind {
    Int(i64),
    Float(f64),
    Str(String),
    /// Raw f-string body, escapes still in place
    FStr(String),
    Name(String),
    Keyword(String),
    Plus,
    Minus,
    Star,
    Slash,
    DoubleSlash,
    Percent,
    DoubleStar,
    LParen,
    RParen,
    Comma,
    Forbidden(&'static str),
    Eof,
}

impl TokenKind {
    pub fn describe(&self) -> String {
        match self {
            TokenKind::Int(i) => format!("number {}", i),
            TokenKind::Float(f) => format!("number {}", f),
            TokenKind::Str(_) | TokenKind::FStr(_) => "string".to_string(),
            TokenKind::Name(n) => format!("name '{}'", n),
            TokenKind::Keyword(k) => format!("keyword '{}'", k),
            TokenKind::Plus => "'+'".to_string(),
            TokenKind::Minus => "'-'".to_string(),
            TokenKind::Star => "'*'".to_string(),
            TokenKind::Slash => "'/'".to_string(),
            TokenKind::DoubleSlash => "'//'".to_string(),
            TokenKind::Percent => "'%'".to_string(),
            TokenKind::DoubleStar => "'**'".to_string(),
            TokenKind::LParen => "'('".to_string(),
            TokenKind::RParen => "')'".to_string(),
            TokenKind::Comma => "','".to_string(),
            TokenKind::Forbidden(sym) => format!("'{}'", sym),
            TokenKind::Eof => "end of expression".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    pub kind: TokenKind,
    /// Char offset in the source
    pub pos: usize,
}

pub fn tokenize(source: &str) -> Result<Vec<Token>, FormulaErrorKind> {
    let chars: Vec<char> = source.chars().collect();
    let mut tokens = Vec::new();
    let mut i = 0;

    while i < chars.len() {
        let c = chars[i];
        let start = i;

        if c.is_whitespace() {
            i += 1;
            continue;
        }

        if c.is_ascii_digit() || (c == '.' && chars.get(i + 1).is_some_and(|n| n.is_ascii_digit()))
        {
            let (kind, next) = lex_number(&chars, i)?;
            tokens.push(Token { kind, pos: start });
            i = next;
            continue;
        }

        if c.is_alphabetic() || c == '_' {
            let mut end = i;
            while end < chars.len() && (chars[end].is_alphanumeric() || chars[end] == '_') {
                end += 1;
            }
            let word: String = chars[i..end].iter().collect();

            if let Some(&quote) = chars.get(end).filter(|q| **q == '"' || **q == '\'') {
                let (raw, next) = lex_string_body(&chars, end, quote)?;
                let kind = match word.as_str() {
                    "f" | "F" => TokenKind::FStr(raw),
                    "u" | "U" => TokenKind::Str(unescape(&raw)),
                    _ => {
                        return Err(FormulaErrorKind::Forbidden(format!(
                            "string prefix '{}'",
                            word
                        )))
                    }
                };
                tokens.push(Token { kind, pos: start });
                i = next;
                continue;
            }

            let kind = if KEYWORD_SET.contains(word.as_str()) {
                TokenKind::Keyword(word)
            } else {
                TokenKind::Name(word)
            };
            tokens.push(Token { kind, pos: start });
            i = end;
            continue;
        }

        if c == '"' || c == '\'' {
            let (raw, next) = lex_string_body(&chars, i, c)?;
            tokens.push(Token {
                kind: TokenKind::Str(unescape(&raw)),
                pos: start,
            });
            i = next;
            continue;
        }

        let two: String = chars[i..(i + 2).min(chars.len())].iter().collect();
        let (kind, width) = match (c, two.as_str()) {
            (_, "**") => (TokenKind::DoubleStar, 2),
            (_, "//") => (TokenKind::DoubleSlash, 2),
            ('+', _) => (TokenKind::Plus, 1),
            ('-', _) if two != "->" => (TokenKind::Minus, 1),
            ('*', _) => (TokenKind::Star, 1),
            ('/', _) => (TokenKind::Slash, 1),
            ('%', _) => (TokenKind::Percent, 1),
            ('(', _) => (TokenKind::LParen, 1),
            (')', _) => (TokenKind::RParen, 1),
            (',', _) => (TokenKind::Comma, 1),
            _ => match forbidden_symbol(&two, c) {
                Some(sym) => (TokenKind::Forbidden(sym), sym.chars().count()),
                None => {
                    return Err(FormulaErrorKind::Syntax {
                        position: start,
                        message: format!("unexpected character '{}'", c),
                    })
                }
            },
        };
        tokens.push(Token { kind, pos: start });
        i += width;
    }

    tokens.push(Token {
        kind: TokenKind::Eof,
        pos: chars.len(),
    });
    Ok(tokens)
}

fn forbidden_symbol(two: &str, c: char) -> Option<&'static str> {
    FORBIDDEN_SYMBOLS
        .iter()
        .copied()
        .find(|sym| sym.chars().count() == 2 && *sym == two)
        .or_else(|| {
            FORBIDDEN_SYMBOLS
                .iter()
                .copied()
                .find(|sym| sym.chars().count() == 1 && sym.starts_with(c))
        })
}

fn lex_number(chars: &[char], start: usize) -> Result<(TokenKind, usize), FormulaErrorKind> {
    let mut i = start;
    let mut is_float = false;

    while i < chars.len() && chars[i].is_ascii_digit() {
        i += 1;
    }
    if i < chars.len() && chars[i] == '.' {
        is_float = true;
        i += 1;
        while i < chars.len() && chars[i].is_ascii_digit() {
            i += 1;
        }
    }
    if i < chars.len() && (chars[i] == 'e' || chars[i] == 'E') {
        let mut j = i + 1;
        if j < chars.len() && (chars[j] == '+' || chars[j] == '-') {
            j += 1;
        }
        if j < chars.len() && chars[j].is_ascii_digit() {
            is_float = true;
            while j < chars.len() && chars[j].is_ascii_digit() {
                j += 1;
            }
            i = j;
        }
    }

    let text: String = chars[start..i].iter().collect();
    let kind = if is_float {
        let value = text.parse::<f64>().map_err(|_| FormulaErrorKind::Syntax {
            position: start,
            message: format!("invalid number '{}'", text),
        })?;
        TokenKind::Float(value)
    } else {
        let value = text.parse::<i64>().map_err(|_| FormulaErrorKind::Syntax {
            position: start,
            message: format!("integer literal '{}' is too large", text),
        })?;
        TokenKind::Int(value)
    };
    Ok((kind, i))
}

/// Returns the raw body between quotes and the index after the closing quote.
fn lex_string_body(
    chars: &[char],
    open: usize,
    quote: char,
) -> Result<(String, usize), FormulaErrorKind> {
    let mut raw = String::new();
    let mut i = open + 1;
    while i < chars.len() {
        let c = chars[i];
        if c == '\\' {
            raw.push(c);
            if let Some(&next) = chars.get(i + 1) {
                raw.push(next);
            }
            i += 2;
            continue;
        }
        if c == quote {
            return Ok((raw, i + 1));
        }
        if c == '\n' {
            break;
        }
        raw.push(c);
        i += 1;
    }
    Err(FormulaErrorKind::Syntax {
        position: open,
        message: "unterminated string".to_string(),
    })
}

/// Processes backslash escapes; unknown escapes are kept verbatim.
pub fn unescape(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    let mut chars = raw.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('n') => out.push('\n'),
            Some('t') => out.push('\t'),
            Some('r') => out.push('\r'),
            Some('\\') => out.push('\\'),
            Some('\'') => out.push('\''),
            Some('"') => out.push('"'),
            Some(other) => {
                out.push('\\');
                out.push(other);
            }
            None => out.push('\\'),
        }
    }
    out
}
