//! Tokenizer for the script language.

use super::ScriptError;

#[derive(Debug, Clone, PartialEq)]
pub enum TokenKind {
    Ident(String),
    Int(i64),
    Float(f64),
    Str(String),
    True,
    False,
    None,
    And,
    Or,
    Not,
    Plus,
    Minus,
    Star,
    Slash,
    Percent,
    Assign,
    Eq,
    NotEq,
    Lt,
    LtEq,
    Gt,
    GtEq,
    LParen,
    RParen,
    LBracket,
    RBracket,
    Comma,
    Dot,
    /// Statement separator. Only emitted outside brackets, so multi-line
    /// list literals keep working.
    Newline,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    pub kind: TokenKind,
    pub line: u32,
}

/// Tokenize script source.
///
/// `#` starts a comment running to end of line. Newlines inside `(..)` or
/// `[..]` are treated as whitespace.
pub fn tokenize(src: &str) -> Result<Vec<Token>, ScriptError> {
    let mut tokens = Vec::new();
    let mut chars = src.chars().peekable();
    let mut line: u32 = 1;
    let mut depth: usize = 0;

    macro_rules! push {
        ($kind:expr) => {
            tokens.push(Token { kind: $kind, line })
        };
    }

    while let Some(ch) = chars.next() {
        match ch {
            '\n' => {
                if depth == 0 {
                    push!(TokenKind::Newline);
                }
                line += 1;
            }
            c if c.is_whitespace() => {}
            '#' => {
                while let Some(&c) = chars.peek() {
                    if c == '\n' {
                        break;
                    }
                    chars.next();
                }
            }
            '(' => {
                depth += 1;
                push!(TokenKind::LParen);
            }
            ')' => {
                depth = depth.saturating_sub(1);
                push!(TokenKind::RParen);
            }
            '[' => {
                depth += 1;
                push!(TokenKind::LBracket);
            }
            ']' => {
                depth = depth.saturating_sub(1);
                push!(TokenKind::RBracket);
            }
            ',' => push!(TokenKind::Comma),
            '.' => push!(TokenKind::Dot),
            '+' => push!(TokenKind::Plus),
            '-' => push!(TokenKind::Minus),
            '*' => push!(TokenKind::Star),
            '/' => push!(TokenKind::Slash),
            '%' => push!(TokenKind::Percent),
            '=' => {
                if chars.peek() == Some(&'=') {
                    chars.next();
                    push!(TokenKind::Eq);
                } else {
                    push!(TokenKind::Assign);
                }
            }
            '!' => {
                if chars.peek() == Some(&'=') {
                    chars.next();
                    push!(TokenKind::NotEq);
                } else {
                    return Err(ScriptError::Parse(format!(
                        "line {line}: unexpected character '!'"
                    )));
                }
            }
            '<' => {
                if chars.peek() == Some(&'=') {
                    chars.next();
                    push!(TokenKind::LtEq);
                } else {
                    push!(TokenKind::Lt);
                }
            }
            '>' => {
                if chars.peek() == Some(&'=') {
                    chars.next();
                    push!(TokenKind::GtEq);
                } else {
                    push!(TokenKind::Gt);
                }
            }
            quote @ ('\'' | '"') => {
                let mut text = String::new();
                let mut closed = false;

                while let Some(c) = chars.next() {
                    match c {
                        c if c == quote => {
                            closed = true;
                            break;
                        }
                        '\\' => match chars.next() {
                            Some('n') => text.push('\n'),
                            Some('t') => text.push('\t'),
                            Some(escaped @ ('\\' | '\'' | '"')) => text.push(escaped),
                            Some(other) => {
                                return Err(ScriptError::Parse(format!(
                                    "line {line}: unknown escape '\\{other}'"
                                )));
                            }
                            None => break,
                        },
                        '\n' => {
                            return Err(ScriptError::Parse(format!(
                                "line {line}: unterminated string"
                            )));
                        }
                        c => text.push(c),
                    }
                }

                if !closed {
                    return Err(ScriptError::Parse(format!(
                        "line {line}: unterminated string"
                    )));
                }

                push!(TokenKind::Str(text));
            }
            c if c.is_ascii_digit() => {
                let mut number = String::from(c);
                let mut is_float = false;

                while let Some(&next) = chars.peek() {
                    if next.is_ascii_digit() {
                        number.push(next);
                        chars.next();
                    } else if next == '.' && !is_float {
                        // A digit must follow for this to be a float; `1.x`
                        // is attribute access on an integer, which the
                        // parser rejects on its own.
                        let mut ahead = chars.clone();
                        ahead.next();
                        if ahead.peek().is_some_and(|c| c.is_ascii_digit()) {
                            is_float = true;
                            number.push('.');
                            chars.next();
                        } else {
                            break;
                        }
                    } else {
                        break;
                    }
                }

                if is_float {
                    let value = number.parse().map_err(|_| {
                        ScriptError::Parse(format!("line {line}: bad number '{number}'"))
                    })?;
                    push!(TokenKind::Float(value));
                } else {
                    let value = number.parse().map_err(|_| {
                        ScriptError::Parse(format!("line {line}: bad number '{number}'"))
                    })?;
                    push!(TokenKind::Int(value));
                }
            }
            c if c.is_ascii_alphabetic() || c == '_' => {
                let mut ident = String::from(c);

                while let Some(&next) = chars.peek() {
                    if next.is_ascii_alphanumeric() || next == '_' {
                        ident.push(next);
                        chars.next();
                    } else {
                        break;
                    }
                }

                let kind = match ident.as_str() {
                    "true" => TokenKind::True,
                    "false" => TokenKind::False,
                    "none" => TokenKind::None,
                    "and" => TokenKind::And,
                    "or" => TokenKind::Or,
                    "not" => TokenKind::Not,
                    _ => TokenKind::Ident(ident),
                };
                push!(kind);
            }
            other => {
                return Err(ScriptError::Parse(format!(
                    "line {line}: unexpected character '{other}'"
                )));
            }
        }
    }

    Ok(tokens)
}
