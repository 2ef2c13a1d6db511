//! The delimiter-based template engine.
//!
//! A template is parsed once into a sequence of pieces — literal text and
//! compiled expressions — and rendered any number of times against a script
//! host. `{{ expr }}` evaluates and stringifies; `{{{ literal }}}` emits the
//! text between the triple delimiters verbatim, so template markup can itself
//! contain double-delimiter-looking text.

use crate::script::{self, Expr, Host, ScriptError, Value};

#[derive(thiserror::Error, Debug)]
pub enum TemplateError {
    #[error("{context}: {source_text:?}: {cause}")]
    Syntax {
        context: String,
        source_text: String,
        cause: ScriptError,
    },

    #[error("{context}: {source_text:?}: {cause}")]
    Eval {
        context: String,
        source_text: String,
        cause: ScriptError,
    },

    /// A `fail(..)` raised from user code: the original message is preserved
    /// with only the context prefix, never re-wrapped.
    #[error("{context}: {message}")]
    Raised { context: String, message: String },
}

#[derive(Debug, Clone)]
enum Piece {
    Literal(String),
    /// A compiled expression plus its original source text, kept for error
    /// messages.
    Expr { expr: Expr, source_text: String },
}

/// A parsed template. Immutable once parsed; owned by whatever parsed it.
#[derive(Debug, Clone)]
pub struct Template {
    pieces: Vec<Piece>,
    context: String,
}

impl Template {
    /// Parse template text. Expressions are compiled here, so a bad
    /// expression fails the parse with the offending source attached.
    ///
    /// `context` labels errors — conventionally the originating file path.
    pub fn parse(text: &str, context: impl Into<String>) -> Result<Self, TemplateError> {
        let context = context.into();
        let mut pieces: Vec<Piece> = Vec::new();
        let mut literal = String::new();
        let mut rest = text;

        while !rest.is_empty() {
            // Triple delimiters first; `{{{` must not be read as `{{` + `{`.
            if let Some(after) = rest.strip_prefix("{{{")
                && let Some(end) = after.find("}}}")
                && end > 0
            {
                if !literal.is_empty() {
                    pieces.push(Piece::Literal(std::mem::take(&mut literal)));
                }
                pieces.push(Piece::Literal(after[..end].to_string()));
                rest = &after[end + 3..];
                continue;
            }

            if let Some(after) = rest.strip_prefix("{{")
                && let Some(end) = after.find("}}")
                && end > 0
            {
                let source_text = after[..end].to_string();
                let expr = script::parse_expression(&source_text).map_err(|cause| {
                    TemplateError::Syntax {
                        context: context.clone(),
                        source_text: source_text.clone(),
                        cause,
                    }
                })?;

                if !literal.is_empty() {
                    pieces.push(Piece::Literal(std::mem::take(&mut literal)));
                }
                pieces.push(Piece::Expr { expr, source_text });
                rest = &after[end + 2..];
                continue;
            }

            let ch = rest.chars().next().unwrap();
            literal.push(ch);
            rest = &rest[ch.len_utf8()..];
        }

        if !literal.is_empty() {
            pieces.push(Piece::Literal(literal));
        }

        Ok(Self { pieces, context })
    }

    /// Render to a sequence of text chunks.
    ///
    /// Each expression piece is evaluated independently, in document order. A
    /// fragments value is spliced chunk by chunk; `none` contributes an empty
    /// fragment. Evaluation stops at the first error — nothing is written
    /// anywhere by this call.
    pub fn render_fragments(&self, host: &mut dyn Host) -> Result<Vec<String>, TemplateError> {
        let mut chunks = Vec::with_capacity(self.pieces.len());

        for piece in &self.pieces {
            match piece {
                Piece::Literal(text) => chunks.push(text.clone()),
                Piece::Expr { expr, source_text } => {
                    let value = script::eval(expr, host).map_err(|cause| match cause {
                        ScriptError::Raised(message) => TemplateError::Raised {
                            context: self.context.clone(),
                            message,
                        },
                        cause => TemplateError::Eval {
                            context: self.context.clone(),
                            source_text: source_text.clone(),
                            cause,
                        },
                    })?;

                    match value {
                        Value::Fragments(fragments) => chunks.extend(fragments),
                        other => chunks.push(other.render()),
                    }
                }
            }
        }

        Ok(chunks)
    }

    /// Render to one string.
    pub fn render(&self, host: &mut dyn Host) -> Result<String, TemplateError> {
        Ok(self.render_fragments(host)?.concat())
    }

    /// The context label this template was parsed with.
    pub fn context(&self) -> &str {
        &self.context
    }
}
