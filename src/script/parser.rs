//! Recursive-descent parser for the script language.

use super::ScriptError;
use super::ast::{BinOp, Expr, Program, Stmt, UnaryOp};
use super::lexer::{Token, TokenKind, tokenize};

/// Parse a single expression, as found inside `{{ … }}`.
///
/// The whole source must be one expression; trailing tokens are an error.
/// Newlines are treated as whitespace here.
pub fn parse_expression(src: &str) -> Result<Expr, ScriptError> {
    let tokens: Vec<Token> = tokenize(src)?
        .into_iter()
        .filter(|t| t.kind != TokenKind::Newline)
        .collect();

    if tokens.is_empty() {
        return Err(ScriptError::Parse("empty expression".into()));
    }

    let mut parser = Parser::new(tokens);
    let expr = parser.expression()?;
    parser.expect_end()?;

    Ok(expr)
}

/// Parse a statement program, as found in header blocks and config files.
///
/// Statements are separated by newlines.
pub fn parse_program(src: &str) -> Result<Program, ScriptError> {
    let tokens = tokenize(src)?;
    let mut parser = Parser::new(tokens);
    let mut stmts = Vec::new();

    loop {
        parser.skip_newlines();
        if parser.at_end() {
            break;
        }
        stmts.push(parser.statement()?);

        if !parser.at_end() {
            parser.expect_newline()?;
        }
    }

    Ok(Program { stmts })
}

struct Parser {
    tokens: Vec<Token>,
    pos: usize,
}

impl Parser {
    fn new(tokens: Vec<Token>) -> Self {
        Self { tokens, pos: 0 }
    }

    fn peek(&self) -> Option<&TokenKind> {
        self.tokens.get(self.pos).map(|t| &t.kind)
    }

    fn line(&self) -> u32 {
        self.tokens
            .get(self.pos.min(self.tokens.len().saturating_sub(1)))
            .map(|t| t.line)
            .unwrap_or(1)
    }

    fn advance(&mut self) -> Option<TokenKind> {
        let token = self.tokens.get(self.pos).map(|t| t.kind.clone());
        if token.is_some() {
            self.pos += 1;
        }
        token
    }

    fn eat(&mut self, kind: &TokenKind) -> bool {
        if self.peek() == Some(kind) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    fn expect(&mut self, kind: TokenKind, what: &str) -> Result<(), ScriptError> {
        if self.eat(&kind) {
            Ok(())
        } else {
            Err(self.error(&format!("expected {what}")))
        }
    }

    fn at_end(&self) -> bool {
        self.pos >= self.tokens.len()
    }

    fn skip_newlines(&mut self) {
        while self.eat(&TokenKind::Newline) {}
    }

    fn expect_newline(&mut self) -> Result<(), ScriptError> {
        if self.eat(&TokenKind::Newline) || self.at_end() {
            Ok(())
        } else {
            Err(self.error("expected end of statement"))
        }
    }

    fn expect_end(&mut self) -> Result<(), ScriptError> {
        if self.at_end() {
            Ok(())
        } else {
            Err(self.error("unexpected trailing input"))
        }
    }

    fn error(&self, message: &str) -> ScriptError {
        let found = match self.peek() {
            Some(kind) => format!("{kind:?}"),
            None => "end of input".to_string(),
        };
        ScriptError::Parse(format!("line {}: {message}, found {found}", self.line()))
    }

    // ---------------------------------------------------------------------
    // Statements
    // ---------------------------------------------------------------------

    fn statement(&mut self) -> Result<Stmt, ScriptError> {
        // Assignment requires lookahead: `name =`, or `name . name =`.
        if let Some(TokenKind::Ident(name)) = self.peek().cloned() {
            if self.kind_at(1) == Some(&TokenKind::Assign) {
                self.pos += 2;
                let value = self.expression()?;
                return Ok(Stmt::Assign { name, value });
            }

            if self.kind_at(1) == Some(&TokenKind::Dot)
                && matches!(self.kind_at(2), Some(TokenKind::Ident(_)))
                && self.kind_at(3) == Some(&TokenKind::Assign)
            {
                let attr = match self.kind_at(2) {
                    Some(TokenKind::Ident(attr)) => attr.clone(),
                    _ => unreachable!(),
                };
                self.pos += 4;
                let value = self.expression()?;
                return Ok(Stmt::AssignAttr {
                    object: name,
                    attr,
                    value,
                });
            }
        }

        Ok(Stmt::Expr(self.expression()?))
    }

    fn kind_at(&self, offset: usize) -> Option<&TokenKind> {
        self.tokens.get(self.pos + offset).map(|t| &t.kind)
    }

    // ---------------------------------------------------------------------
    // Expressions, lowest precedence first
    // ---------------------------------------------------------------------

    fn expression(&mut self) -> Result<Expr, ScriptError> {
        self.or_expr()
    }

    fn or_expr(&mut self) -> Result<Expr, ScriptError> {
        let mut left = self.and_expr()?;
        while self.eat(&TokenKind::Or) {
            let right = self.and_expr()?;
            left = Expr::Binary {
                op: BinOp::Or,
                left: Box::new(left),
                right: Box::new(right),
            };
        }
        Ok(left)
    }

    fn and_expr(&mut self) -> Result<Expr, ScriptError> {
        let mut left = self.not_expr()?;
        while self.eat(&TokenKind::And) {
            let right = self.not_expr()?;
            left = Expr::Binary {
                op: BinOp::And,
                left: Box::new(left),
                right: Box::new(right),
            };
        }
        Ok(left)
    }

    fn not_expr(&mut self) -> Result<Expr, ScriptError> {
        if self.eat(&TokenKind::Not) {
            let operand = self.not_expr()?;
            return Ok(Expr::Unary {
                op: UnaryOp::Not,
                operand: Box::new(operand),
            });
        }
        self.comparison()
    }

    fn comparison(&mut self) -> Result<Expr, ScriptError> {
        let left = self.additive()?;

        let op = match self.peek() {
            Some(TokenKind::Eq) => BinOp::Eq,
            Some(TokenKind::NotEq) => BinOp::NotEq,
            Some(TokenKind::Lt) => BinOp::Lt,
            Some(TokenKind::LtEq) => BinOp::LtEq,
            Some(TokenKind::Gt) => BinOp::Gt,
            Some(TokenKind::GtEq) => BinOp::GtEq,
            _ => return Ok(left),
        };
        self.pos += 1;

        let right = self.additive()?;
        Ok(Expr::Binary {
            op,
            left: Box::new(left),
            right: Box::new(right),
        })
    }

    fn additive(&mut self) -> Result<Expr, ScriptError> {
        let mut left = self.multiplicative()?;
        loop {
            let op = match self.peek() {
                Some(TokenKind::Plus) => BinOp::Add,
                Some(TokenKind::Minus) => BinOp::Sub,
                _ => break,
            };
            self.pos += 1;
            let right = self.multiplicative()?;
            left = Expr::Binary {
                op,
                left: Box::new(left),
                right: Box::new(right),
            };
        }
        Ok(left)
    }

    fn multiplicative(&mut self) -> Result<Expr, ScriptError> {
        let mut left = self.unary()?;
        loop {
            let op = match self.peek() {
                Some(TokenKind::Star) => BinOp::Mul,
                Some(TokenKind::Slash) => BinOp::Div,
                Some(TokenKind::Percent) => BinOp::Rem,
                _ => break,
            };
            self.pos += 1;
            let right = self.unary()?;
            left = Expr::Binary {
                op,
                left: Box::new(left),
                right: Box::new(right),
            };
        }
        Ok(left)
    }

    fn unary(&mut self) -> Result<Expr, ScriptError> {
        if self.eat(&TokenKind::Minus) {
            let operand = self.unary()?;
            return Ok(Expr::Unary {
                op: UnaryOp::Neg,
                operand: Box::new(operand),
            });
        }
        self.postfix()
    }

    fn postfix(&mut self) -> Result<Expr, ScriptError> {
        let primary = self.primary()?;

        // Calls and attribute access only apply to bare names.
        let Expr::Var(name) = primary else {
            return Ok(primary);
        };

        if self.eat(&TokenKind::LParen) {
            return self.call(name);
        }

        if self.eat(&TokenKind::Dot) {
            let attr = self.ident("attribute name")?;
            if self.peek() == Some(&TokenKind::LParen) {
                return Err(self.error("method calls are not supported"));
            }
            return Ok(Expr::Attr { object: name, attr });
        }

        Ok(Expr::Var(name))
    }

    fn call(&mut self, function: String) -> Result<Expr, ScriptError> {
        let mut args = Vec::new();
        let mut named: Vec<(String, Expr)> = Vec::new();

        if !self.eat(&TokenKind::RParen) {
            loop {
                // `name = expr` is a named argument.
                if let Some(TokenKind::Ident(name)) = self.peek().cloned()
                    && self.kind_at(1) == Some(&TokenKind::Assign)
                {
                    self.pos += 2;
                    let value = self.expression()?;
                    named.push((name, value));
                } else {
                    if !named.is_empty() {
                        return Err(self.error("positional argument after named argument"));
                    }
                    args.push(self.expression()?);
                }

                if self.eat(&TokenKind::RParen) {
                    break;
                }
                self.expect(TokenKind::Comma, "',' or ')'")?;
            }
        }

        Ok(Expr::Call {
            function,
            args,
            named,
        })
    }

    fn ident(&mut self, what: &str) -> Result<String, ScriptError> {
        match self.advance() {
            Some(TokenKind::Ident(name)) => Ok(name),
            _ => {
                self.pos = self.pos.saturating_sub(1);
                Err(self.error(&format!("expected {what}")))
            }
        }
    }

    fn primary(&mut self) -> Result<Expr, ScriptError> {
        match self.advance() {
            Some(TokenKind::Int(n)) => Ok(Expr::Int(n)),
            Some(TokenKind::Float(n)) => Ok(Expr::Float(n)),
            Some(TokenKind::Str(s)) => Ok(Expr::Str(s)),
            Some(TokenKind::True) => Ok(Expr::Bool(true)),
            Some(TokenKind::False) => Ok(Expr::Bool(false)),
            Some(TokenKind::None) => Ok(Expr::None),
            Some(TokenKind::Ident(name)) => Ok(Expr::Var(name)),
            Some(TokenKind::LParen) => {
                let inner = self.expression()?;
                self.expect(TokenKind::RParen, "')'")?;
                Ok(inner)
            }
            Some(TokenKind::LBracket) => {
                let mut items = Vec::new();
                if !self.eat(&TokenKind::RBracket) {
                    loop {
                        items.push(self.expression()?);
                        if self.eat(&TokenKind::RBracket) {
                            break;
                        }
                        self.expect(TokenKind::Comma, "',' or ']'")?;
                    }
                }
                Ok(Expr::List(items))
            }
            _ => {
                self.pos = self.pos.saturating_sub(1);
                Err(self.error("expected an expression"))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_arithmetic_precedence() {
        let expr = parse_expression("1 + 2 * 3").unwrap();
        assert_eq!(
            expr,
            Expr::Binary {
                op: BinOp::Add,
                left: Box::new(Expr::Int(1)),
                right: Box::new(Expr::Binary {
                    op: BinOp::Mul,
                    left: Box::new(Expr::Int(2)),
                    right: Box::new(Expr::Int(3)),
                }),
            }
        );
    }

    #[test]
    fn test_parse_attr() {
        assert_eq!(
            parse_expression("site.prefix").unwrap(),
            Expr::Attr {
                object: "site".into(),
                attr: "prefix".into(),
            }
        );
    }

    #[test]
    fn test_parse_call_with_named_args() {
        let expr = parse_expression("path_nav(1, min=2)").unwrap();
        assert_eq!(
            expr,
            Expr::Call {
                function: "path_nav".into(),
                args: vec![Expr::Int(1)],
                named: vec![("min".into(), Expr::Int(2))],
            }
        );
    }

    #[test]
    fn test_parse_positional_after_named_rejected() {
        assert!(parse_expression("f(a=1, 2)").is_err());
    }

    #[test]
    fn test_parse_list() {
        assert_eq!(
            parse_expression("['.git', '#*']").unwrap(),
            Expr::List(vec![Expr::Str(".git".into()), Expr::Str("#*".into())])
        );
    }

    #[test]
    fn test_parse_trailing_input_rejected() {
        assert!(parse_expression("1 2").is_err());
        assert!(parse_expression("").is_err());
    }

    #[test]
    fn test_parse_program() {
        let program = parse_program("title = 'Home'\n\nsite.prefix = '/x'\n").unwrap();
        assert_eq!(program.stmts.len(), 2);
        assert_eq!(
            program.stmts[0],
            Stmt::Assign {
                name: "title".into(),
                value: Expr::Str("Home".into()),
            }
        );
        assert_eq!(
            program.stmts[1],
            Stmt::AssignAttr {
                object: "site".into(),
                attr: "prefix".into(),
                value: Expr::Str("/x".into()),
            }
        );
    }

    #[test]
    fn test_parse_program_multiline_list() {
        let program = parse_program("site.ignored_files = ['.git',\n    '#*']").unwrap();
        assert_eq!(program.stmts.len(), 1);
    }

    #[test]
    fn test_parse_program_two_statements_one_line_rejected() {
        assert!(parse_program("a = 1 b = 2").is_err());
    }

    #[test]
    fn test_parse_comparison() {
        let expr = parse_expression("n >= 2").unwrap();
        assert_eq!(
            expr,
            Expr::Binary {
                op: BinOp::GtEq,
                left: Box::new(Expr::Var("n".into())),
                right: Box::new(Expr::Int(2)),
            }
        );
    }
}
