//! Rule expression parser.
//!
//! Recursive descent parser for the rule grammar. Converts text to AST with
//! meaningful error messages including character offset, expected/found tokens.
//!
//! ```text
//! expr       := and_expr ( "or" and_expr )*
//! and_expr   := not_expr ( "and" not_expr )*
//! not_expr   := "not" not_expr | primary
//! primary    := "(" expr ")" | "true" | "false" | comparison
//! comparison := operand ( "<" | ">" | "<=" | ">=" | "==" | "!=" ) operand
//! operand    := field | number
//! ```
//!
//! Keywords and field names are case-insensitive.

use crate::domain::error::ParseError;
use crate::domain::field::Field;
use crate::domain::rule::{CmpOp, Expr, Operand};

struct Parser<'a> {
    input: &'a str,
    pos: usize,
}

impl<'a> Parser<'a> {
    fn new(input: &'a str) -> Self {
        Self { input, pos: 0 }
    }

    fn remaining(&self) -> &'a str {
        &self.input[self.pos..]
    }

    fn peek(&self) -> Option<char> {
        self.remaining().chars().next()
    }

    fn advance(&mut self) -> Option<char> {
        let ch = self.peek()?;
        self.pos += ch.len_utf8();
        Some(ch)
    }

    fn at_end(&self) -> bool {
        self.pos >= self.input.len()
    }

    fn skip_whitespace(&mut self) {
        while let Some(ch) = self.peek() {
            if ch.is_whitespace() {
                self.advance();
            } else {
                break;
            }
        }
    }

    fn error(&self, message: impl Into<String>, position: usize) -> ParseError {
        ParseError {
            message: message.into(),
            position,
        }
    }

    fn expect_char(&mut self, expected: char) -> Result<(), ParseError> {
        self.skip_whitespace();
        match self.peek() {
            Some(ch) if ch == expected => {
                self.advance();
                Ok(())
            }
            Some(ch) => Err(self.error(
                format!("expected '{}', found '{}'", expected, ch),
                self.pos,
            )),
            None => Err(self.error(
                format!("expected '{}', found end of input", expected),
                self.pos,
            )),
        }
    }

    fn peek_keyword(&self, keyword: &str) -> bool {
        let remaining = self.remaining();
        let Some(head) = remaining.get(..keyword.len()) else {
            return false;
        };
        head.eq_ignore_ascii_case(keyword)
            && !remaining[keyword.len()..]
                .chars()
                .next()
                .map(is_word_char)
                .unwrap_or(false)
    }

    fn consume_keyword(&mut self, keyword: &str) -> bool {
        self.skip_whitespace();
        if self.peek_keyword(keyword) {
            self.pos += keyword.len();
            true
        } else {
            false
        }
    }

    fn peek_word(&self) -> String {
        let word: String = self.remaining().chars().take_while(|c| is_word_char(*c)).collect();
        if word.is_empty() {
            self.peek()
                .map(|c| c.to_string())
                .unwrap_or_else(|| "end of input".to_string())
        } else {
            word
        }
    }

    fn parse_or(&mut self) -> Result<Expr, ParseError> {
        let mut left = self.parse_and()?;
        while self.consume_keyword("or") {
            let right = self.parse_and()?;
            left = Expr::Or(Box::new(left), Box::new(right));
        }
        Ok(left)
    }

    fn parse_and(&mut self) -> Result<Expr, ParseError> {
        let mut left = self.parse_not()?;
        while self.consume_keyword("and") {
            let right = self.parse_not()?;
            left = Expr::And(Box::new(left), Box::new(right));
        }
        Ok(left)
    }

    fn parse_not(&mut self) -> Result<Expr, ParseError> {
        if self.consume_keyword("not") {
            let inner = self.parse_not()?;
            return Ok(Expr::Not(Box::new(inner)));
        }
        self.parse_primary()
    }

    fn parse_primary(&mut self) -> Result<Expr, ParseError> {
        self.skip_whitespace();
        if self.peek() == Some('(') {
            self.advance();
            let inner = self.parse_or()?;
            self.expect_char(')')?;
            return Ok(inner);
        }
        if self.consume_keyword("true") {
            return Ok(Expr::Literal(true));
        }
        if self.consume_keyword("false") {
            return Ok(Expr::Literal(false));
        }
        self.parse_comparison()
    }

    fn parse_comparison(&mut self) -> Result<Expr, ParseError> {
        self.skip_whitespace();
        let start = self.pos;
        let left = self.parse_operand()?;
        let op = self.parse_cmp_op()?;
        let right = self.parse_operand()?;

        if matches!((&left, &right), (Operand::Constant(_), Operand::Constant(_))) {
            return Err(self.error(
                "comparison must reference at least one field",
                start,
            ));
        }
        Ok(Expr::Comparison { left, op, right })
    }

    fn parse_cmp_op(&mut self) -> Result<CmpOp, ParseError> {
        self.skip_whitespace();
        let remaining = self.remaining();
        let (op, len) = if remaining.starts_with("<=") {
            (CmpOp::Le, 2)
        } else if remaining.starts_with(">=") {
            (CmpOp::Ge, 2)
        } else if remaining.starts_with("==") {
            (CmpOp::Eq, 2)
        } else if remaining.starts_with("!=") {
            (CmpOp::Ne, 2)
        } else if remaining.starts_with('<') {
            (CmpOp::Lt, 1)
        } else if remaining.starts_with('>') {
            (CmpOp::Gt, 1)
        } else {
            return Err(self.error(
                format!(
                    "expected comparison operator (<, >, <=, >=, ==, !=), found '{}'",
                    self.peek_word()
                ),
                self.pos,
            ));
        };
        self.pos += len;
        Ok(op)
    }

    fn parse_operand(&mut self) -> Result<Operand, ParseError> {
        self.skip_whitespace();
        match self.peek() {
            Some(ch) if ch.is_ascii_digit() || ch == '-' || ch == '.' => {
                Ok(Operand::Constant(self.parse_number()?))
            }
            Some(ch) if ch.is_alphabetic() || ch == '_' => {
                let word = self.peek_word();
                match Field::from_name(&word) {
                    Some(field) => {
                        self.pos += word.len();
                        Ok(Operand::Field(field))
                    }
                    None => Err(self.error(
                        format!(
                            "unknown field '{}', expected one of: {}",
                            word,
                            Field::known_names()
                        ),
                        self.pos,
                    )),
                }
            }
            _ => Err(self.error(
                format!("expected field or number, found '{}'", self.peek_word()),
                self.pos,
            )),
        }
    }

    fn parse_number(&mut self) -> Result<f64, ParseError> {
        let start = self.pos;
        let mut has_dot = false;
        let mut digits = 0;

        if self.peek() == Some('-') {
            self.advance();
        }

        while let Some(ch) = self.peek() {
            if ch.is_ascii_digit() {
                digits += 1;
                self.advance();
            } else if ch == '.' && !has_dot {
                has_dot = true;
                self.advance();
            } else {
                break;
            }
        }

        if digits == 0 {
            return Err(self.error("expected number", start));
        }

        if matches!(self.peek(), Some('e') | Some('E')) {
            let mark = self.pos;
            self.advance();
            if matches!(self.peek(), Some('-') | Some('+')) {
                self.advance();
            }
            let exp_digits = self.remaining().chars().take_while(|c| c.is_ascii_digit()).count();
            if exp_digits == 0 {
                self.pos = mark;
            } else {
                self.pos += exp_digits;
            }
        }

        if self.peek().map(is_word_char).unwrap_or(false) {
            return Err(self.error(
                format!("invalid number: {}{}", &self.input[start..self.pos], self.peek_word()),
                start,
            ));
        }

        let num_str = &self.input[start..self.pos];
        num_str
            .parse::<f64>()
            .map_err(|_| self.error(format!("invalid number: {}", num_str), start))
    }
}

fn is_word_char(c: char) -> bool {
    c.is_alphanumeric() || c == '_'
}

/// Parse a rule expression into an [`Expr`] tree.
pub fn parse(input: &str) -> Result<Expr, ParseError> {
    let mut parser = Parser::new(input);
    parser.skip_whitespace();
    if parser.at_end() {
        return Err(parser.error("empty rule", 0));
    }

    let expr = parser.parse_or()?;

    parser.skip_whitespace();
    if !parser.at_end() {
        return Err(parser.error(
            format!("unexpected trailing input '{}'", parser.peek_word()),
            parser.pos,
        ));
    }
    Ok(expr)
}
