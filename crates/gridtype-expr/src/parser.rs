//! Expression parser
//!
//! A recursive descent parser for the expression language with proper
//! operator precedence. The grammar is the one [`Expression`]'s `Display`
//! writes.

use crate::ast::{
    AddSubtractOp, ClausePattern, ComparisonOperator, Definition, Expression, MatchClause,
    UnitExpression,
};
use crate::error::ParseError;
use crate::types::TypeSyntax;
use ahash::AHashSet;
use gridtype_core::{Decimal, Rational, TableId, TemporalKind, TemporalValue};
use once_cell::sync::Lazy;
use std::str::FromStr;

type ParseResult<T> = Result<T, ParseError>;

static KEYWORDS: Lazy<AHashSet<&'static str>> = Lazy::new(|| {
    [
        "if", "then", "else", "endif", "match", "case", "orcase", "given", "endmatch", "define",
        "enddefine", "true", "false", "type", "date", "time", "datetime",
    ]
    .into_iter()
    .collect()
});

/// Check if a word is reserved by the grammar
pub fn is_keyword(word: &str) -> bool {
    KEYWORDS.contains(word)
}

/// Parse an expression
///
/// # Example
/// ```rust
/// use gridtype_expr::parse_expression;
///
/// let expr = parse_expression("5{m} ^ 2").unwrap();
/// let expr = parse_expression("if x =~ Some(n) then n + 1 else 0 endif").unwrap();
/// let expr = parse_expression("sum(@entire Runs.distance)").unwrap();
/// ```
pub fn parse_expression(text: &str) -> ParseResult<Expression> {
    let mut parser = ExpressionParser::new(text)?;
    let expr = parser.parse_expression()?;

    // Make sure we consumed all input
    if parser.current() != &Token::Eof {
        return Err(parser.error(format!(
            "Unexpected text after expression: '{}'",
            &parser.input[parser.token_start..]
        )));
    }

    Ok(expr)
}

/// Token types
#[derive(Debug, Clone, PartialEq)]
enum Token {
    // Literals
    Number(String),
    Text(String),

    // Names; `quoted` names are never keywords
    Identifier { name: String, quoted: bool },
    AtEntire,

    // Operators
    Plus,
    Minus,
    Star,
    Slash,
    Caret,
    Semicolon,
    Ampersand,
    Pipe,
    Equal,
    EqualTilde,
    NotEqual,
    LessThan,
    LessEqual,
    GreaterThan,
    GreaterEqual,
    Hash,
    Dot,
    Colon,
    Comma,

    // Delimiters
    LeftParen,
    RightParen,
    LeftBracket,
    RightBracket,
    LeftBrace,
    RightBrace,

    // End of input
    Eof,
}

impl Token {
    fn is_keyword(&self, keyword: &str) -> bool {
        matches!(self, Token::Identifier { name, quoted: false } if name == keyword)
    }
}

/// Expression parser
struct ExpressionParser<'a> {
    input: &'a str,
    pos: usize,
    token_start: usize,
    current_token: Token,
}

impl<'a> ExpressionParser<'a> {
    fn new(input: &'a str) -> ParseResult<Self> {
        let mut parser = Self {
            input,
            pos: 0,
            token_start: 0,
            current_token: Token::Eof,
        };
        parser.advance_token()?;
        Ok(parser)
    }

    fn error<S: Into<String>>(&self, message: S) -> ParseError {
        ParseError::new(self.token_start, message)
    }

    // === Token scanning ===

    fn advance_token(&mut self) -> ParseResult<()> {
        self.skip_whitespace();
        self.token_start = self.pos;
        self.current_token = self.scan_token()?;
        Ok(())
    }

    fn scan_token(&mut self) -> ParseResult<Token> {
        let Some(c) = self.peek_char() else {
            return Ok(Token::Eof);
        };

        let single = match c {
            '+' => Some(Token::Plus),
            '-' => Some(Token::Minus),
            '*' => Some(Token::Star),
            '/' => Some(Token::Slash),
            '^' => Some(Token::Caret),
            ';' => Some(Token::Semicolon),
            '&' => Some(Token::Ampersand),
            '|' => Some(Token::Pipe),
            '#' => Some(Token::Hash),
            '.' => Some(Token::Dot),
            ':' => Some(Token::Colon),
            ',' => Some(Token::Comma),
            '(' => Some(Token::LeftParen),
            ')' => Some(Token::RightParen),
            '[' => Some(Token::LeftBracket),
            ']' => Some(Token::RightBracket),
            '{' => Some(Token::LeftBrace),
            '}' => Some(Token::RightBrace),
            _ => None,
        };
        if let Some(token) = single {
            self.advance();
            return Ok(token);
        }

        // Operators of one or two characters
        match c {
            '=' => {
                self.advance();
                if self.peek_char() == Some('~') {
                    self.advance();
                    return Ok(Token::EqualTilde);
                }
                return Ok(Token::Equal);
            }
            '<' => {
                self.advance();
                return Ok(match self.peek_char() {
                    Some('=') => {
                        self.advance();
                        Token::LessEqual
                    }
                    Some('>') => {
                        self.advance();
                        Token::NotEqual
                    }
                    _ => Token::LessThan,
                });
            }
            '>' => {
                self.advance();
                if self.peek_char() == Some('=') {
                    self.advance();
                    return Ok(Token::GreaterEqual);
                }
                return Ok(Token::GreaterThan);
            }
            _ => {}
        }

        if c == '"' {
            return self.scan_text();
        }
        if c == '`' {
            return self.scan_quoted_identifier();
        }
        if c.is_ascii_digit() {
            return Ok(self.scan_number());
        }
        if c == '@' {
            self.advance();
            let word = self.scan_word();
            if word == "entire" {
                return Ok(Token::AtEntire);
            }
            return Err(ParseError::new(self.token_start, format!("Unknown directive @{}", word)));
        }
        if c.is_ascii_alphabetic() || c == '_' {
            let name = self.scan_word();
            return Ok(Token::Identifier {
                name,
                quoted: false,
            });
        }

        Err(ParseError::new(self.pos, format!("Unexpected character '{}'", c)))
    }

    fn scan_text(&mut self) -> ParseResult<Token> {
        self.advance(); // Skip opening quote

        let mut s = String::new();
        loop {
            match self.peek_char() {
                Some('"') => {
                    self.advance();
                    // Check for escaped quote ("")
                    if self.peek_char() == Some('"') {
                        s.push('"');
                        self.advance();
                    } else {
                        return Ok(Token::Text(s));
                    }
                }
                Some(c) => {
                    s.push(c);
                    self.advance();
                }
                None => return Err(ParseError::new(self.token_start, "Unterminated text literal")),
            }
        }
    }

    fn scan_quoted_identifier(&mut self) -> ParseResult<Token> {
        self.advance(); // Skip opening backtick

        let mut name = String::new();
        loop {
            match self.peek_char() {
                Some('`') => {
                    self.advance();
                    if self.peek_char() == Some('`') {
                        name.push('`');
                        self.advance();
                    } else {
                        return Ok(Token::Identifier { name, quoted: true });
                    }
                }
                Some(c) => {
                    name.push(c);
                    self.advance();
                }
                None => return Err(ParseError::new(self.token_start, "Unterminated quoted name")),
            }
        }
    }

    fn scan_number(&mut self) -> Token {
        let start = self.pos;

        // Integer part
        while self.peek_char().map_or(false, |c| c.is_ascii_digit()) {
            self.advance();
        }

        // Decimal part, only when a digit follows the point
        if self.peek_char() == Some('.')
            && self.peek_char_at(1).map_or(false, |c| c.is_ascii_digit())
        {
            self.advance();
            while self.peek_char().map_or(false, |c| c.is_ascii_digit()) {
                self.advance();
            }
        }

        Token::Number(self.input[start..self.pos].to_string())
    }

    fn scan_word(&mut self) -> String {
        let start = self.pos;
        while self
            .peek_char()
            .map_or(false, |c| c.is_ascii_alphanumeric() || c == '_')
        {
            self.advance();
        }
        self.input[start..self.pos].to_string()
    }

    /// Raw text up to the next `}`, for literal bodies the tokenizer
    /// cannot split (dates and times). The current token must be `{`.
    fn raw_braced_body(&mut self) -> ParseResult<&'a str> {
        if self.current() != &Token::LeftBrace {
            return Err(self.error("Expected '{'"));
        }
        let rest = &self.input[self.pos..];
        let end = rest
            .find('}')
            .ok_or_else(|| ParseError::new(self.token_start, "Missing '}'"))?;
        let body = &rest[..end];
        self.pos += end + 1;
        self.advance_token()?;
        Ok(body)
    }

    // === Helper methods ===

    fn peek_char(&self) -> Option<char> {
        self.input[self.pos..].chars().next()
    }

    fn peek_char_at(&self, offset: usize) -> Option<char> {
        self.input[self.pos..].chars().nth(offset)
    }

    fn advance(&mut self) {
        if let Some(c) = self.peek_char() {
            self.pos += c.len_utf8();
        }
    }

    fn skip_whitespace(&mut self) {
        while self.peek_char().map_or(false, |c| c.is_whitespace()) {
            self.advance();
        }
    }

    fn current(&self) -> &Token {
        &self.current_token
    }

    /// The token after the current one, without consuming anything
    fn peek_next(&self) -> ParseResult<Token> {
        let mut ahead = ExpressionParser {
            input: self.input,
            pos: self.pos,
            token_start: self.pos,
            current_token: Token::Eof,
        };
        ahead.advance_token()?;
        Ok(ahead.current_token)
    }

    fn consume(&mut self) -> ParseResult<Token> {
        let token = std::mem::replace(&mut self.current_token, Token::Eof);
        self.advance_token()?;
        Ok(token)
    }

    fn expect(&mut self, expected: &Token) -> ParseResult<()> {
        if self.current() == expected {
            self.consume()?;
            Ok(())
        } else {
            Err(self.error(format!("Expected {:?}, got {:?}", expected, self.current())))
        }
    }

    fn expect_keyword(&mut self, keyword: &str) -> ParseResult<()> {
        if self.current().is_keyword(keyword) {
            self.consume()?;
            Ok(())
        } else {
            Err(self.error(format!("Expected '{}', got {:?}", keyword, self.current())))
        }
    }

    /// A name: plain identifier that is not a keyword, or any quoted name
    fn expect_name(&mut self) -> ParseResult<String> {
        match self.current().clone() {
            Token::Identifier { name, quoted } if quoted || !is_keyword(&name) => {
                self.consume()?;
                Ok(name)
            }
            other => Err(self.error(format!("Expected a name, got {:?}", other))),
        }
    }

    // === Expression parsing with precedence ===
    // Precedence (lowest to highest):
    // 1. Or: |
    // 2. And: &
    // 3. Comparison and equality chains: = =~ <> < <= > >=
    // 4. Concatenation: ;
    // 5. Addition/Subtraction: + -
    // 6. Multiplication/Division: * /
    // 7. Exponentiation: ^
    // 8. Unary: -
    // 9. Postfix: call, #field
    // 10. Primary: literals, names, brackets, keyword forms

    fn parse_expression(&mut self) -> ParseResult<Expression> {
        self.parse_or()
    }

    fn parse_or(&mut self) -> ParseResult<Expression> {
        let mut items = vec![self.parse_and()?];
        while self.current() == &Token::Pipe {
            self.consume()?;
            items.push(self.parse_and()?);
        }
        Ok(single_or(items, Expression::Or))
    }

    fn parse_and(&mut self) -> ParseResult<Expression> {
        let mut items = vec![self.parse_comparison()?];
        while self.current() == &Token::Ampersand {
            self.consume()?;
            items.push(self.parse_comparison()?);
        }
        Ok(single_or(items, Expression::And))
    }

    fn parse_comparison(&mut self) -> ParseResult<Expression> {
        let first = self.parse_concat()?;

        let mut operands = vec![first];
        let mut links: Vec<Token> = Vec::new();
        loop {
            let token = self.current().clone();
            match token {
                Token::Equal
                | Token::EqualTilde
                | Token::NotEqual
                | Token::LessThan
                | Token::LessEqual
                | Token::GreaterThan
                | Token::GreaterEqual => {
                    if links.last() == Some(&Token::EqualTilde) {
                        return Err(self.error("'=~' must be the last link of a chain"));
                    }
                    self.consume()?;
                    operands.push(self.parse_concat()?);
                    links.push(token);
                }
                _ => break,
            }
        }

        if links.is_empty() {
            return Ok(operands.remove(0));
        }

        if links.iter().all(|t| matches!(t, Token::Equal | Token::EqualTilde)) {
            return Ok(Expression::Equal {
                last_is_pattern: links.last() == Some(&Token::EqualTilde),
                operands,
            });
        }

        if links == [Token::NotEqual] {
            let right = operands.pop();
            let left = operands.pop();
            if let (Some(left), Some(right)) = (left, right) {
                return Ok(Expression::NotEqual {
                    left: Box::new(left),
                    right: Box::new(right),
                });
            }
        }

        let operators = links
            .iter()
            .map(|t| match t {
                Token::LessThan => Some(ComparisonOperator::LessThan),
                Token::LessEqual => Some(ComparisonOperator::LessEqual),
                Token::GreaterThan => Some(ComparisonOperator::GreaterThan),
                Token::GreaterEqual => Some(ComparisonOperator::GreaterEqual),
                _ => None,
            })
            .collect::<Option<Vec<_>>>()
            .ok_or_else(|| self.error("Cannot mix equality and ordering in one chain; add brackets"))?;

        Ok(Expression::Comparison {
            operands,
            operators,
        })
    }

    fn parse_concat(&mut self) -> ParseResult<Expression> {
        let mut items = vec![self.parse_additive()?];
        while self.current() == &Token::Semicolon {
            self.consume()?;
            items.push(self.parse_additive()?);
        }
        Ok(single_or(items, Expression::Concat))
    }

    fn parse_additive(&mut self) -> ParseResult<Expression> {
        let mut operands = vec![self.parse_multiplicative()?];
        let mut operators = Vec::new();

        loop {
            let op = match self.current() {
                Token::Plus => AddSubtractOp::Add,
                Token::Minus => AddSubtractOp::Subtract,
                _ => break,
            };

            self.consume()?;
            operands.push(self.parse_multiplicative()?);
            operators.push(op);
        }

        if operators.is_empty() {
            return Ok(operands.remove(0));
        }
        Ok(Expression::AddSubtract {
            operands,
            operators,
        })
    }

    fn parse_multiplicative(&mut self) -> ParseResult<Expression> {
        let mut factors = vec![self.parse_exponent()?];

        loop {
            match self.current() {
                Token::Star => {
                    self.consume()?;
                    factors.push(self.parse_exponent()?);
                }
                Token::Slash => {
                    self.consume()?;
                    let denominator = self.parse_exponent()?;
                    let numerator = single_or(std::mem::take(&mut factors), Expression::Times);
                    factors.push(Expression::Divide {
                        numerator: Box::new(numerator),
                        denominator: Box::new(denominator),
                    });
                }
                _ => break,
            }
        }

        Ok(single_or(factors, Expression::Times))
    }

    fn parse_exponent(&mut self) -> ParseResult<Expression> {
        let base = self.parse_unary()?;

        if self.current() == &Token::Caret {
            self.consume()?;
            let exponent = self.parse_unary()?;
            if self.current() == &Token::Caret {
                return Err(self.error("Chained '^' is ambiguous; add brackets"));
            }
            return Ok(Expression::Raise {
                base: Box::new(base),
                exponent: Box::new(exponent),
            });
        }

        Ok(base)
    }

    fn parse_unary(&mut self) -> ParseResult<Expression> {
        if self.current() == &Token::Minus {
            self.consume()?;
            // A minus directly on a number literal is part of the literal
            let literal = matches!(self.current(), Token::Number(_));
            let operand = self.parse_unary()?;
            return Ok(match operand {
                Expression::Number { value, unit } if literal => Expression::Number {
                    value: -value,
                    unit,
                },
                other => Expression::Negate(Box::new(other)),
            });
        }

        self.parse_postfix()
    }

    fn parse_postfix(&mut self) -> ParseResult<Expression> {
        let mut expr = self.parse_primary()?;

        loop {
            match self.current() {
                Token::LeftParen => {
                    self.consume()?;
                    let args = self.parse_list(&Token::RightParen)?;
                    expr = Expression::Call {
                        function: Box::new(expr),
                        args,
                    };
                }
                Token::Hash => {
                    self.consume()?;
                    let field = self.expect_name()?;
                    expr = Expression::FieldAccess {
                        record: Box::new(expr),
                        field,
                    };
                }
                _ => break,
            }
        }

        Ok(expr)
    }

    /// Comma-separated expressions up to `close`, which is consumed
    fn parse_list(&mut self, close: &Token) -> ParseResult<Vec<Expression>> {
        let mut items = Vec::new();
        if self.current() == close {
            self.consume()?;
            return Ok(items);
        }
        loop {
            items.push(self.parse_expression()?);
            if self.current() == &Token::Comma {
                self.consume()?;
            } else {
                self.expect(close)?;
                return Ok(items);
            }
        }
    }

    fn parse_primary(&mut self) -> ParseResult<Expression> {
        match self.current().clone() {
            Token::Number(text) => {
                self.consume()?;
                let value = Decimal::from_str(&text)
                    .map_err(|_| self.error(format!("Number out of range: {}", text)))?;
                let unit = if self.current() == &Token::LeftBrace {
                    self.consume()?;
                    let unit = self.parse_unit()?;
                    self.expect(&Token::RightBrace)?;
                    unit
                } else {
                    UnitExpression::Scalar
                };
                Ok(Expression::Number { value, unit })
            }
            Token::Text(s) => {
                self.consume()?;
                Ok(Expression::Text(s))
            }
            Token::AtEntire => {
                self.consume()?;
                let first = self.expect_name()?;
                if self.current() == &Token::Dot {
                    self.consume()?;
                    let column = self.expect_name()?;
                    Ok(Expression::EntireColumn {
                        table: Some(TableId::new(first)),
                        column,
                    })
                } else {
                    Ok(Expression::EntireColumn {
                        table: None,
                        column: first,
                    })
                }
            }
            Token::Identifier { name, quoted: true } => {
                self.consume()?;
                Ok(Expression::Identifier(name))
            }
            Token::Identifier { name, quoted: false } => self.parse_word(name),
            Token::LeftParen => {
                self.consume()?;
                self.parse_bracketed()
            }
            Token::LeftBracket => {
                self.consume()?;
                Ok(Expression::Array(self.parse_list(&Token::RightBracket)?))
            }
            other => Err(self.error(format!("Unexpected {:?}", other))),
        }
    }

    /// A bare word: keyword form, placeholder or identifier
    fn parse_word(&mut self, word: String) -> ParseResult<Expression> {
        match word.as_str() {
            "true" | "false" => {
                self.consume()?;
                Ok(Expression::Boolean(word == "true"))
            }
            "_" => {
                self.consume()?;
                Ok(Expression::MatchAnything)
            }
            "if" => self.parse_if(),
            "match" => self.parse_match(),
            "define" => self.parse_define(),
            "type" => {
                self.consume()?;
                self.expect(&Token::LeftBrace)?;
                let ty = self.parse_type()?;
                self.expect(&Token::RightBrace)?;
                Ok(Expression::TypeLiteral(ty))
            }
            "date" | "time" | "datetime" => {
                self.consume()?;
                let kind = TemporalKind::from_keyword(&word)
                    .ok_or_else(|| self.error(format!("Unknown literal kind {}", word)))?;
                let start = self.token_start;
                let body = self.raw_braced_body()?;
                let value = TemporalValue::parse(kind, body)
                    .map_err(|e| ParseError::new(start, e.to_string()))?;
                Ok(Expression::Temporal(value))
            }
            other if is_keyword(other) => Err(self.error(format!("Unexpected keyword '{}'", other))),
            _ => {
                self.consume()?;
                Ok(Expression::Identifier(word))
            }
        }
    }

    /// After `(`: a record `(a: 1, b: 2)`, `()` or a bracketed expression
    fn parse_bracketed(&mut self) -> ParseResult<Expression> {
        if self.current() == &Token::RightParen {
            self.consume()?;
            return Ok(Expression::Record(Vec::new()));
        }

        let is_record = matches!(self.current(), Token::Identifier { .. })
            && self.peek_next()? == Token::Colon;
        if !is_record {
            let inner = self.parse_expression()?;
            self.expect(&Token::RightParen)?;
            return Ok(inner);
        }

        let mut fields = Vec::new();
        loop {
            let name = self.expect_name()?;
            self.expect(&Token::Colon)?;
            fields.push((name, self.parse_expression()?));
            if self.current() == &Token::Comma {
                self.consume()?;
            } else {
                self.expect(&Token::RightParen)?;
                return Ok(Expression::Record(fields));
            }
        }
    }

    fn parse_if(&mut self) -> ParseResult<Expression> {
        self.expect_keyword("if")?;
        let condition = self.parse_expression()?;
        self.expect_keyword("then")?;
        let then_branch = self.parse_expression()?;
        self.expect_keyword("else")?;
        let else_branch = self.parse_expression()?;
        self.expect_keyword("endif")?;
        Ok(Expression::IfThenElse {
            condition: Box::new(condition),
            then_branch: Box::new(then_branch),
            else_branch: Box::new(else_branch),
        })
    }

    fn parse_match(&mut self) -> ParseResult<Expression> {
        self.expect_keyword("match")?;
        let subject = self.parse_expression()?;

        let mut clauses = Vec::new();
        while self.current().is_keyword("case") {
            self.consume()?;
            let mut patterns = vec![self.parse_clause_pattern()?];
            while self.current().is_keyword("orcase") {
                self.consume()?;
                patterns.push(self.parse_clause_pattern()?);
            }
            self.expect_keyword("then")?;
            let outcome = self.parse_expression()?;
            clauses.push(MatchClause { patterns, outcome });
        }
        if clauses.is_empty() {
            return Err(self.error("A match needs at least one case"));
        }
        self.expect_keyword("endmatch")?;

        Ok(Expression::Match {
            subject: Box::new(subject),
            clauses,
        })
    }

    fn parse_clause_pattern(&mut self) -> ParseResult<ClausePattern> {
        let pattern = self.parse_expression()?;
        let guard = if self.current().is_keyword("given") {
            self.consume()?;
            Some(self.parse_expression()?)
        } else {
            None
        };
        Ok(ClausePattern { pattern, guard })
    }

    fn parse_define(&mut self) -> ParseResult<Expression> {
        self.expect_keyword("define")?;
        let mut definitions = Vec::new();
        loop {
            // Parsed above the equality level so the `=` is not swallowed
            let pattern = self.parse_concat()?;
            self.expect(&Token::Equal)?;
            let value = self.parse_expression()?;
            definitions.push(Definition { pattern, value });
            if self.current() == &Token::Comma {
                self.consume()?;
            } else {
                break;
            }
        }
        self.expect_keyword("then")?;
        let body = self.parse_expression()?;
        self.expect_keyword("enddefine")?;
        Ok(Expression::Define {
            definitions,
            body: Box::new(body),
        })
    }

    // === Unit syntax ===

    fn parse_unit(&mut self) -> ParseResult<UnitExpression> {
        let mut left = self.parse_unit_factor()?;
        loop {
            match self.current() {
                Token::Star => {
                    self.consume()?;
                    let right = self.parse_unit_factor()?;
                    left = match left {
                        UnitExpression::Times(mut items) => {
                            items.push(right);
                            UnitExpression::Times(items)
                        }
                        other => UnitExpression::Times(vec![other, right]),
                    };
                }
                Token::Slash => {
                    self.consume()?;
                    let right = self.parse_unit_factor()?;
                    left = UnitExpression::Divide(Box::new(left), Box::new(right));
                }
                _ => return Ok(left),
            }
        }
    }

    fn parse_unit_factor(&mut self) -> ParseResult<UnitExpression> {
        let base = match self.current().clone() {
            Token::Identifier { name, .. } => {
                self.consume()?;
                UnitExpression::Named(name)
            }
            Token::Number(text) if text == "1" => {
                self.consume()?;
                UnitExpression::Scalar
            }
            Token::LeftParen => {
                self.consume()?;
                let inner = self.parse_unit()?;
                self.expect(&Token::RightParen)?;
                inner
            }
            other => return Err(self.error(format!("Expected a unit, got {:?}", other))),
        };

        if self.current() != &Token::Caret {
            return Ok(base);
        }
        self.consume()?;
        let power = if self.current() == &Token::LeftParen {
            self.consume()?;
            let numerator = self.parse_signed_integer()?;
            let denominator = if self.current() == &Token::Slash {
                self.consume()?;
                self.parse_signed_integer()?
            } else {
                1
            };
            self.expect(&Token::RightParen)?;
            if denominator == 0 {
                return Err(self.error("Unit power has a zero denominator"));
            }
            Rational::checked_new(numerator, denominator)
                .ok_or_else(|| self.error("Unit power out of range"))?
        } else {
            Rational::integer(self.parse_signed_integer()?)
        };
        Ok(UnitExpression::Raise(Box::new(base), power))
    }

    fn parse_signed_integer(&mut self) -> ParseResult<i64> {
        let negative = if self.current() == &Token::Minus {
            self.consume()?;
            true
        } else {
            false
        };
        match self.current().clone() {
            Token::Number(text) => {
                let n: i64 = text
                    .parse()
                    .map_err(|_| self.error(format!("Expected a whole number, got {}", text)))?;
                self.consume()?;
                Ok(if negative { -n } else { n })
            }
            other => Err(self.error(format!("Expected a whole number, got {:?}", other))),
        }
    }

    // === Type syntax ===

    fn parse_type(&mut self) -> ParseResult<TypeSyntax> {
        match self.current().clone() {
            Token::LeftBracket => {
                self.consume()?;
                let inner = self.parse_type()?;
                self.expect(&Token::RightBracket)?;
                Ok(TypeSyntax::Array(Box::new(inner)))
            }
            Token::LeftParen => {
                self.consume()?;
                let mut fields = Vec::new();
                if self.current() != &Token::RightParen {
                    loop {
                        let name = self.expect_name()?;
                        self.expect(&Token::Colon)?;
                        fields.push((name, self.parse_type()?));
                        if self.current() == &Token::Comma {
                            self.consume()?;
                        } else {
                            break;
                        }
                    }
                }
                self.expect(&Token::RightParen)?;
                Ok(TypeSyntax::Record(fields))
            }
            Token::Identifier { name, .. } => {
                self.consume()?;
                match name.as_str() {
                    "Number" => {
                        if self.current() == &Token::LeftBrace {
                            self.consume()?;
                            let unit = self.parse_unit()?;
                            self.expect(&Token::RightBrace)?;
                            Ok(TypeSyntax::Number(unit))
                        } else {
                            Ok(TypeSyntax::Number(UnitExpression::Scalar))
                        }
                    }
                    "Text" => Ok(TypeSyntax::Text),
                    "Boolean" => Ok(TypeSyntax::Boolean),
                    "Date" => Ok(TypeSyntax::Temporal(TemporalKind::Date)),
                    "Time" => Ok(TypeSyntax::Temporal(TemporalKind::Time)),
                    "DateTime" => Ok(TypeSyntax::Temporal(TemporalKind::DateTime)),
                    _ => {
                        let mut params = Vec::new();
                        if self.current() == &Token::LeftParen {
                            self.consume()?;
                            loop {
                                params.push(self.parse_type()?);
                                if self.current() == &Token::Comma {
                                    self.consume()?;
                                } else {
                                    break;
                                }
                            }
                            self.expect(&Token::RightParen)?;
                        }
                        Ok(TypeSyntax::Tagged { name, params })
                    }
                }
            }
            other => Err(self.error(format!("Expected a type, got {:?}", other))),
        }
    }
}

/// The only item, or all items wrapped by `wrap`
fn single_or(mut items: Vec<Expression>, wrap: fn(Vec<Expression>) -> Expression) -> Expression {
    if items.len() == 1 {
        items.remove(0)
    } else {
        wrap(items)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn parse(text: &str) -> Expression {
        parse_expression(text).unwrap()
    }

    #[test]
    fn test_parse_literals() {
        assert_eq!(parse("42"), Expression::number(42));
        assert_eq!(parse("-3"), Expression::number(-3));
        assert_eq!(parse("\"say \"\"hi\"\"\""), Expression::text("say \"hi\""));
        assert_eq!(parse("true"), Expression::Boolean(true));
        assert_eq!(
            parse("date{2024-02-29}"),
            Expression::Temporal(TemporalValue::parse(TemporalKind::Date, "2024-02-29").unwrap())
        );
    }

    #[test]
    fn test_parse_units() {
        let expr = parse("9.81{m/s^2}");
        assert_eq!(
            expr,
            Expression::Number {
                value: Decimal::new(981, 2),
                unit: UnitExpression::Divide(
                    Box::new(UnitExpression::Named("m".into())),
                    Box::new(UnitExpression::Raise(
                        Box::new(UnitExpression::Named("s".into())),
                        Rational::integer(2)
                    ))
                ),
            }
        );
        let root = parse("1{m^(1/2)}");
        assert!(matches!(
            root,
            Expression::Number { unit: UnitExpression::Raise(_, p), .. } if p == Rational::new(1, 2)
        ));
        let inverse = parse("1{s^-1}");
        assert!(matches!(
            inverse,
            Expression::Number { unit: UnitExpression::Raise(_, p), .. } if p == -Rational::ONE
        ));
    }

    #[test]
    fn test_precedence() {
        assert_eq!(
            parse("1 + 2 * 3"),
            Expression::add(
                Expression::number(1),
                Expression::Times(vec![Expression::number(2), Expression::number(3)])
            )
        );
        assert_eq!(
            parse("a | b & c"),
            Expression::Or(vec![
                Expression::ident("a"),
                Expression::And(vec![Expression::ident("b"), Expression::ident("c")])
            ])
        );
        assert_eq!(
            parse("-x ^ 2"),
            Expression::Raise {
                base: Box::new(Expression::Negate(Box::new(Expression::ident("x")))),
                exponent: Box::new(Expression::number(2)),
            }
        );
    }

    #[test]
    fn test_divide_chain() {
        assert_eq!(
            parse("a * b / c"),
            Expression::Divide {
                numerator: Box::new(Expression::Times(vec![
                    Expression::ident("a"),
                    Expression::ident("b")
                ])),
                denominator: Box::new(Expression::ident("c")),
            }
        );
    }

    #[test]
    fn test_chains() {
        assert!(matches!(
            parse("1 < x <= 3"),
            Expression::Comparison { ref operators, .. } if operators.len() == 2
        ));
        assert!(matches!(
            parse("x =~ Some(n)"),
            Expression::Equal { last_is_pattern: true, .. }
        ));
        assert!(matches!(parse("a <> b"), Expression::NotEqual { .. }));
        assert!(parse_expression("a = b < c").is_err());
        assert!(parse_expression("a =~ b = c").is_err());
    }

    #[test]
    fn test_records_and_brackets() {
        assert_eq!(
            parse("(a: 1, b: \"x\")"),
            Expression::Record(vec![
                ("a".into(), Expression::number(1)),
                ("b".into(), Expression::text("x")),
            ])
        );
        assert_eq!(parse("(a)"), Expression::ident("a"));
        assert_eq!(
            parse("r#a"),
            Expression::FieldAccess {
                record: Box::new(Expression::ident("r")),
                field: "a".into()
            }
        );
    }

    #[test]
    fn test_keyword_forms() {
        let expr = parse("if x =~ Some(n) then n + 1 else 0 endif");
        assert!(matches!(expr, Expression::IfThenElse { .. }));

        let expr = parse("match x case 1 orcase 2 then \"low\" case _ given true then \"other\" endmatch");
        match expr {
            Expression::Match { clauses, .. } => {
                assert_eq!(clauses.len(), 2);
                assert_eq!(clauses[0].patterns.len(), 2);
                assert!(clauses[1].patterns[0].guard.is_some());
            }
            other => panic!("expected match, got {:?}", other),
        }

        let expr = parse("define (a: x) = r, y = x + 1 then y enddefine");
        assert!(matches!(expr, Expression::Define { ref definitions, .. } if definitions.len() == 2));
    }

    #[test]
    fn test_entire_and_type() {
        assert_eq!(
            parse("@entire Runs.distance"),
            Expression::EntireColumn {
                table: Some(TableId::new("Runs")),
                column: "distance".into()
            }
        );
        assert_eq!(
            parse("type{Optional(Number{m})}"),
            Expression::TypeLiteral(TypeSyntax::Tagged {
                name: "Optional".into(),
                params: vec![TypeSyntax::Number(UnitExpression::Named("m".into()))],
            })
        );
    }

    #[test]
    fn test_quoted_names() {
        assert_eq!(parse("`unit price`"), Expression::ident("unit price"));
        assert_eq!(parse("`then`"), Expression::ident("then"));
    }

    #[test]
    fn test_errors_have_positions() {
        let err = parse_expression("1 + ").unwrap_err();
        assert_eq!(err.position, 4);
        assert!(parse_expression("\"open").is_err());
        assert!(parse_expression("1 $ 2").is_err());
        assert!(parse_expression("date{2024-13-01}").is_err());
    }

    #[test]
    fn test_display_reparses() {
        for text in [
            "(1 + 2) * x",
            "5{m} ^ 2",
            "if (x =~ Some(n)) then n + 1 else 0 endif",
            "match x case (a: _, b: y) given y > 0 then y endmatch",
            "[1, 2, 3]",
            "upper(\"a\" ; \"b\")",
            "type{[(a: Number{m/s}, b: Text)]}",
        ] {
            let expr = parse(text);
            assert_eq!(parse(&expr.to_string()), expr, "{}", text);
        }
    }
}
