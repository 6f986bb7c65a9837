//! Recursive-descent parser for the filter DSL.
//!
//! Grammar:
//! ```text
//! expression := ternary
//! ternary    := or_expr ('?' ternary ':' ternary)?        // right-associative
//! or_expr    := and_expr ('OR' and_expr)*
//! and_expr   := factor ('AND' factor)*
//! factor     := 'NOT' factor | '(' expression ')' | literal | condition
//! condition  := field compare_op value
//!             | field 'BETWEEN' value 'AND' value
//!             | field 'IN' '[' value (',' value)* ']'
//!             | field string_op string
//!             | field 'IS' 'NULL' | field 'IS' 'NOT' 'NULL'
//! compare_op := '=' | '!=' | '<' | '<=' | '>' | '>='
//! string_op  := 'CONTAINS' | 'STARTSWITH' | 'ENDSWITH' | 'LIKE' | 'MATCHES'
//! ```
//! One method per grammar level, operator precedence encoded by call
//! nesting rather than a precedence table.

use crate::error::FilterParseError;
use crate::filter::ast::{
    BoolOp, CompareOp, CompositeFilter, FilterAst, InFilter, NullFilter, RangeFilter, RegexFilter,
    StringFilter, StringOp, TernaryFilter, ValueFilter,
};
use crate::filter::lexer::{Lexer, PositionedToken, Token};
use crate::types::FieldValue;

pub struct Parser {
    tokens: Vec<PositionedToken>,
    pos: usize,
    src: String,
}

pub fn parse(src: &str) -> Result<FilterAst, FilterParseError> {
    let tokens = Lexer::new(src).tokenize()?;
    let mut parser = Parser {
        tokens,
        pos: 0,
        src: src.to_string(),
    };
    let ast = parser.expression()?;
    parser.expect_eof()?;
    Ok(ast)
}

impl Parser {
    fn peek(&self) -> &Token {
        &self.tokens[self.pos].token
    }

    fn position(&self) -> usize {
        self.tokens[self.pos].position
    }

    fn bump(&mut self) -> Token {
        let t = self.tokens[self.pos].token.clone();
        if self.pos + 1 < self.tokens.len() {
            self.pos += 1;
        }
        t
    }

    fn err(&self, message: impl Into<String>) -> FilterParseError {
        FilterParseError {
            message: message.into(),
            original_expression: self.src.clone(),
            char_position: self.position(),
            suggestion: None,
        }
    }

    fn expect_eof(&self) -> Result<(), FilterParseError> {
        if *self.peek() == Token::Eof {
            Ok(())
        } else {
            Err(self.err(format!("unexpected trailing token `{:?}`", self.peek())))
        }
    }

    fn expect(&mut self, expected: &Token) -> Result<(), FilterParseError> {
        if self.peek() == expected {
            self.bump();
            Ok(())
        } else {
            Err(self.err(format!("expected `{expected:?}`, found `{:?}`", self.peek())))
        }
    }

    fn expression(&mut self) -> Result<FilterAst, FilterParseError> {
        self.ternary()
    }

    fn ternary(&mut self) -> Result<FilterAst, FilterParseError> {
        let cond = self.or_expr()?;
        if *self.peek() == Token::Question {
            self.bump();
            let if_true = self.ternary()?;
            self.expect(&Token::Colon)?;
            let if_false = self.ternary()?;
            return Ok(FilterAst::Ternary(Box::new(TernaryFilter { cond, if_true, if_false })));
        }
        Ok(cond)
    }

    fn or_expr(&mut self) -> Result<FilterAst, FilterParseError> {
        let mut left = self.and_expr()?;
        while *self.peek() == Token::Or {
            self.bump();
            let right = self.and_expr()?;
            left = FilterAst::Composite(Box::new(CompositeFilter {
                op: BoolOp::Or,
                left,
                right: Some(right),
            }));
        }
        Ok(left)
    }

    fn and_expr(&mut self) -> Result<FilterAst, FilterParseError> {
        let mut left = self.factor()?;
        while *self.peek() == Token::And {
            self.bump();
            let right = self.factor()?;
            left = FilterAst::Composite(Box::new(CompositeFilter {
                op: BoolOp::And,
                left,
                right: Some(right),
            }));
        }
        Ok(left)
    }

    fn factor(&mut self) -> Result<FilterAst, FilterParseError> {
        match self.peek() {
            Token::Not => {
                self.bump();
                let inner = self.factor()?;
                Ok(FilterAst::Composite(Box::new(CompositeFilter {
                    op: BoolOp::Not,
                    left: inner,
                    right: None,
                })))
            }
            Token::LParen => {
                self.bump();
                let inner = self.expression()?;
                self.expect(&Token::RParen)?;
                Ok(inner)
            }
            Token::True => {
                self.bump();
                Ok(FilterAst::Literal(FieldValue::Bool(true)))
            }
            Token::False => {
                self.bump();
                Ok(FilterAst::Literal(FieldValue::Bool(false)))
            }
            Token::Str(_) | Token::Int(_) | Token::Float(_) | Token::Null => {
                Ok(FilterAst::Literal(self.literal_value()?))
            }
            _ => self.condition(),
        }
    }

    fn condition(&mut self) -> Result<FilterAst, FilterParseError> {
        let field = match self.bump() {
            Token::Ident(name) => name,
            other => return Err(self.err(format!("expected a field name, found `{other:?}`"))),
        };

        match self.peek().clone() {
            Token::Eq | Token::Neq | Token::Lt | Token::Le | Token::Gt | Token::Ge => {
                let op = match self.bump() {
                    Token::Eq => CompareOp::Eq,
                    Token::Neq => CompareOp::Neq,
                    Token::Lt => CompareOp::Lt,
                    Token::Le => CompareOp::Le,
                    Token::Gt => CompareOp::Gt,
                    Token::Ge => CompareOp::Ge,
                    _ => unreachable!(),
                };
                let value = self.literal_value()?;
                Ok(FilterAst::Value(ValueFilter { field, op, value }))
            }
            Token::Between => {
                self.bump();
                let min = self.literal_value()?;
                self.expect(&Token::And)?;
                let max = self.literal_value()?;
                Ok(FilterAst::Range(RangeFilter {
                    field,
                    min: Some(min),
                    max: Some(max),
                    min_inclusive: true,
                    max_inclusive: true,
                }))
            }
            Token::In => {
                self.bump();
                self.expect(&Token::LBracket)?;
                let mut values = Vec::new();
                if *self.peek() != Token::RBracket {
                    values.push(self.literal_value()?);
                    while *self.peek() == Token::Comma {
                        self.bump();
                        values.push(self.literal_value()?);
                    }
                }
                self.expect(&Token::RBracket)?;
                Ok(FilterAst::In(InFilter { field, values }))
            }
            Token::Contains | Token::StartsWith | Token::EndsWith | Token::Like => {
                let op = match self.bump() {
                    Token::Contains => StringOp::Contains,
                    Token::StartsWith => StringOp::StartsWith,
                    Token::EndsWith => StringOp::EndsWith,
                    Token::Like => StringOp::Like,
                    _ => unreachable!(),
                };
                let pattern = self.string_literal()?;
                Ok(FilterAst::StringOp(StringFilter { field, op, pattern }))
            }
            Token::Matches => {
                self.bump();
                let pattern = self.string_literal()?;
                Ok(FilterAst::Regex(RegexFilter { field, pattern }))
            }
            Token::Is => {
                self.bump();
                let negate = if *self.peek() == Token::Not {
                    self.bump();
                    true
                } else {
                    false
                };
                self.expect(&Token::Null)?;
                Ok(FilterAst::Null(NullFilter {
                    field,
                    is_null: !negate,
                }))
            }
            other => Err(self.err(format!("expected a comparison operator after `{field}`, found `{other:?}`"))),
        }
    }

    fn string_literal(&mut self) -> Result<String, FilterParseError> {
        match self.bump() {
            Token::Str(s) => Ok(s),
            other => Err(self.err(format!("expected a string literal, found `{other:?}`"))),
        }
    }

    fn literal_value(&mut self) -> Result<FieldValue, FilterParseError> {
        match self.bump() {
            Token::Str(s) => Ok(FieldValue::Str(s)),
            Token::Int(i) => Ok(FieldValue::Int(i)),
            Token::Float(f) => Ok(FieldValue::Float(f)),
            Token::True => Ok(FieldValue::Bool(true)),
            Token::False => Ok(FieldValue::Bool(false)),
            Token::Null => Ok(FieldValue::Null),
            other => Err(self.err(format!("expected a literal value, found `{other:?}`"))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_simple_comparison() {
        let ast = parse("year >= 2000").unwrap();
        assert!(matches!(ast, FilterAst::Value(ValueFilter { op: CompareOp::Ge, .. })));
    }

    #[test]
    fn parses_and_or_precedence() {
        // AND binds tighter than OR: `a OR b AND c` == `a OR (b AND c)`.
        let ast = parse("genre = \"scifi\" OR year = 1999 AND rating = 5").unwrap();
        match ast {
            FilterAst::Composite(cf) => {
                assert_eq!(cf.op, BoolOp::Or);
                assert!(matches!(cf.right, Some(FilterAst::Composite(_))));
            }
            _ => panic!("expected composite OR"),
        }
    }

    #[test]
    fn parses_ternary() {
        let ast = parse("age >= 18 ? \"adult\" == \"adult\" : \"minor\" == \"minor\"").unwrap();
        assert!(matches!(ast, FilterAst::Ternary(_)));
    }

    #[test]
    fn parses_in_list() {
        let ast = parse("genre IN [\"scifi\", \"drama\"]").unwrap();
        match ast {
            FilterAst::In(inf) => assert_eq!(inf.values.len(), 2),
            _ => panic!("expected IN filter"),
        }
    }

    #[test]
    fn parses_is_not_null() {
        let ast = parse("email IS NOT NULL").unwrap();
        match ast {
            FilterAst::Null(nf) => assert!(!nf.is_null),
            _ => panic!("expected null filter"),
        }
    }

    #[test]
    fn reports_parse_error_with_position() {
        let err = parse("year >=").unwrap_err();
        assert!(err.char_position > 0);
    }
}
