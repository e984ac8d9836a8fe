//! Safe arithmetic evaluator behind the `calculator` tool.
//!
//! A small recursive-descent parser over numbers, `+ - * / ^` (and `×`, `÷`),
//! unary signs and parentheses. Anything else is rejected; nothing is ever
//! evaluated as code.

use async_trait::async_trait;
use serde_json::{json, Value};

use crate::domain::errors::{ToolFailure, ToolFailureKind};
use crate::domain::ports::{ToolOutput, ToolRuntime};
use crate::services::executors::compute::CALCULATOR_TOOL;

const MAX_EXPRESSION_CHARS: usize = 256;
const MAX_DEPTH: usize = 32;

#[derive(Debug, Clone, Copy, PartialEq)]
enum Token {
    Number(f64),
    Plus,
    Minus,
    Star,
    Slash,
    Caret,
    Open,
    Close,
}

fn unsupported(message: impl Into<String>) -> ToolFailure {
    ToolFailure::new(ToolFailureKind::Unsupported, message)
}

fn tokenize(expression: &str) -> Result<Vec<Token>, ToolFailure> {
    let mut tokens = Vec::new();
    let mut chars = expression.chars().peekable();
    while let Some(&c) = chars.peek() {
        let token = match c {
            c if c.is_whitespace() => {
                chars.next();
                continue;
            }
            '0'..='9' | '.' => {
                let mut literal = String::new();
                while let Some(&d) = chars.peek() {
                    if d.is_ascii_digit() || d == '.' {
                        literal.push(d);
                        chars.next();
                    } else {
                        break;
                    }
                }
                let value = literal
                    .parse::<f64>()
                    .map_err(|_| unsupported(format!("invalid number '{literal}'")))?;
                tokens.push(Token::Number(value));
                continue;
            }
            '+' => Token::Plus,
            '-' | '−' => Token::Minus,
            '*' | '×' | 'x' => Token::Star,
            '/' | '÷' => Token::Slash,
            '^' => Token::Caret,
            '(' => Token::Open,
            ')' => Token::Close,
            other => return Err(unsupported(format!("unsupported character '{other}'"))),
        };
        tokens.push(token);
        chars.next();
    }
    Ok(tokens)
}

struct Parser {
    tokens: Vec<Token>,
    position: usize,
    depth: usize,
}

impl Parser {
    fn peek(&self) -> Option<Token> {
        self.tokens.get(self.position).copied()
    }

    fn advance(&mut self) -> Option<Token> {
        let token = self.peek();
        self.position += 1;
        token
    }

    fn descend(&mut self) -> Result<(), ToolFailure> {
        self.depth += 1;
        if self.depth > MAX_DEPTH {
            return Err(unsupported("expression nested too deeply"));
        }
        Ok(())
    }

    fn expression(&mut self) -> Result<f64, ToolFailure> {
        let mut value = self.term()?;
        while let Some(op @ (Token::Plus | Token::Minus)) = self.peek() {
            self.advance();
            let rhs = self.term()?;
            value = if op == Token::Plus { value + rhs } else { value - rhs };
        }
        Ok(value)
    }

    fn term(&mut self) -> Result<f64, ToolFailure> {
        let mut value = self.unary()?;
        while let Some(op @ (Token::Star | Token::Slash)) = self.peek() {
            self.advance();
            let rhs = self.unary()?;
            if op == Token::Slash {
                if rhs == 0.0 {
                    return Err(ToolFailure::new(ToolFailureKind::Runtime, "division by zero"));
                }
                value /= rhs;
            } else {
                value *= rhs;
            }
        }
        Ok(value)
    }

    fn unary(&mut self) -> Result<f64, ToolFailure> {
        match self.peek() {
            Some(Token::Minus) => {
                self.advance();
                self.descend()?;
                let value = -self.unary()?;
                self.depth -= 1;
                Ok(value)
            }
            Some(Token::Plus) => {
                self.advance();
                self.unary()
            }
            _ => self.power(),
        }
    }

    fn power(&mut self) -> Result<f64, ToolFailure> {
        let base = self.atom()?;
        if self.peek() == Some(Token::Caret) {
            self.advance();
            self.descend()?;
            let exponent = self.unary()?;
            self.depth -= 1;
            return Ok(base.powf(exponent));
        }
        Ok(base)
    }

    fn atom(&mut self) -> Result<f64, ToolFailure> {
        match self.advance() {
            Some(Token::Number(value)) => Ok(value),
            Some(Token::Open) => {
                self.descend()?;
                let value = self.expression()?;
                if self.advance() != Some(Token::Close) {
                    return Err(unsupported("unbalanced parentheses"));
                }
                self.depth -= 1;
                Ok(value)
            }
            Some(token) => Err(unsupported(format!("unexpected {token:?}"))),
            None => Err(unsupported("unexpected end of expression")),
        }
    }
}

/// Evaluate an arithmetic expression.
pub fn evaluate(expression: &str) -> Result<f64, ToolFailure> {
    if expression.chars().count() > MAX_EXPRESSION_CHARS {
        return Err(unsupported("expression too long"));
    }
    let tokens = tokenize(expression)?;
    if tokens.is_empty() {
        return Err(ToolFailure::new(
            ToolFailureKind::InvalidArguments,
            "empty expression",
        ));
    }
    let mut parser = Parser {
        tokens,
        position: 0,
        depth: 0,
    };
    let value = parser.expression()?;
    if parser.position < parser.tokens.len() {
        return Err(unsupported("trailing input after expression"));
    }
    if !value.is_finite() {
        return Err(ToolFailure::new(
            ToolFailureKind::Runtime,
            "result is not a finite number",
        ));
    }
    Ok(value)
}

/// Integers print without a fraction; other values keep at most ten decimals.
fn render(value: f64) -> String {
    if value.fract() == 0.0 && value.abs() < 1e15 {
        format!("{}", value as i64)
    } else {
        let fixed = format!("{value:.10}");
        fixed.trim_end_matches('0').trim_end_matches('.').to_string()
    }
}

/// Tool runtime exposing the arithmetic evaluator as `calculator`.
#[derive(Debug, Clone, Copy, Default)]
pub struct ArithmeticToolRuntime;

impl ArithmeticToolRuntime {
    pub const fn new() -> Self {
        Self
    }
}

#[async_trait]
impl ToolRuntime for ArithmeticToolRuntime {
    async fn run(&self, tool: &str, args: &Value) -> Result<ToolOutput, ToolFailure> {
        if tool != CALCULATOR_TOOL {
            return Err(ToolFailure::new(
                ToolFailureKind::UnknownTool,
                format!("unknown tool '{tool}'"),
            ));
        }
        let expression = args
            .get("expression")
            .and_then(Value::as_str)
            .ok_or_else(|| {
                ToolFailure::new(
                    ToolFailureKind::InvalidArguments,
                    "missing string argument 'expression'",
                )
            })?;
        let value = evaluate(expression)?;
        Ok(ToolOutput {
            rendered: render(value),
            value: json!(value),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_precedence_and_associativity() {
        assert_eq!(evaluate("2 + 3 * 4").unwrap(), 14.0);
        assert_eq!(evaluate("(2 + 3) * 4").unwrap(), 20.0);
        assert_eq!(evaluate("2 ^ 3 ^ 2").unwrap(), 512.0);
        assert_eq!(evaluate("-2 ^ 2").unwrap(), -4.0);
        assert_eq!(evaluate("10 - 4 - 3").unwrap(), 3.0);
        assert_eq!(evaluate("12 ÷ 4 × 3").unwrap(), 9.0);
    }

    #[test]
    fn test_rejects_bad_input() {
        let err = evaluate("1 / 0").unwrap_err();
        assert_eq!(err.kind, ToolFailureKind::Runtime);
        assert_eq!(evaluate("2 + ").unwrap_err().kind, ToolFailureKind::Unsupported);
        assert_eq!(evaluate("(1 + 2").unwrap_err().kind, ToolFailureKind::Unsupported);
        assert_eq!(evaluate("sqrt(4)").unwrap_err().kind, ToolFailureKind::Unsupported);
        assert_eq!(evaluate("   ").unwrap_err().kind, ToolFailureKind::InvalidArguments);
        assert_eq!(evaluate("1.2.3").unwrap_err().kind, ToolFailureKind::Unsupported);
    }

    #[test]
    fn test_nesting_limit() {
        let deep = format!("{}1{}", "(".repeat(40), ")".repeat(40));
        assert_eq!(evaluate(&deep).unwrap_err().kind, ToolFailureKind::Unsupported);
        let shallow = format!("{}1{}", "(".repeat(10), ")".repeat(10));
        assert_eq!(evaluate(&shallow).unwrap(), 1.0);
    }

    #[test]
    fn test_render() {
        assert_eq!(render(84.0), "84");
        assert_eq!(render(2.5), "2.5");
        assert_eq!(render(1.0 / 3.0), "0.3333333333");
    }

    #[tokio::test]
    async fn test_runtime_contract() {
        let runtime = ArithmeticToolRuntime::new();
        let output = runtime
            .run(CALCULATOR_TOOL, &json!({"expression": "17 * (3 + 4)"}))
            .await
            .unwrap();
        assert_eq!(output.rendered, "119");

        let err = runtime.run("shell", &json!({})).await.unwrap_err();
        assert_eq!(err.kind, ToolFailureKind::UnknownTool);

        let err = runtime.run(CALCULATOR_TOOL, &json!({"expr": 1})).await.unwrap_err();
        assert_eq!(err.kind, ToolFailureKind::InvalidArguments);
    }
}
