use std::cmp::Ordering;
use std::collections::HashMap;

use sqlparser::ast::{BinaryOperator, Expr, UnaryOperator, Value, ValueWithSpan};
use sqlparser::dialect::PostgreSqlDialect;
use sqlparser::parser::Parser;
use sqlparser::tokenizer::Token;

/// A stored row: column name → text value. Missing columns read as NULL.
pub type Row = HashMap<String, String>;

/// Count `?` placeholders, ignoring anything inside quoted literals or
/// quoted identifiers.
pub fn count_placeholders(sql: &str) -> usize {
    number_placeholders(sql).1
}

/// Rewrite positional `?` placeholders to numbered `$1, $2, ...` form.
/// Returns the rewritten text and the number of placeholders found.
pub fn number_placeholders(sql: &str) -> (String, usize) {
    let mut out = String::with_capacity(sql.len() + 8);
    let mut count = 0usize;
    let mut quote: Option<char> = None;
    for c in sql.chars() {
        match quote {
            Some(q) => {
                // A doubled quote closes and immediately reopens; net effect is the same.
                if c == q {
                    quote = None;
                }
                out.push(c);
            }
            None => match c {
                '\'' | '"' => {
                    quote = Some(c);
                    out.push(c);
                }
                '?' => {
                    count += 1;
                    out.push('$');
                    out.push_str(&count.to_string());
                }
                _ => out.push(c),
            },
        }
    }
    (out, count)
}

/// A parsed boolean predicate with its positional parameters bound.
#[derive(Debug, Clone)]
pub struct Predicate {
    expr: Expr,
    params: Vec<String>,
}

impl Predicate {
    /// Parse `sql` (with `?` placeholders) and bind `params` in order.
    pub fn parse(sql: &str, params: &[String]) -> Result<Self, SqlError> {
        let (numbered, expected) = number_placeholders(sql);
        if expected != params.len() {
            return Err(SqlError::ParamCount {
                expected,
                got: params.len(),
            });
        }

        let dialect = PostgreSqlDialect {};
        let mut parser = Parser::new(&dialect)
            .try_with_sql(&numbered)
            .map_err(|e| SqlError::Parse(e.to_string()))?;
        let expr = parser
            .parse_expr()
            .map_err(|e| SqlError::Parse(e.to_string()))?;
        let trailing = parser.peek_token();
        if trailing.token != Token::EOF {
            return Err(SqlError::Parse(format!(
                "unexpected trailing input at {}",
                trailing.token
            )));
        }

        Ok(Self {
            expr,
            params: params.to_vec(),
        })
    }

    /// True only if the predicate evaluates to TRUE (NULL does not match).
    pub fn matches(&self, row: &Row) -> Result<bool, SqlError> {
        Ok(self.eval(&self.expr, row)?.truth() == Some(true))
    }

    fn eval(&self, expr: &Expr, row: &Row) -> Result<Datum, SqlError> {
        match expr {
            Expr::Identifier(ident) => Ok(column_value(row, &ident.value)),
            Expr::CompoundIdentifier(parts) => match parts.last() {
                Some(ident) => Ok(column_value(row, &ident.value)),
                None => Err(SqlError::Parse("empty identifier".into())),
            },
            Expr::Value(ValueWithSpan { value, .. }) => self.literal(value),
            Expr::Nested(inner) => self.eval(inner, row),
            Expr::UnaryOp {
                op: UnaryOperator::Not,
                expr,
            } => Ok(Datum::from_truth(self.eval(expr, row)?.truth().map(|b| !b))),
            Expr::BinaryOp { left, op, right } => match op {
                BinaryOperator::And => {
                    let l = self.eval(left, row)?.truth();
                    if l == Some(false) {
                        return Ok(Datum::Bool(false));
                    }
                    let r = self.eval(right, row)?.truth();
                    Ok(Datum::from_truth(match (l, r) {
                        (_, Some(false)) => Some(false),
                        (Some(true), Some(true)) => Some(true),
                        _ => None,
                    }))
                }
                BinaryOperator::Or => {
                    let l = self.eval(left, row)?.truth();
                    if l == Some(true) {
                        return Ok(Datum::Bool(true));
                    }
                    let r = self.eval(right, row)?.truth();
                    Ok(Datum::from_truth(match (l, r) {
                        (_, Some(true)) => Some(true),
                        (Some(false), Some(false)) => Some(false),
                        _ => None,
                    }))
                }
                BinaryOperator::Eq
                | BinaryOperator::NotEq
                | BinaryOperator::Lt
                | BinaryOperator::LtEq
                | BinaryOperator::Gt
                | BinaryOperator::GtEq => {
                    let l = self.eval(left, row)?;
                    let r = self.eval(right, row)?;
                    let ord = compare(&l, &r);
                    Ok(Datum::from_truth(ord.map(|o| match op {
                        BinaryOperator::Eq => o == Ordering::Equal,
                        BinaryOperator::NotEq => o != Ordering::Equal,
                        BinaryOperator::Lt => o == Ordering::Less,
                        BinaryOperator::LtEq => o != Ordering::Greater,
                        BinaryOperator::Gt => o == Ordering::Greater,
                        _ => o != Ordering::Less,
                    })))
                }
                other => Err(SqlError::Unsupported(format!("operator {other}"))),
            },
            Expr::IsNull(inner) => Ok(Datum::Bool(self.eval(inner, row)? == Datum::Null)),
            Expr::IsNotNull(inner) => Ok(Datum::Bool(self.eval(inner, row)? != Datum::Null)),
            Expr::IsTrue(inner) => Ok(Datum::Bool(self.eval(inner, row)?.truth() == Some(true))),
            Expr::IsNotTrue(inner) => Ok(Datum::Bool(self.eval(inner, row)?.truth() != Some(true))),
            Expr::IsFalse(inner) => Ok(Datum::Bool(self.eval(inner, row)?.truth() == Some(false))),
            Expr::IsNotFalse(inner) => {
                Ok(Datum::Bool(self.eval(inner, row)?.truth() != Some(false)))
            }
            Expr::Like {
                negated,
                expr,
                pattern,
                ..
            } => self.eval_like(expr, pattern, *negated, false, row),
            Expr::ILike {
                negated,
                expr,
                pattern,
                ..
            } => self.eval_like(expr, pattern, *negated, true, row),
            Expr::InList {
                expr,
                list,
                negated,
            } => {
                let needle = self.eval(expr, row)?;
                if needle == Datum::Null {
                    return Ok(Datum::Null);
                }
                let mut saw_null = false;
                for item in list {
                    match compare(&needle, &self.eval(item, row)?) {
                        Some(Ordering::Equal) => return Ok(Datum::Bool(!negated)),
                        None => saw_null = true,
                        Some(_) => {}
                    }
                }
                if saw_null {
                    Ok(Datum::Null)
                } else {
                    Ok(Datum::Bool(*negated))
                }
            }
            Expr::Between {
                expr,
                negated,
                low,
                high,
            } => {
                let v = self.eval(expr, row)?;
                let lo = compare(&v, &self.eval(low, row)?);
                let hi = compare(&v, &self.eval(high, row)?);
                Ok(Datum::from_truth(match (lo, hi) {
                    (Some(lo), Some(hi)) => {
                        Some((lo != Ordering::Less && hi != Ordering::Greater) != *negated)
                    }
                    _ => None,
                }))
            }
            other => Err(SqlError::Unsupported(format!("expression {other}"))),
        }
    }

    fn eval_like(
        &self,
        expr: &Expr,
        pattern: &Expr,
        negated: bool,
        case_insensitive: bool,
        row: &Row,
    ) -> Result<Datum, SqlError> {
        let (Datum::Text(text), Datum::Text(pattern)) =
            (self.eval(expr, row)?, self.eval(pattern, row)?)
        else {
            return Ok(Datum::Null);
        };
        let matched = if case_insensitive {
            like_matches(&text.to_lowercase(), &pattern.to_lowercase())
        } else {
            like_matches(&text, &pattern)
        };
        Ok(Datum::Bool(matched != negated))
    }

    fn literal(&self, value: &Value) -> Result<Datum, SqlError> {
        match value {
            Value::SingleQuotedString(s) => Ok(Datum::Text(s.clone())),
            Value::Number(n, _) => n
                .parse()
                .map(Datum::Number)
                .map_err(|_| SqlError::Unsupported(format!("number {n}"))),
            Value::Boolean(b) => Ok(Datum::Bool(*b)),
            Value::Null => Ok(Datum::Null),
            Value::Placeholder(p) => {
                let index = p
                    .strip_prefix('$')
                    .and_then(|n| n.parse::<usize>().ok())
                    .filter(|n| *n >= 1)
                    .ok_or_else(|| SqlError::UnboundParam(p.clone()))?;
                self.params
                    .get(index - 1)
                    .map(|v| Datum::Text(v.clone()))
                    .ok_or_else(|| SqlError::UnboundParam(p.clone()))
            }
            other => Err(SqlError::Unsupported(format!("literal {other}"))),
        }
    }
}

/// Column values and bound parameters are always `Text`; `Number` only
/// comes from numeric literals written in the predicate itself.
#[derive(Debug, Clone, PartialEq)]
enum Datum {
    Null,
    Text(String),
    Number(f64),
    Bool(bool),
}

impl Datum {
    fn from_truth(t: Option<bool>) -> Self {
        t.map_or(Self::Null, Self::Bool)
    }

    /// SQL truth value; text columns hold booleans as `true`/`false`/`1`/`0`.
    fn truth(&self) -> Option<bool> {
        match self {
            Self::Null => None,
            Self::Bool(b) => Some(*b),
            Self::Number(_) => None,
            Self::Text(s) => match s.trim().to_lowercase().as_str() {
                "true" | "t" | "1" | "yes" | "y" | "on" => Some(true),
                "false" | "f" | "0" | "no" | "n" | "off" => Some(false),
                _ => None,
            },
        }
    }
}

fn column_value(row: &Row, name: &str) -> Datum {
    row.get(name)
        .map_or(Datum::Null, |v| Datum::Text(v.clone()))
}

/// Text compares as text. Text meets a numeric literal as a number, and
/// text that isn't one compares as unknown.
fn compare(a: &Datum, b: &Datum) -> Option<Ordering> {
    match (a, b) {
        (Datum::Null, _) | (_, Datum::Null) => None,
        (Datum::Text(x), Datum::Text(y)) => Some(x.cmp(y)),
        (Datum::Number(x), Datum::Number(y)) => x.partial_cmp(y),
        (Datum::Text(x), Datum::Number(y)) => x.trim().parse::<f64>().ok()?.partial_cmp(y),
        (Datum::Number(x), Datum::Text(y)) => x.partial_cmp(&y.trim().parse::<f64>().ok()?),
        (Datum::Number(_), Datum::Bool(_)) | (Datum::Bool(_), Datum::Number(_)) => None,
        (Datum::Bool(x), Datum::Bool(y)) => Some(x.cmp(y)),
        (Datum::Bool(x), text @ Datum::Text(_)) => text.truth().map(|y| x.cmp(&y)),
        (text @ Datum::Text(_), Datum::Bool(y)) => text.truth().map(|x| x.cmp(y)),
    }
}

enum LikeToken {
    Any,
    One,
    Lit(char),
}

fn like_tokens(pattern: &str) -> Vec<LikeToken> {
    let mut tokens = Vec::new();
    let mut chars = pattern.chars();
    while let Some(c) = chars.next() {
        tokens.push(match c {
            '%' => LikeToken::Any,
            '_' => LikeToken::One,
            '\\' => LikeToken::Lit(chars.next().unwrap_or('\\')),
            c => LikeToken::Lit(c),
        });
    }
    tokens
}

/// SQL `LIKE` matching: `%` any run, `_` one char, `\` escapes.
pub fn like_matches(text: &str, pattern: &str) -> bool {
    let tokens = like_tokens(pattern);
    let chars: Vec<char> = text.chars().collect();
    let (mut t, mut p) = (0usize, 0usize);
    // (token index after the last `%`, text index it was matched against)
    let mut backtrack: Option<(usize, usize)> = None;

    while t < chars.len() {
        match tokens.get(p) {
            Some(LikeToken::One) => {
                t += 1;
                p += 1;
            }
            Some(LikeToken::Lit(c)) if *c == chars[t] => {
                t += 1;
                p += 1;
            }
            Some(LikeToken::Any) => {
                backtrack = Some((p + 1, t));
                p += 1;
            }
            _ => match backtrack {
                Some((after_any, from)) => {
                    p = after_any;
                    t = from + 1;
                    backtrack = Some((after_any, from + 1));
                }
                None => return false,
            },
        }
    }
    tokens[p..].iter().all(|tok| matches!(tok, LikeToken::Any))
}

// ── Errors ────────────────────────────────────────────────────

#[derive(Debug)]
pub enum SqlError {
    Parse(String),
    Unsupported(String),
    ParamCount { expected: usize, got: usize },
    UnboundParam(String),
}

impl std::fmt::Display for SqlError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SqlError::Parse(s) => write!(f, "parse error: {s}"),
            SqlError::Unsupported(s) => write!(f, "unsupported: {s}"),
            SqlError::ParamCount { expected, got } => {
                write!(f, "predicate has {expected} placeholders, got {got} parameters")
            }
            SqlError::UnboundParam(p) => write!(f, "unbound parameter: {p}"),
        }
    }
}

impl std::error::Error for SqlError {}
