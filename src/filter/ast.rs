//! Filter DSL abstract syntax tree.
//!
//! Strict trees: composite nodes own their children, so no cycles are
//! possible. `FilterAst::matches` is the reference oracle used to test
//! `compile(f).execute(doc) == f.matches(doc)`.

use crate::types::{Document, FieldValue};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompareOp {
    Eq,
    Neq,
    Lt,
    Le,
    Gt,
    Ge,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StringOp {
    Contains,
    StartsWith,
    EndsWith,
    Like,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BoolOp {
    And,
    Or,
    Not,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ValueFilter {
    pub field: String,
    pub op: CompareOp,
    pub value: FieldValue,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RangeFilter {
    pub field: String,
    pub min: Option<FieldValue>,
    pub max: Option<FieldValue>,
    pub min_inclusive: bool,
    pub max_inclusive: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct InFilter {
    pub field: String,
    pub values: Vec<FieldValue>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct StringFilter {
    pub field: String,
    pub op: StringOp,
    pub pattern: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RegexFilter {
    pub field: String,
    pub pattern: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NullFilter {
    pub field: String,
    pub is_null: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CompositeFilter {
    pub op: BoolOp,
    pub left: FilterAst,
    pub right: Option<FilterAst>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TernaryFilter {
    pub cond: FilterAst,
    pub if_true: FilterAst,
    pub if_false: FilterAst,
}

#[derive(Debug, Clone, PartialEq)]
pub enum FilterAst {
    Value(ValueFilter),
    Range(RangeFilter),
    In(InFilter),
    StringOp(StringFilter),
    Regex(RegexFilter),
    Null(NullFilter),
    Composite(Box<CompositeFilter>),
    Ternary(Box<TernaryFilter>),
    Literal(FieldValue),
}

impl FilterAst {
    fn field_value<'a>(doc: &'a Document, field: &str) -> FieldValue {
        doc.fields
            .get(field)
            .map(|f| f.value.clone())
            .unwrap_or(FieldValue::Null)
    }

    /// Reference (non-bytecode) evaluator: the ground truth the compiled
    /// VM's behavior is tested against.
    pub fn matches(&self, doc: &Document) -> bool {
        match self {
            FilterAst::Literal(v) => v.truthy(),
            FilterAst::Value(vf) => {
                let lhs = Self::field_value(doc, &vf.field);
                match vf.op {
                    CompareOp::Eq => lhs.eq_ci(&vf.value),
                    CompareOp::Neq => !lhs.eq_ci(&vf.value),
                    CompareOp::Lt => lhs.compare_to(&vf.value) == Some(std::cmp::Ordering::Less),
                    CompareOp::Le => matches!(
                        lhs.compare_to(&vf.value),
                        Some(std::cmp::Ordering::Less) | Some(std::cmp::Ordering::Equal)
                    ),
                    CompareOp::Gt => lhs.compare_to(&vf.value) == Some(std::cmp::Ordering::Greater),
                    CompareOp::Ge => matches!(
                        lhs.compare_to(&vf.value),
                        Some(std::cmp::Ordering::Greater) | Some(std::cmp::Ordering::Equal)
                    ),
                }
            }
            FilterAst::Range(rf) => {
                let lhs = Self::field_value(doc, &rf.field);
                let min_ok = match &rf.min {
                    None => true,
                    Some(min) => match lhs.compare_to(min) {
                        Some(std::cmp::Ordering::Greater) => true,
                        Some(std::cmp::Ordering::Equal) => rf.min_inclusive,
                        _ => false,
                    },
                };
                let max_ok = match &rf.max {
                    None => true,
                    Some(max) => match lhs.compare_to(max) {
                        Some(std::cmp::Ordering::Less) => true,
                        Some(std::cmp::Ordering::Equal) => rf.max_inclusive,
                        _ => false,
                    },
                };
                min_ok && max_ok
            }
            FilterAst::In(inf) => {
                if inf.values.is_empty() {
                    return false;
                }
                let lhs = Self::field_value(doc, &inf.field);
                inf.values.iter().any(|v| lhs.eq_ci(v))
            }
            FilterAst::StringOp(sf) => {
                let lhs = Self::field_value(doc, &sf.field).as_str_repr().to_lowercase();
                let pattern = sf.pattern.to_lowercase();
                match sf.op {
                    StringOp::Contains => lhs.contains(&pattern),
                    StringOp::StartsWith => lhs.starts_with(&pattern),
                    StringOp::EndsWith => lhs.ends_with(&pattern),
                    StringOp::Like => like_match(&lhs, &pattern),
                }
            }
            FilterAst::Regex(rf) => {
                let lhs = Self::field_value(doc, &rf.field).as_str_repr();
                regex::RegexBuilder::new(&rf.pattern)
                    .case_insensitive(true)
                    .build()
                    .map(|re| re.is_match(&lhs))
                    .unwrap_or(false)
            }
            FilterAst::Null(nf) => {
                let is_null = doc.fields.get(&nf.field).map(|f| f.value.is_null()).unwrap_or(true);
                is_null == nf.is_null
            }
            FilterAst::Composite(cf) => match cf.op {
                BoolOp::And => cf.left.matches(doc) && cf.right.as_ref().map(|r| r.matches(doc)).unwrap_or(true),
                BoolOp::Or => cf.left.matches(doc) || cf.right.as_ref().map(|r| r.matches(doc)).unwrap_or(false),
                BoolOp::Not => !cf.left.matches(doc),
            },
            FilterAst::Ternary(tf) => {
                if tf.cond.matches(doc) {
                    tf.if_true.matches(doc)
                } else {
                    tf.if_false.matches(doc)
                }
            }
        }
    }
}

/// SQL-style `LIKE` matching: `%` matches any run of characters, `_`
/// matches exactly one.
pub fn like_match(text: &str, pattern: &str) -> bool {
    let t: Vec<char> = text.chars().collect();
    let p: Vec<char> = pattern.chars().collect();
    like_match_rec(&t, &p)
}

fn like_match_rec(text: &[char], pattern: &[char]) -> bool {
    match pattern.first() {
        None => text.is_empty(),
        Some('%') => like_match_rec(text, &pattern[1..]) || (!text.is_empty() && like_match_rec(&text[1..], pattern)),
        Some('_') => !text.is_empty() && like_match_rec(&text[1..], &pattern[1..]),
        Some(c) => !text.is_empty() && text[0] == *c && like_match_rec(&text[1..], &pattern[1..]),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn like_percent_matches_any_run() {
        assert!(like_match("hello world", "hello%"));
        assert!(like_match("hello world", "%world"));
        assert!(!like_match("hello world", "%xyz%"));
    }

    #[test]
    fn like_underscore_matches_one_char() {
        assert!(like_match("cat", "c_t"));
        assert!(!like_match("coat", "c_t"));
    }
}
