//! Search expressions in the backend's prefix ("polish") notation.
//!
//! A filter is a flat list of terms. Conditions are `[field, operator, value]`
//! triples; `&`, `|` and `!` are prefix operators over the following one or
//! two expressions. Consecutive top-level expressions are implicitly ANDed.

use serde_json::Value;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operator {
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
    In,
    NotIn,
    Ilike,
}

impl Operator {
    pub fn as_str(self) -> &'static str {
        match self {
            Operator::Eq => "=",
            Operator::Ne => "!=",
            Operator::Lt => "<",
            Operator::Le => "<=",
            Operator::Gt => ">",
            Operator::Ge => ">=",
            Operator::In => "in",
            Operator::NotIn => "not in",
            Operator::Ilike => "ilike",
        }
    }
}

/// A single `(field, operator, value)` triple.
#[derive(Debug, Clone, PartialEq)]
pub struct Condition {
    pub field: String,
    pub op: Operator,
    pub value: Value,
}

impl Condition {
    pub fn new(field: impl Into<String>, op: Operator, value: impl Into<Value>) -> Self {
        Self {
            field: field.into(),
            op,
            value: value.into(),
        }
    }

    pub fn eq(field: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::new(field, Operator::Eq, value)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Term {
    And,
    Or,
    Not,
    Cond(Condition),
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Filter {
    terms: Vec<Term>,
}

impl Filter {
    /// The empty filter (matches every record).
    pub fn new() -> Self {
        Self::default()
    }

    pub fn terms(&self) -> &[Term] {
        &self.terms
    }

    pub fn is_empty(&self) -> bool {
        self.terms.is_empty()
    }

    pub fn push(mut self, cond: Condition) -> Self {
        self.terms.push(Term::Cond(cond));
        self
    }

    pub fn eq(self, field: &str, value: impl Into<Value>) -> Self {
        self.push(Condition::eq(field, value))
    }

    pub fn ne(self, field: &str, value: impl Into<Value>) -> Self {
        self.push(Condition::new(field, Operator::Ne, value))
    }

    /// ANDs in `a OR b`.
    pub fn any_of(mut self, a: Condition, b: Condition) -> Self {
        self.terms.push(Term::Or);
        self.terms.push(Term::Cond(a));
        self.terms.push(Term::Cond(b));
        self
    }

    /// Wire form: `[["code", "=", "internal"], "|", [...], [...]]`.
    pub fn to_json(&self) -> Value {
        Value::Array(
            self.terms
                .iter()
                .map(|t| match t {
                    Term::And => Value::from("&"),
                    Term::Or => Value::from("|"),
                    Term::Not => Value::from("!"),
                    Term::Cond(c) => Value::Array(vec![
                        Value::from(c.field.clone()),
                        Value::from(c.op.as_str()),
                        c.value.clone(),
                    ]),
                })
                .collect(),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn conjunction_serializes_as_plain_list() {
        let f = Filter::new().eq("product_id", 42).eq("location_id", 7);
        assert_eq!(
            f.to_json(),
            json!([["product_id", "=", 42], ["location_id", "=", 7]])
        );
    }

    #[test]
    fn any_of_serializes_prefix_or() {
        let f = Filter::new().eq("state", "done").any_of(
            Condition::eq("location_id", 3),
            Condition::eq("location_dest_id", 3),
        );
        assert_eq!(
            f.to_json(),
            json!([
                ["state", "=", "done"],
                "|",
                ["location_id", "=", 3],
                ["location_dest_id", "=", 3]
            ])
        );
    }

    #[test]
    fn empty_filter_is_empty_list() {
        assert_eq!(Filter::new().to_json(), json!([]));
    }
}
