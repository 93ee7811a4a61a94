use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

/// Letters of the answer choices in an exam question
pub const CHOICE_LETTERS: [&str; 5] = ["A", "B", "C", "D", "E"];

/// Per-choice fields, in the order they are emitted
pub const CHOICE_SUFFIXES: [&str; 3] = ["Explanation", "Text", "isCorrect"];

/// Record-level fields emitted after all choices
pub const GENERAL_KEYS: [&str; 4] = [
    "OverallExplanation",
    "QuestionText",
    "Subtopic",
    "YearAsked",
];

/// The operation applied to object nodes.
///
/// `Assign`, `Lookup` and `Collect` act on objects that carry the selection key;
/// `Reorder` rebuilds every object.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum RewriteRule {
    /// Set the selected field to a fixed value
    Assign { value: Value },

    /// Replace the selected field with `table[value]` when the value is a table key
    Lookup { table: BTreeMap<String, Value> },

    /// Record the selected field's value without touching the document
    Collect,

    /// Rebuild the whole object with its keys in a prescribed order
    Reorder {
        #[serde(default)]
        order: KeyOrder,
        #[serde(default)]
        unknown: UnknownKeys,
    },
}

impl RewriteRule {
    pub fn assign(value: impl Into<Value>) -> Self {
        RewriteRule::Assign {
            value: value.into(),
        }
    }

    /// Build a lookup rule from `(old, new)` string pairs
    pub fn lookup<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        RewriteRule::Lookup {
            table: pairs
                .into_iter()
                .map(|(k, v)| (k.into(), Value::String(v.into())))
                .collect(),
        }
    }

    pub fn reorder(order: KeyOrder, unknown: UnknownKeys) -> Self {
        RewriteRule::Reorder { order, unknown }
    }

    /// Short name used in logs and reports
    pub fn name(&self) -> &'static str {
        match self {
            RewriteRule::Assign { .. } => "assign",
            RewriteRule::Lookup { .. } => "lookup",
            RewriteRule::Collect => "collect",
            RewriteRule::Reorder { .. } => "reorder",
        }
    }

    /// Whether the rule can modify the document at all
    pub fn mutates(&self) -> bool {
        !matches!(self, RewriteRule::Collect)
    }
}

/// What happens to keys that the order list does not name
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UnknownKeys {
    /// Keep them after the ordered keys, in their original order
    #[default]
    Append,
    /// Remove them. Loses data; only for parity with older exports.
    Drop,
}

/// An ordered list of key names
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct KeyOrder(Vec<String>);

impl KeyOrder {
    pub fn new<I, S>(keys: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        KeyOrder(keys.into_iter().map(Into::into).collect())
    }

    /// Layout of an exam question record:
    /// `Choice_A_Explanation, Choice_A_Text, Choice_A_isCorrect, ... Choice_E_isCorrect`,
    /// then `OverallExplanation, QuestionText, Subtopic, YearAsked`.
    pub fn exam_question() -> Self {
        let capacity = CHOICE_LETTERS.len() * CHOICE_SUFFIXES.len() + GENERAL_KEYS.len();
        let mut keys = Vec::with_capacity(capacity);
        for letter in CHOICE_LETTERS {
            for suffix in CHOICE_SUFFIXES {
                keys.push(format!("Choice_{}_{}", letter, suffix));
            }
        }
        keys.extend(GENERAL_KEYS.iter().map(|k| k.to_string()));
        KeyOrder(keys)
    }

    pub fn keys(&self) -> &[String] {
        &self.0
    }
}

impl Default for KeyOrder {
    fn default() -> Self {
        KeyOrder::exam_question()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_exam_question_order() {
        let order = KeyOrder::exam_question();
        assert_eq!(order.keys().len(), 19);
        assert_eq!(order.keys()[0], "Choice_A_Explanation");
        assert_eq!(order.keys()[1], "Choice_A_Text");
        assert_eq!(order.keys()[2], "Choice_A_isCorrect");
        assert_eq!(order.keys()[14], "Choice_E_isCorrect");
        assert_eq!(order.keys()[15], "OverallExplanation");
        assert_eq!(order.keys()[18], "YearAsked");
    }

    #[test]
    fn test_rule_from_job_json() {
        let rule: RewriteRule = serde_json::from_value(json!({
            "kind": "lookup",
            "table": {"La motricité gastrique": "Motricité Gastrique"}
        }))
        .unwrap();
        assert_eq!(
            rule,
            RewriteRule::lookup([("La motricité gastrique", "Motricité Gastrique")])
        );

        let rule: RewriteRule = serde_json::from_value(json!({"kind": "reorder"})).unwrap();
        assert_eq!(
            rule,
            RewriteRule::reorder(KeyOrder::exam_question(), UnknownKeys::Append)
        );

        let rule: RewriteRule = serde_json::from_value(json!({
            "kind": "reorder",
            "order": ["b", "a"],
            "unknown": "drop"
        }))
        .unwrap();
        assert_eq!(rule, RewriteRule::reorder(KeyOrder::new(["b", "a"]), UnknownKeys::Drop));
    }

    #[test]
    fn test_collect_does_not_mutate() {
        assert!(!RewriteRule::Collect.mutates());
        assert!(RewriteRule::assign("x").mutates());
        assert_eq!(RewriteRule::Collect.name(), "collect");
    }
}
