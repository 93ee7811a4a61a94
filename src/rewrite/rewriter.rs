use crate::rewrite::rule::{KeyOrder, RewriteRule, UnknownKeys};
use log::debug;
use serde_json::{Map, Value};
use std::collections::{BTreeMap, BTreeSet};

/// Outcome of one traversal
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Rewrite {
    /// The rewritten tree (`Null` after [`FieldRewriter::apply_in_place`])
    pub value: Value,

    /// Object nodes the rule was applied to
    pub matched: usize,

    /// Object nodes actually modified
    pub changes: usize,

    /// Unique values seen by a `Collect` rule, sorted
    pub collected: BTreeSet<String>,

    /// String values a `Lookup` rule found no table entry for
    pub unmapped: BTreeSet<String>,
}

/// Walks a JSON tree and applies a rewrite rule to the objects it selects
pub struct FieldRewriter {
    key: String,
    rule: RewriteRule,
}

impl FieldRewriter {
    pub fn new(key: impl Into<String>, rule: RewriteRule) -> Self {
        FieldRewriter {
            key: key.into(),
            rule,
        }
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    /// Rewrite an owned tree and hand it back together with the counts
    pub fn apply(&self, mut value: Value) -> Rewrite {
        let mut rewrite = self.apply_in_place(&mut value);
        rewrite.value = value;
        rewrite
    }

    /// Rewrite a tree the caller keeps ownership of
    pub fn apply_in_place(&self, value: &mut Value) -> Rewrite {
        let mut rewrite = Rewrite::default();
        self.walk(value, &mut rewrite);
        rewrite
    }

    fn walk(&self, value: &mut Value, out: &mut Rewrite) {
        match value {
            Value::Object(obj) => self.rewrite_object(obj, out),
            Value::Array(arr) => {
                for item in arr.iter_mut() {
                    self.walk(item, out);
                }
            }
            Value::Null | Value::Bool(_) | Value::Number(_) | Value::String(_) => {}
        }
    }

    fn rewrite_object(&self, obj: &mut Map<String, Value>, out: &mut Rewrite) {
        if self.selects(obj) {
            out.matched += 1;
            if self.apply_rule(obj, out) {
                out.changes += 1;
            }
        }

        // Nested structures count whether or not this node matched
        for child in obj.values_mut() {
            self.walk(child, out);
        }
    }

    /// Reorder rebuilds every object; the other rules need the selection key
    fn selects(&self, obj: &Map<String, Value>) -> bool {
        match self.rule {
            RewriteRule::Reorder { .. } => true,
            _ => obj.contains_key(&self.key),
        }
    }

    /// Returns true when the object was modified
    fn apply_rule(&self, obj: &mut Map<String, Value>, out: &mut Rewrite) -> bool {
        match &self.rule {
            RewriteRule::Assign { value } => {
                obj.insert(self.key.clone(), value.clone());
                true
            }
            RewriteRule::Lookup { table } => self.lookup(obj, table, out),
            RewriteRule::Collect => {
                if let Some(value) = obj.get(&self.key) {
                    out.collected.insert(collected_text(value));
                }
                false
            }
            RewriteRule::Reorder { order, unknown } => reorder_keys(obj, order, *unknown),
        }
    }

    fn lookup(
        &self,
        obj: &mut Map<String, Value>,
        table: &BTreeMap<String, Value>,
        out: &mut Rewrite,
    ) -> bool {
        let Some(field) = obj.get_mut(&self.key) else {
            return false;
        };

        let replacement = match &*field {
            Value::String(old) => match table.get(old.as_str()) {
                Some(new) => new,
                None => {
                    out.unmapped.insert(old.clone());
                    return false;
                }
            },
            _ => return false,
        };

        // Identity entries are not changes
        if *field == *replacement {
            return false;
        }

        debug!("{}: {} -> {}", self.key, field, replacement);
        *field = replacement.clone();
        true
    }
}

/// Apply `rule` to the objects in `value` selected by `key`
pub fn apply(value: Value, key: &str, rule: &RewriteRule) -> Rewrite {
    FieldRewriter::new(key, rule.clone()).apply(value)
}

/// Rebuild `obj` with the keys of `order` first. Returns true if the key sequence changed.
pub fn reorder_keys(
    obj: &mut Map<String, Value>,
    order: &KeyOrder,
    unknown: UnknownKeys,
) -> bool {
    let before: Vec<String> = obj.keys().cloned().collect();

    // Map::remove does not keep the order of the remaining entries, so work on slots
    let mut entries: Vec<Option<(String, Value)>> =
        std::mem::take(obj).into_iter().map(Some).collect();
    let mut rebuilt = Map::with_capacity(entries.len());

    for key in order.keys() {
        let slot = entries
            .iter_mut()
            .find(|entry| matches!(entry, Some((k, _)) if k == key));
        if let Some((k, v)) = slot.and_then(Option::take) {
            rebuilt.insert(k, v);
        }
    }

    match unknown {
        UnknownKeys::Append => rebuilt.extend(entries.into_iter().flatten()),
        UnknownKeys::Drop => {
            for (k, _) in entries.into_iter().flatten() {
                debug!("dropping key not in order list: {}", k);
            }
        }
    }

    let changed = !before.iter().eq(rebuilt.keys());
    *obj = rebuilt;
    changed
}

/// Strings are collected verbatim, anything else as compact JSON
fn collected_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}
