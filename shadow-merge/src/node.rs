//! Dynamically described documents.
//!
//! A [`Node`] tree is a runtime schema descriptor and a value at once:
//! records with a fixed field set, keyed maps, optional references and the
//! two leaf kinds. It lets callers merge shapes that are only known at
//! runtime, at the cost of checking shape agreement during the walk.

use crate::mergeable::merge_plain;
use crate::{Managed, MergeContext, MergeResult, Mergeable, Operation};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use shadow_types::Timestamp;
use std::collections::BTreeMap;

/// A node in a dynamically described document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum Node {
    /// A record: the field set is part of the shape.
    Record(BTreeMap<String, Node>),
    /// A keyed collection: keys come and go, values share one shape.
    Map(BTreeMap<String, Node>),
    /// An optional reference around a sub-shape.
    Optional(Option<Box<Node>>),
    /// A timestamped leaf.
    Managed(Managed<Value>),
    /// A bare leaf.
    Plain(Value),
}

impl Node {
    /// Builds a record from `(field, node)` pairs.
    pub fn record<I, S>(fields: I) -> Self
    where
        I: IntoIterator<Item = (S, Node)>,
        S: Into<String>,
    {
        Node::Record(fields.into_iter().map(|(k, v)| (k.into(), v)).collect())
    }

    /// Builds a keyed map from `(key, node)` pairs.
    pub fn map<I, S>(entries: I) -> Self
    where
        I: IntoIterator<Item = (S, Node)>,
        S: Into<String>,
    {
        Node::Map(entries.into_iter().map(|(k, v)| (k.into(), v)).collect())
    }

    /// Builds an optional reference.
    pub fn optional(inner: Option<Node>) -> Self {
        Node::Optional(inner.map(Box::new))
    }

    /// Builds a managed leaf.
    pub fn managed(value: impl Into<Value>, timestamp: Timestamp) -> Self {
        Node::Managed(Managed::new(value.into(), timestamp))
    }

    /// Builds a plain leaf.
    pub fn plain(value: impl Into<Value>) -> Self {
        Node::Plain(value.into())
    }

    /// Returns the name of this node's variant.
    pub fn kind_name(&self) -> &'static str {
        match self {
            Node::Record(_) => "record",
            Node::Map(_) => "map",
            Node::Optional(_) => "optional",
            Node::Managed(_) => "managed",
            Node::Plain(_) => "plain",
        }
    }

    /// Returns a child of a record or map.
    pub fn get(&self, key: &str) -> Option<&Node> {
        match self {
            Node::Record(fields) | Node::Map(fields) => fields.get(key),
            _ => None,
        }
    }

    /// Follows a sequence of record fields / map keys / optional payloads.
    pub fn pointer<'a, I>(&self, keys: I) -> Option<&Node>
    where
        I: IntoIterator<Item = &'a str>,
    {
        let mut current = self;
        for key in keys {
            while let Node::Optional(Some(inner)) = current {
                current = &**inner;
            }
            current = current.get(key)?;
        }
        Some(current)
    }

    /// Returns the managed leaf, if this node is one.
    pub fn as_managed(&self) -> Option<&Managed<Value>> {
        match self {
            Node::Managed(m) => Some(m),
            _ => None,
        }
    }

    /// Returns the same shape with every value reset: records keep their
    /// fields, maps become empty, optionals absent, leaves empty.
    pub fn zeroed(&self) -> Node {
        match self {
            Node::Record(fields) => Node::Record(
                fields
                    .iter()
                    .map(|(k, v)| (k.clone(), v.zeroed()))
                    .collect(),
            ),
            Node::Map(_) => Node::Map(BTreeMap::new()),
            Node::Optional(_) => Node::Optional(None),
            Node::Managed(_) => Node::Managed(Managed::default()),
            Node::Plain(_) => Node::Plain(Value::Null),
        }
    }

    fn record_signature(fields: &BTreeMap<String, Node>) -> String {
        let names: Vec<&str> = fields.keys().map(String::as_str).collect();
        format!("record{{{}}}", names.join(","))
    }
}

impl Default for Node {
    fn default() -> Self {
        Node::Record(BTreeMap::new())
    }
}

/// JSON zero values: null, false, 0, "", [] and {}.
fn is_zero_json(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::Bool(b) => !b,
        Value::Number(n) => n.as_f64() == Some(0.0),
        Value::String(s) => s.is_empty(),
        Value::Array(a) => a.is_empty(),
        Value::Object(o) => o.is_empty(),
    }
}

impl Mergeable for Node {
    fn merge(old: &Self, new: &Self, cx: &mut MergeContext<'_>) -> MergeResult<Self> {
        match (old, new) {
            (Node::Record(o), Node::Record(n)) => {
                if !o.keys().eq(n.keys()) {
                    return Err(cx.shape_mismatch(
                        Node::record_signature(o),
                        Node::record_signature(n),
                    ));
                }
                let mut merged = BTreeMap::new();
                for (name, old_field) in o {
                    // Key sets are equal, so the lookup cannot miss.
                    let Some(new_field) = n.get(name) else { continue };
                    let value = cx.field(name, |cx| Node::merge(old_field, new_field, cx))?;
                    merged.insert(name.clone(), value);
                }
                Ok(Node::Record(merged))
            }
            (Node::Map(o), Node::Map(n)) => Mergeable::merge(o, n, cx).map(Node::Map),
            (Node::Optional(o), Node::Optional(n)) => Mergeable::merge(o, n, cx).map(Node::Optional),
            (Node::Managed(o), Node::Managed(n)) => Mergeable::merge(o, n, cx).map(Node::Managed),
            (Node::Plain(o), Node::Plain(n)) => Ok(Node::Plain(merge_plain(o, n, is_zero_json, cx))),
            (o, n) => Err(cx.shape_mismatch(o.kind_name(), n.kind_name())),
        }
    }

    fn acknowledge(desired: &Self, reported: &Self, cx: &mut MergeContext<'_>) -> MergeResult<Self> {
        match (desired, reported) {
            (Node::Record(d), Node::Record(r)) => {
                let mut out = BTreeMap::new();
                for (name, desired_field) in d {
                    let value = match r.get(name) {
                        Some(reported_field) => cx.field(name, |cx| {
                            Node::acknowledge(desired_field, reported_field, cx)
                        })?,
                        None => {
                            return Err(cx.shape_mismatch(
                                Node::record_signature(d),
                                Node::record_signature(r),
                            ));
                        }
                    };
                    out.insert(name.clone(), value);
                }
                Ok(Node::Record(out))
            }
            (Node::Map(d), Node::Map(r)) => Mergeable::acknowledge(d, r, cx).map(Node::Map),
            (Node::Optional(d), Node::Optional(r)) => {
                Mergeable::acknowledge(d, r, cx).map(Node::Optional)
            }
            (Node::Managed(d), Node::Managed(r)) => {
                Mergeable::acknowledge(d, r, cx).map(Node::Managed)
            }
            (Node::Plain(_), Node::Plain(_)) => Ok(desired.clone()),
            (d, r) => Err(cx.shape_mismatch(d.kind_name(), r.kind_name())),
        }
    }

    fn added(&self, cx: &mut MergeContext<'_>) {
        match self {
            Node::Record(fields) => {
                for (name, field) in fields {
                    cx.field(name, |cx| field.added(cx));
                }
            }
            Node::Map(entries) => entries.added(cx),
            Node::Optional(inner) => inner.added(cx),
            Node::Managed(leaf) => leaf.added(cx),
            Node::Plain(value) => cx.plain(Operation::Add, &Value::Null, value),
        }
    }

    fn removed(&self, cx: &mut MergeContext<'_>) {
        match self {
            Node::Record(fields) => {
                for (name, field) in fields {
                    cx.field(name, |cx| field.removed(cx));
                }
            }
            Node::Map(entries) => entries.removed(cx),
            Node::Optional(inner) => inner.removed(cx),
            Node::Managed(leaf) => leaf.removed(cx),
            Node::Plain(value) => cx.plain(Operation::Remove, value, &Value::Null),
        }
    }
}
