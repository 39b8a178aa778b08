//! Evaluation of parsed location paths against a [`Document`]

use std::collections::HashSet;

use super::parser::{Axis, CompareOp, Expr, LocationPath, NodeTest, Step};
use crate::document::{Document, NodeId};

/// A node visited during evaluation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub(crate) enum Item {
    /// The document node above the root element
    Root,
    Element(NodeId),
    /// Owning element and attribute index
    Attribute(NodeId, usize),
}

enum Value {
    Nodes(Vec<Item>),
    Str(String),
    Num(f64),
    Bool(bool),
}

pub(crate) fn select(doc: &Document, context: Item, path: &LocationPath) -> Vec<Item> {
    let mut current = vec![if path.absolute { Item::Root } else { context }];

    for step in &path.steps {
        let mut next = Vec::new();
        let mut seen = HashSet::new();
        for &item in &current {
            let candidates: Vec<Item> = axis(doc, item, step.axis)
                .into_iter()
                .filter(|&c| matches_test(doc, c, step))
                .collect();
            for selected in apply_predicates(doc, candidates, &step.predicates) {
                if seen.insert(selected) {
                    next.push(selected);
                }
            }
        }
        current = next;
    }

    current
}

fn axis(doc: &Document, item: Item, axis: Axis) -> Vec<Item> {
    match (axis, item) {
        (Axis::Child, Item::Root) => vec![Item::Element(doc.root())],
        (Axis::Child, Item::Element(id)) => doc.children(id).iter().map(|&c| Item::Element(c)).collect(),
        (Axis::Child, Item::Attribute(..)) => Vec::new(),

        (Axis::DescendantOrSelf, Item::Root) => {
            let mut items = vec![Item::Root, Item::Element(doc.root())];
            items.extend(doc.descendants(doc.root()).into_iter().map(Item::Element));
            items
        }
        (Axis::DescendantOrSelf, Item::Element(id)) => {
            let mut items = vec![Item::Element(id)];
            items.extend(doc.descendants(id).into_iter().map(Item::Element));
            items
        }
        (Axis::DescendantOrSelf, attr @ Item::Attribute(..)) => vec![attr],

        (Axis::SelfNode, item) => vec![item],

        (Axis::Parent, Item::Root) => Vec::new(),
        (Axis::Parent, Item::Element(id)) => match doc.parent(id) {
            Some(parent) => vec![Item::Element(parent)],
            None if id == doc.root() => vec![Item::Root],
            None => Vec::new(),
        },
        (Axis::Parent, Item::Attribute(owner, _)) => vec![Item::Element(owner)],

        (Axis::Attribute, Item::Element(id)) => {
            (0..doc.attributes(id).len()).map(|i| Item::Attribute(id, i)).collect()
        }
        (Axis::Attribute, _) => Vec::new(),
    }
}

fn matches_test(doc: &Document, item: Item, step: &Step) -> bool {
    match (&step.test, item) {
        (NodeTest::AnyNode, _) => true,
        (NodeTest::Wildcard, Item::Element(_)) => step.axis != Axis::Attribute,
        (NodeTest::Wildcard, Item::Attribute(..)) => step.axis == Axis::Attribute,
        (NodeTest::Element { namespace, local }, Item::Element(id)) => {
            doc.name(id) == local && doc.namespace(id) == namespace.as_deref()
        }
        (NodeTest::Attribute(name), Item::Attribute(owner, index)) => {
            doc.attributes(owner)[index].name == *name
        }
        _ => false,
    }
}

fn apply_predicates(doc: &Document, mut items: Vec<Item>, predicates: &[Expr]) -> Vec<Item> {
    for predicate in predicates {
        items = items
            .iter()
            .enumerate()
            .filter(|(index, item)| match eval(doc, **item, predicate) {
                Value::Num(n) => n == (*index + 1) as f64,
                other => truthy(&other),
            })
            .map(|(_, &item)| item)
            .collect();
    }
    items
}

// =============================================================================
// Expressions
// =============================================================================

fn eval(doc: &Document, context: Item, expr: &Expr) -> Value {
    match expr {
        Expr::Or(a, b) => Value::Bool(truthy(&eval(doc, context, a)) || truthy(&eval(doc, context, b))),
        Expr::And(a, b) => Value::Bool(truthy(&eval(doc, context, a)) && truthy(&eval(doc, context, b))),
        Expr::Not(inner) => Value::Bool(!truthy(&eval(doc, context, inner))),
        Expr::Count(path) => Value::Num(select(doc, context, path).len() as f64),
        Expr::Path(path) => Value::Nodes(select(doc, context, path)),
        Expr::Literal(text) => Value::Str(text.clone()),
        Expr::Number(n) => Value::Num(*n),
        Expr::Compare(op, a, b) => {
            let left = eval(doc, context, a);
            let right = eval(doc, context, b);
            Value::Bool(compare(doc, *op, &left, &right))
        }
    }
}

fn truthy(value: &Value) -> bool {
    match value {
        Value::Nodes(nodes) => !nodes.is_empty(),
        Value::Str(s) => !s.is_empty(),
        Value::Num(n) => *n != 0.0 && !n.is_nan(),
        Value::Bool(b) => *b,
    }
}

/// String-value of an item
pub(crate) fn item_value(doc: &Document, item: Item) -> String {
    match item {
        Item::Root => doc.string_value(doc.root()),
        Item::Element(id) => doc.string_value(id),
        Item::Attribute(owner, index) => doc.attributes(owner)[index].value.clone(),
    }
}

fn to_number(text: &str) -> f64 {
    text.trim().parse::<f64>().unwrap_or(f64::NAN)
}

/// Existential comparison for node-sets, scalar comparison otherwise. A
/// node-set compared with a boolean counts as its own non-emptiness.
fn compare(doc: &Document, op: CompareOp, left: &Value, right: &Value) -> bool {
    match (left, right) {
        (Value::Nodes(nodes), Value::Bool(_)) => compare_scalars(op, &Value::Bool(!nodes.is_empty()), right),
        (Value::Bool(_), Value::Nodes(nodes)) => compare_scalars(op, left, &Value::Bool(!nodes.is_empty())),
        (Value::Nodes(l), Value::Nodes(r)) => l.iter().any(|&a| {
            let a = item_value(doc, a);
            r.iter().any(|&b| compare_strings(op, &a, &item_value(doc, b)))
        }),
        (Value::Nodes(nodes), scalar) => nodes
            .iter()
            .any(|&n| compare_scalars(op, &Value::Str(item_value(doc, n)), scalar)),
        (scalar, Value::Nodes(nodes)) => nodes
            .iter()
            .any(|&n| compare_scalars(op, scalar, &Value::Str(item_value(doc, n)))),
        (l, r) => compare_scalars(op, l, r),
    }
}

fn compare_strings(op: CompareOp, a: &str, b: &str) -> bool {
    match op {
        CompareOp::Eq => a == b,
        CompareOp::Ne => a != b,
        _ => compare_numbers(op, to_number(a), to_number(b)),
    }
}

fn compare_scalars(op: CompareOp, left: &Value, right: &Value) -> bool {
    match op {
        CompareOp::Eq | CompareOp::Ne => {
            let equal = match (left, right) {
                (Value::Bool(a), other) | (other, Value::Bool(a)) => *a == truthy(other),
                (Value::Num(a), other) | (other, Value::Num(a)) => *a == scalar_number(other),
                (a, b) => scalar_string(a) == scalar_string(b),
            };
            if op == CompareOp::Eq {
                equal
            } else {
                !equal
            }
        }
        _ => compare_numbers(op, scalar_number(left), scalar_number(right)),
    }
}

fn scalar_number(value: &Value) -> f64 {
    match value {
        Value::Num(n) => *n,
        Value::Str(s) => to_number(s),
        Value::Bool(b) => {
            if *b {
                1.0
            } else {
                0.0
            }
        }
        Value::Nodes(_) => f64::NAN,
    }
}

fn scalar_string(value: &Value) -> String {
    match value {
        Value::Str(s) => s.clone(),
        Value::Num(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Nodes(_) => String::new(),
    }
}

fn compare_numbers(op: CompareOp, a: f64, b: f64) -> bool {
    match op {
        CompareOp::Eq => a == b,
        CompareOp::Ne => a != b,
        CompareOp::Lt => a < b,
        CompareOp::Le => a <= b,
        CompareOp::Gt => a > b,
        CompareOp::Ge => a >= b,
    }
}
