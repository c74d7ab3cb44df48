//! Cycle-safe, depth-bounded value rendering.
//!
//! Output shape:
//!
//! ```text
//! [
//!     a => 1
//!     b => [
//!         0 => 1
//!     ]
//!     node => Node#1
//!     (
//!         [self] => Node#1(...)
//!     )
//! ]
//! ```

use serde::{Deserialize, Serialize};

use std::collections::HashMap;

use crate::{Heap, ObjectRef, Value, highlight};

pub const DEFAULT_MAX_DEPTH: usize = 10;

const INDENT: usize = 4;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RenderedDump {
    pub text: String,
    /// Number of distinct records assigned an ordinal during the walk.
    pub objects: usize,
    pub highlighted: bool,
}

impl RenderedDump {
    pub fn lines(&self) -> impl Iterator<Item = &str> {
        self.text.lines()
    }

    pub fn as_str(&self) -> &str {
        &self.text
    }
}

/// Renders `value` to text. A `max_depth` of 0 selects the default.
pub fn render(value: &Value, heap: &Heap, max_depth: usize, highlight: bool) -> RenderedDump {
    Inspector::new(heap)
        .max_depth(max_depth)
        .highlight(highlight)
        .render(value)
}

pub struct Inspector<'h> {
    heap: &'h Heap,
    max_depth: usize,
    highlight: bool,
}

impl<'h> Inspector<'h> {
    pub fn new(heap: &'h Heap) -> Self {
        Self {
            heap,
            max_depth: DEFAULT_MAX_DEPTH,
            highlight: false,
        }
    }

    pub fn max_depth(mut self, depth: usize) -> Self {
        self.max_depth = if depth == 0 { DEFAULT_MAX_DEPTH } else { depth };
        self
    }

    pub fn highlight(mut self, on: bool) -> Self {
        self.highlight = on;
        self
    }

    pub fn render(&self, value: &Value) -> RenderedDump {
        let mut walk = Walk {
            heap: self.heap,
            max_depth: self.max_depth,
            seen: HashMap::new(),
            out: String::new(),
        };
        walk.value(value, 0);
        let objects = walk.seen.len();
        let text = if self.highlight {
            highlight::highlight_dump(&walk.out)
        } else {
            walk.out
        };
        RenderedDump {
            text,
            objects,
            highlighted: self.highlight,
        }
    }
}

/// State of one top-level render; the identity registry dies with it.
struct Walk<'h> {
    heap: &'h Heap,
    max_depth: usize,
    seen: HashMap<ObjectRef, usize>,
    out: String,
}

impl Walk<'_> {
    fn value(&mut self, value: &Value, level: usize) {
        match value {
            Value::Null => self.out.push_str("null"),
            Value::Bool(b) => self.out.push_str(if *b { "true" } else { "false" }),
            Value::Int(i) => self.out.push_str(&i.to_string()),
            Value::Float(f) => self.out.push_str(&f.to_string()),
            // Raw on purpose: dumps show text unquoted and unescaped.
            Value::Text(s) => self.out.push_str(s),
            Value::Handle(_) => self.out.push_str("{resource}"),
            Value::Unknown => self.out.push_str("{unknown}"),
            Value::Array(entries) => self.array(entries, level),
            Value::Object(obj) => self.object(*obj, level),
        }
    }

    fn array(&mut self, entries: &[(Value, Value)], level: usize) {
        if self.max_depth <= level {
            self.out.push_str("[...]");
            return;
        }
        if entries.is_empty() {
            self.out.push_str("[]");
            return;
        }
        let spaces = " ".repeat(level * INDENT);
        self.out.push('[');
        for (key, value) in entries {
            self.out.push('\n');
            self.out.push_str(&spaces);
            self.out.push_str(&" ".repeat(INDENT));
            self.value(key, 0);
            self.out.push_str(" => ");
            self.value(value, level + 1);
        }
        self.out.push('\n');
        self.out.push_str(&spaces);
        self.out.push(']');
    }

    fn object(&mut self, obj: ObjectRef, level: usize) {
        let Some(record) = self.heap.get(obj) else {
            self.out.push_str("{unknown}");
            return;
        };
        let class_name = record.class_name();

        if let Some(id) = self.seen.get(&obj) {
            self.out.push_str(&format!("{class_name}#{id}(...)"));
            return;
        }
        if self.max_depth <= level {
            self.out.push_str(&format!("{class_name}(...)"));
            return;
        }

        let id = self.seen.len() + 1;
        self.seen.insert(obj, id);
        let spaces = " ".repeat(level * INDENT);
        self.out.push_str(&format!("{class_name}#{id}\n{spaces}("));
        for (name, value) in record.presented_fields() {
            self.out.push('\n');
            self.out.push_str(&spaces);
            self.out.push_str(&format!("    [{}] => ", display_field_name(&name)));
            self.value(&value, level + 1);
        }
        self.out.push('\n');
        self.out.push_str(&spaces);
        self.out.push(')');
    }
}

/// `"\0*\0name"` becomes `*:name`, `"\0Class\0name"` becomes `Class:name`.
fn display_field_name(name: &str) -> String {
    name.trim_matches(|c: char| c == '\0' || c.is_ascii_whitespace() || c == '\x0B')
        .replace('\0', ":")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{ExportsFields, Record, private_field, protected_field};

    fn plain(value: &Value, heap: &Heap, depth: usize) -> String {
        render(value, heap, depth, false).text
    }

    #[test]
    fn scalars_render_raw() {
        let heap = Heap::new();
        assert_eq!(plain(&Value::Null, &heap, 10), "null");
        assert_eq!(plain(&Value::Bool(false), &heap, 10), "false");
        assert_eq!(plain(&Value::Int(-7), &heap, 10), "-7");
        assert_eq!(plain(&Value::Float(2.5), &heap, 10), "2.5");
        assert_eq!(plain(&Value::text("it's \"raw\""), &heap, 10), "it's \"raw\"");
        assert_eq!(plain(&Value::Handle("stream".into()), &heap, 10), "{resource}");
        assert_eq!(plain(&Value::Unknown, &heap, 10), "{unknown}");
    }

    #[test]
    fn nested_array_uses_four_space_indent_and_empty_marker() {
        let heap = Heap::new();
        let v = Value::map([
            ("a", Value::Int(1)),
            ("b", Value::list([Value::Int(1), Value::Int(2)])),
            ("c", Value::list([])),
        ]);
        let expected = "[\n    a => 1\n    b => [\n        0 => 1\n        1 => 2\n    ]\n    c => []\n]";
        assert_eq!(plain(&v, &heap, 10), expected);
    }

    #[test]
    fn array_depth_is_bounded() {
        let heap = Heap::new();
        let v = Value::list([Value::list([Value::list([Value::Int(1)])])]);
        assert_eq!(plain(&v, &heap, 2), "[\n    0 => [\n        0 => [...]\n    ]\n]");
    }

    #[test]
    fn zero_depth_selects_default() {
        let heap = Heap::new();
        let mut v = Value::Int(0);
        for _ in 0..12 {
            v = Value::list([v]);
        }
        let out = plain(&v, &heap, 0);
        assert_eq!(out.matches("[...]").count(), 1);
        assert_eq!(out, plain(&v, &heap, DEFAULT_MAX_DEPTH));
    }

    #[test]
    fn output_is_stable_past_actual_depth() {
        let heap = Heap::new();
        let v = Value::map([("x", Value::list([Value::Int(1), Value::list([])]))]);
        assert_eq!(plain(&v, &heap, 3), plain(&v, &heap, 50));
    }

    #[test]
    fn self_reference_renders_one_back_reference() {
        let mut heap = Heap::new();
        let node = heap.alloc("Node");
        heap.set_field(node, "name", Value::text("root"));
        heap.set_field(node, "self", Value::Object(node));

        let out = plain(&Value::Object(node), &heap, 10);
        assert_eq!(out, "Node#1\n(\n    [name] => root\n    [self] => Node#1(...)\n)");
        assert_eq!(out.matches("Node#1(...)").count(), 1);
    }

    #[test]
    fn shared_record_renders_back_reference_to_same_ordinal() {
        let mut heap = Heap::new();
        let shared = heap.alloc("Leaf");
        heap.set_field(shared, "v", Value::Int(1));
        let parent = heap.alloc("Pair");
        heap.set_field(parent, "left", Value::Object(shared));
        heap.set_field(parent, "right", Value::Object(shared));

        let dump = render(&Value::Object(parent), &heap, 10, false);
        assert_eq!(dump.objects, 2);
        assert!(dump.text.contains("[left] => Leaf#2\n    (\n        [v] => 1\n    )"));
        assert!(dump.text.contains("[right] => Leaf#2(...)"));
    }

    #[test]
    fn equal_but_distinct_records_are_not_merged() {
        let mut heap = Heap::new();
        let a = heap.alloc_with("Point", [("x".to_string(), Value::Int(1))]);
        let b = heap.alloc_with("Point", [("x".to_string(), Value::Int(1))]);
        let v = Value::list([Value::Object(a), Value::Object(b)]);
        let dump = render(&v, &heap, 10, false);
        assert_eq!(dump.objects, 2);
        assert!(!dump.text.contains("(...)"));
    }

    #[test]
    fn record_at_max_depth_is_elided_without_registration() {
        let mut heap = Heap::new();
        let inner = heap.alloc("Inner");
        let v = Value::list([Value::Object(inner)]);
        let dump = render(&v, &heap, 1, false);
        assert_eq!(dump.text, "[\n    0 => Inner(...)\n]");
        assert_eq!(dump.objects, 0);
    }

    #[test]
    fn mangled_field_names_become_visible() {
        let mut heap = Heap::new();
        let obj = heap.alloc("User");
        heap.set_field(obj, protected_field("email"), Value::text("a@b"));
        heap.set_field(obj, private_field("User", "hash"), Value::text("x"));
        let out = plain(&Value::Object(obj), &heap, 10);
        assert!(out.contains("[*:email] => a@b"));
        assert!(out.contains("[User:hash] => x"));
    }

    struct OnlyId;

    impl ExportsFields for OnlyId {
        fn export_fields(&self, record: &Record) -> Vec<(String, Value)> {
            record
                .fields()
                .iter()
                .filter(|(k, _)| k == "id")
                .cloned()
                .collect()
        }
    }

    #[test]
    fn exporter_replaces_intrinsic_fields() {
        let mut heap = Heap::new();
        let obj = heap.alloc("Model");
        heap.set_field(obj, "id", Value::Int(9));
        heap.set_field(obj, "secret", Value::text("hidden"));
        heap.set_exporter(obj, OnlyId);
        let out = plain(&Value::Object(obj), &heap, 10);
        assert_eq!(out, "Model#1\n(\n    [id] => 9\n)");
    }

    #[test]
    fn registry_is_reset_between_renders() {
        let mut heap = Heap::new();
        let obj = heap.alloc("A");
        let first = plain(&Value::Object(obj), &heap, 10);
        let second = plain(&Value::Object(obj), &heap, 10);
        assert_eq!(first, second);
        assert!(second.starts_with("A#1"));
    }
}
