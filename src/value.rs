//! Inspectable value model.
//!
//! Composite records live in a [`Heap`] arena and are referenced through
//! [`ObjectRef`] handles, so two references to the same record are the same
//! record no matter how equal their contents look. Cycles are built by
//! allocating a record first and pointing one of its fields back at it.

use std::fmt;

/// Handle to a record in a [`Heap`]. Identity of a record is its handle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ObjectRef(usize);

impl ObjectRef {
    pub fn index(self) -> usize {
        self.0
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
    /// Opaque external resource such as a file or socket handle.
    Handle(String),
    /// Ordered keyed collection. Keys are usually `Int` or `Text`.
    Array(Vec<(Value, Value)>),
    Object(ObjectRef),
    Unknown,
}

impl Value {
    pub fn text(s: impl Into<String>) -> Self {
        Self::Text(s.into())
    }

    /// A list-shaped array keyed `0..n`.
    pub fn list(items: impl IntoIterator<Item = Value>) -> Self {
        Self::Array(
            items
                .into_iter()
                .enumerate()
                .map(|(i, v)| (Value::Int(i as i64), v))
                .collect(),
        )
    }

    /// A string-keyed array, in the given order.
    pub fn map<K: Into<String>>(entries: impl IntoIterator<Item = (K, Value)>) -> Self {
        Self::Array(
            entries
                .into_iter()
                .map(|(k, v)| (Value::Text(k.into()), v))
                .collect(),
        )
    }

    /// Runtime type tag in the classic dynamic-language vocabulary.
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Null => "NULL",
            Value::Bool(_) => "boolean",
            Value::Int(_) => "integer",
            Value::Float(_) => "double",
            Value::Text(_) => "string",
            Value::Handle(_) => "resource",
            Value::Array(_) => "array",
            Value::Object(_) => "object",
            Value::Unknown => "unknown type",
        }
    }

    /// Converts a JSON document into a value tree. JSON objects become
    /// string-keyed arrays, which keeps the conversion heap-free.
    pub fn from_json(json: &serde_json::Value) -> Self {
        match json {
            serde_json::Value::Null => Value::Null,
            serde_json::Value::Bool(b) => Value::Bool(*b),
            serde_json::Value::Number(n) => match n.as_i64() {
                Some(i) => Value::Int(i),
                None => n.as_f64().map(Value::Float).unwrap_or(Value::Unknown),
            },
            serde_json::Value::String(s) => Value::Text(s.clone()),
            serde_json::Value::Array(items) => Value::list(items.iter().map(Value::from_json)),
            serde_json::Value::Object(map) => {
                Value::map(map.iter().map(|(k, v)| (k.clone(), Value::from_json(v))))
            }
        }
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Value::Bool(v)
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::Int(v)
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Float(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::Text(v.to_string())
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::Text(v)
    }
}

impl From<ObjectRef> for Value {
    fn from(v: ObjectRef) -> Self {
        Value::Object(v)
    }
}

/// Capability of a record type to present its own field list for dumping,
/// in place of its raw fields.
pub trait ExportsFields: Send + Sync {
    fn export_fields(&self, record: &Record) -> Vec<(String, Value)>;
}

pub struct Record {
    class_name: String,
    fields: Vec<(String, Value)>,
    exporter: Option<Box<dyn ExportsFields>>,
}

impl fmt::Debug for Record {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Record")
            .field("class_name", &self.class_name)
            .field("fields", &self.fields)
            .field("exports_fields", &self.exporter.is_some())
            .finish()
    }
}

impl Record {
    pub fn class_name(&self) -> &str {
        &self.class_name
    }

    /// Intrinsic fields, with visibility-mangled names left as stored.
    pub fn fields(&self) -> &[(String, Value)] {
        &self.fields
    }

    /// Fields as they should be presented: the exporter's view when the
    /// record has one, its intrinsic fields otherwise.
    pub fn presented_fields(&self) -> Vec<(String, Value)> {
        match &self.exporter {
            Some(exporter) => exporter.export_fields(self),
            None => self.fields.clone(),
        }
    }
}

/// Field-name mangling used to scope non-public fields.
pub fn protected_field(name: &str) -> String {
    format!("\0*\0{name}")
}

pub fn private_field(class_name: &str, name: &str) -> String {
    format!("\0{class_name}\0{name}")
}

/// Arena owning every composite record a value graph can reach.
#[derive(Debug, Default)]
pub struct Heap {
    records: Vec<Record>,
}

impl Heap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn alloc(&mut self, class_name: impl Into<String>) -> ObjectRef {
        self.records.push(Record {
            class_name: class_name.into(),
            fields: Vec::new(),
            exporter: None,
        });
        ObjectRef(self.records.len() - 1)
    }

    pub fn alloc_with(
        &mut self,
        class_name: impl Into<String>,
        fields: impl IntoIterator<Item = (String, Value)>,
    ) -> ObjectRef {
        let r = self.alloc(class_name);
        if let Some(rec) = self.records.get_mut(r.0) {
            rec.fields.extend(fields);
        }
        r
    }

    /// Appends a field, or replaces the value of an existing one.
    pub fn set_field(&mut self, obj: ObjectRef, name: impl Into<String>, value: Value) {
        let Some(rec) = self.records.get_mut(obj.0) else {
            return;
        };
        let name = name.into();
        match rec.fields.iter_mut().find(|(k, _)| *k == name) {
            Some(slot) => slot.1 = value,
            None => rec.fields.push((name, value)),
        }
    }

    pub fn set_exporter(&mut self, obj: ObjectRef, exporter: impl ExportsFields + 'static) {
        if let Some(rec) = self.records.get_mut(obj.0) {
            rec.exporter = Some(Box::new(exporter));
        }
    }

    pub fn get(&self, obj: ObjectRef) -> Option<&Record> {
        self.records.get(obj.0)
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}
