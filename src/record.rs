//! Persisted per-request profile document.

use serde::{Deserialize, Serialize};

use std::collections::BTreeMap;

use crate::{HeaderMap, MicroKey, ProfilerError, ProfilerResult, RenderedDump, StringMap};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Mark {
    pub prefix: String,
    /// Seconds since the previous mark; negative if the clock went backwards.
    pub time: f64,
    #[serde(rename = "totalTime")]
    pub total_time: f64,
    /// Bytes of peak memory gained since the previous mark.
    pub memory: i64,
    #[serde(rename = "totalMemory")]
    pub total_memory: u64,
    pub label: String,
}

impl Mark {
    /// `App 0.120 seconds (+0.020); 4.00 MB (+0.250) - label`
    pub fn summary(&self) -> String {
        format!(
            "{} {:.3} seconds ({}{:.3}); {:.2} MB ({}{:.3}) - {}",
            self.prefix,
            self.total_time,
            sign(self.time > 0.0),
            self.time.abs(),
            megabytes(self.total_memory as f64),
            sign(self.memory > 0),
            megabytes(self.memory.unsigned_abs() as f64),
            self.label
        )
    }
}

fn sign(increased: bool) -> char {
    if increased { '+' } else { '-' }
}

fn megabytes(bytes: f64) -> f64 {
    bytes / (1024.0 * 1024.0)
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PrintEntry {
    /// Optional tab the dump is grouped under in the panel.
    pub name: Option<String>,
    pub data: RenderedDump,
    #[serde(rename = "type")]
    pub type_name: String,
    pub file: String,
    pub line: u32,
    /// Source text of the dumped expression; empty when it could not be found.
    pub variable: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogLevel {
    Debug,
    Info,
    Warning,
    Error,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogEntry {
    pub msg: String,
}

/// A query the host executed and reported; nothing here runs SQL.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueryEntry {
    pub query: String,
    pub time: f64,
    #[serde(default)]
    pub cached: bool,
    #[serde(default = "unknown_file")]
    pub file: String,
    #[serde(default)]
    pub line: u32,
    #[serde(default)]
    pub stack: Vec<String>,
}

fn unknown_file() -> String {
    "unknown".to_string()
}

impl QueryEntry {
    pub fn new(query: impl Into<String>, time: f64) -> Self {
        Self {
            query: query.into(),
            time,
            cached: false,
            file: unknown_file(),
            line: 0,
            stack: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Environment {
    pub post: StringMap,
    pub get: StringMap,
    pub cookie: StringMap,
    pub server: StringMap,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Headers {
    pub request: HeaderMap,
    pub response: HeaderMap,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RuntimeInfo {
    pub version: String,
    pub uname: String,
    pub extensions: BTreeMap<String, bool>,
    pub loaded_modules: Vec<String>,
    pub declared_types: Vec<String>,
    pub included_files: Vec<String>,
}

/// Names of rendered templates, views, wrappers and widgets, in call order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Artifacts {
    #[serde(default)]
    pub tpl_files: Vec<String>,
    #[serde(default)]
    pub view_files: Vec<String>,
    #[serde(default)]
    pub wrapper_files: Vec<String>,
    #[serde(default)]
    pub widget_files: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Txts {
    #[serde(default)]
    pub lang: String,
    #[serde(default)]
    pub untranslated: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProfileRecord {
    pub microtime: MicroKey,
    pub uniqid: String,
    pub url: String,
    pub date: String,
    pub ip: Option<String>,
    pub request_method: String,
    pub ajax: bool,
    pub memories: Vec<Mark>,
    #[serde(default)]
    pub proc_load: Option<[f64; 3]>,
    pub prints: Vec<PrintEntry>,
    pub logs: BTreeMap<LogLevel, Vec<LogEntry>>,
    #[serde(default)]
    pub queries: Vec<QueryEntry>,
    pub environment: Environment,
    pub headers: Headers,
    #[serde(default)]
    pub source: String,
    pub runtime: RuntimeInfo,
    #[serde(flatten)]
    pub artifacts: Artifacts,
    #[serde(default)]
    pub txts: Txts,
    pub session_id: String,
}

impl ProfileRecord {
    /// Compact JSON; slashes and non-ASCII stay unescaped.
    ///
    /// Non-finite floats are an encode error; `serde_json` would write them
    /// as `null`, which does not decode back into an `f64`.
    pub fn encode(&self) -> ProfilerResult<Vec<u8>> {
        if let Some(field) = self.first_non_finite() {
            return Err(ProfilerError::Encode(format!("{field} is not a finite number")));
        }
        let bytes = serde_json::to_vec(self)?;
        if bytes.is_empty() {
            return Err(ProfilerError::Encode(
                "record serialized to empty output".to_string(),
            ));
        }
        Ok(bytes)
    }

    pub fn decode(bytes: &[u8]) -> ProfilerResult<Self> {
        Ok(serde_json::from_slice(bytes)?)
    }

    fn first_non_finite(&self) -> Option<String> {
        let marks = self.memories.iter().enumerate().flat_map(|(i, m)| {
            [
                (format!("memories[{i}].time"), m.time),
                (format!("memories[{i}].totalTime"), m.total_time),
            ]
        });
        let queries = self
            .queries
            .iter()
            .enumerate()
            .map(|(i, q)| (format!("queries[{i}].time"), q.time));
        let load = self
            .proc_load
            .iter()
            .flatten()
            .enumerate()
            .map(|(i, v)| (format!("proc_load[{i}]"), *v));
        marks
            .chain(queries)
            .chain(load)
            .find(|(_, v)| !v.is_finite())
            .map(|(field, _)| field)
    }

    /// Sum of reported query time in seconds.
    pub fn query_time(&self) -> f64 {
        self.queries.iter().map(|q| q.time).sum()
    }
}

#[cfg(test)]
pub(crate) mod fixtures {
    use super::*;

    pub fn record(key: &str) -> ProfileRecord {
        ProfileRecord {
            microtime: MicroKey::from_raw(key),
            uniqid: "abc".to_string(),
            url: "https://example.com/ünï/path".to_string(),
            date: "2024-03-01 12:00:00".to_string(),
            ip: Some("10.0.0.1".to_string()),
            request_method: "GET".to_string(),
            ajax: false,
            memories: vec![Mark {
                prefix: "App".to_string(),
                time: 0.25,
                total_time: 0.25,
                memory: 2048,
                total_memory: 4096,
                label: "boot".to_string(),
            }],
            proc_load: Some([0.5, 0.25, 0.125]),
            prints: vec![PrintEntry {
                name: Some("vars".to_string()),
                data: RenderedDump {
                    text: "[\n    a => 1\n]".to_string(),
                    objects: 0,
                    highlighted: false,
                },
                type_name: "array".to_string(),
                file: "src/main.rs".to_string(),
                line: 12,
                variable: "vars".to_string(),
            }],
            logs: BTreeMap::from([(
                LogLevel::Info,
                vec![LogEntry {
                    msg: "hello".to_string(),
                }],
            )]),
            queries: vec![QueryEntry::new("SELECT 1", 0.5)],
            environment: Environment::default(),
            headers: Headers::default(),
            source: String::new(),
            runtime: RuntimeInfo::default(),
            artifacts: Artifacts {
                tpl_files: vec!["layout.tpl".to_string()],
                ..Artifacts::default()
            },
            txts: Txts::default(),
            session_id: "sess".to_string(),
        }
    }
}
