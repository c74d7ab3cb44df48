//! What the profiler needs to know about the surrounding request and process.
//!
//! The host application implements these; `StaticRequest` and `ProcessRuntime`
//! cover embedding without a web framework.

use serde::{Deserialize, Serialize};

use std::collections::BTreeMap;

pub type StringMap = BTreeMap<String, String>;

/// Header maps keep every value of a repeated header.
pub type HeaderMap = BTreeMap<String, Vec<String>>;

pub trait RequestContext: Send + Sync {
    fn url(&self) -> String;

    fn method(&self) -> String;

    fn client_addr(&self) -> Option<String>;

    fn is_ajax(&self) -> bool;

    fn query(&self) -> StringMap {
        StringMap::new()
    }

    fn body(&self) -> StringMap {
        StringMap::new()
    }

    fn cookies(&self) -> StringMap {
        StringMap::new()
    }

    fn server(&self) -> StringMap {
        StringMap::new()
    }

    fn headers(&self) -> HeaderMap {
        HeaderMap::new()
    }

    fn response_headers(&self) -> HeaderMap {
        HeaderMap::new()
    }

    /// Response body, when the host makes it available.
    fn response_body(&self) -> Option<String> {
        None
    }

    /// UI language code; empty when the host has none.
    fn lang(&self) -> String {
        String::new()
    }
}

/// Informational facts about the running process.
pub trait RuntimeFacts: Send + Sync {
    fn version(&self) -> String;

    fn uname(&self) -> String;

    /// Named capabilities and whether each is available.
    fn extensions(&self) -> BTreeMap<String, bool> {
        BTreeMap::new()
    }

    fn loaded_modules(&self) -> Vec<String> {
        Vec::new()
    }

    fn declared_types(&self) -> Vec<String> {
        Vec::new()
    }

    fn included_files(&self) -> Vec<String> {
        Vec::new()
    }
}

/// A fully materialized request, built up front.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StaticRequest {
    pub url: String,
    pub method: String,
    pub client_addr: Option<String>,
    pub ajax: bool,
    #[serde(default)]
    pub query: StringMap,
    #[serde(default)]
    pub body: StringMap,
    #[serde(default)]
    pub cookies: StringMap,
    #[serde(default)]
    pub server: StringMap,
    #[serde(default)]
    pub headers: HeaderMap,
    #[serde(default)]
    pub response_headers: HeaderMap,
    #[serde(default)]
    pub response_body: Option<String>,
    #[serde(default)]
    pub lang: String,
}

impl StaticRequest {
    pub fn new(method: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            method: method.into(),
            url: url.into(),
            ..Self::default()
        }
    }

    pub fn client(mut self, addr: impl Into<String>) -> Self {
        self.client_addr = Some(addr.into());
        self
    }

    pub fn ajax(mut self, ajax: bool) -> Self {
        self.ajax = ajax;
        self
    }

    pub fn query_param(mut self, k: impl Into<String>, v: impl Into<String>) -> Self {
        self.query.insert(k.into(), v.into());
        self
    }

    pub fn header(mut self, k: impl Into<String>, v: impl Into<String>) -> Self {
        self.headers.entry(k.into()).or_default().push(v.into());
        self
    }

    pub fn lang(mut self, lang: impl Into<String>) -> Self {
        self.lang = lang.into();
        self
    }
}

impl RequestContext for StaticRequest {
    fn url(&self) -> String {
        self.url.clone()
    }

    fn method(&self) -> String {
        self.method.clone()
    }

    fn client_addr(&self) -> Option<String> {
        self.client_addr.clone()
    }

    fn is_ajax(&self) -> bool {
        self.ajax
    }

    fn query(&self) -> StringMap {
        self.query.clone()
    }

    fn body(&self) -> StringMap {
        self.body.clone()
    }

    fn cookies(&self) -> StringMap {
        self.cookies.clone()
    }

    fn server(&self) -> StringMap {
        self.server.clone()
    }

    fn headers(&self) -> HeaderMap {
        self.headers.clone()
    }

    fn response_headers(&self) -> HeaderMap {
        self.response_headers.clone()
    }

    fn response_body(&self) -> Option<String> {
        self.response_body.clone()
    }

    fn lang(&self) -> String {
        self.lang.clone()
    }
}

/// Facts about this Rust process.
#[derive(Debug, Clone, Default)]
pub struct ProcessRuntime;

impl RuntimeFacts for ProcessRuntime {
    fn version(&self) -> String {
        format!("{} {}", env!("CARGO_PKG_NAME"), env!("CARGO_PKG_VERSION"))
    }

    fn uname(&self) -> String {
        format!("{} {}", std::env::consts::OS, std::env::consts::ARCH)
    }

    fn extensions(&self) -> BTreeMap<String, bool> {
        BTreeMap::from([
            ("debug_assertions".to_string(), cfg!(debug_assertions)),
            ("unix".to_string(), cfg!(unix)),
        ])
    }

    fn loaded_modules(&self) -> Vec<String> {
        std::env::current_exe()
            .map(|p| vec![p.to_string_lossy().to_string()])
            .unwrap_or_default()
    }
}
