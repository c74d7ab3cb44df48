//! Request-scoped profiler: marks, dumps, logs and queries collected during
//! one unit of work, finalized into a single persisted [`ProfileRecord`].

use globset::{Glob, GlobSet, GlobSetBuilder};
use rand_chacha::ChaCha8Rng;
use rand_core::{RngCore as _, SeedableRng as _};
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use std::collections::BTreeMap;
use std::panic::Location;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Instant, SystemTime};

use crate::{
    Artifacts, CallSite, Environment, GcReport, Headers, Heap, LogEntry, LogLevel, LogStore, Mark,
    MicroKey, PrintEntry, Probe, ProcessRuntime, ProfileRecord, ProfilerConfig, ProfilerError,
    ProfilerResult, QueryEntry, RequestContext, RuntimeFacts, RuntimeInfo, SystemProbe, Txts,
    Value, format_date, load_average, render,
};

/// Why `finalize` did nothing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SkipReason {
    Disabled,
    TestingEnvironment,
    NoRequest,
    DontTrack,
    AlreadyFinalized,
    ExcludedUrl,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FinalizeOutcome {
    Saved { key: MicroKey, path: PathBuf },
    Skipped(SkipReason),
}

impl FinalizeOutcome {
    pub fn is_saved(&self) -> bool {
        matches!(self, Self::Saved { .. })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    Collecting,
    Finalized,
}

pub struct Profiler {
    prefix: String,
    config: ProfilerConfig,
    excluded_urls: GlobSet,
    probe: Box<dyn Probe>,
    rng: ChaCha8Rng,
    previous_time: f64,
    previous_mem: u64,
    marks: Vec<Mark>,
    prints: Vec<PrintEntry>,
    logs: BTreeMap<LogLevel, Vec<LogEntry>>,
    queries: Vec<QueryEntry>,
    source: Option<String>,
    artifacts: Artifacts,
    untranslated: Vec<String>,
    request: Option<Arc<dyn RequestContext>>,
    runtime: Arc<dyn RuntimeFacts>,
    session_id: Option<String>,
    dont_track: bool,
    state: State,
}

impl Profiler {
    pub fn new(prefix: impl Into<String>, config: ProfilerConfig) -> ProfilerResult<Self> {
        let excluded_urls = compile_globset(&config.excluded_urls)?;
        Ok(Self {
            prefix: prefix.into(),
            config,
            excluded_urls,
            probe: Box::new(SystemProbe::new()),
            rng: ChaCha8Rng::from_entropy(),
            previous_time: 0.0,
            previous_mem: 0,
            marks: Vec::new(),
            prints: Vec::new(),
            logs: BTreeMap::new(),
            queries: Vec::new(),
            source: None,
            artifacts: Artifacts::default(),
            untranslated: Vec::new(),
            request: None,
            runtime: Arc::new(ProcessRuntime),
            session_id: None,
            dont_track: false,
            state: State::Collecting,
        })
    }

    pub fn with_probe(mut self, probe: impl Probe + 'static) -> Self {
        self.probe = Box::new(probe);
        self
    }

    /// Makes the garbage collection roll reproducible.
    pub fn with_gc_seed(mut self, seed: u64) -> Self {
        self.rng = ChaCha8Rng::seed_from_u64(seed);
        self
    }

    pub fn set_start_time(&mut self, start: Instant) -> &mut Self {
        self.probe.restart_at(start);
        self
    }

    pub fn set_request(&mut self, request: Arc<dyn RequestContext>) -> &mut Self {
        self.request = Some(request);
        self
    }

    pub fn set_runtime(&mut self, runtime: Arc<dyn RuntimeFacts>) -> &mut Self {
        self.runtime = runtime;
        self
    }

    pub fn set_session(&mut self, session_id: impl Into<String>) -> &mut Self {
        self.session_id = Some(session_id.into());
        self
    }

    /// Suppresses persistence for the current unit of work.
    pub fn dont_track(&mut self) -> &mut Self {
        self.dont_track = true;
        self
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    pub fn config(&self) -> &ProfilerConfig {
        &self.config
    }

    pub fn marks(&self) -> &[Mark] {
        &self.marks
    }

    pub fn prints(&self) -> &[PrintEntry] {
        &self.prints
    }

    pub fn logs(&self) -> &BTreeMap<LogLevel, Vec<LogEntry>> {
        &self.logs
    }

    pub fn queries(&self) -> &[QueryEntry] {
        &self.queries
    }

    pub fn artifacts(&self) -> &Artifacts {
        &self.artifacts
    }

    pub fn untranslated(&self) -> &[String] {
        &self.untranslated
    }

    pub fn is_finalized(&self) -> bool {
        self.state == State::Finalized
    }

    /// Records a checkpoint and returns its one-line summary, or `None` when
    /// profiling is off.
    pub fn mark(&mut self, label: &str) -> Option<String> {
        if !self.config.debug_mode {
            return None;
        }

        let current = self.probe.elapsed().as_secs_f64();
        let current_mem = self.probe.peak_memory();
        let mark = Mark {
            prefix: self.prefix.clone(),
            time: current - self.previous_time,
            total_time: current,
            memory: signed_diff(current_mem, self.previous_mem),
            total_memory: current_mem,
            label: label.to_string(),
        };
        let summary = mark.summary();
        tracing::trace!("{summary}");
        self.marks.push(mark);

        self.previous_time = current;
        self.previous_mem = current_mem;
        Some(summary)
    }

    /// Dumps `value` into the record, attributed to the calling line.
    ///
    /// Returns `None` when profiling is off; otherwise `self` for chaining.
    #[track_caller]
    pub fn capture(
        &mut self,
        value: &Value,
        heap: &Heap,
        max_depth: usize,
        tab: Option<&str>,
    ) -> Option<&mut Self> {
        if !self.config.debug_mode {
            return None;
        }

        let site = CallSite::from_location(Location::caller());
        self.prints.push(PrintEntry {
            name: tab.map(str::to_string),
            data: render(value, heap, max_depth, true),
            type_name: value.type_name().to_string(),
            file: site.file,
            line: site.line,
            variable: site.variable,
        });
        Some(self)
    }

    /// Appends a log line under `level`; `None` if that level is not enabled.
    pub fn add_log(&mut self, level: LogLevel, message: impl Into<String>) -> Option<&mut Self> {
        if !self.config.enabled_logs.contains(&level) {
            return None;
        }
        self.logs.entry(level).or_default().push(LogEntry {
            msg: message.into(),
        });
        Some(self)
    }

    pub fn add_query(&mut self, query: QueryEntry) -> Option<&mut Self> {
        if !self.config.debug_mode {
            return None;
        }
        self.queries.push(query);
        Some(self)
    }

    /// Keeps the rendered response body; takes precedence over the request's.
    pub fn add_source(&mut self, html: impl Into<String>) -> Option<&mut Self> {
        if !self.config.debug_mode {
            return None;
        }
        self.source = Some(html.into());
        Some(self)
    }

    /// Template names are recorded even when profiling is off, like the
    /// other artifact lists below.
    pub fn add_tpl_file(&mut self, name: impl Into<String>) -> &mut Self {
        self.artifacts.tpl_files.push(name.into());
        self
    }

    pub fn add_view_file(&mut self, name: impl Into<String>) -> &mut Self {
        self.artifacts.view_files.push(name.into());
        self
    }

    pub fn add_wrapper_file(&mut self, name: impl Into<String>) -> &mut Self {
        self.artifacts.wrapper_files.push(name.into());
        self
    }

    pub fn add_widget(&mut self, name: impl Into<String>) -> &mut Self {
        self.artifacts.widget_files.push(name.into());
        self
    }

    pub fn add_untranslated_txt(&mut self, text: impl Into<String>) -> &mut Self {
        self.untranslated.push(text.into());
        self
    }

    /// Assembles and persists the record for this unit of work.
    ///
    /// Soft conditions (profiling off, testing environment, no request,
    /// don't-track, already finalized, excluded URL) come back as
    /// [`FinalizeOutcome::Skipped`]. Missing session or storage path and
    /// write failures are errors.
    pub fn finalize(&mut self) -> ProfilerResult<FinalizeOutcome> {
        if !self.config.debug_mode {
            return Ok(FinalizeOutcome::Skipped(SkipReason::Disabled));
        }
        if self.config.is_testing() {
            return Ok(FinalizeOutcome::Skipped(SkipReason::TestingEnvironment));
        }

        if self.roll_gc() {
            let report = self.gc()?;
            tracing::debug!(
                "gc scanned {} session dirs, removed {}",
                report.scanned,
                report.removed
            );
        }

        let Some(request) = self.request.clone() else {
            return Ok(self.skip(SkipReason::NoRequest));
        };
        if self.dont_track {
            return Ok(self.skip(SkipReason::DontTrack));
        }
        if self.state == State::Finalized {
            return Ok(self.skip(SkipReason::AlreadyFinalized));
        }
        let url = request.url();
        if self.is_excluded_url(&url) {
            return Ok(self.skip(SkipReason::ExcludedUrl));
        }

        let session_id = self
            .session_id
            .clone()
            .filter(|s| !s.is_empty())
            .ok_or_else(|| self.config_error("Session ID is empty"))?;
        let store = self.store()?;
        store.session_dir(&session_id)?;

        let record = self.assemble(request.as_ref(), url, session_id.clone());
        self.state = State::Finalized;
        let path = store.save(&session_id, &record)?;
        Ok(FinalizeOutcome::Saved {
            key: record.microtime,
            path,
        })
    }

    /// The newest `limit` records for the current session, oldest first.
    /// A `limit` of 0 returns everything.
    pub fn history(&self, limit: usize) -> ProfilerResult<Vec<ProfileRecord>> {
        if !self.config.debug_mode {
            return Ok(Vec::new());
        }
        let store = self.store()?;
        let session_id = self
            .session_id
            .as_deref()
            .filter(|s| !s.is_empty())
            .ok_or_else(|| self.config_error("Session ID is empty"))?;
        store.history(session_id, limit)
    }

    /// `history` with the configured `history_count`.
    pub fn history_default(&self) -> ProfilerResult<Vec<ProfileRecord>> {
        self.history(self.config.history_count)
    }

    /// Removes expired session directories under the storage root.
    pub fn gc(&self) -> ProfilerResult<GcReport> {
        let store = self.store()?;
        Ok(store.gc(self.config.expiration(), SystemTime::now()))
    }

    fn store(&self) -> ProfilerResult<LogStore> {
        self.config
            .logdata_path()
            .map(LogStore::new)
            .ok_or_else(|| self.config_error("Log data path is empty"))
    }

    fn config_error(&self, message: &str) -> ProfilerError {
        ProfilerError::config(message, self.config.error_log())
    }

    fn skip(&self, reason: SkipReason) -> FinalizeOutcome {
        tracing::debug!("{}: finalize skipped ({reason:?})", self.prefix);
        FinalizeOutcome::Skipped(reason)
    }

    fn roll_gc(&mut self) -> bool {
        match self.config.gc_frequency {
            0 => false,
            n => self.rng.next_u32() % n == 0,
        }
    }

    fn is_excluded_url(&self, url: &str) -> bool {
        let path = url.split(['?', '#']).next().unwrap_or_default();
        self.excluded_urls.is_match(Path::new(path))
    }

    fn assemble(&self, request: &dyn RequestContext, url: String, session_id: String) -> ProfileRecord {
        let now = OffsetDateTime::now_utc();
        let runtime = self.runtime.as_ref();
        ProfileRecord {
            microtime: MicroKey::at(now),
            uniqid: uuid::Uuid::new_v4().simple().to_string(),
            url,
            date: format_date(now),
            ip: request.client_addr(),
            request_method: request.method(),
            ajax: request.is_ajax(),
            memories: self.marks.clone(),
            proc_load: load_average(),
            prints: self.prints.clone(),
            logs: self.logs.clone(),
            queries: self.queries.clone(),
            environment: Environment {
                post: request.body(),
                get: request.query(),
                cookie: request.cookies(),
                server: request.server(),
            },
            headers: Headers {
                request: request.headers(),
                response: request.response_headers(),
            },
            source: self
                .source
                .clone()
                .or_else(|| request.response_body())
                .unwrap_or_default(),
            runtime: RuntimeInfo {
                version: runtime.version(),
                uname: runtime.uname(),
                extensions: runtime.extensions(),
                loaded_modules: runtime.loaded_modules(),
                declared_types: runtime.declared_types(),
                included_files: runtime.included_files(),
            },
            artifacts: self.artifacts.clone(),
            txts: Txts {
                lang: request.lang(),
                untranslated: self.untranslated.clone(),
            },
            session_id,
        }
    }
}

fn signed_diff(current: u64, previous: u64) -> i64 {
    if current >= previous {
        i64::try_from(current - previous).unwrap_or(i64::MAX)
    } else {
        i64::try_from(previous - current).map_or(i64::MIN, |d| -d)
    }
}

fn compile_globset(patterns: &[String]) -> ProfilerResult<GlobSet> {
    let mut b = GlobSetBuilder::new();
    for p in patterns {
        let g = Glob::new(p)
            .map_err(|e| ProfilerError::InvalidArgument(format!("invalid glob {p:?}: {e}")))?;
        b.add(g);
    }
    b.build()
        .map_err(|e| ProfilerError::InvalidArgument(format!("invalid globset: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::testing::ScriptedProbe;
    use crate::{StaticRequest, protected_field};

    fn temp_dir(name: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!("reqprof-profiler-{name}-{}", uuid::Uuid::new_v4()));
        std::fs::create_dir_all(&dir).expect("mkdir");
        dir
    }

    fn config(root: &Path) -> ProfilerConfig {
        ProfilerConfig {
            debug_mode: true,
            logdata_path: Some(root.to_path_buf()),
            gc_frequency: 0,
            error_log_path: Some(root.join("errors.log")),
            ..ProfilerConfig::default()
        }
    }

    fn profiler(root: &Path) -> Profiler {
        let mut p = Profiler::new("App", config(root)).expect("profiler");
        p.set_session("sess1")
            .set_request(Arc::new(StaticRequest::new("GET", "https://example.com/users?page=2")));
        p
    }

    #[test]
    fn marks_accumulate_in_order_with_running_totals() {
        let root = temp_dir("marks");
        let probe = ScriptedProbe::default();
        let mut p = profiler(&root).with_probe(probe.clone());

        probe.advance(100, 1024 * 1024);
        let first = p.mark("start").expect("enabled");
        probe.advance(50, 512 * 1024);
        p.mark("end").expect("enabled");

        let marks = p.marks();
        assert_eq!(marks.len(), 2);
        assert!(marks[1].total_time >= marks[0].total_time);
        assert!(marks[0].time >= 0.0 && marks[1].time >= 0.0);
        assert!(marks[0].memory >= 0 && marks[1].memory >= 0);
        assert_eq!(marks[1].memory, 512 * 1024);
        assert_eq!(first, "App 0.100 seconds (+0.100); 1.00 MB (+1.000) - start");
    }

    #[test]
    fn disabled_profiler_is_silent() {
        let root = temp_dir("disabled");
        let mut p = Profiler::new(
            "App",
            ProfilerConfig {
                debug_mode: false,
                ..config(&root)
            },
        )
        .expect("profiler");
        assert!(p.mark("x").is_none());
        assert!(p.capture(&Value::Int(1), &Heap::new(), 10, None).is_none());
        assert_eq!(
            p.finalize().expect("finalize"),
            FinalizeOutcome::Skipped(SkipReason::Disabled)
        );
        assert!(p.history(0).expect("history").is_empty());
    }

    #[test]
    fn capture_renders_highlighted_dump_with_attribution() {
        let root = temp_dir("capture");
        let mut p = profiler(&root);
        let vars = Value::map([
            ("a", Value::Int(1)),
            ("b", Value::list([Value::Int(1), Value::Int(2)])),
        ]);
        let heap = Heap::new();
        p.capture(&vars, &heap, 10, Some("request"))
            .expect("enabled")
            .capture(&Value::Null, &heap, 10, None)
            .expect("enabled");

        let prints = p.prints();
        assert_eq!(prints.len(), 2);
        assert_eq!(prints[0].name.as_deref(), Some("request"));
        assert_eq!(prints[0].type_name, "array");
        assert!(prints[0].data.highlighted);
        assert!(prints[0].data.text.starts_with("<code>"));
        assert!(prints[0].file.ends_with("profiler.rs"));
        assert!(prints[0].line > 0);
        assert_eq!(prints[1].type_name, "NULL");
    }

    #[test]
    fn capture_of_cyclic_record_terminates() {
        let root = temp_dir("cycle");
        let mut p = profiler(&root);
        let mut heap = Heap::new();
        let node = heap.alloc("Node");
        heap.set_field(node, protected_field("next"), Value::Object(node));
        p.capture(&Value::Object(node), &heap, 10, None).expect("enabled");
        let dump = &p.prints()[0].data;
        assert_eq!(dump.objects, 1);
        assert!(dump.highlighted);
        assert!(dump.text.contains("Node"));

        let plain = render(&Value::Object(node), &heap, 10, false);
        assert!(plain.text.contains("Node#1(...)"));
        assert_eq!(plain.objects, dump.objects);
    }

    #[test]
    fn logs_are_filtered_by_enabled_levels() {
        let root = temp_dir("logs");
        let mut p = profiler(&root);
        assert!(p.add_log(LogLevel::Info, "hello").is_some());
        assert!(p.add_log(LogLevel::Warning, "nope").is_none());
        p.add_log(LogLevel::Info, "again");
        assert_eq!(p.logs()[&LogLevel::Info].len(), 2);
        assert!(!p.logs().contains_key(&LogLevel::Warning));
    }

    #[test]
    fn finalize_persists_once() {
        let root = temp_dir("finalize");
        let mut p = profiler(&root);
        p.mark("start");
        p.add_query(QueryEntry::new("SELECT 1", 0.002));
        p.add_source("<html></html>");

        let first = p.finalize().expect("finalize");
        let FinalizeOutcome::Saved { key, path } = first else {
            panic!("expected save, got {first:?}");
        };
        assert!(path.exists());
        assert_eq!(key.as_str().len(), crate::MICRO_KEY_WIDTH);

        let second = p.finalize().expect("finalize");
        assert_eq!(second, FinalizeOutcome::Skipped(SkipReason::AlreadyFinalized));

        let history = p.history(0).expect("history");
        assert_eq!(history.len(), 1);
        let rec = &history[0];
        assert_eq!(rec.url, "https://example.com/users?page=2");
        assert_eq!(rec.request_method, "GET");
        assert_eq!(rec.session_id, "sess1");
        assert_eq!(rec.memories.len(), 1);
        assert_eq!(rec.queries.len(), 1);
        assert_eq!(rec.source, "<html></html>");
    }

    #[test]
    fn environment_maps_come_from_request() {
        let root = temp_dir("env");
        let mut p = profiler(&root);
        p.set_request(Arc::new(
            StaticRequest::new("POST", "/api/items")
                .client("127.0.0.1")
                .ajax(true)
                .query_param("q", "x")
                .header("Accept", "application/json"),
        ));
        p.finalize().expect("finalize");
        let rec = p.history(1).expect("history").pop().expect("record");
        assert!(rec.ajax);
        assert_eq!(rec.ip.as_deref(), Some("127.0.0.1"));
        assert_eq!(rec.environment.get.get("q").map(String::as_str), Some("x"));
        assert_eq!(rec.headers.request["Accept"], vec!["application/json".to_string()]);
    }

    #[test]
    fn static_asset_urls_are_not_recorded() {
        let root = temp_dir("assets");
        let mut p = profiler(&root);
        p.set_request(Arc::new(StaticRequest::new("GET", "https://example.com/app.css?v=3")));
        assert_eq!(
            p.finalize().expect("finalize"),
            FinalizeOutcome::Skipped(SkipReason::ExcludedUrl)
        );
        assert!(!root.join("debug").join("sess1").exists());
    }

    #[test]
    fn testing_environment_and_dont_track_skip() {
        let root = temp_dir("skips");
        let mut p = Profiler::new(
            "App",
            ProfilerConfig {
                environment: "testing".to_string(),
                ..config(&root)
            },
        )
        .expect("profiler");
        assert_eq!(
            p.finalize().expect("finalize"),
            FinalizeOutcome::Skipped(SkipReason::TestingEnvironment)
        );

        let mut p = profiler(&root);
        p.dont_track();
        assert_eq!(
            p.finalize().expect("finalize"),
            FinalizeOutcome::Skipped(SkipReason::DontTrack)
        );

        let mut p = Profiler::new("App", config(&root)).expect("profiler");
        assert_eq!(
            p.finalize().expect("finalize"),
            FinalizeOutcome::Skipped(SkipReason::NoRequest)
        );
    }

    #[test]
    fn missing_session_or_path_is_a_config_error() {
        let root = temp_dir("config-errors");
        let mut p = Profiler::new("App", config(&root)).expect("profiler");
        p.set_request(Arc::new(StaticRequest::new("GET", "/")));
        let err = p.finalize().expect_err("no session");
        assert!(matches!(err, ProfilerError::Config(ref m) if m == "Session ID is empty"));

        let mut p = Profiler::new(
            "App",
            ProfilerConfig {
                logdata_path: None,
                ..config(&root)
            },
        )
        .expect("profiler");
        p.set_session("s").set_request(Arc::new(StaticRequest::new("GET", "/")));
        let err = p.finalize().expect_err("no path");
        assert!(matches!(err, ProfilerError::Config(ref m) if m == "Log data path is empty"));

        let log = std::fs::read_to_string(root.join("errors.log")).expect("error log");
        assert_eq!(log.lines().count(), 2);
    }

    #[test]
    fn invalid_session_id_does_not_consume_the_save() {
        let root = temp_dir("bad-session");
        let mut p = profiler(&root);
        p.set_session("../escape");
        assert!(matches!(p.finalize(), Err(ProfilerError::InvalidArgument(_))));
        assert!(!p.is_finalized());

        p.set_session("sess1");
        assert!(p.finalize().expect("finalize").is_saved());
    }

    #[test]
    fn non_finite_query_time_fails_instead_of_saving() {
        let root = temp_dir("nan");
        let mut p = profiler(&root);
        p.add_query(QueryEntry::new("SELECT 1", f64::NAN));
        assert!(matches!(p.finalize(), Err(ProfilerError::Encode(_))));
        assert!(p.history(0).expect("history").is_empty());
    }

    #[test]
    fn artifact_lists_are_recorded_in_order() {
        let root = temp_dir("artifacts");
        let mut p = profiler(&root);
        p.set_request(Arc::new(
            StaticRequest::new("GET", "https://example.com/home").lang("de"),
        ));
        p.add_tpl_file("layout.tpl")
            .add_tpl_file("home.tpl")
            .add_view_file("home/index")
            .add_wrapper_file("main")
            .add_widget("sidebar")
            .add_untranslated_txt("Willkommen");
        assert_eq!(p.artifacts().tpl_files, ["layout.tpl", "home.tpl"]);
        assert_eq!(p.untranslated(), ["Willkommen"]);

        p.finalize().expect("finalize");
        let rec = p.history(1).expect("history").pop().expect("record");
        assert_eq!(rec.artifacts.tpl_files, ["layout.tpl", "home.tpl"]);
        assert_eq!(rec.artifacts.view_files, ["home/index"]);
        assert_eq!(rec.artifacts.wrapper_files, ["main"]);
        assert_eq!(rec.artifacts.widget_files, ["sidebar"]);
        assert_eq!(rec.txts.lang, "de");
        assert_eq!(rec.txts.untranslated, ["Willkommen"]);
    }

    #[test]
    fn artifact_lists_fill_even_when_disabled() {
        let mut p = Profiler::new("App", ProfilerConfig::default()).expect("profiler");
        p.add_widget("sidebar").add_untranslated_txt("Hallo");
        assert_eq!(p.artifacts().widget_files, ["sidebar"]);
        assert_eq!(p.untranslated().len(), 1);
    }

    #[test]
    fn unwritable_root_is_an_io_error() {
        let root = temp_dir("io-error");
        let blocker = root.join("file");
        std::fs::write(&blocker, b"x").expect("write");
        let mut p = Profiler::new("App", config(&blocker)).expect("profiler");
        p.set_session("s").set_request(Arc::new(StaticRequest::new("GET", "/")));
        assert!(matches!(p.finalize(), Err(ProfilerError::Io { .. })));
    }

    #[test]
    fn gc_roll_always_fires_at_frequency_one() {
        let root = temp_dir("gc-roll");
        let stale = root.join("debug").join("old-session");
        std::fs::create_dir_all(&stale).expect("mkdir");
        let old = SystemTime::now() - std::time::Duration::from_secs(2 * 86_400);
        std::fs::File::open(&stale)
            .expect("open")
            .set_modified(old)
            .expect("mtime");

        let mut p = Profiler::new(
            "App",
            ProfilerConfig {
                gc_frequency: 1,
                ..config(&root)
            },
        )
        .expect("profiler")
        .with_gc_seed(7);
        p.set_session("sess1")
            .set_request(Arc::new(StaticRequest::new("GET", "/")));
        assert!(p.finalize().expect("finalize").is_saved());
        assert!(!stale.exists());
        assert!(root.join("debug").join("sess1").exists());
    }

    #[test]
    fn invalid_exclusion_glob_is_rejected() {
        let cfg = ProfilerConfig {
            excluded_urls: vec!["[".to_string()],
            ..ProfilerConfig::default()
        };
        assert!(matches!(
            Profiler::new("App", cfg),
            Err(ProfilerError::InvalidArgument(_))
        ));
    }

    #[test]
    fn signed_diff_handles_both_directions() {
        assert_eq!(signed_diff(10, 4), 6);
        assert_eq!(signed_diff(4, 10), -6);
        assert_eq!(signed_diff(u64::MAX, 0), i64::MAX);
    }
}
