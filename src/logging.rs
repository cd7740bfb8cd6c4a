//! Structured logging for the portal data layer.
//!
//! Every record is one JSON object per line with a run id, a sequence number,
//! a level and an area. Records go to stderr; when `LOG_DIR` is set they are
//! also appended to `LOG_DIR/<run_id>/events.jsonl` (trace/debug records go
//! to `trace.jsonl`).

use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use std::fs::{create_dir_all, File};
use std::io::{BufWriter, Write};
use std::path::PathBuf;
use std::process;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, OnceLock};
use std::time::Instant;

// =============================================================================
// Log Levels
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Level {
    Trace = 0,
    Debug = 1,
    Info = 2,
    Warn = 3,
    Error = 4,
    Fatal = 5,
}

impl Level {
    pub fn from_env() -> Self {
        Self::parse(std::env::var("LOG_LEVEL").ok().as_deref())
    }

    fn parse(raw: Option<&str>) -> Self {
        match raw {
            Some("trace") => Level::Trace,
            Some("debug") => Level::Debug,
            Some("info") => Level::Info,
            Some("warn") => Level::Warn,
            Some("error") => Level::Error,
            Some("fatal") => Level::Fatal,
            _ => Level::Info,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Level::Trace => "trace",
            Level::Debug => "debug",
            Level::Info => "info",
            Level::Warn => "warn",
            Level::Error => "error",
            Level::Fatal => "fatal",
        }
    }
}

// =============================================================================
// Log Areas (categories for filtering)
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Area {
    Api,       // Network calls and fallback decisions
    Store,     // Mock patient store lookups
    State,     // Reducer transitions
    Transform, // Carousel / view derivation
    Download,  // Report generation
    System,    // Startup, configuration
}

impl Area {
    pub fn as_str(&self) -> &'static str {
        match self {
            Area::Api => "api",
            Area::Store => "store",
            Area::State => "state",
            Area::Transform => "transform",
            Area::Download => "download",
            Area::System => "system",
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.listed_in(std::env::var("LOG_AREAS").ok().as_deref())
    }

    // LOG_AREAS: comma-separated list or "all"
    fn listed_in(&self, areas: Option<&str>) -> bool {
        match areas {
            Some("all") | None => true,
            Some(areas) => areas.split(',').any(|a| a.trim() == self.as_str()),
        }
    }
}

// =============================================================================
// Sequence counter and run context
// =============================================================================

static LOG_SEQ: AtomicU64 = AtomicU64::new(0);
static RUN_CONTEXT: OnceLock<RunContext> = OnceLock::new();

fn next_seq() -> u64 {
    LOG_SEQ.fetch_add(1, Ordering::SeqCst)
}

#[derive(Debug)]
struct RunContext {
    run_id: String,
    events: Option<Mutex<BufWriter<File>>>,
    trace: Option<Mutex<BufWriter<File>>>,
}

fn ensure_run_context() -> &'static RunContext {
    RUN_CONTEXT.get_or_init(|| {
        let run_id = std::env::var("RUN_ID")
            .unwrap_or_else(|_| format!("r-{}-{}", ts_epoch_ms(), process::id()));
        let Ok(base) = std::env::var("LOG_DIR") else {
            return RunContext {
                run_id,
                events: None,
                trace: None,
            };
        };
        let mut run_dir = PathBuf::from(base);
        run_dir.push(&run_id);
        if let Err(err) = create_dir_all(&run_dir) {
            eprintln!("[log] failed to create run dir: {}", err);
        }
        let open = |name: &str| match File::create(run_dir.join(name)) {
            Ok(file) => Some(Mutex::new(BufWriter::new(file))),
            Err(err) => {
                eprintln!("[log] failed to create {}: {}", name, err);
                None
            }
        };
        RunContext {
            events: open("events.jsonl"),
            trace: open("trace.jsonl"),
            run_id,
        }
    })
}

fn sanitize_fields(mut fields: Map<String, Value>) -> Map<String, Value> {
    let redacted = Value::String("[REDACTED]".to_string());
    for key in ["authorization", "Authorization", "api_key", "token", "email"] {
        if fields.contains_key(key) {
            fields.insert(key.to_string(), redacted.clone());
        }
    }
    fields
}

fn split_fields(mut fields: Map<String, Value>) -> (Map<String, Value>, Map<String, Value>) {
    let mut top = Map::new();
    for key in ["customer_id", "domain", "source", "msg"] {
        if let Some(value) = fields.remove(key) {
            top.insert(key.to_string(), value);
        }
    }
    (top, fields)
}

fn write_line(writer: &Option<Mutex<BufWriter<File>>>, line: &str) {
    if let Some(writer) = writer {
        if let Ok(mut w) = writer.lock() {
            let _ = writeln!(w, "{}", line);
            let _ = w.flush();
        }
    }
}

// =============================================================================
// Core logging functions
// =============================================================================

/// RFC3339 timestamp with milliseconds
pub fn ts_now() -> String {
    Utc::now().to_rfc3339_opts(chrono::SecondsFormat::Millis, true)
}

/// Epoch milliseconds
pub fn ts_epoch_ms() -> u64 {
    Utc::now().timestamp_millis() as u64
}

/// Whether a record at `level` in `area` would be emitted. Lets callers
/// skip building costly fields.
pub fn enabled(level: Level, area: Area) -> bool {
    level >= Level::from_env() && area.is_enabled()
}

/// Emit a structured log entry
pub fn log(level: Level, area: Area, event: &str, fields: Map<String, Value>) {
    if !enabled(level, area) {
        return;
    }

    emit_record(level, area.as_str(), event, fields);
}

fn build_record(
    run_id: &str,
    level: Level,
    component: &str,
    event: &str,
    fields: Map<String, Value>,
) -> Value {
    let fields = sanitize_fields(fields);
    let (mut top, data) = split_fields(fields);

    let msg = top.remove("msg").unwrap_or(Value::String(String::new()));
    let mut entry = Map::new();
    entry.insert("ts".to_string(), json!(ts_now()));
    entry.insert("run_id".to_string(), json!(run_id));
    entry.insert("seq".to_string(), json!(next_seq()));
    entry.insert("lvl".to_string(), json!(level.as_str().to_uppercase()));
    entry.insert("component".to_string(), json!(component));
    entry.insert("event".to_string(), json!(event));
    entry.insert("msg".to_string(), msg);
    for (k, v) in top {
        entry.insert(k, v);
    }
    entry.insert("data".to_string(), Value::Object(data));
    Value::Object(entry)
}

fn emit_record(level: Level, component: &str, event: &str, fields: Map<String, Value>) {
    let ctx = ensure_run_context();
    let line = build_record(&ctx.run_id, level, component, event, fields).to_string();
    match level {
        Level::Trace | Level::Debug => write_line(&ctx.trace, &line),
        _ => write_line(&ctx.events, &line),
    }
    eprintln!("{}", line);
}

// =============================================================================
// Area-specific helpers
// =============================================================================

/// A network call finished (or was short-circuited) and a source was chosen.
pub fn log_resolution(operation: &str, customer_id: u64, source: &str, detail: Option<&str>) {
    let level = if source == "REAL_API" {
        Level::Debug
    } else {
        Level::Warn
    };
    log(
        level,
        Area::Api,
        "resolved",
        obj(&[
            ("operation", v_str(operation)),
            ("customer_id", json!(customer_id)),
            ("source", v_str(source)),
            ("detail", detail.map(v_str).unwrap_or(Value::Null)),
        ]),
    );
}

/// A reducer transition was applied. The state hash is only computed when
/// the record will be written.
pub fn log_transition(action: &str, applied: bool, seq: u64, state_hash: impl FnOnce() -> String) {
    if !enabled(Level::Debug, Area::State) {
        return;
    }
    log(
        Level::Debug,
        Area::State,
        "transition",
        obj(&[
            ("action", v_str(action)),
            ("applied", Value::Bool(applied)),
            ("state_seq", json!(seq)),
            ("state_hash", Value::String(state_hash())),
        ]),
    );
}

/// The store answered for a different record than the one requested.
pub fn log_substitution(requested: u64, served: u64) {
    log(
        Level::Warn,
        Area::Store,
        "default_substituted",
        obj(&[
            ("customer_id", json!(requested)),
            ("served_customer_id", json!(served)),
            ("msg", v_str("unknown customer, serving default record")),
        ]),
    );
}

pub fn obj(pairs: &[(&str, Value)]) -> Map<String, Value> {
    let mut map = Map::new();
    for (k, v) in pairs {
        map.insert((*k).to_string(), v.clone());
    }
    map
}

pub fn v_str(s: &str) -> Value {
    Value::String(s.to_string())
}

pub fn v_num(n: f64) -> Value {
    json!(n)
}

// =============================================================================
// Timing Scope
// =============================================================================

/// Emits elapsed time for an operation on drop.
pub struct TimingScope {
    area: Area,
    label: &'static str,
    started: Instant,
}

impl TimingScope {
    pub fn new(area: Area, label: &'static str) -> Self {
        Self {
            area,
            label,
            started: Instant::now(),
        }
    }
}

impl Drop for TimingScope {
    fn drop(&mut self) {
        let elapsed_ms = self.started.elapsed().as_secs_f64() * 1000.0;
        log(
            Level::Trace,
            self.area,
            "timing",
            obj(&[("label", v_str(self.label)), ("elapsed_ms", v_num(elapsed_ms))]),
        );
    }
}

// =============================================================================
// Tests
// =============================================================================
