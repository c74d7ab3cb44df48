use anyhow::Result;
use reqprof::{Heap, ProfileRecord, RenderedDump, Value, render};
use serde::Serialize;

pub struct CliLogger {
    json: bool,
    no_color: bool,
}

impl CliLogger {
    pub fn new(json: bool, no_color: bool) -> Self {
        Self { json, no_color }
    }

    /// JSON in `--json` mode, otherwise the dumper's plain rendering.
    pub fn print_serialized<T: Serialize>(&self, value: &T) -> Result<()> {
        let json = serde_json::to_value(value)?;
        if self.json {
            println!("{json}");
            return Ok(());
        }
        let dump = render(&Value::from_json(&json), &Heap::new(), 0, false);
        println!("{}", dump.text);
        Ok(())
    }

    pub fn print_history(&self, session: &str, records: &[ProfileRecord]) -> Result<()> {
        if self.json {
            println!("{}", serde_json::to_string(records)?);
            return Ok(());
        }

        let mut out = String::new();
        out.push_str(&format!(
            "{} {} {}\n",
            self.style("reqprof", "36;1"),
            self.style("session", "90"),
            session
        ));
        if records.is_empty() {
            out.push_str(&format!("{}\n", self.style("no records", "33")));
        }
        for rec in records {
            let method = if rec.ajax {
                format!("{} ajax", rec.request_method)
            } else {
                rec.request_method.clone()
            };
            out.push_str(&format!(
                "{} {} {} {}\n",
                self.style(rec.microtime.as_str(), "37;1"),
                self.style(&rec.date, "90"),
                self.style(&method, "32"),
                rec.url
            ));
            out.push_str(&format!(
                "  {} marks={} prints={} queries={} ({:.3}s)\n",
                self.style("counts", "90"),
                rec.memories.len(),
                rec.prints.len(),
                rec.queries.len(),
                rec.query_time()
            ));
            if let Some(last) = rec.memories.last() {
                out.push_str(&format!("  {} {}\n", self.style("last", "90"), last.summary()));
            }
        }
        println!("{}", out.trim_end());
        Ok(())
    }

    pub fn print_dump(&self, dump: &RenderedDump) -> Result<()> {
        if self.json {
            println!("{}", serde_json::to_string(dump)?);
            return Ok(());
        }
        println!("{}", dump.text);
        Ok(())
    }

    pub fn print_error(&self, msg: &str) {
        if self.json {
            let out = serde_json::json!({
                "status": "error",
                "message": msg,
            });
            println!("{out}");
            return;
        }
        eprintln!("{} {msg}", self.style("error", "31;1"));
    }

    fn style(&self, text: &str, ansi: &str) -> String {
        if self.no_color {
            return text.to_string();
        }
        format!("\x1b[{ansi}m{text}\x1b[0m")
    }
}
