//! Terminal [`Reporter`] implementation (§10.3): plain, batch-oriented
//! progress lines plus a `comfy-table` summary at the end of a run. The
//! pipeline's control flow never depends on this module existing -- tests and
//! non-interactive callers use `sofa_core::reporter::NullReporter` or
//! `TracingReporter` instead.

use comfy_table::{Cell, Color, ContentArrangement, Table};
use sofa_core::reporter::Reporter;
use std::sync::Mutex;
use std::time::Duration;

#[derive(Debug)]
struct StageRow {
    stage: &'static str,
    ok: bool,
    elapsed: Duration,
    sources: Vec<(String, bool, Option<String>)>,
}

/// Prints each stage's progress as it happens, then a summary table on [`summary`].
#[derive(Debug)]
pub struct TerminalReporter {
    rows: Mutex<Vec<StageRow>>,
}

impl Default for TerminalReporter {
    fn default() -> Self {
        Self::new()
    }
}

impl TerminalReporter {
    /// A fresh reporter with no recorded stage history.
    pub fn new() -> Self {
        Self { rows: Mutex::new(Vec::new()) }
    }
}

impl Reporter for TerminalReporter {
    fn stage_start(&self, stage: &str) {
        println!("==> {stage}");
        self.rows.lock().unwrap().push(StageRow {
            stage: leak_stage(stage),
            ok: true,
            elapsed: Duration::default(),
            sources: Vec::new(),
        });
    }

    fn source_done(&self, _stage: &str, source: &str, outcome: &str) {
        println!("    ok   {source} ({outcome})");
        if let Some(row) = self.rows.lock().unwrap().last_mut() {
            row.sources.push((source.to_string(), true, None));
        }
    }

    fn source_failed(&self, _stage: &str, source: &str, error: &str) {
        println!("    fail {source}: {error}");
        if let Some(row) = self.rows.lock().unwrap().last_mut() {
            row.sources.push((source.to_string(), false, Some(error.to_string())));
        }
    }

    fn stage_done(&self, stage: &str, elapsed: Duration, ok: bool) {
        println!(
            "<== {stage} {} ({:.2}s)",
            if ok { "done" } else { "failed" },
            elapsed.as_secs_f64()
        );
        if let Some(row) = self.rows.lock().unwrap().last_mut() {
            row.elapsed = elapsed;
            row.ok = ok;
        }
    }

    fn info(&self, message: &str) {
        println!("    {message}");
    }

    fn warning(&self, message: &str) {
        eprintln!("warning: {message}");
    }

    fn summary(&self, exit_code: i32) {
        let rows = self.rows.lock().unwrap();
        let mut table = Table::new();
        table
            .set_content_arrangement(ContentArrangement::Dynamic)
            .set_header(vec!["Stage", "Status", "Elapsed", "Sources ok", "Sources failed"]);

        for row in rows.iter() {
            let ok_count = row.sources.iter().filter(|(_, ok, _)| *ok).count();
            let fail_count = row.sources.len() - ok_count;
            let status_cell = if row.ok {
                Cell::new("ok").fg(Color::Green)
            } else {
                Cell::new("FAILED").fg(Color::Red)
            };
            table.add_row(vec![
                Cell::new(row.stage),
                status_cell,
                Cell::new(format!("{:.2}s", row.elapsed.as_secs_f64())),
                Cell::new(ok_count.to_string()),
                Cell::new(fail_count.to_string()),
            ]);
        }
        println!("{table}");

        if exit_code == 0 {
            println!("pipeline finished: exit 0");
        } else {
            println!("pipeline finished: exit {exit_code}");
            for row in rows.iter() {
                for (source, ok, error) in &row.sources {
                    if !ok {
                        println!("  {}/{}: {}", row.stage, source, error.as_deref().unwrap_or("unknown error"));
                    }
                }
            }
        }
    }
}

/// `Reporter::stage_start` only ever sees the `&'static str` literals the
/// orchestrator passes in ("Fetch", "Process", "Emit"), so this is a safe,
/// allocation-free narrowing rather than a real leak.
fn leak_stage(stage: &str) -> &'static str {
    match stage {
        "Fetch" => "Fetch",
        "Process" => "Process",
        "Emit" => "Emit",
        _ => "Stage",
    }
}
