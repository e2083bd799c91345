//! Simulated concurrent downloads drawn as a live table.
//!
//! Run with: `cargo run --example downloads`

use std::sync::Arc;
use std::thread;
use std::time::Duration;

use live_table::prelude::*;

const FILES: [(&str, u64); 5] = [
    ("ubuntu-24.04-desktop-amd64.iso", 6_114_656_256),
    ("rustc-1.85.0-src.tar.xz", 287_309_824),
    ("線形代数の教科書.pdf", 48_234_496),
    ("dataset-2025-q3.parquet", 1_073_741_824),
    ("README.md", 4_096),
];

fn build_table() -> Result<Table> {
    Ok(Table::new()
        .column(ColumnSpec::new("file").id().summary_named("count"))?
        .separator("  ")
        .column(ColumnSpec::new("progress").func_named("percent").format_named("bar"))?
        .separator(" ")
        .column(
            ColumnSpec::new("ratio")
                .func_named("percent")
                .format_named("percent")
                .align(Align::Right),
        )?
        .separator("  ")
        .column(
            ColumnSpec::new("current")
                .format_named("bytes")
                .align(Align::Right)
                .summary_named("sum"),
        )?
        .separator("  ")
        .column(ColumnSpec::new("elapsed").func_named("elapsed").format_named("duration"))?
        .separator("  ")
        .column(ColumnSpec::new("note").func(|row| match row.get("error") {
            Some(Value::Text(reason)) => Cell::tail(format!("\x1b[31mfailed: {reason}\x1b[0m")),
            _ => Cell::empty(),
        }))?
        .inactive_when(Predicate::new(|row| {
            let number = |key: &str| row.get(key).and_then(Value::as_f64);
            row.get("error").is_some()
                || matches!((number("current"), number("total")), (Some(c), Some(t)) if c >= t)
        }))
        .show_summary(true))
}

fn main() -> Result<()> {
    let table = Arc::new(build_table()?);
    if !table.ready() {
        eprintln!("stdout is not an interactive terminal; nothing to draw");
        return Ok(());
    }

    let workers: Vec<_> = FILES
        .iter()
        .enumerate()
        .map(|(index, &(name, total))| {
            let table = Arc::clone(&table);
            thread::spawn(move || -> Result<()> {
                table.append(Fields::new().with("file", name).with("total", total).with("current", 0))?;
                let step = total / (20 + index as u64 * 7) + 1;
                let mut current = 0;
                while current < total {
                    thread::sleep(Duration::from_millis(60 + index as u64 * 25));
                    current = (current + step).min(total);
                    let mut fields = Fields::new().with("file", name).with("current", current);
                    if index == 3 && current > total / 2 {
                        fields.set("error", "connection reset");
                        table.update(fields)?;
                        return Ok(());
                    }
                    table.update(fields)?;
                }
                Ok(())
            })
        })
        .collect();

    for worker in workers {
        if let Ok(Err(err)) = worker.join() {
            eprintln!("worker failed: {err}");
        }
    }
    Ok(())
}
