//! Report commands
//!
//! Each command loads what it needs, runs the core, and writes one report to
//! `<output_dir>/<YYYY-MM-DD>-report-<kind>.txt`.

use crate::cache;
use anyhow::{Context, Result};
use chrono::{Local, NaiveDate};
use di_log_analyzer::{
    find_duplicates, reduce, render_activity_report, render_last_update_report,
    render_repeat_report, DataSource, ReportKind, ReportOptions, TopologyIndex,
};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Instant;

/// Everything a command needs besides its own arguments
pub struct RunContext {
    pub source: DataSource,
    pub output_dir: PathBuf,
    pub cache_path: PathBuf,
    pub options: ReportOptions,
}

/// Output file for a report generated on `date`
pub fn output_path(output_dir: &Path, kind: ReportKind, date: NaiveDate) -> PathBuf {
    output_dir.join(format!("{}-report-{}.txt", date.format("%Y-%m-%d"), kind.slug()))
}

fn write_report(ctx: &RunContext, kind: ReportKind, content: &str) -> Result<PathBuf> {
    fs::create_dir_all(&ctx.output_dir)
        .with_context(|| format!("Failed to create output directory: {:?}", ctx.output_dir))?;

    let path = output_path(&ctx.output_dir, kind, Local::now().date_naive());
    fs::write(&path, content).with_context(|| format!("Failed to write report: {:?}", path))?;

    Ok(path)
}

/// Not-working and last-time-work reports
pub fn run_activity(ctx: &RunContext, kind: ReportKind, files: &[String]) -> Result<PathBuf> {
    let policy = kind
        .policy()
        .with_context(|| format!("{} does not read telemetry", kind))?;
    log::info!("Generating {} report", kind);
    let started = Instant::now();

    let files = ctx
        .source
        .select_telemetry_files(files)
        .context("Cannot select telemetry files")?;
    let events = ctx
        .source
        .load_events(&files)
        .context("Cannot read telemetry")?;
    log::info!(
        "Loaded {} events from {} files in {:.2}s",
        events.len(),
        files.len(),
        started.elapsed().as_secs_f64()
    );

    let topology = cache::load_or_rebuild(&ctx.source, &ctx.cache_path)?;

    let outcome = reduce(&events, policy, ctx.source.config().pin_count);
    drop(events);
    log::info!("{} pins reported under {} policy", outcome.len(), policy);

    let content = render_activity_report(&topology, &outcome, &ctx.options);
    let path = write_report(ctx, kind, &content)?;

    log::info!(
        "Report written to {:?} in {:.2}s",
        path,
        started.elapsed().as_secs_f64()
    );
    Ok(path)
}

/// Duplicate pin report, read straight from the device catalog
pub fn run_repeat_signal(ctx: &RunContext) -> Result<PathBuf> {
    log::info!("Generating {} report", ReportKind::RepeatSignal);
    let started = Instant::now();

    let devices = ctx
        .source
        .load_devices()
        .context("Cannot read device catalog")?;

    let findings = find_duplicates(&devices);
    log::info!("{} duplicate pin assignments found", findings.len());

    // Exact pin-list clashes hide a device from the other reports
    let index = TopologyIndex::build(&[], &devices, &[]);
    for clash in index.collapsed() {
        log::warn!(
            "'{}' is hidden by '{}' (same key {})",
            clash.replaced,
            clash.kept,
            clash.key
        );
    }

    let content = render_repeat_report(&findings, index.collapsed());
    let path = write_report(ctx, ReportKind::RepeatSignal, &content)?;

    log::info!(
        "Report written to {:?} in {:.2}s",
        path,
        started.elapsed().as_secs_f64()
    );
    Ok(path)
}

/// Device catalog update times
pub fn run_last_update(ctx: &RunContext) -> Result<PathBuf> {
    log::info!("Generating {} report", ReportKind::LastUpdate);
    let started = Instant::now();

    let devices = ctx
        .source
        .load_devices()
        .context("Cannot read device catalog")?;

    let content = render_last_update_report(&devices, &ctx.options);
    let path = write_report(ctx, ReportKind::LastUpdate, &content)?;

    log::info!(
        "Report written to {:?} in {:.2}s",
        path,
        started.elapsed().as_secs_f64()
    );
    Ok(path)
}

/// Drop the cached topology and build it again
pub fn run_prepare(ctx: &RunContext) -> Result<()> {
    cache::clean(&ctx.cache_path)?;
    let index = cache::rebuild(&ctx.source, &ctx.cache_path)?;
    log::info!(
        "Preprocessed {} devices into {:?}",
        index.device_count(),
        ctx.cache_path
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use di_log_analyzer::AnalyzerConfig;

    fn context(dir: &Path) -> RunContext {
        fs::write(
            dir.join("airaConnect.maps.json"),
            r#"[{"_id": "m1", "areasMap": {"a1": {"name": "Hall A"}}}]"#,
        )
        .unwrap();
        fs::write(
            dir.join("airaConnect.devices.json"),
            r#"[{"name": "Press", "areaId": "a1", "gatewayId": "gw1", "communicationEquipmentId": "eq1",
                 "updatedAt": 1709600523000, "signal": [{"pin": "R1", "light": "G"}, {"pin": "R2", "light": "G"}]},
                {"name": "Lathe", "areaId": "a1", "gatewayId": "gw1", "communicationEquipmentId": "eq1",
                 "updatedAt": 1709600523000, "signal": [{"pin": "R1", "light": "R"}]}]"#,
        )
        .unwrap();
        fs::write(dir.join("airaConnect.communicationEquipments.json"), "[]").unwrap();
        fs::write(
            dir.join("airaConnect.machineryMessages.1.json"),
            r#"[{"source": {"gatewayId": "gw1", "communicationEquipmentId": "eq1", "channel": "gw1/eq1"},
                 "data": {"DI1": 0}, "timestamp": 1709600523000}]"#,
        )
        .unwrap();

        RunContext {
            source: DataSource::new(dir, AnalyzerConfig::new()).unwrap(),
            output_dir: dir.join("output"),
            cache_path: dir.join("preprocessed_data.json"),
            options: ReportOptions::new(),
        }
    }

    #[test]
    fn test_output_path() {
        let date = NaiveDate::from_ymd_opt(2024, 3, 5).unwrap();
        let path = output_path(Path::new("output"), ReportKind::NotWorking, date);
        assert_eq!(path, PathBuf::from("output/2024-03-05-report-not-working.txt"));
    }

    #[test]
    fn test_not_working_command_writes_report() {
        let dir = tempfile::tempdir().unwrap();
        let ctx = context(dir.path());

        let path = run_activity(&ctx, ReportKind::NotWorking, &[]).unwrap();

        let content = fs::read_to_string(&path).unwrap();
        assert!(content.contains("\tDI1\tHall A\tPress\tG\t"));
        assert!(content.contains("\tDI1\tHall A\tLathe\tR\t"));
        assert!(ctx.cache_path.exists());
    }

    #[test]
    fn test_activity_command_rejects_catalog_reports() {
        let dir = tempfile::tempdir().unwrap();
        let ctx = context(dir.path());

        assert!(run_activity(&ctx, ReportKind::RepeatSignal, &[]).is_err());
    }

    #[test]
    fn test_repeat_signal_command() {
        let dir = tempfile::tempdir().unwrap();
        let ctx = context(dir.path());

        let path = run_repeat_signal(&ctx).unwrap();

        let content = fs::read_to_string(&path).unwrap();
        assert!(content.ends_with("1\tgw1\teq1\tR1\tPress, Lathe"));
    }

    #[test]
    fn test_last_update_command() {
        let dir = tempfile::tempdir().unwrap();
        let ctx = context(dir.path());

        let path = run_last_update(&ctx).unwrap();

        let content = fs::read_to_string(&path).unwrap();
        assert_eq!(content.lines().count(), 4);
    }

    #[test]
    fn test_prepare_command() {
        let dir = tempfile::tempdir().unwrap();
        let ctx = context(dir.path());
        fs::write(&ctx.cache_path, "stale").unwrap();

        run_prepare(&ctx).unwrap();

        assert!(TopologyIndex::load(&ctx.cache_path).is_ok());
    }
}
