//! CLI smoke entry point.
//!
//! # Responsibility
//! - Verify `hrms_core` linkage, configuration and database bootstrap.
//! - Keep output deterministic for quick local sanity checks.

use hrms_core::db::migrations::latest_version;
use hrms_core::db::open_db;
use hrms_core::{init_logging, AttendanceService, CoreConfig};
use std::process::ExitCode;

fn main() -> ExitCode {
    dotenvy::dotenv().ok();

    match run() {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("hrms_cli error={err}");
            ExitCode::FAILURE
        }
    }
}

fn run() -> Result<(), Box<dyn std::error::Error>> {
    let config = CoreConfig::from_env()?;
    if let Some(log_dir) = config.log_dir.as_deref() {
        init_logging(config.log_level, log_dir)?;
    }

    println!("hrms_core ping={}", hrms_core::ping());
    println!("hrms_core version={}", hrms_core::core_version());

    let mut conn = open_db(&config.db_path)?;
    println!("hrms_core schema_version={}", latest_version());

    let today = chrono::Local::now().date_naive();
    let service = AttendanceService::try_new(&mut conn)?;
    let summary = service.daily_summary(today)?;
    log::info!(
        "event=cli_probe module=cli status=ok total={} present={} absent={} not_marked={}",
        summary.total,
        summary.present,
        summary.absent,
        summary.not_marked
    );
    println!(
        "hrms_core date={} employees={} present={} absent={} not_marked={}",
        summary.attendance_date,
        summary.total,
        summary.present,
        summary.absent,
        summary.not_marked
    );
    Ok(())
}
