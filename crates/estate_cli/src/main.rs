//! CLI smoke and maintenance entry point.
//!
//! # Responsibility
//! - Verify `estate_core` linkage (`ping`, version).
//! - Audit a database file for divergent location/property references.
//!
//! Usage: `estate_cli [DB_PATH]`. Exit code is 1 when the audit finds
//! violations and 2 when the database is missing or cannot be opened.

use estate_core::{check_integrity, open_db, IntegrityReport, RepoResult};
use std::path::Path;
use std::process::ExitCode;

fn main() -> ExitCode {
    println!("estate_core ping={}", estate_core::ping());
    println!("estate_core version={}", estate_core::core_version());

    let Some(db_path) = std::env::args().nth(1) else {
        return ExitCode::SUCCESS;
    };
    if !Path::new(&db_path).is_file() {
        eprintln!("estate_cli: database file not found: `{db_path}`");
        return ExitCode::from(2);
    }
    match audit(Path::new(&db_path)) {
        Ok(report) => {
            match serde_json::to_string_pretty(&report) {
                Ok(text) => println!("{text}"),
                Err(err) => eprintln!("estate_cli: cannot render report: {err}"),
            }
            if report.is_consistent() {
                ExitCode::SUCCESS
            } else {
                ExitCode::from(1)
            }
        }
        Err(err) => {
            eprintln!("estate_cli: integrity audit failed for `{db_path}`: {err}");
            ExitCode::from(2)
        }
    }
}

fn audit(db_path: &Path) -> RepoResult<IntegrityReport> {
    let conn = open_db(db_path)?;
    check_integrity(&conn)
}
