#![allow(dead_code)]

use assert_cmd::cargo_bin;
use chrono::{Duration, Utc};
use serde_json::json;
use std::fs;
use std::io::Error;
use std::path::Path;
use std::process::Command;

/// A `mallpass` command pointed at `data_dir`.
pub fn mallpass(data_dir: &Path) -> Command {
    let mut cmd = Command::new(cargo_bin!("mallpass"));
    cmd.arg("--data-dir").arg(data_dir);
    cmd
}

/// Writes a sessions file holding one user who entered `hours_ago` hours ago.
pub fn seed_session(data_dir: &Path, user_id: &str, name: &str, hours_ago: f64) -> Result<(), Error> {
    let entry = Utc::now() - Duration::seconds((hours_ago * 3600.0) as i64);
    let sessions = json!({
        user_id: {
            "entry_time": entry.to_rfc3339(),
            "data": { "name": name, "email": user_id, "phone": "" }
        }
    });
    fs::create_dir_all(data_dir)?;
    fs::write(data_dir.join("sessions.json"), serde_json::to_string_pretty(&sessions)?)
}

pub fn seed_balance(data_dir: &Path, user_id: &str, amount: u32) -> Result<(), Error> {
    fs::create_dir_all(data_dir)?;
    fs::write(
        data_dir.join("balance.json"),
        serde_json::to_string(&json!({ user_id: amount }))?,
    )
}
