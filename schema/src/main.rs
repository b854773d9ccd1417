use std::{
    fs::{self, canonicalize},
    path::PathBuf,
};

use anyhow::{Context, Result};
use schemars::schema_for;
use settings::Settings;

const VSCODE_DIR: &str = "../.vscode";

fn main() -> Result<()> {
    let vscode_dir = PathBuf::from(env!("CARGO_MANIFEST_DIR")).join(VSCODE_DIR);
    fs::create_dir_all(&vscode_dir)?;
    let vscode_dir = canonicalize(vscode_dir).context("定位 .vscode 目录失败")?;

    let settings_schema = serde_json::to_string_pretty(&schema_for!(Settings))?;
    let schema_file = vscode_dir.join("settings.schema.json");
    fs::write(&schema_file, settings_schema)?;
    println!("已生成 {}", schema_file.display());
    Ok(())
}
