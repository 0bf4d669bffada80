//! Model file location.
//!
//! Lookup order: `--model`, then `$LIFECYCLES_FILE`, then a project-local
//! `.lifecycles/model.json` if it exists, then the same layout under the home
//! directory.

use std::path::{Path, PathBuf};

pub const MODEL_ENV_VAR: &str = "LIFECYCLES_FILE";
pub const MODEL_DIR: &str = ".lifecycles";
pub const MODEL_FILE: &str = "model.json";

pub fn resolve_model_path(explicit: Option<&str>) -> PathBuf {
    explicit
        .map(PathBuf::from)
        .or_else(|| std::env::var_os(MODEL_ENV_VAR).map(PathBuf::from))
        .or_else(|| Some(local_model_path()).filter(|path| path.exists()))
        .unwrap_or_else(home_model_path)
}

/// `.lifecycles/model.json` relative to the working directory.
pub fn local_model_path() -> PathBuf {
    Path::new(MODEL_DIR).join(MODEL_FILE)
}

/// `.lifecycles/model.json` under `$HOME` (`%USERPROFILE%` on Windows).
pub fn home_model_path() -> PathBuf {
    let home = std::env::var_os("HOME")
        .or_else(|| std::env::var_os("USERPROFILE"))
        .map_or_else(|| PathBuf::from("."), PathBuf::from);
    home.join(local_model_path())
}
