//! Session input files for `poegen run`.
//!
//! ```toml
//! customer_name = "宇宙无敌科技"
//! budget = "50k+"
//! background = """
//! 跨境电商，计划引入智能客服与多语种商品描述生成。
//! """
//! pov_start = "2026-02-25"
//! pov_end = "2026-03-11"
//! team_roster = """
//! 技术负责人: 张三 (乙方)
//! 业务负责人: 李四 (甲方)
//! """
//! ```
//!
//! `pov_start` defaults to today and `pov_end` to two weeks after the start.

use chrono::NaiveDate;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use thiserror::Error;

use poegen_utils::types::{PovWindow, SessionInputs};

#[derive(Error, Debug)]
pub enum SessionFileError {
    #[error("cannot read session file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid session file {path}: {message}")]
    Parse { path: PathBuf, message: String },

    #[error("invalid date for '{field}': '{value}' (expected YYYY-MM-DD)")]
    InvalidDate { field: &'static str, value: String },
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct SessionFile {
    customer_name: String,
    #[serde(default)]
    budget: String,
    #[serde(default)]
    background: String,
    pov_start: Option<String>,
    pov_end: Option<String>,
    #[serde(default)]
    team_roster: String,
}

/// Read and parse a session file.
///
/// # Errors
///
/// Returns `SessionFileError` if the file cannot be read or parsed.
pub fn load_session_inputs(path: &Path, today: NaiveDate) -> Result<SessionInputs, SessionFileError> {
    let content = std::fs::read_to_string(path).map_err(|source| SessionFileError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    parse_session_inputs(&content, today).map_err(|err| match err {
        SessionFileError::Parse { message, .. } => SessionFileError::Parse {
            path: path.to_path_buf(),
            message,
        },
        other => other,
    })
}

/// Parse session file text. Text fields are trimmed.
///
/// # Errors
///
/// Returns `SessionFileError::Parse` for malformed TOML or unknown keys and
/// `SessionFileError::InvalidDate` for unparseable POV dates.
pub fn parse_session_inputs(content: &str, today: NaiveDate) -> Result<SessionInputs, SessionFileError> {
    let file: SessionFile = toml::from_str(content).map_err(|e| SessionFileError::Parse {
        path: PathBuf::new(),
        message: e.message().to_string(),
    })?;

    let start = match &file.pov_start {
        Some(value) => parse_date("pov_start", value)?,
        None => today,
    };
    let pov = match &file.pov_end {
        Some(value) => PovWindow {
            start,
            end: parse_date("pov_end", value)?,
        },
        None => PovWindow::two_weeks_from(start),
    };

    Ok(SessionInputs {
        customer_name: file.customer_name.trim().to_string(),
        budget: file.budget.trim().to_string(),
        background: file.background.trim().to_string(),
        pov,
        team_roster: file.team_roster.trim().to_string(),
    })
}

fn parse_date(field: &'static str, value: &str) -> Result<NaiveDate, SessionFileError> {
    let value = value.trim();
    ["%Y-%m-%d", "%Y/%m/%d"]
        .iter()
        .find_map(|format| NaiveDate::parse_from_str(value, format).ok())
        .ok_or_else(|| SessionFileError::InvalidDate {
            field,
            value: value.to_string(),
        })
}
