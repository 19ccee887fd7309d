/// DotaForge — Logger
/// JSONL event stream pro analýzy a AI volání

use anyhow::Result;
use chrono::Utc;
use serde::Serialize;
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::PathBuf;

pub struct EventLogger {
    log_dir: PathBuf,
}

impl EventLogger {
    pub fn new(log_dir: impl Into<PathBuf>) -> Self {
        let dir = log_dir.into();
        fs::create_dir_all(&dir).ok();
        Self { log_dir: dir }
    }

    pub fn log<T: Serialize>(&self, event: &T) -> Result<()> {
        let date  = Utc::now().format("%Y-%m-%d").to_string();
        let path  = self.log_dir.join(format!("{date}.jsonl"));
        let line  = serde_json::to_string(event)?;
        let mut f = OpenOptions::new().create(true).append(true).open(&path)?;
        writeln!(f, "{line}")?;
        Ok(())
    }
}

pub fn now_iso() -> String {
    Utc::now().to_rfc3339()
}

// ── Event typy ────────────────────────────────────────────────────────────────

#[derive(Serialize, Debug)]
pub struct MatchAnalyzedEvent {
    pub ts:            String,
    pub event:         &'static str,   // "MATCH_ANALYZED"
    pub match_id:      u64,
    pub duration_secs: u32,
    pub radiant_win:   bool,
    pub radiant_score: u32,
    pub dire_score:    u32,
    pub players:       usize,
}

#[derive(Serialize, Debug)]
pub struct MetricEvent {
    pub ts:       String,
    pub event:    &'static str,   // "PERFORMANCE_METRIC"
    pub match_id: u64,
    pub category: String,
    pub player:   String,
    pub score:    u32,
    pub grade:    String,
}

#[derive(Serialize, Debug)]
pub struct ApiStatusEvent {
    pub ts:          String,
    pub event:       &'static str,    // "API_STATUS"
    pub source:      String,          // "opendota"
    pub scope:       String,          // endpoint ("match", "constants/heroes", ...)
    pub ok:          bool,
    pub status_code: Option<u16>,
    pub message:     String,
}

#[derive(Serialize, Debug)]
pub struct AiStatusEvent {
    pub ts:      String,
    pub event:   &'static str,        // "AI_STATUS"
    pub route:   String,              // "gemini" | "openai"
    pub ok:      bool,
    pub message: String,              // "ok" | chybová hláška extraktoru
}
