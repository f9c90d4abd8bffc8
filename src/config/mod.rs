use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::core::SeverityWeights;
use crate::engine::DEFAULT_RECENT_WINDOW;

#[derive(Debug, Clone, Serialize)]
pub struct EffectiveConfig {
    pub ui: UiConfig,
    pub score: SeverityWeights,
    pub batch: BatchConfig,
    pub report: ReportConfig,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub config_path: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct UiConfig {
    pub color: bool,
    pub max_table_rows: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct BatchConfig {
    pub checks_per_step: usize,
    pub recent_messages_window: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct ReportConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reports_dir: Option<String>,
}

impl Default for EffectiveConfig {
    fn default() -> Self {
        Self {
            ui: UiConfig {
                color: true,
                max_table_rows: 20,
            },
            score: SeverityWeights::default(),
            batch: BatchConfig {
                checks_per_step: 1,
                recent_messages_window: DEFAULT_RECENT_WINDOW,
            },
            report: ReportConfig { reports_dir: None },
            config_path: None,
        }
    }
}

#[derive(Debug, Deserialize)]
struct RawConfig {
    ui: Option<RawUiConfig>,
    score: Option<RawScoreConfig>,
    batch: Option<RawBatchConfig>,
    report: Option<RawReportConfig>,
}

#[derive(Debug, Deserialize)]
struct RawUiConfig {
    color: Option<bool>,
    max_table_rows: Option<usize>,
}

#[derive(Debug, Deserialize)]
struct RawScoreConfig {
    critical: Option<u32>,
    high: Option<u32>,
    normal: Option<u32>,
    low: Option<u32>,
}

#[derive(Debug, Deserialize)]
struct RawBatchConfig {
    checks_per_step: Option<usize>,
    recent_messages_window: Option<usize>,
}

#[derive(Debug, Deserialize)]
struct RawReportConfig {
    reports_dir: Option<String>,
}

pub fn default_config_path(home_dir: &Path) -> PathBuf {
    home_dir.join(".config/siteaudit/config.toml")
}

pub fn load(config_path: Option<&Path>, home_dir: &Path) -> Result<EffectiveConfig> {
    let mut cfg = EffectiveConfig::default();

    let path = config_path
        .map(ToOwned::to_owned)
        .unwrap_or_else(|| default_config_path(home_dir));

    if path.exists() {
        let s = std::fs::read_to_string(&path)
            .with_context(|| format!("failed to read config file: {}", path.display()))?;
        let raw: RawConfig = toml::from_str(&s).context("failed to parse config file (TOML)")?;
        apply_raw_config(&mut cfg, raw);
        cfg.config_path = Some(path.display().to_string());
    }

    apply_env_overrides(&mut cfg)?;
    validate(&cfg)?;

    Ok(cfg)
}

fn apply_raw_config(cfg: &mut EffectiveConfig, raw: RawConfig) {
    if let Some(ui) = raw.ui {
        if let Some(color) = ui.color {
            cfg.ui.color = color;
        }
        if let Some(max_table_rows) = ui.max_table_rows {
            cfg.ui.max_table_rows = max_table_rows;
        }
    }

    if let Some(score) = raw.score {
        if let Some(critical) = score.critical {
            cfg.score.critical = critical;
        }
        if let Some(high) = score.high {
            cfg.score.high = high;
        }
        if let Some(normal) = score.normal {
            cfg.score.normal = normal;
        }
        if let Some(low) = score.low {
            cfg.score.low = low;
        }
    }

    if let Some(batch) = raw.batch {
        if let Some(checks_per_step) = batch.checks_per_step {
            cfg.batch.checks_per_step = checks_per_step;
        }
        if let Some(recent_messages_window) = batch.recent_messages_window {
            cfg.batch.recent_messages_window = recent_messages_window;
        }
    }

    if let Some(report) = raw.report {
        if let Some(reports_dir) = report.reports_dir {
            cfg.report.reports_dir = Some(reports_dir);
        }
    }
}

fn apply_env_overrides(cfg: &mut EffectiveConfig) -> Result<()> {
    if let Ok(v) = std::env::var("SITEAUDIT_UI_COLOR") {
        cfg.ui.color = parse_bool(&v).with_context(|| "SITEAUDIT_UI_COLOR")?;
    }
    if let Ok(v) = std::env::var("SITEAUDIT_UI_MAX_TABLE_ROWS") {
        cfg.ui.max_table_rows = v
            .trim()
            .parse::<usize>()
            .with_context(|| "SITEAUDIT_UI_MAX_TABLE_ROWS")?;
    }
    for (name, slot) in [
        ("SITEAUDIT_SCORE_CRITICAL", &mut cfg.score.critical),
        ("SITEAUDIT_SCORE_HIGH", &mut cfg.score.high),
        ("SITEAUDIT_SCORE_NORMAL", &mut cfg.score.normal),
        ("SITEAUDIT_SCORE_LOW", &mut cfg.score.low),
    ] {
        if let Ok(v) = std::env::var(name) {
            *slot = v.trim().parse::<u32>().with_context(|| name)?;
        }
    }
    if let Ok(v) = std::env::var("SITEAUDIT_BATCH_CHECKS_PER_STEP") {
        cfg.batch.checks_per_step = v
            .trim()
            .parse::<usize>()
            .with_context(|| "SITEAUDIT_BATCH_CHECKS_PER_STEP")?;
    }
    if let Ok(v) = std::env::var("SITEAUDIT_BATCH_RECENT_WINDOW") {
        cfg.batch.recent_messages_window = v
            .trim()
            .parse::<usize>()
            .with_context(|| "SITEAUDIT_BATCH_RECENT_WINDOW")?;
    }
    if let Ok(v) = std::env::var("SITEAUDIT_REPORTS_DIR") {
        let v = v.trim();
        if !v.is_empty() {
            cfg.report.reports_dir = Some(v.to_string());
        }
    }

    Ok(())
}

fn validate(cfg: &EffectiveConfig) -> Result<()> {
    cfg.score.validate()?;
    if cfg.batch.checks_per_step == 0 {
        anyhow::bail!("batch.checks_per_step must be greater than 0");
    }
    if cfg.batch.recent_messages_window == 0 {
        anyhow::bail!("batch.recent_messages_window must be greater than 0");
    }
    Ok(())
}

fn parse_bool(s: &str) -> Result<bool> {
    let s = s.trim().to_ascii_lowercase();
    match s.as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(anyhow::anyhow!(
            "invalid boolean: {s} (expected true|false|1|0|yes|no|on|off)"
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_hold_without_a_config_file() {
        let cfg = EffectiveConfig::default();
        assert!(cfg.ui.color);
        assert_eq!(cfg.ui.max_table_rows, 20);
        assert_eq!(cfg.batch.checks_per_step, 1);
        assert_eq!(cfg.score, SeverityWeights::default());
    }

    #[test]
    fn raw_config_overrides_only_what_it_names() {
        let raw: RawConfig = toml::from_str(
            r#"
[score]
critical = 10

[batch]
checks_per_step = 3
"#,
        )
        .expect("parse");
        let mut cfg = EffectiveConfig::default();
        apply_raw_config(&mut cfg, raw);

        assert_eq!(cfg.score.critical, 10);
        assert_eq!(cfg.score.high, 3);
        assert_eq!(cfg.batch.checks_per_step, 3);
        assert_eq!(cfg.batch.recent_messages_window, DEFAULT_RECENT_WINDOW);
    }

    #[test]
    fn parse_bool_accepts_common_spellings() {
        assert_eq!(parse_bool("YES").ok(), Some(true));
        assert_eq!(parse_bool(" off ").ok(), Some(false));
        assert!(parse_bool("maybe").is_err());
    }

    #[test]
    fn zero_step_size_is_rejected() {
        let mut cfg = EffectiveConfig::default();
        cfg.batch.checks_per_step = 0;
        assert!(validate(&cfg).is_err());
    }
}
