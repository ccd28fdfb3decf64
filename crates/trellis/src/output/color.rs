//! Color and styling helpers for CLI output.
//!
//! Semantic Color Theme:
//!   - Success/Done:  green   (completed, UP, ok)
//!   - Warning/Active: yellow (in progress, degraded, version drift)
//!   - Error/Blocked: red     (blocked, DOWN, at risk, violations)
//!   - Info/Reference: cyan   (component, feature and milestone names)
//!   - Muted:         dimmed  (planned, cancelled, field labels)
//!   - Emphasis:      bold    (section headers)

use crate::domain::{ComponentState, Status};
use crate::registry::RiskStatus;
use colored::Colorize;

use super::OutputConfig;

/// Apply semantic "success" color (green) to text.
pub fn success(text: &str, config: &OutputConfig) -> String {
    if !config.use_colors {
        return text.to_string();
    }
    text.green().to_string()
}

/// Apply semantic "error" color (red) to text.
pub fn error(text: &str, config: &OutputConfig) -> String {
    if !config.use_colors {
        return text.to_string();
    }
    text.red().to_string()
}

/// Apply semantic "warning" color (yellow) to text.
pub fn warning(text: &str, config: &OutputConfig) -> String {
    if !config.use_colors {
        return text.to_string();
    }
    text.yellow().to_string()
}

/// Apply semantic "info" color (cyan) to text.
pub fn info(text: &str, config: &OutputConfig) -> String {
    if !config.use_colors {
        return text.to_string();
    }
    text.cyan().to_string()
}

pub(crate) fn bold(text: &str, config: &OutputConfig) -> String {
    if !config.use_colors {
        return text.to_string();
    }
    text.bold().to_string()
}

pub(crate) fn dimmed(text: &str, config: &OutputConfig) -> String {
    if !config.use_colors {
        return text.to_string();
    }
    text.dimmed().to_string()
}

/// Apply color to a feature or milestone status.
pub(crate) fn colorize_status(status: Status, config: &OutputConfig) -> String {
    let text = status.to_string();
    if !config.use_colors {
        return text;
    }
    match status {
        Status::Completed => text.green().to_string(),
        Status::InProgress => text.yellow().to_string(),
        Status::Blocked => text.red().to_string(),
        Status::OnHold => text.magenta().to_string(),
        Status::Planned | Status::Cancelled => text.dimmed().to_string(),
    }
}

/// Apply color to a component's operational state.
pub(crate) fn colorize_state(state: Option<ComponentState>, config: &OutputConfig) -> String {
    let Some(state) = state else {
        return dimmed("-", config);
    };
    let text = state.to_string();
    if !config.use_colors {
        return text;
    }
    match state {
        ComponentState::Up => text.green().to_string(),
        ComponentState::Degraded => text.yellow().to_string(),
        ComponentState::Down => text.red().to_string(),
    }
}

pub(crate) fn colorize_risk(risk: RiskStatus, config: &OutputConfig) -> String {
    match risk {
        RiskStatus::AtRisk => error(&risk.to_string(), config),
        RiskStatus::Ok => success(&risk.to_string(), config),
    }
}

/// Status icon, with ASCII fallback support.
pub(crate) fn status_icon(status: Status, config: &OutputConfig) -> String {
    let icon = if config.use_ascii {
        match status {
            Status::Planned => "o",
            Status::InProgress => ">",
            Status::Completed => "+",
            Status::Blocked => "x",
            Status::OnHold => "=",
            Status::Cancelled => "-",
        }
    } else {
        match status {
            Status::Planned => "○",
            Status::InProgress => "▶",
            Status::Completed => "✓",
            Status::Blocked => "✗",
            Status::OnHold => "⏸",
            Status::Cancelled => "⊘",
        }
    };

    if !config.use_colors {
        return icon.to_string();
    }
    match status {
        Status::Completed => icon.green().to_string(),
        Status::InProgress => icon.yellow().to_string(),
        Status::Blocked => icon.red().to_string(),
        Status::OnHold => icon.magenta().to_string(),
        Status::Planned | Status::Cancelled => icon.dimmed().to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn plain() -> OutputConfig {
        OutputConfig::new(true, false)
    }

    #[test]
    fn no_colors_returns_plain_text() {
        let config = plain();
        assert_eq!(success("done", &config), "done");
        assert_eq!(colorize_status(Status::OnHold, &config), "ON_HOLD");
        assert_eq!(colorize_state(None, &config), "-");
        assert_eq!(colorize_risk(RiskStatus::AtRisk, &config), "at risk");
    }

    #[test]
    fn ascii_icons() {
        let config = plain();
        let icons: Vec<String> = Status::ALL.iter().map(|s| status_icon(*s, &config)).collect();
        assert_eq!(icons, vec!["o", ">", "+", "x", "=", "-"]);
    }
}
