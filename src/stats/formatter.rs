//! Stats formatting for different output formats

use super::RelayMetrics;
use crate::config::StatsFormat;

/// Format metrics according to the configured format
pub fn format_metrics(metrics: &RelayMetrics, format: StatsFormat) -> String {
    match format {
        StatsFormat::Pretty => format_pretty(metrics),
        StatsFormat::Json => format_json(metrics),
        StatsFormat::Compact => format_compact(metrics),
    }
}

/// Pretty box format for terminal output
fn format_pretty(m: &RelayMetrics) -> String {
    let first_str = m
        .first_fragment_ms
        .map(|ms| format!("{:.1}ms", ms))
        .unwrap_or_else(|| "N/A".to_string());

    format!(
        r#"┌──────────────────────────────────────────────────────────────────┐
│ Chat Relay Exchange                                              │
├──────────────────────────────────────────────────────────────────┤
│ Model: {:56}│
│ Route: {:56}│
│ Conv:  {:56}│
│ Time:  {:56}│
├──────────────────────────────────────────────────────────────────┤
│ History: {:6} msgs │ Fragments: {:6} │ Chars: {:8}     │
│ First fragment: {:47}│
├──────────────────────────────────────────────────────────────────┤
│ Outcome: {:54}│
│ Committed: {:52}│
│ Duration: {:51.1}ms│
└──────────────────────────────────────────────────────────────────┘
"#,
        truncate(&m.model, 56),
        m.route,
        truncate(&m.conversation_id, 56),
        m.timestamp.format("%Y-%m-%d %H:%M:%S UTC").to_string(),
        m.history_len,
        m.fragments,
        m.output_chars,
        first_str,
        m.outcome.as_str(),
        if m.committed { "yes" } else { "no" },
        m.duration_ms,
    )
}

/// JSON format for structured logging
fn format_json(m: &RelayMetrics) -> String {
    serde_json::to_string(m).unwrap_or_else(|_| "{}".to_string())
}

/// Compact single-line format
fn format_compact(m: &RelayMetrics) -> String {
    let first_str = m
        .first_fragment_ms
        .map(|ms| format!("{:.1}ms", ms))
        .unwrap_or_else(|| "N/A".to_string());

    format!(
        "[{}] conv={} route={} model={} hist={} frags={} chars={} first={} outcome={}{} dur={:.1}ms",
        m.timestamp.format("%H:%M:%S"),
        m.conversation_id,
        m.route,
        m.model,
        m.history_len,
        m.fragments,
        m.output_chars,
        first_str,
        m.outcome.as_str(),
        if m.committed { " committed" } else { "" },
        m.duration_ms
    )
}

/// Truncate a string to max chars with ellipsis
fn truncate(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else {
        let kept: String = s.chars().take(max_len.saturating_sub(3)).collect();
        format!("{}...", kept)
    }
}
