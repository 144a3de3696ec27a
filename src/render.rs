//! Plain-text rendering of the manager state for the terminal.
//!
//! Everything here is a pure function of its input, so output can be
//! asserted on directly. Colour is applied only through [`Palette`], which
//! the CLI disables when stdout is not a terminal.

use rabbit_docs_core::models::AggregatedDocument;
use rabbit_docs_core::notify::{Notification, NotificationKind};
use rabbit_docs_core::panel::PanelView;
use rabbit_docs_core::stats::LibraryStats;

use crate::api::ServerStats;
use crate::theme::Theme;

/// ANSI styling derived from the active theme.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Palette {
    enabled: bool,
    theme: Theme,
}

impl Palette {
    pub fn new(theme: Theme, enabled: bool) -> Self {
        Self { enabled, theme }
    }

    pub fn plain() -> Self {
        Self {
            enabled: false,
            theme: Theme::Dark,
        }
    }

    fn paint(&self, code_dark: &str, code_light: &str, text: &str) -> String {
        if !self.enabled {
            return text.to_string();
        }
        let code = match self.theme {
            Theme::Dark => code_dark,
            Theme::Light => code_light,
        };
        format!("\x1b[{}m{}\x1b[0m", code, text)
    }

    pub fn success(&self, text: &str) -> String {
        self.paint("92", "32", text)
    }

    pub fn error(&self, text: &str) -> String {
        self.paint("91", "31", text)
    }

    pub fn heading(&self, text: &str) -> String {
        self.paint("1;97", "1;30", text)
    }

    pub fn dim(&self, text: &str) -> String {
        self.paint("90", "37", text)
    }
}

pub fn format_bytes(bytes: u64) -> String {
    if bytes < 1024 {
        format!("{} B", bytes)
    } else if bytes < 1024 * 1024 {
        format!("{:.1} KB", bytes as f64 / 1024.0)
    } else if bytes < 1024 * 1024 * 1024 {
        format!("{:.1} MB", bytes as f64 / (1024.0 * 1024.0))
    } else {
        format!("{:.2} GB", bytes as f64 / (1024.0 * 1024.0 * 1024.0))
    }
}

/// Format a Unix timestamp relative to `now` (e.g. "3 hours ago").
pub fn format_ts_relative(ts: f64, now: i64) -> String {
    if ts <= 0.0 {
        return "unknown".to_string();
    }
    let ts = ts as i64;
    let delta = now - ts;

    if delta < 0 {
        return format_ts_iso(ts);
    }

    if delta < 60 {
        "just now".to_string()
    } else if delta < 3600 {
        let mins = delta / 60;
        format!("{} min{} ago", mins, if mins == 1 { "" } else { "s" })
    } else if delta < 86400 {
        let hours = delta / 3600;
        format!("{} hour{} ago", hours, if hours == 1 { "" } else { "s" })
    } else if delta < 86400 * 30 {
        let days = delta / 86400;
        format!("{} day{} ago", days, if days == 1 { "" } else { "s" })
    } else {
        format_ts_iso(ts)
    }
}

pub fn format_ts_iso(ts: i64) -> String {
    chrono::DateTime::from_timestamp(ts, 0)
        .map(|dt| dt.format("%Y-%m-%d %H:%M").to_string())
        .unwrap_or_else(|| ts.to_string())
}

fn format_optional_ts(ts: Option<f64>) -> String {
    match ts {
        Some(t) if t > 0.0 => format_ts_iso(t as i64),
        _ => "never".to_string(),
    }
}

/// The document list, or the appropriate empty state.
pub fn document_table(
    docs: &[AggregatedDocument],
    query: &str,
    load_error: Option<&str>,
    palette: Palette,
    now: i64,
) -> String {
    if let Some(err) = load_error {
        return format!("{}\n", palette.error(&format!("Error: {}", err)));
    }
    if docs.is_empty() {
        return if query.is_empty() {
            "No documents in the Rabbit Hole yet.\n".to_string()
        } else {
            format!("No documents match \"{}\".\n", query)
        };
    }

    let width = docs
        .iter()
        .map(|d| d.source.chars().count())
        .max()
        .unwrap_or(0)
        .clamp(6, 60);

    let mut out = String::new();
    out.push_str(&palette.heading(&format!(
        "{:<width$}  {:>6}  {:>10}  {}",
        "SOURCE",
        "CHUNKS",
        "SIZE",
        "UPDATED",
        width = width
    )));
    out.push('\n');
    for doc in docs {
        out.push_str(&format!(
            "{:<width$}  {:>6}  {:>10}  {}\n",
            truncate(&doc.source, width),
            doc.chunk_count,
            format_bytes(doc.total_size_bytes),
            format_ts_relative(doc.last_update, now),
            width = width
        ));
    }
    out.push_str(&palette.dim(&format!(
        "{} document{}",
        docs.len(),
        if docs.len() == 1 { "" } else { "s" }
    )));
    out.push('\n');
    out
}

fn truncate(s: &str, width: usize) -> String {
    if s.chars().count() <= width {
        return s.to_string();
    }
    let mut cut: String = s.chars().take(width.saturating_sub(1)).collect();
    cut.push('…');
    cut
}

/// The info side-panel for one document.
pub fn panel(view: &PanelView, palette: Palette) -> String {
    let mut out = String::new();
    out.push_str(&palette.heading(&view.source));
    out.push('\n');
    out.push_str(&format!("  Chunks:       {}\n", view.chunk_count));
    out.push_str(&format!("  Total size:   {}\n", format_bytes(view.total_size_bytes)));
    out.push_str(&format!(
        "  Average:      {}\n",
        view.average_chunk_size
            .map(format_bytes)
            .unwrap_or_else(|| "-".to_string())
    ));
    out.push_str(&format!("  Last update:  {}\n", format_optional_ts(Some(view.last_update))));
    out.push('\n');
    for chunk in &view.previews {
        let text = if chunk.text.is_empty() {
            palette.dim("(no preview)")
        } else {
            chunk.text.replace('\n', " ")
        };
        out.push_str(&format!(
            "  #{:<4} {:>9}  {}\n",
            chunk.index,
            format_bytes(chunk.size_bytes),
            text
        ));
    }
    if let Some(more) = view.more_label() {
        out.push_str(&format!("  {}\n", palette.dim(&more)));
    }
    out
}

pub fn library_stats(stats: &LibraryStats) -> String {
    let dist = stats.chunk_size_distribution;
    let mut out = String::new();
    out.push_str("Rabbit Hole: Library Stats\n");
    out.push_str("==========================\n\n");
    out.push_str(&format!("  Documents:   {}\n", stats.total_documents));
    out.push_str(&format!("  Chunks:      {}\n", stats.total_chunks));
    out.push_str(&format!("  Characters:  {}\n", stats.total_characters));
    out.push_str(&format!(
        "  Avg chunk:   {}\n",
        stats
            .average_chunk_size
            .map(|n| n.to_string())
            .unwrap_or_else(|| "-".to_string())
    ));
    out.push_str(&format!("  Memory est.: {:.2} MB\n", stats.estimated_memory_mb));
    out.push_str(&format!(
        "  Sizes:       {} small / {} medium / {} large\n",
        dist.small, dist.medium, dist.large
    ));
    out.push_str(&format!("  First:       {}\n", format_optional_ts(stats.first_update)));
    out.push_str(&format!("  Last:        {}\n", format_optional_ts(stats.last_update)));
    out
}

pub fn server_stats(stats: &ServerStats) -> String {
    let dist = stats.chunk_size_distribution;
    let mut out = String::new();
    out.push_str("Rabbit Hole: Server Stats\n");
    out.push_str("=========================\n\n");
    out.push_str(&format!("  Documents:   {}\n", stats.total_documents));
    out.push_str(&format!("  Chunks:      {}\n", stats.total_chunks));
    out.push_str(&format!("  Characters:  {}\n", stats.total_characters));
    out.push_str(&format!("  Memory est.: {:.2} MB\n", stats.estimated_memory_mb));
    out.push_str(&format!(
        "  Sizes:       {} small / {} medium / {} large\n",
        dist.small, dist.medium, dist.large
    ));
    out.push_str(&format!(
        "  First:       {}\n",
        stats.first_update.as_deref().unwrap_or("never")
    ));
    out.push_str(&format!(
        "  Last:        {}\n",
        stats.last_update.as_deref().unwrap_or("never")
    ));
    if !stats.sources.is_empty() {
        out.push_str("\n  Sources:\n");
        for (source, entry) in &stats.sources {
            out.push_str(&format!(
                "    {}  {} chunk{}, {} chars\n",
                source,
                entry.chunks,
                if entry.chunks == 1 { "" } else { "s" },
                entry.characters
            ));
        }
    }
    out
}

pub fn notification(n: &Notification, palette: Palette) -> String {
    match n.kind {
        NotificationKind::Success => palette.success(&format!("✓ {}", n.message)),
        NotificationKind::Error => palette.error(&format!("✗ {}", n.message)),
    }
}
