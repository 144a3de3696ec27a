//! Light/dark theme resolution.
//!
//! [`ThemeSync::init`] first asks the enclosing context (explicit config
//! value, or the `RDOCS_THEME` variable set by a parent process). If that is
//! denied or empty, it falls back to the environment's light/dark preference
//! and keeps following it: every change published by the
//! [`PreferenceSource`] is applied live through a `tokio::sync::watch`
//! channel.

use std::str::FromStr;

use tokio::sync::watch;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Theme {
    Light,
    Dark,
}

impl FromStr for Theme {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "light" => Ok(Theme::Light),
            "dark" => Ok(Theme::Dark),
            other => Err(format!("unknown theme: {}", other)),
        }
    }
}

/// Reading the enclosing context's theme was not permitted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccessDenied;

/// The enclosing execution context that may dictate a theme.
pub trait ThemeContext {
    fn read(&self) -> Result<Option<String>, AccessDenied>;
}

/// The operating environment's light/dark preference and its change signal.
pub trait PreferenceSource {
    fn current(&self) -> Theme;
    fn subscribe(&self) -> Option<watch::Receiver<Theme>>;
}

/// Config value first, then `RDOCS_THEME`.
pub struct EnvContext {
    configured: Option<String>,
}

impl EnvContext {
    pub fn new(configured: Option<String>) -> Self {
        Self { configured }
    }
}

impl ThemeContext for EnvContext {
    fn read(&self) -> Result<Option<String>, AccessDenied> {
        if let Some(value) = &self.configured {
            return Ok(Some(value.clone()));
        }
        match std::env::var("RDOCS_THEME") {
            Ok(value) => Ok(Some(value)),
            Err(std::env::VarError::NotPresent) => Ok(None),
            Err(std::env::VarError::NotUnicode(_)) => Err(AccessDenied),
        }
    }
}

/// Terminal background heuristic via `COLORFGBG` (`"15;0"` = light on dark).
///
/// Terminals do not announce preference changes, so there is no subscription.
pub struct TerminalPreference;

impl PreferenceSource for TerminalPreference {
    fn current(&self) -> Theme {
        std::env::var("COLORFGBG")
            .ok()
            .and_then(|v| v.rsplit(';').next().and_then(|bg| bg.parse::<u8>().ok()))
            .map(|bg| if bg == 7 || bg == 15 { Theme::Light } else { Theme::Dark })
            .unwrap_or(Theme::Dark)
    }

    fn subscribe(&self) -> Option<watch::Receiver<Theme>> {
        None
    }
}

/// Where the active theme came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ThemeOrigin {
    Context,
    Environment,
}

pub struct ThemeSync {
    theme: Theme,
    origin: ThemeOrigin,
    updates: Option<watch::Receiver<Theme>>,
}

impl ThemeSync {
    pub fn init(context: &dyn ThemeContext, preference: &dyn PreferenceSource) -> Self {
        let from_context = match context.read() {
            Ok(Some(value)) => value.parse::<Theme>().ok(),
            Ok(None) => None,
            Err(AccessDenied) => {
                tracing::debug!("theme context not readable, using environment preference");
                None
            }
        };

        match from_context {
            Some(theme) => Self {
                theme,
                origin: ThemeOrigin::Context,
                updates: None,
            },
            None => Self {
                theme: preference.current(),
                origin: ThemeOrigin::Environment,
                updates: preference.subscribe(),
            },
        }
    }

    pub fn theme(&self) -> Theme {
        self.theme
    }

    pub fn origin(&self) -> ThemeOrigin {
        self.origin
    }

    /// Apply any preference change published since the last call.
    ///
    /// Returns the new theme when it changed.
    pub fn poll(&mut self) -> Option<Theme> {
        let rx = self.updates.as_mut()?;
        match rx.has_changed() {
            Ok(true) => {
                let next = *rx.borrow_and_update();
                if next != self.theme {
                    self.theme = next;
                    return Some(next);
                }
                None
            }
            Ok(false) => None,
            Err(_) => {
                // Sender dropped; the current value stays.
                self.updates = None;
                None
            }
        }
    }

    /// Wait for the next preference change (pending forever when the theme
    /// came from the context).
    pub async fn changed(&mut self) -> Option<Theme> {
        let rx = self.updates.as_mut()?;
        rx.changed().await.ok()?;
        let next = *rx.borrow_and_update();
        self.theme = next;
        Some(next)
    }
}
