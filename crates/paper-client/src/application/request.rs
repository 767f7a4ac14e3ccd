//! Wallpaper request model: parsing the textual command and resolving the
//! image path.
//!
//! Command grammar:
//!
//! ```text
//! [/hyprpaper ]wallpaper <output>,<path>[,<fit>]
//! ```
//!
//! `output` and `fit` may be empty.  An empty output applies the wallpaper to
//! every output; an empty or unknown fit token means [`FitMode::Cover`].

use paper_core::interfaces::wallpaper::FitMode;
use thiserror::Error;

use crate::infrastructure::environment::{Environment, HOME};

/// Prefix the interactive command form carries.
pub const COMMAND_PREFIX: &str = "/hyprpaper";
/// The one command word this client understands.
pub const COMMAND_WORD: &str = "wallpaper";

/// Errors produced while parsing the command text.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ParseError {
    #[error("malformed command {0:?}: expected \"wallpaper <output>,<path>,<fit>\"")]
    Malformed(String),

    #[error("missing wallpaper path")]
    MissingPath,
}

/// Errors produced while resolving the image path.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum PathError {
    #[error("cannot expand ~: HOME is not set")]
    NoHome,

    #[error("cannot resolve {path}: {reason}")]
    NotFound { path: String, reason: String },
}

/// A parsed, not yet resolved, wallpaper request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Request {
    /// Target output; empty means all outputs.
    pub output_name: String,
    /// The path exactly as written in the command.
    pub source_path: String,
    pub fit_mode: FitMode,
}

/// A request whose path has been made absolute and canonical.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedRequest {
    pub output_name: String,
    /// Canonical absolute path, exactly as it goes on the wire.
    pub source_path: String,
    pub fit_mode: FitMode,
}

impl Request {
    /// Parses `raw` into a request.
    ///
    /// # Errors
    ///
    /// [`ParseError::Malformed`] if the command word, the space after it, or
    /// the argument separator is missing; [`ParseError::MissingPath`] if the
    /// path field is empty.
    pub fn parse(raw: &str) -> Result<Self, ParseError> {
        let malformed = || ParseError::Malformed(raw.to_string());

        let command = raw
            .strip_prefix(COMMAND_PREFIX)
            .and_then(|rest| rest.strip_prefix(' '))
            .unwrap_or(raw);
        let (word, arguments) = command.split_once(' ').ok_or_else(malformed)?;
        if word != COMMAND_WORD || !arguments.contains(',') {
            return Err(malformed());
        }

        let mut fields = arguments.splitn(3, ',');
        let output_name = fields.next().unwrap_or_default();
        let source_path = fields.next().unwrap_or_default();
        let fit_token = fields.next().unwrap_or_default();

        if source_path.is_empty() {
            return Err(ParseError::MissingPath);
        }

        Ok(Self {
            output_name: output_name.to_string(),
            source_path: source_path.to_string(),
            fit_mode: fit_mode_from_token(fit_token),
        })
    }

    /// Resolves the source path, consuming the request.
    pub fn resolve(self, env: &dyn Environment) -> Result<ResolvedRequest, PathError> {
        let source_path = resolve_path(&self.source_path, env)?;
        Ok(ResolvedRequest {
            output_name: self.output_name,
            source_path,
            fit_mode: self.fit_mode,
        })
    }
}

/// Maps a fit token to a [`FitMode`].  Never fails; unknown tokens are cover.
pub fn fit_mode_from_token(token: &str) -> FitMode {
    match token {
        "contain" => FitMode::Contain,
        "fit" | "stretch" => FitMode::Stretch,
        "tile" => FitMode::Tile,
        _ => FitMode::Cover,
    }
}

/// Expands a leading `~` to `$HOME` and canonicalizes the result.
///
/// The home lookup happens before any filesystem access, so a missing
/// `HOME` fails without touching the disk.  Canonicalization follows
/// symlinks, so the result is checked again for UTF-8: wire strings cannot
/// carry anything else.
pub fn resolve_path(raw: &str, env: &dyn Environment) -> Result<String, PathError> {
    let expanded = match raw.strip_prefix('~') {
        Some(rest) => {
            let home = env.var(HOME).ok_or(PathError::NoHome)?;
            format!("{home}{rest}")
        }
        None => raw.to_string(),
    };

    let canonical = match std::fs::canonicalize(&expanded) {
        Ok(canonical) => canonical,
        Err(e) => {
            return Err(PathError::NotFound {
                path: expanded,
                reason: e.to_string(),
            })
        }
    };
    canonical.into_os_string().into_string().map_err(|_| PathError::NotFound {
        path: expanded,
        reason: "path is not valid UTF-8".to_string(),
    })
}

// ── Tests ─────────────────────────────────────────────────────────────────────
