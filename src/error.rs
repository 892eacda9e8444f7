//! Unified error type.

use std::fmt;

/// The error type returned by the crate's fallible operations.
///
/// Application-level errors (404, 422, etc.) are expressed as HTTP
/// [`Response`](crate::Response) values, not as `Error`s. This type surfaces
/// infrastructure failures and misconfiguration discovered at startup.
#[derive(Debug)]
pub enum Error {
    /// Binding to a port or accepting a connection failed.
    Io(std::io::Error),
    /// The PJAX configuration table could not be built.
    ImproperlyConfigured(ImproperlyConfigured),
    /// The settings file is not valid TOML or has the wrong shape.
    Settings(toml::de::Error),
    /// The application's [`Render`](crate::Render) implementation failed.
    Render(String),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Io(e) => write!(f, "io: {e}"),
            Self::ImproperlyConfigured(e) => write!(f, "improperly configured: {e}"),
            Self::Settings(e) => write!(f, "settings: {e}"),
            Self::Render(msg) => write!(f, "render: {msg}"),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Io(e) => Some(e),
            Self::ImproperlyConfigured(e) => Some(e),
            Self::Settings(e) => Some(e),
            Self::Render(_) => None,
        }
    }
}

impl From<std::io::Error> for Error {
    fn from(e: std::io::Error) -> Self {
        Self::Io(e)
    }
}

impl From<ImproperlyConfigured> for Error {
    fn from(e: ImproperlyConfigured) -> Self {
        Self::ImproperlyConfigured(e)
    }
}

impl From<toml::de::Error> for Error {
    fn from(e: toml::de::Error) -> Self {
        Self::Settings(e)
    }
}

// ── Configuration errors ──────────────────────────────────────────────────────

/// A decorator expression or URL pattern that cannot be used.
///
/// Carries the offending text verbatim and the rule it broke, so the startup
/// log names exactly which line of configuration to fix.
#[derive(Debug)]
pub struct ImproperlyConfigured {
    pub expr: String,
    pub kind: ConfigErrorKind,
}

/// The rule a piece of PJAX configuration violated.
#[derive(Debug)]
pub enum ConfigErrorKind {
    MissingMarker,
    Syntax(String),
    NotACall,
    UnknownFunction(String),
    Unpacking,
    NonStringArgument,
    InvalidArguments(String),
    InvalidPattern(regex::Error),
}

impl ImproperlyConfigured {
    pub(crate) fn new(expr: &str, kind: ConfigErrorKind) -> Self {
        Self { expr: expr.to_owned(), kind }
    }
}

impl fmt::Display for ImproperlyConfigured {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let ConfigErrorKind::InvalidPattern(e) = &self.kind {
            return write!(f, "\"{}\" is not a valid URL pattern: {e}", self.expr);
        }
        write!(f, "\"{}\" does not define a valid PJAX decorator: {}", self.expr, self.kind)
    }
}

impl fmt::Display for ConfigErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MissingMarker => f.write_str("expression should start with '@'"),
            Self::Syntax(msg) => write!(f, "invalid syntax: {msg}"),
            Self::NotACall => f.write_str(
                "decorator expression must be a single call to pjax_block or pjax_template",
            ),
            Self::UnknownFunction(name) => write!(
                f,
                "decorator expression must be a single call to pjax_block or pjax_template, not `{name}`",
            ),
            Self::Unpacking => f.write_str("unpacking * and ** arguments is not supported"),
            Self::NonStringArgument => f.write_str("only string arguments are allowed"),
            Self::InvalidArguments(msg) => write!(f, "invalid arguments: {msg}"),
            Self::InvalidPattern(e) => write!(f, "{e}"),
        }
    }
}

impl std::error::Error for ImproperlyConfigured {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match &self.kind {
            ConfigErrorKind::InvalidPattern(e) => Some(e),
            _ => None,
        }
    }
}
