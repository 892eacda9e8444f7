//! Application settings read from TOML.
//!
//! ```toml
//! [[decorated_urls]]
//! pattern = "^/articles/"
//! decorators = "@pjax_block('content', title_variable='title')"
//!
//! [[decorated_urls]]
//! pattern = "^/articles/archive/"
//! decorators = ["@pjax_template()", "@pjax_block('archive')"]
//! ```
//!
//! Settings are plain data. Loading them is the job of `main`, which then
//! passes them to [`PjaxMiddleware::from_settings`](crate::middleware::pjax::PjaxMiddleware::from_settings).

use std::fs;
use std::path::Path;

use serde::Deserialize;

use crate::error::Error;

#[derive(Clone, Debug, Default, Deserialize, PartialEq)]
pub struct Settings {
    /// URL patterns and the decorators applied to matching template responses,
    /// in declaration order.
    #[serde(default)]
    pub decorated_urls: Vec<DecoratedUrlSetting>,
}

#[derive(Clone, Debug, Deserialize, PartialEq)]
pub struct DecoratedUrlSetting {
    pub pattern: String,
    pub decorators: Decorators,
}

/// One decorator expression or a list of them.
#[derive(Clone, Debug, Deserialize, PartialEq)]
#[serde(untagged)]
pub enum Decorators {
    One(String),
    Many(Vec<String>),
}

impl Settings {
    pub fn from_toml_str(text: &str) -> Result<Self, Error> {
        Ok(toml::from_str(text)?)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, Error> {
        Self::from_toml_str(&fs::read_to_string(path)?)
    }
}
