use std::fmt;
use std::str::FromStr;

use anyhow::Result;
use thiserror::Error;

use crate::cache::token::Token;

const FORMAT_BARE: &str = "bare";
const FORMAT_HEADER: &str = "header";
const FORMAT_JSON: &str = "json";
const FORMAT_JSON_COMPACT: &str = "json_compact";
const FORMAT_PRETTY: &str = "pretty";

#[derive(Debug, Error, PartialEq, Eq)]
#[error("Invalid choice: '{0}' (choose from 'bare', 'header', 'json', 'json_compact', 'pretty')")]
pub struct InvalidFormat(pub String);

/// How a token is printed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    /// access token only
    Bare,
    /// `Authorization: <type> <token>`
    Header,
    /// raw provider payload, indented
    Json,
    /// raw provider payload, minified
    JsonCompact,
    /// credential type and access token for humans
    Pretty,
}

impl FromStr for OutputFormat {
    type Err = InvalidFormat;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            FORMAT_BARE => Ok(OutputFormat::Bare),
            FORMAT_HEADER => Ok(OutputFormat::Header),
            FORMAT_JSON => Ok(OutputFormat::Json),
            FORMAT_JSON_COMPACT => Ok(OutputFormat::JsonCompact),
            FORMAT_PRETTY => Ok(OutputFormat::Pretty),
            other => Err(InvalidFormat(other.to_string())),
        }
    }
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            OutputFormat::Bare => FORMAT_BARE,
            OutputFormat::Header => FORMAT_HEADER,
            OutputFormat::Json => FORMAT_JSON,
            OutputFormat::JsonCompact => FORMAT_JSON_COMPACT,
            OutputFormat::Pretty => FORMAT_PRETTY,
        };
        f.write_str(name)
    }
}

impl OutputFormat {
    /// Render `token`; no token renders nothing.
    pub fn render(&self, token: Option<&Token>, credential_type: &str) -> Result<Option<String>> {
        let Some(token) = token else {
            return Ok(None);
        };
        let rendered = match self {
            OutputFormat::Bare => token.access_token.clone(),
            OutputFormat::Header => build_header(&token.token_type, &token.access_token),
            OutputFormat::Json => serde_json::to_string_pretty(&token.raw)?,
            OutputFormat::JsonCompact => serde_json::to_string(&token.raw)?,
            OutputFormat::Pretty => format!(
                "Fetched credentials of type:\n  {}\nAccess Token:\n  {}",
                credential_type, token.access_token
            ),
        };
        Ok(Some(rendered))
    }
}

/// The token in standard HTTP header form.
pub fn build_header(token_type: &str, access_token: &str) -> String {
    format!("Authorization: {} {}", token_type, access_token)
}
