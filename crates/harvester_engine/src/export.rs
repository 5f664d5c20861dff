use std::path::{Path, PathBuf};

use serde_json::json;

use crate::persist::{write_atomically, PersistError};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputFormat {
    /// One permalink per line.
    #[default]
    Lines,
    /// `url` header, one quoted-as-needed row per permalink.
    Csv,
    /// `{"site", "count", "links"}` object.
    Json,
}

#[derive(Debug, thiserror::Error)]
pub enum ExportError {
    #[error("persist error: {0}")]
    Persist(#[from] PersistError),
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
}

pub fn render_links(links: &[String], format: OutputFormat, site: &str) -> Result<String, ExportError> {
    let rendered = match format {
        OutputFormat::Lines => {
            let mut out = String::new();
            for link in links {
                out.push_str(link);
                out.push('\n');
            }
            out
        }
        OutputFormat::Csv => {
            let mut out = String::from("url\r\n");
            for link in links {
                out.push_str(&csv_field(link));
                out.push_str("\r\n");
            }
            out
        }
        OutputFormat::Json => {
            let doc = json!({
                "site": site,
                "count": links.len(),
                "links": links,
            });
            let mut out = serde_json::to_string_pretty(&doc)?;
            out.push('\n');
            out
        }
    };
    Ok(rendered)
}

/// Renders `links` and writes them to `path`, replacing any previous file.
pub fn write_links(
    path: &Path,
    links: &[String],
    format: OutputFormat,
    site: &str,
) -> Result<PathBuf, ExportError> {
    let content = render_links(links, format, site)?;
    Ok(write_atomically(path, &content)?)
}

fn csv_field(value: &str) -> String {
    if value.contains([',', '"', '\n', '\r']) {
        format!("\"{}\"", value.replace('"', "\"\""))
    } else {
        value.to_string()
    }
}
