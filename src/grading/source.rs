//! Locating the data source a File widget points at

use serde::Serialize;

use crate::value::{PathLike, PyValue};

/// Where the data comes from and how to show it in a report
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DataSource {
    /// URL or path handed to the data backend
    pub location: String,
    /// `Local: <file name>` for paths, the URL itself otherwise
    pub label: String,
}

/// Picks the data source from File widget settings
///
/// In order of preference: the `url` field, the first web address in
/// `recent_urls`, then the first entry of `recent_paths`.
pub fn data_source(settings: &PyValue) -> Option<DataSource> {
    if !settings.is_dict() {
        return None;
    }
    remote_source(settings).or_else(|| local_source(settings))
}

fn remote_source(settings: &PyValue) -> Option<DataSource> {
    let url = settings
        .get("url")
        .and_then(PyValue::as_str)
        .map(str::trim)
        .filter(|url| url.starts_with("http"));

    let url = match url {
        Some(url) => url,
        None => settings
            .get("recent_urls")?
            .as_list()?
            .iter()
            .filter_map(PyValue::as_str)
            .map(str::trim)
            .find(|url| url.to_lowercase().starts_with("http"))?,
    };

    Some(DataSource {
        location: url.to_string(),
        label: url.to_string(),
    })
}

fn local_source(settings: &PyValue) -> Option<DataSource> {
    let first = settings.get("recent_paths")?.as_list()?.first()?;
    let path = first.as_path_like()?.path().trim();
    if path.is_empty() {
        return None;
    }

    Some(DataSource {
        location: path.to_string(),
        label: format!("Local: {}", PathLike::Plain(path).basename()),
    })
}
