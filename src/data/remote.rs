//! Loader for data sources given as web addresses

use std::time::Duration;

use log::debug;
use reqwest::blocking::Client;

use crate::errors::{Result, data_load_error};

use super::DataLoader;
use super::loader::{LocalTableLoader, decode_text, delimiter_for_extension, is_remote, parse_table};
use super::table::DataTable;

/// Bodies larger than this are not parsed
const MAX_BODY_BYTES: usize = 64 * 1024 * 1024;

/// Response of a remote fetch
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Fetched {
    pub body: Vec<u8>,
    pub content_type: Option<String>,
}

/// Retrieves the bytes behind a URL
pub trait Fetcher: Send + Sync {
    fn fetch(&self, url: &str) -> Result<Fetched>;
}

/// Blocking HTTP fetcher with a request timeout
#[derive(Debug, Clone)]
pub struct HttpFetcher {
    client: Client,
}

impl HttpFetcher {
    pub fn new(timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .use_rustls_tls()
            .timeout(timeout)
            .build()
            .map_err(|e| data_load_error("http client", &e.to_string()))?;
        Ok(HttpFetcher { client })
    }
}

impl Fetcher for HttpFetcher {
    fn fetch(&self, url: &str) -> Result<Fetched> {
        let response = self
            .client
            .get(url)
            .send()
            .map_err(|e| data_load_error(url, &e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(data_load_error(url, &format!("HTTP {status}")));
        }
        let content_type = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .map(str::to_string);
        let body = response
            .bytes()
            .map_err(|e| data_load_error(url, &e.to_string()))?;

        Ok(Fetched {
            body: body.to_vec(),
            content_type,
        })
    }
}

/// Loads web addresses through a [`Fetcher`] and everything else from disk
pub struct WebTableLoader {
    fetcher: Box<dyn Fetcher>,
}

impl WebTableLoader {
    pub fn new(fetcher: Box<dyn Fetcher>) -> Self {
        WebTableLoader { fetcher }
    }

    /// Loader backed by [`HttpFetcher`]
    pub fn http(timeout: Duration) -> Result<Self> {
        Ok(WebTableLoader::new(Box::new(HttpFetcher::new(timeout)?)))
    }
}

impl DataLoader for WebTableLoader {
    fn load(&self, source: &str) -> Result<DataTable> {
        if !is_remote(source) {
            return LocalTableLoader.load(source);
        }

        let fetched = self.fetcher.fetch(source)?;
        if fetched.body.len() > MAX_BODY_BYTES {
            return Err(data_load_error(source, "response too large"));
        }
        let text = decode_text(&fetched.body);
        let delimiter = delimiter_for_url(source, fetched.content_type.as_deref(), &text);

        let table = parse_table(&text, delimiter).map_err(|e| data_load_error(source, &e))?;
        debug!(
            "Fetched {} rows and {} columns from {source}",
            table.row_count,
            table.variables.len()
        );
        Ok(table)
    }
}

/// Delimiter from the URL's file extension, then the content type, then the first line
fn delimiter_for_url(url: &str, content_type: Option<&str>, text: &str) -> u8 {
    let path = url.split(['?', '#']).next().unwrap_or(url);
    let extension = path
        .rsplit('/')
        .next()
        .and_then(|name| name.rsplit_once('.'))
        .map(|(_, extension)| extension);
    if let Some(delimiter) = extension.and_then(delimiter_for_extension) {
        return delimiter;
    }

    let mime = content_type
        .and_then(|value| value.split(';').next())
        .map(|mime| mime.trim().to_lowercase());
    match mime.as_deref() {
        Some("text/csv") => b',',
        Some("text/tab-separated-values") => b'\t',
        _ if text.lines().next().is_some_and(|line| line.contains('\t')) => b'\t',
        _ => b',',
    }
}
