//! Saved workflow documents
//!
//! A [`Document`] is the read-only graph of one `.ows` file: its widget
//! nodes, the links between them and each node's saved settings.

mod model;
mod properties;
mod reader;

use std::fs;
use std::path::{Path, PathBuf};

use log::{debug, trace};

use crate::errors::{Result, file_operation_error, malformed_document_error, not_found_error};

pub use model::{ChannelRef, Link, Node, PropertyRecord};
pub use properties::{PropertyFormat, PropertyValue};

const UTF8_BOM: &str = "\u{feff}";

/// A parsed workflow
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Document {
    pub title: Option<String>,
    pub description: Option<String>,
    pub version: Option<String>,
    /// `None` when the file has no `nodes` section at all
    pub(crate) nodes: Option<Vec<Node>>,
    pub(crate) links: Vec<Link>,
    pub(crate) properties: Vec<PropertyRecord>,
}

impl Document {
    /// Loads and parses a workflow file
    ///
    /// # Errors
    /// * `Error::NotFound` if the path does not exist
    /// * `Error::FileOperation` if it cannot be read
    /// * `Error::MalformedDocument` if it is not well-formed XML
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Document> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(not_found_error(path.to_path_buf()));
        }

        let bytes = fs::read(path).map_err(|e| file_operation_error(e, path.to_path_buf(), "read"))?;
        let text = String::from_utf8(bytes)
            .map_err(|_| malformed_document_error(path.to_path_buf(), "not valid UTF-8"))?;

        debug!("Parsing workflow {}", path.display());
        Self::parse_with_path(&text, path.to_path_buf())
    }

    /// Parses workflow XML held in memory
    pub fn parse(xml: &str) -> Result<Document> {
        Self::parse_with_path(xml, PathBuf::from("<memory>"))
    }

    fn parse_with_path(xml: &str, path: PathBuf) -> Result<Document> {
        let xml = xml.strip_prefix(UTF8_BOM).unwrap_or(xml);
        reader::read_document(xml).map_err(|detail| malformed_document_error(path, &detail))
    }

    /// Nodes in document order; empty when the `nodes` section is missing
    pub fn nodes(&self) -> &[Node] {
        self.nodes.as_deref().unwrap_or_default()
    }

    pub fn links(&self) -> &[Link] {
        &self.links
    }

    /// First node whose name equals `name` exactly
    pub fn find_node_by_name(&self, name: &str) -> Option<&Node> {
        self.nodes()
            .iter()
            .find(|node| node.name.as_deref() == Some(name))
    }

    /// Node whose id equals `id`, ignoring surrounding whitespace on both sides
    pub fn find_node_by_id(&self, id: &str) -> Option<&Node> {
        let id = id.trim();
        self.nodes()
            .iter()
            .find(|node| node.id.as_deref().map(str::trim) == Some(id))
    }

    /// Decoded settings of a node
    ///
    /// Returns `None` when the node has no settings record or the record
    /// cannot be decoded.
    pub fn properties(&self, node_id: &str) -> Option<PropertyValue> {
        let record = self
            .properties
            .iter()
            .find(|record| record.node_id.as_deref() == Some(node_id))?;

        match properties::decode(record) {
            Ok(value) => Some(value),
            Err(e) => {
                debug!("Ignoring settings: {e}");
                None
            }
        }
    }

    /// Whether an enabled link joins the two nodes on the given channels
    ///
    /// Node ids are compared exactly, without trimming.
    pub fn link_exists(
        &self,
        source_id: &str,
        sink_id: &str,
        source_channel: &str,
        sink_channel: &str,
    ) -> bool {
        let found = self
            .links
            .iter()
            .any(|link| link.connects(source_id, sink_id, source_channel, sink_channel));
        trace!(
            "Link {source_id}({source_channel}) -> {sink_id}({sink_channel}): {}",
            if found { "found" } else { "missing" }
        );
        found
    }
}
