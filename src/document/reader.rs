//! Single pass over the workflow XML
//!
//! Only the first `nodes`, `links` and `node_properties` children of the root
//! are collected, and only their direct children. Everything else in the
//! file is checked for well-formedness and otherwise skipped.

use std::collections::HashMap;

use log::trace;
use quick_xml::Reader;
use quick_xml::events::{BytesStart, Event};

use super::Document;
use super::model::{ChannelRef, Link, Node, PropertyRecord, parse_enabled};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Section {
    Nodes,
    Links,
    Properties,
}

type Attributes = HashMap<String, String>;

/// Reads a document, returning a description of the first syntax problem
pub(crate) fn read_document(xml: &str) -> Result<Document, String> {
    let mut reader = Reader::from_str(xml);

    let mut document = Document::default();
    let mut depth = 0usize;
    let mut root_seen = false;
    let mut section: Option<Section> = None;
    let mut seen = (false, false, false);
    // settings record being collected and whether its text is still open
    let mut pending: Option<(PropertyRecord, bool)> = None;

    loop {
        let event = reader
            .read_event()
            .map_err(|e| format!("{e} at byte {}", reader.buffer_position()))?;

        match event {
            Event::Start(ref e) | Event::Empty(ref e) => {
                let is_empty = matches!(event, Event::Empty(_));
                let name = e.name();
                let name = name.as_ref();

                match depth {
                    0 => {
                        if root_seen {
                            return Err("more than one root element".to_string());
                        }
                        root_seen = true;
                        let attributes = attributes_of(e)?;
                        document.title = attributes.get("title").cloned();
                        document.description = attributes.get("description").cloned();
                        document.version = attributes.get("version").cloned();
                    }
                    1 => {
                        section = match name {
                            b"nodes" if !seen.0 => {
                                seen.0 = true;
                                document.nodes = Some(Vec::new());
                                Some(Section::Nodes)
                            }
                            b"links" if !seen.1 => {
                                seen.1 = true;
                                Some(Section::Links)
                            }
                            b"node_properties" if !seen.2 => {
                                seen.2 = true;
                                Some(Section::Properties)
                            }
                            _ => None,
                        };
                        if is_empty {
                            section = None;
                        }
                    }
                    2 => match (section, name) {
                        (Some(Section::Nodes), b"node") => {
                            let node = node_from(attributes_of(e)?);
                            if let Some(nodes) = document.nodes.as_mut() {
                                nodes.push(node);
                            }
                        }
                        (Some(Section::Links), b"link") => {
                            document.links.push(link_from(attributes_of(e)?));
                        }
                        (Some(Section::Properties), b"properties") => {
                            let record = record_from(attributes_of(e)?);
                            if is_empty {
                                document.properties.push(record);
                            } else {
                                pending = Some((record, true));
                            }
                        }
                        _ => {}
                    },
                    _ => {
                        // text after a child element is a tail, not settings text
                        if let Some((_, open)) = pending.as_mut() {
                            *open = false;
                        }
                    }
                }

                if !is_empty {
                    depth += 1;
                }
            }
            Event::End(_) => {
                depth = depth.saturating_sub(1);
                match depth {
                    1 => section = None,
                    2 => {
                        if let Some((record, _)) = pending.take() {
                            document.properties.push(record);
                        }
                    }
                    _ => {}
                }
            }
            Event::Text(ref e) => {
                let text = e
                    .unescape()
                    .map_err(|e| format!("{e} at byte {}", reader.buffer_position()))?;
                if depth == 0 {
                    if !text.trim().is_empty() {
                        return Err("text outside the root element".to_string());
                    }
                } else if depth == 3 {
                    append_text(&mut pending, &text);
                }
            }
            Event::CData(ref e) => {
                if depth == 0 {
                    return Err("character data outside the root element".to_string());
                }
                if depth == 3 {
                    append_text(&mut pending, &String::from_utf8_lossy(e));
                }
            }
            Event::Eof => break,
            _ => {}
        }
    }

    if !root_seen {
        return Err("no root element".to_string());
    }
    if depth > 0 {
        return Err("unexpected end of document, element not closed".to_string());
    }

    trace!(
        "Read {} nodes, {} links, {} settings records",
        document.nodes.as_ref().map_or(0, Vec::len),
        document.links.len(),
        document.properties.len()
    );

    Ok(document)
}

fn append_text(pending: &mut Option<(PropertyRecord, bool)>, text: &str) {
    if let Some((record, true)) = pending.as_mut() {
        record.text.get_or_insert_with(String::new).push_str(text);
    }
}

fn attributes_of(element: &BytesStart) -> Result<Attributes, String> {
    let mut attributes = HashMap::new();
    for attribute in element.attributes() {
        let attribute = attribute.map_err(|e| e.to_string())?;
        let key = String::from_utf8_lossy(attribute.key.as_ref()).into_owned();
        let value = attribute
            .unescape_value()
            .map_err(|e| e.to_string())?
            .into_owned();
        attributes.insert(key, value);
    }
    Ok(attributes)
}

fn node_from(mut attributes: Attributes) -> Node {
    Node {
        id: attributes.remove("id"),
        name: attributes.remove("name"),
        title: attributes.remove("title"),
        qualified_name: attributes.remove("qualified_name"),
    }
}

fn link_from(mut attributes: Attributes) -> Link {
    Link {
        id: attributes.remove("id"),
        source_node_id: attributes.remove("source_node_id"),
        sink_node_id: attributes.remove("sink_node_id"),
        source_channel: ChannelRef {
            id: attributes.remove("source_channel_id"),
            name: attributes.remove("source_channel"),
        },
        sink_channel: ChannelRef {
            id: attributes.remove("sink_channel_id"),
            name: attributes.remove("sink_channel"),
        },
        enabled: parse_enabled(attributes.get("enabled").map(String::as_str)),
    }
}

fn record_from(mut attributes: Attributes) -> PropertyRecord {
    PropertyRecord {
        node_id: attributes.remove("node_id"),
        format: attributes.remove("format"),
        text: None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reads_sections() {
        let xml = r#"<?xml version='1.0' encoding='utf-8'?>
<scheme version="2.0" title="Exam" description="">
  <nodes>
    <node id="0" name="File" qualified_name="Orange.widgets.data.owfile.OWFile" title="File" />
    <node id="1" name="Data Table" title="Data Table" />
  </nodes>
  <links>
    <link id="0" source_node_id="0" sink_node_id="1" source_channel="Data" sink_channel="Data" enabled="true" source_channel_id="data" sink_channel_id="data" />
  </links>
  <annotations />
  <node_properties>
    <properties node_id="0" format="literal">{'url': ''}</properties>
    <properties node_id="1" format="pickle" />
  </node_properties>
</scheme>"#;

        let document = read_document(xml).unwrap();
        assert_eq!(document.title.as_deref(), Some("Exam"));
        assert_eq!(document.version.as_deref(), Some("2.0"));

        let nodes = document.nodes.as_ref().unwrap();
        assert_eq!(nodes.len(), 2);
        assert_eq!(
            nodes[0].qualified_name.as_deref(),
            Some("Orange.widgets.data.owfile.OWFile")
        );

        assert_eq!(document.links.len(), 1);
        assert_eq!(document.links[0].source_channel.id.as_deref(), Some("data"));
        assert_eq!(document.links[0].source_channel.name.as_deref(), Some("Data"));

        assert_eq!(document.properties.len(), 2);
        assert_eq!(document.properties[0].text.as_deref(), Some("{'url': ''}"));
        assert_eq!(document.properties[1].text, None);
    }

    #[test]
    fn test_only_first_section_and_direct_children_count() {
        let xml = r#"<scheme>
  <nodes><node id="0" name="File"><node id="9" name="Nested" /></node></nodes>
  <nodes><node id="1" name="Second" /></nodes>
</scheme>"#;

        let document = read_document(xml).unwrap();
        let nodes = document.nodes.as_ref().unwrap();
        assert_eq!(nodes.len(), 1);
        assert_eq!(nodes[0].name.as_deref(), Some("File"));
    }

    #[test]
    fn test_settings_text_is_unescaped_and_keeps_cdata() {
        let xml = r#"<scheme><node_properties>
<properties node_id="2">{'a': 'x &lt; y', <![CDATA['b': 'c & d']]>}</properties>
</node_properties></scheme>"#;

        let document = read_document(xml).unwrap();
        assert_eq!(
            document.properties[0].text.as_deref(),
            Some("{'a': 'x < y', 'b': 'c & d'}")
        );
    }

    #[test]
    fn test_malformed_documents() {
        assert!(read_document("").is_err());
        assert!(read_document("<scheme><nodes></scheme>").is_err());
        assert!(read_document("<scheme><nodes>").is_err());
        assert!(read_document("<scheme/><scheme/>").is_err());
        assert!(read_document("<scheme/>trailing").is_err());
        assert!(read_document(r#"<scheme><nodes><node id="0" id="1"/></nodes></scheme>"#).is_err());
    }

    #[test]
    fn test_missing_nodes_section() {
        let document = read_document("<scheme><links/></scheme>").unwrap();
        assert!(document.nodes.is_none());
        assert!(document.links.is_empty());
    }
}
