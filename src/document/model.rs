//! Workflow graph entities
//!
//! These mirror the elements of a saved workflow. Every attribute is optional
//! because student files are not guaranteed to be complete; an absent
//! attribute never satisfies a lookup.

/// A widget instance on the canvas
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Node {
    pub id: Option<String>,
    /// Widget type, e.g. `File` or `Data Sampler`
    pub name: Option<String>,
    /// Caption shown on the canvas
    pub title: Option<String>,
    pub qualified_name: Option<String>,
}

impl Node {
    /// The node id, if present and non-empty
    pub fn id(&self) -> Option<&str> {
        self.id.as_deref().filter(|id| !id.is_empty())
    }
}

/// One end of a link
///
/// Newer files record a stable channel identifier, older ones only the
/// human-readable name.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ChannelRef {
    pub id: Option<String>,
    pub name: Option<String>,
}

impl ChannelRef {
    /// Matches on the identifier when the attribute exists, else on the name
    pub fn matches(&self, channel: &str) -> bool {
        match &self.id {
            Some(id) => id == channel,
            None => self.name.as_deref() == Some(channel),
        }
    }
}

/// A directed data-flow edge between two nodes
#[derive(Debug, Clone, PartialEq)]
pub struct Link {
    pub id: Option<String>,
    pub source_node_id: Option<String>,
    pub sink_node_id: Option<String>,
    pub source_channel: ChannelRef,
    pub sink_channel: ChannelRef,
    pub enabled: bool,
}

impl Link {
    /// Exact endpoint and channel comparison; disabled links never connect
    pub fn connects(
        &self,
        source_id: &str,
        sink_id: &str,
        source_channel: &str,
        sink_channel: &str,
    ) -> bool {
        self.enabled
            && self.source_node_id.as_deref() == Some(source_id)
            && self.sink_node_id.as_deref() == Some(sink_id)
            && self.source_channel.matches(source_channel)
            && self.sink_channel.matches(sink_channel)
    }
}

impl Default for Link {
    fn default() -> Self {
        Link {
            id: None,
            source_node_id: None,
            sink_node_id: None,
            source_channel: ChannelRef::default(),
            sink_channel: ChannelRef::default(),
            enabled: true,
        }
    }
}

/// Saved widget settings as found in the file, not yet decoded
#[derive(Debug, Clone, PartialEq, Default)]
pub struct PropertyRecord {
    pub node_id: Option<String>,
    pub format: Option<String>,
    pub text: Option<String>,
}

/// Parses the `enabled` attribute; anything but a case-insensitive `true` disables
pub(crate) fn parse_enabled(value: Option<&str>) -> bool {
    value.is_none_or(|value| value.to_lowercase() == "true")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn channel(id: Option<&str>, name: Option<&str>) -> ChannelRef {
        ChannelRef {
            id: id.map(str::to_string),
            name: name.map(str::to_string),
        }
    }

    #[test]
    fn test_channel_identifier_is_authoritative() {
        let both = channel(Some("data"), Some("Data"));
        assert!(both.matches("data"));
        assert!(!both.matches("Data"));

        let name_only = channel(None, Some("Data"));
        assert!(name_only.matches("Data"));
        assert!(!name_only.matches("data"));

        assert!(!channel(None, None).matches("data"));
    }

    #[test]
    fn test_parse_enabled() {
        assert!(parse_enabled(None));
        assert!(parse_enabled(Some("true")));
        assert!(parse_enabled(Some("True")));
        assert!(!parse_enabled(Some("false")));
        assert!(!parse_enabled(Some("1")));
        assert!(!parse_enabled(Some("")));
    }

    #[test]
    fn test_node_id_ignores_empty() {
        let node = Node {
            id: Some(String::new()),
            ..Node::default()
        };
        assert_eq!(node.id(), None);
    }

    #[test]
    fn test_disabled_link_never_connects() {
        let mut link = Link {
            source_node_id: Some("0".to_string()),
            sink_node_id: Some("1".to_string()),
            source_channel: channel(Some("data"), None),
            sink_channel: channel(Some("data"), None),
            ..Link::default()
        };
        assert!(link.connects("0", "1", "data", "data"));
        assert!(!link.connects(" 0", "1", "data", "data"));

        link.enabled = false;
        assert!(!link.connects("0", "1", "data", "data"));
    }
}
