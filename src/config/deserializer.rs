//! Custom deserialisers for configuration fields

use std::path::PathBuf;

use serde::Deserialize;

use crate::utils::{add_segment_to_path, process_path};

/// One configured path: a plain string or a list of segments
#[derive(Deserialize)]
#[serde(untagged)]
enum PathEntry {
    Plain(String),
    Segments(Vec<String>),
}

impl PathEntry {
    fn into_path(self) -> PathBuf {
        match self {
            PathEntry::Plain(path) => PathBuf::from(process_path(path)),
            PathEntry::Segments(segments) => {
                let mut path = PathBuf::new();
                for segment in segments {
                    add_segment_to_path(&segment, &mut path);
                }
                path
            }
        }
    }
}

/// Deserialises the submission paths
///
/// Accepts a single path or a list of paths, each of which may be a
/// string or an array of segments.
pub fn deserialize_submission_paths<'de, D>(
    deserializer: D,
) -> std::result::Result<Vec<PathBuf>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    struct SubmissionPathsVisitor;

    impl<'de> serde::de::Visitor<'de> for SubmissionPathsVisitor {
        type Value = Vec<PathBuf>;

        fn expecting(&self, formatter: &mut std::fmt::Formatter) -> std::fmt::Result {
            formatter.write_str("a path or a list of paths (strings or arrays of strings)")
        }

        fn visit_str<E>(self, value: &str) -> std::result::Result<Self::Value, E>
        where
            E: serde::de::Error,
        {
            Ok(vec![PathBuf::from(process_path(value))])
        }

        fn visit_unit<E>(self) -> std::result::Result<Self::Value, E>
        where
            E: serde::de::Error,
        {
            Ok(Vec::new())
        }

        fn visit_seq<A>(self, mut seq: A) -> std::result::Result<Self::Value, A::Error>
        where
            A: serde::de::SeqAccess<'de>,
        {
            let mut paths = Vec::new();
            while let Some(entry) = seq.next_element::<PathEntry>()? {
                paths.push(entry.into_path());
            }
            Ok(paths)
        }
    }

    deserializer.deserialize_any(SubmissionPathsVisitor)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Deserialize)]
    struct Holder {
        #[serde(deserialize_with = "deserialize_submission_paths")]
        paths: Vec<PathBuf>,
    }

    #[test]
    fn test_mixed_entries() {
        let holder: Holder = serde_yaml::from_str(
            "paths:\n  - /srv/inbox\n  - [\"/srv\", \"late\", \"week3\"]\n",
        )
        .unwrap();
        assert_eq!(
            holder.paths,
            vec![PathBuf::from("/srv/inbox"), PathBuf::from("/srv/late/week3")]
        );
    }

    #[test]
    fn test_single_string() {
        let holder: Holder = serde_yaml::from_str("paths: /srv/inbox\n").unwrap();
        assert_eq!(holder.paths, vec![PathBuf::from("/srv/inbox")]);
    }
}
