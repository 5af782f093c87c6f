//! Error types for issue collection, resolution, and cache handling.

/// Boxed error returned by port implementations.
pub type PortError = Box<dyn std::error::Error + Send + Sync>;

/// Convenience alias for results carrying [`Error`].
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while gating a test collection on issue state.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// A test carries an issue marker without a usable issue reference.
    ///
    /// Authoring mistakes are surfaced at collection time instead of being
    /// ignored, so the offending test and marker are both reported.
    #[error("test {node_id} has a `{marker}` marker without an issue reference")]
    MalformedMarker {
        /// Node id of the offending test item.
        node_id: String,
        /// Marker name (e.g. `skip_if_open`).
        marker: String,
    },

    /// A string could not be parsed as `<TAG>:<id>`.
    #[error("invalid issue reference `{0}`: expected BZ:<number> or JR:<key>")]
    InvalidIssueRef(String),

    /// Following `dupe_of` links revisited an issue or exceeded the depth limit.
    #[error("malformed duplicate chain starting at {start}: {}", chain.join(" -> "))]
    MalformedDuplicateChain {
        /// The reference the walk started from.
        start: String,
        /// The references visited, in order, including the offending one.
        chain: Vec<String>,
    },

    /// A cache file exists but could not be used.
    #[error("cache file {path}: {message}")]
    Cache {
        /// Path of the cache file.
        path: String,
        /// What went wrong.
        message: String,
    },

    /// Settings could not be loaded.
    #[error("configuration error: {0}")]
    Config(String),

    /// The collection manifest could not be loaded.
    #[error("manifest {path}: {message}")]
    Manifest {
        /// Path of the manifest.
        path: String,
        /// What went wrong.
        message: String,
    },

    /// JSON (de)serialization failure.
    #[error(transparent)]
    Json(#[from] serde_json::Error),

    /// YAML (de)serialization failure.
    #[error(transparent)]
    Yaml(#[from] serde_yaml::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn duplicate_chain_message_lists_the_walk() {
        let err = Error::MalformedDuplicateChain {
            start: "BZ:1".into(),
            chain: vec!["BZ:1".into(), "BZ:2".into(), "BZ:1".into()],
        };
        assert_eq!(
            err.to_string(),
            "malformed duplicate chain starting at BZ:1: BZ:1 -> BZ:2 -> BZ:1"
        );
    }

    #[test]
    fn malformed_marker_names_test_and_marker() {
        let err = Error::MalformedMarker {
            node_id: "tests/foreman/api/test_x.py::test_a".into(),
            marker: "skip_if_open".into(),
        };
        let msg = err.to_string();
        assert!(msg.contains("test_x.py::test_a"));
        assert!(msg.contains("skip_if_open"));
    }
}
