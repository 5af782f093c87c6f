//! The collection manifest: test items and modules handed over by the runner.

use std::collections::BTreeMap;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::ports::filesystem::FileSystem;

/// A marker attached to a test item, e.g. `skip_if_open("BZ:123456")`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Marker {
    /// Marker name.
    pub name: String,
    /// Positional arguments.
    #[serde(default)]
    pub args: Vec<String>,
    /// Keyword arguments.
    #[serde(default)]
    pub kwargs: BTreeMap<String, String>,
}

impl Marker {
    /// The issue argument: `reason=` if given, else the first positional one.
    #[must_use]
    pub fn issue_argument(&self) -> Option<&str> {
        self.kwargs
            .get("reason")
            .or_else(|| self.args.first())
            .map(|s| s.trim())
            .filter(|s| !s.is_empty())
    }

    /// The first positional argument.
    #[must_use]
    pub fn first_arg(&self) -> Option<&str> {
        self.args.first().map(String::as_str)
    }
}

/// Where a test item is defined.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Location {
    /// File path relative to the suite root.
    pub path: String,
    /// Line of the test definition.
    pub line: u32,
    /// Qualified test name.
    pub name: String,
}

/// A test module.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TestModule {
    /// Dotted module name.
    pub name: String,
    /// File path.
    pub path: String,
    /// Module docstring.
    #[serde(default)]
    pub docstring: Option<String>,
    /// Full module source.
    #[serde(default)]
    pub source: String,
}

/// A collected test item.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TestItem {
    /// Runner node id (`tests/foreman/api/test_x.py::TestY::test_z`).
    pub node_id: String,
    /// Name of the module the item belongs to.
    pub module: String,
    /// Where the item is defined.
    pub location: Location,
    /// Docstring of the enclosing class, if any.
    #[serde(default)]
    pub class_docstring: Option<String>,
    /// Docstring of the test function.
    #[serde(default)]
    pub function_docstring: Option<String>,
    /// Markers, closest first.
    #[serde(default)]
    pub markers: Vec<Marker>,
    /// Source of the test function.
    #[serde(default)]
    pub source: String,
}

impl TestItem {
    /// The closest marker named `name`.
    #[must_use]
    pub fn closest_marker(&self, name: &str) -> Option<&Marker> {
        self.markers.iter().find(|m| m.name == name)
    }
}

/// Everything the collector needs to know about one run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CollectionManifest {
    /// Modules the items belong to.
    #[serde(default)]
    pub modules: Vec<TestModule>,
    /// Collected items, in collection order.
    #[serde(default)]
    pub items: Vec<TestItem>,
}

impl CollectionManifest {
    /// Loads a manifest; `.json` files are parsed as JSON, anything else as YAML.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn load(fs: &dyn FileSystem, path: &Path) -> Result<Self> {
        let manifest_error =
            |message: String| Error::Manifest { path: path.display().to_string(), message };

        let content = fs.read_to_string(path).map_err(|e| manifest_error(e.to_string()))?;
        let is_json = path.extension().is_some_and(|ext| ext.eq_ignore_ascii_case("json"));
        if is_json {
            serde_json::from_str(&content).map_err(|e| manifest_error(e.to_string()))
        } else {
            serde_yaml::from_str(&content).map_err(|e| manifest_error(e.to_string()))
        }
    }

    /// Looks up a module by name.
    #[must_use]
    pub fn module(&self, name: &str) -> Option<&TestModule> {
        self.modules.iter().find(|m| m.name == name)
    }
}
