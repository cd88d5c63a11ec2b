//! Graph manifests: the entities to resolve plus resolution settings.
//!
//! TOML is the default format; a `.json` extension selects JSON.
//!
//! ```toml
//! [settings]
//! mode = "strict-acyclic"
//! check_self_loops = false
//!
//! [[entity]]
//! id = "main"
//! deps = ["kar"]
//! public = true
//! path = "main/main.ku"
//!
//! [entity.sites]
//! kar = "main/main.ku:3:8"
//! ```
//!
//! A cycle link `from imports to` is located by `from`'s `sites` entry for
//! `to`, then by `from`'s `path`, then by `from` itself.

use std::collections::{BTreeMap, HashSet};
use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use ku_graph::{NodeTable, ResolveOptions, Resolver};
use serde::{Deserialize, Serialize};
use tracing::debug;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Manifest {
    #[serde(default)]
    pub settings: ResolveOptions,

    #[serde(default, rename = "entity")]
    pub entities: Vec<EntityDecl>,
}

/// One declared entity.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct EntityDecl {
    pub id: String,

    #[serde(default)]
    pub deps: Vec<String>,

    /// Visible outside the graph; never pruned.
    #[serde(default)]
    pub public: bool,

    /// Source location used when reporting cycles.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,

    /// Position of each dependency's import, keyed by dependency id.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub sites: BTreeMap<String, String>,
}

impl Manifest {
    /// Read and parse a manifest file.
    pub fn load(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path)
            .with_context(|| format!("failed to read manifest {}", path.display()))?;

        let is_json = path
            .extension()
            .is_some_and(|ext| ext.eq_ignore_ascii_case("json"));
        let manifest = if is_json {
            Self::from_json(&text)
        } else {
            Self::from_toml(&text)
        }
        .with_context(|| format!("failed to parse manifest {}", path.display()))?;

        debug!(
            path = %path.display(),
            entities = manifest.entities.len(),
            mode = %manifest.settings.mode,
            "manifest loaded"
        );
        Ok(manifest)
    }

    pub fn from_toml(text: &str) -> Result<Self> {
        Ok(toml::from_str(text)?)
    }

    pub fn from_json(text: &str) -> Result<Self> {
        Ok(serde_json::from_str(text)?)
    }

    /// Feed every entity into a resolver.
    pub fn resolver(&self, options: ResolveOptions) -> Result<Resolver<String>> {
        let mut resolver = Resolver::with_options(options);
        for decl in &self.entities {
            resolver
                .add(decl.id.clone(), decl.deps.iter().cloned())
                .with_context(|| format!("invalid entity '{}'", decl.id))?;
        }
        Ok(resolver)
    }

    /// Feed every entity into a built node table.
    pub fn table(&self) -> Result<NodeTable<String>> {
        let mut table = NodeTable::with_capacity(self.entities.len());
        for decl in &self.entities {
            table
                .add(decl.id.clone(), decl.deps.iter().cloned())
                .with_context(|| format!("invalid entity '{}'", decl.id))?;
        }
        table.build()?;
        Ok(table)
    }

    /// Ids of entities marked public.
    pub fn public(&self) -> HashSet<String> {
        self.entities
            .iter()
            .filter(|d| d.public)
            .map(|d| d.id.clone())
            .collect()
    }

    /// Source location of the link `from imports to`.
    pub fn site_of<'a>(&'a self, from: &'a str, to: &str) -> &'a str {
        let Some(decl) = self.entities.iter().find(|d| d.id == from) else {
            return from;
        };
        decl.sites
            .get(to)
            .or(decl.path.as_ref())
            .map_or(from, String::as_str)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ku_graph::Mode;

    const SAMPLE: &str = r#"
[settings]
mode = "strict-acyclic"

[[entity]]
id = "fmt"
path = "fmt/fmt.ku"

[[entity]]
id = "main"
deps = ["fmt"]
public = true
"#;

    #[test]
    fn parses_toml_with_settings() {
        let manifest = Manifest::from_toml(SAMPLE).expect("parse");
        assert_eq!(manifest.settings.mode, Mode::StrictAcyclic);
        assert!(!manifest.settings.check_self_loops);
        assert_eq!(manifest.entities.len(), 2);
        assert_eq!(manifest.entities[1].deps, vec!["fmt".to_string()]);
        assert_eq!(manifest.public(), HashSet::from(["main".to_string()]));
    }

    #[test]
    fn settings_default_to_ranking() {
        let manifest = Manifest::from_toml("[[entity]]\nid = \"a\"\n").expect("parse");
        assert_eq!(manifest.settings, ResolveOptions::default());
    }

    #[test]
    fn parses_json() {
        let manifest = Manifest::from_json(
            r#"{"entity": [{"id": "a", "deps": ["b"]}, {"id": "b"}]}"#,
        )
        .expect("parse");
        assert_eq!(manifest.entities.len(), 2);
        assert_eq!(manifest.settings.mode, Mode::Ranking);
    }

    #[test]
    fn rejects_unknown_fields() {
        assert!(Manifest::from_toml("[[entity]]\nid = \"a\"\nimports = []\n").is_err());
    }

    #[test]
    fn site_falls_back_to_path_then_id() {
        let manifest = Manifest::from_toml(SAMPLE).expect("parse");
        assert_eq!(manifest.site_of("fmt", "io"), "fmt/fmt.ku");
        assert_eq!(manifest.site_of("main", "fmt"), "main");
        assert_eq!(manifest.site_of("ghost", "fmt"), "ghost");
    }

    #[test]
    fn site_prefers_per_dependency_entry() {
        let manifest = Manifest::from_toml(
            r#"
[[entity]]
id = "foo"
deps = ["bar", "io"]
path = "foo/foo.ku"

[entity.sites]
bar = "foo/foo.ku:2:8"
"#,
        )
        .expect("parse");
        assert_eq!(manifest.site_of("foo", "bar"), "foo/foo.ku:2:8");
        assert_eq!(manifest.site_of("foo", "io"), "foo/foo.ku");
    }

    #[test]
    fn duplicate_entity_has_context() {
        let manifest =
            Manifest::from_toml("[[entity]]\nid = \"a\"\n[[entity]]\nid = \"a\"\n").expect("parse");
        let err = manifest
            .resolver(ResolveOptions::default())
            .expect_err("duplicate");
        assert!(format!("{err:#}").contains("invalid entity 'a'"));
    }

    #[test]
    fn load_reads_from_disk() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("graph.json");
        fs::write(&path, r#"{"entity": [{"id": "solo"}]}"#).expect("write");

        let manifest = Manifest::load(&path).expect("load");
        assert_eq!(manifest.entities[0].id, "solo");
    }
}
