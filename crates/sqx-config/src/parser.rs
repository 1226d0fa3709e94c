//! YAML loading for patch configurations.

use crate::{Error, PatchConfig, PatchSection, Result, ScalarValue, Section};
use std::fs;
use std::path::Path;
use yaml_rust2::{Yaml, YamlLoader};

/// Parse a patch configuration from YAML text.
///
/// An empty document is an empty configuration. Unrecognized top-level keys
/// are recorded and otherwise ignored; their values are not inspected.
///
/// Scalars resolve with the YAML 1.2 core schema: only `true` and `false`
/// are booleans, so `yes`, `no`, `on` and `off` stay strings and are
/// written as they appear.
///
/// # Example
///
/// ```rust
/// use sqx_config::{Section, parse};
///
/// let config = parse("build_mode:\n  PopulationSize: 200\nnotes: ignored\n").unwrap();
/// let build_mode = config.section(Section::BuildMode).unwrap();
/// assert_eq!(build_mode.get("PopulationSize").unwrap().to_patch_string(), "200");
/// assert_eq!(config.ignored_keys(), ["notes"]);
/// ```
///
/// # Errors
///
/// Returns an error for invalid YAML, a non-mapping top level or section,
/// and nested values inside a section.
pub fn parse(content: &str) -> Result<PatchConfig> {
    let mut documents = YamlLoader::load_from_str(content)?;
    if documents.len() > 1 {
        return Err(Error::MultipleDocuments {
            count: documents.len(),
        });
    }

    let mut config = PatchConfig::new();
    let root = match documents.pop() {
        None | Some(Yaml::Null) => return Ok(config),
        Some(Yaml::Hash(hash)) => hash,
        Some(other) => {
            return Err(Error::NotAMapping {
                found: kind_name(&other),
            });
        }
    };

    for (key, value) in root {
        let Some(name) = key.as_str() else {
            tracing::debug!(key = ?key, "ignoring non-string top-level key");
            continue;
        };
        match Section::from_key(name) {
            Some(section) => {
                let parsed = parse_section(section, value)?;
                *config.section_mut(section) = parsed;
            }
            None => {
                tracing::debug!(key = name, "ignoring unrecognized section");
                config.ignore(name.to_string());
            }
        }
    }

    Ok(config)
}

/// Read and parse a patch configuration file.
///
/// # Errors
///
/// Returns [`Error::Io`] if the file cannot be read, or any error from
/// [`parse`].
pub fn load_file(path: &Path) -> Result<PatchConfig> {
    let content = fs::read_to_string(path).map_err(|source| Error::Io {
        path: path.to_path_buf(),
        source,
    })?;
    parse(&content)
}

fn parse_section(section: Section, value: Yaml) -> Result<PatchSection> {
    let hash = match value {
        Yaml::Null => return Ok(PatchSection::new()),
        Yaml::Hash(hash) => hash,
        other => {
            return Err(Error::SectionNotAMapping {
                section: section.key().to_string(),
                found: kind_name(&other),
            });
        }
    };

    let mut entries = PatchSection::new();
    for (key, value) in hash {
        let key = match key {
            Yaml::String(s) => s,
            Yaml::Integer(i) => i.to_string(),
            other => {
                return Err(Error::InvalidKey {
                    section: section.key().to_string(),
                    found: kind_name(&other),
                });
            }
        };
        let scalar = scalar_from_yaml(value).map_err(|found| Error::NotAScalar {
            section: section.key().to_string(),
            key: key.clone(),
            found,
        })?;
        entries.insert(key, scalar);
    }
    Ok(entries)
}

fn scalar_from_yaml(value: Yaml) -> std::result::Result<ScalarValue, &'static str> {
    match value {
        Yaml::String(s) => Ok(ScalarValue::String(s)),
        Yaml::Integer(i) => Ok(ScalarValue::Integer(i)),
        Yaml::Real(text) => Ok(text
            .parse::<f64>()
            .ok()
            .or_else(|| Yaml::Real(text.clone()).as_f64())
            .map_or(ScalarValue::String(text), ScalarValue::Real)),
        Yaml::Boolean(b) => Ok(ScalarValue::Boolean(b)),
        Yaml::Null => Ok(ScalarValue::Null),
        other => Err(kind_name(&other)),
    }
}

fn kind_name(value: &Yaml) -> &'static str {
    match value {
        Yaml::Real(_) => "a real number",
        Yaml::Integer(_) => "an integer",
        Yaml::String(_) => "a string",
        Yaml::Boolean(_) => "a boolean",
        Yaml::Array(_) => "a sequence",
        Yaml::Hash(_) => "a mapping",
        Yaml::Alias(_) => "an alias",
        Yaml::Null => "null",
        Yaml::BadValue => "an invalid value",
    }
}
