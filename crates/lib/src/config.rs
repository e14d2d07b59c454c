//! Package configuration file and package specifications.
//!
//! A configuration file is a YAML mapping from package names to package
//! entries. Keys named `default` or starting with `default-` are reserved and
//! never selected as packages.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Deserializer};
use serde_yaml::{Mapping, Value};
use thiserror::Error;
use tracing::debug;

use crate::template::{Context, ExpandError, expand_mapping, scalar_text};

/// Errors that can occur while loading configuration or building a package spec.
#[derive(Debug, Error)]
pub enum ConfigError {
  #[error("failed to read config {}: {source}", path.display())]
  Read { path: PathBuf, source: std::io::Error },

  #[error("failed to parse config: {0}")]
  Parse(#[from] serde_yaml::Error),

  #[error("config must be a mapping of package names to package definitions")]
  NotAMapping,

  #[error("config keys must be strings, found {0}")]
  InvalidKey(String),

  #[error("package '{0}' is not defined in the config")]
  UnknownPackage(String),

  #[error("package '{0}' must be a mapping")]
  PackageNotAMapping(String),

  #[error("invalid package name '{0}'")]
  InvalidName(String),

  #[error("package '{name}': {source}")]
  Template {
    name: String,
    #[source]
    source: ExpandError,
  },

  #[error("package '{name}': invalid definition: {source}")]
  InvalidPackage {
    name: String,
    #[source]
    source: serde_yaml::Error,
  },
}

/// A parsed multi-package configuration file.
#[derive(Debug, Clone)]
pub struct ConfigFile {
  entries: Mapping,
}

impl ConfigFile {
  /// Read and parse a configuration file.
  pub fn load(path: &Path) -> Result<Self, ConfigError> {
    let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
      path: path.to_path_buf(),
      source,
    })?;
    debug!(path = %path.display(), "loaded config");
    Self::from_yaml(&text)
  }

  /// Parse configuration from YAML text.
  pub fn from_yaml(text: &str) -> Result<Self, ConfigError> {
    let entries = match serde_yaml::from_str::<Value>(text)? {
      Value::Mapping(entries) => entries,
      _ => return Err(ConfigError::NotAMapping),
    };

    if let Some(key) = entries.keys().find(|key| !key.is_string()) {
      return Err(ConfigError::InvalidKey(format!("{key:?}")));
    }

    Ok(Self { entries })
  }

  /// Package names selected when none are given explicitly, in document order.
  pub fn package_names(&self) -> Vec<String> {
    self
      .entries
      .keys()
      .filter_map(Value::as_str)
      .filter(|key| !is_reserved(key))
      .map(str::to_string)
      .collect()
  }

  /// Build the expanded specification for one package.
  pub fn package(&self, name: &str) -> Result<PackageSpec, ConfigError> {
    match self.entries.get(name) {
      Some(Value::Mapping(entry)) => PackageSpec::from_entry(name, entry),
      Some(_) => Err(ConfigError::PackageNotAMapping(name.to_string())),
      None => Err(ConfigError::UnknownPackage(name.to_string())),
    }
  }
}

fn is_reserved(key: &str) -> bool {
  key == "default" || key.starts_with("default-")
}

/// One entry of the `menuitems` sequence.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct MenuItem {
  #[serde(deserialize_with = "scalar_string")]
  pub title: String,
  #[serde(deserialize_with = "scalar_string")]
  pub directory: String,
  #[serde(deserialize_with = "scalar_string")]
  pub start_page: String,
}

/// A fully expanded package specification.
///
/// Typed fields cover what the build pipeline reads directly. The complete
/// expanded mapping, including keys only templates use, is kept in
/// [`PackageSpec::values`].
#[derive(Debug, Clone, Deserialize)]
pub struct PackageSpec {
  pub name: String,
  pub source: PathBuf,
  #[serde(deserialize_with = "scalar_string")]
  pub upstream_version: String,
  #[serde(deserialize_with = "scalar_string")]
  pub debian_version: String,
  #[serde(default, deserialize_with = "optional_path")]
  pub icon: Option<PathBuf>,
  #[serde(default)]
  pub menu_directory: bool,
  #[serde(default)]
  pub menuitems: Vec<MenuItem>,
  #[serde(skip)]
  values: Mapping,
}

impl PackageSpec {
  /// Build a specification from a raw config entry.
  ///
  /// Menu items are expanded first, each against the package values
  /// overlaid by the item's own values. The package is then expanded against
  /// its own values. Both passes read the raw entry, never partial output.
  pub fn from_entry(name: &str, entry: &Mapping) -> Result<Self, ConfigError> {
    validate_name(name)?;

    let mut raw = entry.clone();
    raw.insert(Value::from("name"), Value::from(name));

    let template_err = |source| ConfigError::Template {
      name: name.to_string(),
      source,
    };

    let menuitems = match raw.get("menuitems") {
      Some(Value::Sequence(items)) => Some(
        items
          .iter()
          .map(|item| match item {
            Value::Mapping(item) => expand_mapping(item, &Context::new(&raw).overlay(item)).map(Value::Mapping),
            other => Ok(other.clone()),
          })
          .collect::<Result<Vec<_>, _>>()
          .map_err(template_err)?,
      ),
      _ => None,
    };

    let mut values = expand_mapping(&raw, &Context::new(&raw)).map_err(template_err)?;
    if let Some(items) = menuitems {
      values.insert(Value::from("menuitems"), Value::Sequence(items));
    }

    let mut spec: PackageSpec =
      serde_yaml::from_value(Value::Mapping(values.clone())).map_err(|source| ConfigError::InvalidPackage {
        name: name.to_string(),
        source,
      })?;
    spec.values = with_optional_keys(values, &spec);

    debug!(package = %spec.name, menuitems = spec.menuitems.len(), "expanded package spec");
    Ok(spec)
  }

  /// The expanded mapping used as template context.
  pub fn values(&self) -> &Mapping {
    &self.values
  }

  /// `<upstream_version>-<debian_version>`
  pub fn full_version(&self) -> String {
    format!("{}-{}", self.upstream_version, self.debian_version)
  }
}

/// Give the optional keys read by the metadata templates a value, so strict
/// rendering never meets them undefined.
fn with_optional_keys(mut values: Mapping, spec: &PackageSpec) -> Mapping {
  let icon = match &spec.icon {
    Some(icon) => Value::from(icon.to_string_lossy().into_owned()),
    None => Value::Null,
  };
  values.insert(Value::from("icon"), icon);

  if !values.contains_key("menu_directory") {
    values.insert(Value::from("menu_directory"), Value::Bool(false));
  }
  if !values.contains_key("menuitems") {
    values.insert(Value::from("menuitems"), Value::Sequence(Vec::new()));
  }
  values
}

fn validate_name(name: &str) -> Result<(), ConfigError> {
  let unsafe_name =
    name.is_empty() || name == "." || name == ".." || name.contains(['/', '\\', '\0']);
  if unsafe_name {
    return Err(ConfigError::InvalidName(name.to_string()));
  }
  Ok(())
}

/// Accept strings and numbers, so `upstream_version: 1.0` reads as `"1.0"`.
fn scalar_string<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
  let value = Value::deserialize(deserializer)?;
  match &value {
    Value::Null | Value::Sequence(_) | Value::Mapping(_) => {
      Err(serde::de::Error::custom(format!("expected a string, found {value:?}")))
    }
    other => Ok(scalar_text(other).map(|text| text.into_owned()).unwrap_or_default()),
  }
}

/// Treat null and the empty string as an absent path.
fn optional_path<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<PathBuf>, D::Error> {
  let value = Option::<String>::deserialize(deserializer)?;
  Ok(value.filter(|path| !path.is_empty()).map(PathBuf::from))
}
