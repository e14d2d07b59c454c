//! Template expansion over configuration mappings.

use serde_yaml::{Mapping, Value};
use thiserror::Error;

use super::{Context, TemplateError, render, scalar_text};

/// A string value in a mapping failed to render.
#[derive(Debug, Error)]
#[error("failed to expand key '{key}': {source}")]
pub struct ExpandError {
  pub key: String,
  #[source]
  pub source: TemplateError,
}

/// Render every string value of `mapping` against `context`.
///
/// Returns a new mapping with the same keys in the same order. Only strings
/// can be templates; every other value is cloned unchanged. Nested sequences
/// and mappings are not descended into.
///
/// # Errors
///
/// Returns the first [`ExpandError`] encountered, naming the offending key.
pub fn expand_mapping(mapping: &Mapping, context: &Context<'_>) -> Result<Mapping, ExpandError> {
  let mut expanded = Mapping::with_capacity(mapping.len());

  for (key, value) in mapping {
    let value = match value {
      Value::String(template) => Value::String(render(template, context).map_err(|source| ExpandError {
        key: key_name(key),
        source,
      })?),
      other => other.clone(),
    };
    expanded.insert(key.clone(), value);
  }

  Ok(expanded)
}

fn key_name(key: &Value) -> String {
  scalar_text(key)
    .map(|text| text.into_owned())
    .unwrap_or_else(|| format!("{key:?}"))
}
