//! Template rendering for package metadata.
//!
//! Configuration strings and the embedded Debian templates are Jinja
//! templates rendered with [`minijinja`]. Rendering is a pure function of the
//! template text and a read-only [`Context`].
//!
//! Undefined variables are strict: printing one, iterating over one or
//! testing its truthiness is an error. Use `is defined` or the `default`
//! filter for optional keys.
//!
//! # Example
//!
//! ```
//! use passepartout_lib::template::{Context, render};
//!
//! let values: serde_yaml::Mapping = serde_yaml::from_str("name: Foo").unwrap();
//! let rendered = render("{{ name }} Help", &Context::new(&values)).unwrap();
//! assert_eq!(rendered, "Foo Help");
//! ```

mod context;
mod expand;

use std::borrow::Cow;
use std::sync::LazyLock;

use minijinja::{Environment, ErrorKind, UndefinedBehavior};
use serde_yaml::Value;
use thiserror::Error;

pub use context::Context;
pub use expand::{ExpandError, expand_mapping};

static ENVIRONMENT: LazyLock<Environment<'static>> = LazyLock::new(|| {
  let mut env = Environment::new();
  env.set_undefined_behavior(UndefinedBehavior::Strict);
  env.set_keep_trailing_newline(true);
  env
});

/// Errors that can occur while rendering a template.
#[derive(Debug, Error)]
pub enum TemplateError {
  #[error("{0}")]
  Render(#[from] minijinja::Error),
}

impl TemplateError {
  pub fn kind(&self) -> ErrorKind {
    match self {
      TemplateError::Render(err) => err.kind(),
    }
  }

  /// Whether the template referenced a variable the context does not define.
  pub fn is_undefined(&self) -> bool {
    self.kind() == ErrorKind::UndefinedError
  }
}

/// Render `template` against `context`.
pub fn render(template: &str, context: &Context<'_>) -> Result<String, TemplateError> {
  Ok(ENVIRONMENT.render_str(template, context.merged())?)
}

/// Convert a scalar YAML value to its text form.
///
/// Returns `None` for sequences and mappings.
pub fn scalar_text(value: &Value) -> Option<Cow<'_, str>> {
  match value {
    Value::Null => Some(Cow::Borrowed("")),
    Value::Bool(b) => Some(Cow::Borrowed(if *b { "true" } else { "false" })),
    Value::Number(n) => Some(Cow::Owned(n.to_string())),
    Value::String(s) => Some(Cow::Borrowed(s.as_str())),
    Value::Tagged(tagged) => scalar_text(&tagged.value),
    Value::Sequence(_) | Value::Mapping(_) => None,
  }
}
