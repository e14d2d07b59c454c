//! Read-only rendering context.

use serde_yaml::Mapping;

/// A layered, read-only view over YAML mappings.
///
/// Later layers shadow keys of the same name in the layers beneath them.
/// Layers are borrowed; the context never mutates them.
#[derive(Debug, Clone, Default)]
pub struct Context<'a> {
  layers: Vec<&'a Mapping>,
}

impl<'a> Context<'a> {
  pub fn new(base: &'a Mapping) -> Self {
    Self { layers: vec![base] }
  }

  /// Add a layer whose keys shadow every existing layer.
  pub fn overlay(mut self, layer: &'a Mapping) -> Self {
    self.layers.push(layer);
    self
  }

  /// Flatten the layers into the single mapping handed to the renderer.
  ///
  /// A shadowed key keeps its position from the lowest layer that has it.
  pub fn merged(&self) -> Mapping {
    let mut merged = Mapping::new();
    for layer in &self.layers {
      for (key, value) in *layer {
        merged.insert(key.clone(), value.clone());
      }
    }
    merged
  }
}
