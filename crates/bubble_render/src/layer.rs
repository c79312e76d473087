//! Offscreen layers composited in z order

use bubble_core::Rect;
use bubble_paint::Canvas;

/// Recorded commands kept per layer canvas
const LAYER_HISTORY: usize = 4096;

/// A named offscreen canvas
#[derive(Clone, Debug)]
pub struct Layer {
    name: String,
    z_index: i32,
    canvas: Canvas,
}

impl Layer {
    pub fn new(name: impl Into<String>, z_index: i32, bounds: Rect) -> Self {
        Self {
            name: name.into(),
            z_index,
            canvas: Canvas::new(bounds.width, bounds.height).with_history_limit(LAYER_HISTORY),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn z_index(&self) -> i32 {
        self.z_index
    }

    pub fn canvas(&self) -> &Canvas {
        &self.canvas
    }

    pub fn canvas_mut(&mut self) -> &mut Canvas {
        &mut self.canvas
    }
}

/// Layers ordered by ascending z; ties keep creation order
#[derive(Clone, Debug)]
pub struct LayerStack {
    layers: Vec<Layer>,
    default_layer: String,
}

impl LayerStack {
    /// Create the stack with its default layer at z 0
    pub fn new(default_layer: impl Into<String>, bounds: Rect) -> Self {
        let default_layer = default_layer.into();
        Self {
            layers: vec![Layer::new(default_layer.clone(), 0, bounds)],
            default_layer,
        }
    }

    /// Add a layer. Returns false if the name is taken.
    pub fn create(&mut self, name: &str, z_index: i32, bounds: Rect) -> bool {
        if self.position(name).is_some() {
            return false;
        }
        let at = self.layers.partition_point(|l| l.z_index <= z_index);
        self.layers.insert(at, Layer::new(name, z_index, bounds));
        true
    }

    /// Index of the layer an object targeting `name` draws into
    pub fn resolve(&self, name: Option<&str>) -> usize {
        if let Some(name) = name {
            if let Some(index) = self.position(name) {
                return index;
            }
            tracing::trace!(layer = name, "unknown layer, using default");
        }
        self.position(&self.default_layer).unwrap_or(0)
    }

    pub fn get(&self, name: &str) -> Option<&Layer> {
        self.position(name).map(|i| &self.layers[i])
    }

    pub fn resize(&mut self, bounds: Rect) {
        for layer in &mut self.layers {
            layer.canvas.resize(bounds.width, bounds.height);
        }
    }

    pub fn len(&self) -> usize {
        self.layers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.layers.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Layer> {
        self.layers.iter()
    }

    pub(crate) fn layers_mut(&mut self) -> &mut [Layer] {
        &mut self.layers
    }

    fn position(&self, name: &str) -> Option<usize> {
        self.layers.iter().position(|l| l.name == name)
    }
}
