//! The generic variant payload model carried over the reply channel.
//!
//! The protocol core treats payloads as opaque key/value maps; the field
//! names used by result, preview and activation payloads are defined by the
//! payload model, not by this layer.

use serde_json::Value;

/// A single dynamically typed value.
pub type Variant = Value;

/// A key/value map of [`Variant`]s, the unit of everything pushed over a
/// reply channel.
pub type VariantMap = serde_json::Map<String, Variant>;

/// Wraps a serialized result into the payload envelope used on the wire.
#[must_use]
pub fn result_envelope(result: Variant) -> VariantMap {
	let mut map = VariantMap::new();
	map.insert("result".into(), result);
	map
}

/// Wraps a batch of preview widgets into the payload envelope used on the wire.
#[must_use]
pub fn widgets_envelope(widgets: Vec<Variant>) -> VariantMap {
	let mut map = VariantMap::new();
	map.insert("widgets".into(), Value::Array(widgets));
	map
}

/// Wraps an activation response into the payload envelope used on the wire.
#[must_use]
pub fn activation_envelope(response: Variant) -> VariantMap {
	let mut map = VariantMap::new();
	map.insert("activation".into(), response);
	map
}
