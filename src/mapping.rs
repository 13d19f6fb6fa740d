//! Field mapping: raw records to normalized views.
//!
//! Mapping never fails. A field that is absent, empty, or of a type the slot
//! cannot use degrades to its documented default, so an empty record maps to
//! the all-defaults view.

use crate::content::{ContentRecord, FieldValue};
use std::collections::{BTreeMap, BTreeSet};

/// How a slot's value is written into the page
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    /// Escaped text
    Text,
    /// Raw markup (rich-editor fields)
    Markup,
    /// Image URL
    Media,
}

/// What to use when a field has no usable value
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldDefault {
    /// Literal fallback text or placeholder image path
    Value(String),
    /// Leave the authored page markup in place
    Authored,
}

/// One expected field: where it comes from and which slot it fills
#[derive(Debug, Clone)]
pub struct FieldSpec {
    pub key: String,
    pub slot: String,
    pub kind: FieldKind,
    pub default: FieldDefault,
}

impl FieldSpec {
    pub fn text(key: impl Into<String>, slot: impl Into<String>, default: impl Into<String>) -> Self {
        Self::new(key, slot, FieldKind::Text, FieldDefault::Value(default.into()))
    }

    pub fn markup(key: impl Into<String>, slot: impl Into<String>, default: impl Into<String>) -> Self {
        Self::new(key, slot, FieldKind::Markup, FieldDefault::Value(default.into()))
    }

    pub fn media(key: impl Into<String>, slot: impl Into<String>, default: impl Into<String>) -> Self {
        Self::new(key, slot, FieldKind::Media, FieldDefault::Value(default.into()))
    }

    pub fn new(
        key: impl Into<String>,
        slot: impl Into<String>,
        kind: FieldKind,
        default: FieldDefault,
    ) -> Self {
        Self {
            key: key.into(),
            slot: slot.into(),
            kind,
            default,
        }
    }

    /// Keep the authored markup when the field is missing.
    pub fn keep_authored(mut self) -> Self {
        self.default = FieldDefault::Authored;
        self
    }

    fn resolve(&self, value: Option<&FieldValue>) -> Option<SlotValue> {
        let value = value.filter(|v| !v.is_empty())?;
        match (self.kind, value) {
            (FieldKind::Text, FieldValue::Text(s) | FieldValue::RichText(s)) => {
                Some(SlotValue::Text(s.clone()))
            }
            (FieldKind::Markup, FieldValue::Text(s) | FieldValue::RichText(s)) => {
                Some(SlotValue::Markup(s.clone()))
            }
            (FieldKind::Media, FieldValue::Media(m)) => Some(SlotValue::Media(m.url.clone())),
            // A bare string in a media field is taken as the URL
            (FieldKind::Media, FieldValue::Text(s)) => Some(SlotValue::Media(s.clone())),
            _ => None,
        }
    }

    fn default_value(&self) -> Option<SlotValue> {
        match &self.default {
            FieldDefault::Authored => None,
            FieldDefault::Value(v) => Some(match self.kind {
                FieldKind::Text => SlotValue::Text(v.clone()),
                FieldKind::Markup => SlotValue::Markup(v.clone()),
                FieldKind::Media => SlotValue::Media(v.clone()),
            }),
        }
    }
}

/// Set of expected fields plus fixed labels
#[derive(Debug, Clone, Default)]
pub struct Schema {
    fields: Vec<FieldSpec>,
    constants: Vec<(String, SlotValue)>,
}

impl Schema {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn field(mut self, spec: FieldSpec) -> Self {
        self.fields.push(spec);
        self
    }

    /// Slot with a fixed text value, independent of the record.
    pub fn constant(mut self, slot: impl Into<String>, text: impl Into<String>) -> Self {
        self.constants.push((slot.into(), SlotValue::Text(text.into())));
        self
    }
}

/// Normalized value of a slot
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SlotValue {
    Text(String),
    Markup(String),
    Media(String),
}

impl SlotValue {
    pub fn as_str(&self) -> &str {
        match self {
            SlotValue::Text(s) | SlotValue::Markup(s) | SlotValue::Media(s) => s,
        }
    }
}

/// Normalized view produced by the mapper
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct View {
    slots: BTreeMap<String, SlotValue>,
    defaulted: BTreeSet<String>,
}

impl View {
    /// Add a fixed text slot.
    pub fn with_text(mut self, slot: impl Into<String>, text: impl Into<String>) -> Self {
        self.slots.insert(slot.into(), SlotValue::Text(text.into()));
        self
    }

    pub fn get(&self, slot: &str) -> Option<&SlotValue> {
        self.slots.get(slot)
    }

    /// Whether the slot was filled from its default (or left to the
    /// authored markup) instead of the record.
    pub fn is_defaulted(&self, slot: &str) -> bool {
        self.defaulted.contains(slot)
    }

    pub fn defaulted_count(&self) -> usize {
        self.defaulted.len()
    }
}

/// Map a record onto a schema.
pub fn map_record(record: &ContentRecord, schema: &Schema) -> View {
    let mut view = View::default();
    for (slot, value) in &schema.constants {
        view.slots.insert(slot.clone(), value.clone());
    }
    for spec in &schema.fields {
        match spec.resolve(record.get(&spec.key)) {
            Some(value) => {
                view.slots.insert(spec.slot.clone(), value);
            }
            None => {
                view.defaulted.insert(spec.slot.clone());
                if let Some(value) = spec.default_value() {
                    view.slots.insert(spec.slot.clone(), value);
                }
            }
        }
    }
    view
}
