//! DOM rendering and static fallbacks.
//!
//! Rendering is split in two steps: a layout turns mapped views into a
//! [`RenderPlan`] (target selector plus markup), then the plan is applied to
//! the page. Plans are plain data, so they can be compared and reused.

use crate::content::{ContentPayload, ContentRecord};
use crate::mapping::{map_record, Schema, SlotValue, View};
use crate::page::Page;
use crate::Result;
use log::{debug, warn};
use std::borrow::Cow;

/// Markup template with `{{slot}}` placeholders.
///
/// Text and media slots are escaped on substitution; markup slots are
/// inserted as-is. A placeholder with no slot in the view renders empty.
#[derive(Debug, Clone)]
pub struct Template {
    source: Cow<'static, str>,
}

impl Template {
    pub const fn from_static(source: &'static str) -> Self {
        Self {
            source: Cow::Borrowed(source),
        }
    }

    pub fn new(source: impl Into<String>) -> Self {
        Self {
            source: Cow::Owned(source.into()),
        }
    }

    pub fn render(&self, view: &View) -> String {
        let mut out = String::with_capacity(self.source.len());
        let mut rest: &str = &self.source;
        while let Some(start) = rest.find("{{") {
            out.push_str(&rest[..start]);
            let after = &rest[start + 2..];
            let Some(end) = after.find("}}") else {
                // Unterminated placeholder: emit verbatim
                out.push_str(&rest[start..]);
                return out;
            };
            let slot = after[..end].trim();
            match view.get(slot) {
                Some(SlotValue::Markup(m)) => out.push_str(m),
                Some(value) => out.push_str(&escape_html(value.as_str())),
                None => debug!("template slot '{}' has no value", slot),
            }
            rest = &after[end + 2..];
        }
        out.push_str(rest);
        out
    }
}

/// Escape text for use in element content and quoted attributes.
pub fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

/// One-to-one mapping of a view slot to a page region
///
/// Text and markup values replace the region's children. Image values
/// target an existing `<img>` and only update its `src` (and `alt`), so
/// authored attributes such as `loading` or `class` survive.
#[derive(Debug, Clone)]
pub struct Binding {
    /// Selector of the region written to
    pub target: String,
    /// Slot whose value fills the region
    pub slot: String,
    /// Slot used as `alt` text when the value is an image
    pub alt_slot: Option<String>,
}

impl Binding {
    pub fn new(target: impl Into<String>, slot: impl Into<String>) -> Self {
        Self {
            target: target.into(),
            slot: slot.into(),
            alt_slot: None,
        }
    }

    pub fn with_alt(mut self, alt_slot: impl Into<String>) -> Self {
        self.alt_slot = Some(alt_slot.into());
        self
    }

    fn plan_into(&self, view: &View, plan: &mut RenderPlan) {
        let target = self.target.clone();
        match view.get(&self.slot) {
            None => plan.kept.push(target),
            Some(SlotValue::Text(t)) => plan.writes.push(RegionWrite {
                target,
                markup: escape_html(t),
            }),
            Some(SlotValue::Markup(m)) => plan.writes.push(RegionWrite {
                target,
                markup: m.clone(),
            }),
            Some(SlotValue::Media(url)) => {
                let mut attrs = vec![("src".to_string(), url.clone())];
                if let Some(alt) = self.alt_slot.as_deref().and_then(|s| view.get(s)) {
                    attrs.push(("alt".to_string(), alt.as_str().to_string()));
                }
                plan.attributes.push(AttributeWrite { target, attrs });
            }
        }
    }
}

/// Card shape chosen for a list item whose `flag` field is set
#[derive(Debug, Clone)]
pub struct CardVariant {
    pub flag: String,
    pub schema: Schema,
}

impl CardVariant {
    pub fn new(flag: impl Into<String>, schema: Schema) -> Self {
        Self {
            flag: flag.into(),
            schema,
        }
    }
}

/// How a section's content is laid out on the page
#[derive(Debug, Clone)]
pub enum Layout {
    /// One slot per region
    Bindings { schema: Schema, bindings: Vec<Binding> },
    /// A fixed set of cards, one schema each, written into one container
    Cards {
        container: String,
        cards: Vec<Schema>,
        template: Template,
    },
    /// One card per list item
    List {
        container: String,
        variants: Vec<CardVariant>,
        template: Template,
        fallback: Template,
        loading: Option<String>,
    },
}

impl Layout {
    /// Selectors of every region this layout writes to.
    pub fn targets(&self) -> Vec<&str> {
        match self {
            Layout::Bindings { bindings, .. } => bindings.iter().map(|b| b.target.as_str()).collect(),
            Layout::Cards { container, .. } | Layout::List { container, .. } => vec![container.as_str()],
        }
    }

    /// Placeholder written while the fetch is in flight, if any.
    pub fn loading(&self) -> Option<(&str, &str)> {
        match self {
            Layout::List {
                container,
                loading: Some(markup),
                ..
            } => Some((container.as_str(), markup.as_str())),
            _ => None,
        }
    }

    /// Plan for a successful fetch. `None` means the payload holds nothing
    /// usable for this layout and the fallback applies.
    pub fn plan(&self, payload: &ContentPayload) -> Option<RenderPlan> {
        match self {
            Layout::Bindings { schema, bindings } => {
                let record = payload.single()?;
                Some(plan_bindings(schema, bindings, record))
            }
            Layout::Cards {
                container,
                cards,
                template,
            } => {
                let record = payload.single()?;
                Some(plan_cards(container, cards, template, record))
            }
            Layout::List {
                container,
                variants,
                template,
                ..
            } => plan_list(container, variants, template, payload.items()),
        }
    }

    /// Fixed fallback plan. Deterministic and independent of any payload.
    pub fn fallback(&self) -> RenderPlan {
        match self {
            Layout::Bindings { schema, bindings } => {
                plan_bindings(schema, bindings, &ContentRecord::new())
            }
            Layout::Cards {
                container,
                cards,
                template,
            } => plan_cards(container, cards, template, &ContentRecord::new()),
            Layout::List {
                container, fallback, ..
            } => RenderPlan {
                writes: vec![RegionWrite {
                    target: container.clone(),
                    markup: fallback.render(&View::default()),
                }],
                ..RenderPlan::default()
            },
        }
    }
}

/// Markup destined for one region
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegionWrite {
    pub target: String,
    pub markup: String,
}

/// Attribute values set on one existing element
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttributeWrite {
    pub target: String,
    pub attrs: Vec<(String, String)>,
}

/// Planned page mutation for one layout
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RenderPlan {
    pub writes: Vec<RegionWrite>,
    pub attributes: Vec<AttributeWrite>,
    /// Regions deliberately left with their authored markup
    pub kept: Vec<String>,
    /// Cards rendered (card layouts only)
    pub cards: usize,
    /// List items skipped because they matched no card variant
    pub skipped: usize,
}

impl RenderPlan {
    /// Write the plan into the page. Returns the targets that were present.
    pub fn apply(&self, page: &mut Page) -> Result<Vec<String>> {
        let mut written = Vec::new();
        for write in &self.writes {
            if page.replace_children(&write.target, &write.markup)? {
                written.push(write.target.clone());
            } else {
                debug!("target '{}' not present, skipping", write.target);
            }
        }
        for write in &self.attributes {
            if page.set_attributes(&write.target, &write.attrs)? {
                written.push(write.target.clone());
            } else {
                debug!("target '{}' not present, skipping", write.target);
            }
        }
        Ok(written)
    }
}

fn plan_bindings(schema: &Schema, bindings: &[Binding], record: &ContentRecord) -> RenderPlan {
    let view = map_record(record, schema);
    let mut plan = RenderPlan::default();
    for binding in bindings {
        binding.plan_into(&view, &mut plan);
    }
    plan
}

fn plan_cards(container: &str, cards: &[Schema], template: &Template, record: &ContentRecord) -> RenderPlan {
    let markup = cards
        .iter()
        .map(|schema| template.render(&map_record(record, schema)))
        .collect::<Vec<_>>()
        .join("\n");
    RenderPlan {
        writes: vec![RegionWrite {
            target: container.to_string(),
            markup,
        }],
        cards: cards.len(),
        ..RenderPlan::default()
    }
}

fn plan_list(
    container: &str,
    variants: &[CardVariant],
    template: &Template,
    items: &[ContentRecord],
) -> Option<RenderPlan> {
    let mut rendered = Vec::with_capacity(items.len());
    let mut skipped = 0;
    for (index, item) in items.iter().enumerate() {
        match variants.iter().find(|v| item.is_flag_set(&v.flag)) {
            Some(variant) => rendered.push(template.render(&map_record(item, &variant.schema))),
            None => {
                // Only this card is lost; siblings still render
                warn!("item {} matches no card variant, skipping", index + 1);
                skipped += 1;
            }
        }
    }
    if rendered.is_empty() {
        return None;
    }
    Some(RenderPlan {
        writes: vec![RegionWrite {
            target: container.to_string(),
            markup: rendered.join("\n"),
        }],
        cards: rendered.len(),
        skipped,
        ..RenderPlan::default()
    })
}
