//! Section presets for the site's three content endpoints.

use crate::mapping::{FieldSpec, Schema};
use crate::pipeline::Section;
use crate::render::{Binding, CardVariant, Layout, Template};
use crate::{Error, SourceConfig};
use std::str::FromStr;

/// Service domain the site's content lives under
pub const DEFAULT_SERVICE_DOMAIN: &str = "solana-hiroshima";

/// Text used by job cards for fields the listing leaves empty
pub const NO_DATA: &str = "データなし";

const FEATURE_CARD: Template = Template::from_static(include_str!("templates/feature_card.html"));
const LIMIT_CARD: Template = Template::from_static(include_str!("templates/limit_card.html"));
const JOB_CARD: Template = Template::from_static(include_str!("templates/job_card.html"));
const RECRUITMENT_FALLBACK: Template =
    Template::from_static(include_str!("templates/recruitment_fallback.html"));
const RECRUITMENT_LOADING: &str = include_str!("templates/loading.html");

const FEATURE_IMAGES: [&str; 3] = [
    "images/一人一人にあったケア.png",
    "images/訪問介護だからこそできること.png",
    "images/安心のサポート体制.png",
];
const FEATURE_ICONS: [&str; 3] = ["👤", "🏠", "💝"];

/// Known content endpoints
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Preset {
    Toppage,
    Recruitment,
    CostLimits,
}

impl Preset {
    pub const ALL: [Preset; 3] = [Preset::Toppage, Preset::Recruitment, Preset::CostLimits];

    pub fn endpoint(self) -> &'static str {
        match self {
            Preset::Toppage => "toppage",
            Preset::Recruitment => "recruitment",
            Preset::CostLimits => "heavy-visit-care",
        }
    }

    /// Build the section, reading from `source`.
    pub fn section(self, source: SourceConfig) -> Section {
        match self {
            Preset::Toppage => toppage(source),
            Preset::Recruitment => recruitment(source),
            Preset::CostLimits => cost_limits(source),
        }
    }
}

impl FromStr for Preset {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "toppage" => Ok(Preset::Toppage),
            "recruitment" => Ok(Preset::Recruitment),
            "cost-limits" | "heavy-visit-care" => Ok(Preset::CostLimits),
            other => Err(Error::ConfigError(format!(
                "unknown section '{}' (expected toppage, recruitment or cost-limits)",
                other
            ))),
        }
    }
}

/// Top page: concept and greeting regions plus the three feature cards.
///
/// Concept and greeting images update the authored `<img>` in place.
pub fn toppage(source: SourceConfig) -> Section {
    let sections = Schema::new()
        .field(FieldSpec::text("concepttitle", "concept_title", "").keep_authored())
        .field(FieldSpec::text("conceptdescription", "concept_description", "").keep_authored())
        .field(FieldSpec::media("conceptimage", "concept_image", "").keep_authored())
        .field(FieldSpec::text("concepttitle", "concept_alt", "コンセプト画像"))
        .field(FieldSpec::text("greetingtitle", "greeting_title", "").keep_authored())
        .field(FieldSpec::media("managerPhoto", "manager_photo", "").keep_authored())
        .constant("manager_alt", "管理者");

    let bindings = vec![
        Binding::new(".concept-heading", "concept_title"),
        Binding::new(".concept-description", "concept_description"),
        Binding::new(".concept-image img", "concept_image").with_alt("concept_alt"),
        Binding::new(".greeting .section-title", "greeting_title"),
        Binding::new(".greeting-image img", "manager_photo").with_alt("manager_alt"),
    ];

    let cards = (1..=3)
        .map(|i| {
            Schema::new()
                .field(FieldSpec::text(
                    format!("featurestitle{}", i),
                    "title",
                    format!("フィーチャー{}", i),
                ))
                .field(FieldSpec::text(
                    format!("featuresdescription{}", i),
                    "description",
                    format!("フィーチャー{}の説明", i),
                ))
                .field(FieldSpec::media(
                    format!("featuresimage{}", i),
                    "image",
                    FEATURE_IMAGES[i - 1],
                ))
                .constant("icon", FEATURE_ICONS[i - 1])
        })
        .collect();

    Section::new("toppage", source)
        .with_layout(Layout::Bindings {
            schema: sections,
            bindings,
        })
        .with_layout(Layout::Cards {
            container: ".features-grid".into(),
            cards,
            template: FEATURE_CARD,
        })
}

/// Recruitment page: one job card per listing, keyed by job type.
pub fn recruitment(source: SourceConfig) -> Section {
    let variant = |flag: &str, title: &str, salary_label: &str, others_label: &str| {
        CardVariant::new(
            flag,
            Schema::new()
                .constant("job_title", title)
                .constant("salary_label", salary_label)
                .constant("others_label", others_label)
                .field(FieldSpec::markup(format!("{}overview", flag), "overview", NO_DATA))
                .field(FieldSpec::markup(format!("{}salary", flag), "salary", NO_DATA))
                .field(FieldSpec::markup(format!("{}others", flag), "others", NO_DATA)),
        )
    };

    Section::new("recruitment", source).with_layout(Layout::List {
        container: ".job-positions".into(),
        variants: vec![
            variant("part", "パート", "時給", "その他手当"),
            variant("fulltime", "正職員（フルタイム）", "月給", "その他待遇"),
            variant("responsible", "正社員（サービス提供責任者）", "月給", "その他待遇"),
        ],
        template: JOB_CARD,
        fallback: RECRUITMENT_FALLBACK,
        loading: Some(RECRUITMENT_LOADING.trim_end().to_string()),
    })
}

/// Heavy visit care page: the three self-pay limit tiers and their note.
pub fn cost_limits(source: SourceConfig) -> Section {
    let tier = |title_key: &str, title: &str, price: &str| {
        Schema::new()
            .field(FieldSpec::text(title_key, "title", title))
            .field(FieldSpec::text(format!("{}money", title_key), "price", price))
    };

    Section::new("cost-limits", source)
        .with_layout(Layout::Cards {
            container: ".limit-cards".into(),
            cards: vec![
                tier("welfare", "生活保護・市民税非課税世帯", "0円"),
                tier("municipaltax", "市民税課税（所得割16万円未満）", "9,300円"),
                tier("others", "上記以外", "37,200円"),
            ],
            template: LIMIT_CARD,
        })
        .with_layout(Layout::Bindings {
            schema: Schema::new()
                .field(FieldSpec::markup("supplement", "supplement", "").keep_authored()),
            bindings: vec![Binding::new(".cost-limits .note", "supplement")],
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn presets_parse() {
        assert_eq!("toppage".parse::<Preset>().unwrap(), Preset::Toppage);
        assert_eq!("heavy-visit-care".parse::<Preset>().unwrap(), Preset::CostLimits);
        assert_eq!("cost-limits".parse::<Preset>().unwrap().endpoint(), "heavy-visit-care");
        assert!("news".parse::<Preset>().is_err());
    }

    #[test]
    fn presets_target_their_endpoints() {
        for preset in Preset::ALL {
            let source = SourceConfig::new(DEFAULT_SERVICE_DOMAIN, preset.endpoint(), "k");
            let section = preset.section(source);
            assert_eq!(section.source.endpoint, preset.endpoint());
            assert!(!section.targets().is_empty());
        }
    }

    #[test]
    fn fallbacks_contain_no_placeholders() {
        let section = recruitment(SourceConfig::new("d", "recruitment", "k"));
        for layout in &section.layouts {
            for write in layout.fallback().writes {
                assert!(!write.markup.contains("{{"));
            }
        }
        let markup = &section.layouts[0].fallback().writes[0].markup;
        assert_eq!(markup.matches("class=\"job-card\"").count(), 3);
    }

    #[test]
    fn feature_fallback_uses_default_images() {
        let section = toppage(SourceConfig::new("d", "toppage", "k"));
        let plan = section.layouts[1].fallback();
        assert_eq!(plan.cards, 3);
        for (image, icon) in FEATURE_IMAGES.iter().zip(FEATURE_ICONS) {
            assert!(plan.writes[0].markup.contains(image));
            assert!(plan.writes[0].markup.contains(icon));
        }
    }
}
