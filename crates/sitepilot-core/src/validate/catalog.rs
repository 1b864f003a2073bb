//! The section catalog: variants, page allow-lists, and content shapes.

use sitepilot_types::site::{PageKind, SectionType};

/// Longest allowed headline-like text.
pub const HEADLINE_MAX: usize = 90;
/// Longest allowed short label (buttons, names, titles).
pub const LABEL_MAX: usize = 40;
/// Longest allowed body paragraph.
pub const BODY_MAX: usize = 600;

/// Allowed variants for a section type. The first one is the default.
pub fn variants(section_type: SectionType) -> &'static [&'static str] {
    match section_type {
        SectionType::HeroSplit => &["split", "splitReversed"],
        SectionType::HeroCentered => &["centered", "centeredBanner"],
        SectionType::HeroMinimal => &["minimal", "minimalUnderline"],
        SectionType::Features => &["grid", "list", "cards"],
        SectionType::Services => &["cards", "list"],
        SectionType::Process => &["steps", "timeline"],
        SectionType::Testimonials => &["grid", "carousel", "single"],
        SectionType::Logos => &["strip", "grid"],
        SectionType::Stats => &["row", "grid"],
        SectionType::About => &["story", "split"],
        SectionType::Team => &["grid", "list"],
        SectionType::Gallery => &["masonry", "grid"],
        SectionType::Pricing => &["tiers", "table"],
        SectionType::Faq => &["accordion", "twoColumn"],
        SectionType::Contact => &["form", "details"],
        SectionType::CtaPrimary => &["banner", "card"],
        SectionType::BlogFeed => &["list", "grid"],
        SectionType::BlogFeatured => &["hero", "card"],
    }
}

pub fn default_variant(section_type: SectionType) -> &'static str {
    variants(section_type)[0]
}

pub fn is_valid_variant(section_type: SectionType, variant: &str) -> bool {
    variants(section_type).contains(&variant)
}

const HEROES_AND_CTA: [SectionType; 4] = [
    SectionType::HeroSplit,
    SectionType::HeroCentered,
    SectionType::HeroMinimal,
    SectionType::CtaPrimary,
];

fn page_specific(page: PageKind) -> &'static [SectionType] {
    use SectionType::*;
    match page {
        PageKind::Home => &[
            Features,
            Services,
            Process,
            Testimonials,
            Logos,
            Stats,
            About,
            Gallery,
            Faq,
            Contact,
        ],
        PageKind::About => &[About, Team, Stats, Testimonials, Logos, Process],
        PageKind::Services => &[Services, Features, Process, Testimonials, Pricing, Faq],
        PageKind::Work => &[Gallery, Testimonials, Stats, Logos],
        PageKind::Pricing => &[Pricing, Faq, Testimonials, Features],
        PageKind::Faq => &[Faq, Contact],
        PageKind::Contact => &[Contact, Faq],
        PageKind::Blog => &[BlogFeatured, BlogFeed],
    }
}

/// Whether `section_type` may appear on `page`.
pub fn is_allowed(page: PageKind, section_type: SectionType) -> bool {
    HEROES_AND_CTA.contains(&section_type) || page_specific(page).contains(&section_type)
}

/// Every section type allowed on `page`, heroes first.
pub fn allowed_sections(page: PageKind) -> Vec<SectionType> {
    HEROES_AND_CTA[..3]
        .iter()
        .chain(page_specific(page))
        .chain(std::iter::once(&SectionType::CtaPrimary))
        .copied()
        .collect()
}

/// Field names a structural plan must never carry, at any depth.
pub const DISALLOWED_PLAN_KEYS: &[&str] = &[
    "copy",
    "text",
    "headline",
    "subheadline",
    "body",
    "content",
    "theme",
    "color",
    "colors",
    "font",
    "fonts",
    "layout",
    "html",
    "css",
    "style",
    "image",
    "images",
    "variant",
];

// ---------------------------------------------------------------------------
// Content shapes
// ---------------------------------------------------------------------------

/// The expected JSON shape of a value.
#[derive(Debug, Clone, Copy)]
pub enum Shape {
    /// A non-empty string of at most this many characters.
    Text(usize),
    /// An object with exactly these fields.
    Object(&'static [Field]),
    /// An array with a bounded number of items.
    List {
        min: usize,
        max: usize,
        item: &'static Shape,
    },
}

#[derive(Debug, Clone, Copy)]
pub struct Field {
    pub name: &'static str,
    pub required: bool,
    pub shape: Shape,
}

const fn req(name: &'static str, shape: Shape) -> Field {
    Field {
        name,
        required: true,
        shape,
    }
}

const fn opt(name: &'static str, shape: Shape) -> Field {
    Field {
        name,
        required: false,
        shape,
    }
}

const HEADING: Field = req("heading", Shape::Text(HEADLINE_MAX));
const LABEL: Shape = Shape::Text(LABEL_MAX);
const BODY: Shape = Shape::Text(BODY_MAX);
const CAPTION: Shape = Shape::Text(HEADLINE_MAX);

const TITLE_BODY: Shape = Shape::Object(&[req("title", LABEL), req("body", BODY)]);
const QUOTE: Shape = Shape::Object(&[req("quote", BODY), req("attribution", LABEL)]);
const STAT: Shape = Shape::Object(&[req("value", LABEL), req("label", LABEL)]);
const MEMBER: Shape = Shape::Object(&[req("name", LABEL), req("role", LABEL)]);
const QUESTION: Shape = Shape::Object(&[req("question", CAPTION), req("answer", BODY)]);
const TIER: Shape = Shape::Object(&[
    req("name", LABEL),
    req("price", LABEL),
    req(
        "features",
        Shape::List {
            min: 1,
            max: 8,
            item: &LABEL,
        },
    ),
]);

const HERO_FULL: &[Field] = &[
    req("headline", Shape::Text(HEADLINE_MAX)),
    req("subheadline", BODY),
    req("primaryCtaLabel", LABEL),
    opt("secondaryCtaLabel", LABEL),
];

const HERO_MINIMAL: &[Field] = &[
    req("headline", Shape::Text(HEADLINE_MAX)),
    opt("subheadline", BODY),
];

const fn list(name: &'static str, min: usize, max: usize, item: &'static Shape) -> Field {
    req(name, Shape::List { min, max, item })
}

const FEATURES: &[Field] = &[HEADING, list("items", 3, 6, &TITLE_BODY)];
const SERVICES: &[Field] = &[HEADING, list("items", 2, 8, &TITLE_BODY)];
const PROCESS: &[Field] = &[HEADING, list("steps", 3, 6, &TITLE_BODY)];
const TESTIMONIALS: &[Field] = &[HEADING, list("quotes", 1, 6, &QUOTE)];
const LOGOS: &[Field] = &[HEADING, list("names", 3, 12, &LABEL)];
const STATS: &[Field] = &[HEADING, list("stats", 2, 4, &STAT)];
const ABOUT: &[Field] = &[HEADING, req("body", BODY)];
const TEAM: &[Field] = &[HEADING, list("members", 1, 12, &MEMBER)];
const GALLERY: &[Field] = &[HEADING, list("captions", 3, 12, &CAPTION)];
const PRICING: &[Field] = &[HEADING, list("tiers", 1, 4, &TIER)];
const FAQ: &[Field] = &[HEADING, list("items", 3, 10, &QUESTION)];
const CONTACT: &[Field] = &[HEADING, req("body", BODY), req("ctaLabel", LABEL)];
const CTA_PRIMARY: &[Field] = &[HEADING, req("body", BODY), req("buttonLabel", LABEL)];
const BLOG: &[Field] = &[HEADING, req("intro", BODY)];

/// Fields of the content object for a section type.
pub fn content_fields(section_type: SectionType) -> &'static [Field] {
    match section_type {
        SectionType::HeroSplit | SectionType::HeroCentered => HERO_FULL,
        SectionType::HeroMinimal => HERO_MINIMAL,
        SectionType::Features => FEATURES,
        SectionType::Services => SERVICES,
        SectionType::Process => PROCESS,
        SectionType::Testimonials => TESTIMONIALS,
        SectionType::Logos => LOGOS,
        SectionType::Stats => STATS,
        SectionType::About => ABOUT,
        SectionType::Team => TEAM,
        SectionType::Gallery => GALLERY,
        SectionType::Pricing => PRICING,
        SectionType::Faq => FAQ,
        SectionType::Contact => CONTACT,
        SectionType::CtaPrimary => CTA_PRIMARY,
        SectionType::BlogFeed | SectionType::BlogFeatured => BLOG,
    }
}

/// A compact, human-readable description of a section's content shape, used
/// in generative prompts.
pub fn describe_shape(section_type: SectionType) -> String {
    fn describe(shape: &Shape) -> String {
        match shape {
            Shape::Text(max) => format!("string (max {max} chars)"),
            Shape::Object(fields) => {
                let inner: Vec<String> = fields
                    .iter()
                    .map(|f| {
                        let optional = if f.required { "" } else { "?" };
                        format!("\"{}\"{optional}: {}", f.name, describe(&f.shape))
                    })
                    .collect();
                format!("{{ {} }}", inner.join(", "))
            }
            Shape::List { min, max, item } => {
                format!("array of {min}-{max} × {}", describe(item))
            }
        }
    }
    describe(&Shape::Object(content_fields(section_type)))
}
