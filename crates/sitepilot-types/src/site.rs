use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use std::fmt;
use std::str::FromStr;

use crate::conversation::ConversationId;

/// Unique identifier for a site, wrapping a UUID v7 (time-sortable).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SiteId(pub Uuid);

impl SiteId {
    pub fn new() -> Self {
        Self(Uuid::now_v7())
    }

    pub fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }
}

impl Default for SiteId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for SiteId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for SiteId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self(Uuid::parse_str(s)?))
    }
}

keyed_enum! {
    /// Page kinds. A site holds at most one page of each kind, and the kind key
    /// doubles as the page id. Declaration order is the canonical page order.
    pub enum PageKind {
        Home => "home",
        About => "about",
        Services => "services",
        Work => "work",
        Pricing => "pricing",
        Faq => "faq",
        Contact => "contact",
        Blog => "blog",
    }
}

keyed_enum! {
    /// Every section type known to the section grammar.
    pub enum SectionType {
        HeroSplit => "heroSplit",
        HeroCentered => "heroCentered",
        HeroMinimal => "heroMinimal",
        Features => "features",
        Services => "services",
        Process => "process",
        Testimonials => "testimonials",
        Logos => "logos",
        Stats => "stats",
        About => "about",
        Team => "team",
        Gallery => "gallery",
        Pricing => "pricing",
        Faq => "faq",
        Contact => "contact",
        CtaPrimary => "ctaPrimary",
        BlogFeed => "blogFeed",
        BlogFeatured => "blogFeatured",
    }
}

impl SectionType {
    pub fn is_hero(&self) -> bool {
        self.key().starts_with("hero")
    }

    /// Section types that may only appear on the blog page.
    pub fn is_blog_only(&self) -> bool {
        matches!(self, SectionType::BlogFeed | SectionType::BlogFeatured)
    }

    /// Social-proof sections (testimonials, logos, stats).
    pub fn is_proof(&self) -> bool {
        matches!(
            self,
            SectionType::Testimonials | SectionType::Logos | SectionType::Stats
        )
    }
}

keyed_enum! {
    /// Visual system presets. The preset is derived from the locked design intent.
    pub enum ThemePreset {
        Classic => "classic",
        Modern => "modern",
        Bold => "bold",
        Calm => "calm",
        Luxe => "luxe",
    }
}

keyed_enum! {
    /// Release lifecycle. Only ever moves forward: draft -> preview -> published.
    pub enum ReleaseStatus {
        Draft => "draft",
        Preview => "preview",
        Published => "published",
    }
}

/// A site record.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Site {
    pub id: SiteId,
    pub conversation_id: ConversationId,
    /// Verified user who owns the site, if the conversation was authenticated.
    pub owner_user_id: Option<String>,
    pub name: String,
    pub theme: ThemePreset,
    pub release_status: ReleaseStatus,
    pub current_published_snapshot_id: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// One section instance on a page.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Section {
    pub id: Uuid,
    pub section_type: SectionType,
    /// Render order within the page (0-based, contiguous).
    pub position: u32,
    pub variant: String,
    pub content: Option<serde_json::Value>,
}

/// One page and its sections, ordered by position.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Page {
    pub kind: PageKind,
    pub goal: String,
    pub position: u32,
    pub sections: Vec<Section>,
}

impl Page {
    pub fn section_types(&self) -> Vec<SectionType> {
        self.sections.iter().map(|s| s.section_type).collect()
    }

    pub fn has_section(&self, section_type: SectionType) -> bool {
        self.sections.iter().any(|s| s.section_type == section_type)
    }

    pub fn position_of(&self, section_type: SectionType) -> Option<usize> {
        self.sections
            .iter()
            .position(|s| s.section_type == section_type)
    }

    /// Rewrite `position` so it matches vector order.
    pub fn renumber(&mut self) {
        for (i, section) in self.sections.iter_mut().enumerate() {
            section.position = i as u32;
        }
    }
}

/// The full mutable state of a site: what snapshots capture and tools mutate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SiteData {
    pub theme: ThemePreset,
    pub pages: Vec<Page>,
}

impl SiteData {
    pub fn empty(theme: ThemePreset) -> Self {
        Self {
            theme,
            pages: Vec::new(),
        }
    }

    pub fn page(&self, kind: PageKind) -> Option<&Page> {
        self.pages.iter().find(|p| p.kind == kind)
    }

    pub fn page_mut(&mut self, kind: PageKind) -> Option<&mut Page> {
        self.pages.iter_mut().find(|p| p.kind == kind)
    }

    pub fn has_page(&self, kind: PageKind) -> bool {
        self.page(kind).is_some()
    }

    /// Locate a section by id, returning its page kind alongside.
    pub fn find_section(&self, id: Uuid) -> Option<(PageKind, &Section)> {
        self.pages.iter().find_map(|p| {
            p.sections
                .iter()
                .find(|s| s.id == id)
                .map(|s| (p.kind, s))
        })
    }

    pub fn find_section_mut(&mut self, id: Uuid) -> Option<&mut Section> {
        self.pages
            .iter_mut()
            .flat_map(|p| p.sections.iter_mut())
            .find(|s| s.id == id)
    }

    /// Keep pages in canonical order with contiguous positions.
    pub fn normalize(&mut self) {
        self.pages.sort_by_key(|p| p.kind);
        for (i, page) in self.pages.iter_mut().enumerate() {
            page.position = i as u32;
            page.renumber();
        }
    }

    pub fn section_count(&self) -> usize {
        self.pages.iter().map(|p| p.sections.len()).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn section(section_type: SectionType) -> Section {
        Section {
            id: Uuid::now_v7(),
            section_type,
            position: 0,
            variant: "x".to_string(),
            content: None,
        }
    }

    #[test]
    fn test_site_id_roundtrip() {
        let id = SiteId::new();
        let parsed: SiteId = id.to_string().parse().unwrap();
        assert_eq!(id, parsed);
    }

    #[test]
    fn test_section_type_predicates() {
        assert!(SectionType::HeroMinimal.is_hero());
        assert!(!SectionType::CtaPrimary.is_hero());
        assert!(SectionType::BlogFeed.is_blog_only());
        assert!(SectionType::Logos.is_proof());
        assert!(!SectionType::Faq.is_proof());
    }

    #[test]
    fn test_section_type_wire_key() {
        let json = serde_json::to_string(&SectionType::CtaPrimary).unwrap();
        assert_eq!(json, "\"ctaPrimary\"");
        assert_eq!("heroSplit".parse::<SectionType>(), Ok(SectionType::HeroSplit));
    }

    #[test]
    fn test_page_kind_canonical_order() {
        let mut kinds = vec![PageKind::Blog, PageKind::Contact, PageKind::Home];
        kinds.sort();
        assert_eq!(kinds, vec![PageKind::Home, PageKind::Contact, PageKind::Blog]);
    }

    #[test]
    fn test_normalize_orders_pages_and_positions() {
        let mut data = SiteData::empty(ThemePreset::Classic);
        data.pages.push(Page {
            kind: PageKind::Contact,
            goal: "reach us".to_string(),
            position: 7,
            sections: vec![section(SectionType::HeroMinimal), section(SectionType::Contact)],
        });
        data.pages.push(Page {
            kind: PageKind::Home,
            goal: "convert".to_string(),
            position: 3,
            sections: vec![section(SectionType::HeroSplit)],
        });
        data.normalize();

        assert_eq!(data.pages[0].kind, PageKind::Home);
        assert_eq!(data.pages[0].position, 0);
        assert_eq!(data.pages[1].position, 1);
        assert_eq!(data.pages[1].sections[1].position, 1);
        assert_eq!(data.section_count(), 3);
    }

    #[test]
    fn test_find_section() {
        let mut data = SiteData::empty(ThemePreset::Calm);
        let faq = section(SectionType::Faq);
        let id = faq.id;
        data.pages.push(Page {
            kind: PageKind::Faq,
            goal: "answer".to_string(),
            position: 0,
            sections: vec![section(SectionType::HeroMinimal), faq],
        });
        let (kind, found) = data.find_section(id).unwrap();
        assert_eq!(kind, PageKind::Faq);
        assert_eq!(found.section_type, SectionType::Faq);
        assert!(data.find_section(Uuid::now_v7()).is_none());
    }
}
