//! Read-only view of a site plus the contracts that judge it, shared by the
//! audit rules and the recommendation candidates.

use sitepilot_types::contract::{DesignIntent, IntakeContract, VoiceContract};
use sitepilot_types::site::{Page, PageKind, Section, SectionType, SiteData};

#[derive(Debug, Clone, Copy)]
pub struct SiteView<'a> {
    pub data: &'a SiteData,
    pub intake: &'a IntakeContract,
    pub voice: &'a VoiceContract,
    /// The locked design intent, if any.
    pub intent: Option<&'a DesignIntent>,
}

impl<'a> SiteView<'a> {
    pub fn home(&self) -> Option<&'a Page> {
        self.data.page(PageKind::Home)
    }

    /// Whether a visitor can reach a contact form or contact details anywhere.
    pub fn has_contact_path(&self) -> bool {
        self.data.has_page(PageKind::Contact)
            || self
                .data
                .pages
                .iter()
                .any(|p| p.has_section(SectionType::Contact))
    }

    pub fn sections(&self) -> impl Iterator<Item = (PageKind, &'a Section)> + 'a {
        self.data
            .pages
            .iter()
            .flat_map(|p| p.sections.iter().map(move |s| (p.kind, s)))
    }
}

pub fn hero(page: &Page) -> Option<&Section> {
    page.sections.first().filter(|s| s.section_type.is_hero())
}

/// Index of the first section that asks the visitor to act.
pub fn conversion_point(page: &Page) -> Option<usize> {
    page.sections
        .iter()
        .position(|s| matches!(s.section_type, SectionType::Contact | SectionType::CtaPrimary))
}

/// Proof sections that sit after the page's conversion point.
pub fn late_proof(page: &Page) -> Vec<SectionType> {
    let Some(cp) = conversion_point(page) else {
        return Vec::new();
    };
    page.sections[cp + 1..]
        .iter()
        .map(|s| s.section_type)
        .filter(SectionType::is_proof)
        .collect()
}

/// The page order with late proof sections moved just ahead of the
/// conversion point.
pub fn proof_first_order(page: &Page) -> Vec<SectionType> {
    let order = page.section_types();
    let late = late_proof(page);
    let Some(cp) = conversion_point(page) else {
        return order;
    };
    let mut out: Vec<SectionType> = order[..cp].to_vec();
    out.extend(late.iter().copied());
    out.extend(order[cp..].iter().copied().filter(|t| !late.contains(t)));
    out
}
