//! Structural tools: createSiteFromPlan, addPage, addSection,
//! reorderSections, enableBlog.

use uuid::Uuid;

use sitepilot_types::contract::IntakeContract;
use sitepilot_types::draft::StructureTool;
use sitepilot_types::error::ToolError;
use sitepilot_types::plan::SitePlan;
use sitepilot_types::site::{Page, PageKind, Section, SectionType, SiteData};

use crate::validate::catalog::default_variant;
use crate::validate::plan_grammar::{check_page_sections, check_plan};

pub(crate) const BLOG_GOAL: &str = "Share news and articles";
pub(crate) const BLOG_SECTIONS: &[SectionType] = &[SectionType::HeroMinimal, SectionType::BlogFeed];

pub(crate) fn new_section(section_type: SectionType) -> Section {
    Section {
        id: Uuid::now_v7(),
        section_type,
        position: 0,
        variant: default_variant(section_type).to_string(),
        content: None,
    }
}

fn new_page(kind: PageKind, goal: &str, sections: &[SectionType]) -> Page {
    let mut page = Page {
        kind,
        goal: goal.trim().to_string(),
        position: 0,
        sections: sections.iter().copied().map(new_section).collect(),
    };
    page.renumber();
    page
}

fn matches_plan(data: &SiteData, plan: &SitePlan) -> bool {
    data.pages.len() == plan.pages.len()
        && plan.pages.iter().all(|(kind, page_plan)| {
            data.page(*kind)
                .is_some_and(|page| page.section_types() == page_plan.ordered_sections)
        })
}

/// Where a new section goes when no position is given: heroes first, the
/// primary CTA last, anything else just before a trailing CTA.
fn insertion_index(order: &[SectionType], section_type: SectionType, position: Option<u32>) -> usize {
    if let Some(p) = position {
        return (p as usize).min(order.len());
    }
    if section_type.is_hero() {
        return 0;
    }
    match order.last() {
        Some(SectionType::CtaPrimary) if section_type != SectionType::CtaPrimary => order.len() - 1,
        _ => order.len(),
    }
}

fn schema_check(violations: Vec<String>) -> Result<(), ToolError> {
    if violations.is_empty() {
        Ok(())
    } else {
        Err(ToolError::Schema(violations))
    }
}

/// Apply a structural tool to `data`. Returns a one-line summary.
pub(super) fn apply(
    data: &mut SiteData,
    tool: &StructureTool,
    intake: &IntakeContract,
) -> Result<String, ToolError> {
    match tool {
        StructureTool::CreateSiteFromPlan { plan } => {
            schema_check(check_plan(plan, intake.blog_excluded()))?;
            if data.pages.is_empty() {
                for (kind, page_plan) in &plan.pages {
                    data.pages
                        .push(new_page(*kind, &page_plan.goal, &page_plan.ordered_sections));
                }
                data.normalize();
                return Ok(format!(
                    "Created {} pages with {} sections",
                    plan.page_count(),
                    plan.section_count()
                ));
            }
            if matches_plan(data, plan) {
                return Ok("The site already matches this plan".to_string());
            }
            Err(ToolError::Precondition(
                "the site already has pages; a plan can only be applied to an empty site".to_string(),
            ))
        }

        StructureTool::AddPage {
            page,
            goal,
            sections,
        } => {
            if data.has_page(*page) {
                return Ok(format!("The {page} page already exists"));
            }
            let mut violations = Vec::new();
            if goal.trim().is_empty() {
                violations.push("goal: must not be empty".to_string());
            }
            if *page == PageKind::Blog && intake.blog_excluded() {
                violations.push("blog: the site must not have a blog page".to_string());
            }
            violations.extend(check_page_sections(*page, sections));
            schema_check(violations)?;

            data.pages.push(new_page(*page, goal, sections));
            data.normalize();
            Ok(format!("Added the {page} page with {} sections", sections.len()))
        }

        StructureTool::AddSection {
            page,
            section_type,
            position,
        } => {
            let target = data.page_mut(*page).ok_or_else(|| ToolError::NotFound {
                entity: "page",
                id: page.to_string(),
            })?;
            if target.has_section(*section_type) {
                return Ok(format!("The {page} page already has a {section_type} section"));
            }
            let mut order = target.section_types();
            let index = insertion_index(&order, *section_type, *position);
            order.insert(index, *section_type);
            schema_check(check_page_sections(*page, &order))?;

            target.sections.insert(index, new_section(*section_type));
            target.renumber();
            Ok(format!("Added a {section_type} section to the {page} page"))
        }

        StructureTool::ReorderSections { page, order } => {
            let target = data.page_mut(*page).ok_or_else(|| ToolError::NotFound {
                entity: "page",
                id: page.to_string(),
            })?;
            let current = target.section_types();
            let mut have = current.clone();
            let mut want = order.clone();
            have.sort();
            want.sort();
            if have != want {
                return Err(ToolError::Schema(vec![format!(
                    "{page}: order must list exactly the page's current sections"
                )]));
            }
            schema_check(check_page_sections(*page, order))?;
            if current == *order {
                return Ok(format!("The {page} page is already in that order"));
            }

            target
                .sections
                .sort_by_key(|s| order.iter().position(|t| *t == s.section_type));
            target.renumber();
            Ok(format!("Reordered the sections on the {page} page"))
        }

        StructureTool::EnableBlog => {
            if intake.blog_excluded() {
                return Err(ToolError::Precondition(
                    "the blog was ruled out during intake".to_string(),
                ));
            }
            if data.has_page(PageKind::Blog) {
                return Ok("The blog is already enabled".to_string());
            }
            data.pages
                .push(new_page(PageKind::Blog, BLOG_GOAL, BLOG_SECTIONS));
            data.normalize();
            Ok("Enabled the blog".to_string())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sitepilot_types::contract::BlogPresence;
    use sitepilot_types::plan::PagePlan;
    use sitepilot_types::site::ThemePreset;
    use std::collections::BTreeMap;

    fn intake(blog: BlogPresence) -> IntakeContract {
        IntakeContract {
            blog_presence: Some(blog),
            ..Default::default()
        }
    }

    fn plan() -> SitePlan {
        let mut pages = BTreeMap::new();
        pages.insert(
            PageKind::Home,
            PagePlan {
                goal: "Explain the offer".to_string(),
                ordered_sections: vec![SectionType::HeroSplit, SectionType::Features, SectionType::CtaPrimary],
            },
        );
        pages.insert(
            PageKind::Contact,
            PagePlan {
                goal: "Start a conversation".to_string(),
                ordered_sections: vec![SectionType::HeroMinimal, SectionType::Contact],
            },
        );
        SitePlan { pages }
    }

    fn built() -> SiteData {
        let mut data = SiteData::empty(ThemePreset::Classic);
        let tool = StructureTool::CreateSiteFromPlan { plan: plan() };
        apply(&mut data, &tool, &intake(BlogPresence::No)).unwrap();
        data
    }

    #[test]
    fn test_create_from_plan_keeps_plan_order() {
        let data = built();
        assert_eq!(data.pages.len(), 2);
        let home = data.page(PageKind::Home).unwrap();
        assert_eq!(
            home.section_types(),
            vec![SectionType::HeroSplit, SectionType::Features, SectionType::CtaPrimary]
        );
        assert_eq!(home.sections[2].position, 2);
        assert_eq!(home.sections[0].variant, "split");
        assert!(home.sections.iter().all(|s| s.content.is_none()));
    }

    #[test]
    fn test_create_from_plan_is_idempotent() {
        let mut data = built();
        let before = data.clone();
        let tool = StructureTool::CreateSiteFromPlan { plan: plan() };
        let summary = apply(&mut data, &tool, &intake(BlogPresence::No)).unwrap();
        assert_eq!(summary, "The site already matches this plan");
        assert_eq!(data, before);
    }

    #[test]
    fn test_create_from_different_plan_on_built_site_fails() {
        let mut data = built();
        let mut other = plan();
        other.pages.remove(&PageKind::Contact);
        let err = apply(
            &mut data,
            &StructureTool::CreateSiteFromPlan { plan: other },
            &intake(BlogPresence::No),
        )
        .unwrap_err();
        assert!(matches!(err, ToolError::Precondition(_)));
    }

    #[test]
    fn test_add_section_goes_before_cta() {
        let mut data = built();
        let tool = StructureTool::AddSection {
            page: PageKind::Home,
            section_type: SectionType::Testimonials,
            position: None,
        };
        apply(&mut data, &tool, &intake(BlogPresence::No)).unwrap();
        let home = data.page(PageKind::Home).unwrap();
        assert_eq!(home.position_of(SectionType::Testimonials), Some(2));
        assert_eq!(home.sections.last().unwrap().section_type, SectionType::CtaPrimary);

        // Second call changes nothing.
        let again = apply(&mut data, &tool, &intake(BlogPresence::No)).unwrap();
        assert!(again.contains("already has"));
        assert_eq!(data.page(PageKind::Home).unwrap().sections.len(), 4);
    }

    #[test]
    fn test_add_section_rejects_grammar_violation() {
        let mut data = built();
        let before = data.clone();
        let tool = StructureTool::AddSection {
            page: PageKind::Home,
            section_type: SectionType::BlogFeed,
            position: None,
        };
        let err = apply(&mut data, &tool, &intake(BlogPresence::No)).unwrap_err();
        assert!(matches!(err, ToolError::Schema(_)));
        assert_eq!(data, before);
    }

    #[test]
    fn test_add_section_to_missing_page() {
        let mut data = built();
        let tool = StructureTool::AddSection {
            page: PageKind::Pricing,
            section_type: SectionType::Pricing,
            position: None,
        };
        assert!(matches!(
            apply(&mut data, &tool, &intake(BlogPresence::No)),
            Err(ToolError::NotFound { entity: "page", .. })
        ));
    }

    #[test]
    fn test_reorder_sections() {
        let mut data = built();
        let tool = StructureTool::AddSection {
            page: PageKind::Home,
            section_type: SectionType::Faq,
            position: None,
        };
        apply(&mut data, &tool, &intake(BlogPresence::No)).unwrap();

        let reorder = StructureTool::ReorderSections {
            page: PageKind::Home,
            order: vec![SectionType::HeroSplit, SectionType::Faq, SectionType::Features, SectionType::CtaPrimary],
        };
        apply(&mut data, &reorder, &intake(BlogPresence::No)).unwrap();
        let home = data.page(PageKind::Home).unwrap();
        assert_eq!(home.position_of(SectionType::Faq), Some(1));
        assert_eq!(home.sections[1].position, 1);

        let bad = StructureTool::ReorderSections {
            page: PageKind::Home,
            order: vec![SectionType::HeroSplit, SectionType::CtaPrimary],
        };
        assert!(matches!(
            apply(&mut data, &bad, &intake(BlogPresence::No)),
            Err(ToolError::Schema(_))
        ));
    }

    #[test]
    fn test_enable_blog_respects_intake() {
        let mut data = built();
        assert!(matches!(
            apply(&mut data, &StructureTool::EnableBlog, &intake(BlogPresence::No)),
            Err(ToolError::Precondition(_))
        ));
        apply(&mut data, &StructureTool::EnableBlog, &intake(BlogPresence::Later)).unwrap();
        let blog = data.page(PageKind::Blog).unwrap();
        assert_eq!(blog.section_types(), BLOG_SECTIONS.to_vec());
        assert_eq!(data.pages.last().unwrap().kind, PageKind::Blog);
    }

    #[test]
    fn test_add_page() {
        let mut data = built();
        let tool = StructureTool::AddPage {
            page: PageKind::Faq,
            goal: "Answer common questions".to_string(),
            sections: vec![SectionType::HeroMinimal, SectionType::Faq],
        };
        apply(&mut data, &tool, &intake(BlogPresence::No)).unwrap();
        let kinds: Vec<_> = data.pages.iter().map(|p| p.kind).collect();
        assert_eq!(kinds, vec![PageKind::Home, PageKind::Faq, PageKind::Contact]);
        assert_eq!(data.page(PageKind::Faq).unwrap().position, 1);
    }
}
