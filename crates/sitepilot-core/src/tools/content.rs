//! Content tools: generateSectionContent and rewriteSectionContent.

use sitepilot_types::draft::ContentTool;
use sitepilot_types::error::ToolError;
use sitepilot_types::site::SiteData;

use crate::validate::validate_section_content;

pub(super) fn apply(data: &mut SiteData, tool: &ContentTool) -> Result<String, ToolError> {
    let id = tool.section_id();
    let not_found = || ToolError::NotFound {
        entity: "section",
        id: id.to_string(),
    };
    let (page, section_type, existing) = data
        .find_section(id)
        .map(|(page, s)| (page, s.section_type, s.content.clone()))
        .ok_or_else(not_found)?;

    let content = validate_section_content(section_type, tool.content()).map_err(ToolError::Schema)?;

    let verb = match tool {
        ContentTool::GenerateSectionContent { .. } => {
            match &existing {
                Some(current) if *current == content => {
                    return Ok(format!("The {section_type} section on the {page} page already has this copy"));
                }
                Some(_) => {
                    return Err(ToolError::Precondition(format!(
                        "the {section_type} section already has copy; rewrite it instead"
                    )));
                }
                None => "Wrote",
            }
        }
        ContentTool::RewriteSectionContent { .. } => {
            if existing.is_none() {
                return Err(ToolError::Precondition(format!(
                    "the {section_type} section has no copy to rewrite"
                )));
            }
            "Rewrote"
        }
    };

    let section = data.find_section_mut(id).ok_or_else(not_found)?;
    section.content = Some(content);
    Ok(format!("{verb} the copy for the {section_type} section on the {page} page"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use sitepilot_types::site::{Page, PageKind, SectionType, ThemePreset};
    use uuid::Uuid;

    use crate::tools::structure::new_section;

    fn data() -> (SiteData, Uuid) {
        let section = new_section(SectionType::CtaPrimary);
        let id = section.id;
        let mut data = SiteData::empty(ThemePreset::Calm);
        data.pages.push(Page {
            kind: PageKind::Home,
            goal: "convert".to_string(),
            position: 0,
            sections: vec![new_section(SectionType::HeroMinimal), section],
        });
        data.normalize();
        (data, id)
    }

    fn cta(body: &str) -> serde_json::Value {
        json!({"heading": "Ready when you are", "body": body, "buttonLabel": "Book a call"})
    }

    #[test]
    fn test_generate_then_rewrite() {
        let (mut data, id) = data();
        let generate = ContentTool::GenerateSectionContent {
            section_id: id,
            content: cta("Tell us about your studio."),
        };
        apply(&mut data, &generate).unwrap();
        assert_eq!(data.find_section(id).unwrap().1.content, Some(cta("Tell us about your studio.")));

        // Same arguments again: no change, no error.
        assert!(apply(&mut data, &generate).unwrap().contains("already has this copy"));

        let other = ContentTool::GenerateSectionContent {
            section_id: id,
            content: cta("Different words."),
        };
        assert!(matches!(apply(&mut data, &other), Err(ToolError::Precondition(_))));

        let rewrite = ContentTool::RewriteSectionContent {
            section_id: id,
            content: cta("Different words."),
        };
        apply(&mut data, &rewrite).unwrap();
        assert_eq!(data.find_section(id).unwrap().1.content, Some(cta("Different words.")));
    }

    #[test]
    fn test_rewrite_requires_existing_copy() {
        let (mut data, id) = data();
        let rewrite = ContentTool::RewriteSectionContent {
            section_id: id,
            content: cta("Words."),
        };
        assert!(matches!(apply(&mut data, &rewrite), Err(ToolError::Precondition(_))));
    }

    #[test]
    fn test_invalid_content_is_rejected_before_mutation() {
        let (mut data, id) = data();
        let before = data.clone();
        let generate = ContentTool::GenerateSectionContent {
            section_id: id,
            content: cta("A world-class studio."),
        };
        assert!(matches!(apply(&mut data, &generate), Err(ToolError::Schema(_))));
        assert_eq!(data, before);
    }

    #[test]
    fn test_missing_section() {
        let (mut data, _) = data();
        let generate = ContentTool::GenerateSectionContent {
            section_id: Uuid::now_v7(),
            content: cta("Words."),
        };
        assert!(matches!(
            apply(&mut data, &generate),
            Err(ToolError::NotFound { entity: "section", .. })
        ));
    }
}
