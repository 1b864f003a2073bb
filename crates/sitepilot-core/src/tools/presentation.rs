//! Presentation tools: applyTheme and switchSectionVariant.

use sitepilot_types::draft::PresentationTool;
use sitepilot_types::error::ToolError;
use sitepilot_types::site::SiteData;

use crate::validate::catalog::{is_valid_variant, variants};

pub(super) fn apply(data: &mut SiteData, tool: &PresentationTool) -> Result<String, ToolError> {
    match tool {
        PresentationTool::ApplyTheme { theme } => {
            if data.theme == *theme {
                return Ok(format!("The site already uses the {theme} theme"));
            }
            data.theme = *theme;
            Ok(format!("Switched the site to the {theme} theme"))
        }

        PresentationTool::SwitchSectionVariant {
            section_id,
            variant,
        } => {
            let section = data
                .find_section_mut(*section_id)
                .ok_or_else(|| ToolError::NotFound {
                    entity: "section",
                    id: section_id.to_string(),
                })?;
            let section_type = section.section_type;
            if !is_valid_variant(section_type, variant) {
                return Err(ToolError::Schema(vec![format!(
                    "variant: '{variant}' is not a {section_type} variant (expected one of: {})",
                    variants(section_type).join(", ")
                )]));
            }
            if section.variant == *variant {
                return Ok(format!("The {section_type} section already uses the {variant} layout"));
            }
            section.variant = variant.clone();
            Ok(format!("Switched the {section_type} section to the {variant} layout"))
        }
    }
}
