//! Design intent: derive from intake signals, offer keep/quieter/bolder, and
//! map the locked intent to a theme preset.

use sitepilot_types::contract::{
    DesignIntent, EmotionalTemperature, IntakeContract, MotionEnergy, PrestigeLevel,
    SpatialDensity, VisualGravity,
};
use sitepilot_types::site::ThemePreset;

const MINIMAL_SIGNALS: &[&str] = &["minimal", "simple", "clean", "quiet", "calm", "understated"];
const EXPRESSIVE_SIGNALS: &[&str] = &["bold", "vibrant", "playful", "loud", "creative", "fun", "energetic"];
const LIVELY_SIGNALS: &[&str] = &["energetic", "dynamic", "playful", "fun", "lively", "fitness", "events"];
const STILL_SIGNALS: &[&str] = &["calm", "serene", "quiet", "peaceful", "formal", "legal"];
const AIRY_SIGNALS: &[&str] = &["minimal", "airy", "spacious", "luxury", "elegant", "calm"];
const DENSE_SIGNALS: &[&str] = &["catalog", "catalogue", "directory", "detailed", "technical", "data"];
const WARM_SIGNALS: &[&str] = &["friendly", "warm", "family", "community", "caring", "welcoming", "kids"];
const COOL_SIGNALS: &[&str] = &["formal", "corporate", "technical", "professional", "clinical", "enterprise"];
const PREMIUM_SIGNALS: &[&str] = &["luxury", "premium", "exclusive", "bespoke", "high-end", "elegant", "boutique"];
const ACCESSIBLE_SIGNALS: &[&str] = &["affordable", "budget", "everyone", "local", "cheap", "community", "students"];

fn hits(text: &str, signals: &[&str]) -> usize {
    text.split(|c: char| !c.is_alphanumeric() && c != '-')
        .filter(|w| signals.contains(w))
        .count()
}

fn pick<T>(text: &str, low: (&[&str], T), mid: T, high: (&[&str], T)) -> T {
    let l = hits(text, low.0);
    let h = hits(text, high.0);
    if h > l {
        high.1
    } else if l > h {
        low.1
    } else {
        mid
    }
}

/// Derive a proposed intent from keyword signals in the intake answers.
///
/// Each axis defaults to its middle value; whichever extreme has more keyword
/// hits wins, ties keep the middle.
pub fn derive_intent(intake: &IntakeContract) -> DesignIntent {
    let text = intake.signal_text();
    DesignIntent {
        visual_gravity: pick(
            &text,
            (MINIMAL_SIGNALS, VisualGravity::Minimal),
            VisualGravity::Balanced,
            (EXPRESSIVE_SIGNALS, VisualGravity::Expressive),
        ),
        motion_energy: pick(
            &text,
            (STILL_SIGNALS, MotionEnergy::Still),
            MotionEnergy::Subtle,
            (LIVELY_SIGNALS, MotionEnergy::Lively),
        ),
        spatial_density: pick(
            &text,
            (AIRY_SIGNALS, SpatialDensity::Airy),
            SpatialDensity::Balanced,
            (DENSE_SIGNALS, SpatialDensity::Dense),
        ),
        emotional_temperature: pick(
            &text,
            (COOL_SIGNALS, EmotionalTemperature::Cool),
            EmotionalTemperature::Neutral,
            (WARM_SIGNALS, EmotionalTemperature::Warm),
        ),
        prestige_level: pick(
            &text,
            (ACCESSIBLE_SIGNALS, PrestigeLevel::Accessible),
            PrestigeLevel::Established,
            (PREMIUM_SIGNALS, PrestigeLevel::Premium),
        ),
    }
}

/// The user's answer to the design intent proposal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DesignChoice {
    Keep,
    Quieter,
    Bolder,
}

impl DesignChoice {
    /// Parse `1`/`2`/`3` or the option words.
    pub fn parse(text: &str) -> Option<Self> {
        let t = text.trim().trim_end_matches(['.', '!', ')']).to_lowercase();
        match t.as_str() {
            "1" | "keep" | "keep it" | "keep as proposed" | "as proposed" | "looks good" => {
                Some(Self::Keep)
            }
            "2" | "quieter" | "quiet" | "calmer" | "softer" => Some(Self::Quieter),
            "3" | "bolder" | "bold" | "louder" | "stronger" => Some(Self::Bolder),
            _ => None,
        }
    }

    pub fn apply(self, intent: DesignIntent) -> DesignIntent {
        match self {
            Self::Keep => intent,
            Self::Quieter => DesignIntent {
                visual_gravity: VisualGravity::Minimal,
                motion_energy: MotionEnergy::Still,
                emotional_temperature: EmotionalTemperature::Cool,
                ..intent
            },
            Self::Bolder => DesignIntent {
                visual_gravity: VisualGravity::Expressive,
                motion_energy: MotionEnergy::Lively,
                emotional_temperature: EmotionalTemperature::Warm,
                ..intent
            },
        }
    }
}

/// Theme preset (visual system) for a locked intent.
pub fn theme_for(intent: &DesignIntent) -> ThemePreset {
    if intent.prestige_level == PrestigeLevel::Premium {
        ThemePreset::Luxe
    } else if intent.visual_gravity == VisualGravity::Expressive {
        ThemePreset::Bold
    } else if intent.visual_gravity == VisualGravity::Minimal
        && intent.emotional_temperature != EmotionalTemperature::Cool
    {
        ThemePreset::Modern
    } else if intent.emotional_temperature == EmotionalTemperature::Cool
        || intent.motion_energy == MotionEnergy::Still
    {
        ThemePreset::Calm
    } else {
        ThemePreset::Classic
    }
}

/// The proposal shown once intake is confirmed.
pub fn design_intent_message(intent: &DesignIntent) -> String {
    format!(
        "Here is the feel I would aim for:\n\
         - Visual gravity: {}\n\
         - Motion: {}\n\
         - Spacing: {}\n\
         - Temperature: {}\n\
         - Prestige: {}\n\
         Reply 1 to keep it, 2 for quieter, or 3 for bolder.",
        intent.visual_gravity,
        intent.motion_energy,
        intent.spatial_density,
        intent.emotional_temperature,
        intent.prestige_level,
    )
}

pub fn ready_message(intent: &DesignIntent, theme: ThemePreset) -> String {
    format!(
        "Locked in: {} / {} / {}. Your site is set up with the {theme} theme. \
         Ask me to build the site when you are ready and I will propose a page plan.",
        intent.visual_gravity, intent.emotional_temperature, intent.prestige_level,
    )
}
