//! Gating contracts: intake answers, the derived design intent, and the
//! voice contract that gates content generation.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Intake
// ---------------------------------------------------------------------------

keyed_enum! {
    /// Whether the site should carry a blog.
    pub enum BlogPresence {
        Yes => "yes",
        No => "no",
        Later => "later",
    }
}

keyed_enum! {
    /// The five intake questions, in the order they are asked.
    pub enum IntakeField {
        Purpose => "purpose",
        Audience => "audience",
        Action => "action",
        Tone => "tone",
        Blog => "blog",
    }
}

impl IntakeField {
    /// 1-based question number shown to the user.
    pub fn number(&self) -> usize {
        Self::ALL.iter().position(|f| f == self).map_or(0, |i| i + 1)
    }

    pub fn from_number(n: usize) -> Option<Self> {
        n.checked_sub(1).and_then(|i| Self::ALL.get(i).copied())
    }
}

/// Answers to the intake questions. Each field stays `None` until answered.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IntakeContract {
    pub purpose: Option<String>,
    pub audience: Option<String>,
    pub action: Option<String>,
    pub tone: Option<String>,
    pub blog_presence: Option<BlogPresence>,
}

impl IntakeContract {
    /// Unanswered fields, in question order.
    pub fn missing_fields(&self) -> Vec<IntakeField> {
        IntakeField::ALL
            .iter()
            .copied()
            .filter(|f| match f {
                IntakeField::Purpose => self.purpose.is_none(),
                IntakeField::Audience => self.audience.is_none(),
                IntakeField::Action => self.action.is_none(),
                IntakeField::Tone => self.tone.is_none(),
                IntakeField::Blog => self.blog_presence.is_none(),
            })
            .collect()
    }

    pub fn is_complete(&self) -> bool {
        self.missing_fields().is_empty()
    }

    /// Whether the user has ruled out a blog.
    pub fn blog_excluded(&self) -> bool {
        self.blog_presence == Some(BlogPresence::No)
    }

    /// Concatenated free-text answers, used for keyword signals.
    pub fn signal_text(&self) -> String {
        [&self.purpose, &self.audience, &self.action, &self.tone]
            .into_iter()
            .flatten()
            .map(|s| s.to_lowercase())
            .collect::<Vec<_>>()
            .join(" ")
    }
}

// ---------------------------------------------------------------------------
// Design intent
// ---------------------------------------------------------------------------

keyed_enum! {
    pub enum VisualGravity {
        Minimal => "minimal",
        Balanced => "balanced",
        Expressive => "expressive",
    }
}

keyed_enum! {
    pub enum MotionEnergy {
        Still => "still",
        Subtle => "subtle",
        Lively => "lively",
    }
}

keyed_enum! {
    pub enum SpatialDensity {
        Airy => "airy",
        Balanced => "balanced",
        Dense => "dense",
    }
}

keyed_enum! {
    pub enum EmotionalTemperature {
        Cool => "cool",
        Neutral => "neutral",
        Warm => "warm",
    }
}

keyed_enum! {
    pub enum PrestigeLevel {
        Accessible => "accessible",
        Established => "established",
        Premium => "premium",
    }
}

/// Five independent axes describing the intended feel of the site.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DesignIntent {
    pub visual_gravity: VisualGravity,
    pub motion_energy: MotionEnergy,
    pub spatial_density: SpatialDensity,
    pub emotional_temperature: EmotionalTemperature,
    pub prestige_level: PrestigeLevel,
}

impl Default for DesignIntent {
    fn default() -> Self {
        Self {
            visual_gravity: VisualGravity::Balanced,
            motion_energy: MotionEnergy::Subtle,
            spatial_density: SpatialDensity::Balanced,
            emotional_temperature: EmotionalTemperature::Neutral,
            prestige_level: PrestigeLevel::Established,
        }
    }
}

/// Persisted design intent together with its one-way lock.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DesignIntentState {
    pub intent: DesignIntent,
    pub locked: bool,
    pub locked_at: Option<DateTime<Utc>>,
}

impl DesignIntentState {
    pub fn proposed(intent: DesignIntent) -> Self {
        Self {
            intent,
            locked: false,
            locked_at: None,
        }
    }

    /// Lock the intent. Once locked, the intent can no longer change.
    ///
    /// Returns `false` if the state was already locked.
    pub fn lock(&mut self, intent: DesignIntent) -> bool {
        if self.locked {
            return false;
        }
        self.intent = intent;
        self.locked = true;
        self.locked_at = Some(Utc::now());
        true
    }
}

// ---------------------------------------------------------------------------
// Voice
// ---------------------------------------------------------------------------

keyed_enum! {
    pub enum AudienceLevel {
        General => "general",
        Informed => "informed",
        Expert => "expert",
    }
}

keyed_enum! {
    pub enum VoiceTone {
        Plain => "plain",
        Warm => "warm",
        Authoritative => "authoritative",
    }
}

keyed_enum! {
    pub enum Assertiveness {
        Gentle => "gentle",
        Balanced => "balanced",
        Direct => "direct",
    }
}

keyed_enum! {
    pub enum Verbosity {
        Concise => "concise",
        Standard => "standard",
        Detailed => "detailed",
    }
}

keyed_enum! {
    /// The four voice questions, in the order they are asked.
    pub enum VoiceField {
        AudienceLevel => "audience",
        Tone => "tone",
        Assertiveness => "assertiveness",
        Verbosity => "verbosity",
    }
}

impl VoiceField {
    pub fn number(&self) -> usize {
        Self::ALL.iter().position(|f| f == self).map_or(0, |i| i + 1)
    }

    pub fn from_number(n: usize) -> Option<Self> {
        n.checked_sub(1).and_then(|i| Self::ALL.get(i).copied())
    }

    /// Option keys offered for this question, in numbered order.
    pub fn options(&self) -> Vec<&'static str> {
        match self {
            VoiceField::AudienceLevel => AudienceLevel::ALL.iter().map(|v| v.key()).collect(),
            VoiceField::Tone => VoiceTone::ALL.iter().map(|v| v.key()).collect(),
            VoiceField::Assertiveness => Assertiveness::ALL.iter().map(|v| v.key()).collect(),
            VoiceField::Verbosity => Verbosity::ALL.iter().map(|v| v.key()).collect(),
        }
    }
}

/// How generated copy should sound. Gates all content operations.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VoiceContract {
    pub audience_level: Option<AudienceLevel>,
    pub tone: Option<VoiceTone>,
    pub assertiveness: Option<Assertiveness>,
    pub verbosity: Option<Verbosity>,
}

impl VoiceContract {
    pub fn missing_fields(&self) -> Vec<VoiceField> {
        VoiceField::ALL
            .iter()
            .copied()
            .filter(|f| match f {
                VoiceField::AudienceLevel => self.audience_level.is_none(),
                VoiceField::Tone => self.tone.is_none(),
                VoiceField::Assertiveness => self.assertiveness.is_none(),
                VoiceField::Verbosity => self.verbosity.is_none(),
            })
            .collect()
    }

    pub fn is_complete(&self) -> bool {
        self.missing_fields().is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_intake_missing_fields_in_question_order() {
        let intake = IntakeContract {
            audience: Some("parents".to_string()),
            tone: Some("friendly".to_string()),
            ..Default::default()
        };
        assert_eq!(
            intake.missing_fields(),
            vec![IntakeField::Purpose, IntakeField::Action, IntakeField::Blog]
        );
        assert!(!intake.is_complete());
    }

    #[test]
    fn test_intake_serializes_camel_case() {
        let intake = IntakeContract {
            blog_presence: Some(BlogPresence::Later),
            ..Default::default()
        };
        let json = serde_json::to_value(&intake).unwrap();
        assert_eq!(json["blogPresence"], "later");
        assert!(json["purpose"].is_null());
    }

    #[test]
    fn test_field_numbers() {
        assert_eq!(IntakeField::Purpose.number(), 1);
        assert_eq!(IntakeField::Blog.number(), 5);
        assert_eq!(IntakeField::from_number(3), Some(IntakeField::Action));
        assert_eq!(IntakeField::from_number(0), None);
        assert_eq!(VoiceField::from_number(4), Some(VoiceField::Verbosity));
        assert_eq!(VoiceField::Tone.options(), vec!["plain", "warm", "authoritative"]);
    }

    #[test]
    fn test_keyed_enum_parse_is_case_insensitive() {
        assert_eq!("  Expert ".parse::<AudienceLevel>(), Ok(AudienceLevel::Expert));
        assert!("loud".parse::<VoiceTone>().is_err());
    }

    #[test]
    fn test_design_intent_lock_is_one_way() {
        let mut state = DesignIntentState::proposed(DesignIntent::default());
        let bolder = DesignIntent {
            visual_gravity: VisualGravity::Expressive,
            ..DesignIntent::default()
        };
        assert!(state.lock(bolder));
        assert!(state.locked);
        assert!(state.locked_at.is_some());

        let quieter = DesignIntent {
            visual_gravity: VisualGravity::Minimal,
            ..DesignIntent::default()
        };
        assert!(!state.lock(quieter));
        assert_eq!(state.intent.visual_gravity, VisualGravity::Expressive);
    }

    #[test]
    fn test_voice_contract_completeness() {
        let mut voice = VoiceContract {
            audience_level: Some(AudienceLevel::General),
            tone: Some(VoiceTone::Warm),
            assertiveness: Some(Assertiveness::Balanced),
            ..Default::default()
        };
        assert_eq!(voice.missing_fields(), vec![VoiceField::Verbosity]);
        voice.verbosity = Some(Verbosity::Concise);
        assert!(voice.is_complete());
    }
}
