//! Shared domain types for SitePilot.
//!
//! This crate contains the data model used across the SitePilot workspace:
//! the gating contracts (intake, design intent, voice), the site/page/section
//! model and its structural plan, staged drafts and the tool calls they carry,
//! recommendations, audit findings, snapshots, the mutation log, and the
//! message-turn envelope.
//!
//! Zero infrastructure dependencies -- only serde, uuid, chrono, thiserror, schemars.

/// Generates a closed string-valued enum with `Display`, `FromStr`, an `ALL`
/// table, and serde support that uses the same lowercase/camelCase keys.
macro_rules! keyed_enum {
    (
        $(#[$meta:meta])*
        pub enum $name:ident { $( $(#[$vmeta:meta])* $variant:ident => $key:literal ),+ $(,)? }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, serde::Serialize, serde::Deserialize, schemars::JsonSchema)]
        pub enum $name {
            $( $(#[$vmeta])* #[serde(rename = $key)] $variant ),+
        }

        impl $name {
            /// Every variant, in declaration order.
            pub const ALL: &'static [$name] = &[$( $name::$variant ),+];

            /// Stable wire key for this variant.
            pub fn key(&self) -> &'static str {
                match self {
                    $( $name::$variant => $key ),+
                }
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(self.key())
            }
        }

        impl std::str::FromStr for $name {
            type Err = String;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                let needle = s.trim();
                $name::ALL
                    .iter()
                    .copied()
                    .find(|v| v.key().eq_ignore_ascii_case(needle))
                    .ok_or_else(|| format!(concat!("invalid ", stringify!($name), ": '{}'"), needle))
            }
        }
    };
}

pub mod audit;
pub mod config;
pub mod contract;
pub mod conversation;
pub mod draft;
pub mod error;
pub mod llm;
pub mod plan;
pub mod recommendation;
pub mod site;
pub mod snapshot;
pub mod turn;
