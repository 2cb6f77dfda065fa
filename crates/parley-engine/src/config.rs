//! Engine configuration.

use crate::gate::OwnerPolicy;

/// Default bound on model/tool round-trips within one turn.
pub const DEFAULT_MAX_STEPS: u32 = 10;

const BASE_SYSTEM_PROMPT: &str = "You are a helpful assistant that can do various tasks. \
If the user asks you to run a tool that requires confirmation, propose it and wait for \
their decision.";

/// Configuration handed to the engine at construction.
///
/// There are no ambient globals; everything the engine needs to know about
/// its environment is here.
#[derive(Clone, Debug)]
pub struct EngineConfig {
    /// Base system prompt for every model turn.
    pub system_prompt: String,
    /// Display name of the user, appended to the system prompt when known.
    pub user_display_name: Option<String>,
    /// Maximum model/tool round-trips per turn.
    pub max_steps: u32,
    /// How sessions acquire their owner.
    pub owner_policy: OwnerPolicy,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            system_prompt: BASE_SYSTEM_PROMPT.to_owned(),
            user_display_name: None,
            max_steps: DEFAULT_MAX_STEPS,
            owner_policy: OwnerPolicy::default(),
        }
    }
}

impl EngineConfig {
    /// Full system prompt: the base prompt plus the user's name when known.
    #[must_use]
    pub fn full_system_prompt(&self) -> String {
        let name = self.user_display_name.as_deref().unwrap_or("unknown");
        format!("{}\n\nThe name of the user is {name}.", self.system_prompt)
    }
}
