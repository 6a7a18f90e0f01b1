//! Ability priority list evaluated on every global cooldown

use crate::config::AbilityCosts;
use serde::{Deserialize, Serialize};

/// Global cooldown after a cast
pub const GCD: f64 = 1.5;
/// Reaction delay added to every global cooldown
pub const GCD_DELAY: f64 = 0.05;
/// Re-check interval when nothing could be cast
pub const IDLE_POLL: f64 = 0.02;

/// Abilities the rotation can cast on the global cooldown
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Ability {
    DeathWish,
    /// Slam without cast time, available after a slam proc
    InstantSlam,
    Bloodthirst,
    Whirlwind,
    /// Hard-cast slam that locks out auto attacks
    Slam,
}

impl Ability {
    pub fn default_priority() -> &'static [Ability] {
        &[
            Ability::DeathWish,
            Ability::InstantSlam,
            Ability::Bloodthirst,
            Ability::Whirlwind,
            Ability::Slam,
        ]
    }

    pub fn cost(self, costs: &AbilityCosts) -> f64 {
        match self {
            Ability::DeathWish => costs.death_wish,
            Ability::InstantSlam | Ability::Slam => costs.slam,
            Ability::Bloodthirst => costs.bloodthirst,
            Ability::Whirlwind => costs.whirlwind,
        }
    }

    /// Availability gate other than rage
    fn is_ready(self, gates: &Readiness) -> bool {
        match self {
            Ability::DeathWish => gates.death_wish,
            Ability::InstantSlam => gates.instant_slam,
            Ability::Bloodthirst => gates.bloodthirst,
            Ability::Whirlwind => gates.whirlwind,
            Ability::Slam => true,
        }
    }
}

/// "Available again at" timestamp for one ability.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct CooldownGate {
    ready_at: f64,
}

impl CooldownGate {
    pub fn is_ready(&self, now: f64) -> bool {
        now >= self.ready_at
    }

    pub fn start(&mut self, now: f64, cooldown: f64) {
        self.ready_at = now + cooldown;
    }

    pub fn ready_at(&self) -> f64 {
        self.ready_at
    }
}

/// Cooldown and proc state the policy looks at
#[derive(Debug, Clone, Copy, Default)]
pub struct Readiness {
    pub rage: f64,
    pub death_wish: bool,
    pub instant_slam: bool,
    pub bloodthirst: bool,
    pub whirlwind: bool,
}

/// First ability in `priority` that is off cooldown and affordable.
pub fn choose(priority: &[Ability], costs: &AbilityCosts, gates: &Readiness) -> Option<Ability> {
    priority
        .iter()
        .copied()
        .find(|ability| ability.is_ready(gates) && gates.rage >= ability.cost(costs))
}

/// When the next global cooldown tick happens.
pub fn next_gcd(now: f64, cast: bool) -> f64 {
    if cast {
        now + GCD + GCD_DELAY
    } else {
        now + IDLE_POLL
    }
}
