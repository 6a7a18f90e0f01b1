//! The boss being attacked: armor after debuffs and attack table bands

use crate::config::TargetConfig;

/// Flat armor removed by the bashguuder debuff
const BASHGUUDER_ARMOR: f64 = 668.0;
const SUNDERS_MULT: f64 = 0.8;
const FAERIE_FIRE_MULT: f64 = 0.95;

/// Attacker level the miss table is anchored to
const ATTACKER_LEVEL: i32 = 60;
const BASE_MISS: f64 = 0.05;
const MISS_PER_LEVEL: f64 = 0.01;

/// Glancing blow chance against a boss-level target
pub const GLANCE_CHANCE: f64 = 0.25;

/// A combat target with its debuffs already folded in.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Target {
    pub armor: f64,
    pub level: i32,
}

impl Target {
    pub fn from_config(config: &TargetConfig) -> Self {
        let mut armor = config.armor;
        if config.bashguuder {
            armor -= BASHGUUDER_ARMOR;
        }
        if config.sunders {
            armor *= SUNDERS_MULT;
        }
        if config.faerie_fire {
            armor *= FAERIE_FIRE_MULT;
        }

        Self {
            armor: armor.max(0.0),
            level: config.level,
        }
    }

    /// Miss chance before hit rating: 5% plus 1% per level above the attacker.
    /// A level 63 boss gives 8%.
    pub fn base_miss(&self) -> f64 {
        let diff = (self.level - ATTACKER_LEVEL).max(0) as f64;
        BASE_MISS + MISS_PER_LEVEL * diff
    }
}
