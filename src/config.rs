//! Fight configuration loaded from YAML/JSON files
//!
//! Every field is optional in the file; anything left out takes the default
//! documented on the field. Percent-style inputs (crit, hit) are entered the
//! way the in-game character sheet shows them and converted in
//! [`crate::warrior::Warrior::from_config`].

use crate::error::ConfigError;
use crate::policy::Ability;
use crate::procs::ProcId;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// A weapon's damage range and swing timer.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Weapon {
    pub min_damage: f64,
    pub max_damage: f64,
    pub speed: f64,
}

/// Character sheet values as displayed in game.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CharacterSheet {
    /// Strength (403)
    pub strength: f64,
    /// Agility (121)
    pub agility: f64,
    /// Sheet attack power including strength and armor contributions (1455)
    pub attack_power: f64,
    /// Sheet crit in percent (30.42)
    pub crit: f64,
    /// Hit in percent (8)
    pub hit: f64,
    /// Own armor (4234)
    pub armor: f64,
    /// Armor penetration rating, 5 rating = 1% (78)
    pub armor_penetration: f64,
    /// Haste rating, 10 rating = 1% (0)
    pub haste: f64,
    /// Windfury-style attack speed rating, 10 rating = 1% (0)
    pub windfury: f64,
    /// Main hand: 97-157 @ 2.6
    pub main_hand: Weapon,
    /// Off hand: 100-157 @ 2.7
    pub off_hand: Weapon,
    /// Strength from sources not on the sheet, scaled by 1.2 (0)
    pub extra_strength: f64,
    pub extra_agility: f64,
    pub extra_attack_power: f64,
    /// Extra crit in percent (0)
    pub extra_crit: f64,
}

impl Default for CharacterSheet {
    fn default() -> Self {
        Self {
            strength: 403.0,
            agility: 121.0,
            attack_power: 1455.0,
            crit: 30.42,
            hit: 8.0,
            armor: 4234.0,
            armor_penetration: 78.0,
            haste: 0.0,
            windfury: 0.0,
            main_hand: Weapon { min_damage: 97.0, max_damage: 157.0, speed: 2.6 },
            off_hand: Weapon { min_damage: 100.0, max_damage: 157.0, speed: 2.7 },
            extra_strength: 0.0,
            extra_agility: 0.0,
            extra_attack_power: 0.0,
            extra_crit: 0.0,
        }
    }
}

/// The boss being hit and the armor debuffs on it.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct TargetConfig {
    /// Base armor before debuffs (4644)
    pub armor: f64,
    /// Level (63)
    pub level: i32,
    /// Flat -668 armor (false)
    pub bashguuder: bool,
    /// Armor x0.8 (false)
    pub sunders: bool,
    /// Armor x0.95 (false)
    pub faerie_fire: bool,
}

impl Default for TargetConfig {
    fn default() -> Self {
        Self {
            armor: 4644.0,
            level: 63,
            bashguuder: false,
            sunders: false,
            faerie_fire: false,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Talents {
    /// Off-hand weapon equipped (true)
    pub dual_wield: bool,
    /// +2.5% armor penetration, slams roll main-hand procs twice (true)
    pub battering_ram: bool,
    /// Heroic strike follows up with an off-hand strike (true)
    pub ambidextrous_strike: bool,
    /// Landed slams shorten the death wish cooldown (true)
    pub skull_cracker: bool,
    /// Enrage grants an extra 5% damage (false)
    pub outrage: bool,
    /// Deep wounds and rend deal 30% more (false)
    pub trauma: bool,
}

impl Default for Talents {
    fn default() -> Self {
        Self {
            dual_wield: true,
            battering_ram: true,
            ambidextrous_strike: true,
            skull_cracker: true,
            outrage: false,
            trauma: false,
        }
    }
}

/// Raid buffs, consumables and trinkets. All off by default.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Consumables {
    pub kings: bool,
    pub strength_of_earth: bool,
    pub shamanistic_rage: bool,
    /// Training dummy feeding 60 rage every 1.5s
    pub tank_dummy: bool,
    /// Adds the icon trinket proc to both hands
    pub icon: bool,
    /// Adds the hand of justice proc to both hands
    pub hand_of_justice: bool,
    /// Bloodlust is used at this time (61s, i.e. never in a 60s fight)
    pub bloodlust_at: f64,
    /// Bloodfury is used at this time (61s)
    pub bloodfury_at: f64,
}

impl Default for Consumables {
    fn default() -> Self {
        Self {
            kings: false,
            strength_of_earth: false,
            shamanistic_rage: false,
            tank_dummy: false,
            icon: false,
            hand_of_justice: false,
            bloodlust_at: 61.0,
            bloodfury_at: 61.0,
        }
    }
}

/// Rage cost per ability.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct AbilityCosts {
    pub heroic_strike: f64,
    pub slam: f64,
    pub whirlwind: f64,
    pub bloodthirst: f64,
    pub death_wish: f64,
}

impl Default for AbilityCosts {
    fn default() -> Self {
        Self {
            heroic_strike: 15.0,
            slam: 15.0,
            whirlwind: 25.0,
            bloodthirst: 20.0,
            death_wish: 10.0,
        }
    }
}

/// Cooldown in seconds per ability.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct AbilityCooldowns {
    pub bloodthirst: f64,
    pub whirlwind: f64,
    pub death_wish: f64,
}

impl Default for AbilityCooldowns {
    fn default() -> Self {
        Self {
            bloodthirst: 6.0,
            whirlwind: 8.0,
            death_wish: 120.0,
        }
    }
}

/// Full configuration for a batch of fights.
///
/// Built once, validated, then shared read-only by every worker.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct FightConfig {
    pub character: CharacterSheet,
    pub target: TargetConfig,
    pub talents: Talents,
    pub consumables: Consumables,
    pub costs: AbilityCosts,
    pub cooldowns: AbilityCooldowns,
    /// Abilities tried in order on every global cooldown
    pub priority: Vec<Ability>,
    pub main_hand_procs: Vec<ProcId>,
    pub off_hand_procs: Vec<ProcId>,
    /// Flat damage multiplier applied to everything (1.0)
    pub base_multiplier: f64,
    /// Fight length in seconds (60)
    pub fight_duration: f64,
    /// Number of fights to simulate (1000)
    pub iterations: usize,
    /// Rage at pull (0)
    pub starting_rage: f64,
    /// Delay of the first off-hand swing (0.18s)
    pub off_hand_offset: f64,
    /// Master seed; drawn from entropy when absent
    pub seed: Option<u64>,
    /// Worker count, 0 = one per CPU
    pub threads: usize,
}

impl Default for FightConfig {
    fn default() -> Self {
        Self {
            character: CharacterSheet::default(),
            target: TargetConfig::default(),
            talents: Talents::default(),
            consumables: Consumables::default(),
            costs: AbilityCosts::default(),
            cooldowns: AbilityCooldowns::default(),
            priority: Ability::default_priority().to_vec(),
            main_hand_procs: vec![ProcId::Crusader],
            off_hand_procs: vec![ProcId::CrusaderOh],
            base_multiplier: 1.0,
            fight_duration: 60.0,
            iterations: 1000,
            starting_rage: 0.0,
            off_hand_offset: 0.18,
            seed: None,
            threads: 0,
        }
    }
}

impl FightConfig {
    /// Load a configuration from a YAML or JSON file (chosen by extension)
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(&path)?;
        let path_str = path.as_ref().to_string_lossy().to_lowercase();

        if path_str.ends_with(".json") {
            Ok(serde_json::from_str(&content)?)
        } else {
            Ok(serde_yaml::from_str(&content)?)
        }
    }

    /// Load from a JSON string (for the Python boundary)
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(json)?)
    }

    /// Reject configurations no fight can be run with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(self.fight_duration > 0.0) || !self.fight_duration.is_finite() {
            return Err(ConfigError::NonPositiveDuration(self.fight_duration));
        }
        if self.iterations == 0 {
            return Err(ConfigError::NoIterations);
        }
        if self.priority.is_empty() {
            return Err(ConfigError::EmptyPriority);
        }

        let hands = [
            ("main hand", &self.character.main_hand),
            ("off hand", &self.character.off_hand),
        ];
        for (hand, weapon) in hands {
            if weapon.min_damage > weapon.max_damage {
                return Err(ConfigError::InvalidWeaponRange {
                    hand,
                    min: weapon.min_damage,
                    max: weapon.max_damage,
                });
            }
            if !(weapon.speed > 0.0) {
                return Err(ConfigError::NonPositiveWeaponSpeed { hand, speed: weapon.speed });
            }
        }
        Ok(())
    }
}
