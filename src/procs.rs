//! On-hit proc registry and resolution

use crate::buffs::{BuffTracker, Stat};
use crate::damage::{roll_chance, CRIT_MULT};
use rand::Rng;
use serde::{Deserialize, Serialize};

/// Crit multiplier of spell damage procs
pub const MAGIC_CRIT_MULT: f64 = 1.5;

/// Every proc the simulator knows about
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProcId {
    #[serde(alias = "Crusader")]
    Crusader,
    #[serde(alias = "Crusader_OH")]
    CrusaderOh,
    #[serde(alias = "Empyrian Demolisher")]
    EmpyrianDemolisher,
    #[serde(alias = "Flurry Axe")]
    FlurryAxe,
    #[serde(alias = "Wound")]
    Wound,
    #[serde(alias = "Rend Garg")]
    RendGarg,
    #[serde(alias = "icon")]
    Icon,
    #[serde(alias = "HoJ")]
    HandOfJustice,
    FieryWeapon,
}

pub const PROC_COUNT: usize = 9;

/// How often a proc fires per landed hit
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ProcChance {
    /// Expected procs per minute, normalized by weapon speed
    PerMinute(f64),
    /// Fixed chance per hit
    Flat(f64),
}

impl ProcChance {
    pub fn per_hit(&self, weapon_speed: f64) -> f64 {
        match *self {
            ProcChance::PerMinute(ppm) => ppm * weapon_speed / 60.0,
            ProcChance::Flat(p) => p,
        }
    }
}

/// What a proc does when it fires
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ProcEffect {
    StatBuff {
        modifiers: &'static [(Stat, f64)],
        duration: f64,
    },
    /// One extra main-hand swing right away
    BonusSwing,
    /// Applies the bleed: `base + ap_coefficient * AP` spread over its ticks
    DamageOverTime { base: f64, ap_coefficient: f64 },
    /// Physical hit scaled by attack power, mitigated by armor
    InstantApDamage {
        base: f64,
        ap_coefficient: f64,
        weapon_multiplier: f64,
    },
    /// Spell hit, ignores armor
    InstantMagicDamage { base: f64, ap_coefficient: f64 },
}

#[derive(Debug, Clone, Copy)]
pub struct ProcDef {
    pub id: ProcId,
    pub name: &'static str,
    pub chance: ProcChance,
    pub cooldown: Option<f64>,
    /// Re-triggering an active buff restarts its window
    pub refresh: bool,
    pub effects: &'static [ProcEffect],
}

const CRUSADER: ProcDef = ProcDef {
    id: ProcId::Crusader,
    name: "Crusader",
    chance: ProcChance::PerMinute(0.8),
    cooldown: None,
    refresh: true,
    effects: &[ProcEffect::StatBuff {
        modifiers: &[(Stat::Strength, 110.0)],
        duration: 15.0,
    }],
};

const CRUSADER_OH: ProcDef = ProcDef {
    id: ProcId::CrusaderOh,
    name: "Crusader_OH",
    ..CRUSADER
};

const EMPYRIAN_DEMOLISHER: ProcDef = ProcDef {
    id: ProcId::EmpyrianDemolisher,
    name: "Empyrian Demolisher",
    chance: ProcChance::PerMinute(1.2),
    cooldown: None,
    refresh: true,
    effects: &[ProcEffect::StatBuff {
        modifiers: &[(Stat::Haste, 0.155)],
        duration: 10.0,
    }],
};

const FLURRY_AXE: ProcDef = ProcDef {
    id: ProcId::FlurryAxe,
    name: "Flurry Axe",
    chance: ProcChance::PerMinute(3.0),
    cooldown: None,
    refresh: true,
    effects: &[ProcEffect::BonusSwing],
};

const WOUND: ProcDef = ProcDef {
    id: ProcId::Wound,
    name: "Wound",
    chance: ProcChance::PerMinute(1.5),
    cooldown: None,
    refresh: true,
    effects: &[ProcEffect::InstantApDamage {
        base: 22.0,
        ap_coefficient: 0.365,
        weapon_multiplier: 1.0,
    }],
};

const REND_GARG: ProcDef = ProcDef {
    id: ProcId::RendGarg,
    name: "Rend Garg",
    chance: ProcChance::PerMinute(2.0),
    cooldown: None,
    refresh: true,
    effects: &[ProcEffect::DamageOverTime {
        base: 260.0,
        ap_coefficient: 1.3,
    }],
};

const ICON: ProcDef = ProcDef {
    id: ProcId::Icon,
    name: "icon",
    chance: ProcChance::Flat(0.1),
    cooldown: Some(45.0),
    refresh: true,
    effects: &[ProcEffect::StatBuff {
        modifiers: &[(Stat::AttackPower, 35.0), (Stat::Crit, 0.025)],
        duration: 12.0,
    }],
};

const HAND_OF_JUSTICE: ProcDef = ProcDef {
    id: ProcId::HandOfJustice,
    name: "HoJ",
    chance: ProcChance::Flat(0.02),
    cooldown: None,
    refresh: true,
    effects: &[ProcEffect::BonusSwing],
};

const FIERY_WEAPON: ProcDef = ProcDef {
    id: ProcId::FieryWeapon,
    name: "Fiery Weapon",
    chance: ProcChance::PerMinute(6.0),
    cooldown: None,
    refresh: true,
    effects: &[ProcEffect::InstantMagicDamage {
        base: 40.0,
        ap_coefficient: 0.0,
    }],
};

impl ProcId {
    pub const ALL: [ProcId; PROC_COUNT] = [
        ProcId::Crusader,
        ProcId::CrusaderOh,
        ProcId::EmpyrianDemolisher,
        ProcId::FlurryAxe,
        ProcId::Wound,
        ProcId::RendGarg,
        ProcId::Icon,
        ProcId::HandOfJustice,
        ProcId::FieryWeapon,
    ];

    pub fn definition(self) -> &'static ProcDef {
        match self {
            ProcId::Crusader => &CRUSADER,
            ProcId::CrusaderOh => &CRUSADER_OH,
            ProcId::EmpyrianDemolisher => &EMPYRIAN_DEMOLISHER,
            ProcId::FlurryAxe => &FLURRY_AXE,
            ProcId::Wound => &WOUND,
            ProcId::RendGarg => &REND_GARG,
            ProcId::Icon => &ICON,
            ProcId::HandOfJustice => &HAND_OF_JUSTICE,
            ProcId::FieryWeapon => &FIERY_WEAPON,
        }
    }

    pub fn name(self) -> &'static str {
        self.definition().name
    }

    fn index(self) -> usize {
        self as usize
    }
}

/// Next time each proc may fire again. Only procs with a cooldown use it.
#[derive(Debug, Clone, Default)]
pub struct ProcCooldowns {
    ready_at: [f64; PROC_COUNT],
}

impl ProcCooldowns {
    pub fn is_ready(&self, id: ProcId, now: f64) -> bool {
        now >= self.ready_at[id.index()]
    }

    fn start(&mut self, id: ProcId, now: f64, cooldown: f64) {
        self.ready_at[id.index()] = now + cooldown;
    }
}

/// Roll every candidate proc for one landed hit.
pub fn resolve_procs(
    now: f64,
    weapon_speed: f64,
    candidates: &[ProcId],
    cooldowns: &mut ProcCooldowns,
    rng: &mut impl Rng,
) -> Vec<ProcId> {
    let mut triggered = Vec::new();
    for &id in candidates {
        let def = id.definition();
        if def.cooldown.is_some() && !cooldowns.is_ready(id, now) {
            continue;
        }
        if roll_chance(rng, def.chance.per_hit(weapon_speed)) {
            triggered.push(id);
            if let Some(cd) = def.cooldown {
                cooldowns.start(id, now, cd);
            }
        }
    }
    triggered
}

/// Turn the stat-buff part of triggered procs into buffs.
pub fn apply_procs(triggered: &[ProcId], now: f64, buffs: &mut BuffTracker) {
    for &id in triggered {
        let def = id.definition();
        for effect in def.effects {
            if let ProcEffect::StatBuff { modifiers, duration } = *effect {
                buffs.add_buff(def.name, modifiers, duration, now, def.refresh);
            }
        }
    }
}

/// Combat state needed to size proc damage
#[derive(Debug, Clone, Copy)]
pub struct ProcContext {
    pub attack_power: f64,
    pub crit_chance: f64,
    /// 1 - armor mitigation
    pub armor_multiplier: f64,
    /// Outgoing physical damage multiplier
    pub physical_multiplier: f64,
    /// Outgoing spell damage multiplier
    pub magic_multiplier: f64,
    /// Extra multiplier on bleeds
    pub dot_multiplier: f64,
}

/// Damage and follow-up actions produced by triggered procs.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ProcOutcome {
    pub damage: f64,
    /// Procs that grant an extra swing, in trigger order
    pub bonus_swings: Vec<ProcId>,
    /// Total damage of a bleed to apply
    pub bleed: Option<f64>,
    /// A physical proc crit, which applies deep wounds
    pub crit: bool,
}

/// Compute instant proc damage and collect bonus swings and bleeds.
pub fn resolve_proc_damage(
    triggered: &[ProcId],
    ctx: &ProcContext,
    rng: &mut impl Rng,
) -> ProcOutcome {
    let mut outcome = ProcOutcome::default();
    for &id in triggered {
        for effect in id.definition().effects {
            match *effect {
                ProcEffect::StatBuff { .. } => {}
                ProcEffect::BonusSwing => outcome.bonus_swings.push(id),
                ProcEffect::DamageOverTime { base, ap_coefficient } => {
                    let total = (base + ap_coefficient * ctx.attack_power)
                        * ctx.physical_multiplier
                        * ctx.dot_multiplier;
                    outcome.bleed = Some(total.max(0.0));
                }
                ProcEffect::InstantApDamage { base, ap_coefficient, weapon_multiplier } => {
                    let mut dmg = (base + ctx.attack_power * ap_coefficient * weapon_multiplier)
                        * ctx.armor_multiplier;
                    if roll_chance(rng, ctx.crit_chance) {
                        dmg *= CRIT_MULT;
                        outcome.crit = true;
                    }
                    outcome.damage += dmg.max(0.0) * ctx.physical_multiplier;
                }
                ProcEffect::InstantMagicDamage { base, ap_coefficient } => {
                    let mut dmg = base + ctx.attack_power * ap_coefficient;
                    if roll_chance(rng, ctx.crit_chance) {
                        dmg *= MAGIC_CRIT_MULT;
                    }
                    outcome.damage += dmg.max(0.0) * ctx.magic_multiplier;
                }
            }
        }
    }
    outcome
}
