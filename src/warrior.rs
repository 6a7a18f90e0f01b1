//! Warrior stats derived from the character sheet, and the per-event
//! recomputation of attack power, crit, haste and damage multipliers

use crate::buffs::StatTotals;
use crate::config::{FightConfig, Weapon};
use crate::damage::{mitigation, Hand, AP_PER_DPS};
use crate::procs::ProcId;
use crate::target::Target;

// Literal tuning constants carried over from the spreadsheet this model
// was fitted to. Values are kept as-is.
/// PvE damage bonus
pub const PVE_POWER: f64 = 1.2475;
/// Single-minded fury
pub const SINGLE_MINDED_FURY: f64 = 1.05;
/// Improved dual wield bonus on the off-hand
pub const IMPROVED_DUAL_WIELD: f64 = 1.25;
pub const OFF_HAND_PENALTY: f64 = 0.5;
pub const ENRAGE_MULT: f64 = 1.1;
pub const OUTRAGE_MULT: f64 = 1.05;
pub const DEATH_WISH_MULT: f64 = 1.2;
/// Unbending fury bonus on slam, bloodthirst and whirlwind
pub const UNBENDING_FURY: f64 = 1.1;
/// Trauma bonus on deep wounds and rend
pub const TRAUMA_MULT: f64 = 1.3;
pub const FLURRY_HASTE: f64 = 1.25;
pub const FLURRY_CHARGES: u32 = 3;
pub const BLOODLUST_HASTE: f64 = 0.3;
pub const BLOODFURY_AP: f64 = 242.0;
/// Strength and agility from strength of earth, before its 1.2 strength bonus
pub const STRENGTH_OF_EARTH: f64 = 88.0;
pub const STRENGTH_OF_EARTH_STR_MULT: f64 = 1.2;
pub const KINGS_MULT: f64 = 1.1;
pub const SHAMANISTIC_RAGE_MULT: f64 = 1.1;
/// Strength from sources missing on the sheet is scaled by this
pub const EXTRA_STRENGTH_MULT: f64 = 1.2;
pub const AP_PER_STRENGTH: f64 = 2.0;
/// Agility per 1% crit
pub const AGILITY_PER_CRIT: f64 = 20.0;
/// Sheet crit that does not apply to a boss
pub const SHEET_CRIT_OFFSET: f64 = 0.048;
pub const BATTERING_RAM_ARMOR_PEN: f64 = 0.025;
pub const DEEP_WOUNDS_PERCENT: f64 = 0.48;

/// Batch-wide warrior stats. Built once from the config and shared.
#[derive(Debug, Clone)]
pub struct Warrior {
    /// Attack power without any strength
    pub base_attack_power: f64,
    pub strength: f64,
    pub agility: f64,
    /// Crit chance without agility
    pub base_crit: f64,
    pub hit: f64,
    pub armor_penetration: f64,
    pub haste: f64,
    pub windfury: f64,
    pub main_hand: Weapon,
    pub off_hand: Weapon,
    pub dual_wield: bool,
    pub target: Target,
    /// 1 - armor mitigation
    pub armor_multiplier: f64,
    pub main_hand_procs: Vec<ProcId>,
    pub off_hand_procs: Vec<ProcId>,

    kings: bool,
    strength_of_earth: bool,
    shamanistic_rage: bool,
    outrage: bool,
    trauma: bool,
    base_multiplier: f64,
}

/// Stats recomputed at the start of every event
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Snapshot {
    pub attack_power: f64,
    pub crit_chance: f64,
    pub haste: f64,
    /// Main-hand outgoing damage multiplier
    pub multiplier: f64,
    /// Off-hand outgoing damage multiplier
    pub off_hand_multiplier: f64,
}

/// Active effects feeding a snapshot
#[derive(Debug, Clone, Copy, Default)]
pub struct ActiveEffects {
    pub buffs: StatTotals,
    pub flurry: bool,
    pub bloodlust: bool,
    pub enrage: bool,
    pub death_wish: bool,
    /// Ambidextrous off-hand multiplier
    pub off_hand_bonus: f64,
}

fn dedup_procs(ids: &[ProcId], extra: &[(bool, ProcId)]) -> Vec<ProcId> {
    let mut out: Vec<ProcId> = Vec::with_capacity(ids.len() + extra.len());
    let wanted = ids
        .iter()
        .copied()
        .chain(extra.iter().filter(|(on, _)| *on).map(|&(_, id)| id));
    for id in wanted {
        if !out.contains(&id) {
            out.push(id);
        }
    }
    out
}

impl Warrior {
    pub fn from_config(c: &FightConfig) -> Self {
        let sheet = &c.character;

        let strength = sheet.strength + sheet.extra_strength * EXTRA_STRENGTH_MULT;
        let agility = sheet.agility + sheet.extra_agility;

        // Sheet attack power already holds 2 AP per point of sheet strength
        let base_attack_power =
            sheet.attack_power - sheet.strength * AP_PER_STRENGTH + sheet.extra_attack_power;

        // Sheet crit already holds the sheet agility; it is added back per event
        let base_crit = sheet.crit / 100.0 - SHEET_CRIT_OFFSET + sheet.extra_crit / 100.0
            - sheet.agility / AGILITY_PER_CRIT / 100.0;

        let mut armor_penetration = sheet.armor_penetration / 5.0 / 100.0;
        if c.talents.battering_ram {
            armor_penetration += BATTERING_RAM_ARMOR_PEN;
        }

        let target = Target::from_config(&c.target);
        let armor_multiplier = 1.0 - mitigation(target.armor, armor_penetration);

        let trinkets = [
            (c.consumables.icon, ProcId::Icon),
            (c.consumables.hand_of_justice, ProcId::HandOfJustice),
        ];
        let main_hand_procs = dedup_procs(&c.main_hand_procs, &trinkets);
        let off_hand_procs = if c.talents.dual_wield {
            dedup_procs(&c.off_hand_procs, &trinkets)
        } else {
            Vec::new()
        };

        Self {
            base_attack_power,
            strength,
            agility,
            base_crit,
            hit: sheet.hit / 100.0,
            armor_penetration,
            haste: 1.0 + sheet.haste / 1000.0,
            windfury: 1.0 + sheet.windfury / 1000.0,
            main_hand: sheet.main_hand,
            off_hand: sheet.off_hand,
            dual_wield: c.talents.dual_wield,
            target,
            armor_multiplier,
            main_hand_procs,
            off_hand_procs,
            kings: c.consumables.kings,
            strength_of_earth: c.consumables.strength_of_earth,
            shamanistic_rage: c.consumables.shamanistic_rage,
            outrage: c.talents.outrage,
            trauma: c.talents.trauma,
            base_multiplier: c.base_multiplier,
        }
    }

    pub fn weapon(&self, hand: Hand) -> &Weapon {
        match hand {
            Hand::MainHand => &self.main_hand,
            Hand::OffHand => &self.off_hand,
        }
    }

    pub fn procs(&self, hand: Hand) -> &[ProcId] {
        match hand {
            Hand::MainHand => &self.main_hand_procs,
            Hand::OffHand => &self.off_hand_procs,
        }
    }

    fn raid_buff_mult(&self) -> f64 {
        if self.kings {
            KINGS_MULT
        } else {
            1.0
        }
    }

    /// Total attack power with buffs
    pub fn attack_power(&self, buffs: &StatTotals) -> f64 {
        let mut strength = self.strength + buffs.strength;
        if self.strength_of_earth {
            strength += STRENGTH_OF_EARTH * STRENGTH_OF_EARTH_STR_MULT;
        }
        strength *= self.raid_buff_mult();

        let mut ap = self.base_attack_power + strength * AP_PER_STRENGTH + buffs.attack_power;
        if self.shamanistic_rage {
            ap *= SHAMANISTIC_RAGE_MULT;
        }
        ap.max(0.0)
    }

    /// Crit chance with buffs and agility
    pub fn crit_chance(&self, buffs: &StatTotals) -> f64 {
        let mut agility = self.agility;
        if self.strength_of_earth {
            agility += STRENGTH_OF_EARTH;
            // Kings only scales agility together with strength of earth
            agility *= self.raid_buff_mult();
        }
        self.base_crit + buffs.crit + agility / AGILITY_PER_CRIT / 100.0
    }

    /// Swing speed divisor
    pub fn haste(&self, buffs: &StatTotals, flurry: bool, bloodlust: bool) -> f64 {
        let mut haste = (self.haste + buffs.haste) * self.windfury;
        if flurry {
            haste *= FLURRY_HASTE;
        }
        if bloodlust {
            haste *= 1.0 + BLOODLUST_HASTE;
        }
        haste.max(f64::EPSILON)
    }

    /// Outgoing damage multiplier for main-hand and ability damage
    pub fn damage_multiplier(&self, enrage: bool, death_wish: bool) -> f64 {
        let mut multi = self.base_multiplier;
        if enrage {
            multi *= ENRAGE_MULT;
            if self.outrage {
                multi *= OUTRAGE_MULT;
            }
        }
        if death_wish {
            multi *= DEATH_WISH_MULT;
        }
        multi * PVE_POWER * SINGLE_MINDED_FURY
    }

    /// Off-hand multiplier from the main-hand one
    pub fn off_hand_multiplier(&self, multiplier: f64, off_hand_bonus: f64) -> f64 {
        multiplier * OFF_HAND_PENALTY * IMPROVED_DUAL_WIELD * off_hand_bonus
    }

    /// Multiplier on spell damage: flat bonuses only
    pub fn magic_multiplier(&self) -> f64 {
        self.base_multiplier * PVE_POWER
    }

    /// Extra multiplier on deep wounds and bleeds
    pub fn dot_multiplier(&self) -> f64 {
        if self.trauma {
            TRAUMA_MULT
        } else {
            1.0
        }
    }

    pub fn snapshot(&self, effects: &ActiveEffects) -> Snapshot {
        let multiplier = self.damage_multiplier(effects.enrage, effects.death_wish);
        Snapshot {
            attack_power: self.attack_power(&effects.buffs),
            crit_chance: self.crit_chance(&effects.buffs),
            haste: self.haste(&effects.buffs, effects.flurry, effects.bloodlust),
            multiplier,
            off_hand_multiplier: self.off_hand_multiplier(multiplier, effects.off_hand_bonus),
        }
    }

    /// Average unmitigated weapon hit without the PvE bonus, the base for deep wounds
    pub fn average_hit(&self, hand: Hand, snapshot: &Snapshot) -> f64 {
        let weapon = self.weapon(hand);
        let multi = match hand {
            Hand::MainHand => snapshot.multiplier,
            Hand::OffHand => snapshot.off_hand_multiplier,
        };
        let avg = (weapon.min_damage + weapon.max_damage) / 2.0
            + snapshot.attack_power / AP_PER_DPS * weapon.speed;
        avg * multi / PVE_POWER * self.dot_multiplier()
    }
}
