//! Attack table resolution and armor mitigation
//!
//! Everything here is a pure function of its inputs and the RNG draws it
//! takes, so the same stream always produces the same outcome.

use crate::target::GLANCE_CHANCE;
use rand::Rng;

/// Armor constant for a level 63 target
pub const ARMOR_CONSTANT: f64 = 5882.5;
/// Armor can never mitigate more than this
pub const MAX_MITIGATION: f64 = 0.75;
/// Extra miss chance while dual wielding
pub const DUAL_WIELD_MISS_PENALTY: f64 = 0.19;
pub const GLANCE_DAMAGE: f64 = 0.75;
pub const CRIT_MULT: f64 = 2.0;
/// Crit multiplier of special attacks (slam, heroic strike, bloodthirst, whirlwind)
pub const SPECIAL_CRIT_MULT: f64 = 2.2;
/// Attack power per point of weapon DPS
pub const AP_PER_DPS: f64 = 14.0;
pub const SLAM_BONUS_MAIN_HAND: f64 = 87.0;
pub const SLAM_BONUS_OFF_HAND: f64 = 78.0;
/// Chance per slam strike to trigger enrage
pub const SLAM_ENRAGE_CHANCE: f64 = 0.5;
/// Slam miss chance before hit rating, independent of target level
pub const SPECIAL_BASE_MISS: f64 = 0.08;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Hand {
    MainHand,
    OffHand,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Miss,
    Glance,
    Crit,
    Hit,
}

/// Everything needed to roll one weapon strike.
#[derive(Debug, Clone, Copy)]
pub struct SwingParams {
    pub min_damage: f64,
    pub max_damage: f64,
    pub attack_power: f64,
    pub crit_chance: f64,
    pub hit_chance: f64,
    pub dual_wielding: bool,
    pub target_armor: f64,
    pub armor_penetration: f64,
    pub weapon_speed: f64,
    /// Miss chance before hit rating
    pub base_miss: f64,
}

/// Result of a white swing. `damage` is after armor, before damage multipliers.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SwingResult {
    pub damage: f64,
    pub outcome: Outcome,
}

impl SwingResult {
    pub fn is_crit(&self) -> bool {
        self.outcome == Outcome::Crit
    }

    pub fn is_miss(&self) -> bool {
        self.outcome == Outcome::Miss
    }
}

/// Result of a special attack with its independent enrage roll.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SpecialResult {
    pub damage: f64,
    pub outcome: Outcome,
    pub proc_triggered: bool,
}

impl SpecialResult {
    pub fn is_crit(&self) -> bool {
        self.outcome == Outcome::Crit
    }

    pub fn is_miss(&self) -> bool {
        self.outcome == Outcome::Miss
    }
}

/// Clamp a probability into [0, 1].
pub fn clamp_chance(p: f64) -> f64 {
    if p.is_nan() {
        0.0
    } else {
        p.clamp(0.0, 1.0)
    }
}

/// Bernoulli draw with a clamped probability
pub fn roll_chance(rng: &mut impl Rng, p: f64) -> bool {
    rng.gen::<f64>() < clamp_chance(p)
}

/// Fraction of physical damage removed by armor.
pub fn mitigation(armor: f64, armor_penetration: f64) -> f64 {
    let armor = armor.max(0.0);
    let reduction = (armor / (armor + ARMOR_CONSTANT)).min(MAX_MITIGATION);
    reduction * (1.0 - armor_penetration.clamp(0.0, 1.0))
}

/// Random integer damage in [min, max]
pub fn roll_weapon_damage(rng: &mut impl Rng, min: f64, max: f64) -> f64 {
    let lo = min as i64;
    let hi = (max as i64).max(lo);
    rng.gen_range(lo..=hi) as f64
}

/// Weapon roll plus attack power scaled by weapon speed
pub fn weapon_damage(rng: &mut impl Rng, min: f64, max: f64, attack_power: f64, speed: f64) -> f64 {
    roll_weapon_damage(rng, min, max) + attack_power / AP_PER_DPS * speed
}

/// Resolve a white swing against the one-roll attack table:
/// miss, then glance, then crit, then hit.
pub fn resolve_swing(params: &SwingParams, rng: &mut impl Rng) -> SwingResult {
    let roll = rng.gen::<f64>();

    let penalty = if params.dual_wielding { DUAL_WIELD_MISS_PENALTY } else { 0.0 };
    let miss = clamp_chance(params.base_miss + penalty - params.hit_chance);
    let glance = miss + GLANCE_CHANCE;
    let crit = glance + clamp_chance(params.crit_chance);

    let base = weapon_damage(
        rng,
        params.min_damage,
        params.max_damage,
        params.attack_power,
        params.weapon_speed,
    );
    let armor_mult = 1.0 - mitigation(params.target_armor, params.armor_penetration);

    let (damage, outcome) = if roll < miss {
        (0.0, Outcome::Miss)
    } else if roll < glance {
        (base * GLANCE_DAMAGE * armor_mult, Outcome::Glance)
    } else if roll < crit {
        (base * CRIT_MULT * armor_mult, Outcome::Crit)
    } else {
        (base * armor_mult, Outcome::Hit)
    };

    debug_assert!(damage >= 0.0, "negative swing damage {damage}");
    SwingResult { damage: damage.max(0.0), outcome }
}

/// Resolve a slam strike: flat bonus per hand, a fixed miss-only table (no
/// glancing), and a separate enrage roll that happens whether or not the
/// strike lands. `params.base_miss` is ignored.
pub fn resolve_special_attack(params: &SwingParams, hand: Hand, rng: &mut impl Rng) -> SpecialResult {
    let roll = rng.gen::<f64>();
    let miss = clamp_chance(SPECIAL_BASE_MISS - params.hit_chance);
    let crit = miss + clamp_chance(params.crit_chance);

    let bonus = match hand {
        Hand::MainHand => SLAM_BONUS_MAIN_HAND,
        Hand::OffHand => SLAM_BONUS_OFF_HAND,
    };
    let base = roll_weapon_damage(rng, params.min_damage, params.max_damage)
        + bonus
        + params.attack_power / AP_PER_DPS * params.weapon_speed;
    let armor_mult = 1.0 - mitigation(params.target_armor, params.armor_penetration);

    let proc_triggered = roll_chance(rng, SLAM_ENRAGE_CHANCE);

    let (damage, outcome) = if roll < miss {
        (0.0, Outcome::Miss)
    } else if roll < crit {
        (base * SPECIAL_CRIT_MULT * armor_mult, Outcome::Crit)
    } else {
        (base * armor_mult, Outcome::Hit)
    };

    debug_assert!(damage >= 0.0, "negative slam damage {damage}");
    SpecialResult {
        damage: damage.max(0.0),
        outcome,
        proc_triggered,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::SmallRng;
    use rand::SeedableRng;

    fn params() -> SwingParams {
        SwingParams {
            min_damage: 100.0,
            max_damage: 100.0,
            attack_power: 1400.0,
            crit_chance: 0.25,
            hit_chance: 0.08,
            dual_wielding: false,
            target_armor: 0.0,
            armor_penetration: 0.0,
            weapon_speed: 2.0,
            base_miss: 0.08,
        }
    }

    #[test]
    fn test_zero_armor_no_mitigation() {
        assert_eq!(mitigation(0.0, 0.0), 0.0);
        assert_eq!(mitigation(0.0, 0.5), 0.0);
    }

    #[test]
    fn test_mitigation_caps_at_75_percent() {
        assert!((mitigation(1e12, 0.0) - MAX_MITIGATION).abs() < 1e-9);
        assert!(mitigation(f64::MAX / 2.0, 0.0) <= MAX_MITIGATION);
        // Negative penetration cannot push past the cap
        assert!(mitigation(1e12, -5.0) <= MAX_MITIGATION);
        assert_eq!(mitigation(1e12, 3.0), 0.0);
    }

    #[test]
    fn test_mitigation_formula() {
        let expected = 4644.0 / (4644.0 + 5882.5) * (1.0 - 0.156);
        assert!((mitigation(4644.0, 0.156) - expected).abs() < 1e-12);
    }

    #[test]
    fn test_clamp_chance() {
        assert_eq!(clamp_chance(-0.3), 0.0);
        assert_eq!(clamp_chance(1.7), 1.0);
        assert_eq!(clamp_chance(f64::NAN), 0.0);
        assert_eq!(clamp_chance(0.4), 0.4);
    }

    #[test]
    fn test_weapon_roll_within_range() {
        let mut rng = SmallRng::seed_from_u64(7);
        for _ in 0..1000 {
            let d = roll_weapon_damage(&mut rng, 97.0, 157.0);
            assert!((97.0..=157.0).contains(&d));
            assert_eq!(d.fract(), 0.0);
        }
    }

    #[test]
    fn test_swing_outcomes_match_bands() {
        // No miss (hit capped), 25% glance, 25% crit, 50% hit
        let p = params();
        let normal = 100.0 + 1400.0 / 14.0 * 2.0;
        let mut rng = SmallRng::seed_from_u64(11);
        let mut counts = [0usize; 4];
        for _ in 0..20_000 {
            let r = resolve_swing(&p, &mut rng);
            match r.outcome {
                Outcome::Miss => counts[0] += 1,
                Outcome::Glance => {
                    assert!((r.damage - normal * 0.75).abs() < 1e-9);
                    counts[1] += 1
                }
                Outcome::Crit => {
                    assert!((r.damage - normal * 2.0).abs() < 1e-9);
                    counts[2] += 1
                }
                Outcome::Hit => {
                    assert!((r.damage - normal).abs() < 1e-9);
                    counts[3] += 1
                }
            }
        }
        assert_eq!(counts[0], 0);
        assert!((4500..5500).contains(&counts[1]));
        assert!((4500..5500).contains(&counts[2]));
        assert!((9300..10700).contains(&counts[3]));
    }

    #[test]
    fn test_dual_wield_adds_miss_band() {
        let p = SwingParams { dual_wielding: true, ..params() };
        let mut rng = SmallRng::seed_from_u64(3);
        let misses = (0..20_000)
            .filter(|_| resolve_swing(&p, &mut rng).is_miss())
            .count();
        // 0.08 + 0.19 - 0.08 = 19%
        assert!((3400..4200).contains(&misses), "misses = {misses}");
    }

    #[test]
    fn test_crit_chance_above_one_is_clamped() {
        let p = SwingParams { crit_chance: 5.0, ..params() };
        let mut rng = SmallRng::seed_from_u64(5);
        for _ in 0..1000 {
            let r = resolve_swing(&p, &mut rng);
            assert!(matches!(r.outcome, Outcome::Glance | Outcome::Crit));
        }
    }

    #[test]
    fn test_special_attack_never_glances() {
        let p = SwingParams { hit_chance: 0.0, ..params() };
        let mut rng = SmallRng::seed_from_u64(9);
        let mut misses = 0;
        let mut procs = 0;
        for _ in 0..10_000 {
            let r = resolve_special_attack(&p, Hand::OffHand, &mut rng);
            assert_ne!(r.outcome, Outcome::Glance);
            if r.is_miss() {
                assert_eq!(r.damage, 0.0);
                misses += 1;
            }
            if r.proc_triggered {
                procs += 1;
            }
        }
        assert!((600..1000).contains(&misses), "misses = {misses}");
        assert!((4700..5300).contains(&procs), "procs = {procs}");
    }

    #[test]
    fn test_special_attack_miss_ignores_target_level() {
        // A level 70 target raises the white miss to 15%, slam stays at 8%
        let p = SwingParams { base_miss: 0.15, ..params() };
        let mut rng = SmallRng::seed_from_u64(21);
        let misses = (0..20_000)
            .filter(|_| resolve_special_attack(&p, Hand::MainHand, &mut rng).is_miss())
            .count();
        assert_eq!(misses, 0);
    }

    #[test]
    fn test_special_attack_hand_bonus() {
        let p = SwingParams { crit_chance: 0.0, ..params() };
        let mut rng = SmallRng::seed_from_u64(1);
        let weapon = 100.0 + 1400.0 / 14.0 * 2.0;
        let mh = resolve_special_attack(&p, Hand::MainHand, &mut rng);
        let oh = resolve_special_attack(&p, Hand::OffHand, &mut rng);
        assert!((mh.damage - (weapon + 87.0)).abs() < 1e-9);
        assert!((oh.damage - (weapon + 78.0)).abs() < 1e-9);
    }
}
