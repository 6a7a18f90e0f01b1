//! Rage: generated by melee damage dealt, spent by abilities

use crate::damage::Hand;

pub const MAX_RAGE: f64 = 100.0;
/// Rage conversion constant for a level 60 character
pub const RAGE_CONVERSION: f64 = 230.6;

/// Hit factor `f` of the rage formula
fn hit_factor(hand: Hand, is_crit: bool) -> f64 {
    match (hand, is_crit) {
        (Hand::MainHand, false) => 7.0,
        (Hand::MainHand, true) => 14.0,
        (Hand::OffHand, false) => 2.0,
        (Hand::OffHand, true) => 4.0,
    }
}

/// Rage generated by a melee swing dealing `damage`.
pub fn rage_from_damage(damage: f64, weapon_speed: f64, hand: Hand, is_crit: bool) -> f64 {
    if damage <= 0.0 {
        return 0.0;
    }
    let c = RAGE_CONVERSION;
    let rage = 15.0 * damage / (4.0 * c) + hit_factor(hand, is_crit) * weapon_speed / 2.0;
    let cap = 15.0 * damage / c;
    rage.min(cap)
}

/// Bounded rage pool with a queued heroic strike.
#[derive(Debug, Clone, Default)]
pub struct Rage {
    current: f64,
    heroic_strike_cost: f64,
    heroic_strike_queued: bool,
    pub generated: f64,
    pub spent: f64,
    pub overcapped: f64,
}

impl Rage {
    pub fn new(starting: f64, heroic_strike_cost: f64) -> Self {
        Self {
            current: starting.clamp(0.0, MAX_RAGE),
            heroic_strike_cost,
            ..Default::default()
        }
    }

    pub fn current(&self) -> f64 {
        self.current
    }

    /// Add rage, clamping at the cap. Overflow is tracked as waste.
    pub fn gain(&mut self, amount: f64) {
        if !(amount > 0.0) {
            return;
        }
        let before = self.current;
        self.current = (self.current + amount).min(MAX_RAGE);
        self.generated += amount;
        self.overcapped += amount - (self.current - before);
    }

    pub fn can_afford(&self, cost: f64) -> bool {
        self.current >= cost
    }

    /// Deduct `cost` if affordable. Returns whether it was spent.
    pub fn spend(&mut self, cost: f64) -> bool {
        if !self.can_afford(cost) {
            return false;
        }
        self.current -= cost;
        debug_assert!(self.current >= 0.0, "rage went negative: {}", self.current);
        self.current = self.current.max(0.0);
        self.spent += cost;
        if self.current < self.heroic_strike_cost {
            self.heroic_strike_queued = false;
        }
        true
    }

    /// Queue heroic strike on the next main-hand swing if rage allows it.
    pub fn queue_heroic_strike(&mut self) {
        if self.can_afford(self.heroic_strike_cost) {
            self.heroic_strike_queued = true;
        }
    }

    pub fn heroic_strike_queued(&self) -> bool {
        self.heroic_strike_queued
    }

    /// Consume the queued heroic strike. Returns whether it fires.
    pub fn take_heroic_strike(&mut self) -> bool {
        if !self.heroic_strike_queued {
            return false;
        }
        self.heroic_strike_queued = false;
        self.spend(self.heroic_strike_cost)
    }
}
