//! Timed buff and effect trackers
//!
//! Every tracker follows the same protocol: call `update(now)` with a
//! non-decreasing time before reading or changing it. `update` credits uptime
//! for the slice of time since the previous update and expires stale state.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, VecDeque};

/// Stats a buff can modify
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stat {
    Strength,
    AttackPower,
    /// Crit chance as a fraction
    Crit,
    /// Additive to the haste multiplier
    Haste,
}

/// Sum of all active buff modifiers
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct StatTotals {
    pub strength: f64,
    pub attack_power: f64,
    pub crit: f64,
    pub haste: f64,
}

impl StatTotals {
    fn add(&mut self, stat: Stat, amount: f64) {
        match stat {
            Stat::Strength => self.strength += amount,
            Stat::AttackPower => self.attack_power += amount,
            Stat::Crit => self.crit += amount,
            Stat::Haste => self.haste += amount,
        }
    }
}

#[derive(Debug, Clone)]
struct Buff {
    name: &'static str,
    modifiers: &'static [(Stat, f64)],
    start: f64,
    duration: f64,
}

impl Buff {
    fn end(&self) -> f64 {
        self.start + self.duration
    }
}

/// Named stat buffs, one row per name.
#[derive(Debug, Clone, Default)]
pub struct BuffTracker {
    active: Vec<Buff>,
    uptime: BTreeMap<&'static str, f64>,
    last_update: f64,
}

impl BuffTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a buff, or refresh the existing row with the same name.
    /// With `refresh == false` an active buff is left untouched.
    pub fn add_buff(
        &mut self,
        name: &'static str,
        modifiers: &'static [(Stat, f64)],
        duration: f64,
        now: f64,
        refresh: bool,
    ) {
        self.update(now);

        if let Some(buff) = self.active.iter_mut().find(|b| b.name == name) {
            if refresh {
                buff.start = now;
                buff.duration = duration;
                buff.modifiers = modifiers;
            }
            return;
        }

        self.uptime.entry(name).or_insert(0.0);
        self.active.push(Buff { name, modifiers, start: now, duration });
    }

    /// Credit uptime up to `now`, drop expired buffs, return current totals.
    pub fn update(&mut self, now: f64) -> StatTotals {
        debug_assert!(now >= self.last_update, "buff tracker went back in time");
        let from = self.last_update;
        let now = now.max(from);

        for buff in &self.active {
            let overlap = now.min(buff.end()) - from.max(buff.start);
            if overlap > 0.0 {
                *self.uptime.entry(buff.name).or_insert(0.0) += overlap;
            }
        }

        self.active.retain(|b| now < b.end());
        self.last_update = now;
        self.totals()
    }

    /// Current totals without advancing time
    pub fn totals(&self) -> StatTotals {
        let mut totals = StatTotals::default();
        for buff in &self.active {
            for &(stat, amount) in buff.modifiers {
                totals.add(stat, amount);
            }
        }
        totals
    }

    pub fn is_active(&self, name: &str) -> bool {
        self.active.iter().any(|b| b.name == name)
    }

    /// Accumulated active seconds for `name`
    pub fn uptime(&self, name: &str) -> f64 {
        self.uptime.get(name).copied().unwrap_or(0.0)
    }

    /// Every buff seen this fight with its accumulated seconds
    pub fn uptimes(&self) -> impl Iterator<Item = (&'static str, f64)> + '_ {
        self.uptime.iter().map(|(&name, &secs)| (name, secs))
    }
}

/// Independently timed stacks with a cap (ambidextrous off-hand bonus).
#[derive(Debug, Clone)]
pub struct StackingBuff {
    duration: f64,
    max_stacks: usize,
    per_stack: f64,
    expirations: Vec<f64>,
    /// Seconds weighted by concurrent stack count
    pub stack_seconds: f64,
    last_update: f64,
}

impl StackingBuff {
    pub fn new(duration: f64, max_stacks: usize, per_stack: f64) -> Self {
        Self {
            duration,
            max_stacks,
            per_stack,
            expirations: Vec::with_capacity(max_stacks),
            stack_seconds: 0.0,
            last_update: 0.0,
        }
    }

    pub fn update(&mut self, now: f64) {
        let from = self.last_update;
        let now = now.max(from);
        for &end in &self.expirations {
            let overlap = now.min(end) - from;
            if overlap > 0.0 {
                self.stack_seconds += overlap;
            }
        }
        self.expirations.retain(|&end| end > now);
        self.last_update = now;
    }

    /// Add a stack if below the cap.
    pub fn trigger(&mut self, now: f64) {
        self.update(now);
        if self.expirations.len() < self.max_stacks {
            self.expirations.push(now + self.duration);
        }
    }

    pub fn stacks(&self) -> usize {
        self.expirations.len()
    }

    pub fn multiplier(&self) -> f64 {
        1.0 + self.stacks() as f64 * self.per_stack
    }
}

/// On/off effect with a duration and a re-trigger cooldown
/// (enrage, death wish, bloodlust, bloodfury).
#[derive(Debug, Clone)]
pub struct TimedEffect {
    duration: f64,
    cooldown: f64,
    active: bool,
    end_time: f64,
    next_available: f64,
    pub uptime: f64,
    last_update: f64,
}

impl TimedEffect {
    pub fn new(duration: f64, cooldown: f64) -> Self {
        Self {
            duration,
            cooldown,
            active: false,
            end_time: 0.0,
            next_available: 0.0,
            uptime: 0.0,
            last_update: 0.0,
        }
    }

    pub fn update(&mut self, now: f64) {
        let from = self.last_update;
        let now = now.max(from);
        if self.active {
            self.uptime += (now.min(self.end_time) - from).max(0.0);
            if now >= self.end_time {
                self.active = false;
            }
        }
        self.last_update = now;
    }

    pub fn is_ready(&self, now: f64) -> bool {
        now >= self.next_available
    }

    /// Start (or restart) the effect and its cooldown.
    pub fn trigger(&mut self, now: f64) {
        self.update(now);
        self.active = true;
        self.end_time = now + self.duration;
        self.next_available = now + self.cooldown;
    }

    /// Shorten the remaining cooldown, never below `now`.
    pub fn reduce_cooldown(&mut self, now: f64, seconds: f64) {
        self.next_available = now.max(self.next_available - seconds);
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    #[cfg(test)]
    pub fn next_available(&self) -> f64 {
        self.next_available
    }
}

/// Haste charges consumed by swings (flurry).
#[derive(Debug, Clone, Default)]
pub struct ChargeBuff {
    max_charges: u32,
    charges: u32,
    pub uptime: f64,
    last_update: f64,
}

impl ChargeBuff {
    pub fn new(max_charges: u32) -> Self {
        Self { max_charges, ..Default::default() }
    }

    pub fn update(&mut self, now: f64) {
        let now = now.max(self.last_update);
        if self.charges > 0 {
            self.uptime += now - self.last_update;
        }
        self.last_update = now;
    }

    pub fn refresh(&mut self) {
        self.charges = self.max_charges;
    }

    pub fn consume(&mut self) {
        self.charges = self.charges.saturating_sub(1);
    }

    pub fn is_active(&self) -> bool {
        self.charges > 0
    }

    #[cfg(test)]
    pub fn charges(&self) -> u32 {
        self.charges
    }
}

/// Damage over time with a fixed tick schedule (rend bleed, deep wounds).
///
/// A trigger while ticks are still pending extends the window but keeps the
/// pending schedule and its per-tick damage.
#[derive(Debug, Clone)]
pub struct DotTracker {
    ticks: usize,
    interval: f64,
    pending: VecDeque<f64>,
    damage_per_tick: f64,
    end_time: f64,
    active: bool,
    pub total_damage: f64,
    pub ticks_fired: u32,
    pub uptime: f64,
    last_update: f64,
}

impl DotTracker {
    pub fn new(ticks: usize, interval: f64) -> Self {
        Self {
            ticks: ticks.max(1),
            interval,
            pending: VecDeque::with_capacity(ticks),
            damage_per_tick: 0.0,
            end_time: 0.0,
            active: false,
            total_damage: 0.0,
            ticks_fired: 0,
            uptime: 0.0,
            last_update: 0.0,
        }
    }

    pub fn duration(&self) -> f64 {
        self.ticks as f64 * self.interval
    }

    /// Apply or refresh with `total_damage` spread over the full tick count.
    pub fn trigger(&mut self, now: f64, total_damage: f64) {
        self.update(now);
        self.end_time = now + self.duration();
        self.active = true;

        if self.pending.is_empty() {
            self.damage_per_tick = total_damage.max(0.0) / self.ticks as f64;
            self.pending
                .extend((1..=self.ticks).map(|i| now + i as f64 * self.interval));
        }
    }

    /// Fire every tick due by `now`. Returns the damage dealt by them.
    pub fn update(&mut self, now: f64) -> f64 {
        let from = self.last_update;
        let now = now.max(from);
        if self.active {
            self.uptime += (now.min(self.end_time) - from).max(0.0);
        }

        let mut dealt = 0.0;
        while let Some(&tick) = self.pending.front() {
            if tick > now {
                break;
            }
            self.pending.pop_front();
            dealt += self.damage_per_tick;
            self.ticks_fired += 1;
        }
        self.total_damage += dealt;

        self.active = !self.pending.is_empty() || now < self.end_time;
        self.last_update = now;
        dealt
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    #[cfg(test)]
    pub fn pending_ticks(&self) -> usize {
        self.pending.len()
    }
}
