//! Core simulation engine

use crate::buffs::{BuffTracker, ChargeBuff, DotTracker, Stat, StackingBuff, TimedEffect};
use crate::config::FightConfig;
use crate::damage::{
    resolve_special_attack, resolve_swing, roll_chance, roll_weapon_damage, Hand, SwingParams,
    AP_PER_DPS, CRIT_MULT, DUAL_WIELD_MISS_PENALTY, SPECIAL_CRIT_MULT,
};
use crate::error::{Result, SimError};
use crate::policy::{self, Ability, CooldownGate, Readiness};
use crate::procs::{apply_procs, resolve_proc_damage, resolve_procs, ProcContext, ProcCooldowns, ProcId};
use crate::rage::{rage_from_damage, Rage, MAX_RAGE};
use crate::scheduler::{EventKind, EventQueue};
use crate::stats::{AggregateResult, AttackKind, AttackTable, DamageBreakdown, FightMetrics, RageSummary, WorkerOutput};
use crate::warrior::{
    ActiveEffects, Snapshot, Warrior, BLOODFURY_AP, DEEP_WOUNDS_PERCENT, FLURRY_CHARGES, UNBENDING_FURY,
};
use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};
use rayon::prelude::*;
use rayon::ThreadPoolBuilder;
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::{debug, info, warn};

const FIRST_GCD: f64 = 0.1;

const HEROIC_STRIKE_BONUS: f64 = 201.0;
const HEROIC_STRIKE_CRIT_BONUS: f64 = 0.15;
const HEROIC_STRIKE_CRIT_RAGE: f64 = 10.0;
/// Chance for heroic strike, bloodthirst and each whirlwind hit to grant an instant slam
const INSTANT_SLAM_CHANCE: f64 = 0.2;
const SLAM_CAST_TIME: f64 = 1.5;
const SKULL_CRACKER_REDUCTION: f64 = 2.0;
const BLOODTHIRST_AP_COEFFICIENT: f64 = 0.5;
/// Normalized weapon speed of whirlwind
const WHIRLWIND_SPEED: f64 = 2.4;

const AMBIDEXTROUS_STRIKE_MULT: f64 = 0.75;
const AMBIDEXTROUS_DURATION: f64 = 8.0;
const AMBIDEXTROUS_MAX_STACKS: usize = 3;
const AMBIDEXTROUS_PER_STACK: f64 = 0.05;

const ENRAGE_DURATION: f64 = 5.0;
const DEATH_WISH_DURATION: f64 = 30.0;
const BLOODLUST_DURATION: f64 = 40.0;
const BLOODLUST_COOLDOWN: f64 = 600.0;
const BLOODFURY_DURATION: f64 = 15.0;
const BLOODFURY_COOLDOWN: f64 = 120.0;
const BLOODFURY_BUFF: &[(Stat, f64)] = &[(Stat::AttackPower, BLOODFURY_AP)];

const DEEP_WOUNDS_TICKS: usize = 6;
const DEEP_WOUNDS_INTERVAL: f64 = 1.0;
const REND_TICKS: usize = 10;
const REND_INTERVAL: f64 = 3.0;

const TANK_DUMMY_START: f64 = 0.05;
const TANK_DUMMY_INTERVAL: f64 = 1.5;
const TANK_DUMMY_RAGE: f64 = 60.0;

/// Mutable state of one fight
struct Fight<'a> {
    config: &'a FightConfig,
    warrior: &'a Warrior,
    rng: SmallRng,
    queue: EventQueue,
    now: f64,
    rage: Rage,
    stats: Snapshot,

    buffs: BuffTracker,
    ambidextrous: StackingBuff,
    enrage: TimedEffect,
    death_wish: TimedEffect,
    bloodlust: TimedEffect,
    bloodfury: TimedEffect,
    flurry: ChargeBuff,
    deep_wounds: DotTracker,
    rend: DotTracker,

    proc_cooldowns: ProcCooldowns,
    bloodthirst_cd: CooldownGate,
    whirlwind_cd: CooldownGate,
    instant_slam: bool,
    swing_lockout_until: f64,

    damage: DamageBreakdown,
    attacks: AttackTable,
    casts: u32,
}

impl<'a> Fight<'a> {
    fn new(config: &'a FightConfig, warrior: &'a Warrior, seed: u64) -> Self {
        Self {
            config,
            warrior,
            rng: SmallRng::seed_from_u64(seed),
            queue: EventQueue::new(config.fight_duration),
            now: 0.0,
            rage: Rage::new(config.starting_rage, config.costs.heroic_strike),
            stats: Snapshot::default(),
            buffs: BuffTracker::new(),
            ambidextrous: StackingBuff::new(
                AMBIDEXTROUS_DURATION,
                AMBIDEXTROUS_MAX_STACKS,
                AMBIDEXTROUS_PER_STACK,
            ),
            enrage: TimedEffect::new(ENRAGE_DURATION, 0.0),
            death_wish: TimedEffect::new(DEATH_WISH_DURATION, config.cooldowns.death_wish),
            bloodlust: TimedEffect::new(BLOODLUST_DURATION, BLOODLUST_COOLDOWN),
            bloodfury: TimedEffect::new(BLOODFURY_DURATION, BLOODFURY_COOLDOWN),
            flurry: ChargeBuff::new(FLURRY_CHARGES),
            deep_wounds: DotTracker::new(DEEP_WOUNDS_TICKS, DEEP_WOUNDS_INTERVAL),
            rend: DotTracker::new(REND_TICKS, REND_INTERVAL),
            proc_cooldowns: ProcCooldowns::default(),
            bloodthirst_cd: CooldownGate::default(),
            whirlwind_cd: CooldownGate::default(),
            instant_slam: false,
            swing_lockout_until: 0.0,
            damage: DamageBreakdown::default(),
            attacks: AttackTable::default(),
            casts: 0,
        }
    }

    fn run(mut self) -> FightMetrics {
        self.queue.schedule(0.0, EventKind::MainHandSwing);
        self.queue.schedule(FIRST_GCD, EventKind::GlobalCooldown);
        if self.config.consumables.tank_dummy {
            self.queue.schedule(TANK_DUMMY_START, EventKind::RageTick);
        }
        if self.warrior.dual_wield {
            self.queue
                .schedule(self.config.off_hand_offset.max(0.0), EventKind::OffHandSwing);
        }

        while let Some(event) = self.queue.pop_next() {
            self.now = event.time;
            self.advance(event.time);
            self.activate_cooldowns();
            self.refresh_stats();

            if !matches!(event.kind, EventKind::ExtraSwing { .. }) {
                self.rage.queue_heroic_strike();
            }

            match event.kind {
                EventKind::MainHandSwing => self.main_hand_swing(),
                EventKind::OffHandSwing => self.off_hand_swing(),
                EventKind::ExtraSwing { source } => {
                    self.flurry.consume();
                    self.white_swing(Hand::MainHand, Some(source));
                }
                EventKind::GlobalCooldown => self.global_cooldown(),
                EventKind::RageTick => {
                    self.rage.gain(TANK_DUMMY_RAGE);
                    self.queue
                        .schedule(self.now + TANK_DUMMY_INTERVAL, EventKind::RageTick);
                }
            }

            debug_assert!(
                (0.0..=MAX_RAGE).contains(&self.rage.current()),
                "rage out of bounds: {}",
                self.rage.current()
            );
        }

        // Credit partially elapsed effects up to the end of the fight
        self.advance(self.config.fight_duration);
        self.finish()
    }

    /// Move every tracker to `t` and collect DoT ticks due by then.
    fn advance(&mut self, t: f64) {
        self.buffs.update(t);
        self.flurry.update(t);
        self.enrage.update(t);
        self.ambidextrous.update(t);
        self.death_wish.update(t);
        self.bloodlust.update(t);
        self.bloodfury.update(t);
        self.damage.deep_wounds += self.deep_wounds.update(t);
        self.damage.rend += self.rend.update(t);
    }

    fn activate_cooldowns(&mut self) {
        let now = self.now;
        let config = self.config;
        let consumables = &config.consumables;
        if now >= consumables.bloodlust_at && self.bloodlust.is_ready(now) {
            self.bloodlust.trigger(now);
        }
        if now >= consumables.bloodfury_at
            && !self.bloodfury.is_active()
            && self.bloodfury.is_ready(now)
        {
            self.bloodfury.trigger(now);
            self.buffs
                .add_buff("Bloodfury", BLOODFURY_BUFF, BLOODFURY_DURATION, now, true);
        }
    }

    fn refresh_stats(&mut self) {
        let effects = ActiveEffects {
            buffs: self.buffs.totals(),
            flurry: self.flurry.is_active(),
            bloodlust: self.bloodlust.is_active(),
            enrage: self.enrage.is_active(),
            death_wish: self.death_wish.is_active(),
            off_hand_bonus: self.ambidextrous.multiplier(),
        };
        self.stats = self.warrior.snapshot(&effects);
    }

    fn multiplier(&self, hand: Hand) -> f64 {
        match hand {
            Hand::MainHand => self.stats.multiplier,
            Hand::OffHand => self.stats.off_hand_multiplier,
        }
    }

    fn swing_params(&self, hand: Hand) -> SwingParams {
        let w = self.warrior;
        let weapon = w.weapon(hand);
        SwingParams {
            min_damage: weapon.min_damage,
            max_damage: weapon.max_damage,
            attack_power: self.stats.attack_power,
            crit_chance: self.stats.crit_chance,
            hit_chance: w.hit,
            dual_wielding: w.dual_wield,
            target_armor: w.target.armor,
            armor_penetration: w.armor_penetration,
            weapon_speed: weapon.speed,
            base_miss: w.target.base_miss(),
        }
    }

    // Auto attacks

    fn main_hand_swing(&mut self) {
        if self.now < self.swing_lockout_until {
            self.queue
                .schedule(self.swing_lockout_until, EventKind::MainHandSwing);
            return;
        }
        self.flurry.consume();
        let next = self.now + self.warrior.main_hand.speed / self.stats.haste;

        if self.rage.take_heroic_strike() {
            self.heroic_strike();
        } else {
            self.white_swing(Hand::MainHand, None);
        }
        self.queue.schedule(next, EventKind::MainHandSwing);
    }

    fn off_hand_swing(&mut self) {
        if self.now < self.swing_lockout_until {
            self.queue
                .schedule(self.swing_lockout_until, EventKind::OffHandSwing);
            return;
        }
        self.flurry.consume();
        let next = self.now + self.warrior.off_hand.speed / self.stats.haste;
        self.white_swing(Hand::OffHand, None);
        self.queue.schedule(next, EventKind::OffHandSwing);
    }

    /// White swing. Procs from `exclude` are not rolled on it.
    fn white_swing(&mut self, hand: Hand, exclude: Option<ProcId>) {
        let mut params = self.swing_params(hand);
        // A queued heroic strike removes the dual wield penalty
        if params.dual_wielding && self.rage.heroic_strike_queued() {
            params.hit_chance += DUAL_WIELD_MISS_PENALTY;
        }
        let result = resolve_swing(&params, &mut self.rng);
        let damage = result.damage * self.multiplier(hand);

        match hand {
            Hand::MainHand => {
                self.damage.white_main_hand += damage;
                self.attacks
                    .record(AttackKind::MainHand, result.is_crit(), result.is_miss());
            }
            Hand::OffHand => {
                self.damage.white_off_hand += damage;
                self.attacks
                    .record(AttackKind::OffHand, result.is_crit(), result.is_miss());
            }
        }

        if !result.is_miss() {
            self.on_hit(hand, exclude);
        }
        self.rage
            .gain(rage_from_damage(damage, params.weapon_speed, hand, result.is_crit()));
        if result.is_crit() {
            self.on_crit(hand);
        }
    }

    fn heroic_strike(&mut self) {
        let weapon = self.warrior.main_hand;
        self.on_hit(Hand::MainHand, None);

        let base = roll_weapon_damage(&mut self.rng, weapon.min_damage, weapon.max_damage)
            + HEROIC_STRIKE_BONUS
            + self.stats.attack_power / AP_PER_DPS * weapon.speed;
        let mut damage = base * self.warrior.armor_multiplier;
        let crit = roll_chance(&mut self.rng, self.stats.crit_chance + HEROIC_STRIKE_CRIT_BONUS);
        if crit {
            damage *= SPECIAL_CRIT_MULT;
            self.rage.gain(HEROIC_STRIKE_CRIT_RAGE);
            self.on_crit(Hand::MainHand);
        }
        self.damage.heroic_strike += damage * self.stats.multiplier;
        self.attacks.record(AttackKind::HeroicStrike, crit, false);
        self.roll_instant_slam();

        if self.warrior.dual_wield && self.config.talents.ambidextrous_strike {
            self.ambidextrous_strike();
        }
    }

    /// Off-hand follow-up of heroic strike; adds an ambidextrous stack.
    fn ambidextrous_strike(&mut self) {
        let weapon = self.warrior.off_hand;
        let base = roll_weapon_damage(&mut self.rng, weapon.min_damage, weapon.max_damage)
            + self.stats.attack_power / AP_PER_DPS * weapon.speed;
        let mut damage = base
            * self.stats.off_hand_multiplier
            * AMBIDEXTROUS_STRIKE_MULT
            * self.warrior.armor_multiplier;
        let crit = roll_chance(&mut self.rng, self.stats.crit_chance);
        if crit {
            damage *= CRIT_MULT;
            self.on_crit(Hand::OffHand);
        }
        self.damage.ambidextrous += damage;
        self.attacks.record(AttackKind::Ambidextrous, crit, false);
        self.ambidextrous.trigger(self.now);
    }

    // Hit side effects

    /// Roll the hand's procs and apply whatever they trigger.
    fn on_hit(&mut self, hand: Hand, exclude: Option<ProcId>) {
        let warrior = self.warrior;
        let speed = warrior.weapon(hand).speed;
        let procs = warrior.procs(hand);
        let triggered = match exclude {
            Some(source) => {
                let rest: Vec<ProcId> = procs.iter().copied().filter(|&id| id != source).collect();
                resolve_procs(self.now, speed, &rest, &mut self.proc_cooldowns, &mut self.rng)
            }
            None => resolve_procs(self.now, speed, procs, &mut self.proc_cooldowns, &mut self.rng),
        };
        if triggered.is_empty() {
            return;
        }

        apply_procs(&triggered, self.now, &mut self.buffs);
        let ctx = ProcContext {
            attack_power: self.stats.attack_power,
            crit_chance: self.stats.crit_chance,
            armor_multiplier: warrior.armor_multiplier,
            physical_multiplier: self.stats.multiplier,
            magic_multiplier: warrior.magic_multiplier(),
            dot_multiplier: warrior.dot_multiplier(),
        };
        let outcome = resolve_proc_damage(&triggered, &ctx, &mut self.rng);

        self.damage.procs += outcome.damage;
        for source in outcome.bonus_swings {
            self.queue.schedule(self.now, EventKind::ExtraSwing { source });
        }
        if let Some(total) = outcome.bleed {
            self.rend.trigger(self.now, total);
        }
        if outcome.crit {
            self.apply_deep_wounds(Hand::MainHand);
        }
    }

    fn on_crit(&mut self, hand: Hand) {
        self.flurry.refresh();
        self.apply_deep_wounds(hand);
    }

    fn apply_deep_wounds(&mut self, hand: Hand) {
        let total = self.warrior.average_hit(hand, &self.stats) * DEEP_WOUNDS_PERCENT;
        self.deep_wounds.trigger(self.now, total);
    }

    fn roll_instant_slam(&mut self) {
        if roll_chance(&mut self.rng, INSTANT_SLAM_CHANCE) {
            self.instant_slam = true;
        }
    }

    // Global cooldown abilities

    fn global_cooldown(&mut self) {
        let config = self.config;
        let now = self.now;
        let gates = Readiness {
            rage: self.rage.current(),
            death_wish: self.death_wish.is_ready(now),
            instant_slam: self.instant_slam,
            bloodthirst: self.bloodthirst_cd.is_ready(now),
            whirlwind: self.whirlwind_cd.is_ready(now),
        };
        let choice = policy::choose(&config.priority, &config.costs, &gates);

        if let Some(ability) = choice {
            let spent = self.rage.spend(ability.cost(&config.costs));
            debug_assert!(spent, "policy picked an unaffordable {ability:?}");
            match ability {
                Ability::DeathWish => self.death_wish.trigger(now),
                Ability::InstantSlam => {
                    self.instant_slam = false;
                    self.slam(false);
                }
                Ability::Bloodthirst => self.bloodthirst(),
                Ability::Whirlwind => self.whirlwind(),
                Ability::Slam => self.slam(true),
            }
            self.casts += 1;
        }

        self.queue
            .schedule(policy::next_gcd(now, choice.is_some()), EventKind::GlobalCooldown);
    }

    fn slam(&mut self, hard_cast: bool) {
        if hard_cast {
            self.swing_lockout_until = self.now + SLAM_CAST_TIME;
        }
        self.slam_strike(Hand::MainHand);
        if self.warrior.dual_wield {
            self.slam_strike(Hand::OffHand);
        }
    }

    fn slam_strike(&mut self, hand: Hand) {
        let config = self.config;
        let talents = &config.talents;
        let params = self.swing_params(hand);
        let result = resolve_special_attack(&params, hand, &mut self.rng);
        let damage = result.damage * self.multiplier(hand) * UNBENDING_FURY;

        match hand {
            Hand::MainHand => {
                self.damage.slam_main_hand += damage;
                self.attacks
                    .record(AttackKind::SlamMainHand, result.is_crit(), result.is_miss());
            }
            Hand::OffHand => {
                self.damage.slam_off_hand += damage;
                self.attacks
                    .record(AttackKind::SlamOffHand, result.is_crit(), result.is_miss());
            }
        }

        if !result.is_miss() {
            self.on_hit(hand, None);
            if talents.battering_ram {
                self.on_hit(Hand::MainHand, None);
            }
            if talents.skull_cracker {
                self.death_wish
                    .reduce_cooldown(self.now, SKULL_CRACKER_REDUCTION);
            }
        }
        if result.is_crit() {
            self.on_crit(hand);
        }
        if result.proc_triggered {
            self.enrage.trigger(self.now);
            self.instant_slam = true;
        }
    }

    fn bloodthirst(&mut self) {
        let mut damage = self.stats.attack_power
            * BLOODTHIRST_AP_COEFFICIENT
            * self.warrior.armor_multiplier
            * self.stats.multiplier
            * UNBENDING_FURY;
        let crit = roll_chance(&mut self.rng, self.stats.crit_chance);
        if crit {
            damage *= SPECIAL_CRIT_MULT;
            self.on_crit(Hand::MainHand);
        }
        self.damage.bloodthirst += damage;
        self.attacks.record(AttackKind::Bloodthirst, crit, false);

        self.on_hit(Hand::MainHand, None);
        self.roll_instant_slam();
        self.bloodthirst_cd
            .start(self.now, self.config.cooldowns.bloodthirst);
    }

    fn whirlwind(&mut self) {
        self.whirlwind_strike(Hand::MainHand);
        if self.warrior.dual_wield {
            self.whirlwind_strike(Hand::OffHand);
        }
        self.whirlwind_cd
            .start(self.now, self.config.cooldowns.whirlwind);
    }

    fn whirlwind_strike(&mut self, hand: Hand) {
        let weapon = *self.warrior.weapon(hand);
        let base = roll_weapon_damage(&mut self.rng, weapon.min_damage, weapon.max_damage)
            + self.stats.attack_power / AP_PER_DPS * WHIRLWIND_SPEED;
        let mut damage =
            base * UNBENDING_FURY * self.warrior.armor_multiplier * self.multiplier(hand);
        let crit = roll_chance(&mut self.rng, self.stats.crit_chance);
        if crit {
            damage *= SPECIAL_CRIT_MULT;
            self.on_crit(hand);
        }
        self.damage.whirlwind += damage;
        self.attacks.record(AttackKind::Whirlwind, crit, false);

        self.on_hit(hand, None);
        self.roll_instant_slam();
    }

    fn finish(self) -> FightMetrics {
        let duration = self.config.fight_duration;
        let fraction = |secs: f64| {
            debug_assert!(secs <= duration + 1e-6, "uptime {secs} exceeds fight length");
            (secs / duration).clamp(0.0, 1.0)
        };

        let mut uptimes: BTreeMap<String, f64> = self
            .buffs
            .uptimes()
            .map(|(name, secs)| (name.to_string(), fraction(secs)))
            .collect();
        uptimes.insert("flurry".into(), fraction(self.flurry.uptime));
        uptimes.insert("enrage".into(), fraction(self.enrage.uptime));
        uptimes.insert("death_wish".into(), fraction(self.death_wish.uptime));
        uptimes.insert("bloodlust".into(), fraction(self.bloodlust.uptime));
        uptimes.insert("deep_wounds".into(), fraction(self.deep_wounds.uptime));
        uptimes.insert("rend".into(), fraction(self.rend.uptime));

        let main_hand_swings = self.attacks.get(AttackKind::MainHand).attempts().max(1);
        let off_hand_swings = self.attacks.get(AttackKind::OffHand).attempts().max(1);

        let dps = self.damage.scaled(1.0 / duration);
        FightMetrics {
            duration,
            damage: self.damage,
            total_dps: dps.total(),
            dps,
            attacks: self.attacks,
            uptimes,
            ambidextrous_stacks: self.ambidextrous.stack_seconds / duration,
            avg_main_hand_hit: self.damage.white_main_hand / main_hand_swings as f64,
            avg_off_hand_hit: self.damage.white_off_hand / off_hand_swings as f64,
            rage: RageSummary {
                generated: self.rage.generated,
                spent: self.rage.spent,
                overcapped: self.rage.overcapped,
            },
            deep_wounds_ticks: self.deep_wounds.ticks_fired,
            rend_ticks: self.rend.ticks_fired,
            casts: self.casts,
        }
    }
}

/// Run one fight with a prepared warrior
pub fn run_fight(config: &FightConfig, warrior: &Warrior, seed: u64) -> FightMetrics {
    Fight::new(config, warrior, seed).run()
}

/// Validate the config and run a single fight (for deterministic testing)
pub fn simulate_fight(config: &FightConfig, seed: u64) -> Result<FightMetrics> {
    config.validate()?;
    let warrior = Warrior::from_config(config);
    Ok(run_fight(config, &warrior, seed))
}

/// Workers for a batch: the configured count or one per CPU, never more than fights
pub fn worker_count(config: &FightConfig) -> usize {
    let wanted = if config.threads == 0 {
        num_cpus::get()
    } else {
        config.threads
    };
    wanted.min(config.iterations).max(1)
}

/// Split `iterations` into `workers` chunks differing by at most one
pub fn split_iterations(iterations: usize, workers: usize) -> Vec<usize> {
    let workers = workers.max(1);
    let base = iterations / workers;
    let extra = iterations % workers;
    (0..workers).map(|i| base + usize::from(i < extra)).collect()
}

/// Seed for one worker's RNG, derived from the master seed (splitmix64)
pub fn worker_seed(master: u64, worker: usize) -> u64 {
    let mut z = master.wrapping_add((worker as u64 + 1).wrapping_mul(0x9E37_79B9_7F4A_7C15));
    z = (z ^ (z >> 30)).wrapping_mul(0xBF58_476D_1CE4_E5B9);
    z = (z ^ (z >> 27)).wrapping_mul(0x94D0_49BB_1331_11EB);
    z ^ (z >> 31)
}

fn run_chunk(
    config: &FightConfig,
    warrior: &Warrior,
    worker: usize,
    fights: usize,
    seed: u64,
    cancel: &AtomicBool,
) -> Result<WorkerOutput> {
    debug!(worker, fights, seed, "worker started");
    let mut rng = SmallRng::seed_from_u64(seed);
    let mut output = WorkerOutput::new(worker, fights);

    for fight in 0..fights {
        if cancel.load(Ordering::Relaxed) {
            return Err(SimError::Cancelled);
        }
        let metrics = run_fight(config, warrior, rng.gen());
        metrics
            .check()
            .map_err(|reason| SimError::InvalidFight { worker, fight, reason })?;
        output.push(metrics);
    }

    debug!(worker, fights, "worker finished");
    Ok(output)
}

/// Run the configured number of fights in parallel and aggregate them
pub fn run_batch(config: &FightConfig) -> Result<AggregateResult> {
    run_batch_with_cancel(config, &AtomicBool::new(false))
}

/// Like [`run_batch`], stopping with [`SimError::Cancelled`] once `cancel` is set.
pub fn run_batch_with_cancel(config: &FightConfig, cancel: &AtomicBool) -> Result<AggregateResult> {
    config.validate()?;

    let warrior = Warrior::from_config(config);
    let workers = worker_count(config);
    let seed = config.seed.unwrap_or_else(rand::random);
    let chunks = split_iterations(config.iterations, workers);
    info!(seed, workers, iterations = config.iterations, "starting batch");

    let pool = ThreadPoolBuilder::new().num_threads(workers).build()?;
    let outputs = pool.install(|| {
        chunks
            .par_iter()
            .enumerate()
            .map(|(worker, &fights)| {
                run_chunk(config, &warrior, worker, fights, worker_seed(seed, worker), cancel)
            })
            .collect::<Result<Vec<_>>>()
    })?;

    let result = AggregateResult::from_workers(outputs, seed, config.fight_duration);
    if result.idle_fights > 0 {
        warn!(
            fights = result.idle_fights,
            "no ability was castable for a whole fight; check costs and priority"
        );
    }
    info!(
        mean_dps = result.mean_total_dps,
        std_dps = result.std_total_dps,
        "batch finished"
    );
    Ok(result)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ConfigError;

    /// No procs, no optional talents, no crits, heroic strike never affordable
    fn plain_config() -> FightConfig {
        let mut c = FightConfig::default();
        c.main_hand_procs.clear();
        c.off_hand_procs.clear();
        c.talents.dual_wield = false;
        c.talents.battering_ram = false;
        c.talents.ambidextrous_strike = false;
        c.talents.skull_cracker = false;
        c.character.crit = 0.0;
        c.character.agility = 0.0;
        c.costs.heroic_strike = 101.0;
        c.priority = vec![Ability::Bloodthirst];
        c
    }

    #[test]
    fn test_same_seed_same_fight() {
        let config = FightConfig::default();
        let a = simulate_fight(&config, 42).unwrap();
        let b = simulate_fight(&config, 42).unwrap();
        assert_eq!(a, b);
        let c = simulate_fight(&config, 43).unwrap();
        assert_ne!(a.total_dps, c.total_dps);
    }

    #[test]
    fn test_total_is_sum_of_sources() {
        let config = FightConfig::default();
        for seed in 0..20 {
            let m = simulate_fight(&config, seed).unwrap();
            assert!((m.total_dps - m.dps.total()).abs() < 1e-6);
            assert!(m.check().is_ok());
            assert!(m.total_dps > 0.0);
            assert!(m.deep_wounds_ticks > 0);
        }
    }

    #[test]
    fn test_main_hand_swing_count_without_haste() {
        let config = plain_config();
        for seed in [1, 2, 3] {
            let m = simulate_fight(&config, seed).unwrap();
            // Swings at 0, 2.6, ..., 59.8
            let expected = (60.0f64 / 2.6).floor() as u32 + 1;
            assert_eq!(m.attacks.get(AttackKind::MainHand).attempts(), expected);
            assert_eq!(m.attacks.get(AttackKind::OffHand).attempts(), 0);
            assert_eq!(m.attacks.get(AttackKind::HeroicStrike).attempts(), 0);
        }
    }

    #[test]
    fn test_no_procs_no_proc_damage() {
        let config = plain_config();
        let m = simulate_fight(&config, 9).unwrap();
        assert_eq!(m.damage.procs, 0.0);
        assert_eq!(m.damage.rend, 0.0);
        assert_eq!(m.damage.white_off_hand, 0.0);
        assert_eq!(m.damage.ambidextrous, 0.0);
        assert!(m.damage.white_main_hand > 0.0);
        assert!(!m.uptimes.contains_key("Crusader"));
        assert_eq!(m.rend_ticks, 0);
    }

    #[test]
    fn test_swing_during_slam_cast_is_pushed_back() {
        let config = plain_config();
        let warrior = Warrior::from_config(&config);
        let mut fight = Fight::new(&config, &warrior, 1);
        fight.refresh_stats();
        fight.now = 1.0;
        fight.swing_lockout_until = 2.5;
        fight.flurry.refresh();

        fight.main_hand_swing();
        assert_eq!(fight.attacks.get(AttackKind::MainHand).attempts(), 0);
        assert_eq!(fight.flurry.charges(), FLURRY_CHARGES);
        let event = fight.queue.pop_next().unwrap();
        assert_eq!(event.time, 2.5);
        assert_eq!(event.kind, EventKind::MainHandSwing);
        assert!(fight.queue.is_empty());
    }

    #[test]
    fn test_hard_cast_slams_cost_swings() {
        let mut config = plain_config();
        config.priority = vec![Ability::Slam];
        config.consumables.tank_dummy = true;
        let timer_swings = (60.0f64 / 2.6).floor() as u32 + 1;
        for seed in 0..5 {
            let m = simulate_fight(&config, seed).unwrap();
            assert!(m.attacks.get(AttackKind::SlamMainHand).attempts() > 0);
            let swings = m.attacks.get(AttackKind::MainHand).attempts();
            assert!(swings > 0 && swings < timer_swings, "swings = {swings}");
        }
    }

    #[test]
    fn test_bonus_swing_skips_its_own_proc() {
        let mut config = plain_config();
        config.main_hand_procs = vec![ProcId::FlurryAxe];
        let warrior = Warrior::from_config(&config);
        let mut fight = Fight::new(&config, &warrior, 3);
        fight.refresh_stats();
        fight.now = 1.0;

        for _ in 0..200 {
            fight.white_swing(Hand::MainHand, Some(ProcId::FlurryAxe));
        }
        assert!(fight.queue.is_empty());

        for _ in 0..200 {
            fight.white_swing(Hand::MainHand, None);
        }
        let event = fight.queue.pop_next().unwrap();
        assert_eq!(event.time, 1.0);
        assert_eq!(event.kind, EventKind::ExtraSwing { source: ProcId::FlurryAxe });
    }

    #[test]
    fn test_bonus_swings_add_main_hand_attacks() {
        let mut config = plain_config();
        config.main_hand_procs = vec![ProcId::FlurryAxe];
        let timer_swings = (60.0f64 / 2.6).floor() as u32 + 1;
        let extra: u32 = (0..10)
            .map(|seed| {
                let m = simulate_fight(&config, seed).unwrap();
                let swings = m.attacks.get(AttackKind::MainHand).attempts();
                assert!(swings >= timer_swings, "swings = {swings}");
                swings - timer_swings
            })
            .sum();
        assert!(extra > 0);
    }

    #[test]
    fn test_slam_miss_ignores_target_level() {
        let mut config = FightConfig::default();
        config.target.level = 70;
        config.priority = vec![Ability::Slam];
        config.consumables.tank_dummy = true;
        for seed in 0..5 {
            let m = simulate_fight(&config, seed).unwrap();
            let slams = m.attacks.get(AttackKind::SlamMainHand);
            assert!(slams.attempts() > 0);
            assert_eq!(slams.misses, 0);
            assert!(m.attacks.get(AttackKind::MainHand).misses > 0);
        }
    }

    #[test]
    fn test_uptimes_are_fractions() {
        let mut config = FightConfig::default();
        config.consumables.bloodlust_at = 10.0;
        config.consumables.bloodfury_at = 10.0;
        config.consumables.icon = true;
        config.main_hand_procs.push(ProcId::RendGarg);
        for seed in 0..10 {
            let m = simulate_fight(&config, seed).unwrap();
            for (name, &u) in &m.uptimes {
                assert!((0.0..=1.0).contains(&u), "{name} uptime {u}");
            }
            // Bloodlust runs 10..50 of a 60 second fight
            assert!((m.uptimes["bloodlust"] - 40.0 / 60.0).abs() < 1e-9);
            // Bloodfury runs 10..25
            assert!((m.uptimes["Bloodfury"] - 15.0 / 60.0).abs() < 1e-9);
        }
    }

    #[test]
    fn test_tank_dummy_keeps_rage_bounded() {
        let mut config = FightConfig::default();
        config.consumables.tank_dummy = true;
        config.starting_rage = 100.0;
        for seed in 0..10 {
            let m = simulate_fight(&config, seed).unwrap();
            assert!(m.rage.overcapped > 0.0);
            assert!(m.rage.spent <= m.rage.generated + 100.0 + 1e-9);
        }
    }

    #[test]
    fn test_zero_armor_is_valid() {
        let mut config = FightConfig::default();
        config.target.armor = 0.0;
        config.character.attack_power = 2.0 * config.character.strength;
        let m = simulate_fight(&config, 5).unwrap();
        assert!(m.check().is_ok());
    }

    #[test]
    fn test_invalid_config_rejected_before_running() {
        let mut config = FightConfig::default();
        config.fight_duration = 0.0;
        assert!(matches!(
            run_batch(&config),
            Err(SimError::Config(ConfigError::NonPositiveDuration(_)))
        ));
        assert!(simulate_fight(&config, 1).is_err());
    }

    #[test]
    fn test_cancelled_batch() {
        let mut config = FightConfig::default();
        config.iterations = 10;
        config.threads = 2;
        let cancel = AtomicBool::new(true);
        assert!(matches!(
            run_batch_with_cancel(&config, &cancel),
            Err(SimError::Cancelled)
        ));
    }

    #[test]
    fn test_split_iterations() {
        assert_eq!(split_iterations(10, 3), vec![4, 3, 3]);
        assert_eq!(split_iterations(2, 4), vec![1, 1, 0, 0]);
        assert_eq!(split_iterations(1000, 7).iter().sum::<usize>(), 1000);
    }

    #[test]
    fn test_worker_seeds_differ() {
        let seeds: Vec<u64> = (0..8).map(|w| worker_seed(123, w)).collect();
        for (i, a) in seeds.iter().enumerate() {
            for b in &seeds[i + 1..] {
                assert_ne!(a, b);
            }
        }
        assert_eq!(worker_seed(123, 3), worker_seed(123, 3));
    }

    #[test]
    fn test_worker_count_bounds() {
        let mut config = FightConfig::default();
        config.threads = 16;
        config.iterations = 3;
        assert_eq!(worker_count(&config), 3);
        config.threads = 0;
        config.iterations = 100_000;
        assert!(worker_count(&config) >= 1);
    }
}
