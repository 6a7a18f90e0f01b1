//! Fight metrics and batch aggregation

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Damage split by source. Used both for raw damage and for DPS.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct DamageBreakdown {
    pub white_main_hand: f64,
    pub white_off_hand: f64,
    pub heroic_strike: f64,
    pub ambidextrous: f64,
    pub slam_main_hand: f64,
    pub slam_off_hand: f64,
    pub bloodthirst: f64,
    pub whirlwind: f64,
    /// Instant proc damage (physical and magic)
    pub procs: f64,
    pub deep_wounds: f64,
    /// Bleed applied by procs
    pub rend: f64,
}

impl DamageBreakdown {
    /// Every source with a display label, in a fixed order
    pub fn sources(&self) -> [(&'static str, f64); 11] {
        [
            ("White MH", self.white_main_hand),
            ("White OH", self.white_off_hand),
            ("Heroic Strike", self.heroic_strike),
            ("Ambidextrous", self.ambidextrous),
            ("Slam MH", self.slam_main_hand),
            ("Slam OH", self.slam_off_hand),
            ("Bloodthirst", self.bloodthirst),
            ("Whirlwind", self.whirlwind),
            ("Procs", self.procs),
            ("Deep Wounds", self.deep_wounds),
            ("Rend", self.rend),
        ]
    }

    pub fn total(&self) -> f64 {
        self.sources().iter().map(|(_, v)| v).sum()
    }

    pub fn scaled(&self, factor: f64) -> Self {
        Self {
            white_main_hand: self.white_main_hand * factor,
            white_off_hand: self.white_off_hand * factor,
            heroic_strike: self.heroic_strike * factor,
            ambidextrous: self.ambidextrous * factor,
            slam_main_hand: self.slam_main_hand * factor,
            slam_off_hand: self.slam_off_hand * factor,
            bloodthirst: self.bloodthirst * factor,
            whirlwind: self.whirlwind * factor,
            procs: self.procs * factor,
            deep_wounds: self.deep_wounds * factor,
            rend: self.rend * factor,
        }
    }

    fn add(&mut self, other: &Self) {
        self.white_main_hand += other.white_main_hand;
        self.white_off_hand += other.white_off_hand;
        self.heroic_strike += other.heroic_strike;
        self.ambidextrous += other.ambidextrous;
        self.slam_main_hand += other.slam_main_hand;
        self.slam_off_hand += other.slam_off_hand;
        self.bloodthirst += other.bloodthirst;
        self.whirlwind += other.whirlwind;
        self.procs += other.procs;
        self.deep_wounds += other.deep_wounds;
        self.rend += other.rend;
    }
}

/// Attack types counted in the attack table
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AttackKind {
    MainHand,
    OffHand,
    HeroicStrike,
    Ambidextrous,
    SlamMainHand,
    SlamOffHand,
    Bloodthirst,
    Whirlwind,
}

impl AttackKind {
    pub const ALL: [AttackKind; 8] = [
        AttackKind::MainHand,
        AttackKind::OffHand,
        AttackKind::HeroicStrike,
        AttackKind::Ambidextrous,
        AttackKind::SlamMainHand,
        AttackKind::SlamOffHand,
        AttackKind::Bloodthirst,
        AttackKind::Whirlwind,
    ];

    pub fn label(self) -> &'static str {
        match self {
            AttackKind::MainHand => "MH",
            AttackKind::OffHand => "OH",
            AttackKind::HeroicStrike => "HS",
            AttackKind::Ambidextrous => "Ambi",
            AttackKind::SlamMainHand => "Slam MH",
            AttackKind::SlamOffHand => "Slam OH",
            AttackKind::Bloodthirst => "BT",
            AttackKind::Whirlwind => "WW",
        }
    }
}

/// Outcome counts for one attack type. `hits` includes crits.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttackCounts {
    pub hits: u32,
    pub crits: u32,
    pub misses: u32,
}

impl AttackCounts {
    pub fn attempts(&self) -> u32 {
        self.hits + self.misses
    }

    fn add(&mut self, other: &Self) {
        self.hits += other.hits;
        self.crits += other.crits;
        self.misses += other.misses;
    }
}

/// Per-attack-type outcome counts for one fight (or summed over many).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttackTable {
    counts: BTreeMap<AttackKind, AttackCounts>,
}

impl AttackTable {
    pub fn record(&mut self, kind: AttackKind, crit: bool, miss: bool) {
        let entry = self.counts.entry(kind).or_default();
        if miss {
            entry.misses += 1;
        } else {
            entry.hits += 1;
            if crit {
                entry.crits += 1;
            }
        }
    }

    pub fn get(&self, kind: AttackKind) -> AttackCounts {
        self.counts.get(&kind).copied().unwrap_or_default()
    }

    pub fn iter(&self) -> impl Iterator<Item = (AttackKind, AttackCounts)> + '_ {
        self.counts.iter().map(|(&k, &c)| (k, c))
    }

    pub fn add(&mut self, other: &AttackTable) {
        for (kind, counts) in other.iter() {
            self.counts.entry(kind).or_default().add(&counts);
        }
    }
}

/// Rage flow over a fight
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct RageSummary {
    pub generated: f64,
    pub spent: f64,
    /// Rage gained while capped
    pub overcapped: f64,
}

impl RageSummary {
    fn add(&mut self, other: &Self) {
        self.generated += other.generated;
        self.spent += other.spent;
        self.overcapped += other.overcapped;
    }
}

/// Results from a single fight
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FightMetrics {
    pub duration: f64,
    /// Raw damage per source
    pub damage: DamageBreakdown,
    /// Damage per source divided by the fight duration
    pub dps: DamageBreakdown,
    pub total_dps: f64,
    pub attacks: AttackTable,
    /// Fraction of the fight each buff or effect was active
    pub uptimes: BTreeMap<String, f64>,
    /// Time-averaged ambidextrous stack count
    pub ambidextrous_stacks: f64,
    /// Average white main-hand swing damage
    pub avg_main_hand_hit: f64,
    pub avg_off_hand_hit: f64,
    pub rage: RageSummary,
    pub deep_wounds_ticks: u32,
    pub rend_ticks: u32,
    /// Abilities cast on the global cooldown
    pub casts: u32,
}

impl FightMetrics {
    /// Sanity check for a finished fight. Returns a description of the first problem.
    pub fn check(&self) -> Result<(), String> {
        for (name, value) in self.damage.sources() {
            if !value.is_finite() || value < 0.0 {
                return Err(format!("{name} damage is {value}"));
            }
        }
        if !self.total_dps.is_finite() {
            return Err(format!("total dps is {}", self.total_dps));
        }
        for (name, &uptime) in &self.uptimes {
            if !(0.0..=1.0).contains(&uptime) {
                return Err(format!("{name} uptime is {uptime}"));
            }
        }
        Ok(())
    }
}

/// One worker's share of a batch
#[derive(Debug, Clone, Default)]
pub struct WorkerOutput {
    pub worker: usize,
    pub fights: Vec<FightMetrics>,
    /// Summed active seconds per buff
    pub uptime_seconds: BTreeMap<String, f64>,
    pub attacks: AttackTable,
}

impl WorkerOutput {
    pub fn new(worker: usize, capacity: usize) -> Self {
        Self {
            worker,
            fights: Vec::with_capacity(capacity),
            ..Default::default()
        }
    }

    pub fn push(&mut self, metrics: FightMetrics) {
        for (name, &fraction) in &metrics.uptimes {
            *self.uptime_seconds.entry(name.clone()).or_insert(0.0) += fraction * metrics.duration;
        }
        self.attacks.add(&metrics.attacks);
        self.fights.push(metrics);
    }
}

/// One bar of a DPS histogram
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct HistogramBin {
    pub lower: f64,
    pub upper: f64,
    pub count: usize,
}

/// Aggregated statistics from a batch of fights
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AggregateResult {
    pub iterations: usize,
    /// Master seed the batch was run with
    pub seed: u64,
    pub workers: usize,
    pub fight_duration: f64,

    pub mean_total_dps: f64,
    pub std_total_dps: f64,
    pub min_total_dps: f64,
    pub max_total_dps: f64,
    pub mean_dps: DamageBreakdown,
    pub mean_uptimes: BTreeMap<String, f64>,
    pub mean_ambidextrous_stacks: f64,
    pub mean_avg_main_hand_hit: f64,
    pub mean_avg_off_hand_hit: f64,
    pub mean_rage: RageSummary,
    /// Attack table summed over every fight
    pub total_attacks: AttackTable,
    /// Fights in which nothing was cast on the global cooldown
    pub idle_fights: usize,

    /// Total DPS of every fight, in worker then fight order
    pub dps_distribution: Vec<f64>,
    /// Per-source DPS of every fight
    pub fight_dps: Vec<DamageBreakdown>,
    /// Attack table of every fight
    pub fight_attacks: Vec<AttackTable>,
}

impl AggregateResult {
    /// Merge worker outputs. Workers must be in index order for the result
    /// to be reproducible.
    pub fn from_workers(outputs: Vec<WorkerOutput>, seed: u64, fight_duration: f64) -> Self {
        let workers = outputs.len();
        let iterations: usize = outputs.iter().map(|o| o.fights.len()).sum();
        if iterations == 0 {
            return Self { seed, workers, fight_duration, ..Default::default() };
        }
        let n = iterations as f64;

        let mut dps_distribution = Vec::with_capacity(iterations);
        let mut fight_dps = Vec::with_capacity(iterations);
        let mut fight_attacks = Vec::with_capacity(iterations);
        let mut dps_sum = DamageBreakdown::default();
        let mut rage_sum = RageSummary::default();
        let mut uptime_seconds: BTreeMap<String, f64> = BTreeMap::new();
        let mut total_attacks = AttackTable::default();
        let mut stacks = 0.0;
        let mut main_hand_hit = 0.0;
        let mut off_hand_hit = 0.0;
        let mut idle_fights = 0;

        for output in outputs {
            for (name, secs) in output.uptime_seconds {
                *uptime_seconds.entry(name).or_insert(0.0) += secs;
            }
            total_attacks.add(&output.attacks);
            for fight in output.fights {
                dps_sum.add(&fight.dps);
                rage_sum.add(&fight.rage);
                stacks += fight.ambidextrous_stacks;
                main_hand_hit += fight.avg_main_hand_hit;
                off_hand_hit += fight.avg_off_hand_hit;
                if fight.casts == 0 {
                    idle_fights += 1;
                }
                dps_distribution.push(fight.total_dps);
                fight_dps.push(fight.dps);
                fight_attacks.push(fight.attacks);
            }
        }

        let mean_total_dps = dps_distribution.iter().sum::<f64>() / n;
        let variance = dps_distribution
            .iter()
            .map(|&d| (d - mean_total_dps).powi(2))
            .sum::<f64>()
            / n;
        let min_total_dps = dps_distribution.iter().copied().fold(f64::INFINITY, f64::min);
        let max_total_dps = dps_distribution.iter().copied().fold(f64::NEG_INFINITY, f64::max);

        let fight_time = n * fight_duration;
        let mean_uptimes = uptime_seconds
            .into_iter()
            .map(|(name, secs)| (name, (secs / fight_time).clamp(0.0, 1.0)))
            .collect();

        Self {
            iterations,
            seed,
            workers,
            fight_duration,
            mean_total_dps,
            std_total_dps: variance.sqrt(),
            min_total_dps,
            max_total_dps,
            mean_dps: dps_sum.scaled(1.0 / n),
            mean_uptimes,
            mean_ambidextrous_stacks: stacks / n,
            mean_avg_main_hand_hit: main_hand_hit / n,
            mean_avg_off_hand_hit: off_hand_hit / n,
            mean_rage: RageSummary {
                generated: rage_sum.generated / n,
                spent: rage_sum.spent / n,
                overcapped: rage_sum.overcapped / n,
            },
            total_attacks,
            idle_fights,
            dps_distribution,
            fight_dps,
            fight_attacks,
        }
    }

    /// Mean per-fight counts for one attack type as (hits, crits, misses)
    pub fn mean_attacks(&self, kind: AttackKind) -> (f64, f64, f64) {
        let n = self.iterations.max(1) as f64;
        let c = self.total_attacks.get(kind);
        (c.hits as f64 / n, c.crits as f64 / n, c.misses as f64 / n)
    }

    /// Bucket the total-DPS distribution into `bins` equal-width bins.
    pub fn histogram(&self, bins: usize) -> Vec<HistogramBin> {
        if bins == 0 || self.dps_distribution.is_empty() {
            return Vec::new();
        }
        let lo = self.min_total_dps;
        let hi = self.max_total_dps;
        let width = (hi - lo) / bins as f64;
        if !(width > 0.0) {
            return vec![HistogramBin { lower: lo, upper: hi, count: self.dps_distribution.len() }];
        }

        let mut counts = vec![0usize; bins];
        for &dps in &self.dps_distribution {
            let idx = (((dps - lo) / width) as usize).min(bins - 1);
            counts[idx] += 1;
        }
        counts
            .into_iter()
            .enumerate()
            .map(|(i, count)| HistogramBin {
                lower: lo + i as f64 * width,
                upper: lo + (i + 1) as f64 * width,
                count,
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fight(total: f64) -> FightMetrics {
        let damage = DamageBreakdown { white_main_hand: total * 60.0, ..Default::default() };
        let mut attacks = AttackTable::default();
        attacks.record(AttackKind::MainHand, true, false);
        attacks.record(AttackKind::MainHand, false, true);
        let mut uptimes = BTreeMap::new();
        uptimes.insert("flurry".to_string(), 0.5);
        FightMetrics {
            duration: 60.0,
            damage,
            dps: damage.scaled(1.0 / 60.0),
            total_dps: total,
            attacks,
            uptimes,
            casts: 1,
            ..Default::default()
        }
    }

    fn batch(dps: &[f64]) -> AggregateResult {
        let mut a = WorkerOutput::new(0, dps.len());
        for &d in dps {
            a.push(fight(d));
        }
        AggregateResult::from_workers(vec![a], 7, 60.0)
    }

    #[test]
    fn test_breakdown_total() {
        let d = DamageBreakdown { white_main_hand: 1.0, procs: 2.0, rend: 3.0, ..Default::default() };
        assert_eq!(d.total(), 6.0);
        assert_eq!(d.scaled(0.5).total(), 3.0);
    }

    #[test]
    fn test_attack_table_counts() {
        let mut t = AttackTable::default();
        t.record(AttackKind::Whirlwind, true, false);
        t.record(AttackKind::Whirlwind, false, false);
        t.record(AttackKind::Whirlwind, false, true);
        let ww = t.get(AttackKind::Whirlwind);
        assert_eq!((ww.hits, ww.crits, ww.misses), (2, 1, 1));
        assert_eq!(ww.attempts(), 3);
        assert_eq!(t.get(AttackKind::Bloodthirst), AttackCounts::default());
    }

    #[test]
    fn test_aggregate_means() {
        let result = batch(&[100.0, 200.0, 300.0]);
        assert_eq!(result.iterations, 3);
        assert!((result.mean_total_dps - 200.0).abs() < 1e-9);
        assert!((result.std_total_dps - (20000.0f64 / 3.0).sqrt()).abs() < 1e-9);
        assert_eq!(result.min_total_dps, 100.0);
        assert_eq!(result.max_total_dps, 300.0);
        assert!((result.mean_dps.white_main_hand - 200.0).abs() < 1e-9);
        assert!((result.mean_uptimes["flurry"] - 0.5).abs() < 1e-12);
        assert_eq!(result.total_attacks.get(AttackKind::MainHand).attempts(), 6);
        assert_eq!(result.mean_attacks(AttackKind::MainHand), (1.0, 1.0, 1.0));
        assert_eq!(result.dps_distribution, vec![100.0, 200.0, 300.0]);
        assert_eq!(result.fight_attacks.len(), 3);
    }

    #[test]
    fn test_merge_keeps_worker_order() {
        let mut a = WorkerOutput::new(0, 1);
        a.push(fight(1.0));
        let mut b = WorkerOutput::new(1, 2);
        b.push(fight(2.0));
        b.push(fight(3.0));
        let result = AggregateResult::from_workers(vec![a, b], 1, 60.0);
        assert_eq!(result.dps_distribution, vec![1.0, 2.0, 3.0]);
        assert_eq!(result.workers, 2);
    }

    #[test]
    fn test_empty_batch() {
        let result = AggregateResult::from_workers(Vec::new(), 3, 60.0);
        assert_eq!(result.iterations, 0);
        assert_eq!(result.mean_total_dps, 0.0);
        assert!(result.histogram(10).is_empty());
    }

    #[test]
    fn test_histogram() {
        let result = batch(&[0.0, 1.0, 2.0, 3.0, 10.0]);
        let bins = result.histogram(5);
        assert_eq!(bins.len(), 5);
        assert_eq!(bins.iter().map(|b| b.count).sum::<usize>(), 5);
        assert_eq!(bins[0].count, 2);
        assert_eq!(bins[4].count, 1);
        assert_eq!(bins[4].upper, 10.0);

        let flat = batch(&[5.0, 5.0]).histogram(4);
        assert_eq!(flat.len(), 1);
        assert_eq!(flat[0].count, 2);
    }

    #[test]
    fn test_check_rejects_bad_values() {
        assert!(fight(10.0).check().is_ok());
        let mut bad = fight(10.0);
        bad.damage.procs = f64::NAN;
        assert!(bad.check().is_err());
        let mut bad = fight(10.0);
        bad.uptimes.insert("x".into(), 1.5);
        assert!(bad.check().is_err());
    }
}
