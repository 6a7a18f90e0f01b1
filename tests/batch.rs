use std::io::Write;
use warrior_sim_lib::buffs::StackingBuff;
use warrior_sim_lib::damage::mitigation;
use warrior_sim_lib::policy::Ability;
use warrior_sim_lib::{run_batch, AttackKind, ConfigError, FightConfig, SimError};

fn seeded(iterations: usize, seed: u64) -> FightConfig {
    FightConfig {
        iterations,
        seed: Some(seed),
        threads: 2,
        ..FightConfig::default()
    }
}

fn no_extras(mut config: FightConfig) -> FightConfig {
    config.main_hand_procs.clear();
    config.off_hand_procs.clear();
    config.talents.battering_ram = false;
    config.talents.ambidextrous_strike = false;
    config.talents.skull_cracker = false;
    config.talents.outrage = false;
    config.talents.trauma = false;
    config
}

#[test]
fn test_same_seed_same_result() {
    let config = seeded(64, 2024);
    let a = serde_json::to_string(&run_batch(&config).unwrap()).unwrap();
    let b = serde_json::to_string(&run_batch(&config).unwrap()).unwrap();
    assert_eq!(a, b);
}

#[test]
fn test_different_seed_different_result() {
    let a = run_batch(&seeded(32, 1)).unwrap();
    let b = run_batch(&seeded(32, 2)).unwrap();
    assert_ne!(a.dps_distribution, b.dps_distribution);
}

#[test]
fn test_raw_arrays_cover_every_fight() {
    let result = run_batch(&seeded(101, 7)).unwrap();
    assert_eq!(result.iterations, 101);
    assert_eq!(result.dps_distribution.len(), 101);
    assert_eq!(result.fight_dps.len(), 101);
    assert_eq!(result.fight_attacks.len(), 101);

    for (total, sources) in result.dps_distribution.iter().zip(&result.fight_dps) {
        assert!((total - sources.total()).abs() < 1e-6);
        for (name, dps) in sources.sources() {
            assert!(dps >= 0.0, "{name} dps {dps}");
        }
    }
    let bins = result.histogram(20);
    assert_eq!(bins.iter().map(|b| b.count).sum::<usize>(), 101);
}

#[test]
fn test_mean_uptimes_are_fractions() {
    let mut config = seeded(40, 11);
    config.consumables.icon = true;
    config.consumables.hand_of_justice = true;
    config.consumables.bloodlust_at = 5.0;
    config.consumables.bloodfury_at = 5.0;
    let result = run_batch(&config).unwrap();
    for (name, uptime) in &result.mean_uptimes {
        assert!((0.0..=1.0).contains(uptime), "{name} uptime {uptime}");
    }
    assert!(result.mean_uptimes["flurry"] > 0.0);
    assert!(result.mean_uptimes["Crusader"] > 0.0);
}

#[test]
fn test_no_procs_no_proc_damage() {
    let result = run_batch(&no_extras(seeded(50, 3))).unwrap();
    for fight in &result.fight_dps {
        assert_eq!(fight.procs, 0.0);
        assert_eq!(fight.rend, 0.0);
        assert_eq!(fight.ambidextrous, 0.0);
    }
    assert!(!result.mean_uptimes.contains_key("Crusader"));
    assert!(result.mean_dps.white_main_hand > 0.0);
}

#[test]
fn test_single_hand_swing_count() {
    let mut config = no_extras(seeded(1, 99));
    config.talents.dual_wield = false;
    config.character.crit = 0.0;
    config.character.agility = 0.0;
    config.costs.heroic_strike = 101.0;
    config.priority = vec![Ability::Bloodthirst, Ability::Whirlwind];

    let result = run_batch(&config).unwrap();
    let swings = result.fight_attacks[0].get(AttackKind::MainHand).attempts();
    assert_eq!(swings, 24);
    assert_eq!(result.fight_attacks[0].get(AttackKind::OffHand).attempts(), 0);
}

#[test]
fn test_mitigation_bounds() {
    assert_eq!(mitigation(0.0, 0.0), 0.0);
    assert_eq!(mitigation(0.0, 0.5), 0.0);
    for arpen in [-1.0, 0.0, 0.3, 1.0, 5.0] {
        let m = mitigation(1e12, arpen);
        assert!((0.0..=0.75).contains(&m));
    }
    assert!((mitigation(1e12, 0.0) - 0.75).abs() < 1e-12);
}

#[test]
fn test_zero_armor_target() {
    let mut config = seeded(20, 5);
    config.target.armor = 0.0;
    let bare = run_batch(&config).unwrap();
    let armored = run_batch(&seeded(20, 5)).unwrap();
    assert!(bare.mean_total_dps > armored.mean_total_dps);
}

#[test]
fn test_stacking_buff_never_exceeds_cap() {
    let mut buff = StackingBuff::new(8.0, 3, 0.05);
    for i in 0..10 {
        buff.trigger(i as f64 * 0.5);
        assert!(buff.stacks() <= 3);
    }
    assert_eq!(buff.stacks(), 3);
}

#[test]
fn test_spread_shrinks_with_more_fights() {
    let spread = |iterations: usize| {
        let means: Vec<f64> = (0..6)
            .map(|seed| run_batch(&seeded(iterations, 1000 + seed)).unwrap().mean_total_dps)
            .collect();
        let mean = means.iter().sum::<f64>() / means.len() as f64;
        (means.iter().map(|m| (m - mean).powi(2)).sum::<f64>() / means.len() as f64).sqrt()
    };
    let small = spread(20);
    let large = spread(640);
    assert!(large < small, "spread did not shrink: {small} -> {large}");
}

#[test]
fn test_config_errors_surface() {
    let mut config = FightConfig::default();
    config.iterations = 0;
    assert!(matches!(run_batch(&config), Err(SimError::Config(ConfigError::NoIterations))));

    let mut config = FightConfig::default();
    config.character.main_hand.min_damage = 200.0;
    assert!(matches!(
        run_batch(&config),
        Err(SimError::Config(ConfigError::InvalidWeaponRange { .. }))
    ));
}

#[test]
fn test_runs_from_yaml_file() {
    let mut file = tempfile::Builder::new().suffix(".yaml").tempfile().unwrap();
    writeln!(
        file,
        "iterations: 8\nseed: 17\nthreads: 1\nfight_duration: 30\nmain_hand_procs: [crusader, flurry_axe]\ntalents:\n  trauma: true"
    )
    .unwrap();
    let config = FightConfig::from_file(file.path()).unwrap();
    let result = run_batch(&config).unwrap();
    assert_eq!(result.iterations, 8);
    assert_eq!(result.workers, 1);
    assert_eq!(result.fight_duration, 30.0);
}
