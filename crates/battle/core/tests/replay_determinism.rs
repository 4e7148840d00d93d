use battle_core::replay::verify;
use battle_core::{
    AbilityFlags, ActionDefinition, Command, DamageFlags, DamageType, EffectDef, EffectSpec,
    Faction, ModifierOp, Position, ReplayLog, SimConfig, Simulation, Snapshot, StatKey,
};

fn volley() -> ActionDefinition {
    ActionDefinition::new("volley")
        .windup(0.2)
        .cooldown(0.5)
        .flags(AbilityFlags::ATTACK)
        .effect(EffectDef::new(EffectSpec::Damage {
            amount: 12.0,
            damage_type: DamageType::Physical,
            flags: DamageFlags::ATTACK.union(DamageFlags::CAN_CRIT),
        }))
}

fn script(sim: &Simulation) -> ReplayLog {
    let entities: Vec<_> = sim.arena.entities().collect();
    let (a, b) = (entities[0], entities[1]);
    let mut log = ReplayLog::new();
    log.push(1, Command::StartAction { entity: a, ability: "volley".into(), target: Some(b) })
        .unwrap();
    log.push(8, Command::Move { entity: b, x: -4.0, y: 1.0 }).unwrap();
    log.push(
        20,
        Command::StartAction { entity: a, ability: "volley".into(), target: Some(b) },
    )
    .unwrap();
    log.push(35, Command::Despawn { entity: b }).unwrap();
    log
}

fn run(seed: u32) -> Vec<Snapshot> {
    let mut sim = Simulation::new(SimConfig::default(), seed);
    sim.register_ability(volley());
    let a = sim.arena.spawn(120.0, Position::new(0.0, 0.0), Faction(0));
    sim.arena.spawn(90.0, Position::new(3.0, 0.0), Faction(1));
    // Crit chance makes every volley consume an rng draw.
    sim.world
        .stats
        .add(a, StatKey::CritChance, ModifierOp::Flat, 0.3, -1.0, None, None);

    let mut log = script(&sim);
    let mut snapshots = Vec::new();
    for _ in 0..10 {
        sim.advance_with_commands(0.25, &mut log);
        snapshots.push(sim.snapshot());
    }
    snapshots
}

#[test]
fn same_seed_and_commands_reproduce_every_snapshot() {
    let outcome = verify(&run(42), &run(42));
    assert!(outcome.valid);
    assert_eq!(outcome.desync_tick, None);
}

#[test]
fn different_seed_desyncs_at_the_first_checkpoint() {
    let outcome = verify(&run(42), &run(43));
    assert!(!outcome.valid);
    assert_eq!(outcome.desync_tick, Some(5));
}

#[test]
fn log_survives_a_json_round_trip_and_replays_identically() {
    let mut sim = Simulation::new(SimConfig::default(), 7);
    sim.register_ability(volley());
    sim.arena.spawn(120.0, Position::new(0.0, 0.0), Faction(0));
    sim.arena.spawn(90.0, Position::new(3.0, 0.0), Faction(1));

    let log = script(&sim);
    let json = log.to_json().unwrap();
    let mut replayed = ReplayLog::from_json(&json).unwrap();
    assert_eq!(replayed.commands(), log.commands());

    let direct = run(7);
    let mut snapshots = Vec::new();
    {
        let mut sim = Simulation::new(SimConfig::default(), 7);
        sim.register_ability(volley());
        let a = sim.arena.spawn(120.0, Position::new(0.0, 0.0), Faction(0));
        sim.arena.spawn(90.0, Position::new(3.0, 0.0), Faction(1));
        sim.world
            .stats
            .add(a, StatKey::CritChance, ModifierOp::Flat, 0.3, -1.0, None, None);
        for _ in 0..10 {
            sim.advance_with_commands(0.25, &mut replayed);
            snapshots.push(sim.snapshot());
        }
    }
    assert!(verify(&direct, &snapshots).valid);
}

#[test]
fn despawned_entity_commands_are_silent_no_ops() {
    let mut sim = Simulation::new(SimConfig::default(), 1);
    sim.register_ability(volley());
    let a = sim.arena.spawn(120.0, Position::new(0.0, 0.0), Faction(0));
    let b = sim.arena.spawn(90.0, Position::new(3.0, 0.0), Faction(1));

    sim.apply_command(&Command::Despawn { entity: b }, 0);
    assert_eq!(sim.arena.alive_count(), 1);

    // A command aimed at the stale handle neither panics nor mutates.
    let before = sim.snapshot();
    sim.apply_command(&Command::Move { entity: b, x: 1.0, y: 1.0 }, 0);
    sim.advance(0.25);
    sim.apply_command(
        &Command::StartAction { entity: a, ability: "volley".into(), target: Some(b) },
        5,
    );
    sim.advance(0.25);
    assert_eq!(sim.arena.alive_count(), 1);
    assert_eq!(sim.arena.hp(a), Some(120.0));
    assert_eq!(sim.snapshot().entity_count, before.entity_count);
}
