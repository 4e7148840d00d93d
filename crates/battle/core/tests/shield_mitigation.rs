use battle_core::{
    AbsorbKind, DamageFlags, DamageType, Entity, Faction, ModifierOp, Position, SimConfig,
    Simulation, StatKey,
};

fn setup() -> (Simulation, Entity, Entity) {
    let mut sim = Simulation::new(SimConfig::default(), 3);
    let attacker = sim.arena.spawn(100.0, Position::new(0.0, 0.0), Faction(0));
    let target = sim.arena.spawn(100.0, Position::new(2.0, 0.0), Faction(1));
    (sim, attacker, target)
}

fn hit(sim: &mut Simulation, source: Entity, target: Entity, amount: f32, damage_type: DamageType) {
    sim.world
        .apply_damage(
            &mut sim.arena,
            Some(source),
            target,
            amount,
            damage_type,
            DamageFlags::ATTACK,
        )
        .unwrap();
}

#[test]
fn shield_soaks_until_it_breaks() {
    let (mut sim, attacker, target) = setup();
    sim.world
        .shields
        .add(target, 100.0, AbsorbKind::All, -1.0, 0, None);

    // First hit is fully absorbed.
    hit(&mut sim, attacker, target, 60.0, DamageType::Physical);
    assert_eq!(sim.arena.hp(target), Some(100.0));
    assert_eq!(sim.world.shields.total(target, DamageType::Physical), 40.0);

    // Second hit breaks the shield; the overflow reaches HP.
    hit(&mut sim, attacker, target, 60.0, DamageType::Physical);
    assert_eq!(sim.arena.hp(target), Some(80.0));
    assert_eq!(sim.world.shields.total(target, DamageType::Physical), 0.0);
}

#[test]
fn typed_shields_only_soak_their_type() {
    let (mut sim, attacker, target) = setup();
    sim.world
        .shields
        .add(target, 50.0, AbsorbKind::Magic, -1.0, 0, None);

    hit(&mut sim, attacker, target, 30.0, DamageType::Physical);
    assert_eq!(sim.arena.hp(target), Some(70.0));
    assert_eq!(sim.world.shields.total(target, DamageType::Magic), 50.0);

    hit(&mut sim, attacker, target, 30.0, DamageType::Magic);
    assert_eq!(sim.arena.hp(target), Some(70.0));
    assert_eq!(sim.world.shields.total(target, DamageType::Magic), 20.0);
}

#[test]
fn pure_damage_goes_under_shields() {
    let (mut sim, attacker, target) = setup();
    sim.world
        .shields
        .add(target, 50.0, AbsorbKind::All, -1.0, 0, None);

    hit(&mut sim, attacker, target, 30.0, DamageType::Pure);
    assert_eq!(sim.arena.hp(target), Some(70.0));
    assert_eq!(sim.world.shields.total(target, DamageType::Physical), 50.0);
}

#[test]
fn shields_soak_post_armor_damage() {
    let (mut sim, attacker, target) = setup();
    // 100 armor halves physical damage at the default curve constant.
    sim.world
        .stats
        .add(target, StatKey::Armor, ModifierOp::Flat, 100.0, -1.0, None, None);
    sim.world
        .shields
        .add(target, 25.0, AbsorbKind::All, -1.0, 0, None);

    hit(&mut sim, attacker, target, 40.0, DamageType::Physical);
    // 40 raw becomes 20 after armor; the shield soaks it all.
    assert_eq!(sim.arena.hp(target), Some(100.0));
    assert_eq!(sim.world.shields.total(target, DamageType::Physical), 5.0);
}

#[test]
fn timed_shield_expires_without_breaking() {
    let (mut sim, attacker, target) = setup();
    sim.world
        .shields
        .add(target, 50.0, AbsorbKind::All, 0.3, 0, None);

    sim.advance(0.25);
    assert_eq!(sim.world.shields.total(target, DamageType::Physical), 50.0);

    sim.advance(0.25);
    assert_eq!(sim.world.shields.total(target, DamageType::Physical), 0.0);

    // Nothing left to soak.
    hit(&mut sim, attacker, target, 10.0, DamageType::Physical);
    assert_eq!(sim.arena.hp(target), Some(90.0));
}
