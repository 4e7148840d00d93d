//! The staged damage/heal pipeline.

use std::collections::BTreeSet;

use super::{DamageFlags, DamageType};
use crate::arena::ComponentArena;
use crate::config::SimConfig;
use crate::entity::Entity;
use crate::events::EventBus;
use crate::rng::SimRng;
use crate::shield::ShieldStore;
use crate::stats::StatModifierStore;

/// Mutable working state of one damage instance as it moves through the
/// stages. Hooks read and rewrite `amount`; everything else is bookkeeping
/// they may inspect or annotate.
#[derive(Clone, Debug, PartialEq)]
pub struct DamageContext {
    pub source: Option<Entity>,
    pub target: Entity,
    /// The amount the caller requested, before any hook touched it.
    pub base_amount: f32,
    /// The running amount; after mitigation this is the HP damage.
    pub amount: f32,
    pub damage_type: DamageType,
    pub flags: DamageFlags,
    /// Free-form annotations hooks use to talk to later hooks.
    pub tags: BTreeSet<String>,
    /// Damage soaked by shields instead of HP.
    pub shield_absorbed: f32,
    pub previous_hp: f32,
    pub did_kill: bool,
}

/// Mutable working state of one heal instance.
#[derive(Clone, Debug, PartialEq)]
pub struct HealContext {
    pub source: Option<Entity>,
    pub target: Entity,
    pub base_amount: f32,
    pub amount: f32,
    pub tags: BTreeSet<String>,
    pub previous_hp: f32,
    /// HP actually restored after the max-HP clamp.
    pub actual_healed: f32,
}

/// Everything a hook may touch besides the context. The caller splits these
/// borrows off the owning state so the pipeline itself can stay shared.
pub struct PipelineDeps<'a> {
    pub arena: &'a mut ComponentArena,
    pub stats: &'a StatModifierStore,
    pub shields: &'a mut ShieldStore,
    pub rng: &'a mut SimRng,
    pub events: &'a mut EventBus,
    pub config: &'a SimConfig,
}

pub type DamageHook =
    Box<dyn Fn(&DamagePipeline, &mut DamageContext, &mut PipelineDeps<'_>) + Send + Sync>;
pub type HealHook =
    Box<dyn Fn(&DamagePipeline, &mut HealContext, &mut PipelineDeps<'_>) + Send + Sync>;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DamageStage {
    /// Amount shaping before mitigation: crits, execute scaling.
    PreMitigation,
    /// Resists, flat reduction, shields.
    Mitigation,
    /// Runs after HP is written: lifesteal, on-hit procs.
    PostDamage,
    /// Runs only when the hit dropped the target to zero.
    OnKill,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum HealStage {
    /// Amount shaping before HP is written: heal power, anti-heal.
    PreHeal,
    /// Runs after HP is written.
    PostHeal,
}

/// Ordered hook lists per stage. Hooks within a stage run in registration
/// order; registration happens once at world construction, which keeps the
/// order deterministic across runs.
#[derive(Default)]
pub struct DamagePipeline {
    pre_mitigation: Vec<DamageHook>,
    mitigation: Vec<DamageHook>,
    post_damage: Vec<DamageHook>,
    on_kill: Vec<DamageHook>,
    pre_heal: Vec<HealHook>,
    post_heal: Vec<HealHook>,
}

impl DamagePipeline {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, stage: DamageStage, hook: DamageHook) {
        match stage {
            DamageStage::PreMitigation => self.pre_mitigation.push(hook),
            DamageStage::Mitigation => self.mitigation.push(hook),
            DamageStage::PostDamage => self.post_damage.push(hook),
            DamageStage::OnKill => self.on_kill.push(hook),
        }
    }

    pub fn register_heal(&mut self, stage: HealStage, hook: HealHook) {
        match stage {
            HealStage::PreHeal => self.pre_heal.push(hook),
            HealStage::PostHeal => self.post_heal.push(hook),
        }
    }

    /// Remove every hook. Test isolation only.
    pub fn clear(&mut self) {
        self.pre_mitigation.clear();
        self.mitigation.clear();
        self.post_damage.clear();
        self.on_kill.clear();
        self.pre_heal.clear();
        self.post_heal.clear();
    }

    /// Run one damage instance through the stages and apply it to HP.
    ///
    /// Returns `None` without side effects when the target handle is stale
    /// or the target is already at zero HP. The returned context carries the
    /// final numbers for callers that need them (tests, on-hit effects).
    pub fn apply_damage(
        &self,
        deps: &mut PipelineDeps<'_>,
        source: Option<Entity>,
        target: Entity,
        amount: f32,
        damage_type: DamageType,
        flags: DamageFlags,
    ) -> Option<DamageContext> {
        let previous_hp = deps.arena.hp(target)?;
        if previous_hp <= 0.0 {
            return None;
        }

        let mut ctx = DamageContext {
            source,
            target,
            base_amount: amount,
            amount,
            damage_type,
            flags,
            tags: BTreeSet::new(),
            shield_absorbed: 0.0,
            previous_hp,
            did_kill: false,
        };

        for hook in &self.pre_mitigation {
            hook(self, &mut ctx, deps);
        }
        for hook in &self.mitigation {
            hook(self, &mut ctx, deps);
        }
        ctx.amount = ctx.amount.max(0.0);

        let new_hp = (previous_hp - ctx.amount).max(0.0);
        deps.arena.set_hp(target, new_hp);
        ctx.did_kill = new_hp <= 0.0;
        tracing::trace!(
            source = ?ctx.source,
            %target,
            amount = ctx.amount,
            absorbed = ctx.shield_absorbed,
            kind = %ctx.damage_type,
            killed = ctx.did_kill,
            "damage applied"
        );
        deps.events
            .emit_combat(source, target, ctx.amount, damage_type, ctx.flags, ctx.did_kill);

        for hook in &self.post_damage {
            hook(self, &mut ctx, deps);
        }
        if ctx.did_kill {
            for hook in &self.on_kill {
                hook(self, &mut ctx, deps);
            }
        }
        Some(ctx)
    }

    /// Run one heal through the heal stages and apply it to HP. Healing a
    /// stale handle or a zero-HP target is a no-op.
    pub fn apply_heal(
        &self,
        deps: &mut PipelineDeps<'_>,
        source: Option<Entity>,
        target: Entity,
        amount: f32,
    ) -> Option<HealContext> {
        self.apply_heal_tagged(deps, source, target, amount, &[])
    }

    /// [`apply_heal`](Self::apply_heal) with annotation tags visible to the
    /// heal hooks (the lifesteal hook tags its heals, for example).
    pub fn apply_heal_tagged(
        &self,
        deps: &mut PipelineDeps<'_>,
        source: Option<Entity>,
        target: Entity,
        amount: f32,
        tags: &[&str],
    ) -> Option<HealContext> {
        let previous_hp = deps.arena.hp(target)?;
        if previous_hp <= 0.0 {
            return None;
        }

        let mut ctx = HealContext {
            source,
            target,
            base_amount: amount,
            amount,
            tags: tags.iter().map(|t| (*t).to_owned()).collect(),
            previous_hp,
            actual_healed: 0.0,
        };

        for hook in &self.pre_heal {
            hook(self, &mut ctx, deps);
        }
        ctx.amount = ctx.amount.max(0.0);

        let hp_max = deps.arena.hp_max(target)?;
        let new_hp = (previous_hp + ctx.amount).min(hp_max);
        ctx.actual_healed = new_hp - previous_hp;
        deps.arena.set_hp(target, new_hp);
        deps.events.emit_heal(source, target, ctx.actual_healed);

        for hook in &self.post_heal {
            hook(self, &mut ctx, deps);
        }
        Some(ctx)
    }
}

impl core::fmt::Debug for DamagePipeline {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("DamagePipeline")
            .field("pre_mitigation", &self.pre_mitigation.len())
            .field("mitigation", &self.mitigation.len())
            .field("post_damage", &self.post_damage.len())
            .field("on_kill", &self.on_kill.len())
            .field("pre_heal", &self.pre_heal.len())
            .field("post_heal", &self.post_heal.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entity::{Faction, Position};

    fn fixture() -> (ComponentArena, StatModifierStore, ShieldStore, SimRng, EventBus, SimConfig) {
        (
            ComponentArena::new(),
            StatModifierStore::new(),
            ShieldStore::new(),
            SimRng::new(1),
            EventBus::new(),
            SimConfig::default(),
        )
    }

    macro_rules! deps {
        ($arena:ident, $stats:ident, $shields:ident, $rng:ident, $events:ident, $config:ident) => {
            PipelineDeps {
                arena: &mut $arena,
                stats: &$stats,
                shields: &mut $shields,
                rng: &mut $rng,
                events: &mut $events,
                config: &$config,
            }
        };
    }

    #[test]
    fn bare_pipeline_applies_raw_amount() {
        let (mut arena, stats, mut shields, mut rng, mut events, config) = fixture();
        let target = arena.spawn(100.0, Position::default(), Faction(1));
        let pipeline = DamagePipeline::new();

        let ctx = pipeline
            .apply_damage(
                &mut deps!(arena, stats, shields, rng, events, config),
                None,
                target,
                30.0,
                DamageType::Physical,
                DamageFlags::empty(),
            )
            .unwrap();
        assert_eq!(ctx.amount, 30.0);
        assert!(!ctx.did_kill);
        assert_eq!(arena.hp(target), Some(70.0));
    }

    #[test]
    fn negative_amount_is_clamped_to_zero() {
        let (mut arena, stats, mut shields, mut rng, mut events, config) = fixture();
        let target = arena.spawn(100.0, Position::default(), Faction(1));
        let mut pipeline = DamagePipeline::new();
        pipeline.register(
            DamageStage::Mitigation,
            Box::new(|_, ctx, _| ctx.amount -= 1000.0),
        );

        let ctx = pipeline
            .apply_damage(
                &mut deps!(arena, stats, shields, rng, events, config),
                None,
                target,
                5.0,
                DamageType::Magic,
                DamageFlags::empty(),
            )
            .unwrap();
        assert_eq!(ctx.amount, 0.0);
        assert_eq!(arena.hp(target), Some(100.0));
    }

    #[test]
    fn kill_runs_on_kill_hooks_once() {
        let (mut arena, stats, mut shields, mut rng, mut events, config) = fixture();
        let target = arena.spawn(20.0, Position::default(), Faction(1));
        let mut pipeline = DamagePipeline::new();
        pipeline.register(
            DamageStage::OnKill,
            Box::new(|_, ctx, _| {
                ctx.tags.insert("kill_seen".into());
            }),
        );

        let mut d = deps!(arena, stats, shields, rng, events, config);
        let ctx = pipeline
            .apply_damage(&mut d, None, target, 25.0, DamageType::True, DamageFlags::empty())
            .unwrap();
        assert!(ctx.did_kill);
        assert!(ctx.tags.contains("kill_seen"));

        // A second hit on the zero-HP target is a no-op.
        let again =
            pipeline.apply_damage(&mut d, None, target, 25.0, DamageType::True, DamageFlags::empty());
        assert!(again.is_none());
    }

    #[test]
    fn stale_target_is_a_no_op() {
        let (mut arena, stats, mut shields, mut rng, mut events, config) = fixture();
        let target = arena.spawn(100.0, Position::default(), Faction(1));
        arena.despawn(target);
        let pipeline = DamagePipeline::new();

        let mut d = deps!(arena, stats, shields, rng, events, config);
        assert!(
            pipeline
                .apply_damage(&mut d, None, target, 10.0, DamageType::Physical, DamageFlags::empty())
                .is_none()
        );
        assert!(pipeline.apply_heal(&mut d, None, target, 10.0).is_none());
    }

    #[test]
    fn heal_clamps_at_max_and_reports_actual() {
        let (mut arena, stats, mut shields, mut rng, mut events, config) = fixture();
        let target = arena.spawn(100.0, Position::default(), Faction(0));
        arena.set_hp(target, 90.0);
        let pipeline = DamagePipeline::new();

        let ctx = pipeline
            .apply_heal(
                &mut deps!(arena, stats, shields, rng, events, config),
                None,
                target,
                25.0,
            )
            .unwrap();
        assert_eq!(ctx.actual_healed, 10.0);
        assert_eq!(arena.hp(target), Some(100.0));
    }
}
