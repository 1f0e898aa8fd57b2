//! Upgrade pool and effect dispatch
//!
//! Every upgrade is plain data: a rarity tag for presentation and an
//! `UpgradeEffect` describing what it does to the player. `apply_upgrade` is
//! the only place effects touch the player.

use rand::Rng;
use rand::seq::index;

use super::state::{Player, PlayerStats};

/// Presentation tier of an upgrade
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Rarity {
    Common,
    Rare,
    Legendary,
    /// Strong boon paired with a drawback
    Corrupted,
}

impl Rarity {
    /// Relative draw weight when rarity-weighted drawing is enabled
    pub fn weight(self) -> f64 {
        match self {
            Rarity::Common => 60.0,
            Rarity::Rare => 25.0,
            Rarity::Legendary => 10.0,
            Rarity::Corrupted => 5.0,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Rarity::Common => "Common",
            Rarity::Rare => "Rare",
            Rarity::Legendary => "Legendary",
            Rarity::Corrupted => "Corrupted",
        }
    }
}

/// Continuous player attributes an upgrade can scale or add to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stat {
    Speed,
    Damage,
    FireRate,
    DashCooldown,
    Lifesteal,
    MaxHealth,
}

/// Integer attributes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Counter {
    Projectiles,
    Orbitals,
}

/// On/off attributes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flag {
    Piercing,
    Homing,
    GravityDash,
}

impl Flag {
    pub fn is_set(self, stats: &PlayerStats) -> bool {
        match self {
            Flag::Piercing => stats.piercing,
            Flag::Homing => stats.homing,
            Flag::GravityDash => stats.has_gravity_dash,
        }
    }
}

/// What an upgrade does
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum UpgradeEffect {
    /// Multiply a stat
    Scale { stat: Stat, factor: f32 },
    /// Add to a stat
    Add { stat: Stat, amount: f32 },
    Increment { counter: Counter, amount: u32 },
    Enable(Flag),
    /// Scale one stat up and another down
    Tradeoff {
        boon: (Stat, f32),
        cost: (Stat, f32),
    },
}

/// One entry of the upgrade pool
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Upgrade {
    pub name: &'static str,
    pub description: &'static str,
    pub rarity: Rarity,
    pub effect: UpgradeEffect,
}

impl Upgrade {
    /// Flag upgrades already owned are not offered again
    pub fn is_available(&self, stats: &PlayerStats) -> bool {
        match self.effect {
            UpgradeEffect::Enable(flag) => !flag.is_set(stats),
            _ => true,
        }
    }
}

pub static UPGRADE_POOL: &[Upgrade] = &[
    Upgrade {
        name: "Overclock",
        description: "Fire rate +20%",
        rarity: Rarity::Common,
        effect: UpgradeEffect::Scale {
            stat: Stat::FireRate,
            factor: 1.2,
        },
    },
    Upgrade {
        name: "Hardened Rounds",
        description: "Damage +25%",
        rarity: Rarity::Common,
        effect: UpgradeEffect::Scale {
            stat: Stat::Damage,
            factor: 1.25,
        },
    },
    Upgrade {
        name: "Thrusters",
        description: "Move speed +15%",
        rarity: Rarity::Common,
        effect: UpgradeEffect::Scale {
            stat: Stat::Speed,
            factor: 1.15,
        },
    },
    Upgrade {
        name: "Phase Coils",
        description: "Dash cooldown -20%",
        rarity: Rarity::Common,
        effect: UpgradeEffect::Scale {
            stat: Stat::DashCooldown,
            factor: 0.8,
        },
    },
    Upgrade {
        name: "Reinforced Hull",
        description: "Max health +20",
        rarity: Rarity::Common,
        effect: UpgradeEffect::Add {
            stat: Stat::MaxHealth,
            amount: 20.0,
        },
    },
    Upgrade {
        name: "Split Shot",
        description: "+1 projectile per volley",
        rarity: Rarity::Rare,
        effect: UpgradeEffect::Increment {
            counter: Counter::Projectiles,
            amount: 1,
        },
    },
    Upgrade {
        name: "Blade Orbit",
        description: "+1 orbiting blade",
        rarity: Rarity::Rare,
        effect: UpgradeEffect::Increment {
            counter: Counter::Orbitals,
            amount: 1,
        },
    },
    Upgrade {
        name: "Vampiric Rounds",
        description: "10% chance per hit to heal 1 hp",
        rarity: Rarity::Rare,
        effect: UpgradeEffect::Add {
            stat: Stat::Lifesteal,
            amount: 0.1,
        },
    },
    Upgrade {
        name: "Piercing Rounds",
        description: "Bullets pass through enemies",
        rarity: Rarity::Rare,
        effect: UpgradeEffect::Enable(Flag::Piercing),
    },
    Upgrade {
        name: "Seeker Rounds",
        description: "Bullets steer toward nearby enemies",
        rarity: Rarity::Legendary,
        effect: UpgradeEffect::Enable(Flag::Homing),
    },
    Upgrade {
        name: "Singularity Dash",
        description: "Dashing leaves a gravity well behind",
        rarity: Rarity::Legendary,
        effect: UpgradeEffect::Enable(Flag::GravityDash),
    },
    Upgrade {
        name: "Glass Cannon",
        description: "Double damage, half max health",
        rarity: Rarity::Corrupted,
        effect: UpgradeEffect::Tradeoff {
            boon: (Stat::Damage, 2.0),
            cost: (Stat::MaxHealth, 0.5),
        },
    },
    Upgrade {
        name: "Unstable Core",
        description: "Fire rate +60%, move speed -20%",
        rarity: Rarity::Corrupted,
        effect: UpgradeEffect::Tradeoff {
            boon: (Stat::FireRate, 1.6),
            cost: (Stat::Speed, 0.8),
        },
    },
];

fn scale_stat(player: &mut Player, stat: Stat, factor: f32) {
    let stats = &mut player.stats;
    match stat {
        Stat::Speed => stats.speed_mult *= factor,
        Stat::Damage => stats.damage_mult *= factor,
        Stat::FireRate => stats.fire_rate_mult *= factor,
        Stat::DashCooldown => stats.dash_cooldown_mult *= factor,
        Stat::Lifesteal => stats.lifesteal_chance = (stats.lifesteal_chance * factor).clamp(0.0, 1.0),
        Stat::MaxHealth => {
            player.max_hp = (player.max_hp * factor).max(1.0);
            player.hp = player.hp.min(player.max_hp);
        }
    }
}

fn add_stat(player: &mut Player, stat: Stat, amount: f32) {
    let stats = &mut player.stats;
    match stat {
        Stat::Speed => stats.speed_mult += amount,
        Stat::Damage => stats.damage_mult += amount,
        Stat::FireRate => stats.fire_rate_mult += amount,
        Stat::DashCooldown => stats.dash_cooldown_mult += amount,
        Stat::Lifesteal => stats.lifesteal_chance = (stats.lifesteal_chance + amount).clamp(0.0, 1.0),
        Stat::MaxHealth => {
            player.max_hp = (player.max_hp + amount).max(1.0);
            if amount > 0.0 {
                player.heal(amount);
            }
            player.hp = player.hp.min(player.max_hp);
        }
    }
}

/// Apply an upgrade effect to the player
pub fn apply_upgrade(player: &mut Player, effect: &UpgradeEffect) {
    match *effect {
        UpgradeEffect::Scale { stat, factor } => scale_stat(player, stat, factor),
        UpgradeEffect::Add { stat, amount } => add_stat(player, stat, amount),
        UpgradeEffect::Increment { counter, amount } => match counter {
            Counter::Projectiles => player.stats.projectile_count += amount,
            Counter::Orbitals => player.stats.orbital_count += amount,
        },
        UpgradeEffect::Enable(flag) => match flag {
            Flag::Piercing => player.stats.piercing = true,
            Flag::Homing => player.stats.homing = true,
            Flag::GravityDash => player.stats.has_gravity_dash = true,
        },
        UpgradeEffect::Tradeoff { boon, cost } => {
            scale_stat(player, boon.0, boon.1);
            scale_stat(player, cost.0, cost.1);
        }
    }
}

/// Draw up to `count` distinct pool indices from the available upgrades
///
/// Uniform by default; `weighted` samples by rarity weight instead.
pub fn draw_choices<R: Rng + ?Sized>(
    rng: &mut R,
    pool: &[Upgrade],
    stats: &PlayerStats,
    count: usize,
    weighted: bool,
) -> Vec<usize> {
    let available: Vec<usize> = pool
        .iter()
        .enumerate()
        .filter(|(_, u)| u.is_available(stats))
        .map(|(i, _)| i)
        .collect();
    let amount = count.min(available.len());

    if weighted {
        match index::sample_weighted(rng, available.len(), |i| pool[available[i]].rarity.weight(), amount) {
            Ok(picked) => return picked.into_iter().map(|i| available[i]).collect(),
            Err(err) => log::warn!("Weighted upgrade draw failed ({err}), drawing uniformly"),
        }
    }
    index::sample(rng, available.len(), amount)
        .into_iter()
        .map(|i| available[i])
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tuning::Tuning;
    use rand::SeedableRng;
    use rand_pcg::Pcg32;
    use std::collections::HashSet;

    fn player() -> Player {
        Player::new(&Tuning::default())
    }

    fn find(name: &str) -> &'static Upgrade {
        UPGRADE_POOL.iter().find(|u| u.name == name).unwrap()
    }

    #[test]
    fn test_scale_and_add() {
        let mut p = player();
        apply_upgrade(&mut p, &find("Hardened Rounds").effect);
        assert!((p.stats.damage_mult - 1.25).abs() < 1e-6);
        apply_upgrade(&mut p, &find("Vampiric Rounds").effect);
        assert!((p.stats.lifesteal_chance - 0.1).abs() < 1e-6);
        apply_upgrade(&mut p, &find("Split Shot").effect);
        assert_eq!(p.stats.projectile_count, 2);
        apply_upgrade(&mut p, &find("Piercing Rounds").effect);
        assert!(p.stats.piercing);
    }

    #[test]
    fn test_max_health_add_heals() {
        let mut p = player();
        p.hp = 50.0;
        apply_upgrade(&mut p, &find("Reinforced Hull").effect);
        assert_eq!(p.max_hp, 120.0);
        assert_eq!(p.hp, 70.0);
    }

    #[test]
    fn test_glass_cannon_clamps_health() {
        let mut p = player();
        apply_upgrade(&mut p, &find("Glass Cannon").effect);
        assert_eq!(p.stats.damage_mult, 2.0);
        assert_eq!(p.max_hp, 50.0);
        assert_eq!(p.hp, 50.0);

        let mut hurt = player();
        hurt.hp = 30.0;
        apply_upgrade(&mut hurt, &find("Glass Cannon").effect);
        assert_eq!(hurt.hp, 30.0);
    }

    #[test]
    fn test_lifesteal_capped() {
        let mut p = player();
        for _ in 0..20 {
            apply_upgrade(&mut p, &find("Vampiric Rounds").effect);
        }
        assert_eq!(p.stats.lifesteal_chance, 1.0);
    }

    #[test]
    fn test_owned_flags_unavailable() {
        let mut stats = PlayerStats::default();
        assert!(find("Seeker Rounds").is_available(&stats));
        stats.homing = true;
        assert!(!find("Seeker Rounds").is_available(&stats));
        assert!(find("Overclock").is_available(&stats));
    }

    #[test]
    fn test_draw_is_distinct_and_sized() {
        let mut rng = Pcg32::seed_from_u64(9);
        let stats = PlayerStats::default();
        for _ in 0..50 {
            let picks = draw_choices(&mut rng, UPGRADE_POOL, &stats, 3, false);
            assert_eq!(picks.len(), 3);
            let unique: HashSet<_> = picks.iter().collect();
            assert_eq!(unique.len(), 3);
        }
    }

    #[test]
    fn test_draw_skips_owned_flags() {
        let mut rng = Pcg32::seed_from_u64(10);
        let stats = PlayerStats {
            piercing: true,
            homing: true,
            has_gravity_dash: true,
            ..Default::default()
        };
        for _ in 0..50 {
            for weighted in [false, true] {
                let picks = draw_choices(&mut rng, UPGRADE_POOL, &stats, 3, weighted);
                assert_eq!(picks.len(), 3);
                assert!(picks.iter().all(|&i| UPGRADE_POOL[i].is_available(&stats)));
            }
        }
    }

    #[test]
    fn test_draw_from_small_pool() {
        let mut rng = Pcg32::seed_from_u64(11);
        let pool = &UPGRADE_POOL[..2];
        let picks = draw_choices(&mut rng, pool, &PlayerStats::default(), 3, true);
        assert_eq!(picks.len(), 2);
    }
}
