//! Round layout generation

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

use super::object::{ObjectKind, WorldObject};

/// Fixed y for far anchors
pub const ANCHOR_Y: f64 = 200.0;

/// How many instances of a pickup category to place
#[derive(Debug, Clone, Copy)]
enum Count {
    Between(u32, u32),
    Exactly(u32),
}

/// Placement rule for one pickup category
#[derive(Debug, Clone, Copy)]
struct Placement {
    kind: ObjectKind,
    count: Count,
    x: (i32, i32),
    y: (i32, i32),
}

const WIDE_X: (i32, i32) = (-1000, 1000);
const NARROW_X: (i32, i32) = (-100, 100);
const GROUND_Y: (i32, i32) = (200, 700);

const fn pickup(kind: ObjectKind, x: (i32, i32)) -> Placement {
    Placement {
        kind,
        count: Count::Between(3, 10),
        x,
        y: GROUND_Y,
    }
}

const fn pill(kind: ObjectKind) -> Placement {
    Placement {
        kind,
        count: Count::Exactly(10),
        x: WIDE_X,
        y: GROUND_Y,
    }
}

const PICKUPS: [Placement; 9] = [
    pickup(ObjectKind::Weapon, WIDE_X),
    pickup(ObjectKind::FireStarter, WIDE_X),
    pickup(ObjectKind::Food, WIDE_X),
    pickup(ObjectKind::Medkit, WIDE_X),
    pickup(ObjectKind::Oxygen, WIDE_X),
    pickup(ObjectKind::Radio, WIDE_X),
    pickup(ObjectKind::Compass, WIDE_X),
    pickup(ObjectKind::Instructions, NARROW_X),
    pickup(ObjectKind::Rope, WIDE_X),
];

const PILLS: [Placement; 3] = [
    pill(ObjectKind::FoodPill),
    pill(ObjectKind::LifePill),
    pill(ObjectKind::OxygenPill),
];

/// Produces a fresh object layout for every round
#[derive(Debug, Clone)]
pub struct RoundGenerator {
    rng: ChaCha8Rng,
    enable_pills: bool,
}

impl RoundGenerator {
    pub fn new(seed: Option<u64>, enable_pills: bool) -> Self {
        let rng = match seed {
            Some(seed) => ChaCha8Rng::seed_from_u64(seed),
            None => ChaCha8Rng::from_entropy(),
        };
        Self { rng, enable_pills }
    }

    /// Build a complete layout: hazard, pickups, then the end goal.
    /// Both anchors share one side of the origin.
    pub fn generate(&mut self) -> Vec<WorldObject> {
        let side = if self.rng.gen_bool(0.5) { 1.0 } else { -1.0 };
        let mut objects = Vec::new();

        let hazard_x = side * f64::from(self.rng.gen_range(1000..=3000));
        objects.push(WorldObject::new(ObjectKind::Hazard, 0, hazard_x, ANCHOR_Y));

        let pills: &[Placement] = if self.enable_pills { &PILLS } else { &[] };
        for placement in PICKUPS.iter().chain(pills) {
            let count = match placement.count {
                Count::Between(lo, hi) => self.rng.gen_range(lo..=hi),
                Count::Exactly(n) => n,
            };
            for index in 0..count as usize {
                let x = self.rng.gen_range(placement.x.0..=placement.x.1);
                let y = self.rng.gen_range(placement.y.0..=placement.y.1);
                objects.push(WorldObject::new(
                    placement.kind,
                    index,
                    f64::from(x),
                    f64::from(y),
                ));
            }
        }

        let goal_x = side * f64::from(self.rng.gen_range(4000..=6000));
        objects.push(WorldObject::new(ObjectKind::EndGoal, 0, goal_x, ANCHOR_Y));

        objects
    }
}
