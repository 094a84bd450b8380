//! Interactive objects and their kinds

use crate::ws::protocol::{ConnId, ObjectId, ObjectInfo};

/// Object kind, encoded in the id prefix
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ObjectKind {
    /// Far anchor (ravine), 1000-3000 units out
    Hazard,
    /// Far anchor (spaceship), 4000-6000 units out
    EndGoal,
    Weapon,
    FireStarter,
    Food,
    Medkit,
    Oxygen,
    Radio,
    Compass,
    Instructions,
    Rope,
    FoodPill,
    LifePill,
    OxygenPill,
}

impl ObjectKind {
    /// Every kind, longest prefixes first so id parsing is unambiguous
    #[cfg(test)]
    pub const ALL: [ObjectKind; 14] = [
        ObjectKind::Hazard,
        ObjectKind::Rope,
        ObjectKind::FoodPill,
        ObjectKind::LifePill,
        ObjectKind::OxygenPill,
        ObjectKind::EndGoal,
        ObjectKind::Weapon,
        ObjectKind::FireStarter,
        ObjectKind::Food,
        ObjectKind::Medkit,
        ObjectKind::Oxygen,
        ObjectKind::Radio,
        ObjectKind::Compass,
        ObjectKind::Instructions,
    ];

    pub fn prefix(self) -> &'static str {
        match self {
            Self::Hazard => "BR",
            Self::EndGoal => "S",
            Self::Weapon => "G",
            Self::FireStarter => "M",
            Self::Food => "A",
            Self::Medkit => "F",
            Self::Oxygen => "O",
            Self::Radio => "R",
            Self::Compass => "C",
            Self::Instructions => "I",
            Self::Rope => "ER",
            Self::FoodPill => "EF",
            Self::LifePill => "EL",
            Self::OxygenPill => "EO",
        }
    }

    /// Parse the kind out of an id such as `ER4`
    #[cfg(test)]
    pub fn of(id: &ObjectId) -> Option<Self> {
        let raw = id.as_str();
        Self::ALL.into_iter().find(|kind| {
            raw.strip_prefix(kind.prefix())
                .is_some_and(|rest| !rest.is_empty() && rest.bytes().all(|b| b.is_ascii_digit()))
        })
    }

    /// Only these kinds accept the `fixed` flag
    pub fn is_repairable(self) -> bool {
        matches!(self, Self::Radio | Self::EndGoal)
    }

    pub fn is_anchor(self) -> bool {
        matches!(self, Self::Hazard | Self::EndGoal)
    }
}

/// Interactive object (authoritative)
#[derive(Debug, Clone, PartialEq)]
pub struct WorldObject {
    pub id: ObjectId,
    pub kind: ObjectKind,
    pub x: f64,
    pub y: f64,
    /// Current holder; `Some` is the wire-level `onPlayer`
    pub held_by: Option<ConnId>,
    /// One-way: never reset within a round
    pub used: bool,
    /// One-way: never reset within a round
    pub fixed: bool,
}

impl WorldObject {
    pub fn new(kind: ObjectKind, index: usize, x: f64, y: f64) -> Self {
        Self {
            id: ObjectId::new(kind.prefix(), index),
            kind,
            x,
            y,
            held_by: None,
            used: false,
            fixed: false,
        }
    }

    pub fn on_player(&self) -> bool {
        self.held_by.is_some()
    }

    pub fn is_held_by_other(&self, player: &ConnId) -> bool {
        self.held_by.as_ref().is_some_and(|holder| holder != player)
    }

    pub fn info(&self) -> ObjectInfo {
        ObjectInfo {
            id: self.id.clone(),
            x: self.x,
            y: self.y,
            on_player: self.on_player(),
            used: self.used,
            fixed: self.fixed,
        }
    }
}
