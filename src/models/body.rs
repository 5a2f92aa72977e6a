use crate::models::{BodyKind, Coordinates};
use crate::util::clamp;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use uuid::Uuid;

/// Stock of one resource on a body. Production is per second and already
/// scaled by the universe production ratio; the factor models throttling
/// and stays within [0, 1].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResourceStock {
    pub resource: String,
    pub amount: f64,
    pub production: f64,
    pub storage_capacity: f64,
    pub production_factor: f64,
}

impl ResourceStock {
    pub fn new(resource: &str, amount: f64, production: f64, storage_capacity: f64) -> Self {
        Self {
            resource: resource.to_string(),
            amount,
            production,
            storage_capacity,
            production_factor: 1.0,
        }
    }

    /// Accrue production over `elapsed_secs`, clamped to the storage
    /// capacity. Never drains an overfull stock.
    pub fn accrue(&mut self, elapsed_secs: f64) {
        if self.production <= 0.0 || elapsed_secs <= 0.0 {
            return;
        }
        let produced = self.production * elapsed_secs * self.production_factor;
        if self.amount < self.storage_capacity {
            self.amount = clamp(self.amount + produced, 0.0, self.storage_capacity);
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Planet {
    pub id: Uuid,
    pub player: Uuid,
    pub universe: Uuid,
    pub coordinates: Coordinates,
    pub name: String,
    pub fields: i64,
    pub min_temperature: i64,
    pub max_temperature: i64,
    pub diameter: i64,
    pub homeworld: bool,
    pub last_activity: DateTime<Utc>,
    pub resources: Vec<ResourceStock>,
    pub buildings: HashMap<String, i64>,
    pub ships: HashMap<String, i64>,
    pub defenses: HashMap<String, i64>,
}

impl Planet {
    pub fn average_temperature(&self) -> f64 {
        (self.min_temperature + self.max_temperature) as f64 / 2.0
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Moon {
    pub id: Uuid,
    pub planet: Uuid,
    pub player: Uuid,
    pub universe: Uuid,
    pub coordinates: Coordinates,
    pub name: String,
    pub fields: i64,
    pub diameter: i64,
    pub last_activity: DateTime<Utc>,
    pub resources: Vec<ResourceStock>,
    pub buildings: HashMap<String, i64>,
    pub ships: HashMap<String, i64>,
    pub defenses: HashMap<String, i64>,
}

/// A planet or a moon: the unit of localized state and locking. Moons share
/// the planet surface (resources, hangars, queues) but produce nothing and
/// only accept moon-capable buildings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Body {
    Planet(Planet),
    Moon(Moon),
}

impl Body {
    pub fn id(&self) -> Uuid {
        match self {
            Body::Planet(p) => p.id,
            Body::Moon(m) => m.id,
        }
    }

    pub fn kind(&self) -> BodyKind {
        match self {
            Body::Planet(_) => BodyKind::Planet,
            Body::Moon(_) => BodyKind::Moon,
        }
    }

    pub fn player(&self) -> Uuid {
        match self {
            Body::Planet(p) => p.player,
            Body::Moon(m) => m.player,
        }
    }

    pub fn universe(&self) -> Uuid {
        match self {
            Body::Planet(p) => p.universe,
            Body::Moon(m) => m.universe,
        }
    }

    pub fn coordinates(&self) -> Coordinates {
        match self {
            Body::Planet(p) => p.coordinates,
            Body::Moon(m) => m.coordinates,
        }
    }

    pub fn fields(&self) -> i64 {
        match self {
            Body::Planet(p) => p.fields,
            Body::Moon(m) => m.fields,
        }
    }

    pub fn last_activity(&self) -> DateTime<Utc> {
        match self {
            Body::Planet(p) => p.last_activity,
            Body::Moon(m) => m.last_activity,
        }
    }

    pub fn set_last_activity(&mut self, at: DateTime<Utc>) {
        match self {
            Body::Planet(p) => p.last_activity = at,
            Body::Moon(m) => m.last_activity = at,
        }
    }

    /// Moons have no climate; production formulas never apply to them.
    pub fn average_temperature(&self) -> f64 {
        match self {
            Body::Planet(p) => p.average_temperature(),
            Body::Moon(_) => 0.0,
        }
    }

    pub fn resources(&self) -> &[ResourceStock] {
        match self {
            Body::Planet(p) => &p.resources,
            Body::Moon(m) => &m.resources,
        }
    }

    pub fn resources_mut(&mut self) -> &mut Vec<ResourceStock> {
        match self {
            Body::Planet(p) => &mut p.resources,
            Body::Moon(m) => &mut m.resources,
        }
    }

    pub fn buildings(&self) -> &HashMap<String, i64> {
        match self {
            Body::Planet(p) => &p.buildings,
            Body::Moon(m) => &m.buildings,
        }
    }

    pub fn buildings_mut(&mut self) -> &mut HashMap<String, i64> {
        match self {
            Body::Planet(p) => &mut p.buildings,
            Body::Moon(m) => &mut m.buildings,
        }
    }

    pub fn ships(&self) -> &HashMap<String, i64> {
        match self {
            Body::Planet(p) => &p.ships,
            Body::Moon(m) => &m.ships,
        }
    }

    pub fn ships_mut(&mut self) -> &mut HashMap<String, i64> {
        match self {
            Body::Planet(p) => &mut p.ships,
            Body::Moon(m) => &mut m.ships,
        }
    }

    pub fn defenses(&self) -> &HashMap<String, i64> {
        match self {
            Body::Planet(p) => &p.defenses,
            Body::Moon(m) => &m.defenses,
        }
    }

    pub fn defenses_mut(&mut self) -> &mut HashMap<String, i64> {
        match self {
            Body::Planet(p) => &mut p.defenses,
            Body::Moon(m) => &mut m.defenses,
        }
    }

    pub fn building_level(&self, building: &str) -> i64 {
        self.buildings().get(building).copied().unwrap_or(0)
    }

    pub fn ship_count(&self, ship: &str) -> i64 {
        self.ships().get(ship).copied().unwrap_or(0)
    }

    pub fn defense_count(&self, defense: &str) -> i64 {
        self.defenses().get(defense).copied().unwrap_or(0)
    }

    /// Each building level occupies one field.
    pub fn used_fields(&self) -> i64 {
        self.buildings().values().sum()
    }

    pub fn remaining_fields(&self) -> i64 {
        self.fields() - self.used_fields()
    }

    pub fn resource_amount(&self, resource: &str) -> f64 {
        self.resources()
            .iter()
            .find(|s| s.resource == resource)
            .map(|s| s.amount)
            .unwrap_or(0.0)
    }

    pub fn stock_mut(&mut self, resource: &str) -> Option<&mut ResourceStock> {
        self.resources_mut()
            .iter_mut()
            .find(|s| s.resource == resource)
    }

    /// Debit `amount` of a resource, failing the caller's invariant check if
    /// the stock does not cover it. The caller validates first.
    pub fn debit(&mut self, resource: &str, amount: f64) {
        if let Some(stock) = self.stock_mut(resource) {
            stock.amount = (stock.amount - amount).max(0.0);
        }
    }

    /// Credit a resource, clamped to the storage capacity. Returns the part
    /// that did not fit.
    pub fn credit(&mut self, resource: &str, amount: f64) -> f64 {
        match self.stock_mut(resource) {
            Some(stock) => {
                let free = (stock.storage_capacity - stock.amount).max(0.0);
                let stored = amount.min(free);
                stock.amount += stored;
                amount - stored
            }
            None => amount,
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_accrue_clamps_to_capacity() {
        let mut stock = ResourceStock::new("metal", 9_900.0, 1.0, 10_000.0);
        stock.accrue(50.0);
        assert_eq!(stock.amount, 9_950.0);
        stock.accrue(500.0);
        assert_eq!(stock.amount, 10_000.0);
    }

    #[test]
    fn test_accrue_respects_factor() {
        let mut stock = ResourceStock::new("metal", 0.0, 2.0, 10_000.0);
        stock.production_factor = 0.5;
        stock.accrue(100.0);
        assert_eq!(stock.amount, 100.0);
    }

    #[test]
    fn test_overfull_stock_is_not_drained() {
        // a transported surplus above capacity must survive accrual
        let mut stock = ResourceStock::new("metal", 12_000.0, 1.0, 10_000.0);
        stock.accrue(100.0);
        assert_eq!(stock.amount, 12_000.0);
    }

    #[test]
    fn test_credit_returns_overflow() {
        let mut body = Body::Planet(Planet {
            id: Uuid::new_v4(),
            player: Uuid::new_v4(),
            universe: Uuid::new_v4(),
            coordinates: Coordinates::new(1, 1, 1, BodyKind::Planet),
            name: "home".to_string(),
            fields: 163,
            min_temperature: -20,
            max_temperature: 40,
            diameter: 12_800,
            homeworld: true,
            last_activity: Utc::now(),
            resources: vec![ResourceStock::new("metal", 900.0, 0.0, 1_000.0)],
            buildings: HashMap::new(),
            ships: HashMap::new(),
            defenses: HashMap::new(),
        });
        assert_eq!(body.credit("metal", 50.0), 0.0);
        assert_eq!(body.credit("metal", 100.0), 50.0);
        assert_eq!(body.resource_amount("metal"), 1_000.0);
    }
}
