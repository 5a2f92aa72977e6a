mod account;
mod action;
mod body;
mod coordinates;
mod fleet;
mod player;
mod report;
mod universe;

pub use account::*;
pub use action::*;
pub use body::*;
pub use coordinates::*;
pub use fleet::*;
pub use player::*;
pub use report::*;
pub use universe::*;

use serde::{Deserialize, Serialize};

/// An amount of one catalog resource, used for cargo manifests, fuel
/// consumption, pillage and debris.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResourceAmount {
    pub resource: String,
    pub amount: f64,
}

impl ResourceAmount {
    pub fn new(resource: &str, amount: f64) -> Self {
        Self {
            resource: resource.to_string(),
            amount,
        }
    }
}

/// A count of one catalog element (ship or defense). Doubles as a level
/// entry in espionage report sections.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnitCount {
    pub element: String,
    pub count: i64,
}

impl UnitCount {
    pub fn new(element: &str, count: i64) -> Self {
        Self {
            element: element.to_string(),
            count,
        }
    }
}

pub fn total_amount(amounts: &[ResourceAmount]) -> f64 {
    amounts.iter().map(|r| r.amount).sum()
}
