//! The standard element set. Stats follow the classic space-4X baseline:
//! hull equals the metal + crystal cost, storage doubles per level, mines
//! grow at 1.1^level.

use super::*;
use crate::models::BodyKind;
use maplit::hashmap;

fn progress(base: HashMap<&'static str, f64>, progression: f64) -> CostProgression {
    CostProgression { base, progression }
}

fn prereq(element: &'static str, level: i64) -> Prerequisite {
    Prerequisite { element, level }
}

pub fn standard() -> Catalog {
    let resources = vec![
        ResourceDesc {
            key: RESOURCE_METAL,
            name: "metal",
            base_storage: 10_000.0,
            base_production: 30.0,
            starting_amount: 500.0,
            movable: true,
            dispersable: true,
        },
        ResourceDesc {
            key: RESOURCE_CRYSTAL,
            name: "crystal",
            base_storage: 10_000.0,
            base_production: 15.0,
            starting_amount: 500.0,
            movable: true,
            dispersable: true,
        },
        ResourceDesc {
            key: RESOURCE_DEUTERIUM,
            name: "deuterium",
            base_storage: 10_000.0,
            base_production: 0.0,
            starting_amount: 0.0,
            movable: true,
            dispersable: false,
        },
    ];

    let buildings = vec![
        BuildingDesc {
            key: "metal_mine",
            name: "metal mine",
            cost: progress(hashmap! {"metal" => 60.0, "crystal" => 15.0}, 1.5),
            production: vec![ProductionRule {
                resource: RESOURCE_METAL,
                base: 30.0,
                progression: 1.1,
                temperature_offset: 1.0,
                temperature_factor: 0.0,
            }],
            storage: vec![],
            fields_delta: 0,
            allowed_on: BodyAllowance::PlanetOnly,
            prerequisites: vec![],
        },
        BuildingDesc {
            key: "crystal_mine",
            name: "crystal mine",
            cost: progress(hashmap! {"metal" => 48.0, "crystal" => 24.0}, 1.6),
            production: vec![ProductionRule {
                resource: RESOURCE_CRYSTAL,
                base: 20.0,
                progression: 1.1,
                temperature_offset: 1.0,
                temperature_factor: 0.0,
            }],
            storage: vec![],
            fields_delta: 0,
            allowed_on: BodyAllowance::PlanetOnly,
            prerequisites: vec![],
        },
        BuildingDesc {
            key: "deuterium_synthesizer",
            name: "deuterium synthesizer",
            cost: progress(hashmap! {"metal" => 225.0, "crystal" => 75.0}, 1.5),
            production: vec![ProductionRule {
                resource: RESOURCE_DEUTERIUM,
                base: 10.0,
                progression: 1.1,
                temperature_offset: 1.44,
                temperature_factor: -0.004,
            }],
            storage: vec![],
            fields_delta: 0,
            allowed_on: BodyAllowance::PlanetOnly,
            prerequisites: vec![],
        },
        BuildingDesc {
            key: BUILDING_ROBOTICS,
            name: "robotics factory",
            cost: progress(
                hashmap! {"metal" => 400.0, "crystal" => 120.0, "deuterium" => 200.0},
                2.0,
            ),
            production: vec![],
            storage: vec![],
            fields_delta: 0,
            allowed_on: BodyAllowance::Any,
            prerequisites: vec![],
        },
        BuildingDesc {
            key: BUILDING_NANITE,
            name: "nanite factory",
            cost: progress(
                hashmap! {"metal" => 1_000_000.0, "crystal" => 500_000.0, "deuterium" => 100_000.0},
                2.0,
            ),
            production: vec![],
            storage: vec![],
            fields_delta: 0,
            allowed_on: BodyAllowance::PlanetOnly,
            prerequisites: vec![prereq(BUILDING_ROBOTICS, 10), prereq("computers", 10)],
        },
        BuildingDesc {
            key: BUILDING_SHIPYARD,
            name: "shipyard",
            cost: progress(
                hashmap! {"metal" => 400.0, "crystal" => 200.0, "deuterium" => 100.0},
                2.0,
            ),
            production: vec![],
            storage: vec![],
            fields_delta: 0,
            allowed_on: BodyAllowance::Any,
            prerequisites: vec![prereq(BUILDING_ROBOTICS, 2)],
        },
        BuildingDesc {
            key: BUILDING_RESEARCH_LAB,
            name: "research lab",
            cost: progress(
                hashmap! {"metal" => 200.0, "crystal" => 400.0, "deuterium" => 200.0},
                2.0,
            ),
            production: vec![],
            storage: vec![],
            fields_delta: 0,
            allowed_on: BodyAllowance::PlanetOnly,
            prerequisites: vec![],
        },
        BuildingDesc {
            key: "metal_storage",
            name: "metal storage",
            cost: progress(hashmap! {"metal" => 1_000.0}, 2.0),
            production: vec![],
            storage: vec![StorageRule {
                resource: RESOURCE_METAL,
                base: 5_000.0,
                multiplier: 2.0,
            }],
            fields_delta: 0,
            allowed_on: BodyAllowance::PlanetOnly,
            prerequisites: vec![],
        },
        BuildingDesc {
            key: "crystal_storage",
            name: "crystal storage",
            cost: progress(hashmap! {"metal" => 1_000.0, "crystal" => 500.0}, 2.0),
            production: vec![],
            storage: vec![StorageRule {
                resource: RESOURCE_CRYSTAL,
                base: 5_000.0,
                multiplier: 2.0,
            }],
            fields_delta: 0,
            allowed_on: BodyAllowance::PlanetOnly,
            prerequisites: vec![],
        },
        BuildingDesc {
            key: "deuterium_tank",
            name: "deuterium tank",
            cost: progress(hashmap! {"metal" => 1_000.0, "crystal" => 1_000.0}, 2.0),
            production: vec![],
            storage: vec![StorageRule {
                resource: RESOURCE_DEUTERIUM,
                base: 5_000.0,
                multiplier: 2.0,
            }],
            fields_delta: 0,
            allowed_on: BodyAllowance::PlanetOnly,
            prerequisites: vec![],
        },
        BuildingDesc {
            key: "lunar_base",
            name: "lunar base",
            cost: progress(
                hashmap! {"metal" => 20_000.0, "crystal" => 40_000.0, "deuterium" => 20_000.0},
                2.0,
            ),
            production: vec![],
            storage: vec![],
            fields_delta: 3,
            allowed_on: BodyAllowance::MoonOnly,
            prerequisites: vec![],
        },
    ];

    let technologies = vec![
        TechnologyDesc {
            key: "espionage",
            name: "espionage",
            cost: progress(
                hashmap! {"metal" => 200.0, "crystal" => 1_000.0, "deuterium" => 200.0},
                2.0,
            ),
            prerequisites: vec![prereq(BUILDING_RESEARCH_LAB, 3)],
        },
        TechnologyDesc {
            key: "computers",
            name: "computers",
            cost: progress(hashmap! {"crystal" => 400.0, "deuterium" => 600.0}, 2.0),
            prerequisites: vec![prereq(BUILDING_RESEARCH_LAB, 1)],
        },
        TechnologyDesc {
            key: "astrophysics",
            name: "astrophysics",
            cost: progress(
                hashmap! {"metal" => 4_000.0, "crystal" => 8_000.0, "deuterium" => 4_000.0},
                1.75,
            ),
            prerequisites: vec![prereq(BUILDING_RESEARCH_LAB, 3), prereq("espionage", 4)],
        },
        TechnologyDesc {
            key: "weapons",
            name: "weapons",
            cost: progress(hashmap! {"metal" => 800.0, "crystal" => 200.0}, 2.0),
            prerequisites: vec![prereq(BUILDING_RESEARCH_LAB, 4)],
        },
        TechnologyDesc {
            key: "shielding",
            name: "shielding",
            cost: progress(hashmap! {"metal" => 200.0, "crystal" => 600.0}, 2.0),
            prerequisites: vec![prereq(BUILDING_RESEARCH_LAB, 6)],
        },
        TechnologyDesc {
            key: "armour",
            name: "armour",
            cost: progress(hashmap! {"metal" => 1_000.0}, 2.0),
            prerequisites: vec![prereq(BUILDING_RESEARCH_LAB, 2)],
        },
        TechnologyDesc {
            key: "combustion_drive",
            name: "combustion drive",
            cost: progress(hashmap! {"metal" => 400.0, "deuterium" => 600.0}, 2.0),
            prerequisites: vec![prereq(BUILDING_RESEARCH_LAB, 1)],
        },
        TechnologyDesc {
            key: "impulse_drive",
            name: "impulse drive",
            cost: progress(
                hashmap! {"metal" => 2_000.0, "crystal" => 4_000.0, "deuterium" => 600.0},
                2.0,
            ),
            prerequisites: vec![prereq(BUILDING_RESEARCH_LAB, 2)],
        },
        TechnologyDesc {
            key: "hyperspace_drive",
            name: "hyperspace drive",
            cost: progress(
                hashmap! {"metal" => 10_000.0, "crystal" => 20_000.0, "deuterium" => 6_000.0},
                2.0,
            ),
            prerequisites: vec![prereq(BUILDING_RESEARCH_LAB, 7)],
        },
        TechnologyDesc {
            key: "intergalactic_research_network",
            name: "intergalactic research network",
            cost: progress(
                hashmap! {"metal" => 240_000.0, "crystal" => 400_000.0, "deuterium" => 160_000.0},
                2.0,
            ),
            prerequisites: vec![prereq(BUILDING_RESEARCH_LAB, 10), prereq("computers", 8)],
        },
    ];

    let ships = vec![
        ShipDesc {
            key: "small_cargo",
            name: "small cargo",
            cost: FixedCost {
                amounts: hashmap! {"metal" => 2_000.0, "crystal" => 2_000.0},
            },
            hull: 4_000.0,
            shield: 10.0,
            weapon: 5.0,
            cargo: 5_000.0,
            base_speed: 5_000.0,
            propulsion: Propulsion::Combustion,
            fuel: hashmap! {"deuterium" => 10.0},
            rapid_fire: hashmap! {"espionage_probe" => 5},
        },
        ShipDesc {
            key: "large_cargo",
            name: "large cargo",
            cost: FixedCost {
                amounts: hashmap! {"metal" => 6_000.0, "crystal" => 6_000.0},
            },
            hull: 12_000.0,
            shield: 25.0,
            weapon: 5.0,
            cargo: 25_000.0,
            base_speed: 7_500.0,
            propulsion: Propulsion::Combustion,
            fuel: hashmap! {"deuterium" => 50.0},
            rapid_fire: hashmap! {"espionage_probe" => 5},
        },
        ShipDesc {
            key: "light_fighter",
            name: "light fighter",
            cost: FixedCost {
                amounts: hashmap! {"metal" => 3_000.0, "crystal" => 1_000.0},
            },
            hull: 4_000.0,
            shield: 10.0,
            weapon: 50.0,
            cargo: 50.0,
            base_speed: 12_500.0,
            propulsion: Propulsion::Combustion,
            fuel: hashmap! {"deuterium" => 20.0},
            rapid_fire: hashmap! {"espionage_probe" => 5},
        },
        ShipDesc {
            key: "heavy_fighter",
            name: "heavy fighter",
            cost: FixedCost {
                amounts: hashmap! {"metal" => 6_000.0, "crystal" => 4_000.0},
            },
            hull: 10_000.0,
            shield: 25.0,
            weapon: 150.0,
            cargo: 100.0,
            base_speed: 10_000.0,
            propulsion: Propulsion::Impulse,
            fuel: hashmap! {"deuterium" => 75.0},
            rapid_fire: hashmap! {"espionage_probe" => 5, "small_cargo" => 3},
        },
        ShipDesc {
            key: "cruiser",
            name: "cruiser",
            cost: FixedCost {
                amounts: hashmap! {"metal" => 20_000.0, "crystal" => 7_000.0, "deuterium" => 2_000.0},
            },
            hull: 27_000.0,
            shield: 50.0,
            weapon: 400.0,
            cargo: 800.0,
            base_speed: 15_000.0,
            propulsion: Propulsion::Impulse,
            fuel: hashmap! {"deuterium" => 300.0},
            rapid_fire: hashmap! {"espionage_probe" => 5, "light_fighter" => 6, "rocket_launcher" => 10},
        },
        ShipDesc {
            key: "battleship",
            name: "battleship",
            cost: FixedCost {
                amounts: hashmap! {"metal" => 45_000.0, "crystal" => 15_000.0},
            },
            hull: 60_000.0,
            shield: 200.0,
            weapon: 1_000.0,
            cargo: 1_500.0,
            base_speed: 10_000.0,
            propulsion: Propulsion::Hyperspace,
            fuel: hashmap! {"deuterium" => 500.0},
            rapid_fire: hashmap! {"espionage_probe" => 5},
        },
        ShipDesc {
            key: SHIP_COLONY,
            name: "colony ship",
            cost: FixedCost {
                amounts: hashmap! {"metal" => 10_000.0, "crystal" => 20_000.0, "deuterium" => 10_000.0},
            },
            hull: 30_000.0,
            shield: 100.0,
            weapon: 50.0,
            cargo: 7_500.0,
            base_speed: 2_500.0,
            propulsion: Propulsion::Impulse,
            fuel: hashmap! {"deuterium" => 1_000.0},
            rapid_fire: hashmap! {"espionage_probe" => 5},
        },
        ShipDesc {
            key: "recycler",
            name: "recycler",
            cost: FixedCost {
                amounts: hashmap! {"metal" => 10_000.0, "crystal" => 6_000.0, "deuterium" => 2_000.0},
            },
            hull: 16_000.0,
            shield: 10.0,
            weapon: 1.0,
            cargo: 20_000.0,
            base_speed: 2_000.0,
            propulsion: Propulsion::Combustion,
            fuel: hashmap! {"deuterium" => 300.0},
            rapid_fire: hashmap! {"espionage_probe" => 5},
        },
        ShipDesc {
            key: SHIP_ESPIONAGE_PROBE,
            name: "espionage probe",
            cost: FixedCost {
                amounts: hashmap! {"crystal" => 1_000.0},
            },
            hull: 1_000.0,
            shield: 0.01,
            weapon: 0.01,
            cargo: 5.0,
            base_speed: 100_000_000.0,
            propulsion: Propulsion::Combustion,
            fuel: hashmap! {"deuterium" => 1.0},
            rapid_fire: hashmap! {},
        },
        ShipDesc {
            key: "bomber",
            name: "bomber",
            cost: FixedCost {
                amounts: hashmap! {"metal" => 50_000.0, "crystal" => 25_000.0, "deuterium" => 15_000.0},
            },
            hull: 75_000.0,
            shield: 500.0,
            weapon: 1_000.0,
            cargo: 500.0,
            base_speed: 4_000.0,
            propulsion: Propulsion::Impulse,
            fuel: hashmap! {"deuterium" => 1_000.0},
            rapid_fire: hashmap! {"espionage_probe" => 5, "rocket_launcher" => 20, "light_laser" => 20, "heavy_laser" => 10},
        },
        ShipDesc {
            key: "destroyer",
            name: "destroyer",
            cost: FixedCost {
                amounts: hashmap! {"metal" => 60_000.0, "crystal" => 50_000.0, "deuterium" => 15_000.0},
            },
            hull: 110_000.0,
            shield: 500.0,
            weapon: 2_000.0,
            cargo: 2_000.0,
            base_speed: 5_000.0,
            propulsion: Propulsion::Hyperspace,
            fuel: hashmap! {"deuterium" => 1_000.0},
            rapid_fire: hashmap! {"espionage_probe" => 5, "light_laser" => 10},
        },
        ShipDesc {
            key: "battlecruiser",
            name: "battlecruiser",
            cost: FixedCost {
                amounts: hashmap! {"metal" => 30_000.0, "crystal" => 40_000.0, "deuterium" => 15_000.0},
            },
            hull: 70_000.0,
            shield: 400.0,
            weapon: 700.0,
            cargo: 750.0,
            base_speed: 10_000.0,
            propulsion: Propulsion::Hyperspace,
            fuel: hashmap! {"deuterium" => 250.0},
            rapid_fire: hashmap! {"espionage_probe" => 5, "small_cargo" => 3, "large_cargo" => 3, "heavy_fighter" => 4, "cruiser" => 4, "battleship" => 7},
        },
    ];

    let defenses = vec![
        DefenseDesc {
            key: "rocket_launcher",
            name: "rocket launcher",
            cost: FixedCost {
                amounts: hashmap! {"metal" => 2_000.0},
            },
            hull: 2_000.0,
            shield: 20.0,
            weapon: 80.0,
        },
        DefenseDesc {
            key: "light_laser",
            name: "light laser",
            cost: FixedCost {
                amounts: hashmap! {"metal" => 1_500.0, "crystal" => 500.0},
            },
            hull: 2_000.0,
            shield: 25.0,
            weapon: 100.0,
        },
        DefenseDesc {
            key: "heavy_laser",
            name: "heavy laser",
            cost: FixedCost {
                amounts: hashmap! {"metal" => 6_000.0, "crystal" => 2_000.0},
            },
            hull: 8_000.0,
            shield: 100.0,
            weapon: 250.0,
        },
        DefenseDesc {
            key: "gauss_cannon",
            name: "gauss cannon",
            cost: FixedCost {
                amounts: hashmap! {"metal" => 20_000.0, "crystal" => 15_000.0, "deuterium" => 2_000.0},
            },
            hull: 35_000.0,
            shield: 200.0,
            weapon: 1_100.0,
        },
        DefenseDesc {
            key: "ion_cannon",
            name: "ion cannon",
            cost: FixedCost {
                amounts: hashmap! {"metal" => 5_000.0, "crystal" => 3_000.0},
            },
            hull: 8_000.0,
            shield: 500.0,
            weapon: 150.0,
        },
        DefenseDesc {
            key: "plasma_turret",
            name: "plasma turret",
            cost: FixedCost {
                amounts: hashmap! {"metal" => 50_000.0, "crystal" => 50_000.0, "deuterium" => 30_000.0},
            },
            hull: 100_000.0,
            shield: 300.0,
            weapon: 3_000.0,
        },
        DefenseDesc {
            key: "small_shield_dome",
            name: "small shield dome",
            cost: FixedCost {
                amounts: hashmap! {"metal" => 10_000.0, "crystal" => 10_000.0},
            },
            hull: 20_000.0,
            shield: 2_000.0,
            weapon: 1.0,
        },
        DefenseDesc {
            key: "large_shield_dome",
            name: "large shield dome",
            cost: FixedCost {
                amounts: hashmap! {"metal" => 50_000.0, "crystal" => 50_000.0},
            },
            hull: 100_000.0,
            shield: 10_000.0,
            weapon: 1.0,
        },
    ];

    let objectives = vec![
        ObjectiveDesc {
            key: OBJECTIVE_TRANSPORT,
            name: "transport",
            hostile: false,
            directed: false,
            target_kinds: vec![BodyKind::Planet, BodyKind::Moon],
            allows_empty_target: false,
        },
        ObjectiveDesc {
            key: OBJECTIVE_DEPLOY,
            name: "deployment",
            hostile: false,
            directed: false,
            target_kinds: vec![BodyKind::Planet, BodyKind::Moon],
            allows_empty_target: false,
        },
        ObjectiveDesc {
            key: OBJECTIVE_COLONIZE,
            name: "colonization",
            hostile: false,
            directed: false,
            target_kinds: vec![BodyKind::Planet],
            allows_empty_target: true,
        },
        ObjectiveDesc {
            key: OBJECTIVE_HARVEST,
            name: "harvesting",
            hostile: false,
            directed: false,
            target_kinds: vec![BodyKind::Debris],
            allows_empty_target: false,
        },
        ObjectiveDesc {
            key: OBJECTIVE_SPY,
            name: "espionage",
            hostile: true,
            directed: true,
            target_kinds: vec![BodyKind::Planet, BodyKind::Moon],
            allows_empty_target: false,
        },
        ObjectiveDesc {
            key: OBJECTIVE_ATTACK,
            name: "attacking",
            hostile: true,
            directed: true,
            target_kinds: vec![BodyKind::Planet, BodyKind::Moon],
            allows_empty_target: false,
        },
        ObjectiveDesc {
            key: OBJECTIVE_ACS_ATTACK,
            name: "ACS attack",
            hostile: true,
            directed: true,
            target_kinds: vec![BodyKind::Planet, BodyKind::Moon],
            allows_empty_target: false,
        },
        ObjectiveDesc {
            key: OBJECTIVE_ACS_DEFEND,
            name: "ACS defend",
            hostile: false,
            directed: false,
            target_kinds: vec![BodyKind::Planet, BodyKind::Moon],
            allows_empty_target: false,
        },
        ObjectiveDesc {
            key: OBJECTIVE_EXPEDITION,
            name: "expedition",
            hostile: false,
            directed: false,
            target_kinds: vec![],
            allows_empty_target: true,
        },
    ];

    Catalog {
        resources,
        buildings,
        technologies,
        ships,
        defenses,
        objectives,
        distance_weights: DistanceWeights {
            galaxy: 20_000.0,
            system: 95.0,
            position: 5.0,
        },
    }
}
