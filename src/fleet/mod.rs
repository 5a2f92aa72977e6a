//! Fleet engine: flight-time and fuel math, dispatch validation, the
//! per-objective arrival scripts, and return trips.

use crate::catalog::{self, Catalog, OBJECTIVE_ACS_ATTACK, OBJECTIVE_ACS_DEFEND,
    OBJECTIVE_ATTACK, OBJECTIVE_COLONIZE, OBJECTIVE_DEPLOY, OBJECTIVE_EXPEDITION,
    OBJECTIVE_HARVEST, OBJECTIVE_SPY, OBJECTIVE_TRANSPORT, SHIP_COLONY};
use crate::combat::{self, BattleParams, UnitGroup};
use crate::db::DbClient;
use crate::error::{Error, Result};
use crate::espionage;
use crate::loader;
use crate::models::{
    total_amount, Body, BodyKind, Coordinates, ExpeditionReport, FightOutcome, FightReport,
    Fleet, FleetComponent, FleetSurvivors, Player, ResourceAmount, UnitCount, Universe,
};
use crate::repo;
use crate::util::{secs_to_duration, seed_from_instant};
use chrono::{DateTime, Utc};
use diesel_async::scoped_futures::ScopedFutureExt as _;
use diesel_async::AsyncConnection as _;
use diesel_async::AsyncPgConnection;
use std::collections::HashMap;
use tracing::*;
use uuid::Uuid;

#[derive(Debug, Clone)]
pub struct ComponentRequest {
    pub source: Uuid,
    pub speed_ratio: f64,
    pub ships: Vec<UnitCount>,
    pub cargo: Vec<ResourceAmount>,
}

#[derive(Debug, Clone)]
pub struct FleetRequest {
    pub objective: String,
    pub target: Coordinates,
    pub name: String,
    pub components: Vec<ComponentRequest>,
}

/// Raw one-way flight time in seconds for one component:
/// `35000 / (10 s) * sqrt(10 d / v) + 10`, before universe scaling.
pub fn flight_time_secs(distance: f64, speed: f64, speed_ratio: f64) -> f64 {
    35_000.0 / (10.0 * speed_ratio) * (10.0 * distance / speed).sqrt() + 10.0
}

/// Universe scaling applied to a raw flight time.
pub fn scale_flight_time(raw_secs: f64, universe: &Universe) -> f64 {
    raw_secs / (universe.fleet_speed * universe.fleet_acceleration)
}

/// Per-ship fuel for a component with raw flight time `ft_secs`.
pub fn fuel_per_ship(base_consumption: f64, distance: f64, speed: f64, ft_secs: f64) -> f64 {
    let k = 35_000.0 * (10.0 * distance / speed).sqrt() / (ft_secs - 10.0);
    base_consumption * distance * (1.0 + k / 10.0).powi(2) / 35_000.0
}

/// The speed ratio is user-chosen in 10% steps.
pub fn validate_speed_ratio(speed_ratio: f64) -> Result<()> {
    let steps = speed_ratio * 10.0;
    if !(1.0..=10.0).contains(&steps) || (steps - steps.round()).abs() > 1e-9 {
        return Err(Error::InvalidFleetComponent);
    }
    Ok(())
}

/// Slowest propulsion-adjusted ship speed in a manifest; the component
/// flies at this speed.
pub fn slowest_speed(ships: &[UnitCount], player: &Player, catalog: &Catalog) -> Result<f64> {
    let mut slowest: Option<f64> = None;
    for entry in ships {
        let desc = catalog.ship(&entry.element).ok_or(Error::NonExistingElement)?;
        let drive_level = player.technology_level(desc.propulsion.technology());
        let speed = desc.speed(drive_level);
        if speed <= 0.0 {
            return Err(Error::InvalidPropulsionSystem);
        }
        slowest = Some(match slowest {
            Some(current) => current.min(speed),
            None => speed,
        });
    }
    slowest.ok_or(Error::InvalidFleetComponent)
}

pub fn cargo_capacity(ships: &[UnitCount], catalog: &Catalog) -> f64 {
    ships
        .iter()
        .filter_map(|s| catalog.ship(&s.element).map(|d| d.cargo * s.count as f64))
        .sum()
}

/// Total fuel burned by a component, summed over ship types.
pub fn component_fuel(
    ships: &[UnitCount],
    distance: f64,
    speed: f64,
    ft_secs: f64,
    catalog: &Catalog,
) -> Result<Vec<ResourceAmount>> {
    let mut totals: HashMap<String, f64> = HashMap::new();
    for entry in ships {
        let desc = catalog.ship(&entry.element).ok_or(Error::NonExistingElement)?;
        for (resource, base) in &desc.fuel {
            let per_ship = fuel_per_ship(*base, distance, speed, ft_secs);
            *totals.entry(resource.to_string()).or_insert(0.0) += per_ship * entry.count as f64;
        }
    }
    let mut consumption: Vec<ResourceAmount> = totals
        .into_iter()
        .map(|(resource, amount)| ResourceAmount { resource, amount })
        .collect();
    consumption.sort_by(|a, b| a.resource.cmp(&b.resource));
    Ok(consumption)
}

/// Full component validation against its refreshed source body. Returns the
/// component (flight duration still unset) plus its raw flight time and
/// fuel bill.
pub fn validate_component(
    request: &ComponentRequest,
    body: &Body,
    player: &Player,
    target: &Coordinates,
    universe: &Universe,
    catalog: &Catalog,
) -> Result<(FleetComponent, Vec<ResourceAmount>, f64)> {
    if body.player() != player.id {
        return Err(Error::InvalidPlayerForAction);
    }
    validate_speed_ratio(request.speed_ratio)?;
    if request.ships.is_empty() || request.ships.iter().any(|s| s.count <= 0) {
        return Err(Error::InvalidFleetComponent);
    }
    for entry in &request.ships {
        if body.ship_count(&entry.element) < entry.count {
            return Err(Error::InvalidFleetComponent);
        }
    }

    for cargo in &request.cargo {
        if cargo.amount < 0.0 {
            return Err(Error::InvalidCargo);
        }
        let desc = catalog.resource(&cargo.resource).ok_or(Error::InvalidCargo)?;
        if !desc.movable {
            return Err(Error::CargoNotMovable);
        }
    }
    if total_amount(&request.cargo) > cargo_capacity(&request.ships, catalog) {
        return Err(Error::InsufficientCargo);
    }

    let distance = catalog.distance(&body.coordinates(), target);
    let speed = slowest_speed(&request.ships, player, catalog)?;
    let ft_secs = flight_time_secs(distance, speed, request.speed_ratio);
    let consumption = component_fuel(&request.ships, distance, speed, ft_secs, catalog)?;

    // the source pays cargo and fuel up front, possibly from the same stock
    let mut debits: HashMap<&str, f64> = HashMap::new();
    for cargo in &request.cargo {
        *debits.entry(cargo.resource.as_str()).or_insert(0.0) += cargo.amount;
    }
    for fuel in &consumption {
        *debits.entry(fuel.resource.as_str()).or_insert(0.0) += fuel.amount;
    }
    for (resource, needed) in &debits {
        if body.resource_amount(resource) < *needed {
            return Err(Error::InvalidAmountForAction);
        }
    }

    let component = FleetComponent {
        id: Uuid::new_v4(),
        fleet: Uuid::nil(),
        player: player.id,
        source: body.id(),
        source_kind: body.kind(),
        speed_ratio: request.speed_ratio,
        joined_at: Utc::now(),
        flight_duration_ms: 0,
        ships: request.ships.clone(),
        cargo: request.cargo.clone(),
        consumption,
    };
    Ok((component, request.cargo.clone(), ft_secs))
}

fn check_objective_target(
    objective: &catalog::ObjectiveDesc,
    target: &Coordinates,
    target_body: Option<&Body>,
    player: Uuid,
) -> Result<()> {
    match target_body {
        Some(body) => {
            if !objective.target_kinds.contains(&body.kind()) {
                return Err(Error::InvalidObjective);
            }
            if objective.directed && body.player() == player {
                return Err(Error::InvalidObjective);
            }
        }
        None => {
            let debris_target = target.kind == BodyKind::Debris;
            if !objective.allows_empty_target && !debris_target {
                return Err(Error::NonExistingPlanet);
            }
            if debris_target && !objective.target_kinds.contains(&BodyKind::Debris) {
                return Err(Error::InvalidObjective);
            }
        }
    }
    Ok(())
}

/// Dispatch a fleet. Sources are locked in ascending id order, refreshed,
/// validated, debited; the fleet and its components are inserted with a
/// shared arrival instant set by the slowest component.
pub async fn create(
    db: &DbClient,
    player_id: Uuid,
    request: FleetRequest,
    now: DateTime<Utc>,
) -> Result<Fleet> {
    if request.components.is_empty() {
        return Err(Error::InvalidFleetComponent);
    }
    let mut conn = db.conn().await?;
    conn.transaction::<_, Error, _>(|conn| {
        async move {
            let objective = catalog::catalog()
                .objective(&request.objective)
                .ok_or(Error::InvalidObjective)?
                .clone();

            let mut sources: Vec<Uuid> = request.components.iter().map(|c| c.source).collect();
            sources.sort();
            sources.dedup();
            if sources.len() != request.components.len() {
                return Err(Error::DuplicatedFleetComponent);
            }

            let mut bodies: HashMap<Uuid, loader::RefreshedBody> = HashMap::new();
            for source in &sources {
                let refreshed = loader::refresh_body_locked(conn, *source, now).await?;
                bodies.insert(*source, refreshed);
            }
            let universe = bodies[&sources[0]].universe.clone();
            let player = repo::players::fetch(conn, player_id).await?;
            if !player.can_send_fleet(request.objective == OBJECTIVE_EXPEDITION) {
                return Err(Error::InvalidPlayerForAction);
            }

            let target_body = repo::bodies::fetch_by_coordinates(
                conn,
                universe.id,
                &request.target,
            )
            .await?;
            check_objective_target(&objective, &request.target, target_body.as_ref(), player.id)?;
            if request.objective == OBJECTIVE_COLONIZE {
                let has_colonizer = request.components.iter().any(|c| {
                    c.ships.iter().any(|s| s.element == SHIP_COLONY && s.count > 0)
                });
                if !has_colonizer {
                    return Err(Error::InvalidFleetComponent);
                }
            }

            // validate all components before any debit
            let mut validated = Vec::new();
            let mut slowest_secs: f64 = 0.0;
            for component_request in &request.components {
                let refreshed = bodies
                    .get(&component_request.source)
                    .ok_or(Error::NonExistingPlanet)?;
                let (component, _, ft_secs) = validate_component(
                    component_request,
                    &refreshed.body,
                    &player,
                    &request.target,
                    &universe,
                    catalog::catalog(),
                )?;
                let scaled = scale_flight_time(ft_secs, &universe);
                slowest_secs = slowest_secs.max(scaled);
                validated.push((component_request.clone(), component));
            }

            let flight = secs_to_duration(slowest_secs);
            let fleet = Fleet {
                id: Uuid::new_v4(),
                universe: universe.id,
                player: player.id,
                objective: request.objective.clone(),
                target: request.target,
                target_body: target_body.as_ref().map(|b| b.id()),
                arrival_time: now + flight,
                return_time: now + flight + flight,
                is_returning: false,
                name: request.name.clone(),
                created_at: now,
            };

            let mut components = Vec::new();
            for (component_request, mut component) in validated {
                let refreshed = bodies
                    .get_mut(&component_request.source)
                    .ok_or(Error::NonExistingPlanet)?;
                for entry in &component_request.ships {
                    let count = refreshed.body.ship_count(&entry.element) - entry.count;
                    refreshed
                        .body
                        .ships_mut()
                        .insert(entry.element.clone(), count);
                }
                for cargo in &component_request.cargo {
                    refreshed.body.debit(&cargo.resource, cargo.amount);
                }
                for fuel in &component.consumption {
                    refreshed.body.debit(&fuel.resource, fuel.amount);
                }
                repo::bodies::persist_refresh(conn, &refreshed.body).await?;

                component.fleet = fleet.id;
                component.joined_at = now;
                component.flight_duration_ms = flight.num_milliseconds();
                components.push(component);
            }

            repo::fleets::create(conn, &fleet, &components).await?;
            info!(
                "fleet {} dispatched: {} to {}",
                fleet.id, fleet.objective, fleet.target
            );
            Ok(fleet)
        }
        .scope_boxed()
    })
    .await
}

/// Join a component to a flying group fleet. The joiner must be able to
/// match the fleet's arrival instant at its chosen speed ratio.
pub async fn join(
    db: &DbClient,
    fleet_id: Uuid,
    player_id: Uuid,
    request: ComponentRequest,
    now: DateTime<Utc>,
) -> Result<FleetComponent> {
    let mut conn = db.conn().await?;
    conn.transaction::<_, Error, _>(|conn| {
        async move {
            let fleet = repo::fleets::fetch(conn, fleet_id).await?;
            if fleet.is_returning || fleet.has_arrived(now) {
                return Err(Error::FleetNotYetArrived);
            }
            if fleet.objective != OBJECTIVE_ACS_ATTACK && fleet.objective != OBJECTIVE_ACS_DEFEND {
                return Err(Error::InvalidFleetForComponent);
            }

            let refreshed = loader::refresh_body_locked(conn, request.source, now).await?;
            let player = repo::players::fetch(conn, player_id).await?;
            if !player.can_send_fleet(false) {
                return Err(Error::InvalidPlayerForAction);
            }
            let (mut component, _, ft_secs) = validate_component(
                &request,
                &refreshed.body,
                &player,
                &fleet.target,
                &refreshed.universe,
                catalog::catalog(),
            )?;

            // the component must make the rendezvous
            let scaled = scale_flight_time(ft_secs, &refreshed.universe);
            let window = (fleet.arrival_time - now).num_milliseconds() as f64 / 1000.0;
            if (scaled - window).abs() > 1.0 {
                return Err(Error::ArrivalTimeMismatch);
            }

            let mut body = refreshed.body;
            for entry in &request.ships {
                let count = body.ship_count(&entry.element) - entry.count;
                body.ships_mut().insert(entry.element.clone(), count);
            }
            for cargo in &request.cargo {
                body.debit(&cargo.resource, cargo.amount);
            }
            for fuel in &component.consumption {
                body.debit(&fuel.resource, fuel.amount);
            }
            repo::bodies::persist_refresh(conn, &body).await?;

            component.fleet = fleet.id;
            component.joined_at = now;
            component.flight_duration_ms = (fleet.arrival_time - now).num_milliseconds();
            repo::fleets::add_component(conn, &component).await?;
            Ok(component)
        }
        .scope_boxed()
    })
    .await
}

/// Recall a stationed or outbound fleet: flip it onto the return leg.
pub async fn recall(db: &DbClient, fleet_id: Uuid) -> Result<()> {
    let mut conn = db.conn().await?;
    conn.transaction::<_, Error, _>(|conn| {
        async move {
            let fleet = repo::fleets::fetch(conn, fleet_id).await?;
            if fleet.is_returning {
                return Err(Error::FleetNotYetReturned);
            }
            repo::fleets::set_returning(conn, fleet.id).await
        }
        .scope_boxed()
    })
    .await
}

/// Apply one arrived fleet's objective. Called under the target body's lock
/// (when one exists) from the update-on-read pass; `target` is absent for
/// empty-slot objectives.
pub async fn process_arrival(
    conn: &mut AsyncPgConnection,
    fleet: &Fleet,
    target: Option<&mut Body>,
    universe: &Universe,
    now: DateTime<Utc>,
) -> Result<()> {
    debug!("fleet {} arrival: {}", fleet.id, fleet.objective);
    match fleet.objective.as_str() {
        OBJECTIVE_TRANSPORT => {
            let body = target.ok_or(Error::NonExistingPlanet)?;
            deliver_cargo(conn, fleet, body).await?;
            repo::fleets::set_returning(conn, fleet.id).await
        }
        OBJECTIVE_DEPLOY => {
            let body = target.ok_or(Error::NonExistingPlanet)?;
            deploy(conn, fleet, body).await?;
            repo::fleets::delete(conn, fleet.id).await
        }
        OBJECTIVE_COLONIZE => colonize(conn, fleet, target, universe, now).await,
        OBJECTIVE_HARVEST => harvest(conn, fleet, universe).await,
        OBJECTIVE_SPY => {
            let body = target.ok_or(Error::NonExistingPlanet)?;
            espionage::resolve(conn, fleet, body, universe, now).await
        }
        OBJECTIVE_ATTACK | OBJECTIVE_ACS_ATTACK => {
            let body = target.ok_or(Error::NonExistingPlanet)?;
            resolve_attack(conn, fleet, body, universe, now).await
        }
        OBJECTIVE_ACS_DEFEND => Ok(()),
        OBJECTIVE_EXPEDITION => expedition(conn, fleet, now).await,
        _ => Err(Error::InvalidObjective),
    }
}

/// Credit a returned fleet to its sources and drop it.
pub async fn process_return(conn: &mut AsyncPgConnection, fleet: &Fleet) -> Result<()> {
    debug!("fleet {} returned", fleet.id);
    repo::fleets::return_to_base(conn, fleet.id).await
}

async fn deliver_cargo(
    conn: &mut AsyncPgConnection,
    fleet: &Fleet,
    body: &mut Body,
) -> Result<()> {
    let components = repo::fleets::components(conn, fleet.id).await?;
    for component in components {
        let mut leftovers: Vec<ResourceAmount> = Vec::new();
        for cargo in &component.cargo {
            let overflow = body.credit(&cargo.resource, cargo.amount);
            if overflow > 0.0 {
                // whatever the silos cannot take rides home again
                leftovers.push(ResourceAmount::new(&cargo.resource, overflow));
            }
        }
        repo::fleets::update_component_manifest(conn, component.id, &component.ships, &leftovers)
            .await?;
    }
    Ok(())
}

async fn deploy(conn: &mut AsyncPgConnection, fleet: &Fleet, body: &mut Body) -> Result<()> {
    let components = repo::fleets::components(conn, fleet.id).await?;
    for component in components {
        for entry in &component.ships {
            let count = body.ship_count(&entry.element) + entry.count;
            body.ships_mut().insert(entry.element.clone(), count);
        }
        for cargo in &component.cargo {
            let overflow = body.credit(&cargo.resource, cargo.amount);
            if overflow > 0.0 {
                warn!(
                    "deploy overflow at {}: {} {} lost",
                    body.id(),
                    overflow,
                    cargo.resource
                );
            }
        }
    }
    Ok(())
}

async fn colonize(
    conn: &mut AsyncPgConnection,
    fleet: &Fleet,
    target: Option<&mut Body>,
    universe: &Universe,
    now: DateTime<Utc>,
) -> Result<()> {
    if target.is_some() {
        // somebody settled the slot first
        repo::fleets::set_returning(conn, fleet.id).await?;
        return Ok(());
    }
    repo::players::lock(conn, fleet.player).await?;
    let player = repo::players::fetch(conn, fleet.player).await?;
    let owned = repo::players::owned_planets_count(conn, fleet.player).await?;
    if !player.can_colonize(owned) {
        repo::fleets::set_returning(conn, fleet.id).await?;
        return Ok(());
    }

    let mut planet = loader::provision_planet(
        universe,
        fleet.player,
        fleet.target.with_kind(BodyKind::Planet),
        "colony",
        false,
        now,
    );
    let components = repo::fleets::components(conn, fleet.id).await?;
    for component in &components {
        for entry in &component.ships {
            if entry.element == SHIP_COLONY {
                // the settler ship becomes the first infrastructure
                if entry.count > 1 {
                    *planet.ships.entry(entry.element.clone()).or_insert(0) += entry.count - 1;
                }
            } else {
                *planet.ships.entry(entry.element.clone()).or_insert(0) += entry.count;
            }
        }
        for cargo in &component.cargo {
            if let Some(stock) = planet.resources.iter_mut().find(|s| s.resource == cargo.resource)
            {
                stock.amount += cargo.amount;
            }
        }
    }
    repo::bodies::create_planet(conn, &planet).await?;
    repo::fleets::delete(conn, fleet.id).await?;
    info!("planet {} colonized at {}", planet.id, planet.coordinates);
    Ok(())
}

async fn harvest(conn: &mut AsyncPgConnection, fleet: &Fleet, universe: &Universe) -> Result<()> {
    let field = repo::debris::fetch_at(conn, universe.id, &fleet.target).await?;
    let components = repo::fleets::components(conn, fleet.id).await?;

    let mut available: Vec<ResourceAmount> = field;
    for component in &components {
        let capacity = cargo_capacity(&component.ships, catalog::catalog());
        let free = capacity - component.cargo_amount();
        if free <= 0.0 {
            continue;
        }
        let total = total_amount(&available);
        if total <= 0.0 {
            break;
        }
        let scale = (free / total).min(1.0);
        let mut loaded = component.cargo.clone();
        let mut drained: Vec<ResourceAmount> = Vec::new();
        for entry in available.iter_mut() {
            let take = entry.amount * scale;
            if take <= 0.0 {
                continue;
            }
            entry.amount -= take;
            drained.push(ResourceAmount::new(&entry.resource, take));
            match loaded.iter_mut().find(|c| c.resource == entry.resource) {
                Some(slot) => slot.amount += take,
                None => loaded.push(ResourceAmount::new(&entry.resource, take)),
            }
        }
        repo::fleets::update_component_manifest(conn, component.id, &component.ships, &loaded)
            .await?;
        repo::debris::drain(conn, universe.id, &fleet.target, &drained).await?;
    }
    repo::fleets::set_returning(conn, fleet.id).await
}

async fn expedition(
    conn: &mut AsyncPgConnection,
    fleet: &Fleet,
    now: DateTime<Utc>,
) -> Result<()> {
    let report = ExpeditionReport {
        id: Uuid::new_v4(),
        universe: fleet.universe,
        player: fleet.player,
        fleet: fleet.id,
        location: fleet.target,
        outcome: "nothing of note".to_string(),
        created_at: now,
    };
    repo::reports::save_expedition(conn, &report).await?;
    repo::fleets::set_returning(conn, fleet.id).await
}

fn ship_groups(
    ships: &[UnitCount],
    tag: Option<Uuid>,
    player: &Player,
    catalog: &Catalog,
) -> Vec<UnitGroup> {
    let (weapon_amp, shield_amp, hull_amp) = player.combat_amplifiers();
    ships
        .iter()
        .filter(|entry| entry.count > 0)
        .filter_map(|entry| {
            let desc = catalog.ship(&entry.element)?;
            Some(UnitGroup {
                fleet: tag,
                element: entry.element.clone(),
                count: entry.count,
                hull: combat::hull_plating(desc.hull) * hull_amp,
                shield: desc.shield * shield_amp,
                weapon: desc.weapon * weapon_amp,
                cargo: desc.cargo,
                rapid_fire: desc
                    .rapid_fire
                    .iter()
                    .map(|(k, v)| (k.to_string(), *v))
                    .collect(),
                is_defense: false,
            })
        })
        .collect()
}

fn defense_groups(body: &Body, player: &Player, catalog: &Catalog) -> Vec<UnitGroup> {
    let (weapon_amp, shield_amp, hull_amp) = player.combat_amplifiers();
    let mut elements: Vec<(&String, &i64)> = body.defenses().iter().collect();
    elements.sort();
    elements
        .into_iter()
        .filter(|(_, count)| **count > 0)
        .filter_map(|(element, count)| {
            let desc = catalog.defense(element)?;
            Some(UnitGroup {
                fleet: None,
                element: element.clone(),
                count: *count,
                hull: combat::hull_plating(desc.hull) * hull_amp,
                shield: desc.shield * shield_amp,
                weapon: desc.weapon * weapon_amp,
                cargo: 0.0,
                rapid_fire: HashMap::new(),
                is_defense: false,
            })
        })
        .map(|mut group| {
            group.is_defense = true;
            group
        })
        .collect()
}

fn body_ship_groups(body: &Body, player: &Player, catalog: &Catalog) -> Vec<UnitGroup> {
    let mut manifests: Vec<UnitCount> = body
        .ships()
        .iter()
        .map(|(element, count)| UnitCount::new(element, *count))
        .collect();
    manifests.sort_by(|a, b| a.element.cmp(&b.element));
    ship_groups(&manifests, None, player, catalog)
}

/// Write a fleet's post-battle manifests back to its components, oldest
/// first, and report whether any hull survived.
async fn apply_fleet_survivors(
    conn: &mut AsyncPgConnection,
    fleet_id: Uuid,
    survivors: &[FleetSurvivors],
) -> Result<bool> {
    let mut remaining: HashMap<String, i64> = HashMap::new();
    for group in survivors.iter().filter(|s| s.fleet == fleet_id) {
        for entry in &group.ships {
            *remaining.entry(entry.element.clone()).or_insert(0) += entry.count;
        }
    }
    let components = repo::fleets::components(conn, fleet_id).await?;
    let mut any = false;
    for component in components {
        let mut ships = Vec::new();
        for entry in &component.ships {
            let available = remaining.entry(entry.element.clone()).or_insert(0);
            let kept = (*available).min(entry.count);
            *available -= kept;
            if kept > 0 {
                ships.push(UnitCount::new(&entry.element, kept));
                any = true;
            }
        }
        repo::fleets::update_component_manifest(conn, component.id, &ships, &component.cargo)
            .await?;
    }
    Ok(any)
}

fn survivors_by_fleet(survivors: &[combat::Survivor]) -> Vec<FleetSurvivors> {
    let mut per_fleet: HashMap<Uuid, Vec<UnitCount>> = HashMap::new();
    for survivor in survivors {
        if let Some(fleet) = survivor.fleet {
            per_fleet
                .entry(fleet)
                .or_default()
                .push(UnitCount::new(&survivor.element, survivor.count));
        }
    }
    let mut out: Vec<FleetSurvivors> = per_fleet
        .into_iter()
        .map(|(fleet, ships)| FleetSurvivors { fleet, ships })
        .collect();
    out.sort_by_key(|s| s.fleet);
    out
}

/// Full attack resolution at a defended body: seeded simulation, debris,
/// pillage, optional moon, defense reconstruction, manifests and reports.
pub async fn resolve_attack(
    conn: &mut AsyncPgConnection,
    fleet: &Fleet,
    body: &mut Body,
    universe: &Universe,
    now: DateTime<Utc>,
) -> Result<()> {
    let catalog = catalog::catalog();
    let attacker = repo::players::fetch(conn, fleet.player).await?;
    let defender = repo::players::fetch(conn, body.player()).await?;

    let components = repo::fleets::components(conn, fleet.id).await?;
    let mut attacker_groups = Vec::new();
    for component in &components {
        let owner = if component.player == attacker.id {
            attacker.clone()
        } else {
            repo::players::fetch(conn, component.player).await?
        };
        attacker_groups.extend(ship_groups(
            &component.ships,
            Some(fleet.id),
            &owner,
            catalog,
        ));
    }

    let mut defender_groups = defense_groups(body, &defender, catalog);
    defender_groups.extend(body_ship_groups(body, &defender, catalog));

    // stationed friendly fleets defend with the body, locked in id order
    let reinforcements = repo::fleets::reinforcements_at(
        conn,
        universe.id,
        &fleet.target,
        OBJECTIVE_ACS_DEFEND,
        now,
    )
    .await?;
    let mut defender_players: Vec<Uuid> = vec![defender.id];
    for reinforcement in &reinforcements {
        repo::fleets::lock(conn, reinforcement.id).await?;
        let owner = repo::players::fetch(conn, reinforcement.player).await?;
        if !defender_players.contains(&owner.id) {
            defender_players.push(owner.id);
        }
        for component in repo::fleets::components(conn, reinforcement.id).await? {
            defender_groups.extend(ship_groups(
                &component.ships,
                Some(reinforcement.id),
                &owner,
                catalog,
            ));
        }
    }

    let params = BattleParams {
        ships_to_ruins: universe.ships_to_ruins,
        defenses_to_ruins: universe.defenses_to_ruins,
        defense_rebuild_ratio: universe.defense_rebuild_ratio,
        moon_chance: universe.moon_chance,
    };
    let seed = seed_from_instant(fleet.arrival_time);
    let result = combat::simulate(&attacker_groups, &defender_groups, seed, catalog, &params)?;
    info!(
        "fight at {}: {:?} after {} rounds",
        fleet.target, result.outcome, result.rounds
    );

    // write back the defender's hangars and batteries
    let mut defenses: HashMap<String, i64> = HashMap::new();
    let mut indigenous: HashMap<String, i64> = HashMap::new();
    for survivor in &result.defender_survivors {
        if survivor.fleet.is_none() {
            if survivor.is_defense {
                *defenses.entry(survivor.element.clone()).or_insert(0) += survivor.count;
            } else {
                *indigenous.entry(survivor.element.clone()).or_insert(0) += survivor.count;
            }
        }
    }
    for rebuilt in &result.rebuilt_defenses {
        *defenses.entry(rebuilt.element.clone()).or_insert(0) += rebuilt.count;
    }
    *body.defenses_mut() = defenses;
    *body.ships_mut() = indigenous;

    // pillage only on a clean defender loss
    let mut pillage = Vec::new();
    if result.outcome == FightOutcome::Loss {
        let capacity = result.attacker_cargo_capacity(catalog);
        pillage = combat::pillage(
            body.resources(),
            capacity,
            universe.pillage_ratio,
            catalog,
        );
        for entry in &pillage {
            body.debit(&entry.resource, entry.amount);
        }
    }

    if !result.debris.is_empty() {
        let slot = fleet.target.with_kind(BodyKind::Debris);
        repo::debris::credit(conn, universe.id, &slot, &result.debris).await?;
    }

    let mut moon_diameter = None;
    if let Some(diameter) = result.moon_diameter {
        if body.kind() == BodyKind::Planet {
            let existing = repo::bodies::moon_of(conn, body.id()).await?;
            if existing.is_none() {
                let moon =
                    loader::provision_moon(universe, body, diameter, now);
                repo::bodies::create_moon(conn, &moon).await?;
                moon_diameter = Some(diameter);
                info!("moon formed at {} ({}km)", fleet.target, diameter);
            }
        }
    }

    let survivors = survivors_by_fleet(&result.defender_survivors)
        .into_iter()
        .chain(survivors_by_fleet(&result.attacker_survivors))
        .collect::<Vec<_>>();

    // attacker flies home with the loot, or is struck from the record
    let attacker_alive = apply_fleet_survivors(conn, fleet.id, &survivors).await?;
    if attacker_alive {
        if !pillage.is_empty() {
            load_pillage(conn, fleet.id, &pillage).await?;
        }
        repo::fleets::set_returning(conn, fleet.id).await?;
    } else {
        repo::fleets::delete(conn, fleet.id).await?;
    }
    let mut involved_fleets = vec![fleet.id];
    for reinforcement in &reinforcements {
        involved_fleets.push(reinforcement.id);
        let alive = apply_fleet_survivors(conn, reinforcement.id, &survivors).await?;
        if !alive {
            repo::fleets::delete(conn, reinforcement.id).await?;
        }
    }

    let surviving_defenses: Vec<UnitCount> = {
        let mut entries: Vec<UnitCount> = body
            .defenses()
            .iter()
            .filter(|(_, count)| **count > 0)
            .map(|(element, count)| UnitCount::new(element, *count))
            .collect();
        entries.sort_by(|a, b| a.element.cmp(&b.element));
        entries
    };
    let report = FightReport {
        id: Uuid::new_v4(),
        universe: universe.id,
        location: fleet.target,
        outcome: result.outcome,
        attackers: vec![attacker.id],
        defenders: defender_players,
        fleets: involved_fleets,
        survivors,
        surviving_defenses,
        pillage,
        debris: result.debris.clone(),
        rebuilt_defenses: result.rebuilt_defenses.iter().map(|r| r.count).sum(),
        moon_diameter,
        created_at: now,
    };
    repo::reports::save_fight(conn, &report).await
}

/// Spread the loot across the surviving components by free capacity.
async fn load_pillage(
    conn: &mut AsyncPgConnection,
    fleet_id: Uuid,
    pillage: &[ResourceAmount],
) -> Result<()> {
    let components = repo::fleets::components(conn, fleet_id).await?;
    let catalog = catalog::catalog();
    let free: Vec<f64> = components
        .iter()
        .map(|c| (cargo_capacity(&c.ships, catalog) - c.cargo_amount()).max(0.0))
        .collect();
    let total_free: f64 = free.iter().sum();
    if total_free <= 0.0 {
        return Ok(());
    }
    for (component, free_here) in components.iter().zip(free.iter()) {
        if *free_here <= 0.0 {
            continue;
        }
        let share = free_here / total_free;
        let mut cargo = component.cargo.clone();
        for entry in pillage {
            let add = entry.amount * share;
            match cargo.iter_mut().find(|c| c.resource == entry.resource) {
                Some(slot) => slot.amount += add,
                None => cargo.push(ResourceAmount::new(&entry.resource, add)),
            }
        }
        repo::fleets::update_component_manifest(conn, component.id, &component.ships, &cargo)
            .await?;
    }
    Ok(())
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_flight_time_formula() {
        // d = 1000, v = 10000, s = 1.0: 3500 * sqrt(1) + 10 = 3510
        let secs = flight_time_secs(1_000.0, 10_000.0, 1.0);
        assert!((secs - 3_510.0).abs() < 1e-9);
        // slowest ratio stretches the trip tenfold (minus the fixed pad)
        let secs = flight_time_secs(1_000.0, 10_000.0, 0.1);
        assert!((secs - 35_010.0).abs() < 1e-9);
    }

    #[test]
    fn test_flight_time_universe_scaling() {
        let universe = {
            let mut u = Universe::with_defaults(Uuid::new_v4(), "test");
            u.fleet_speed = 2.0;
            u.fleet_acceleration = 5.0;
            u
        };
        assert!((scale_flight_time(3_510.0, &universe) - 351.0).abs() < 1e-9);
    }

    #[test]
    fn test_fuel_formula() {
        // with ft = raw formula time, k collapses to 10 * s
        let d = 1_000.0;
        let v = 10_000.0;
        let s = 1.0;
        let ft = flight_time_secs(d, v, s);
        let fuel = fuel_per_ship(10.0, d, v, ft);
        let expected = 10.0 * d * (1.0 + 1.0_f64).powi(2) / 35_000.0;
        assert!((fuel - expected).abs() < 1e-9);
    }

    #[test]
    fn test_speed_ratio_quantization() {
        assert!(validate_speed_ratio(1.0).is_ok());
        assert!(validate_speed_ratio(0.1).is_ok());
        assert!(validate_speed_ratio(0.5).is_ok());
        assert!(validate_speed_ratio(0.0).is_err());
        assert!(validate_speed_ratio(0.35).is_err());
        assert!(validate_speed_ratio(1.1).is_err());
    }

    #[test]
    fn test_cargo_capacity() {
        let ships = vec![
            UnitCount::new("small_cargo", 2),
            UnitCount::new("light_fighter", 10),
        ];
        // 2 * 5000 + 10 * 50
        assert_eq!(cargo_capacity(&ships, catalog::catalog()), 10_500.0);
    }

    mod dispatch {
        use super::*;
        use crate::models::{Planet, ResourceStock};

        fn source_body() -> Body {
            let mut ships = HashMap::new();
            ships.insert("small_cargo".to_string(), 5);
            ships.insert("light_fighter".to_string(), 20);
            Body::Planet(Planet {
                id: Uuid::new_v4(),
                player: Uuid::new_v4(),
                universe: Uuid::new_v4(),
                coordinates: Coordinates::new(1, 1, 4, BodyKind::Planet),
                name: "port".to_string(),
                fields: 163,
                min_temperature: 0,
                max_temperature: 40,
                diameter: 12_800,
                homeworld: true,
                last_activity: Utc::now(),
                resources: vec![
                    ResourceStock::new("metal", 10_000.0, 0.0, 100_000.0),
                    ResourceStock::new("crystal", 10_000.0, 0.0, 100_000.0),
                    ResourceStock::new("deuterium", 10_000.0, 0.0, 100_000.0),
                ],
                buildings: Default::default(),
                ships,
                defenses: Default::default(),
            })
        }

        fn owner(body: &Body) -> Player {
            Player {
                id: body.player(),
                account: Uuid::new_v4(),
                universe: body.universe(),
                name: "captain".to_string(),
                economy_points: 0.0,
                research_points: 0.0,
                military_points: 0.0,
                fleets_count: 0,
                expeditions_count: 0,
                technologies: Default::default(),
                created_at: Utc::now(),
            }
        }

        fn request(ships: Vec<UnitCount>, cargo: Vec<ResourceAmount>) -> ComponentRequest {
            ComponentRequest {
                source: Uuid::nil(),
                speed_ratio: 1.0,
                ships,
                cargo,
            }
        }

        fn target() -> Coordinates {
            Coordinates::new(1, 5, 8, BodyKind::Planet)
        }

        #[test]
        fn test_component_accepted_with_fuel_bill() {
            let body = source_body();
            let player = owner(&body);
            let mut req = request(
                vec![UnitCount::new("small_cargo", 2)],
                vec![ResourceAmount::new("metal", 4_000.0)],
            );
            req.source = body.id();
            let universe = Universe::with_defaults(body.universe(), "test");
            let (component, _, ft_secs) = validate_component(
                &req,
                &body,
                &player,
                &target(),
                &universe,
                catalog::catalog(),
            )
            .unwrap();
            assert_eq!(component.source, body.id());
            assert_eq!(component.consumption.len(), 1);
            assert_eq!(component.consumption[0].resource, "deuterium");
            assert!(component.consumption[0].amount > 0.0);
            assert!(ft_secs > 10.0);
        }

        #[test]
        fn test_cargo_over_capacity_rejected() {
            let body = source_body();
            let player = owner(&body);
            let mut req = request(
                vec![UnitCount::new("small_cargo", 1)],
                vec![ResourceAmount::new("metal", 6_000.0)],
            );
            req.source = body.id();
            let universe = Universe::with_defaults(body.universe(), "test");
            let result = validate_component(
                &req,
                &body,
                &player,
                &target(),
                &universe,
                catalog::catalog(),
            );
            assert!(matches!(result, Err(Error::InsufficientCargo)));
        }

        #[test]
        fn test_more_ships_than_hangared_rejected() {
            let body = source_body();
            let player = owner(&body);
            let mut req = request(vec![UnitCount::new("small_cargo", 50)], vec![]);
            req.source = body.id();
            let universe = Universe::with_defaults(body.universe(), "test");
            let result = validate_component(
                &req,
                &body,
                &player,
                &target(),
                &universe,
                catalog::catalog(),
            );
            assert!(matches!(result, Err(Error::InvalidFleetComponent)));
        }

        #[test]
        fn test_unknown_cargo_resource_rejected() {
            let body = source_body();
            let player = owner(&body);
            let mut req = request(
                vec![UnitCount::new("small_cargo", 1)],
                vec![ResourceAmount::new("antimatter", 10.0)],
            );
            req.source = body.id();
            let universe = Universe::with_defaults(body.universe(), "test");
            let result = validate_component(
                &req,
                &body,
                &player,
                &target(),
                &universe,
                catalog::catalog(),
            );
            assert!(matches!(result, Err(Error::InvalidCargo)));
        }

        #[test]
        fn test_fuel_must_be_affordable() {
            let mut body = source_body();
            if let Some(stock) = body.stock_mut("deuterium") {
                stock.amount = 0.0;
            }
            let player = owner(&body);
            let mut req = request(vec![UnitCount::new("small_cargo", 1)], vec![]);
            req.source = body.id();
            let universe = Universe::with_defaults(body.universe(), "test");
            let result = validate_component(
                &req,
                &body,
                &player,
                &target(),
                &universe,
                catalog::catalog(),
            );
            assert!(matches!(result, Err(Error::InvalidAmountForAction)));
        }

        #[test]
        fn test_drive_research_speeds_the_component() {
            let body = source_body();
            let mut fast_player = owner(&body);
            fast_player
                .technologies
                .insert("combustion_drive".to_string(), 10);
            let slow_player = owner(&body);
            let ships = vec![UnitCount::new("small_cargo", 1)];
            let slow = slowest_speed(&ships, &slow_player, catalog::catalog()).unwrap();
            let fast = slowest_speed(&ships, &fast_player, catalog::catalog()).unwrap();
            assert_eq!(slow, 5_000.0);
            assert_eq!(fast, 10_000.0);
        }

        #[test]
        fn test_objective_hostility_rules() {
            let body = source_body();
            let attack = catalog::catalog().objective(OBJECTIVE_ATTACK).unwrap();
            // own planet cannot be attacked
            let result = check_objective_target(attack, &body.coordinates(), Some(&body), body.player());
            assert!(matches!(result, Err(Error::InvalidObjective)));
            // someone else's can
            assert!(check_objective_target(attack, &body.coordinates(), Some(&body), Uuid::new_v4()).is_ok());
            // an empty slot cannot
            let empty = Coordinates::new(1, 9, 9, BodyKind::Planet);
            assert!(matches!(
                check_objective_target(attack, &empty, None, Uuid::new_v4()),
                Err(Error::NonExistingPlanet)
            ));
        }
    }
}
