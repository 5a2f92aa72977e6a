use crate::db;
use crate::error::{Error, Result};
use crate::models::{EspionageReport, ExpeditionReport, FightReport};
use crate::schema::expedition_reports;
use diesel::ExpressionMethods as _;
use diesel_async::AsyncPgConnection;
use diesel_async::RunQueryDsl as _;

/// The whole report is the wire payload; the routine extracts the id and
/// universe for the row columns and keeps the rest as the document.
pub async fn save_fight(conn: &mut AsyncPgConnection, report: &FightReport) -> Result<()> {
    db::execute(conn, "fight_report", report)
        .await
        .map_err(|e| e.refine_foreign_key())
}

pub async fn save_espionage(conn: &mut AsyncPgConnection, report: &EspionageReport) -> Result<()> {
    db::execute(conn, "espionage_report", report)
        .await
        .map_err(|e| e.refine_foreign_key())
}

pub async fn save_expedition(
    conn: &mut AsyncPgConnection,
    report: &ExpeditionReport,
) -> Result<()> {
    diesel::insert_into(expedition_reports::table)
        .values((
            expedition_reports::id.eq(report.id),
            expedition_reports::universe_id.eq(report.universe),
            expedition_reports::report
                .eq(serde_json::to_value(report).map_err(|_| Error::InvalidUpdateData)?),
        ))
        .execute(conn)
        .await
        .map_err(Error::from_db)?;
    Ok(())
}
