use crate::db::{self, db_models};
use crate::error::{Error, Result};
use crate::models::Account;
use crate::schema::accounts;
use diesel::QueryDsl as _;
use diesel::SelectableHelper as _;
use diesel_async::AsyncPgConnection;
use diesel_async::RunQueryDsl as _;
use serde::Serialize;
use uuid::Uuid;

/// Wire payload for the account routines; exactly the fields the routine
/// reads.
#[derive(Debug, Serialize)]
struct AccountPayload<'a> {
    id: Uuid,
    name: &'a str,
    mail: &'a str,
    password: &'a str,
}

pub async fn create(conn: &mut AsyncPgConnection, account: &Account) -> Result<()> {
    account.validate()?;
    let payload = AccountPayload {
        id: account.id,
        name: &account.name,
        mail: &account.mail,
        password: &account.password,
    };
    db::execute(conn, "create_account", &payload)
        .await
        .map_err(|e| match e {
            Error::DuplicatedElement { constraint } if constraint.contains("mail") => {
                Error::DuplicatedMail
            }
            other => other,
        })
}

pub async fn update(conn: &mut AsyncPgConnection, account: &Account) -> Result<()> {
    account.validate()?;
    let payload = AccountPayload {
        id: account.id,
        name: &account.name,
        mail: &account.mail,
        password: &account.password,
    };
    db::execute(conn, "update_account", &payload)
        .await
        .map_err(|e| match e {
            Error::DuplicatedElement { constraint } if constraint.contains("mail") => {
                Error::DuplicatedMail
            }
            Error::Db(_) => Error::NonExistingAccount,
            other => other,
        })
}

pub async fn fetch(conn: &mut AsyncPgConnection, id: Uuid) -> Result<Account> {
    let row: db_models::Account = accounts::table
        .find(id)
        .select(db_models::Account::as_select())
        .first(conn)
        .await
        .map_err(|e| match Error::from_db(e) {
            Error::ElementNotFound => Error::NonExistingAccount,
            other => other,
        })?;
    Ok(Account {
        id: row.id,
        name: row.name,
        mail: row.mail,
        password: row.password,
        created_at: row.created_at,
    })
}
