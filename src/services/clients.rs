use chrono::Utc;
use rusqlite::Connection;
use serde::Deserialize;

use crate::db::queries;
use crate::errors::AppError;
use crate::models::lenient::opt_string;
use crate::models::Client;

/// Editable client fields. `None` leaves the stored value as is.
#[derive(Debug, Default, Deserialize)]
pub struct ClientUpdate {
    #[serde(default, alias = "client_name", deserialize_with = "opt_string")]
    pub name: Option<String>,
    #[serde(default, alias = "client_surname")]
    pub surname: Option<String>,
    #[serde(default, alias = "client_email")]
    pub email: Option<String>,
    #[serde(default, alias = "client_phone", deserialize_with = "opt_string")]
    pub phone: Option<String>,
    #[serde(default, alias = "client_notes")]
    pub notes: Option<String>,
}

pub fn update_client(conn: &Connection, id: &str, req: &ClientUpdate) -> Result<Client, AppError> {
    let mut client = queries::get_client(conn, id)?
        .filter(|c| !c.is_deleted())
        .ok_or_else(|| AppError::not_found("Client not found"))?;

    let blank_to_none = |v: &String| Some(v.trim().to_string()).filter(|v| !v.is_empty());

    if let Some(name) = &req.name {
        client.name = name.clone();
    }
    if let Some(surname) = &req.surname {
        client.surname = blank_to_none(surname);
    }
    if let Some(email) = &req.email {
        client.email = blank_to_none(email);
    }
    if let Some(phone) = &req.phone {
        client.phone = Some(phone.clone());
    }
    if let Some(notes) = &req.notes {
        client.notes = blank_to_none(notes);
    }
    client.updated_at = Utc::now();

    queries::update_client(conn, &client)?;
    tracing::info!(client_id = %client.id, "client updated");
    Ok(client)
}

pub fn soft_delete_client(conn: &Connection, id: &str) -> Result<Client, AppError> {
    let client = queries::soft_delete_client(conn, id)?
        .ok_or_else(|| AppError::not_found("Client not found"))?;
    tracing::info!(client_id = %client.id, "client soft-deleted");
    Ok(client)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db;

    #[test]
    fn test_update_whitelisted_fields() {
        let conn = db::init_db(":memory:").unwrap();
        let now = Utc::now();
        queries::create_client(
            &conn,
            &Client {
                id: "c1".to_string(),
                name: "Ana".to_string(),
                surname: Some("Lopez".to_string()),
                email: None,
                phone: None,
                notes: None,
                created_at: now,
                updated_at: now,
                deleted_at: None,
            },
        )
        .unwrap();

        let req: ClientUpdate =
            serde_json::from_str(r#"{"client_phone":600000001,"surname":"","id":"hijack"}"#)
                .unwrap();
        let updated = update_client(&conn, "c1", &req).unwrap();
        assert_eq!(updated.id, "c1");
        assert_eq!(updated.phone.as_deref(), Some("600000001"));
        assert_eq!(updated.surname, None);
        assert_eq!(updated.name, "Ana");

        soft_delete_client(&conn, "c1").unwrap();
        assert!(matches!(
            update_client(&conn, "c1", &req),
            Err(AppError::NotFound(_))
        ));
    }
}
