use chrono::Utc;
use rusqlite::Connection;
use serde::Deserialize;

use crate::db::queries;
use crate::errors::AppError;
use crate::models::lenient::opt_string;
use crate::models::{Service, MAX_DURATION_MINUTES};

#[derive(Debug, Default, Deserialize)]
pub struct NewService {
    #[serde(default, deserialize_with = "opt_string")]
    pub name: Option<String>,
    #[serde(default, deserialize_with = "opt_string")]
    pub short_name: Option<String>,
    #[serde(default, alias = "duration", deserialize_with = "opt_string")]
    pub duration_minutes: Option<String>,
    #[serde(default, deserialize_with = "opt_string")]
    pub price: Option<String>,
    #[serde(default)]
    pub notes: Option<String>,
}

/// Add a service to the catalog. A name that belonged to a soft-deleted
/// service brings that row back with the new details.
pub fn create_service(conn: &Connection, req: &NewService) -> Result<Service, AppError> {
    let name = req
        .name
        .clone()
        .ok_or_else(|| AppError::validation("Missing service name"))?;

    let duration_minutes = req
        .duration_minutes
        .as_deref()
        .map(|d| {
            d.trim()
                .parse::<i64>()
                .ok()
                .filter(|m| (1..=MAX_DURATION_MINUTES).contains(m))
                .ok_or_else(|| AppError::validation("Invalid duration"))
        })
        .transpose()?;
    let price = req
        .price
        .as_deref()
        .map(|p| {
            p.trim()
                .replace(',', ".")
                .parse::<f64>()
                .ok()
                .filter(|p| p.is_finite() && *p >= 0.0)
                .ok_or_else(|| AppError::validation("Invalid price"))
        })
        .transpose()?;

    match queries::find_service_by_name_any(conn, &name)? {
        Some(existing) if existing.deleted_at.is_none() => {
            Err(AppError::validation(format!("Service already exists: {name}")))
        }
        Some(existing) => {
            let service = Service {
                short_name: req.short_name.clone(),
                duration_minutes,
                price,
                notes: req.notes.clone(),
                deleted_at: None,
                ..existing
            };
            queries::restore_service(conn, &service)?;
            tracing::info!(service_id = %service.id, name = %service.name, "service restored");
            Ok(service)
        }
        None => {
            let service = Service {
                id: uuid::Uuid::new_v4().to_string(),
                name,
                short_name: req.short_name.clone(),
                duration_minutes,
                price,
                standard_duration_prices: vec![],
                notes: req.notes.clone(),
                created_at: Utc::now(),
                deleted_at: None,
            };
            queries::create_service(conn, &service)?;
            tracing::info!(service_id = %service.id, name = %service.name, "service created");
            Ok(service)
        }
    }
}

pub fn soft_delete_service(conn: &Connection, id: &str) -> Result<(), AppError> {
    if !queries::soft_delete_service(conn, id)? {
        return Err(AppError::not_found("Service not found"));
    }
    tracing::info!(service_id = %id, "service soft-deleted");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db;

    #[test]
    fn test_create_service_validates() {
        let conn = db::init_db(":memory:").unwrap();
        let req: NewService =
            serde_json::from_str(r#"{"name":"Hot Stones","duration":"75","price":"65,5"}"#).unwrap();
        let service = create_service(&conn, &req).unwrap();
        assert_eq!(service.duration_minutes, Some(75));
        assert_eq!(service.price, Some(65.5));

        assert!(matches!(create_service(&conn, &req), Err(AppError::Validation(_))));

        for duration in ["0", "1441", "forever"] {
            let req: NewService =
                serde_json::from_str(&format!(r#"{{"name":"Cupping","duration":"{duration}"}}"#))
                    .unwrap();
            assert!(matches!(create_service(&conn, &req), Err(AppError::Validation(_))));
        }

        soft_delete_service(&conn, &service.id).unwrap();
        assert!(matches!(
            soft_delete_service(&conn, &service.id),
            Err(AppError::NotFound(_))
        ));
    }

    #[test]
    fn test_recreating_deleted_service_restores_it() {
        let conn = db::init_db(":memory:").unwrap();
        soft_delete_service(&conn, "svc-thai-oil").unwrap();

        let req: NewService =
            serde_json::from_str(r#"{"name":"Thai Oil","duration":90,"price":"70"}"#).unwrap();
        let restored = create_service(&conn, &req).unwrap();
        assert_eq!(restored.id, "svc-thai-oil");
        assert_eq!(restored.duration_minutes, Some(90));
        assert_eq!(restored.price, Some(70.0));

        let listed = queries::find_service_by_name(&conn, "Thai Oil").unwrap().unwrap();
        assert_eq!(listed, restored);

        assert!(matches!(create_service(&conn, &req), Err(AppError::Validation(_))));
    }
}
