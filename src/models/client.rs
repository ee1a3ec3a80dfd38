use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Client {
    pub id: String,
    pub name: String,
    pub surname: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub deleted_at: Option<DateTime<Utc>>,
}

impl Client {
    pub fn full_name(&self) -> String {
        match self.surname.as_deref().filter(|s| !s.is_empty()) {
            Some(surname) => format!("{} {surname}", self.name),
            None => self.name.clone(),
        }
    }

    pub fn is_deleted(&self) -> bool {
        self.deleted_at.is_some()
    }
}

/// Fields a similarity lookup may match on. Empty strings count as absent.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct ClientQuery {
    #[serde(default)]
    pub client_name: Option<String>,
    #[serde(default)]
    pub client_surname: Option<String>,
    #[serde(default)]
    pub client_email: Option<String>,
    #[serde(default)]
    pub client_phone: Option<String>,
}

impl ClientQuery {
    /// Non-empty (column, needle) pairs.
    pub fn filters(&self) -> Vec<(&'static str, &str)> {
        [
            ("name", self.client_name.as_deref()),
            ("surname", self.client_surname.as_deref()),
            ("email", self.client_email.as_deref()),
            ("phone", self.client_phone.as_deref()),
        ]
        .into_iter()
        .filter_map(|(col, v)| {
            v.map(str::trim)
                .filter(|v| !v.is_empty())
                .map(|v| (col, v))
        })
        .collect()
    }

    pub fn is_empty(&self) -> bool {
        self.filters().is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_blank_fields_are_not_filters() {
        let query = ClientQuery {
            client_name: Some("  ".to_string()),
            client_surname: None,
            client_email: Some("ana@".to_string()),
            client_phone: Some(String::new()),
        };
        assert_eq!(query.filters(), vec![("email", "ana@")]);
        assert!(!query.is_empty());
        assert!(ClientQuery::default().is_empty());
    }
}
