use rust_decimal::Decimal;
use sea_orm::entity::prelude::*;
use sea_orm::FromJsonQueryResult;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Hash, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "Enum", enum_name = "user_role")]
#[serde(rename_all = "lowercase")]
pub enum UserRole {
    #[sea_orm(string_value = "consumer")]
    Consumer,
    #[sea_orm(string_value = "provider")]
    Provider,
}

/// Role-specific profile data. Exactly one variant is stored, selected by
/// the user's role; profile updates replace it wholesale.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, FromJsonQueryResult)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum RoleDetails {
    Provider {
        service_type: String,
        years_experience: i32,
        hourly_rate: Decimal,
        /// Maintained by the feedback path; absent until the first rating.
        #[serde(default)]
        average_rating: Option<Decimal>,
        #[serde(default)]
        rating_count: Option<i64>,
    },
    Consumer {
        address: String,
    },
}

impl RoleDetails {
    pub fn matches_role(&self, role: &UserRole) -> bool {
        matches!(
            (self, role),
            (RoleDetails::Provider { .. }, UserRole::Provider)
                | (RoleDetails::Consumer { .. }, UserRole::Consumer)
        )
    }
}

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "user")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    /// Hex-encoded nonce + ciphertext. Never used for equality; lookups go
    /// through `email_hash`.
    #[serde(skip_serializing)]
    pub email_encrypted: String,
    #[sea_orm(unique)]
    #[serde(skip_serializing)]
    pub email_hash: String,
    /// Absent on placeholder accounts auto-created from a booking request;
    /// such accounts cannot log in until they register.
    #[serde(skip_serializing)]
    pub password_hash: Option<String>,
    pub name: Option<String>,
    pub age: Option<i32>,
    pub contact_number: Option<String>,
    pub role: UserRole,
    #[sea_orm(column_type = "JsonBinary", nullable)]
    pub details: Option<RoleDetails>,
    pub created_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::booking::Entity")]
    Bookings,
    #[sea_orm(has_many = "super::user_activity::Entity")]
    Activities,
}

impl Related<super::booking::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Bookings.def()
    }
}

impl Related<super::user_activity::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Activities.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn details_must_match_role() {
        let provider = RoleDetails::Provider {
            service_type: "Plumbing".to_string(),
            years_experience: 5,
            hourly_rate: Decimal::new(8500, 2),
            average_rating: None,
            rating_count: None,
        };
        assert!(provider.matches_role(&UserRole::Provider));
        assert!(!provider.matches_role(&UserRole::Consumer));

        let rated = RoleDetails::Provider {
            service_type: "Plumbing".to_string(),
            years_experience: 5,
            hourly_rate: Decimal::new(8500, 2),
            average_rating: Some(Decimal::new(47, 1)),
            rating_count: Some(12),
        };
        assert!(rated.matches_role(&UserRole::Provider));

        // Records stored before ratings existed still deserialize.
        let legacy: RoleDetails = serde_json::from_str(
            r#"{"kind":"provider","service_type":"Plumbing","years_experience":5,"hourly_rate":"85.00"}"#,
        )
        .unwrap();
        assert!(matches!(
            legacy,
            RoleDetails::Provider {
                average_rating: None,
                rating_count: None,
                ..
            }
        ));

        let consumer = RoleDetails::Consumer {
            address: "12 Elm St".to_string(),
        };
        assert!(consumer.matches_role(&UserRole::Consumer));
        assert!(!consumer.matches_role(&UserRole::Provider));
    }
}
