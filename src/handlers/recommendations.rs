use std::collections::HashSet;

use axum::{
    extract::{Path, State},
    Json,
};
use chrono::{Duration, Utc};
use sea_orm::{ColumnTrait, EntityTrait, QueryFilter, QueryOrder, QuerySelect};
use uuid::Uuid;

use crate::entities::{service, user_activity};
use crate::error::AppResult;
use crate::AppState;

const LOOKBACK_DAYS: i64 = 30;
const MAX_ACTIVITIES: u64 = 50;
const MAX_RECOMMENDATIONS: usize = 5;
const TOP_LABELS: usize = 3;
const PER_LABEL: usize = 3;

/// Rank a user's recent services-of-interest and suggest up to five services
/// they have not interacted with yet. With no activity at all, an arbitrary
/// sample is returned instead.
pub async fn recommend(
    State(state): State<AppState>,
    Path(user_id): Path<Uuid>,
) -> AppResult<Json<Vec<service::Model>>> {
    let lookback_start = Utc::now() - Duration::days(LOOKBACK_DAYS);

    let activities = user_activity::Entity::find()
        .filter(user_activity::Column::UserId.eq(user_id))
        .filter(user_activity::Column::CreatedAt.gte(lookback_start))
        .order_by_desc(user_activity::Column::CreatedAt)
        .limit(MAX_ACTIVITIES)
        .all(&state.db)
        .await?;

    if activities.is_empty() {
        let sample = service::Entity::find()
            .limit(MAX_RECOMMENDATIONS as u64)
            .all(&state.db)
            .await?;
        return Ok(Json(sample));
    }

    let seen: HashSet<Uuid> = activities.iter().filter_map(|a| a.service_id).collect();
    let labels = rank_interest_labels(&activities);

    let services = service::Entity::find().all(&state.db).await?;
    let picks = select_recommendations(services, &labels, &seen);

    Ok(Json(picks))
}

/// Interest labels ordered by occurrence count (ties keep first-seen order).
fn rank_interest_labels(activities: &[user_activity::Model]) -> Vec<String> {
    let mut counts: Vec<(String, usize)> = Vec::new();

    for activity in activities {
        let Some(label) = &activity.service_type else {
            continue;
        };
        match counts.iter_mut().find(|(l, _)| l == label) {
            Some((_, count)) => *count += 1,
            None => counts.push((label.clone(), 1)),
        }
    }

    counts.sort_by(|a, b| b.1.cmp(&a.1));
    counts.into_iter().map(|(label, _)| label).collect()
}

/// Pick up to three title matches for each of the top three labels, skipping
/// anything the user already saw, then backfill to five with whatever is
/// left.
fn select_recommendations(
    services: Vec<service::Model>,
    labels: &[String],
    seen: &HashSet<Uuid>,
) -> Vec<service::Model> {
    let mut chosen_ids: HashSet<Uuid> = HashSet::new();
    let mut picks: Vec<service::Model> = Vec::new();

    for label in labels.iter().take(TOP_LABELS) {
        let needle = label.to_lowercase();
        let matches: Vec<&service::Model> = services
            .iter()
            .filter(|s| {
                s.title.to_lowercase().contains(&needle)
                    && !seen.contains(&s.id)
                    && !chosen_ids.contains(&s.id)
            })
            .take(PER_LABEL)
            .collect();

        for service in matches {
            chosen_ids.insert(service.id);
            picks.push(service.clone());
        }

        if picks.len() >= MAX_RECOMMENDATIONS {
            break;
        }
    }

    if picks.len() < MAX_RECOMMENDATIONS {
        let backfill: Vec<service::Model> = services
            .iter()
            .filter(|s| !seen.contains(&s.id) && !chosen_ids.contains(&s.id))
            .take(MAX_RECOMMENDATIONS - picks.len())
            .cloned()
            .collect();
        picks.extend(backfill);
    }

    picks.truncate(MAX_RECOMMENDATIONS);
    picks
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entities::user_activity::ActivityType;
    use chrono::Utc;
    use rust_decimal::Decimal;

    fn activity(service_type: Option<&str>, service_id: Option<Uuid>) -> user_activity::Model {
        user_activity::Model {
            id: Uuid::new_v4(),
            user_id: Uuid::new_v4(),
            activity_type: ActivityType::View,
            service_id,
            service_type: service_type.map(str::to_string),
            search_query: None,
            created_at: Utc::now().into(),
        }
    }

    fn svc(title: &str) -> service::Model {
        service::Model {
            id: Uuid::new_v4(),
            title: title.to_string(),
            description: "test".to_string(),
            price: Decimal::new(10000, 2),
            provider_name: "P".to_string(),
            provider_contact: "123".to_string(),
            provider_email: "p@x.com".to_string(),
            lng: None,
            lat: None,
            created_by: None,
            created_at: Utc::now().into(),
        }
    }

    #[test]
    fn labels_ranked_by_frequency() {
        let activities = vec![
            activity(Some("Cleaning"), None),
            activity(Some("Plumbing"), None),
            activity(Some("Plumbing"), None),
            activity(None, None),
            activity(Some("Electrical"), None),
        ];

        let ranked = rank_interest_labels(&activities);
        assert_eq!(ranked[0], "Plumbing");
        assert_eq!(ranked.len(), 3);
    }

    #[test]
    fn tie_keeps_first_seen_order() {
        let activities = vec![
            activity(Some("Cleaning"), None),
            activity(Some("Plumbing"), None),
        ];
        assert_eq!(rank_interest_labels(&activities), vec!["Cleaning", "Plumbing"]);
    }

    #[test]
    fn seen_services_are_never_recommended() {
        let viewed = svc("Plumbing Repairs");
        let fresh = svc("Plumbing Installation");
        let other = svc("Garden Care");

        let seen: HashSet<Uuid> = [viewed.id].into();
        let picks = select_recommendations(
            vec![viewed.clone(), fresh.clone(), other],
            &["Plumbing".to_string()],
            &seen,
        );

        assert!(picks.iter().all(|s| s.id != viewed.id));
        assert!(picks.iter().any(|s| s.id == fresh.id));
    }

    #[test]
    fn backfills_to_five_when_labels_are_thin() {
        let services: Vec<service::Model> = (0..8).map(|i| svc(&format!("Service {i}"))).collect();
        let picks =
            select_recommendations(services, &["Plumbing".to_string()], &HashSet::new());
        assert_eq!(picks.len(), 5);
    }

    #[test]
    fn caps_at_five_even_with_many_matches() {
        let services: Vec<service::Model> = (0..10)
            .map(|i| svc(&format!("Plumbing Option {i}")))
            .collect();
        let labels = vec![
            "Plumbing".to_string(),
            "Plumbing".to_string(),
            "Plumbing".to_string(),
        ];
        let picks = select_recommendations(services, &labels, &HashSet::new());
        assert_eq!(picks.len(), 5);
    }
}
