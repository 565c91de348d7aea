//! Read-only reports over committed data.

use axum::extract::State;
use axum::Json;
use chrono::{DateTime, Duration, Utc};
use serde::Deserialize;
use tally_core::{CategoryBreakdown, InventorySummary, ReasonSummary, ValidationError};

use crate::auth::AuthUser;
use crate::error::ApiResult;
use crate::extract::ValidQuery;
use crate::policy::{authorize, Capability};
use crate::AppState;

/// Window used when `from` is omitted.
const DEFAULT_WINDOW_DAYS: i64 = 30;

/// `?from&to`, RFC 3339. The range is half-open: `[from, to)`.
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RangeQuery {
    pub from: Option<DateTime<Utc>>,
    pub to: Option<DateTime<Utc>>,
}

impl RangeQuery {
    /// Defaults to the last 30 days ending now.
    pub fn resolve(self, now: DateTime<Utc>) -> Result<(DateTime<Utc>, DateTime<Utc>), ValidationError> {
        let to = self.to.unwrap_or(now);
        let from = self.from.unwrap_or(to - Duration::days(DEFAULT_WINDOW_DAYS));

        if from >= to {
            return Err(ValidationError::InvalidFormat {
                field: "from".to_string(),
                reason: "must be earlier than to".to_string(),
            });
        }
        Ok((from, to))
    }
}

pub async fn inventory_summary(
    State(state): State<AppState>,
    user: AuthUser,
) -> ApiResult<Json<InventorySummary>> {
    authorize(&user, Capability::ViewReports)?;
    Ok(Json(state.db.reports().inventory_summary().await?))
}

pub async fn categories(
    State(state): State<AppState>,
    user: AuthUser,
) -> ApiResult<Json<Vec<CategoryBreakdown>>> {
    authorize(&user, Capability::ViewReports)?;
    Ok(Json(state.db.reports().category_breakdown().await?))
}

pub async fn transactions(
    State(state): State<AppState>,
    user: AuthUser,
    ValidQuery(query): ValidQuery<RangeQuery>,
) -> ApiResult<Json<Vec<ReasonSummary>>> {
    authorize(&user, Capability::ViewReports)?;

    let (from, to) = query.resolve(Utc::now())?;
    Ok(Json(state.db.reports().transaction_summary(from, to).await?))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_range_defaults_to_thirty_days() {
        let now = Utc::now();
        let (from, to) = RangeQuery::default().resolve(now).unwrap();
        assert_eq!(to, now);
        assert_eq!(to - from, Duration::days(30));
    }

    #[test]
    fn inverted_range_rejected() {
        let now = Utc::now();
        let query = RangeQuery {
            from: Some(now),
            to: Some(now - Duration::hours(1)),
        };
        assert_eq!(query.resolve(now).unwrap_err().field(), "from");
    }
}
