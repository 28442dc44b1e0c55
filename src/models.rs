use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

// --- Remote API Schemas (Responses) ---

/// Client
///
/// One row of the admin client list (`GET /admin/users`).
/// Dates are kept as the API sends them; see `parse_api_date`.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Client {
    pub id: String,
    pub name: String,
    pub email: String,
    pub plan: String,
    #[serde(default)]
    pub start_date: String,
    #[serde(default)]
    pub due_date: String,
}

/// ClientDetail
///
/// A single client record including the free-text meal plan
/// (`GET /admin/users/{id}`, `GET /client/me`).
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ClientDetail {
    pub id: String,
    pub name: String,
    pub email: String,
    #[serde(default)]
    pub plan: String,
    #[serde(default)]
    pub start_date: String,
    #[serde(default)]
    pub due_date: String,
    #[serde(default)]
    pub meal_plan: Option<String>,
}

/// Body of `PUT /admin/users/{id}`.
#[derive(Debug, Clone, Deserialize)]
pub struct UpdatedClient {
    pub user: ClientDetail,
}

/// WeightLog
///
/// One logged weight entry, in kilograms.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct WeightLog {
    pub id: String,
    pub date: String,
    pub weight: f64,
}

// --- Request Payloads ---

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

/// ContactInquiry
///
/// Public contact form, also posted as-is to `POST /contact/detail`.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct ContactInquiry {
    pub name: String,
    pub number: String,
    pub email: String,
    #[serde(default)]
    pub service: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct NewClient {
    pub name: String,
    pub email: String,
    pub password: String,
    pub plan: String,
}

/// UpdateClient
///
/// Full-record update for `PUT /admin/users/{id}`. The API expects every field,
/// so partial edits are merged into the current record first.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct UpdateClient {
    pub name: String,
    pub email: String,
    pub plan: String,
    pub due_date: String,
}

impl UpdateClient {
    pub fn from_current(current: &ClientDetail) -> Self {
        Self {
            name: current.name.clone(),
            email: current.email.clone(),
            plan: current.plan.clone(),
            due_date: current.due_date.clone(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct MealPlanUpdate {
    pub meal_plan: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WeightEntry {
    pub weight: f64,
}

// --- Portal Vocabulary ---

/// Plans offered when creating a client.
pub const PLANS: [&str; 3] = ["3 Day Trial", "21 Day Challenge", "Monthly Sustain"];

/// Services listed on the contact form.
pub const SERVICES: [&str; 5] = [
    "Weight Loss / Gain",
    "Immune & Sports Nutrition",
    "Kids Nutrition",
    "Bone Health",
    "Heart Health",
];

/// BillingStatus
///
/// Derived from a client's payment due date relative to today, compared by calendar day.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BillingStatus {
    PaymentDue,
    DueToday,
    Active,
}

impl BillingStatus {
    /// An unparseable or missing due date counts as `Active`.
    pub fn from_due_date(due_date: &str, today: NaiveDate) -> Self {
        match parse_api_date(due_date) {
            Some(due) if due < today => BillingStatus::PaymentDue,
            Some(due) if due == today => BillingStatus::DueToday,
            _ => BillingStatus::Active,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            BillingStatus::PaymentDue => "Payment Due",
            BillingStatus::DueToday => "Due Today",
            BillingStatus::Active => "Active",
        }
    }

    pub fn css_class(self) -> &'static str {
        match self {
            BillingStatus::PaymentDue => "status status-overdue",
            BillingStatus::DueToday => "status status-today",
            BillingStatus::Active => "status status-active",
        }
    }
}

/// parse_api_date
///
/// Accepts `YYYY-MM-DD` as well as full ISO timestamps (`2025-11-03T00:00:00.000Z`)
/// by reading the leading calendar date only.
pub fn parse_api_date(value: &str) -> Option<NaiveDate> {
    let day = value.trim().get(..10)?;
    NaiveDate::parse_from_str(day, "%Y-%m-%d").ok()
}

/// Display form used across the portal, e.g. `3 Nov 2025`. Unparseable input is shown as-is.
pub fn format_api_date(value: &str) -> String {
    match parse_api_date(value) {
        Some(date) => date.format("%-d %b %Y").to_string(),
        None => value.to_string(),
    }
}

/// Value for an `<input type="date">`.
pub fn date_input_value(value: &str) -> String {
    parse_api_date(value)
        .map(|date| date.format("%Y-%m-%d").to_string())
        .unwrap_or_default()
}

/// parse_weight
///
/// Validates a submitted weight: must be a finite number above zero.
pub fn parse_weight(raw: &str) -> Option<f64> {
    raw.trim()
        .parse::<f64>()
        .ok()
        .filter(|value| value.is_finite() && *value > 0.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn day(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn billing_status_by_day() {
        let today = day(2025, 11, 3);
        assert_eq!(
            BillingStatus::from_due_date("2025-11-02", today),
            BillingStatus::PaymentDue
        );
        assert_eq!(
            BillingStatus::from_due_date("2025-11-03T18:30:00.000Z", today),
            BillingStatus::DueToday
        );
        assert_eq!(
            BillingStatus::from_due_date("2025-12-01", today),
            BillingStatus::Active
        );
        assert_eq!(BillingStatus::from_due_date("", today), BillingStatus::Active);
    }

    #[test]
    fn dates_format_for_display_and_inputs() {
        assert_eq!(format_api_date("2025-11-03T00:00:00.000Z"), "3 Nov 2025");
        assert_eq!(format_api_date("soon"), "soon");
        assert_eq!(date_input_value("2025-01-09T00:00:00Z"), "2025-01-09");
        assert_eq!(date_input_value(""), "");
    }

    #[test]
    fn weight_validation() {
        assert_eq!(parse_weight(" 72.5 "), Some(72.5));
        assert_eq!(parse_weight("0"), None);
        assert_eq!(parse_weight("-3"), None);
        assert_eq!(parse_weight("NaN"), None);
        assert_eq!(parse_weight("heavy"), None);
    }

    #[test]
    fn client_detail_reads_camel_case() {
        let detail: ClientDetail = serde_json::from_str(
            r#"{"id":"c1","name":"Asha","email":"a@x.in","plan":"Monthly Sustain",
                "startDate":"2025-10-01","dueDate":"2025-11-01","mealPlan":"Oats"}"#,
        )
        .unwrap();
        assert_eq!(detail.meal_plan.as_deref(), Some("Oats"));
        assert_eq!(detail.due_date, "2025-11-01");
    }

    #[test]
    fn update_client_writes_camel_case() {
        let body = serde_json::to_value(UpdateClient {
            name: "Asha".into(),
            email: "a@x.in".into(),
            plan: "3 Day Trial".into(),
            due_date: "2025-11-01".into(),
        })
        .unwrap();
        assert_eq!(body["dueDate"], "2025-11-01");
    }
}
