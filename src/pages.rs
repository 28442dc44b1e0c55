use askama::Template;
use axum::{
    http::StatusCode,
    response::{Html, IntoResponse, Response},
};
use chrono::NaiveDate;

use crate::{
    error::PageError,
    routes::admin::edit_client_path,
    models::{
        BillingStatus, Client, ClientDetail, WeightLog, date_input_value, format_api_date,
        parse_api_date,
    },
};

// --- View Models ---

/// SelectOption
///
/// One `<option>` of a select box, with the current selection precomputed.
pub struct SelectOption {
    pub value: &'static str,
    pub selected: bool,
}

pub fn select_options(values: &[&'static str], current: &str) -> Vec<SelectOption> {
    values
        .iter()
        .map(|&value| SelectOption {
            value,
            selected: value == current,
        })
        .collect()
}

/// ClientRow
///
/// A client as shown in the admin table, with billing status already derived.
pub struct ClientRow {
    pub edit_href: String,
    pub name: String,
    pub email: String,
    pub plan: String,
    pub start_date: String,
    pub due_date: String,
    pub status: &'static str,
    pub status_class: &'static str,
}

impl ClientRow {
    pub fn new(client: &Client, today: NaiveDate) -> Self {
        let status = BillingStatus::from_due_date(&client.due_date, today);
        Self {
            edit_href: edit_client_path(&client.id),
            name: client.name.clone(),
            email: client.email.clone(),
            plan: client.plan.clone(),
            start_date: format_api_date(&client.start_date),
            due_date: format_api_date(&client.due_date),
            status: status.label(),
            status_class: status.css_class(),
        }
    }
}

pub struct WeightRow {
    pub date: String,
    pub weight: String,
}

/// Weight history in chronological order. Entries with unreadable dates keep their API order at the end.
pub fn weight_rows(logs: &[WeightLog]) -> Vec<WeightRow> {
    chronological(logs)
        .into_iter()
        .map(|log| WeightRow {
            date: format_api_date(&log.date),
            weight: format!("{:.1} kg", log.weight),
        })
        .collect()
}

fn chronological(logs: &[WeightLog]) -> Vec<&WeightLog> {
    let mut sorted: Vec<&WeightLog> = logs.iter().collect();
    sorted.sort_by_key(|log| parse_api_date(&log.date).unwrap_or(NaiveDate::MAX));
    sorted
}

/// Progress
///
/// First-versus-latest weight summary on the client dashboard.
#[derive(Debug, PartialEq)]
pub struct Progress {
    pub starting: String,
    pub current: String,
    pub summary: String,
}

impl Progress {
    pub fn from_logs(logs: &[WeightLog]) -> Option<Self> {
        let sorted = chronological(logs);
        let first = sorted.first()?;
        let last = sorted.last()?;
        let change = first.weight - last.weight;

        let summary = if change > 0.05 {
            format!("You've lost {change:.1} kg! Keep it up!")
        } else if change < -0.05 {
            format!("You've gained {:.1} kg since you started.", -change)
        } else {
            "Your weight is holding steady.".to_string()
        };

        Some(Self {
            starting: format!("{:.1} kg", first.weight),
            current: format!("{:.1} kg", last.weight),
            summary,
        })
    }
}

/// ClientForm
///
/// Editable fields of the client being edited. Form actions point at the
/// identifier the admin navigated to, not the one echoed by the API.
pub struct ClientForm {
    pub edit_href: String,
    pub name: String,
    pub email: String,
    pub plan: String,
    pub due_input: String,
}

impl ClientForm {
    pub fn new(client: &ClientDetail, client_id: &str) -> Self {
        Self {
            edit_href: edit_client_path(client_id),
            name: client.name.clone(),
            email: client.email.clone(),
            plan: client.plan.clone(),
            due_input: date_input_value(&client.due_date),
        }
    }
}

// --- Public Templates ---

#[derive(Template)]
#[template(path = "home.html")]
pub struct HomePage;

#[derive(Template)]
#[template(path = "contact.html")]
pub struct ContactPage {
    pub name: String,
    pub number: String,
    pub email: String,
    pub services: Vec<SelectOption>,
    pub error: Option<String>,
}

#[derive(Template)]
#[template(path = "login.html")]
pub struct LoginPage {
    pub email: String,
    pub error: Option<String>,
}

#[derive(Template)]
#[template(path = "not_authorized.html")]
pub struct NotAuthorizedPage;

/// NoticePage
///
/// Full-page message for pages that cannot show their normal content.
#[derive(Template)]
#[template(path = "notice.html")]
pub struct NoticePage {
    pub heading: &'static str,
    pub message: String,
    pub back_href: &'static str,
}

#[derive(Template)]
#[template(path = "placeholder.html")]
pub struct PlaceholderPage;

// --- Client Portal Templates ---

#[derive(Template)]
#[template(path = "dashboard.html")]
pub struct DashboardPage {
    pub name: String,
    pub meal_plan: Option<String>,
    pub profile_error: Option<String>,
    pub weights: Vec<WeightRow>,
    pub progress: Option<Progress>,
    pub weights_error: Option<String>,
    pub weight_input: String,
    pub form_error: Option<String>,
}

// --- Admin Portal Templates ---

#[derive(Template)]
#[template(path = "admin/clients.html")]
pub struct AdminDashboardPage {
    pub rows: Vec<ClientRow>,
    pub error: Option<String>,
}

#[derive(Template)]
#[template(path = "admin/add_client.html")]
pub struct AddClientPage {
    pub name: String,
    pub email: String,
    pub plans: Vec<SelectOption>,
    pub error: Option<String>,
}

#[derive(Template)]
#[template(path = "admin/edit_client.html")]
pub struct EditClientPage {
    pub client: ClientForm,
    pub meal_plan: String,
    pub weights: Vec<WeightRow>,
    pub weights_error: Option<String>,
    pub error: Option<String>,
}

// --- Rendering ---

/// render
///
/// Renders a page with status 200.
pub fn render<T: Template>(page: &T) -> Result<Html<String>, PageError> {
    Ok(Html(page.render()?))
}

/// Renders a page with an explicit status, e.g. 404 or 422 re-renders.
pub fn render_with_status<T: Template>(status: StatusCode, page: &T) -> Response {
    match render(page) {
        Ok(html) => (status, html).into_response(),
        Err(e) => e.into_response(),
    }
}

/// The neutral page shown while a guard could not settle.
pub fn placeholder() -> Response {
    render_with_status(StatusCode::SERVICE_UNAVAILABLE, &PlaceholderPage)
}

pub fn notice(
    status: StatusCode,
    heading: &'static str,
    message: String,
    back_href: &'static str,
) -> Response {
    render_with_status(
        status,
        &NoticePage {
            heading,
            message,
            back_href,
        },
    )
}

pub fn not_found(message: &str, back_href: &'static str) -> Response {
    notice(StatusCode::NOT_FOUND, "Not found", message.to_string(), back_href)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn log(date: &str, weight: f64) -> WeightLog {
        WeightLog {
            id: date.to_string(),
            date: date.to_string(),
            weight,
        }
    }

    #[test]
    fn progress_uses_earliest_and_latest_dates() {
        let logs = vec![
            log("2025-10-08", 78.0),
            log("2025-10-01", 80.0),
            log("2025-10-04", 79.1),
        ];
        let progress = Progress::from_logs(&logs).unwrap();
        assert_eq!(progress.starting, "80.0 kg");
        assert_eq!(progress.current, "78.0 kg");
        assert_eq!(progress.summary, "You've lost 2.0 kg! Keep it up!");
    }

    #[test]
    fn progress_absent_without_logs() {
        assert_eq!(Progress::from_logs(&[]), None);
    }

    #[test]
    fn client_row_derives_status() {
        let client = Client {
            id: "c1".into(),
            name: "Asha".into(),
            email: "asha@example.in".into(),
            plan: "21 Day Challenge".into(),
            start_date: "2025-10-01".into(),
            due_date: "2025-10-31".into(),
        };
        let row = ClientRow::new(&client, NaiveDate::from_ymd_opt(2025, 11, 3).unwrap());
        assert_eq!(row.status, "Payment Due");
        assert_eq!(row.edit_href, "/admin/edit-client/c1");
        assert_eq!(row.due_date, "31 Oct 2025");
    }

    #[test]
    fn client_form_posts_to_requested_identifier() {
        let detail = ClientDetail {
            id: "c1-canonical".into(),
            name: "Asha".into(),
            email: "asha@example.in".into(),
            due_date: "2025-10-31T00:00:00.000Z".into(),
            ..ClientDetail::default()
        };
        let form = ClientForm::new(&detail, "c1");
        assert_eq!(form.edit_href, "/admin/edit-client/c1");
        assert_eq!(form.due_input, "2025-10-31");
    }

    #[test]
    fn select_marks_current_value() {
        let options = select_options(&["a", "b"], "b");
        assert!(!options[0].selected);
        assert!(options[1].selected);
    }

    #[test]
    fn templates_escape_user_content() {
        let html = LoginPage {
            email: "<script>".into(),
            error: None,
        }
        .render()
        .unwrap();
        assert!(!html.contains("<script>"));
    }
}
