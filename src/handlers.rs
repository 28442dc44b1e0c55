use crate::{
    AppConfig,
    api::{ApiState, AuthOutcome},
    error::PageError,
    guard::CurrentSession,
    models::{
        ContactInquiry, LoginRequest, NewClient, PLANS, SERVICES, UpdateClient, parse_weight,
    },
    pages::{
        self, AddClientPage, AdminDashboardPage, ClientForm, ClientRow, ContactPage,
        DashboardPage, EditClientPage, HomePage, LoginPage, NotAuthorizedPage, Progress,
        select_options, weight_rows,
    },
    routes::admin::edit_client_path,
    session::{Credentials, Role},
};
use axum::{
    Form,
    extract::{Path, State},
    http::{StatusCode, header},
    response::{Html, IntoResponse, Redirect, Response},
};
use serde::Deserialize;

// --- Form Structs ---

#[derive(Debug, Deserialize)]
pub struct WeightForm {
    #[serde(default)]
    pub weight: String,
}

#[derive(Debug, Deserialize)]
pub struct DetailsForm {
    pub name: String,
    pub email: String,
}

#[derive(Debug, Deserialize)]
pub struct BillingForm {
    pub due: String,
}

#[derive(Debug, Deserialize)]
pub struct MealPlanForm {
    #[serde(default)]
    pub meal_plan: String,
}

// --- Helpers ---

/// Copies every upstream `Set-Cookie` onto a redirect to `target`.
fn redirect_with_cookies(target: &str, outcome: AuthOutcome) -> Response {
    let mut response = Redirect::to(target).into_response();
    for cookie in outcome.set_cookies {
        response.headers_mut().append(header::SET_COOKIE, cookie);
    }
    response
}

/// whatsapp_url
///
/// Deep link that opens a chat with the business, pre-filled with the inquiry.
pub fn whatsapp_url(number: &str, inquiry: &ContactInquiry) -> Option<String> {
    let service = if inquiry.service.trim().is_empty() {
        "Not specified"
    } else {
        inquiry.service.as_str()
    };
    let message = format!(
        "*New Customer Inquiry from Website*:\n\n*Name:* {}\n*Number:* {}\n*Email:* {}\n*Service Interested In:* {}",
        inquiry.name, inquiry.number, inquiry.email, service
    );
    reqwest::Url::parse_with_params(&format!("https://wa.me/{number}"), &[("text", message)])
        .ok()
        .map(String::from)
}

// --- Public Pages ---

pub async fn home() -> Result<Html<String>, PageError> {
    pages::render(&HomePage)
}

pub async fn contact_form() -> Result<Html<String>, PageError> {
    pages::render(&ContactPage {
        name: String::new(),
        number: String::new(),
        email: String::new(),
        services: select_options(&SERVICES, ""),
        error: None,
    })
}

/// submit_contact
///
/// Stores the inquiry through the API, then hands the visitor over to WhatsApp.
/// On failure the form is shown again with what was typed.
pub async fn submit_contact(
    State(api): State<ApiState>,
    State(config): State<AppConfig>,
    Form(inquiry): Form<ContactInquiry>,
) -> Response {
    let outcome = api.submit_contact(&inquiry).await;

    let target = match outcome {
        Ok(()) => whatsapp_url(&config.whatsapp_number, &inquiry),
        Err(e) => {
            tracing::warn!(error = %e, "contact submission failed");
            None
        }
    };

    match target {
        Some(url) => Redirect::to(&url).into_response(),
        None => pages::render_with_status(
            StatusCode::BAD_GATEWAY,
            &ContactPage {
                services: select_options(&SERVICES, &inquiry.service),
                name: inquiry.name,
                number: inquiry.number,
                email: inquiry.email,
                error: Some("Something went wrong. Please try again.".to_string()),
            },
        ),
    }
}

pub async fn login_form() -> Result<Html<String>, PageError> {
    pages::render(&LoginPage {
        email: String::new(),
        error: None,
    })
}

/// login
///
/// Forwards the credentials to the API and relays its session cookie.
/// Admins land on `/admin`, everyone else on `/dashboard`.
pub async fn login(State(api): State<ApiState>, Form(request): Form<LoginRequest>) -> Response {
    match api.login(&request).await {
        Ok(outcome) => {
            let target = match outcome.role {
                Some(Role::Admin) => "/admin",
                _ => "/dashboard",
            };
            tracing::info!(redirect = target, "login accepted");
            redirect_with_cookies(target, outcome)
        }
        Err(e) => {
            tracing::info!(error = %e, "login rejected");
            pages::render_with_status(
                StatusCode::UNAUTHORIZED,
                &LoginPage {
                    email: request.email,
                    error: Some(e.user_message("Invalid email or password.")),
                },
            )
        }
    }
}

/// logout
///
/// Always ends on the landing page; cookies are only relayed when the API answered.
pub async fn logout(State(api): State<ApiState>, credentials: Credentials) -> Response {
    match api.logout(&credentials).await {
        Ok(outcome) => redirect_with_cookies("/", outcome),
        Err(e) => {
            tracing::warn!(error = %e, "logout call failed");
            Redirect::to("/").into_response()
        }
    }
}

pub async fn not_authorized() -> Response {
    pages::render_with_status(StatusCode::FORBIDDEN, &NotAuthorizedPage)
}

pub async fn not_found() -> Response {
    pages::not_found("The page you were looking for does not exist.", "/")
}

// --- Client Portal ---

/// Fetches the viewer's profile and weight history together and renders the dashboard.
async fn render_dashboard(
    api: &ApiState,
    credentials: &Credentials,
    weight_input: String,
    form_error: Option<String>,
    status: StatusCode,
) -> Response {
    let (profile, weights) = tokio::join!(
        api.my_profile(credentials),
        api.my_weight_logs(credentials)
    );

    let (name, meal_plan, profile_error) = match profile {
        Ok(profile) => (profile.name, profile.meal_plan, None),
        Err(e) => (
            "Client".to_string(),
            None,
            Some(e.user_message("Failed to load your meal plan")),
        ),
    };

    let (weights, progress, weights_error) = match weights {
        Ok(logs) => (weight_rows(&logs), Progress::from_logs(&logs), None),
        Err(e) => (
            Vec::new(),
            None,
            Some(e.user_message("Failed to load your weight history")),
        ),
    };

    pages::render_with_status(
        status,
        &DashboardPage {
            name,
            meal_plan: meal_plan.filter(|plan| !plan.trim().is_empty()),
            profile_error,
            weights,
            progress,
            weights_error,
            weight_input,
            form_error,
        },
    )
}

pub async fn dashboard(
    CurrentSession(session): CurrentSession,
    State(api): State<ApiState>,
    credentials: Credentials,
) -> Response {
    tracing::debug!(user_id = %session.user_id, "rendering client dashboard");
    render_dashboard(&api, &credentials, String::new(), None, StatusCode::OK).await
}

/// log_weight
///
/// Validates and records today's weight for the signed-in client.
pub async fn log_weight(
    CurrentSession(session): CurrentSession,
    State(api): State<ApiState>,
    credentials: Credentials,
    Form(form): Form<WeightForm>,
) -> Response {
    let Some(weight) = parse_weight(&form.weight) else {
        return render_dashboard(
            &api,
            &credentials,
            form.weight,
            Some("Please enter a valid weight.".to_string()),
            StatusCode::UNPROCESSABLE_ENTITY,
        )
        .await;
    };

    match api.log_weight(&credentials, weight).await {
        Ok(()) => {
            tracing::info!(user_id = %session.user_id, weight, "weight logged");
            Redirect::to("/dashboard").into_response()
        }
        Err(e) => {
            tracing::warn!(user_id = %session.user_id, error = %e, "weight log failed");
            render_dashboard(
                &api,
                &credentials,
                form.weight,
                Some(e.user_message("Failed to log weight. Please try again.")),
                StatusCode::BAD_GATEWAY,
            )
            .await
        }
    }
}

// --- Admin Portal ---

/// admin_dashboard
///
/// Client table with billing status derived from each due date against today's date.
pub async fn admin_dashboard(State(api): State<ApiState>, credentials: Credentials) -> Response {
    let today = chrono::Local::now().date_naive();

    let page = match api.list_clients(&credentials).await {
        Ok(clients) => AdminDashboardPage {
            rows: clients
                .iter()
                .map(|client| ClientRow::new(client, today))
                .collect(),
            error: None,
        },
        Err(e) => {
            tracing::warn!(error = %e, "client list failed");
            AdminDashboardPage {
                rows: Vec::new(),
                error: Some(e.user_message("Failed to load clients from server")),
            }
        }
    };

    pages::render_with_status(StatusCode::OK, &page)
}

pub async fn add_client_form() -> Result<Html<String>, PageError> {
    pages::render(&AddClientPage {
        name: String::new(),
        email: String::new(),
        plans: select_options(&PLANS, PLANS[0]),
        error: None,
    })
}

/// add_client
///
/// Creates the client account through the API. The plan must be one of `PLANS`.
pub async fn add_client(
    State(api): State<ApiState>,
    credentials: Credentials,
    Form(client): Form<NewClient>,
) -> Response {
    let result = if PLANS.contains(&client.plan.as_str()) {
        api
            .create_client(&credentials, &client)
            .await
            .map_err(|e| {
                tracing::warn!(error = %e, "client creation failed");
                (StatusCode::BAD_GATEWAY, e.user_message("Failed to create client"))
            })
    } else {
        Err((
            StatusCode::UNPROCESSABLE_ENTITY,
            "Please choose one of the offered plans.".to_string(),
        ))
    };

    match result {
        Ok(()) => {
            tracing::info!(email = %client.email, plan = %client.plan, "client created");
            Redirect::to("/admin").into_response()
        }
        Err((status, message)) => pages::render_with_status(
            status,
            &AddClientPage {
                plans: select_options(&PLANS, &client.plan),
                name: client.name,
                email: client.email,
                error: Some(message),
            },
        ),
    }
}

/// Loads the edit page for `client_id`. `meal_plan` overrides the stored plan so a
/// failed save keeps the admin's text.
async fn render_edit_client(
    api: &ApiState,
    credentials: &Credentials,
    client_id: &str,
    meal_plan: Option<String>,
    error: Option<String>,
    status: StatusCode,
) -> Response {
    let (client, weights) = tokio::join!(
        api.get_client(credentials, client_id),
        api.client_weight_logs(credentials, client_id)
    );

    let client = match client {
        Ok(Some(client)) => client,
        Ok(None) => return pages::not_found("Client not found", "/admin"),
        Err(e) => {
            tracing::warn!(client_id = %client_id, error = %e, "client lookup failed");
            return pages::notice(
                StatusCode::BAD_GATEWAY,
                "Client unavailable",
                e.user_message("Failed to load client information"),
                "/admin",
            );
        }
    };

    let (weights, weights_error) = match weights {
        Ok(logs) => (weight_rows(&logs), None),
        Err(e) => (Vec::new(), Some(e.user_message("Failed to load weight history"))),
    };

    let meal_plan = meal_plan
        .or_else(|| client.meal_plan.clone())
        .unwrap_or_default();

    pages::render_with_status(
        status,
        &EditClientPage {
            client: ClientForm::new(&client, client_id),
            meal_plan,
            weights,
            weights_error,
            error,
        },
    )
}

pub async fn edit_client(
    State(api): State<ApiState>,
    credentials: Credentials,
    Path(client_id): Path<String>,
) -> Response {
    render_edit_client(&api, &credentials, &client_id, None, None, StatusCode::OK).await
}

/// Merges `apply` into the current record and writes the whole record back.
async fn update_client_record(
    api: &ApiState,
    credentials: &Credentials,
    client_id: &str,
    fallback: &'static str,
    apply: impl FnOnce(&mut UpdateClient),
) -> Response {
    let current = match api.get_client(credentials, client_id).await {
        Ok(Some(current)) => current,
        Ok(None) => return pages::not_found("Client not found", "/admin"),
        Err(e) => {
            tracing::warn!(client_id = %client_id, error = %e, "client lookup before update failed");
            return render_edit_client(
                api,
                credentials,
                client_id,
                None,
                Some(e.user_message(fallback)),
                StatusCode::BAD_GATEWAY,
            )
            .await;
        }
    };

    let mut update = UpdateClient::from_current(&current);
    apply(&mut update);

    match api.update_client(credentials, client_id, &update).await {
        Ok(_) => {
            tracing::info!(client_id = %client_id, "client updated");
            Redirect::to(&edit_client_path(client_id)).into_response()
        }
        Err(e) => {
            tracing::warn!(client_id = %client_id, error = %e, "client update failed");
            render_edit_client(
                api,
                credentials,
                client_id,
                None,
                Some(e.user_message(fallback)),
                StatusCode::BAD_GATEWAY,
            )
            .await
        }
    }
}

pub async fn update_details(
    State(api): State<ApiState>,
    credentials: Credentials,
    Path(client_id): Path<String>,
    Form(form): Form<DetailsForm>,
) -> Response {
    update_client_record(
        &api,
        &credentials,
        &client_id,
        "Failed to update client details",
        |update| {
            update.name = form.name;
            update.email = form.email;
        },
    )
    .await
}

pub async fn update_billing(
    State(api): State<ApiState>,
    credentials: Credentials,
    Path(client_id): Path<String>,
    Form(form): Form<BillingForm>,
) -> Response {
    update_client_record(
        &api,
        &credentials,
        &client_id,
        "Failed to update billing info",
        |update| update.due_date = form.due,
    )
    .await
}

pub async fn update_meal_plan(
    State(api): State<ApiState>,
    credentials: Credentials,
    Path(client_id): Path<String>,
    Form(form): Form<MealPlanForm>,
) -> Response {
    match api
        .update_meal_plan(&credentials, &client_id, &form.meal_plan)
        .await
    {
        Ok(()) => {
            tracing::info!(client_id = %client_id, "meal plan updated");
            Redirect::to(&edit_client_path(&client_id)).into_response()
        }
        Err(e) => {
            tracing::warn!(client_id = %client_id, error = %e, "meal plan update failed");
            render_edit_client(
                &api,
                &credentials,
                &client_id,
                Some(form.meal_plan),
                Some(e.user_message("Failed to update meal plan")),
                StatusCode::BAD_GATEWAY,
            )
            .await
        }
    }
}
