use crate::{
    AppState,
    auth::AuthUser,
    error::{AppError, Result},
    models::{
        Application, CheckoutRequest, CheckoutResponse, PaidTransition, PaymentCancelled,
        PaymentReceipt, PaymentStatus, SessionQuery,
    },
    payment::{NewCheckoutSession, SessionPaymentStatus, to_minor_units},
};
use axum::{
    Json,
    extract::{Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
};

const SESSION_PLACEHOLDER: &str = "{CHECKOUT_SESSION_ID}";

fn redirect_url(site_domain: &str, page: &str) -> String {
    format!(
        "{}/dashboard/{}?session_id={}",
        site_domain.trim_end_matches('/'),
        page,
        SESSION_PLACEHOLDER
    )
}

/// create_checkout_session
///
/// [Authenticated Route] Opens a provider-hosted checkout for the caller's unpaid
/// application. The charge is the application fee plus the service charge.
#[utoipa::path(
    post,
    path = "/payment-checkout-session",
    request_body = CheckoutRequest,
    responses(
        (status = 200, description = "Session created", body = CheckoutResponse),
        (status = 400, description = "Nothing to pay"),
        (status = 403, description = "Not the applicant"),
        (status = 404, description = "Unknown application"),
        (status = 409, description = "Already paid"),
        (status = 502, description = "Provider failure")
    )
)]
pub async fn create_checkout_session(
    auth: AuthUser,
    State(state): State<AppState>,
    Json(payload): Json<CheckoutRequest>,
) -> Result<Json<CheckoutResponse>> {
    let application = state
        .repo
        .find_application(payload.application_id)
        .await?
        .ok_or_else(|| AppError::NotFound("application not found".to_string()))?;
    if application.user_email != auth.email {
        return Err(AppError::Forbidden);
    }
    if application.payment_status == PaymentStatus::Paid {
        return Err(AppError::Conflict("application is already paid".to_string()));
    }
    let amount_minor = to_minor_units(application.amount_due());
    if amount_minor <= 0 {
        return Err(AppError::BadRequest(
            "application has no fee to pay".to_string(),
        ));
    }

    let session = state
        .payments
        .create_checkout_session(NewCheckoutSession {
            application_id: application.id,
            customer_email: auth.email,
            product_name: application.scholarship_name.clone(),
            description: format!(
                "{} - {}",
                application.university_name, application.degree
            ),
            amount_minor,
            currency: state.config.currency.clone(),
            success_url: redirect_url(&state.config.site_domain, "payment-success"),
            cancel_url: redirect_url(&state.config.site_domain, "payment-cancelled"),
        })
        .await?;

    let url = session
        .url
        .ok_or_else(|| AppError::Payment("checkout session has no url".to_string()))?;
    tracing::info!(application_id = %application.id, session_id = %session.id, "checkout session created");
    Ok(Json(CheckoutResponse {
        url,
        session_id: session.id,
    }))
}

/// confirm_payment
///
/// [Authenticated Route] Reconciles a checkout session against the application store.
///
/// 1. Replay: the session's payment was already recorded, answer the stored summary.
/// 2. The provider must report the session `paid` (402 otherwise).
/// 3. Conditional `unpaid -> paid` update. Losing a concurrent race to the same
///    transaction is reported as already processed.
#[utoipa::path(
    patch,
    path = "/payment-success",
    params(SessionQuery),
    responses(
        (status = 200, description = "Payment recorded", body = PaymentReceipt),
        (status = 402, description = "Payment not completed"),
        (status = 404, description = "Unknown session or application"),
        (status = 409, description = "Application paid by another transaction"),
        (status = 502, description = "Provider failure")
    )
)]
pub async fn confirm_payment(
    State(state): State<AppState>,
    Query(query): Query<SessionQuery>,
) -> Result<Json<PaymentReceipt>> {
    let session = state.payments.retrieve_session(&query.session_id).await?;

    if let Some(transaction_id) = session.payment_intent.as_deref() {
        if let Some(application) = state
            .repo
            .find_application_by_transaction(transaction_id)
            .await?
        {
            return Ok(Json(PaymentReceipt::from_application(
                &application,
                transaction_id.to_string(),
                true,
            )));
        }
    }

    if session.payment_status != SessionPaymentStatus::Paid {
        tracing::info!(session_id = %session.id, status = ?session.payment_status, "reconciliation of unpaid session");
        return Err(AppError::PaymentRequired(
            "payment not completed".to_string(),
        ));
    }

    let transaction_id = session
        .payment_intent
        .clone()
        .ok_or_else(|| AppError::Payment("paid session has no payment intent".to_string()))?;
    let application_id = session
        .application_id()
        .ok_or_else(|| AppError::BadRequest("session is not linked to an application".to_string()))?;

    let transition = state
        .repo
        .mark_application_paid(application_id, &transaction_id)
        .await?
        .ok_or_else(|| AppError::NotFound("application not found".to_string()))?;

    match transition {
        PaidTransition::Applied(application) => {
            tracing::info!(
                application_id = %application.id,
                transaction_id = %transaction_id,
                "application marked paid"
            );
            Ok(Json(PaymentReceipt::from_application(
                &application,
                transaction_id,
                false,
            )))
        }
        PaidTransition::AlreadyPaid(application)
            if application.transaction_id.as_deref() == Some(transaction_id.as_str()) =>
        {
            Ok(Json(PaymentReceipt::from_application(
                &application,
                transaction_id,
                true,
            )))
        }
        PaidTransition::AlreadyPaid(application) => {
            tracing::warn!(
                application_id = %application.id,
                transaction_id = %transaction_id,
                "application already paid by another transaction"
            );
            Err(AppError::Conflict(
                "application already paid by another transaction".to_string(),
            ))
        }
    }
}

async fn cancelled_summary(state: &AppState, session_id: &str) -> Result<PaymentCancelled> {
    let session = state.payments.retrieve_session(session_id).await?;
    let application: Option<Application> = match session.application_id() {
        Some(id) => state.repo.find_application(id).await?,
        None => None,
    };

    Ok(PaymentCancelled {
        success: true,
        message: "Payment was cancelled".to_string(),
        application_id: application.as_ref().map(|a| a.id),
        scholarship_name: application.as_ref().map(|a| a.scholarship_name.clone()),
        university_name: application.as_ref().map(|a| a.university_name.clone()),
        application_fees: application.as_ref().map(Application::amount_due),
    })
}

/// payment_cancelled
///
/// [Authenticated Route] Informational page data after the user abandons checkout.
/// Nothing is written. Any failure collapses into one generic 502 body.
#[utoipa::path(
    get,
    path = "/payment-cancelled",
    params(SessionQuery),
    responses(
        (status = 200, description = "Cancellation details", body = PaymentCancelled),
        (status = 502, description = "Lookup failed", body = PaymentCancelled)
    )
)]
pub async fn payment_cancelled(
    State(state): State<AppState>,
    Query(query): Query<SessionQuery>,
) -> Response {
    match cancelled_summary(&state, &query.session_id).await {
        Ok(summary) => Json(summary).into_response(),
        Err(e) => {
            tracing::warn!(session_id = %query.session_id, error = %e, "cancelled session lookup failed");
            (
                StatusCode::BAD_GATEWAY,
                Json(PaymentCancelled {
                    success: false,
                    message: "Failed to retrieve payment information".to_string(),
                    ..PaymentCancelled::default()
                }),
            )
                .into_response()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn redirect_url_keeps_provider_placeholder() {
        assert_eq!(
            redirect_url("https://scholar.example/", "payment-success"),
            "https://scholar.example/dashboard/payment-success?session_id={CHECKOUT_SESSION_ID}"
        );
    }
}
