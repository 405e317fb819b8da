//! Axum middleware wrapper around [`Gate::evaluate`].

use std::sync::Arc;

use axum::{
    body::Body,
    extract::State,
    http::Request,
    middleware::Next,
    response::{IntoResponse, Redirect, Response},
};

use crate::auth::{SessionContext, SessionState};
use crate::gate::{Decision, Gate, GateRequest, ResolvedLocale};

/// Middleware to gate every request.
///
/// Redirects are sent as 307 so the method and body survive. On pass-through
/// the resolved locale and caller context are stored in request extensions.
pub async fn gate_request(
    State(gate): State<Arc<Gate>>,
    mut request: Request<Body>,
    next: Next,
) -> Response {
    let verdict = gate.evaluate(&GateRequest::from_request(&request));

    match verdict.decision {
        Decision::Redirect(redirect) => Redirect::temporary(&redirect.location).into_response(),
        Decision::Continue => {
            let session = verdict.session.unwrap_or(SessionState::Absent);
            let context = SessionContext::from_state(&session, gate.admins());

            let extensions = request.extensions_mut();
            extensions.insert(ResolvedLocale(verdict.locale));
            extensions.insert(context);

            next.run(request).await
        }
    }
}
