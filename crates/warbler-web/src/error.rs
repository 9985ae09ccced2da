use axum::{
    http::StatusCode,
    response::{Html, IntoResponse, Response},
};
use thiserror::Error;
use tracing::error;

/// Failures a handler cannot turn into a page of its own.
///
/// Authorization problems and missing rows never show up here: those go
/// through [`crate::session::RequestContext::unauthorized`] and
/// [`crate::session::RequestContext::not_found`].
#[derive(Debug, Error)]
pub enum AppError {
    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let AppError::Internal(e) = &self;
        error!("internal error: {:#}", e);
        bare_page(StatusCode::INTERNAL_SERVER_ERROR)
    }
}

/// Error page that needs no template engine, for when rendering itself failed.
pub(crate) fn bare_page(status: StatusCode) -> Response {
    let reason = status.canonical_reason().unwrap_or("Error");
    let body = format!(
        "<!DOCTYPE html><html><head><title>Warbler</title></head>\
         <body><h1>{} {}</h1><p><a href=\"/\">Back home</a></p></body></html>",
        status.as_u16(),
        reason
    );
    (status, Html(body)).into_response()
}
