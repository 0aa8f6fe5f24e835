use crate::core::session::{ConversionSession, SessionOutcome};
use crate::shared::events::{ExtensionRequest, ExtensionResponse};

/// Route one shell message to the session and report the resulting phase.
pub async fn handle_request(session: &ConversionSession, request: ExtensionRequest) -> ExtensionResponse {
    tracing::debug!(?request, "Handling extension request");

    let response = match request {
        ExtensionRequest::ConvertSelectedText { selected_text } => {
            let outcome = session.handle_selection(&selected_text).await;
            respond(handled(&outcome))
        }
        ExtensionRequest::SettingsUpdated(settings) => {
            let report = session.apply_settings(settings).await;
            ExtensionResponse::ok().with_report(report)
        }
        ExtensionRequest::RefreshAllRates => {
            let report = session.refresh_all().await;
            ExtensionResponse::ok().with_report(report)
        }
        ExtensionRequest::RefreshRate => {
            let outcome = session.refresh().await;
            respond(matches!(outcome, SessionOutcome::Refreshed(_)))
        }
        ExtensionRequest::SelectSourceCurrency { currency } => {
            let outcome = session.choose_source_currency(currency).await;
            respond(matches!(
                outcome,
                SessionOutcome::Displayed(_) | SessionOutcome::SameCurrency(_)
            ))
        }
        ExtensionRequest::DismissPopup { reason } => respond(session.dismiss(reason)),
    };

    response.with_phase(session.phase())
}

fn respond(success: bool) -> ExtensionResponse {
    if success {
        ExtensionResponse::ok()
    } else {
        ExtensionResponse::failed()
    }
}

/// A selection counts as handled unless it was ignored or could not render.
fn handled(outcome: &SessionOutcome) -> bool {
    !matches!(
        outcome,
        SessionOutcome::Busy | SessionOutcome::Aborted | SessionOutcome::Discarded
    )
}
