use axum::{extract::State, Json};
use serde::{Deserialize, Serialize};

use crate::dom::tree::{ElementSnapshot, ElementSpec};
use crate::dom::{lock_document, share, Document, Size};
use crate::errors::AppError;
use crate::fitter::{BatchReport, FitOptions, TextFitter};
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct FitRequest {
    /// Root element of the document to fit.
    pub document: ElementSpec,
    pub viewport: Option<Size>,
    /// Selector resolved against the whole document.
    pub target: String,
    #[serde(default)]
    pub options: FitOptions,
}

#[derive(Debug, Serialize)]
pub struct FitResponse {
    pub report: BatchReport,
    /// Fitted elements in document order.
    pub elements: Vec<ElementSnapshot>,
}

/// POST /api/v1/fit
pub async fn handle_fit(
    State(state): State<AppState>,
    Json(req): Json<FitRequest>,
) -> Result<Json<FitResponse>, AppError> {
    let viewport = req.viewport.unwrap_or(state.viewport);
    let document = share(Document::from_spec(&req.document, viewport));
    let fitter = TextFitter::new(document.clone(), state.fitter_config.clone());

    let report = fitter.fit(req.target.as_str(), req.options)?.wait().await?;

    let mut fitted: Vec<_> = report.outcomes.iter().map(|o| o.element).collect();
    fitted.sort();
    let elements = {
        let doc = lock_document(&document);
        fitted
            .into_iter()
            .map(|id| ElementSnapshot::capture(&doc, id))
            .collect()
    };

    Ok(Json(FitResponse { report, elements }))
}
