//! One POST route per advisory task. Each runs the pipeline and returns
//! the aggregate result; model outages surface as `source: "fallback engine"`.

use std::sync::Arc;

use agrisense_advisor::*;
use axum::extract::State;
use axum::routing::post;
use axum::{Json, Router};

use crate::state::AppState;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/recommend/crops", post(crops))
        .route("/recommend/fertilizer", post(fertilizer))
        .route("/recommend/irrigation", post(irrigation))
        .route("/disease/diagnose", post(diagnose))
        .route("/yield/predict", post(yield_prediction))
        .route("/crop-swap", post(crop_swap))
        .route("/season", post(season))
        .route("/market", post(market))
        .route("/geospatial", post(geospatial))
}

async fn crops(
    State(state): State<Arc<AppState>>,
    Json(req): Json<SoilEnvironmentInput>,
) -> Json<AggregateResult<CropCandidate>> {
    Json(state.advisor.recommend_crops(&req).await)
}

async fn fertilizer(
    State(state): State<Arc<AppState>>,
    Json(req): Json<FertilizerRequest>,
) -> Json<AggregateResult<Recommendation>> {
    Json(state.advisor.recommend_fertilizer(&req).await)
}

async fn irrigation(
    State(state): State<Arc<AppState>>,
    Json(req): Json<IrrigationRequest>,
) -> Json<AggregateResult<Recommendation>> {
    Json(state.advisor.plan_irrigation(&req).await)
}

async fn diagnose(
    State(state): State<Arc<AppState>>,
    Json(req): Json<DiseaseRequest>,
) -> Json<AggregateResult<DiagnosisRecord>> {
    Json(state.advisor.diagnose_disease(&req).await)
}

async fn yield_prediction(
    State(state): State<Arc<AppState>>,
    Json(req): Json<YieldRequest>,
) -> Json<AggregateResult<YieldPredictionRecord>> {
    Json(state.advisor.predict_yield(&req).await)
}

async fn crop_swap(
    State(state): State<Arc<AppState>>,
    Json(req): Json<CropSwapRequest>,
) -> Json<AggregateResult<SwapStrategyRecord>> {
    Json(state.advisor.plan_crop_swap(&req).await)
}

async fn season(
    State(state): State<Arc<AppState>>,
    Json(req): Json<SeasonRequest>,
) -> Json<AggregateResult<SeasonRecord>> {
    Json(state.advisor.optimal_season(&req).await)
}

async fn market(
    State(state): State<Arc<AppState>>,
    Json(req): Json<MarketRequest>,
) -> Json<AggregateResult<Recommendation>> {
    Json(state.advisor.market_analysis(&req).await)
}

async fn geospatial(
    State(state): State<Arc<AppState>>,
    Json(req): Json<GeospatialRequest>,
) -> Json<AggregateResult<Recommendation>> {
    Json(state.advisor.geospatial_insight(&req).await)
}
