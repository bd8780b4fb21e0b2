//! Lookup API (C7), market-facing half.
//!
//! Pure read-through to the Catalog: `GET /api/v1/market/data[/{symbol}]`
//! and `GET /api/v1/market/symbols`. No authentication, no mutation.

use axum::extract::{Path, State};
use axum::Json;
use std::collections::HashMap;

use crate::api::ApiError;
use crate::models::{QuoteJson, SymbolsResponse};
use crate::AppState;

pub async fn get_all_quotes(State(state): State<AppState>) -> Json<HashMap<String, QuoteJson>> {
    let quotes = state
        .catalog
        .snapshot()
        .into_iter()
        .map(|(symbol, quote)| (symbol, quote.to_json()))
        .collect();
    Json(quotes)
}

pub async fn get_quote(
    State(state): State<AppState>,
    Path(symbol): Path<String>,
) -> Result<Json<QuoteJson>, ApiError> {
    state
        .catalog
        .get(&symbol)
        .map(|q| Json(q.to_json()))
        .ok_or(ApiError::NotFound)
}

pub async fn get_symbols(State(state): State<AppState>) -> Json<SymbolsResponse> {
    let mut symbols = state.catalog.symbols();
    symbols.sort();
    Json(SymbolsResponse {
        count: symbols.len(),
        symbols,
    })
}
