//! Lookup API (C7), internal-service-facing half.
//!
//! `/internal/stock/*` returns the minimal `StockLookupRecord` shape used
//! by other internal services that only need id/symbol/name/price, not the
//! full quote with bid/ask/volume.

use axum::extract::{Path, State};
use axum::Json;

use crate::api::ApiError;
use crate::models::StockLookupRecord;
use crate::AppState;

pub async fn get_stock_by_symbol(
    State(state): State<AppState>,
    Path(symbol): Path<String>,
) -> Result<Json<StockLookupRecord>, ApiError> {
    state
        .catalog
        .get(&symbol)
        .map(|q| Json(StockLookupRecord::from(&q)))
        .ok_or(ApiError::NotFound)
}

pub async fn get_stock_by_id(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<StockLookupRecord>, ApiError> {
    state
        .catalog
        .get_by_id(id)
        .map(|q| Json(StockLookupRecord::from(&q)))
        .ok_or(ApiError::NotFound)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::test_app_state;

    #[tokio::test]
    async fn lookup_by_symbol_and_id_agree() {
        let state = test_app_state(&[("AAPL", "150.00")]).await;

        let by_symbol = get_stock_by_symbol(State(state.clone()), Path("AAPL".to_string()))
            .await
            .unwrap();
        let by_id = get_stock_by_id(State(state), Path(1)).await.unwrap();

        assert_eq!(by_symbol.0.symbol, by_id.0.symbol);
        assert_eq!(by_symbol.0.id, 1);
    }

    #[tokio::test]
    async fn unknown_id_is_404() {
        let state = test_app_state(&[("AAPL", "150.00")]).await;
        let result = get_stock_by_id(State(state), Path(999)).await;
        assert!(matches!(result, Err(ApiError::NotFound)));
    }
}
