use crate::api::error::Error;
use crate::api::validation::ValidatedJson;
use crate::api::BookEngine;
use crate::order::book::DepthItem;
use crate::order::{self, Modification, Order, OrderType};
use crate::trade::Trade;
use axum::extract::{Path, Query, State};
use axum::routing::{delete, get, post, put};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use utoipa::{OpenApi, ToSchema};
use validify::{Payload, Validify};

#[derive(Debug, Deserialize, Validify, Payload, ToSchema)]
pub struct PlaceOrderRequest {
    pub id: order::Id,
    pub order_type: order::OrderType,
    pub side: order::Side,
    /// Limit price in ticks. Ignored for market orders, which are priced
    /// against the opposite side at admission.
    pub price: Option<order::Price>,
    #[validate(range(min = 1.0))]
    pub quantity: order::Quantity,
}

#[derive(Debug, Deserialize, Validify, Payload, ToSchema)]
pub struct ModifyOrderRequest {
    pub side: order::Side,
    #[validate(range(min = 1.0))]
    pub price: order::Price,
    #[validate(range(min = 1.0))]
    pub quantity: order::Quantity,
}

#[derive(Debug, Deserialize)]
pub struct DepthQuery {
    pub limit: Option<usize>,
}

/// Book snapshot: resting order count plus aggregated depth per side.
#[derive(Debug, Serialize, ToSchema)]
pub struct BookResponse {
    pub size: usize,
    pub bids: Vec<DepthItem>,
    pub asks: Vec<DepthItem>,
}

#[derive(OpenApi)]
#[openapi(
    paths(place_order, cancel_order, modify_order, order_by_id, book),
    components(schemas())
)]
pub struct OrdersApi;

pub fn router() -> Router<BookEngine> {
    Router::new()
        .route("/orders", post(place_order))
        .route("/orders/{order_id}", delete(cancel_order))
        .route("/orders/{order_id}", put(modify_order))
        .route("/orders/{order_id}", get(order_by_id))
        .route("/book", get(book))
}

/// Place a new order and return the trades it produced
#[utoipa::path(
    post,
    path = "/orders",
    request_body = PlaceOrderRequest,
    responses(
        (status = 200, description = "Order admitted", body = Vec<Trade>),
        (status = 400, description = "Rejected order or validation error"),
        (status = 500, description = "Internal error"),
    )
)]
async fn place_order(
    State(engine): State<BookEngine>,
    ValidatedJson(request): ValidatedJson<PlaceOrderRequest>,
) -> Result<Json<Vec<Trade>>, Error> {
    let order = match request.order_type {
        OrderType::Market => Order::market(request.id, request.side, request.quantity),
        order_type => {
            let price = request.price.ok_or_else(|| {
                Error::BadRequest(
                    "PRICE_REQUIRED".into(),
                    "a limit price is required for non-market orders".into(),
                )
            })?;
            if price < 1 {
                return Err(Error::BadRequest(
                    "INVALID_PRICE".into(),
                    format!("price must be a positive tick count, got {}", price),
                ));
            }
            Order::new(order_type, request.id, request.side, price, request.quantity)
        }
    };

    let trades = engine.add_order(order)?;
    Ok(Json(trades))
}

/// Cancel an order by id
#[utoipa::path(
    delete,
    path = "/orders/{order_id}",
    params(
        ("order_id" = u64, Path, description = "Identifier of the resting order"),
    ),
    responses(
        (status = 200, description = "Order cancelled", body = Order),
        (status = 404, description = "Order not found"),
    )
)]
async fn cancel_order(
    State(engine): State<BookEngine>,
    Path(order_id): Path<order::Id>,
) -> Result<Json<Order>, Error> {
    match engine.cancel_order(order_id) {
        Some(order) => Ok(Json(order)),
        None => Err(Error::NotFound(
            "ORDER_NOT_FOUND".into(),
            format!("order with id {} not found", order_id),
        )),
    }
}

/// Replace a resting order's price and quantity
#[utoipa::path(
    put,
    path = "/orders/{order_id}",
    params(
        ("order_id" = u64, Path, description = "Identifier of the resting order"),
    ),
    request_body = ModifyOrderRequest,
    responses(
        (status = 200, description = "Order replaced", body = Vec<Trade>),
        (status = 400, description = "Rejected modification"),
        (status = 404, description = "Order not found"),
    )
)]
async fn modify_order(
    State(engine): State<BookEngine>,
    Path(order_id): Path<order::Id>,
    ValidatedJson(request): ValidatedJson<ModifyOrderRequest>,
) -> Result<Json<Vec<Trade>>, Error> {
    let trades = engine.modify_order(Modification {
        order_id,
        side: request.side,
        price: request.price,
        quantity: request.quantity,
    })?;
    Ok(Json(trades))
}

/// Get a resting order by id
#[utoipa::path(
    get,
    path = "/orders/{order_id}",
    params(
        ("order_id" = u64, Path, description = "Identifier of the resting order"),
    ),
    responses(
        (status = 200, description = "Order returned", body = Order),
        (status = 404, description = "Order not found"),
    )
)]
async fn order_by_id(
    State(engine): State<BookEngine>,
    Path(order_id): Path<order::Id>,
) -> Result<Json<Order>, Error> {
    match engine.lookup(order_id) {
        Some(order) => Ok(Json(order)),
        None => Err(Error::NotFound(
            "ORDER_NOT_FOUND".into(),
            format!("order with id {} not found", order_id),
        )),
    }
}

/// Get the book's size and aggregated depth
#[utoipa::path(
    get,
    path = "/book",
    params(
        ("limit" = Option<usize>, Query, description = "Maximum price levels per side"),
    ),
    responses(
        (status = 200, description = "Book snapshot", body = BookResponse),
    )
)]
async fn book(
    State(engine): State<BookEngine>,
    Query(query): Query<DepthQuery>,
) -> Json<BookResponse> {
    let depth = engine.depth(query.limit.unwrap_or(usize::MAX));
    Json(BookResponse {
        size: engine.size(),
        bids: depth.bids,
        asks: depth.asks,
    })
}
