use std::time::Duration;

use anyhow::Result;
use serde_json::json;
use spread_maker_bot::domain::enums::{OrderSide, OrderStatus, OrderType, TimeInForce};
use spread_maker_bot::domain::model::exchange::OrderRequest;
use spread_maker_bot::infrastructure::exchange::binance::models::{
    CancelOrderResponse, DepthSnapshot, DepthUpdate, NewOrderResponse, OpenOrderResponse,
};
use spread_maker_bot::infrastructure::exchange::binance::parsers::BinanceParser;

fn request() -> OrderRequest {
    OrderRequest {
        symbol: "BTCUSDT".to_string(),
        side: OrderSide::Buy,
        order_type: OrderType::Limit,
        price: 101.5,
        quantity: 0.01,
        client_order_id: "6gCrw2kRUAF9CvJDGP16IP".to_string(),
        time_in_force: TimeInForce::Gtc,
        receive_window: Duration::from_millis(5000),
        price_precision: 2,
        quantity_precision: 3,
    }
}

#[test]
fn test_parse_open_orders_json() -> Result<()> {
    let json_data = json!([{
        "symbol": "BTCUSDT",
        "orderId": 1,
        "orderListId": -1,
        "clientOrderId": "myOrder1",
        "price": "100.00000000",
        "origQty": "0.01000000",
        "executedQty": "0.00000000",
        "cummulativeQuoteQty": "0.00000000",
        "status": "NEW",
        "timeInForce": "GTC",
        "type": "LIMIT",
        "side": "BUY",
        "stopPrice": "0.00000000",
        "time": 1499827319559u64,
        "updateTime": 1499827319559u64,
        "isWorking": true
    }]);

    let raw: Vec<OpenOrderResponse> = serde_json::from_value(json_data)?;
    let orders = raw
        .iter()
        .map(BinanceParser::parse_open_order)
        .collect::<Result<Vec<_>>>()?;

    assert_eq!(orders.len(), 1);
    let order = &orders[0];
    assert_eq!(order.order_id, 1);
    assert_eq!(order.client_order_id, "myOrder1");
    assert_eq!(order.side, OrderSide::Buy);
    assert_eq!(order.price, 100.0);
    assert_eq!(order.quantity, 0.01);
    assert_eq!(order.status, OrderStatus::New);
    assert!(order.status.is_open());

    Ok(())
}

#[test]
fn test_parse_full_new_order_response() -> Result<()> {
    let json_data = json!({
        "symbol": "BTCUSDT",
        "orderId": 28,
        "orderListId": -1,
        "clientOrderId": "6gCrw2kRUAF9CvJDGP16IP",
        "transactTime": 1507725176595u64,
        "price": "101.50000000",
        "origQty": "0.01000000",
        "executedQty": "0.00000000",
        "status": "NEW",
        "timeInForce": "GTC",
        "type": "LIMIT",
        "side": "BUY"
    });

    let raw: NewOrderResponse = serde_json::from_value(json_data)?;
    let placed = BinanceParser::parse_new_order(&raw, &request())?;

    assert_eq!(placed.order_id, 28);
    assert_eq!(placed.price, 101.5);
    assert_eq!(placed.quantity, 0.01);
    assert_eq!(placed.status, OrderStatus::New);
    assert!(!placed.validated_only);

    Ok(())
}

#[test]
fn test_parse_ack_new_order_response_falls_back_to_request() -> Result<()> {
    let json_data = json!({
        "symbol": "BTCUSDT",
        "orderId": 28,
        "orderListId": -1,
        "clientOrderId": "6gCrw2kRUAF9CvJDGP16IP",
        "transactTime": 1507725176595u64
    });

    let raw: NewOrderResponse = serde_json::from_value(json_data)?;
    let placed = BinanceParser::parse_new_order(&raw, &request())?;

    assert_eq!(placed.side, OrderSide::Buy);
    assert_eq!(placed.price, 101.5);
    assert_eq!(placed.quantity, 0.01);
    assert_eq!(placed.status, OrderStatus::New);

    Ok(())
}

#[test]
fn test_parse_cancel_response() -> Result<()> {
    let json_data = json!({
        "symbol": "BTCUSDT",
        "origClientOrderId": "myOrder1",
        "orderId": 4,
        "orderListId": -1,
        "clientOrderId": "cancelMyOrder1",
        "price": "2.00000000",
        "origQty": "1.00000000",
        "executedQty": "0.00000000",
        "status": "CANCELED",
        "timeInForce": "GTC",
        "type": "LIMIT",
        "side": "BUY"
    });

    let raw: CancelOrderResponse = serde_json::from_value(json_data)?;
    let cancelled = BinanceParser::parse_cancelled_order(&raw)?;

    assert_eq!(cancelled.order_id, 4);
    assert_eq!(cancelled.client_order_id, "myOrder1");
    assert_eq!(cancelled.status, OrderStatus::Canceled);
    assert!(!cancelled.status.is_open());

    Ok(())
}

#[test]
fn test_validated_order_echoes_request() {
    let placed = BinanceParser::validated_order(&request());

    assert!(placed.validated_only);
    assert_eq!(placed.order_id, 0);
    assert_eq!(placed.client_order_id, "6gCrw2kRUAF9CvJDGP16IP");
    assert_eq!(placed.price, 101.5);
}

#[test]
fn test_parse_depth_payloads() -> Result<()> {
    let snapshot: DepthSnapshot = serde_json::from_value(json!({
        "lastUpdateId": 1027024,
        "bids": [["4.00000000", "431.00000000"]],
        "asks": [["4.00000200", "12.00000000"]]
    }))?;
    assert_eq!(snapshot.last_update_id, 1027024);
    assert_eq!(BinanceParser::parse_level(&snapshot.bids[0])?, (4.0, 431.0));

    let update: DepthUpdate = serde_json::from_value(json!({
        "e": "depthUpdate",
        "E": 1672515782136u64,
        "s": "BNBBTC",
        "U": 157,
        "u": 160,
        "b": [["0.0024", "10"]],
        "a": [["0.0026", "100"]]
    }))?;
    assert_eq!(update.first_update_id, 157);
    assert_eq!(update.final_update_id, 160);
    assert_eq!(BinanceParser::parse_level(&update.asks[0])?, (0.0026, 100.0));

    Ok(())
}

#[test]
fn test_rejects_malformed_values() {
    assert!(BinanceParser::parse_decimal("price", "abc").is_err());
    assert!(BinanceParser::parse_level(&["-1".to_string(), "1".to_string()]).is_err());

    let raw = OpenOrderResponse {
        symbol: "BTCUSDT".to_string(),
        order_id: 1,
        client_order_id: "x".to_string(),
        price: "1.0".to_string(),
        orig_qty: "1.0".to_string(),
        status: "NEW".to_string(),
        side: "HOLD".to_string(),
    };
    assert!(BinanceParser::parse_open_order(&raw).is_err());
}
