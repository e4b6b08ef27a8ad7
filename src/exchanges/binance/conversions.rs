use super::types::{BinanceAccountInfo, BinanceOrderResponse, BinanceSymbolInfo, BinanceTicker24h};
use crate::core::errors::ExchangeError;
use crate::core::types::{
    Balance, OrderRequest, OrderResponse, OrderSide, OrderType, Price, Quantity, Symbol, Ticker,
    TimeInForce,
};
use rust_decimal::Decimal;

fn decimal(field: &str, raw: &str) -> Result<Decimal, ExchangeError> {
    raw.parse().map_err(|e| {
        ExchangeError::DeserializationError(format!("Invalid {} '{}': {}", field, raw, e))
    })
}

pub const fn order_side(side: OrderSide) -> &'static str {
    match side {
        OrderSide::Buy => "BUY",
        OrderSide::Sell => "SELL",
    }
}

pub const fn order_type(order_type: OrderType) -> &'static str {
    match order_type {
        OrderType::Market => "MARKET",
        OrderType::Limit => "LIMIT",
    }
}

pub const fn time_in_force(tif: TimeInForce) -> &'static str {
    match tif {
        TimeInForce::GTC => "GTC",
        TimeInForce::IOC => "IOC",
        TimeInForce::FOK => "FOK",
    }
}

/// Query parameters for `POST /api/v3/order`, before signing.
pub fn order_params(order: &OrderRequest) -> Vec<(&'static str, String)> {
    let mut params = vec![
        ("symbol", order.symbol.concat()),
        ("side", order_side(order.side).to_string()),
        ("type", order_type(order.order_type).to_string()),
        ("quantity", order.quantity.to_string()),
    ];
    if let Some(price) = order.price {
        params.push(("price", price.to_string()));
    }
    if order.order_type == OrderType::Limit {
        let tif = order.time_in_force.unwrap_or(TimeInForce::GTC);
        params.push(("timeInForce", time_in_force(tif).to_string()));
    }
    if let Some(client_order_id) = &order.client_order_id {
        params.push(("newClientOrderId", client_order_id.clone()));
    }
    params
}

pub fn convert_ticker(symbol: Symbol, raw: BinanceTicker24h) -> Result<Ticker, ExchangeError> {
    Ok(Ticker {
        symbol,
        last: Price::new(decimal("lastPrice", &raw.last_price)?),
        bid: Price::new(decimal("bidPrice", &raw.bid_price)?),
        ask: Price::new(decimal("askPrice", &raw.ask_price)?),
        volume: Quantity::new(decimal("volume", &raw.volume)?),
        timestamp: raw.close_time,
    })
}

/// Trading symbols only; anything that does not parse is skipped.
pub fn convert_symbols(symbols: Vec<BinanceSymbolInfo>) -> Vec<Symbol> {
    symbols
        .into_iter()
        .filter(|info| info.status == "TRADING")
        .filter_map(|info| Symbol::new(info.base_asset, info.quote_asset).ok())
        .collect()
}

pub fn convert_order_response(
    order: &OrderRequest,
    raw: BinanceOrderResponse,
) -> Result<OrderResponse, ExchangeError> {
    let price = decimal("price", &raw.price)?;
    Ok(OrderResponse {
        order_id: raw.order_id.to_string(),
        client_order_id: Some(raw.client_order_id),
        symbol: order.symbol.clone(),
        side: order.side,
        order_type: order.order_type,
        quantity: Quantity::new(decimal("origQty", &raw.orig_qty)?),
        // market orders report a zero price
        price: (!price.is_zero()).then_some(Price::new(price)),
        status: raw.status,
        timestamp: raw.transact_time,
    })
}

/// Non-zero balances only.
pub fn convert_balances(raw: BinanceAccountInfo) -> Result<Vec<Balance>, ExchangeError> {
    let mut balances = Vec::new();
    for balance in raw.balances {
        let free = decimal("free", &balance.free)?;
        let locked = decimal("locked", &balance.locked)?;
        if free.is_zero() && locked.is_zero() {
            continue;
        }
        balances.push(Balance {
            asset: balance.asset,
            free: Quantity::new(free),
            locked: Quantity::new(locked),
        });
    }
    Ok(balances)
}
