use super::types::{KrakenAddOrderResult, KrakenBalanceResult, KrakenTickerResult};
use crate::core::errors::ExchangeError;
use crate::core::types::{
    Balance, OrderRequest, OrderResponse, OrderSide, OrderType, Price, Quantity, Symbol, Ticker,
    TimeInForce,
};
use rust_decimal::Decimal;

fn decimal(field: &str, raw: Option<&String>) -> Result<Decimal, ExchangeError> {
    let raw = raw.ok_or_else(|| {
        ExchangeError::DeserializationError(format!("Kraken ticker is missing {}", field))
    })?;
    raw.parse().map_err(|e| {
        ExchangeError::DeserializationError(format!("Invalid {} '{}': {}", field, raw, e))
    })
}

/// Kraken still calls bitcoin `XBT`.
pub fn kraken_asset(asset: &str) -> &str {
    match asset {
        "BTC" => "XBT",
        "DOGE" => "XDG",
        other => other,
    }
}

/// Inverse of [`kraken_asset`], also dropping the legacy `X`/`Z` prefixes
/// of balance codes such as `XXBT` or `ZUSD`.
pub fn normalize_asset(asset: &str) -> String {
    let trimmed = match asset.len() {
        4 if asset.starts_with('X') || asset.starts_with('Z') => &asset[1..],
        _ => asset,
    };
    match trimmed {
        "XBT" => "BTC".to_string(),
        "XDG" => "DOGE".to_string(),
        other => other.to_string(),
    }
}

pub fn kraken_pair(symbol: &Symbol) -> String {
    format!("{}{}", kraken_asset(&symbol.base), kraken_asset(&symbol.quote))
}

/// Form parameters for `AddOrder`, before the nonce is prepended.
pub fn order_params(order: &OrderRequest) -> Result<Vec<(&'static str, String)>, ExchangeError> {
    let order_type = match order.order_type {
        OrderType::Market => "market",
        OrderType::Limit => "limit",
    };
    let side = match order.side {
        OrderSide::Buy => "buy",
        OrderSide::Sell => "sell",
    };

    let mut params = vec![
        ("ordertype", order_type.to_string()),
        ("pair", kraken_pair(&order.symbol)),
    ];
    if let Some(price) = order.price {
        params.push(("price", price.to_string()));
    }
    match order.time_in_force {
        None | Some(TimeInForce::GTC) => {}
        Some(TimeInForce::IOC) => params.push(("timeinforce", "IOC".to_string())),
        Some(TimeInForce::FOK) => {
            return Err(ExchangeError::InvalidParameters(
                "Kraken does not support fill-or-kill orders".to_string(),
            ))
        }
    }
    params.push(("type", side.to_string()));
    params.push(("volume", order.quantity.to_string()));
    if let Some(client_order_id) = &order.client_order_id {
        params.push(("cl_ord_id", client_order_id.clone()));
    }
    Ok(params)
}

pub fn convert_ticker(
    symbol: Symbol,
    raw: KrakenTickerResult,
    timestamp: i64,
) -> Result<Ticker, ExchangeError> {
    // the result is keyed by Kraken's internal pair name, e.g. XXBTZUSD
    let info = raw.into_values().next().ok_or_else(|| {
        ExchangeError::DeserializationError(format!("No ticker returned for {}", symbol))
    })?;

    Ok(Ticker {
        symbol,
        last: Price::new(decimal("last trade", info.c.first())?),
        bid: Price::new(decimal("bid", info.b.first())?),
        ask: Price::new(decimal("ask", info.a.first())?),
        volume: Quantity::new(decimal("24h volume", info.v.get(1))?),
        timestamp,
    })
}

pub fn convert_order_response(
    order: &OrderRequest,
    raw: KrakenAddOrderResult,
    timestamp: i64,
) -> Result<OrderResponse, ExchangeError> {
    let order_id = raw.txid.into_iter().next().ok_or_else(|| {
        ExchangeError::DeserializationError(format!(
            "AddOrder returned no transaction id ({})",
            raw.descr.order
        ))
    })?;

    Ok(OrderResponse {
        order_id,
        client_order_id: order.client_order_id.clone(),
        symbol: order.symbol.clone(),
        side: order.side,
        order_type: order.order_type,
        quantity: order.quantity,
        price: order.price,
        status: "pending".to_string(),
        timestamp,
    })
}

/// Kraken reports only totals, so everything is `free`. Zero balances are dropped.
pub fn convert_balances(raw: KrakenBalanceResult) -> Result<Vec<Balance>, ExchangeError> {
    let mut balances = Vec::new();
    for (asset, amount) in raw {
        let amount: Decimal = amount.parse().map_err(|e| {
            ExchangeError::DeserializationError(format!("Invalid balance for {}: {}", asset, e))
        })?;
        if amount.is_zero() {
            continue;
        }
        balances.push(Balance {
            asset: normalize_asset(&asset),
            free: Quantity::new(amount),
            locked: Quantity::new(Decimal::ZERO),
        });
    }
    balances.sort_by(|a, b| a.asset.cmp(&b.asset));
    Ok(balances)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::kernel::signer::build_query_string;

    #[test]
    fn test_pair_and_asset_names() {
        let symbol = Symbol::new("BTC", "USD").unwrap();
        assert_eq!(kraken_pair(&symbol), "XBTUSD");
        assert_eq!(normalize_asset("XXBT"), "BTC");
        assert_eq!(normalize_asset("ZUSD"), "USD");
        assert_eq!(normalize_asset("XETH"), "ETH");
        assert_eq!(normalize_asset("USDT"), "USDT");
        assert_eq!(normalize_asset("DOT"), "DOT");
    }

    #[test]
    fn test_limit_order_params_are_sorted_like_the_docs() {
        let order = OrderRequest::limit(
            Symbol::new("BTC", "USD").unwrap(),
            OrderSide::Buy,
            "1.25".parse().unwrap(),
            "37500".parse().unwrap(),
        );
        let params = order_params(&order).unwrap();
        assert_eq!(
            build_query_string(&params),
            "ordertype=limit&pair=XBTUSD&price=37500&type=buy&volume=1.25"
        );
    }

    #[test]
    fn test_fill_or_kill_is_rejected() {
        let mut order = OrderRequest::limit(
            Symbol::new("ETH", "EUR").unwrap(),
            OrderSide::Sell,
            "2".parse().unwrap(),
            "1800".parse().unwrap(),
        );
        order.time_in_force = Some(TimeInForce::FOK);
        assert!(matches!(
            order_params(&order),
            Err(ExchangeError::InvalidParameters(_))
        ));
    }

    #[test]
    fn test_ticker_conversion() {
        let raw: KrakenTickerResult = serde_json::from_str(
            r#"{"XXBTZUSD":{"a":["30300.10000","1","1.000"],"b":["30300.00000","1","1.000"],
                "c":["30303.20000","0.00067643"],"v":["4083.67001100","4412.73601799"],
                "p":["30706.77771","30689.13205"]}}"#,
        )
        .unwrap();
        let ticker = convert_ticker(Symbol::new("BTC", "USD").unwrap(), raw, 7).unwrap();
        assert_eq!(ticker.last.to_string(), "30303.20000");
        assert_eq!(ticker.volume.to_string(), "4412.73601799");
        assert!(ticker.bid < ticker.ask);
        assert_eq!(ticker.timestamp, 7);
    }

    #[test]
    fn test_balances() {
        let raw: KrakenBalanceResult = serde_json::from_str(
            r#"{"ZUSD":"171288.6158","XXBT":"0.0011","XETH":"0.0000000000"}"#,
        )
        .unwrap();
        let balances = convert_balances(raw).unwrap();
        let assets: Vec<&str> = balances.iter().map(|b| b.asset.as_str()).collect();
        assert_eq!(assets, vec!["BTC", "USD"]);
    }
}
