//! 金额换算
//!
//! 索引器返回的币值（字符串或 JSON 数字）精确换算为最小单位，不经过浮点运算。

use std::str::FromStr;

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::{Decimal, RoundingStrategy};
use serde_json::Value;

pub const COIN_DECIMALS: u32 = 8;
const SATOSHIS_PER_COIN: i64 = 100_000_000;

/// 解析币值；无法解析时返回 None
pub fn parse_coin_amount(value: &Value) -> Option<Decimal> {
    let text = match value {
        Value::String(s) => s.trim().to_string(),
        Value::Number(n) => n.to_string(),
        _ => return None,
    };
    Decimal::from_str(&text)
        .ok()
        .or_else(|| Decimal::from_scientific(&text).ok())
}

/// 币值 → 最小单位；不足 1 聪的部分四舍五入（0.5 远离零）
pub fn coins_to_satoshis(value: &Value) -> Option<i64> {
    parse_coin_amount(value)?
        .checked_mul(Decimal::from(SATOSHIS_PER_COIN))?
        .round_dp_with_strategy(0, RoundingStrategy::MidpointAwayFromZero)
        .to_i64()
}

/// 最小单位 → 去掉末尾零的币值字符串
pub fn satoshis_to_coins(satoshis: i64) -> String {
    Decimal::new(satoshis, COIN_DECIMALS).normalize().to_string()
}
