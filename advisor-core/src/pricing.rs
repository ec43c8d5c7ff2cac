//! Market-impact execution pricing.
//!
//! A single pure function turns a reference close, an order size, and the
//! ticker's average daily volume into an execution price via a sigmoid
//! impact curve. Determinism matters here: retries inside the same minute
//! bucket must reproduce the exact same price, so the rounding is part of
//! the contract.

/// Sigmoid steepness of the impact curve.
pub const DEFAULT_K: f64 = 4.0;
/// Fraction of ADV at which the impact curve inflects.
pub const DEFAULT_HALF_ADV_FRACTION: f64 = 0.1;
/// Maximum slippage away from the reference close (20 bps).
pub const MAX_SLIPPAGE: f64 = 0.002;

/// Execution price for `order_qty` shares against a reference close.
///
/// The order's absolute size is normalized by `half_adv_fraction` of ADV
/// (floored at 1.0) to a participation ratio `x`; `k * (x - 1)` through a
/// logistic sigmoid gives an impact magnitude in (0, 1), signed positive
/// for buys and negative otherwise. Orders large relative to liquidity
/// saturate toward `MAX_SLIPPAGE`. The result is rounded to 4 decimals.
pub fn impact_price(
    reference_close: f64,
    order_qty: i64,
    adv: f64,
    k: f64,
    half_adv_fraction: f64,
) -> f64 {
    let x = order_qty.unsigned_abs() as f64 / (half_adv_fraction * adv.max(1.0));
    let impact = 1.0 / (1.0 + (-k * (x - 1.0)).exp());
    let signed = if order_qty > 0 { impact } else { -impact };
    round4(reference_close * (1.0 + MAX_SLIPPAGE * signed))
}

/// `impact_price` with the default curve parameters.
pub fn execution_price(reference_close: f64, order_qty: i64, adv: f64) -> f64 {
    impact_price(
        reference_close,
        order_qty,
        adv,
        DEFAULT_K,
        DEFAULT_HALF_ADV_FRACTION,
    )
}

fn round4(value: f64) -> f64 {
    (value * 10_000.0).round() / 10_000.0
}
