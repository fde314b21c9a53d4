//! Revenue and trend math behind the dashboard stat cards.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RevenuePoint {
    pub date: NaiveDate,
    pub revenue: f64,
    pub orders: u32,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RevenueMetrics {
    pub total_revenue: f64,
    pub total_orders: u32,
    pub avg_order_value: f64,
    /// Trailing seven data points against the seven before them, as a
    /// percentage.
    pub growth_pct: f64,
}

pub fn revenue_metrics(data: &[RevenuePoint]) -> RevenueMetrics {
    if data.is_empty() {
        return RevenueMetrics {
            total_revenue: 0.0,
            total_orders: 0,
            avg_order_value: 0.0,
            growth_pct: 0.0,
        };
    }

    let total_revenue: f64 = data.iter().map(|p| p.revenue).sum();
    let total_orders: u32 = data.iter().map(|p| p.orders).sum();
    let avg_order_value = if total_orders > 0 {
        total_revenue / total_orders as f64
    } else {
        0.0
    };

    let mut sorted: Vec<&RevenuePoint> = data.iter().collect();
    sorted.sort_by_key(|p| p.date);

    let last7: f64 = sorted.iter().rev().take(7).map(|p| p.revenue).sum();
    let previous7: f64 = sorted.iter().rev().skip(7).take(7).map(|p| p.revenue).sum();

    let growth_pct = if previous7 > 0.0 {
        (last7 - previous7) / previous7 * 100.0
    } else {
        0.0
    };

    RevenueMetrics {
        total_revenue,
        total_orders,
        avg_order_value,
        growth_pct,
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Trend {
    Increase,
    Decrease,
    Neutral,
}

pub fn trend(value: f64, previous: f64) -> Trend {
    if value > previous {
        Trend::Increase
    } else if value < previous {
        Trend::Decrease
    } else {
        Trend::Neutral
    }
}

/// Change against the previous period as a percentage; a zero baseline
/// reads as no change rather than infinity.
pub fn percent_change(value: f64, previous: f64) -> f64 {
    if previous == 0.0 {
        return 0.0;
    }
    (value - previous) / previous * 100.0
}
