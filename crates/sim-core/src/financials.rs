//! The single authoritative financial model plus range clamping.
//!
//! Revenue and costs are always recomputed from drivers; profit is always
//! re-derived and never settable. Clamping is the final authority on
//! bounded fields: no earlier pipeline step may leave an out-of-range
//! value unguarded, because this pass runs last.

use contracts::{CompanyState, MarketState};

use crate::roles::RoundContext;

const COST_PER_HEAD: f64 = 0.075;
const BASE_OPEX: f64 = 0.8;
const TECH_DEBT_DRAG: f64 = 0.01;
const BASE_CONVERSION: f64 = 0.012;
const QUALITY_CONVERSION: f64 = 0.0001;
const CHANNEL_CONVERSION: f64 = 0.000_05;

/// Pipeline-to-revenue conversion rate, a function of product quality and
/// channel fluency. Stays within roughly [0.012, 0.027].
fn conversion_rate(company: &CompanyState, market: &MarketState) -> f64 {
    BASE_CONVERSION
        + company.product_quality * QUALITY_CONVERSION
        + (100.0 - market.channel_friction).max(0.0) * CHANNEL_CONVERSION
}

/// Recomputes revenue, costs, and pipeline consumption from the
/// post-decision state. Called once per round between the decision pipeline
/// and event generation.
pub fn recompute(ctx: &mut RoundContext) {
    let company = &mut ctx.company;
    let market = &ctx.market;

    let conversion = conversion_rate(company, market);
    let market_factor = (market.demand_index / 100.0) * (market.price_index / 100.0);
    let new_business = company.sales_pipeline * conversion * market_factor / 4.0;

    let retained = company.revenue * (1.0 - company.churn_rate / 100.0);
    company.revenue = retained + new_business;
    company.sales_pipeline *= 1.0 - conversion * market_factor;

    let cost_base =
        company.headcount * COST_PER_HEAD + BASE_OPEX + company.tech_debt * TECH_DEBT_DRAG;
    company.costs = cost_base * ctx.cost_multiplier + ctx.spend_this_round;
}

/// Applies the quarter's profit to cash and re-derives runway. Profit is a
/// quarterly figure; burn is expressed monthly.
pub fn settle_cash_and_runway(company: &mut CompanyState) {
    let profit = company.revenue - company.costs;
    company.cash += profit;
    let monthly_burn = (company.costs - company.revenue) / 3.0;
    company.runway_months = if monthly_burn <= 0.0 {
        120.0
    } else {
        (company.cash / monthly_burn).clamp(0.0, 120.0)
    };
}

/// Clamps every bounded field to its documented range and re-derives
/// profit. Runs after decisions, events, and drift have all landed.
pub fn clamp_all(ctx: &mut RoundContext) {
    let company = &mut ctx.company;
    company.cash = company.cash.clamp(-1_000.0, 100_000.0);
    company.revenue = company.revenue.clamp(0.0, 10_000.0);
    company.costs = company.costs.clamp(0.0, 10_000.0);
    company.runway_months = company.runway_months.clamp(0.0, 120.0);
    company.headcount = company.headcount.clamp(1.0, 100_000.0);
    company.morale = company.morale.clamp(0.0, 100.0);
    company.tech_debt = company.tech_debt.clamp(0.0, 100.0);
    company.product_quality = company.product_quality.clamp(0.0, 100.0);
    company.brand_trust = company.brand_trust.clamp(0.0, 100.0);
    company.compliance_posture = company.compliance_posture.clamp(0.0, 100.0);
    company.sales_pipeline = company.sales_pipeline.clamp(0.0, 10_000.0);
    company.churn_rate = company.churn_rate.clamp(0.0, 100.0);
    company.profit = company.revenue - company.costs;

    let market = &mut ctx.market;
    market.demand_index = market.demand_index.clamp(0.0, 200.0);
    market.price_index = market.price_index.clamp(0.0, 200.0);
    market.competition_intensity = market.competition_intensity.clamp(0.0, 100.0);
    market.regulation_scrutiny = market.regulation_scrutiny.clamp(0.0, 100.0);
    market.channel_friction = market.channel_friction.clamp(0.0, 100.0);
    market.supply_shock_risk = market.supply_shock_risk.clamp(0.0, 100.0);
    market.sentiment = market.sentiment.clamp(0.0, 100.0);

    let risk = &mut ctx.risk;
    risk.operational = risk.operational.clamp(0.0, 100.0);
    risk.regulatory = risk.regulatory.clamp(0.0, 100.0);
    risk.reputational = risk.reputational.clamp(0.0, 100.0);
    risk.financial = risk.financial.clamp(0.0, 100.0);
}
