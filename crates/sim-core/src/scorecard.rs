//! Weighted scorecard over the post-round state.
//!
//! Coefficients, tiers, and bucket thresholds are fixed so cross-team and
//! cross-replay comparisons stay meaningful; changing any of them is a
//! breaking change for recorded runs.

use contracts::{CompanyState, MarketState, RiskProfile, Scorecard};

const WEIGHT_FINANCIAL: f64 = 0.30;
const WEIGHT_GROWTH: f64 = 0.20;
const WEIGHT_TRUST: f64 = 0.20;
const WEIGHT_RESILIENCE: f64 = 0.15;
const WEIGHT_EXECUTION: f64 = 0.15;

pub fn compute(company: &CompanyState, market: &MarketState, risk: &RiskProfile) -> Scorecard {
    let financial_health = financial_health(company);
    let growth = growth(company, market);
    let trust = trust(company);
    let resilience = resilience(company, risk);
    let execution = execution(company, market);
    let total = WEIGHT_FINANCIAL * financial_health
        + WEIGHT_GROWTH * growth
        + WEIGHT_TRUST * trust
        + WEIGHT_RESILIENCE * resilience
        + WEIGHT_EXECUTION * execution;

    Scorecard {
        financial_health,
        growth,
        trust,
        resilience,
        execution,
        total,
        board_confidence: board_confidence(total).to_string(),
        regulatory_heat: regulatory_heat(risk, market).to_string(),
    }
}

/// Base 50 with tier adjustments for profitability, cash position, runway,
/// and pipeline depth.
fn financial_health(company: &CompanyState) -> f64 {
    let mut score = 50.0_f64;
    if company.profit > 0.0 && company.runway_months >= 18.0 {
        score += 25.0;
    } else if company.profit > 0.0 {
        score += 15.0;
    } else if company.profit < 0.0 {
        score -= 10.0;
    }
    if company.cash < 0.0 {
        score -= 25.0;
    }
    if company.runway_months >= 24.0 {
        score += 15.0;
    } else if company.runway_months >= 12.0 {
        score += 8.0;
    } else if company.runway_months < 6.0 {
        score -= 15.0;
    }
    if company.sales_pipeline >= 200.0 {
        score += 5.0;
    }
    score.clamp(0.0, 100.0)
}

fn growth(company: &CompanyState, market: &MarketState) -> f64 {
    let mut score = (company.revenue * 4.0).clamp(0.0, 40.0);
    score += (company.sales_pipeline / 10.0).clamp(0.0, 25.0);
    score += (market.demand_index * 0.15).clamp(0.0, 20.0);
    if company.churn_rate > 15.0 {
        score -= 20.0;
    } else if company.churn_rate > 8.0 {
        score -= 10.0;
    } else if company.churn_rate < 3.0 {
        score += 10.0;
    }
    score.clamp(0.0, 100.0)
}

/// Fixed weighted blend of brand trust and compliance posture.
fn trust(company: &CompanyState) -> f64 {
    (0.55 * company.brand_trust + 0.45 * company.compliance_posture).clamp(0.0, 100.0)
}

/// 100 minus average risk, adjusted by morale and tech-debt thresholds.
fn resilience(company: &CompanyState, risk: &RiskProfile) -> f64 {
    let mut score = 100.0 - risk.mean();
    if company.morale >= 70.0 {
        score += 5.0;
    }
    if company.tech_debt >= 70.0 {
        score -= 10.0;
    } else if company.tech_debt >= 50.0 {
        score -= 5.0;
    }
    score.clamp(0.0, 100.0)
}

fn execution(company: &CompanyState, market: &MarketState) -> f64 {
    (0.35 * company.product_quality
        + 0.30 * company.morale
        + 0.25 * (100.0 - company.tech_debt)
        + 0.10 * (100.0 - market.channel_friction))
        .clamp(0.0, 100.0)
}

fn board_confidence(total: f64) -> &'static str {
    if total >= 80.0 {
        "The board is delighted and pressing for an accelerated plan."
    } else if total >= 65.0 {
        "The board is supportive and watching execution closely."
    } else if total >= 50.0 {
        "The board is cautious; the next two quarters need to show progress."
    } else if total >= 35.0 {
        "The board is concerned and has asked for a recovery plan."
    } else {
        "The board has lost patience; leadership changes are on the table."
    }
}

fn regulatory_heat(risk: &RiskProfile, market: &MarketState) -> &'static str {
    let heat = 0.6 * risk.regulatory + 0.4 * market.regulation_scrutiny;
    if heat >= 70.0 {
        "Regulators are actively engaged; expect formal scrutiny this quarter."
    } else if heat >= 50.0 {
        "Regulatory attention is elevated; filings will be read carefully."
    } else if heat >= 30.0 {
        "Routine regulatory posture; nothing beyond standard reporting."
    } else {
        "Regulatory attention is minimal."
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use contracts::ScenarioConfig;

    fn parts() -> (CompanyState, MarketState, RiskProfile) {
        let scenario = ScenarioConfig::default();
        (
            scenario.initial_company,
            scenario.initial_market,
            scenario.initial_risk,
        )
    }

    #[test]
    fn sub_scores_and_total_stay_bounded() {
        let (mut company, market, mut risk) = parts();
        company.cash = -1_000.0;
        company.profit = -500.0;
        company.runway_months = 0.0;
        risk.operational = 100.0;
        risk.regulatory = 100.0;
        risk.reputational = 100.0;
        risk.financial = 100.0;
        let card = compute(&company, &market, &risk);
        for score in [
            card.financial_health,
            card.growth,
            card.trust,
            card.resilience,
            card.execution,
            card.total,
        ] {
            assert!((0.0..=100.0).contains(&score));
        }
    }

    #[test]
    fn raising_profit_never_lowers_financial_health() {
        let (mut company, market, risk) = parts();
        let profits = [-5.0, -0.1, 0.0, 0.1, 2.0, 20.0];
        let mut last = f64::MIN;
        for profit in profits {
            company.profit = profit;
            let score = compute(&company, &market, &risk).financial_health;
            assert!(score >= last, "profit {profit} dropped score to {score}");
            last = score;
        }
    }

    #[test]
    fn raising_mean_risk_never_raises_resilience() {
        let (company, market, mut risk) = parts();
        let mut last = f64::MAX;
        for level in [10.0, 30.0, 50.0, 70.0, 90.0] {
            risk.operational = level;
            risk.regulatory = level;
            risk.reputational = level;
            risk.financial = level;
            let score = compute(&company, &market, &risk).resilience;
            assert!(score <= last, "risk {level} raised resilience to {score}");
            last = score;
        }
    }

    #[test]
    fn trust_is_the_documented_blend() {
        let (mut company, market, risk) = parts();
        company.brand_trust = 80.0;
        company.compliance_posture = 40.0;
        let card = compute(&company, &market, &risk);
        assert!((card.trust - (0.55 * 80.0 + 0.45 * 40.0)).abs() < 1e-12);
    }

    #[test]
    fn board_confidence_buckets_are_stable() {
        let (mut company, mut market, mut risk) = parts();
        // Push everything to the ceiling for the top bucket.
        company.profit = 50.0;
        company.revenue = 60.0;
        company.costs = 10.0;
        company.cash = 500.0;
        company.runway_months = 120.0;
        company.sales_pipeline = 500.0;
        company.churn_rate = 1.0;
        company.morale = 95.0;
        company.product_quality = 95.0;
        company.brand_trust = 95.0;
        company.compliance_posture = 95.0;
        company.tech_debt = 5.0;
        market.demand_index = 150.0;
        market.channel_friction = 10.0;
        risk.operational = 5.0;
        risk.regulatory = 5.0;
        risk.reputational = 5.0;
        risk.financial = 5.0;
        let card = compute(&company, &market, &risk);
        assert!(card.total >= 80.0);
        assert!(card.board_confidence.contains("delighted"));
        assert!(card.regulatory_heat.contains("minimal"));
    }
}
