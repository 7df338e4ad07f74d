//! Probability-driven event generation and effect resolution.
//!
//! Each round at most two events fire. Trigger probability is the scenario
//! base rate times state-dependent modifiers times difficulty, capped at an
//! absolute ceiling. The candidate order is shuffled with the round RNG so
//! catalog ordering never biases which types get tested before the fire
//! limit is reached.

use contracts::{
    CompanyState, EffectDelta, Event, EventType, MarketState, RiskProfile, ScenarioConfig,
    Severity, SCHEMA_VERSION_V1,
};

use crate::rng::SeededRng;

pub const MAX_EVENTS_PER_ROUND: usize = 2;
/// No modifier stacking may push an effective probability past this.
pub const PROBABILITY_CEILING: f64 = 0.5;

/// Read-only view of the slices the generator conditions on.
#[derive(Debug, Clone, Copy)]
pub struct StateView<'a> {
    pub company: &'a CompanyState,
    pub market: &'a MarketState,
    pub risk: &'a RiskProfile,
}

/// Base rate x state modifiers x difficulty, capped.
pub fn effective_probability(
    event_type: EventType,
    scenario: &ScenarioConfig,
    view: StateView<'_>,
) -> f64 {
    let base = scenario
        .event_base_rates
        .get(&event_type)
        .copied()
        .unwrap_or(0.0);
    let effective = base * state_modifier(event_type, view) * scenario.difficulty;
    effective.min(PROBABILITY_CEILING)
}

fn state_modifier(event_type: EventType, view: StateView<'_>) -> f64 {
    let company = view.company;
    let market = view.market;
    let mut modifier = 1.0;
    match event_type {
        EventType::PriceWar => {
            if market.competition_intensity > 70.0 {
                modifier *= 1.6;
            } else if market.competition_intensity > 50.0 {
                modifier *= 1.3;
            }
            if market.price_index > 120.0 {
                modifier *= 1.2;
            }
        }
        EventType::RegulatorInquiry => {
            if company.compliance_posture < 40.0 {
                modifier *= 1.8;
            } else if company.compliance_posture < 55.0 {
                modifier *= 1.4;
            }
            if market.regulation_scrutiny > 60.0 {
                modifier *= 1.3;
            }
        }
        EventType::KeyStaffExit => {
            if company.morale < 35.0 {
                modifier *= 1.8;
            } else if company.morale < 50.0 {
                modifier *= 1.4;
            }
            if market.competition_intensity > 60.0 {
                modifier *= 1.2;
            }
        }
        EventType::SupplyShock => {
            modifier *= 1.0 + market.supply_shock_risk / 100.0;
            if market.channel_friction > 60.0 {
                modifier *= 1.3;
            }
        }
        EventType::ViralMoment => {
            if market.sentiment > 65.0 && company.product_quality > 70.0 {
                modifier *= 1.5;
            } else if company.product_quality > 60.0 {
                modifier *= 1.2;
            }
        }
        EventType::SecurityBreach => {
            if company.tech_debt > 70.0 {
                modifier *= 1.8;
            } else if company.tech_debt > 50.0 {
                modifier *= 1.4;
            }
        }
        EventType::EconomicDownturn => {
            if market.sentiment < 35.0 {
                modifier *= 1.5;
            }
            if market.demand_index < 80.0 {
                modifier *= 1.2;
            }
        }
        EventType::TalentSurge => {
            if company.morale > 70.0 {
                modifier *= 1.4;
            }
            if company.brand_trust > 70.0 {
                modifier *= 1.2;
            }
        }
    }
    modifier
}

fn draw_severity(rng: &mut SeededRng) -> Severity {
    let draw = rng.next_f64();
    if draw < 0.20 {
        Severity::High
    } else if draw < 0.55 {
        Severity::Medium
    } else {
        Severity::Low
    }
}

/// Run one round's generation pass. Probabilities are evaluated against the
/// post-decision state passed in; the pass stops once two events fire.
pub fn generate(
    rng: &mut SeededRng,
    scenario: &ScenarioConfig,
    view: StateView<'_>,
    run_id: &str,
    team_id: &str,
    round: u32,
) -> Vec<Event> {
    let mut candidates = EventType::ALL.to_vec();
    rng.shuffle(&mut candidates);

    let mut fired = Vec::new();
    for event_type in candidates {
        let probability = effective_probability(event_type, scenario, view);
        if rng.chance(probability) {
            let severity = draw_severity(rng);
            let index = fired.len();
            fired.push(build_event(
                event_type, severity, run_id, team_id, round, index, false,
            ));
            if fired.len() == MAX_EVENTS_PER_ROUND {
                break;
            }
        }
    }
    fired
}

/// Facilitator path: same effect resolution, no probability test. The
/// sequence index is offset so forced ids never collide with generated ones.
pub fn resolve_forced(
    event_type: EventType,
    severity: Severity,
    run_id: &str,
    team_id: &str,
    round: u32,
    index: usize,
) -> Event {
    build_event(
        event_type,
        severity,
        run_id,
        team_id,
        round,
        MAX_EVENTS_PER_ROUND + index,
        true,
    )
}

fn build_event(
    event_type: EventType,
    severity: Severity,
    run_id: &str,
    team_id: &str,
    round: u32,
    index: usize,
    forced: bool,
) -> Event {
    let scale = severity.magnitude_scale();
    let effects = base_effects(event_type)
        .iter()
        .map(|(target, amount)| EffectDelta {
            target: (*target).to_string(),
            amount: amount * scale,
        })
        .collect();
    let (title, description) = copy_for(event_type, severity);
    Event {
        schema_version: SCHEMA_VERSION_V1.to_string(),
        event_id: format!("evt:{team_id}:{round:03}:{index}"),
        run_id: run_id.to_string(),
        team_id: team_id.to_string(),
        round,
        event_type,
        severity,
        title: title.to_string(),
        description: description.to_string(),
        effects,
        forced,
    }
}

/// Additive deltas authored at high severity. Targets are string paths so
/// scenario tooling can extend them without code changes; the resolver
/// ignores anything it does not recognize.
fn base_effects(event_type: EventType) -> &'static [(&'static str, f64)] {
    match event_type {
        EventType::PriceWar => &[
            ("market.price_index", -14.0),
            ("market.competition_intensity", 8.0),
            ("company.sales_pipeline", -30.0),
            ("market.sentiment", -4.0),
        ],
        EventType::RegulatorInquiry => &[
            ("risk.regulatory", 18.0),
            ("company.brand_trust", -5.0),
            ("market.regulation_scrutiny", 10.0),
            ("company.costs", 0.6),
        ],
        EventType::KeyStaffExit => &[
            ("company.morale", -10.0),
            ("company.headcount", -3.0),
            ("company.product_quality", -4.0),
            ("risk.operational", 8.0),
        ],
        EventType::SupplyShock => &[
            ("market.channel_friction", 12.0),
            ("company.costs", 1.0),
            ("market.supply_shock_risk", 10.0),
            ("risk.operational", 10.0),
        ],
        EventType::ViralMoment => &[
            ("company.sales_pipeline", 60.0),
            ("company.brand_trust", 6.0),
            ("market.sentiment", 10.0),
            ("market.demand_index", 8.0),
        ],
        EventType::SecurityBreach => &[
            ("company.brand_trust", -12.0),
            ("risk.reputational", 15.0),
            ("risk.regulatory", 8.0),
            ("company.costs", 0.8),
            ("company.tech_debt", 6.0),
        ],
        EventType::EconomicDownturn => &[
            ("market.demand_index", -15.0),
            ("market.sentiment", -10.0),
            ("company.sales_pipeline", -25.0),
            ("risk.financial", 10.0),
        ],
        EventType::TalentSurge => &[
            ("company.morale", 6.0),
            ("company.headcount", 4.0),
            ("company.product_quality", 3.0),
            ("risk.operational", -5.0),
        ],
    }
}

fn copy_for(event_type: EventType, severity: Severity) -> (&'static str, &'static str) {
    match event_type {
        EventType::PriceWar => (
            "Price war breaks out",
            match severity {
                Severity::High => "A major competitor slashes list prices across the segment; deals stall while buyers re-shop everything.",
                Severity::Medium => "Competitors start undercutting on renewals and net-new deals alike.",
                Severity::Low => "Scattered discounting pressure shows up in competitive deals.",
            },
        ),
        EventType::RegulatorInquiry => (
            "Regulator opens an inquiry",
            match severity {
                Severity::High => "A formal investigation lands with a document request and a deadline; counsel is now on speed dial.",
                Severity::Medium => "A regulator requests clarifications about recent practices.",
                Severity::Low => "An informal question from a regulator hints at closer attention.",
            },
        ),
        EventType::KeyStaffExit => (
            "Key staff depart",
            match severity {
                Severity::High => "A senior leader resigns and takes part of the team along; roadmap owners are suddenly missing.",
                Severity::Medium => "Two well-regarded engineers hand in notice within a week.",
                Severity::Low => "A respected team member moves on; the team absorbs the load.",
            },
        ),
        EventType::SupplyShock => (
            "Supply chain shock",
            match severity {
                Severity::High => "A critical supplier halts shipments; fulfillment costs spike while alternatives are sourced.",
                Severity::Medium => "Lead times double on a key component.",
                Severity::Low => "Minor logistics disruption raises delivery friction.",
            },
        ),
        EventType::ViralMoment => (
            "Product goes viral",
            match severity {
                Severity::High => "An influential review sends sign-ups through the roof; the funnel has never looked like this.",
                Severity::Medium => "A customer story gets broad pick-up and inbound interest jumps.",
                Severity::Low => "A positive mention nudges awareness upward.",
            },
        ),
        EventType::SecurityBreach => (
            "Security incident disclosed",
            match severity {
                Severity::High => "Attackers exploited an unpatched path through legacy systems; disclosure obligations kick in immediately.",
                Severity::Medium => "A contained breach still requires customer notification.",
                Severity::Low => "A near-miss audit finding forces an uncomfortable writeup.",
            },
        ),
        EventType::EconomicDownturn => (
            "Macro conditions worsen",
            match severity {
                Severity::High => "Budgets freeze across the customer base as the downturn deepens.",
                Severity::Medium => "Procurement cycles stretch as buyers tighten spending.",
                Severity::Low => "Early softness shows in discretionary spending.",
            },
        ),
        EventType::TalentSurge => (
            "Talent market swings our way",
            match severity {
                Severity::High => "A competitor's layoff frees exceptional candidates who want in; hiring velocity jumps.",
                Severity::Medium => "Strong applicants start arriving through referrals.",
                Severity::Low => "A couple of solid hires close faster than expected.",
            },
        ),
    }
}

/// Applies every recognized delta of an event; unknown targets are skipped
/// to stay forward compatible with evolving scenario configs.
pub fn apply_effects(
    company: &mut CompanyState,
    market: &mut MarketState,
    risk: &mut RiskProfile,
    event: &Event,
) {
    for delta in &event.effects {
        apply_delta(company, market, risk, &delta.target, delta.amount);
    }
}

fn apply_delta(
    company: &mut CompanyState,
    market: &mut MarketState,
    risk: &mut RiskProfile,
    target: &str,
    amount: f64,
) {
    match target {
        "company.cash" => company.cash += amount,
        "company.revenue" => company.revenue += amount,
        "company.costs" => company.costs += amount,
        "company.headcount" => company.headcount += amount,
        "company.morale" => company.morale += amount,
        "company.tech_debt" => company.tech_debt += amount,
        "company.product_quality" => company.product_quality += amount,
        "company.brand_trust" => company.brand_trust += amount,
        "company.compliance_posture" => company.compliance_posture += amount,
        "company.sales_pipeline" => company.sales_pipeline += amount,
        "company.churn_rate" => company.churn_rate += amount,
        "market.demand_index" => market.demand_index += amount,
        "market.price_index" => market.price_index += amount,
        "market.competition_intensity" => market.competition_intensity += amount,
        "market.regulation_scrutiny" => market.regulation_scrutiny += amount,
        "market.channel_friction" => market.channel_friction += amount,
        "market.supply_shock_risk" => market.supply_shock_risk += amount,
        "market.sentiment" => market.sentiment += amount,
        "risk.operational" => risk.operational += amount,
        "risk.regulatory" => risk.regulatory += amount,
        "risk.reputational" => risk.reputational += amount,
        "risk.financial" => risk.financial += amount,
        _ => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scenario() -> ScenarioConfig {
        ScenarioConfig::default()
    }

    fn view(scenario: &ScenarioConfig) -> StateView<'_> {
        StateView {
            company: &scenario.initial_company,
            market: &scenario.initial_market,
            risk: &scenario.initial_risk,
        }
    }

    #[test]
    fn probability_never_exceeds_ceiling_under_stacked_modifiers() {
        let mut scenario = scenario();
        scenario.difficulty = 3.0;
        let mut company = scenario.initial_company.clone();
        let mut market = scenario.initial_market.clone();
        company.compliance_posture = 5.0;
        company.morale = 10.0;
        company.tech_debt = 95.0;
        market.competition_intensity = 95.0;
        market.price_index = 150.0;
        market.regulation_scrutiny = 90.0;
        market.supply_shock_risk = 100.0;
        market.channel_friction = 90.0;
        market.sentiment = 5.0;
        market.demand_index = 40.0;
        let view = StateView {
            company: &company,
            market: &market,
            risk: &scenario.initial_risk,
        };
        for event_type in EventType::ALL {
            let p = effective_probability(event_type, &scenario, view);
            assert!(p <= PROBABILITY_CEILING, "{event_type} reached {p}");
        }
    }

    #[test]
    fn low_compliance_raises_inquiry_probability() {
        let scenario = scenario();
        let baseline = effective_probability(EventType::RegulatorInquiry, &scenario, view(&scenario));
        let mut weak = scenario.initial_company.clone();
        weak.compliance_posture = 30.0;
        let weak_view = StateView {
            company: &weak,
            market: &scenario.initial_market,
            risk: &scenario.initial_risk,
        };
        let raised = effective_probability(EventType::RegulatorInquiry, &scenario, weak_view);
        assert!(raised > baseline);
    }

    #[test]
    fn unknown_rate_means_zero_probability() {
        let mut scenario = scenario();
        scenario.event_base_rates.remove(&EventType::PriceWar);
        let p = effective_probability(EventType::PriceWar, &scenario, view(&scenario));
        assert_eq!(p, 0.0);
    }

    #[test]
    fn generation_fires_at_most_two_events() {
        let mut scenario = scenario();
        // Saturate every probability at the ceiling.
        for rate in scenario.event_base_rates.values_mut() {
            *rate = 10.0;
        }
        for seed in 0..32_u64 {
            let mut rng = SeededRng::for_round(seed, 1);
            let fired = generate(&mut rng, &scenario, view(&scenario), "run", "team", 1);
            assert!(fired.len() <= MAX_EVENTS_PER_ROUND);
        }
    }

    #[test]
    fn same_seed_and_round_yield_identical_candidate_order() {
        let mut rng_a = SeededRng::for_round(9001, 4);
        let mut rng_b = SeededRng::for_round(9001, 4);
        let mut order_a = EventType::ALL.to_vec();
        let mut order_b = EventType::ALL.to_vec();
        rng_a.shuffle(&mut order_a);
        rng_b.shuffle(&mut order_b);
        assert_eq!(order_a, order_b);
    }

    #[test]
    fn forced_event_skips_probability_and_marks_forced() {
        let event = resolve_forced(EventType::SecurityBreach, Severity::High, "r", "t", 3, 0);
        assert!(event.forced);
        assert_eq!(event.severity, Severity::High);
        assert!(!event.effects.is_empty());
    }

    #[test]
    fn severity_scales_effect_magnitudes() {
        let high = resolve_forced(EventType::PriceWar, Severity::High, "r", "t", 1, 0);
        let low = resolve_forced(EventType::PriceWar, Severity::Low, "r", "t", 1, 0);
        for (big, small) in high.effects.iter().zip(low.effects.iter()) {
            assert_eq!(big.target, small.target);
            assert!((small.amount - big.amount * 0.35).abs() < 1e-12);
        }
    }

    #[test]
    fn unrecognized_effect_target_is_ignored() {
        let scenario = scenario();
        let mut company = scenario.initial_company.clone();
        let mut market = scenario.initial_market.clone();
        let mut risk = scenario.initial_risk.clone();
        let before = company.clone();
        let mut event = resolve_forced(EventType::PriceWar, Severity::Low, "r", "t", 1, 0);
        event.effects = vec![EffectDelta {
            target: "company.synergy_index".to_string(),
            amount: 100.0,
        }];
        apply_effects(&mut company, &mut market, &mut risk, &event);
        assert_eq!(company, before);
    }
}
