//! Structured narrative for one round: what the roles did, what happened,
//! how the numbers moved, and which thresholds were crossed.
//!
//! Entry shape (category, impact, metric keys) is the durable contract;
//! the prose is free to change.

use contracts::{
    CampaignIntensity, CompanyState, Event, GmPriority, LegalStance, NarrativeCategory,
    NarrativeEntry, NarrativeImpact, OpsFocus, RecordedDecision, ResearchDirection, RiskProfile,
    RoleDecision, SalesMotion, Scorecard, Severity, StrategyPosture,
};

use crate::roles::is_notable;

/// The before/after tuple the generator reads. Both sides are post-clamp
/// states from consecutive rounds.
pub struct RoundView<'a> {
    pub round: u32,
    pub before_company: &'a CompanyState,
    pub before_risk: &'a RiskProfile,
    pub before_scorecard: &'a Scorecard,
    pub after_company: &'a CompanyState,
    pub after_risk: &'a RiskProfile,
    pub after_scorecard: &'a Scorecard,
}

const OUTCOME_REVENUE_THRESHOLD: f64 = 0.5;
const OUTCOME_TRUST_THRESHOLD: f64 = 3.0;
const OUTCOME_QUALITY_THRESHOLD: f64 = 3.0;
const OUTCOME_SCORE_THRESHOLD: f64 = 5.0;

pub fn generate(
    view: &RoundView<'_>,
    decisions: &[RecordedDecision],
    events: &[Event],
) -> Vec<NarrativeEntry> {
    let mut entries = Vec::new();
    decision_entries(view.round, decisions, &mut entries);
    event_entries(events, &mut entries);
    outcome_entries(view, &mut entries);
    warning_entries(view, &mut entries);
    achievement_entries(view, &mut entries);
    entries
}

fn decision_entries(round: u32, decisions: &[RecordedDecision], out: &mut Vec<NarrativeEntry>) {
    for record in decisions.iter().filter(|record| is_notable(record)) {
        let (description, metrics) = describe_decision(&record.decision);
        out.push(NarrativeEntry {
            round,
            category: NarrativeCategory::Decision,
            title: format!("{} sets direction", record.role),
            description,
            impact: NarrativeImpact::Neutral,
            metrics,
        });
    }
}

fn describe_decision(decision: &RoleDecision) -> (String, Vec<String>) {
    match decision {
        RoleDecision::Strategy(d) => {
            let what = match d.posture {
                StrategyPosture::Hold => "holds the current course",
                StrategyPosture::Expand => "pushes into adjacent segments",
                StrategyPosture::Focus => "narrows focus to the core product",
                StrategyPosture::Pivot => "commits to a pivot",
            };
            (
                format!("Strategy {what} with {:.1}M committed.", d.expansion_spend),
                vec!["sales_pipeline".into(), "product_quality".into()],
            )
        }
        RoleDecision::Marketing(d) => {
            let what = match d.campaign {
                CampaignIntensity::Maintain => "keeps campaigns steady",
                CampaignIntensity::Targeted => "runs a targeted campaign",
                CampaignIntensity::Aggressive => "floods every channel",
            };
            (
                format!("Marketing {what} at {:.1}M spend.", d.spend),
                vec!["sales_pipeline".into(), "brand_trust".into()],
            )
        }
        RoleDecision::Sales(d) => {
            let what = match d.motion {
                SalesMotion::Steady => "works the existing book",
                SalesMotion::Enterprise => "moves upmarket",
                SalesMotion::Velocity => "chases transaction volume",
            };
            (
                format!("Sales {what}; net hiring {:+.0}.", d.hiring),
                vec!["sales_pipeline".into(), "churn_rate".into()],
            )
        }
        RoleDecision::Operations(d) => {
            let what = match d.focus {
                OpsFocus::Maintain => "keeps the machine running",
                OpsFocus::Efficiency => "drives an efficiency program",
                OpsFocus::Capacity => "builds out capacity",
                OpsFocus::Resilience => "hardens the supply chain",
            };
            (
                format!("Operations {what}."),
                vec!["costs".into(), "channel_friction".into()],
            )
        }
        RoleDecision::Research(d) => {
            let what = match d.direction {
                ResearchDirection::Sustain => "sustains current lines",
                ResearchDirection::NewProduct => "bets on a new product line",
                ResearchDirection::DebtPaydown => "pays down technical debt",
                ResearchDirection::QualityHardening => "hardens product quality",
            };
            (
                format!("R&D {what} with {:.1}M.", d.spend),
                vec!["product_quality".into(), "tech_debt".into()],
            )
        }
        RoleDecision::Legal(d) => {
            let what = match d.stance {
                LegalStance::Monitor => "monitors the landscape",
                LegalStance::Reinforce => "reinforces compliance",
                LegalStance::Aggressive => "goes on the regulatory offensive",
            };
            (
                format!("Legal {what}."),
                vec!["compliance_posture".into(), "regulatory_risk".into()],
            )
        }
        RoleDecision::GeneralManagement(d) => {
            let what = match d.priority {
                GmPriority::SteadyHand => "keeps a steady hand",
                GmPriority::CostControl => "clamps down on costs",
                GmPriority::GrowthPush => "pushes the organization for growth",
                GmPriority::MoraleRescue => "invests in the team",
            };
            (format!("GM {what}."), vec!["morale".into(), "costs".into()])
        }
    }
}

fn event_entries(events: &[Event], out: &mut Vec<NarrativeEntry>) {
    for event in events {
        let beneficial = event
            .effects
            .iter()
            .map(|delta| polarity(&delta.target) * delta.amount)
            .sum::<f64>()
            > 0.0;
        let impact = if beneficial {
            NarrativeImpact::Positive
        } else {
            NarrativeImpact::Negative
        };
        let severity_tag = match event.severity {
            Severity::High => "major",
            Severity::Medium => "notable",
            Severity::Low => "minor",
        };
        out.push(NarrativeEntry {
            round: event.round,
            category: NarrativeCategory::Event,
            title: event.title.clone(),
            description: format!("A {severity_tag} development: {}", event.description),
            impact,
            metrics: event
                .effects
                .iter()
                .map(|delta| delta.target.clone())
                .collect(),
        });
    }
}

/// +1 when an increase helps the company, -1 when it hurts.
fn polarity(target: &str) -> f64 {
    match target {
        "company.costs"
        | "company.tech_debt"
        | "company.churn_rate"
        | "market.competition_intensity"
        | "market.regulation_scrutiny"
        | "market.channel_friction"
        | "market.supply_shock_risk"
        | "risk.operational"
        | "risk.regulatory"
        | "risk.reputational"
        | "risk.financial" => -1.0,
        _ => 1.0,
    }
}

fn outcome_entries(view: &RoundView<'_>, out: &mut Vec<NarrativeEntry>) {
    let round = view.round;
    let revenue_delta = view.after_company.revenue - view.before_company.revenue;
    if revenue_delta.abs() >= OUTCOME_REVENUE_THRESHOLD {
        out.push(delta_entry(
            round,
            "Revenue",
            revenue_delta,
            "revenue",
            format!("Quarterly revenue moved {revenue_delta:+.1}M."),
        ));
    }
    let trust_delta = view.after_company.brand_trust - view.before_company.brand_trust;
    if trust_delta.abs() >= OUTCOME_TRUST_THRESHOLD {
        out.push(delta_entry(
            round,
            "Brand trust",
            trust_delta,
            "brand_trust",
            format!("Brand trust shifted {trust_delta:+.1} points."),
        ));
    }
    let quality_delta = view.after_company.product_quality - view.before_company.product_quality;
    if quality_delta.abs() >= OUTCOME_QUALITY_THRESHOLD {
        out.push(delta_entry(
            round,
            "Product quality",
            quality_delta,
            "product_quality",
            format!("Product quality shifted {quality_delta:+.1} points."),
        ));
    }
    let score_delta = view.after_scorecard.total - view.before_scorecard.total;
    if score_delta.abs() >= OUTCOME_SCORE_THRESHOLD {
        out.push(delta_entry(
            round,
            "Overall score",
            score_delta,
            "total_score",
            format!("The total score moved {score_delta:+.1} points."),
        ));
    }
}

fn delta_entry(
    round: u32,
    title: &str,
    delta: f64,
    metric: &str,
    description: String,
) -> NarrativeEntry {
    NarrativeEntry {
        round,
        category: NarrativeCategory::Outcome,
        title: format!(
            "{title} {}",
            if delta > 0.0 { "improved" } else { "declined" }
        ),
        description,
        impact: if delta > 0.0 {
            NarrativeImpact::Positive
        } else {
            NarrativeImpact::Negative
        },
        metrics: vec![metric.to_string()],
    }
}

/// Warnings fire on the crossing into a danger zone, not every round spent
/// inside it.
fn warning_entries(view: &RoundView<'_>, out: &mut Vec<NarrativeEntry>) {
    let round = view.round;
    let before = view.before_company;
    let after = view.after_company;

    if before.cash >= 10.0 && after.cash < 10.0 {
        out.push(warning(
            round,
            "Cash is running low",
            format!("Cash reserves fell to {:.1}M.", after.cash),
            "cash",
        ));
    }
    if before.tech_debt <= 75.0 && after.tech_debt > 75.0 {
        out.push(warning(
            round,
            "Technical debt is critical",
            format!("Technical debt reached {:.0}.", after.tech_debt),
            "tech_debt",
        ));
    }
    if before.morale >= 35.0 && after.morale < 35.0 {
        out.push(warning(
            round,
            "Morale is collapsing",
            format!("Team morale dropped to {:.0}.", after.morale),
            "morale",
        ));
    }
    if view.before_risk.regulatory <= 70.0 && view.after_risk.regulatory > 70.0 {
        out.push(warning(
            round,
            "Regulatory exposure is severe",
            format!(
                "Regulatory risk climbed to {:.0}%.",
                view.after_risk.regulatory
            ),
            "regulatory_risk",
        ));
    }
    if before.churn_rate <= 15.0 && after.churn_rate > 15.0 {
        out.push(warning(
            round,
            "Churn is accelerating",
            format!("Quarterly churn reached {:.1}%.", after.churn_rate),
            "churn_rate",
        ));
    }
}

fn warning(round: u32, title: &str, description: String, metric: &str) -> NarrativeEntry {
    NarrativeEntry {
        round,
        category: NarrativeCategory::Warning,
        title: title.to_string(),
        description,
        impact: NarrativeImpact::Negative,
        metrics: vec![metric.to_string()],
    }
}

/// Milestones fire exactly once per upward crossing; falling back below the
/// threshold re-arms them.
fn achievement_entries(view: &RoundView<'_>, out: &mut Vec<NarrativeEntry>) {
    let round = view.round;
    let before = view.before_company;
    let after = view.after_company;

    if before.profit <= 0.0 && after.profit > 0.0 {
        out.push(achievement(
            round,
            "Profitable quarter",
            format!("The company turned a {:.1}M profit.", after.profit),
            "profit",
        ));
    }
    if before.brand_trust < 80.0 && after.brand_trust >= 80.0 {
        out.push(achievement(
            round,
            "Trusted brand",
            "Brand trust crossed the 80-point mark.".to_string(),
            "brand_trust",
        ));
    }
    if before.runway_months < 24.0 && after.runway_months >= 24.0 {
        out.push(achievement(
            round,
            "Two years of runway",
            "Cash runway crossed 24 months.".to_string(),
            "runway_months",
        ));
    }
    if view.before_scorecard.total < 85.0 && view.after_scorecard.total >= 85.0 {
        out.push(achievement(
            round,
            "Top-tier performance",
            "The total score crossed 85.".to_string(),
            "total_score",
        ));
    }
}

fn achievement(round: u32, title: &str, description: String, metric: &str) -> NarrativeEntry {
    NarrativeEntry {
        round,
        category: NarrativeCategory::Achievement,
        title: title.to_string(),
        description,
        impact: NarrativeImpact::Positive,
        metrics: vec![metric.to_string()],
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::resolve_forced;
    use crate::scorecard;
    use contracts::{DecisionOrigin, EventType, Role, ScenarioConfig};

    struct Fixture {
        before_company: CompanyState,
        before_risk: RiskProfile,
        before_scorecard: Scorecard,
        after_company: CompanyState,
        after_risk: RiskProfile,
        after_scorecard: Scorecard,
    }

    fn fixture() -> Fixture {
        let scenario = ScenarioConfig::default();
        let company = scenario.initial_company.clone();
        let risk = scenario.initial_risk.clone();
        let card = scorecard::compute(&company, &scenario.initial_market, &risk);
        Fixture {
            before_company: company.clone(),
            before_risk: risk.clone(),
            before_scorecard: card.clone(),
            after_company: company,
            after_risk: risk,
            after_scorecard: card,
        }
    }

    fn view(fixture: &Fixture) -> RoundView<'_> {
        RoundView {
            round: 1,
            before_company: &fixture.before_company,
            before_risk: &fixture.before_risk,
            before_scorecard: &fixture.before_scorecard,
            after_company: &fixture.after_company,
            after_risk: &fixture.after_risk,
            after_scorecard: &fixture.after_scorecard,
        }
    }

    #[test]
    fn unchanged_round_with_defaults_is_silent() {
        let fixture = fixture();
        let entries = generate(&view(&fixture), &[], &[]);
        assert!(entries.is_empty());
    }

    #[test]
    fn profit_crossing_emits_exactly_one_achievement() {
        let mut fixture = fixture();
        fixture.before_company.profit = -0.5;
        fixture.after_company.profit = 0.8;
        let entries = generate(&view(&fixture), &[], &[]);
        let achievements: Vec<_> = entries
            .iter()
            .filter(|entry| entry.category == NarrativeCategory::Achievement)
            .collect();
        assert_eq!(achievements.len(), 1);
        assert!(achievements[0].metrics.contains(&"profit".to_string()));
    }

    #[test]
    fn profit_achievement_not_reemitted_while_profitable() {
        let mut fixture = fixture();
        fixture.before_company.profit = 1.2;
        fixture.after_company.profit = 2.4;
        let entries = generate(&view(&fixture), &[], &[]);
        assert!(entries
            .iter()
            .all(|entry| entry.category != NarrativeCategory::Achievement));
    }

    #[test]
    fn warning_fires_on_crossing_not_while_inside() {
        let mut fixture = fixture();
        fixture.before_company.cash = 12.0;
        fixture.after_company.cash = 8.0;
        let entries = generate(&view(&fixture), &[], &[]);
        assert!(entries
            .iter()
            .any(|entry| entry.category == NarrativeCategory::Warning
                && entry.metrics.contains(&"cash".to_string())));

        fixture.before_company.cash = 8.0;
        fixture.after_company.cash = 6.0;
        let entries = generate(&view(&fixture), &[], &[]);
        assert!(entries
            .iter()
            .all(|entry| entry.category != NarrativeCategory::Warning));
    }

    #[test]
    fn event_entries_carry_effect_targets_as_metrics() {
        let fixture = fixture();
        let event = resolve_forced(EventType::SecurityBreach, Severity::Medium, "r", "t", 1, 0);
        let entries = generate(&view(&fixture), &[], &[event]);
        let breach = entries
            .iter()
            .find(|entry| entry.category == NarrativeCategory::Event)
            .unwrap();
        assert_eq!(breach.impact, NarrativeImpact::Negative);
        assert!(breach.metrics.contains(&"company.brand_trust".to_string()));
    }

    #[test]
    fn defaulted_decisions_generate_no_narrative() {
        let fixture = fixture();
        let records: Vec<RecordedDecision> = Role::PIPELINE_ORDER
            .iter()
            .map(|role| RecordedDecision {
                role: *role,
                origin: DecisionOrigin::Defaulted,
                decision: contracts::RoleDecision::default_for(*role),
            })
            .collect();
        let entries = generate(&view(&fixture), &records, &[]);
        assert!(entries.is_empty());
    }

    #[test]
    fn significant_revenue_delta_emits_outcome() {
        let mut fixture = fixture();
        fixture.after_company.revenue = fixture.before_company.revenue + 1.5;
        let entries = generate(&view(&fixture), &[], &[]);
        let outcome = entries
            .iter()
            .find(|entry| entry.category == NarrativeCategory::Outcome)
            .unwrap();
        assert_eq!(outcome.impact, NarrativeImpact::Positive);
        assert!(outcome.metrics.contains(&"revenue".to_string()));
    }
}
