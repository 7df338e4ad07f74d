//! Role decision-effect functions.
//!
//! Each role's function consumes and returns an updated `RoundContext`, and
//! the reducer composes them left to right in `Role::PIPELINE_ORDER`, so
//! later roles observe earlier roles' updates within the same round. All
//! default decisions are strict no-ops.

use contracts::{
    CampaignIntensity, CompanyState, GeneralManagementDecision, GmPriority, LegalDecision,
    LegalStance, MarketState, MarketingDecision, OperationsDecision, OpsFocus, RecordedDecision,
    ResearchDecision, ResearchDirection, RiskProfile, Role, RoleDecision, RoundDecisions,
    SalesDecision, SalesMotion, StrategyDecision, StrategyPosture, DecisionOrigin,
};

/// The mutable slice of state the decision pipeline runs over, plus the
/// round-scoped accumulators the financial model consumes afterwards.
#[derive(Debug, Clone)]
pub struct RoundContext {
    pub company: CompanyState,
    pub market: MarketState,
    pub risk: RiskProfile,
    /// Spend committed by any role this round, added to costs by the
    /// financial recompute.
    pub spend_this_round: f64,
    /// Multiplies the cost base; operations and general management can
    /// lower it for one round.
    pub cost_multiplier: f64,
    /// Set when legal actively reinforced compliance, which skips this
    /// round's passive compliance decay.
    pub legal_reinforced: bool,
}

impl RoundContext {
    pub fn new(company: CompanyState, market: MarketState, risk: RiskProfile) -> Self {
        Self {
            company,
            market,
            risk,
            spend_this_round: 0.0,
            cost_multiplier: 1.0,
            legal_reinforced: false,
        }
    }
}

/// Fills every absent role with its status-quo default, tagging each record
/// with whether it was submitted or defaulted. Absence is never an error.
pub fn fill_defaults(decisions: &RoundDecisions) -> Vec<RecordedDecision> {
    Role::PIPELINE_ORDER
        .iter()
        .map(|role| match decisions.by_role.get(role) {
            Some(decision) => RecordedDecision {
                role: *role,
                origin: DecisionOrigin::Submitted,
                decision: decision.clone(),
            },
            None => RecordedDecision {
                role: *role,
                origin: DecisionOrigin::Defaulted,
                decision: RoleDecision::default_for(*role),
            },
        })
        .collect()
}

/// Applies one role's decision. Dispatch is total: every variant is handled
/// and unknown postures cannot exist.
pub fn apply_decision(decision: &RoleDecision, ctx: RoundContext) -> RoundContext {
    match decision {
        RoleDecision::Strategy(d) => apply_strategy(d, ctx),
        RoleDecision::Marketing(d) => apply_marketing(d, ctx),
        RoleDecision::Sales(d) => apply_sales(d, ctx),
        RoleDecision::Operations(d) => apply_operations(d, ctx),
        RoleDecision::Research(d) => apply_research(d, ctx),
        RoleDecision::Legal(d) => apply_legal(d, ctx),
        RoleDecision::GeneralManagement(d) => apply_general_management(d, ctx),
    }
}

fn apply_strategy(decision: &StrategyDecision, mut ctx: RoundContext) -> RoundContext {
    let spend = decision.expansion_spend.max(0.0);
    match decision.posture {
        StrategyPosture::Hold => {}
        StrategyPosture::Expand => {
            ctx.spend_this_round += spend;
            ctx.company.sales_pipeline += 20.0 + spend * 6.0;
            ctx.risk.operational += 4.0;
            ctx.market.channel_friction += 2.0;
        }
        StrategyPosture::Focus => {
            ctx.company.product_quality += 2.0;
            ctx.company.sales_pipeline *= 0.95;
            ctx.risk.operational -= 3.0;
        }
        StrategyPosture::Pivot => {
            ctx.spend_this_round += spend;
            ctx.company.sales_pipeline *= 0.85;
            ctx.company.product_quality -= 3.0;
            ctx.company.morale -= 3.0;
            ctx.company.tech_debt -= 4.0;
            ctx.risk.financial += 5.0;
        }
    }
    ctx
}

fn apply_marketing(decision: &MarketingDecision, mut ctx: RoundContext) -> RoundContext {
    let spend = decision.spend.max(0.0);
    match decision.campaign {
        CampaignIntensity::Maintain => {}
        CampaignIntensity::Targeted => {
            ctx.spend_this_round += spend;
            ctx.company.sales_pipeline += spend * 8.0;
            ctx.market.sentiment += 1.0;
        }
        CampaignIntensity::Aggressive => {
            ctx.spend_this_round += spend;
            ctx.company.sales_pipeline += spend * 11.0;
            ctx.market.sentiment += 2.0;
            ctx.company.brand_trust -= 1.0;
        }
    }
    if decision.brand_push {
        ctx.spend_this_round += 1.0;
        ctx.company.brand_trust += 2.0;
    }
    ctx
}

fn apply_sales(decision: &SalesDecision, mut ctx: RoundContext) -> RoundContext {
    match decision.motion {
        SalesMotion::Steady => {}
        SalesMotion::Enterprise => {
            ctx.company.sales_pipeline += 10.0;
            ctx.company.churn_rate -= 0.5;
            ctx.market.channel_friction -= 1.0;
        }
        SalesMotion::Velocity => {
            ctx.company.sales_pipeline += 25.0;
            ctx.company.churn_rate += 0.8;
        }
    }
    if decision.hiring != 0.0 {
        ctx.company.headcount += decision.hiring;
        ctx.spend_this_round += decision.hiring.max(0.0) * 0.02;
    }
    if decision.discounting {
        ctx.company.sales_pipeline *= 1.08;
        ctx.risk.financial += 3.0;
    }
    ctx
}

fn apply_operations(decision: &OperationsDecision, mut ctx: RoundContext) -> RoundContext {
    let spend = decision.automation_spend.max(0.0);
    match decision.focus {
        OpsFocus::Maintain => {}
        OpsFocus::Efficiency => {
            ctx.spend_this_round += spend;
            ctx.cost_multiplier *= 0.95;
            ctx.market.channel_friction -= 3.0;
            ctx.risk.operational -= 2.0;
            // Efficiency pushes defer maintenance.
            ctx.company.tech_debt += 1.0;
        }
        OpsFocus::Capacity => {
            ctx.spend_this_round += spend;
            ctx.company.headcount += 2.0;
            ctx.market.channel_friction -= 2.0;
        }
        OpsFocus::Resilience => {
            ctx.spend_this_round += spend;
            ctx.market.supply_shock_risk -= 4.0;
            ctx.risk.operational -= 4.0;
        }
    }
    ctx
}

fn apply_research(decision: &ResearchDecision, mut ctx: RoundContext) -> RoundContext {
    let spend = decision.spend.max(0.0);
    match decision.direction {
        ResearchDirection::Sustain => {}
        ResearchDirection::NewProduct => {
            ctx.spend_this_round += spend;
            ctx.company.product_quality += spend * 0.8;
            ctx.company.sales_pipeline += spend * 3.0;
            ctx.company.tech_debt += 2.0;
        }
        ResearchDirection::DebtPaydown => {
            ctx.spend_this_round += spend;
            ctx.company.tech_debt -= 4.0 + spend * 2.0;
        }
        ResearchDirection::QualityHardening => {
            ctx.spend_this_round += spend;
            ctx.company.product_quality += 3.0;
            ctx.company.tech_debt -= 1.0;
        }
    }
    ctx
}

fn apply_legal(decision: &LegalDecision, mut ctx: RoundContext) -> RoundContext {
    let invest = decision.compliance_invest.max(0.0);
    match decision.stance {
        LegalStance::Monitor => {}
        LegalStance::Reinforce => {
            ctx.spend_this_round += invest;
            ctx.company.compliance_posture += 4.0 + invest * 1.5;
            ctx.risk.regulatory -= 3.0;
            ctx.legal_reinforced = true;
        }
        LegalStance::Aggressive => {
            ctx.spend_this_round += invest;
            ctx.company.compliance_posture += 2.0;
            ctx.risk.regulatory -= 6.0;
            ctx.market.regulation_scrutiny -= 2.0;
            ctx.legal_reinforced = true;
        }
    }
    ctx
}

fn apply_general_management(
    decision: &GeneralManagementDecision,
    mut ctx: RoundContext,
) -> RoundContext {
    let invest = decision.culture_invest.max(0.0);
    match decision.priority {
        GmPriority::SteadyHand => {}
        GmPriority::CostControl => {
            ctx.cost_multiplier *= 0.93;
            ctx.company.morale -= 3.0;
            ctx.market.sentiment -= 1.0;
        }
        GmPriority::GrowthPush => {
            ctx.company.sales_pipeline *= 1.05;
            ctx.company.morale -= 1.0;
            ctx.risk.operational += 2.0;
        }
        GmPriority::MoraleRescue => {
            ctx.spend_this_round += invest;
            ctx.company.morale += 6.0 + invest * 2.0;
        }
    }
    ctx
}

/// A decision is notable when it was actually submitted and departs from
/// status quo; defaults and trivial spends never generate narrative.
pub fn is_notable(record: &RecordedDecision) -> bool {
    if record.origin == DecisionOrigin::Defaulted {
        return false;
    }
    match &record.decision {
        RoleDecision::Strategy(d) => {
            d.posture != StrategyPosture::Hold || d.expansion_spend > 0.5
        }
        RoleDecision::Marketing(d) => {
            d.campaign != CampaignIntensity::Maintain || d.brand_push || d.spend > 0.5
        }
        RoleDecision::Sales(d) => {
            d.motion != SalesMotion::Steady || d.discounting || d.hiring.abs() > 2.0
        }
        RoleDecision::Operations(d) => {
            d.focus != OpsFocus::Maintain || d.automation_spend > 0.5
        }
        RoleDecision::Research(d) => {
            d.direction != ResearchDirection::Sustain || d.spend > 0.5
        }
        RoleDecision::Legal(d) => d.stance != LegalStance::Monitor || d.compliance_invest > 0.5,
        RoleDecision::GeneralManagement(d) => {
            d.priority != GmPriority::SteadyHand || d.culture_invest > 0.5
        }
    }
}
