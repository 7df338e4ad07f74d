//! Read-only textual report views over a team's public state and history.
//!
//! Nothing here feeds back into the simulation; these are formatting
//! helpers for dashboards, exports, and the CLI.

use std::fmt::Write as _;

use contracts::{DecisionOrigin, GameState, NarrativeCategory, Severity};

/// The quarterly board memo: where the company stands right now, what hit
/// it last quarter, and what the board should worry about.
pub fn board_memo(state: &GameState) -> String {
    let company = &state.company;
    let card = &state.scorecard;
    let quarter = state.round.saturating_sub(1);

    let mut memo = String::new();
    let _ = writeln!(memo, "BOARD MEMO — {} (Q{quarter})", state.team_id);
    let _ = writeln!(
        memo,
        "Overall score {:.1}; the board is {}.",
        card.total, card.board_confidence
    );
    let _ = writeln!(
        memo,
        "Financials: revenue {:.1}M, costs {:.1}M, profit {:+.1}M, cash {:.1}M ({:.0} months of runway).",
        company.revenue, company.costs, company.profit, company.cash, company.runway_months
    );
    let _ = writeln!(
        memo,
        "Organization: {:.0} people, morale {:.0}, product quality {:.0}, tech debt {:.0}.",
        company.headcount, company.morale, company.product_quality, company.tech_debt
    );
    let _ = writeln!(
        memo,
        "Regulatory heat is {}; brand trust sits at {:.0}.",
        card.regulatory_heat, company.brand_trust
    );

    let recent: Vec<_> = state
        .event_history
        .iter()
        .filter(|event| event.round + 1 == state.round)
        .collect();
    if recent.is_empty() {
        let _ = writeln!(memo, "No market events hit us last quarter.");
    } else {
        let _ = writeln!(memo, "Last quarter's events:");
        for event in recent {
            let _ = writeln!(memo, "  - [{:?}] {}", event.severity, event.title);
        }
    }

    let warnings: Vec<_> = state
        .narrative_history
        .iter()
        .filter(|entry| {
            entry.category == NarrativeCategory::Warning && entry.round + 1 == state.round
        })
        .collect();
    for warning in warnings {
        let _ = writeln!(memo, "ATTENTION: {}", warning.description);
    }
    memo
}

/// Post-run retrospective: score trajectory, the decisions that mattered,
/// and the heaviest events. Most useful once the run is complete, but any
/// prefix of a run formats fine.
pub fn lessons_learned(state: &GameState) -> String {
    let mut out = String::new();
    let _ = writeln!(
        out,
        "LESSONS LEARNED — {} after {} round(s)",
        state.team_id,
        state.round.saturating_sub(1)
    );
    let _ = writeln!(out, "Final score {:.1}.", state.scorecard.total);

    let submitted = state
        .decision_history
        .iter()
        .flat_map(|record| &record.decisions)
        .filter(|record| record.origin == DecisionOrigin::Submitted)
        .count();
    let total = state
        .decision_history
        .iter()
        .map(|record| record.decisions.len())
        .sum::<usize>();
    if total > 0 {
        let _ = writeln!(
            out,
            "Decision discipline: {submitted}/{total} role decisions actively submitted."
        );
    }

    let high_severity: Vec<_> = state
        .event_history
        .iter()
        .filter(|event| event.severity == Severity::High)
        .collect();
    if high_severity.is_empty() {
        let _ = writeln!(out, "No high-severity events fired.");
    } else {
        let _ = writeln!(out, "High-severity events weathered:");
        for event in high_severity {
            let _ = writeln!(out, "  - Q{}: {}", event.round, event.title);
        }
    }

    let achievements: Vec<_> = state
        .narrative_history
        .iter()
        .filter(|entry| entry.category == NarrativeCategory::Achievement)
        .collect();
    if !achievements.is_empty() {
        let _ = writeln!(out, "Milestones:");
        for achievement in achievements {
            let _ = writeln!(out, "  - Q{}: {}", achievement.round, achievement.title);
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reducer;
    use contracts::{RoundDecisions, ScenarioConfig};

    #[test]
    fn board_memo_reflects_current_financials() {
        let scenario = ScenarioConfig::default();
        let mut state = reducer::new_team_state("run-1", "team-a", &scenario, 12345);
        state = reducer::advance_round(&state, &RoundDecisions::default(), &scenario, &[]).state;

        let memo = board_memo(&state);
        assert!(memo.contains("team-a"));
        assert!(memo.contains("revenue 5.6M"));
        assert!(memo.contains("No market events hit us last quarter."));
    }

    #[test]
    fn lessons_learned_counts_submitted_decisions() {
        let scenario = ScenarioConfig::default();
        let mut state = reducer::new_team_state("run-1", "team-a", &scenario, 12345);
        state = reducer::advance_round(&state, &RoundDecisions::default(), &scenario, &[]).state;

        let summary = lessons_learned(&state);
        assert!(summary.contains("0/7 role decisions actively submitted"));
    }
}
