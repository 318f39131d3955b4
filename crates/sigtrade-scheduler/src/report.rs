//! Session outcome report.

use rust_decimal::Decimal;
use serde::Serialize;
use sigtrade_core::{TradeOutcome, TradeResult};
use std::fmt;

/// Aggregate of one scheduling session.
///
/// `total_profit` sums the pnl of every trade. Timeouts and rejections
/// carry zero pnl of their own; a gale chain's result already holds the
/// pnl of all its attempts.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Report {
    pub trades: Vec<TradeResult>,
    pub wins: usize,
    pub losses: usize,
    pub timeouts: usize,
    pub rejected: usize,
    pub total_profit: Decimal,
}

impl Report {
    pub fn from_results(trades: Vec<TradeResult>) -> Self {
        let mut report = Self::default();
        for trade in &trades {
            match trade.outcome {
                TradeOutcome::Win => report.wins += 1,
                TradeOutcome::Loss => report.losses += 1,
                TradeOutcome::Timeout => report.timeouts += 1,
                TradeOutcome::Rejected(_) => report.rejected += 1,
            }
            report.total_profit += trade.pnl;
        }
        report.trades = trades;
        report
    }

    pub fn len(&self) -> usize {
        self.trades.len()
    }

    pub fn is_empty(&self) -> bool {
        self.trades.is_empty()
    }
}

impl fmt::Display for Report {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for trade in &self.trades {
            writeln!(
                f,
                "{} {} | {} (retries {})",
                trade.asset, trade.direction, trade.outcome, trade.gales
            )?;
        }
        writeln!(f, "Wins: {} | Losses: {}", self.wins, self.losses)?;
        write!(f, "Total Profit: ${:.2}", self.total_profit.round_dp(2))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;
    use sigtrade_core::{Direction, OrderId};

    fn settled(asset: &str, direction: Direction, pnl: Decimal) -> TradeResult {
        TradeResult::settled(asset, direction, dec!(1), OrderId::new(1), pnl)
    }

    #[test]
    fn test_win_and_loss() {
        let report = Report::from_results(vec![
            settled("EURAUD", Direction::Call, dec!(10)),
            settled("GBPUSD", Direction::Put, dec!(-5)),
        ]);
        assert_eq!(report.wins, 1);
        assert_eq!(report.losses, 1);
        assert_eq!(report.total_profit, dec!(5));
        assert_eq!(
            report.to_string(),
            "EURAUD CALL | WIN (retries 0)\n\
             GBPUSD PUT | LOSS (retries 0)\n\
             Wins: 1 | Losses: 1\n\
             Total Profit: $5.00"
        );
    }

    #[test]
    fn test_timeouts_and_rejections_carry_no_profit() {
        let report = Report::from_results(vec![
            TradeResult::timed_out("EURUSD", Direction::Call, dec!(1), None),
            TradeResult::rejected("EURUSD", Direction::Put, dec!(1), "closed"),
            settled("USDJPY", Direction::Put, dec!(-1)),
        ]);
        assert_eq!(report.timeouts, 1);
        assert_eq!(report.rejected, 1);
        assert_eq!(report.wins, 0);
        assert_eq!(report.losses, 1);
        assert!(report.to_string().contains("EURUSD CALL | TIMEOUT (retries 0)"));
        assert!(report.to_string().contains("EURUSD PUT | REJECTED (retries 0)"));
        assert!(report.to_string().ends_with("Total Profit: $-1.00"));
    }

    #[test]
    fn test_empty_report() {
        let report = Report::from_results(Vec::new());
        assert!(report.is_empty());
        assert_eq!(report.to_string(), "Wins: 0 | Losses: 0\nTotal Profit: $0.00");
    }

    #[test]
    fn test_profit_rounds_to_cents() {
        let report = Report::from_results(vec![
            settled("EURAUD", Direction::Call, dec!(0.875)),
            settled("EURAUD", Direction::Call, dec!(0.87)),
        ]);
        assert_eq!(report.len(), 2);
        assert!(report.to_string().ends_with("Total Profit: $1.74"));
    }
}
