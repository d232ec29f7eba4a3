//! Account and position snapshots.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::enums::Direction;

/// Raw funds fields reported by the exchange for an account query.
///
/// Only used to derive an [`AccountSnapshot`]; consumers never see the raw
/// shape.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AccountFunds {
    /// Account ID.
    pub account_id: String,
    /// Balance carried in from the previous settlement.
    pub pre_balance: Decimal,
    /// Credit carried in from the previous settlement.
    pub pre_credit: Decimal,
    /// Mortgage carried in from the previous settlement.
    pub pre_mortgage: Decimal,
    /// Mortgage posted today.
    pub mortgage: Decimal,
    /// Withdrawn today.
    pub withdraw: Decimal,
    /// Deposited today.
    pub deposit: Decimal,
    /// Realized close profit.
    pub close_profit: Decimal,
    /// Mark-to-market position profit.
    pub position_profit: Decimal,
    /// Cash in.
    pub cash_in: Decimal,
    /// Commission charged.
    pub commission: Decimal,
    /// Funds currently available.
    pub available: Decimal,
    /// Margin currently in use.
    pub curr_margin: Decimal,
}

/// Account funds snapshot delivered to consumers.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccountSnapshot {
    /// Account ID.
    pub account_id: String,
    /// Balance carried in from the previous settlement.
    pub pre_balance: Decimal,
    /// Funds currently available.
    pub available: Decimal,
    /// Commission charged.
    pub commission: Decimal,
    /// Margin currently in use.
    pub margin: Decimal,
    /// Realized close profit.
    pub close_profit: Decimal,
    /// Mark-to-market position profit.
    pub position_profit: Decimal,
    /// Current balance, derived from the raw funds fields.
    pub balance: Decimal,
}

impl AccountSnapshot {
    /// Derive the consumer snapshot from raw funds fields.
    ///
    /// Balance = pre_balance − pre_credit − pre_mortgage + mortgage
    /// − withdraw + deposit + close_profit + position_profit + cash_in
    /// − commission.
    #[must_use]
    pub fn from_funds(funds: AccountFunds) -> Self {
        let balance = funds.pre_balance - funds.pre_credit - funds.pre_mortgage + funds.mortgage
            - funds.withdraw
            + funds.deposit
            + funds.close_profit
            + funds.position_profit
            + funds.cash_in
            - funds.commission;
        Self {
            account_id: funds.account_id,
            pre_balance: funds.pre_balance,
            available: funds.available,
            commission: funds.commission,
            margin: funds.curr_margin,
            close_profit: funds.close_profit,
            position_profit: funds.position_profit,
            balance,
        }
    }
}

/// One position record for an instrument and direction.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PositionRecord {
    /// Instrument symbol.
    pub symbol: String,
    /// Position direction.
    pub direction: Direction,
    /// Total position volume.
    pub position: i32,
    /// Volume carried from previous days.
    pub yd_position: i32,
    /// Volume opened today.
    pub today_position: i32,
    /// Position cost.
    pub position_cost: Decimal,
    /// Mark-to-market position profit.
    pub position_profit: Decimal,
    /// Volume frozen by working close orders.
    pub frozen: i32,
    /// Trade date of the position (`YYYYMMDD`).
    pub trade_date: String,
}
