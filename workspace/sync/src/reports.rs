//! Insight reports computed over the normalized transaction views.
//!
//! All three reports run over the same view set the listing endpoints serve:
//! amounts are absolute and "spent" means `!is_received`.

use std::collections::BTreeMap;

use common::{AccountBreakdown, CategoryBreakdown, SpendingStatistics, TransactionView};
use rust_decimal::Decimal;
use rust_decimal::prelude::ToPrimitive;

/// Account label for transactions whose account has no display name.
const UNNAMED_ACCOUNT: &str = "Unnamed account";

fn percent_of(part: Decimal, total: Decimal) -> i64 {
    if total.is_zero() {
        return 0;
    }
    ((part / total) * Decimal::from(100))
        .round()
        .to_i64()
        .unwrap_or(0)
}

/// Sum of spent amounts per category, with each category's share of the
/// total in whole percents. Categories come out in stable (sorted) order.
pub fn category_breakdown(transactions: &[TransactionView]) -> CategoryBreakdown {
    let mut total_spent = Decimal::ZERO;
    let mut per_category: BTreeMap<&str, Decimal> = BTreeMap::new();

    for txn in transactions.iter().filter(|t| !t.is_received) {
        total_spent += txn.amount;
        *per_category.entry(txn.category.as_str()).or_default() += txn.amount;
    }

    let categories: Vec<String> = per_category.keys().map(|c| c.to_string()).collect();
    let amounts: Vec<Decimal> = per_category.values().copied().collect();
    let percentages: Vec<i64> = amounts
        .iter()
        .map(|amount| percent_of(*amount, total_spent))
        .collect();

    CategoryBreakdown {
        categories,
        amounts,
        percentages,
        total_spent,
    }
}

/// Transaction count per account name, with each account's share of the
/// total transaction count in whole percents.
pub fn account_breakdown(transactions: &[TransactionView]) -> AccountBreakdown {
    let total_transactions = transactions.len() as u64;
    let mut per_account: BTreeMap<&str, u64> = BTreeMap::new();

    for txn in transactions {
        let name = txn.account_name.as_deref().unwrap_or(UNNAMED_ACCOUNT);
        *per_account.entry(name).or_default() += 1;
    }

    let accounts: Vec<String> = per_account.keys().map(|a| a.to_string()).collect();
    let transaction_counts: Vec<u64> = per_account.values().copied().collect();
    let percentages: Vec<i64> = transaction_counts
        .iter()
        .map(|count| percent_of(Decimal::from(*count), Decimal::from(total_transactions)))
        .collect();

    AccountBreakdown {
        accounts,
        transaction_counts,
        percentages,
        total_transactions,
    }
}

/// Single highest received and spent transactions plus the overall count.
pub fn spending_statistics(transactions: &[TransactionView]) -> SpendingStatistics {
    let highest = |received: bool| {
        transactions
            .iter()
            .filter(|t| t.is_received == received)
            .max_by(|a, b| a.amount.cmp(&b.amount).then(a.id.cmp(&b.id)))
            .cloned()
    };

    SpendingStatistics {
        highest_received_transaction: highest(true),
        highest_spent_transaction: highest(false),
        transaction_count: transactions.len() as u64,
    }
}
