use std::cmp::Ordering;
use std::collections::BinaryHeap;

use super::chain::flatten_chain;
use super::config::EngineConfig;
use super::error::EngineError;
use super::models::{ChainResponse, Contract, OptionSide};

/// Ranking score: the negated ratio of mark to days to expiration. The
/// highest-scoring contracts are the ones with the smallest premium per
/// day of holding. Ties rank in unspecified order.
fn score(contract: &Contract) -> f64 {
    -(contract.mark / contract.days_to_expiration as f64)
}

/// Wrapper for `Contract` to use in `BinaryHeap` (max-heap by score).
struct ScoredContract {
    score: f64,
    contract: Contract,
}

impl PartialEq for ScoredContract {
    fn eq(&self, other: &Self) -> bool {
        self.score.total_cmp(&other.score) == Ordering::Equal
    }
}

impl Eq for ScoredContract {}

impl PartialOrd for ScoredContract {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for ScoredContract {
    fn cmp(&self, other: &Self) -> Ordering {
        self.score.total_cmp(&other.score)
    }
}

/// Keep only contracts that fit a PUT-selling strategy: assignment must
/// fit the budget, the strike must sit at or below the underlying, and
/// there must be enough open interest to get out again. Order-preserving.
///
/// A CALL anywhere in the input is an error; the moneyness check would
/// mean the opposite thing for calls, so this refuses rather than return
/// a silently inverted result.
pub fn filter_eligible(
    contracts: Vec<Contract>,
    max_budget: f64,
    reference_price: f64,
    config: &EngineConfig,
) -> Result<Vec<Contract>, EngineError> {
    let mut eligible = Vec::new();

    for contract in contracts {
        if contract.put_call != OptionSide::Put {
            return Err(EngineError::UnsupportedContractType {
                symbol: contract.symbol,
            });
        }

        // Cash needed if the put is assigned.
        let assignment_cost = contract.strike_price * contract.multiplier;
        if assignment_cost > max_budget {
            continue;
        }

        if contract.open_interest < config.min_open_interest {
            continue;
        }

        if contract.strike_price > reference_price {
            continue;
        }

        eligible.push(contract);
    }

    Ok(eligible)
}

/// Select the `k` best-scored contracts, best first.
///
/// Every contract goes through a max-heap keyed on `score`, then the top
/// `min(k, len)` are popped off in descending order. Contracts expiring
/// today (zero days left) have no premium-per-day to score and are
/// skipped outright; they never reach the heap.
pub fn rank_top(contracts: Vec<Contract>, k: usize) -> Vec<Contract> {
    let mut heap = BinaryHeap::with_capacity(contracts.len());

    for contract in contracts {
        if contract.days_to_expiration == 0 {
            continue;
        }
        heap.push(ScoredContract {
            score: score(&contract),
            contract,
        });
    }

    let mut ranked = Vec::with_capacity(k.min(heap.len()));
    while ranked.len() < k {
        match heap.pop() {
            Some(scored) => ranked.push(scored.contract),
            None => break,
        }
    }

    ranked
}

/// Full pipeline: flatten the chain, drop ineligible contracts, rank the
/// rest, return at most `k` suggestions. Stateless; every fault from the
/// parser or filter aborts the whole call unchanged.
pub fn suggest(
    response: &ChainResponse,
    side: OptionSide,
    max_budget: f64,
    reference_price: f64,
    k: usize,
    config: &EngineConfig,
) -> Result<Vec<Contract>, EngineError> {
    let contracts = flatten_chain(response, side, config)?;
    let eligible = filter_eligible(contracts, max_budget, reference_price, config)?;
    Ok(rank_top(eligible, k))
}
