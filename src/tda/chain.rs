use super::config::{EngineConfig, STATUS_SUCCESS};
use super::error::EngineError;
use super::models::{ChainResponse, Contract, OptionSide, RawContract};

/// Flatten one side of the chain response into normalized contracts.
///
/// The payload nests contracts two maps deep (expiration, then strike),
/// with each strike holding a single-element list. This walks the selected
/// side and produces a flat, owned list; nothing downstream keeps
/// references into the raw response. Output order follows map traversal
/// and is not stable between calls.
pub fn flatten_chain(
    response: &ChainResponse,
    side: OptionSide,
    config: &EngineConfig,
) -> Result<Vec<Contract>, EngineError> {
    if response.status != STATUS_SUCCESS {
        return Err(EngineError::InvalidResponseStatus {
            status: response.status.clone(),
        });
    }

    let date_map = match side {
        OptionSide::Put => &response.put_exp_date_map,
        OptionSide::Call => &response.call_exp_date_map,
    };

    // The declared contract count is only a sizing hint; the maps are
    // authoritative and the two may disagree.
    let mut contracts = Vec::with_capacity(response.number_of_contracts);

    for (expiration_key, by_strike) in date_map {
        // Expiration keys look like "2026-01-16:7", date plus a redundant
        // days-to-expiration. Only the date survives; the per-contract
        // daysToExpiration field is authoritative.
        let expiration = expiration_key
            .split_once(':')
            .map_or(expiration_key.as_str(), |(date, _)| date);

        for (strike, entries) in by_strike {
            let raw = match entries.as_slice() {
                [only] => only,
                other => {
                    return Err(EngineError::MalformedChainEntry {
                        expiration: expiration.to_string(),
                        strike: strike.clone(),
                        count: other.len(),
                    });
                }
            };

            contracts.push(normalize(raw, expiration, config));
        }
    }

    Ok(contracts)
}

fn normalize(raw: &RawContract, expiration: &str, config: &EngineConfig) -> Contract {
    Contract {
        symbol: raw.symbol.clone(),
        put_call: raw.put_call,
        strike_price: raw.strike_price,
        expiration: expiration.to_string(),
        bid: raw.bid,
        bid_size: raw.bid_size,
        ask: raw.ask,
        ask_size: raw.ask_size,
        mark: raw.mark,
        multiplier: raw.multiplier.unwrap_or(config.default_multiplier),
        open_interest: raw.open_interest,
        days_to_expiration: raw.days_to_expiration,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tda::models::ExpirationMap;
    use std::collections::{HashMap, HashSet};

    fn raw_contract(symbol: &str, strike: f64, days: u32) -> RawContract {
        RawContract {
            symbol: symbol.to_string(),
            put_call: OptionSide::Put,
            bid: 0.9,
            bid_size: 5,
            ask: 1.1,
            ask_size: 7,
            mark: 1.0,
            open_interest: 100,
            strike_price: strike,
            days_to_expiration: days,
            multiplier: Some(100.0),
        }
    }

    fn chain(put_map: ExpirationMap, declared: usize) -> ChainResponse {
        ChainResponse {
            symbol: "MSFT".to_string(),
            status: STATUS_SUCCESS.to_string(),
            underlying_price: 300.0,
            number_of_contracts: declared,
            put_exp_date_map: put_map,
            call_exp_date_map: HashMap::new(),
        }
    }

    fn put_map(entries: &[(&str, &str, Vec<RawContract>)]) -> ExpirationMap {
        let mut map: ExpirationMap = HashMap::new();
        for (expiration, strike, contracts) in entries {
            map.entry(expiration.to_string())
                .or_default()
                .insert(strike.to_string(), contracts.clone());
        }
        map
    }

    #[test]
    fn test_flattens_every_expiration_strike_pair() {
        let map = put_map(&[
            ("2026-01-16:7", "290.0", vec![raw_contract("P290A", 290.0, 7)]),
            ("2026-01-16:7", "295.0", vec![raw_contract("P295A", 295.0, 7)]),
            ("2026-02-20:42", "290.0", vec![raw_contract("P290B", 290.0, 42)]),
            ("2026-02-20:42", "295.0", vec![raw_contract("P295B", 295.0, 42)]),
        ]);

        let contracts = flatten_chain(&chain(map, 4), OptionSide::Put, &EngineConfig::default())
            .unwrap();

        assert_eq!(contracts.len(), 4);
        let pairs: HashSet<(String, u64)> = contracts
            .iter()
            .map(|c| (c.expiration.clone(), c.strike_price.to_bits()))
            .collect();
        assert_eq!(pairs.len(), 4);
    }

    #[test]
    fn test_expiration_key_drops_days_suffix() {
        let map = put_map(&[("2026-01-16:7", "290.0", vec![raw_contract("P", 290.0, 7)])]);
        let contracts = flatten_chain(&chain(map, 1), OptionSide::Put, &EngineConfig::default())
            .unwrap();
        assert_eq!(contracts[0].expiration, "2026-01-16");
    }

    #[test]
    fn test_expiration_key_without_colon_used_whole() {
        let map = put_map(&[("2026-01-16", "290.0", vec![raw_contract("P", 290.0, 7)])]);
        let contracts = flatten_chain(&chain(map, 1), OptionSide::Put, &EngineConfig::default())
            .unwrap();
        assert_eq!(contracts[0].expiration, "2026-01-16");
    }

    #[test]
    fn test_rejects_non_success_status() {
        let mut response = chain(HashMap::new(), 0);
        response.status = "FAILED".to_string();

        let err = flatten_chain(&response, OptionSide::Put, &EngineConfig::default())
            .unwrap_err();
        assert!(matches!(err, EngineError::InvalidResponseStatus { status } if status == "FAILED"));
    }

    #[test]
    fn test_rejects_empty_strike_entry() {
        let map = put_map(&[("2026-01-16:7", "290.0", vec![])]);

        let err = flatten_chain(&chain(map, 1), OptionSide::Put, &EngineConfig::default())
            .unwrap_err();
        assert!(matches!(err, EngineError::MalformedChainEntry { count: 0, .. }));
    }

    #[test]
    fn test_rejects_duplicate_strike_entries() {
        let map = put_map(&[(
            "2026-01-16:7",
            "290.0",
            vec![raw_contract("P1", 290.0, 7), raw_contract("P2", 290.0, 7)],
        )]);

        let err = flatten_chain(&chain(map, 2), OptionSide::Put, &EngineConfig::default())
            .unwrap_err();
        assert!(matches!(err, EngineError::MalformedChainEntry { count: 2, .. }));
    }

    #[test]
    fn test_missing_multiplier_gets_configured_default() {
        let mut raw = raw_contract("P", 290.0, 7);
        raw.multiplier = None;
        let map = put_map(&[("2026-01-16:7", "290.0", vec![raw])]);

        let contracts = flatten_chain(&chain(map, 1), OptionSide::Put, &EngineConfig::default())
            .unwrap();
        assert_eq!(contracts[0].multiplier, 100.0);

        let mut raw = raw_contract("P", 290.0, 7);
        raw.multiplier = None;
        let map = put_map(&[("2026-01-16:7", "290.0", vec![raw])]);
        let config = EngineConfig {
            default_multiplier: 10.0,
            ..EngineConfig::default()
        };
        let contracts = flatten_chain(&chain(map, 1), OptionSide::Put, &config).unwrap();
        assert_eq!(contracts[0].multiplier, 10.0);
    }

    #[test]
    fn test_tolerates_declared_count_mismatch() {
        let map = put_map(&[("2026-01-16:7", "290.0", vec![raw_contract("P", 290.0, 7)])]);

        // Envelope claims far more contracts than the maps hold.
        let contracts = flatten_chain(&chain(map, 99), OptionSide::Put, &EngineConfig::default())
            .unwrap();
        assert_eq!(contracts.len(), 1);
    }

    #[test]
    fn test_side_selects_matching_map() {
        let map = put_map(&[("2026-01-16:7", "290.0", vec![raw_contract("P", 290.0, 7)])]);
        let response = chain(map, 1);

        // The call side of this response is empty.
        let calls = flatten_chain(&response, OptionSide::Call, &EngineConfig::default())
            .unwrap();
        assert!(calls.is_empty());
    }
}
