//! Property tests for the pricing and liquidity invariants.
//!
//! Increase cases: PROPTEST_CASES=2000 cargo test --test properties

use lotswap::*;
use proptest::prelude::*;

const NOW: Timestamp = 1_000;
const DEADLINE: Timestamp = 2_000;
const MULT: u128 = 995;
/// Upper bound for generated amounts: well past 18-decimal balances.
const HUGE: u128 = 10u128.pow(30);

fn addr(n: u64) -> Address {
    Address::from_low_u64(n)
}

fn ctx(caller: Address) -> CallContext {
    CallContext::new(caller, NOW)
}

/// Pool 0 seeded by `addr(1)` with `tokens` lots against `currency`.
fn seeded(tokens: Amount, currency: Amount) -> Exchange<RecordingLedger> {
    let mut ex = Exchange::new(ExchangeConfig::default(), RecordingLedger::new()).unwrap();
    ex.add_liquidity(&ctx(addr(1)), &[0], &[tokens], &[currency], DEADLINE)
        .unwrap();
    ex
}

fn sell_payload(min_currency: Amount) -> Vec<u8> {
    Instruction::Sell(SellTokens {
        recipient: Address::ZERO,
        min_currency,
        deadline: DEADLINE,
        extra_fee_recipients: vec![],
        extra_fee_amounts: vec![],
    })
    .encode()
    .unwrap()
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(256))]

    // Buying one more lot always costs strictly more while the currency side
    // is at least as deep as the lot side.
    #[test]
    fn buy_price_strictly_increasing(
        reserve_out in 3u128..HUGE,
        extra_in in 0u128..HUGE,
        seed in any::<u64>(),
    ) {
        let reserve_in = reserve_out + extra_in;
        let a = 1 + u128::from(seed) % (reserve_out - 2);
        let p1 = buy_price(a, reserve_in, reserve_out, MULT).unwrap();
        let p2 = buy_price(a + 1, reserve_in, reserve_out, MULT).unwrap();
        prop_assert!(p2 > p1, "buy price not increasing: {} -> {} at a={}", p1, p2, a);
    }

    #[test]
    fn sell_price_non_decreasing_and_bounded(
        reserve_in in 1u128..HUGE,
        reserve_out in 1u128..HUGE,
        a in 1u128..HUGE,
    ) {
        let p1 = sell_price(a, reserve_in, reserve_out, MULT).unwrap();
        let p2 = sell_price(a + 1, reserve_in, reserve_out, MULT).unwrap();
        prop_assert!(p2 >= p1);
        prop_assert!(p2 < reserve_out, "sell drained the pool: {} of {}", p2, reserve_out);
    }

    // Buying lots then selling the same lots straight back never profits.
    #[test]
    fn round_trip_trade_never_profits(
        tokens in 2u128..HUGE,
        currency in 1u128..HUGE,
        seed in any::<u64>(),
    ) {
        let mut ex = seeded(tokens, currency);
        let trader = addr(7);
        let amount = 1 + u128::from(seed) % (tokens - 1);

        // Draining a tiny lot side of a huge pool can cost more than an amount holds.
        let bought = ex.buy_tokens(&ctx(trader), &[0], &[amount], u128::MAX, DEADLINE, Address::ZERO);
        prop_assume!(!matches!(bought, Err(ExchangeError::MathOverflow)));
        let bought = bought.unwrap();
        let sold = ex
            .on_batch_received(&ctx(trader), &Deposit::lots(trader, vec![0], vec![amount]), &sell_payload(0))
            .unwrap();
        prop_assert!(
            sold.total_currency <= bought.total_currency,
            "arbitrage: paid {} got {}", bought.total_currency, sold.total_currency
        );
    }

    // Adding then removing the minted shares returns at most what went in.
    #[test]
    fn add_then_remove_never_gains(
        tokens in 1u128..HUGE,
        currency in 1u128..HUGE,
        added in 1u128..HUGE,
    ) {
        let mut ex = seeded(tokens, currency);
        let provider = addr(2);

        // A deposit can be too small to mint a share, or need more currency
        // than fits in an amount.
        let deposit = ex.add_liquidity(&ctx(provider), &[0], &[added], &[u128::MAX], DEADLINE);
        prop_assume!(!matches!(
            deposit,
            Err(ExchangeError::ZeroSharesMinted { .. }) | Err(ExchangeError::MathOverflow)
        ));
        let deposit = deposit.unwrap();
        let line = deposit.line(0).unwrap().clone();

        let withdrawal = ex
            .remove_liquidity(&ctx(provider), &[0], &[line.shares], &[0], &[0], DEADLINE)
            .unwrap();
        let out = withdrawal.line(0).unwrap();
        prop_assert!(out.currency <= line.currency);
        prop_assert!(out.tokens <= line.tokens);
    }

    // A deeper pool quotes a cheaper buy and a richer sell for the same size.
    // Integer prices keep the deposit free of rounding. The change is strict
    // whenever the exact quotes move by at least one unit.
    #[test]
    fn liquidity_depth_reduces_price_impact(
        tokens in 10u128..1_000_000,
        price in 1u128..1_000_000,
        added in 1u128..1_000_000,
    ) {
        let mut ex = seeded(tokens, tokens * price);
        let size = tokens / 10;
        let buy_before = ex.price_currency_to_token(&[0], &[size]).unwrap()[0];
        let sell_before = ex.price_token_to_currency(&[0], &[size]).unwrap()[0];

        ex.add_liquidity(&ctx(addr(2)), &[0], &[added], &[u128::MAX], DEADLINE).unwrap();

        let buy_after = ex.price_currency_to_token(&[0], &[size]).unwrap()[0];
        let sell_after = ex.price_token_to_currency(&[0], &[size]).unwrap()[0];
        prop_assert!(buy_after <= buy_before, "buy {} -> {}", buy_before, buy_after);
        prop_assert!(sell_after >= sell_before, "sell {} -> {}", sell_before, sell_after);

        let deeper = tokens + added;
        // exact buy drop: s²·p·1000·added / (995·(T-s)·(T'-s))
        let buy_drop_num = size * size * price * 1_000 * added;
        let buy_drop_den = MULT * (tokens - size) * (deeper - size);
        if buy_drop_num >= buy_drop_den {
            prop_assert!(buy_after < buy_before, "buy stuck at {}", buy_after);
        }
        // exact sell rise: 995²·s²·p·added / ((1000T'+995s)(1000T+995s))
        let sell_rise_num = MULT * MULT * size * size * price * added;
        let sell_rise_den = (1_000 * deeper + MULT * size) * (1_000 * tokens + MULT * size);
        if sell_rise_num >= sell_rise_den {
            prop_assert!(sell_after > sell_before, "sell stuck at {}", sell_after);
        }
    }

    #[test]
    fn unsorted_or_duplicate_ids_fail_without_mutation(
        ids in prop::collection::vec(0u64..8, 2..6),
    ) {
        prop_assume!(ids.windows(2).any(|w| w[0] >= w[1]));
        let mut ex = seeded(100, 1_000);
        let before = ex.state().clone();
        let amounts = vec![1; ids.len()];

        let err = ex
            .on_batch_received(&ctx(addr(7)), &Deposit::lots(addr(7), ids, amounts), &sell_payload(0))
            .unwrap_err();
        prop_assert_eq!(err, ExchangeError::UnsortedOrDuplicateIds);
        prop_assert_eq!(ex.state(), &before);
    }

    // Whatever a sell does, it either fully applies or leaves no trace.
    #[test]
    fn failed_sell_leaves_state_untouched(
        tokens in 1u128..HUGE,
        currency in 1u128..HUGE,
        amount in 0u128..HUGE,
        min_currency in 0u128..HUGE,
    ) {
        let mut ex = seeded(tokens, currency);
        let before = ex.state().clone();
        let trader = addr(7);

        let result = ex.on_batch_received(
            &ctx(trader),
            &Deposit::lots(trader, vec![0], vec![amount]),
            &sell_payload(min_currency),
        );
        match result {
            Ok(s) => {
                prop_assert!(s.total_currency >= min_currency);
                prop_assert_eq!(ex.pool(0).token_reserve, tokens + amount);
            }
            Err(_) => {
                prop_assert_eq!(ex.state(), &before);
            }
        }
    }

    // Shares held across all owners always sum to the pool's supply.
    #[test]
    fn share_balances_sum_to_total_supply(
        deposits in prop::collection::vec((2u64..6, 1u128..1_000), 1..8),
        moved in 0u128..2_000,
    ) {
        let mut ex = seeded(500, 50_000);
        for (owner, tokens) in &deposits {
            let _ = ex.add_liquidity(&ctx(addr(*owner)), &[0], &[*tokens], &[u128::MAX], DEADLINE);
        }
        let _ = ex.transfer_shares(&ctx(addr(1)), addr(3), &[0], &[moved]);

        let owners: Vec<Address> = (1..6).map(addr).collect();
        let held: Amount = owners.iter().map(|o| ex.balance_of(o, 0)).sum();
        prop_assert_eq!(held, ex.total_supplies(&[0])[0]);
    }
}
