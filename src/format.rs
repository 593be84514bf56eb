use alloy::primitives::U256;
use std::fmt;
use thiserror::Error;

/// Display-domain failures: values the contract should never hand us.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum FormatError {
    #[error("unknown lottery state code {0}")]
    UnknownState(u8),
    #[error("entry cost overflows the wei domain")]
    CostOverflow,
}

/// Contract-tracked lifecycle state of one lottery round.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum LotteryPhase {
    #[default]
    Closed,
    Opened,
    Processing,
}

impl TryFrom<u8> for LotteryPhase {
    type Error = FormatError;

    fn try_from(code: u8) -> Result<Self, FormatError> {
        match code {
            0 => Ok(LotteryPhase::Closed),
            1 => Ok(LotteryPhase::Opened),
            2 => Ok(LotteryPhase::Processing),
            other => Err(FormatError::UnknownState(other)),
        }
    }
}

impl fmt::Display for LotteryPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            LotteryPhase::Closed => "Closed",
            LotteryPhase::Opened => "Opened",
            LotteryPhase::Processing => "Processing",
        };
        write!(f, "{label}")
    }
}

pub fn state_label(code: u8) -> Result<&'static str, FormatError> {
    Ok(match LotteryPhase::try_from(code)? {
        LotteryPhase::Closed => "Closed",
        LotteryPhase::Opened => "Opened",
        LotteryPhase::Processing => "Processing",
    })
}

/// Renders a long value as `XXXXX...XXXX` (first 5 and last 4 characters).
/// Only meaningful for inputs of at least 9 characters; shorter inputs still
/// return without panicking but the head and tail overlap (pinned by test).
pub fn shorten_value(value: &str) -> String {
    let head: String = value.chars().take(5).collect();
    let tail_rev: Vec<char> = value.chars().rev().take(4).collect();
    let tail: String = tail_rev.into_iter().rev().collect();
    format!("{head}...{tail}")
}

/// Seconds left until `deadline`, zero once it has passed.
pub fn remaining_seconds(deadline: u64, now: u64) -> u64 {
    deadline.saturating_sub(now)
}

/// Zero-padded `HH:MM:SS`, clamped at `00:00:00` past the deadline.
pub fn render_countdown(deadline: u64, now: u64) -> String {
    let left = remaining_seconds(deadline, now);
    format!("{:02}:{:02}:{:02}", left / 3600, (left % 3600) / 60, left % 60)
}

/// Total cost of `count` entries at `fee_wei` per entry, exact in wei.
pub fn entry_cost(count: u64, fee_wei: U256) -> Result<U256, FormatError> {
    fee_wei
        .checked_mul(U256::from(count))
        .ok_or(FormatError::CostOverflow)
}

// 0.0001 ether, the display granularity the front end uses for balances.
const DISPLAY_UNIT_WEI: u64 = 100_000_000_000_000;

/// Wei rendered as ether with four decimal places, rounded half-up.
pub fn format_ether_short(wei: U256) -> String {
    let unit = U256::from(DISPLAY_UNIT_WEI);
    let rounded = (wei + unit / U256::from(2u8)) / unit;
    let whole = rounded / U256::from(10_000u64);
    let frac: u64 = (rounded % U256::from(10_000u64)).to();
    format!("{whole}.{frac:04}")
}

#[cfg(test)]
mod tests {
    #![allow(non_snake_case)]
    use super::*;
    use alloy::primitives::utils::parse_ether;
    use proptest::prelude::*;

    #[test]
    fn state_label__maps_the_three_contract_states() {
        assert_eq!(state_label(0), Ok("Closed"));
        assert_eq!(state_label(1), Ok("Opened"));
        assert_eq!(state_label(2), Ok("Processing"));
    }

    #[test]
    fn state_label__out_of_range_code_is_an_error_not_a_panic() {
        assert_eq!(state_label(3), Err(FormatError::UnknownState(3)));
        assert_eq!(state_label(255), Err(FormatError::UnknownState(255)));
    }

    #[test]
    fn shorten_value__address_keeps_first_five_and_last_four() {
        // given a 42-character hex address
        let address = "0x5FbDB2315678afecb367f032d93F642f64180aa3";

        // when
        let short = shorten_value(address);

        // then
        assert_eq!(short, "0x5Fb...0aa3");
        assert_eq!(short.len(), 12);
    }

    #[test]
    fn shorten_value__inputs_shorter_than_nine_chars_overlap_but_do_not_panic() {
        // Known edge case: below 9 characters the head and tail overlap.
        assert_eq!(shorten_value("0x1234"), "0x123...1234");
        assert_eq!(shorten_value(""), "...");
    }

    #[test]
    fn render_countdown__one_hour_one_minute_one_second() {
        let now = 1_700_000_000;

        assert_eq!(render_countdown(now + 3661, now), "01:01:01");
    }

    #[test]
    fn render_countdown__clamps_to_zero_after_the_deadline() {
        let now = 1_700_000_000;

        assert_eq!(render_countdown(now, now), "00:00:00");
        assert_eq!(render_countdown(now - 1, now), "00:00:00");
        assert_eq!(render_countdown(now - 86_400, now), "00:00:00");
    }

    #[test]
    fn entry_cost__three_entries_at_one_hundredth_ether_is_exact() {
        // given
        let fee = parse_ether("0.01").unwrap();

        // when
        let cost = entry_cost(3, fee).unwrap();

        // then: exactly 0.03 ether in wei, no rounding drift
        assert_eq!(cost, parse_ether("0.03").unwrap());
    }

    #[test]
    fn entry_cost__overflow_is_reported_not_wrapped() {
        let err = entry_cost(u64::MAX, U256::MAX).unwrap_err();

        assert_eq!(err, FormatError::CostOverflow);
    }

    #[test]
    fn format_ether_short__rounds_half_up_to_four_decimals() {
        assert_eq!(format_ether_short(parse_ether("1").unwrap()), "1.0000");
        assert_eq!(format_ether_short(parse_ether("0.01").unwrap()), "0.0100");
        assert_eq!(format_ether_short(parse_ether("0.12345").unwrap()), "0.1235");
        assert_eq!(format_ether_short(U256::ZERO), "0.0000");
    }

    proptest! {
        #[test]
        fn render_countdown__always_eight_chars_and_never_negative(
            deadline in 0u64..=2_000_000_000,
            now in 0u64..=2_000_000_000,
        ) {
            let rendered = render_countdown(deadline, now);
            prop_assert!(rendered.len() >= 8);
            prop_assert!(!rendered.contains('-'));
            if now >= deadline {
                prop_assert_eq!(rendered, "00:00:00");
            }
        }

        #[test]
        fn render_countdown__monotonically_non_increasing_as_time_passes(
            deadline in 0u64..=2_000_000_000,
            now in 0u64..=2_000_000_000,
            step in 0u64..=10_000,
        ) {
            let before = remaining_seconds(deadline, now);
            let after = remaining_seconds(deadline, now.saturating_add(step));
            prop_assert!(after <= before);
        }

        #[test]
        fn shorten_value__long_inputs_preserve_head_and_tail(s in "[0-9a-zA-Z]{9,64}") {
            let short = shorten_value(&s);
            prop_assert!(short.starts_with(&s[..5]));
            prop_assert!(short.ends_with(&s[s.len() - 4..]));
            prop_assert_eq!(short.len(), 12);
        }
    }
}
