//! Update planning
//!
//! Turns fetched quotes into per-target instructions. Pure: no I/O, no
//! clock, same input gives the same output.

mod types;

pub use types::{UpdateInstruction, UpdatePlan};

use crate::config::{TargetMode, TargetSpec, TargetsConfig, TokenSpec};
use crate::price::{FetchOutcome, PriceQuote};
use rust_decimal::{Decimal, RoundingStrategy};

/// Render the display line for a token, e.g. `🟡 GMT: $0.123 / ¥18.50`
pub fn render_text(token: &TokenSpec, quote: &PriceQuote) -> String {
    format!(
        "{} {}: ${} / ¥{}",
        token.emoji,
        token.symbol,
        fixed(quote.usd, 3),
        fixed(quote.jpy, 2)
    )
}

/// Format with `places` decimals, exact midpoints rounded up
///
/// Works on the exact binary value, so 0.0625 becomes 0.063 while 1.005
/// (stored just below the midpoint) stays 1.00.
fn fixed(value: f64, places: u32) -> String {
    let width = places as usize;
    match Decimal::from_f64_retain(value) {
        Some(exact) => format!(
            "{:.*}",
            width,
            exact.round_dp_with_strategy(places, RoundingStrategy::MidpointAwayFromZero)
        ),
        None => format!("{:.*}", width, value),
    }
}

/// Build the ordered instruction list for one cycle
///
/// A failed fetch yields an empty plan. Tokens missing from a successful
/// fetch are listed in `omitted` and get no instruction.
pub fn plan_updates(
    outcome: &FetchOutcome,
    tokens: &[TokenSpec],
    targets: &TargetsConfig,
) -> UpdatePlan {
    let Some(quotes) = outcome.quotes() else {
        return UpdatePlan::default();
    };

    let mut plan = UpdatePlan::default();

    for (index, token) in tokens.iter().enumerate() {
        let Some(quote) = quotes.get(&token.id) else {
            plan.omitted.push(token.id.clone());
            continue;
        };

        let text = render_text(token, quote);
        for target in resolve_targets(targets.mode, &targets.list, index) {
            plan.instructions.push(UpdateInstruction {
                token_id: token.id.clone(),
                target: target.clone(),
                text: text.clone(),
            });
        }
    }

    plan
}

/// Targets receiving the token at `index`
fn resolve_targets(mode: TargetMode, list: &[TargetSpec], index: usize) -> &[TargetSpec] {
    match mode {
        TargetMode::Broadcast => list,
        // Cardinality is checked at startup
        TargetMode::Paired => list.get(index..=index).unwrap_or(&[]),
    }
}
