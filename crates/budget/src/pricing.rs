// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Static pricing table for `UsageRecord` cost computation (step 4). Unknown `(provider,
//! model)` pairs fall back to a conservative flat per-request cost so a misconfigured or new
//! model never silently records zero spend.

use std::collections::HashMap;

/// USD cost per 1,000 tokens, prompt and completion priced separately.
#[derive(Debug, Clone, Copy)]
struct TokenRate {
    prompt_per_1k: f64,
    completion_per_1k: f64,
}

/// Flat per-request fallback when the model is unrecognized (step 4 "conservative per-request
/// fallback").
const FALLBACK_COST_USD: f64 = 0.01;

pub struct PricingTable {
    rates: HashMap<(&'static str, &'static str), TokenRate>,
}

impl Default for PricingTable {
    fn default() -> Self {
        let mut rates = HashMap::new();
        rates.insert(
            ("anthropic", "claude-sonnet"),
            TokenRate { prompt_per_1k: 0.003, completion_per_1k: 0.015 },
        );
        rates.insert(("anthropic", "claude-haiku"), TokenRate { prompt_per_1k: 0.0008, completion_per_1k: 0.004 });
        rates.insert(("anthropic", "claude-opus"), TokenRate { prompt_per_1k: 0.015, completion_per_1k: 0.075 });
        rates.insert(("openai", "gpt-4o"), TokenRate { prompt_per_1k: 0.0025, completion_per_1k: 0.01 });
        rates.insert(("openai", "gpt-4o-mini"), TokenRate { prompt_per_1k: 0.00015, completion_per_1k: 0.0006 });
        Self { rates }
    }
}

impl PricingTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Cost in USD for the given model and token counts. Falls back to
    /// [`FALLBACK_COST_USD`] flat per-request when the model is
    /// unrecognized (step 4).
    pub fn cost_usd(&self, provider: Option<&str>, model: Option<&str>, prompt_tokens: u64, completion_tokens: u64) -> f64 {
        let Some(rate) = provider.zip(model).and_then(|(p, m)| self.lookup(p, m)) else {
            return FALLBACK_COST_USD;
        };
        (prompt_tokens as f64 / 1000.0) * rate.prompt_per_1k
            + (completion_tokens as f64 / 1000.0) * rate.completion_per_1k
    }

    fn lookup(&self, provider: &str, model: &str) -> Option<TokenRate> {
        self.rates
            .iter()
            .find(|((p, m), _)| p.eq_ignore_ascii_case(provider) && model.eq_ignore_ascii_case(m))
            .map(|(_, rate)| *rate)
    }
}

#[cfg(test)]
#[path = "pricing_tests.rs"]
mod tests;
