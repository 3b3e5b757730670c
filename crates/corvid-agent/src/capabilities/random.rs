//! Randomness capabilities: number generation and dice rolling.

use std::sync::Arc;

use anyhow::{anyhow, bail};
use async_trait::async_trait;
use rand::Rng;
use regex::Regex;
use serde_json::{json, Value};

use corvid_core::session::SessionContext;
use corvid_core::types::{ArgMap, Descriptor, ParamSpec, ParamType};

use crate::capability::{arg_i64, require_str, Capability};
use crate::registry::CapabilityRegistry;

const MAX_COUNT: i64 = 100;
const MAX_DICE: u32 = 100;
const MAX_SIDES: u32 = 1000;

// ─────────────────────────────────────────────
// random_number
// ─────────────────────────────────────────────

struct RandomNumber;

#[async_trait]
impl Capability for RandomNumber {
    async fn invoke(&self, args: ArgMap, _ctx: Option<&SessionContext>) -> anyhow::Result<Value> {
        let min = arg_i64(&args, "min_value").unwrap_or(1);
        let max = arg_i64(&args, "max_value").unwrap_or(100);
        let count = arg_i64(&args, "count").unwrap_or(1).clamp(1, MAX_COUNT) as usize;

        if min > max {
            bail!("min_value must be <= max_value");
        }

        let mut rng = rand::thread_rng();
        let numbers: Vec<i64> = (0..count).map(|_| rng.gen_range(min..=max)).collect();

        Ok(json!({
            "numbers": if count == 1 { json!(numbers[0]) } else { json!(numbers) },
            "range": format!("{min}-{max}"),
            "count": count,
        }))
    }
}

// ─────────────────────────────────────────────
// roll_dice
// ─────────────────────────────────────────────

struct RollDice {
    // XdY with an optional +Z/-Z modifier
    notation: Regex,
}

impl RollDice {
    fn new() -> Self {
        Self {
            // Anchored both ends; input is trimmed before matching.
            notation: Regex::new(r"^(\d+)?d(\d+)([+-]\d+)?$")
                .expect("invalid dice notation pattern"),
        }
    }
}

#[async_trait]
impl Capability for RollDice {
    async fn invoke(&self, args: ArgMap, _ctx: Option<&SessionContext>) -> anyhow::Result<Value> {
        let notation = require_str(&args, "notation")?.trim().to_lowercase();
        if notation.is_empty() {
            bail!("Dice notation is required");
        }

        let caps = self
            .notation
            .captures(&notation)
            .ok_or_else(|| anyhow!("Invalid dice notation: {notation}"))?;

        let num_dice: u32 = match caps.get(1) {
            Some(m) => m.as_str().parse()?,
            None => 1,
        };
        let die_sides: u32 = caps[2].parse()?;
        let modifier: i64 = match caps.get(3) {
            Some(m) => m.as_str().parse()?,
            None => 0,
        };

        if num_dice == 0 || num_dice > MAX_DICE {
            bail!("Between 1 and {MAX_DICE} dice allowed");
        }
        if die_sides == 0 || die_sides > MAX_SIDES {
            bail!("Dice must have between 1 and {MAX_SIDES} sides");
        }

        let mut rng = rand::thread_rng();
        let rolls: Vec<u32> = (0..num_dice)
            .map(|_| rng.gen_range(1..=die_sides))
            .collect();
        let total = rolls.iter().map(|r| *r as i64).sum::<i64>() + modifier;

        Ok(json!({
            "notation": notation,
            "rolls": rolls,
            "modifier": modifier,
            "total": total,
        }))
    }
}

pub fn register(registry: &mut CapabilityRegistry) {
    registry.register(
        Descriptor::new(
            "random_number",
            "Generate a random number within a specified range.",
        )
        .category("utility")
        .param(
            ParamSpec::optional("min_value", "Minimum value (inclusive)", ParamType::Integer)
                .with_default(json!(1)),
        )
        .param(
            ParamSpec::optional("max_value", "Maximum value (inclusive)", ParamType::Integer)
                .with_default(json!(100)),
        )
        .param(
            ParamSpec::optional(
                "count",
                "Number of random numbers to generate",
                ParamType::Integer,
            )
            .with_default(json!(1)),
        ),
        Arc::new(RandomNumber),
    );

    registry.register(
        Descriptor::new(
            "roll_dice",
            "Roll dice using standard notation (e.g., '2d6', '1d20+5').",
        )
        .category("utility")
        .param(ParamSpec::required(
            "notation",
            "Dice notation (e.g., '2d6', '1d20+5', '3d6')",
            ParamType::Text,
        )),
        Arc::new(RollDice::new()),
    );
}

// ─────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    fn num_args(pairs: &[(&str, i64)]) -> ArgMap {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), json!(v)))
            .collect()
    }

    fn dice_args(notation: &str) -> ArgMap {
        let mut map = ArgMap::new();
        map.insert("notation".into(), json!(notation));
        map
    }

    #[tokio::test]
    async fn test_random_number_in_range() {
        let args = num_args(&[("min_value", 5), ("max_value", 10)]);
        let out = RandomNumber.invoke(args, None).await.unwrap();
        let n = out["numbers"].as_i64().unwrap();
        assert!((5..=10).contains(&n));
        assert_eq!(out["range"], "5-10");
    }

    #[tokio::test]
    async fn test_random_number_count_returns_list() {
        let args = num_args(&[("min_value", 1), ("max_value", 6), ("count", 4)]);
        let out = RandomNumber.invoke(args, None).await.unwrap();
        assert_eq!(out["numbers"].as_array().unwrap().len(), 4);
    }

    #[tokio::test]
    async fn test_random_number_count_capped() {
        let args = num_args(&[("count", 500)]);
        let out = RandomNumber.invoke(args, None).await.unwrap();
        assert_eq!(out["count"], 100);
    }

    #[tokio::test]
    async fn test_random_number_inverted_range_fails() {
        let args = num_args(&[("min_value", 10), ("max_value", 5)]);
        let err = RandomNumber.invoke(args, None).await.unwrap_err();
        assert!(err.to_string().contains("min_value must be <= max_value"));
    }

    #[tokio::test]
    async fn test_roll_dice_basic() {
        let out = RollDice::new().invoke(dice_args("2d6"), None).await.unwrap();
        let rolls = out["rolls"].as_array().unwrap();
        assert_eq!(rolls.len(), 2);
        for roll in rolls {
            assert!((1..=6).contains(&roll.as_i64().unwrap()));
        }
        let total = out["total"].as_i64().unwrap();
        assert!((2..=12).contains(&total));
    }

    #[tokio::test]
    async fn test_roll_dice_with_modifier() {
        let out = RollDice::new()
            .invoke(dice_args("1d1+5"), None)
            .await
            .unwrap();
        assert_eq!(out["modifier"], 5);
        assert_eq!(out["total"], 6);
    }

    #[tokio::test]
    async fn test_roll_dice_implicit_single_die() {
        let out = RollDice::new().invoke(dice_args("d20"), None).await.unwrap();
        assert_eq!(out["rolls"].as_array().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_roll_dice_rejects_garbage() {
        assert!(RollDice::new()
            .invoke(dice_args("banana"), None)
            .await
            .is_err());
    }

    #[tokio::test]
    async fn test_roll_dice_rejects_trailing_garbage() {
        let dice = RollDice::new();
        assert!(dice.invoke(dice_args("2d6 bananas"), None).await.is_err());
        assert!(dice.invoke(dice_args("2d6+1x"), None).await.is_err());
        // Surrounding whitespace alone is still fine
        assert!(dice.invoke(dice_args("  2d6  "), None).await.is_ok());
    }

    #[tokio::test]
    async fn test_roll_dice_bounds() {
        let dice = RollDice::new();
        assert!(dice.invoke(dice_args("101d6"), None).await.is_err());
        assert!(dice.invoke(dice_args("1d1001"), None).await.is_err());
        assert!(dice.invoke(dice_args("1d0"), None).await.is_err());
    }
}
