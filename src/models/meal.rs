// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Meal records and the food items they contain.
//!
//! Calories and macro grams are summed on a 0.1 grid so that totals do not
//! depend on the order in which items or records are added. Anything finer
//! than 0.1 kcal or 0.1 g is rounded to the nearest tenth, so a food with
//! 0.04 g of fiber contributes nothing to the totals.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::iter::Sum;
use std::ops::Add;
use std::str::FromStr;
#[cfg(feature = "binding-generation")]
use ts_rs::TS;

/// Upper bound on the calories of a single food item.
pub const MAX_FOOD_CALORIES: f64 = 100_000.0;

/// Upper bound on any single macro value of a food item, in grams.
pub const MAX_MACRO_GRAMS: f64 = 10_000.0;

/// Convert a quantity to integer tenths.
pub(crate) fn to_tenths(value: f64) -> i64 {
    (value * 10.0).round() as i64
}

/// Convert integer tenths back to a quantity.
pub(crate) fn from_tenths(tenths: i64) -> f64 {
    tenths as f64 / 10.0
}

/// Add integer tenths, saturating at `i64::MAX` instead of overflowing.
pub(crate) fn add_tenths<I: IntoIterator<Item = i64>>(values: I) -> i64 {
    values.into_iter().fold(0, i64::saturating_add)
}

/// Sum quantities on the 0.1 grid.
pub(crate) fn sum_tenths<I: IntoIterator<Item = f64>>(values: I) -> f64 {
    from_tenths(add_tenths(values.into_iter().map(to_tenths)))
}

/// Round to one decimal place, half-up.
pub fn round1(value: f64) -> f64 {
    (value * 10.0 + 0.5).floor() / 10.0
}

/// Macro-nutrient content in grams.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct Macros {
    #[serde(default)]
    pub protein: f64,
    #[serde(default)]
    pub fat: f64,
    #[serde(default)]
    pub carbs: f64,
    #[serde(default)]
    pub fiber: f64,
}

impl Macros {
    pub const ZERO: Macros = Macros {
        protein: 0.0,
        fat: 0.0,
        carbs: 0.0,
        fiber: 0.0,
    };

    pub fn new(protein: f64, fat: f64, carbs: f64, fiber: f64) -> Self {
        Self {
            protein,
            fat,
            carbs,
            fiber,
        }
    }

    /// Divide every field by `divisor`, rounding to one decimal.
    /// A zero divisor yields all zeros.
    pub fn average_over(&self, divisor: u32) -> Self {
        if divisor == 0 {
            return Self::ZERO;
        }
        let d = divisor as f64;
        Self {
            protein: round1(self.protein / d),
            fat: round1(self.fat / d),
            carbs: round1(self.carbs / d),
            fiber: round1(self.fiber / d),
        }
    }

    fn values(&self) -> [f64; 4] {
        [self.protein, self.fat, self.carbs, self.fiber]
    }

    pub(crate) fn is_valid(&self) -> bool {
        self.values()
            .iter()
            .all(|v| v.is_finite() && (0.0..=MAX_MACRO_GRAMS).contains(v))
    }
}

impl Add for Macros {
    type Output = Macros;

    fn add(self, rhs: Macros) -> Macros {
        [self, rhs].iter().sum()
    }
}

/// Running macro totals in integer tenths.
#[derive(Default)]
struct MacroTenths([i64; 4]);

impl MacroTenths {
    fn add(&mut self, m: &Macros) {
        for (slot, value) in self.0.iter_mut().zip(m.values()) {
            *slot = slot.saturating_add(to_tenths(value));
        }
    }

    fn finish(self) -> Macros {
        Macros {
            protein: from_tenths(self.0[0]),
            fat: from_tenths(self.0[1]),
            carbs: from_tenths(self.0[2]),
            fiber: from_tenths(self.0[3]),
        }
    }
}

impl<'a> Sum<&'a Macros> for Macros {
    fn sum<I: Iterator<Item = &'a Macros>>(iter: I) -> Macros {
        let mut acc = MacroTenths::default();
        iter.for_each(|m| acc.add(m));
        acc.finish()
    }
}

impl Sum for Macros {
    fn sum<I: Iterator<Item = Macros>>(iter: I) -> Macros {
        let mut acc = MacroTenths::default();
        iter.for_each(|m| acc.add(&m));
        acc.finish()
    }
}

/// A single recognized or manually entered food.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FoodItem {
    pub name: String,
    /// Portion description, e.g. "1 bowl, about 200 g"
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub portion: Option<String>,
    /// Ingredient description
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ingredients: Option<String>,
    pub calories: f64,
    /// The vision model reports this as `nutrition`.
    #[serde(alias = "nutrition")]
    pub macros: Macros,
    /// Recognition confidence reported by the model (0.0 - 1.0)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub confidence: Option<f64>,
}

impl FoodItem {
    pub fn new(name: impl Into<String>, calories: f64, macros: Macros) -> Self {
        Self {
            name: name.into(),
            portion: None,
            ingredients: None,
            calories,
            macros,
            confidence: None,
        }
    }

    pub fn with_portion(mut self, portion: impl Into<String>) -> Self {
        self.portion = Some(portion.into());
        self
    }

    /// Whether the numeric fields can be aggregated.
    pub fn is_valid(&self) -> bool {
        !self.name.trim().is_empty()
            && self.calories.is_finite()
            && (0.0..=MAX_FOOD_CALORIES).contains(&self.calories)
            && self.macros.is_valid()
    }
}

/// Coarse meal category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MealSlot {
    Breakfast,
    Lunch,
    Dinner,
    Snack,
}

impl MealSlot {
    pub const ALL: [MealSlot; 4] = [
        MealSlot::Breakfast,
        MealSlot::Lunch,
        MealSlot::Dinner,
        MealSlot::Snack,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            MealSlot::Breakfast => "breakfast",
            MealSlot::Lunch => "lunch",
            MealSlot::Dinner => "dinner",
            MealSlot::Snack => "snack",
        }
    }

    pub(crate) fn index(&self) -> usize {
        match self {
            MealSlot::Breakfast => 0,
            MealSlot::Lunch => 1,
            MealSlot::Dinner => 2,
            MealSlot::Snack => 3,
        }
    }
}

impl fmt::Display for MealSlot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MealSlot {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "breakfast" => Ok(MealSlot::Breakfast),
            "lunch" => Ok(MealSlot::Lunch),
            "dinner" => Ok(MealSlot::Dinner),
            "snack" => Ok(MealSlot::Snack),
            other => Err(format!("unknown meal slot: {}", other)),
        }
    }
}

/// A logged meal.
///
/// `total_macros` always equals the element-wise sum of `macros` over
/// `foods`; the food list can only be replaced through [`MealRecord::set_foods`]
/// and a stored total is recomputed on deserialization.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "StoredMealRecord")]
pub struct MealRecord {
    pub id: String,
    pub meal_slot: MealSlot,
    /// When the meal was eaten
    pub consumed_at: DateTime<Utc>,
    foods: Vec<FoodItem>,
    total_macros: Macros,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Persisted shape of a meal record; the total is optional and ignored.
#[derive(Deserialize)]
struct StoredMealRecord {
    id: String,
    meal_slot: MealSlot,
    consumed_at: DateTime<Utc>,
    #[serde(default)]
    foods: Vec<FoodItem>,
    #[serde(default)]
    #[allow(dead_code)]
    total_macros: Option<Macros>,
    #[serde(default)]
    notes: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<StoredMealRecord> for MealRecord {
    fn from(stored: StoredMealRecord) -> Self {
        let total_macros = stored.foods.iter().map(|f| &f.macros).sum();
        Self {
            id: stored.id,
            meal_slot: stored.meal_slot,
            consumed_at: stored.consumed_at,
            foods: stored.foods,
            total_macros,
            notes: stored.notes,
            created_at: stored.created_at,
            updated_at: stored.updated_at,
        }
    }
}

impl MealRecord {
    pub fn new(
        id: impl Into<String>,
        meal_slot: MealSlot,
        consumed_at: DateTime<Utc>,
        foods: Vec<FoodItem>,
        now: DateTime<Utc>,
    ) -> Self {
        let total_macros = foods.iter().map(|f| &f.macros).sum();
        Self {
            id: id.into(),
            meal_slot,
            consumed_at,
            foods,
            total_macros,
            notes: None,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn foods(&self) -> &[FoodItem] {
        &self.foods
    }

    pub fn total_macros(&self) -> Macros {
        self.total_macros
    }

    /// Total calories across all foods.
    pub fn calories(&self) -> f64 {
        sum_tenths(self.foods.iter().map(|f| f.calories))
    }

    /// Calories in integer tenths, for exact aggregation.
    pub(crate) fn calories_tenths(&self) -> i64 {
        add_tenths(self.foods.iter().map(|f| to_tenths(f.calories)))
    }

    /// Replace the food list and recompute the derived totals.
    pub fn set_foods(&mut self, foods: Vec<FoodItem>, now: DateTime<Utc>) {
        self.total_macros = foods.iter().map(|f| &f.macros).sum();
        self.foods = foods;
        self.updated_at = now;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn ts(h: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, 1, h, 0, 0).unwrap()
    }

    fn rice() -> FoodItem {
        FoodItem::new("Rice", 230.0, Macros::new(4.3, 0.4, 50.8, 0.6))
    }

    fn chicken() -> FoodItem {
        FoodItem::new("Chicken breast", 165.0, Macros::new(31.0, 3.6, 0.0, 0.0))
    }

    #[test]
    fn test_total_macros_is_element_wise_sum() {
        let meal = MealRecord::new("m1", MealSlot::Lunch, ts(12), vec![rice(), chicken()], ts(12));

        let total = meal.total_macros();
        assert_eq!(total.protein, 35.3);
        assert_eq!(total.fat, 4.0);
        assert_eq!(total.carbs, 50.8);
        assert_eq!(total.fiber, 0.6);
        assert_eq!(meal.calories(), 395.0);
    }

    #[test]
    fn test_set_foods_recomputes_totals() {
        let mut meal = MealRecord::new("m1", MealSlot::Lunch, ts(12), vec![rice()], ts(12));
        meal.set_foods(vec![chicken()], ts(13));

        assert_eq!(meal.total_macros(), chicken().macros);
        assert_eq!(meal.updated_at, ts(13));
        assert_eq!(meal.created_at, ts(12));
    }

    #[test]
    fn test_deserialize_ignores_stale_total() {
        let json = serde_json::json!({
            "id": "m1",
            "meal_slot": "dinner",
            "consumed_at": "2024-01-01T18:30:00Z",
            "foods": [{
                "name": "Noodles",
                "calories": 420.5,
                "nutrition": {"protein": 12.0, "fat": 9.5, "carbs": 70.0, "fiber": 3.0}
            }],
            "total_macros": {"protein": 999.0, "fat": 0.0, "carbs": 0.0, "fiber": 0.0},
            "created_at": "2024-01-01T18:31:00Z",
            "updated_at": "2024-01-01T18:31:00Z"
        });

        let meal: MealRecord = serde_json::from_value(json).unwrap();
        assert_eq!(meal.total_macros(), Macros::new(12.0, 9.5, 70.0, 3.0));
        assert_eq!(meal.meal_slot, MealSlot::Dinner);
    }

    #[test]
    fn test_json_round_trip_keeps_total_invariant() {
        let meal = MealRecord::new("m1", MealSlot::Breakfast, ts(8), vec![rice(), chicken()], ts(8));
        let json = serde_json::to_string(&meal).unwrap();
        let back: MealRecord = serde_json::from_str(&json).unwrap();

        let expected: Macros = back.foods().iter().map(|f| &f.macros).sum();
        assert_eq!(back.total_macros(), expected);
        assert_eq!(back, meal);
    }

    #[test]
    fn test_macro_sum_is_order_independent() {
        let items = [
            Macros::new(0.1, 0.2, 0.3, 0.7),
            Macros::new(0.2, 0.1, 0.7, 0.3),
            Macros::new(0.7, 0.3, 0.1, 0.2),
        ];
        let forward: Macros = items.iter().sum();
        let backward: Macros = items.iter().rev().sum();
        assert_eq!(forward, backward);
        assert_eq!(forward.protein, 1.0);
    }

    #[test]
    fn test_round1_half_up() {
        assert_eq!(round1(416.666), 416.7);
        assert_eq!(round1(0.25), 0.3);
        assert_eq!(round1(2.04), 2.0);
        assert_eq!(round1(0.0), 0.0);
    }

    #[test]
    fn test_average_over_zero_days() {
        let m = Macros::new(10.0, 10.0, 10.0, 10.0);
        assert_eq!(m.average_over(0), Macros::ZERO);
        assert_eq!(m.average_over(3).protein, 3.3);
    }

    #[test]
    fn test_meal_slot_parsing() {
        assert_eq!("Lunch".parse::<MealSlot>().unwrap(), MealSlot::Lunch);
        assert!("brunch".parse::<MealSlot>().is_err());
        assert_eq!(MealSlot::Snack.to_string(), "snack");
    }

    #[test]
    fn test_food_item_validity() {
        assert!(rice().is_valid());
        assert!(!FoodItem::new("", 10.0, Macros::ZERO).is_valid());
        assert!(!FoodItem::new("Bad", -1.0, Macros::ZERO).is_valid());
        assert!(!FoodItem::new("Bad", f64::NAN, Macros::ZERO).is_valid());
        assert!(FoodItem::new("Feast", MAX_FOOD_CALORIES, Macros::ZERO).is_valid());
        assert!(!FoodItem::new("Bad", 1e18, Macros::ZERO).is_valid());
        assert!(!FoodItem::new("Bad", 10.0, Macros::new(0.0, 1e18, 0.0, 0.0)).is_valid());
    }

    #[test]
    fn test_huge_stored_values_saturate() {
        // Records written before the bounds existed can still hold huge values
        let raw = r#"{
            "id": "m1",
            "meal_slot": "dinner",
            "consumed_at": "2024-01-01T12:00:00Z",
            "foods": [
                {"name": "a", "calories": 1e18, "macros": {"protein": 1e18, "fat": 0, "carbs": 0, "fiber": 0}},
                {"name": "b", "calories": 1e18, "macros": {"protein": 1e18, "fat": 0, "carbs": 0, "fiber": 0}}
            ],
            "created_at": "2024-01-01T12:00:00Z",
            "updated_at": "2024-01-01T12:00:00Z"
        }"#;
        let record: MealRecord = serde_json::from_str(raw).unwrap();
        assert_eq!(record.calories_tenths(), i64::MAX);
        assert_eq!(record.calories(), from_tenths(i64::MAX));
        assert_eq!(record.total_macros().protein, from_tenths(i64::MAX));
    }

    #[test]
    fn test_values_below_a_tenth_are_quantized() {
        let speck = FoodItem::new("Salt", 0.04, Macros::new(0.04, 0.0, 0.0, 0.06));
        let foods = vec![speck.clone(), speck];
        let record = MealRecord::new("m1", MealSlot::Snack, ts(8), foods, ts(8));
        // Each item rounds on its own, so 0.04 + 0.04 is 0.0 rather than 0.1
        assert_eq!(record.calories(), 0.0);
        assert_eq!(record.total_macros().protein, 0.0);
        assert_eq!(record.total_macros().fiber, 0.2);
        assert_eq!(record.calories_tenths(), 0);
    }
}
