// src/services/per_diem_service.rs

use std::sync::Arc;

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde_json::{json, Value};

use crate::{
    common::{
        context::RequestContext,
        error::{AppError, GatewayResultExt},
    },
    gateway::{decode, Gateway, Scope},
    models::per_diem::{DayAllowance, MealFlags, PerDiemRate, TripAllowance},
};

const COMPONENT: &str = "PerDiemService";

// Percentuais fixos da diária de alimentação
const BREAKFAST_PCT: Decimal = Decimal::from_parts(20, 0, 0, false, 2);
const LUNCH_PCT: Decimal = Decimal::from_parts(30, 0, 0, false, 2);
const DINNER_PCT: Decimal = Decimal::from_parts(50, 0, 0, false, 2);
const TRAVEL_DAY_FACTOR: Decimal = Decimal::from_parts(75, 0, 0, false, 2);

/// Diária de alimentação (M&IE) ajustada: 75% nos dias de ida/volta,
/// menos as refeições já fornecidas. Nunca negativa.
pub fn adjusted_mie(rate: Decimal, meals: MealFlags) -> Decimal {
    let base = if meals.is_first_or_last_day { rate * TRAVEL_DAY_FACTOR } else { rate };

    let provided = [
        (meals.breakfast, BREAKFAST_PCT),
        (meals.lunch, LUNCH_PCT),
        (meals.dinner, DINNER_PCT),
    ];
    let deduction: Decimal = provided
        .iter()
        .filter(|(given, _)| *given)
        .map(|(_, pct)| rate * pct)
        .sum();

    (base - deduction).max(Decimal::ZERO)
}

/// Soma a diária de cada dia. Em viagens de mais de um dia, o primeiro e o
/// último dia são marcados como ida/volta automaticamente.
pub fn trip_allowance(rate: &PerDiemRate, days: &[MealFlags]) -> TripAllowance {
    let last = days.len().saturating_sub(1);

    let days: Vec<DayAllowance> = days
        .iter()
        .enumerate()
        .map(|(index, flags)| {
            let mut meals = *flags;
            if days.len() > 1 && (index == 0 || index == last) {
                meals.is_first_or_last_day = true;
            }
            DayAllowance { day: index as u32 + 1, meals, mie: adjusted_mie(rate.mie_rate, meals) }
        })
        .collect();

    TripAllowance {
        location: rate.location.clone(),
        mie_rate: rate.mie_rate,
        lodging_rate: rate.lodging_rate,
        total_mie: days.iter().map(|d| d.mie).sum(),
        days,
    }
}

#[derive(Clone)]
pub struct PerDiemService {
    gateway: Arc<dyn Gateway>,
}

impl PerDiemService {
    pub fn new(gateway: Arc<dyn Gateway>) -> Self {
        Self { gateway }
    }

    pub async fn rate(
        &self,
        ctx: &RequestContext,
        location: &str,
        date: NaiveDate,
    ) -> Result<PerDiemRate, AppError> {
        let user_id = ctx.require_user()?;
        let scope = Scope { user_id, organization_id: ctx.organization_id };

        let args = json!({ "p_location": location, "p_date": date });
        let payload = self
            .gateway
            .rpc(&scope, "get_per_diem_rate", args)
            .await
            .logged(COMPONENT, "rate")?;

        let row = match payload {
            Value::Array(mut rows) if !rows.is_empty() => rows.swap_remove(0),
            Value::Object(_) => payload,
            _ => return Err(AppError::NotFound("Per-diem rate")),
        };
        decode(row).logged(COMPONENT, "rate")
    }

    /// Busca a tabela do local e aplica a conta localmente.
    pub async fn allowance(
        &self,
        ctx: &RequestContext,
        location: &str,
        start: NaiveDate,
        days: Vec<MealFlags>,
    ) -> Result<TripAllowance, AppError> {
        if days.is_empty() {
            return Err(AppError::InvalidInput("A trip needs at least one day".into()));
        }
        let rate = self.rate(ctx, location, start).await?;
        Ok(trip_allowance(&rate, &days))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gateway::memory::MemoryGateway;
    use uuid::Uuid;

    fn dec(s: &str) -> Decimal {
        s.parse().unwrap()
    }

    fn flags(breakfast: bool, lunch: bool, dinner: bool, travel: bool) -> MealFlags {
        MealFlags { breakfast, lunch, dinner, is_first_or_last_day: travel }
    }

    #[test]
    fn no_meals_keeps_full_rate() {
        assert_eq!(adjusted_mie(dec("79"), MealFlags::default()), dec("79"));
    }

    #[test]
    fn all_meals_provided_is_zero() {
        assert_eq!(adjusted_mie(dec("79"), flags(true, true, true, false)), Decimal::ZERO);
    }

    #[test]
    fn travel_day_is_three_quarters() {
        assert_eq!(adjusted_mie(dec("79"), flags(false, false, false, true)), dec("59.25"));
    }

    #[test]
    fn never_negative() {
        for bits in 0..16u8 {
            let meals = flags(bits & 1 != 0, bits & 2 != 0, bits & 4 != 0, bits & 8 != 0);
            let value = adjusted_mie(dec("79"), meals);
            assert!(value >= Decimal::ZERO, "{:?} -> {}", meals, value);
        }
        // 75% - 100% ficaria negativo
        assert_eq!(adjusted_mie(dec("79"), flags(true, true, true, true)), Decimal::ZERO);
    }

    #[test]
    fn single_meal_deductions() {
        assert_eq!(adjusted_mie(dec("100"), flags(true, false, false, false)), dec("80"));
        assert_eq!(adjusted_mie(dec("100"), flags(false, true, false, false)), dec("70"));
        assert_eq!(adjusted_mie(dec("100"), flags(false, false, true, false)), dec("50"));
    }

    fn nyc() -> PerDiemRate {
        PerDiemRate {
            id: None,
            location: "New York City".into(),
            country_code: Some("US".into()),
            lodging_rate: dec("282"),
            mie_rate: dec("79"),
            effective_from: NaiveDate::from_ymd_opt(2026, 1, 1).unwrap(),
            effective_to: None,
        }
    }

    #[test]
    fn trip_marks_first_and_last_day() {
        let trip = trip_allowance(&nyc(), &[MealFlags::default(); 3]);
        assert!(trip.days[0].meals.is_first_or_last_day);
        assert!(!trip.days[1].meals.is_first_or_last_day);
        assert!(trip.days[2].meals.is_first_or_last_day);
        assert_eq!(trip.total_mie, dec("59.25") + dec("79") + dec("59.25"));
    }

    #[test]
    fn single_day_trip_is_not_a_travel_day() {
        let trip = trip_allowance(&nyc(), &[MealFlags::default()]);
        assert_eq!(trip.total_mie, dec("79"));
    }

    #[tokio::test]
    async fn missing_rate_is_not_found() {
        let gw = Arc::new(MemoryGateway::new());
        gw.on_rpc("get_per_diem_rate", |_| Ok(json!([])));
        let service = PerDiemService::new(gw);
        let ctx = RequestContext::new(Some(Uuid::new_v4()), None);

        let err = service
            .rate(&ctx, "Nowhere", NaiveDate::from_ymd_opt(2026, 1, 1).unwrap())
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
    }
}
