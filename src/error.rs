use chrono::{Days, NaiveDate};
use thiserror::Error;

use crate::domain::PaymentPolicy;

pub const MIN_HORIZON_DAYS: u32 = 1;
pub const MAX_HORIZON_DAYS: u32 = 1825;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ForecastError {
    #[error("horizon of {days} days is outside the supported range {min}..={max}")]
    HorizonOutOfRange { days: u32, min: u32, max: u32 },

    #[error("a {days}-day window starting {start} runs past the last representable date")]
    WindowPastCalendarEnd { start: NaiveDate, days: u32 },

    #[error("card payment undetermined: policy '{policy}' needs a payment value")]
    PaymentUndetermined { policy: PaymentPolicy },
}

/// Rejects horizons the projector does not support.
pub fn check_horizon(days: u32) -> Result<u32, ForecastError> {
    if (MIN_HORIZON_DAYS..=MAX_HORIZON_DAYS).contains(&days) {
        Ok(days)
    } else {
        Err(ForecastError::HorizonOutOfRange {
            days,
            min: MIN_HORIZON_DAYS,
            max: MAX_HORIZON_DAYS,
        })
    }
}

/// Validates the horizon and returns the last day of `[start, start + days]`.
pub fn check_window(start: NaiveDate, days: u32) -> Result<NaiveDate, ForecastError> {
    let days = check_horizon(days)?;
    start
        .checked_add_days(Days::new(u64::from(days)))
        .ok_or(ForecastError::WindowPastCalendarEnd { start, days })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn horizon_bounds_are_inclusive() {
        assert!(check_horizon(0).is_err());
        assert_eq!(check_horizon(1), Ok(1));
        assert_eq!(check_horizon(1825), Ok(1825));
        assert_eq!(
            check_horizon(1826),
            Err(ForecastError::HorizonOutOfRange {
                days: 1826,
                min: 1,
                max: 1825
            })
        );
    }

    #[test]
    fn window_near_calendar_end_is_rejected() {
        let start = NaiveDate::MAX - Days::new(5);
        assert_eq!(check_window(start, 5), Ok(NaiveDate::MAX));
        assert_eq!(
            check_window(start, 6),
            Err(ForecastError::WindowPastCalendarEnd { start, days: 6 })
        );
    }
}
