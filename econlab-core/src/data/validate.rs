//! Pre-write validation of fetched observations.

use super::provider::DataError;
use crate::domain::IndicatorObservation;

/// Check fetched rows before the raw file is written.
///
/// Rejects an empty batch, any year outside `[start_year, end_year]`, and a
/// batch where more than half of the returned entries had a null value.
pub fn validate_observations(
    observations: &[IndicatorObservation],
    skipped_nulls: usize,
    start_year: i32,
    end_year: i32,
) -> Result<(), DataError> {
    if observations.is_empty() {
        return Err(DataError::Validation("no observations to write".into()));
    }

    if let Some(obs) = observations
        .iter()
        .find(|o| o.year < start_year || o.year > end_year)
    {
        return Err(DataError::Validation(format!(
            "{} has year {} outside {start_year}..={end_year}",
            obs.indicator_code, obs.year
        )));
    }

    let returned = observations.len() + skipped_nulls;
    if skipped_nulls * 2 > returned {
        return Err(DataError::Validation(format!(
            "value column mostly empty: {skipped_nulls} of {returned} entries were null"
        )));
    }

    Ok(())
}
