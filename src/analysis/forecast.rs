use crate::analysis::period::Granularity;
use crate::analysis::result::Forecast;
use crate::analysis::result::RevenuePoint;
use crate::error::RustyPbixError;

/// Extrapolates the next `horizon` periods with an ordinary least-squares line
/// over the series values (x = 0..n-1). Predictions are clipped at zero and
/// labelled with the periods following the last one of the series.
pub fn forecast(series: &[RevenuePoint], granularity: Granularity, horizon: usize) -> Result<Vec<Forecast>, RustyPbixError> {
    if series.len() < 2 {
        Err(RustyPbixError::InsufficientDataError(series.len()))?
    }

    let values: Vec<f64> = series.iter().map(|point| point.value).collect();
    let (slope, intercept) = least_squares(&values);
    let mut period = series.last().and_then(|point| granularity.parse_label(&point.period));
    let forecasts = (0..horizon)
        .map(|step| {
            let x = (values.len() + step) as f64;
            let predicted = intercept + slope * x;
            period = period.and_then(|bucket| granularity.next(bucket));
            Forecast {
                period: period
                    .map(|bucket| granularity.label(bucket))
                    .unwrap_or_else(|| format!("Period {}", values.len() + step + 1)),
                predicted_value: if predicted > 0.0 { predicted } else { 0.0 },
            }
        })
        .collect();
    Ok(forecasts)
}

/// Returns (slope, intercept) of the least-squares line through (i, values[i]).
fn least_squares(values: &[f64]) -> (f64, f64) {
    let n = values.len() as f64;
    let mean_x = (n - 1.0) / 2.0;
    let mean_y = values.iter().sum::<f64>() / n;
    let (mut covariance, mut variance) = (0f64, 0f64);
    for (index, value) in values.iter().enumerate() {
        let dx = index as f64 - mean_x;
        covariance += dx * (value - mean_y);
        variance += dx * dx;
    }
    let slope = if variance == 0.0 { 0.0 } else { covariance / variance };
    (slope, mean_y - slope * mean_x)
}
