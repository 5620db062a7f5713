//! Prompt template for market commentary

use crate::features::{FeatureRow, normalize_min_max};
use minijinja::{Environment, context};
use serde::Serialize;

const TEMPLATE_NAME: &str = "market_insights";

const TEMPLATE: &str = r"Analyze the following financial data.

Recent stock performance:
| date | open | high | low | close | volume | return % | rolling mean | rolling std |{% if has_rsi %} rsi |{% endif %} range position |
{% for row in rows -%}
| {{ row.date }} | {{ row.open|round(2) }} | {{ row.high|round(2) }} | {{ row.low|round(2) }} | {{ row.close|round(2) }} | {{ row.volume }} | {{ row.return_pct|round(2) }} | {{ row.rolling_mean|round(2) }} | {{ row.rolling_std|round(3) }} |{% if has_rsi %} {{ row.rsi|round(1) }} |{% endif %} {{ row.range_position|round(2) }} |
{% endfor %}
Price predictions for the next {{ forecast|length }} periods:
{% for value in forecast -%}
{{ loop.index }}. {{ value|round(2) }}
{% endfor %}
Provide a comprehensive market insight including:
1. Current market trend
2. Potential investment risks
3. Short-term price movement prediction
4. Recommendation for investors
";

#[derive(Serialize)]
struct PromptRow {
    date: String,
    open: f64,
    high: f64,
    low: f64,
    close: f64,
    volume: u64,
    return_pct: f64,
    rolling_mean: f64,
    rolling_std: f64,
    rsi: Option<f64>,
    range_position: f64,
}

/// Render the analysis prompt for `rows` and `forecast`
pub fn render_prompt(rows: &[FeatureRow], forecast: &[f64]) -> Result<String, minijinja::Error> {
    let closes: Vec<f64> = rows.iter().map(|row| row.close).collect();
    let positions = normalize_min_max(&closes);

    let prompt_rows: Vec<PromptRow> = rows
        .iter()
        .zip(positions)
        .map(|(row, range_position)| PromptRow {
            date: row.date.to_string(),
            open: row.open,
            high: row.high,
            low: row.low,
            close: row.close,
            volume: row.volume,
            return_pct: row.daily_return * 100.0,
            rolling_mean: row.rolling_mean,
            rolling_std: row.rolling_std,
            rsi: row.rsi,
            range_position,
        })
        .collect();

    let mut env = Environment::new();
    env.add_template(TEMPLATE_NAME, TEMPLATE)?;
    let template = env.get_template(TEMPLATE_NAME)?;
    template.render(context! {
        rows => prompt_rows,
        has_rsi => rows.iter().any(|row| row.rsi.is_some()),
        forecast => forecast,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn row(day: u32, close: f64) -> FeatureRow {
        FeatureRow {
            date: NaiveDate::from_ymd_opt(2023, 12, day).unwrap(),
            open: close - 1.0,
            high: close + 1.0,
            low: close - 2.0,
            close,
            volume: 52_000_000,
            daily_return: 0.0123,
            rolling_mean: close - 0.5,
            rolling_std: 1.2345,
            rsi: None,
        }
    }

    #[test]
    fn test_prompt_contains_rows_and_forecast() {
        let prompt = render_prompt(&[row(28, 193.58), row(29, 192.53)], &[193.1, 194.25]).unwrap();

        assert!(prompt.contains("| 2023-12-28 |"));
        assert!(prompt.contains("| 2023-12-29 |"));
        assert!(prompt.contains("1.23"));
        assert!(prompt.contains("next 2 periods"));
        assert!(prompt.contains("2. 194.25"));
        assert!(prompt.contains("4. Recommendation for investors"));
        assert!(!prompt.contains("rsi |"));
    }

    #[test]
    fn test_prompt_includes_rsi_when_present() {
        let mut r = row(29, 100.0);
        r.rsi = Some(61.27);
        let prompt = render_prompt(&[r], &[101.0]).unwrap();
        assert!(prompt.contains("rsi |"));
        assert!(prompt.contains("61.3"));
    }
}
