//! Terminal and Markdown rendering of a single event.

use crate::export::{EventResultExport, EventStatus};
use std::fmt;

/// Human-readable view of one [`EventResultExport`].
#[derive(Debug, Clone)]
pub struct EventReport {
    event: EventResultExport,
}

impl EventReport {
    /// Create a report for `event`.
    pub const fn new(event: EventResultExport) -> Self {
        Self { event }
    }

    /// The underlying event result.
    pub const fn event(&self) -> &EventResultExport {
        &self.event
    }

    /// Format as ASCII table for terminal display.
    pub fn to_ascii_table(&self) -> String {
        let event = &self.event;
        let mut output = String::new();

        output.push_str(&format!(
            "\nEvent Study: {} on {} (index {})\n",
            event.ticker,
            event_day(event),
            event.index_symbol
        ));
        output.push_str(&"=".repeat(72));
        output.push('\n');

        if event.status != EventStatus::Ok {
            output.push_str(&format!(
                "No result: {}\n",
                event.reason.as_deref().unwrap_or("unknown")
            ));
            return output;
        }

        output.push_str(&format!(
            "{:<8} {:<12} {:>14} {:>14} {:>14}\n",
            "Drift", "Date", "Stock", "Index", "Abnormal"
        ));
        output.push_str(&"-".repeat(72));
        output.push('\n');

        for row in &event.rows {
            output.push_str(&format!(
                "{:<8} {:<12} {:>14} {:>14} {:>14}\n",
                format!("t{}", row.drift),
                row.date.to_string(),
                percent(row.stock_return),
                percent(row.index_return),
                percent(row.abnormal_return)
            ));
        }

        output.push_str(&"-".repeat(72));
        output.push('\n');
        output.push_str(&format!(
            "{:<21} {:>44} {:>14}\n",
            "Cumulative Abnormal",
            "",
            percent(event.cumulative_abnormal_return)
        ));
        output.push_str(&"=".repeat(72));
        output.push('\n');
        output.push_str(&format!(
            "Alpha: {:.6}  Beta: {:.4}  R-squared: {:.4}  Observations: {}\n",
            event.intercept.unwrap_or(f64::NAN),
            event.beta.unwrap_or(f64::NAN),
            event.r_squared.unwrap_or(f64::NAN),
            event.observations.unwrap_or_default()
        ));
        if !event.complete {
            output.push_str("Window is incomplete.\n");
        }

        output
    }

    /// Format as Markdown table for documentation.
    pub fn to_markdown(&self) -> String {
        let event = &self.event;
        let mut output = String::new();

        output.push_str(&format!(
            "# Event Study: {} on {}\n\n",
            event.ticker,
            event_day(event)
        ));
        output.push_str(&format!("**Index:** {}\n\n", event.index_symbol));

        if event.status != EventStatus::Ok {
            output.push_str(&format!(
                "No result: {}\n",
                event.reason.as_deref().unwrap_or("unknown")
            ));
            return output;
        }

        output.push_str("| Drift | Date | Stock | Index | Abnormal |\n");
        output.push_str("|-------|------|-------|-------|----------|\n");
        for row in &event.rows {
            output.push_str(&format!(
                "| t{} | {} | {} | {} | {} |\n",
                row.drift,
                row.date,
                percent(row.stock_return),
                percent(row.index_return),
                percent(row.abnormal_return)
            ));
        }

        output.push('\n');
        output.push_str("## Market Model\n\n");
        output.push_str(&format!(
            "- **Alpha:** {:.6}\n",
            event.intercept.unwrap_or(f64::NAN)
        ));
        output.push_str(&format!("- **Beta:** {:.4}\n", event.beta.unwrap_or(f64::NAN)));
        output.push_str(&format!(
            "- **R-squared:** {:.4}\n",
            event.r_squared.unwrap_or(f64::NAN)
        ));
        output.push_str(&format!(
            "- **Cumulative abnormal return:** {}\n",
            percent(event.cumulative_abnormal_return)
        ));

        output
    }
}

impl fmt::Display for EventReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_ascii_table())
    }
}

fn event_day(event: &EventResultExport) -> String {
    event
        .event_date
        .map_or_else(|| "unknown date".to_string(), |d| d.to_string())
}

fn percent(value: Option<f64>) -> String {
    value.map_or_else(|| "-".to_string(), |v| format!("{:.3}%", v * 100.0))
}
