use chrono::NaiveDate;
use clap::Args;
use pomo_core::{category_summary, daily_summary, DateRange, Settings};

#[derive(Args)]
pub struct SummaryArgs {
    /// First day to include (YYYY-MM-DD, UTC)
    #[arg(long)]
    from: Option<NaiveDate>,
    /// Last day to include (YYYY-MM-DD, UTC)
    #[arg(long)]
    to: Option<NaiveDate>,
    /// Break the summary down per day
    #[arg(long)]
    daily: bool,
}

impl SummaryArgs {
    fn range(&self) -> Option<DateRange> {
        if self.from.is_none() && self.to.is_none() {
            return None;
        }
        Some(DateRange::days(self.from, self.to))
    }
}

pub fn run(args: SummaryArgs, settings: &Settings) -> Result<(), Box<dyn std::error::Error>> {
    let repo = settings.open_repository()?;
    let config = settings.interval_config(repo);
    let range = args.range();

    if args.daily {
        let days = daily_summary(&config, range.as_ref())?;
        println!("{}", serde_json::to_string_pretty(&days)?);
    } else {
        let summary = category_summary(&config, range.as_ref())?;
        println!("{}", serde_json::to_string_pretty(&summary)?);
    }
    Ok(())
}
