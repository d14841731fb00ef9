use clap::Subcommand;
use pomo_core::{
    cancel_pair, get_interval, resume_or_next, CoreError, Event, IntervalId, RepositoryError,
    Settings, TickDirective,
};
use tracing::debug;

#[derive(Subcommand)]
pub enum TimerAction {
    /// Run the next interval, printing events as JSON lines (Ctrl-C cancels)
    Start {
        /// Always create a new interval instead of resuming an unfinished one
        #[arg(long)]
        new: bool,
        /// Pause after this many ticks
        #[arg(long)]
        pause_after: Option<u64>,
    },
    /// Pause a running interval
    Pause {
        /// Interval id
        id: IntervalId,
    },
    /// Print the most recent interval as JSON
    Status,
}

fn print_event(event: &Event) {
    match serde_json::to_string(event) {
        Ok(line) => println!("{line}"),
        Err(e) => eprintln!("failed to encode event: {e}"),
    }
}

pub fn run(action: TimerAction, settings: &Settings) -> Result<(), Box<dyn std::error::Error>> {
    let repo = settings.open_repository()?;
    let config = settings.interval_config(repo);

    match action {
        TimerAction::Start { new, pause_after } => {
            let mut interval = if new {
                get_interval(&config)?
            } else {
                resume_or_next(&config)?
            };

            let runtime = tokio::runtime::Runtime::new()?;
            let result = runtime.block_on(async {
                let (handle, token) = cancel_pair();
                tokio::spawn(async move {
                    if tokio::signal::ctrl_c().await.is_ok() {
                        debug!("interrupt received");
                        handle.cancel();
                    }
                });

                let mut ticks = 0u64;
                interval
                    .start(
                        &token,
                        &config,
                        |i| print_event(&Event::started(i)),
                        |i| {
                            ticks += 1;
                            print_event(&Event::ticked(i));
                            match pause_after {
                                Some(limit) if ticks >= limit => TickDirective::Pause,
                                _ => TickDirective::Continue,
                            }
                        },
                        |i| print_event(&Event::completed(i)),
                    )
                    .await
            });

            if let Some(event) = Event::stopped(&interval) {
                print_event(&event);
            }
            match result {
                Ok(()) | Err(CoreError::Cancelled { .. }) => {}
                Err(e) => return Err(e.into()),
            }
        }
        TimerAction::Pause { id } => {
            let mut interval = config.repo().by_id(id)?;
            interval.pause(&config)?;
            print_event(&Event::snapshot(&interval));
        }
        TimerAction::Status => match config.repo().last() {
            Ok(interval) => print_event(&Event::snapshot(&interval)),
            Err(RepositoryError::NoIntervals) => println!("no intervals yet"),
            Err(e) => return Err(e.into()),
        },
    }
    Ok(())
}
