// Copyright 2025 eraflo
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

// Headless stand-in for the presentation layer: it owns the application
// lifecycle, turns user input into worker signals, and tears the pool down.
// Run with: cargo run -p sandbox -- [--clicks <n>]

use anyhow::{Context, Result};
use clap::Parser;
use hive_control::{Controller, ControllerConfig};
use std::io::{self, BufRead};
use std::path::PathBuf;
use std::thread;
use std::time::Duration;

#[derive(Debug, Parser)]
#[command(version, about = "Drive the hive worker pool from the terminal")]
struct Cli {
    /// JSON file with a controller configuration
    #[arg(long)]
    config: Option<PathBuf>,

    /// Number of workers (overrides the configuration file)
    #[arg(long)]
    workers: Option<usize>,

    /// Duration of one unit of work in milliseconds
    #[arg(long = "work-ms")]
    work_ms: Option<u64>,

    /// Click the button this many times, then exit instead of reading stdin
    #[arg(long)]
    clicks: Option<u32>,

    /// Pause between scripted clicks in milliseconds
    #[arg(long = "click-interval-ms", default_value_t = 1500)]
    click_interval_ms: u64,
}

impl Cli {
    fn controller_config(&self) -> Result<ControllerConfig> {
        let mut config = match &self.config {
            Some(path) => {
                let json = std::fs::read_to_string(path)
                    .with_context(|| format!("reading {}", path.display()))?;
                ControllerConfig::from_json_str(&json)
                    .with_context(|| format!("parsing {}", path.display()))?
            }
            None => ControllerConfig::default(),
        };
        if let Some(workers) = self.workers {
            config.workers = workers;
        }
        if let Some(work_ms) = self.work_ms {
            config.work_duration_ms = work_ms;
        }
        Ok(config)
    }
}

/// The application shell around the worker pool.
struct HiveApp {
    controller: Controller,
}

impl HiveApp {
    fn create(config: ControllerConfig) -> Result<Self> {
        let workers = config.workers;
        let controller = Controller::new(config);
        controller
            .start(workers)
            .context("starting the worker pool")?;
        Ok(Self { controller })
    }

    fn on_button_clicked(&self) -> Result<()> {
        log::info!("Button clicked.");
        self.controller.signal()?;
        Ok(())
    }

    fn print_status(&self) {
        for worker in self.controller.workers() {
            println!(
                "{:<12} {:<10} completed={} failed={} spurious={}",
                worker.name,
                format!("{:?}", worker.state),
                worker.units_completed,
                worker.units_failed,
                worker.spurious_wakeups
            );
        }
    }

    fn dispose(self) -> Result<()> {
        log::info!("Disposing application.");
        self.controller.shutdown()?;
        Ok(())
    }
}

fn run_scripted(app: &HiveApp, clicks: u32, interval: Duration) -> Result<()> {
    for _ in 0..clicks {
        app.on_button_clicked()?;
        thread::sleep(interval);
    }
    Ok(())
}

fn run_interactive(app: &HiveApp) -> Result<()> {
    println!("Press Enter to click, type 'status' to inspect workers, 'quit' to exit.");
    for line in io::stdin().lock().lines() {
        match line?.trim() {
            "" | "click" => app.on_button_clicked()?,
            "status" => app.print_status(),
            "quit" | "exit" => break,
            other => println!("Unknown command '{other}'."),
        }
    }
    Ok(())
}

fn main() -> Result<()> {
    use env_logger::{Builder, Env};

    Builder::from_env(Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();
    let app = HiveApp::create(cli.controller_config()?)?;

    let outcome = match cli.clicks {
        Some(clicks) => run_scripted(&app, clicks, Duration::from_millis(cli.click_interval_ms)),
        None => run_interactive(&app),
    };

    app.print_status();
    app.dispose()?;
    outcome
}
