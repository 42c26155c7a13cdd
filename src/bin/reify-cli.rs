//! Reify CLI - inspect instruction schemas and run a sample program
//!
//! `check` validates a schema document, `shape` prints the resolved
//! interpreter shape a renderer would consume, and `demo` runs a
//! reservation program against an in-memory handler.

use std::path::{Path, PathBuf};

use anyhow::Context;
use clap::{Parser, Subcommand};
use reify::{Effects, Executor, ExecutorConfig, Handle, InterpreterShape, Logged, Program, Schema};

#[derive(Parser)]
#[command(name = "reify")]
#[command(about = "Reified instruction programs and their trampoline", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Validate a schema document
    Check {
        /// Path to the schema JSON
        schema: PathBuf,
    },

    /// Print the resolved interpreter shape of a schema
    Shape {
        /// Path to the schema JSON
        schema: PathBuf,
    },

    /// Run the reservation sample program
    Demo {
        /// Date of the requested reservation
        #[arg(long, default_value = "2030-01-01")]
        date: String,

        /// Number of seats requested
        #[arg(long, default_value = "4")]
        quantity: u32,

        /// Restaurant capacity
        #[arg(long, default_value = "10")]
        capacity: u32,

        /// Executor configuration (JSON)
        #[arg(long)]
        config: Option<String>,
    },
}

reify::instruction_set! {
    /// Effects of the reservation sample
    enum ReservationInstruction {
        handler ReservationHandler;
        IsReservationInFuture(reservation: Reservation) -> bool;
        ReadReservations(date: String) -> Vec<Reservation>;
        CreateReservation(reservation: Reservation) -> u32;
    }
}

#[derive(Debug, Clone)]
struct Reservation {
    date: String,
    name: String,
    quantity: u32,
}

struct InMemory {
    today: String,
    reservations: Vec<Reservation>,
}

impl Handle<IsReservationInFuture> for InMemory {
    async fn handle(&mut self, instruction: &IsReservationInFuture) -> anyhow::Result<bool> {
        Ok(instruction.reservation.date > self.today)
    }
}

impl Handle<ReadReservations> for InMemory {
    async fn handle(&mut self, instruction: &ReadReservations) -> anyhow::Result<Vec<Reservation>> {
        Ok(self
            .reservations
            .iter()
            .filter(|r| r.date == instruction.date)
            .cloned()
            .collect())
    }
}

impl Handle<CreateReservation> for InMemory {
    async fn handle(&mut self, instruction: &CreateReservation) -> anyhow::Result<u32> {
        self.reservations.push(instruction.reservation.clone());
        Ok(u32::try_from(self.reservations.len())?)
    }
}

fn try_accept(capacity: u32, reservation: Reservation) -> Program<ReservationInstruction, Option<u32>> {
    reify::program(move |fx: Effects<ReservationInstruction>| async move {
        if !fx.perform(IsReservationInFuture::new(reservation.clone())).await? {
            return Ok(None);
        }

        let existing = fx.perform(ReadReservations::new(reservation.date.clone())).await?;
        let seats = existing
            .iter()
            .try_fold(reservation.quantity, |total, r| total.checked_add(r.quantity));
        match seats {
            Some(seats) if seats <= capacity => {}
            _ => return Ok(None),
        }

        let id = fx.perform(CreateReservation::new(reservation)).await?;
        Ok(Some(id))
    })
}

fn load_schema(path: &Path) -> anyhow::Result<Schema> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("reading schema {}", path.display()))?;
    Ok(Schema::from_json(&text)?)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Check { schema } => {
            let schema = load_schema(&schema)?;
            println!(
                "Schema {} is valid ({} instructions)",
                schema.base_name,
                schema.instructions.len()
            );
        }

        Commands::Shape { schema } => {
            let schema = load_schema(&schema)?;
            let shape = InterpreterShape::resolve(&schema)?;
            println!("{}", shape.to_json_pretty()?);
        }

        Commands::Demo {
            date,
            quantity,
            capacity,
            config,
        } => {
            let config = match config {
                Some(json) => ExecutorConfig::from_json(&json)?,
                None => ExecutorConfig::default(),
            };
            let executor = Executor::new(config);

            let mut handler = Logged::new(InMemory {
                today: "2026-01-01".to_string(),
                reservations: vec![Reservation {
                    date: date.clone(),
                    name: "house".to_string(),
                    quantity: 2,
                }],
            });

            let request = Reservation {
                date,
                name: "guest".to_string(),
                quantity,
            };
            let outcome = executor
                .run_with_stats(try_accept(capacity, request), &mut handler)
                .await?;

            match outcome.value {
                Some(id) => println!("Accepted reservation #{}", id),
                None => println!("Reservation rejected"),
            }
            println!(
                "Run {}: {} steps, {} dispatches",
                outcome.run_id, outcome.stats.steps, outcome.stats.dispatches
            );
            for reservation in &handler.inner().reservations {
                println!(
                    "  {} {} x{}",
                    reservation.date, reservation.name, reservation.quantity
                );
            }
        }
    }

    Ok(())
}
