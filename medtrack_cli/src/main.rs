use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use medtrack_core::dates::{parse_date, DISPLAY_FORMAT};
use medtrack_core::*;
use std::path::PathBuf;
use std::process::ExitCode;

#[derive(Parser)]
#[command(name = "medtrack")]
#[command(about = "Medicine tracker and inventory", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Override data directory
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,

    /// Treat this date as today (YYYY-MM-DD, DD-MM-YYYY or MMDDYYYY)
    #[arg(long, global = true, value_parser = parse_today)]
    today: Option<NaiveDate>,
}

#[derive(Subcommand)]
enum Commands {
    /// Show the inventory, advancing stock to today (default)
    List {
        /// Show projections without saving the decayed stock
        #[arg(long)]
        no_commit: bool,
    },

    /// Add a new medicine to the inventory
    Add {
        /// Generic name (must be unique)
        #[arg(long)]
        generic: String,

        #[arg(long)]
        brand: Option<String>,

        /// Take at 8 AM
        #[arg(long)]
        morning: bool,

        /// Take at 1 PM
        #[arg(long)]
        midday: bool,

        /// Take at 8 PM
        #[arg(long)]
        evening: bool,

        /// Intended duration in days
        #[arg(long, default_value_t = 0)]
        days: u32,

        /// Doses currently on hand
        #[arg(long, default_value_t = 0)]
        doses: u32,

        /// Price per dose
        #[arg(long)]
        price: Option<f64>,

        #[arg(long)]
        notes: Option<String>,
    },

    /// Change fields of an existing medicine
    Update {
        /// Generic name of the medicine to update
        name: String,

        /// New generic name
        #[arg(long)]
        rename: Option<String>,

        #[arg(long, conflicts_with = "clear_brand")]
        brand: Option<String>,

        #[arg(long)]
        clear_brand: bool,

        #[arg(long)]
        morning: Option<bool>,

        #[arg(long)]
        midday: Option<bool>,

        #[arg(long)]
        evening: Option<bool>,

        /// Intended duration in days, from today
        #[arg(long)]
        days: Option<u32>,

        /// Doses on hand today
        #[arg(long)]
        doses: Option<u32>,

        #[arg(long, conflicts_with = "clear_price")]
        price: Option<f64>,

        #[arg(long)]
        clear_price: bool,

        #[arg(long, conflicts_with = "clear_notes")]
        notes: Option<String>,

        #[arg(long)]
        clear_notes: bool,
    },

    /// Delete a medicine by generic name
    Delete {
        name: String,
    },

    /// Export the inventory table to CSV
    Export {
        #[arg(long)]
        out: PathBuf,
    },

    /// Print the total cost of restocking
    Cost,
}

fn parse_today(input: &str) -> std::result::Result<NaiveDate, String> {
    parse_date(input).ok_or_else(|| format!("unrecognized date: {}", input))
}

fn main() -> ExitCode {
    medtrack_core::logging::init_with_level("warn");

    let cli = Cli::parse();
    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::debug!("Command failed: {:?}", e);
            eprintln!("Error: {}", e);
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<()> {
    let mut config = Config::load()?;
    if let Some(data_dir) = cli.data_dir {
        config.data.data_dir = data_dir;
    }
    let store = JsonFileStore::new(config.data.inventory_path());

    match cli.today {
        Some(date) => dispatch(cli.command, Inventory::new(store, FixedClock(date)), &config),
        None => dispatch(cli.command, Inventory::new(store, SystemClock), &config),
    }
}

fn dispatch<C: Clock>(
    command: Option<Commands>,
    mut inventory: Inventory<JsonFileStore, C>,
    config: &Config,
) -> Result<()> {
    let currency = config.display.currency.as_str();

    match command {
        None => cmd_list(&mut inventory, false, currency),
        Some(Commands::List { no_commit }) => cmd_list(&mut inventory, no_commit, currency),
        Some(Commands::Add {
            generic,
            brand,
            morning,
            midday,
            evening,
            days,
            doses,
            price,
            notes,
        }) => {
            let record = inventory.add(NewMedicine {
                generic_name: generic,
                brand_name: brand,
                schedule: Schedule::new(morning, midday, evening),
                intended_duration_days: days,
                doses_left: doses,
                price_per_dose: price,
                notes,
            })?;
            println!("✓ Medicine '{}' added!", record.generic_name);
            Ok(())
        }
        Some(Commands::Update {
            name,
            rename,
            brand,
            clear_brand,
            morning,
            midday,
            evening,
            days,
            doses,
            price,
            clear_price,
            notes,
            clear_notes,
        }) => {
            let update = MedicineUpdate {
                generic_name: rename.into(),
                brand_name: optional_field(brand, clear_brand),
                morning: morning.into(),
                midday: midday.into(),
                evening: evening.into(),
                intended_duration_days: days.into(),
                doses_left: doses.into(),
                price_per_dose: optional_field(price, clear_price),
                notes: optional_field(notes, clear_notes),
            };

            if update.is_empty() {
                println!("No changes were made.");
                return Ok(());
            }

            let record = inventory.update(&name, update)?;
            println!("✓ Medicine '{}' updated!", record.generic_name);
            Ok(())
        }
        Some(Commands::Delete { name }) => {
            let removed = inventory.delete(&name)?;
            println!("✓ Medicine '{}' deleted.", removed.generic_name);
            Ok(())
        }
        Some(Commands::Export { out }) => {
            let projections = inventory.refresh()?;
            let count = medtrack_core::report::export_csv(&projections, &out)?;
            println!("✓ Exported {} medicines to {}", count, out.display());
            Ok(())
        }
        Some(Commands::Cost) => {
            let total = inventory.total_restock_cost()?;
            println!("Total price of medicines to buy: {}{:.2}", currency, total);
            Ok(())
        }
    }
}

/// `--x VALUE` sets, `--clear-x` clears, neither leaves the field alone
fn optional_field<T>(value: Option<T>, clear: bool) -> FieldUpdate<Option<T>> {
    match (value, clear) {
        (Some(v), _) => FieldUpdate::Set(Some(v)),
        (None, true) => FieldUpdate::Set(None),
        (None, false) => FieldUpdate::Unset,
    }
}

fn cmd_list<C: Clock>(
    inventory: &mut Inventory<JsonFileStore, C>,
    no_commit: bool,
    currency: &str,
) -> Result<()> {
    let projections = if no_commit {
        inventory.preview()?
    } else {
        inventory.refresh()?
    };

    println!("Date: {}", inventory.today().format(DISPLAY_FORMAT));

    if projections.is_empty() {
        println!("No medicines in the inventory.");
        return Ok(());
    }

    display_table(&projections, currency);

    let low: Vec<_> = projections.iter().filter(|p| p.low_stock).collect();
    if !low.is_empty() {
        println!();
        for p in low {
            println!(
                "⚠ Low stock: {} ({} day(s) left)",
                p.generic_name, p.days_remaining
            );
        }
    }

    println!();
    println!(
        "Total price of medicines to buy: {}{:.2}",
        currency,
        total_restock_cost(&projections)
    );
    Ok(())
}

fn display_table(projections: &[Projection], currency: &str) {
    println!(
        "{:<20} {:<12} {:>8} {:>9} {:>6} {:>6} {:>10} {:>10} {:<12} {}",
        "Medicine",
        "Schedule",
        "Intended",
        "Remaining",
        "Left",
        "To Buy",
        "Per Dose",
        "Per Day",
        "Updated",
        "Notes"
    );
    println!("{}", "─".repeat(110));

    for p in projections {
        let per_dose = p
            .price_per_dose
            .map(|price| format!("{}{:.2}", currency, price))
            .unwrap_or_else(|| "-".into());
        let updated = p
            .last_updated
            .map(|d| d.format(DISPLAY_FORMAT).to_string())
            .unwrap_or_else(|| "unknown".into());

        println!(
            "{:<20} {:<12} {:>8} {:>9} {:>6} {:>6} {:>10} {:>10} {:<12} {}",
            p.generic_name,
            p.schedule.label(),
            p.adjusted_intended_days,
            p.days_remaining,
            p.adjusted_doses_left,
            p.doses_to_buy,
            per_dose,
            format!("{}{:.2}", currency, p.price_per_day),
            updated,
            p.notes.as_deref().unwrap_or("")
        );
    }
}
