mod config;
mod controller;
mod logging;
mod model;
mod notify;
mod remote;
mod search;
mod ui;
mod validate;

use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use clap::{Args, Parser, Subcommand};
use tracing::debug;

use config::Config;
use controller::{OperationError, RecordListController};
use logging::{Target, Verbosity};
use model::{format_timestamp, Record, RecordInput};
use notify::StderrSink;
use remote::DummyApiStore;

#[derive(Parser, Debug)]
#[command(name = "rolo", version, about = "Terminal contact manager for the demo user API")]
struct Cli {
    /// Configuration file (defaults to <config dir>/rolo/config.toml)
    #[arg(long, global = true, value_name = "PATH")]
    config: Option<PathBuf>,

    /// Override the API base URL
    #[arg(long, global = true, value_name = "URL")]
    base_url: Option<String>,

    /// Override the application id sent with every request
    #[arg(long, global = true, value_name = "ID")]
    app_id: Option<String>,

    #[arg(short, long, global = true, default_value_t = false)]
    verbose: bool,

    #[arg(short, long, global = true, default_value_t = false)]
    quiet: bool,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Print contacts as id<TAB>name<TAB>email
    List(ListArgs),
    /// Show every field of one contact
    Show(IdArgs),
    Add(AddArgs),
    /// Change a contact; omitted fields keep their current values
    Edit(EditArgs),
    Delete(IdArgs),
}

#[derive(Args, Debug)]
struct ListArgs {
    /// Only contacts whose first or last name contains this text
    #[arg(long)]
    query: Option<String>,
}

#[derive(Args, Debug)]
struct IdArgs {
    id: String,
}

#[derive(Args, Debug)]
struct AddArgs {
    #[arg(long)]
    first_name: String,
    #[arg(long)]
    last_name: String,
    #[arg(long)]
    email: String,
    #[arg(long)]
    phone: Option<String>,
    #[arg(long)]
    picture: Option<String>,
}

#[derive(Args, Debug)]
struct EditArgs {
    id: String,
    #[arg(long)]
    first_name: Option<String>,
    #[arg(long)]
    last_name: Option<String>,
    #[arg(long)]
    phone: Option<String>,
    #[arg(long)]
    picture: Option<String>,
}

type CliController = RecordListController<DummyApiStore, StderrSink>;

fn main() -> Result<ExitCode> {
    let cli = Cli::parse();

    let target = if cli.command.is_some() {
        Target::Stderr
    } else {
        Target::File
    };
    let log_path = logging::init(Verbosity::from_flags(cli.verbose, cli.quiet), target)?;

    let mut config = config::load(cli.config.as_deref())?;
    config.apply_overrides(cli.base_url, cli.app_id)?;
    debug!(path = ?config.config_path, base_url = %config.base_url, "configuration loaded");

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .context("failed to start async runtime")?;
    let store = Arc::new(DummyApiStore::new(&config)?);

    match cli.command {
        Some(command) => runtime.block_on(run_command(command, store, &config)),
        None => {
            let mut app = ui::app::App::new(&config, store, runtime.handle().clone(), log_path);
            app.run()?;
            Ok(ExitCode::SUCCESS)
        }
    }
}

async fn run_command(command: Command, store: Arc<DummyApiStore>, config: &Config) -> Result<ExitCode> {
    let mut controller: CliController = RecordListController::new(
        store,
        StderrSink,
        config.page_size,
        config.default_picture.clone(),
    );

    match command {
        Command::List(args) => handle_list(&mut controller, args).await,
        Command::Show(args) => {
            let outcome = controller.fetch_detail(&args.id).await;
            Ok(finish(outcome, print_record))
        }
        Command::Add(args) => {
            let input = RecordInput {
                first_name: args.first_name,
                last_name: args.last_name,
                email: args.email,
                phone: args.phone.unwrap_or_default(),
                picture: args.picture.unwrap_or_default(),
            };
            let outcome = controller.create(&input).await;
            Ok(finish(outcome, |record| println!("{}", record.id)))
        }
        Command::Edit(args) => handle_edit(&mut controller, args).await,
        Command::Delete(args) => {
            let outcome = controller.delete(&args.id).await;
            Ok(finish(outcome, |_| {}))
        }
    }
}

async fn handle_list(controller: &mut CliController, args: ListArgs) -> Result<ExitCode> {
    if !controller.refresh().await {
        let reason = controller
            .last_refresh_error()
            .map(ToString::to_string)
            .unwrap_or_else(|| "no response".to_string());
        bail!("failed to load contacts: {}", reason);
    }

    controller.set_query(args.query.as_deref().unwrap_or(""));

    // Results: id<TAB>name<TAB>email
    for record in controller.list().view() {
        println!(
            "{}\t{}\t{}",
            record.id,
            record.display_name(),
            record.email.as_deref().unwrap_or("")
        );
    }
    Ok(ExitCode::SUCCESS)
}

async fn handle_edit(controller: &mut CliController, args: EditArgs) -> Result<ExitCode> {
    let current = match controller.fetch_detail(&args.id).await {
        Ok(record) => record,
        Err(err) => return Ok(finish::<Record>(Err(err), |_| {})),
    };

    let mut input = RecordInput::from_record(&current);
    if let Some(first_name) = args.first_name {
        input.first_name = first_name;
    }
    if let Some(last_name) = args.last_name {
        input.last_name = last_name;
    }
    if let Some(phone) = args.phone {
        input.phone = phone;
    }
    if let Some(picture) = args.picture {
        input.picture = picture;
    }

    let outcome = controller.update(&args.id, &input).await;
    Ok(finish(outcome, print_record))
}

/// Store failures were already reported through the sink.
fn finish<T>(outcome: Result<T, OperationError>, on_success: impl FnOnce(&T)) -> ExitCode {
    match outcome {
        Ok(value) => {
            on_success(&value);
            ExitCode::SUCCESS
        }
        Err(OperationError::Validation(errors)) => {
            for (_, message) in errors.iter() {
                eprintln!("error: {}", message);
            }
            ExitCode::FAILURE
        }
        Err(OperationError::Store(_)) => ExitCode::FAILURE,
        Err(err) => {
            eprintln!("error: {}", err);
            ExitCode::FAILURE
        }
    }
}

fn print_record(record: &Record) {
    let optional = |value: &Option<String>| value.clone().unwrap_or_default();
    let timestamp = |value: &Option<String>| {
        value
            .as_deref()
            .map(format_timestamp)
            .unwrap_or_default()
    };

    println!("id:         {}", record.id);
    match record.title.as_deref().filter(|title| !title.is_empty()) {
        Some(title) => println!("name:       {} {}", title, record.display_name()),
        None => println!("name:       {}", record.display_name()),
    }
    println!("email:      {}", optional(&record.email));
    println!("phone:      {}", optional(&record.phone));
    println!("picture:    {}", optional(&record.picture));
    println!("registered: {}", timestamp(&record.register_date));
    println!("updated:    {}", timestamp(&record.updated_date));
}
