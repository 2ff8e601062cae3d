use std::io::{self, ErrorKind, Write};
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use nanoart_contracts::chat::{parse_intent, Intent, CHAT_HELP_COMMANDS};
use nanoart_contracts::events::EventWriter;
use nanoart_contracts::requests::{AspectRatio, ImageCount, SourceFile};
use nanoart_engine::{
    IngestOrigin, IngestOutcome, Progress, Studio, StudioConfig, StudioMode, SubmitOutcome,
};

#[derive(Debug, Parser)]
#[command(name = "nanoart", version, about = "Generate and edit images from text prompts")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    Chat(ChatArgs),
    Generate(GenerateArgs),
    Edit(EditArgs),
}

#[derive(Debug, Parser)]
struct ChatArgs {
    #[arg(long)]
    out: PathBuf,
    #[arg(long)]
    events: Option<PathBuf>,
    #[arg(long)]
    image_model: Option<String>,
}

#[derive(Debug, Parser)]
struct GenerateArgs {
    #[arg(long)]
    prompt: String,
    #[arg(long, default_value = "16:9")]
    aspect_ratio: String,
    #[arg(long, default_value_t = 1)]
    count: u8,
    #[arg(long)]
    out: PathBuf,
    #[arg(long)]
    events: Option<PathBuf>,
    #[arg(long)]
    image_model: Option<String>,
}

#[derive(Debug, Parser)]
struct EditArgs {
    #[arg(long)]
    image: PathBuf,
    #[arg(long)]
    prompt: String,
    #[arg(long)]
    out: PathBuf,
    #[arg(long)]
    events: Option<PathBuf>,
    #[arg(long)]
    image_model: Option<String>,
}

fn main() {
    match run() {
        Ok(code) => std::process::exit(code),
        Err(err) => {
            eprintln!("nanoart error: {err:#}");
            std::process::exit(1);
        }
    }
}

fn run() -> Result<i32> {
    let cli = Cli::parse();
    match cli.command {
        Command::Chat(args) => {
            run_chat(args)?;
            Ok(0)
        }
        Command::Generate(args) => run_generate(args),
        Command::Edit(args) => run_edit(args),
    }
}

fn open_studio(out: &Path, events: Option<&Path>, image_model: Option<&str>) -> Result<Studio> {
    std::fs::create_dir_all(out).with_context(|| format!("failed to create {}", out.display()))?;
    let events_path = events
        .map(Path::to_path_buf)
        .unwrap_or_else(|| out.join("events.jsonl"));
    let session_id = out
        .file_name()
        .and_then(|value| value.to_str())
        .filter(|value| !value.is_empty())
        .unwrap_or("nanoart-session")
        .to_string();

    let mut config = StudioConfig::from_env();
    if let Some(model) = image_model {
        config.image_model = Some(model.to_string());
    }
    Studio::new(config, Some(EventWriter::new(events_path, session_id)))
}

fn run_chat(args: ChatArgs) -> Result<()> {
    let mut studio = open_studio(&args.out, args.events.as_deref(), args.image_model.as_deref())?;

    let stdin = io::stdin();
    let mut line = String::new();

    println!(
        "NanoArt studio ({}, {}). Type /help for commands.",
        studio.model().label,
        studio.mode()
    );

    loop {
        print!("{}> ", studio.mode());
        io::stdout().flush()?;

        line.clear();
        let read = match stdin.read_line(&mut line) {
            Ok(read) => read,
            Err(err) if err.kind() == ErrorKind::Interrupted => continue,
            Err(err) => return Err(err.into()),
        };
        if read == 0 {
            break;
        }

        let input = line.trim_end_matches(['\n', '\r']);
        let intent = parse_intent(input);
        if intent.action == "noop" {
            continue;
        }

        match intent.action.as_str() {
            "help" => {
                println!("Commands: {}", CHAT_HELP_COMMANDS.join(" "));
                println!("Anything else is submitted as the prompt for the current mode.");
            }
            "quit" => break,
            "set_mode" => {
                let Some(mode) = intent.arg_str("mode") else {
                    continue;
                };
                studio.set_mode(mode.parse::<StudioMode>()?);
                println!("Mode: {}", studio.mode());
            }
            "set_aspect_ratio" => match intent.setting_str("aspect_ratio") {
                Some(raw) => match raw.parse::<AspectRatio>() {
                    Ok(ratio) => {
                        studio.generator_mut().set_aspect_ratio(ratio);
                        println!("Aspect ratio: {}", ratio.label());
                    }
                    Err(err) => println!("{err}"),
                },
                None => println!(
                    "Aspect ratio: {} (options: {})",
                    studio.generator().aspect_ratio().label(),
                    AspectRatio::ALL.map(AspectRatio::as_str).join(", ")
                ),
            },
            "set_count" => match intent.setting_str("count").map(parse_count) {
                Some(Ok(count)) => {
                    studio.generator_mut().set_count(count);
                    println!("Quantity: {count}");
                }
                Some(Err(err)) => println!("{err}"),
                None => println!("Quantity: {}", studio.generator().count()),
            },
            "set_image_model" => {
                let Some(model) = intent.arg_str("model") else {
                    print_models(&studio);
                    continue;
                };
                match studio.set_image_model(model) {
                    Ok(selection) => {
                        if let Some(reason) = selection.fallback_reason.as_deref() {
                            println!("{reason}");
                        }
                        println!("Image model set to {}", studio.model().name);
                    }
                    Err(err) => println!("Image model unchanged: {err:#}"),
                }
            }
            "upload" | "drop" => {
                let origin = if intent.action == "drop" {
                    IngestOrigin::Dropped
                } else {
                    IngestOrigin::Selected
                };
                handle_ingest(&mut studio, &intent, origin);
            }
            "clear_source" => {
                studio.clear_source();
                println!("Source image cleared.");
            }
            "list_gallery" => print_gallery(&studio),
            "status" => print_status(&studio),
            "delete_image" => {
                let Some(id) = intent.arg_str("id") else {
                    println!("/delete requires an image id");
                    continue;
                };
                match studio.delete_image(id) {
                    Some(_) => println!("Deleted {id} ({} left)", studio.gallery().len()),
                    None => println!("No image with id {id}"),
                }
            }
            "download_image" => {
                let Some(id) = intent.arg_str("id") else {
                    println!("/download requires an image id");
                    continue;
                };
                let dir = intent
                    .arg_str("dir")
                    .map(PathBuf::from)
                    .unwrap_or_else(|| args.out.clone());
                match studio.download_image(id, &dir) {
                    Ok(path) => println!("Saved {}", path.display()),
                    Err(err) => println!("Download failed: {err:#}"),
                }
            }
            "submit" => {
                let prompt = intent.prompt.clone().unwrap_or_default();
                let outcome = studio.submit_prompt(&prompt, print_progress);
                report_outcome(&studio, &outcome);
            }
            "unknown" => {
                println!(
                    "Unknown command /{}. Type /help for commands.",
                    intent.arg_str("command").unwrap_or_default()
                );
            }
            _ => {}
        }
        report_log_failures(&mut studio);
    }

    Ok(())
}

fn run_generate(args: GenerateArgs) -> Result<i32> {
    let aspect_ratio = args.aspect_ratio.parse::<AspectRatio>()?;
    let count = ImageCount::new(args.count)?;
    let mut studio = open_studio(&args.out, args.events.as_deref(), args.image_model.as_deref())?;

    studio.generator_mut().set_prompt(args.prompt);
    studio.generator_mut().set_aspect_ratio(aspect_ratio);
    studio.generator_mut().set_count(count);

    let outcome = studio.submit_generation(print_progress);
    let saved = save_added(&mut studio, &outcome, &args.out);
    report_outcome(&studio, &outcome);
    report_log_failures(&mut studio);
    saved?;
    Ok(exit_code(&outcome))
}

fn run_edit(args: EditArgs) -> Result<i32> {
    let file = SourceFile::from_path(&args.image)?;
    let mut studio = open_studio(&args.out, args.events.as_deref(), args.image_model.as_deref())?;
    studio.set_mode(StudioMode::Edit);

    if let IngestOutcome::Rejected(err) = studio.ingest_source(file, IngestOrigin::Selected) {
        report_log_failures(&mut studio);
        bail!("{}: {err}", args.image.display());
    }
    studio.editor_mut().set_prompt(args.prompt);

    if studio.can_submit() {
        println!("Processing edit...");
    }
    let outcome = studio.submit_edit();
    let saved = save_added(&mut studio, &outcome, &args.out);
    report_outcome(&studio, &outcome);
    report_log_failures(&mut studio);
    saved?;
    Ok(exit_code(&outcome))
}

fn handle_ingest(studio: &mut Studio, intent: &Intent, origin: IngestOrigin) {
    let Some(path) = intent.arg_str("path") else {
        println!("/{} requires a path", intent.action);
        return;
    };
    let path = PathBuf::from(path);
    let file = match SourceFile::from_path(&path) {
        Ok(file) => file,
        Err(err) => {
            println!("Upload failed: {err:#}");
            return;
        }
    };
    match studio.ingest_source(file, origin) {
        IngestOutcome::Accepted => {
            let mime = studio
                .editor()
                .source()
                .map(|source| source.mime_type.clone())
                .unwrap_or_default();
            println!("Source image loaded: {} ({mime})", path.display());
        }
        IngestOutcome::Rejected(err) => println!("{err}"),
    }
}

fn parse_count(raw: &str) -> Result<ImageCount> {
    let value = raw
        .parse::<u8>()
        .with_context(|| format!("invalid quantity '{raw}'"))?;
    ImageCount::new(value)
}

fn print_progress(progress: Progress) {
    println!(
        "Generating image {} of {}...",
        progress.current, progress.total
    );
}

fn report_outcome(studio: &Studio, outcome: &SubmitOutcome) {
    match outcome {
        SubmitOutcome::Rejected(reason) => println!("{reason}"),
        SubmitOutcome::Completed { added } => {
            for id in added {
                println!("Added {id}");
            }
            println!("Gallery: {} image(s)", studio.gallery().len());
        }
        SubmitOutcome::Failed { added, message } => {
            for id in added {
                println!("Added {id}");
            }
            println!("Error: {message}");
        }
    }
}

/// Writes every image the submit added, even when it ended in a failure.
fn save_added(studio: &mut Studio, outcome: &SubmitOutcome, out: &Path) -> Result<()> {
    for id in outcome.added() {
        let path = studio.download_image(id, out)?;
        println!("Saved {}", path.display());
    }
    Ok(())
}

fn exit_code(outcome: &SubmitOutcome) -> i32 {
    match outcome {
        SubmitOutcome::Completed { .. } => 0,
        SubmitOutcome::Rejected(_) | SubmitOutcome::Failed { .. } => 1,
    }
}

fn report_log_failures(studio: &mut Studio) {
    for err in studio.take_log_failures() {
        eprintln!("nanoart warning: event log: {err:#}");
    }
}

fn print_models(studio: &Studio) {
    for model in studio.models().list() {
        let marker = if model.name == studio.model().name { "*" } else { " " };
        println!("{marker} {}  {}", model.name, model.label);
    }
}

fn print_gallery(studio: &Studio) {
    if studio.gallery().is_empty() {
        println!("Gallery is empty.");
        return;
    }
    println!("Gallery ({})", studio.gallery().len());
    for record in studio.gallery().iter() {
        let created = time_label(record.created_at());
        println!(
            "  {}  {}  {}  {}",
            record.id(),
            created,
            record.image_data().mime_type,
            record.source_prompt()
        );
    }
}

fn print_status(studio: &Studio) {
    println!("Mode: {}", studio.mode());
    println!("Model: {} ({})", studio.model().name, studio.service_name());
    let generator = studio.generator();
    println!(
        "Generate: aspect {} quantity {}",
        generator.aspect_ratio(),
        generator.count()
    );
    match studio.editor().source() {
        Some(source) => println!(
            "Edit source: {} ({})",
            source.file_name.as_deref().unwrap_or("unnamed"),
            source.mime_type
        ),
        None => println!("Edit source: none"),
    }
    if let Some(error) = studio.error() {
        println!("Last error: {error}");
    }
    println!("Gallery: {} image(s)", studio.gallery().len());
}

fn time_label(millis: i64) -> String {
    chrono::DateTime::from_timestamp_millis(millis)
        .map(|at| at.format("%H:%M:%S").to_string())
        .unwrap_or_else(|| millis.to_string())
}
