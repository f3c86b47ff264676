use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use rusqlite::Connection;
use std::path::{Path, PathBuf};
use std::time::Instant;
use zts_migrate::config::Config;
use zts_migrate::jobs;
use zts_migrate::progress::{create_spinner, format_duration, set_log_only};
use zts_migrate::{safety, schema, store};

#[derive(Parser, Debug)]
#[command(name = "zts-migrate")]
#[command(about = "Migrate the Zacharias Topelius Skrifter edition into the new publishing database")]
struct Cli {
    /// TOML file overriding the built-in collection tables and directories
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[arg(long, global = true)]
    legacy_db: Option<PathBuf>,

    #[arg(long, global = true)]
    target_db: Option<PathBuf>,

    /// Notes database holding lemmas and their documents
    #[arg(long, global = true)]
    notes_db: Option<PathBuf>,

    /// Print periodic progress lines instead of progress bars
    #[arg(long, global = true)]
    log_only: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Create the target tables in an empty database
    InitTarget,
    /// Project, collections and publications
    MainTables,
    /// Manuscripts and versions of published publications
    ManuscriptsVersions,
    Facsimiles,
    /// Facsimile collections for digitized newspapers (OAI-PMH metadata)
    FacsimileUrls {
        /// `legacy_id;url` list, defaults to facsimile_urls.csv in the csv directory
        #[arg(long)]
        list: Option<PathBuf>,
    },
    /// General comments of publications
    Comments,
    /// Introduction and title page of every collection
    Introductions,
    /// Table-of-contents JSON files
    Toc,
    /// Source files of reading texts
    PublicationPaths,
    ManuscriptPaths,
    VersionPaths,
    /// Split the Läsning för barn part files into one file per story
    SplitLfb,
    /// Split the Läsning för barn comment file and link the comments
    SplitLfbComments,
    /// Register the split Läsning för barn files in the notes database
    LfbCommentDocuments,
    /// Move Läsning för barn lemmas onto the split documents
    Notes,
}

/// Database paths after applying CLI overrides to the config.
struct Stores {
    legacy: Option<PathBuf>,
    target: Option<PathBuf>,
    notes: Option<PathBuf>,
}

fn required<'a>(path: &'a Option<PathBuf>, flag: &str) -> Result<&'a Path> {
    path.as_deref()
        .with_context(|| format!("{} is required for this command (or set it in the config file)", flag))
}

impl Stores {
    fn new(cli: &Cli, config: &Config) -> Self {
        Self {
            legacy: cli.legacy_db.clone().or_else(|| config.legacy_db.clone()),
            target: cli.target_db.clone().or_else(|| config.target_db.clone()),
            notes: cli.notes_db.clone().or_else(|| config.notes_db.clone()),
        }
    }

    fn sources<'a>(paths: &[&'a Option<PathBuf>]) -> Vec<&'a Path> {
        paths.iter().filter_map(|p| Option::as_deref(*p)).collect()
    }

    fn legacy(&self) -> Result<Connection> {
        let path = required(&self.legacy, "--legacy-db")?;
        println!("Opening legacy database: {:?}", path);
        store::open_legacy(path)
    }

    fn target(&self) -> Result<Connection> {
        let path = required(&self.target, "--target-db")?;
        safety::validate_target_path(path, &Self::sources(&[&self.legacy, &self.notes]))?;
        println!("Opening target database: {:?}", path);
        store::open_existing(path)
    }

    fn notes(&self) -> Result<Connection> {
        let path = required(&self.notes, "--notes-db")?;
        safety::validate_target_path(path, &Self::sources(&[&self.legacy, &self.target]))?;
        println!("Opening notes database: {:?}", path);
        store::open_existing(path)
    }

    fn init_target(&self) -> Result<()> {
        let path = required(&self.target, "--target-db")?;
        safety::validate_target_path(path, &Self::sources(&[&self.legacy, &self.notes]))?;
        let spinner = create_spinner("Creating target tables");
        let conn = store::create(path)?;
        schema::create_target_tables(&conn)?;
        spinner.finish_with_message(format!("Target tables ready in {}", path.display()));
        Ok(())
    }
}

fn run(command: &Command, stores: &Stores, config: &Config) -> Result<()> {
    match command {
        Command::InitTarget => stores.init_target()?,
        Command::MainTables => {
            let report = jobs::main_tables::run(&stores.legacy()?, &mut stores.target()?, config)?;
            println!(
                "Project {}: {} collections, {} publications",
                report.project_id,
                report.collections.len(),
                report.publications.len()
            );
        }
        Command::ManuscriptsVersions => {
            let report = jobs::manuscripts_versions::run(&stores.legacy()?, &mut stores.target()?, config)?;
            println!(
                "{} manuscripts, {} versions",
                report.manuscripts.len(),
                report.versions.len()
            );
        }
        Command::Facsimiles => {
            let report = jobs::facsimiles::run(&stores.legacy()?, &mut stores.target()?, config)?;
            println!(
                "{} facsimile collections, {} links, {} excluded",
                report.collections.len(),
                report.linked,
                report.excluded
            );
        }
        Command::FacsimileUrls { list } => {
            let rows = jobs::facsimile_urls::run(&mut stores.target()?, config, list.as_deref())?;
            println!("{} facsimile collections created", rows.len());
        }
        Command::Comments => {
            let report = jobs::comments::run(&mut stores.target()?, config)?;
            println!("{} comments, {}", report.comments, report.stats.summary("Publications"));
        }
        Command::Introductions => {
            let linked = jobs::introductions::run(&mut stores.target()?, config)?;
            println!("{} collections linked", linked);
        }
        Command::Toc => {
            let files = jobs::toc::run(&stores.legacy()?, &stores.target()?, config)?;
            println!("{} TOC files written to {}", files.len(), config.toc_dir.display());
        }
        Command::PublicationPaths => {
            let stats = jobs::publication_paths::run(&stores.legacy()?, &mut stores.target()?, config)?;
            println!("{}", stats.summary("Publications"));
        }
        Command::ManuscriptPaths => {
            let stats = jobs::manuscript_paths::run(&mut stores.target()?, config)?;
            println!("{}", stats.summary("Manuscripts"));
        }
        Command::VersionPaths => {
            let stats = jobs::version_paths::run(&mut stores.target()?, config)?;
            println!("{}", stats.summary("Versions"));
        }
        Command::SplitLfb => {
            let written = jobs::split_lfb::run(config)?;
            println!("{} stories written to {}", written.len(), config.lfb_split_dir.display());
        }
        Command::SplitLfbComments => {
            let comments = jobs::split_lfb_comments::run(&mut stores.target()?, config)?;
            println!(
                "{} comments written to {}",
                comments.len(),
                config.lfb_comment_split_dir.display()
            );
        }
        Command::LfbCommentDocuments => {
            let inserted = jobs::lfb_comment_documents::run(&mut stores.notes()?, config)?;
            println!("{} documents inserted", inserted);
        }
        Command::Notes => {
            let stats = jobs::notes::run(&mut stores.notes()?, config)?;
            println!("{}", stats.summary("Lemmas"));
        }
    }
    Ok(())
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    set_log_only(cli.log_only);

    let config = Config::load(cli.config.as_deref())?;
    let stores = Stores::new(&cli, &config);

    let start = Instant::now();
    run(&cli.command, &stores, &config)?;

    println!("\n{:=<60}", "");
    println!("{:?} complete in {}", cli.command, format_duration(start.elapsed()));
    println!("{:=<60}", "");
    Ok(())
}
