use clap::{Parser, Subcommand};
use color_eyre::eyre::eyre;
use color_eyre::Result;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::broadcast::error::RecvError;

use lumina::app::App;
use lumina::config::{self, Config};
use lumina::context::AppContext;
use lumina::journal;
use lumina::logging;
use lumina::offline::{DownloadOutcome, OfflineEvent};
use lumina::plans::PlanOverview;
use lumina::scripture::{self, Passage, TRANSLATIONS};

#[derive(Parser, Debug)]
#[command(name = "lumina")]
#[command(about = "Scripture reader with offline translations")]
#[command(version)]
struct Args {
  /// Path to config file (default: $XDG_CONFIG_HOME/lumina/config.yaml)
  #[arg(short, long, global = true)]
  config: Option<PathBuf>,

  #[command(subcommand)]
  command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
  /// Open the terminal UI (default)
  Tui,
  /// Download a translation for offline reading. Ctrl-C cancels.
  Download { translation: String },
  /// Remove a translation's offline copy
  Delete { translation: String },
  /// Show the offline status of every translation
  Status,
  /// Look up a passage
  Read {
    reference: String,
    #[arg(short, long)]
    translation: Option<String>,
    /// Second translation shown alongside the first
    #[arg(long)]
    compare: Option<String>,
  },
  /// Devotional for a verse (default: today's verse)
  Devotional {
    reference: Option<String>,
    #[arg(short, long)]
    translation: Option<String>,
  },
  /// Ask a question about the Bible
  Ask {
    #[arg(required = true)]
    question: Vec<String>,
  },
  /// Suggest a verse for a prayer concern
  Suggest {
    #[arg(required = true)]
    prayer: Vec<String>,
  },
  /// Study outline for a passage
  Outline {
    reference: String,
    #[arg(short, long)]
    translation: Option<String>,
  },
  /// Prayer journal
  Journal {
    #[command(subcommand)]
    command: JournalCommand,
  },
  /// Bookmarked verses and their notes
  Bookmark {
    #[command(subcommand)]
    command: BookmarkCommand,
  },
  /// Reading plans and the reading streak
  Plan {
    #[command(subcommand)]
    command: PlanCommand,
  },
}

/// Entries are addressed by their 1-based position in `list`
#[derive(Subcommand, Debug)]
enum JournalCommand {
  /// Record a prayer request
  Add {
    /// Attach a suggested verse to the prayer
    #[arg(long)]
    suggest: bool,
    #[arg(required = true)]
    request: Vec<String>,
  },
  List,
  /// Mark a prayer answered, or unmark it
  Answer { number: usize },
  Remove { number: usize },
}

#[derive(Subcommand, Debug)]
enum BookmarkCommand {
  /// Bookmark every verse of a passage, or remove them if all are bookmarked
  Toggle {
    reference: String,
    #[arg(short, long)]
    translation: Option<String>,
  },
  List,
  /// Add a note to a bookmark
  Note {
    number: usize,
    #[arg(required = true)]
    text: Vec<String>,
  },
  /// Remove a bookmark's note
  Unnote { number: usize, note: usize },
  Remove { number: usize },
}

#[derive(Subcommand, Debug)]
enum PlanCommand {
  /// All plans with their progress, and the current streak
  List,
  /// Every day of a plan
  Show { plan: String },
  /// Mark a day (1-based) as read
  Complete { plan: String, day: usize },
  /// Mark a day (1-based) as unread
  Undo { plan: String, day: usize },
}

#[tokio::main]
async fn main() -> Result<()> {
  color_eyre::install()?;

  let args = Args::parse();

  // Load configuration
  let config = Config::load(args.config.as_deref())?;

  let _log_guard = logging::init(&config::data_dir()?.join("logs"))?;

  let ctx = Arc::new(AppContext::open(config).await?);

  match args.command.unwrap_or(Command::Tui) {
    Command::Tui => {
      let mut app = App::new(ctx)?;
      app.run().await?;
    }
    Command::Download { translation } => download(&ctx, &translation).await?,
    Command::Delete { translation } => {
      let id = translation_id(&translation)?;
      let status = ctx.downloads.delete_download(id).await?;
      println!("{}: {}", id, status);
    }
    Command::Status => {
      let snapshot = ctx.downloads.snapshot()?;
      for t in TRANSLATIONS {
        let detail = snapshot
          .progress
          .get(t.id)
          .filter(|p| !p.details.is_empty())
          .map(|p| format!("  {}% {}", p.percentage, p.details))
          .unwrap_or_default();
        println!("{:<7} {:<15} {}{}", t.id, snapshot.status(t.id), t.name, detail);
      }
    }
    Command::Read {
      reference,
      translation,
      compare,
    } => {
      let primary = translation.as_deref().unwrap_or(ctx.default_translation());
      let primary = translation_id(primary)?;
      match compare {
        None => print_passage(&ctx.scripture.fetch_passage(&reference, primary).await?),
        Some(other) => {
          let other = translation_id(&other)?;
          let (first, second) = tokio::join!(
            ctx.scripture.fetch_passage(&reference, primary),
            ctx.scripture.fetch_passage(&reference, other),
          );
          print_passage(&first?);
          println!();
          print_passage(&second?);
        }
      }
    }
    Command::Devotional {
      reference,
      translation,
    } => {
      let reference = reference.unwrap_or_else(|| {
        scripture::daily_verse(chrono::Local::now().date_naive()).to_string()
      });
      let passage = lookup(&ctx, &reference, translation.as_deref()).await?;
      print_passage(&passage);
      println!();
      println!(
        "{}",
        ctx.devotions.devotional(&passage.reference, &passage.text).await
      );
    }
    Command::Ask { question } => {
      println!("{}", ctx.devotions.answer(&question.join(" ")).await);
    }
    Command::Suggest { prayer } => {
      let reference = ctx.devotions.suggest_verse(&prayer.join(" ")).await?;
      match lookup(&ctx, &reference, None).await {
        Ok(passage) => print_passage(&passage),
        // The suggestion is still useful without its text
        Err(e) => println!("{}\n({})", reference, e),
      }
    }
    Command::Outline {
      reference,
      translation,
    } => {
      let passage = lookup(&ctx, &reference, translation.as_deref()).await?;
      println!(
        "{}",
        ctx.devotions.sermon_outline(&passage.reference, &passage.text).await
      );
    }
    Command::Journal { command } => run_journal(&ctx, command).await?,
    Command::Bookmark { command } => run_bookmark(&ctx, command).await?,
    Command::Plan { command } => run_plan(&ctx, command)?,
  }

  Ok(())
}

/// Pick the `number`-th (1-based) item of a listing
fn nth<T>(items: Vec<T>, number: usize, what: &str) -> Result<T> {
  let count = items.len();
  number
    .checked_sub(1)
    .and_then(|index| items.into_iter().nth(index))
    .ok_or_else(|| eyre!("No {} {} (there are {})", what, number, count))
}

async fn run_journal(ctx: &AppContext, command: JournalCommand) -> Result<()> {
  match command {
    JournalCommand::Add { suggest, request } => {
      let request = request.join(" ");
      let scripture = if suggest {
        match journal::suggest_scripture(&ctx.devotions, &ctx.scripture, &request).await {
          Ok(passage) => {
            print_passage(&passage);
            Some(passage.reference)
          }
          Err(e) => {
            println!("No verse suggested: {}", e);
            None
          }
        }
      } else {
        None
      };
      let prayer = ctx.journal.add(&request, scripture, chrono::Local::now())?;
      println!("Added prayer from {}", prayer.date);
    }
    JournalCommand::List => {
      for (i, prayer) in ctx.journal.list()?.iter().enumerate() {
        let mark = if prayer.is_answered { "answered" } else { "" };
        println!("{:>3}. {} {:<8} {}", i + 1, prayer.date, mark, prayer.request);
        if let Some(reference) = &prayer.scripture {
          println!("     {}", reference);
        }
      }
    }
    JournalCommand::Answer { number } => {
      let prayer = nth(ctx.journal.list()?, number, "prayer")?;
      let prayer = ctx.journal.toggle_answered(&prayer.id)?;
      let state = if prayer.is_answered { "answered" } else { "not answered" };
      println!("Marked \"{}\" {}", prayer.request, state);
    }
    JournalCommand::Remove { number } => {
      let prayer = nth(ctx.journal.list()?, number, "prayer")?;
      ctx.journal.remove(&prayer.id)?;
      println!("Removed \"{}\"", prayer.request);
    }
  }
  Ok(())
}

async fn run_bookmark(ctx: &AppContext, command: BookmarkCommand) -> Result<()> {
  match command {
    BookmarkCommand::Toggle {
      reference,
      translation,
    } => {
      let passage = lookup(ctx, &reference, translation.as_deref()).await?;
      if ctx.bookmarks.toggle_passage(&passage, chrono::Utc::now())? {
        println!("Bookmarked {} ({})", passage.reference, passage.translation_name);
      } else {
        println!("Removed bookmark for {}", passage.reference);
      }
    }
    BookmarkCommand::List => {
      for (i, bookmark) in ctx.bookmarks.list()?.iter().enumerate() {
        println!(
          "{:>3}. {} ({}) {}",
          i + 1,
          bookmark.reference,
          bookmark.translation,
          bookmark.text
        );
        for (n, note) in bookmark.notes.iter().enumerate() {
          println!("     [{}] {}", n + 1, note);
        }
      }
    }
    BookmarkCommand::Note { number, text } => {
      let bookmark = nth(ctx.bookmarks.list()?, number, "bookmark")?;
      let bookmark = ctx.bookmarks.add_note(&bookmark.id, &text.join(" "))?;
      println!("{} has {} note(s)", bookmark.reference, bookmark.notes.len());
    }
    BookmarkCommand::Unnote { number, note } => {
      let bookmark = nth(ctx.bookmarks.list()?, number, "bookmark")?;
      let index = note
        .checked_sub(1)
        .ok_or_else(|| eyre!("Notes are numbered from 1"))?;
      let bookmark = ctx.bookmarks.remove_note(&bookmark.id, index)?;
      println!("{} has {} note(s)", bookmark.reference, bookmark.notes.len());
    }
    BookmarkCommand::Remove { number } => {
      let bookmark = nth(ctx.bookmarks.list()?, number, "bookmark")?;
      ctx.bookmarks.remove(&bookmark.id)?;
      println!("Removed bookmark for {}", bookmark.reference);
    }
  }
  Ok(())
}

fn run_plan(ctx: &AppContext, command: PlanCommand) -> Result<()> {
  let now = chrono::Local::now();
  match command {
    PlanCommand::List => {
      for overview in ctx.plans.overview()? {
        print_plan_line(&overview);
      }
      let streak = ctx.plans.streak()?;
      match streak.last_read_date {
        Some(last) => println!("Reading streak: {} day(s), last read {}", streak.streak, last),
        None => println!("Reading streak: none yet"),
      }
    }
    PlanCommand::Show { plan } => {
      let overview = ctx.plans.plan_overview(&plan)?;
      print_plan_line(&overview);
      println!("{}", overview.plan.description);
      for (day, passage) in overview.plan.passages.iter().enumerate() {
        let mark = if overview.completed.contains(&day) { "x" } else { " " };
        println!("  [{}] Day {:>2}: {}", mark, day + 1, passage);
      }
    }
    PlanCommand::Complete { plan, day } => {
      let overview = ctx.plans.set_day(&plan, plan_day(day)?, true, now)?;
      print_plan_line(&overview);
      println!("Reading streak: {} day(s)", ctx.plans.streak()?.streak);
    }
    PlanCommand::Undo { plan, day } => {
      let overview = ctx.plans.set_day(&plan, plan_day(day)?, false, now)?;
      print_plan_line(&overview);
    }
  }
  Ok(())
}

fn plan_day(day: usize) -> Result<usize> {
  day.checked_sub(1).ok_or_else(|| eyre!("Days are numbered from 1"))
}

fn print_plan_line(overview: &PlanOverview) {
  println!(
    "{:<18} {:>3}% {:>2}/{:<2} {}",
    overview.plan.id,
    overview.percentage(),
    overview.completed.len(),
    overview.plan.duration_days(),
    overview.plan.title
  );
}

/// Validate a translation id against the supported list
fn translation_id(id: &str) -> Result<&'static str> {
  scripture::translation(id)
    .map(|t| t.id)
    .ok_or_else(|| {
      let known: Vec<&str> = TRANSLATIONS.iter().map(|t| t.id).collect();
      eyre!("Unknown translation '{}'. Supported: {}", id, known.join(", "))
    })
}

async fn lookup(ctx: &AppContext, reference: &str, translation: Option<&str>) -> Result<Passage> {
  let id = translation_id(translation.unwrap_or(ctx.default_translation()))?;
  Ok(ctx.scripture.fetch_passage(reference, id).await?)
}

fn print_passage(passage: &Passage) {
  println!("{} ({})", passage.reference, passage.translation_name);
  println!("{}", passage.text.trim());
}

async fn download(ctx: &AppContext, translation: &str) -> Result<()> {
  let id = translation_id(translation)?;
  let mut events = ctx.downloads.subscribe();

  let reporter = tokio::spawn(async move {
    loop {
      match events.recv().await {
        Ok(OfflineEvent::Progress {
          translation,
          progress,
        }) if translation == id => {
          println!("{:>3}% {}", progress.percentage, progress.details);
        }
        Ok(_) | Err(RecvError::Lagged(_)) => {}
        Err(RecvError::Closed) => break,
      }
    }
  });

  let run = ctx.downloads.start_download(id);
  tokio::pin!(run);
  let outcome = tokio::select! {
    outcome = &mut run => outcome?,
    _ = tokio::signal::ctrl_c() => {
      ctx.downloads.cancel_download(id);
      run.await?
    }
  };
  reporter.abort();

  match outcome {
    DownloadOutcome::Completed => println!("{} is available offline", id),
    DownloadOutcome::AlreadyRunning => println!("{} is already downloading", id),
    DownloadOutcome::Cancelled => println!("{} download cancelled", id),
    DownloadOutcome::Failed(e) => return Err(eyre!("{} download failed: {}", id, e)),
  }
  Ok(())
}
