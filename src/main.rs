use std::env;
use std::io::{self, Write};
use std::time::Instant;

use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use click_therapy::content::{
    ContentRepository, ContentTables, CsvContentRepository, SqliteContentRepository,
};
use click_therapy::core::config::config_path;
use click_therapy::core::{Game, GameConfig, Input};
use click_therapy::persistence::open_autosave;
use click_therapy::simulation::time::Millis;
use click_therapy::ui::{render_status, ConsoleSink};

const HELP: &str = "Commands: select <char_id> | start | next | click <part> | wait <ms> | retry | title | config | volume <master|bgm|se> <0-100> | status | ending | quit";

/// Wall clock plus whatever `wait` skipped ahead.
struct Clock {
    started: Instant,
    skipped: Millis,
}

impl Clock {
    fn now(&self) -> Millis {
        self.started.elapsed().as_secs_f64() * 1000.0 + self.skipped
    }
}

fn main() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "click_therapy=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(io::stderr))
        .init();

    let args: Vec<String> = env::args().collect();
    let mut config = match config_path(&args) {
        Some(path) => match GameConfig::load(&path) {
            Ok(config) => config,
            Err(err) => {
                warn!(error = %err, "using default config");
                GameConfig::default()
            }
        },
        None => GameConfig::default(),
    };
    config.apply_args(&args);

    let content = load_content(&config);
    let autosave = config.autosave_path.clone().and_then(|path| {
        match open_autosave(&path) {
            Ok(store) => {
                match store.load_latest() {
                    Ok(Some(snapshot)) => info!(
                        saved_at = %snapshot.saved_at,
                        gauge = snapshot.relax_gauge,
                        "previous autosave found"
                    ),
                    Ok(None) => {}
                    Err(err) => warn!(error = %err, "previous autosave unreadable"),
                }
                Some(store)
            }
            Err(err) => {
                warn!(path = %path.display(), error = %err, "autosave disabled");
                None
            }
        }
    });

    println!("Click Therapy");
    let mut game = Game::new(config, content, ConsoleSink);
    if let Some(store) = autosave {
        game = game.with_autosave(store);
    }
    let mut clock = Clock {
        started: Instant::now(),
        skipped: 0.0,
    };

    println!("{}", HELP);
    while !game.is_closed() {
        print!("> ");
        let _ = io::stdout().flush();

        let mut line = String::new();
        match io::stdin().read_line(&mut line) {
            Ok(0) | Err(_) => break,
            Ok(_) => {}
        }
        game.advance_to(clock.now());

        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }
        let mut parts = trimmed.split_whitespace();
        let cmd = parts.next().unwrap_or("").to_lowercase();

        let input = match cmd.as_str() {
            "help" => {
                println!("{}", HELP);
                continue;
            }
            "status" => {
                print!("{}", render_status(game.state(), game.audio()));
                println!("t = {:.0} ms, {} task(s) pending", game.now(), game.pending_tasks());
                continue;
            }
            "ending" => {
                match game.state().ending {
                    Some(ending) => println!(
                        "{}: {}",
                        ending,
                        game.content().ending_title(ending)
                    ),
                    None => println!("No ending yet."),
                }
                continue;
            }
            "wait" => {
                match parts.next().map(str::parse::<f64>) {
                    Some(Ok(ms)) if ms >= 0.0 => {
                        clock.skipped += ms;
                        game.advance_to(clock.now());
                    }
                    _ => println!("Usage: wait <ms>"),
                }
                continue;
            }
            "select" => match parts.next() {
                Some(char_id) => Input::SelectCharacter(char_id.to_string()),
                None => {
                    println!("Usage: select <char_id>");
                    continue;
                }
            },
            "start" => Input::Start,
            "next" => Input::AdvanceDialogue,
            "click" => match parts.next() {
                Some(part) => Input::ClickRegion(part.to_lowercase()),
                None => {
                    println!("Usage: click <part>");
                    continue;
                }
            },
            "retry" => Input::Retry,
            "title" => Input::ReturnToTitle,
            "config" => Input::OpenConfig,
            "volume" => match (parts.next(), parts.next().map(str::parse::<i32>)) {
                (Some(channel), Some(Ok(value))) => Input::AdjustVolume {
                    channel: channel.to_string(),
                    value,
                },
                _ => {
                    println!("Usage: volume <master|bgm|se> <0-100>");
                    continue;
                }
            },
            "quit" | "exit" => Input::Exit,
            other => {
                println!("Unknown command: {}", other);
                continue;
            }
        };

        if let Err(err) = game.dispatch(input, clock.now()) {
            println!("({})", err);
        }
    }
}

/// SQLite when a content database is configured, CSV files otherwise.
fn load_content(config: &GameConfig) -> ContentTables {
    let repo: Box<dyn ContentRepository> = match &config.content_db {
        Some(path) => match SqliteContentRepository::open(path) {
            Ok(repo) => Box::new(repo),
            Err(err) => {
                warn!(path = %path.display(), error = %err, "content db unavailable, falling back to CSV");
                Box::new(CsvContentRepository::new(&config.content_dir))
            }
        },
        None => Box::new(CsvContentRepository::new(&config.content_dir)),
    };
    ContentTables::load(repo.as_ref())
}
