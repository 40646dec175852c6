use std::{
    io::{self, BufRead},
    sync::Arc,
};

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use client_core::{AppContext, CatalogState, HttpTransport, LoginOutcome, Route, SessionState};
use shared::domain::{Movie, MovieId};
use storage::Storage;
use tracing::info;
use tracing_subscriber::EnvFilter;

mod config;

use config::{load_settings, normalize_database_url};

#[derive(Parser, Debug)]
#[command(name = "movie-cli", about = "Browse the movie catalog from a terminal")]
struct Cli {
    /// Overrides the configured backend base URL.
    #[arg(long)]
    api_url: Option<String>,
    /// Overrides where the session token is kept.
    #[arg(long)]
    database_url: Option<String>,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    Login {
        #[arg(long)]
        email: String,
        /// Falls back to `MOVIE_CLI_PASSWORD`, then to one line of stdin.
        #[arg(long)]
        password: Option<String>,
    },
    Logout,
    /// Refreshes and prints the logged-in profile.
    Whoami,
    Movies,
    Movie {
        id: String,
    },
    /// Opens a page by path, e.g. `/movies/42`.
    Open {
        path: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let mut settings = load_settings()?;
    if let Some(api_url) = cli.api_url {
        settings.api_base_url = api_url;
    }
    if let Some(database_url) = cli.database_url {
        settings.database_url = database_url;
    }

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&settings.log_filter));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let database_url = normalize_database_url(&settings.database_url);
    let storage = Storage::new(&database_url)
        .await
        .with_context(|| format!("failed to open token storage at '{database_url}'"))?;
    let api = HttpTransport::new(&settings.api_base_url, settings.request_timeout())?;
    info!(api = api.base_url(), "cli: using backend");

    let app = AppContext::new(Arc::new(api), Arc::new(storage)).await;

    match cli.command {
        Command::Login { email, password } => {
            let password = resolve_password(
                password,
                |key| std::env::var(key).ok(),
                io::stdin().lock(),
            )?;
            match app.session.login(&email, &password).await {
                LoginOutcome::Success => {
                    println!("Logged in.");
                    print_session(&app.session.state().await);
                }
                LoginOutcome::Failure { message } => bail!(message),
            }
        }
        Command::Logout => {
            app.open(&Route::Logout).await;
            println!("Logged out.");
        }
        Command::Whoami => {
            let token = app.session.state().await.token;
            let Some(token) = token else {
                bail!("not logged in");
            };
            app.session.get_user_details(Some(&token)).await;
            print_session(&app.session.state().await);
        }
        Command::Movies => open_and_render(&app, Route::Movies).await?,
        Command::Movie { id } => {
            open_and_render(&app, Route::MovieDetail(MovieId::from(id))).await?
        }
        Command::Open { path } => {
            let Some(route) = Route::parse(&path) else {
                bail!("no page at '{path}'");
            };
            open_and_render(&app, route).await?;
        }
    }

    Ok(())
}

const PASSWORD_ENV: &str = "MOVIE_CLI_PASSWORD";

fn resolve_password(
    flag: Option<String>,
    var: impl Fn(&str) -> Option<String>,
    mut input: impl BufRead,
) -> Result<String> {
    if let Some(password) = flag.or_else(|| var(PASSWORD_ENV)) {
        return Ok(password);
    }
    let mut line = String::new();
    input
        .read_line(&mut line)
        .context("failed to read password from stdin")?;
    let password = line.trim_end_matches(['\r', '\n']);
    if password.is_empty() {
        bail!("no password given: pass --password, set {PASSWORD_ENV} or pipe it on stdin");
    }
    Ok(password.to_string())
}

async fn open_and_render(app: &AppContext, route: Route) -> Result<()> {
    app.open(&route).await;
    match route {
        Route::Movies => print_movies(&app.catalog.state().await)?,
        Route::MovieDetail(_) => print_movie(&app.catalog.state().await)?,
        Route::Logout => println!("Logged out."),
        Route::Home | Route::Login | Route::Register => {
            println!("{} page has nothing to load.", route.name());
            print_session(&app.session.state().await);
        }
    }
    Ok(())
}

fn print_session(state: &SessionState) {
    if !state.is_authenticated() {
        println!("Not logged in.");
        return;
    }
    let field = |value: &Option<String>| value.clone().unwrap_or_else(|| "-".into());
    println!("email:   {}", field(&state.email));
    println!(
        "name:    {} {}",
        field(&state.first_name),
        field(&state.last_name)
    );
    println!("mobile:  {}", field(&state.mobile_no));
    match state.is_admin {
        Some(true) => println!("role:    admin"),
        Some(false) => println!("role:    user"),
        None => println!("role:    unknown"),
    }
}

fn print_movies(state: &CatalogState) -> Result<()> {
    if !state.error.is_empty() {
        bail!("{}", state.error);
    }
    if state.movies.is_empty() {
        println!("No movies found.");
        return Ok(());
    }
    for movie in &state.movies {
        println!("{:>12}  {}", movie_id(movie), movie_title(movie));
    }
    Ok(())
}

fn print_movie(state: &CatalogState) -> Result<()> {
    if !state.error.is_empty() {
        bail!("{}", state.error);
    }
    let Some(movie) = &state.current_movie else {
        println!("Movie not found.");
        return Ok(());
    };

    println!("{} ({})", movie_title(movie), movie_id(movie));
    if let Some(description) = &movie.description {
        println!("{description}");
    }
    for (key, value) in &movie.extra {
        println!("  {key}: {value}");
    }

    println!();
    if state.comments.is_empty() {
        println!("No comments yet.");
    }
    for comment in &state.comments {
        println!("- {}", comment.comment.as_deref().unwrap_or_default());
    }
    Ok(())
}

fn movie_id(movie: &Movie) -> String {
    movie
        .id
        .as_ref()
        .map_or_else(|| "-".to_string(), MovieId::to_string)
}

fn movie_title(movie: &Movie) -> &str {
    movie.title.as_deref().unwrap_or("(untitled)")
}
