use std::error::Error;
use std::path::PathBuf;

use atty::Stream;
use clap::{Parser, Subcommand};
use serde_json::json;
use termgloss::history::FileTrailStore;
use termgloss::session::BrowseSession;
use termgloss::{ALL_CATEGORIES, Term, TermStore, filter_terms};
use termimad::{FmtText, MadSkin, terminal_size};

#[derive(Parser, Debug)]
#[command(name = "termgloss", about = "Browse a glossary of terms", version)]
pub struct Cli {
    /// Emit JSON instead of human-readable tables.
    #[arg(long, global = true)]
    json: bool,

    /// Path to the glossary dataset.
    #[arg(long, global = true, default_value = "data/glossary.json")]
    data: PathBuf,

    /// Where the navigation trail is persisted between invocations.
    /// Defaults to a session file under the OS temp dir.
    #[arg(long, global = true)]
    trail_file: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Operations on glossary terms.
    #[command(subcommand)]
    Term(TermCommand),
    /// Operations on the breadcrumb trail of visited terms.
    #[command(subcommand)]
    Trail(TrailCommand),
    /// Serve the glossary browser over HTTP.
    #[cfg(feature = "web")]
    Serve {
        /// Address to bind.
        #[arg(long, default_value = "127.0.0.1:8080")]
        addr: std::net::SocketAddr,
        /// Page chrome: "tailwind" or "bootstrap".
        #[arg(long, default_value = "tailwind")]
        theme: String,
        /// External base URL used in canonical links.
        #[arg(long, default_value = "http://127.0.0.1:8080")]
        base_url: String,
    },
}

#[derive(Subcommand, Debug)]
enum TermCommand {
    /// List terms, optionally filtered by category and search query.
    List {
        /// Exact category name; omit for all categories.
        #[arg(short, long)]
        category: Option<String>,
        /// Substring matched against name, definition, and full form.
        #[arg(short, long)]
        query: Option<String>,
    },
    /// Show the full entry for one term.
    Show {
        /// Term name to display.
        query: String,
        /// Interpret the query as a term ID instead of a name.
        #[arg(long)]
        by_id: bool,
    },
    /// List the declared categories with their term counts.
    Categories,
}

#[derive(Subcommand, Debug)]
enum TrailCommand {
    /// Print the visited-term trail.
    Show,
    /// Visit a term, appending it to the trail.
    Visit {
        /// Term name (or ID with --by-id).
        query: String,
        #[arg(long)]
        by_id: bool,
    },
    /// Jump back to a term already on the trail, discarding everything
    /// visited after it.
    BackTo {
        /// Term name (or ID with --by-id).
        query: String,
        #[arg(long)]
        by_id: bool,
    },
    /// Clear the trail.
    Clear,
}

pub fn run() -> Result<(), Box<dyn Error>> {
    init_tracing();
    let cli = Cli::parse();
    let store = TermStore::load(&cli.data)?;
    match cli.command {
        Command::Term(TermCommand::List { category, query }) => {
            handle_list(&store, category, query, cli.json)
        }
        Command::Term(TermCommand::Show { query, by_id }) => {
            handle_show(&store, &query, by_id, cli.json)
        }
        Command::Term(TermCommand::Categories) => handle_categories(&store, cli.json),
        Command::Trail(command) => handle_trail(store, command, cli.trail_file, cli.json),
        #[cfg(feature = "web")]
        Command::Serve {
            addr,
            theme,
            base_url,
        } => handle_serve(store, addr, &theme, base_url),
    }
}

fn init_tracing() {
    use tracing_subscriber::EnvFilter;
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}

fn handle_list(
    store: &TermStore,
    category: Option<String>,
    query: Option<String>,
    as_json: bool,
) -> Result<(), Box<dyn Error>> {
    let category = category.unwrap_or_else(|| ALL_CATEGORIES.to_string());
    let query = query.unwrap_or_default();
    let results = filter_terms(store, &category, &query);

    if as_json {
        let payload = json!({
            "category": category,
            "query": query,
            "count": results.len(),
            "total": store.terms().len(),
            "results": results.iter().map(|term| {
                json!({"id": term.id, "term": term.term, "category": term.category})
            }).collect::<Vec<_>>(),
        });
        println!("{}", serde_json::to_string_pretty(&payload)?);
    } else {
        print_term_table(&results, store.terms().len());
    }
    Ok(())
}

fn handle_show(
    store: &TermStore,
    query: &str,
    by_id: bool,
    as_json: bool,
) -> Result<(), Box<dyn Error>> {
    let term = resolve_term(store, query, by_id)?;
    if as_json {
        println!("{}", serde_json::to_string_pretty(&term_to_json(store, term))?);
    } else {
        print_term(store, term);
    }
    Ok(())
}

fn handle_categories(store: &TermStore, as_json: bool) -> Result<(), Box<dyn Error>> {
    let rows: Vec<(String, usize)> = store
        .categories()
        .iter()
        .map(|name| (name.clone(), filter_terms(store, name, "").len()))
        .collect();

    if as_json {
        let payload: Vec<_> = rows
            .iter()
            .map(|(name, count)| json!({"category": name, "terms": count}))
            .collect();
        println!("{}", serde_json::to_string_pretty(&payload)?);
    } else if rows.is_empty() {
        println!("The dataset declares no categories.");
    } else {
        let width = rows
            .iter()
            .map(|(name, _)| name.len())
            .max()
            .unwrap_or(8)
            .max("CATEGORY".len());
        println!("{:<width$}  {}", "CATEGORY", "TERMS", width = width);
        println!("{:-<width$}  {}", "", "-----", width = width);
        for (name, count) in rows {
            println!("{:<width$}  {}", name, count, width = width);
        }
    }
    Ok(())
}

fn handle_trail(
    store: TermStore,
    command: TrailCommand,
    trail_file: Option<PathBuf>,
    as_json: bool,
) -> Result<(), Box<dyn Error>> {
    let trail_store = match trail_file {
        Some(path) => FileTrailStore::new(path),
        None => FileTrailStore::session_default(),
    };
    let mut session = BrowseSession::new(store, trail_store);

    match command {
        TrailCommand::Show => {}
        TrailCommand::Visit { query, by_id } => {
            let id = resolve_term(session.store(), &query, by_id)?.id.clone();
            session.navigate_to(&id, false);
        }
        TrailCommand::BackTo { query, by_id } => {
            let id = resolve_term(session.store(), &query, by_id)?.id.clone();
            session.navigate_to(&id, true);
        }
        TrailCommand::Clear => session.clear_trail(),
    }

    if as_json {
        let payload = json!({
            "ids": session.trail_ids(),
            "terms": session.breadcrumbs().iter().map(|term| {
                json!({"id": term.id, "term": term.term})
            }).collect::<Vec<_>>(),
        });
        println!("{}", serde_json::to_string_pretty(&payload)?);
    } else {
        print_trail(&session);
    }
    Ok(())
}

#[cfg(feature = "web")]
fn handle_serve(
    store: TermStore,
    addr: std::net::SocketAddr,
    theme: &str,
    base_url: String,
) -> Result<(), Box<dyn Error>> {
    use termgloss::web::{WebConfig, WebTheme, serve};

    let theme = match theme {
        "tailwind" => WebTheme::Tailwind,
        "bootstrap" => WebTheme::Bootstrap,
        other => return Err(format!("unknown theme {other:?}").into()),
    };
    let config = WebConfig {
        addr,
        theme,
        base_url,
    };
    let runtime = tokio::runtime::Runtime::new()?;
    runtime.block_on(serve(store, config))?;
    Ok(())
}

fn resolve_term<'a>(
    store: &'a TermStore,
    query: &str,
    by_id: bool,
) -> Result<&'a Term, Box<dyn Error>> {
    if by_id {
        store
            .get_by_id(query)
            .ok_or_else(|| format!("No term found for id {query:?}").into())
    } else {
        store
            .resolve_id_by_name(query)
            .and_then(|id| store.get_by_id(id))
            .ok_or_else(|| format!("No term found for name {query:?}").into())
    }
}

fn print_term_table(rows: &[&Term], total: usize) {
    if rows.is_empty() {
        println!("No terms match the current filters.");
        return;
    }
    let width = rows
        .iter()
        .map(|term| term.term.len())
        .max()
        .unwrap_or(4)
        .max("TERM".len());
    println!("{:<width$}  {}", "TERM", "CATEGORY", width = width);
    println!("{:-<width$}  {}", "", "--------", width = width);
    for term in rows {
        println!("{:<width$}  {}", term.term, term.category, width = width);
    }
    println!("({} of {} terms)", rows.len(), total);
}

fn print_term(store: &TermStore, term: &Term) {
    println!("Term: {} [{}]", term.term, term.id);
    if let Some(full_form) = &term.full_form {
        println!("Full form: {full_form}");
    }
    println!("Category: {}", term.category);
    render_markdown_block("Definition", &term.definition);

    if !term.examples.is_empty() {
        println!("\nExamples:");
        for example in &term.examples {
            println!("- {example}");
        }
    }

    let links = store.related_links(term);
    if !links.is_empty() {
        let rendered: Vec<String> = links
            .iter()
            .map(|link| match &link.id {
                Some(id) => format!("{} ({id})", link.name),
                None => format!("{} (not in glossary)", link.name),
            })
            .collect();
        println!("\nRelated: {}", rendered.join(", "));
    }
}

fn print_trail<S: termgloss::history::TrailStore>(session: &BrowseSession<S>) {
    let crumbs = session.breadcrumbs();
    if crumbs.is_empty() {
        println!("The trail is empty.");
        return;
    }
    let path: Vec<&str> = crumbs.iter().map(|term| term.term.as_str()).collect();
    println!("{}", path.join(" › "));
    println!("({} entries)", session.trail_ids().len());
}

fn term_to_json(store: &TermStore, term: &Term) -> serde_json::Value {
    json!({
        "id": term.id,
        "term": term.term,
        "fullForm": term.full_form,
        "definition": term.definition,
        "category": term.category,
        "relatedTerms": store.related_links(term).iter().map(|link| {
            json!({"name": link.name, "id": link.id})
        }).collect::<Vec<_>>(),
        "examples": term.examples,
    })
}

fn stdout_is_tty() -> bool {
    atty::is(Stream::Stdout)
}

fn markdown_width() -> usize {
    let (width, _) = terminal_size();
    width.max(60) as usize
}

fn render_markdown_block(title: &str, body: &str) {
    let trimmed = body.trim();
    if trimmed.is_empty() {
        return;
    }
    println!("\n{title}:");
    if stdout_is_tty() {
        let skin = MadSkin::default();
        let formatted = FmtText::from(&skin, trimmed, Some(markdown_width()));
        println!("{formatted}");
    } else {
        println!("{trimmed}");
    }
}
