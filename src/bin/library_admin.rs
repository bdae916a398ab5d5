use std::io::Write;

use clap::Parser;
use library_manager::admin::render::render_view;
use library_manager::admin::{AdminView, BookApi, ClientConfig, ClientError, HttpBookApi, SubmitOutcome};
use library_manager::model::BookStatus;
use tokio::io::{AsyncBufReadExt, BufReader, Lines, Stdin};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "library-admin")]
#[command(about = "Interactive admin console for the library manager book catalog", long_about = None)]
struct Args {
    /// Base URL of the library manager service
    #[arg(long, env = "LIBRARY_API_ROOT", default_value = "http://127.0.0.1:8080")]
    root: String,

    /// Request token; required for add/edit/delete
    #[arg(long, env = "LIBRARY_API_TOKEN")]
    token: Option<String>,

    #[arg(long, env = "LIBRARY_TOKEN_HEADER", default_value = "X-Library-Token")]
    token_header: String,

    /// Disable coloured status output
    #[arg(long)]
    no_color: bool,
}

const HELP: &str = "commands: list | refresh | add | edit <id> | delete <id> | help | quit";

type Input = Lines<BufReader<Stdin>>;

async fn prompt(input: &mut Input, label: &str) -> std::io::Result<Option<String>> {
    print!("{label}");
    std::io::stdout().flush()?;
    input.next_line().await
}

/// Typed alone, clears the field being edited.
const CLEAR: &str = "-";

/// Applies one answer to a form field: blank keeps it, [`CLEAR`] empties it.
fn apply_answer(current: &mut String, answer: &str) {
    match answer.trim() {
        "" => {}
        CLEAR => current.clear(),
        value => *current = value.to_string(),
    }
}

/// Reads one form field. A blank answer keeps the current value.
async fn edit_field(input: &mut Input, label: &str, current: &mut String) -> std::io::Result<()> {
    if let Some(answer) = prompt(input, &format!("{label} [{current}]: ")).await? {
        apply_answer(current, &answer);
    }
    Ok(())
}

async fn fill_form(view: &mut AdminView<HttpBookApi>, input: &mut Input) -> std::io::Result<()> {
    println!("(enter keeps a value, {CLEAR} clears it)");
    let form = view.form_data_mut();
    edit_field(input, "Title *", &mut form.title).await?;
    edit_field(input, "Description", &mut form.description).await?;
    edit_field(input, "Author", &mut form.author).await?;
    edit_field(input, "Year", &mut form.publicationyear).await?;

    let mut status = form.status.to_string();
    if let Some(answer) = prompt(input, &format!("Status (available/borrowed/unavailable) [{status}]: ")).await? {
        if !answer.trim().is_empty() {
            status = answer.trim().to_string();
        }
    }
    match BookStatus::parse(&status) {
        Some(parsed) => form.status = parsed,
        None => println!("unknown status {status:?}, keeping {}", form.status),
    }
    Ok(())
}

fn report(result: Result<(), ClientError>) {
    if let Err(e) = result {
        tracing::warn!(error = %e, "request failed");
        println!("error: {e}");
    }
}

/// Reports a list refresh that failed after a write went through.
fn report_list_error(view: &mut AdminView<HttpBookApi>) {
    if let Some(e) = view.take_list_error() {
        println!("change saved, but the list could not be refreshed: {e}");
    }
}

/// Fetches the list, showing the loading state while the request is out.
async fn load(view: &mut AdminView<HttpBookApi>, color: bool) -> Result<(), ClientError> {
    let in_flight = view.begin_fetch();
    if view.show_loading_indicator() {
        print!("{}", render_view(view, color));
        std::io::stdout().flush().ok();
    }
    let result = view.api().list_books().await;
    view.finish_fetch(in_flight, result)
}

async fn save(view: &mut AdminView<HttpBookApi>, input: &mut Input) -> std::io::Result<()> {
    fill_form(view, input).await?;
    let confirm = prompt(input, "Save? [Y/n]: ").await?.unwrap_or_default();
    if confirm.trim().eq_ignore_ascii_case("n") {
        view.cancel();
        return Ok(());
    }

    let result = match view.begin_submit() {
        Ok(save) => {
            println!("Saving...");
            view.finish_submit(save).await
        }
        Err(outcome) => Ok(outcome),
    };
    match result {
        Ok(SubmitOutcome::Created(book)) => println!("created #{}", book.id),
        Ok(SubmitOutcome::Updated(book)) => println!("updated #{}", book.id),
        Ok(SubmitOutcome::TitleRequired) => println!("title is required"),
        Ok(SubmitOutcome::Busy) => println!("a save is already in progress"),
        Err(e) => report(Err(e)),
    }
    report_list_error(view);
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let args = Args::parse();

    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .init();

    let color = !args.no_color;
    let api = HttpBookApi::new(ClientConfig {
        root: args.root,
        token: args.token,
        token_header: args.token_header,
    });
    let mut view = AdminView::new(api);
    let mut input = BufReader::new(tokio::io::stdin()).lines();

    report(load(&mut view, color).await);
    print!("{}", render_view(&view, color));
    println!("{HELP}");

    while let Some(line) = prompt(&mut input, "> ").await? {
        let mut words = line.split_whitespace();
        let command = words.next().unwrap_or_default();
        let id = words.next().and_then(|w| w.trim_start_matches('#').parse::<i64>().ok());

        match (command, id) {
            ("", _) => continue,
            ("list" | "refresh", _) => report(load(&mut view, color).await),
            ("add", _) => {
                view.add_new();
                save(&mut view, &mut input).await?;
            }
            ("edit", Some(id)) => {
                if view.edit(id) {
                    save(&mut view, &mut input).await?;
                } else {
                    println!("no book #{id} in the list");
                }
            }
            ("delete", Some(id)) => {
                let answer = prompt(&mut input, &format!("Delete #{id}? Are you sure? [y/N]: "))
                    .await?
                    .unwrap_or_default();
                let confirmed = answer.trim().eq_ignore_ascii_case("y");
                report(view.delete(id, || confirmed).await.map(|_| ()));
                report_list_error(&mut view);
            }
            ("edit" | "delete", None) => println!("usage: {command} <id>"),
            ("quit" | "exit", _) => break,
            _ => {
                println!("{HELP}");
                continue;
            }
        }

        print!("{}", render_view(&view, color));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn answers_keep_replace_or_clear_a_field() {
        let mut year = "1965".to_string();
        apply_answer(&mut year, "   ");
        assert_eq!(year, "1965");

        apply_answer(&mut year, " 1969 ");
        assert_eq!(year, "1969");

        apply_answer(&mut year, " - ");
        assert_eq!(year, "");
    }
}
