use std::fmt::Write;

use crate::admin::view::{AdminView, FormData};
use crate::model::{Book, BookStatus};

const RESET: &str = "\x1b[0m";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusCue {
    Positive,
    Caution,
    Negative,
}

impl StatusCue {
    pub fn for_status(status: BookStatus) -> Self {
        match status {
            BookStatus::Available => StatusCue::Positive,
            BookStatus::Borrowed => StatusCue::Caution,
            BookStatus::Unavailable => StatusCue::Negative,
        }
    }

    fn ansi(&self) -> &'static str {
        match self {
            StatusCue::Positive => "\x1b[1;32m",
            StatusCue::Caution => "\x1b[1;33m",
            StatusCue::Negative => "\x1b[1;31m",
        }
    }
}

fn or_na(value: &str) -> &str {
    if value.is_empty() { "N/A" } else { value }
}

fn year_or_na(year: i64) -> String {
    if year == 0 { "N/A".to_string() } else { year.to_string() }
}

fn status_label(status: BookStatus, color: bool) -> String {
    if color {
        format!("{}{}{}", StatusCue::for_status(status).ansi(), status, RESET)
    } else {
        status.to_string()
    }
}

pub fn render_row(book: &Book, color: bool) -> String {
    format!(
        "#{} {}\n    Author: {}\n    Year: {}\n    Status: {}\n",
        book.id,
        book.title,
        or_na(&book.author),
        year_or_na(book.publicationyear),
        status_label(book.status, color),
    )
}

pub fn render_form(form: &FormData, editing: bool, saving: bool) -> String {
    let heading = if editing { "Edit Book" } else { "Add Book" };
    let action = match (saving, editing) {
        (true, _) => "Saving...",
        (false, true) => "Update",
        (false, false) => "Create",
    };

    let mut out = String::new();
    let _ = writeln!(out, "== {heading} ==");
    let _ = writeln!(out, "  Title *:     {}", form.title);
    let _ = writeln!(out, "  Description: {}", form.description);
    let _ = writeln!(out, "  Author:      {}", form.author);
    let _ = writeln!(out, "  Year:        {}", form.publicationyear);
    let _ = writeln!(out, "  Status:      {}", form.status);
    let _ = writeln!(out, "  [{action}] [Cancel]");
    out
}

pub fn render_view<A>(view: &AdminView<A>, color: bool) -> String {
    if view.show_loading_indicator() {
        return "Loading...\n".to_string();
    }

    let mut out = String::new();
    if view.is_form_open() {
        out.push_str(&render_form(view.form_data(), view.selected_book().is_some(), view.is_loading()));
        out.push('\n');
    }

    let _ = writeln!(out, "Books ({})", view.books().len());
    for book in view.books() {
        out.push_str(&render_row(book, color));
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn dune() -> Book {
        let now = Utc::now();
        Book {
            id: 3,
            title: "Dune".into(),
            description: String::new(),
            author: "Herbert".into(),
            publicationyear: 1965,
            status: BookStatus::Borrowed,
            createdat: now,
            updatedat: now,
        }
    }

    #[test]
    fn cues_follow_status() {
        assert_eq!(StatusCue::for_status(BookStatus::Available), StatusCue::Positive);
        assert_eq!(StatusCue::for_status(BookStatus::Borrowed), StatusCue::Caution);
        assert_eq!(StatusCue::for_status(BookStatus::Unavailable), StatusCue::Negative);
    }

    #[test]
    fn row_shows_fields() {
        let row = render_row(&dune(), false);
        assert!(row.contains("#3 Dune"));
        assert!(row.contains("Author: Herbert"));
        assert!(row.contains("Year: 1965"));
        assert!(row.contains("Status: borrowed"));
    }

    #[test]
    fn missing_author_and_year_show_na() {
        let mut book = dune();
        book.author.clear();
        book.publicationyear = 0;
        let row = render_row(&book, false);
        assert!(row.contains("Author: N/A"));
        assert!(row.contains("Year: N/A"));
    }

    #[test]
    fn color_wraps_status() {
        let row = render_row(&dune(), true);
        assert!(row.contains("\x1b[1;33mborrowed\x1b[0m"));
    }

    #[test]
    fn form_labels_depend_on_mode() {
        let form = FormData::default();
        assert!(render_form(&form, false, false).contains("== Add Book =="));
        assert!(render_form(&form, false, false).contains("[Create]"));
        assert!(render_form(&form, true, false).contains("[Update]"));
        assert!(render_form(&form, true, true).contains("[Saving...]"));
    }

    #[test]
    fn empty_view_lists_zero_books() {
        let view = AdminView::new(());
        assert_eq!(render_view(&view, false), "Books (0)\n");
    }

    #[test]
    fn first_fetch_renders_loading() {
        let view = AdminView::new(());
        let in_flight = view.begin_fetch();
        assert_eq!(render_view(&view, false), "Loading...\n");
        drop(in_flight);
        assert_eq!(render_view(&view, false), "Books (0)\n");
    }
}
