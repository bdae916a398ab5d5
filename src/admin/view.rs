use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use crate::admin::client::{BookApi, ClientError};
use crate::api::{BookPayload, parse_int_prefix};
use crate::model::{Book, BookStatus};

/// Contents of the add/edit form. The year is kept as typed.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FormData {
    pub title: String,
    pub description: String,
    pub author: String,
    pub publicationyear: String,
    pub status: BookStatus,
}

impl FormData {
    pub fn from_book(book: &Book) -> Self {
        FormData {
            title: book.title.clone(),
            description: book.description.clone(),
            author: book.author.clone(),
            publicationyear: if book.publicationyear == 0 {
                String::new()
            } else {
                book.publicationyear.to_string()
            },
            status: book.status,
        }
    }

    pub fn to_payload(&self) -> BookPayload {
        BookPayload {
            title: Some(self.title.clone()),
            description: Some(self.description.clone()),
            author: Some(self.author.clone()),
            publicationyear: Some(parse_int_prefix(&self.publicationyear)),
            status: Some(self.status.as_str().to_string()),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum SubmitOutcome {
    Created(Book),
    Updated(Book),
    /// A save is already in flight.
    Busy,
    /// Nothing was sent; the form has no title.
    TitleRequired,
}

/// Marks one request as in flight until dropped, including when the
/// future awaiting the request is cancelled.
#[must_use]
#[derive(Debug)]
pub struct InFlight(Arc<AtomicUsize>);

impl InFlight {
    fn start(counter: &Arc<AtomicUsize>) -> Self {
        counter.fetch_add(1, Ordering::SeqCst);
        InFlight(counter.clone())
    }
}

impl Drop for InFlight {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

/// A validated save that has been started but not yet sent.
#[must_use]
#[derive(Debug)]
pub struct PendingSave {
    target: Option<i64>,
    payload: BookPayload,
    in_flight: InFlight,
}

/// State of the admin screen: the list, the form, and the requests in flight.
///
/// Every mutation is followed by a full re-fetch of the list rather than a local patch.
pub struct AdminView<A> {
    api: A,
    books: Vec<Book>,
    selected_book: Option<Book>,
    form_data: FormData,
    in_flight: Arc<AtomicUsize>,
    show_form: bool,
    list_error: Option<ClientError>,
}

impl<A> AdminView<A> {
    pub fn new(api: A) -> Self {
        AdminView {
            api,
            books: vec![],
            selected_book: None,
            form_data: FormData::default(),
            in_flight: Arc::new(AtomicUsize::new(0)),
            show_form: false,
            list_error: None,
        }
    }

    pub fn api(&self) -> &A {
        &self.api
    }

    pub fn books(&self) -> &[Book] {
        &self.books
    }

    pub fn selected_book(&self) -> Option<&Book> {
        self.selected_book.as_ref()
    }

    pub fn form_data(&self) -> &FormData {
        &self.form_data
    }

    pub fn form_data_mut(&mut self) -> &mut FormData {
        &mut self.form_data
    }

    pub fn is_loading(&self) -> bool {
        self.in_flight.load(Ordering::SeqCst) > 0
    }

    pub fn is_form_open(&self) -> bool {
        self.show_form
    }

    pub fn show_loading_indicator(&self) -> bool {
        self.is_loading() && self.books.is_empty()
    }

    /// Takes the error from a list re-fetch that followed a successful write.
    pub fn take_list_error(&mut self) -> Option<ClientError> {
        self.list_error.take()
    }

    pub fn add_new(&mut self) {
        self.selected_book = None;
        self.form_data = FormData::default();
        self.show_form = true;
    }

    /// Opens the form on a listed book. Returns false if the id is not in the list.
    pub fn edit(&mut self, id: i64) -> bool {
        let Some(book) = self.books.iter().find(|b| b.id == id).cloned() else {
            return false;
        };
        self.form_data = FormData::from_book(&book);
        self.selected_book = Some(book);
        self.show_form = true;
        true
    }

    pub fn cancel(&mut self) {
        self.show_form = false;
    }

    fn reset_form(&mut self) {
        self.form_data = FormData::default();
        self.selected_book = None;
        self.show_form = false;
    }

    /// Marks a list fetch as started. The view reports loading until the
    /// returned guard is handed to [`AdminView::finish_fetch`] or dropped.
    pub fn begin_fetch(&self) -> InFlight {
        InFlight::start(&self.in_flight)
    }

    pub fn finish_fetch(
        &mut self,
        in_flight: InFlight,
        result: Result<Vec<Book>, ClientError>,
    ) -> Result<(), ClientError> {
        drop(in_flight);
        self.books = result?;
        Ok(())
    }

    /// Validates the form and marks a save as started.
    ///
    /// Returns `Busy` while another request is in flight and `TitleRequired`
    /// when the title is blank; in both cases nothing is sent.
    pub fn begin_submit(&self) -> Result<PendingSave, SubmitOutcome> {
        if self.is_loading() {
            return Err(SubmitOutcome::Busy);
        }
        if self.form_data.title.trim().is_empty() {
            return Err(SubmitOutcome::TitleRequired);
        }
        Ok(PendingSave {
            target: self.selected_book.as_ref().map(|b| b.id),
            payload: self.form_data.to_payload(),
            in_flight: InFlight::start(&self.in_flight),
        })
    }
}

impl<A: BookApi> AdminView<A> {
    pub async fn mount(&mut self) -> Result<(), ClientError> {
        self.fetch_books().await
    }

    pub async fn refresh(&mut self) -> Result<(), ClientError> {
        self.fetch_books().await
    }

    async fn fetch_books(&mut self) -> Result<(), ClientError> {
        let in_flight = self.begin_fetch();
        let result = self.api.list_books().await;
        self.finish_fetch(in_flight, result)
    }

    /// Re-fetches after a write. The write already happened, so a failure
    /// here is kept for [`AdminView::take_list_error`] instead of returned.
    async fn refetch_after_write(&mut self) {
        self.list_error = None;
        if let Err(e) = self.fetch_books().await {
            tracing::warn!(error = %e, "list refresh after write failed");
            self.list_error = Some(e);
        }
    }

    /// Updates the selected book, or creates one when nothing is selected.
    pub async fn submit(&mut self) -> Result<SubmitOutcome, ClientError> {
        match self.begin_submit() {
            Ok(save) => self.finish_submit(save).await,
            Err(outcome) => Ok(outcome),
        }
    }

    /// Sends a save started with [`AdminView::begin_submit`].
    ///
    /// `Err` means the write itself failed; the form stays open.
    pub async fn finish_submit(&mut self, save: PendingSave) -> Result<SubmitOutcome, ClientError> {
        let PendingSave {
            target,
            payload,
            in_flight,
        } = save;
        let result = match target {
            Some(id) => self.api.update_book(id, &payload).await.map(SubmitOutcome::Updated),
            None => self.api.create_book(&payload).await.map(SubmitOutcome::Created),
        };
        drop(in_flight);
        let outcome = result?;

        self.reset_form();
        self.refetch_after_write().await;
        Ok(outcome)
    }

    /// Deletes after `confirm` agrees. Returns whether a delete was issued.
    pub async fn delete<F>(&mut self, id: i64, confirm: F) -> Result<bool, ClientError>
    where
        F: FnOnce() -> bool,
    {
        if !confirm() {
            return Ok(false);
        }
        self.api.delete_book(id).await?;
        self.refetch_after_write().await;
        Ok(true)
    }
}
