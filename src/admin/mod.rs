//! Admin client for the book catalog.
//!
//! [`AdminView`] holds the screen state (list, form, requests in flight) and drives a
//! [`BookApi`]; [`HttpBookApi`] is the implementation that talks to the server.
//! Rendering to text lives in [`render`] so the terminal front end stays thin.

mod client;
pub mod render;
mod view;

pub use client::{BookApi, ClientConfig, ClientError, HttpBookApi};
pub use view::{AdminView, FormData, InFlight, PendingSave, SubmitOutcome};
