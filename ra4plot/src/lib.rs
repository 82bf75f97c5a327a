#![allow(clippy::module_name_repetitions)]

//! `ra4plot` turns the fit results of the resolved/boosted HH(4b)+ptmiss search into the
//! results figure: background yields before and after the fit, observed counts with Poisson
//! errors and the per-bin pulls between them.
//!
//! The pipeline is linear. [`results::Results::load`] reads a [`layout::Layout`]'s inputs
//! ([`fit_result`] files and a [`datacard`]), the [`stats`] module turns them into pulls, and
//! [`plot::draw`] renders the figure onto any `plotters` backend, usually the
//! [`pdf::PdfBackend`].

mod convert;

pub mod datacard;
pub mod error;
pub mod fit_result;
pub mod layout;
pub mod pdf;
pub mod plot;
pub mod results;
pub mod stats;

pub use error::{Error, Result};
