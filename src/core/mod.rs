// Engine layer: login, dialog resolution, capture and orchestration,
// written against the domain ports only.

pub mod auth;
pub mod capture;
pub mod dialog;
pub mod engine;
pub mod links;
pub mod selectors;
