// Adapters layer: concrete implementations for external systems (the
// Chromium session driver and the persistent history ledger).

pub mod chrome;
pub mod ledger;
