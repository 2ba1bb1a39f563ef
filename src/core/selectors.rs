//! Ordered selector fallback chains for the loosely-known portals this
//! engine drives. Each table is tried strictly in order, first hit wins;
//! new portal quirks are handled by appending entries, not by branching.

use crate::domain::model::Matcher;
use std::borrow::Cow;
use std::time::Duration;

/// The one field every supported portal presents on its login page.
pub const SECURITY_CODE_FIELD: Matcher = Matcher::Css(Cow::Borrowed("input[type=\"text\"]"));

pub const SECURITY_CODE_TIMEOUT: Duration = Duration::from_secs(10);

/// Plausible username inputs, most specific first. Absence is non-fatal:
/// some portals authenticate on the security code alone.
pub const USERNAME_FIELDS: &[Matcher] = &[
    Matcher::Css(Cow::Borrowed("input[type=\"email\"]")),
    Matcher::Css(Cow::Borrowed("input[name=\"username\"]")),
    Matcher::Css(Cow::Borrowed("input[name=\"email\"]")),
];

pub const USERNAME_FIELD_TIMEOUT: Duration = Duration::from_secs(2);

pub const PASSWORD_FIELD: Matcher = Matcher::Css(Cow::Borrowed("input[type=\"password\"]"));

pub const PASSWORD_FIELD_TIMEOUT: Duration = Duration::from_secs(5);

/// Submit triggers, semantic controls before portal-specific classes/ids.
pub const SUBMIT_CONTROLS: &[Matcher] = &[
    Matcher::Css(Cow::Borrowed("button[type=\"submit\"]")),
    Matcher::Css(Cow::Borrowed("input[type=\"submit\"]")),
    Matcher::ButtonText(Cow::Borrowed("ログイン")),
    Matcher::ButtonText(Cow::Borrowed("Login")),
    Matcher::Css(Cow::Borrowed(".login-button")),
    Matcher::Css(Cow::Borrowed("#login-button")),
];

pub const POST_SUBMIT_TIMEOUT: Duration = Duration::from_secs(10);

/// Canonical confirmation control of the download dialog.
pub const DIALOG_CONFIRM: Matcher = Matcher::ButtonText(Cow::Borrowed("OK"));

pub const DIALOG_CONFIRM_WAIT: Duration = Duration::from_secs(10);

/// Dismiss candidates for dialogs of unknown shape: OK in several casings
/// and languages, explicit value attributes, generic submit controls, and
/// finally any button inside a recognized modal container.
pub const DIALOG_DISMISS: &[Matcher] = &[
    Matcher::ButtonText(Cow::Borrowed("OK")),
    Matcher::ButtonText(Cow::Borrowed("ok")),
    Matcher::Css(Cow::Borrowed("button[value=\"OK\"]")),
    Matcher::Css(Cow::Borrowed("input[type=\"button\"][value=\"OK\"]")),
    Matcher::ButtonText(Cow::Borrowed("確認")),
    Matcher::ButtonText(Cow::Borrowed("はい")),
    Matcher::Css(Cow::Borrowed("button[type=\"submit\"]")),
    Matcher::Css(Cow::Borrowed(".modal button")),
    Matcher::Css(Cow::Borrowed(".dialog button")),
    Matcher::Css(Cow::Borrowed("[role=\"dialog\"] button")),
];

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dismiss_chain_prefers_semantic_controls_over_containers() {
        // Container-scoped catch-alls must stay at the tail so a labeled OK
        // button is always preferred when both match.
        let last = DIALOG_DISMISS.last().unwrap();
        assert_eq!(*last, Matcher::css("[role=\"dialog\"] button"));
        assert_eq!(DIALOG_DISMISS[0], Matcher::button_text("OK"));
    }

    #[test]
    fn submit_chain_starts_with_typed_controls() {
        assert_eq!(SUBMIT_CONTROLS[0], Matcher::css("button[type=\"submit\"]"));
        assert_eq!(SUBMIT_CONTROLS[1], Matcher::css("input[type=\"submit\"]"));
    }
}
