use crate::error::AppError;
use crate::models::entry::Entry;
use crate::models::navigation::{Address, Section};
use crate::services::reconcile_service;
use crate::state::AppState;
use crate::stores::MetadataStore;
use crate::vpath;

/// Identifies one navigation event. Reconciler queries carry the ticket of
/// the navigation that requested them; a result is only applied while its
/// ticket is still current, so a stale in-flight query can never overwrite
/// a newer view.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NavigationTicket {
    pub section: Section,
    pub path: String,
    pub generation: u64,
}

/// Outcome of a navigation: the ticket for the query to run, plus the
/// address to persist — `None` when the address did not change, so history
/// never collects duplicate entries.
#[derive(Debug, Clone)]
pub struct Navigation {
    pub ticket: NavigationTicket,
    pub address: Option<Address>,
}

/// Single source of navigation truth: the current `(section, path)`.
///
/// Address updates are one-way outputs of `go_to`; externally originated
/// address changes (history back/forward) enter through `apply_external`,
/// which never re-emits an address.
#[derive(Debug)]
pub struct NavigationController {
    section: Section,
    path: String,
    generation: u64,
}

impl Default for NavigationController {
    fn default() -> Self {
        Self::new()
    }
}

impl NavigationController {
    pub fn new() -> Self {
        Self {
            section: Section::Files,
            path: vpath::ROOT.to_string(),
            generation: 0,
        }
    }

    pub fn current_address(&self) -> Address {
        Address {
            section: self.section,
            path: self.path.clone(),
        }
    }

    /// Navigate to (section, path). Path-addressed navigation applies to
    /// the files section; every other section pins to root. Each call
    /// invalidates any in-flight query, even when the address is unchanged
    /// (a re-navigation is a refresh, not a history entry).
    pub fn go_to(&mut self, section: Section, path: &str) -> Result<Navigation, AppError> {
        let path = if section == Section::Files {
            vpath::normalize(path)?
        } else {
            vpath::ROOT.to_string()
        };

        let changed = section != self.section || path != self.path;
        self.section = section;
        self.path = path;
        self.generation += 1;

        Ok(Navigation {
            ticket: self.ticket(),
            address: changed.then(|| self.current_address()),
        })
    }

    /// Apply an externally originated address change (e.g. history
    /// back/forward). Same transition as `go_to`, but no address is
    /// emitted — re-pushing would pollute the history that produced it.
    pub fn apply_external(&mut self, address: &Address) -> Result<NavigationTicket, AppError> {
        let navigation = self.go_to(address.section, &address.path)?;
        Ok(navigation.ticket)
    }

    /// Whether a ticket still describes the current view.
    pub fn is_current(&self, ticket: &NavigationTicket) -> bool {
        ticket.generation == self.generation
    }

    fn ticket(&self) -> NavigationTicket {
        NavigationTicket {
            section: self.section,
            path: self.path.clone(),
            generation: self.generation,
        }
    }
}

/// Result of a full navigation: the address outcome plus the reconciled
/// entries — `None` when a newer navigation superseded this one while the
/// query was in flight.
#[derive(Debug)]
pub struct NavigationOutcome {
    pub navigation: Navigation,
    pub entries: Option<Vec<Entry>>,
}

/// Navigate and reconcile in one step. The view query runs under the
/// ticket minted by `go_to`; if the controller has moved on by the time the
/// query completes, the stale result is discarded instead of overwriting
/// the current view.
pub async fn navigate<M: MetadataStore>(
    state: &AppState,
    meta: &M,
    section: Section,
    path: &str,
) -> Result<NavigationOutcome, AppError> {
    let navigation = {
        let mut nav = state
            .navigation
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        nav.go_to(section, path)?
    };

    let entries = reconcile_service::list_section(
        &state.db,
        meta,
        navigation.ticket.section,
        &navigation.ticket.path,
    )
    .await?;

    let nav = state
        .navigation
        .lock()
        .unwrap_or_else(|poisoned| poisoned.into_inner());
    let entries = nav.is_current(&navigation.ticket).then_some(entries);
    Ok(NavigationOutcome { navigation, entries })
}
