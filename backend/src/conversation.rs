//! Multi-step search dialogue: city, then distance, then surface.
//!
//! Every inbound event produces exactly one outbound message. Sessions are
//! keyed by user id and live in a [`SessionStore`]; the search itself runs
//! after the session has been released, so a slow provider never blocks
//! other users.

use std::{sync::Arc, time::Duration};

use crate::{
    discovery::RouteDiscoveryService,
    error::DistanceError,
    messages::{self, CITY_PREFIX, SURFACE_PREFIX},
    models::{
        distance_in_range, ChatEvent, InboundEvent, OutboundMessage, SearchCriteria,
        SurfaceProduct,
    },
    session::{ConversationSession, DialogueState, Lookup, SessionStore},
};

/// Parse a distance typed by the user.
///
/// Accepts digits with an optional `.` or `,` decimal part, surrounded by
/// whitespace, within 1..=50 km.
pub fn parse_distance(input: &str) -> Result<f64, DistanceError> {
    let trimmed = input.trim();
    let malformed = || DistanceError::Malformed(trimmed.to_string());

    let (whole, fraction) = match trimmed.find(['.', ',']) {
        Some(at) => (&trimmed[..at], Some(&trimmed[at + 1..])),
        None => (trimmed, None),
    };
    let all_digits = |part: &str| !part.is_empty() && part.bytes().all(|b| b.is_ascii_digit());
    if !all_digits(whole) || !fraction.map_or(true, all_digits) {
        return Err(malformed());
    }

    let normalized = match fraction {
        Some(fraction) => format!("{whole}.{fraction}"),
        None => whole.to_string(),
    };
    let value: f64 = normalized.parse().map_err(|_| malformed())?;
    if !distance_in_range(value) {
        return Err(DistanceError::OutOfRange(value));
    }
    Ok(value)
}

#[derive(Debug, Clone, Copy)]
enum Input<'a> {
    Text(&'a str),
    Choice(&'a str),
}

impl<'a> Input<'a> {
    fn choice(self, prefix: &str) -> Option<&'a str> {
        match self {
            Input::Choice(data) => data.strip_prefix(prefix),
            Input::Text(_) => None,
        }
    }
}

enum Step {
    Reply(OutboundMessage),
    Search(SearchCriteria),
}

pub struct ConversationStateMachine {
    sessions: SessionStore,
    discovery: Arc<RouteDiscoveryService>,
    cities: Vec<String>,
}

impl ConversationStateMachine {
    pub fn new(
        discovery: Arc<RouteDiscoveryService>,
        cities: Vec<String>,
        session_ttl: Duration,
    ) -> Self {
        Self {
            sessions: SessionStore::new(session_ttl),
            discovery,
            cities,
        }
    }

    pub fn cities(&self) -> &[String] {
        &self.cities
    }

    /// `Terminal` when the user has no live session.
    pub fn state_of(&self, user_id: i64) -> DialogueState {
        self.sessions
            .snapshot(user_id)
            .map_or(DialogueState::Terminal, |session| session.state)
    }

    pub fn session(&self, user_id: i64) -> Option<ConversationSession> {
        self.sessions.snapshot(user_id)
    }

    pub async fn handle(&self, inbound: InboundEvent) -> OutboundMessage {
        let InboundEvent { user_id, event } = inbound;
        match event {
            ChatEvent::Command(name) => self.command(user_id, &name),
            ChatEvent::Text(text) => self.input(user_id, Input::Text(&text)).await,
            ChatEvent::Choice(data) => self.input(user_id, Input::Choice(&data)).await,
        }
    }

    fn command(&self, user_id: i64, name: &str) -> OutboundMessage {
        let name = name.trim().trim_start_matches('/').to_lowercase();
        match name.as_str() {
            "find" => {
                self.sessions.begin(user_id);
                tracing::debug!("user {user_id} started a search");
                messages::choose_city(&self.cities)
            }
            "cancel" => {
                if self.sessions.remove(user_id).is_some() {
                    tracing::debug!("user {user_id} cancelled the search");
                }
                messages::cancelled()
            }
            "start" => messages::welcome(),
            "help" => messages::help(),
            other => messages::unknown_command(other),
        }
    }

    async fn input(&self, user_id: i64, input: Input<'_>) -> OutboundMessage {
        match self.advance(user_id, input) {
            Step::Reply(message) => message,
            Step::Search(criteria) => {
                tracing::info!(
                    "user {user_id} searching {} {} km {}",
                    criteria.city,
                    criteria.distance_km,
                    criteria.surface_type
                );
                let routes = self.discovery.search(&criteria).await;
                messages::routes_found(&routes)
            }
        }
    }

    /// Synchronous part of a transition, run under the session's lock.
    fn advance(&self, user_id: i64, input: Input<'_>) -> Step {
        let mut session = match self.sessions.lookup(user_id) {
            Lookup::Active(session) => session,
            Lookup::Expired => return Step::Reply(messages::session_expired()),
            Lookup::Missing => return Step::Reply(messages::no_active_search()),
        };

        let state = session.state;
        match state {
            DialogueState::AwaitingCity => {
                let chosen = input
                    .choice(CITY_PREFIX)
                    .filter(|city| self.cities.iter().any(|known| known.as_str() == *city));
                let Some(city) = chosen else {
                    return Step::Reply(messages::choose_city(&self.cities));
                };
                session.city = Some(city.to_string());
                session.state = DialogueState::AwaitingDistance;
                session.touch();
                Step::Reply(messages::ask_distance(city))
            }
            DialogueState::AwaitingDistance => {
                let Input::Text(text) = input else {
                    return Step::Reply(messages::distance_not_a_number());
                };
                match parse_distance(text) {
                    Ok(distance_km) => {
                        session.distance_km = Some(distance_km);
                        session.state = DialogueState::AwaitingSurface;
                        session.touch();
                        Step::Reply(messages::choose_surface(distance_km))
                    }
                    Err(DistanceError::Malformed(_)) => {
                        Step::Reply(messages::distance_not_a_number())
                    }
                    Err(DistanceError::OutOfRange(_)) => {
                        Step::Reply(messages::distance_out_of_range())
                    }
                }
            }
            DialogueState::AwaitingSurface => {
                let Some(surface_type) =
                    input.choice(SURFACE_PREFIX).and_then(SurfaceProduct::from_id)
                else {
                    return Step::Reply(messages::repeat_surface());
                };
                let city = session.city.take();
                let distance_km = session.distance_km.take();
                session.state = DialogueState::Terminal;
                drop(session);
                self.sessions.remove_finished(user_id);

                match (city, distance_km) {
                    (Some(city), Some(distance_km)) => Step::Search(SearchCriteria {
                        city,
                        distance_km,
                        surface_type,
                    }),
                    _ => {
                        tracing::warn!("user {user_id} reached surface step without criteria");
                        Step::Reply(messages::session_expired())
                    }
                }
            }
            DialogueState::Terminal => {
                drop(session);
                self.sessions.remove_finished(user_id);
                Step::Reply(messages::no_active_search())
            }
        }
    }
}
