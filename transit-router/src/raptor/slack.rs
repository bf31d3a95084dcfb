//! Buffer times around boarding, alighting and transferring.

use crate::config::RaptorConfig;
use crate::graph::PatternId;
use crate::state::RoutingRequest;

use super::trip_search::SearchDirection;

/// Seconds of slack the search must respect.
pub trait SlackProvider {
    /// Before boarding a trip of `pattern`.
    fn board_slack(&self, pattern: PatternId) -> i32;

    /// After leaving a trip of `pattern`.
    fn alight_slack(&self, pattern: PatternId) -> i32;

    /// Between leaving one trip and boarding the next. Not charged after
    /// the access leg.
    fn transfer_slack(&self) -> i32;

    /// Slack added when a trip is left, in search direction. Going
    /// backward that is the forward board slack.
    fn arrival_slack(&self, pattern: PatternId, direction: SearchDirection) -> i32 {
        match direction {
            SearchDirection::Forward => self.alight_slack(pattern),
            SearchDirection::Reverse => self.board_slack(pattern),
        }
    }

    /// Slack added before a trip is taken, in search direction.
    fn departure_slack(&self, pattern: PatternId, direction: SearchDirection) -> i32 {
        match direction {
            SearchDirection::Forward => self.board_slack(pattern),
            SearchDirection::Reverse => self.alight_slack(pattern),
        }
    }
}

/// The same slack for every pattern.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DefaultSlackProvider {
    board: i32,
    alight: i32,
    transfer: i32,
}

impl DefaultSlackProvider {
    /// Configured slack; the transfer slack is at least the request's
    /// minimum transfer time.
    pub fn new(config: &RaptorConfig, request: &RoutingRequest) -> Self {
        let min_transfer = i32::try_from(request.min_transfer_time).unwrap_or(i32::MAX);
        Self {
            board: config.board_slack_s.max(0),
            alight: config.alight_slack_s.max(0),
            transfer: config.transfer_slack_s.max(min_transfer).max(0),
        }
    }
}

impl SlackProvider for DefaultSlackProvider {
    fn board_slack(&self, _pattern: PatternId) -> i32 {
        self.board
    }

    fn alight_slack(&self, _pattern: PatternId) -> i32 {
        self.alight
    }

    fn transfer_slack(&self) -> i32 {
        self.transfer
    }
}
