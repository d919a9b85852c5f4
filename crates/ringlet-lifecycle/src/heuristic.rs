// SPDX-FileCopyrightText: 2026 Ringlet Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Booking confirmation heuristic.
//!
//! The call backend's structured `booking_confirmed` flag is unreliable: it
//! misses confirmations phrased conversationally. This module corrects the
//! flag by classifying the transcript against three independent pattern
//! families. The formula is deliberately conservative (two positive signals
//! and no negative signal) so a false positive cannot incorrectly terminate
//! the booking flow.

use std::sync::LazyLock;

use regex::Regex;

/// Availability/offer phrases a provider uses when proposing a slot.
const OFFER_PHRASES: [&str; 8] = [
    "we can come",
    "we could come",
    "we can do",
    "we could do",
    "how about",
    "we have an opening",
    "we can fit you in",
    "we can be there",
];

/// Explicit closing/confirmation language.
const CONFIRMATION_PHRASES: [&str; 9] = [
    "confirmed",
    "confirm that",
    "sounds good",
    "see you",
    "that works",
    "you're booked",
    "you are booked",
    "booked you in",
    "scheduled you",
];

/// Explicit decline/unavailability language.
const REJECTION_PHRASES: [&str; 10] = [
    "not available",
    "unavailable",
    "no availability",
    "fully booked",
    "can't make",
    "cannot make",
    "won't be able",
    "don't service",
    "not interested",
    "call back another",
];

static DAY_TOKEN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"\b(monday|tuesday|wednesday|thursday|friday|saturday|sunday|today|tomorrow|tonight|next week)\b",
    )
    .expect("day token pattern is valid")
});

static TIME_TOKEN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\b(\d{1,2}(:\d{2})?\s*(am|pm)|morning|afternoon|evening|noon|midday)\b")
        .expect("time token pattern is valid")
});

/// Outcome of the confirmation heuristic.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BookingInference {
    pub confirmed: bool,
    /// Day token extracted from the transcript, when the override fired.
    pub date: Option<String>,
    /// Time token extracted from the transcript, when the override fired.
    pub time: Option<String>,
}

/// Corrects an unreliable structured confirmation flag using the transcript.
///
/// When the flag is already `true` it is returned unchanged. Otherwise the
/// transcript is classified case-insensitively:
/// - **offer + agreement**: an offer phrase co-occurring with a day token and
///   a time token;
/// - **confirmation phrasing**: explicit closing language;
/// - **rejection phrasing**: explicit decline language.
///
/// `confirmed = offer && confirmation && !rejection`. On override, a
/// best-effort first-match day and time token are extracted to backfill
/// missing appointment fields; absence is acceptable.
pub fn infer_confirmation(confirmed_flag: bool, transcript: &str) -> BookingInference {
    if confirmed_flag {
        return BookingInference {
            confirmed: true,
            date: None,
            time: None,
        };
    }

    let text = transcript.to_lowercase();

    let has_offer = OFFER_PHRASES.iter().any(|p| text.contains(p));
    let has_day = DAY_TOKEN.is_match(&text);
    let has_time = TIME_TOKEN.is_match(&text);
    let offer_agreement = has_offer && has_day && has_time;

    let has_confirmation = CONFIRMATION_PHRASES.iter().any(|p| text.contains(p));
    let has_rejection = REJECTION_PHRASES.iter().any(|p| text.contains(p));

    let confirmed = offer_agreement && has_confirmation && !has_rejection;
    if !confirmed {
        return BookingInference {
            confirmed: false,
            date: None,
            time: None,
        };
    }

    BookingInference {
        confirmed: true,
        date: DAY_TOKEN.find(&text).map(|m| m.as_str().to_string()),
        time: TIME_TOKEN.find(&text).map(|m| m.as_str().to_string()),
    }
}
