use biometrics::{Collector, Counter, Moments};

pub(crate) static CLIENT_REQUESTS: Counter = Counter::new("nexus.client.requests");
pub(crate) static CLIENT_REQUEST_ERRORS: Counter = Counter::new("nexus.client.request_errors");
pub(crate) static CLIENT_REQUEST_DURATION: Moments =
    Moments::new("nexus.client.request_duration_seconds");

pub(crate) static REVEAL_STARTED: Counter = Counter::new("nexus.reveal.jobs_started");
pub(crate) static REVEAL_COMPLETED: Counter = Counter::new("nexus.reveal.jobs_completed");
pub(crate) static REVEAL_CANCELLED: Counter = Counter::new("nexus.reveal.jobs_cancelled");
pub(crate) static REVEAL_WORDS: Counter = Counter::new("nexus.reveal.words");

pub(crate) static SESSION_SUBMISSIONS: Counter = Counter::new("nexus.session.submissions");
pub(crate) static SESSION_DISCARDED: Counter =
    Counter::new("nexus.session.discarded_responses");
pub(crate) static SESSION_FALLBACKS: Counter = Counter::new("nexus.session.fallbacks");

/// Register this crate's biometrics with the provided collector.
pub fn register_biometrics(collector: Collector) {
    collector.register_counter(&CLIENT_REQUESTS);
    collector.register_counter(&CLIENT_REQUEST_ERRORS);
    collector.register_moments(&CLIENT_REQUEST_DURATION);

    collector.register_counter(&REVEAL_STARTED);
    collector.register_counter(&REVEAL_COMPLETED);
    collector.register_counter(&REVEAL_CANCELLED);
    collector.register_counter(&REVEAL_WORDS);

    collector.register_counter(&SESSION_SUBMISSIONS);
    collector.register_counter(&SESSION_DISCARDED);
    collector.register_counter(&SESSION_FALLBACKS);
}
