//! Behavioural tests against the in-memory [`fake::FakeGraph`].

mod fake;
